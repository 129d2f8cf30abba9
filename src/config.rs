//! Optional project configuration (`adlake.toml`)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AdlakeConfig {
    /// Path to the main SQLite database file
    pub database: Option<String>,
    /// Path to the entity rules JSON file
    pub rules: Option<String>,
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("adlake.toml")
}

/// Load the config file if it exists; absence is not an error
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<AdlakeConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: AdlakeConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

/// Make sure the database file's parent directory exists
pub fn ensure_db_dir(db_path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_config_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("adlake.toml");
        assert!(load_config(Some(&path)).unwrap().is_none());
    }

    #[test]
    fn test_config_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("adlake.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "database = \"data/adlake.db\"").unwrap();
        writeln!(file, "rules = \"rules_es.json\"").unwrap();

        let config = load_config(Some(&path)).unwrap().unwrap();
        assert_eq!(config.database.as_deref(), Some("data/adlake.db"));
        assert_eq!(config.rules.as_deref(), Some("rules_es.json"));
    }

    #[test]
    fn test_ensure_db_dir_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("nested/dir/adlake.db");
        ensure_db_dir(&db_path).unwrap();
        assert!(db_path.parent().unwrap().exists());
    }
}
