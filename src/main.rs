//! Adlake CLI - one pipeline stage per invocation
//!
//! An external scheduler sequences the stages; each invocation opens the
//! database connection, initializes the schema, runs one stage scoped to a
//! single execution date and drops the connection on every exit path.

use std::path::PathBuf;

use adlake::config::{ensure_db_dir, load_config};
use adlake::pipeline::{read_cleaned_jsonl, run_count, run_extract, run_ingest};
use adlake::query::parse_date;
use adlake::rules::{labels_from_rules, load_rules, RuleExtractor};
use adlake::schema::db_init;
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use rusqlite::Connection;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "adlake")]
#[command(version = "0.1.0")]
#[command(about = "Bronze/silver/gold lakehouse for scraped classified-ad entities")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the main database file (falls back to adlake.toml, then adlake.db)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    /// Path to the rules JSON file (falls back to adlake.toml, then rules_es.json)
    #[arg(short, long, global = true)]
    rules: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the lakehouse schema and tables
    Init,

    /// Load a cleaned-ads JSONL batch into the bronze layer
    Ingest {
        /// Cleaned JSONL file produced by the cleaning stage
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Extract entities from one day's bronze rows into the silver layer
    Extract {
        /// Execution date, YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<String>,
    },

    /// Aggregate one day's silver rows into the gold layer
    Count {
        /// Execution date, YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<String>,

        /// Restrict aggregation to a single label
        #[arg(short, long)]
        label: Option<String>,
    },
}

fn exec_date(arg: Option<&str>) -> anyhow::Result<NaiveDate> {
    match arg {
        Some(s) => Ok(parse_date(s)?),
        None => Ok(Local::now().date_naive()),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let config = load_config(None)?.unwrap_or_default();
    let database = cli
        .database
        .or_else(|| config.database.as_ref().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("adlake.db"));
    let rules_path = cli
        .rules
        .or_else(|| config.rules.as_ref().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("rules_es.json"));

    let rules = load_rules(&rules_path)?;
    let labels = labels_from_rules(&rules);

    ensure_db_dir(&database)?;
    let conn = Connection::open(&database)?;
    db_init(&conn, &labels)?;

    match cli.command {
        Commands::Init => {
            tracing::info!(
                "Lakehouse ready at {:?} with {} labels",
                database,
                labels.len()
            );
        }
        Commands::Ingest { file } => {
            let records = read_cleaned_jsonl(&file)?;
            tracing::info!("Read {} cleaned ads from {:?}", records.len(), file);
            run_ingest(&conn, &records)?;
        }
        Commands::Extract { date } => {
            let run_date = exec_date(date.as_deref())?;
            let extractor = RuleExtractor::from_rules(&rules);
            run_extract(&conn, run_date, &extractor)?;
        }
        Commands::Count { date, label } => {
            let run_date = exec_date(date.as_deref())?;
            run_count(&conn, run_date, label.as_deref())?;
        }
    }

    Ok(())
}
