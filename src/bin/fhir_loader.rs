//! fhir-loader: Load a directory of FHIR bundles into PostgreSQL
//!
//! Every `*.json` bundle in the data directory is flattened, split by resource
//! type, and each allowed resource type is written to its own table.
//!
//! Usage:
//!   # Load ./data into database `fhir_db`
//!   fhir-loader --database-name fhir_db --database-user postgres --database-password secret
//!
//!   # Different server and data directory
//!   fhir-loader --database-name fhir_db --database-user etl --database-password secret \
//!       --database-host db.internal --database-port 5433 --data-dir ./bundles
//!
//!   # Show the tables that would be created, without touching the database
//!   fhir-loader --dry-run --data-dir ./bundles
//!
//! Credentials may also come from FHIR_LOADER_* environment variables or a
//! `.env` file.

// MiMalloc allocator, as recommended for simd-json
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{Context, Result};
use clap::Parser;
use fhir_loader::logging::{init_logging, LoggingConfig};
use fhir_loader::{DatabaseSettings, Loader, LoaderConfig, LoaderError};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "fhir-loader")]
#[command(about = "Load FHIR bundles into PostgreSQL tables, one per resource type", long_about = None)]
struct Args {
    /// Name of the target database (created if missing)
    #[arg(long, env = "FHIR_LOADER_DATABASE_NAME", required_unless_present = "dry_run")]
    database_name: Option<String>,

    /// Database user
    #[arg(long, env = "FHIR_LOADER_DATABASE_USER", required_unless_present = "dry_run")]
    database_user: Option<String>,

    /// Database password
    #[arg(
        long,
        env = "FHIR_LOADER_DATABASE_PASSWORD",
        hide_env_values = true,
        required_unless_present = "dry_run"
    )]
    database_password: Option<String>,

    /// Database host
    #[arg(long, env = "FHIR_LOADER_DATABASE_HOST", default_value = "localhost")]
    database_host: String,

    /// Database port
    #[arg(long, env = "FHIR_LOADER_DATABASE_PORT", default_value_t = 5432)]
    database_port: u16,

    /// Database used to check for and create the target database
    #[arg(long, default_value = "postgres")]
    admin_database: String,

    /// Directory containing the bundle files
    #[arg(long, env = "FHIR_LOADER_DATA_DIR", default_value = "data")]
    data_dir: PathBuf,

    /// Object levels below each entry expanded into columns (default: 2)
    #[arg(long)]
    max_level: Option<usize>,

    /// Comma-separated resource types to load (default: the 13 standard types)
    #[arg(long)]
    resource_types: Option<String>,

    /// Print the CREATE TABLE statements and row counts without connecting
    #[arg(long)]
    dry_run: bool,

    /// Log level for the loader (overridden by RUST_LOG)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log as JSON lines
    #[arg(long)]
    log_json: bool,
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let logging = LoggingConfig {
        level: args.log_level.clone(),
        json: args.log_json,
    };
    if let Err(e) = init_logging(&logging) {
        eprintln!("Failed to initialize logging: {e:#}");
        return ExitCode::FAILURE;
    }

    match run(args) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "Load aborted");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<ExitCode> {
    let start = Instant::now();

    let config = loader_config(&args);
    let loader = match Loader::new(config) {
        Ok(loader) => loader,
        Err(e) => return Ok(fail(&e)),
    };

    let prepared = match loader.prepare() {
        Ok(prepared) => prepared,
        Err(e) => return Ok(fail(&e)),
    };

    if args.dry_run {
        let statements = match loader.create_statements(&prepared) {
            Ok(statements) => statements,
            Err(e) => return Ok(fail(&e)),
        };
        for ((table, sql), partition) in statements.iter().zip(&prepared.tables) {
            println!("-- {} ({} rows)", table, partition.len());
            println!("{}", sql);
        }
        return Ok(ExitCode::SUCCESS);
    }

    let settings = match database_settings(&args) {
        Ok(settings) => settings,
        Err(e) => return Ok(fail(&e)),
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    let report = match runtime.block_on(loader.load(&prepared, &settings)) {
        Ok(report) => report,
        Err(e) => return Ok(fail(&e)),
    };

    tracing::info!(
        tables = report.outcomes.len(),
        failed = report.failures().count(),
        rows = report.loaded_rows(),
        elapsed_secs = start.elapsed().as_secs_f64(),
        "Load finished"
    );

    Ok(match report.first_failure() {
        Some(e) => ExitCode::from(e.exit_code()),
        None => ExitCode::SUCCESS,
    })
}

fn loader_config(args: &Args) -> LoaderConfig {
    let mut config = LoaderConfig {
        data_dir: args.data_dir.clone(),
        ..LoaderConfig::default()
    };

    if let Some(level) = args.max_level {
        config.flatten.max_level = level;
    }
    if let Some(types_str) = &args.resource_types {
        config.resource_types = types_str
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
    }

    config
}

fn database_settings(args: &Args) -> fhir_loader::Result<DatabaseSettings> {
    let required = |value: &Option<String>, name: &str| {
        value
            .clone()
            .ok_or_else(|| LoaderError::Config(format!("--{} is required", name)))
    };

    let mut settings = DatabaseSettings::new(
        required(&args.database_name, "database-name")?,
        required(&args.database_user, "database-user")?,
        required(&args.database_password, "database-password")?,
    );
    settings.host = args.database_host.clone();
    settings.port = args.database_port;
    settings.admin_database = args.admin_database.clone();

    Ok(settings)
}

fn fail(error: &LoaderError) -> ExitCode {
    tracing::error!(kind = error.kind(), error = %error, "Load failed");
    ExitCode::from(error.exit_code())
}
