use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use mistidy_core::db::{self, LoadOptions, PgBackend};
use mistidy_core::outputs::{default_script_path, write_csv_file, write_loader_script, write_parquet};
use mistidy_core::pipeline::{tidy_file, TidyOptions, TidyOutcome};
use mistidy_core::schema::DEFAULT_TABLE_NAME;
use mistidy_core::SerialPolicy;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Turn cross-tab store MIS exports into a tidy long table", long_about = None)]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Reshape an export into a long CSV plus a DuckDB loader script
    Tidy(TidyArgs),
    /// Reshape an export and insert the rows into Postgres
    Load(LoadArgs),
    /// Run a read-only SQL query against Postgres
    Query(QueryArgs),
    /// Show the row count and a sample of the tidy table
    Info(InfoArgs),
}

#[derive(Args, Debug)]
struct InputArgs {
    /// CSV, TSV or workbook export
    #[arg(long, short)]
    input: PathBuf,

    /// Worksheet to read (workbooks only; defaults to the first sheet)
    #[arg(long)]
    sheet: Option<String>,

    /// TOML file with tidy options
    #[arg(long)]
    config: Option<PathBuf>,

    /// Target table name
    #[arg(long)]
    table: Option<String>,

    /// Smallest spreadsheet serial accepted as a month label
    #[arg(long, requires = "max_serial")]
    min_serial: Option<f64>,

    /// Largest spreadsheet serial accepted as a month label
    #[arg(long, requires = "min_serial")]
    max_serial: Option<f64>,
}

#[derive(Args, Debug)]
struct TidyArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Long-format CSV to write
    #[arg(long, short)]
    output: PathBuf,

    /// Loader script path (defaults to duckdb_load.sql next to the output)
    #[arg(long)]
    sql: Option<PathBuf>,

    /// Also write the table as Parquet
    #[arg(long)]
    parquet: Option<PathBuf>,

    /// Print a run summary
    #[arg(long, short)]
    verbose: bool,
}

#[derive(Args, Debug)]
struct LoadArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Rows per INSERT statement
    #[arg(long, default_value_t = LoadOptions::default().batch_size)]
    batch_size: usize,

    /// Skip the CREATE TABLE / CREATE INDEX step
    #[arg(long)]
    no_create: bool,
}

#[derive(Args, Debug)]
struct QueryArgs {
    /// SELECT or WITH statement
    sql: String,

    /// Give up after this many seconds
    #[arg(long, default_value_t = db::DEFAULT_QUERY_TIMEOUT.as_secs())]
    timeout_secs: u64,
}

#[derive(Args, Debug)]
struct InfoArgs {
    #[arg(long, default_value = DEFAULT_TABLE_NAME)]
    table: String,

    #[arg(long, default_value_t = db::DEFAULT_QUERY_TIMEOUT.as_secs())]
    timeout_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match cli.command {
        Command::Tidy(args) => run_tidy(args),
        Command::Load(args) => run_load(args).await,
        Command::Query(args) => {
            let backend = backend(args.timeout_secs).await?;
            let output = db::run_read_only(&backend, &args.sql).await?;
            println!("{output}");
            Ok(())
        }
        Command::Info(args) => {
            let backend = backend(args.timeout_secs).await?;
            let output = db::table_info(&backend, &args.table).await?;
            println!("{output}");
            Ok(())
        }
    }
}

fn init_tracing(json: bool) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn tidy_options(args: &InputArgs) -> Result<TidyOptions> {
    let mut options = match &args.config {
        Some(path) => TidyOptions::from_path(path)
            .with_context(|| format!("failed to load config '{}'", path.display()))?,
        None => TidyOptions::default(),
    };
    if let Some(table) = &args.table {
        options.table_name = table.clone();
    }
    if let (Some(min), Some(max)) = (args.min_serial, args.max_serial) {
        options.serial_policy = SerialPolicy::Bounded { min, max };
    }
    options.validate()?;
    Ok(options)
}

fn read_input(args: &InputArgs, options: &TidyOptions) -> Result<TidyOutcome> {
    if !args.input.exists() {
        bail!("input file '{}' not found", args.input.display());
    }
    let outcome = tidy_file(&args.input, args.sheet.as_deref(), options)
        .with_context(|| format!("failed to tidy '{}'", args.input.display()))?;
    if outcome.report.header_fallback {
        warn!("header row not detected; row 0 was used");
    }
    Ok(outcome)
}

fn run_tidy(args: TidyArgs) -> Result<()> {
    let options = tidy_options(&args.input)?;
    let outcome = read_input(&args.input, &options)?;

    write_csv_file(&outcome.table, &args.output)
        .with_context(|| format!("failed to write '{}'", args.output.display()))?;
    let script_path = args
        .sql
        .clone()
        .unwrap_or_else(|| default_script_path(&args.output));
    write_loader_script(&options.table_name, &args.output, &script_path)
        .with_context(|| format!("failed to write '{}'", script_path.display()))?;
    if let Some(parquet) = &args.parquet {
        write_parquet(&outcome.table, parquet)
            .with_context(|| format!("failed to write '{}'", parquet.display()))?;
    }

    println!("Processed {} rows", outcome.table.len());
    println!("Output CSV: {}", args.output.display());
    println!("Loader script: {}", script_path.display());
    if let Some(parquet) = &args.parquet {
        println!("Parquet: {}", parquet.display());
    }
    if args.verbose {
        println!();
        println!("{}", outcome.report);
    }
    Ok(())
}

async fn run_load(args: LoadArgs) -> Result<()> {
    let options = tidy_options(&args.input)?;
    let outcome = read_input(&args.input, &options)?;
    let pool = connect_pool().await?;

    let load = LoadOptions {
        batch_size: args.batch_size,
        create_table: !args.no_create,
    };
    let summary = db::load_rows(&pool, &options.table_name, outcome.table.rows(), &load).await?;

    println!(
        "Inserted {} of {} rows into {} ({} failed)",
        summary.inserted, summary.attempted, options.table_name, summary.failed
    );
    if summary.failed > 0 {
        warn!(failed = summary.failed, "some rows were not inserted");
    }
    Ok(())
}

async fn backend(timeout_secs: u64) -> Result<PgBackend> {
    let pool = connect_pool().await?;
    Ok(PgBackend::new(pool).with_timeout(Duration::from_secs(timeout_secs)))
}

async fn connect_pool() -> Result<db::DbPool> {
    let database_url = std::env::var("DATABASE_URL")
        .or_else(|_| std::env::var("MISTIDY_DATABASE_URL"))
        .context("DATABASE_URL (or MISTIDY_DATABASE_URL) must be set")?;
    let pool = db::connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;
    info!("database pool ready");
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn tidy_accepts_short_flags_and_defaults() {
        let cli = Cli::try_parse_from(["mistidy", "tidy", "-i", "in.csv", "-o", "out.csv"]).unwrap();
        let Command::Tidy(args) = cli.command else {
            panic!("expected tidy");
        };
        assert_eq!(args.input.input, PathBuf::from("in.csv"));
        assert!(args.sql.is_none());
        assert!(!args.verbose);

        let options = tidy_options(&args.input).unwrap();
        assert_eq!(options, TidyOptions::default());
    }

    #[test]
    fn serial_bounds_come_as_a_pair() {
        assert!(Cli::try_parse_from([
            "mistidy", "tidy", "-i", "in.csv", "-o", "out.csv", "--min-serial", "30000"
        ])
        .is_err());

        let cli = Cli::try_parse_from([
            "mistidy",
            "tidy",
            "-i",
            "in.csv",
            "-o",
            "out.csv",
            "--min-serial",
            "30000",
            "--max-serial",
            "60000",
            "--table",
            "btc_mis",
        ])
        .unwrap();
        let Command::Tidy(args) = cli.command else {
            panic!("expected tidy");
        };
        let options = tidy_options(&args.input).unwrap();
        assert_eq!(
            options.serial_policy,
            SerialPolicy::Bounded {
                min: 30000.0,
                max: 60000.0
            }
        );
        assert_eq!(options.table_name, "btc_mis");
    }

    #[test]
    fn bad_table_name_is_rejected_before_any_work() {
        let cli = Cli::try_parse_from([
            "mistidy", "load", "-i", "in.csv", "--table", "mis long",
        ])
        .unwrap();
        let Command::Load(args) = cli.command else {
            panic!("expected load");
        };
        assert!(tidy_options(&args.input).is_err());
        assert_eq!(args.batch_size, 1000);
    }

    #[test]
    fn query_takes_positional_sql() {
        let cli = Cli::try_parse_from(["mistidy", "query", "SELECT 1", "--log-json"]).unwrap();
        assert!(cli.log_json);
        let Command::Query(args) = cli.command else {
            panic!("expected query");
        };
        assert_eq!(args.sql, "SELECT 1");
        assert_eq!(args.timeout_secs, 120);
    }
}
