/// Version injected at compile time via CFAPI_VERSION env var (set by CI/CD),
/// or "dev" for local builds.
pub const VERSION: &str = match option_env!("CFAPI_VERSION") {
    Some(v) => v,
    None => "dev",
};

use anyhow::{Context, Result};
use cfapi::api::http::format_api_error;
use cfapi::error::{BatchError, ListError};
use cfapi::resource::{DnsFilter, ObjectFilter, ZoneFilter};
use cfapi::types::ZoneStatus;
use cfapi::{Client, Config, Listing, Metrics, Paginated};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use uuid::Uuid;

/// Cloudflare administrative API client
#[derive(Parser, Debug)]
#[command(name = "cfapi", version = VERSION, about, long_about = None)]
struct Args {
    /// Account for D1, R2, members and roles
    #[arg(long, global = true, env = "CLOUDFLARE_ACCOUNT_ID")]
    account_id: Option<String>,

    /// API token
    #[arg(long, global = true, env = "CLOUDFLARE_API_TOKEN", hide_env_values = true)]
    api_token: Option<String>,

    /// API root URL
    #[arg(long, global = true, env = "CLOUDFLARE_BASE_URL")]
    base_url: Option<String>,

    /// Items requested per page
    #[arg(long, global = true)]
    per_page: Option<u32>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "json")]
    output: OutputFormat,

    /// Log level for debugging
    #[arg(long, global = true, value_enum, default_value = "off")]
    log_level: LogLevel,

    /// Remember --account-id in the config file
    #[arg(long, global = true)]
    save: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Zones
    Zones {
        #[command(subcommand)]
        command: ZonesCommand,
    },
    /// DNS records
    Dns {
        #[command(subcommand)]
        command: DnsCommand,
    },
    /// List accounts
    Accounts,
    /// List account members
    Members,
    /// List account roles
    Roles,
    /// D1 databases
    D1 {
        #[command(subcommand)]
        command: D1Command,
    },
    /// R2 buckets and objects
    R2 {
        #[command(subcommand)]
        command: R2Command,
    },
}

#[derive(Subcommand, Debug)]
enum ZonesCommand {
    List {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        status: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum DnsCommand {
    List {
        zone_id: String,
        #[arg(long)]
        name: Option<String>,
    },
    /// Delete records one by one, reporting those that failed
    Delete {
        zone_id: String,
        #[arg(required = true)]
        record_ids: Vec<String>,
    },
}

#[derive(Subcommand, Debug)]
enum D1Command {
    List {
        #[arg(long)]
        name: Option<String>,
    },
    Query {
        database_id: Uuid,
        sql: String,
    },
}

#[derive(Subcommand, Debug)]
enum R2Command {
    Buckets {
        #[arg(long)]
        name_contains: Option<String>,
    },
    Objects {
        bucket: String,
        #[arg(long)]
        prefix: Option<String>,
        #[arg(long)]
        delimiter: Option<String>,
    },
    /// Delete objects one by one, reporting the keys that failed
    Delete {
        bucket: String,
        #[arg(required = true)]
        keys: Vec<String>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Yaml,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(level: LogLevel) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let Some(tracing_level) = level.to_tracing_level() else {
        return Ok(None);
    };

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {:?}", log_path))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("cfapi started with log level: {:?}", level);
    tracing::info!("Log file: {:?}", log_path);

    Ok(Some(guard))
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("cfapi").join("cfapi.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".cfapi").join("cfapi.log");
    }
    PathBuf::from("cfapi.log")
}

/// Resolve configuration (CLI > env > config file)
fn resolve_config(args: &Args) -> Result<Config> {
    let mut config = Config::load();

    if let Some(account_id) = &args.account_id {
        config.account_id = Some(account_id.clone());
        if args.save {
            config
                .set_account(account_id)
                .context("Failed to save configuration")?;
        }
    }
    if let Some(token) = &args.api_token {
        config.api_token = Some(token.clone());
    }
    if let Some(base_url) = &args.base_url {
        config.base_url = Some(base_url.clone());
    }
    if let Some(per_page) = args.per_page {
        config.per_page = Some(per_page);
    }

    Ok(config)
}

fn print<T: Serialize>(value: &T, format: OutputFormat) -> Result<()> {
    let rendered = match format {
        OutputFormat::Json => serde_json::to_string_pretty(value)?,
        OutputFormat::Yaml => serde_yaml::to_string(value)?,
    };
    println!("{}", rendered);
    Ok(())
}

fn report_metrics(metrics: &Metrics) {
    if !metrics.is_zero() {
        eprintln!("Usage: {}", metrics);
    }
}

/// Drain a listing, printing whatever was retrieved even on failure
async fn print_listing<T>(pages: Paginated<'static, T>, format: OutputFormat) -> Result<()>
where
    T: Serialize + std::fmt::Debug + Send + Sync + 'static,
{
    match pages.collect().await {
        Ok(Listing { items, metrics }) => {
            print(&items, format)?;
            report_metrics(&metrics);
            Ok(())
        }
        Err(ListError::Partial(failure)) => {
            print(&failure.data, format)?;
            report_metrics(&failure.metrics);
            eprintln!("Listing stopped after {} items", failure.data.len());
            Err(anyhow::anyhow!(format_api_error(&failure.cause)))
        }
        Err(err @ ListError::Cancelled) => Err(err.into()),
    }
}

/// Report a batch outcome, listing the items to retry on partial failure
fn report_batch(outcome: std::result::Result<Metrics, BatchError<String>>, total: usize) -> Result<()> {
    match outcome {
        Ok(metrics) => {
            eprintln!("Deleted {} items", total);
            report_metrics(&metrics);
            Ok(())
        }
        Err(BatchError::Partial(failure)) => {
            report_metrics(&failure.metrics);
            for (item, err) in failure.failed.iter().zip(&failure.errors) {
                eprintln!("  {}: {}", item, format_api_error(err));
            }
            Err(anyhow::anyhow!(failure.message))
        }
        Err(BatchError::Invalid(err)) => Err(err.into()),
        Err(err @ BatchError::Cancelled) => Err(err.into()),
    }
}

async fn run(args: Args, config: Config, cancel: CancellationToken) -> Result<()> {
    let client = Client::new(&config)?;
    let format = args.output;

    match args.command {
        Command::Zones {
            command: ZonesCommand::List { name, status },
        } => {
            let filter = ZoneFilter {
                name,
                status: status.map(ZoneStatus::from),
                account_id: None,
            };
            print_listing(client.zones().list(&filter, cancel), format).await
        }
        Command::Dns {
            command: DnsCommand::List { zone_id, name },
        } => {
            let filter = DnsFilter {
                name,
                ..Default::default()
            };
            print_listing(client.dns().list(&zone_id, &filter, cancel)?, format).await
        }
        Command::Dns {
            command: DnsCommand::Delete { zone_id, record_ids },
        } => {
            let total = record_ids.len();
            let outcome = client.dns().delete_many(&zone_id, record_ids, &cancel).await;
            report_batch(outcome, total)
        }
        Command::Accounts => print_listing(client.accounts().list(None, cancel), format).await,
        Command::Members => print_listing(client.members().list(None, cancel)?, format).await,
        Command::Roles => print_listing(client.roles().list(cancel)?, format).await,
        Command::D1 {
            command: D1Command::List { name },
        } => print_listing(client.d1().list(name.as_deref(), cancel)?, format).await,
        Command::D1 {
            command: D1Command::Query { database_id, sql },
        } => {
            let outcome = client.d1().query(&database_id, &sql, &[]).await?;
            print(&outcome.value, format)?;
            report_metrics(&outcome.metrics);
            Ok(())
        }
        Command::R2 {
            command: R2Command::Buckets { name_contains },
        } => {
            let pages = client.r2().list_buckets(name_contains.as_deref(), cancel)?;
            print_listing(pages, format).await
        }
        Command::R2 {
            command: R2Command::Objects {
                bucket,
                prefix,
                delimiter,
            },
        } => {
            let filter = ObjectFilter { prefix, delimiter };
            print_listing(client.r2().list_objects(&bucket, &filter, cancel)?, format).await
        }
        Command::R2 {
            command: R2Command::Delete { bucket, keys },
        } => {
            let total = keys.len();
            let outcome = client.r2().delete_objects(&bucket, keys, &cancel).await;
            report_batch(outcome, total)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level)?;
    let config = resolve_config(&args)?;

    // Ctrl-C stops listings and batches before their next request
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, cancelling");
            on_signal.cancel();
        }
    });

    run(args, config, cancel).await
}
