//! Candlekeep CLI: fetch day-segmented OHLCV history from crypto exchanges.
//!
//! Commands:
//! - `fetch`: download every exchange × symbol × interval × day combination to CSV
//! - `symbols`: list an exchange's tradable spot symbols

use anyhow::{bail, Context, Result};
use candlekeep_core::config::{DaySelection, RunConfig};
use candlekeep_core::domain::Interval;
use candlekeep_core::exchange::{ExchangeClient, ExchangeId, HttpOptions};
use candlekeep_core::fetch::{BatchDriver, BatchReport, DayFetcher, Pacer, TracingProgress};
use candlekeep_core::store::CsvStore;
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "candlekeep",
    version,
    about = "Candlekeep: day-by-day OHLCV history for crypto spot markets"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch candles and save one CSV per exchange, symbol, interval and day.
    Fetch {
        /// TOML run config. Flags below override its values.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Exchange id (binance, okex, huobipro). Repeatable.
        #[arg(long = "exchange")]
        exchanges: Vec<String>,

        /// Explicit symbol such as BTC/USDT. Repeatable; default is every listed symbol.
        #[arg(long = "symbol")]
        symbols: Vec<String>,

        /// Quote asset filter (default USDT).
        #[arg(long)]
        quote: Option<String>,

        /// Candle interval such as 5m or 1h. Repeatable.
        #[arg(long = "interval")]
        intervals: Vec<String>,

        /// Single UTC day (YYYY-MM-DD). Defaults to yesterday.
        #[arg(long, conflicts_with_all = ["start", "end"])]
        day: Option<String>,

        /// First day of an inclusive range (YYYY-MM-DD).
        #[arg(long, requires = "end")]
        start: Option<String>,

        /// Last day of an inclusive range (YYYY-MM-DD).
        #[arg(long, requires = "start")]
        end: Option<String>,

        /// Root directory for the CSV tree.
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Delay between exchange requests, in milliseconds.
        #[arg(long)]
        page_delay_ms: Option<u64>,
    },
    /// List tradable spot symbols on an exchange.
    Symbols {
        /// Exchange id (binance, okex, huobipro).
        #[arg(long)]
        exchange: String,

        /// Only show symbols quoted in this asset.
        #[arg(long)]
        quote: Option<String>,

        /// TOML run config; only its `[http]` table is used here.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

/// Flag overrides for `fetch`, applied on top of the config file.
struct FetchArgs {
    config: Option<PathBuf>,
    exchanges: Vec<String>,
    symbols: Vec<String>,
    quote: Option<String>,
    intervals: Vec<String>,
    day: Option<String>,
    start: Option<String>,
    end: Option<String>,
    output_dir: Option<PathBuf>,
    page_delay_ms: Option<u64>,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Fetch {
            config,
            exchanges,
            symbols,
            quote,
            intervals,
            day,
            start,
            end,
            output_dir,
            page_delay_ms,
        } => run_fetch(FetchArgs {
            config,
            exchanges,
            symbols,
            quote,
            intervals,
            day,
            start,
            end,
            output_dir,
            page_delay_ms,
        }),
        Commands::Symbols {
            exchange,
            quote,
            config,
        } => run_symbols(&exchange, quote.as_deref(), config.as_deref()),
    }
}

/// Log to stderr, filtered by `RUST_LOG` (default `info`).
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_fetch(args: FetchArgs) -> Result<()> {
    let config = build_config(args)?;
    let today = Utc::now().date_naive();
    let plan = config.plan(today)?;
    info!(
        exchanges = config.exchanges.len(),
        intervals = plan.intervals.len(),
        days = plan.days.len(),
        output = %config.output_dir.display(),
        "starting fetch"
    );

    let clients = config
        .exchanges
        .iter()
        .map(|id| {
            id.connect(&config.http)
                .with_context(|| format!("failed to set up client for {id}"))
        })
        .collect::<Result<Vec<Box<dyn ExchangeClient>>>>()?;

    let store = CsvStore::new(&config.output_dir);
    let fetcher = DayFetcher::new(Pacer::new(config.page_delay()));
    let driver = BatchDriver::new(fetcher, plan);

    let report = driver.run(&clients, &store, &TracingProgress);
    print_report(&report, &store);

    if !report.all_succeeded() {
        std::process::exit(1);
    }

    Ok(())
}

fn build_config(args: FetchArgs) -> Result<RunConfig> {
    let mut config = match &args.config {
        Some(path) => RunConfig::from_file(path)?,
        None => RunConfig::default(),
    };

    if !args.exchanges.is_empty() {
        config.exchanges = args
            .exchanges
            .iter()
            .map(|s| parse_exchange(s))
            .collect::<Result<_>>()?;
    }
    if !args.symbols.is_empty() {
        config.symbols = Some(args.symbols);
    }
    if let Some(quote) = args.quote {
        config.quote_asset = quote;
    }
    if !args.intervals.is_empty() {
        config.intervals = args
            .intervals
            .iter()
            .map(|s| s.parse::<Interval>())
            .collect::<Result<_, _>>()?;
    }

    match (args.day, args.start, args.end) {
        (Some(day), _, _) => config.days = DaySelection::Single(parse_date(&day)?),
        (None, Some(start), Some(end)) => {
            config.days = DaySelection::Range {
                start: parse_date(&start)?,
                end: parse_date(&end)?,
            }
        }
        (None, None, None) => {}
        _ => bail!("--start and --end must be given together"),
    }

    if let Some(dir) = args.output_dir {
        config.output_dir = dir;
    }
    if let Some(ms) = args.page_delay_ms {
        config.page_delay_ms = ms;
    }

    config.validate()?;
    Ok(config)
}

fn run_symbols(exchange: &str, quote: Option<&str>, config: Option<&Path>) -> Result<()> {
    let id = parse_exchange(exchange)?;
    let http = http_options(config)?;
    let client = id
        .connect(&http)
        .with_context(|| format!("failed to set up client for {id}"))?;
    let symbols = client
        .list_symbols()
        .with_context(|| format!("failed to list symbols on {id}"))?;

    let suffix = quote.map(|q| format!("/{q}"));
    let mut shown = 0usize;
    for symbol in symbols
        .iter()
        .filter(|s| suffix.as_deref().map_or(true, |suffix| s.ends_with(suffix)))
    {
        println!("{symbol}");
        shown += 1;
    }
    eprintln!("{shown} symbols on {id}");

    Ok(())
}

fn http_options(config: Option<&Path>) -> Result<HttpOptions> {
    Ok(match config {
        Some(path) => RunConfig::from_file(path)?.http,
        None => HttpOptions::default(),
    })
}

fn print_report(report: &BatchReport, store: &CsvStore) {
    println!();
    println!("=== Fetch Summary ===");
    println!("Output:     {}", store.root().display());
    println!("Attempted:  {}", report.attempted);
    println!("Saved:      {}", report.saved);
    println!("Empty:      {}", report.empty);
    println!("Failed:     {}", report.failures.len());

    if !report.all_succeeded() {
        println!();
        println!("Failed combinations:");
        for failure in &report.failures {
            println!("  {failure}");
        }
    }
}

fn parse_exchange(s: &str) -> Result<ExchangeId> {
    s.parse::<ExchangeId>().map_err(anyhow::Error::msg)
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("invalid date '{s}'"))
}
