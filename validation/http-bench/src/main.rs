//! HTTP benchmark CLI.

use std::path::{Path, PathBuf};

use anyhow::anyhow;
use bench_core::ProtocolVersion;
use clap::{Parser, Subcommand, ValueEnum};
use http_bench::{BenchConfig, LoadRunner, ResultsReport, RunResults};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "http-bench")]
#[command(about = "Issue a fixed number of GET requests over a fixed number of connections", long_about = None)]
struct Cli {
    /// Log level, overridden by RUST_LOG
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a benchmark from a scenario file
    Run {
        /// Path to scenario YAML file
        #[arg(short, long)]
        scenario: PathBuf,

        /// Override number of concurrent connections
        #[arg(short, long)]
        concurrency: Option<usize>,

        /// Override total number of requests
        #[arg(short = 'n', long)]
        requests: Option<usize>,

        /// Force keep-alive on
        #[arg(short, long)]
        keep_alive: bool,

        /// Override HTTP protocol version (1.0, 1.1, 2.0)
        #[arg(short, long)]
        protocol_version: Option<ProtocolVersion>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },

    /// Benchmark a single URI directly
    Quick {
        /// Target URI
        #[arg(short, long)]
        uri: String,

        /// Number of concurrent connections
        #[arg(short, long, default_value = "1")]
        concurrency: usize,

        /// Total number of requests
        #[arg(short = 'n', long, default_value = "1")]
        requests: usize,

        /// Reuse connections between requests
        #[arg(short, long)]
        keep_alive: bool,

        /// HTTP protocol version (1.0, 1.1, 2.0)
        #[arg(short, long, default_value = "1.1")]
        protocol_version: ProtocolVersion,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },

    /// List available scenarios
    List {
        /// Scenarios directory
        #[arg(short, long, default_value = "scenarios")]
        dir: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.log_format)?;

    match cli.command {
        Commands::Run {
            scenario,
            concurrency,
            requests,
            keep_alive,
            protocol_version,
            output,
        } => {
            println!("Loading scenario: {}", scenario.display());

            let mut config = BenchConfig::from_file(&scenario)?;

            // Apply overrides
            if let Some(c) = concurrency {
                config.concurrency = c;
            }
            if let Some(n) = requests {
                config.requests = n;
            }
            if keep_alive {
                config.keep_alive = true;
            }
            if let Some(p) = protocol_version {
                config.protocol_version = p;
            }

            config.validate()?;

            println!("✓ Configuration loaded successfully");
            println!("  Name: {}", config.name);
            println!("  Description: {}", config.description);
            println!("  Target: {}", config.uri);
            println!("  Concurrency: {}", config.concurrency);
            println!("  Requests: {}", config.requests);
            println!();

            let results = run_benchmark(config).await?;
            print_results(&results, output)
        }
        Commands::Quick {
            uri,
            concurrency,
            requests,
            keep_alive,
            protocol_version,
            output,
        } => {
            let mut config = BenchConfig::quick(uri, concurrency, requests);
            config.keep_alive = keep_alive;
            config.protocol_version = protocol_version;

            let results = run_benchmark(config).await?;
            print_results(&results, output)
        }
        Commands::List { dir } => {
            list_scenarios(&dir);
            Ok(())
        }
    }
}

fn init_tracing(level: &str, format: LogFormat) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true);

    let installed = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|e| anyhow!("Failed to initialize logging: {}", e))
}

/// Run `config`, cancelling cooperatively on Ctrl-C.
async fn run_benchmark(config: BenchConfig) -> anyhow::Result<RunResults> {
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing in-flight requests");
            on_interrupt.cancel();
        }
    });

    let runner = LoadRunner::new(config);
    let results = runner.run(cancel).await?;
    info!(
        processed = results.summary.processed,
        cancelled = results.cancelled,
        "Benchmark finished"
    );
    Ok(results)
}

fn print_results(results: &RunResults, output: OutputFormat) -> anyhow::Result<()> {
    match output {
        OutputFormat::Json => {
            println!("{}", ResultsReport::format_json(results)?);
        }
        OutputFormat::Csv => {
            println!("{}", ResultsReport::csv_header());
            println!("{}", ResultsReport::format_csv(results));
        }
        OutputFormat::Table => {
            println!("{}", ResultsReport::format_table(results));
        }
    }
    Ok(())
}

fn list_scenarios(dir: &Path) {
    println!("Available scenarios in {}:", dir.display());
    println!();

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            eprintln!("Error reading directory: {}", e);
            eprintln!("Make sure the directory exists and is readable");
            return;
        }
    };

    let mut scenarios = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) != Some("yaml") {
            continue;
        }
        let Some(filename) = path.file_name().map(|f| f.to_string_lossy().to_string()) else {
            continue;
        };
        match BenchConfig::from_file(&path) {
            Ok(config) => scenarios.push((filename, config)),
            Err(e) => warn!(file = %filename, error = %e, "Skipping unreadable scenario"),
        }
    }

    scenarios.sort_by(|a, b| a.0.cmp(&b.0));

    if scenarios.is_empty() {
        println!("No scenario files found");
        return;
    }
    for (filename, config) in scenarios {
        println!("  {} - {}", filename, config.name);
        println!("    {}", config.description);
        println!(
            "    {} requests, concurrency {}, keep-alive {}, HTTP {}",
            config.requests, config.concurrency, config.keep_alive, config.protocol_version
        );
        println!();
    }
}
