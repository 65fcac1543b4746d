//! Command line entry point for the load generator.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use argh::FromArgs;
use tracing_subscriber::EnvFilter;
use yansi::Paint;

use elastistress::config::Config;
use elastistress::http::HttpRemote;
use elastistress::runner;

/// Mixed read/write load generator for Elasticsearch-compatible endpoints.
#[derive(Debug, FromArgs)]
struct Args {
    /// path to a YAML configuration file
    #[argh(option, short = 'c')]
    config: Option<PathBuf>,

    /// base URL of the target index
    #[argh(option)]
    baseurl: Option<String>,

    /// number of requests to make, 0 means unbounded
    #[argh(option)]
    requests: Option<u64>,

    /// pause between requests per worker, in milliseconds
    #[argh(option)]
    interval: Option<u64>,

    /// number of parallel workers to run
    #[argh(option)]
    workers: Option<usize>,

    /// only test reads
    #[argh(switch)]
    readonly: bool,

    /// show version and exit
    #[argh(switch)]
    version: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Args = argh::from_env();

    if args.version {
        println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    init_tracing();

    let mut config = Config::load(args.config.as_deref())?;
    if let Some(baseurl) = args.baseurl {
        config.base_url = baseurl;
    }
    if let Some(requests) = args.requests {
        config.requests = requests;
    }
    if let Some(interval) = args.interval {
        config.interval = Duration::from_millis(interval);
    }
    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    if args.readonly {
        config.read_only = true;
    }
    config.validate()?;

    print_banner(&config);

    let remote = HttpRemote::new(&config.base_url).context("failed to build the HTTP client")?;
    remote.ensure_index().await?;

    let shutdown = runner::shutdown_token()?;
    let stats = runner::run(&config, remote, shutdown).await;

    println!();
    stats.report();

    Ok(())
}

fn print_banner(config: &Config) {
    println!("Elasticsearch: {}", config.base_url.bold());
    println!("Requests:      {}", config.requests.bold());
    println!("Interval:      {:?}", config.interval.bold());
    println!("Workers:       {}", config.workers.bold());
    println!("ReadOnly:      {}", config.read_only.bold());
    println!();
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
