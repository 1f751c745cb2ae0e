use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "roundsight", about = "Round outcome analysis and next-round forecasting")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Poll the history feed and serve forecasts over HTTP
    Serve {
        #[arg(long, env = "FEED_URL")]
        feed_url: String,
        #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:5000")]
        bind: SocketAddr,
        #[arg(long, default_value = "5")]
        interval_secs: u64,
        #[arg(long, default_value = "10")]
        timeout_secs: u64,
        /// Fixed seed for reproducible forecasts
        #[arg(long)]
        seed: Option<u64>,
        /// Retained rounds, 0 keeps everything, otherwise at least 100
        #[arg(long, default_value = "500")]
        max_history: usize,
    },
    /// Fetch one feed snapshot and cache it as CSV
    Fetch {
        #[arg(long, env = "FEED_URL")]
        feed_url: String,
        #[arg(short, long, default_value = "data/rounds.csv")]
        out: String,
        #[arg(long, default_value = "10")]
        timeout_secs: u64,
    },
    /// Replay a cached history through a fresh engine and report accuracy
    Replay {
        #[arg(short, long, default_value = "data/rounds.csv")]
        input: String,
        #[arg(long, default_value = "42")]
        seed: u64,
        /// Rounds fed as the first snapshot
        #[arg(short, long, default_value = "20")]
        warmup: usize,
        /// Extra seeds to sweep, e.g. 5 replays seeds seed..seed+5
        #[arg(long, default_value = "0")]
        sweep: u64,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("roundsight=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            feed_url,
            bind,
            interval_secs,
            timeout_secs,
            seed,
            max_history,
        } => {
            let config = roundsight::server::ServerConfig {
                bind,
                feed_url,
                poll_interval: Duration::from_secs(interval_secs.max(1)),
                request_timeout: Duration::from_secs(timeout_secs),
            };
            run_serve(config, seed, max_history).await?;
        }
        Commands::Fetch {
            feed_url,
            out,
            timeout_secs,
        } => {
            run_fetch(&feed_url, &out, timeout_secs).await?;
        }
        Commands::Replay {
            input,
            seed,
            warmup,
            sweep,
        } => {
            run_replay(&input, seed, warmup, sweep)?;
        }
    }

    Ok(())
}

async fn run_serve(
    config: roundsight::server::ServerConfig,
    seed: Option<u64>,
    max_history: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    use roundsight::data::HttpFeed;
    use roundsight::domain::EngineConfig;
    use roundsight::engine::Engine;

    let engine_config = EngineConfig {
        max_history,
        ..Default::default()
    };
    engine_config.validate()?;
    let engine = match seed {
        Some(seed) => Engine::with_seed(engine_config, seed),
        None => Engine::new(engine_config),
    };
    let feed = HttpFeed::new(config.feed_url.clone(), config.request_timeout)?;

    roundsight::server::run_server(config, engine, feed).await?;
    Ok(())
}

async fn run_fetch(
    feed_url: &str,
    out: &str,
    timeout_secs: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    use roundsight::data::{save_outcomes_csv, HistoryFeed, HttpFeed};

    let feed = HttpFeed::new(feed_url, Duration::from_secs(timeout_secs))?;
    let snapshot = feed.fetch().await?;
    let outcomes = roundsight::domain::normalize_snapshot(&snapshot)?;

    if let Some(dir) = std::path::Path::new(out).parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)?;
        }
    }
    save_outcomes_csv(&outcomes, out)?;
    println!("Fetched and cached {} rounds at {}", outcomes.len(), out);
    Ok(())
}

fn run_replay(
    input: &str,
    seed: u64,
    warmup: usize,
    sweep: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    use roundsight::backtest::{replay, seed_sweep};
    use roundsight::domain::EngineConfig;
    use roundsight::engine::Engine;

    let rounds = roundsight::data::load_rounds_csv(input)?;
    println!("=== roundsight replay ===");
    println!("Input: {} ({} rounds), seed {}, warmup {}", input, rounds.len(), seed, warmup);

    let config = EngineConfig::default();
    let mut engine = Engine::with_seed(config.clone(), seed);
    let result = replay(&mut engine, &rounds, warmup)?;
    result.print_summary();

    if sweep > 0 {
        let seeds: Vec<u64> = (seed..seed + sweep).collect();
        seed_sweep(&rounds, &config, &seeds, warmup)?.print_summary();
    }
    Ok(())
}
