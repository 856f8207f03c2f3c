//! easel-daily - Run one fairness-rotation cycle
//!
//! The cron-facing trigger for the daily poster: picks one item the
//! current round has not fully covered and publishes it to every
//! configured destination.

use clap::Parser;

use libeaselcast::{Config, Database, Result, RotationEngine};

#[derive(Parser, Debug)]
#[command(name = "easel-daily")]
#[command(version)]
#[command(about = "Run one fairness-rotation posting cycle")]
#[command(long_about = "\
easel-daily - Run one fairness-rotation posting cycle

DESCRIPTION:
    easel-daily publishes one randomly selected content item to every
    destination in the rotation set. A persisted round counter guarantees
    every item in the library is posted before any item repeats. Run it
    once a day from cron.

    Per-destination failures are logged and counted but never abort the
    run; a destination that fails is considered handled for this round and
    retried next round.

USAGE:
    easel-daily
    easel-daily --format json

CONFIGURATION:
    Configuration file: ~/.config/easelcast/config.toml
    The [rotation] section lists the destination set.

EXIT CODES:
    0 - Success (even with per-destination failures)
    1 - Runtime error
    4 - No eligible content (library empty or misconfigured)
")]
struct Cli {
    /// Output format: text or json
    #[arg(short, long, default_value = "text")]
    format: String,

    /// Enable verbose logging to stderr
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    libeaselcast::logging::init("info", cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let db = Database::new(&config.store.path).await?;
    let engine = RotationEngine::from_config(&config, db);

    let summary = engine.run_once().await?;

    if cli.format == "json" {
        println!("{}", serde_json::to_string_pretty(&summary).unwrap_or_default());
        return Ok(());
    }

    println!("Round {}: {}", summary.round, summary.title);
    for result in &summary.results {
        if result.success {
            match &result.url {
                Some(url) => println!("  + {}  {}", result.destination, url),
                None => println!("  + {}", result.destination),
            }
        } else {
            println!(
                "  ! {}  {}",
                result.destination,
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
    }
    println!(
        "succeeded: {}  failed: {}",
        summary.succeeded(),
        summary.failed()
    );

    Ok(())
}
