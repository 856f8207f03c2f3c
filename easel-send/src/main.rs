//! easel-send - Execute due scheduled posts
//!
//! The cron-facing trigger for the schedule queue. By default it runs one
//! batch of due posts and exits, which is the intended way to drive it
//! (cron every five minutes). `--watch` keeps it running with a poll loop
//! and graceful shutdown for setups without a system scheduler.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use tokio::time::{sleep, Duration};
use tracing::info;

use libeaselcast::{Config, Database, Result, Scheduler};

#[derive(Parser, Debug)]
#[command(name = "easel-send")]
#[command(version)]
#[command(about = "Execute due scheduled posts")]
#[command(long_about = "\
easel-send - Execute due scheduled posts

DESCRIPTION:
    easel-send publishes every scheduled post whose time has come. Posts
    run one at a time, in the order they were scheduled; one post's failure
    is recorded and never stops the rest of the batch. Running with nothing
    due is a silent no-op, so it is safe to trigger as often as you like.

USAGE:
    # Run one batch and exit (intended for cron)
    easel-send

    # Keep running, polling every 5 minutes
    easel-send --watch

    # Custom poll interval
    easel-send --watch --poll-interval 60

SIGNALS:
    SIGTERM, SIGINT - graceful shutdown in watch mode (finishes the batch)

CONFIGURATION:
    Configuration file: ~/.config/easelcast/config.toml
    Override with the EASELCAST_CONFIG environment variable.

EXIT CODES:
    0 - Success
    1 - Runtime error
")]
struct Cli {
    /// Keep running and poll for due posts
    #[arg(long)]
    watch: bool,

    /// Seconds between polls in watch mode
    #[arg(long, value_name = "SECONDS", default_value = "300")]
    poll_interval: u64,

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
    let scheduler = Scheduler::from_config(&config, db);

    if !cli.watch {
        let summary = scheduler.execute_due().await?;
        println!("posted: {}  failed: {}", summary.posted, summary.failed);
        return Ok(());
    }

    info!("easel-send watching (poll interval {}s)", cli.poll_interval);

    let shutdown = Arc::new(AtomicBool::new(false));
    setup_signal_handlers(shutdown.clone());

    while !shutdown.load(Ordering::Relaxed) {
        let summary = scheduler.execute_due().await?;
        if summary.posted + summary.failed > 0 {
            info!("batch done: posted {} failed {}", summary.posted, summary.failed);
        }

        // Sleep in one-second slices so shutdown stays responsive
        for _ in 0..cli.poll_interval {
            if shutdown.load(Ordering::Relaxed) {
                break;
            }
            sleep(Duration::from_secs(1)).await;
        }
    }

    info!("easel-send stopped");
    Ok(())
}

fn setup_signal_handlers(shutdown: Arc<AtomicBool>) {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let Ok(mut signals) = Signals::new([SIGINT, SIGTERM]) else {
        tracing::warn!("failed to install signal handlers; Ctrl-C will be abrupt");
        return;
    };

    std::thread::spawn(move || {
        if signals.forever().next().is_some() {
            info!("received shutdown signal, finishing current batch...");
            shutdown.store(true, Ordering::Relaxed);
        }
    });
}
