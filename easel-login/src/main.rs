//! easel-login - Track manual logins for browser-session destinations
//!
//! Destinations like Cara are driven through a persistent browser session
//! that a human must re-establish every few weeks. This tool records when
//! that last happened and warns before the session expires, so the daily
//! poster does not silently start failing.

use clap::{Parser, Subcommand};

use libeaselcast::{Config, Database, Result, SessionState, SessionStatus, SessionTracker};

#[derive(Parser, Debug)]
#[command(name = "easel-login")]
#[command(version)]
#[command(about = "Track manual logins for browser-session destinations")]
#[command(long_about = "\
easel-login - Track manual logins for browser-session destinations

DESCRIPTION:
    Some destinations have no API token to refresh; their automation rides
    on a browser session established by a manual login. easel-login records
    when each of those logins last happened and derives an expiry status:

        never    no login has been recorded
        ok       plenty of time left
        warn     expiry is close; re-login soon
        expired  the session is assumed dead

USAGE EXAMPLES:
    # After logging in to Cara through the automation driver:
    easel-login record cara

    # Check one destination, or all tracked destinations
    easel-login status cara
    easel-login status

    # Everything that needs attention (for an admin dashboard or cron mail)
    easel-login alerts

CONFIGURATION:
    Configuration file: ~/.config/easelcast/config.toml
    The [sessions] section lists tracked destinations and expiry windows.

EXIT CODES:
    0 - Success
    1 - Operation failed
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Record a manual login that just happened
    Record {
        /// Destination name (e.g. "cara")
        destination: String,
    },

    /// Show session status for one or all tracked destinations
    Status {
        /// Destination name; omit for all tracked destinations
        destination: Option<String>,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// List sessions needing attention (anything not ok)
    Alerts {
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    libeaselcast::logging::init("warn", cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let db = Database::new(&config.store.path).await?;
    let tracker = SessionTracker::new(db, &config.sessions);

    match cli.command {
        Commands::Record { destination } => {
            tracker.record_login(&destination).await?;
            println!("Recorded login for {}", destination);
        }

        Commands::Status {
            destination,
            format,
        } => {
            let statuses = match destination {
                Some(destination) => vec![tracker.status(&destination).await?],
                None => {
                    let mut statuses = Vec::new();
                    for destination in tracker.destinations().to_vec() {
                        statuses.push(tracker.status(&destination).await?);
                    }
                    statuses
                }
            };

            if format == "json" {
                println!("{}", serde_json::to_string_pretty(&statuses).unwrap_or_default());
            } else {
                for status in &statuses {
                    print_status(status);
                }
            }
        }

        Commands::Alerts { format } => {
            let alerts = tracker.alerts().await?;
            if format == "json" {
                println!("{}", serde_json::to_string_pretty(&alerts).unwrap_or_default());
            } else if alerts.is_empty() {
                println!("All sessions ok.");
            } else {
                for status in &alerts {
                    print_status(status);
                }
            }
        }
    }

    Ok(())
}

fn print_status(status: &SessionStatus) {
    match status.state {
        SessionState::Never => {
            println!("{:10} never logged in", status.destination);
        }
        _ => {
            let last = status
                .last_login
                .and_then(|t| chrono::DateTime::from_timestamp(t, 0))
                .map(|dt| dt.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "?".to_string());
            println!(
                "{:10} {}  last login {} ({} days ago, {} of {} days left)",
                status.destination,
                status.state,
                last,
                status.days_since.unwrap_or(0),
                status.days_remaining.unwrap_or(0),
                status.max_days
            );
        }
    }
}
