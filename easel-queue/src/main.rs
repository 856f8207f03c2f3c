//! easel-queue - Manage scheduled posts
//!
//! Operator tool for the scheduled post queue: add entries, inspect what is
//! pending or upcoming, cancel, review history, and import content items.

use clap::{Parser, Subcommand};
use serde::Deserialize;

use libeaselcast::scheduling::parse_schedule;
use libeaselcast::{Config, Database, EaselError, Result, ScheduledPost, Scheduler};

#[derive(Parser, Debug)]
#[command(name = "easel-queue")]
#[command(version)]
#[command(about = "Manage scheduled posts")]
#[command(long_about = "\
easel-queue - Manage scheduled posts

DESCRIPTION:
    easel-queue manages the Easelcast schedule queue. Use it to schedule a
    content item for a destination, list due and upcoming posts, cancel an
    entry, review publish history, and import content items.

USAGE EXAMPLES:
    # Schedule a post for tomorrow afternoon
    easel-queue add canal-at-dusk mastodon --at \"tomorrow 3pm\"

    # Schedule with an explicit asset locator
    easel-queue add canal-at-dusk flickr --at 2h --content-ref canals/big.jpg

    # List due and upcoming posts (text or JSON)
    easel-queue list
    easel-queue list --format json

    # Cancel a scheduled post
    easel-queue cancel <POST_ID>

    # Review what has been posted (or failed)
    easel-queue history --limit 20

    # Queue statistics
    easel-queue stats

    # Import content items from a JSON file
    easel-queue import items.json

CONFIGURATION:
    Configuration file: ~/.config/easelcast/config.toml
    Override with the EASELCAST_CONFIG environment variable.

EXIT CODES:
    0 - Success
    1 - Operation failed
    3 - Invalid input (bad post id, time format, past time, ...)
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
    /// Schedule a content item for a destination
    Add {
        /// Content item id
        content_id: String,

        /// Destination name (e.g. "mastodon")
        destination: String,

        /// When to post (e.g. "2h", "tomorrow 3pm")
        #[arg(long)]
        at: String,

        /// Asset locator; defaults to the content item's own asset
        #[arg(long)]
        content_ref: Option<String>,

        /// Accept a scheduled time in the past
        #[arg(long)]
        allow_past: bool,
    },

    /// List due and upcoming posts
    List {
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Cancel a scheduled post
    Cancel {
        /// Post id to cancel
        post_id: String,
    },

    /// Show completed and failed posts, most recent first
    History {
        #[arg(short, long, default_value = "50")]
        limit: usize,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show queue statistics
    Stats {
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Import content items from a JSON file
    Import {
        /// JSON file holding an array of content item records
        file: std::path::PathBuf,
    },
}

/// Content item record accepted by `import`.
#[derive(Debug, Deserialize)]
struct ImportRecord {
    id: String,
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    subject: String,
    #[serde(default)]
    asset_ref: String,
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
    let scheduler = Scheduler::from_config(&config, db.clone());

    match cli.command {
        Commands::Add {
            content_id,
            destination,
            at,
            content_ref,
            allow_past,
        } => {
            let scheduled = parse_schedule(&at)?;
            if !allow_past && scheduled <= chrono::Utc::now() {
                return Err(EaselError::InvalidInput(format!(
                    "Scheduled time {} is in the past (use --allow-past to override)",
                    scheduled.format("%Y-%m-%d %H:%M UTC")
                )));
            }

            let content_ref = match content_ref {
                Some(content_ref) => content_ref,
                None => {
                    let item = db.get_content_item(&content_id).await?.ok_or_else(|| {
                        EaselError::InvalidInput(format!(
                            "Unknown content item '{}'; pass --content-ref or import it first",
                            content_id
                        ))
                    })?;
                    item.asset_ref
                }
            };

            let id = scheduler
                .add_post(&content_id, &content_ref, &destination, scheduled.timestamp())
                .await?;
            println!("Scheduled {} for {} at {}", content_id, destination, scheduled.format("%Y-%m-%d %H:%M UTC"));
            println!("Post id: {}", id);
        }

        Commands::List { format } => {
            let due = scheduler.pending().await?;
            let upcoming = scheduler.upcoming().await?;

            if format == "json" {
                let value = serde_json::json!({ "due": due, "upcoming": upcoming });
                println!("{}", serde_json::to_string_pretty(&value).unwrap_or_default());
            } else {
                if due.is_empty() && upcoming.is_empty() {
                    println!("No scheduled posts.");
                }
                if !due.is_empty() {
                    println!("Due now:");
                    for post in &due {
                        print_post(post);
                    }
                }
                if !upcoming.is_empty() {
                    println!("Upcoming:");
                    for post in &upcoming {
                        print_post(post);
                    }
                }
            }
        }

        Commands::Cancel { post_id } => {
            if scheduler.cancel(&post_id).await? {
                println!("Cancelled {}", post_id);
            } else {
                return Err(EaselError::InvalidInput(format!(
                    "Post {} is not pending (unknown id or already terminal)",
                    post_id
                )));
            }
        }

        Commands::History { limit, format } => {
            let history = scheduler.history(limit).await?;
            if format == "json" {
                println!("{}", serde_json::to_string_pretty(&history).unwrap_or_default());
            } else if history.is_empty() {
                println!("No completed posts.");
            } else {
                for post in &history {
                    let outcome = match post.status {
                        libeaselcast::ScheduleStatus::Posted => post
                            .result_url
                            .clone()
                            .unwrap_or_else(|| "posted".to_string()),
                        _ => format!("failed: {}", post.error.as_deref().unwrap_or("unknown error")),
                    };
                    println!(
                        "{}  {}  {} -> {}  {}",
                        post.id,
                        format_time(post.scheduled_time),
                        post.content_id,
                        post.destination,
                        outcome
                    );
                }
            }
        }

        Commands::Stats { format } => {
            let stats = scheduler.stats().await?;
            if format == "json" {
                println!("{}", serde_json::to_string_pretty(&stats).unwrap_or_default());
            } else {
                println!("pending:   {}", stats.pending);
                println!("posted:    {}", stats.posted);
                println!("failed:    {}", stats.failed);
                println!("cancelled: {}", stats.cancelled);
            }
        }

        Commands::Import { file } => {
            let content = std::fs::read_to_string(&file).map_err(|e| {
                EaselError::InvalidInput(format!("Failed to read {}: {}", file.display(), e))
            })?;
            let records: Vec<ImportRecord> = serde_json::from_str(&content).map_err(|e| {
                EaselError::InvalidInput(format!("Failed to parse {}: {}", file.display(), e))
            })?;

            let count = records.len();
            for record in records {
                let item = libeaselcast::ContentItem {
                    id: record.id,
                    title: record.title,
                    description: record.description,
                    subject: record.subject,
                    asset_ref: record.asset_ref,
                    publish_records: Default::default(),
                };
                db.upsert_content_item(&item).await?;
            }
            println!("Imported {} content item(s)", count);
        }
    }

    Ok(())
}

fn print_post(post: &ScheduledPost) {
    println!(
        "  {}  {}  {} -> {}",
        post.id,
        format_time(post.scheduled_time),
        post.content_id,
        post.destination
    );
}

fn format_time(timestamp: i64) -> String {
    chrono::DateTime::from_timestamp(timestamp, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}
