//! Easelcast - publish a content library to many destinations
//!
//! This library holds the publishing orchestration core: the destination
//! registry and capability trait, the canonical post formatter, the
//! persisted schedule queue, the daily fairness rotation, browser-session
//! expiry tracking, and the publish audit log.

pub mod assets;
pub mod config;
pub mod db;
pub mod error;
pub mod formatter;
pub mod logging;
pub mod platforms;
pub mod post_log;
pub mod registry;
pub mod rotation;
pub mod scheduler;
pub mod scheduling;
pub mod sessions;
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use db::Database;
pub use error::{EaselError, Result};
pub use post_log::PostLogger;
pub use registry::PlatformRegistry;
pub use rotation::{RotationEngine, RotationSummary};
pub use scheduler::{ExecuteSummary, Scheduler};
pub use sessions::SessionTracker;
pub use types::{
    ContentItem, PublishRecord, PublishResult, ScheduleStatus, ScheduledPost, SessionState,
    SessionStatus,
};
