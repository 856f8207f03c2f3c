//! Schedule-time parsing
//!
//! `easel-queue add --at` accepts either a relative offset ("2h", "45min",
//! "1day") or a calendar expression ("tomorrow 3pm", "next friday"). The
//! schedule engine itself only ever sees unix seconds; this is purely the
//! operator-facing sugar on top.

use chrono::{DateTime, Utc};

use crate::{EaselError, Result};

/// Parse a schedule expression into a concrete UTC time.
///
/// Relative offsets are anchored at "now" and tried first, so "2h" is an
/// offset rather than an ambiguous date. Anything else goes through
/// chrono-english's US dialect.
///
/// # Errors
///
/// Returns `InvalidInput` when the expression parses as neither.
pub fn parse_schedule(input: &str) -> Result<DateTime<Utc>> {
    let input = input.trim();
    if input.is_empty() {
        return Err(EaselError::InvalidInput(
            "Schedule time cannot be empty".to_string(),
        ));
    }

    if let Ok(offset) = humantime::parse_duration(input) {
        let offset = chrono::Duration::try_seconds(offset.as_secs() as i64)
            .ok_or_else(|| EaselError::InvalidInput(format!("Offset out of range: {}", input)))?;
        return Ok(Utc::now() + offset);
    }

    chrono_english::parse_date_string(input, Utc::now(), chrono_english::Dialect::Us).map_err(
        |_| {
            EaselError::InvalidInput(format!(
                "Could not parse schedule time '{}' (try \"2h\" or \"tomorrow 3pm\")",
                input
            ))
        },
    )
}
