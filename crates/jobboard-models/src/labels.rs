//! Human-readable "posted on" labels.

use chrono::{DateTime, Utc};

use crate::status::JobStatus;

const MINUTE_SECS: i64 = 60;
const HOUR_SECS: i64 = 60 * MINUTE_SECS;
const DAY_SECS: i64 = 24 * HOUR_SECS;
const MONTH_SECS: i64 = 30 * DAY_SECS;

/// Build the label shown next to a listing.
///
/// Published listings get a relative label measured from `published_at`
/// (or `created_at` when the publish time is missing). Relative labels stop
/// after 30 days and switch to an absolute date.
pub fn posted_on_label(
    status: JobStatus,
    published_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> String {
    match status {
        JobStatus::Published => published_label(published_at.unwrap_or(created_at), now),
        JobStatus::Draft => "Draft, not yet published".to_string(),
        JobStatus::Archived => "Archived".to_string(),
    }
}

fn published_label(published: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff = (now - published).num_seconds();

    if diff < MINUTE_SECS {
        return "Published moments ago".to_string();
    }
    if diff < HOUR_SECS {
        let minutes = diff / MINUTE_SECS;
        return format!("Published {} minute{} ago", minutes, plural(minutes));
    }
    if diff < DAY_SECS {
        let hours = diff / HOUR_SECS;
        return format!("Published {} hour{} ago", hours, plural(hours));
    }
    if diff < MONTH_SECS {
        let days = diff / DAY_SECS;
        return format!("Published {} day{} ago", days, plural(days));
    }

    format!("Published on {}", published.format("%b %-d, %Y"))
}

fn plural(n: i64) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}
