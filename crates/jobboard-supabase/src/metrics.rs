//! Metrics for calls to the hosted backend.
//!
//! Requests are labelled by resource (a REST table such as `jobs`, or `auth`
//! for the identity provider), operation and status class, so the label set
//! stays small however many rows or users pass through.

use std::time::Duration;

use metrics::{counter, histogram};

pub mod names {
    /// Requests by resource, operation and status class.
    pub const REQUESTS_TOTAL: &str = "jobboard_supabase_requests_total";

    /// Request duration by resource and operation.
    pub const REQUEST_DURATION_SECONDS: &str = "jobboard_supabase_request_duration_seconds";

    /// Session changes by event kind.
    pub const AUTH_EVENTS_TOTAL: &str = "jobboard_supabase_auth_events_total";
}

/// `2xx`, `4xx`, `5xx`, or `network` when no response arrived.
pub fn status_class(status: Option<u16>) -> &'static str {
    match status {
        Some(200..=299) => "2xx",
        Some(300..=399) => "3xx",
        Some(400..=499) => "4xx",
        Some(_) => "5xx",
        None => "network",
    }
}

/// Record one finished request.
pub fn record_request(resource: &str, operation: &str, status: Option<u16>, elapsed: Duration) {
    counter!(
        names::REQUESTS_TOTAL,
        "resource" => resource.to_string(),
        "operation" => operation.to_string(),
        "status" => status_class(status)
    )
    .increment(1);

    histogram!(
        names::REQUEST_DURATION_SECONDS,
        "resource" => resource.to_string(),
        "operation" => operation.to_string()
    )
    .record(elapsed.as_secs_f64());
}

/// Record a session change.
pub fn record_auth_event(event: &str) {
    counter!(names::AUTH_EVENTS_TOTAL, "event" => event.to_string()).increment(1);
}
