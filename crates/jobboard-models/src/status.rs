//! Listing status and employment type.

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when a status or job type string is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind}: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

/// Visibility state of a listing.
///
/// Only `Published` listings show up in public browse and detail views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Work in progress, visible to the owner only
    #[default]
    Draft,
    /// Live on the public board
    Published,
    /// Taken down but kept for the owner
    Archived,
}

impl JobStatus {
    pub const ALL: [JobStatus; 3] = [JobStatus::Draft, JobStatus::Published, JobStatus::Archived];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Draft => "draft",
            JobStatus::Published => "published",
            JobStatus::Archived => "archived",
        }
    }

    /// Human-readable label used in listings tables.
    pub fn label(&self) -> &'static str {
        match self {
            JobStatus::Draft => "Draft",
            JobStatus::Published => "Published",
            JobStatus::Archived => "Archived",
        }
    }

    pub fn is_published(&self) -> bool {
        matches!(self, JobStatus::Published)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "draft" => Ok(JobStatus::Draft),
            "published" => Ok(JobStatus::Published),
            "archived" => Ok(JobStatus::Archived),
            _ => Err(ParseEnumError {
                kind: "job status",
                value: s.to_string(),
            }),
        }
    }
}

/// Employment type of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema, Default)]
pub enum JobType {
    #[default]
    #[serde(rename = "Full-Time")]
    FullTime,
    #[serde(rename = "Part-Time")]
    PartTime,
    #[serde(rename = "Contract")]
    Contract,
}

impl JobType {
    pub const ALL: [JobType; 3] = [JobType::FullTime, JobType::PartTime, JobType::Contract];

    /// Storage and wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::FullTime => "Full-Time",
            JobType::PartTime => "Part-Time",
            JobType::Contract => "Contract",
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for JobType {
    type Err = ParseEnumError;

    /// Accepts the wire form ("Full-Time") as well as loose spellings
    /// ("full-time", "full_time", "fulltime").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "fulltime" => Ok(JobType::FullTime),
            "parttime" => Ok(JobType::PartTime),
            "contract" => Ok(JobType::Contract),
            _ => Err(ParseEnumError {
                kind: "job type",
                value: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_type_wire_format() {
        assert_eq!(serde_json::to_string(&JobType::FullTime).unwrap(), "\"Full-Time\"");
        assert_eq!(serde_json::to_string(&JobType::PartTime).unwrap(), "\"Part-Time\"");
        let parsed: JobType = serde_json::from_str("\"Contract\"").unwrap();
        assert_eq!(parsed, JobType::Contract);
    }

    #[test]
    fn test_job_type_loose_parsing() {
        assert_eq!("full-time".parse::<JobType>().unwrap(), JobType::FullTime);
        assert_eq!("Part_Time".parse::<JobType>().unwrap(), JobType::PartTime);
        assert!("freelance".parse::<JobType>().is_err());
    }

    #[test]
    fn test_job_status_round_trip_strings() {
        for status in JobStatus::ALL {
            assert_eq!(status.as_str().parse::<JobStatus>().unwrap(), status);
        }
        assert_eq!(serde_json::to_string(&JobStatus::Archived).unwrap(), "\"archived\"");
        assert!("deleted".parse::<JobStatus>().is_err());
    }

    #[test]
    fn test_only_published_is_public() {
        assert!(JobStatus::Published.is_published());
        assert!(!JobStatus::Draft.is_published());
        assert!(!JobStatus::Archived.is_published());
    }
}
