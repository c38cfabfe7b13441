use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::Iterable;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::quote::Quote;
use crate::errors::ServiceError;

/// Maximum length of a technician note, in characters.
pub const MAX_NOTE_LENGTH: usize = 1000;

/// Minimum length of a customer's problem description, in characters.
pub const MIN_PROBLEM_DESCRIPTION_LENGTH: usize = 10;

/// Enum representing the possible statuses of a repair job.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum JobStatus {
    #[sea_orm(string_value = "Pending")]
    Pending,
    #[sea_orm(string_value = "Diagnosis")]
    Diagnosis,
    #[sea_orm(string_value = "In Progress")]
    #[serde(rename = "In Progress")]
    #[strum(serialize = "In Progress")]
    InProgress,
    #[sea_orm(string_value = "Completed")]
    Completed,
    #[sea_orm(string_value = "Cancelled")]
    Cancelled,
}

impl JobStatus {
    /// Completed and Cancelled end the lifecycle.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Cancelled)
    }

    /// Statuses that still count as open work on the bench.
    pub fn is_active(self) -> bool {
        !self.is_terminal()
    }

    pub fn all() -> Vec<JobStatus> {
        JobStatus::iter().collect()
    }
}

impl FromStr for JobStatus {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
            .flat_map(char::to_lowercase)
            .collect();

        match normalized.as_str() {
            "pending" => Ok(JobStatus::Pending),
            "diagnosis" => Ok(JobStatus::Diagnosis),
            "inprogress" => Ok(JobStatus::InProgress),
            "completed" => Ok(JobStatus::Completed),
            "cancelled" | "canceled" => Ok(JobStatus::Cancelled),
            _ => Err(ServiceError::InvalidStatus(s.to_string())),
        }
    }
}

/// A free-text technician annotation on a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Note {
    pub fn new(content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            content: content.into(),
            timestamp,
        }
    }
}

/// One customer device under repair, with its quote and note history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepairJob {
    pub id: String,
    pub item_model: String,
    pub serial_number: Option<String>,
    pub problem_description: String,
    pub status: JobStatus,
    pub date_received: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub customer_id: String,
    pub customer_name: String,
    #[serde(default)]
    pub quotes: Vec<Quote>,
    #[serde(default)]
    pub notes: Vec<Note>,
    /// Document version, bumped on every write. Used as the compare-and-swap tag.
    #[serde(default)]
    pub version: i64,
}

impl RepairJob {
    /// Short upper-case label used when talking to customers, e.g. `#3F9A1C`.
    pub fn reference(&self) -> String {
        self.id.chars().take(6).collect::<String>().to_uppercase()
    }

    pub fn has_quotes(&self) -> bool {
        !self.quotes.is_empty()
    }

    pub fn latest_quote(&self) -> Option<&Quote> {
        self.quotes.iter().max_by_key(|q| q.created_at)
    }

    pub fn notes_newest_first(&self) -> Vec<&Note> {
        let mut notes: Vec<&Note> = self.notes.iter().collect();
        notes.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        notes
    }
}

/// Everything needed to persist a job before the store assigns its id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRepairJob {
    pub item_model: String,
    pub serial_number: Option<String>,
    pub problem_description: String,
    pub customer_id: String,
    pub customer_name: String,
    pub status: JobStatus,
    pub date_received: DateTime<Utc>,
}

impl NewRepairJob {
    pub fn into_job(self, id: String) -> RepairJob {
        RepairJob {
            id,
            item_model: self.item_model,
            serial_number: self.serial_number,
            problem_description: self.problem_description,
            status: self.status,
            date_received: self.date_received,
            last_updated: self.date_received,
            customer_id: self.customer_id,
            customer_name: self.customer_name,
            quotes: Vec::new(),
            notes: Vec::new(),
            version: 0,
        }
    }
}

/// The only fields a status change may touch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JobPatch {
    pub status: JobStatus,
    pub last_updated: DateTime<Utc>,
    /// When set, the write only applies if the stored version still matches.
    pub expected_version: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rstest::rstest;

    #[rstest]
    #[case("Pending", JobStatus::Pending)]
    #[case("diagnosis", JobStatus::Diagnosis)]
    #[case("In Progress", JobStatus::InProgress)]
    #[case("InProgress", JobStatus::InProgress)]
    #[case("in_progress", JobStatus::InProgress)]
    #[case("COMPLETED", JobStatus::Completed)]
    #[case("canceled", JobStatus::Cancelled)]
    fn parses_status_spellings(#[case] input: &str, #[case] expected: JobStatus) {
        assert_eq!(input.parse::<JobStatus>().unwrap(), expected);
    }

    #[test]
    fn rejects_unknown_status() {
        let err = "Shipped".parse::<JobStatus>().unwrap_err();
        assert!(matches!(err, ServiceError::InvalidStatus(s) if s == "Shipped"));
    }

    #[test]
    fn displays_storage_names() {
        assert_eq!(JobStatus::InProgress.to_string(), "In Progress");
        assert_eq!(JobStatus::Cancelled.to_string(), "Cancelled");
        assert_eq!(
            serde_json::to_string(&JobStatus::InProgress).unwrap(),
            "\"In Progress\""
        );
    }

    #[test]
    fn terminal_statuses() {
        assert_eq!(
            JobStatus::all(),
            vec![
                JobStatus::Pending,
                JobStatus::Diagnosis,
                JobStatus::InProgress,
                JobStatus::Completed,
                JobStatus::Cancelled,
            ]
        );
        let terminal: Vec<JobStatus> = JobStatus::all()
            .into_iter()
            .filter(|s| s.is_terminal())
            .collect();
        assert_eq!(terminal, vec![JobStatus::Completed, JobStatus::Cancelled]);
    }

    #[test]
    fn reference_and_note_order() {
        let received = Utc::now();
        let mut job = NewRepairJob {
            item_model: "Laptop XYZ".into(),
            serial_number: None,
            problem_description: "Screen flickers on boot".into(),
            customer_id: "cust-1".into(),
            customer_name: "Jane Smith".into(),
            status: JobStatus::Pending,
            date_received: received,
        }
        .into_job("3f9a1c77-aaaa".into());

        job.notes.push(Note::new("first", received));
        job.notes
            .push(Note::new("second", received + Duration::minutes(5)));

        assert_eq!(job.reference(), "3F9A1C");
        assert_eq!(job.last_updated, job.date_received);
        let contents: Vec<&str> = job
            .notes_newest_first()
            .iter()
            .map(|n| n.content.as_str())
            .collect();
        assert_eq!(contents, vec!["second", "first"]);
    }
}
