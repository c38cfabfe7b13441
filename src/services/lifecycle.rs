use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::models::{JobPatch, JobStatus, NewRepairJob, Note, Quote, QuotePart, RepairJob};

/// Default number of days a quote stays valid.
pub const DEFAULT_QUOTE_VALIDITY_DAYS: i64 = 30;

/// How strictly status changes are checked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionPolicy {
    /// Any known status may replace any other, including reopening a closed job.
    #[default]
    Lenient,
    /// Completed and Cancelled jobs are closed for good.
    Strict,
}

/// Status rules and the shape of every lifecycle write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepairJobLifecycle {
    policy: TransitionPolicy,
    quote_validity: Duration,
}

impl Default for RepairJobLifecycle {
    fn default() -> Self {
        Self::new(TransitionPolicy::default(), DEFAULT_QUOTE_VALIDITY_DAYS)
    }
}

/// Customer-supplied details of a new repair request, already validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Intake {
    pub customer_id: String,
    pub customer_name: String,
    pub item_model: String,
    pub serial_number: Option<String>,
    pub problem_description: String,
}

impl RepairJobLifecycle {
    pub fn new(policy: TransitionPolicy, quote_validity_days: i64) -> Self {
        Self {
            policy,
            quote_validity: Duration::days(quote_validity_days),
        }
    }

    pub fn policy(&self) -> TransitionPolicy {
        self.policy
    }

    pub fn quote_validity(&self) -> Duration {
        self.quote_validity
    }

    /// Every job starts Pending, received now.
    pub fn intake(&self, intake: Intake, now: DateTime<Utc>) -> NewRepairJob {
        NewRepairJob {
            item_model: intake.item_model.trim().to_string(),
            serial_number: intake
                .serial_number
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            problem_description: intake.problem_description.trim().to_string(),
            customer_id: intake.customer_id.trim().to_string(),
            customer_name: intake.customer_name.trim().to_string(),
            status: JobStatus::Pending,
            date_received: now,
        }
    }

    pub fn check_transition(&self, from: JobStatus, to: JobStatus) -> Result<(), ServiceError> {
        match self.policy {
            TransitionPolicy::Lenient => Ok(()),
            TransitionPolicy::Strict if from.is_terminal() && from != to => {
                debug!("Rejected transition {} -> {} under strict policy", from, to);
                Err(ServiceError::InvalidTransition { from, to })
            }
            TransitionPolicy::Strict => Ok(()),
        }
    }

    /// Patch moving `job` to `to`, pinned to the version that was checked.
    pub fn status_patch(
        &self,
        job: &RepairJob,
        to: JobStatus,
        now: DateTime<Utc>,
    ) -> Result<JobPatch, ServiceError> {
        self.check_transition(job.status, to)?;
        Ok(JobPatch {
            status: to,
            last_updated: now,
            expected_version: Some(job.version),
        })
    }

    pub fn note(&self, content: &str, now: DateTime<Utc>) -> Note {
        Note::new(content.trim(), now)
    }

    /// A fresh quote over inputs the calculator has already accepted.
    pub fn quote(
        &self,
        labor_hours: Decimal,
        labor_rate: Decimal,
        tax_rate: Decimal,
        parts: Vec<QuotePart>,
        now: DateTime<Utc>,
    ) -> Quote {
        Quote {
            id: Uuid::new_v4(),
            labor_hours,
            labor_rate,
            tax_rate,
            parts,
            created_at: now,
            valid_until: now + self.quote_validity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;
    use rstest::rstest;

    fn job_in(status: JobStatus) -> RepairJob {
        let mut job = RepairJobLifecycle::default()
            .intake(
                Intake {
                    customer_id: "c-1".into(),
                    customer_name: "Lee".into(),
                    item_model: "Speaker".into(),
                    serial_number: None,
                    problem_description: "Crackling at high volume".into(),
                },
                Utc::now(),
            )
            .into_job("job-1".into());
        job.status = status;
        job.version = 4;
        job
    }

    #[rstest]
    #[case(JobStatus::Cancelled, JobStatus::Completed)]
    #[case(JobStatus::Completed, JobStatus::Pending)]
    #[case(JobStatus::Pending, JobStatus::Completed)]
    #[case(JobStatus::InProgress, JobStatus::Diagnosis)]
    fn lenient_accepts_any_known_status(#[case] from: JobStatus, #[case] to: JobStatus) {
        let lifecycle = RepairJobLifecycle::new(TransitionPolicy::Lenient, 30);
        assert!(lifecycle.check_transition(from, to).is_ok());
    }

    #[rstest]
    #[case(JobStatus::Cancelled, JobStatus::Completed)]
    #[case(JobStatus::Completed, JobStatus::InProgress)]
    #[case(JobStatus::Completed, JobStatus::Cancelled)]
    fn strict_keeps_terminal_jobs_closed(#[case] from: JobStatus, #[case] to: JobStatus) {
        let lifecycle = RepairJobLifecycle::new(TransitionPolicy::Strict, 30);
        assert_matches!(
            lifecycle.check_transition(from, to),
            Err(ServiceError::InvalidTransition { from: f, to: t }) if f == from && t == to
        );
    }

    #[rstest]
    #[case(JobStatus::Pending, JobStatus::InProgress)]
    #[case(JobStatus::InProgress, JobStatus::Pending)]
    #[case(JobStatus::Diagnosis, JobStatus::Cancelled)]
    #[case(JobStatus::Completed, JobStatus::Completed)]
    fn strict_allows_open_moves(#[case] from: JobStatus, #[case] to: JobStatus) {
        let lifecycle = RepairJobLifecycle::new(TransitionPolicy::Strict, 30);
        assert!(lifecycle.check_transition(from, to).is_ok());
    }

    #[test]
    fn patch_touches_status_and_timestamp_only() {
        let job = job_in(JobStatus::Diagnosis);
        let now = Utc::now();
        let patch = RepairJobLifecycle::default()
            .status_patch(&job, JobStatus::InProgress, now)
            .unwrap();

        assert_eq!(patch.status, JobStatus::InProgress);
        assert_eq!(patch.last_updated, now);
        assert_eq!(patch.expected_version, Some(4));
    }

    #[test]
    fn intake_normalizes_fields() {
        let job = RepairJobLifecycle::default().intake(
            Intake {
                customer_id: " c-1 ".into(),
                customer_name: "Lee ".into(),
                item_model: " Speaker".into(),
                serial_number: Some("   ".into()),
                problem_description: "  Crackling at high volume ".into(),
            },
            Utc::now(),
        );
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.serial_number, None);
        assert_eq!(job.item_model, "Speaker");
        assert_eq!(job.problem_description, "Crackling at high volume");
    }

    #[test]
    fn quote_gets_fresh_id_and_validity_window() {
        let lifecycle = RepairJobLifecycle::new(TransitionPolicy::Lenient, 14);
        let now = Utc::now();
        let a = lifecycle.quote(dec!(1), dec!(750), dec!(0.15), vec![], now);
        let b = lifecycle.quote(dec!(1), dec!(750), dec!(0.15), vec![], now);

        assert_ne!(a.id, b.id);
        assert_eq!(a.valid_until - a.created_at, Duration::days(14));
    }
}
