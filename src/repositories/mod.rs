use async_trait::async_trait;
use chrono::NaiveDate;

use crate::errors::ServiceError;
use crate::models::{JobPatch, JobStatus, NewRepairJob, Note, Quote, RepairJob};

pub mod in_memory;
pub mod repair_job_repository;

pub use in_memory::InMemoryRepairJobStore;
pub use repair_job_repository::RepairJobRepository;

/// Optional narrowing for [`RepairJobStore::get_all`]. Empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobFilter {
    pub status: Option<JobStatus>,
    /// Case-insensitive prefix of the customer's display name, using Unicode lowercasing
    /// in every backend.
    pub customer_name_prefix: Option<String>,
    /// UTC calendar day the job was received.
    pub received_on: Option<NaiveDate>,
    pub customer_id: Option<String>,
}

impl JobFilter {
    pub fn with_status(mut self, status: JobStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_customer_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.customer_name_prefix = Some(prefix.into());
        self
    }

    pub fn received_on(mut self, day: NaiveDate) -> Self {
        self.received_on = Some(day);
        self
    }

    pub fn with_customer_id(mut self, customer_id: impl Into<String>) -> Self {
        self.customer_id = Some(customer_id.into());
        self
    }

    /// Same predicate the database backends express in SQL.
    pub fn matches(&self, job: &RepairJob) -> bool {
        if let Some(status) = self.status {
            if job.status != status {
                return false;
            }
        }
        if let Some(prefix) = &self.customer_name_prefix {
            if !job
                .customer_name
                .to_lowercase()
                .starts_with(&prefix.to_lowercase())
            {
                return false;
            }
        }
        if let Some(day) = self.received_on {
            if job.date_received.date_naive() != day {
                return false;
            }
        }
        if let Some(customer_id) = &self.customer_id {
            if &job.customer_id != customer_id {
                return false;
            }
        }
        true
    }
}

/// Persistence contract for the repair job collection.
///
/// Lookups of a missing job return `Ok(None)`; `Err` is reserved for
/// infrastructure failures. List results are ordered newest `date_received` first.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RepairJobStore: Send + Sync {
    /// Persists a new job and returns its id. The stored record already carries that id.
    async fn create(&self, job: NewRepairJob) -> Result<String, ServiceError>;

    async fn get_by_id(&self, id: &str) -> Result<Option<RepairJob>, ServiceError>;

    async fn get_by_customer(&self, customer_id: &str) -> Result<Vec<RepairJob>, ServiceError>;

    async fn get_all(&self, filter: &JobFilter) -> Result<Vec<RepairJob>, ServiceError>;

    async fn get_by_serial_number(&self, serial_number: &str)
        -> Result<Vec<RepairJob>, ServiceError>;

    /// Atomically appends a quote. Concurrent appends are never lost.
    async fn append_quote(&self, id: &str, quote: Quote)
        -> Result<Option<RepairJob>, ServiceError>;

    /// Atomically appends a note. Concurrent appends are never lost.
    async fn append_note(&self, id: &str, note: Note) -> Result<Option<RepairJob>, ServiceError>;

    /// Writes the status and last-updated fields, honouring `patch.expected_version`.
    async fn update_status(&self, id: &str, patch: JobPatch)
        -> Result<Option<RepairJob>, ServiceError>;
}

/// Newest received first; ties broken by id so listings are stable.
pub(crate) fn sort_newest_first(jobs: &mut [RepairJob]) {
    jobs.sort_by(|a, b| {
        b.date_received
            .cmp(&a.date_received)
            .then_with(|| b.id.cmp(&a.id))
    });
}
