use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::{
    errors::ServiceError,
    models::{JobStatus, RepairJob},
    repositories::{JobFilter, RepairJobStore},
};

/// Narrowing for the owner's quote management list. Date bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteFilter {
    pub status: Option<JobStatus>,
    pub customer_id: Option<String>,
    pub updated_from: Option<NaiveDate>,
    pub updated_to: Option<NaiveDate>,
}

impl QuoteFilter {
    fn job_filter(&self) -> JobFilter {
        JobFilter {
            status: self.status,
            customer_id: self
                .customer_id
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            ..JobFilter::default()
        }
    }

    fn in_range(&self, job: &RepairJob) -> bool {
        let day = job.last_updated.date_naive();
        self.updated_from.map_or(true, |from| day >= from)
            && self.updated_to.map_or(true, |to| day <= to)
    }
}

/// Owner-facing view of every job that has been quoted.
#[derive(Clone)]
pub struct QuoteService {
    store: Arc<dyn RepairJobStore>,
}

impl QuoteService {
    pub fn new(store: Arc<dyn RepairJobStore>) -> Self {
        Self { store }
    }

    /// Jobs with at least one quote, most recently updated first.
    #[instrument(skip(self))]
    pub async fn quoted_jobs(&self) -> Result<Vec<RepairJob>, ServiceError> {
        self.filter_quoted_jobs(&QuoteFilter::default()).await
    }

    #[instrument(skip(self))]
    pub async fn filter_quoted_jobs(
        &self,
        filter: &QuoteFilter,
    ) -> Result<Vec<RepairJob>, ServiceError> {
        if let (Some(from), Some(to)) = (filter.updated_from, filter.updated_to) {
            if from > to {
                return Err(ServiceError::invalid_field(
                    "updated_from",
                    "must not be after updated_to",
                ));
            }
        }

        let mut jobs: Vec<RepairJob> = self
            .store
            .get_all(&filter.job_filter())
            .await?
            .into_iter()
            .filter(|job| job.has_quotes() && filter.in_range(job))
            .collect();
        jobs.sort_by(|a, b| {
            b.last_updated
                .cmp(&a.last_updated)
                .then_with(|| b.id.cmp(&a.id))
        });

        debug!(count = jobs.len(), "Quoted jobs loaded");
        Ok(jobs)
    }
}
