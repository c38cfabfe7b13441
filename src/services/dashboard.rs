use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;

use crate::{
    errors::ServiceError,
    models::{JobStatus, RepairJob},
    repositories::{JobFilter, RepairJobStore},
};

/// How many jobs the owner's recent activity list shows.
pub const RECENT_REPAIRS_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TechnicianDashboard {
    /// Pending, Diagnosis and In Progress jobs.
    pub open_jobs: usize,
    pub completed_jobs: usize,
    pub total_quotes: usize,
}

impl TechnicianDashboard {
    pub fn from_jobs(jobs: &[RepairJob]) -> Self {
        Self {
            open_jobs: jobs.iter().filter(|j| j.status.is_active()).count(),
            completed_jobs: count_status(jobs, JobStatus::Completed),
            total_quotes: jobs.iter().map(|j| j.quotes.len()).sum(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecentRepair {
    pub id: String,
    pub reference: String,
    pub customer_name: String,
    pub status: JobStatus,
    pub last_updated: DateTime<Utc>,
}

impl From<&RepairJob> for RecentRepair {
    fn from(job: &RepairJob) -> Self {
        Self {
            id: job.id.clone(),
            reference: job.reference(),
            customer_name: job.customer_name.clone(),
            status: job.status,
            last_updated: job.last_updated,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OwnerDashboard {
    pub completed_repairs: usize,
    pub jobs_with_quotes: usize,
    pub quoted_in_progress: usize,
    pub recent_repairs: Vec<RecentRepair>,
}

impl OwnerDashboard {
    pub fn from_jobs(jobs: &[RepairJob]) -> Self {
        let mut recent: Vec<&RepairJob> = jobs.iter().collect();
        recent.sort_by(|a, b| {
            b.last_updated
                .cmp(&a.last_updated)
                .then_with(|| b.id.cmp(&a.id))
        });

        Self {
            completed_repairs: count_status(jobs, JobStatus::Completed),
            jobs_with_quotes: jobs.iter().filter(|j| j.has_quotes()).count(),
            quoted_in_progress: jobs
                .iter()
                .filter(|j| j.has_quotes() && j.status == JobStatus::InProgress)
                .count(),
            recent_repairs: recent
                .into_iter()
                .take(RECENT_REPAIRS_LIMIT)
                .map(RecentRepair::from)
                .collect(),
        }
    }
}

fn count_status(jobs: &[RepairJob], status: JobStatus) -> usize {
    jobs.iter().filter(|j| j.status == status).count()
}

/// Summary counters for the technician and owner landing pages.
#[derive(Clone)]
pub struct DashboardService {
    store: Arc<dyn RepairJobStore>,
}

impl DashboardService {
    pub fn new(store: Arc<dyn RepairJobStore>) -> Self {
        Self { store }
    }

    #[instrument(skip(self))]
    pub async fn technician(&self) -> Result<TechnicianDashboard, ServiceError> {
        let jobs = self.store.get_all(&JobFilter::default()).await?;
        Ok(TechnicianDashboard::from_jobs(&jobs))
    }

    #[instrument(skip(self))]
    pub async fn owner(&self) -> Result<OwnerDashboard, ServiceError> {
        let jobs = self.store.get_all(&JobFilter::default()).await?;
        Ok(OwnerDashboard::from_jobs(&jobs))
    }
}
