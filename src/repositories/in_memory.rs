use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::{sort_newest_first, JobFilter, RepairJobStore};
use crate::errors::ServiceError;
use crate::models::{JobPatch, NewRepairJob, Note, Quote, RepairJob};

/// Process-local job collection.
///
/// Each write mutates the entry while holding its shard lock, which makes
/// quote and note appends natively atomic.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepairJobStore {
    jobs: Arc<DashMap<String, RepairJob>>,
}

impl InMemoryRepairJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    fn collect<F>(&self, predicate: F) -> Vec<RepairJob>
    where
        F: Fn(&RepairJob) -> bool,
    {
        let mut jobs: Vec<RepairJob> = self
            .jobs
            .iter()
            .filter(|entry| predicate(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        sort_newest_first(&mut jobs);
        jobs
    }

    fn modify<F>(&self, id: &str, mutate: F) -> Result<Option<RepairJob>, ServiceError>
    where
        F: FnOnce(&mut RepairJob) -> Result<(), ServiceError>,
    {
        let Some(mut entry) = self.jobs.get_mut(id) else {
            return Ok(None);
        };
        let job = entry.value_mut();
        mutate(job)?;
        job.version += 1;
        Ok(Some(job.clone()))
    }
}

#[async_trait]
impl RepairJobStore for InMemoryRepairJobStore {
    #[instrument(skip(self, job))]
    async fn create(&self, job: NewRepairJob) -> Result<String, ServiceError> {
        let id = Uuid::new_v4().to_string();
        self.jobs.insert(id.clone(), job.into_job(id.clone()));
        debug!("Stored repair job {}", id);
        Ok(id)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<RepairJob>, ServiceError> {
        Ok(self.jobs.get(id).map(|entry| entry.value().clone()))
    }

    async fn get_by_customer(&self, customer_id: &str) -> Result<Vec<RepairJob>, ServiceError> {
        Ok(self.collect(|job| job.customer_id == customer_id))
    }

    async fn get_all(&self, filter: &JobFilter) -> Result<Vec<RepairJob>, ServiceError> {
        Ok(self.collect(|job| filter.matches(job)))
    }

    async fn get_by_serial_number(
        &self,
        serial_number: &str,
    ) -> Result<Vec<RepairJob>, ServiceError> {
        Ok(self.collect(|job| job.serial_number.as_deref() == Some(serial_number)))
    }

    #[instrument(skip(self, quote), fields(quote_id = %quote.id))]
    async fn append_quote(
        &self,
        id: &str,
        quote: Quote,
    ) -> Result<Option<RepairJob>, ServiceError> {
        self.modify(id, |job| {
            job.last_updated = job.last_updated.max(quote.created_at);
            job.quotes.push(quote);
            Ok(())
        })
    }

    #[instrument(skip(self, note))]
    async fn append_note(&self, id: &str, note: Note) -> Result<Option<RepairJob>, ServiceError> {
        self.modify(id, |job| {
            job.last_updated = job.last_updated.max(note.timestamp);
            job.notes.push(note);
            Ok(())
        })
    }

    #[instrument(skip(self))]
    async fn update_status(
        &self,
        id: &str,
        patch: JobPatch,
    ) -> Result<Option<RepairJob>, ServiceError> {
        self.modify(id, |job| {
            if let Some(expected) = patch.expected_version {
                if job.version != expected {
                    warn!(
                        "Version mismatch on repair job {}: expected {}, found {}",
                        id, expected, job.version
                    );
                    return Err(ServiceError::ConcurrentModification(id.to_string()));
                }
            }
            job.status = patch.status;
            job.last_updated = job.last_updated.max(patch.last_updated);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::JobStatus;
    use chrono::{Duration, Utc};
    use futures::future::join_all;
    use rust_decimal_macros::dec;

    fn new_job(customer_id: &str, serial: Option<&str>) -> NewRepairJob {
        NewRepairJob {
            item_model: "Tablet".into(),
            serial_number: serial.map(str::to_string),
            problem_description: "Cracked digitizer glass".into(),
            customer_id: customer_id.into(),
            customer_name: "Alex".into(),
            status: JobStatus::Pending,
            date_received: Utc::now(),
        }
    }

    fn quote() -> Quote {
        let now = Utc::now();
        Quote {
            id: Uuid::new_v4(),
            labor_hours: dec!(1),
            labor_rate: dec!(500),
            tax_rate: dec!(0.15),
            parts: vec![],
            created_at: now,
            valid_until: now + Duration::days(30),
        }
    }

    #[tokio::test]
    async fn create_then_get_returns_same_id() {
        let store = InMemoryRepairJobStore::new();
        let id = store.create(new_job("c1", None)).await.unwrap();

        let job = store.get_by_id(&id).await.unwrap().unwrap();
        assert_eq!(job.id, id);
        assert!(!job.id.is_empty());
        assert_eq!(store.get_by_id(&id).await.unwrap(), Some(job));
    }

    #[tokio::test]
    async fn writes_to_missing_job_report_none() {
        let store = InMemoryRepairJobStore::new();
        assert!(store.append_quote("nope", quote()).await.unwrap().is_none());
        assert!(store
            .append_note("nope", Note::new("x", Utc::now()))
            .await
            .unwrap()
            .is_none());
        let patch = JobPatch {
            status: JobStatus::Diagnosis,
            last_updated: Utc::now(),
            expected_version: None,
        };
        assert!(store.update_status("nope", patch).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn concurrent_appends_are_not_lost() {
        let store = InMemoryRepairJobStore::new();
        let id = store.create(new_job("c1", None)).await.unwrap();

        let results = join_all((0..16).map(|_| store.append_quote(&id, quote()))).await;
        assert!(results.iter().all(|r| matches!(r, Ok(Some(_)))));

        let job = store.get_by_id(&id).await.unwrap().unwrap();
        assert_eq!(job.quotes.len(), 16);
        assert_eq!(job.version, 16);
    }

    #[tokio::test]
    async fn stale_version_is_rejected() {
        let store = InMemoryRepairJobStore::new();
        let id = store.create(new_job("c1", None)).await.unwrap();
        store
            .append_note(&id, Note::new("checked fuse", Utc::now()))
            .await
            .unwrap();

        let patch = JobPatch {
            status: JobStatus::InProgress,
            last_updated: Utc::now(),
            expected_version: Some(0),
        };
        let err = store.update_status(&id, patch).await.unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn lookups_by_customer_and_serial() {
        let store = InMemoryRepairJobStore::new();
        store.create(new_job("c1", Some("SN-9"))).await.unwrap();
        store.create(new_job("c1", None)).await.unwrap();
        store.create(new_job("c2", Some("SN-9"))).await.unwrap();

        assert_eq!(store.get_by_customer("c1").await.unwrap().len(), 2);
        assert_eq!(store.get_by_serial_number("SN-9").await.unwrap().len(), 2);
        assert!(store.get_by_serial_number("SN-0").await.unwrap().is_empty());
        assert_eq!(store.len(), 3);
    }
}
