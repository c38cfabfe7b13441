use async_trait::async_trait;
use chrono::{Duration, NaiveTime};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder,
};
use std::sync::Arc;
use tracing::{debug, error, instrument, warn};
use uuid::Uuid;

use super::{JobFilter, RepairJobStore};
use crate::entities::repair_job::{ActiveModel, Column, Entity as RepairJobEntity};
use crate::errors::ServiceError;
use crate::models::{JobPatch, NewRepairJob, Note, Quote, RepairJob};

/// Default number of extra attempts after a version conflict.
pub const DEFAULT_CONFLICT_RETRIES: u32 = 1;

/// sea-orm backed job collection.
///
/// Every write is a compare-and-swap on the `version` column, so two
/// technicians appending to the same job never overwrite each other.
#[derive(Debug, Clone)]
pub struct RepairJobRepository {
    db: Arc<DatabaseConnection>,
    conflict_retries: u32,
}

impl RepairJobRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            db,
            conflict_retries: DEFAULT_CONFLICT_RETRIES,
        }
    }

    pub fn with_conflict_retries(mut self, retries: u32) -> Self {
        self.conflict_retries = retries;
        self
    }

    fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    async fn find_all(&self, condition: Condition) -> Result<Vec<RepairJob>, ServiceError> {
        let models = RepairJobEntity::find()
            .filter(condition)
            .order_by_desc(Column::DateReceived)
            .order_by_desc(Column::Id)
            .all(self.db())
            .await
            .map_err(ServiceError::db_error)?;

        models.into_iter().map(RepairJob::try_from).collect()
    }

    /// Writes `next` only if the stored version is still `expected_version`.
    /// Returns false when another writer got there first.
    async fn compare_and_swap(
        &self,
        next: &RepairJob,
        expected_version: i64,
    ) -> Result<bool, ServiceError> {
        let result = RepairJobEntity::update_many()
            .col_expr(Column::Status, Expr::value(next.status))
            .col_expr(Column::LastUpdated, Expr::value(next.last_updated))
            .col_expr(Column::Quotes, Expr::value(serde_json::to_value(&next.quotes)?))
            .col_expr(Column::Notes, Expr::value(serde_json::to_value(&next.notes)?))
            .col_expr(Column::Version, Expr::value(next.version))
            .filter(Column::Id.eq(next.id.as_str()))
            .filter(Column::Version.eq(expected_version))
            .exec(self.db())
            .await
            .map_err(ServiceError::db_error)?;

        Ok(result.rows_affected == 1)
    }

    /// Read-modify-write loop keyed on the document version.
    async fn modify<F>(&self, id: &str, mutate: F) -> Result<Option<RepairJob>, ServiceError>
    where
        F: Fn(&mut RepairJob) -> Result<(), ServiceError> + Send + Sync,
    {
        let mut attempt = 0;
        loop {
            let Some(current) = self.get_by_id(id).await? else {
                return Ok(None);
            };

            let mut next = current.clone();
            mutate(&mut next)?;
            next.version = current.version + 1;

            if self.compare_and_swap(&next, current.version).await? {
                return Ok(Some(next));
            }

            if attempt >= self.conflict_retries {
                error!(
                    "Giving up on repair job {} after {} conflicting writes",
                    id,
                    attempt + 1
                );
                return Err(ServiceError::ConcurrentModification(id.to_string()));
            }
            attempt += 1;
            warn!(
                "Version conflict on repair job {} (attempt {}), retrying",
                id, attempt
            );
        }
    }
}

#[async_trait]
impl RepairJobStore for RepairJobRepository {
    #[instrument(skip(self, job), err)]
    async fn create(&self, job: NewRepairJob) -> Result<String, ServiceError> {
        let id = Uuid::new_v4().to_string();
        let job = job.into_job(id.clone());

        ActiveModel::from_job(&job)?
            .insert(self.db())
            .await
            .map_err(|e| {
                error!("Failed to create repair job: {}", e);
                ServiceError::DatabaseError(e)
            })?;

        debug!("Repair job {} created", id);
        Ok(id)
    }

    #[instrument(skip(self), err)]
    async fn get_by_id(&self, id: &str) -> Result<Option<RepairJob>, ServiceError> {
        RepairJobEntity::find_by_id(id.to_string())
            .one(self.db())
            .await
            .map_err(ServiceError::db_error)?
            .map(RepairJob::try_from)
            .transpose()
    }

    #[instrument(skip(self), err)]
    async fn get_by_customer(&self, customer_id: &str) -> Result<Vec<RepairJob>, ServiceError> {
        self.find_all(Condition::all().add(Column::CustomerId.eq(customer_id)))
            .await
    }

    #[instrument(skip(self), err)]
    async fn get_all(&self, filter: &JobFilter) -> Result<Vec<RepairJob>, ServiceError> {
        let mut condition = Condition::all();

        if let Some(status) = filter.status {
            condition = condition.add(Column::Status.eq(status));
        }

        if let Some(day) = filter.received_on {
            let start = day.and_time(NaiveTime::MIN).and_utc();
            let end = start + Duration::days(1);
            condition = condition
                .add(Column::DateReceived.gte(start))
                .add(Column::DateReceived.lt(end));
        }

        if let Some(customer_id) = &filter.customer_id {
            condition = condition.add(Column::CustomerId.eq(customer_id.as_str()));
        }

        let mut jobs = self.find_all(condition).await?;
        // SQL lower() is ASCII-only on SQLite; match names the same way the memory store does.
        if filter.customer_name_prefix.is_some() {
            jobs.retain(|job| filter.matches(job));
        }
        Ok(jobs)
    }

    #[instrument(skip(self), err)]
    async fn get_by_serial_number(
        &self,
        serial_number: &str,
    ) -> Result<Vec<RepairJob>, ServiceError> {
        self.find_all(Condition::all().add(Column::SerialNumber.eq(serial_number)))
            .await
    }

    #[instrument(skip(self, quote), fields(quote_id = %quote.id), err)]
    async fn append_quote(
        &self,
        id: &str,
        quote: Quote,
    ) -> Result<Option<RepairJob>, ServiceError> {
        self.modify(id, |job| {
            job.last_updated = job.last_updated.max(quote.created_at);
            job.quotes.push(quote.clone());
            Ok(())
        })
        .await
    }

    #[instrument(skip(self, note), err)]
    async fn append_note(&self, id: &str, note: Note) -> Result<Option<RepairJob>, ServiceError> {
        self.modify(id, |job| {
            job.last_updated = job.last_updated.max(note.timestamp);
            job.notes.push(note.clone());
            Ok(())
        })
        .await
    }

    #[instrument(skip(self), err)]
    async fn update_status(
        &self,
        id: &str,
        patch: JobPatch,
    ) -> Result<Option<RepairJob>, ServiceError> {
        self.modify(id, |job| {
            if let Some(expected) = patch.expected_version {
                if job.version != expected {
                    return Err(ServiceError::ConcurrentModification(job.id.clone()));
                }
            }
            job.status = patch.status;
            job.last_updated = job.last_updated.max(patch.last_updated);
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::repair_job::Model;
    use crate::models::{JobStatus, QuotePart};
    use assert_matches::assert_matches;
    use chrono::{DateTime, TimeZone, Utc};
    use rust_decimal_macros::dec;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn received() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()
    }

    fn stored(version: i64, quotes: Vec<Quote>) -> Model {
        Model {
            id: "job-1".into(),
            item_model: "Laptop XYZ".into(),
            serial_number: None,
            problem_description: "Screen flickers on boot".into(),
            status: JobStatus::Diagnosis,
            date_received: received(),
            last_updated: received(),
            customer_id: "c-1".into(),
            customer_name: "Jane Smith".into(),
            quotes: serde_json::to_value(quotes).unwrap(),
            notes: serde_json::json!([]),
            version,
        }
    }

    fn quote(hour: u32) -> Quote {
        let created = Utc.with_ymd_and_hms(2024, 6, 2, hour, 0, 0).unwrap();
        Quote {
            id: Uuid::new_v4(),
            labor_hours: dec!(1),
            labor_rate: dec!(750),
            tax_rate: dec!(0.15),
            parts: vec![QuotePart::new("Fan", 1, dec!(20))],
            created_at: created,
            valid_until: created + Duration::days(30),
        }
    }

    fn rows(affected: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected: affected,
        }
    }

    #[tokio::test]
    async fn lost_race_is_retried_against_fresh_version() {
        let rival = quote(9);
        let db = MockDatabase::new(DatabaseBackend::Sqlite)
            .append_query_results([[stored(0, vec![])], [stored(1, vec![rival.clone()])]])
            .append_exec_results([rows(0), rows(1)])
            .into_connection();
        let repo = RepairJobRepository::new(Arc::new(db));

        let mine = quote(10);
        let job = repo
            .append_quote("job-1", mine.clone())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(job.quotes, vec![rival, mine]);
        assert_eq!(job.version, 2);
        assert_eq!(job.last_updated, Utc.with_ymd_and_hms(2024, 6, 2, 10, 0, 0).unwrap());
    }

    #[tokio::test]
    async fn conflict_surfaces_once_retries_are_spent() {
        let db = MockDatabase::new(DatabaseBackend::Sqlite)
            .append_query_results([[stored(0, vec![])], [stored(1, vec![quote(9)])]])
            .append_exec_results([rows(0), rows(0)])
            .into_connection();
        let repo = RepairJobRepository::new(Arc::new(db));

        let err = repo.append_quote("job-1", quote(10)).await.unwrap_err();
        assert_matches!(err, ServiceError::ConcurrentModification(id) if id == "job-1");
    }

    #[tokio::test]
    async fn no_retry_budget_fails_on_first_conflict() {
        let db = MockDatabase::new(DatabaseBackend::Sqlite)
            .append_query_results([[stored(0, vec![])]])
            .append_exec_results([rows(0)])
            .into_connection();
        let repo = RepairJobRepository::new(Arc::new(db)).with_conflict_retries(0);

        let err = repo
            .append_note("job-1", Note::new("checked fan", received()))
            .await
            .unwrap_err();
        assert!(err.is_transient());
    }
}
