use std::sync::Arc;
use tracing::instrument;

use crate::{
    commands::{
        repairjobs::{
            AddRepairNoteCommand, GenerateQuoteCommand, GenerateQuoteResult,
            SubmitRepairRequestCommand, UpdateRepairStatusCommand,
        },
        Command, CommandContext,
    },
    errors::ServiceError,
    models::RepairJob,
    repositories::{JobFilter, RepairJobStore},
};

/// Technician workflow over the repair job collection.
#[derive(Clone)]
pub struct RepairJobService {
    ctx: Arc<CommandContext>,
}

impl RepairJobService {
    pub fn new(ctx: Arc<CommandContext>) -> Self {
        Self { ctx }
    }

    fn store(&self) -> &dyn RepairJobStore {
        self.ctx.store.as_ref()
    }

    /// Opens a new Pending job for a customer's device.
    #[instrument(skip(self, command))]
    pub async fn submit_repair_request(
        &self,
        command: SubmitRepairRequestCommand,
    ) -> Result<RepairJob, ServiceError> {
        command.execute(self.ctx.clone()).await
    }

    /// Costs a quote and appends it to the job.
    #[instrument(skip(self, command))]
    pub async fn generate_quote(
        &self,
        command: GenerateQuoteCommand,
    ) -> Result<GenerateQuoteResult, ServiceError> {
        command.execute(self.ctx.clone()).await
    }

    #[instrument(skip(self, command))]
    pub async fn update_status(
        &self,
        command: UpdateRepairStatusCommand,
    ) -> Result<RepairJob, ServiceError> {
        command.execute(self.ctx.clone()).await
    }

    #[instrument(skip(self, command))]
    pub async fn add_note(&self, command: AddRepairNoteCommand) -> Result<RepairJob, ServiceError> {
        command.execute(self.ctx.clone()).await
    }

    /// Gets a repair job by id. A missing job is `Ok(None)`.
    #[instrument(skip(self))]
    pub async fn get_job(&self, job_id: &str) -> Result<Option<RepairJob>, ServiceError> {
        self.store().get_by_id(job_id).await
    }

    #[instrument(skip(self))]
    pub async fn find_by_customer(&self, customer_id: &str) -> Result<Vec<RepairJob>, ServiceError> {
        self.store().get_by_customer(customer_id).await
    }

    #[instrument(skip(self))]
    pub async fn find_all(&self, filter: &JobFilter) -> Result<Vec<RepairJob>, ServiceError> {
        self.store().get_all(filter).await
    }

    #[instrument(skip(self))]
    pub async fn find_by_serial_number(
        &self,
        serial_number: &str,
    ) -> Result<Vec<RepairJob>, ServiceError> {
        self.store().get_by_serial_number(serial_number.trim()).await
    }

    /// Open jobs a technician can still quote, newest first.
    #[instrument(skip(self))]
    pub async fn jobs_awaiting_quote(&self) -> Result<Vec<RepairJob>, ServiceError> {
        let jobs = self.store().get_all(&JobFilter::default()).await?;
        Ok(jobs.into_iter().filter(|j| j.status.is_active()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::JobStatus;
    use crate::repositories::{InMemoryRepairJobStore, MockRepairJobStore};
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    fn service() -> RepairJobService {
        let store = Arc::new(InMemoryRepairJobStore::new());
        RepairJobService::new(Arc::new(CommandContext::new(store)))
    }

    fn request(customer: &str, serial: Option<&str>) -> SubmitRepairRequestCommand {
        SubmitRepairRequestCommand {
            customer_id: customer.into(),
            customer_name: format!("Customer {}", customer),
            item_model: "Laptop XYZ".into(),
            serial_number: serial.map(str::to_string),
            problem_description: "Keyboard stops responding".into(),
        }
    }

    #[tokio::test]
    async fn full_workflow() {
        let service = service();
        let job = service
            .submit_repair_request(request("c-1", Some("SN-42")))
            .await
            .unwrap();

        service
            .generate_quote(GenerateQuoteCommand {
                job_id: job.id.clone(),
                labor_hours: dec!(1.5),
                labor_rate: dec!(750),
                parts: vec![],
            })
            .await
            .unwrap();
        service
            .add_note(AddRepairNoteCommand {
                job_id: job.id.clone(),
                content: "Customer approved quote".into(),
            })
            .await
            .unwrap();
        let updated = service
            .update_status(UpdateRepairStatusCommand {
                job_id: job.id.clone(),
                new_status: JobStatus::InProgress,
            })
            .await
            .unwrap();

        assert_eq!(updated.status, JobStatus::InProgress);
        assert_eq!(updated.quotes.len(), 1);
        assert_eq!(updated.notes.len(), 1);

        let first = service.get_job(&job.id).await.unwrap();
        let second = service.get_job(&job.id).await.unwrap();
        assert_eq!(first, second);

        let by_serial = service.find_by_serial_number(" SN-42 ").await.unwrap();
        assert_eq!(by_serial.len(), 1);
        assert!(service.find_by_serial_number("SN-4").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn awaiting_quote_excludes_closed_jobs() {
        let service = service();
        let open = service.submit_repair_request(request("c-1", None)).await.unwrap();
        let done = service.submit_repair_request(request("c-2", None)).await.unwrap();
        service
            .update_status(UpdateRepairStatusCommand {
                job_id: done.id.clone(),
                new_status: JobStatus::Completed,
            })
            .await
            .unwrap();

        let awaiting = service.jobs_awaiting_quote().await.unwrap();
        let ids: Vec<&str> = awaiting.iter().map(|j| j.id.as_str()).collect();
        assert_eq!(ids, vec![open.id.as_str()]);
    }

    #[tokio::test]
    async fn customer_listing_is_scoped() {
        let service = service();
        service.submit_repair_request(request("c-1", None)).await.unwrap();
        service.submit_repair_request(request("c-2", None)).await.unwrap();
        service.submit_repair_request(request("c-1", None)).await.unwrap();

        let mine = service.find_by_customer("c-1").await.unwrap();
        assert_eq!(mine.len(), 2);
        assert!(mine.iter().all(|j| j.customer_id == "c-1"));
        assert!(mine[0].date_received >= mine[1].date_received);
    }

    #[tokio::test]
    async fn store_outage_surfaces_as_store_error() {
        let mut store = MockRepairJobStore::new();
        store
            .expect_get_all()
            .returning(|_| Err(ServiceError::InternalError("connection reset".into())));
        let service = RepairJobService::new(Arc::new(CommandContext::new(Arc::new(store))));

        let err = service.jobs_awaiting_quote().await.unwrap_err();
        assert_matches!(err.kind(), crate::errors::ErrorKind::Store);
    }
}
