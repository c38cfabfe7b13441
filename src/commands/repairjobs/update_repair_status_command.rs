use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use validator::Validate;

use super::validate_not_blank;
use crate::{
    commands::{retry_transient, Command, CommandContext},
    errors::ServiceError,
    models::{JobStatus, RepairJob},
};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateRepairStatusCommand {
    #[validate(custom = "validate_not_blank")]
    pub job_id: String,
    pub new_status: JobStatus,
}

#[async_trait]
impl Command for UpdateRepairStatusCommand {
    type Result = RepairJob;

    #[instrument(skip(self, ctx), fields(job_id = %self.job_id, new_status = %self.new_status))]
    async fn execute(&self, ctx: Arc<CommandContext>) -> Result<Self::Result, ServiceError> {
        self.validate()?;

        let job = retry_transient(ctx.conflict_retries, || self.update_repair_status(&ctx)).await?;

        info!(version = job.version, "Repair job status updated");
        Ok(job)
    }
}

impl UpdateRepairStatusCommand {
    /// Read, check the transition against the current status, then write pinned to that read.
    async fn update_repair_status(&self, ctx: &CommandContext) -> Result<RepairJob, ServiceError> {
        let current = ctx
            .store
            .get_by_id(&self.job_id)
            .await?
            .ok_or_else(|| ServiceError::job_not_found(&self.job_id))?;

        let patch = ctx
            .lifecycle
            .status_patch(&current, self.new_status, Utc::now())?;

        ctx.store
            .update_status(&self.job_id, patch)
            .await?
            .ok_or_else(|| ServiceError::job_not_found(&self.job_id))
    }
}
