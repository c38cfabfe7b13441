use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use validator::Validate;

use super::{validate_note_content, validate_not_blank};
use crate::{
    commands::{Command, CommandContext},
    errors::ServiceError,
    models::RepairJob,
};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AddRepairNoteCommand {
    #[validate(custom = "validate_not_blank")]
    pub job_id: String,
    #[validate(custom = "validate_note_content")]
    pub content: String,
}

#[async_trait]
impl Command for AddRepairNoteCommand {
    type Result = RepairJob;

    #[instrument(skip(self, ctx), fields(job_id = %self.job_id))]
    async fn execute(&self, ctx: Arc<CommandContext>) -> Result<Self::Result, ServiceError> {
        self.validate()?;

        let note = ctx.lifecycle.note(&self.content, Utc::now());
        let job = ctx
            .store
            .append_note(&self.job_id, note)
            .await
            .map_err(|e| {
                error!("Failed to add note to repair job {}: {}", self.job_id, e);
                e
            })?
            .ok_or_else(|| ServiceError::job_not_found(&self.job_id))?;

        info!(notes = job.notes.len(), "Note added to repair job");
        Ok(job)
    }
}
