use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use validator::Validate;

use super::{validate_not_blank, validate_problem_description};
use crate::{
    commands::{Command, CommandContext},
    errors::ServiceError,
    models::RepairJob,
    services::lifecycle::Intake,
};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SubmitRepairRequestCommand {
    #[validate(custom = "validate_not_blank")]
    pub customer_id: String,
    #[validate(custom = "validate_not_blank")]
    pub customer_name: String,
    #[validate(custom = "validate_not_blank")]
    pub item_model: String,
    pub serial_number: Option<String>,
    #[validate(custom = "validate_problem_description")]
    pub problem_description: String,
}

#[async_trait]
impl Command for SubmitRepairRequestCommand {
    type Result = RepairJob;

    #[instrument(skip(self, ctx), fields(customer_id = %self.customer_id))]
    async fn execute(&self, ctx: Arc<CommandContext>) -> Result<Self::Result, ServiceError> {
        self.validate()?;

        let new_job = ctx.lifecycle.intake(
            Intake {
                customer_id: self.customer_id.clone(),
                customer_name: self.customer_name.clone(),
                item_model: self.item_model.clone(),
                serial_number: self.serial_number.clone(),
                problem_description: self.problem_description.clone(),
            },
            Utc::now(),
        );

        let id = ctx.store.create(new_job.clone()).await.map_err(|e| {
            error!("Failed to create repair job: {}", e);
            e
        })?;

        info!(job_id = %id, "Repair request submitted");
        Ok(new_job.into_job(id))
    }
}
