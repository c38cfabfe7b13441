use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use validator::Validate;

use super::validate_not_blank;
use crate::{
    commands::{Command, CommandContext},
    errors::{ServiceError, ValidationFailure},
    models::{Quote, QuoteBreakdown, QuotePart},
};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GenerateQuoteCommand {
    #[validate(custom = "validate_not_blank")]
    pub job_id: String,
    pub labor_hours: Decimal,
    pub labor_rate: Decimal,
    #[serde(default)]
    pub parts: Vec<QuotePart>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateQuoteResult {
    pub job_id: String,
    pub quote: Quote,
    pub breakdown: QuoteBreakdown,
}

#[async_trait]
impl Command for GenerateQuoteCommand {
    type Result = GenerateQuoteResult;

    #[instrument(skip(self, ctx), fields(job_id = %self.job_id))]
    async fn execute(&self, ctx: Arc<CommandContext>) -> Result<Self::Result, ServiceError> {
        self.validate_inputs(&ctx)?;

        let parts: Vec<QuotePart> = self.parts.iter().map(normalize_part).collect();
        let breakdown = ctx
            .calculator
            .calculate(self.labor_hours, self.labor_rate, &parts)?;
        let quote = ctx.lifecycle.quote(
            self.labor_hours,
            self.labor_rate,
            ctx.calculator.tax_rate(),
            parts,
            Utc::now(),
        );

        ctx.store
            .append_quote(&self.job_id, quote.clone())
            .await
            .map_err(|e| {
                error!("Failed to append quote to repair job {}: {}", self.job_id, e);
                e
            })?
            .ok_or_else(|| ServiceError::job_not_found(&self.job_id))?;

        info!(
            quote_id = %quote.id,
            grand_total = %breakdown.rounded().grand_total,
            "Quote generated"
        );

        Ok(GenerateQuoteResult {
            job_id: self.job_id.clone(),
            quote,
            breakdown,
        })
    }
}

impl GenerateQuoteCommand {
    /// Field checks and costing limits reported together.
    fn validate_inputs(&self, ctx: &CommandContext) -> Result<(), ServiceError> {
        let mut failure = match self.validate() {
            Ok(()) => ValidationFailure::new(),
            Err(errors) => errors.into(),
        };
        match ctx
            .calculator
            .validate(self.labor_hours, self.labor_rate, &self.parts)
        {
            Ok(()) => {}
            Err(ServiceError::ValidationError(more)) => failure.violations.extend(more.violations),
            Err(other) => return Err(other),
        }
        failure.into_result()
    }
}

fn normalize_part(part: &QuotePart) -> QuotePart {
    let trimmed = |value: &Option<String>| {
        value
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    QuotePart {
        part_name: part.part_name.trim().to_string(),
        part_number: trimmed(&part.part_number),
        description: trimmed(&part.description),
        quantity: part.quantity,
        unit_price: part.unit_price,
    }
}
