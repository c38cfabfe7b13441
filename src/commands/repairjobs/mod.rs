//! Repair job commands.
//!
//! One command per workflow write. Reads go straight through
//! [`crate::services::RepairJobService`] to the store.

use validator::ValidationError;

use crate::models::{MAX_NOTE_LENGTH, MIN_PROBLEM_DESCRIPTION_LENGTH};

pub mod add_repair_note_command;
pub mod generate_quote_command;
pub mod submit_repair_request_command;
pub mod update_repair_status_command;

pub use add_repair_note_command::AddRepairNoteCommand;
pub use generate_quote_command::{GenerateQuoteCommand, GenerateQuoteResult};
pub use submit_repair_request_command::SubmitRepairRequestCommand;
pub use update_repair_status_command::UpdateRepairStatusCommand;

pub(crate) fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("required");
        err.message = Some("must not be blank".into());
        return Err(err);
    }
    Ok(())
}

pub(crate) fn validate_problem_description(value: &str) -> Result<(), ValidationError> {
    if value.trim().chars().count() < MIN_PROBLEM_DESCRIPTION_LENGTH {
        let mut err = ValidationError::new("length");
        err.message = Some(
            format!(
                "must be at least {} characters",
                MIN_PROBLEM_DESCRIPTION_LENGTH
            )
            .into(),
        );
        return Err(err);
    }
    Ok(())
}

pub(crate) fn validate_note_content(value: &str) -> Result<(), ValidationError> {
    validate_not_blank(value)?;
    if value.trim().chars().count() > MAX_NOTE_LENGTH {
        let mut err = ValidationError::new("length");
        err.message = Some(format!("must be at most {} characters", MAX_NOTE_LENGTH).into());
        return Err(err);
    }
    Ok(())
}
