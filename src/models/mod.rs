pub mod quote;
pub mod repair_job;

pub use quote::{Quote, QuoteBreakdown, QuotePart};
pub use repair_job::{
    JobPatch, JobStatus, NewRepairJob, Note, RepairJob, MAX_NOTE_LENGTH,
    MIN_PROBLEM_DESCRIPTION_LENGTH,
};
