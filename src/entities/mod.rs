pub mod repair_job;
