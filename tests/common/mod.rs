use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use tempfile::TempDir;
use repair_desk::{
    db::{self, DbConfig, DbPool},
    models::{JobStatus, NewRepairJob},
    repositories::RepairJobRepository,
};

/// Fresh in-memory SQLite database with the schema applied.
///
/// A single pooled connection keeps every query on the same in-memory database.
pub async fn test_pool() -> Arc<DbPool> {
    let pool = db::establish_connection_with_config(&DbConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
        min_connections: 1,
        ..Default::default()
    })
    .await
    .expect("failed to open sqlite memory database");
    db::run_migrations(&pool)
        .await
        .expect("failed to run migrations");
    Arc::new(pool)
}

pub async fn test_repository() -> RepairJobRepository {
    RepairJobRepository::new(test_pool().await)
}

/// SQLite file inside `dir`, so several pooled connections share one database.
#[allow(dead_code)]
pub fn file_database_url(dir: &TempDir) -> String {
    format!("sqlite://{}?mode=rwc", dir.path().join("repair-desk.db").display())
}

/// Migrated multi-connection pool where concurrent writers really interleave.
#[allow(dead_code)]
pub async fn file_pool(dir: &TempDir, max_connections: u32) -> Arc<DbPool> {
    let pool = db::establish_connection_with_config(&DbConfig {
        url: file_database_url(dir),
        max_connections,
        min_connections: 1,
        ..Default::default()
    })
    .await
    .expect("failed to open sqlite file database");
    db::run_migrations(&pool)
        .await
        .expect("failed to run migrations");
    Arc::new(pool)
}

#[allow(dead_code)]
pub fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, day, hour, 0, 0).unwrap()
}

#[allow(dead_code)]
pub fn new_job(customer_id: &str, customer_name: &str, received: DateTime<Utc>) -> NewRepairJob {
    NewRepairJob {
        item_model: "Laptop XYZ".to_string(),
        serial_number: Some(format!("SN-{}", customer_id)),
        problem_description: "Screen flickers after boot".to_string(),
        customer_id: customer_id.to_string(),
        customer_name: customer_name.to_string(),
        status: JobStatus::Pending,
        date_received: received,
    }
}
