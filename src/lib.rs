//! Repair Desk Library
//!
//! Repair job intake, quoting and status tracking for an electronics repair shop.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod commands;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod migrator;
pub mod models;
pub mod repositories;
pub mod services;

use std::sync::Arc;
use tracing::info;

use crate::commands::CommandContext;
use crate::config::AppConfig;
use crate::errors::ServiceError;
use crate::repositories::{InMemoryRepairJobStore, RepairJobRepository, RepairJobStore};
use crate::services::{DashboardService, QuoteService, RepairJobService};

/// Every service wired to one store handle.
#[derive(Clone)]
pub struct RepairDesk {
    pub repair_jobs: RepairJobService,
    pub quotes: QuoteService,
    pub dashboard: DashboardService,
    store: Arc<dyn RepairJobStore>,
}

impl RepairDesk {
    pub fn new(config: &AppConfig, store: Arc<dyn RepairJobStore>) -> Self {
        let ctx = CommandContext::new(store.clone())
            .with_calculator(config.calculator())
            .with_lifecycle(config.lifecycle())
            .with_conflict_retries(config.workflow.conflict_retries);

        Self {
            repair_jobs: RepairJobService::new(Arc::new(ctx)),
            quotes: QuoteService::new(store.clone()),
            dashboard: DashboardService::new(store.clone()),
            store,
        }
    }

    /// Backed by a fresh in-process store.
    pub fn in_memory(config: &AppConfig) -> Self {
        Self::new(config, Arc::new(InMemoryRepairJobStore::new()))
    }

    /// Opens the store named by `config.database_url`, migrating first when `auto_migrate` is set.
    pub async fn connect(config: &AppConfig) -> Result<Self, ServiceError> {
        if config.is_memory_store() {
            info!("Using in-memory repair job store");
            return Ok(Self::in_memory(config));
        }

        let pool = db::establish_connection_from_app_config(config)
            .await
            .map_err(ServiceError::db_error)?;
        if config.auto_migrate {
            db::run_migrations(&pool)
                .await
                .map_err(ServiceError::db_error)?;
        }

        let repository = RepairJobRepository::new(Arc::new(pool))
            .with_conflict_retries(config.workflow.conflict_retries);
        Ok(Self::new(config, Arc::new(repository)))
    }

    pub fn store(&self) -> Arc<dyn RepairJobStore> {
        self.store.clone()
    }
}
