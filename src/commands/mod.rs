use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use tracing::warn;

use crate::errors::ServiceError;
use crate::repositories::RepairJobStore;
use crate::services::{QuoteCalculator, RepairJobLifecycle};

pub mod repairjobs;

/// Command trait for implementing the Command Pattern
///
/// Each workflow write is a single object that validates its own input and
/// then performs one logical store operation.
#[async_trait]
pub trait Command: Send + Sync {
    /// The return type of the command when executed successfully
    type Result;

    /// Execute the command against the shared dependencies in `ctx`.
    async fn execute(&self, ctx: Arc<CommandContext>) -> Result<Self::Result, ServiceError>;
}

/// Dependencies handed to every command. Built once per [`crate::RepairDesk`].
#[derive(Clone)]
pub struct CommandContext {
    pub store: Arc<dyn RepairJobStore>,
    pub calculator: QuoteCalculator,
    pub lifecycle: RepairJobLifecycle,
    /// Extra attempts allowed when a read-validate-write loses a race.
    pub conflict_retries: u32,
}

impl CommandContext {
    pub fn new(store: Arc<dyn RepairJobStore>) -> Self {
        Self {
            store,
            calculator: QuoteCalculator::default(),
            lifecycle: RepairJobLifecycle::default(),
            conflict_retries: 1,
        }
    }

    pub fn with_calculator(mut self, calculator: QuoteCalculator) -> Self {
        self.calculator = calculator;
        self
    }

    pub fn with_lifecycle(mut self, lifecycle: RepairJobLifecycle) -> Self {
        self.lifecycle = lifecycle;
        self
    }

    pub fn with_conflict_retries(mut self, retries: u32) -> Self {
        self.conflict_retries = retries;
        self
    }
}

/// Runs `op` again while it fails with a transient error, at most `retries` extra times.
pub(crate) async fn retry_transient<T, F, Fut>(retries: u32, mut op: F) -> Result<T, ServiceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ServiceError>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Err(err) if err.is_transient() && attempt < retries => {
                attempt += 1;
                warn!(attempt, "Retrying after transient failure: {}", err);
            }
            other => return other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn retries_transient_failures_once() {
        let calls = AtomicU32::new(0);
        let result = retry_transient(1, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(ServiceError::ConcurrentModification("job".into()))
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn gives_up_after_retry_budget() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retry_transient(1, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ServiceError::ConcurrentModification("job".into())) }
        })
        .await;

        assert!(matches!(result, Err(ServiceError::ConcurrentModification(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn does_not_retry_other_errors() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retry_transient(3, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ServiceError::job_not_found("missing")) }
        })
        .await;

        assert!(result.unwrap_err().is_not_found());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
