//! Lending engine: the one component callers talk to.
//!
//! Every public operation runs in a single store transaction. An early return
//! drops the transaction, which discards whatever it had written.

pub mod catalog;
pub mod loans;
pub mod members;
pub mod seed;

use std::sync::Arc;

use crate::{
    clock::Clock,
    config::LendingConfig,
    error::{AppError, AppResult},
    repository::{Store, StoreTx},
};

#[derive(Clone)]
pub struct LendingEngine {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    config: LendingConfig,
}

impl LendingEngine {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>, config: LendingConfig) -> Self {
        Self { store, clock, config }
    }

    /// Check that the backing store answers
    pub async fn ping(&self) -> AppResult<()> {
        self.store.ping().await
    }

    async fn begin(&self) -> AppResult<Box<dyn StoreTx>> {
        self.store.begin().await.map_err(|e| {
            if let AppError::StoreBusy = e {
                tracing::warn!("Could not start a transaction in time");
            }
            e
        })
    }
}
