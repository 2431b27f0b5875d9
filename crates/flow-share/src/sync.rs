//! Save coordination.
//!
//! A save persists a `FlowSnapshot` taken when the save was requested.
//! The editor keeps running meanwhile; edits made while the save is in
//! flight have a newer revision and leave the engine dirty, so the next
//! save carries them (last write wins, no merge).

use crate::config::RetryPolicy;
use crate::store::FlowStore;
use flow_core::{Flow, FlowError, FlowId, FlowSnapshot};
use std::sync::Arc;

/// The result of a successful save.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveReport {
    /// Revision the snapshot was taken at; pass to `mark_saved`.
    pub revision: u64,
    pub attempts: u32,
    pub flow: Flow,
}

pub struct SaveCoordinator<S: FlowStore + ?Sized> {
    store: Arc<S>,
    policy: RetryPolicy,
}

impl<S: FlowStore + ?Sized> SaveCoordinator<S> {
    pub fn new(store: Arc<S>, policy: RetryPolicy) -> Self {
        Self { store, policy }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Persist `snapshot`, retrying retryable failures with backoff.
    /// On failure the caller's in-memory state is untouched and stays dirty.
    pub async fn save(&self, id: &FlowId, snapshot: FlowSnapshot) -> Result<SaveReport, FlowError> {
        let patch = snapshot.to_patch();
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.store.save_flow(id, patch.clone()).await {
                Ok(flow) => {
                    log::debug!(
                        "saved {id} at revision {} after {attempt} attempt(s)",
                        snapshot.revision
                    );
                    return Ok(SaveReport {
                        revision: snapshot.revision,
                        attempts: attempt,
                        flow,
                    });
                }
                Err(err) if err.is_retryable() && attempt < max_attempts => {
                    let delay = self.policy.backoff(attempt);
                    log::warn!("save of {id} failed ({err}); retry {attempt} in {delay:?}");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    log::warn!("save of {id} failed after {attempt} attempt(s): {err}");
                    return Err(err);
                }
            }
        }
    }
}
