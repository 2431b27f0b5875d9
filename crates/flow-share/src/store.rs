//! Flow persistence contract.
//!
//! The editor only ever talks to storage through `FlowStore`. The in-memory
//! implementation keeps each flow as a MessagePack blob so tests exercise
//! the same encode/decode path a real store would.

use async_trait::async_trait;
use chrono::Utc;
use flow_core::{EntityKind, Flow, FlowError, FlowHeader, FlowId, FlowPatch, NewFlow};
use std::collections::HashMap;
use tokio::sync::RwLock;

#[async_trait]
pub trait FlowStore: Send + Sync {
    async fn load_flow(&self, id: &FlowId) -> Result<Flow, FlowError>;

    /// Apply `patch` to the stored flow and return the result.
    async fn save_flow(&self, id: &FlowId, patch: FlowPatch) -> Result<Flow, FlowError>;

    async fn create_flow(&self, new_flow: NewFlow) -> Result<Flow, FlowError>;

    /// Delete a flow and its document.
    async fn delete_flow(&self, id: &FlowId) -> Result<(), FlowError>;

    /// Headers of every flow owned by `owner_id`, most recently updated first.
    async fn list_flows(&self, owner_id: &str) -> Result<Vec<FlowHeader>, FlowError>;
}

#[derive(Debug, Default)]
pub struct MemoryFlowStore {
    blobs: RwLock<HashMap<FlowId, Vec<u8>>>,
}

fn encode(flow: &Flow) -> Result<Vec<u8>, FlowError> {
    Ok(rmp_serde::to_vec_named(flow)?)
}

fn decode(bytes: &[u8]) -> Result<Flow, FlowError> {
    rmp_serde::from_slice(bytes)
        .map_err(|e| FlowError::Persistence(format!("corrupt flow record: {e}")))
}

impl MemoryFlowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a flow as-is (keeping its id), e.g. to seed fixtures.
    pub async fn put(&self, flow: &Flow) -> Result<(), FlowError> {
        let bytes = encode(flow)?;
        self.blobs.write().await.insert(flow.header.id.clone(), bytes);
        Ok(())
    }

    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl FlowStore for MemoryFlowStore {
    async fn load_flow(&self, id: &FlowId) -> Result<Flow, FlowError> {
        let blobs = self.blobs.read().await;
        let bytes = blobs
            .get(id)
            .ok_or_else(|| FlowError::not_found(EntityKind::Flow, id))?;
        decode(bytes)
    }

    async fn save_flow(&self, id: &FlowId, patch: FlowPatch) -> Result<Flow, FlowError> {
        let mut blobs = self.blobs.write().await;
        let bytes = blobs
            .get(id)
            .ok_or_else(|| FlowError::not_found(EntityKind::Flow, id))?;
        let mut flow = decode(bytes)?;
        flow.apply_patch(patch);
        blobs.insert(id.clone(), encode(&flow)?);
        log::debug!("saved flow {id} ({} nodes)", flow.document.nodes.len());
        Ok(flow)
    }

    async fn create_flow(&self, new_flow: NewFlow) -> Result<Flow, FlowError> {
        let flow = new_flow.into_flow();
        self.put(&flow).await?;
        log::debug!("created flow {} for {}", flow.header.id, flow.header.owner_id);
        Ok(flow)
    }

    async fn delete_flow(&self, id: &FlowId) -> Result<(), FlowError> {
        self.blobs
            .write()
            .await
            .remove(id)
            .map(drop)
            .ok_or_else(|| FlowError::not_found(EntityKind::Flow, id))
    }

    async fn list_flows(&self, owner_id: &str) -> Result<Vec<FlowHeader>, FlowError> {
        let blobs = self.blobs.read().await;
        let mut headers = blobs
            .values()
            .map(|bytes| decode(bytes).map(|f| f.header))
            .filter(|h| h.as_ref().map_or(true, |h| h.owner_id == owner_id))
            .collect::<Result<Vec<_>, _>>()?;
        headers.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(headers)
    }
}
