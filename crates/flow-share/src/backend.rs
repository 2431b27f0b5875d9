//! Sharing backend contract and an in-memory implementation.

use crate::code::ShareCode;
use crate::envelope::ShareEnvelope;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use flow_core::FlowError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// An envelope as stored by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedRecord {
    pub code: ShareCode,
    pub envelope: ShareEnvelope,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// The code is already in use; nothing was written.
    CodeTaken,
}

#[async_trait]
pub trait ShareBackend: Send + Sync {
    /// Store `envelope` under `code` unless the code is taken.
    async fn insert_shared(
        &self,
        code: &ShareCode,
        envelope: ShareEnvelope,
    ) -> Result<InsertOutcome, FlowError>;

    async fn get_shared(&self, code: &ShareCode) -> Result<Option<SharedRecord>, FlowError>;

    /// Public envelopes of `content_type`, newest first, at most `limit`.
    async fn list_public(
        &self,
        content_type: &str,
        limit: usize,
    ) -> Result<Vec<SharedRecord>, FlowError>;
}

#[derive(Debug, Default)]
struct MemoryShares {
    records: HashMap<ShareCode, SharedRecord>,
    /// Codes in insertion order, to break timestamp ties.
    order: Vec<ShareCode>,
}

/// Backend kept in process memory, for tests and offline use.
#[derive(Debug, Default)]
pub struct MemoryShareBackend {
    inner: RwLock<MemoryShares>,
}

impl MemoryShareBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl ShareBackend for MemoryShareBackend {
    async fn insert_shared(
        &self,
        code: &ShareCode,
        envelope: ShareEnvelope,
    ) -> Result<InsertOutcome, FlowError> {
        let mut inner = self.inner.write().await;
        if inner.records.contains_key(code) {
            return Ok(InsertOutcome::CodeTaken);
        }
        inner.records.insert(
            code.clone(),
            SharedRecord {
                code: code.clone(),
                envelope,
                created_at: Utc::now(),
            },
        );
        inner.order.push(code.clone());
        Ok(InsertOutcome::Inserted)
    }

    async fn get_shared(&self, code: &ShareCode) -> Result<Option<SharedRecord>, FlowError> {
        Ok(self.inner.read().await.records.get(code).cloned())
    }

    async fn list_public(
        &self,
        content_type: &str,
        limit: usize,
    ) -> Result<Vec<SharedRecord>, FlowError> {
        let inner = self.inner.read().await;
        let mut public: Vec<(usize, &SharedRecord)> = inner
            .order
            .iter()
            .enumerate()
            .filter_map(|(seq, code)| inner.records.get(code).map(|r| (seq, r)))
            .filter(|(_, r)| r.envelope.is_public() && r.envelope.content_type == content_type)
            .collect();
        public.sort_by(|(sa, a), (sb, b)| b.created_at.cmp(&a.created_at).then(sb.cmp(sa)));
        Ok(public
            .into_iter()
            .take(limit)
            .map(|(_, r)| r.clone())
            .collect())
    }
}
