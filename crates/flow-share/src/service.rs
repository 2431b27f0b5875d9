//! Share-code issuance, resolution and import.

use crate::backend::{InsertOutcome, ShareBackend, SharedRecord};
use crate::code::ShareCode;
use crate::config::ShareConfig;
use crate::envelope::{FLOW_CONTENT_TYPE, FlowContent, ShareEnvelope, Visibility};
use crate::store::FlowStore;
use flow_core::model::FlowGraph;
use flow_core::{Flow, FlowError, NewFlow};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::{Arc, Mutex};

pub struct ShareService<B: ShareBackend + ?Sized> {
    backend: Arc<B>,
    config: ShareConfig,
    rng: Mutex<StdRng>,
}

impl<B: ShareBackend + ?Sized> ShareService<B> {
    pub fn new(backend: Arc<B>, config: ShareConfig) -> Self {
        Self::with_rng(backend, config, StdRng::from_os_rng())
    }

    /// Use a caller-supplied generator, e.g. a seeded one in tests.
    pub fn with_rng(backend: Arc<B>, config: ShareConfig, rng: StdRng) -> Self {
        Self {
            backend,
            config,
            rng: Mutex::new(rng),
        }
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    fn next_code(&self) -> ShareCode {
        match self.rng.lock() {
            Ok(mut rng) => ShareCode::generate(&mut *rng),
            // A panic elsewhere while holding the lock leaves the RNG usable
            Err(poisoned) => ShareCode::generate(&mut *poisoned.into_inner()),
        }
    }

    /// Store `envelope` under a fresh code, retrying on collisions.
    pub async fn share(&self, envelope: ShareEnvelope) -> Result<ShareCode, FlowError> {
        let attempts = self.config.max_code_attempts.max(1);
        for attempt in 1..=attempts {
            let code = self.next_code();
            match self.backend.insert_shared(&code, envelope.clone()).await? {
                InsertOutcome::Inserted => {
                    log::debug!("shared {} as {code}", envelope.content_type);
                    return Ok(code);
                }
                InsertOutcome::CodeTaken => {
                    log::debug!("share code {code} taken (attempt {attempt}/{attempts})");
                }
            }
        }
        Err(FlowError::Persistence(format!(
            "no free share code after {attempts} attempts"
        )))
    }

    pub async fn share_flow(&self, flow: &Flow, visibility: Visibility) -> Result<ShareCode, FlowError> {
        self.share(ShareEnvelope::for_flow(flow, visibility)?).await
    }

    /// Look up a code as typed by a user.
    pub async fn resolve(&self, input: &str) -> Result<SharedRecord, FlowError> {
        let not_found = || FlowError::ShareCodeNotFound(input.trim().to_string());
        let code = ShareCode::parse(input).ok_or_else(not_found)?;
        self.backend.get_shared(&code).await?.ok_or_else(not_found)
    }

    /// Resolve a code that must hold a flow.
    pub async fn resolve_flow(&self, input: &str) -> Result<FlowContent, FlowError> {
        self.resolve(input).await?.envelope.flow_content()
    }

    /// Import a shared flow as a brand-new flow owned by `owner_id`.
    /// Node and edge ids are reused verbatim; they are scoped to the flow.
    pub async fn import_flow<S: FlowStore + ?Sized>(
        &self,
        input: &str,
        owner_id: &str,
        store: &S,
    ) -> Result<Flow, FlowError> {
        let content = self.resolve_flow(input).await?;
        let document = content.document();
        // Refuse documents the editor could not open
        FlowGraph::from_document(&document)?;
        let flow = store
            .create_flow(NewFlow {
                owner_id: owner_id.to_string(),
                name: content.name,
                description: content.description,
                tags: content.tags,
                is_favorite: false,
                document,
            })
            .await?;
        log::debug!("imported {} into {} for {owner_id}", input.trim(), flow.header.id);
        Ok(flow)
    }

    /// Public shared flows, newest first.
    pub async fn list_public_flows(&self, limit: usize) -> Result<Vec<SharedRecord>, FlowError> {
        let limit = limit.min(self.config.max_public_listing);
        self.backend.list_public(FLOW_CONTENT_TYPE, limit).await
    }
}
