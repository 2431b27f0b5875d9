use async_trait::async_trait;
use flow_core::model::NodeKind;
use flow_core::{EditorConfig, Flow, FlowError, FlowHeader, FlowId, FlowPatch, NewFlow};
use flow_editor::EditEngine;
use flow_share::{FlowStore, MemoryFlowStore, RetryPolicy, SaveCoordinator};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

/// Fails the first `failures` saves with a retryable error.
struct FlakyStore {
    inner: MemoryFlowStore,
    failures: AtomicU32,
    calls: AtomicU32,
}

impl FlakyStore {
    fn new(failures: u32) -> Self {
        Self {
            inner: MemoryFlowStore::new(),
            failures: AtomicU32::new(failures),
            calls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl FlowStore for FlakyStore {
    async fn load_flow(&self, id: &FlowId) -> Result<Flow, FlowError> {
        self.inner.load_flow(id).await
    }

    async fn save_flow(&self, id: &FlowId, patch: FlowPatch) -> Result<Flow, FlowError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let left = self.failures.load(Ordering::SeqCst);
        if left > 0 {
            self.failures.store(left - 1, Ordering::SeqCst);
            return Err(FlowError::Persistence("connection reset".into()));
        }
        self.inner.save_flow(id, patch).await
    }

    async fn create_flow(&self, new_flow: NewFlow) -> Result<Flow, FlowError> {
        self.inner.create_flow(new_flow).await
    }

    async fn delete_flow(&self, id: &FlowId) -> Result<(), FlowError> {
        self.inner.delete_flow(id).await
    }

    async fn list_flows(&self, owner_id: &str) -> Result<Vec<FlowHeader>, FlowError> {
        self.inner.list_flows(owner_id).await
    }
}

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

async fn open_engine(store: &dyn FlowStore) -> EditEngine {
    let flow = store
        .create_flow(NewFlow {
            owner_id: "u1".into(),
            name: "Mount escapes".into(),
            description: String::new(),
            tags: Default::default(),
            is_favorite: false,
            document: Default::default(),
        })
        .await
        .unwrap();
    EditEngine::open(flow, EditorConfig::default()).unwrap()
}

#[tokio::test]
async fn transient_failures_are_retried() {
    init_logging();
    let store = Arc::new(FlakyStore::new(2));
    let mut engine = open_engine(store.as_ref()).await;
    engine.add_node(NodeKind::Technique, Some("Upa"), None);

    let coordinator = SaveCoordinator::new(store.clone(), RetryPolicy::immediate(3));
    let id = engine.header().id.clone();
    let report = coordinator.save(&id, engine.snapshot()).await.unwrap();
    assert_eq!(report.attempts, 3);
    engine.mark_saved(report.revision);
    assert!(!engine.is_dirty());

    let stored = store.load_flow(&id).await.unwrap();
    assert_eq!(stored.document, engine.document());
}

#[tokio::test]
async fn exhausted_retries_keep_local_edits() {
    init_logging();
    let store = Arc::new(FlakyStore::new(5));
    let mut engine = open_engine(store.as_ref()).await;
    engine.add_node(NodeKind::Technique, Some("Elbow escape"), None);
    let before = engine.document();

    let coordinator = SaveCoordinator::new(store.clone(), RetryPolicy::immediate(2));
    let id = engine.header().id.clone();
    let err = coordinator.save(&id, engine.snapshot()).await.unwrap_err();
    assert!(matches!(err, FlowError::Persistence(_)));
    assert_eq!(store.calls.load(Ordering::SeqCst), 2);

    assert!(engine.is_dirty());
    assert_eq!(engine.document(), before);
}

#[tokio::test]
async fn missing_flow_is_not_retried() {
    let store = Arc::new(FlakyStore::new(0));
    let coordinator = SaveCoordinator::new(store.clone(), RetryPolicy::immediate(4));
    let engine = EditEngine::new(FlowHeader::new("u1", "Never created"), EditorConfig::default());
    let err = coordinator
        .save(&engine.header().id, engine.snapshot())
        .await
        .unwrap_err();
    assert!(matches!(err, FlowError::NotFound { .. }));
    assert_eq!(store.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn edits_during_a_save_leave_the_engine_dirty() {
    init_logging();
    let store = Arc::new(MemoryFlowStore::new());
    let mut engine = open_engine(store.as_ref()).await;
    engine.add_node(NodeKind::Condition, Some("Mount bottom"), None);

    let coordinator = SaveCoordinator::new(store.clone(), RetryPolicy::default());
    let id = engine.header().id.clone();
    let snapshot = engine.snapshot();
    let pending = coordinator.save(&id, snapshot);

    // The user keeps editing while the save is in flight
    engine.add_node(NodeKind::Technique, Some("Bridge"), None);

    let report = pending.await.unwrap();
    engine.mark_saved(report.revision);
    assert!(engine.is_dirty());
    assert_eq!(store.load_flow(&id).await.unwrap().document.nodes.len(), 1);

    // The next save carries the newer edit
    let report = coordinator.save(&id, engine.snapshot()).await.unwrap();
    engine.mark_saved(report.revision);
    assert!(!engine.is_dirty());
    assert_eq!(store.load_flow(&id).await.unwrap().document.nodes.len(), 2);
}
