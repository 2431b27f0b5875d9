pub mod backend;
pub mod code;
pub mod config;
pub mod envelope;
pub mod service;
pub mod store;
pub mod sync;

pub use backend::{InsertOutcome, MemoryShareBackend, ShareBackend, SharedRecord};
pub use code::ShareCode;
pub use config::{RetryPolicy, ShareConfig};
pub use envelope::{FLOW_CONTENT_TYPE, FlowContent, ShareEnvelope, Visibility};
pub use service::ShareService;
pub use store::{FlowStore, MemoryFlowStore};
pub use sync::{SaveCoordinator, SaveReport};
