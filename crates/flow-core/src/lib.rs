pub mod config;
pub mod document;
pub mod error;
pub mod flow;
pub mod id;
pub mod library;
pub mod model;

pub use config::EditorConfig;
pub use document::FlowDocument;
pub use error::{EntityKind, FlowError};
pub use flow::{Flow, FlowHeader, FlowPatch, FlowSnapshot, FlowTemplate, NewFlow, Tags};
pub use id::{EdgeId, FlowId, NodeId};
pub use library::{StaticLibrary, Technique, TechniqueLibrary};
pub use model::*;

// Re-export petgraph index types so downstream crates don't need a direct dependency
pub use petgraph::stable_graph::{EdgeIndex, NodeIndex};
