//! Content envelopes stored under a share code.
//!
//! The sharing backend is content-agnostic: techniques, flows and other
//! kinds all travel as `{ content_type, content_data, title, description,
//! visibility }`. For flows `content_data` is a `FlowContent`.

use flow_core::model::{FlowEdge, FlowNode};
use flow_core::{Flow, FlowDocument, FlowError, Tags};
use serde::{Deserialize, Serialize};

pub const FLOW_CONTENT_TYPE: &str = "flow";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Listed in the public gallery.
    Public,
    /// Reachable only by someone who has the code.
    #[default]
    LinkOnly,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareEnvelope {
    pub content_type: String,
    pub content_data: serde_json::Value,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub visibility: Visibility,
}

/// `content_data` of a flow envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowContent {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Tags,
    #[serde(default)]
    pub nodes: Vec<FlowNode>,
    #[serde(default)]
    pub edges: Vec<FlowEdge>,
}

impl FlowContent {
    pub fn from_flow(flow: &Flow) -> Self {
        Self {
            name: flow.header.name.clone(),
            description: flow.header.description.clone(),
            tags: flow.header.tags.clone(),
            nodes: flow.document.nodes.clone(),
            edges: flow.document.edges.clone(),
        }
    }

    pub fn document(&self) -> FlowDocument {
        FlowDocument {
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
        }
    }
}

impl ShareEnvelope {
    pub fn for_flow(flow: &Flow, visibility: Visibility) -> Result<Self, FlowError> {
        let content = FlowContent::from_flow(flow);
        Ok(Self {
            content_type: FLOW_CONTENT_TYPE.to_string(),
            content_data: serde_json::to_value(&content)?,
            title: flow.header.name.clone(),
            description: flow.header.description.clone(),
            visibility,
        })
    }

    pub fn is_public(&self) -> bool {
        self.visibility == Visibility::Public
    }

    /// Decode the payload as a flow. Fails with `WrongContentType` when the
    /// envelope holds some other kind of content.
    pub fn flow_content(&self) -> Result<FlowContent, FlowError> {
        if self.content_type != FLOW_CONTENT_TYPE {
            return Err(FlowError::WrongContentType {
                expected: FLOW_CONTENT_TYPE.to_string(),
                found: self.content_type.clone(),
            });
        }
        Ok(serde_json::from_value(self.content_data.clone())?)
    }
}
