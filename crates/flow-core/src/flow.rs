//! The owning Flow record: metadata plus one graph document.

use crate::document::FlowDocument;
use crate::id::FlowId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

pub type Tags = SmallVec<[String; 4]>;

/// Flow metadata. The unit of ownership is the user account `owner_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowHeader {
    pub id: FlowId,
    pub owner_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Tags,
    #[serde(default)]
    pub is_favorite: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FlowHeader {
    pub fn new(owner_id: impl Into<String>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: FlowId::generate(),
            owner_id: owner_id.into(),
            name: name.into(),
            description: String::new(),
            tags: Tags::new(),
            is_favorite: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A persisted flow: header plus document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flow {
    pub header: FlowHeader,
    pub document: FlowDocument,
}

impl Flow {
    /// An empty flow.
    pub fn new(owner_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            header: FlowHeader::new(owner_id, name),
            document: FlowDocument::default(),
        }
    }

    /// A new flow seeded from a template. Template ids are reused: they are
    /// scoped to the new flow and never compared across flows.
    pub fn from_template(owner_id: impl Into<String>, template: &FlowTemplate) -> Self {
        let mut header = FlowHeader::new(owner_id, template.name.clone());
        header.description = template.description.clone();
        header.tags = template.tags.clone();
        Self {
            header,
            document: template.document.clone(),
        }
    }

    pub fn id(&self) -> &FlowId {
        &self.header.id
    }

    /// Apply a persistence patch and bump `updated_at`.
    pub fn apply_patch(&mut self, patch: FlowPatch) {
        patch.apply_to_header(&mut self.header);
        if let Some(document) = patch.document {
            self.document = document;
        }
        self.header.updated_at = Utc::now();
    }
}

/// Data needed to create a flow through the persistence store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewFlow {
    pub owner_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Tags,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default)]
    pub document: FlowDocument,
}

impl NewFlow {
    pub fn into_flow(self) -> Flow {
        let mut header = FlowHeader::new(self.owner_id, self.name);
        header.description = self.description;
        header.tags = self.tags;
        header.is_favorite = self.is_favorite;
        Flow {
            header,
            document: self.document,
        }
    }
}

/// Partial update sent to `saveFlow`. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Tags>,
    pub is_favorite: Option<bool>,
    pub document: Option<FlowDocument>,
}

impl FlowPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.tags.is_none()
            && self.is_favorite.is_none()
            && self.document.is_none()
    }

    pub fn apply_to_header(&self, header: &mut FlowHeader) {
        if let Some(name) = &self.name {
            header.name = name.clone();
        }
        if let Some(description) = &self.description {
            header.description = description.clone();
        }
        if let Some(tags) = &self.tags {
            header.tags = tags.clone();
        }
        if let Some(fav) = self.is_favorite {
            header.is_favorite = fav;
        }
    }
}

/// A reusable starting point for new flows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowTemplate {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Tags,
    pub document: FlowDocument,
}

/// The in-memory state at one revision, captured for a save.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowSnapshot {
    pub revision: u64,
    pub header: FlowHeader,
    pub document: FlowDocument,
}

impl FlowSnapshot {
    /// The full-replacement patch that persists this snapshot.
    pub fn to_patch(&self) -> FlowPatch {
        FlowPatch {
            name: Some(self.header.name.clone()),
            description: Some(self.header.description.clone()),
            tags: Some(self.header.tags.clone()),
            is_favorite: Some(self.header.is_favorite),
            document: Some(self.document.clone()),
        }
    }
}
