use lasso::{Spur, ThreadedRodeo};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;

/// Global string interner for node and edge ids: cheap comparisons, small memory footprint.
static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::default);

/// Fresh opaque id text: `{prefix}_{uuid-simple}`.
fn fresh_text(prefix: &str) -> String {
    format!("{prefix}_{}", uuid::Uuid::new_v4().simple())
}

macro_rules! interned_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(Spur);

        impl $name {
            /// Intern a string as an id, or return the existing one.
            pub fn intern(s: &str) -> Self {
                $name(INTERNER.get_or_intern(s))
            }

            /// Resolve back to a string slice.
            pub fn as_str(&self) -> &str {
                INTERNER.resolve(&self.0)
            }

            /// Generate a new id that cannot collide with ids from other flows.
            pub fn generate() -> Self {
                Self::intern(&fresh_text($prefix))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.as_str())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Ok($name::intern(&s))
            }
        }
    };
}

interned_id!(
    /// Identifier of a node inside one flow. Interned: 4 bytes, `Copy`, O(1) `Eq`.
    NodeId,
    "node"
);

interned_id!(
    /// Identifier of an edge inside one flow.
    EdgeId,
    "edge"
);

/// Identifier of a persisted flow record. Owned by the persistence layer,
/// so it is a plain string rather than an interned handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlowId(pub String);

impl FlowId {
    pub fn generate() -> Self {
        FlowId(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FlowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FlowId {
    fn from(s: &str) -> Self {
        FlowId(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_roundtrip() {
        let a = NodeId::intern("guard_pull");
        let b = NodeId::intern("guard_pull");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "guard_pull");
    }

    #[test]
    fn generated_ids_are_unique_and_prefixed() {
        let a = NodeId::generate();
        let b = NodeId::generate();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("node_"));
        assert!(EdgeId::generate().as_str().starts_with("edge_"));
    }

    #[test]
    fn ids_serialize_as_plain_strings() {
        let id = EdgeId::intern("e1");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"e1\"");
        let back: EdgeId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
