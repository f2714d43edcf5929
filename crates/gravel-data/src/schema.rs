//! Serde data file structs for resource documents and build configuration.
//!
//! A document file describes the node tree directly; the loader replays it
//! through the lifecycle protocol so every structural and attribute rule is
//! enforced exactly as for any other producer.

use gravel_core::node::NodeKind;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

// ===========================================================================
// Documents
// ===========================================================================

/// One node and its subtree. Attributes keep file order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentData {
    pub kind: NodeKind,
    #[serde(default)]
    pub attrs: IndexMap<String, String>,
    #[serde(default)]
    pub children: Vec<DocumentData>,
}

impl DocumentData {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            attrs: IndexMap::new(),
            children: Vec::new(),
        }
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.insert(name.to_string(), value.to_string());
        self
    }

    pub fn child(mut self, child: DocumentData) -> Self {
        self.children.push(child);
        self
    }

    /// Number of nodes in this subtree.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(DocumentData::node_count).sum::<usize>()
    }
}

// ===========================================================================
// Build configuration
// ===========================================================================

/// A free-form flag value exposed to condition expressions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlagValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

/// Output context for one build, as written in a config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildConfigData {
    pub output_language: String,
    #[serde(default)]
    pub defines: IndexMap<String, String>,
    /// Defaults to the host platform.
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub flags: IndexMap<String, FlagValue>,
}
