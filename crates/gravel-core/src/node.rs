//! Node kinds and the per-kind structural rules of a resource document.
//!
//! Every node in a [`ResourceTree`](crate::tree::ResourceTree) carries a
//! [`NodeKind`]. The kind decides which children may be attached, which
//! attributes are mandatory, which defaults are injected at end of node, and
//! which textual ids the node contributes to the document-wide uniqueness
//! check.

use crate::id::NodeId;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Attribute names
// ---------------------------------------------------------------------------

pub const ATTR_NAME: &str = "name";
pub const ATTR_ID: &str = "id";
pub const ATTR_COMMENT: &str = "comment";
pub const ATTR_EXPR: &str = "expr";
pub const ATTR_SEQ: &str = "seq";
pub const ATTR_ALLOW_PSEUDO: &str = "allow_pseudo";
pub const ATTR_BASE_DIR: &str = "base_dir";
pub const ATTR_SOURCE_LANG_ID: &str = "source_lang_id";
pub const ATTR_LATEST_PUBLIC_RELEASE: &str = "latest_public_release";
pub const ATTR_CURRENT_RELEASE: &str = "current_release";
pub const ATTR_ENC_CHECK: &str = "enc_check";
pub const ATTR_TC_PROJECT: &str = "tc_project";

/// Sentinel stored in the root's `enc_check` attribute. A document whose
/// sentinel reads back differently was not decoded as UTF-8.
pub const ENCODING_CHECK: &str = "m\u{f6}l";

/// Default for the root's `tc_project` attribute.
pub const TC_PROJECT_UNSET: &str = "NEED_TO_SET_tc_project_ATTRIBUTE";

// ---------------------------------------------------------------------------
// NodeKind
// ---------------------------------------------------------------------------

/// The closed set of node kinds a resource document is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// `<grit>`: the document root.
    #[serde(rename = "grit")]
    Root,
    /// `<release>`: a versioned grouping container.
    Release,
    /// `<if>`: a conditional branch.
    #[serde(rename = "if")]
    Conditional,
    Includes,
    Messages,
    Structures,
    Identifiers,
    Translations,
    Outputs,
    Include,
    Message,
    Structure,
    Identifier,
    /// `<ph>`: a message placeholder. Its `name` is not an identifier.
    #[serde(rename = "ph")]
    Placeholder,
    Output,
    /// `<file>`: a translation file reference.
    #[serde(rename = "file")]
    TranslationFile,
}

impl NodeKind {
    pub const ALL: [NodeKind; 16] = [
        NodeKind::Root,
        NodeKind::Release,
        NodeKind::Conditional,
        NodeKind::Includes,
        NodeKind::Messages,
        NodeKind::Structures,
        NodeKind::Identifiers,
        NodeKind::Translations,
        NodeKind::Outputs,
        NodeKind::Include,
        NodeKind::Message,
        NodeKind::Structure,
        NodeKind::Identifier,
        NodeKind::Placeholder,
        NodeKind::Output,
        NodeKind::TranslationFile,
    ];

    /// The element name this kind is written as in a document.
    pub fn tag(self) -> &'static str {
        match self {
            NodeKind::Root => "grit",
            NodeKind::Release => "release",
            NodeKind::Conditional => "if",
            NodeKind::Includes => "includes",
            NodeKind::Messages => "messages",
            NodeKind::Structures => "structures",
            NodeKind::Identifiers => "identifiers",
            NodeKind::Translations => "translations",
            NodeKind::Outputs => "outputs",
            NodeKind::Include => "include",
            NodeKind::Message => "message",
            NodeKind::Structure => "structure",
            NodeKind::Identifier => "identifier",
            NodeKind::Placeholder => "ph",
            NodeKind::Output => "output",
            NodeKind::TranslationFile => "file",
        }
    }

    /// Look up a kind by its element name.
    pub fn from_tag(tag: &str) -> Option<NodeKind> {
        NodeKind::ALL.into_iter().find(|k| k.tag() == tag)
    }

    /// The kind a conditional nested directly under this container may hold.
    /// `None` means a conditional is not allowed to hold anything here.
    pub fn conditional_child_kind(self) -> Option<NodeKind> {
        match self {
            NodeKind::Includes => Some(NodeKind::Include),
            NodeKind::Messages => Some(NodeKind::Message),
            NodeKind::Structures => Some(NodeKind::Structure),
            _ => None,
        }
    }

    /// Whether `child` may be attached under a node of this kind.
    ///
    /// Conditionals have no fixed answer: their accepted child kind comes
    /// from their own parent, so `parent_kind` must be supplied for them.
    pub fn valid_child(self, child: NodeKind, parent_kind: Option<NodeKind>) -> bool {
        use NodeKind::*;
        match self {
            Root => matches!(child, Release | Translations | Outputs | Identifiers),
            Release => matches!(child, Includes | Messages | Structures | Identifiers),
            Conditional => parent_kind
                .and_then(NodeKind::conditional_child_kind)
                .is_some_and(|accepted| accepted == child),
            Includes => matches!(child, Include | Conditional),
            Messages => matches!(child, Message | Conditional),
            Structures => matches!(child, Structure | Conditional),
            Identifiers => child == Identifier,
            Translations => child == TranslationFile,
            Outputs => child == Output,
            Message => child == Placeholder,
            Include | Structure | Identifier | Placeholder | Output | TranslationFile => false,
        }
    }

    /// Attributes that must be present by the time the node ends.
    pub fn mandatory_attributes(self) -> &'static [&'static str] {
        match self {
            NodeKind::Root => &[ATTR_LATEST_PUBLIC_RELEASE, ATTR_CURRENT_RELEASE],
            NodeKind::Release => &[ATTR_SEQ],
            NodeKind::Conditional => &[ATTR_EXPR],
            NodeKind::Include | NodeKind::Structure => &[ATTR_NAME, "type", "file"],
            NodeKind::Message | NodeKind::Identifier | NodeKind::Placeholder => &[ATTR_NAME],
            NodeKind::Output => &["filename", "type"],
            NodeKind::TranslationFile => &["path", "lang"],
            _ => &[],
        }
    }

    /// Attributes injected at end of node when the document omits them.
    pub fn default_attributes(self) -> &'static [(&'static str, &'static str)] {
        match self {
            NodeKind::Root => &[
                (ATTR_BASE_DIR, "."),
                (ATTR_SOURCE_LANG_ID, "en"),
                (ATTR_ENC_CHECK, ENCODING_CHECK),
                (ATTR_TC_PROJECT, TC_PROJECT_UNSET),
            ],
            NodeKind::Release => &[(ATTR_ALLOW_PSEUDO, "true")],
            NodeKind::Identifier => &[(ATTR_COMMENT, ""), (ATTR_ID, "")],
            _ => &[],
        }
    }

    /// Whether nodes of this kind contribute their `name` as a textual id.
    pub fn contributes_name(self) -> bool {
        matches!(
            self,
            NodeKind::Include | NodeKind::Message | NodeKind::Structure | NodeKind::Identifier
        )
    }

    /// Placeholder nodes carry a `name` that is local to their message.
    pub fn is_placeholder(self) -> bool {
        self == NodeKind::Placeholder
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<{}>", self.tag())
    }
}

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

/// A single node in the document tree.
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) kind: NodeKind,
    pub(crate) attrs: IndexMap<String, String>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) parent: Option<NodeId>,
    /// Set once `end_node` has run for this node.
    pub(crate) ended: bool,
}

impl Node {
    pub(crate) fn new(kind: NodeKind, parent: Option<NodeId>) -> Self {
        Self {
            kind,
            attrs: IndexMap::new(),
            children: Vec::new(),
            parent,
            ended: false,
        }
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Attributes in assignment order, defaults last.
    pub fn attributes(&self) -> &IndexMap<String, String> {
        &self.attrs
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    /// The ids this node asks to be unique across the whole document.
    pub fn textual_ids(&self) -> Vec<&str> {
        if !self.kind.contributes_name() {
            return Vec::new();
        }
        self.attribute(ATTR_NAME).into_iter().collect()
    }
}
