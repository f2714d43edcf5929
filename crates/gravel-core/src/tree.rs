use crate::expr::EvalError;
use crate::formatter::FormatterRegistry;
use crate::id::NodeId;
use crate::node::{Node, NodeKind};
use crate::system_ids::{RegexSystemIdentifiers, SystemIdentifiers};
use indexmap::IndexMap;
use slotmap::SlotMap;
use std::path::PathBuf;
use tracing::debug;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors raised while building or validating a resource document.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("{0} cannot be the document root")]
    InvalidRoot(NodeKind),

    #[error("document already has a root node")]
    RootAlreadySet,

    #[error("{child} is not a valid child of {parent}")]
    InvalidChild { parent: NodeKind, child: NodeKind },

    #[error("{node} is missing mandatory attribute '{attribute}'")]
    MissingMandatoryAttribute {
        node: NodeKind,
        attribute: &'static str,
    },

    #[error("{parent} ended before its child {child}")]
    UnterminatedChild { parent: NodeKind, child: NodeKind },

    #[error("{0} has already ended")]
    NodeEnded(NodeKind),

    #[error("node not found: {0:?}")]
    NodeNotFound(NodeId),

    #[error("document has no root node")]
    NoRoot,

    #[error("document is sealed after end of parse")]
    Sealed,

    #[error("own directory must not be empty")]
    EmptyOwnDir,

    #[error("own directory has already been set")]
    OwnDirAlreadySet,

    #[error("expected a {expected} node, found {found}")]
    WrongKind { expected: NodeKind, found: NodeKind },

    #[error("unexpected attribute '{attribute}' on {node}")]
    UnexpectedAttribute { node: NodeKind, attribute: String },

    #[error("invalid value '{value}' for attribute '{attribute}' on {node}: {reason}")]
    InvalidAttribute {
        node: NodeKind,
        attribute: String,
        value: String,
        reason: String,
    },

    #[error(
        "latest_public_release ({latest}) cannot have a greater value than current_release ({current})"
    )]
    ReleaseOrder { latest: u32, current: u32 },

    #[error("wrong encoding check '{found}': is the document UTF-8 encoded and uncorrupted?")]
    EncodingCheck { found: String },

    #[error("duplicate textual ids: {}", .0.join(", "))]
    DuplicateKey(Vec<String>),

    #[error(transparent)]
    Evaluation(#[from] EvalError),

    #[error("missing {0} element")]
    MissingElement(NodeKind),
}

/// Coarse classification of a [`DocumentError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Invalid attachment, missing mandatory attribute, misuse of the
    /// lifecycle protocol.
    Structural,
    /// An attribute value rejected at assignment time.
    Attribute,
    /// A document-wide check failed at end of parse.
    Validation,
    /// The document's encoding marker is wrong.
    Configuration,
    /// One or more textual ids collide.
    DuplicateKey,
    /// A condition expression could not be evaluated.
    Evaluation,
    /// A required section is absent.
    MissingElement,
}

impl DocumentError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            DocumentError::InvalidRoot(_)
            | DocumentError::RootAlreadySet
            | DocumentError::InvalidChild { .. }
            | DocumentError::MissingMandatoryAttribute { .. }
            | DocumentError::UnterminatedChild { .. }
            | DocumentError::NodeEnded(_)
            | DocumentError::NodeNotFound(_)
            | DocumentError::NoRoot
            | DocumentError::Sealed
            | DocumentError::EmptyOwnDir
            | DocumentError::OwnDirAlreadySet
            | DocumentError::WrongKind { .. } => ErrorCategory::Structural,
            DocumentError::UnexpectedAttribute { .. } | DocumentError::InvalidAttribute { .. } => {
                ErrorCategory::Attribute
            }
            DocumentError::ReleaseOrder { .. } => ErrorCategory::Validation,
            DocumentError::EncodingCheck { .. } => ErrorCategory::Configuration,
            DocumentError::DuplicateKey(_) => ErrorCategory::DuplicateKey,
            DocumentError::Evaluation(_) => ErrorCategory::Evaluation,
            DocumentError::MissingElement(_) => ErrorCategory::MissingElement,
        }
    }
}

// ---------------------------------------------------------------------------
// ResourceTree
// ---------------------------------------------------------------------------

/// A resource document: an arena of nodes rooted at a single `<grit>` node,
/// plus the document-wide state the root owns.
///
/// Nodes are added through a three-step protocol mirroring a streaming
/// parser: [`start_node`](Self::start_node) attaches a node under its
/// parent, [`handle_attribute`](Self::handle_attribute) assigns attributes,
/// and [`end_node`](Self::end_node) closes it. Ending the root runs the
/// end-of-parse validation and seals the tree against further mutation.
pub struct ResourceTree {
    pub(crate) nodes: SlotMap<NodeId, Node>,
    pub(crate) root: Option<NodeId>,
    pub(crate) sealed: bool,

    /// Base directory resolved by `set_own_dir`.
    pub(crate) resolved_base_dir: Option<PathBuf>,
    pub(crate) output_language: String,
    pub(crate) defines: IndexMap<String, String>,

    pub(crate) system_ids: Box<dyn SystemIdentifiers>,
    pub(crate) formatters: FormatterRegistry,
}

impl std::fmt::Debug for ResourceTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceTree")
            .field("nodes", &self.nodes.len())
            .field("root", &self.root)
            .field("sealed", &self.sealed)
            .field("resolved_base_dir", &self.resolved_base_dir)
            .field("output_language", &self.output_language)
            .field("defines", &self.defines)
            .finish_non_exhaustive()
    }
}

impl Default for ResourceTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceTree {
    /// Create an empty tree using the default system-identifier pattern and
    /// the built-in formatter table.
    pub fn new() -> Self {
        Self {
            nodes: SlotMap::with_key(),
            root: None,
            sealed: false,
            resolved_base_dir: None,
            output_language: String::new(),
            defines: IndexMap::new(),
            system_ids: Box::new(RegexSystemIdentifiers::default()),
            formatters: FormatterRegistry::builtin(),
        }
    }

    /// Replace the predicate deciding which ids are exempt from the
    /// uniqueness check.
    pub fn with_system_identifiers(mut self, ids: impl SystemIdentifiers + 'static) -> Self {
        self.system_ids = Box::new(ids);
        self
    }

    /// Replace the output-kind dispatch table.
    pub fn with_formatters(mut self, formatters: FormatterRegistry) -> Self {
        self.formatters = formatters;
        self
    }

    // -----------------------------------------------------------------------
    // Lifecycle protocol
    // -----------------------------------------------------------------------

    /// Attach a new node of `kind` under `parent`, or as the root when
    /// `parent` is `None`. Fails if the parent does not accept the kind.
    pub fn start_node(
        &mut self,
        kind: NodeKind,
        parent: Option<NodeId>,
    ) -> Result<NodeId, DocumentError> {
        self.ensure_unsealed()?;

        let Some(parent) = parent else {
            if self.root.is_some() {
                return Err(DocumentError::RootAlreadySet);
            }
            if kind != NodeKind::Root {
                return Err(DocumentError::InvalidRoot(kind));
            }
            let id = self.nodes.insert(Node::new(kind, None));
            self.root = Some(id);
            debug!(node = ?id, "root attached");
            return Ok(id);
        };

        let parent_node = self.node(parent)?;
        if parent_node.ended {
            return Err(DocumentError::NodeEnded(parent_node.kind));
        }
        let grandparent_kind = parent_node
            .parent
            .and_then(|gp| self.nodes.get(gp))
            .map(Node::kind);
        if !parent_node.kind.valid_child(kind, grandparent_kind) {
            return Err(DocumentError::InvalidChild {
                parent: parent_node.kind,
                child: kind,
            });
        }

        let id = self.nodes.insert(Node::new(kind, Some(parent)));
        self.nodes[parent].children.push(id);
        debug!(node = ?id, kind = kind.tag(), "node attached");
        Ok(id)
    }

    /// Assign an attribute, validating it against the node's kind first.
    pub fn handle_attribute(
        &mut self,
        node: NodeId,
        name: &str,
        value: &str,
    ) -> Result<(), DocumentError> {
        self.ensure_unsealed()?;
        let current = self.node(node)?;
        if current.ended {
            return Err(DocumentError::NodeEnded(current.kind));
        }
        match current.kind {
            NodeKind::Root => crate::document::validate_root_attribute(name, value)?,
            NodeKind::Release => self.validate_release_attribute(name, value)?,
            _ => {}
        }
        self.nodes[node]
            .attrs
            .insert(name.to_string(), value.to_string());
        Ok(())
    }

    /// Close a node: all children must have ended, mandatory attributes must
    /// be present, and defaults are injected for anything still missing.
    /// Closing the root runs end-of-parse validation and seals the tree.
    pub fn end_node(&mut self, node: NodeId) -> Result<(), DocumentError> {
        self.ensure_unsealed()?;
        let current = self.node(node)?;
        let kind = current.kind;
        if current.ended {
            return Err(DocumentError::NodeEnded(kind));
        }
        if let Some(open) = current
            .children
            .iter()
            .filter_map(|c| self.nodes.get(*c))
            .find(|c| !c.ended)
        {
            return Err(DocumentError::UnterminatedChild {
                parent: kind,
                child: open.kind,
            });
        }
        if let Some(missing) = kind
            .mandatory_attributes()
            .iter()
            .find(|attr| !current.attrs.contains_key(**attr))
        {
            return Err(DocumentError::MissingMandatoryAttribute {
                node: kind,
                attribute: *missing,
            });
        }

        let entry = &mut self.nodes[node];
        for (name, default) in kind.default_attributes() {
            entry
                .attrs
                .entry((*name).to_string())
                .or_insert_with(|| (*default).to_string());
        }
        entry.ended = true;

        if kind == NodeKind::Root {
            self.end_of_parse()?;
            self.sealed = true;
        }
        Ok(())
    }

    fn ensure_unsealed(&self) -> Result<(), DocumentError> {
        if self.sealed {
            Err(DocumentError::Sealed)
        } else {
            Ok(())
        }
    }

    // -----------------------------------------------------------------------
    // Read access
    // -----------------------------------------------------------------------

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub(crate) fn require_root(&self) -> Result<NodeId, DocumentError> {
        self.root.ok_or(DocumentError::NoRoot)
    }

    /// True once the root has ended successfully.
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn node(&self, id: NodeId) -> Result<&Node, DocumentError> {
        self.nodes.get(id).ok_or(DocumentError::NodeNotFound(id))
    }

    /// Fetch a node and check its kind.
    pub(crate) fn node_of_kind(
        &self,
        id: NodeId,
        expected: NodeKind,
    ) -> Result<&Node, DocumentError> {
        let node = self.node(id)?;
        if node.kind != expected {
            return Err(DocumentError::WrongKind {
                expected,
                found: node.kind,
            });
        }
        Ok(node)
    }

    pub fn kind(&self, id: NodeId) -> Option<NodeKind> {
        self.nodes.get(id).map(Node::kind)
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.nodes.get(id).and_then(|n| n.attribute(name))
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(Node::parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(id).map(Node::children).unwrap_or(&[])
    }

    /// Whether the node's immediate parent is a conditional.
    pub fn is_direct_child_of_conditional(&self, id: NodeId) -> bool {
        self.parent(id).and_then(|p| self.kind(p)) == Some(NodeKind::Conditional)
    }

    /// Pre-order depth-first walk over `start` and all its descendants.
    pub fn iter_from(&self, start: NodeId) -> Descendants<'_> {
        let stack = if self.nodes.contains_key(start) {
            vec![start]
        } else {
            Vec::new()
        };
        Descendants { tree: self, stack }
    }

    /// Pre-order depth-first walk over the whole document.
    pub fn iter(&self) -> Descendants<'_> {
        Descendants {
            tree: self,
            stack: self.root.into_iter().collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Traversal
// ---------------------------------------------------------------------------

/// Iterator returned by [`ResourceTree::iter`] and
/// [`ResourceTree::iter_from`].
pub struct Descendants<'a> {
    tree: &'a ResourceTree,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.tree.children(id).iter().rev().copied());
        Some(id)
    }
}
