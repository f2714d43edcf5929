//! Gravel Core -- the document model for resource build descriptions.
//!
//! A resource document is a tree of typed nodes rooted at a `<grit>` node.
//! It declares releases, resource sections (includes, messages, structures,
//! identifiers), translations and build outputs. Subtrees may sit under
//! `<if>` conditionals that are evaluated per build output.
//!
//! # Lifecycle
//!
//! Trees are built incrementally, the way a streaming parser produces them:
//!
//! ```rust,ignore
//! let mut tree = ResourceTree::new();
//! let root = tree.start_node(NodeKind::Root, None)?;
//! tree.handle_attribute(root, "latest_public_release", "1")?;
//! tree.handle_attribute(root, "current_release", "2")?;
//! // ... children ...
//! tree.end_node(root)?; // end-of-parse validation, then sealed
//! tree.set_own_dir("/src/app/resources")?;
//! ```
//!
//! Structural rules are checked when a node is attached, attribute rules
//! when a value is assigned, and document-wide rules (encoding marker,
//! release ordering, textual id uniqueness) when the root ends.
//!
//! # Key Types
//!
//! - [`tree::ResourceTree`] -- Node arena, lifecycle protocol and traversal.
//! - [`node::NodeKind`] -- Closed set of node kinds and their rules.
//! - [`tree::DocumentError`] -- Every failure, classified by
//!   [`tree::ErrorCategory`].
//! - [`expr::Condition`] / [`expr::EvalContext`] -- The condition language.
//! - [`system_ids::SystemIdentifiers`] -- Ids exempt from uniqueness.
//! - [`formatter::FormatterRegistry`] -- Output-kind dispatch.

pub mod attribute;
pub mod conditional;
pub mod document;
pub mod expr;
pub mod formatter;
pub mod id;
pub mod identifier;
pub mod node;
pub mod release;
pub mod system_ids;
pub mod tree;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use expr::{Condition, EvalContext, EvalError, Value};
pub use formatter::{Dispatch, EmitterHandle, FormatterRegistry, OutputKind};
pub use id::NodeId;
pub use node::{Node, NodeKind};
pub use system_ids::{NoSystemIdentifiers, RegexSystemIdentifiers, SystemIdentifiers};
pub use tree::{DocumentError, ErrorCategory, ResourceTree};
