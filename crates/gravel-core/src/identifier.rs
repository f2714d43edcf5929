//! `<identifier>` nodes: named resource ids with an optional explicit
//! numeric value.

use crate::id::NodeId;
use crate::node::{ATTR_COMMENT, ATTR_ID, ATTR_NAME, NodeKind};
use crate::tree::{DocumentError, ResourceTree};

impl ResourceTree {
    /// The explicit id of an identifier, or `None` when it was left unset.
    /// An empty `id` attribute means "no explicit id".
    pub fn get_id(&self, identifier: NodeId) -> Result<Option<&str>, DocumentError> {
        Ok(self.raw_id(identifier)?.filter(|id| !id.is_empty()))
    }

    /// The `id` attribute verbatim, including an empty string.
    pub fn raw_id(&self, identifier: NodeId) -> Result<Option<&str>, DocumentError> {
        let node = self.node_of_kind(identifier, NodeKind::Identifier)?;
        Ok(node.attribute(ATTR_ID))
    }

    /// Build a complete identifier under `parent` in one step.
    pub fn construct_identifier(
        &mut self,
        parent: NodeId,
        name: &str,
        id: &str,
        comment: &str,
    ) -> Result<NodeId, DocumentError> {
        let node = self.start_node(NodeKind::Identifier, Some(parent))?;
        self.handle_attribute(node, ATTR_NAME, name)?;
        self.handle_attribute(node, ATTR_ID, id)?;
        self.handle_attribute(node, ATTR_COMMENT, comment)?;
        self.end_node(node)?;
        Ok(node)
    }
}
