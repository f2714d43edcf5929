//! `<release>` nodes.

use crate::attribute::{is_truthy_flag, parse_release_number};
use crate::id::NodeId;
use crate::node::{ATTR_ALLOW_PSEUDO, ATTR_SEQ, NodeKind};
use crate::tree::{DocumentError, ResourceTree};

impl ResourceTree {
    /// A release's `seq` must name a release no later than the document's
    /// `current_release` as it stands when `seq` is assigned.
    pub(crate) fn validate_release_attribute(
        &self,
        name: &str,
        value: &str,
    ) -> Result<(), DocumentError> {
        match name {
            ATTR_SEQ => {
                let seq = parse_release_number(value).ok_or_else(|| {
                    DocumentError::InvalidAttribute {
                        node: NodeKind::Release,
                        attribute: name.to_string(),
                        value: value.to_string(),
                        reason: "sequence must be a non-negative integer".to_string(),
                    }
                })?;
                let current = self.current_release()?;
                if seq > current {
                    return Err(DocumentError::InvalidAttribute {
                        node: NodeKind::Release,
                        attribute: name.to_string(),
                        value: value.to_string(),
                        reason: format!("exceeds current_release ({current})"),
                    });
                }
                Ok(())
            }
            ATTR_ALLOW_PSEUDO => Ok(()),
            _ => Err(DocumentError::UnexpectedAttribute {
                node: NodeKind::Release,
                attribute: name.to_string(),
            }),
        }
    }

    /// The release's sequence number.
    pub fn release_number(&self, release: NodeId) -> Result<u32, DocumentError> {
        let node = self.node_of_kind(release, NodeKind::Release)?;
        let raw = node
            .attribute(ATTR_SEQ)
            .ok_or(DocumentError::MissingMandatoryAttribute {
                node: NodeKind::Release,
                attribute: ATTR_SEQ,
            })?;
        parse_release_number(raw).ok_or_else(|| DocumentError::InvalidAttribute {
            node: NodeKind::Release,
            attribute: ATTR_SEQ.to_string(),
            value: raw.to_string(),
            reason: "sequence must be a non-negative integer".to_string(),
        })
    }

    /// Whether pseudo-translations may be generated for this release.
    pub fn allows_pseudo(&self, release: NodeId) -> Result<bool, DocumentError> {
        let node = self.node_of_kind(release, NodeKind::Release)?;
        Ok(node.attribute(ATTR_ALLOW_PSEUDO).is_none_or(is_truthy_flag))
    }
}
