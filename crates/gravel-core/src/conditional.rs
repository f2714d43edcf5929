//! `<if>` nodes and liveness.
//!
//! A node is live for a given output when every conditional on its path to
//! the root, including the node itself, evaluates to true.

use crate::expr::{Condition, EvalContext, host_platform};
use crate::id::NodeId;
use crate::node::{ATTR_EXPR, NodeKind};
use crate::tree::{DocumentError, ResourceTree};
use tracing::{debug, instrument};

impl ResourceTree {
    /// Evaluate a conditional's `expr` against `ctx`.
    ///
    /// Fails with an evaluation error if the expression is malformed or
    /// mentions a name `ctx` does not bind.
    #[instrument(level = "debug", skip(self, ctx))]
    pub fn is_condition_satisfied(
        &self,
        conditional: NodeId,
        ctx: &EvalContext,
    ) -> Result<bool, DocumentError> {
        let node = self.node_of_kind(conditional, NodeKind::Conditional)?;
        let expr = node
            .attribute(ATTR_EXPR)
            .ok_or(DocumentError::MissingMandatoryAttribute {
                node: NodeKind::Conditional,
                attribute: ATTR_EXPR,
            })?;
        let satisfied = Condition::parse(expr)?.evaluate(ctx)?;
        debug!(expr, satisfied, "condition evaluated");
        Ok(satisfied)
    }

    /// Context binding `lang`, `defs` and `os` from the tree's output
    /// context and the host platform.
    pub fn eval_context(&self) -> EvalContext {
        EvalContext::for_output(&self.output_language, &self.defines, host_platform())
    }

    /// Whether `id` and all its conditional ancestors are satisfied.
    pub fn is_live(&self, id: NodeId, ctx: &EvalContext) -> Result<bool, DocumentError> {
        self.node(id)?;
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if self.kind(current) == Some(NodeKind::Conditional)
                && !self.is_condition_satisfied(current, ctx)?
            {
                return Ok(false);
            }
            cursor = self.parent(current);
        }
        Ok(true)
    }

    /// Pre-order walk from `start` that skips the subtree of every
    /// unsatisfied conditional. Ancestors of `start` are not consulted.
    pub fn live_descendants(
        &self,
        start: NodeId,
        ctx: &EvalContext,
    ) -> Result<Vec<NodeId>, DocumentError> {
        self.node(start)?;
        let mut live = Vec::new();
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            if self.kind(id) == Some(NodeKind::Conditional)
                && !self.is_condition_satisfied(id, ctx)?
            {
                continue;
            }
            live.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        Ok(live)
    }
}
