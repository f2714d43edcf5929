use slotmap::new_key_type;

new_key_type! {
    /// Identifies a node in a [`ResourceTree`](crate::tree::ResourceTree).
    pub struct NodeId;
}
