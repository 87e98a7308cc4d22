use slotmap::new_key_type;

new_key_type! {
    /// Opaque identifier for an element stored in the document arena.
    pub struct ElementId;
}

new_key_type! {
    /// Opaque identifier for a focus context installed in a focus manager.
    pub struct ContextId;
}
