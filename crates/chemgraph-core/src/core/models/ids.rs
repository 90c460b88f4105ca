use slotmap::new_key_type;

new_key_type! {
    /// Stable handle of a structural element inside a [`Space`](crate::space::Space) arena.
    pub struct ElementId;
}
