use super::Space;
use super::error::{GraphError, Result};
use crate::core::models::element::InfoValue;
use crate::core::models::ids::ElementId;
use indexmap::IndexMap;
use slotmap::SecondaryMap;

/// Per-element values that are not part of the structural model, keyed by element handle.
///
/// Entries are dropped when their element is finalized.
#[derive(Debug, Default)]
pub struct ExtraProperties {
    values: SecondaryMap<ElementId, IndexMap<String, InfoValue>>,
}

impl ExtraProperties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, element: ElementId, key: &str) -> Option<&InfoValue> {
        self.values.get(element)?.get(key)
    }

    /// Fails with [`GraphError::ElementNotFound`] when a newer element already holds the slot
    /// of `element`.
    pub fn set(
        &mut self,
        element: ElementId,
        key: &str,
        value: InfoValue,
    ) -> Result<Option<InfoValue>> {
        let entry = self
            .values
            .entry(element)
            .ok_or(GraphError::ElementNotFound(element))?;
        Ok(entry.or_default().insert(key.to_string(), value))
    }

    pub fn remove(&mut self, element: ElementId, key: &str) -> Option<InfoValue> {
        let map = self.values.get_mut(element)?;
        let previous = map.shift_remove(key);
        if map.is_empty() {
            self.values.remove(element);
        }
        previous
    }

    pub fn contains(&self, element: ElementId, key: &str) -> bool {
        self.values
            .get(element)
            .is_some_and(|map| map.contains_key(key))
    }

    /// The table is a lookup store only; its keys cannot be enumerated.
    pub fn keys(&self, _element: ElementId) -> Result<Vec<String>> {
        Err(GraphError::Unsupported("enumerating extra property keys"))
    }

    pub(crate) fn clear_element(&mut self, element: ElementId) {
        self.values.remove(element);
    }
}

impl Space {
    pub fn extra_properties(&self) -> &ExtraProperties {
        &self.extras
    }

    pub fn extra(&self, element: ElementId, key: &str) -> Option<&InfoValue> {
        self.extras.get(element, key)
    }

    pub fn set_extra(
        &mut self,
        element: ElementId,
        key: &str,
        value: impl Into<InfoValue>,
    ) -> Result<Option<InfoValue>> {
        self.get(element)?;
        self.extras.set(element, key, value.into())
    }

    pub fn remove_extra(&mut self, element: ElementId, key: &str) -> Option<InfoValue> {
        self.extras.remove(element, key)
    }
}

#[cfg(test)]
mod tests {
    use crate::core::models::element::InfoValue;
    use crate::core::models::node::Atom;
    use crate::space::Space;
    use crate::space::error::GraphError;
    use crate::space::extras::ExtraProperties;

    #[test]
    fn extras_are_stored_per_element() {
        let mut space = Space::new();
        let a = space.create_atom(Atom::new("C"));
        let b = space.create_atom(Atom::new("C"));
        space.set_extra(a, "selected", true).unwrap();
        assert_eq!(space.extra(a, "selected"), Some(&InfoValue::Bool(true)));
        assert!(!space.extra_properties().contains(b, "selected"));
        assert_eq!(space.remove_extra(a, "selected"), Some(InfoValue::Bool(true)));
        assert!(!space.extra_properties().contains(a, "selected"));
    }

    #[test]
    fn stale_handles_are_reported_by_the_table() {
        let mut space = Space::new();
        let a = space.create_atom(Atom::new("C"));
        space.finalize(a).unwrap();
        // Reuses the freed slot under a newer version.
        let b = space.create_atom(Atom::new("N"));
        let mut table = ExtraProperties::new();
        table.set(b, "k", InfoValue::Bool(false)).unwrap();
        assert!(matches!(
            table.set(a, "k", InfoValue::Bool(true)),
            Err(GraphError::ElementNotFound(id)) if id == a
        ));
        assert_eq!(table.get(b, "k"), Some(&InfoValue::Bool(false)));
    }

    #[test]
    fn enumerating_keys_is_unsupported() {
        let mut space = Space::new();
        let a = space.create_atom(Atom::new("C"));
        space.set_extra(a, "k", 1i64).unwrap();
        assert!(matches!(
            space.extra_properties().keys(a),
            Err(GraphError::Unsupported(_))
        ));
    }

    #[test]
    fn finalizing_drops_extras() {
        let mut space = Space::new();
        let a = space.create_atom(Atom::new("C"));
        space.set_extra(a, "k", "v").unwrap();
        space.finalize(a).unwrap();
        assert!(!space.extra_properties().contains(a, "k"));
        assert!(matches!(
            space.set_extra(a, "k", "v"),
            Err(GraphError::ElementNotFound(_))
        ));
    }
}
