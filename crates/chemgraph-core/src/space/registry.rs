use super::Space;
use super::error::{GraphError, Result};
use super::events::ChangeKind;
use crate::core::models::ids::ElementId;
use tracing::trace;

impl Space {
    /// Registered elements in registration order.
    pub fn owned_objects(&self) -> &[ElementId] {
        &self.owned
    }

    pub fn index_of_owned(&self, element: ElementId) -> Option<usize> {
        self.owned.iter().position(|&o| o == element)
    }

    pub fn object_by_id(&self, id: &str) -> Option<ElementId> {
        self.owned
            .iter()
            .copied()
            .find(|&o| self.elements.get(o).and_then(|e| e.id()) == Some(id))
    }

    /// The element's prefix followed by the first integer not yet used with it.
    pub fn auto_id(&self, element: ElementId) -> Result<String> {
        let prefix = self.get(element)?.auto_id_prefix();
        Ok(self.next_free_id(prefix))
    }

    fn next_free_id(&self, prefix: &str) -> String {
        (self.config.auto_id_start..)
            .map(|i| format!("{prefix}{i}"))
            .find(|candidate| self.object_by_id(candidate).is_none())
            .unwrap_or_else(|| prefix.to_string())
    }

    pub fn set_id(&mut self, element: ElementId, id: Option<&str>) -> Result<()> {
        self.get_mut(element)?.id = id.map(str::to_string);
        self.notify(element, ChangeKind::Id);
        Ok(())
    }

    /// Adds or removes `element`, and everything inside it, from the registry.
    ///
    /// Unchanged membership is a no-op. Elements inside a fragment follow their parent, so this
    /// is mainly used for parentless elements such as groups.
    pub fn set_owned(&mut self, element: ElementId, owned: bool) -> Result<()> {
        if element == self.root && !owned {
            return Err(GraphError::Unsupported("unregistering the root fragment"));
        }
        if self.get(element)?.owned == owned {
            return Ok(());
        }
        if owned {
            self.register_tree(element);
        } else {
            self.unregister_tree(element);
        }
        Ok(())
    }

    /// Elements of the subtree rooted at `element`, parents before children.
    pub(crate) fn subtree(&self, element: ElementId) -> Vec<ElementId> {
        let mut result = Vec::new();
        let mut stack = vec![element];
        while let Some(current) = stack.pop() {
            result.push(current);
            if let Some(fragment) = self.elements.get(current).and_then(|e| e.as_fragment()) {
                stack.extend(fragment.connectors().iter().rev());
                stack.extend(fragment.nodes().iter().rev());
            }
        }
        result
    }

    pub(crate) fn register_tree(&mut self, element: ElementId) {
        for id in self.subtree(element) {
            self.register_one(id);
        }
    }

    pub(crate) fn unregister_tree(&mut self, element: ElementId) {
        for id in self.subtree(element).into_iter().rev() {
            self.unregister_one(id);
        }
    }

    fn register_one(&mut self, element: ElementId) {
        let needs_id = match self.elements.get(element) {
            Some(e) if !e.owned => self.config.enable_auto_id && e.id.is_none(),
            _ => return,
        };
        let auto_id = needs_id.then(|| self.next_free_id(self.elements[element].auto_id_prefix()));
        let target = &mut self.elements[element];
        target.owned = true;
        if auto_id.is_some() {
            target.id = auto_id;
        }
        self.owned.push(element);
        self.register_references(element);
        trace!(element = ?element, id = ?self.elements[element].id, "Registered element.");
        self.notify(element, ChangeKind::Owner);
    }

    fn unregister_one(&mut self, element: ElementId) {
        match self.elements.get_mut(element) {
            Some(e) if e.owned => e.owned = false,
            _ => return,
        }
        if let Some(index) = self.index_of_owned(element) {
            self.owned.remove(index);
        }
        self.relations.release_relations_from(element);
        self.repair_references_to(element);
        trace!(element = ?element, "Unregistered element.");
        self.notify(element, ChangeKind::Owner);
    }
}
