use super::Space;
use super::error::Result;
use crate::core::models::ids::ElementId;
use std::collections::HashSet;
use tracing::{debug, instrument};

impl Space {
    /// Removes `obj` from `fragment`, optionally together with the objects it leaves dangling,
    /// and optionally finalizes everything removed.
    ///
    /// With `cascade`:
    /// - removing a node also removes every linked connector left with fewer than two endpoints,
    ///   where a non-empty fragment counts its cross connectors as linked;
    /// - removing a connector also removes every endpoint node left without connectors.
    ///
    /// Nodes orphaned by the removal of a cascaded connector are kept. Connectors are removed
    /// before nodes, and finalization runs in reverse removal order. Returns the removed
    /// objects; an `obj` that is not a direct child of `fragment` yields an empty list.
    #[instrument(skip_all, name = "remove_child_obj", fields(fragment = ?fragment, obj = ?obj, cascade = cascade, free = free))]
    pub fn remove_child_obj(
        &mut self,
        fragment: ElementId,
        obj: ElementId,
        cascade: bool,
        free: bool,
    ) -> Result<Vec<ElementId>> {
        if self.index_of_child(fragment, obj)?.is_none() {
            return Ok(Vec::new());
        }
        let targets = if cascade {
            self.cascade_closure(obj)?
        } else {
            vec![obj]
        };

        let mut space = self.begin_update();
        for &target in &targets {
            if let Some(holder) = space.parent_of(target) {
                space.remove_child(holder, target, false)?;
            } else {
                space.sever_links(target)?;
            }
        }
        if free {
            for &target in targets.iter().rev() {
                space.finalize(target)?;
            }
        }
        debug!(removed = targets.len(), "Removed child objects.");
        Ok(targets)
    }

    /// Objects removed together with `obj`, connectors first.
    fn cascade_closure(&self, obj: ElementId) -> Result<Vec<ElementId>> {
        let mut visited: HashSet<ElementId> = HashSet::from([obj]);
        let mut connectors = Vec::new();
        let mut nodes = Vec::new();

        if self.get(obj)?.is_connector() {
            connectors.push(obj);
            for &node in self.connector(obj)?.connected_objs() {
                let remaining = self
                    .node(node)?
                    .linked_connectors()
                    .iter()
                    .filter(|&c| !visited.contains(c))
                    .count();
                if remaining == 0 && visited.insert(node) {
                    nodes.push(node);
                }
            }
        } else {
            // A grouped fragment is linked through its cross connectors, whose inner ends leave
            // together with it.
            for connector in self.effective_linked_connectors(obj)? {
                if visited.contains(&connector) {
                    continue;
                }
                let remaining = self
                    .connector(connector)?
                    .connected_objs()
                    .iter()
                    .filter(|&&n| !visited.contains(&n) && !self.is_within(n, obj))
                    .count();
                if remaining < 2 {
                    visited.insert(connector);
                    connectors.push(connector);
                }
            }
            nodes.push(obj);
        }

        connectors.extend(nodes);
        Ok(connectors)
    }
}
