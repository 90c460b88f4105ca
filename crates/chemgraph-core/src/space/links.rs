use super::Space;
use super::error::Result;
use super::events::ChangeKind;
use crate::core::models::ids::ElementId;
use std::collections::HashSet;

impl Space {
    /// Links `connector` to `node` on both sides.
    ///
    /// A non-empty fragment does not take connectors itself: the link goes to its anchor (or,
    /// lacking anchors, its node) with the fewest cross connectors, descending through nested
    /// fragments. Returns the node actually linked.
    pub fn append_linked_connector(
        &mut self,
        node: ElementId,
        connector: ElementId,
    ) -> Result<ElementId> {
        self.connector(connector)?;
        let target = self.connectable_node(node)?;
        self.link(target, connector)?;
        Ok(target)
    }

    /// Same as [`append_linked_connector`](Self::append_linked_connector), seen from the connector.
    pub fn append_connected_obj(
        &mut self,
        connector: ElementId,
        node: ElementId,
    ) -> Result<ElementId> {
        self.append_linked_connector(node, connector)
    }

    /// Removes the connector at `index` of the node's linked list, connector side first.
    pub fn remove_linked_connector_at(
        &mut self,
        node: ElementId,
        index: usize,
    ) -> Result<Option<ElementId>> {
        let Some(connector) = self.node(node)?.linked_connectors().get(index).copied() else {
            return Ok(None);
        };
        self.unlink(node, connector)?;
        Ok(Some(connector))
    }

    pub fn remove_linked_connector(
        &mut self,
        node: ElementId,
        connector: ElementId,
    ) -> Result<bool> {
        match self.node(node)?.index_of_linked_connector(connector) {
            Some(index) => Ok(self.remove_linked_connector_at(node, index)?.is_some()),
            None => Ok(false),
        }
    }

    pub fn remove_connected_obj(&mut self, connector: ElementId, node: ElementId) -> Result<bool> {
        if !self.connector(connector)?.contains(node) {
            return Ok(false);
        }
        self.unlink(node, connector)?;
        Ok(true)
    }

    pub(crate) fn link(&mut self, node: ElementId, connector: ElementId) -> Result<()> {
        self.node(node)?;
        self.connector(connector)?;
        let added_to_node = self.node_mut(node)?.push_linked_connector(connector);
        let added_to_connector = self.connector_mut(connector)?.push_connected_obj(node);
        let mut space = self.begin_update();
        if added_to_node {
            space.notify(node, ChangeKind::LinkedConnectors);
        }
        if added_to_connector {
            space.notify(connector, ChangeKind::ConnectedObjs);
        }
        Ok(())
    }

    pub(crate) fn unlink(&mut self, node: ElementId, connector: ElementId) -> Result<()> {
        let mut space = self.begin_update();
        if space.connector_mut(connector)?.drop_connected_obj(node) {
            space.notify(connector, ChangeKind::ConnectedObjs);
        }
        if space.node_mut(node)?.drop_linked_connector(connector) {
            space.notify(node, ChangeKind::LinkedConnectors);
        }
        Ok(())
    }

    /// Swaps `old` for `new` in the connector's endpoint list, keeping its position.
    pub(crate) fn replace_connected_obj(
        &mut self,
        connector: ElementId,
        old: ElementId,
        new: ElementId,
    ) -> Result<()> {
        let target = self.connector_mut(connector)?;
        let Some(index) = target.connected_objs.iter().position(|&o| o == old) else {
            return Ok(());
        };
        if target.connected_objs.contains(&new) {
            target.connected_objs.remove(index);
        } else {
            target.connected_objs[index] = new;
        }
        self.node_mut(old)?.drop_linked_connector(connector);
        self.node_mut(new)?.push_linked_connector(connector);
        let mut space = self.begin_update();
        space.notify(connector, ChangeKind::ConnectedObjs);
        space.notify(old, ChangeKind::LinkedConnectors);
        space.notify(new, ChangeKind::LinkedConnectors);
        Ok(())
    }

    /// Drops every link of `element`, whichever side of the incidence it is on.
    ///
    /// A non-empty fragment loses the links of its cross connectors to the nodes inside it.
    pub(crate) fn sever_links(&mut self, element: ElementId) -> Result<()> {
        let target = self.get(element)?;
        if let Some(node) = target.as_node() {
            let grouped = node.as_fragment().is_some_and(|f| !f.nodes().is_empty());
            for connector in node.linked_connectors().to_vec() {
                self.unlink(element, connector)?;
            }
            if grouped {
                for connector in self.cross_connectors(element)? {
                    let inner: Vec<ElementId> = self
                        .connector(connector)?
                        .connected_objs()
                        .iter()
                        .copied()
                        .filter(|&o| self.is_within(o, element))
                        .collect();
                    for obj in inner {
                        self.unlink(obj, connector)?;
                    }
                }
            }
        } else if let Some(connector) = target.as_connector() {
            for node in connector.connected_objs().to_vec() {
                self.unlink(node, element)?;
            }
        }
        Ok(())
    }

    fn connectable_node(&self, node: ElementId) -> Result<ElementId> {
        let mut current = node;
        loop {
            let fragment = match self.node(current)?.as_fragment() {
                Some(fragment) if !fragment.nodes().is_empty() => fragment,
                _ => return Ok(current),
            };
            let candidates = if fragment.anchor_nodes().is_empty() {
                fragment.nodes()
            } else {
                fragment.anchor_nodes()
            };
            let cross = self.cross_connectors(current)?;
            let mut best = candidates[0];
            let mut best_count = usize::MAX;
            for &candidate in candidates {
                let count = self
                    .effective_linked_connectors(candidate)?
                    .iter()
                    .filter(|c| cross.contains(c))
                    .count();
                if count < best_count {
                    best = candidate;
                    best_count = count;
                }
            }
            current = best;
        }
    }

    /// A non-empty fragment is linked through its cross connectors rather than directly.
    pub(crate) fn effective_linked_connectors(&self, node: ElementId) -> Result<Vec<ElementId>> {
        match self.node(node)?.as_fragment() {
            Some(fragment) if !fragment.nodes().is_empty() => self.cross_connectors(node),
            _ => Ok(self.node(node)?.linked_connectors().to_vec()),
        }
    }

    /// Distinct nodes sharing a connector with `node`, in link order.
    ///
    /// A non-empty fragment reports the outside ends of its cross connectors.
    pub fn linked_objs(&self, node: ElementId) -> Result<Vec<ElementId>> {
        let mut seen = HashSet::new();
        let mut result = Vec::new();
        for connector in self.effective_linked_connectors(node)? {
            for other in self.connector(connector)?.other_objs(node) {
                if !self.is_within(other, node) && seen.insert(other) {
                    result.push(other);
                }
            }
        }
        Ok(result)
    }

    pub fn linked_non_hydrogen_objs(&self, node: ElementId) -> Result<Vec<ElementId>> {
        Ok(self
            .linked_objs(node)?
            .into_iter()
            .filter(|&o| !self.elements.get(o).is_some_and(|e| e.is_hydrogen_atom()))
            .collect())
    }

    pub fn linked_hydrogen_atoms(&self, node: ElementId) -> Result<Vec<ElementId>> {
        Ok(self
            .linked_objs(node)?
            .into_iter()
            .filter(|&o| self.elements.get(o).is_some_and(|e| e.is_hydrogen_atom()))
            .collect())
    }

    /// The first connector joining `node` and `other`.
    pub fn connector_to(&self, node: ElementId, other: ElementId) -> Result<Option<ElementId>> {
        for connector in self.effective_linked_connectors(node)? {
            if self.connector(connector)?.contains(other) {
                return Ok(Some(connector));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use crate::core::models::connector::Bond;
    use crate::core::models::fragment::{Fragment, FragmentKind};
    use crate::core::models::ids::ElementId;
    use crate::core::models::node::Atom;
    use crate::space::Space;
    use crate::space::error::GraphError;

    fn assert_symmetric(space: &Space, nodes: &[ElementId], connectors: &[ElementId]) {
        for &n in nodes {
            for &c in space.node(n).unwrap().linked_connectors() {
                assert!(space.connector(c).unwrap().contains(n));
            }
        }
        for &c in connectors {
            for &n in space.connector(c).unwrap().connected_objs() {
                assert!(space.node(n).unwrap().linked_connectors().contains(&c));
            }
        }
    }

    mod linking {
        use super::*;

        #[test]
        fn append_and_remove_keep_both_sides_in_sync() {
            let mut space = Space::new();
            let a = space.create_atom(Atom::new("C"));
            let b = space.create_atom(Atom::new("C"));
            let c = space.create_connector(Bond::default());
            space.append_linked_connector(a, c).unwrap();
            space.append_connected_obj(c, b).unwrap();
            assert_symmetric(&space, &[a, b], &[c]);
            assert_eq!(space.connector(c).unwrap().connected_objs(), &[a, b]);

            assert_eq!(space.remove_linked_connector_at(a, 0).unwrap(), Some(c));
            assert_symmetric(&space, &[a, b], &[c]);
            assert!(space.node(a).unwrap().linked_connectors().is_empty());
            assert_eq!(space.connector(c).unwrap().connected_objs(), &[b]);
            assert_eq!(space.remove_linked_connector_at(a, 0).unwrap(), None);
        }

        #[test]
        fn appending_twice_is_idempotent() {
            let mut space = Space::new();
            let a = space.create_atom(Atom::new("C"));
            let c = space.create_connector(Bond::default());
            space.append_linked_connector(a, c).unwrap();
            space.append_linked_connector(a, c).unwrap();
            assert_eq!(space.node(a).unwrap().linked_connector_count(), 1);
            assert_eq!(space.connector(c).unwrap().connected_obj_count(), 1);
        }

        #[test]
        fn remove_connected_obj_reports_absence() {
            let mut space = Space::new();
            let a = space.create_atom(Atom::new("C"));
            let b = space.create_atom(Atom::new("C"));
            let c = space.create_bond(&[a], Bond::default()).unwrap();
            assert!(!space.remove_connected_obj(c, b).unwrap());
            assert!(space.remove_connected_obj(c, a).unwrap());
            assert!(!space.remove_linked_connector(a, c).unwrap());
        }

        #[test]
        fn linking_requires_a_connector() {
            let mut space = Space::new();
            let a = space.create_atom(Atom::new("C"));
            let b = space.create_atom(Atom::new("C"));
            let result = space.append_linked_connector(a, b);
            assert!(matches!(result, Err(GraphError::TypeMismatch { .. })));
        }
    }

    mod redirect {
        use super::*;

        #[test]
        fn connector_to_fragment_lands_on_least_connected_anchor() {
            let mut space = Space::new();
            let group = space.create_fragment(Fragment::new(FragmentKind::SubGroup {
                abbr: Some("Et".into()),
                name: None,
            }));
            let c1 = space.create_atom(Atom::new("C"));
            let c2 = space.create_atom(Atom::new("C"));
            space.append_node(group, c1).unwrap();
            space.append_node(group, c2).unwrap();
            let inner = space.create_bond(&[c1, c2], Bond::default()).unwrap();
            space.append_connector(group, inner).unwrap();
            space.append_anchor_node(group, c2).unwrap();

            let outside = space.create_atom(Atom::new("O"));
            let bond = space.create_bond(&[outside, group], Bond::default()).unwrap();
            assert_eq!(space.connector(bond).unwrap().connected_objs(), &[outside, c2]);
            assert!(space.node(group).unwrap().linked_connectors().is_empty());
        }

        #[test]
        fn empty_fragment_takes_connector_itself() {
            let mut space = Space::new();
            let group = space.create_fragment(Fragment::new(FragmentKind::Generic));
            let c = space.create_connector(Bond::default());
            assert_eq!(space.append_linked_connector(group, c).unwrap(), group);
        }
    }

    mod queries {
        use super::*;

        #[test]
        fn linked_objs_split_hydrogens() {
            let mut space = Space::new();
            let carbon = space.create_atom(Atom::new("C"));
            let oxygen = space.create_atom(Atom::new("O"));
            let h1 = space.create_atom(Atom::new("H"));
            let h2 = space.create_atom(Atom::new("H"));
            for other in [oxygen, h1, h2] {
                space.create_bond(&[carbon, other], Bond::default()).unwrap();
            }
            space.create_bond(&[carbon, oxygen], Bond::default()).unwrap();

            assert_eq!(space.linked_objs(carbon).unwrap(), vec![oxygen, h1, h2]);
            assert_eq!(space.linked_non_hydrogen_objs(carbon).unwrap(), vec![oxygen]);
            assert_eq!(space.linked_hydrogen_atoms(carbon).unwrap(), vec![h1, h2]);
            assert_eq!(space.linked_objs(h1).unwrap(), vec![carbon]);
        }

        #[test]
        fn connector_to_finds_shared_connector() {
            let mut space = Space::new();
            let a = space.create_atom(Atom::new("C"));
            let b = space.create_atom(Atom::new("C"));
            let c = space.create_atom(Atom::new("C"));
            let ab = space.create_bond(&[a, b], Bond::default()).unwrap();
            assert_eq!(space.connector_to(a, b).unwrap(), Some(ab));
            assert_eq!(space.connector_to(a, c).unwrap(), None);
        }

        #[test]
        fn grouped_fragment_reports_outside_neighbours() {
            let mut space = Space::new();
            let frag = space.create_fragment(Fragment::new(FragmentKind::Molecule { name: None }));
            let [a, b, c, d] = ["C", "C", "C", "H"].map(|s| {
                let atom = space.create_atom(Atom::new(s));
                space.append_node(frag, atom).unwrap();
                atom
            });
            let mut bonds = Vec::new();
            for pair in [[a, b], [b, c], [c, d]] {
                let bond = space.create_bond(&pair, Bond::default()).unwrap();
                space.append_connector(frag, bond).unwrap();
                bonds.push(bond);
            }
            let sub = space.create_fragment(Fragment::new(FragmentKind::SubGroup {
                abbr: None,
                name: None,
            }));
            space.marshal_sub_fragment(frag, &[b, c], sub).unwrap();

            assert_eq!(space.linked_objs(sub).unwrap(), vec![a, d]);
            assert_eq!(space.linked_non_hydrogen_objs(sub).unwrap(), vec![a]);
            assert_eq!(space.linked_hydrogen_atoms(sub).unwrap(), vec![d]);
            assert_eq!(space.connector_to(sub, a).unwrap(), Some(bonds[0]));
            assert_eq!(space.linked_objs(b).unwrap(), vec![a, c]);
        }
    }

    mod symmetry {
        use super::*;
        use proptest::prelude::*;

        fn assert_no_duplicates(ids: &[ElementId]) {
            for (i, id) in ids.iter().enumerate() {
                assert!(!ids[i + 1..].contains(id), "duplicate {id:?}");
            }
        }

        proptest! {
            #[test]
            fn links_stay_symmetric_under_random_edits(
                ops in prop::collection::vec((0u8..8, 0usize..4, 0usize..3), 1..40)
            ) {
                let mut space = Space::new();
                let frag = space.create_fragment(Fragment::new(FragmentKind::Generic));
                let nodes = ["C", "N", "O", "H"].map(|s| {
                    let atom = space.create_atom(Atom::new(s));
                    space.append_node(frag, atom).unwrap();
                    atom
                });
                let connectors = [0, 1, 2].map(|_| {
                    let connector = space.create_connector(Bond::default());
                    space.append_connector(frag, connector).unwrap();
                    connector
                });

                for (op, n, c) in ops {
                    let (node, connector) = (nodes[n], connectors[c]);
                    match op {
                        0 | 1 => {
                            space.append_linked_connector(node, connector).unwrap();
                        }
                        2 => {
                            space.remove_linked_connector(node, connector).unwrap();
                        }
                        3 => {
                            space.remove_linked_connector_at(node, c).unwrap();
                        }
                        4 => {
                            space.remove_node(frag, node, false).unwrap();
                        }
                        5 => {
                            space.remove_connector(frag, connector, n % 2 == 0).unwrap();
                        }
                        6 => {
                            space.append_node(frag, node).unwrap();
                            space.append_connector(frag, connector).unwrap();
                        }
                        _ => {
                            space.remove_child_obj(frag, node, true, false).unwrap();
                        }
                    }
                    assert_symmetric(&space, &nodes, &connectors);
                }
                for &n in &nodes {
                    assert_no_duplicates(space.node(n).unwrap().linked_connectors());
                }
                for &c in &connectors {
                    assert_no_duplicates(space.connector(c).unwrap().connected_objs());
                }
            }
        }
    }
}
