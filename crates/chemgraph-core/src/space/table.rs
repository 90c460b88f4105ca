use super::Space;
use super::error::{GraphError, Result};
use super::events::ChangeKind;
use crate::core::models::ctab::ConnectionTable;
use crate::core::models::element::{Element, ElementClass};
use crate::core::models::fragment::Representation;
use crate::core::models::ids::ElementId;
use crate::core::utils::index_stack::IndexStack;
use std::cmp::Ordering;
use tracing::{debug, trace};

impl Space {
    pub fn nodes(&self, fragment: ElementId) -> Result<&[ElementId]> {
        Ok(self.fragment(fragment)?.nodes())
    }

    pub fn connectors(&self, fragment: ElementId) -> Result<&[ElementId]> {
        Ok(self.fragment(fragment)?.connectors())
    }

    pub fn anchor_nodes(&self, fragment: ElementId) -> Result<&[ElementId]> {
        Ok(self.fragment(fragment)?.anchor_nodes())
    }

    /// Nodes and connectors together.
    pub fn child_count(&self, fragment: ElementId) -> Result<usize> {
        Ok(self.fragment(fragment)?.ctab().map_or(0, ConnectionTable::child_count))
    }

    /// Child at `index` in the combined enumeration, nodes first.
    pub fn child_at(&self, fragment: ElementId, index: usize) -> Result<Option<ElementId>> {
        Ok(self.fragment(fragment)?.ctab().and_then(|t| t.child_at(index)))
    }

    pub fn index_of_node(&self, fragment: ElementId, node: ElementId) -> Result<Option<usize>> {
        Ok(self.fragment(fragment)?.ctab().and_then(|t| t.index_of_node(node)))
    }

    pub fn index_of_connector(
        &self,
        fragment: ElementId,
        connector: ElementId,
    ) -> Result<Option<usize>> {
        Ok(self.fragment(fragment)?.ctab().and_then(|t| t.index_of_connector(connector)))
    }

    pub fn index_of_child(&self, fragment: ElementId, child: ElementId) -> Result<Option<usize>> {
        Ok(self.fragment(fragment)?.ctab().and_then(|t| t.index_of_child(child)))
    }

    /// The following element of the same list (nodes or connectors).
    pub fn next_sibling_of_child(
        &self,
        fragment: ElementId,
        child: ElementId,
    ) -> Result<Option<ElementId>> {
        let Some(table) = self.fragment(fragment)?.ctab() else {
            return Ok(None);
        };
        if let Some(index) = table.index_of_node(child) {
            Ok(table.node_at(index + 1))
        } else if let Some(index) = table.index_of_connector(child) {
            Ok(table.connector_at(index + 1))
        } else {
            Ok(None)
        }
    }

    /// Appends `node` unless it is already a node of the table, returning its index either way.
    pub fn append_node(&mut self, fragment: ElementId, node: ElementId) -> Result<usize> {
        if let Some(index) = self.index_of_node(fragment, node)? {
            return Ok(index);
        }
        self.insert_node_at(fragment, node, None)
    }

    /// Places `node` at `index` (tail when `None` or out of range).
    ///
    /// A node already in the table is moved. A node held by another fragment leaves it first,
    /// losing its links. The table is created on demand and replaces a formula.
    pub fn insert_node_at(
        &mut self,
        fragment: ElementId,
        node: ElementId,
        index: Option<usize>,
    ) -> Result<usize> {
        let class = self.get(node)?.class();
        if !ElementClass::NODE.contains(class) {
            return Err(GraphError::TypeMismatch {
                expected: ElementClass::NODE,
                found: class,
            });
        }
        self.place_child(fragment, node, index, false)
    }

    pub fn append_connector(&mut self, fragment: ElementId, connector: ElementId) -> Result<usize> {
        if let Some(index) = self.index_of_connector(fragment, connector)? {
            return Ok(index);
        }
        self.insert_connector_at(fragment, connector, None)
    }

    pub fn insert_connector_at(
        &mut self,
        fragment: ElementId,
        connector: ElementId,
        index: Option<usize>,
    ) -> Result<usize> {
        let class = self.get(connector)?.class();
        if class != ElementClass::CONNECTOR {
            return Err(GraphError::TypeMismatch {
                expected: ElementClass::CONNECTOR,
                found: class,
            });
        }
        self.place_child(fragment, connector, index, false)
    }

    /// Inserts `child` in front of `reference` in the matching list, or at its tail when
    /// `reference` is absent from that list.
    pub fn insert_before(
        &mut self,
        fragment: ElementId,
        child: ElementId,
        reference: Option<ElementId>,
    ) -> Result<usize> {
        if self.get(child)?.is_connector() {
            let index = match reference {
                Some(r) => self.index_of_connector(fragment, r)?,
                None => None,
            };
            self.insert_connector_at(fragment, child, index)
        } else {
            let index = match reference {
                Some(r) => self.index_of_node(fragment, r)?,
                None => None,
            };
            self.insert_node_at(fragment, child, index)
        }
    }

    /// Moves `child` into the table of `fragment`, taking it out of its previous table.
    pub(crate) fn place_child(
        &mut self,
        fragment: ElementId,
        child: ElementId,
        index: Option<usize>,
        preserve_links: bool,
    ) -> Result<usize> {
        let class = self.get(child)?.class();
        let target = self.fragment(fragment)?;
        if !target.accepts(class) {
            return Err(GraphError::TypeMismatch {
                expected: target.accepted(),
                found: class,
            });
        }
        let is_connector = class == ElementClass::CONNECTOR;
        if !is_connector {
            self.ensure_not_cyclic(fragment, child)?;
        }
        let old_parent = self.get(child)?.parent;

        let mut space = self.begin_update();
        if let Some(old) = old_parent.filter(|&old| old != fragment) {
            space.take_child(old, child, preserve_links)?;
        }
        let table = space.ensure_ctab(fragment)?;
        let (position, _) = if is_connector {
            table.place_connector(child, index)
        } else {
            table.place_node(child, index)
        };
        if old_parent != Some(fragment) {
            space.reparent(child, fragment);
        }
        trace!(fragment = ?fragment, child = ?child, index = position, "Placed child in table.");
        let kind = if is_connector {
            ChangeKind::Connectors
        } else {
            ChangeKind::Nodes
        };
        space.notify(fragment, kind);
        Ok(position)
    }

    /// Takes `child` out of the table without touching its parent pointer or registration.
    pub(crate) fn take_child(
        &mut self,
        fragment: ElementId,
        child: ElementId,
        preserve_links: bool,
    ) -> Result<bool> {
        let Some(table) = self.fragment_mut(fragment)?.ctab_mut() else {
            return Ok(false);
        };
        let was_anchor = table.index_of_anchor_node(child).is_some();
        let kind = if table.take_node(child).is_some() {
            ChangeKind::Nodes
        } else if table.take_connector(child).is_some() {
            ChangeKind::Connectors
        } else {
            return Ok(false);
        };
        if !preserve_links {
            self.sever_links(child)?;
        }
        self.notify(fragment, kind);
        if was_anchor {
            self.anchors_changed(fragment)?;
        }
        Ok(true)
    }

    pub(crate) fn ensure_ctab(&mut self, fragment: ElementId) -> Result<&mut ConnectionTable> {
        if !self.fragment(fragment)?.has_ctab() {
            self.fragment_mut(fragment)?
                .replace_representation(Representation::Table(ConnectionTable::new()));
            debug!(fragment = ?fragment, "Created connection table.");
            self.notify(fragment, ChangeKind::Representation);
        }
        self.fragment_mut(fragment)?
            .ctab_mut()
            .ok_or(GraphError::NoConnectionTable(fragment))
    }

    /// Removes `node` from the table and detaches it. Unless `preserve_links` is set, the node's
    /// links are severed as well. Returns false when the node is not a direct child.
    pub fn remove_node(
        &mut self,
        fragment: ElementId,
        node: ElementId,
        preserve_links: bool,
    ) -> Result<bool> {
        if self.index_of_node(fragment, node)?.is_none() {
            return Ok(false);
        }
        let mut space = self.begin_update();
        space.take_child(fragment, node, preserve_links)?;
        space.detach(node);
        Ok(true)
    }

    pub fn remove_node_at(
        &mut self,
        fragment: ElementId,
        index: usize,
        preserve_links: bool,
    ) -> Result<Option<ElementId>> {
        let Some(node) = self.fragment(fragment)?.nodes().get(index).copied() else {
            return Ok(None);
        };
        self.remove_node(fragment, node, preserve_links)?;
        Ok(Some(node))
    }

    pub fn remove_connector(
        &mut self,
        fragment: ElementId,
        connector: ElementId,
        preserve_links: bool,
    ) -> Result<bool> {
        if self.index_of_connector(fragment, connector)?.is_none() {
            return Ok(false);
        }
        let mut space = self.begin_update();
        space.take_child(fragment, connector, preserve_links)?;
        space.detach(connector);
        Ok(true)
    }

    pub fn remove_connector_at(
        &mut self,
        fragment: ElementId,
        index: usize,
        preserve_links: bool,
    ) -> Result<Option<ElementId>> {
        let Some(connector) = self.fragment(fragment)?.connectors().get(index).copied() else {
            return Ok(None);
        };
        self.remove_connector(fragment, connector, preserve_links)?;
        Ok(Some(connector))
    }

    /// Removes a node or connector, whichever `child` is.
    pub fn remove_child(
        &mut self,
        fragment: ElementId,
        child: ElementId,
        preserve_links: bool,
    ) -> Result<bool> {
        if self.get(child)?.is_connector() {
            self.remove_connector(fragment, child, preserve_links)
        } else {
            self.remove_node(fragment, child, preserve_links)
        }
    }

    pub fn append_anchor_node(&mut self, fragment: ElementId, node: ElementId) -> Result<bool> {
        let table = self
            .fragment_mut(fragment)?
            .ctab_mut()
            .ok_or(GraphError::NotAChild {
                parent: fragment,
                child: node,
            })?;
        if !table.contains_node(node) {
            return Err(GraphError::NotAChild {
                parent: fragment,
                child: node,
            });
        }
        if !table.push_anchor_node(node) {
            return Ok(false);
        }
        self.anchors_changed(fragment)?;
        Ok(true)
    }

    pub fn remove_anchor_node(&mut self, fragment: ElementId, node: ElementId) -> Result<bool> {
        let removed = self
            .fragment_mut(fragment)?
            .ctab_mut()
            .and_then(|t| t.take_anchor_node(node))
            .is_some();
        if removed {
            self.anchors_changed(fragment)?;
        }
        Ok(removed)
    }

    pub fn clear_anchor_nodes(&mut self, fragment: ElementId) -> Result<()> {
        let Some(table) = self.fragment_mut(fragment)?.ctab_mut() else {
            return Ok(());
        };
        if table.anchor_nodes.is_empty() {
            return Ok(());
        }
        table.anchor_nodes.clear();
        self.anchors_changed(fragment)
    }

    /// Sub-groups keep their origin on the centroid of their anchors.
    fn anchors_changed(&mut self, fragment: ElementId) -> Result<()> {
        self.notify(fragment, ChangeKind::AnchorNodes);
        if self.fragment(fragment)?.kind.recenters_on_anchor_change() {
            self.recalc_coords(fragment)?;
        }
        Ok(())
    }

    pub fn set_node_index(
        &mut self,
        fragment: ElementId,
        node: ElementId,
        index: usize,
    ) -> Result<usize> {
        let table = self.direct_table(fragment, node, |t| t.contains_node(node))?;
        let (position, _) = table.place_node(node, Some(index));
        self.notify(fragment, ChangeKind::Nodes);
        Ok(position)
    }

    pub fn set_connector_index(
        &mut self,
        fragment: ElementId,
        connector: ElementId,
        index: usize,
    ) -> Result<usize> {
        let table = self.direct_table(fragment, connector, |t| t.contains_connector(connector))?;
        let (position, _) = table.place_connector(connector, Some(index));
        self.notify(fragment, ChangeKind::Connectors);
        Ok(position)
    }

    fn direct_table<F>(
        &mut self,
        fragment: ElementId,
        child: ElementId,
        holds: F,
    ) -> Result<&mut ConnectionTable>
    where
        F: FnOnce(&ConnectionTable) -> bool,
    {
        let not_a_child = GraphError::NotAChild {
            parent: fragment,
            child,
        };
        let table = self.fragment_mut(fragment)?.ctab_mut().ok_or(not_a_child)?;
        if !holds(table) {
            return Err(GraphError::NotAChild {
                parent: fragment,
                child,
            });
        }
        Ok(table)
    }

    /// Puts `new` in place of `old`: same table position, same anchor slot, and every connector
    /// of `old` relinked to `new`. When `old` is a fragment, connectors reaching into it from this
    /// table are relinked to `new` too. `old` ends up detached.
    pub fn replace_node(
        &mut self,
        fragment: ElementId,
        old: ElementId,
        new: ElementId,
    ) -> Result<()> {
        let index = self
            .index_of_node(fragment, old)?
            .ok_or(GraphError::NotAChild {
                parent: fragment,
                child: old,
            })?;
        let anchor_index = self
            .fragment(fragment)?
            .ctab()
            .and_then(|t| t.index_of_anchor_node(old));

        let mut space = self.begin_update();
        space.insert_node_at(fragment, new, Some(index))?;
        for connector in space.node(old)?.linked_connectors().to_vec() {
            space.replace_connected_obj(connector, old, new)?;
        }
        if space.get(old)?.is_fragment() {
            for connector in space.cross_connectors(old)? {
                if space.index_of_connector(fragment, connector)?.is_none() {
                    continue;
                }
                let inner: Vec<ElementId> = space
                    .connector(connector)?
                    .connected_objs()
                    .iter()
                    .copied()
                    .filter(|&o| space.is_within(o, old))
                    .collect();
                for obj in inner {
                    space.replace_connected_obj(connector, obj, new)?;
                }
            }
        }
        space.remove_node(fragment, old, false)?;
        if let Some(anchor_index) = anchor_index {
            if let Some(table) = space.fragment_mut(fragment)?.ctab_mut() {
                let at = anchor_index.min(table.anchor_nodes.len());
                table.anchor_nodes.insert(at, new);
            }
            space.anchors_changed(fragment)?;
        }
        Ok(())
    }

    pub fn clear_nodes(&mut self, fragment: ElementId) -> Result<()> {
        let nodes = self.nodes(fragment)?.to_vec();
        let mut space = self.begin_update();
        for node in nodes {
            space.remove_node(fragment, node, false)?;
        }
        Ok(())
    }

    pub fn clear_connectors(&mut self, fragment: ElementId) -> Result<()> {
        let connectors = self.connectors(fragment)?.to_vec();
        let mut space = self.begin_update();
        for connector in connectors {
            space.remove_connector(fragment, connector, false)?;
        }
        Ok(())
    }

    pub fn clear(&mut self, fragment: ElementId) -> Result<()> {
        let mut space = self.begin_update();
        space.clear_nodes(fragment)?;
        space.clear_connectors(fragment)
    }

    /// Reorders the direct nodes with `compare`. Passing no ordering function is an error.
    pub fn sort_nodes<F>(&mut self, fragment: ElementId, compare: Option<F>) -> Result<()>
    where
        F: FnMut(&Element, &Element) -> Ordering,
    {
        let compare = compare.ok_or(GraphError::MissingComparator("sort_nodes"))?;
        let sorted = self.sorted(self.nodes(fragment)?, compare);
        if let Some(table) = self.fragment_mut(fragment)?.ctab_mut() {
            table.nodes = sorted;
            self.notify(fragment, ChangeKind::Nodes);
        }
        Ok(())
    }

    pub fn sort_connectors<F>(&mut self, fragment: ElementId, compare: Option<F>) -> Result<()>
    where
        F: FnMut(&Element, &Element) -> Ordering,
    {
        let compare = compare.ok_or(GraphError::MissingComparator("sort_connectors"))?;
        let sorted = self.sorted(self.connectors(fragment)?, compare);
        if let Some(table) = self.fragment_mut(fragment)?.ctab_mut() {
            table.connectors = sorted;
            self.notify(fragment, ChangeKind::Connectors);
        }
        Ok(())
    }

    fn sorted<F>(&self, ids: &[ElementId], mut compare: F) -> Vec<ElementId>
    where
        F: FnMut(&Element, &Element) -> Ordering,
    {
        let mut items: Vec<(ElementId, &Element)> = ids
            .iter()
            .filter_map(|&id| self.elements.get(id).map(|e| (id, e)))
            .collect();
        items.sort_by(|a, b| compare(a.1, b.1));
        items.into_iter().map(|(id, _)| id).collect()
    }

    /// Whether `node` is a node of this table, or with `nested` of any table below it.
    pub fn has_node(&self, fragment: ElementId, node: ElementId, nested: bool) -> Result<bool> {
        if self.index_of_node(fragment, node)?.is_some() {
            return Ok(true);
        }
        Ok(nested && self.get(node)?.is_node() && self.is_within(node, fragment))
    }

    pub fn has_connector(
        &self,
        fragment: ElementId,
        connector: ElementId,
        nested: bool,
    ) -> Result<bool> {
        if self.index_of_connector(fragment, connector)?.is_some() {
            return Ok(true);
        }
        Ok(nested && self.get(connector)?.is_connector() && self.is_within(connector, fragment))
    }

    /// The direct child of `fragment` that is `obj` or contains it.
    pub fn find_direct_child_of_obj(
        &self,
        fragment: ElementId,
        obj: ElementId,
    ) -> Option<ElementId> {
        let mut current = obj;
        loop {
            let parent = self.parent_of(current)?;
            if parent == fragment {
                return Some(current);
            }
            current = parent;
        }
    }

    /// Direct child fragments that have nodes of their own.
    pub fn sub_fragments(&self, fragment: ElementId) -> Result<Vec<ElementId>> {
        Ok(self
            .nodes(fragment)?
            .iter()
            .copied()
            .filter(|&n| self.is_sub_fragment(n))
            .collect())
    }

    fn is_sub_fragment(&self, node: ElementId) -> bool {
        self.elements
            .get(node)
            .and_then(Element::as_fragment)
            .is_some_and(|f| f.node_count() > 0)
    }

    /// Nodes without children, descending into sub-fragments. Empty fragments count as leaves.
    pub fn leaf_nodes(&self, fragment: ElementId) -> Result<Vec<ElementId>> {
        let mut result = Vec::new();
        for &node in self.nodes(fragment)? {
            if self.is_sub_fragment(node) {
                result.extend(self.leaf_nodes(node)?);
            } else {
                result.push(node);
            }
        }
        Ok(result)
    }

    /// Connectors of this table followed by those of every sub-fragment, depth first.
    pub fn all_child_connectors(&self, fragment: ElementId) -> Result<Vec<ElementId>> {
        let mut result = self.connectors(fragment)?.to_vec();
        for sub in self.sub_fragments(fragment)? {
            result.extend(self.all_child_connectors(sub)?);
        }
        Ok(result)
    }

    /// Node indexes leading from `fragment` down to the fragment directly holding `element`.
    fn path_to_holder(&self, fragment: ElementId, element: ElementId) -> Option<Vec<usize>> {
        let mut path = Vec::new();
        let mut current = self.parent_of(element)?;
        while current != fragment {
            let parent = self.parent_of(current)?;
            path.push(self.fragment(parent).ok()?.ctab()?.index_of_node(current)?);
            current = parent;
        }
        path.reverse();
        Some(path)
    }

    /// Address of `node` relative to `fragment`, `None` when it is not inside it.
    pub fn index_stack_of_node(&self, fragment: ElementId, node: ElementId) -> Option<IndexStack> {
        let mut path = self.path_to_holder(fragment, node)?;
        let holder = self.parent_of(node)?;
        path.push(self.fragment(holder).ok()?.ctab()?.index_of_node(node)?);
        Some(IndexStack::new(path))
    }

    pub fn index_stack_of_connector(
        &self,
        fragment: ElementId,
        connector: ElementId,
    ) -> Option<IndexStack> {
        let mut path = self.path_to_holder(fragment, connector)?;
        let holder = self.parent_of(connector)?;
        path.push(self.fragment(holder).ok()?.ctab()?.index_of_connector(connector)?);
        Some(IndexStack::new(path))
    }

    /// Like the node and connector variants, but the last entry indexes the combined child list.
    pub fn index_stack_of_child(
        &self,
        fragment: ElementId,
        child: ElementId,
    ) -> Option<IndexStack> {
        let mut path = self.path_to_holder(fragment, child)?;
        let holder = self.parent_of(child)?;
        path.push(self.fragment(holder).ok()?.ctab()?.index_of_child(child)?);
        Some(IndexStack::new(path))
    }

    fn holder_at_path(&self, fragment: ElementId, path: &[usize]) -> Option<ElementId> {
        path.iter().try_fold(fragment, |current, &index| {
            self.fragment(current).ok()?.ctab()?.node_at(index)
        })
    }

    pub fn node_at_index_stack(
        &self,
        fragment: ElementId,
        stack: &IndexStack,
    ) -> Option<ElementId> {
        let (last, path) = stack.split_last()?;
        let holder = self.holder_at_path(fragment, path)?;
        self.fragment(holder).ok()?.ctab()?.node_at(last)
    }

    pub fn connector_at_index_stack(
        &self,
        fragment: ElementId,
        stack: &IndexStack,
    ) -> Option<ElementId> {
        let (last, path) = stack.split_last()?;
        let holder = self.holder_at_path(fragment, path)?;
        self.fragment(holder).ok()?.ctab()?.connector_at(last)
    }

    pub fn child_at_index_stack(
        &self,
        fragment: ElementId,
        stack: &IndexStack,
    ) -> Option<ElementId> {
        let (last, path) = stack.split_last()?;
        let holder = self.holder_at_path(fragment, path)?;
        self.fragment(holder).ok()?.ctab()?.child_at(last)
    }
}
