use super::ids::ElementId;

/// Ordered storage of a fragment's direct children.
///
/// The table only keeps the three lists; attaching elements, maintaining back-references and
/// notifying observers is done by the owning [`Space`](crate::space::Space). Children are
/// enumerated nodes first, then connectors, so a connector's child index is offset by the node
/// count.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConnectionTable {
    pub(crate) nodes: Vec<ElementId>,
    pub(crate) connectors: Vec<ElementId>,
    pub(crate) anchor_nodes: Vec<ElementId>,
}

impl ConnectionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nodes(&self) -> &[ElementId] {
        &self.nodes
    }

    pub fn connectors(&self) -> &[ElementId] {
        &self.connectors
    }

    pub fn anchor_nodes(&self) -> &[ElementId] {
        &self.anchor_nodes
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn connector_count(&self) -> usize {
        self.connectors.len()
    }

    pub fn anchor_node_count(&self) -> usize {
        self.anchor_nodes.len()
    }

    pub fn child_count(&self) -> usize {
        self.nodes.len() + self.connectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.connectors.is_empty()
    }

    pub fn node_at(&self, index: usize) -> Option<ElementId> {
        self.nodes.get(index).copied()
    }

    pub fn connector_at(&self, index: usize) -> Option<ElementId> {
        self.connectors.get(index).copied()
    }

    pub fn anchor_node_at(&self, index: usize) -> Option<ElementId> {
        self.anchor_nodes.get(index).copied()
    }

    pub fn child_at(&self, index: usize) -> Option<ElementId> {
        if index < self.nodes.len() {
            self.node_at(index)
        } else {
            self.connector_at(index - self.nodes.len())
        }
    }

    pub fn index_of_node(&self, node: ElementId) -> Option<usize> {
        self.nodes.iter().position(|&n| n == node)
    }

    pub fn index_of_connector(&self, connector: ElementId) -> Option<usize> {
        self.connectors.iter().position(|&c| c == connector)
    }

    pub fn index_of_anchor_node(&self, node: ElementId) -> Option<usize> {
        self.anchor_nodes.iter().position(|&n| n == node)
    }

    pub fn index_of_child(&self, child: ElementId) -> Option<usize> {
        self.index_of_node(child).or_else(|| {
            self.index_of_connector(child)
                .map(|index| index + self.nodes.len())
        })
    }

    pub fn contains_node(&self, node: ElementId) -> bool {
        self.index_of_node(node).is_some()
    }

    pub fn contains_connector(&self, connector: ElementId) -> bool {
        self.index_of_connector(connector).is_some()
    }

    pub fn contains_child(&self, child: ElementId) -> bool {
        self.index_of_child(child).is_some()
    }

    /// Inserts `node` at `index` (tail when `None` or out of range), moving it if already present.
    /// Returns the final index and whether the node was newly added.
    pub(crate) fn place_node(&mut self, node: ElementId, index: Option<usize>) -> (usize, bool) {
        place(&mut self.nodes, node, index)
    }

    pub(crate) fn place_connector(
        &mut self,
        connector: ElementId,
        index: Option<usize>,
    ) -> (usize, bool) {
        place(&mut self.connectors, connector, index)
    }

    /// Removes `node` from the node and anchor lists, returning its former node index.
    pub(crate) fn take_node(&mut self, node: ElementId) -> Option<usize> {
        let index = self.index_of_node(node)?;
        self.nodes.remove(index);
        self.take_anchor_node(node);
        Some(index)
    }

    pub(crate) fn take_connector(&mut self, connector: ElementId) -> Option<usize> {
        let index = self.index_of_connector(connector)?;
        self.connectors.remove(index);
        Some(index)
    }

    /// Anchors must already be nodes of this table.
    pub(crate) fn push_anchor_node(&mut self, node: ElementId) -> bool {
        if !self.contains_node(node) || self.anchor_nodes.contains(&node) {
            return false;
        }
        self.anchor_nodes.push(node);
        true
    }

    pub(crate) fn take_anchor_node(&mut self, node: ElementId) -> Option<usize> {
        let index = self.index_of_anchor_node(node)?;
        self.anchor_nodes.remove(index);
        Some(index)
    }
}

fn place(list: &mut Vec<ElementId>, item: ElementId, index: Option<usize>) -> (usize, bool) {
    let existing = list.iter().position(|&i| i == item);
    if let Some(old) = existing {
        list.remove(old);
    }
    let target = index.map_or(list.len(), |i| i.min(list.len()));
    list.insert(target, item);
    (target, existing.is_none())
}
