use super::Space;
use super::error::{GraphError, Result};
use crate::core::models::ids::ElementId;
use crate::core::utils::geometry::{centroid_2d, centroid_3d};
use nalgebra::{Point2, Point3, Vector2, Vector3};
use std::collections::HashSet;
use tracing::{debug, instrument};

impl Space {
    /// Connectors linking anything inside `fragment` to something outside it.
    pub fn cross_connectors(&self, fragment: ElementId) -> Result<Vec<ElementId>> {
        self.fragment(fragment)?;
        let mut seen = HashSet::new();
        let mut result = Vec::new();
        for id in self.subtree(fragment) {
            let Some(node) = self.elements.get(id).and_then(|e| e.as_node()) else {
                continue;
            };
            for &connector in node.linked_connectors() {
                if !self.is_within(connector, fragment) && seen.insert(connector) {
                    result.push(connector);
                }
            }
        }
        Ok(result)
    }

    /// Groups `nodes` of `fragment` into the fragment `sub`, which is appended to `fragment`.
    ///
    /// Connectors among the grouped nodes move into `sub`. Connectors reaching outside stay
    /// where they are and become cross connectors of `sub`; the grouped nodes they touch become
    /// its anchors. Nodes that are not direct children of `fragment` are skipped. Links and
    /// absolute coordinates are preserved.
    #[instrument(skip_all, name = "marshal_sub_fragment", fields(fragment = ?fragment, sub = ?sub, nodes = nodes.len()))]
    pub fn marshal_sub_fragment(
        &mut self,
        fragment: ElementId,
        nodes: &[ElementId],
        sub: ElementId,
    ) -> Result<ElementId> {
        if !self.fragment(fragment)?.has_ctab() {
            return Err(GraphError::NoConnectionTable(fragment));
        }
        self.fragment(sub)?;

        let mut grouped = Vec::new();
        let mut anchors = Vec::new();
        let mut inner = Vec::new();
        for &node in nodes {
            if self.index_of_node(fragment, node)?.is_none() || grouped.contains(&node) {
                continue;
            }
            let mut is_anchor = false;
            for &connector in self.node(node)?.linked_connectors() {
                let external = self
                    .connector(connector)?
                    .other_objs(node)
                    .any(|o| !nodes.contains(&o));
                if external {
                    is_anchor = true;
                } else if !inner.contains(&connector) {
                    inner.push(connector);
                }
            }
            grouped.push(node);
            if is_anchor {
                anchors.push(node);
            }
        }

        let mut space = self.begin_update();
        space.append_node(fragment, sub)?;
        space.move_children(sub, &grouped, &inner)?;
        for anchor in anchors {
            space.append_anchor_node(sub, anchor)?;
        }
        debug!(grouped = grouped.len(), connectors = inner.len(), "Marshalled sub fragment.");
        Ok(sub)
    }

    /// Dissolves the direct child fragment `sub`, moving its nodes and connectors into
    /// `fragment` and finalizing it. With `cascade`, fragments nested in `sub` are dissolved
    /// first. Absolute coordinates are preserved; anchors of `sub` are dropped.
    #[instrument(skip_all, name = "unmarshal_sub_fragment", fields(fragment = ?fragment, sub = ?sub, cascade = cascade))]
    pub fn unmarshal_sub_fragment(
        &mut self,
        fragment: ElementId,
        sub: ElementId,
        cascade: bool,
    ) -> Result<()> {
        if !self.fragment(fragment)?.has_ctab() {
            return Err(GraphError::NoConnectionTable(fragment));
        }
        if self.index_of_node(fragment, sub)?.is_none() {
            return Err(GraphError::NotAChild {
                parent: fragment,
                child: sub,
            });
        }
        self.fragment(sub)?;

        let mut space = self.begin_update();
        if cascade {
            space.unmarshal_all_sub_fragments(sub, true)?;
        }
        if let Some(table) = space.fragment_mut(sub)?.ctab_mut() {
            table.anchor_nodes.clear();
        }
        let nodes = space.nodes(sub)?.to_vec();
        let connectors = space.connectors(sub)?.to_vec();
        space.move_children(fragment, &nodes, &connectors)?;
        space.finalize(sub)?;
        debug!(nodes = nodes.len(), connectors = connectors.len(), "Unmarshalled sub fragment.");
        Ok(())
    }

    /// Dissolves every direct sub-fragment of `fragment` that has nodes.
    pub fn unmarshal_all_sub_fragments(
        &mut self,
        fragment: ElementId,
        cascade: bool,
    ) -> Result<()> {
        for sub in self.sub_fragments(fragment)? {
            self.unmarshal_sub_fragment(fragment, sub, cascade)?;
        }
        Ok(())
    }

    /// Moves the origin of `fragment` to the centroid of its anchor nodes, shifting its nodes
    /// the opposite way so their absolute positions do not change.
    pub fn recalc_coords(&mut self, fragment: ElementId) -> Result<()> {
        let target = self.fragment(fragment)?;
        let mut points2d = Vec::new();
        let mut points3d = Vec::new();
        for &anchor in target.anchor_nodes() {
            let node = self.node(anchor)?;
            points2d.extend(node.coord2d());
            points3d.extend(node.coord3d());
        }
        let center2d = centroid_2d(&points2d).unwrap_or_else(Vector2::zeros);
        let center3d = centroid_3d(&points3d).unwrap_or_else(Vector3::zeros);
        if center2d == Vector2::zeros() && center3d == Vector3::zeros() {
            return Ok(());
        }

        let nodes = target.nodes().to_vec();
        let mut space = self.begin_update();
        space.shift_coords(fragment, center2d, center3d)?;
        for node in nodes {
            space.shift_coords(node, -center2d, -center3d)?;
        }
        Ok(())
    }

    /// Moves nodes and connectors into the table of `dest`, keeping links, registration and the
    /// absolute positions of nodes with coordinates.
    pub(crate) fn move_children(
        &mut self,
        dest: ElementId,
        nodes: &[ElementId],
        connectors: &[ElementId],
    ) -> Result<()> {
        let mut positions: Vec<(ElementId, Option<Point2<f64>>, Option<Point3<f64>>)> = Vec::new();
        for &node in nodes {
            let current = self.node(node)?;
            let abs2d = match current.coord2d() {
                Some(_) => Some(self.abs_coord2d(node)?),
                None => None,
            };
            let abs3d = match current.coord3d() {
                Some(_) => Some(self.abs_coord3d(node)?),
                None => None,
            };
            positions.push((node, abs2d, abs3d));
        }

        let mut space = self.begin_update();
        for &node in nodes {
            space.place_child(dest, node, None, true)?;
        }
        for &connector in connectors {
            space.place_child(dest, connector, None, true)?;
        }
        for (node, abs2d, abs3d) in positions {
            if let Some(abs) = abs2d {
                space.set_abs_coord2d(node, abs)?;
            }
            if let Some(abs) = abs3d {
                space.set_abs_coord3d(node, abs)?;
            }
        }
        Ok(())
    }
}
