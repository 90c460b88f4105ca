use super::Space;
use super::error::{GraphError, Result};
use super::events::ChangeKind;
use crate::core::models::ids::ElementId;
use nalgebra::{Point2, Point3, Vector2, Vector3};
use tracing::debug;

impl Space {
    pub fn parent_of(&self, element: ElementId) -> Option<ElementId> {
        self.elements.get(element)?.parent
    }

    /// Fragments containing `element`, nearest first.
    pub fn ancestors(&self, element: ElementId) -> Vec<ElementId> {
        let mut result = Vec::new();
        let mut current = self.parent_of(element);
        while let Some(id) = current {
            result.push(id);
            current = self.parent_of(id);
        }
        result
    }

    /// Whether `element` lies strictly inside `container`.
    pub fn is_within(&self, element: ElementId, container: ElementId) -> bool {
        let mut current = self.parent_of(element);
        while let Some(id) = current {
            if id == container {
                return true;
            }
            current = self.parent_of(id);
        }
        false
    }

    /// Moves `element` under `parent`, or detaches it when `parent` is `None`.
    ///
    /// Detaching severs the element's links. Naming a parent that is not a fragment leaves
    /// everything untouched.
    pub fn set_parent(&mut self, element: ElementId, parent: Option<ElementId>) -> Result<()> {
        let current = self.get(element)?.parent;
        if current == parent {
            return Ok(());
        }
        match parent {
            Some(parent) => {
                if self.get(parent)?.as_fragment().is_none() {
                    debug!(element = ?element, parent = ?parent, "Ignoring parent without container capability.");
                    return Ok(());
                }
                if self.get(element)?.is_connector() {
                    self.append_connector(parent, element)?;
                } else {
                    self.append_node(parent, element)?;
                }
            }
            None => {
                if let Some(old) = current {
                    self.remove_child(old, element, false)?;
                }
            }
        }
        Ok(())
    }

    pub(crate) fn ensure_not_cyclic(&self, parent: ElementId, child: ElementId) -> Result<()> {
        if parent == child || self.is_within(parent, child) {
            return Err(GraphError::CyclicContainment { parent, child });
        }
        Ok(())
    }

    /// Records `parent` on `child` and brings its registration in line with the parent's.
    pub(crate) fn attach(&mut self, child: ElementId, parent: ElementId) {
        let parent_owned = self.elements.get(parent).is_some_and(|p| p.owned);
        if let Some(element) = self.elements.get_mut(child) {
            element.parent = Some(parent);
        }
        if parent_owned {
            self.register_tree(child);
        } else {
            self.unregister_tree(child);
        }
        self.notify(child, ChangeKind::Parent);
    }

    pub(crate) fn detach(&mut self, child: ElementId) {
        if let Some(element) = self.elements.get_mut(child) {
            element.parent = None;
        }
        self.unregister_tree(child);
        self.notify(child, ChangeKind::Parent);
    }

    /// Like [`attach`](Self::attach), but keeps the registration when both sides agree, so
    /// references to the element survive the move.
    pub(crate) fn reparent(&mut self, child: ElementId, parent: ElementId) {
        let parent_owned = self.elements.get(parent).is_some_and(|p| p.owned);
        let child_owned = self.elements.get(child).is_some_and(|c| c.owned);
        if let Some(element) = self.elements.get_mut(child) {
            element.parent = Some(parent);
        }
        if parent_owned != child_owned {
            if parent_owned {
                self.register_tree(child);
            } else {
                self.unregister_tree(child);
            }
        }
        self.notify(child, ChangeKind::Parent);
    }

    pub fn set_coord2d(&mut self, node: ElementId, coord: Option<Point2<f64>>) -> Result<()> {
        self.node_mut(node)?.coord2d = coord;
        self.notify(node, ChangeKind::Coordinates);
        Ok(())
    }

    pub fn set_coord3d(&mut self, node: ElementId, coord: Option<Point3<f64>>) -> Result<()> {
        self.node_mut(node)?.coord3d = coord;
        self.notify(node, ChangeKind::Coordinates);
        Ok(())
    }

    /// Absolute 2D position: the node's coordinate plus those of all containing fragments.
    pub fn abs_coord2d(&self, node: ElementId) -> Result<Point2<f64>> {
        let mut result = self.node(node)?.fetch_coord2d();
        for ancestor in self.ancestors(node) {
            result += self.node(ancestor)?.fetch_coord2d().coords;
        }
        Ok(result)
    }

    pub fn abs_coord3d(&self, node: ElementId) -> Result<Point3<f64>> {
        let mut result = self.node(node)?.fetch_coord3d();
        for ancestor in self.ancestors(node) {
            result += self.node(ancestor)?.fetch_coord3d().coords;
        }
        Ok(result)
    }

    /// Sets the coordinate that yields the given absolute 2D position.
    pub fn set_abs_coord2d(&mut self, node: ElementId, abs: Point2<f64>) -> Result<()> {
        let offset = self.frame_origin2d(node)?;
        self.set_coord2d(node, Some(abs - offset))
    }

    pub fn set_abs_coord3d(&mut self, node: ElementId, abs: Point3<f64>) -> Result<()> {
        let offset = self.frame_origin3d(node)?;
        self.set_coord3d(node, Some(abs - offset))
    }

    fn frame_origin2d(&self, node: ElementId) -> Result<Vector2<f64>> {
        match self.parent_of(node) {
            Some(parent) => Ok(self.abs_coord2d(parent)?.coords),
            None => Ok(Vector2::zeros()),
        }
    }

    fn frame_origin3d(&self, node: ElementId) -> Result<Vector3<f64>> {
        match self.parent_of(node) {
            Some(parent) => Ok(self.abs_coord3d(parent)?.coords),
            None => Ok(Vector3::zeros()),
        }
    }

    /// Shifts a node's coordinates by the given deltas, leaving unset coordinates unset when
    /// the corresponding delta is zero.
    pub(crate) fn shift_coords(
        &mut self,
        node: ElementId,
        delta2d: Vector2<f64>,
        delta3d: Vector3<f64>,
    ) -> Result<()> {
        let target = self.node_mut(node)?;
        if target.coord2d.is_some() || delta2d != Vector2::zeros() {
            target.coord2d = Some(target.fetch_coord2d() + delta2d);
        }
        if target.coord3d.is_some() || delta3d != Vector3::zeros() {
            target.coord3d = Some(target.fetch_coord3d() + delta3d);
        }
        self.notify(node, ChangeKind::Coordinates);
        Ok(())
    }
}
