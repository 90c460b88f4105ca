//! # Space Module
//!
//! The stateful layer of the library. A [`Space`] owns every structural element in a slot-map
//! arena and is the only place where elements are mutated, so the invariants that span several
//! elements are maintained here:
//!
//! - **Containment** ([`tree`]) - parent back-references, cycle checks, absolute coordinates
//! - **Registry** ([`registry`]) - owner membership, lookup by id and automatic ids
//! - **Links** ([`links`]) - the symmetric node/connector incidence lists
//! - **Tables** ([`table`], [`cascade`]) - connection-table editing, addressing and cascade delete
//! - **Grouping** ([`grouping`]) - nesting nodes into sub-fragments and dissolving them again
//! - **Formulas** ([`formula`]) - representation switching and isotope aggregation
//! - **References** ([`references`], [`loading`]) - reference properties, relation repair and
//!   deferred token resolution
//! - **Notification** ([`events`], [`batch`]) - change observers and update brackets

pub mod batch;
pub mod cascade;
pub mod config;
pub mod error;
pub mod events;
pub mod extras;
pub mod formula;
pub mod grouping;
pub mod links;
pub mod loading;
pub mod references;
pub mod registry;
pub mod table;
pub mod tree;

use crate::core::models::connector::{Bond, Connector};
use crate::core::models::element::{Element, ElementClass, ElementKind, InfoValue, ScalarAttrib};
use crate::core::models::fragment::{Fragment, FragmentKind};
use crate::core::models::group::StructureGroup;
use crate::core::models::ids::ElementId;
use crate::core::models::node::{Atom, Node, NodeRole, Pseudoatom};
use crate::core::relations::RelationManager;
use config::SpaceConfig;
use error::{GraphError, Result};
use events::{ChangeCallback, ChangeEvent, ChangeKind, ChangeNotifier, SubscriptionId};
use extras::ExtraProperties;
use loading::LoadBuffer;
use slotmap::SlotMap;
use tracing::{debug, trace};

pub use batch::UpdateBatch;

/// A document-level container of chemical structures.
///
/// The space owns a root fragment; everything reachable from it through connection tables is
/// registered in the space registry. Standalone elements may exist in the arena before they are
/// attached.
#[derive(Debug)]
pub struct Space {
    pub(crate) elements: SlotMap<ElementId, Element>,
    root: ElementId,
    pub(crate) owned: Vec<ElementId>,
    pub(crate) relations: RelationManager,
    pub(crate) extras: ExtraProperties,
    pub(crate) config: SpaceConfig,
    pub(crate) notifier: ChangeNotifier,
    pub(crate) load_buffer: LoadBuffer,
}

impl Default for Space {
    fn default() -> Self {
        Self::new()
    }
}

impl Space {
    pub fn new() -> Self {
        Self::with_config(SpaceConfig::default())
    }

    pub fn with_config(config: SpaceConfig) -> Self {
        let mut elements = SlotMap::with_key();
        let mut root_element = Element::new(ElementKind::Node(Node::new(NodeRole::Fragment(
            Fragment::new(FragmentKind::Generic),
        ))));
        root_element.owned = true;
        let root = elements.insert(root_element);
        Self {
            elements,
            root,
            owned: vec![root],
            relations: RelationManager::new(),
            extras: ExtraProperties::new(),
            config,
            notifier: ChangeNotifier::new(),
            load_buffer: LoadBuffer::default(),
        }
    }

    /// The fragment at the top of the containment tree.
    pub fn root(&self) -> ElementId {
        self.root
    }

    pub fn config(&self) -> &SpaceConfig {
        &self.config
    }

    pub fn element(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(id)
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.elements.contains_key(id)
    }

    /// Number of live elements in the arena, the root included.
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    pub fn subscribe(&mut self, callback: ChangeCallback) -> SubscriptionId {
        self.notifier.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.notifier.unsubscribe(id)
    }

    pub(crate) fn get(&self, id: ElementId) -> Result<&Element> {
        self.elements.get(id).ok_or(GraphError::ElementNotFound(id))
    }

    pub(crate) fn get_mut(&mut self, id: ElementId) -> Result<&mut Element> {
        self.elements
            .get_mut(id)
            .ok_or(GraphError::ElementNotFound(id))
    }

    pub fn node(&self, id: ElementId) -> Result<&Node> {
        let element = self.get(id)?;
        element.as_node().ok_or(GraphError::TypeMismatch {
            expected: ElementClass::NODE,
            found: element.class(),
        })
    }

    pub(crate) fn node_mut(&mut self, id: ElementId) -> Result<&mut Node> {
        let element = self.get_mut(id)?;
        let found = element.class();
        element.as_node_mut().ok_or(GraphError::TypeMismatch {
            expected: ElementClass::NODE,
            found,
        })
    }

    pub fn connector(&self, id: ElementId) -> Result<&Connector> {
        let element = self.get(id)?;
        element.as_connector().ok_or(GraphError::TypeMismatch {
            expected: ElementClass::CONNECTOR,
            found: element.class(),
        })
    }

    pub(crate) fn connector_mut(&mut self, id: ElementId) -> Result<&mut Connector> {
        let element = self.get_mut(id)?;
        let found = element.class();
        element.as_connector_mut().ok_or(GraphError::TypeMismatch {
            expected: ElementClass::CONNECTOR,
            found,
        })
    }

    pub fn fragment(&self, id: ElementId) -> Result<&Fragment> {
        let element = self.get(id)?;
        element.as_fragment().ok_or(GraphError::TypeMismatch {
            expected: ElementClass::FRAGMENT,
            found: element.class(),
        })
    }

    pub(crate) fn fragment_mut(&mut self, id: ElementId) -> Result<&mut Fragment> {
        let element = self.get_mut(id)?;
        let found = element.class();
        element.as_fragment_mut().ok_or(GraphError::TypeMismatch {
            expected: ElementClass::FRAGMENT,
            found,
        })
    }

    pub fn group(&self, id: ElementId) -> Result<&StructureGroup> {
        let element = self.get(id)?;
        element.as_group().ok_or(GraphError::TypeMismatch {
            expected: ElementClass::GROUP,
            found: element.class(),
        })
    }

    fn insert_element(&mut self, kind: ElementKind) -> ElementId {
        let id = self.elements.insert(Element::new(kind));
        trace!(element = ?id, "Created standalone element.");
        id
    }

    pub fn create_atom(&mut self, atom: Atom) -> ElementId {
        self.insert_element(ElementKind::Node(Node::new(NodeRole::Atom(atom))))
    }

    pub fn create_pseudoatom(&mut self, label: &str) -> ElementId {
        self.insert_element(ElementKind::Node(Node::new(NodeRole::Pseudoatom(
            Pseudoatom::new(label),
        ))))
    }

    pub fn create_fragment(&mut self, fragment: Fragment) -> ElementId {
        self.insert_element(ElementKind::Node(Node::new(NodeRole::Fragment(fragment))))
    }

    /// Creates a connector without endpoints.
    pub fn create_connector(&mut self, bond: Bond) -> ElementId {
        self.insert_element(ElementKind::Connector(Connector::new(bond)))
    }

    /// Creates a connector and links it to `nodes`.
    ///
    /// The connector is not placed in any connection table; append it to the fragment that
    /// should hold it.
    pub fn create_bond(&mut self, nodes: &[ElementId], bond: Bond) -> Result<ElementId> {
        for &node in nodes {
            self.node(node)?;
        }
        let connector = self.create_connector(bond);
        for &node in nodes {
            self.append_connected_obj(connector, node)?;
        }
        Ok(connector)
    }

    pub fn create_group(&mut self, group: StructureGroup) -> ElementId {
        self.insert_element(ElementKind::Group(group))
    }

    /// Applies `edit` to an atom and reports the change.
    pub fn edit_atom<F, R>(&mut self, atom: ElementId, edit: F) -> Result<R>
    where
        F: FnOnce(&mut Atom) -> R,
    {
        let element = self.get_mut(atom)?;
        let found = element.class();
        let target = element.as_atom_mut().ok_or(GraphError::TypeMismatch {
            expected: ElementClass::ATOM,
            found,
        })?;
        let result = edit(target);
        self.notify(atom, ChangeKind::Attributes);
        Ok(result)
    }

    pub fn set_bond(&mut self, connector: ElementId, bond: Bond) -> Result<()> {
        self.connector_mut(connector)?.bond = bond;
        self.notify(connector, ChangeKind::Attributes);
        Ok(())
    }

    pub fn info(&self, element: ElementId, key: &str) -> Option<&InfoValue> {
        self.elements.get(element)?.info.get(key)
    }

    pub fn set_info(
        &mut self,
        element: ElementId,
        key: &str,
        value: impl Into<InfoValue>,
    ) -> Result<Option<InfoValue>> {
        let previous = self
            .get_mut(element)?
            .info
            .insert(key.to_string(), value.into());
        self.notify(element, ChangeKind::Info);
        Ok(previous)
    }

    pub fn remove_info(&mut self, element: ElementId, key: &str) -> Result<Option<InfoValue>> {
        let previous = self.get_mut(element)?.info.shift_remove(key);
        if previous.is_some() {
            self.notify(element, ChangeKind::Info);
        }
        Ok(previous)
    }

    pub fn append_scalar_attrib(
        &mut self,
        element: ElementId,
        attrib: ScalarAttrib,
    ) -> Result<usize> {
        let attribs = &mut self.get_mut(element)?.scalar_attribs;
        attribs.push(attrib);
        let index = attribs.len() - 1;
        self.notify(element, ChangeKind::Info);
        Ok(index)
    }

    /// Raises `kind` on `target`. Structural kinds additionally raise a single
    /// [`ChangeKind::Structure`] on the target and on every ancestor, each carrying `target`
    /// as origin.
    pub(crate) fn notify(&mut self, target: ElementId, kind: ChangeKind) {
        self.notifier.emit(ChangeEvent {
            target,
            kind,
            origin: target,
        });
        if kind.is_structural() {
            let mut current = Some(target);
            while let Some(id) = current {
                self.notifier.emit(ChangeEvent {
                    target: id,
                    kind: ChangeKind::Structure,
                    origin: target,
                });
                current = self.elements.get(id).and_then(|e| e.parent);
            }
        }
    }

    /// Destroys an element.
    ///
    /// The element is detached from its parent (severing its links), unregistered, and removed
    /// from the arena. A fragment finalizes its connection table contents first.
    pub fn finalize(&mut self, element: ElementId) -> Result<()> {
        if element == self.root {
            return Err(GraphError::Unsupported("finalizing the root fragment"));
        }
        let target = self.get(element)?;
        let parent = target.parent;
        let children: Vec<ElementId> = target
            .as_fragment()
            .map(|f| f.connectors().iter().chain(f.nodes()).copied().collect())
            .unwrap_or_default();

        let mut space = self.begin_update();
        for child in children {
            space.finalize(child)?;
        }
        match parent {
            Some(parent) => {
                space.remove_child(parent, element, false)?;
            }
            None => space.sever_links(element)?,
        }
        space.unregister_tree(element);
        space.repair_references_to(element);
        space.extras.clear_element(element);
        space.load_buffer.forget(element);
        space.elements.remove(element);
        debug!(element = ?element, "Finalized element.");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::connector::BondOrder;
    use crate::core::models::formula::MolecularFormula;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recorded(space: &mut Space) -> Rc<RefCell<Vec<ChangeEvent>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        space.subscribe(Box::new(move |e| sink.borrow_mut().push(*e)));
        log
    }

    mod lifecycle {
        use super::*;

        #[test]
        fn new_space_has_registered_root_fragment() {
            let space = Space::new();
            let root = space.element(space.root()).unwrap();
            assert!(root.is_fragment());
            assert!(root.is_owned());
            assert_eq!(root.id(), None);
            assert_eq!(space.element_count(), 1);
        }

        #[test]
        fn created_elements_start_standalone() {
            let mut space = Space::new();
            let atom = space.create_atom(Atom::new("C"));
            let element = space.element(atom).unwrap();
            assert_eq!(element.parent(), None);
            assert!(!element.is_owned());
            assert_eq!(element.id(), None);
        }

        #[test]
        fn create_bond_links_endpoints() {
            let mut space = Space::new();
            let a = space.create_atom(Atom::new("C"));
            let b = space.create_atom(Atom::new("O"));
            let bond = space.create_bond(&[a, b], Bond::new(BondOrder::Double)).unwrap();
            assert_eq!(space.connector(bond).unwrap().connected_objs(), &[a, b]);
            assert_eq!(space.node(a).unwrap().linked_connectors(), &[bond]);
            assert_eq!(space.connector(bond).unwrap().bond.order, BondOrder::Double);
        }

        #[test]
        fn create_bond_rejects_non_node_endpoints() {
            let mut space = Space::new();
            let a = space.create_atom(Atom::new("C"));
            let other = space.create_connector(Bond::default());
            let result = space.create_bond(&[a, other], Bond::default());
            assert!(matches!(result, Err(GraphError::TypeMismatch { .. })));
            assert!(space.node(a).unwrap().linked_connectors().is_empty());
        }

        #[test]
        fn finalize_fragment_destroys_its_contents() {
            let mut space = Space::new();
            let root = space.root();
            let frag = space.create_fragment(Fragment::new(FragmentKind::Generic));
            let a = space.create_atom(Atom::new("C"));
            let b = space.create_atom(Atom::new("C"));
            let bond = space.create_bond(&[a, b], Bond::default()).unwrap();
            space.append_node(frag, a).unwrap();
            space.append_node(frag, b).unwrap();
            space.append_connector(frag, bond).unwrap();
            space.append_node(root, frag).unwrap();

            space.finalize(frag).unwrap();
            for id in [frag, a, b, bond] {
                assert!(!space.contains(id));
                assert!(!space.owned_objects().contains(&id));
            }
            assert_eq!(space.fragment(root).unwrap().node_count(), 0);
        }

        #[test]
        fn finalize_standalone_node_severs_links() {
            let mut space = Space::new();
            let a = space.create_atom(Atom::new("C"));
            let b = space.create_atom(Atom::new("N"));
            let bond = space.create_bond(&[a, b], Bond::default()).unwrap();
            space.finalize(a).unwrap();
            assert_eq!(space.connector(bond).unwrap().connected_objs(), &[b]);
        }

        #[test]
        fn finalize_root_is_unsupported() {
            let mut space = Space::new();
            let root = space.root();
            assert!(matches!(
                space.finalize(root),
                Err(GraphError::Unsupported(_))
            ));
        }

        #[test]
        fn stale_handles_report_not_found() {
            let mut space = Space::new();
            let a = space.create_atom(Atom::new("C"));
            space.finalize(a).unwrap();
            assert!(matches!(space.node(a), Err(GraphError::ElementNotFound(_))));
        }
    }

    mod attributes {
        use super::*;

        #[test]
        fn edit_atom_updates_fields_and_notifies() {
            let mut space = Space::new();
            let a = space.create_atom(Atom::new("N"));
            let log = recorded(&mut space);
            space.edit_atom(a, |atom| atom.charge = 1.0).unwrap();
            assert_eq!(space.element(a).unwrap().as_atom().unwrap().charge, 1.0);
            assert!(
                log.borrow()
                    .iter()
                    .any(|e| e.target == a && e.kind == ChangeKind::Attributes)
            );
        }

        #[test]
        fn edit_atom_rejects_fragments() {
            let mut space = Space::new();
            let root = space.root();
            let result = space.edit_atom(root, |atom| atom.charge = 1.0);
            assert!(matches!(
                result,
                Err(GraphError::TypeMismatch {
                    expected: ElementClass::ATOM,
                    found: ElementClass::FRAGMENT
                })
            ));
        }

        #[test]
        fn info_entries_keep_insertion_order() {
            let mut space = Space::new();
            let a = space.create_atom(Atom::new("C"));
            space.set_info(a, "label", "alpha").unwrap();
            space.set_info(a, "weight", 12.0).unwrap();
            space.set_info(a, "flag", true).unwrap();
            let keys: Vec<&str> = space
                .element(a)
                .unwrap()
                .info
                .keys()
                .map(String::as_str)
                .collect();
            assert_eq!(keys, vec!["label", "weight", "flag"]);
            assert_eq!(space.info(a, "weight"), Some(&InfoValue::Float(12.0)));
            assert_eq!(
                space.remove_info(a, "label").unwrap(),
                Some(InfoValue::Text("alpha".into()))
            );
            assert_eq!(space.info(a, "label"), None);
        }

        #[test]
        fn scalar_attribs_are_appended() {
            let mut space = Space::new();
            let a = space.create_atom(Atom::new("C"));
            let index = space
                .append_scalar_attrib(a, ScalarAttrib::new("shift", 128.5, Some("ppm")))
                .unwrap();
            assert_eq!(index, 0);
            assert_eq!(space.element(a).unwrap().scalar_attribs[0].unit.as_deref(), Some("ppm"));
        }
    }

    mod notification {
        use super::*;

        #[test]
        fn structural_change_bubbles_once_per_level() {
            let mut space = Space::new();
            let root = space.root();
            let outer = space.create_fragment(Fragment::new(FragmentKind::Generic));
            let inner = space.create_fragment(Fragment::new(FragmentKind::Generic));
            space.append_node(root, outer).unwrap();
            space.append_node(outer, inner).unwrap();
            let atom = space.create_atom(Atom::new("C"));
            let log = recorded(&mut space);

            space.append_node(inner, atom).unwrap();

            let events = log.borrow();
            for level in [inner, outer, root] {
                let count = events
                    .iter()
                    .filter(|e| e.target == level && e.kind == ChangeKind::Structure)
                    .count();
                assert_eq!(count, 1, "level {level:?}");
            }
            let root_signal = events
                .iter()
                .find(|e| e.target == root && e.kind == ChangeKind::Structure)
                .unwrap();
            assert_eq!(root_signal.origin, inner);
        }

        #[test]
        fn info_changes_do_not_bubble() {
            let mut space = Space::new();
            let root = space.root();
            let a = space.create_atom(Atom::new("C"));
            space.append_node(root, a).unwrap();
            let log = recorded(&mut space);
            space.set_info(a, "note", "x").unwrap();
            assert!(log.borrow().iter().all(|e| e.kind != ChangeKind::Structure));
        }

        #[test]
        fn formula_edits_raise_structure_on_fragment() {
            let mut space = Space::new();
            let root = space.root();
            let frag = space.create_fragment(Fragment::new(FragmentKind::Generic));
            space.append_node(root, frag).unwrap();
            let log = recorded(&mut space);
            space.set_formula(frag, MolecularFormula::new()).unwrap();
            assert!(
                log.borrow()
                    .iter()
                    .any(|e| e.target == root && e.kind == ChangeKind::Structure)
            );
        }
    }
}
