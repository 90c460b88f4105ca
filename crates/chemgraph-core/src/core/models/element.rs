use super::connector::Connector;
use super::fragment::Fragment;
use super::group::StructureGroup;
use super::ids::ElementId;
use super::node::{Atom, Node, NodeRole, Pseudoatom};
use crate::core::relations::RefTarget;
use bitflags::bitflags;
use indexmap::IndexMap;
use std::fmt;

bitflags! {
    /// Coarse classification of structural elements, used for item-type constraints.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ElementClass: u8 {
        const ATOM = 1;
        const PSEUDOATOM = 1 << 1;
        const FRAGMENT = 1 << 2;
        const CONNECTOR = 1 << 3;
        const GROUP = 1 << 4;
        const NODE = Self::ATOM.bits() | Self::PSEUDOATOM.bits() | Self::FRAGMENT.bits();
        const STRUCTURAL = Self::NODE.bits() | Self::CONNECTOR.bits();
    }
}

impl fmt::Display for ElementClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        let names: Vec<String> = self
            .iter_names()
            .map(|(name, _)| name.to_lowercase())
            .collect();
        f.write_str(&names.join("|"))
    }
}

/// A free-form value stored in an element's info map.
#[derive(Debug, Clone, PartialEq)]
pub enum InfoValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<InfoValue>),
}

impl From<bool> for InfoValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for InfoValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for InfoValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for InfoValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for InfoValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

/// A named scalar quantity attached to an element, e.g. a measured shift or a partial charge.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarAttrib {
    pub name: String,
    pub value: f64,
    pub unit: Option<String>,
}

impl ScalarAttrib {
    pub fn new(name: impl Into<String>, value: f64, unit: Option<&str>) -> Self {
        Self {
            name: name.into(),
            value,
            unit: unit.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ElementKind {
    Node(Node),
    Connector(Connector),
    Group(StructureGroup),
}

/// A structural element stored in the space arena.
///
/// Every element carries the two independent back-references of the model: `parent`, the
/// fragment whose connection table lists it, and the owner flag, set while the element is
/// registered in its space. Both are maintained exclusively by [`Space`](crate::space::Space)
/// operations, so the struct only exposes read access to them.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub(crate) id: Option<String>,
    pub(crate) parent: Option<ElementId>,
    pub(crate) owned: bool,
    pub(crate) references: IndexMap<&'static str, RefTarget>,
    pub(crate) kind: ElementKind,
    /// Free-form info entries in insertion order.
    pub info: IndexMap<String, InfoValue>,
    /// Scalar attributes in insertion order.
    pub scalar_attribs: Vec<ScalarAttrib>,
}

impl Element {
    pub(crate) fn new(kind: ElementKind) -> Self {
        Self {
            id: None,
            parent: None,
            owned: false,
            references: IndexMap::new(),
            kind,
            info: IndexMap::new(),
            scalar_attribs: Vec::new(),
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn parent(&self) -> Option<ElementId> {
        self.parent
    }

    /// Whether the element is currently registered in its space.
    pub fn is_owned(&self) -> bool {
        self.owned
    }

    pub fn kind(&self) -> &ElementKind {
        &self.kind
    }

    pub fn class(&self) -> ElementClass {
        match &self.kind {
            ElementKind::Node(node) => match node.role() {
                NodeRole::Atom(_) => ElementClass::ATOM,
                NodeRole::Pseudoatom(_) => ElementClass::PSEUDOATOM,
                NodeRole::Fragment(_) => ElementClass::FRAGMENT,
            },
            ElementKind::Connector(_) => ElementClass::CONNECTOR,
            ElementKind::Group(_) => ElementClass::GROUP,
        }
    }

    pub fn as_node(&self) -> Option<&Node> {
        match &self.kind {
            ElementKind::Node(node) => Some(node),
            _ => None,
        }
    }

    pub(crate) fn as_node_mut(&mut self) -> Option<&mut Node> {
        match &mut self.kind {
            ElementKind::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_connector(&self) -> Option<&Connector> {
        match &self.kind {
            ElementKind::Connector(connector) => Some(connector),
            _ => None,
        }
    }

    pub(crate) fn as_connector_mut(&mut self) -> Option<&mut Connector> {
        match &mut self.kind {
            ElementKind::Connector(connector) => Some(connector),
            _ => None,
        }
    }

    pub fn as_group(&self) -> Option<&StructureGroup> {
        match &self.kind {
            ElementKind::Group(group) => Some(group),
            _ => None,
        }
    }

    pub fn as_atom(&self) -> Option<&Atom> {
        self.as_node().and_then(|node| match node.role() {
            NodeRole::Atom(atom) => Some(atom),
            _ => None,
        })
    }

    pub(crate) fn as_atom_mut(&mut self) -> Option<&mut Atom> {
        self.as_node_mut().and_then(|node| match &mut node.role {
            NodeRole::Atom(atom) => Some(atom),
            _ => None,
        })
    }

    pub fn as_pseudoatom(&self) -> Option<&Pseudoatom> {
        self.as_node().and_then(|node| match node.role() {
            NodeRole::Pseudoatom(pseudo) => Some(pseudo),
            _ => None,
        })
    }

    pub fn as_fragment(&self) -> Option<&Fragment> {
        self.as_node().and_then(Node::as_fragment)
    }

    pub(crate) fn as_fragment_mut(&mut self) -> Option<&mut Fragment> {
        self.as_node_mut().and_then(Node::as_fragment_mut)
    }

    pub fn is_node(&self) -> bool {
        matches!(self.kind, ElementKind::Node(_))
    }

    pub fn is_connector(&self) -> bool {
        matches!(self.kind, ElementKind::Connector(_))
    }

    pub fn is_fragment(&self) -> bool {
        self.as_fragment().is_some()
    }

    pub fn is_hydrogen_atom(&self) -> bool {
        self.as_atom().is_some_and(Atom::is_hydrogen)
    }

    /// Current value of a reference property, if set.
    pub fn reference(&self, prop: &str) -> Option<&RefTarget> {
        self.references.get(prop)
    }

    /// Prefix used when generating automatic ids for this element.
    pub fn auto_id_prefix(&self) -> &'static str {
        match &self.kind {
            ElementKind::Node(node) => match node.role() {
                NodeRole::Atom(_) | NodeRole::Pseudoatom(_) => "a",
                NodeRole::Fragment(fragment) => fragment.kind.auto_id_prefix(),
            },
            ElementKind::Connector(_) => "b",
            ElementKind::Group(_) => "sg",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::connector::{Bond, BondOrder};
    use crate::core::models::fragment::FragmentKind;

    fn atom_element(symbol: &str) -> Element {
        Element::new(ElementKind::Node(Node::new(NodeRole::Atom(Atom::new(symbol)))))
    }

    #[test]
    fn new_element_has_no_identity_or_back_references() {
        let element = atom_element("C");
        assert_eq!(element.id(), None);
        assert_eq!(element.parent(), None);
        assert!(!element.is_owned());
        assert!(element.info.is_empty());
    }

    #[test]
    fn class_reflects_element_kind() {
        assert_eq!(atom_element("C").class(), ElementClass::ATOM);
        let fragment = Element::new(ElementKind::Node(Node::new(NodeRole::Fragment(
            Fragment::new(FragmentKind::Generic),
        ))));
        assert_eq!(fragment.class(), ElementClass::FRAGMENT);
        let bond = Element::new(ElementKind::Connector(Connector::new(Bond::new(
            BondOrder::Double,
        ))));
        assert_eq!(bond.class(), ElementClass::CONNECTOR);
        assert!(ElementClass::NODE.contains(ElementClass::FRAGMENT));
        assert!(!ElementClass::NODE.contains(ElementClass::CONNECTOR));
    }

    #[test]
    fn is_hydrogen_atom_checks_symbol() {
        assert!(atom_element("H").is_hydrogen_atom());
        assert!(!atom_element("He").is_hydrogen_atom());
        let pseudo = Element::new(ElementKind::Node(Node::new(NodeRole::Pseudoatom(
            Pseudoatom::new("R"),
        ))));
        assert!(!pseudo.is_hydrogen_atom());
    }

    #[test]
    fn auto_id_prefix_follows_kind() {
        assert_eq!(atom_element("C").auto_id_prefix(), "a");
        let molecule = Element::new(ElementKind::Node(Node::new(NodeRole::Fragment(
            Fragment::new(FragmentKind::Molecule { name: None }),
        ))));
        assert_eq!(molecule.auto_id_prefix(), "m");
        let group = Element::new(ElementKind::Group(StructureGroup::new(
            None,
            ElementClass::STRUCTURAL,
        )));
        assert_eq!(group.auto_id_prefix(), "sg");
    }

    #[test]
    fn element_class_display_lists_flag_names() {
        assert_eq!(ElementClass::ATOM.to_string(), "atom");
        assert_eq!(
            (ElementClass::ATOM | ElementClass::CONNECTOR).to_string(),
            "atom|connector"
        );
        assert_eq!(ElementClass::empty().to_string(), "none");
    }
}
