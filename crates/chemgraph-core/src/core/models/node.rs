use super::fragment::Fragment;
use super::formula::Isotope;
use super::ids::ElementId;
use nalgebra::{Point2, Point3};

const HYDROGEN_SYMBOL: &str = "H";

/// A chemical atom.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// The element symbol (e.g., "C", "N", "H").
    pub symbol: String,
    /// The isotope mass number; `None` for the natural isotope mixture.
    pub mass_number: Option<u16>,
    /// The formal charge in elementary charge units.
    pub charge: f64,
    /// Number of implicit hydrogens explicitly recorded on this atom.
    pub explicit_hydrogen_count: u32,
}

impl Atom {
    pub fn new(symbol: &str) -> Self {
        Self {
            symbol: symbol.trim().to_string(),
            mass_number: None,
            charge: 0.0,
            explicit_hydrogen_count: 0,
        }
    }

    pub fn with_mass_number(mut self, mass_number: u16) -> Self {
        self.mass_number = Some(mass_number);
        self
    }

    pub fn with_charge(mut self, charge: f64) -> Self {
        self.charge = charge;
        self
    }

    pub fn with_hydrogen_count(mut self, count: u32) -> Self {
        self.explicit_hydrogen_count = count;
        self
    }

    pub fn isotope(&self) -> Isotope {
        Isotope::new(&self.symbol, self.mass_number)
    }

    pub fn is_hydrogen(&self) -> bool {
        self.symbol == HYDROGEN_SYMBOL
    }
}

/// A placeholder node standing for an unspecified substituent (e.g., "R", "X").
#[derive(Debug, Clone, PartialEq)]
pub struct Pseudoatom {
    pub label: String,
}

impl Pseudoatom {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeRole {
    Atom(Atom),
    Pseudoatom(Pseudoatom),
    Fragment(Fragment),
}

/// An atom-like vertex of the structure graph.
///
/// `linked_connectors` is kept in insertion order without duplicates and mirrors the
/// `connected_objs` lists of the connectors it names. Coordinates are relative to the parent
/// fragment; an unset coordinate reads as the origin of that frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub(crate) linked_connectors: Vec<ElementId>,
    pub(crate) coord2d: Option<Point2<f64>>,
    pub(crate) coord3d: Option<Point3<f64>>,
    pub(crate) role: NodeRole,
}

impl Node {
    pub fn new(role: NodeRole) -> Self {
        Self {
            linked_connectors: Vec::new(),
            coord2d: None,
            coord3d: None,
            role,
        }
    }

    pub fn role(&self) -> &NodeRole {
        &self.role
    }

    pub fn linked_connectors(&self) -> &[ElementId] {
        &self.linked_connectors
    }

    pub fn linked_connector_count(&self) -> usize {
        self.linked_connectors.len()
    }

    pub fn index_of_linked_connector(&self, connector: ElementId) -> Option<usize> {
        self.linked_connectors.iter().position(|&c| c == connector)
    }

    pub fn coord2d(&self) -> Option<Point2<f64>> {
        self.coord2d
    }

    pub fn coord3d(&self) -> Option<Point3<f64>> {
        self.coord3d
    }

    /// The 2D coordinate, reading an unset value as the origin.
    pub fn fetch_coord2d(&self) -> Point2<f64> {
        self.coord2d.unwrap_or_else(Point2::origin)
    }

    /// The 3D coordinate, reading an unset value as the origin.
    pub fn fetch_coord3d(&self) -> Point3<f64> {
        self.coord3d.unwrap_or_else(Point3::origin)
    }

    pub fn as_fragment(&self) -> Option<&Fragment> {
        match &self.role {
            NodeRole::Fragment(fragment) => Some(fragment),
            _ => None,
        }
    }

    pub(crate) fn as_fragment_mut(&mut self) -> Option<&mut Fragment> {
        match &mut self.role {
            NodeRole::Fragment(fragment) => Some(fragment),
            _ => None,
        }
    }

    pub(crate) fn push_linked_connector(&mut self, connector: ElementId) -> bool {
        if self.linked_connectors.contains(&connector) {
            return false;
        }
        self.linked_connectors.push(connector);
        true
    }

    pub(crate) fn drop_linked_connector(&mut self, connector: ElementId) -> bool {
        match self.index_of_linked_connector(connector) {
            Some(index) => {
                self.linked_connectors.remove(index);
                true
            }
            None => false,
        }
    }
}
