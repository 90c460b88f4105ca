use super::ids::ElementId;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum BondOrder {
    #[default]
    Single,
    Double,
    Triple,
    Quadruple,
    Explicit,
    Aromatic,
}

#[derive(Debug, Error)]
#[error("Invalid bond order string")]
pub struct ParseBondOrderError;

impl FromStr for BondOrder {
    type Err = ParseBondOrderError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "1" | "s" | "single" => Ok(Self::Single),
            "2" | "d" | "double" => Ok(Self::Double),
            "3" | "t" | "triple" => Ok(Self::Triple),
            "4" | "q" | "quadruple" => Ok(Self::Quadruple),
            "explicit" => Ok(Self::Explicit),
            "ar" | "aromatic" => Ok(Self::Aromatic),
            _ => Err(ParseBondOrderError),
        }
    }
}

impl fmt::Display for BondOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Single => "Single",
                Self::Double => "Double",
                Self::Triple => "Triple",
                Self::Quadruple => "Quadruple",
                Self::Explicit => "Explicit",
                Self::Aromatic => "Aromatic",
            }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BondType {
    #[default]
    Covalent,
    Ionic,
    Coordinate,
    Metallic,
    Hydrogen,
}

#[derive(Debug, Error)]
#[error("Invalid bond type string")]
pub struct ParseBondTypeError;

impl FromStr for BondType {
    type Err = ParseBondTypeError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "covalent" => Ok(Self::Covalent),
            "ionic" => Ok(Self::Ionic),
            "coordinate" => Ok(Self::Coordinate),
            "metallic" => Ok(Self::Metallic),
            "hydrogen" => Ok(Self::Hydrogen),
            _ => Err(ParseBondTypeError),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Bond {
    pub order: BondOrder,
    pub bond_type: BondType,
}

impl Bond {
    pub fn new(order: BondOrder) -> Self {
        Self {
            order,
            bond_type: BondType::Covalent,
        }
    }

    pub fn with_type(mut self, bond_type: BondType) -> Self {
        self.bond_type = bond_type;
        self
    }
}

/// A bond-like edge joining two (or, for multi-center bonds, more) nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct Connector {
    pub(crate) connected_objs: Vec<ElementId>,
    pub bond: Bond,
}

impl Connector {
    pub fn new(bond: Bond) -> Self {
        Self {
            connected_objs: Vec::new(),
            bond,
        }
    }

    pub fn connected_objs(&self) -> &[ElementId] {
        &self.connected_objs
    }

    pub fn connected_obj_count(&self) -> usize {
        self.connected_objs.len()
    }

    pub fn contains(&self, node: ElementId) -> bool {
        self.connected_objs.contains(&node)
    }

    /// A connector with fewer than two endpoints no longer joins anything.
    pub fn is_dangling(&self) -> bool {
        self.connected_objs.len() < 2
    }

    pub fn other_objs(&self, node: ElementId) -> impl Iterator<Item = ElementId> + '_ {
        self.connected_objs.iter().copied().filter(move |&o| o != node)
    }

    pub(crate) fn push_connected_obj(&mut self, node: ElementId) -> bool {
        if self.connected_objs.contains(&node) {
            return false;
        }
        self.connected_objs.push(node);
        true
    }

    pub(crate) fn drop_connected_obj(&mut self, node: ElementId) -> bool {
        match self.connected_objs.iter().position(|&o| o == node) {
            Some(index) => {
                self.connected_objs.remove(index);
                true
            }
            None => false,
        }
    }
}
