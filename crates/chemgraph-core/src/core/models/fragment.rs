use super::ctab::ConnectionTable;
use super::element::ElementClass;
use super::formula::MolecularFormula;
use super::ids::ElementId;

#[derive(Debug, Clone, PartialEq, Default)]
pub enum FragmentKind {
    #[default]
    Generic,
    Molecule {
        name: Option<String>,
    },
    /// A substituent group such as a collapsed `Ph` or `COOH`.
    SubGroup {
        abbr: Option<String>,
        name: Option<String>,
    },
}

impl FragmentKind {
    pub fn auto_id_prefix(&self) -> &'static str {
        match self {
            Self::Generic => "f",
            Self::Molecule { .. } => "m",
            Self::SubGroup { .. } => "g",
        }
    }

    /// Sub-groups keep themselves centered on their anchors whenever the anchor set changes.
    pub fn recenters_on_anchor_change(&self) -> bool {
        matches!(self, Self::SubGroup { .. })
    }
}

/// The single structural representation a fragment currently holds.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Representation {
    #[default]
    Empty,
    Table(ConnectionTable),
    Formula(MolecularFormula),
}

/// A node that is itself a sub-graph.
///
/// A fragment holds either a connection table or a molecular formula, never both. Both start
/// absent and are created on first mutating access through the space.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    pub kind: FragmentKind,
    pub(crate) representation: Representation,
    pub(crate) accepted: ElementClass,
}

impl Fragment {
    pub fn new(kind: FragmentKind) -> Self {
        Self {
            kind,
            representation: Representation::Empty,
            accepted: ElementClass::NODE,
        }
    }

    /// Restricts the node classes this fragment accepts as children.
    pub fn with_accepted(mut self, accepted: ElementClass) -> Self {
        self.accepted = accepted & ElementClass::NODE;
        self
    }

    pub fn accepted(&self) -> ElementClass {
        self.accepted
    }

    pub fn accepts(&self, class: ElementClass) -> bool {
        class.intersects(ElementClass::CONNECTOR) || self.accepted.contains(class)
    }

    pub fn representation(&self) -> &Representation {
        &self.representation
    }

    pub fn ctab(&self) -> Option<&ConnectionTable> {
        match &self.representation {
            Representation::Table(table) => Some(table),
            _ => None,
        }
    }

    pub(crate) fn ctab_mut(&mut self) -> Option<&mut ConnectionTable> {
        match &mut self.representation {
            Representation::Table(table) => Some(table),
            _ => None,
        }
    }

    pub fn formula(&self) -> Option<&MolecularFormula> {
        match &self.representation {
            Representation::Formula(formula) => Some(formula),
            _ => None,
        }
    }

    pub(crate) fn formula_mut(&mut self) -> Option<&mut MolecularFormula> {
        match &mut self.representation {
            Representation::Formula(formula) => Some(formula),
            _ => None,
        }
    }

    pub fn has_ctab(&self) -> bool {
        matches!(self.representation, Representation::Table(_))
    }

    pub fn has_formula(&self) -> bool {
        matches!(self.representation, Representation::Formula(_))
    }

    /// True when neither representation carries any content.
    pub fn is_empty(&self) -> bool {
        match &self.representation {
            Representation::Empty => true,
            Representation::Table(table) => table.is_empty(),
            Representation::Formula(formula) => formula.is_empty(),
        }
    }

    pub fn nodes(&self) -> &[ElementId] {
        self.ctab().map(ConnectionTable::nodes).unwrap_or_default()
    }

    pub fn connectors(&self) -> &[ElementId] {
        self.ctab().map(ConnectionTable::connectors).unwrap_or_default()
    }

    pub fn anchor_nodes(&self) -> &[ElementId] {
        self.ctab().map(ConnectionTable::anchor_nodes).unwrap_or_default()
    }

    pub fn node_count(&self) -> usize {
        self.nodes().len()
    }

    pub fn connector_count(&self) -> usize {
        self.connectors().len()
    }

    /// Swaps in a new representation, returning the old one so the caller can finalize its
    /// contents.
    pub(crate) fn replace_representation(
        &mut self,
        representation: Representation,
    ) -> Representation {
        std::mem::replace(&mut self.representation, representation)
    }
}
