use super::Space;
use super::error::{GraphError, Result};
use super::events::ChangeKind;
use crate::core::models::fragment::Representation;
use crate::core::models::formula::{Isotope, IsotopeMap, MolecularFormula};
use crate::core::models::ids::ElementId;
use crate::core::models::node::NodeRole;
use tracing::debug;

impl Space {
    /// Gives `fragment` a connection table, discarding a formula it may hold.
    pub fn create_ctab(&mut self, fragment: ElementId) -> Result<()> {
        self.ensure_ctab(fragment)?;
        Ok(())
    }

    /// Replaces the fragment's representation with `formula`. Elements of a previous connection
    /// table are finalized.
    pub fn set_formula(&mut self, fragment: ElementId, formula: MolecularFormula) -> Result<()> {
        self.fragment(fragment)?;
        let mut space = self.begin_update();
        space.finalize_table_contents(fragment)?;
        space
            .fragment_mut(fragment)?
            .replace_representation(Representation::Formula(formula));
        space.notify(fragment, ChangeKind::Representation);
        space.notify(fragment, ChangeKind::Formula);
        Ok(())
    }

    /// Applies `edit` to the fragment's formula, creating an empty one when the fragment has no
    /// representation yet.
    pub fn edit_formula<F, R>(&mut self, fragment: ElementId, edit: F) -> Result<R>
    where
        F: FnOnce(&mut MolecularFormula) -> R,
    {
        match self.fragment(fragment)?.representation() {
            Representation::Table(_) => {
                return Err(GraphError::Unsupported(
                    "editing the formula of a fragment with a connection table",
                ));
            }
            Representation::Empty => self.set_formula(fragment, MolecularFormula::new())?,
            Representation::Formula(_) => {}
        }
        let formula = self
            .fragment_mut(fragment)?
            .formula_mut()
            .ok_or(GraphError::Unsupported("fragment has no formula"))?;
        let result = edit(formula);
        self.notify(fragment, ChangeKind::Formula);
        Ok(result)
    }

    /// Drops whichever representation the fragment holds, finalizing table contents.
    pub fn clear_representation(&mut self, fragment: ElementId) -> Result<()> {
        if matches!(self.fragment(fragment)?.representation(), Representation::Empty) {
            return Ok(());
        }
        let mut space = self.begin_update();
        space.finalize_table_contents(fragment)?;
        space
            .fragment_mut(fragment)?
            .replace_representation(Representation::Empty);
        space.notify(fragment, ChangeKind::Representation);
        Ok(())
    }

    fn finalize_table_contents(&mut self, fragment: ElementId) -> Result<()> {
        let target = self.fragment(fragment)?;
        let children: Vec<ElementId> = target
            .connectors()
            .iter()
            .chain(target.nodes())
            .copied()
            .collect();
        if children.is_empty() {
            return Ok(());
        }
        debug!(fragment = ?fragment, children = children.len(), "Finalizing connection table contents.");
        for child in children {
            self.finalize(child)?;
        }
        Ok(())
    }

    /// Isotope counts of everything in the fragment.
    ///
    /// Atoms contribute their isotope and charge, explicit hydrogen counts add hydrogens, nested
    /// fragments contribute their own maps, and a formula-represented fragment contributes its
    /// flattened formula. Pseudoatoms contribute nothing.
    pub fn isotope_maps(&self, fragment: ElementId) -> Result<IsotopeMap> {
        let target = self.fragment(fragment)?;
        if let Some(formula) = target.formula() {
            return Ok(formula.simple_isotope_maps());
        }
        let mut map = IsotopeMap::new();
        for &node in target.nodes() {
            match self.node(node)?.role() {
                NodeRole::Atom(atom) => {
                    map.add(atom.isotope(), 1.0, atom.charge);
                    if atom.explicit_hydrogen_count > 0 {
                        map.add(Isotope::hydrogen(), f64::from(atom.explicit_hydrogen_count), 0.0);
                    }
                }
                NodeRole::Fragment(_) => map.merge(&self.isotope_maps(node)?),
                NodeRole::Pseudoatom(_) => {}
            }
        }
        Ok(map)
    }

    /// The fragment's molecular formula: computed from its table, or the stored formula.
    /// `None` when the fragment has neither.
    pub fn calc_formula(&self, fragment: ElementId) -> Result<Option<MolecularFormula>> {
        match self.fragment(fragment)?.representation() {
            Representation::Table(_) => Ok(Some(MolecularFormula::from_isotope_map(
                &self.isotope_maps(fragment)?,
            ))),
            Representation::Formula(formula) => Ok(Some(formula.clone())),
            Representation::Empty => Ok(None),
        }
    }
}
