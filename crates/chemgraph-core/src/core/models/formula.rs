use indexmap::IndexMap;
use std::fmt;

/// An element symbol together with an optional mass number.
///
/// Two isotopes are the same entry in an aggregation if both parts match, so natural carbon
/// (`C`, no mass number) and carbon-13 are kept apart.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Isotope {
    pub symbol: String,
    pub mass_number: Option<u16>,
}

impl Isotope {
    pub fn new(symbol: &str, mass_number: Option<u16>) -> Self {
        Self {
            symbol: symbol.to_string(),
            mass_number,
        }
    }

    pub fn hydrogen() -> Self {
        Self::new("H", None)
    }
}

impl fmt::Display for Isotope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mass_number {
            Some(mass) => write!(f, "{}{}", mass, self.symbol),
            None => f.write_str(&self.symbol),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct IsotopeCount {
    pub count: f64,
    pub charge: f64,
}

/// Aggregated isotope counts and summed charges, in first-encountered order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IsotopeMap {
    entries: IndexMap<Isotope, IsotopeCount>,
}

impl IsotopeMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `count` atoms of `isotope` carrying a combined `charge`.
    pub fn add(&mut self, isotope: Isotope, count: f64, charge: f64) {
        let entry = self.entries.entry(isotope).or_default();
        entry.count += count;
        entry.charge += charge;
    }

    pub fn merge(&mut self, other: &IsotopeMap) {
        for (isotope, item) in &other.entries {
            self.add(isotope.clone(), item.count, item.charge);
        }
    }

    pub fn get(&self, isotope: &Isotope) -> Option<&IsotopeCount> {
        self.entries.get(isotope)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Isotope, &IsotopeCount)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn scaled(&self, factor: f64) -> IsotopeMap {
        let entries = self
            .entries
            .iter()
            .map(|(isotope, item)| {
                (
                    isotope.clone(),
                    IsotopeCount {
                        count: item.count * factor,
                        charge: item.charge * factor,
                    },
                )
            })
            .collect();
        IsotopeMap { entries }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FormulaItem {
    Isotope(Isotope),
    Formula(MolecularFormula),
}

/// One `(item, count, charge)` section of a formula.
///
/// `charge` is the charge of a single unit of `item`. For a bracketed sub-formula it adds to the
/// sub-formula's own total charge.
#[derive(Debug, Clone, PartialEq)]
pub struct FormulaSection {
    pub item: FormulaItem,
    pub count: f64,
    pub charge: f64,
}

impl FormulaSection {
    pub fn unit_charge(&self) -> f64 {
        match &self.item {
            FormulaItem::Isotope(_) => self.charge,
            FormulaItem::Formula(sub) => self.charge + sub.total_charge(),
        }
    }
}

/// A molecular formula made of ordered sections, nesting for bracketed groups like `[Cu(NH3)4]2+`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MolecularFormula {
    sections: Vec<FormulaSection>,
    /// Charge of the formula as a whole, on top of the section charges.
    pub charge: f64,
}

impl MolecularFormula {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a flat formula from aggregated isotope counts, one section per isotope.
    pub fn from_isotope_map(map: &IsotopeMap) -> Self {
        let mut formula = Self::new();
        for (isotope, item) in map.iter() {
            let unit_charge = if item.count != 0.0 {
                item.charge / item.count
            } else {
                0.0
            };
            formula.append_section(FormulaItem::Isotope(isotope.clone()), item.count, unit_charge);
        }
        formula
    }

    pub fn sections(&self) -> &[FormulaSection] {
        &self.sections
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    pub fn section_at(&self, index: usize) -> Option<&FormulaSection> {
        self.sections.get(index)
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn index_of_item(&self, item: &FormulaItem) -> Option<usize> {
        self.sections.iter().position(|s| &s.item == item)
    }

    pub fn append_section(&mut self, item: FormulaItem, count: f64, charge: f64) -> usize {
        self.sections.push(FormulaSection {
            item,
            count,
            charge,
        });
        self.sections.len() - 1
    }

    /// Inserts a section at `index`, appending when the index is past the end.
    pub fn insert_section(
        &mut self,
        index: usize,
        item: FormulaItem,
        count: f64,
        charge: f64,
    ) -> usize {
        let index = index.min(self.sections.len());
        self.sections.insert(
            index,
            FormulaSection {
                item,
                count,
                charge,
            },
        );
        index
    }

    pub fn remove_section_at(&mut self, index: usize) -> Option<FormulaSection> {
        (index < self.sections.len()).then(|| self.sections.remove(index))
    }

    pub fn remove_item(&mut self, item: &FormulaItem) -> Option<FormulaSection> {
        let index = self.index_of_item(item)?;
        self.remove_section_at(index)
    }

    pub fn clear(&mut self) {
        self.sections.clear();
        self.charge = 0.0;
    }

    pub fn total_charge(&self) -> f64 {
        self.sections
            .iter()
            .map(|s| s.unit_charge() * s.count)
            .sum::<f64>()
            + self.charge
    }

    /// Depth of the deepest bracketed sub-formula; a flat formula has level 0.
    ///
    /// For `[Cu(NH3)4]SO4` the outer bracket is at level 1 and `(NH3)` at level 0, giving 2.
    pub fn max_nested_level(&self) -> usize {
        self.sections
            .iter()
            .filter_map(|s| match &s.item {
                FormulaItem::Formula(sub) => Some(sub.max_nested_level() + 1),
                FormulaItem::Isotope(_) => None,
            })
            .max()
            .unwrap_or(0)
    }

    /// Flattens nested sub-formulas into plain isotope counts, multiplying through the
    /// section counts. `[Cu(NH3)4]SO4` yields Cu, N4, H12, S, O4.
    pub fn simple_isotope_maps(&self) -> IsotopeMap {
        let mut map = IsotopeMap::new();
        for section in &self.sections {
            match &section.item {
                FormulaItem::Isotope(isotope) => {
                    map.add(isotope.clone(), section.count, section.charge * section.count)
                }
                FormulaItem::Formula(sub) => {
                    map.merge(&sub.simple_isotope_maps().scaled(section.count));
                }
            }
        }
        map
    }
}

fn write_count(f: &mut fmt::Formatter<'_>, count: f64) -> fmt::Result {
    if count == 1.0 {
        Ok(())
    } else if count.fract() == 0.0 {
        write!(f, "{}", count as i64)
    } else {
        write!(f, "{count}")
    }
}

impl fmt::Display for MolecularFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for section in &self.sections {
            match &section.item {
                FormulaItem::Isotope(isotope) => write!(f, "{isotope}")?,
                FormulaItem::Formula(sub) => write!(f, "({sub})")?,
            }
            write_count(f, section.count)?;
        }
        if self.charge != 0.0 {
            let sign = if self.charge > 0.0 { '+' } else { '-' };
            let magnitude = self.charge.abs();
            if magnitude != 1.0 {
                write_count(f, magnitude)?;
            }
            write!(f, "{sign}")?;
        }
        Ok(())
    }
}
