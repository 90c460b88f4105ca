//! Owner-scoped bookkeeping of `source.property -> destination(s)` object references.
//!
//! The [`RelationManager`] is a plain list searched linearly. It is queried by destination when
//! an object leaves its space so that references pointing at it can be repaired.

use crate::core::models::ids::ElementId;
use std::slice;

/// Value of a reference-typed property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefTarget {
    Single(ElementId),
    Multiple(Vec<ElementId>),
}

impl RefTarget {
    pub fn ids(&self) -> &[ElementId] {
        match self {
            Self::Single(id) => slice::from_ref(id),
            Self::Multiple(ids) => ids,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Multiple(ids) if ids.is_empty())
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.ids().contains(&id)
    }

    /// The value left after `id` is dropped from it; `None` when nothing remains.
    pub fn without(&self, id: ElementId) -> Option<RefTarget> {
        match self {
            Self::Single(current) if *current == id => None,
            Self::Single(current) => Some(Self::Single(*current)),
            Self::Multiple(ids) => {
                let remaining: Vec<ElementId> = ids.iter().copied().filter(|&i| i != id).collect();
                (!remaining.is_empty()).then_some(Self::Multiple(remaining))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjRefRelation {
    pub src: ElementId,
    pub prop: &'static str,
    pub dest: RefTarget,
}

/// Conditions for [`RelationManager::find_relations`]; unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationQuery {
    pub src: Option<ElementId>,
    pub prop: Option<String>,
    pub dest: Vec<ElementId>,
}

impl RelationQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn src(mut self, src: ElementId) -> Self {
        self.src = Some(src);
        self
    }

    pub fn prop(mut self, prop: &str) -> Self {
        self.prop = Some(prop.to_string());
        self
    }

    pub fn dest(mut self, dest: &[ElementId]) -> Self {
        self.dest = dest.to_vec();
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FindOptions {
    /// Also match relations whose destination lies inside one of the queried objects.
    pub check_dest_children: bool,
}

#[derive(Debug, Clone, Default)]
pub struct RelationManager {
    relations: Vec<ObjRefRelation>,
}

impl RelationManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn relations(&self) -> &[ObjRefRelation] {
        &self.relations
    }

    pub fn len(&self) -> usize {
        self.relations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }

    pub fn relation_index(&self, src: ElementId, prop: &str) -> Option<usize> {
        self.relations
            .iter()
            .position(|r| r.src == src && r.prop == prop)
    }

    pub fn relation(&self, src: ElementId, prop: &str) -> Option<&ObjRefRelation> {
        self.relation_index(src, prop).map(|i| &self.relations[i])
    }

    /// Appends a relation without checking for an existing one on the same property.
    pub fn create_relation(
        &mut self,
        src: ElementId,
        prop: &'static str,
        dest: RefTarget,
    ) -> &ObjRefRelation {
        self.relations.push(ObjRefRelation { src, prop, dest });
        &self.relations[self.relations.len() - 1]
    }

    /// Creates, overwrites or (for an absent or empty `dest`) removes the relation of
    /// `src.prop`. Returns the stored relation, if any remains.
    pub fn modify_relation(
        &mut self,
        src: ElementId,
        prop: &'static str,
        dest: Option<RefTarget>,
    ) -> Option<&ObjRefRelation> {
        let dest = match dest {
            Some(dest) if !dest.is_empty() => dest,
            _ => {
                self.release_relation(src, prop);
                return None;
            }
        };
        match self.relation_index(src, prop) {
            Some(index) => {
                self.relations[index].dest = dest;
                Some(&self.relations[index])
            }
            None => Some(self.create_relation(src, prop, dest)),
        }
    }

    pub fn release_relation(&mut self, src: ElementId, prop: &str) -> Option<ObjRefRelation> {
        let index = self.relation_index(src, prop)?;
        self.remove_relation_at(index)
    }

    pub fn remove_relation_at(&mut self, index: usize) -> Option<ObjRefRelation> {
        (index < self.relations.len()).then(|| self.relations.remove(index))
    }

    /// Drops every relation whose source is `src`.
    pub fn release_relations_from(&mut self, src: ElementId) -> Vec<ObjRefRelation> {
        let (released, kept): (Vec<_>, Vec<_>) =
            self.relations.drain(..).partition(|r| r.src == src);
        self.relations = kept;
        released
    }

    /// Linear scan for relations matching `query`.
    ///
    /// Without `check_dest_children` a relation matches when every queried destination is among
    /// its destinations. With it, a relation matches when any of its destinations is a queried
    /// object or lies inside one; `is_within(obj, container)` answers the containment test.
    pub fn find_relations<F>(
        &self,
        query: &RelationQuery,
        options: FindOptions,
        is_within: F,
    ) -> Vec<&ObjRefRelation>
    where
        F: Fn(ElementId, ElementId) -> bool,
    {
        self.relations
            .iter()
            .filter(|r| query.src.is_none_or(|src| r.src == src))
            .filter(|r| query.prop.as_deref().is_none_or(|prop| r.prop == prop))
            .filter(|r| {
                if query.dest.is_empty() {
                    true
                } else if options.check_dest_children {
                    r.dest.ids().iter().any(|&d| {
                        query
                            .dest
                            .iter()
                            .any(|&q| d == q || is_within(d, q))
                    })
                } else {
                    query.dest.iter().all(|&q| r.dest.contains(q))
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::KeyData;

    fn dummy_id(n: u64) -> ElementId {
        ElementId::from(KeyData::from_ffi(n))
    }

    fn never_within(_: ElementId, _: ElementId) -> bool {
        false
    }

    mod ref_target {
        use super::*;

        #[test]
        fn without_clears_single_and_prunes_multiple() {
            assert_eq!(RefTarget::Single(dummy_id(1)).without(dummy_id(1)), None);
            assert_eq!(
                RefTarget::Single(dummy_id(1)).without(dummy_id(2)),
                Some(RefTarget::Single(dummy_id(1)))
            );
            let many = RefTarget::Multiple(vec![dummy_id(1), dummy_id(2)]);
            assert_eq!(
                many.without(dummy_id(1)),
                Some(RefTarget::Multiple(vec![dummy_id(2)]))
            );
            assert_eq!(RefTarget::Multiple(vec![dummy_id(1)]).without(dummy_id(1)), None);
        }

        #[test]
        fn only_empty_lists_are_empty() {
            assert!(RefTarget::Multiple(vec![]).is_empty());
            assert!(!RefTarget::Single(dummy_id(3)).is_empty());
        }
    }

    mod manager {
        use super::*;

        #[test]
        fn modify_relation_creates_then_overwrites() {
            let mut manager = RelationManager::new();
            manager.modify_relation(dummy_id(1), "focus", Some(RefTarget::Single(dummy_id(2))));
            manager.modify_relation(dummy_id(1), "focus", Some(RefTarget::Single(dummy_id(3))));
            assert_eq!(manager.len(), 1);
            assert_eq!(
                manager.relation(dummy_id(1), "focus").unwrap().dest,
                RefTarget::Single(dummy_id(3))
            );
        }

        #[test]
        fn modify_relation_with_empty_dest_removes_it() {
            let mut manager = RelationManager::new();
            manager.modify_relation(
                dummy_id(1),
                "members",
                Some(RefTarget::Multiple(vec![dummy_id(2)])),
            );
            assert!(
                manager
                    .modify_relation(dummy_id(1), "members", Some(RefTarget::Multiple(vec![])))
                    .is_none()
            );
            assert!(manager.is_empty());
            manager.modify_relation(dummy_id(1), "focus", Some(RefTarget::Single(dummy_id(2))));
            manager.modify_relation(dummy_id(1), "focus", None);
            assert!(manager.is_empty());
        }

        #[test]
        fn release_relations_from_keeps_other_sources() {
            let mut manager = RelationManager::new();
            manager.create_relation(dummy_id(1), "focus", RefTarget::Single(dummy_id(5)));
            manager.create_relation(dummy_id(2), "focus", RefTarget::Single(dummy_id(5)));
            manager.create_relation(dummy_id(1), "members", RefTarget::Multiple(vec![dummy_id(6)]));
            let released = manager.release_relations_from(dummy_id(1));
            assert_eq!(released.len(), 2);
            assert_eq!(manager.len(), 1);
            assert_eq!(manager.relation_index(dummy_id(2), "focus"), Some(0));
        }

        #[test]
        fn remove_relation_at_checks_bounds() {
            let mut manager = RelationManager::new();
            assert!(manager.remove_relation_at(0).is_none());
            manager.create_relation(dummy_id(1), "focus", RefTarget::Single(dummy_id(2)));
            assert!(manager.remove_relation_at(0).is_some());
        }
    }

    mod queries {
        use super::*;

        fn populated() -> RelationManager {
            let mut manager = RelationManager::new();
            manager.create_relation(
                dummy_id(1),
                "members",
                RefTarget::Multiple(vec![dummy_id(10), dummy_id(11)]),
            );
            manager.create_relation(dummy_id(2), "focus", RefTarget::Single(dummy_id(11)));
            manager.create_relation(dummy_id(3), "focus", RefTarget::Single(dummy_id(20)));
            manager
        }

        #[test]
        fn find_by_dest_requires_all_queried_dests() {
            let manager = populated();
            let query = RelationQuery::new().dest(&[dummy_id(11)]);
            let found = manager.find_relations(&query, FindOptions::default(), never_within);
            assert_eq!(found.len(), 2);

            let query = RelationQuery::new().dest(&[dummy_id(10), dummy_id(11)]);
            let found = manager.find_relations(&query, FindOptions::default(), never_within);
            assert_eq!(found.len(), 1);
            assert_eq!(found[0].src, dummy_id(1));
        }

        #[test]
        fn find_filters_on_src_and_prop() {
            let manager = populated();
            let query = RelationQuery::new().prop("focus");
            assert_eq!(
                manager
                    .find_relations(&query, FindOptions::default(), never_within)
                    .len(),
                2
            );
            let query = RelationQuery::new().src(dummy_id(3)).prop("focus");
            let found = manager.find_relations(&query, FindOptions::default(), never_within);
            assert_eq!(found.len(), 1);
            assert_eq!(found[0].dest, RefTarget::Single(dummy_id(20)));
        }

        #[test]
        fn find_with_dest_children_uses_containment() {
            let manager = populated();
            let container = dummy_id(99);
            let query = RelationQuery::new().dest(&[container]);
            let inside = |obj: ElementId, c: ElementId| c == container && obj == dummy_id(20);
            let options = FindOptions {
                check_dest_children: true,
            };
            let found = manager.find_relations(&query, options, inside);
            assert_eq!(found.len(), 1);
            assert_eq!(found[0].src, dummy_id(3));
            assert!(
                manager
                    .find_relations(&query, FindOptions::default(), inside)
                    .is_empty()
            );
        }
    }
}
