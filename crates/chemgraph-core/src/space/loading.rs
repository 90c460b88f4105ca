use super::Space;
use super::error::{GraphError, Result};
use crate::core::models::ids::ElementId;
use crate::core::models::references::{HasReferenceProperties, RefScope};
use crate::core::utils::index_stack::IndexStack;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

/// Phase of an externally driven load.
///
/// `Ready -> Loading` on [`Space::begin_load`], `Loading -> Resolving -> Ready` inside
/// [`Space::finish_load`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoadState {
    #[default]
    Ready,
    Loading,
    Resolving,
}

/// Serialized form of a reference property: index-stack tokens such as `@[0,2]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SavedReference {
    Single(String),
    Multiple(Vec<String>),
}

impl SavedReference {
    fn tokens(&self) -> Vec<&str> {
        match self {
            Self::Single(token) => vec![token.as_str()],
            Self::Multiple(tokens) => tokens.iter().map(String::as_str).collect(),
        }
    }
}

/// Outcome of the deferred resolution pass, counted per stashed entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub resolved: usize,
    pub unresolved: usize,
}

#[derive(Debug)]
struct PendingReference {
    element: ElementId,
    prop: &'static str,
    scope: RefScope,
    stacks: Vec<IndexStack>,
}

/// Values stashed during loading, resolved once the containment tree is complete.
#[derive(Debug, Default)]
pub(crate) struct LoadBuffer {
    state: LoadState,
    references: Vec<PendingReference>,
    connector_ends: Vec<(ElementId, Vec<IndexStack>)>,
    anchors: Vec<(ElementId, Vec<usize>)>,
}

impl LoadBuffer {
    /// Drops entries stashed for an element that no longer exists.
    pub(crate) fn forget(&mut self, element: ElementId) {
        self.references.retain(|r| r.element != element);
        self.connector_ends.retain(|(c, _)| *c != element);
        self.anchors.retain(|(f, _)| *f != element);
    }

    fn is_empty(&self) -> bool {
        self.references.is_empty() && self.connector_ends.is_empty() && self.anchors.is_empty()
    }
}

impl Space {
    pub fn load_state(&self) -> LoadState {
        self.load_buffer.state
    }

    fn expect_load_state(&self, expected: LoadState) -> Result<()> {
        let actual = self.load_buffer.state;
        if actual != expected {
            return Err(GraphError::InvalidLoadState { expected, actual });
        }
        Ok(())
    }

    /// Starts stashing deferred values.
    pub fn begin_load(&mut self) -> Result<()> {
        self.expect_load_state(LoadState::Ready)?;
        self.load_buffer.state = LoadState::Loading;
        debug!("Began loading.");
        Ok(())
    }

    /// The frame reference tokens of `element` are relative to.
    fn reference_frame(&self, element: ElementId, scope: RefScope) -> Option<ElementId> {
        match scope {
            RefScope::Parent => self.parent_of(element),
            RefScope::Owner => Some(self.root()),
        }
    }

    /// Encodes `element.prop` as index-stack tokens. Targets that cannot be addressed from the
    /// property's frame are skipped; `None` when nothing is left to save.
    pub fn save_reference(&self, element: ElementId, prop: &str) -> Result<Option<SavedReference>> {
        let source = self.get(element)?;
        let descriptor = source
            .reference_property(prop)
            .ok_or_else(|| GraphError::UnknownReferenceProperty {
                prop: prop.to_string(),
            })?;
        let Some(value) = source.reference(prop) else {
            return Ok(None);
        };
        let frame = self.reference_frame(element, descriptor.scope);
        let mut tokens = Vec::with_capacity(value.ids().len());
        for &target in value.ids() {
            match frame.and_then(|f| self.index_stack_of_child(f, target)) {
                Some(stack) => tokens.push(stack.to_token()),
                None => {
                    warn!(element = ?element, prop = prop, target = ?target, "Reference target cannot be addressed; skipping.");
                }
            }
        }
        if tokens.is_empty() {
            return Ok(None);
        }
        Ok(Some(if descriptor.multiple {
            SavedReference::Multiple(tokens)
        } else {
            SavedReference::Single(tokens.swap_remove(0))
        }))
    }

    /// Parses and stashes a saved reference for the resolution pass.
    pub fn load_reference(
        &mut self,
        element: ElementId,
        prop: &str,
        saved: &SavedReference,
    ) -> Result<()> {
        self.expect_load_state(LoadState::Loading)?;
        let descriptor = self
            .get(element)?
            .reference_property(prop)
            .ok_or_else(|| GraphError::UnknownReferenceProperty {
                prop: prop.to_string(),
            })?;
        let tokens = saved.tokens();
        if !descriptor.multiple && tokens.len() > 1 {
            return Err(GraphError::ReferenceCardinality {
                prop: prop.to_string(),
                count: tokens.len(),
            });
        }
        let stacks = tokens
            .into_iter()
            .map(|token| {
                token.parse::<IndexStack>().map_err(|source| GraphError::MalformedToken {
                    token: token.to_string(),
                    source,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        self.load_buffer.references.push(PendingReference {
            element,
            prop: descriptor.name,
            scope: descriptor.scope,
            stacks,
        });
        Ok(())
    }

    /// Endpoints of `connector` as child index stacks relative to the fragment holding it.
    pub fn save_connected_objs(&self, connector: ElementId) -> Result<Vec<IndexStack>> {
        let endpoints = self.connector(connector)?.connected_objs();
        let Some(frame) = self.parent_of(connector) else {
            return Ok(Vec::new());
        };
        Ok(endpoints
            .iter()
            .filter_map(|&node| self.index_stack_of_child(frame, node))
            .collect())
    }

    pub fn load_connected_objs(
        &mut self,
        connector: ElementId,
        stacks: Vec<IndexStack>,
    ) -> Result<()> {
        self.expect_load_state(LoadState::Loading)?;
        self.connector(connector)?;
        self.load_buffer.connector_ends.push((connector, stacks));
        Ok(())
    }

    /// Anchor nodes of `fragment` as indexes into its node list.
    pub fn save_anchor_nodes(&self, fragment: ElementId) -> Result<Vec<usize>> {
        let Some(table) = self.fragment(fragment)?.ctab() else {
            return Ok(Vec::new());
        };
        Ok(table
            .anchor_nodes()
            .iter()
            .filter_map(|&node| table.index_of_node(node))
            .collect())
    }

    pub fn load_anchor_nodes(&mut self, fragment: ElementId, indexes: Vec<usize>) -> Result<()> {
        self.expect_load_state(LoadState::Loading)?;
        self.fragment(fragment)?;
        self.load_buffer.anchors.push((fragment, indexes));
        Ok(())
    }

    /// Resolves everything stashed since [`begin_load`](Self::begin_load) and returns to
    /// [`LoadState::Ready`].
    ///
    /// Connector endpoints are resolved first, then anchors, then reference properties. An
    /// entry that cannot be resolved is logged and left unset.
    #[instrument(skip_all, name = "finish_load")]
    pub fn finish_load(&mut self) -> Result<LoadReport> {
        self.expect_load_state(LoadState::Loading)?;
        let buffer = std::mem::take(&mut self.load_buffer);
        self.load_buffer.state = LoadState::Resolving;
        let mut report = LoadReport::default();
        if !buffer.is_empty() {
            let mut space = self.begin_update();
            for (connector, stacks) in buffer.connector_ends {
                space.resolve_connector_ends(connector, &stacks, &mut report);
            }
            for (fragment, indexes) in buffer.anchors {
                space.resolve_anchors(fragment, &indexes, &mut report);
            }
            for pending in buffer.references {
                space.resolve_reference(&pending, &mut report);
            }
        }
        self.load_buffer.state = LoadState::Ready;
        debug!(resolved = report.resolved, unresolved = report.unresolved, "Finished loading.");
        Ok(report)
    }

    fn resolve_connector_ends(
        &mut self,
        connector: ElementId,
        stacks: &[IndexStack],
        report: &mut LoadReport,
    ) {
        let frame = self.parent_of(connector);
        for stack in stacks {
            let node = frame.and_then(|f| self.child_at_index_stack(f, stack));
            let linked = match node {
                Some(node) => self.append_connected_obj(connector, node).is_ok(),
                None => false,
            };
            if linked {
                report.resolved += 1;
            } else {
                warn!(connector = ?connector, token = %stack, "Unresolved connector endpoint.");
                report.unresolved += 1;
            }
        }
    }

    fn resolve_anchors(&mut self, fragment: ElementId, indexes: &[usize], report: &mut LoadReport) {
        for &index in indexes {
            let node = self
                .fragment(fragment)
                .ok()
                .and_then(|f| f.ctab())
                .and_then(|t| t.node_at(index));
            let anchored = match node {
                Some(node) => self.append_anchor_node(fragment, node).is_ok(),
                None => false,
            };
            if anchored {
                report.resolved += 1;
            } else {
                warn!(fragment = ?fragment, index = index, "Unresolved anchor node.");
                report.unresolved += 1;
            }
        }
    }

    fn resolve_reference(&mut self, pending: &PendingReference, report: &mut LoadReport) {
        let frame = self.reference_frame(pending.element, pending.scope);
        let targets: Option<Vec<ElementId>> = pending
            .stacks
            .iter()
            .map(|stack| frame.and_then(|f| self.child_at_index_stack(f, stack)))
            .collect();
        let stored = match targets {
            Some(targets) => self.set_reference(pending.element, pending.prop, &targets),
            None => {
                warn!(element = ?pending.element, prop = pending.prop, "Unresolved reference tokens; leaving property unset.");
                report.unresolved += 1;
                return;
            }
        };
        match stored {
            Ok(()) => report.resolved += 1,
            Err(error) => {
                warn!(element = ?pending.element, prop = pending.prop, %error, "Resolved reference rejected; leaving property unset.");
                report.unresolved += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::connector::Bond;
    use crate::core::models::element::ElementClass;
    use crate::core::models::fragment::{Fragment, FragmentKind};
    use crate::core::models::group::{FOCUS_PROP, MEMBERS_PROP, StructureGroup};
    use crate::core::models::node::Atom;

    struct Skeleton {
        frag: ElementId,
        sub: ElementId,
        atoms: [ElementId; 3],
        inner: ElementId,
        bonds: [ElementId; 2],
    }

    /// `root > molecule[a0, a1, sub[inner], a2]` with bonds `a0-a1` and `a1-inner` in the
    /// molecule. Links are only created when `linked` is set, as a loader would do later.
    fn create_skeleton(space: &mut Space, linked: bool) -> Skeleton {
        let root = space.root();
        let frag = space.create_fragment(Fragment::new(FragmentKind::Molecule { name: None }));
        space.append_node(root, frag).unwrap();
        let a0 = space.create_atom(Atom::new("C"));
        let a1 = space.create_atom(Atom::new("C"));
        let sub = space.create_fragment(Fragment::new(FragmentKind::SubGroup {
            abbr: Some("OH".into()),
            name: None,
        }));
        let inner = space.create_atom(Atom::new("O"));
        let a2 = space.create_atom(Atom::new("N"));
        for node in [a0, a1, sub, a2] {
            space.append_node(frag, node).unwrap();
        }
        space.append_node(sub, inner).unwrap();
        let bonds = if linked {
            [
                space.create_bond(&[a0, a1], Bond::default()).unwrap(),
                space.create_bond(&[a1, inner], Bond::default()).unwrap(),
            ]
        } else {
            [
                space.create_connector(Bond::default()),
                space.create_connector(Bond::default()),
            ]
        };
        for bond in bonds {
            space.append_connector(frag, bond).unwrap();
        }
        if linked {
            space.append_anchor_node(sub, inner).unwrap();
        }
        Skeleton {
            frag,
            sub,
            atoms: [a0, a1, a2],
            inner,
            bonds,
        }
    }

    fn registered_group(space: &mut Space) -> ElementId {
        let group = space.create_group(StructureGroup::new(None, ElementClass::NODE));
        space.set_owned(group, true).unwrap();
        group
    }

    mod state {
        use super::*;

        #[test]
        fn load_cycles_through_states() {
            let mut space = Space::new();
            assert_eq!(space.load_state(), LoadState::Ready);
            space.begin_load().unwrap();
            assert_eq!(space.load_state(), LoadState::Loading);
            assert_eq!(space.finish_load().unwrap(), LoadReport::default());
            assert_eq!(space.load_state(), LoadState::Ready);
        }

        #[test]
        fn stashing_outside_a_load_is_rejected() {
            let mut space = Space::new();
            let group = registered_group(&mut space);
            let saved = SavedReference::Single("@[0]".into());
            assert!(matches!(
                space.load_reference(group, FOCUS_PROP, &saved),
                Err(GraphError::InvalidLoadState {
                    expected: LoadState::Loading,
                    actual: LoadState::Ready
                })
            ));
            assert!(matches!(
                space.finish_load(),
                Err(GraphError::InvalidLoadState { .. })
            ));
        }

        #[test]
        fn nested_begin_is_rejected() {
            let mut space = Space::new();
            space.begin_load().unwrap();
            assert!(matches!(
                space.begin_load(),
                Err(GraphError::InvalidLoadState {
                    expected: LoadState::Ready,
                    actual: LoadState::Loading
                })
            ));
        }

        #[test]
        fn malformed_tokens_fail_when_stashed() {
            let mut space = Space::new();
            let group = registered_group(&mut space);
            space.begin_load().unwrap();
            let saved = SavedReference::Multiple(vec!["@[0]".into(), "[1]".into()]);
            assert!(matches!(
                space.load_reference(group, MEMBERS_PROP, &saved),
                Err(GraphError::MalformedToken { .. })
            ));
            let saved = SavedReference::Multiple(vec!["@[0]".into(), "@[1]".into()]);
            assert!(matches!(
                space.load_reference(group, FOCUS_PROP, &saved),
                Err(GraphError::ReferenceCardinality { count: 2, .. })
            ));
        }
    }

    mod saving {
        use super::*;

        #[test]
        fn references_are_saved_relative_to_the_root() {
            let mut space = Space::new();
            let sk = create_skeleton(&mut space, true);
            let group = registered_group(&mut space);
            space.add_group_member(group, sk.atoms[1]).unwrap();
            space.add_group_member(group, sk.inner).unwrap();
            space.set_group_focus(group, Some(sk.sub)).unwrap();

            assert_eq!(
                space.save_reference(group, MEMBERS_PROP).unwrap(),
                Some(SavedReference::Multiple(vec!["@[0,1]".into(), "@[0,2,0]".into()]))
            );
            assert_eq!(
                space.save_reference(group, FOCUS_PROP).unwrap(),
                Some(SavedReference::Single("@[0,2]".into()))
            );
        }

        #[test]
        fn unaddressable_targets_are_skipped() {
            let mut space = Space::new();
            let group = registered_group(&mut space);
            let loose = space.create_atom(Atom::new("C"));
            space.set_group_focus(group, Some(loose)).unwrap();
            assert_eq!(space.save_reference(group, FOCUS_PROP).unwrap(), None);
            assert_eq!(space.save_reference(group, MEMBERS_PROP).unwrap(), None);
        }

        #[test]
        fn connection_table_hooks_use_local_addresses() {
            let mut space = Space::new();
            let sk = create_skeleton(&mut space, true);
            let ends: Vec<String> = space
                .save_connected_objs(sk.bonds[1])
                .unwrap()
                .iter()
                .map(IndexStack::to_token)
                .collect();
            assert_eq!(ends, vec!["@[1]", "@[2,0]"]);
            assert_eq!(space.save_anchor_nodes(sk.sub).unwrap(), vec![0]);
        }

        #[test]
        fn saved_references_serialize_untagged() {
            let single = serde_json::to_string(&SavedReference::Single("@[1]".into())).unwrap();
            assert_eq!(single, "\"@[1]\"");
            let parsed: SavedReference = serde_json::from_str("[\"@[0]\",\"@[2,1]\"]").unwrap();
            assert_eq!(
                parsed,
                SavedReference::Multiple(vec!["@[0]".into(), "@[2,1]".into()])
            );
        }
    }

    mod resolution {
        use super::*;

        #[test]
        fn saved_document_is_restored_by_deferred_pass() {
            let mut source = Space::new();
            let original = create_skeleton(&mut source, true);
            let group = registered_group(&mut source);
            source.add_group_member(group, original.atoms[2]).unwrap();
            source.add_group_member(group, original.inner).unwrap();
            let members = source.save_reference(group, MEMBERS_PROP).unwrap().unwrap();
            let ends: Vec<Vec<IndexStack>> = original
                .bonds
                .iter()
                .map(|&b| source.save_connected_objs(b).unwrap())
                .collect();
            let anchors = source.save_anchor_nodes(original.sub).unwrap();

            let mut target = Space::new();
            target.begin_load().unwrap();
            let copy = create_skeleton(&mut target, false);
            let copy_group = registered_group(&mut target);
            target.load_reference(copy_group, MEMBERS_PROP, &members).unwrap();
            for (&bond, stacks) in copy.bonds.iter().zip(ends) {
                target.load_connected_objs(bond, stacks).unwrap();
            }
            target.load_anchor_nodes(copy.sub, anchors).unwrap();
            assert!(target.group_members(copy_group).unwrap().is_empty());

            let report = target.finish_load().unwrap();
            assert_eq!(report, LoadReport { resolved: 6, unresolved: 0 });
            assert_eq!(
                target.group_members(copy_group).unwrap(),
                vec![copy.atoms[2], copy.inner]
            );
            assert_eq!(
                target.connector(copy.bonds[0]).unwrap().connected_objs(),
                &[copy.atoms[0], copy.atoms[1]]
            );
            assert_eq!(
                target.connector(copy.bonds[1]).unwrap().connected_objs(),
                &[copy.atoms[1], copy.inner]
            );
            assert_eq!(target.anchor_nodes(copy.sub).unwrap(), &[copy.inner]);
            assert!(target.relations().relation(copy_group, MEMBERS_PROP).is_some());
        }

        #[test]
        fn unresolvable_reference_is_left_unset() {
            let mut space = Space::new();
            let sk = create_skeleton(&mut space, true);
            let group = registered_group(&mut space);
            space.begin_load().unwrap();
            let saved = SavedReference::Multiple(vec!["@[0,0]".into(), "@[7,3]".into()]);
            space.load_reference(group, MEMBERS_PROP, &saved).unwrap();
            let report = space.finish_load().unwrap();
            assert_eq!(report, LoadReport { resolved: 0, unresolved: 1 });
            assert!(space.group_members(group).unwrap().is_empty());
            assert!(space.contains(sk.atoms[0]));
            assert_eq!(space.load_state(), LoadState::Ready);
        }

        #[test]
        fn rejected_targets_are_left_unset() {
            let mut space = Space::new();
            let sk = create_skeleton(&mut space, true);
            let group = registered_group(&mut space);
            space.begin_load().unwrap();
            // Child index 4 of the molecule is its first bond, which the group does not accept.
            space
                .load_reference(group, FOCUS_PROP, &SavedReference::Single("@[0,4]".into()))
                .unwrap();
            let report = space.finish_load().unwrap();
            assert_eq!(report.unresolved, 1);
            assert_eq!(space.group_focus(group).unwrap(), None);
            assert_eq!(space.child_at(sk.frag, 4).unwrap(), Some(sk.bonds[0]));
        }

        #[test]
        fn finalized_elements_drop_their_stashed_entries() {
            let mut space = Space::new();
            let group = registered_group(&mut space);
            space.begin_load().unwrap();
            space
                .load_reference(group, FOCUS_PROP, &SavedReference::Single("@[0]".into()))
                .unwrap();
            space.finalize(group).unwrap();
            assert_eq!(space.finish_load().unwrap(), LoadReport::default());
        }
    }
}
