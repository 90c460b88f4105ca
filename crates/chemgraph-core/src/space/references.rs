use super::Space;
use super::error::{GraphError, Result};
use super::events::ChangeKind;
use crate::core::models::element::ElementClass;
use crate::core::models::group::{FOCUS_PROP, MEMBERS_PROP};
use crate::core::models::ids::ElementId;
use crate::core::models::references::{HasReferenceProperties, RefPropDescriptor};
use crate::core::relations::{
    FindOptions, ObjRefRelation, RefTarget, RelationManager, RelationQuery,
};
use tracing::{debug, trace};

impl Space {
    pub fn relations(&self) -> &RelationManager {
        &self.relations
    }

    /// Current value of a reference-typed property.
    pub fn reference(&self, element: ElementId, prop: &str) -> Option<&RefTarget> {
        self.elements.get(element)?.reference(prop)
    }

    /// Points `element.prop` at `targets`. An empty slice clears the property.
    ///
    /// Single-valued properties accept at most one target, and every target must belong to a
    /// class both the property and, for groups, the group itself accept. Registered elements have
    /// the value mirrored into the relation manager.
    pub fn set_reference(
        &mut self,
        element: ElementId,
        prop: &str,
        targets: &[ElementId],
    ) -> Result<()> {
        let descriptor = self.reference_descriptor(element, prop)?;
        if !descriptor.multiple && targets.len() > 1 {
            return Err(GraphError::ReferenceCardinality {
                prop: prop.to_string(),
                count: targets.len(),
            });
        }
        let allowed = self.accepted_reference_classes(element, descriptor)?;
        for &target in targets {
            let class = self.get(target)?.class();
            if class.is_empty() || !allowed.contains(class) {
                return Err(GraphError::TypeMismatch {
                    expected: allowed,
                    found: class,
                });
            }
        }

        let value = match targets {
            [] => None,
            [single] if !descriptor.multiple => Some(RefTarget::Single(*single)),
            _ => {
                let mut ids: Vec<ElementId> = Vec::with_capacity(targets.len());
                for &target in targets {
                    if !ids.contains(&target) {
                        ids.push(target);
                    }
                }
                Some(RefTarget::Multiple(ids))
            }
        };
        self.store_reference(element, descriptor.name, value)
    }

    fn reference_descriptor(
        &self,
        element: ElementId,
        prop: &str,
    ) -> Result<&'static RefPropDescriptor> {
        self.get(element)?
            .reference_property(prop)
            .ok_or_else(|| GraphError::UnknownReferenceProperty {
                prop: prop.to_string(),
            })
    }

    fn accepted_reference_classes(
        &self,
        element: ElementId,
        descriptor: &RefPropDescriptor,
    ) -> Result<ElementClass> {
        let accepted = match self.get(element)?.as_group() {
            Some(group) => descriptor.accepted & group.accepted(),
            None => descriptor.accepted,
        };
        Ok(accepted)
    }

    fn store_reference(
        &mut self,
        element: ElementId,
        prop: &'static str,
        value: Option<RefTarget>,
    ) -> Result<()> {
        let target = self.get_mut(element)?;
        match &value {
            Some(v) => {
                target.references.insert(prop, v.clone());
            }
            None => {
                target.references.shift_remove(prop);
            }
        }
        let owned = target.owned;
        if owned && self.config.enable_obj_ref_relations {
            self.relations.modify_relation(element, prop, value);
        }
        trace!(element = ?element, prop = prop, "Stored reference property.");
        self.notify(element, ChangeKind::References);
        Ok(())
    }

    /// Mirrors the references an element already holds into the relation manager. Called when
    /// the element joins the registry.
    pub(crate) fn register_references(&mut self, element: ElementId) {
        if !self.config.enable_obj_ref_relations {
            return;
        }
        let Some(target) = self.elements.get(element) else {
            return;
        };
        let entries: Vec<(&'static str, RefTarget)> = target
            .references
            .iter()
            .map(|(&prop, value)| (prop, value.clone()))
            .collect();
        for (prop, value) in entries {
            self.relations.modify_relation(element, prop, Some(value));
        }
    }

    /// Prunes `removed` from auto-updated references that point at it.
    pub(crate) fn repair_references_to(&mut self, removed: ElementId) {
        if !self.config.enable_obj_ref_relations || !self.config.auto_update_obj_ref_relations {
            return;
        }
        let query = RelationQuery::new().dest(&[removed]);
        let affected: Vec<(ElementId, &'static str)> = self
            .relations
            .find_relations(&query, FindOptions::default(), |_, _| false)
            .into_iter()
            .map(|r| (r.src, r.prop))
            .collect();
        for (src, prop) in affected {
            let Some(source) = self.elements.get(src) else {
                continue;
            };
            let auto_update = source
                .reference_property(prop)
                .is_some_and(|d| d.auto_update);
            if !auto_update {
                continue;
            }
            let remaining = source.reference(prop).and_then(|v| v.without(removed));
            debug!(src = ?src, prop = prop, removed = ?removed, "Repairing reference to removed object.");
            // The source was looked up above, so storing cannot fail.
            let _ = self.store_reference(src, prop, remaining);
        }
    }

    /// Relations matching `query`; containment for `check_dest_children` follows the parent axis.
    pub fn find_obj_ref_relations(
        &self,
        query: &RelationQuery,
        options: FindOptions,
    ) -> Vec<&ObjRefRelation> {
        self.relations
            .find_relations(query, options, |obj, container| self.is_within(obj, container))
    }

    pub fn group_members(&self, group: ElementId) -> Result<Vec<ElementId>> {
        self.group(group)?;
        Ok(self
            .reference(group, MEMBERS_PROP)
            .map(|v| v.ids().to_vec())
            .unwrap_or_default())
    }

    /// Adds `member` to the group. Returns `false` if it is already a member.
    pub fn add_group_member(&mut self, group: ElementId, member: ElementId) -> Result<bool> {
        let mut members = self.group_members(group)?;
        if members.contains(&member) {
            return Ok(false);
        }
        members.push(member);
        self.set_reference(group, MEMBERS_PROP, &members)?;
        Ok(true)
    }

    pub fn remove_group_member(&mut self, group: ElementId, member: ElementId) -> Result<bool> {
        let mut members = self.group_members(group)?;
        let Some(index) = members.iter().position(|&m| m == member) else {
            return Ok(false);
        };
        members.remove(index);
        self.set_reference(group, MEMBERS_PROP, &members)?;
        Ok(true)
    }

    pub fn group_focus(&self, group: ElementId) -> Result<Option<ElementId>> {
        self.group(group)?;
        Ok(self
            .reference(group, FOCUS_PROP)
            .and_then(|v| v.ids().first().copied()))
    }

    pub fn set_group_focus(&mut self, group: ElementId, focus: Option<ElementId>) -> Result<()> {
        self.group(group)?;
        self.set_reference(group, FOCUS_PROP, focus.as_slice())
    }
}
