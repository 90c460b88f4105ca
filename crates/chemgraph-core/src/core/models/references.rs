use super::element::{Element, ElementClass, ElementKind};

/// Frame an index-stack reference token is resolved against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefScope {
    /// Relative to the referencing element's parent fragment.
    Parent,
    /// Relative to the root fragment of the owning space.
    Owner,
}

/// Static description of a reference-typed property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefPropDescriptor {
    pub name: &'static str,
    /// List-valued when true, single-valued otherwise.
    pub multiple: bool,
    /// Repaired automatically when a referenced object leaves the space.
    pub auto_update: bool,
    pub scope: RefScope,
    /// Element classes the property may point at.
    pub accepted: ElementClass,
}

/// Elements declaring reference-typed properties.
pub trait HasReferenceProperties {
    fn reference_properties(&self) -> &'static [RefPropDescriptor];

    fn reference_property(&self, name: &str) -> Option<&'static RefPropDescriptor> {
        self.reference_properties().iter().find(|d| d.name == name)
    }
}

impl HasReferenceProperties for Element {
    fn reference_properties(&self) -> &'static [RefPropDescriptor] {
        match &self.kind {
            ElementKind::Group(group) => group.reference_properties(),
            ElementKind::Node(_) | ElementKind::Connector(_) => &[],
        }
    }
}
