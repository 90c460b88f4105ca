use super::element::ElementClass;
use super::references::{HasReferenceProperties, RefPropDescriptor, RefScope};

pub const MEMBERS_PROP: &str = "members";
pub const FOCUS_PROP: &str = "focus";

static GROUP_REFERENCE_PROPERTIES: [RefPropDescriptor; 2] = [
    RefPropDescriptor {
        name: MEMBERS_PROP,
        multiple: true,
        auto_update: true,
        scope: RefScope::Owner,
        accepted: ElementClass::STRUCTURAL,
    },
    RefPropDescriptor {
        name: FOCUS_PROP,
        multiple: false,
        auto_update: true,
        scope: RefScope::Owner,
        accepted: ElementClass::STRUCTURAL,
    },
];

/// A registry-level selection of structural elements, e.g. a highlighted ring or a reaction center.
///
/// Groups never take part in the containment tree. Their `members` and `focus` properties are
/// references that the space keeps consistent with the registry.
#[derive(Debug, Clone, PartialEq)]
pub struct StructureGroup {
    pub name: Option<String>,
    pub(crate) accepted: ElementClass,
}

impl StructureGroup {
    pub fn new(name: Option<&str>, accepted: ElementClass) -> Self {
        Self {
            name: name.map(str::to_string),
            accepted: accepted & ElementClass::STRUCTURAL,
        }
    }

    /// Element classes allowed as members.
    pub fn accepted(&self) -> ElementClass {
        self.accepted
    }

    pub fn accepts(&self, class: ElementClass) -> bool {
        !class.is_empty() && self.accepted.contains(class)
    }
}

impl HasReferenceProperties for StructureGroup {
    fn reference_properties(&self) -> &'static [RefPropDescriptor] {
        &GROUP_REFERENCE_PROPERTIES
    }
}
