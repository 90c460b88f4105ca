use thiserror::Error;

use super::loading::LoadState;
use crate::core::models::element::ElementClass;
use crate::core::models::ids::ElementId;
use crate::core::utils::index_stack::ParseTokenError;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("Element not found in space: {0:?}")]
    ElementNotFound(ElementId),

    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: ElementClass,
        found: ElementClass,
    },

    #[error("Element {child:?} is not a direct child of fragment {parent:?}")]
    NotAChild { parent: ElementId, child: ElementId },

    #[error("Cannot place {child:?} inside {parent:?}: the parent is the element itself or one of its descendants")]
    CyclicContainment { parent: ElementId, child: ElementId },

    #[error("Fragment {0:?} has no connection table")]
    NoConnectionTable(ElementId),

    #[error("No ordering function supplied to {0}")]
    MissingComparator(&'static str),

    #[error("Unsupported operation: {0}")]
    Unsupported(&'static str),

    #[error("Unknown reference property '{prop}'")]
    UnknownReferenceProperty { prop: String },

    #[error("Reference property '{prop}' accepts a single object, got {count}")]
    ReferenceCardinality { prop: String, count: usize },

    #[error("Operation requires load state {expected:?}, current state is {actual:?}")]
    InvalidLoadState {
        expected: LoadState,
        actual: LoadState,
    },

    #[error("Malformed reference token '{token}': {source}")]
    MalformedToken {
        token: String,
        source: ParseTokenError,
    },
}

pub type Result<T> = std::result::Result<T, GraphError>;
