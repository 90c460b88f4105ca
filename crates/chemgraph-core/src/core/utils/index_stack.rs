use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const TOKEN_PREFIX: char = '@';

/// Position of a nested element, outermost index first.
///
/// Every entry but the last is the index of the next sub-fragment down the containment chain in
/// its parent's node list. The last entry indexes the holder's node list, connector list or
/// combined child list (nodes first, then connectors), depending on which lookup produced the
/// stack. The stack is computed on demand and never stored on the element itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IndexStack(Vec<usize>);

impl IndexStack {
    pub fn new(indexes: Vec<usize>) -> Self {
        Self(indexes)
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push(&mut self, index: usize) {
        self.0.push(index);
    }

    /// Splits the stack into the leading path and the final index.
    pub fn split_last(&self) -> Option<(usize, &[usize])> {
        self.0.split_last().map(|(last, head)| (*last, head))
    }

    /// Encodes the stack as a reference token, e.g. `@[0,2,1]`.
    pub fn to_token(&self) -> String {
        // Serializing a Vec<usize> cannot fail.
        let body = serde_json::to_string(&self.0).unwrap_or_else(|_| String::from("[]"));
        format!("{TOKEN_PREFIX}{body}")
    }
}

impl From<Vec<usize>> for IndexStack {
    fn from(indexes: Vec<usize>) -> Self {
        Self(indexes)
    }
}

impl fmt::Display for IndexStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_token())
    }
}

#[derive(Debug, Error)]
pub enum ParseTokenError {
    #[error("reference token must start with '{TOKEN_PREFIX}'")]
    MissingPrefix,
    #[error("reference token body is not an index array: {0}")]
    Body(#[from] serde_json::Error),
}

impl FromStr for IndexStack {
    type Err = ParseTokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let body = s
            .trim()
            .strip_prefix(TOKEN_PREFIX)
            .ok_or(ParseTokenError::MissingPrefix)?;
        let indexes: Vec<usize> = serde_json::from_str(body)?;
        Ok(Self(indexes))
    }
}
