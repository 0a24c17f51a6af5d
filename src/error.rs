use crate::arena::NodeId;
use crate::defs::{BuiltinName, NodeType};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors a player can cause. Each one names the offending node so the
/// renderer can highlight it; the action that raised it is discarded.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum GameError {
    #[error("node {id} still has a hole to fill")]
    MissingNode { id: NodeId },

    #[error("node {id} is a {actual}, expected {}", type_list(.expected))]
    WrongType {
        id: NodeId,
        expected: Vec<NodeType>,
        actual: NodeType,
    },

    #[error("node {id} is not on the board")]
    NotOnBoard { id: NodeId },

    #[error("cannot do that with node {id}: {reason}")]
    InvalidAction { id: NodeId, reason: String },

    #[error("node {id} cannot be passed to a function it contains")]
    CircularCall { id: NodeId },

    #[error("`{name}` is not defined (node {id})")]
    UnknownName { id: NodeId, name: String },

    #[error("function {id} has no parameters left to fill")]
    AlreadyFullyBound { id: NodeId },

    #[error("`{name}` takes {expected} argument(s) but got {actual} (node {id})")]
    WrongBuiltInParamsCount {
        id: NodeId,
        name: BuiltinName,
        expected: usize,
        actual: usize,
    },

    #[error("{fault} (node {id})")]
    BuiltInError { id: NodeId, fault: BuiltInFault },

    #[error("node {id} cannot be placed inside itself")]
    RecursiveNode { id: NodeId },
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum BuiltInFault {
    #[error("index {index} is out of bounds for length {length}")]
    IndexOutOfBounds { index: i64, length: usize },

    #[error("slice start {start} is out of bounds for length {length}")]
    StartOutOfBounds { start: i64, length: usize },

    #[error("slice end {end} is out of bounds for length {length}")]
    EndOutOfBounds { end: i64, length: usize },
}

fn type_list(types: &[NodeType]) -> String {
    let names: Vec<&str> = types.iter().map(|t| t.name()).collect();
    match names.len() {
        0 => "something else".to_string(),
        1 => names[0].to_string(),
        _ => format!("one of {}", names.join(", ")),
    }
}

impl GameError {
    /// The node the renderer should highlight.
    pub fn node(&self) -> NodeId {
        match self {
            GameError::MissingNode { id }
            | GameError::WrongType { id, .. }
            | GameError::NotOnBoard { id }
            | GameError::InvalidAction { id, .. }
            | GameError::CircularCall { id }
            | GameError::UnknownName { id, .. }
            | GameError::AlreadyFullyBound { id }
            | GameError::WrongBuiltInParamsCount { id, .. }
            | GameError::BuiltInError { id, .. }
            | GameError::RecursiveNode { id } => *id,
        }
    }

    pub fn wrong_type(id: NodeId, expected: &[NodeType], actual: NodeType) -> Self {
        GameError::WrongType { id, expected: expected.to_vec(), actual }
    }

    pub fn invalid(id: NodeId, reason: impl Into<String>) -> Self {
        GameError::InvalidAction { id, reason: reason.into() }
    }
}

/// Failure of a reduction: either the player's fault, or a broken
/// structural invariant (a bug, never shown as a puzzle hint).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReduceError {
    #[error(transparent)]
    Game(#[from] GameError),

    #[error("invariant violated: {0}")]
    Invariant(String),
}

impl ReduceError {
    pub fn invariant(msg: impl Into<String>) -> Self {
        ReduceError::Invariant(msg.into())
    }
}

pub type Result<T, E = ReduceError> = std::result::Result<T, E>;
