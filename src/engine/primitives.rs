//! Built-in sequence operations. Every built-in reads its arguments from
//! the state, builds a fresh detached result node and returns its id; the
//! caller splices it where the call was.

use crate::arena::{NodeId, Slot};
use crate::defs::{BuiltinName, NodeType, Term};
use crate::error::{BuiltInFault, GameError, Result};
use crate::state::GameState;
use smallvec::SmallVec;

pub fn call(state: &mut GameState, id: NodeId, name: BuiltinName, args: &[NodeId]) -> Result<NodeId> {
    if args.len() != name.arity() {
        return Err(GameError::WrongBuiltInParamsCount {
            id,
            name,
            expected: name.arity(),
            actual: args.len(),
        }
        .into());
    }
    tracing::trace!(id = %id, builtin = %name, args = args.len(), "builtin");
    match name {
        BuiltinName::Length => length(state, id, args[0]),
        BuiltinName::Get => get(state, id, args[0], args[1]),
        BuiltinName::Set => set(state, id, args[0], args[1], args[2]),
        BuiltinName::With => with(state, id, args[0], args[1], args[2]),
        BuiltinName::Slice => slice(state, id, args[0], args[1], args[2]),
        BuiltinName::Concat => concat(state, id, args[0], args[1]),
        BuiltinName::Map => map(state, id, args[0], args[1]),
    }
}

fn deref(state: &GameState, id: NodeId) -> NodeId {
    match state.get(id).term {
        Term::Reference(target) => target,
        _ => id,
    }
}

/// Items of an array argument, looking through a reference.
fn array_items(state: &GameState, arg: NodeId) -> Result<SmallVec<[NodeId; 4]>> {
    match &state.get(deref(state, arg)).term {
        Term::Array(items) => Ok(items.clone()),
        other => Err(GameError::wrong_type(arg, &[NodeType::Array], other.ty()).into()),
    }
}

fn number(state: &GameState, arg: NodeId) -> Result<i64> {
    match state.get(arg).term {
        Term::Number(n) => Ok(n),
        ref other => Err(GameError::wrong_type(arg, &[NodeType::Number], other.ty()).into()),
    }
}

fn element_index(id: NodeId, index: i64, length: usize) -> Result<usize> {
    match usize::try_from(index) {
        Ok(i) if i < length => Ok(i),
        _ => Err(GameError::BuiltInError {
            id,
            fault: BuiltInFault::IndexOutOfBounds { index, length },
        }
        .into()),
    }
}

fn clone_all(state: &mut GameState, id: NodeId, items: &[NodeId]) -> SmallVec<[NodeId; 4]> {
    items.iter().map(|item| state.clone_subtree(*item, Some(id))).collect()
}

fn length(state: &mut GameState, id: NodeId, arg: NodeId) -> Result<NodeId> {
    let n = match &state.get(deref(state, arg)).term {
        Term::Array(items) => items.len(),
        Term::Str(s) => s.chars().count(),
        other => {
            return Err(
                GameError::wrong_type(arg, &[NodeType::Array, NodeType::String], other.ty()).into(),
            )
        }
    };
    let n = i64::try_from(n).unwrap_or(i64::MAX);
    Ok(state.alloc(Term::Number(n), Some(id)))
}

fn get(state: &mut GameState, id: NodeId, array: NodeId, index: NodeId) -> Result<NodeId> {
    let items = array_items(state, array)?;
    let i = element_index(id, number(state, index)?, items.len())?;
    Ok(state.clone_subtree(items[i], Some(id)))
}

/// Mutates the referenced array in place and hands back a new reference.
fn set(state: &mut GameState, id: NodeId, array: NodeId, index: NodeId, value: NodeId) -> Result<NodeId> {
    let target = match state.get(array).term {
        Term::Reference(target) => target,
        ref other => {
            return Err(GameError::wrong_type(array, &[NodeType::Reference], other.ty()).into())
        }
    };
    let items = array_items(state, array)?;
    let i = element_index(id, number(state, index)?, items.len())?;
    let fresh = state.clone_subtree(value, Some(id));
    let old = items[i];
    state.nodes.set_child(target, Slot::Index(i), fresh);
    state.retire(old);
    Ok(state.alloc(Term::Reference(target), Some(id)))
}

fn with(state: &mut GameState, id: NodeId, array: NodeId, index: NodeId, value: NodeId) -> Result<NodeId> {
    let items = array_items(state, array)?;
    let i = element_index(id, number(state, index)?, items.len())?;
    let mut out = SmallVec::with_capacity(items.len());
    for (j, item) in items.iter().enumerate() {
        let src = if j == i { value } else { *item };
        out.push(state.clone_subtree(src, Some(id)));
    }
    Ok(state.alloc(Term::Array(out), Some(id)))
}

fn slice(state: &mut GameState, id: NodeId, array: NodeId, start: NodeId, end: NodeId) -> Result<NodeId> {
    let items = array_items(state, array)?;
    let length = items.len();
    let (start, end) = (number(state, start)?, number(state, end)?);
    let lo = match usize::try_from(start) {
        Ok(lo) if lo < length => lo,
        _ => {
            return Err(GameError::BuiltInError {
                id,
                fault: BuiltInFault::StartOutOfBounds { start, length },
            }
            .into())
        }
    };
    let hi = match usize::try_from(end) {
        Ok(hi) if hi <= length => hi,
        _ => {
            return Err(GameError::BuiltInError {
                id,
                fault: BuiltInFault::EndOutOfBounds { end, length },
            }
            .into())
        }
    };
    let picked = if hi > lo { &items[lo..hi] } else { &[][..] };
    let out = clone_all(state, id, picked);
    Ok(state.alloc(Term::Array(out), Some(id)))
}

fn concat(state: &mut GameState, id: NodeId, first: NodeId, second: NodeId) -> Result<NodeId> {
    let mut items = array_items(state, first)?;
    items.extend(array_items(state, second)?);
    let out = clone_all(state, id, &items);
    Ok(state.alloc(Term::Array(out), Some(id)))
}

/// Builds `[f(a0), f(a1), ...]` without reducing any of the applications.
fn map(state: &mut GameState, id: NodeId, array: NodeId, function: NodeId) -> Result<NodeId> {
    let items = array_items(state, array)?;
    match state.get(function).ty() {
        NodeType::Lambda | NodeType::Builtin => {}
        other => {
            return Err(
                GameError::wrong_type(function, &[NodeType::Lambda, NodeType::Builtin], other).into(),
            )
        }
    }
    let mut out = SmallVec::with_capacity(items.len());
    for item in items {
        let callee = state.clone_subtree(function, Some(id));
        let argument = state.clone_subtree(item, Some(id));
        out.push(state.alloc(Term::Apply { callee, argument }, Some(id)));
    }
    Ok(state.alloc(Term::Array(out), Some(id)))
}
