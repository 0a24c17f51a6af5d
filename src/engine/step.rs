use super::reduce::reduce_node;
use crate::arena::{NodeId, Slot};
use crate::config::EngineConfig;
use crate::defs::{NodeType, Term};
use crate::error::{GameError, ReduceError, Result};
use crate::kind::{kind, Kind};
use crate::state::GameState;
use smallvec::SmallVec;

/// Child slots a node reduces before itself, in order.
pub fn reduction_order(term: &Term) -> SmallVec<[Slot; 4]> {
    let mut order = SmallVec::new();
    match term {
        Term::Binop { .. } => order.extend([Slot::Left, Slot::Right]),
        Term::Conditional { .. } => order.push(Slot::Condition),
        Term::Not { .. } => order.push(Slot::Value),
        Term::Let { .. } => order.extend([Slot::Value, Slot::Body]),
        Term::Apply { .. } => order.extend([Slot::Callee, Slot::Argument]),
        Term::Member { .. } => order.push(Slot::Object),
        Term::Array(items) | Term::VTuple(items) | Term::PTuple(items) => {
            order.extend((0..items.len()).map(Slot::Index))
        }
        _ => {}
    }
    order
}

/// Take one reduction step inside `target` and return the new state.
pub fn step(state: &GameState, target: NodeId, config: &EngineConfig) -> Result<GameState> {
    let mut next = state.clone();
    next.returned.clear();
    step_in(&mut next, target, config)?;
    Ok(next)
}

fn step_in(state: &mut GameState, target: NodeId, config: &EngineConfig) -> Result<()> {
    match kind(&state.nodes, target) {
        Kind::Expression => {}
        Kind::Placeholder => return Err(GameError::MissingNode { id: target }.into()),
        other => {
            return Err(ReduceError::invariant(format!(
                "cannot step {target}: it is a {other}"
            )))
        }
    }

    let term = state.get(target).term.clone();
    let parallel = matches!(term, Term::PTuple(_));
    let mut stepped = false;
    for slot in reduction_order(&term) {
        let Some(child) = term.child(slot).copied() else {
            continue;
        };
        match kind(&state.nodes, child) {
            Kind::Expression => {
                step_in(state, child, config)?;
                if !parallel {
                    return Ok(());
                }
                stepped = true;
            }
            Kind::Placeholder => return Err(GameError::MissingNode { id: child }.into()),
            _ => {}
        }
    }
    if stepped {
        return Ok(());
    }
    reduce_node(state, target, config)
}

/// Perform `target`'s own reduction directly, as when the player triggers
/// it by hand. Its subexpressions must already be reduced.
pub fn eval(
    state: &GameState,
    target: NodeId,
    expected: NodeType,
    config: &EngineConfig,
) -> Result<GameState> {
    if !state.nodes.contains(target) {
        return Err(ReduceError::invariant(format!("unknown node {target}")));
    }
    let node = state.get(target);
    if node.ty() != expected {
        return Err(GameError::wrong_type(target, &[expected], node.ty()).into());
    }
    if !state.on_board(target) {
        return Err(GameError::NotOnBoard { id: target }.into());
    }
    for slot in reduction_order(&node.term) {
        // A let body may still hold names bound by the let itself.
        if matches!((&node.term, slot), (Term::Let { .. }, Slot::Body)) {
            continue;
        }
        let Some(child) = node.term.child(slot).copied() else {
            continue;
        };
        match kind(&state.nodes, child) {
            Kind::Placeholder => return Err(GameError::MissingNode { id: child }.into()),
            Kind::Expression => {
                return Err(GameError::invalid(target, "reduce the inner expression first").into())
            }
            _ => {}
        }
    }
    let mut next = state.clone();
    next.returned.clear();
    reduce_node(&mut next, target, config)?;
    Ok(next)
}
