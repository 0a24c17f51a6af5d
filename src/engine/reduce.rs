//! Per-type reductions. Each one assumes the node's reduction-order
//! children are already settled, builds the result, splices it in and
//! retires what it consumed.

use super::lambda::{bind_argument, substitute, Bound};
use super::primitives;
use super::scope;
use super::unparse::debug_unparse;
use crate::arena::NodeId;
use crate::config::EngineConfig;
use crate::defs::{BuiltinName, NodeType, OpName, Term};
use crate::error::{GameError, ReduceError, Result};
use crate::state::GameState;
use smallvec::SmallVec;

pub(crate) fn reduce_node(state: &mut GameState, id: NodeId, config: &EngineConfig) -> Result<()> {
    if tracing::enabled!(tracing::Level::TRACE) {
        tracing::trace!(
            id = %id,
            ty = %state.get(id).ty(),
            term = %debug_unparse(&state.nodes, id),
            "reduce"
        );
    }
    let spill = config.spill_vtuples;
    match state.get(id).term.clone() {
        Term::Binop { left, op, right } => reduce_binop(state, id, left, op, right, spill),
        Term::Conditional { condition, positive, negative } => {
            reduce_conditional(state, id, condition, positive, negative, spill)
        }
        Term::Not { value } => reduce_not(state, id, value, spill),
        Term::Let { variable, value, body } => reduce_let(state, id, variable, value, body, spill),
        Term::Identifier(name) | Term::LambdaVar(name) => reduce_identifier(state, id, &name, spill),
        Term::Lambda { params, body } => reduce_saturated(state, id, &params, body, spill),
        Term::Apply { callee, argument } => reduce_apply(state, id, callee, argument, spill),
        Term::Member { object, name } => reduce_member(state, id, object, &name, spill),
        other => Err(ReduceError::invariant(format!(
            "{id} ({}) has no reduction of its own",
            other.ty()
        ))),
    }
}

fn reduce_binop(
    state: &mut GameState,
    id: NodeId,
    left: NodeId,
    op: NodeId,
    right: NodeId,
    spill: bool,
) -> Result<()> {
    let op_name = match state.get(op).term {
        Term::Op(name) => name,
        ref other => {
            return Err(GameError::wrong_type(op, &[NodeType::Op], other.ty()).into());
        }
    };
    let l = state.get(left).term.clone();
    let r = state.get(right).term.clone();
    let result = binop_value(op_name, (left, &l), (right, &r))?;
    let out = state.alloc(result, Some(id));
    state.splice(id, &[out], spill);
    state.retire(id);
    Ok(())
}

fn binop_value(op: OpName, (lid, l): (NodeId, &Term), (rid, r): (NodeId, &Term)) -> Result<Term> {
    use NodeType as T;
    // The right operand is blamed when the left one is acceptable.
    let mismatch = |expected: &[NodeType]| -> ReduceError {
        if expected.contains(&l.ty()) {
            GameError::wrong_type(rid, &[l.ty()], r.ty()).into()
        } else {
            GameError::wrong_type(lid, expected, l.ty()).into()
        }
    };
    let value = match op {
        OpName::Add => match (l, r) {
            (Term::Number(a), Term::Number(b)) => Term::Number(a.wrapping_add(*b)),
            (Term::Str(a), Term::Str(b)) => Term::Str(format!("{a}{b}")),
            _ => return Err(mismatch(&[T::Number, T::String])),
        },
        OpName::Sub => match (l, r) {
            (Term::Number(a), Term::Number(b)) => Term::Number(a.wrapping_sub(*b)),
            _ => return Err(mismatch(&[T::Number])),
        },
        OpName::Lt => match (l, r) {
            (Term::Number(a), Term::Number(b)) => Term::Boolean(a < b),
            _ => return Err(mismatch(&[T::Number])),
        },
        OpName::Gt => match (l, r) {
            (Term::Number(a), Term::Number(b)) => Term::Boolean(a > b),
            _ => return Err(mismatch(&[T::Number])),
        },
        OpName::And => match (l, r) {
            (Term::Boolean(a), Term::Boolean(b)) => Term::Boolean(*a && *b),
            _ => return Err(mismatch(&[T::Boolean])),
        },
        OpName::Or => match (l, r) {
            (Term::Boolean(a), Term::Boolean(b)) => Term::Boolean(*a || *b),
            _ => return Err(mismatch(&[T::Boolean])),
        },
        OpName::Eq => match (l, r) {
            (Term::Number(a), Term::Number(b)) => Term::Boolean(a == b),
            (Term::Str(a), Term::Str(b)) => Term::Boolean(a == b),
            (Term::Boolean(a), Term::Boolean(b)) => Term::Boolean(a == b),
            (Term::Symbol(a), Term::Symbol(b)) => Term::Boolean(a == b),
            _ => return Err(mismatch(&[T::Number, T::String, T::Boolean, T::Symbol])),
        },
    };
    Ok(value)
}

fn reduce_conditional(
    state: &mut GameState,
    id: NodeId,
    condition: NodeId,
    positive: NodeId,
    negative: NodeId,
    spill: bool,
) -> Result<()> {
    let (chosen, dropped) = match state.get(condition).term {
        Term::Boolean(true) => (positive, negative),
        Term::Boolean(false) => (negative, positive),
        ref other => {
            return Err(GameError::wrong_type(condition, &[NodeType::Boolean], other.ty()).into())
        }
    };
    state.splice(id, &[chosen], spill);
    state.retire(condition);
    state.retire(dropped);
    state.retire_node(id);
    Ok(())
}

fn reduce_not(state: &mut GameState, id: NodeId, value: NodeId, spill: bool) -> Result<()> {
    let b = match state.get(value).term {
        Term::Boolean(b) => b,
        ref other => {
            return Err(GameError::wrong_type(value, &[NodeType::Boolean], other.ty()).into())
        }
    };
    let out = state.alloc(Term::Boolean(!b), Some(id));
    state.splice(id, &[out], spill);
    state.retire(id);
    Ok(())
}

fn reduce_let(
    state: &mut GameState,
    id: NodeId,
    variable: NodeId,
    value: NodeId,
    body: NodeId,
    spill: bool,
) -> Result<()> {
    let name = match &state.get(variable).term {
        Term::Identifier(name) => name.clone(),
        other => {
            return Err(
                GameError::wrong_type(variable, &[NodeType::Identifier], other.ty()).into(),
            )
        }
    };
    if matches!(state.get(value).term, Term::Missing) {
        return Err(GameError::MissingNode { id: value }.into());
    }
    let body = substitute(state, id, &name, body)?;
    state.splice(id, &[body], spill);
    state.retire(variable);
    state.retire(value);
    state.retire_node(id);
    Ok(())
}

/// Look `name` up from `id` and return a fresh copy of the bound value.
pub(crate) fn lookup(state: &mut GameState, id: NodeId, name: &str) -> Result<NodeId> {
    let unknown = || GameError::UnknownName { id, name: name.to_string() };
    let site = state.resolve(name, id).ok_or_else(unknown)?;
    let value = scope::bound_value(&state.nodes, site).ok_or_else(unknown)?;
    if matches!(state.get(value).term, Term::Missing) {
        return Err(GameError::MissingNode { id: value }.into());
    }
    Ok(state.lookup_copy(value, id))
}

fn reduce_identifier(state: &mut GameState, id: NodeId, name: &str, spill: bool) -> Result<()> {
    let copy = lookup(state, id, name)?;
    state.splice(id, &[copy], spill);
    state.retire(id);
    Ok(())
}

/// A lambda whose parameters have all been bound steps to its body.
fn reduce_saturated(
    state: &mut GameState,
    id: NodeId,
    params: &[NodeId],
    body: NodeId,
    spill: bool,
) -> Result<()> {
    if matches!(state.get(body).term, Term::Missing) {
        return Err(GameError::MissingNode { id: body }.into());
    }
    state.splice(id, &[body], spill);
    for p in params {
        state.retire(*p);
    }
    state.retire_node(id);
    Ok(())
}

fn reduce_apply(
    state: &mut GameState,
    id: NodeId,
    callee: NodeId,
    argument: NodeId,
    spill: bool,
) -> Result<()> {
    let (args, shell): (SmallVec<[NodeId; 4]>, Option<NodeId>) = match &state.get(argument).term {
        Term::PTuple(items) => (items.clone(), Some(argument)),
        _ => (SmallVec::from_elem(argument, 1), None),
    };
    if let Some(hole) = args.iter().find(|a| matches!(state.get(**a).term, Term::Missing)) {
        return Err(GameError::MissingNode { id: *hole }.into());
    }

    match state.get(callee).term.clone() {
        Term::Builtin { name, receiver } => {
            let mut full: SmallVec<[NodeId; 4]> = receiver.into_iter().collect();
            full.extend(args);
            let out = primitives::call(state, id, name, &full)?;
            state.splice(id, &[out], spill);
            state.retire(id);
        }
        Term::Lambda { .. } => {
            let mut current = callee;
            // Last lambda whose parameters ran out.
            let mut spent = None;
            for arg in args {
                let ty = state.get(current).ty();
                if ty != NodeType::Lambda {
                    return Err(match spent {
                        Some(id) => GameError::AlreadyFullyBound { id },
                        None => GameError::wrong_type(current, &[NodeType::Lambda, NodeType::Builtin], ty),
                    }
                    .into());
                }
                current = match bind_argument(state, current, arg)? {
                    Bound::Partial(lambda) => lambda,
                    Bound::Saturated(body) => {
                        state.retire_node(current);
                        spent = Some(current);
                        body
                    }
                };
            }
            state.splice(id, &[current], spill);
            if let Some(shell) = shell {
                state.retire_node(shell);
            }
            state.retire_node(id);
        }
        other => {
            return Err(GameError::wrong_type(
                callee,
                &[NodeType::Lambda, NodeType::Builtin],
                other.ty(),
            )
            .into())
        }
    }
    Ok(())
}

fn reduce_member(
    state: &mut GameState,
    id: NodeId,
    object: NodeId,
    name: &str,
    spill: bool,
) -> Result<()> {
    let builtin = BuiltinName::from_name(name)
        .ok_or_else(|| GameError::UnknownName { id, name: name.to_string() })?;
    if builtin.arity() == 1 {
        let out = primitives::call(state, id, builtin, &[object])?;
        state.splice(id, &[out], spill);
        state.retire(id);
    } else {
        let out = state.alloc(Term::Builtin { name: builtin, receiver: Some(object) }, Some(id));
        state.splice(id, &[out], spill);
        state.retire_node(id);
    }
    Ok(())
}
