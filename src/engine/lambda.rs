//! Lambda application and name substitution.

use super::reduce::lookup;
use super::scope;
use crate::arena::{NodeId, Slot};
use crate::config::EngineConfig;
use crate::defs::{NodeType, Term};
use crate::error::{GameError, ReduceError, Result};
use crate::graph;
use crate::kind::{kind, Kind};
use crate::state::{GameState, Region};
use smallvec::SmallVec;

/// Outcome of binding one argument.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bound {
    /// Parameters remain; the lambda itself is the result.
    Partial(NodeId),
    /// That was the last parameter; the body is the result. The spent
    /// lambda is left for the caller to retire once the body is placed.
    Saturated(NodeId),
}

/// Apply a board lambda to a detached argument (the player's drop).
pub fn apply_lambda(
    state: &GameState,
    lambda: NodeId,
    arg: NodeId,
    config: &EngineConfig,
) -> Result<GameState> {
    for id in [lambda, arg] {
        if !state.nodes.contains(id) {
            return Err(ReduceError::invariant(format!("unknown node {id}")));
        }
    }
    if !state.on_board(lambda) {
        return Err(GameError::NotOnBoard { id: lambda }.into());
    }
    if graph::contains(&state.nodes, arg, lambda) {
        return Err(GameError::CircularCall { id: arg }.into());
    }
    match kind(&state.nodes, arg) {
        Kind::Placeholder => return Err(GameError::MissingNode { id: arg }.into()),
        Kind::Syntax | Kind::Statement => {
            return Err(GameError::invalid(arg, "only expressions and values can be passed").into())
        }
        _ => {}
    }
    if state.get(arg).parent.is_some() {
        return Err(GameError::invalid(arg, "detach the argument first").into());
    }
    if state.is_pending_removal(arg) {
        return Err(ReduceError::invariant(format!("node {arg} is pending removal")));
    }

    let mut next = state.clone();
    next.returned.clear();
    let arg = match state.region_of(arg) {
        Some(Region::Goal) => return Err(GameError::invalid(arg, "goal nodes cannot be moved").into()),
        Some(Region::Toolbox) => next.take_from_toolbox(arg),
        Some(Region::Board) => {
            next.take_from_region(arg);
            arg
        }
        // Taken from the toolbox earlier and still floating.
        None => arg,
    };
    match bind_argument(&mut next, lambda, arg)? {
        Bound::Partial(l) => next.returned.push(l),
        Bound::Saturated(body) => {
            next.splice(lambda, &[body], config.spill_vtuples);
            next.retire_node(lambda);
        }
    }
    Ok(next)
}

/// Bind `arg` to the first unbound parameter of `lambda` and substitute it
/// through the body. The bound parameter is retired and the rest shift
/// down one index.
pub fn bind_argument(state: &mut GameState, lambda: NodeId, arg: NodeId) -> Result<Bound> {
    if graph::contains(&state.nodes, arg, lambda) {
        return Err(GameError::CircularCall { id: arg }.into());
    }
    let (params, body) = match &state.get(lambda).term {
        Term::Lambda { params, body } => (params.clone(), *body),
        other => return Err(GameError::wrong_type(lambda, &[NodeType::Lambda], other.ty()).into()),
    };
    if matches!(state.get(body).term, Term::Missing) {
        return Err(GameError::MissingNode { id: body }.into());
    }
    let (param, name) = params
        .iter()
        .find_map(|p| match &state.get(*p).term {
            Term::LambdaArg { name, value: None } => Some((*p, name.clone())),
            _ => None,
        })
        .ok_or(GameError::AlreadyFullyBound { id: lambda })?;

    let value = force(state, arg)?;
    state.nodes.update(param, |n| {
        n.term = Term::LambdaArg { name: name.clone(), value: Some(value) }
    });
    state.nodes.set_parent(value, Some((param, Slot::Value)));

    let body = substitute(state, param, &name, body)?;

    let remaining: SmallVec<[NodeId; 2]> = params.iter().copied().filter(|p| *p != param).collect();
    state.nodes.update(lambda, |n| {
        n.term = Term::Lambda { params: remaining.clone(), body }
    });
    for (i, p) in remaining.iter().enumerate() {
        state.nodes.set_parent(*p, Some((lambda, Slot::Index(i))));
    }
    state.retire(param);

    tracing::trace!(lambda = %lambda, param = %name, left = remaining.len(), "bound argument");
    if remaining.is_empty() {
        Ok(Bound::Saturated(body))
    } else {
        Ok(Bound::Partial(lambda))
    }
}

/// Named arguments are looked up before binding; anything else is bound
/// as it stands.
fn force(state: &mut GameState, arg: NodeId) -> Result<NodeId> {
    let mut current = arg;
    let mut hops = 0usize;
    loop {
        let name = match &state.get(current).term {
            Term::Identifier(name) | Term::LambdaVar(name) => name.clone(),
            _ => return Ok(current),
        };
        let copy = lookup(state, current, &name)?;
        state.retire(current);
        current = copy;
        hops += 1;
        if hops > state.nodes.len() {
            return Err(ReduceError::invariant(format!("name chain from {arg} does not end")));
        }
    }
}

/// Replace every name below `root` that resolves to `site` with a copy of
/// the value bound there. Returns the node now at `root`'s position.
pub(crate) fn substitute(
    state: &mut GameState,
    site: NodeId,
    name: &str,
    root: NodeId,
) -> Result<NodeId> {
    let value = scope::bound_value(&state.nodes, site)
        .ok_or_else(|| ReduceError::invariant(format!("{site} binds no value")))?;
    let original = &state.nodes;
    let globals = &state.globals;
    let mut replaced: Vec<(NodeId, Vec<NodeId>)> = Vec::new();

    let (new_root, store) = graph::map_deep(
        original,
        root,
        |node, store| {
            let hit = match &node.term {
                Term::Identifier(n) | Term::LambdaVar(n) => {
                    n == name && scope::resolve_name(store, globals, n, node.id) == Some(site)
                }
                _ => false,
            };
            if !hit {
                return Ok::<_, ReduceError>(node);
            }
            let (copy, created) = scope::copy_value(store, value);
            replaced.push((node.id, created));
            Ok(store.get(copy).clone())
        },
        |node| !scope::shadows(original, &node.term, name),
    )?;

    state.nodes = store;
    for (old, created) in replaced {
        for c in created {
            state.mark_added(c, Some(old));
        }
        state.retire(old);
    }
    Ok(new_root)
}
