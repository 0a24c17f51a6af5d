//! Lexical scope resolution.

use crate::arena::{NodeId, Store};
use crate::defs::Term;
use crate::graph;
use im::OrdMap;

/// Find the binding site of `name` as seen from `from`.
///
/// Walks the ancestor chain: a lambda binds through its parameters (only
/// for occurrences in its body), a let binds unless `from` sits in the
/// let's own value. Falls back to `globals`.
pub fn resolve_name(
    store: &Store,
    globals: &OrdMap<String, NodeId>,
    name: &str,
    from: NodeId,
) -> Option<NodeId> {
    let mut child = from;
    for ancestor in graph::ancestors(store, from) {
        match &ancestor.term {
            Term::Lambda { params, body } if *body == child => {
                let hit = params.iter().copied().find(|p| {
                    matches!(&store.get(*p).term, Term::LambdaArg { name: n, .. } if n == name)
                });
                if hit.is_some() {
                    return hit;
                }
            }
            Term::Let { variable, value, .. } if *value != child && *variable != child => {
                if matches!(&store.get(*variable).term, Term::Identifier(n) if n == name) {
                    return Some(ancestor.id);
                }
            }
            _ => {}
        }
        child = ancestor.id;
    }
    globals.get(name).copied()
}

/// The node holding the value bound at a binding site, if any.
pub fn bound_value(store: &Store, site: NodeId) -> Option<NodeId> {
    match &store.get(site).term {
        Term::LambdaArg { value, .. } => *value,
        Term::Let { value, .. } => Some(*value),
        Term::Define { body, .. } => Some(*body),
        _ => None,
    }
}

/// Does this lambda rebind `name` for everything below it?
pub fn shadows(store: &Store, lambda: &Term, name: &str) -> bool {
    match lambda {
        Term::Lambda { params, .. } => params
            .iter()
            .any(|p| matches!(&store.get(*p).term, Term::LambdaArg { name: n, .. } if n == name)),
        _ => false,
    }
}

/// Copy a bound value for one lookup. Arrays are aliased through a fresh
/// reference, everything else is deep-cloned. Returns the new root and
/// every node created.
pub fn copy_value(store: &mut Store, value: NodeId) -> (NodeId, Vec<NodeId>) {
    match store.get(value).term {
        Term::Array(_) => {
            let id = store.alloc(Term::Reference(value));
            (id, vec![id])
        }
        _ => graph::clone_into(store, value, false),
    }
}
