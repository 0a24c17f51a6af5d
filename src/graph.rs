//! Structural algorithms over the store: deep clone, equality, search and
//! bottom-up rewriting. All traversals use an explicit stack.

use crate::arena::{Node, NodeId, Slot, Store};
use crate::defs::Term;
use im::OrdMap;
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

enum Frame {
    Enter(NodeId),
    Exit(NodeId),
}

/// Result of [`clone_deep`].
#[derive(Debug)]
pub struct Cloned {
    pub root: Node,
    pub descendants: Vec<Node>,
    pub store: Store,
}

/// Copy the subtree at `root` with fresh ids. The copy is detached.
pub fn clone_deep(store: &Store, root: NodeId) -> Cloned {
    let mut out = store.clone();
    let (new_root, created) = clone_into(&mut out, root, false);
    let descendants = created
        .iter()
        .filter(|id| **id != new_root)
        .map(|id| out.get(*id).clone())
        .collect();
    Cloned { root: out.get(new_root).clone(), descendants, store: out }
}

/// Clone in place. Returns the new root and every id created, root last.
/// With `keep_parent` the copy takes over the original's back-link (the
/// parent's slot itself is left alone).
pub fn clone_into(store: &mut Store, root: NodeId, keep_parent: bool) -> (NodeId, Vec<NodeId>) {
    let mut memo: FxHashMap<NodeId, NodeId> = FxHashMap::default();
    let mut created = Vec::new();
    let mut stack = vec![Frame::Enter(root)];

    while let Some(frame) = stack.pop() {
        match frame {
            Frame::Enter(id) => {
                if memo.contains_key(&id) {
                    continue;
                }
                stack.push(Frame::Exit(id));
                for child in store.get(id).child_ids().iter().rev() {
                    stack.push(Frame::Enter(*child));
                }
            }
            Frame::Exit(id) => {
                let src = store.get(id).clone();
                let new_id = NodeId::fresh();
                let term = src.term.map_children(|_, c| memo.get(&c).copied().unwrap_or(c));
                let node = Node {
                    id: new_id,
                    term,
                    parent: None,
                    parent_field: None,
                    holes: OrdMap::new(),
                    ..src
                };
                adopt(store, node);
                memo.insert(id, new_id);
                created.push(new_id);
            }
        }
    }

    let new_root = memo.get(&root).copied().unwrap_or(root);
    if keep_parent {
        let (parent, field) = {
            let orig = store.get(root);
            (orig.parent, orig.parent_field)
        };
        store.update(new_root, |n| {
            n.parent = parent;
            n.parent_field = field;
        });
    }
    (new_root, created)
}

/// Insert `node` and point each of its children back at it.
fn adopt(store: &mut Store, node: Node) {
    let id = node.id;
    let children: SmallVec<[(Slot, NodeId); 4]> =
        node.term.children().into_iter().map(|(s, c)| (s, *c)).collect();
    store.insert(node);
    for (slot, child) in children {
        store.set_parent(child, Some((id, slot)));
    }
}

/// Structural equality: same types, same primitive fields, same child
/// slots, recursively. Ids and back-links are ignored. References are equal
/// when their targets are.
pub fn equal(store: &Store, a: NodeId, b: NodeId) -> bool {
    let mut stack = vec![(a, b)];
    // Pairs already compared; aliasing cycles end here.
    let mut seen: FxHashSet<(NodeId, NodeId)> = FxHashSet::default();
    while let Some((x, y)) = stack.pop() {
        if x == y || !seen.insert((x, y)) {
            continue;
        }
        let (nx, ny) = (store.get(x), store.get(y));
        if let (Term::Reference(tx), Term::Reference(ty)) = (&nx.term, &ny.term) {
            stack.push((*tx, *ty));
            continue;
        }
        if !nx.term.same_fields(&ny.term) {
            return false;
        }
        let (cx, cy) = (nx.term.children(), ny.term.children());
        if cx.len() != cy.len() {
            return false;
        }
        for ((sx, ix), (sy, iy)) in cx.into_iter().zip(cy) {
            if sx != sy {
                return false;
            }
            stack.push((*ix, *iy));
        }
    }
    true
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Visit {
    Continue,
    SkipChildren,
}

/// Pre-order walk, children in slot order.
pub fn walk(store: &Store, root: NodeId, mut visit: impl FnMut(&Node) -> Visit) {
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        let node = store.get(id);
        if visit(node) == Visit::SkipChildren {
            continue;
        }
        for child in node.child_ids().iter().rev() {
            stack.push(*child);
        }
    }
}

/// Every node in the subtree (root included) satisfying `pred`, pre-order.
pub fn search(store: &Store, root: NodeId, mut pred: impl FnMut(&Node) -> bool) -> Vec<NodeId> {
    let mut found = Vec::new();
    walk(store, root, |n| {
        if pred(n) {
            found.push(n.id);
        }
        Visit::Continue
    });
    found
}

pub fn subtree(store: &Store, root: NodeId) -> Vec<NodeId> {
    search(store, root, |_| true)
}

/// Bottom-up rewrite of the subtree at `root`.
///
/// Each visited node is handed to `transform` with its children already
/// rewritten; the node it returns takes the original's place. Returning a
/// node with a different id is a replacement: the store must already hold
/// that node's descendants. `descend` gates visiting a node's children.
/// Returns the id now at `root`'s position and the rewritten store.
pub fn map_deep<E>(
    store: &Store,
    root: NodeId,
    mut transform: impl FnMut(Node, &mut Store) -> Result<Node, E>,
    mut descend: impl FnMut(&Node) -> bool,
) -> Result<(NodeId, Store), E> {
    let mut out = store.clone();
    let mut memo: FxHashMap<NodeId, NodeId> = FxHashMap::default();
    let mut stack = vec![Frame::Enter(root)];

    while let Some(frame) = stack.pop() {
        match frame {
            Frame::Enter(id) => {
                stack.push(Frame::Exit(id));
                let node = out.get(id);
                if descend(node) {
                    for child in node.child_ids().iter().rev() {
                        stack.push(Frame::Enter(*child));
                    }
                }
            }
            Frame::Exit(id) => {
                let mut node = out.get(id).clone();
                let (parent, field) = (node.parent, node.parent_field);
                node.term = node
                    .term
                    .map_children(|_, c| memo.get(&c).copied().unwrap_or(c));
                let mut replacement = transform(node, &mut out)?;
                if replacement.id != id {
                    replacement.parent = parent;
                    replacement.parent_field = field;
                }
                memo.insert(id, replacement.id);
                adopt(&mut out, replacement);
            }
        }
    }

    let new_root = memo.get(&root).copied().unwrap_or(root);
    if new_root != root {
        let orig = out.get(root);
        if let (Some(parent), Some(slot)) = (orig.parent, orig.parent_field) {
            out.set_child(parent, slot, new_root);
        }
    }
    Ok((new_root, out))
}

/// Parent chain of a node, nearest first, the node itself excluded.
pub struct Ancestors<'a> {
    store: &'a Store,
    next: Option<NodeId>,
    budget: usize,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<&'a Node> {
        let id = self.next?;
        debug_assert!(self.budget > 0, "parent chain loops through {id}");
        self.budget = self.budget.checked_sub(1)?;
        let node = self.store.try_get(id)?;
        self.next = node.parent;
        Some(node)
    }
}

pub fn ancestors(store: &Store, id: NodeId) -> Ancestors<'_> {
    Ancestors {
        store,
        next: store.try_get(id).and_then(|n| n.parent),
        budget: store.len(),
    }
}

/// The top-level node whose subtree holds `id`.
pub fn root_of(store: &Store, id: NodeId) -> NodeId {
    ancestors(store, id).last().map(|n| n.id).unwrap_or(id)
}

/// True if `node` is `ancestor` or lies below it.
pub fn contains(store: &Store, ancestor: NodeId, node: NodeId) -> bool {
    node == ancestor || ancestors(store, node).any(|n| n.id == ancestor)
}
