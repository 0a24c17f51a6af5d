//! Game state aggregate and the bookkeeping every transition goes through.

use crate::arena::{Node, NodeId, Store};
use crate::defs::Term;
use crate::engine::scope;
use crate::graph::{self, Visit};
use crate::tree::{flatten_rooted, Tree};
use im::{OrdMap, OrdSet, Vector};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

/// Player-visible regions holding top-level nodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Region {
    Goal,
    Board,
    Toolbox,
}

impl Region {
    pub const ALL: [Region; 3] = [Region::Board, Region::Toolbox, Region::Goal];
}

/// Parsed content of a level, as handed over by the level loader.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Level {
    pub goal: Vec<Tree>,
    pub board: Vec<Tree>,
    pub toolbox: Vec<Tree>,
    pub globals: Vec<(String, Tree)>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameState {
    pub nodes: Store,
    pub goal: Vector<NodeId>,
    pub board: Vector<NodeId>,
    pub toolbox: Vector<NodeId>,
    pub globals: OrdMap<String, NodeId>,
    /// Nodes created by the last action, mapped to the node that caused them.
    pub added: OrdMap<NodeId, Option<NodeId>>,
    /// Retired nodes. `false` while pending, `true` once ready for deletion.
    pub removed: OrdMap<NodeId, bool>,
    pub executing: OrdSet<NodeId>,
    /// Result node(s) of the most recent reduction.
    pub returned: Vec<NodeId>,
}

impl GameState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh state for a level. Globals are wrapped in `define` nodes.
    pub fn start(level: Level) -> Self {
        let mut state = GameState::new();
        for tree in level.goal {
            let id = state.insert_tree(tree, None);
            state.goal.push_back(id);
        }
        for tree in level.board {
            let id = state.insert_tree(tree, None);
            state.board.push_back(id);
        }
        for tree in level.toolbox {
            let id = state.insert_tree(tree, None);
            state.toolbox.push_back(id);
        }
        for (name, tree) in level.globals {
            let tree = match tree.term {
                Term::Define { .. } => tree,
                _ => Tree::define(&name, tree),
            };
            let id = state.insert_tree(tree, None);
            state.globals.insert(name, id);
        }
        state.added.clear();
        state
    }

    pub fn get(&self, id: NodeId) -> &Node {
        self.nodes.get(id)
    }

    pub fn region(&self, region: Region) -> &Vector<NodeId> {
        match region {
            Region::Goal => &self.goal,
            Region::Board => &self.board,
            Region::Toolbox => &self.toolbox,
        }
    }

    pub fn region_mut(&mut self, region: Region) -> &mut Vector<NodeId> {
        match region {
            Region::Goal => &mut self.goal,
            Region::Board => &mut self.board,
            Region::Toolbox => &mut self.toolbox,
        }
    }

    /// Region listing `id` as a top-level node.
    pub fn region_of(&self, id: NodeId) -> Option<Region> {
        Region::ALL.into_iter().find(|r| self.region(*r).contains(&id))
    }

    /// True when `id` is a board node or lies inside one.
    pub fn on_board(&self, id: NodeId) -> bool {
        self.nodes.contains(id) && self.board.contains(&graph::root_of(&self.nodes, id))
    }

    /// Remove a top-level node from whichever region lists it.
    pub fn take_from_region(&mut self, id: NodeId) -> Option<Region> {
        let region = self.region_of(id)?;
        let list = self.region_mut(region);
        if let Some(pos) = list.index_of(&id) {
            list.remove(pos);
        }
        Some(region)
    }

    /// Take a toolbox item for a drag. Unlimited items stay and hand out a copy.
    pub fn take_from_toolbox(&mut self, id: NodeId) -> NodeId {
        if self.get(id).unlimited {
            let copy = self.clone_subtree(id, Some(id));
            self.nodes.update(copy, |n| n.unlimited = false);
            copy
        } else {
            self.take_from_region(id);
            id
        }
    }

    pub fn is_pending_removal(&self, id: NodeId) -> bool {
        self.removed.contains_key(&id)
    }

    pub fn mark_added(&mut self, id: NodeId, cause: Option<NodeId>) {
        self.added.insert(id, cause);
    }

    /// Flatten `tree` into the store. The root is left detached.
    pub fn insert_tree(&mut self, tree: Tree, cause: Option<NodeId>) -> NodeId {
        let (root, nodes) = flatten_rooted(tree);
        for node in nodes {
            self.added.insert(node.id, cause);
            self.nodes.insert(node);
        }
        root
    }

    /// Allocate a node, adopting its children.
    pub fn alloc(&mut self, term: Term, cause: Option<NodeId>) -> NodeId {
        let id = self.nodes.alloc(term);
        self.mark_added(id, cause);
        id
    }

    /// Deep copy with fresh ids. The copy is detached.
    pub fn clone_subtree(&mut self, id: NodeId, cause: Option<NodeId>) -> NodeId {
        let (root, created) = graph::clone_into(&mut self.nodes, id, false);
        for c in created {
            self.mark_added(c, cause);
        }
        root
    }

    pub fn resolve(&self, name: &str, from: NodeId) -> Option<NodeId> {
        scope::resolve_name(&self.nodes, &self.globals, name, from)
    }

    /// What a lookup of the value at `value` yields: an alias for arrays,
    /// a deep clone for everything else.
    pub fn lookup_copy(&mut self, value: NodeId, cause: NodeId) -> NodeId {
        let (root, created) = scope::copy_value(&mut self.nodes, value);
        for c in created {
            self.mark_added(c, Some(cause));
        }
        root
    }

    /// Targets of reference nodes that are alive and outside `excluded`.
    fn live_reference_targets(&self, excluded: &FxHashSet<NodeId>) -> FxHashSet<NodeId> {
        self.nodes
            .iter()
            .filter(|n| !excluded.contains(&n.id) && !self.removed.contains_key(&n.id))
            .filter_map(|n| match n.term {
                Term::Reference(target) => Some(target),
                _ => None,
            })
            .collect()
    }

    /// Schedule one node for removal, leaving its children alone.
    pub fn retire_node(&mut self, id: NodeId) {
        let holes: Vec<NodeId> = self.get(id).holes.values().copied().collect();
        for h in holes {
            self.removed.insert(h, false);
        }
        self.nodes.set_parent(id, None);
        self.removed.insert(id, false);
        self.executing.remove(&id);
    }

    /// Schedule a whole subtree for removal. Parts of it still aliased by a
    /// live reference are detached and kept instead.
    pub fn retire(&mut self, root: NodeId) {
        let doomed: FxHashSet<NodeId> = graph::subtree(&self.nodes, root).into_iter().collect();
        let targets = self.live_reference_targets(&doomed);
        self.nodes.set_parent(root, None);
        if targets.contains(&root) {
            return;
        }

        let mut retired = Vec::new();
        let mut survivors = Vec::new();
        graph::walk(&self.nodes, root, |n| {
            if targets.contains(&n.id) {
                survivors.push(n.id);
                return Visit::SkipChildren;
            }
            retired.push(n.id);
            retired.extend(n.holes.values().copied());
            Visit::Continue
        });
        for id in survivors {
            self.nodes.set_parent(id, None);
        }
        for id in retired {
            self.removed.insert(id, false);
            self.executing.remove(&id);
        }
    }

    /// Put `results` where `old` was.
    ///
    /// Nested: the parent's slot is repointed (several results are wrapped
    /// in a vtuple). Top-level: the results take `old`'s place in its
    /// region, with vtuples broken up into their items when `spill` is set.
    /// The results are appended to `returned`.
    pub fn splice(&mut self, old: NodeId, results: &[NodeId], spill: bool) {
        let (parent, field) = {
            let n = self.get(old);
            (n.parent, n.parent_field)
        };

        if let (Some(parent), Some(slot)) = (parent, field) {
            let result = match results {
                [one] => *one,
                many => self.alloc(Term::VTuple(many.iter().copied().collect()), Some(old)),
            };
            self.nodes.set_child(parent, slot, result);
            self.nodes.set_parent(old, None);
            self.returned.push(result);
            return;
        }

        let mut top = Vec::with_capacity(results.len());
        for &r in results {
            let items = match &self.get(r).term {
                Term::VTuple(items) if spill => Some(items.clone()),
                _ => None,
            };
            match items {
                Some(items) => {
                    for item in items {
                        self.nodes.set_parent(item, None);
                        top.push(item);
                    }
                    self.retire_node(r);
                }
                None => {
                    self.nodes.set_parent(r, None);
                    top.push(r);
                }
            }
        }

        if let Some(region) = self.region_of(old) {
            let list = self.region_mut(region);
            if let Some(pos) = list.index_of(&old) {
                list.remove(pos);
                for (i, id) in top.iter().enumerate() {
                    list.insert(pos + i, *id);
                }
            }
        }
        self.returned.extend(top);
    }

    /// Promote pending removals and drop everything ready from the store.
    /// `Some(id)` promotes that node and the pending nodes below it.
    pub fn cleanup(&mut self, id: Option<NodeId>) {
        match id {
            Some(id) => {
                let mut stack = vec![id];
                while let Some(curr) = stack.pop() {
                    if !self.removed.contains_key(&curr) {
                        continue;
                    }
                    self.removed.insert(curr, true);
                    if let Some(node) = self.nodes.try_get(curr) {
                        stack.extend(node.child_ids());
                    }
                }
            }
            None => {
                let pending: Vec<NodeId> = self.removed.keys().copied().collect();
                for id in pending {
                    self.removed.insert(id, true);
                }
            }
        }

        let ready: Vec<NodeId> = self
            .removed
            .iter()
            .filter(|(_, ready)| **ready)
            .map(|(id, _)| *id)
            .collect();
        for id in ready {
            self.removed.remove(&id);
            self.added.remove(&id);
            self.nodes.remove(id);
        }
    }
}
