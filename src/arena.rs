//! Arena - persistent node storage for game terms
use crate::defs::{NodeType, Term};
use im::{HashMap as PMap, OrdMap};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

static NEXT_ID: AtomicU32 = AtomicU32::new(1);

/// Lightweight NodeId. Unique for the life of the process.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn fresh() -> NodeId {
        NodeId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Named child position inside a parent node.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Slot {
    Left,
    Op,
    Right,
    Condition,
    Positive,
    Negative,
    Value,
    Body,
    Variable,
    Callee,
    Argument,
    Object,
    Receiver,
    Index(usize),
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Slot::Left => "left",
            Slot::Op => "op",
            Slot::Right => "right",
            Slot::Condition => "condition",
            Slot::Positive => "positive",
            Slot::Negative => "negative",
            Slot::Value => "value",
            Slot::Body => "body",
            Slot::Variable => "variable",
            Slot::Callee => "callee",
            Slot::Argument => "argument",
            Slot::Object => "object",
            Slot::Receiver => "receiver",
            Slot::Index(i) => return write!(f, "{i}"),
        };
        f.write_str(name)
    }
}

/// A stored node: its term plus the back-link and the presentation flags.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub term: Term,
    pub parent: Option<NodeId>,
    pub parent_field: Option<Slot>,
    pub locked: bool,
    pub unlimited: bool,
    pub fade_level: u8,
    /// Placeholders displaced by fills, keyed by the slot they came from.
    pub holes: OrdMap<Slot, NodeId>,
    pub meta: OrdMap<String, String>,
}

impl Node {
    pub fn new(id: NodeId, term: Term) -> Self {
        Self {
            id,
            term,
            parent: None,
            parent_field: None,
            locked: false,
            unlimited: false,
            fade_level: 0,
            holes: OrdMap::new(),
            meta: OrdMap::new(),
        }
    }

    pub fn ty(&self) -> NodeType {
        self.term.ty()
    }

    pub fn child(&self, slot: Slot) -> Option<NodeId> {
        self.term.child(slot).copied()
    }

    pub fn child_ids(&self) -> SmallVec<[NodeId; 4]> {
        self.term.child_ids()
    }

    pub fn is_top_level(&self) -> bool {
        self.parent.is_none()
    }
}

/// Persistent id -> node map. Clones share structure, so every game state
/// snapshot keeps its own `Store` for the price of the paths it touched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Store {
    nodes: PMap<NodeId, Node>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn get(&self, id: NodeId) -> &Node {
        match self.nodes.get(&id) {
            Some(node) => node,
            None => panic!("dangling node id {id}"),
        }
    }

    pub fn try_get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn insert(&mut self, node: Node) {
        debug_assert!(
            {
                let have: SmallVec<[Slot; 4]> =
                    node.term.children().into_iter().map(|(s, _)| s).collect();
                have == node.term.expected_slots()
            },
            "node {} has slots out of line with its type",
            node.id
        );
        self.nodes.insert(node.id, node);
    }

    pub fn remove(&mut self, id: NodeId) -> Option<Node> {
        self.nodes.remove(&id)
    }

    /// Apply `f` to a node in place. Returns false if the id is unknown.
    pub fn update(&mut self, id: NodeId, f: impl FnOnce(&mut Node)) -> bool {
        match self.nodes.get_mut(&id) {
            Some(node) => {
                f(node);
                true
            }
            None => false,
        }
    }

    /// Allocate a node for `term`, adopting its children.
    pub fn alloc(&mut self, term: Term) -> NodeId {
        let id = NodeId::fresh();
        let children = term.children().into_iter().map(|(s, c)| (s, *c)).collect::<SmallVec<[_; 4]>>();
        self.insert(Node::new(id, term));
        for (slot, child) in children {
            self.set_parent(child, Some((id, slot)));
        }
        id
    }

    pub fn set_parent(&mut self, id: NodeId, parent: Option<(NodeId, Slot)>) {
        self.update(id, |n| {
            n.parent = parent.map(|(p, _)| p);
            n.parent_field = parent.map(|(_, s)| s);
        });
    }

    /// Point `parent.slot` at `child` and fix the child's back-link.
    /// Returns the previous occupant, or None if the slot does not exist.
    pub fn set_child(&mut self, parent: NodeId, slot: Slot, child: NodeId) -> Option<NodeId> {
        let mut old = None;
        self.update(parent, |n| {
            if let Some(c) = n.term.child_mut(slot) {
                old = Some(std::mem::replace(c, child));
            }
        });
        if old.is_some() {
            self.set_parent(child, Some((parent, slot)));
        }
        old
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Node> + '_ {
        self.nodes.values()
    }

    /// True when both stores are the same snapshot.
    pub fn ptr_eq(&self, other: &Store) -> bool {
        self.nodes.ptr_eq(&other.nodes)
    }
}
