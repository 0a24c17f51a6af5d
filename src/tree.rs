//! Nested tree form of terms.
//!
//! Level files and the toolbox/goal payloads of actions arrive as `Tree`s.
//! [`flatten`] turns one into store nodes with fresh ids, root first.

use crate::arena::{Node, NodeId, Slot};
use crate::defs::{BuiltinName, OpName, Term};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub term: Term<Box<Tree>>,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub unlimited: bool,
}

impl From<Term<Box<Tree>>> for Tree {
    fn from(term: Term<Box<Tree>>) -> Self {
        Tree { term, locked: false, unlimited: false }
    }
}

fn boxed(items: Vec<Tree>) -> SmallVec<[Box<Tree>; 4]> {
    items.into_iter().map(Box::new).collect()
}

impl Tree {
    pub fn locked(mut self) -> Self {
        self.locked = true;
        self
    }

    pub fn unlimited(mut self) -> Self {
        self.unlimited = true;
        self
    }

    pub fn number(n: i64) -> Tree {
        Term::Number(n).into()
    }

    pub fn string(s: &str) -> Tree {
        Term::Str(s.to_string()).into()
    }

    pub fn boolean(b: bool) -> Tree {
        Term::Boolean(b).into()
    }

    pub fn symbol(name: &str) -> Tree {
        Term::Symbol(name.to_string()).into()
    }

    pub fn missing() -> Tree {
        Term::Missing.into()
    }

    pub fn note(text: &str) -> Tree {
        Term::Note(text.to_string()).into()
    }

    pub fn void() -> Tree {
        Term::Void.into()
    }

    pub fn op(op: OpName) -> Tree {
        Term::Op(op).into()
    }

    pub fn identifier(name: &str) -> Tree {
        Term::Identifier(name.to_string()).into()
    }

    pub fn lambda_var(name: &str) -> Tree {
        Term::LambdaVar(name.to_string()).into()
    }

    pub fn binop(left: Tree, op: OpName, right: Tree) -> Tree {
        Term::Binop {
            left: Box::new(left),
            op: Box::new(Tree::op(op)),
            right: Box::new(right),
        }
        .into()
    }

    pub fn conditional(condition: Tree, positive: Tree, negative: Tree) -> Tree {
        Term::Conditional {
            condition: Box::new(condition),
            positive: Box::new(positive),
            negative: Box::new(negative),
        }
        .into()
    }

    pub fn not(value: Tree) -> Tree {
        Term::Not { value: Box::new(value) }.into()
    }

    pub fn lambda_arg(name: &str) -> Tree {
        Term::LambdaArg { name: name.to_string(), value: None }.into()
    }

    pub fn lambda(params: &[&str], body: Tree) -> Tree {
        Term::Lambda {
            params: params.iter().map(|p| Box::new(Tree::lambda_arg(p))).collect(),
            body: Box::new(body),
        }
        .into()
    }

    pub fn let_in(name: &str, value: Tree, body: Tree) -> Tree {
        Term::Let {
            variable: Box::new(Tree::identifier(name)),
            value: Box::new(value),
            body: Box::new(body),
        }
        .into()
    }

    pub fn define(name: &str, body: Tree) -> Tree {
        Term::Define { name: name.to_string(), body: Box::new(body) }.into()
    }

    /// `callee(args...)`. A single argument is held directly, any other
    /// count is wrapped in a ptuple.
    pub fn apply(callee: Tree, mut args: Vec<Tree>) -> Tree {
        let argument = if args.len() == 1 {
            args.remove(0)
        } else {
            Tree::ptuple(args)
        };
        Term::Apply { callee: Box::new(callee), argument: Box::new(argument) }.into()
    }

    pub fn member(object: Tree, name: &str) -> Tree {
        Term::Member { object: Box::new(object), name: name.to_string() }.into()
    }

    pub fn builtin(name: BuiltinName) -> Tree {
        Term::Builtin { name, receiver: None }.into()
    }

    pub fn array(items: Vec<Tree>) -> Tree {
        Term::Array(boxed(items)).into()
    }

    pub fn vtuple(items: Vec<Tree>) -> Tree {
        Term::VTuple(boxed(items)).into()
    }

    pub fn ptuple(items: Vec<Tree>) -> Tree {
        Term::PTuple(boxed(items)).into()
    }
}

/// Assign fresh ids to every node of `tree` and return them root first.
pub fn flatten(tree: Tree) -> Vec<Node> {
    flatten_rooted(tree).1
}

/// Like [`flatten`], also handing back the root id.
pub fn flatten_rooted(tree: Tree) -> (NodeId, Vec<Node>) {
    let mut out = Vec::new();
    let root = flatten_into(tree, None, &mut out);
    (root, out)
}

fn flatten_into(tree: Tree, parent: Option<(NodeId, Slot)>, out: &mut Vec<Node>) -> NodeId {
    let id = NodeId::fresh();
    let index = out.len();
    // Reserve the slot so the root lands before its descendants.
    out.push(Node::new(id, Term::Missing));
    let term = tree
        .term
        .map_children(|slot, child| flatten_into(*child, Some((id, slot)), out));
    let node = &mut out[index];
    node.term = term;
    node.parent = parent.map(|(p, _)| p);
    node.parent_field = parent.map(|(_, s)| s);
    node.locked = tree.locked;
    node.unlimited = tree.unlimited;
    id
}
