use crate::arena::{NodeId, Store};
use crate::defs::Term;
use rustc_hash::FxHashSet;

const DEBUG_UNPARSE_MAX_DEPTH: usize = 8;
const DEBUG_UNPARSE_MAX_NODES: usize = 200;

/// Render a term in surface syntax, e.g. `(x) => (x + 1)` or `[1, 2]`.
pub fn unparse(store: &Store, id: NodeId) -> String {
    render(store, id, usize::MAX, usize::MAX)
}

/// Like [`unparse`] but cut off past a fixed depth and node count, for logs.
pub fn debug_unparse(store: &Store, id: NodeId) -> String {
    render(store, id, DEBUG_UNPARSE_MAX_DEPTH, DEBUG_UNPARSE_MAX_NODES)
}

fn render(store: &Store, id: NodeId, max_depth: usize, max_nodes: usize) -> String {
    enum Item {
        Node(NodeId, usize),
        Text(&'static str),
        Owned(String),
        /// Leaving a reference target; it may be entered again elsewhere.
        Unsee(NodeId),
    }

    let mut out = String::new();
    let mut budget = max_nodes;
    // Reference targets being rendered, so a self-aliasing array terminates.
    let mut seen: FxHashSet<NodeId> = FxHashSet::default();
    let mut stack = vec![Item::Node(id, 0)];

    // Items are pushed in reverse so they pop in reading order.
    fn push_list(stack: &mut Vec<Item>, open: &'static str, items: &[NodeId], close: &'static str, depth: usize) {
        stack.push(Item::Text(close));
        for (i, item) in items.iter().enumerate().rev() {
            stack.push(Item::Node(*item, depth + 1));
            if i > 0 {
                stack.push(Item::Text(", "));
            }
        }
        stack.push(Item::Text(open));
    }

    while let Some(item) = stack.pop() {
        let (curr, depth) = match item {
            Item::Text(s) => {
                out.push_str(s);
                continue;
            }
            Item::Owned(s) => {
                out.push_str(&s);
                continue;
            }
            Item::Unsee(target) => {
                seen.remove(&target);
                continue;
            }
            Item::Node(curr, depth) => (curr, depth),
        };
        if budget == 0 || depth > max_depth {
            out.push_str("...");
            continue;
        }
        budget -= 1;
        let Some(node) = store.try_get(curr) else {
            out.push_str(&format!("<dangling {curr}>"));
            continue;
        };
        let d = depth;
        match &node.term {
            Term::Number(n) => out.push_str(&n.to_string()),
            Term::Str(s) => out.push_str(&format!("{s:?}")),
            Term::Boolean(b) => out.push_str(if *b { "true" } else { "false" }),
            Term::Symbol(s) => {
                out.push(':');
                out.push_str(s);
            }
            Term::Missing => out.push('_'),
            Term::Note(s) => out.push_str(&format!("/* {s} */")),
            Term::Void => out.push_str("()"),
            Term::Op(op) => out.push_str(op.symbol()),
            Term::Identifier(s) | Term::LambdaVar(s) => out.push_str(s),
            Term::Binop { left, op, right } => {
                stack.push(Item::Text(")"));
                stack.push(Item::Node(*right, d + 1));
                stack.push(Item::Text(" "));
                stack.push(Item::Node(*op, d + 1));
                stack.push(Item::Text(" "));
                stack.push(Item::Node(*left, d + 1));
                stack.push(Item::Text("("));
            }
            Term::Conditional { condition, positive, negative } => {
                stack.push(Item::Text(")"));
                stack.push(Item::Node(*negative, d + 1));
                stack.push(Item::Text(" : "));
                stack.push(Item::Node(*positive, d + 1));
                stack.push(Item::Text(" ? "));
                stack.push(Item::Node(*condition, d + 1));
                stack.push(Item::Text("("));
            }
            Term::Not { value } => {
                stack.push(Item::Node(*value, d + 1));
                stack.push(Item::Text("!"));
            }
            Term::Lambda { params, body } => {
                stack.push(Item::Node(*body, d + 1));
                push_list(&mut stack, "(", params, ") => ", d);
            }
            Term::LambdaArg { name, value } => match value {
                Some(v) => {
                    stack.push(Item::Node(*v, d + 1));
                    stack.push(Item::Owned(format!("{name} = ")));
                }
                None => out.push_str(name),
            },
            Term::Let { variable, value, body } => {
                stack.push(Item::Node(*body, d + 1));
                stack.push(Item::Text(" in "));
                stack.push(Item::Node(*value, d + 1));
                stack.push(Item::Text(" = "));
                stack.push(Item::Node(*variable, d + 1));
                stack.push(Item::Text("let "));
            }
            Term::Define { name, body } => {
                stack.push(Item::Node(*body, d + 1));
                stack.push(Item::Owned(format!("def {name} = ")));
            }
            Term::Apply { callee, argument } => {
                match store.try_get(*argument).map(|a| &a.term) {
                    Some(Term::PTuple(items)) => push_list(&mut stack, "(", items, ")", d),
                    _ => {
                        stack.push(Item::Text(")"));
                        stack.push(Item::Node(*argument, d + 1));
                        stack.push(Item::Text("("));
                    }
                }
                stack.push(Item::Node(*callee, d + 1));
            }
            Term::Member { object, name } => {
                stack.push(Item::Owned(format!(".{name}")));
                stack.push(Item::Node(*object, d + 1));
            }
            Term::Reference(target) => {
                if seen.insert(*target) {
                    stack.push(Item::Unsee(*target));
                    stack.push(Item::Node(*target, d + 1));
                    out.push('&');
                } else {
                    out.push_str("&<cycle>");
                }
            }
            Term::Builtin { name, receiver } => match receiver {
                Some(r) => {
                    stack.push(Item::Owned(format!(".{name}")));
                    stack.push(Item::Node(*r, d + 1));
                }
                None => out.push_str(name.name()),
            },
            Term::Array(items) => push_list(&mut stack, "[", items, "]", d),
            Term::VTuple(items) => push_list(&mut stack, "<", items, ">", d),
            Term::PTuple(items) => push_list(&mut stack, "(", items, ")", d),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defs::OpName;
    use crate::tree::{flatten_rooted, Tree};

    fn load(store: &mut Store, tree: Tree) -> NodeId {
        let (root, nodes) = flatten_rooted(tree);
        for n in nodes {
            store.insert(n);
        }
        root
    }

    #[test]
    fn test_unparse_surface_syntax() {
        let mut s = Store::new();
        let f = load(
            &mut s,
            Tree::lambda(&["x", "y"], Tree::binop(Tree::identifier("x"), OpName::Add, Tree::identifier("y"))),
        );
        assert_eq!(unparse(&s, f), "(x, y) => (x + y)");

        let call = load(
            &mut s,
            Tree::apply(Tree::identifier("f"), vec![Tree::number(1), Tree::string("a")]),
        );
        assert_eq!(unparse(&s, call), "f(1, \"a\")");

        let cond = load(
            &mut s,
            Tree::conditional(Tree::boolean(true), Tree::array(vec![]), Tree::missing()),
        );
        assert_eq!(unparse(&s, cond), "(true ? [] : _)");
    }

    #[test]
    fn test_unparse_self_reference_terminates() {
        let mut s = Store::new();
        let arr = load(&mut s, Tree::array(vec![Tree::number(0)]));
        let r = s.alloc(Term::Reference(arr));
        let first = s.get(arr).child_ids()[0];
        s.set_child(arr, crate::arena::Slot::Index(0), r);
        s.set_parent(first, None);
        assert_eq!(unparse(&s, r), "&[&<cycle>]");
    }
}
