//! Node type registry and the term enum.
//!
//! `Term<C>` is generic over how children are held: the store keeps
//! `Term<NodeId>`, the parser-facing tree form keeps `Term<Box<Tree>>`.
//! Everything that needs to know which child slots a node has goes through
//! [`Term::children`], so the graph algorithms never match on node types.

use crate::arena::{NodeId, Slot};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// Type tag of a node. Closed set, one entry per [`Term`] variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeType {
    Number,
    String,
    Boolean,
    Symbol,
    Array,
    Binop,
    Op,
    Conditional,
    Not,
    Identifier,
    Lambda,
    LambdaArg,
    LambdaVar,
    Let,
    Define,
    Apply,
    Member,
    Reference,
    Builtin,
    #[serde(rename = "vtuple")]
    VTuple,
    #[serde(rename = "ptuple")]
    PTuple,
    Missing,
    Note,
    Void,
}

/// How a node type lays out its child slots.
#[derive(Clone, Copy, Debug)]
pub enum SlotLayout {
    Fixed(&'static [Slot]),
    /// `Index(0..n)`, where `n` is the value of the named count field.
    Indexed(&'static str),
    /// `Index(0..n)` followed by the fixed slots.
    IndexedThen(&'static str, &'static [Slot]),
    /// A single slot that only exists while occupied.
    Optional(Slot),
}

/// Static description of a node type.
#[derive(Debug)]
pub struct TypeDef {
    pub name: &'static str,
    pub fields: &'static [&'static str],
    pub slots: SlotLayout,
}

const LEAF: SlotLayout = SlotLayout::Fixed(&[]);

static DEFS: [TypeDef; 24] = [
    TypeDef { name: "number", fields: &["value"], slots: LEAF },
    TypeDef { name: "string", fields: &["value"], slots: LEAF },
    TypeDef { name: "boolean", fields: &["value"], slots: LEAF },
    TypeDef { name: "symbol", fields: &["name"], slots: LEAF },
    TypeDef { name: "array", fields: &["length"], slots: SlotLayout::Indexed("length") },
    TypeDef {
        name: "binop",
        fields: &[],
        slots: SlotLayout::Fixed(&[Slot::Left, Slot::Op, Slot::Right]),
    },
    TypeDef { name: "op", fields: &["name"], slots: LEAF },
    TypeDef {
        name: "conditional",
        fields: &[],
        slots: SlotLayout::Fixed(&[Slot::Condition, Slot::Positive, Slot::Negative]),
    },
    TypeDef { name: "not", fields: &[], slots: SlotLayout::Fixed(&[Slot::Value]) },
    TypeDef { name: "identifier", fields: &["name"], slots: LEAF },
    TypeDef {
        name: "lambda",
        fields: &["arity"],
        slots: SlotLayout::IndexedThen("arity", &[Slot::Body]),
    },
    TypeDef { name: "lambdaArg", fields: &["name"], slots: SlotLayout::Optional(Slot::Value) },
    TypeDef { name: "lambdaVar", fields: &["name"], slots: LEAF },
    TypeDef {
        name: "let",
        fields: &[],
        slots: SlotLayout::Fixed(&[Slot::Variable, Slot::Value, Slot::Body]),
    },
    TypeDef { name: "define", fields: &["name"], slots: SlotLayout::Fixed(&[Slot::Body]) },
    TypeDef {
        name: "apply",
        fields: &[],
        slots: SlotLayout::Fixed(&[Slot::Callee, Slot::Argument]),
    },
    TypeDef { name: "member", fields: &["name"], slots: SlotLayout::Fixed(&[Slot::Object]) },
    TypeDef { name: "reference", fields: &["target"], slots: LEAF },
    TypeDef { name: "builtin", fields: &["name"], slots: SlotLayout::Optional(Slot::Receiver) },
    TypeDef { name: "vtuple", fields: &["size"], slots: SlotLayout::Indexed("size") },
    TypeDef { name: "ptuple", fields: &["size"], slots: SlotLayout::Indexed("size") },
    TypeDef { name: "missing", fields: &[], slots: LEAF },
    TypeDef { name: "note", fields: &["text"], slots: LEAF },
    TypeDef { name: "void", fields: &[], slots: LEAF },
];

impl NodeType {
    pub const ALL: [NodeType; 24] = [
        NodeType::Number,
        NodeType::String,
        NodeType::Boolean,
        NodeType::Symbol,
        NodeType::Array,
        NodeType::Binop,
        NodeType::Op,
        NodeType::Conditional,
        NodeType::Not,
        NodeType::Identifier,
        NodeType::Lambda,
        NodeType::LambdaArg,
        NodeType::LambdaVar,
        NodeType::Let,
        NodeType::Define,
        NodeType::Apply,
        NodeType::Member,
        NodeType::Reference,
        NodeType::Builtin,
        NodeType::VTuple,
        NodeType::PTuple,
        NodeType::Missing,
        NodeType::Note,
        NodeType::Void,
    ];

    pub fn def(self) -> &'static TypeDef {
        &DEFS[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.def().name
    }

    pub fn from_name(name: &str) -> Option<NodeType> {
        NodeType::ALL.iter().copied().find(|ty| ty.name() == name)
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Binary operators understood by `binop` nodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpName {
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Sub,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "&&")]
    And,
    #[serde(rename = "||")]
    Or,
}

impl OpName {
    pub fn symbol(self) -> &'static str {
        match self {
            OpName::Add => "+",
            OpName::Sub => "-",
            OpName::Lt => "<",
            OpName::Gt => ">",
            OpName::Eq => "==",
            OpName::And => "&&",
            OpName::Or => "||",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<OpName> {
        match symbol {
            "+" => Some(OpName::Add),
            "-" => Some(OpName::Sub),
            "<" => Some(OpName::Lt),
            ">" => Some(OpName::Gt),
            "==" => Some(OpName::Eq),
            "&&" => Some(OpName::And),
            "||" => Some(OpName::Or),
            _ => None,
        }
    }
}

impl fmt::Display for OpName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Primitive sequence operations callable through `builtin` nodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BuiltinName {
    Length,
    Get,
    Set,
    With,
    Slice,
    Concat,
    Map,
}

impl BuiltinName {
    pub fn name(self) -> &'static str {
        match self {
            BuiltinName::Length => "length",
            BuiltinName::Get => "get",
            BuiltinName::Set => "set",
            BuiltinName::With => "with",
            BuiltinName::Slice => "slice",
            BuiltinName::Concat => "concat",
            BuiltinName::Map => "map",
        }
    }

    pub fn arity(self) -> usize {
        match self {
            BuiltinName::Length => 1,
            BuiltinName::Get | BuiltinName::Concat | BuiltinName::Map => 2,
            BuiltinName::Set | BuiltinName::With | BuiltinName::Slice => 3,
        }
    }

    pub fn from_name(name: &str) -> Option<BuiltinName> {
        match name {
            "length" => Some(BuiltinName::Length),
            "get" => Some(BuiltinName::Get),
            "set" => Some(BuiltinName::Set),
            "with" => Some(BuiltinName::With),
            "slice" => Some(BuiltinName::Slice),
            "concat" => Some(BuiltinName::Concat),
            "map" => Some(BuiltinName::Map),
            _ => None,
        }
    }
}

impl fmt::Display for BuiltinName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Borrowed view of a primitive field value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Field<'a> {
    Int(i64),
    Bool(bool),
    Text(&'a str),
    Count(usize),
    Id(NodeId),
    Op(OpName),
    Builtin(BuiltinName),
}

/// A term of the object language. Children are held as `C`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "fields", rename_all = "camelCase")]
pub enum Term<C = NodeId> {
    Number(i64),
    #[serde(rename = "string")]
    Str(String),
    Boolean(bool),
    Symbol(String),
    Missing,
    Note(String),
    Void,
    Op(OpName),
    Identifier(String),
    LambdaVar(String),
    Binop {
        left: C,
        op: C,
        right: C,
    },
    Conditional {
        condition: C,
        positive: C,
        negative: C,
    },
    Not {
        value: C,
    },
    Lambda {
        params: SmallVec<[C; 2]>,
        body: C,
    },
    LambdaArg {
        name: String,
        value: Option<C>,
    },
    Let {
        variable: C,
        value: C,
        body: C,
    },
    Define {
        name: String,
        body: C,
    },
    Apply {
        callee: C,
        argument: C,
    },
    Member {
        object: C,
        name: String,
    },
    /// Alias of an array node. The target is not a child.
    Reference(NodeId),
    Builtin {
        name: BuiltinName,
        receiver: Option<C>,
    },
    Array(SmallVec<[C; 4]>),
    #[serde(rename = "vtuple")]
    VTuple(SmallVec<[C; 4]>),
    #[serde(rename = "ptuple")]
    PTuple(SmallVec<[C; 4]>),
}

impl<C> Term<C> {
    pub fn ty(&self) -> NodeType {
        match self {
            Term::Number(_) => NodeType::Number,
            Term::Str(_) => NodeType::String,
            Term::Boolean(_) => NodeType::Boolean,
            Term::Symbol(_) => NodeType::Symbol,
            Term::Missing => NodeType::Missing,
            Term::Note(_) => NodeType::Note,
            Term::Void => NodeType::Void,
            Term::Op(_) => NodeType::Op,
            Term::Identifier(_) => NodeType::Identifier,
            Term::LambdaVar(_) => NodeType::LambdaVar,
            Term::Binop { .. } => NodeType::Binop,
            Term::Conditional { .. } => NodeType::Conditional,
            Term::Not { .. } => NodeType::Not,
            Term::Lambda { .. } => NodeType::Lambda,
            Term::LambdaArg { .. } => NodeType::LambdaArg,
            Term::Let { .. } => NodeType::Let,
            Term::Define { .. } => NodeType::Define,
            Term::Apply { .. } => NodeType::Apply,
            Term::Member { .. } => NodeType::Member,
            Term::Reference(_) => NodeType::Reference,
            Term::Builtin { .. } => NodeType::Builtin,
            Term::Array(_) => NodeType::Array,
            Term::VTuple(_) => NodeType::VTuple,
            Term::PTuple(_) => NodeType::PTuple,
        }
    }

    /// Child slots in enumeration order, paired with the child handle.
    pub fn children(&self) -> SmallVec<[(Slot, &C); 4]> {
        let mut out = SmallVec::new();
        match self {
            Term::Number(_)
            | Term::Str(_)
            | Term::Boolean(_)
            | Term::Symbol(_)
            | Term::Missing
            | Term::Note(_)
            | Term::Void
            | Term::Op(_)
            | Term::Identifier(_)
            | Term::LambdaVar(_)
            | Term::Reference(_) => {}
            Term::Binop { left, op, right } => {
                out.push((Slot::Left, left));
                out.push((Slot::Op, op));
                out.push((Slot::Right, right));
            }
            Term::Conditional { condition, positive, negative } => {
                out.push((Slot::Condition, condition));
                out.push((Slot::Positive, positive));
                out.push((Slot::Negative, negative));
            }
            Term::Not { value } => out.push((Slot::Value, value)),
            Term::Lambda { params, body } => {
                for (i, p) in params.iter().enumerate() {
                    out.push((Slot::Index(i), p));
                }
                out.push((Slot::Body, body));
            }
            Term::LambdaArg { value, .. } => {
                if let Some(v) = value {
                    out.push((Slot::Value, v));
                }
            }
            Term::Let { variable, value, body } => {
                out.push((Slot::Variable, variable));
                out.push((Slot::Value, value));
                out.push((Slot::Body, body));
            }
            Term::Define { body, .. } => out.push((Slot::Body, body)),
            Term::Apply { callee, argument } => {
                out.push((Slot::Callee, callee));
                out.push((Slot::Argument, argument));
            }
            Term::Member { object, .. } => out.push((Slot::Object, object)),
            Term::Builtin { receiver, .. } => {
                if let Some(r) = receiver {
                    out.push((Slot::Receiver, r));
                }
            }
            Term::Array(items) | Term::VTuple(items) | Term::PTuple(items) => {
                for (i, item) in items.iter().enumerate() {
                    out.push((Slot::Index(i), item));
                }
            }
        }
        out
    }

    pub fn child(&self, slot: Slot) -> Option<&C> {
        self.children()
            .into_iter()
            .find(|(s, _)| *s == slot)
            .map(|(_, c)| c)
    }

    pub fn child_mut(&mut self, slot: Slot) -> Option<&mut C> {
        match (self, slot) {
            (Term::Binop { left, .. }, Slot::Left) => Some(left),
            (Term::Binop { op, .. }, Slot::Op) => Some(op),
            (Term::Binop { right, .. }, Slot::Right) => Some(right),
            (Term::Conditional { condition, .. }, Slot::Condition) => Some(condition),
            (Term::Conditional { positive, .. }, Slot::Positive) => Some(positive),
            (Term::Conditional { negative, .. }, Slot::Negative) => Some(negative),
            (Term::Not { value }, Slot::Value) => Some(value),
            (Term::Lambda { params, .. }, Slot::Index(i)) => params.get_mut(i),
            (Term::Lambda { body, .. }, Slot::Body) => Some(body),
            (Term::LambdaArg { value, .. }, Slot::Value) => value.as_mut(),
            (Term::Let { variable, .. }, Slot::Variable) => Some(variable),
            (Term::Let { value, .. }, Slot::Value) => Some(value),
            (Term::Let { body, .. }, Slot::Body) => Some(body),
            (Term::Define { body, .. }, Slot::Body) => Some(body),
            (Term::Apply { callee, .. }, Slot::Callee) => Some(callee),
            (Term::Apply { argument, .. }, Slot::Argument) => Some(argument),
            (Term::Member { object, .. }, Slot::Object) => Some(object),
            (Term::Builtin { receiver, .. }, Slot::Receiver) => receiver.as_mut(),
            (Term::Array(items), Slot::Index(i))
            | (Term::VTuple(items), Slot::Index(i))
            | (Term::PTuple(items), Slot::Index(i)) => items.get_mut(i),
            _ => None,
        }
    }

    /// Rebuild the term with every child passed through `f`, in slot order.
    pub fn map_children<D>(self, mut f: impl FnMut(Slot, C) -> D) -> Term<D> {
        fn indexed<C, D, A: smallvec::Array<Item = D>>(
            items: impl IntoIterator<Item = C>,
            f: &mut impl FnMut(Slot, C) -> D,
        ) -> SmallVec<A> {
            items
                .into_iter()
                .enumerate()
                .map(|(i, c)| f(Slot::Index(i), c))
                .collect()
        }

        match self {
            Term::Number(n) => Term::Number(n),
            Term::Str(s) => Term::Str(s),
            Term::Boolean(b) => Term::Boolean(b),
            Term::Symbol(s) => Term::Symbol(s),
            Term::Missing => Term::Missing,
            Term::Note(s) => Term::Note(s),
            Term::Void => Term::Void,
            Term::Op(op) => Term::Op(op),
            Term::Identifier(s) => Term::Identifier(s),
            Term::LambdaVar(s) => Term::LambdaVar(s),
            Term::Reference(target) => Term::Reference(target),
            Term::Binop { left, op, right } => {
                let left = f(Slot::Left, left);
                let op = f(Slot::Op, op);
                let right = f(Slot::Right, right);
                Term::Binop { left, op, right }
            }
            Term::Conditional { condition, positive, negative } => {
                let condition = f(Slot::Condition, condition);
                let positive = f(Slot::Positive, positive);
                let negative = f(Slot::Negative, negative);
                Term::Conditional { condition, positive, negative }
            }
            Term::Not { value } => Term::Not { value: f(Slot::Value, value) },
            Term::Lambda { params, body } => {
                let params = indexed(params, &mut f);
                let body = f(Slot::Body, body);
                Term::Lambda { params, body }
            }
            Term::LambdaArg { name, value } => Term::LambdaArg {
                name,
                value: value.map(|v| f(Slot::Value, v)),
            },
            Term::Let { variable, value, body } => {
                let variable = f(Slot::Variable, variable);
                let value = f(Slot::Value, value);
                let body = f(Slot::Body, body);
                Term::Let { variable, value, body }
            }
            Term::Define { name, body } => Term::Define { name, body: f(Slot::Body, body) },
            Term::Apply { callee, argument } => {
                let callee = f(Slot::Callee, callee);
                let argument = f(Slot::Argument, argument);
                Term::Apply { callee, argument }
            }
            Term::Member { object, name } => Term::Member { object: f(Slot::Object, object), name },
            Term::Builtin { name, receiver } => Term::Builtin {
                name,
                receiver: receiver.map(|r| f(Slot::Receiver, r)),
            },
            Term::Array(items) => Term::Array(indexed(items, &mut f)),
            Term::VTuple(items) => Term::VTuple(indexed(items, &mut f)),
            Term::PTuple(items) => Term::PTuple(indexed(items, &mut f)),
        }
    }

    /// Primitive field lookup by the names listed in the registry.
    pub fn field(&self, name: &str) -> Option<Field<'_>> {
        match (self, name) {
            (Term::Number(n), "value") => Some(Field::Int(*n)),
            (Term::Str(s), "value") => Some(Field::Text(s)),
            (Term::Boolean(b), "value") => Some(Field::Bool(*b)),
            (Term::Symbol(s), "name")
            | (Term::Identifier(s), "name")
            | (Term::LambdaVar(s), "name")
            | (Term::LambdaArg { name: s, .. }, "name")
            | (Term::Define { name: s, .. }, "name")
            | (Term::Member { name: s, .. }, "name") => Some(Field::Text(s)),
            (Term::Note(s), "text") => Some(Field::Text(s)),
            (Term::Op(op), "name") => Some(Field::Op(*op)),
            (Term::Builtin { name, .. }, "name") => Some(Field::Builtin(*name)),
            (Term::Reference(target), "target") => Some(Field::Id(*target)),
            (Term::Lambda { params, .. }, "arity") => Some(Field::Count(params.len())),
            (Term::Array(items), "length")
            | (Term::VTuple(items), "size")
            | (Term::PTuple(items), "size") => Some(Field::Count(items.len())),
            _ => None,
        }
    }

    /// Same type and identical primitive fields. Children are not compared.
    pub fn same_fields<D>(&self, other: &Term<D>) -> bool {
        let ty = self.ty();
        ty == other.ty()
            && ty
                .def()
                .fields
                .iter()
                .all(|name| self.field(name) == other.field(name))
    }

    /// Slot names this term must expose, computed from the registry.
    pub fn expected_slots(&self) -> SmallVec<[Slot; 4]> {
        let count = |field: &str| match self.field(field) {
            Some(Field::Count(n)) => n,
            _ => 0,
        };
        let mut out = SmallVec::new();
        match self.ty().def().slots {
            SlotLayout::Fixed(slots) => out.extend(slots.iter().copied()),
            SlotLayout::Indexed(field) => out.extend((0..count(field)).map(Slot::Index)),
            SlotLayout::IndexedThen(field, slots) => {
                out.extend((0..count(field)).map(Slot::Index));
                out.extend(slots.iter().copied());
            }
            SlotLayout::Optional(slot) => {
                if self.children().iter().any(|(s, _)| *s == slot) {
                    out.push(slot);
                }
            }
        }
        out
    }

    pub fn name(&self) -> Option<&str> {
        match self.field("name") {
            Some(Field::Text(s)) => Some(s),
            _ => None,
        }
    }
}

impl Term<NodeId> {
    pub fn child_ids(&self) -> SmallVec<[NodeId; 4]> {
        self.children().into_iter().map(|(_, id)| *id).collect()
    }

    pub fn slot_of(&self, child: NodeId) -> Option<Slot> {
        self.children()
            .into_iter()
            .find(|(_, id)| **id == child)
            .map(|(slot, _)| slot)
    }
}
