//! Node classification. Drives which nodes can be stepped, dropped into
//! holes, or compared against the goal.

use crate::arena::{NodeId, Store};
use crate::defs::Term;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Kind {
    Expression,
    Value,
    Statement,
    Syntax,
    Placeholder,
}

impl Kind {
    /// Fully reduced or inert: nothing left to step.
    pub fn is_settled(self) -> bool {
        !matches!(self, Kind::Expression | Kind::Placeholder)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Kind::Expression => "expression",
            Kind::Value => "value",
            Kind::Statement => "statement",
            Kind::Syntax => "syntax",
            Kind::Placeholder => "placeholder",
        };
        f.write_str(s)
    }
}

pub fn kind(store: &Store, id: NodeId) -> Kind {
    match &store.get(id).term {
        Term::Number(_)
        | Term::Str(_)
        | Term::Boolean(_)
        | Term::Symbol(_)
        | Term::Reference(_)
        | Term::Builtin { .. } => Kind::Value,
        Term::Missing => Kind::Placeholder,
        Term::Op(_) | Term::LambdaArg { .. } | Term::Note(_) | Term::Void => Kind::Syntax,
        Term::Define { .. } => Kind::Statement,
        Term::Binop { .. }
        | Term::Conditional { .. }
        | Term::Not { .. }
        | Term::Identifier(_)
        | Term::LambdaVar(_)
        | Term::Let { .. }
        | Term::Apply { .. }
        | Term::Member { .. } => Kind::Expression,
        // A lambda is a value until every parameter has been bound.
        Term::Lambda { params, .. } => {
            let waiting = params
                .iter()
                .any(|p| matches!(store.get(*p).term, Term::LambdaArg { value: None, .. }));
            if waiting {
                Kind::Value
            } else {
                Kind::Expression
            }
        }
        Term::Array(items) | Term::VTuple(items) | Term::PTuple(items) => {
            let pending = items
                .iter()
                .any(|item| matches!(kind(store, *item), Kind::Expression | Kind::Placeholder));
            if pending {
                Kind::Expression
            } else {
                Kind::Value
            }
        }
    }
}
