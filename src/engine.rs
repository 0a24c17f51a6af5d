//! Small-step reduction engine.
//!
//! [`step`] finds the next redex under a node (respecting each type's
//! reduction order) and reduces it; [`eval`] reduces a node directly;
//! [`apply_lambda`] binds one argument. All three are pure: they take a
//! state and return the next one.

pub mod lambda;
pub mod primitives;
mod reduce;
pub mod scope;
pub mod step;
pub mod unparse;

#[cfg(test)]
mod tests;

pub use lambda::{apply_lambda, bind_argument, Bound};
pub use scope::resolve_name;
pub use step::{eval, reduction_order, step};
pub use unparse::{debug_unparse, unparse};
