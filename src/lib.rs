pub mod arena;
pub mod defs;
pub mod tree;
pub mod graph;
pub mod kind;
pub mod error;
pub mod config;
pub mod state;
pub mod engine;
pub mod reducer;
pub mod history;
pub mod victory;

pub use arena::{Node, NodeId, Slot, Store};
pub use config::EngineConfig;
pub use defs::{BuiltinName, NodeType, OpName, Term};
pub use error::{GameError, ReduceError};
pub use history::UndoManager;
pub use kind::{kind, Kind};
pub use reducer::{reduce, reduce_with, Action};
pub use state::{GameState, Level, Region};
pub use tree::Tree;
