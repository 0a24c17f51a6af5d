use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

const DEFAULT_HISTORY_LIMIT: usize = 100;
const DEFAULT_STEP_LIMIT: usize = 1000;

fn env_usize(name: &str) -> Option<usize> {
    std::env::var(name).ok().and_then(|v| v.trim().parse::<usize>().ok())
}

fn history_limit_default() -> usize {
    static LIMIT: OnceLock<usize> = OnceLock::new();
    *LIMIT.get_or_init(|| env_usize("REDUCT_HISTORY_LIMIT").unwrap_or(DEFAULT_HISTORY_LIMIT))
}

fn step_limit_default() -> usize {
    static LIMIT: OnceLock<usize> = OnceLock::new();
    *LIMIT.get_or_init(|| env_usize("REDUCT_STEP_LIMIT").unwrap_or(DEFAULT_STEP_LIMIT))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Upper bound on each of the undo and redo stacks.
    pub history_limit: usize,
    /// Upper bound on steps taken by one auto-execute run.
    pub step_limit: usize,
    /// Break a top-level vtuple result into separate board nodes.
    pub spill_vtuples: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_limit: history_limit_default(),
            step_limit: step_limit_default(),
            spill_vtuples: true,
        }
    }
}
