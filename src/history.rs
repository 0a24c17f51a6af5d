//! Undo/redo over whole-state snapshots.
//!
//! Every recorded action pushes the previous [`GameState`] (plus a
//! caller-owned auxiliary value) onto a bounded past stack. Snapshots share
//! structure through the persistent store, so an entry costs only what the
//! action changed.
//!
//! Player mistakes never reach the caller as `Err`: a [`GameError`] is kept
//! on the manager for display and the state stays at the last good
//! snapshot. Invariant violations do propagate.

use crate::arena::NodeId;
use crate::config::EngineConfig;
use crate::error::{GameError, ReduceError, Result};
use crate::reducer::{reduce_with, Action};
use crate::state::GameState;
use std::collections::VecDeque;

#[derive(Clone, Debug)]
struct Entry<A> {
    state: GameState,
    aux: A,
}

#[derive(Debug)]
pub struct UndoManager<A = ()> {
    present: GameState,
    aux: A,
    past: VecDeque<Entry<A>>,
    future: Vec<Entry<A>>,
    error: Option<GameError>,
    config: EngineConfig,
}

impl<A: Clone + Default> Default for UndoManager<A> {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl<A: Clone + Default> UndoManager<A> {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            present: GameState::new(),
            aux: A::default(),
            past: VecDeque::new(),
            future: Vec::new(),
            error: None,
            config,
        }
    }

    pub fn state(&self) -> &GameState {
        &self.present
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The last intercepted player error, until `ClearError`.
    pub fn error(&self) -> Option<&GameError> {
        self.error.as_ref()
    }

    pub fn aux(&self) -> &A {
        &self.aux
    }

    /// Replace the auxiliary value travelling with the present snapshot.
    pub fn set_aux(&mut self, aux: A) {
        self.aux = aux;
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    pub fn past_len(&self) -> usize {
        self.past.len()
    }

    pub fn future_len(&self) -> usize {
        self.future.len()
    }

    pub fn dispatch(&mut self, action: Action) -> Result<&GameState> {
        self.commit(action)?;
        Ok(&self.present)
    }

    /// Dispatch and report whether the action was accepted.
    fn commit(&mut self, action: Action) -> Result<bool> {
        match action {
            Action::Undo => {
                self.undo();
                return Ok(true);
            }
            Action::Redo => {
                self.redo();
                return Ok(true);
            }
            Action::ClearError => {
                self.error = None;
                return Ok(true);
            }
            _ => {}
        }

        let next = match reduce_with(&self.present, &action, &self.config) {
            Ok(next) => next,
            Err(ReduceError::Game(err)) => {
                tracing::warn!(action = action.name(), error = %err, "rejected");
                self.error = Some(err);
                return Ok(false);
            }
            Err(err) => return Err(err),
        };

        if matches!(action, Action::StartLevel { .. }) {
            self.past.clear();
            self.future.clear();
            self.error = None;
            self.present = next;
            return Ok(true);
        }

        if action.records_history() && next != self.present {
            let previous = std::mem::replace(&mut self.present, next);
            self.past.push_back(Entry { state: previous, aux: self.aux.clone() });
            while self.past.len() > self.config.history_limit {
                self.past.pop_front();
            }
            self.future.clear();
            tracing::debug!(action = action.name(), depth = self.past.len(), "recorded");
        } else {
            self.present = next;
        }
        Ok(true)
    }

    fn undo(&mut self) {
        let Some(entry) = self.past.pop_back() else {
            return;
        };
        let current = Entry {
            state: std::mem::replace(&mut self.present, entry.state),
            aux: std::mem::replace(&mut self.aux, entry.aux),
        };
        self.future.push(current);
        if self.future.len() > self.config.history_limit {
            self.future.remove(0);
        }
        tracing::debug!(depth = self.past.len(), "undo");
    }

    fn redo(&mut self) {
        let Some(entry) = self.future.pop() else {
            return;
        };
        let current = Entry {
            state: std::mem::replace(&mut self.present, entry.state),
            aux: std::mem::replace(&mut self.aux, entry.aux),
        };
        self.past.push_back(current);
        while self.past.len() > self.config.history_limit {
            self.past.pop_front();
        }
        tracing::debug!(depth = self.past.len(), "redo");
    }

    /// Mark `id` executing and step everything executing until nothing is
    /// left or the step limit is hit. Returns the number of steps taken.
    ///
    /// A rejected step stops the run and leaves the error on the manager.
    pub fn run_to_completion(&mut self, id: NodeId) -> Result<usize> {
        if !self.commit(Action::Execute { id })? {
            return Ok(0);
        }
        let mut steps = 0;
        while steps < self.config.step_limit {
            let Some(next) = self.present.executing.iter().next().copied() else {
                break;
            };
            let accepted = self.commit(Action::Step { id: next })?;
            steps += 1;
            if !accepted {
                self.commit(Action::Stop { id: next })?;
                break;
            }
        }
        if steps == self.config.step_limit && !self.present.executing.is_empty() {
            tracing::warn!(steps, "step limit reached");
        }
        Ok(steps)
    }
}
