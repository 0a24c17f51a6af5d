//! Action vocabulary and the pure `(state, action) -> state` dispatcher.

use crate::arena::NodeId;
use crate::config::EngineConfig;
use crate::defs::{NodeType, Term};
use crate::engine;
use crate::error::{GameError, ReduceError, Result};
use crate::graph;
use crate::kind::{kind, Kind};
use crate::state::{GameState, Level, Region};
use crate::tree::Tree;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Action {
    StartLevel { level: Level },
    MoveNodeToBoard { id: NodeId },
    MoveNodeToSlot { id: NodeId, hole: NodeId },
    MoveNodeToDefs { id: NodeId },
    Detach { id: NodeId },
    Raise { id: NodeId },
    Cleanup { id: Option<NodeId> },
    EvalLet { id: NodeId },
    EvalLambda { lambda: NodeId, arg: NodeId },
    EvalOperator { id: NodeId },
    EvalConditional { id: NodeId },
    EvalNot { id: NodeId },
    EvalApply { id: NodeId },
    EvalIdentifier { id: NodeId },
    Step { id: NodeId },
    Execute { id: NodeId },
    Stop { id: NodeId },
    Undo,
    Redo,
    ClearError,
    AddToolboxItem { tree: Tree },
    AddGoalItem { tree: Tree },
    AddBoardItem { trees: Vec<Tree> },
    ChangeGoal { goal: Vec<Tree> },
    UseToolbox { id: NodeId },
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::StartLevel { .. } => "StartLevel",
            Action::MoveNodeToBoard { .. } => "MoveNodeToBoard",
            Action::MoveNodeToSlot { .. } => "MoveNodeToSlot",
            Action::MoveNodeToDefs { .. } => "MoveNodeToDefs",
            Action::Detach { .. } => "Detach",
            Action::Raise { .. } => "Raise",
            Action::Cleanup { .. } => "Cleanup",
            Action::EvalLet { .. } => "EvalLet",
            Action::EvalLambda { .. } => "EvalLambda",
            Action::EvalOperator { .. } => "EvalOperator",
            Action::EvalConditional { .. } => "EvalConditional",
            Action::EvalNot { .. } => "EvalNot",
            Action::EvalApply { .. } => "EvalApply",
            Action::EvalIdentifier { .. } => "EvalIdentifier",
            Action::Step { .. } => "Step",
            Action::Execute { .. } => "Execute",
            Action::Stop { .. } => "Stop",
            Action::Undo => "Undo",
            Action::Redo => "Redo",
            Action::ClearError => "ClearError",
            Action::AddToolboxItem { .. } => "AddToolboxItem",
            Action::AddGoalItem { .. } => "AddGoalItem",
            Action::AddBoardItem { .. } => "AddBoardItem",
            Action::ChangeGoal { .. } => "ChangeGoal",
            Action::UseToolbox { .. } => "UseToolbox",
        }
    }

    /// Whether a successful dispatch of this action gets an undo entry.
    pub fn records_history(&self) -> bool {
        !matches!(
            self,
            Action::Raise { .. }
                | Action::Cleanup { .. }
                | Action::Stop { .. }
                | Action::ClearError
                | Action::Undo
                | Action::Redo
        )
    }
}

/// Apply one action with the default configuration.
pub fn reduce(state: &GameState, action: &Action) -> Result<GameState> {
    reduce_with(state, action, &EngineConfig::default())
}

pub fn reduce_with(state: &GameState, action: &Action, config: &EngineConfig) -> Result<GameState> {
    tracing::debug!(action = action.name(), "dispatch");
    match action {
        Action::StartLevel { level } => return Ok(GameState::start(level.clone())),
        Action::Undo | Action::Redo | Action::ClearError => return Ok(state.clone()),
        _ => {}
    }
    // `added` and `returned` describe the latest action only.
    let mut base = state.clone();
    base.added.clear();
    base.returned.clear();
    match action {
        Action::EvalLet { id } => engine::eval(&base, *id, NodeType::Let, config),
        Action::EvalOperator { id } => engine::eval(&base, *id, NodeType::Binop, config),
        Action::EvalConditional { id } => engine::eval(&base, *id, NodeType::Conditional, config),
        Action::EvalNot { id } => engine::eval(&base, *id, NodeType::Not, config),
        Action::EvalApply { id } => engine::eval(&base, *id, NodeType::Apply, config),
        Action::EvalIdentifier { id } => {
            require(&base, *id)?;
            let expected = match base.get(*id).ty() {
                NodeType::LambdaVar => NodeType::LambdaVar,
                _ => NodeType::Identifier,
            };
            engine::eval(&base, *id, expected, config)
        }
        Action::EvalLambda { lambda, arg } => engine::apply_lambda(&base, *lambda, *arg, config),
        Action::Step { id } => step(&base, *id, config),
        _ => {
            edit(&mut base, action)?;
            Ok(base)
        }
    }
}

fn require(state: &GameState, id: NodeId) -> Result<()> {
    if state.nodes.contains(id) {
        Ok(())
    } else {
        Err(ReduceError::invariant(format!("unknown node {id}")))
    }
}

fn step(state: &GameState, id: NodeId, config: &EngineConfig) -> Result<GameState> {
    require(state, id)?;
    if !state.on_board(id) {
        return Err(GameError::NotOnBoard { id }.into());
    }
    match kind(&state.nodes, id) {
        Kind::Expression => {}
        Kind::Placeholder => return Err(GameError::MissingNode { id }.into()),
        other => return Err(GameError::invalid(id, format!("a {other} has nothing to reduce")).into()),
    }
    // Retiring the stepped node drops it from `executing`, so ask beforehand.
    let was_executing = state.executing.contains(&id);
    let mut next = engine::step(state, id, config)?;
    if was_executing {
        let replaced = next.is_pending_removal(id);
        if replaced || kind(&next.nodes, id) != Kind::Expression {
            next.executing.remove(&id);
        }
        if replaced {
            // The node stepped to its results; those still reducible keep running.
            let still_running: Vec<NodeId> = next
                .returned
                .iter()
                .copied()
                .filter(|r| kind(&next.nodes, *r) == Kind::Expression)
                .collect();
            for r in still_running {
                next.executing.insert(r);
            }
        }
    }
    Ok(next)
}

/// Structural edits: everything that moves nodes around without reducing.
fn edit(state: &mut GameState, action: &Action) -> Result<()> {
    match action {
        Action::MoveNodeToBoard { id } => move_to_board(state, *id),
        Action::MoveNodeToSlot { id, hole } => move_to_slot(state, *id, *hole),
        Action::MoveNodeToDefs { id } => move_to_defs(state, *id),
        Action::Detach { id } => detach(state, *id),
        Action::Raise { id } => {
            if let Some(pos) = state.board.index_of(id) {
                state.board.remove(pos);
                state.board.push_back(*id);
            }
            Ok(())
        }
        Action::Cleanup { id } => {
            state.cleanup(*id);
            Ok(())
        }
        Action::Execute { id } => {
            require(state, *id)?;
            if !state.board.contains(id) {
                return Err(GameError::NotOnBoard { id: *id }.into());
            }
            match kind(&state.nodes, *id) {
                Kind::Expression => {
                    state.executing.insert(*id);
                    Ok(())
                }
                Kind::Placeholder => Err(GameError::MissingNode { id: *id }.into()),
                other => Err(GameError::invalid(*id, format!("a {other} has nothing to run")).into()),
            }
        }
        Action::Stop { id } => {
            state.executing.remove(id);
            Ok(())
        }
        Action::AddToolboxItem { tree } => {
            let id = state.insert_tree(tree.clone(), None);
            state.toolbox.push_back(id);
            Ok(())
        }
        Action::AddGoalItem { tree } => {
            let id = state.insert_tree(tree.clone(), None);
            state.goal.push_back(id);
            Ok(())
        }
        Action::AddBoardItem { trees } => {
            for tree in trees {
                let id = state.insert_tree(tree.clone(), None);
                state.board.push_back(id);
            }
            Ok(())
        }
        Action::ChangeGoal { goal } => {
            let old: Vec<NodeId> = state.goal.iter().copied().collect();
            state.goal.clear();
            for id in old {
                state.retire(id);
            }
            for tree in goal {
                let id = state.insert_tree(tree.clone(), None);
                state.goal.push_back(id);
            }
            Ok(())
        }
        Action::UseToolbox { id } => use_toolbox(state, *id),
        other => Err(ReduceError::invariant(format!("{} is not an edit", other.name()))),
    }
}

fn move_to_board(state: &mut GameState, id: NodeId) -> Result<()> {
    require(state, id)?;
    match state.region_of(id) {
        Some(Region::Toolbox) => {
            let placed = state.take_from_toolbox(id);
            state.board.push_back(placed);
            state.returned.push(placed);
            Ok(())
        }
        Some(Region::Board) => Ok(()),
        Some(Region::Goal) => Err(GameError::invalid(id, "goal nodes cannot be moved").into()),
        None if state.get(id).parent.is_some() => {
            Err(GameError::invalid(id, "detach the node from its parent first").into())
        }
        None => {
            state.board.push_back(id);
            Ok(())
        }
    }
}

fn move_to_slot(state: &mut GameState, id: NodeId, hole: NodeId) -> Result<()> {
    require(state, id)?;
    require(state, hole)?;
    let (parent, slot) = match state.get(hole) {
        h if !matches!(h.term, Term::Missing) => {
            return Err(GameError::invalid(hole, "that slot is already filled").into())
        }
        h => match (h.parent, h.parent_field) {
            (Some(p), Some(s)) => (p, s),
            _ => return Err(GameError::invalid(hole, "a loose hole has no slot to fill").into()),
        },
    };
    if !state.on_board(hole) {
        return Err(GameError::NotOnBoard { id: hole }.into());
    }
    match kind(&state.nodes, id) {
        Kind::Statement | Kind::Syntax => {
            return Err(GameError::invalid(id, "only expressions and values fit in a slot").into())
        }
        _ => {}
    }
    if graph::contains(&state.nodes, id, hole) {
        return Err(GameError::RecursiveNode { id }.into());
    }
    if state.get(id).parent.is_some() && state.get(id).locked {
        return Err(GameError::invalid(id, "that node is locked in place").into());
    }

    let placed = match state.region_of(id) {
        Some(Region::Toolbox) => state.take_from_toolbox(id),
        Some(Region::Goal) => return Err(GameError::invalid(id, "goal nodes cannot be moved").into()),
        Some(Region::Board) => {
            state.take_from_region(id);
            id
        }
        None => {
            if state.get(id).parent.is_some() {
                unplug(state, id);
            }
            id
        }
    };

    state.nodes.update(parent, |n| {
        n.holes.insert(slot, hole);
    });
    state.nodes.set_parent(hole, None);
    state.nodes.set_child(parent, slot, placed);
    state.returned.push(placed);
    Ok(())
}

/// Lift a nested node out of its slot, restoring the hole it filled.
fn unplug(state: &mut GameState, id: NodeId) -> Option<NodeId> {
    let (parent, slot) = {
        let n = state.get(id);
        (n.parent?, n.parent_field?)
    };
    let cached = state.get(parent).holes.get(&slot).copied();
    let hole = match cached {
        Some(h) => {
            state.nodes.update(parent, |n| {
                n.holes.remove(&slot);
            });
            h
        }
        None => state.alloc(Term::Missing, Some(id)),
    };
    state.nodes.set_child(parent, slot, hole);
    state.nodes.set_parent(id, None);
    Some(hole)
}

fn detach(state: &mut GameState, id: NodeId) -> Result<()> {
    require(state, id)?;
    let node = state.get(id);
    if node.parent.is_none() {
        return Err(GameError::invalid(id, "that node is not inside anything").into());
    }
    if node.locked {
        return Err(GameError::invalid(id, "that node is locked in place").into());
    }
    if !state.on_board(id) {
        return Err(GameError::NotOnBoard { id }.into());
    }
    if let Some(hole) = unplug(state, id) {
        state.returned.push(hole);
    }
    state.board.push_back(id);
    Ok(())
}

fn move_to_defs(state: &mut GameState, id: NodeId) -> Result<()> {
    require(state, id)?;
    if !state.board.contains(&id) {
        return Err(GameError::NotOnBoard { id }.into());
    }
    let name = match &state.get(id).term {
        Term::Define { name, .. } => name.clone(),
        other => {
            return Err(GameError::wrong_type(id, &[NodeType::Define], other.ty()).into())
        }
    };
    state.take_from_region(id);
    state.globals.insert(name, id);
    Ok(())
}

fn use_toolbox(state: &mut GameState, id: NodeId) -> Result<()> {
    require(state, id)?;
    if state.region_of(id) != Some(Region::Toolbox) {
        return Err(GameError::invalid(id, "that node is not in the toolbox").into());
    }
    let taken = state.take_from_toolbox(id);
    state.returned.push(taken);
    Ok(())
}
