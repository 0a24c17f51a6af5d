//! Goal matching.

use crate::arena::{NodeId, Store};
use crate::graph;
use crate::kind::{kind, Kind};
use crate::state::GameState;

/// Decorative board nodes (notes, ops, bare syntax) never count.
pub fn ignore_for_victory(store: &Store, id: NodeId) -> bool {
    kind(store, id) == Kind::Syntax
}

/// Pair every counted board node with a distinct, deep-equal goal node.
/// Returns the pairs on success; `None` when the board does not match.
pub fn matching(state: &GameState) -> Option<Vec<(NodeId, NodeId)>> {
    let counted: Vec<NodeId> = state
        .board
        .iter()
        .copied()
        .filter(|id| !state.is_pending_removal(*id) && !ignore_for_victory(&state.nodes, *id))
        .collect();
    if counted.len() != state.goal.len() {
        return None;
    }
    let mut free: Vec<NodeId> = state.goal.iter().copied().collect();
    let mut pairs = Vec::with_capacity(counted.len());
    for b in counted {
        let pos = free.iter().position(|g| graph::equal(&state.nodes, b, *g))?;
        pairs.push((b, free.swap_remove(pos)));
    }
    Some(pairs)
}

pub fn check(state: &GameState) -> bool {
    matching(state).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Level;
    use crate::tree::Tree;

    fn state(board: Vec<Tree>, goal: Vec<Tree>) -> GameState {
        GameState::start(Level { board, goal, ..Level::default() })
    }

    #[test]
    fn test_matches_regardless_of_order() {
        let s = state(
            vec![Tree::number(2), Tree::string("a")],
            vec![Tree::string("a"), Tree::number(2)],
        );
        assert!(check(&s));
        assert_eq!(matching(&s).map(|p| p.len()), Some(2));
    }

    #[test]
    fn test_notes_are_ignored() {
        let s = state(vec![Tree::number(2), Tree::note("hint")], vec![Tree::number(2)]);
        assert!(ignore_for_victory(&s.nodes, s.board[1]));
        assert!(check(&s));
    }

    #[test]
    fn test_goal_nodes_are_used_once() {
        let s = state(vec![Tree::number(2), Tree::number(2)], vec![Tree::number(2), Tree::number(3)]);
        assert!(!check(&s));
    }

    #[test]
    fn test_unreduced_board_does_not_win() {
        let sum = Tree::binop(Tree::number(1), crate::defs::OpName::Add, Tree::number(1));
        let s = state(vec![sum], vec![Tree::number(2)]);
        assert!(!check(&s));
    }
}
