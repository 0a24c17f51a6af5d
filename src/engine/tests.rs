use super::{apply_lambda, eval, step, unparse};
use crate::arena::{NodeId, Slot};
use crate::config::EngineConfig;
use crate::defs::{BuiltinName, NodeType, OpName, Term};
use crate::error::{GameError, ReduceError};
use crate::kind::{kind, Kind};
use crate::state::{GameState, Level};
use crate::tree::Tree;

fn board(trees: Vec<Tree>) -> GameState {
    GameState::start(Level { board: trees, ..Level::default() })
}

fn cfg() -> EngineConfig {
    EngineConfig::default()
}

fn show(state: &GameState, i: usize) -> String {
    unparse(&state.nodes, state.board[i])
}

/// Step the first board node until it settles.
fn run(mut state: GameState) -> GameState {
    for _ in 0..64 {
        let id = state.board[0];
        if kind(&state.nodes, id) != Kind::Expression {
            return state;
        }
        state = step(&state, id, &cfg()).expect("step");
    }
    panic!("did not settle: {}", show(&state, 0));
}

fn game_error(err: ReduceError) -> GameError {
    match err {
        ReduceError::Game(e) => e,
        other => panic!("expected a game error, got {other}"),
    }
}

#[test]
fn test_arithmetic_steps_inside_out() {
    let sum = Tree::binop(Tree::number(1), OpName::Add, Tree::number(2));
    let s = board(vec![Tree::binop(sum, OpName::Add, Tree::number(3))]);
    let root = s.board[0];

    let s1 = step(&s, root, &cfg()).expect("step");
    assert_eq!(show(&s1, 0), "(3 + 3)");
    assert_eq!(s1.board[0], root);
    assert_eq!(s1.returned.len(), 1);
    assert_eq!(s1.get(s1.returned[0]).parent, Some(root));

    let s2 = step(&s1, root, &cfg()).expect("step");
    assert_eq!(show(&s2, 0), "6");
    assert!(s2.is_pending_removal(root));
    // The previous snapshot is untouched.
    assert_eq!(show(&s1, 0), "(3 + 3)");
}

#[test]
fn test_string_concatenation_and_comparison() {
    let s = board(vec![Tree::binop(Tree::string("ab"), OpName::Add, Tree::string("c"))]);
    assert_eq!(show(&run(s), 0), "\"abc\"");

    let s = board(vec![Tree::binop(Tree::number(2), OpName::Lt, Tree::number(5))]);
    assert_eq!(show(&run(s), 0), "true");

    let s = board(vec![Tree::binop(Tree::symbol("star"), OpName::Eq, Tree::symbol("star"))]);
    assert_eq!(show(&run(s), 0), "true");
}

#[test]
fn test_operand_type_mismatch_blames_right() {
    let s = board(vec![Tree::binop(Tree::number(1), OpName::Add, Tree::boolean(true))]);
    let root = s.board[0];
    let right = s.get(root).child(Slot::Right).expect("right");
    let err = game_error(step(&s, root, &cfg()).unwrap_err());
    assert_eq!(
        err,
        GameError::WrongType { id: right, expected: vec![NodeType::Number], actual: NodeType::Boolean }
    );
}

#[test]
fn test_operand_type_mismatch_blames_left() {
    let s = board(vec![Tree::binop(Tree::boolean(true), OpName::Sub, Tree::number(1))]);
    let root = s.board[0];
    let left = s.get(root).child(Slot::Left).expect("left");
    let err = game_error(step(&s, root, &cfg()).unwrap_err());
    assert!(matches!(err, GameError::WrongType { id, .. } if id == left));
}

#[test]
fn test_conditional_keeps_chosen_branch() {
    let s = board(vec![Tree::conditional(Tree::boolean(false), Tree::number(1), Tree::number(2))]);
    let root = s.board[0];
    let positive = s.get(root).child(Slot::Positive).expect("positive");
    let negative = s.get(root).child(Slot::Negative).expect("negative");
    let next = step(&s, root, &cfg()).expect("step");
    assert_eq!(next.board[0], negative);
    assert!(next.get(negative).parent.is_none());
    assert!(next.is_pending_removal(positive));
    assert!(!next.is_pending_removal(negative));
}

#[test]
fn test_conditional_needs_boolean() {
    let s = board(vec![Tree::conditional(Tree::number(0), Tree::number(1), Tree::number(2))]);
    let root = s.board[0];
    let err = game_error(step(&s, root, &cfg()).unwrap_err());
    assert!(matches!(err, GameError::WrongType { actual: NodeType::Number, .. }));
}

#[test]
fn test_not() {
    let s = board(vec![Tree::not(Tree::not(Tree::boolean(false)))]);
    let root = s.board[0];
    let s1 = step(&s, root, &cfg()).expect("step");
    assert_eq!(show(&s1, 0), "!true");
    assert_eq!(show(&run(s1), 0), "false");
}

#[test]
fn test_let_by_stepping() {
    let body = Tree::binop(Tree::identifier("x"), OpName::Add, Tree::identifier("x"));
    let s = board(vec![Tree::let_in("x", Tree::number(2), body)]);
    assert_eq!(show(&run(s), 0), "4");
}

#[test]
fn test_eval_let_substitutes_whole_body() {
    let body = Tree::binop(Tree::identifier("x"), OpName::Add, Tree::identifier("x"));
    let s = board(vec![Tree::let_in("x", Tree::number(2), body)]);
    let root = s.board[0];
    let next = eval(&s, root, NodeType::Let, &cfg()).expect("eval");
    assert_eq!(show(&next, 0), "(2 + 2)");
    assert!(next.is_pending_removal(root));
}

#[test]
fn test_substitution_respects_shadowing() {
    let inner = Tree::lambda(&["x"], Tree::lambda_var("x"));
    let body = Tree::array(vec![Tree::identifier("x"), inner]);
    let s = board(vec![Tree::let_in("x", Tree::number(1), body)]);
    let root = s.board[0];
    let next = eval(&s, root, NodeType::Let, &cfg()).expect("eval");
    assert_eq!(show(&next, 0), "[1, (x) => x]");
}

#[test]
fn test_inner_let_shadows_outer() {
    let inner = Tree::let_in("x", Tree::number(5), Tree::identifier("x"));
    let s = board(vec![Tree::let_in("x", Tree::number(1), inner)]);
    assert_eq!(show(&run(s), 0), "5");
}

#[test]
fn test_unknown_name() {
    let s = board(vec![Tree::identifier("nope")]);
    let root = s.board[0];
    let err = game_error(step(&s, root, &cfg()).unwrap_err());
    assert_eq!(err, GameError::UnknownName { id: root, name: "nope".into() });
}

#[test]
fn test_global_array_lookup_aliases() {
    let level = Level {
        board: vec![Tree::identifier("xs")],
        globals: vec![("xs".into(), Tree::array(vec![Tree::number(1), Tree::number(2)]))],
        ..Level::default()
    };
    let s = GameState::start(level);
    let next = run(s);
    let result = next.board[0];
    let define = next.globals["xs"];
    let array = next.get(define).child(Slot::Body).expect("body");
    assert_eq!(next.get(result).term, Term::Reference(array));
    assert_eq!(show(&next, 0), "&[1, 2]");
}

#[test]
fn test_global_number_lookup_clones() {
    let level = Level {
        board: vec![Tree::identifier("n")],
        globals: vec![("n".into(), Tree::number(7))],
        ..Level::default()
    };
    let s = GameState::start(level);
    let next = run(s);
    let define = next.globals["n"];
    let original = next.get(define).child(Slot::Body).expect("body");
    assert_ne!(next.board[0], original);
    assert_eq!(show(&next, 0), "7");
}

#[test]
fn test_ptuple_steps_all_children_at_once() {
    let a = Tree::binop(Tree::number(1), OpName::Add, Tree::number(1));
    let b = Tree::binop(Tree::number(2), OpName::Add, Tree::number(2));
    let s = board(vec![Tree::ptuple(vec![a, b, Tree::number(9)])]);
    let root = s.board[0];
    let next = step(&s, root, &cfg()).expect("step");
    assert_eq!(show(&next, 0), "(2, 4, 9)");
    assert_eq!(next.returned.len(), 2);
}

#[test]
fn test_array_steps_one_child_at_a_time() {
    let a = Tree::binop(Tree::number(1), OpName::Add, Tree::number(1));
    let b = Tree::binop(Tree::number(2), OpName::Add, Tree::number(2));
    let s = board(vec![Tree::array(vec![a, b])]);
    let root = s.board[0];
    let next = step(&s, root, &cfg()).expect("step");
    assert_eq!(show(&next, 0), "[2, (2 + 2)]");
}

fn pair_maker() -> Tree {
    let body = Tree::vtuple(vec![Tree::lambda_var("x"), Tree::number(2)]);
    Tree::apply(Tree::lambda(&["x"], body), vec![Tree::number(1)])
}

#[test]
fn test_top_level_vtuple_spills() {
    let s = board(vec![pair_maker(), Tree::number(0)]);
    let root = s.board[0];
    let next = step(&s, root, &cfg()).expect("step");
    assert_eq!(next.board.len(), 3);
    assert_eq!(show(&next, 0), "1");
    assert_eq!(show(&next, 1), "2");
    assert_eq!(show(&next, 2), "0");
}

#[test]
fn test_vtuple_kept_without_spill() {
    let s = board(vec![pair_maker()]);
    let root = s.board[0];
    let config = EngineConfig { spill_vtuples: false, ..cfg() };
    let next = step(&s, root, &config).expect("step");
    assert_eq!(next.board.len(), 1);
    assert_eq!(show(&next, 0), "<1, 2>");
}

#[test]
fn test_missing_operand() {
    let s = board(vec![Tree::binop(Tree::number(1), OpName::Add, Tree::missing())]);
    let root = s.board[0];
    let hole = s.get(root).child(Slot::Right).expect("right");
    let err = game_error(step(&s, root, &cfg()).unwrap_err());
    assert_eq!(err, GameError::MissingNode { id: hole });
}

#[test]
fn test_stepping_a_value_is_an_invariant_error() {
    let s = board(vec![Tree::number(1)]);
    let root = s.board[0];
    assert!(matches!(step(&s, root, &cfg()), Err(ReduceError::Invariant(_))));
}

#[test]
fn test_eval_checks_type_and_readiness() {
    let sum = Tree::binop(Tree::number(1), OpName::Add, Tree::number(2));
    let s = board(vec![Tree::binop(sum, OpName::Add, Tree::number(3))]);
    let root = s.board[0];

    let err = game_error(eval(&s, root, NodeType::Not, &cfg()).unwrap_err());
    assert!(matches!(err, GameError::WrongType { actual: NodeType::Binop, .. }));

    let err = game_error(eval(&s, root, NodeType::Binop, &cfg()).unwrap_err());
    assert!(matches!(err, GameError::InvalidAction { id, .. } if id == root));

    let inner = s.get(root).child(Slot::Left).expect("left");
    let next = eval(&s, inner, NodeType::Binop, &cfg()).expect("eval");
    assert_eq!(show(&next, 0), "(3 + 3)");
}

#[test]
fn test_eval_off_board() {
    let mut s = board(vec![]);
    let id = s.insert_tree(Tree::not(Tree::boolean(true)), None);
    s.toolbox.push_back(id);
    let err = game_error(eval(&s, id, NodeType::Not, &cfg()).unwrap_err());
    assert_eq!(err, GameError::NotOnBoard { id });
}

fn add_one() -> Tree {
    Tree::lambda(&["x"], Tree::binop(Tree::lambda_var("x"), OpName::Add, Tree::number(1)))
}

#[test]
fn test_apply_lambda_drop() {
    let s = board(vec![add_one(), Tree::number(4)]);
    let (lambda, arg) = (s.board[0], s.board[1]);
    let next = apply_lambda(&s, lambda, arg, &cfg()).expect("apply");
    assert_eq!(next.board.len(), 1);
    assert_eq!(show(&next, 0), "(4 + 1)");
    assert!(next.is_pending_removal(lambda));
    assert_eq!(show(&run(next), 0), "5");
}

#[test]
fn test_apply_lambda_partially() {
    let sub = Tree::binop(Tree::lambda_var("x"), OpName::Sub, Tree::lambda_var("y"));
    let s = board(vec![Tree::lambda(&["x", "y"], sub), Tree::number(5)]);
    let (lambda, arg) = (s.board[0], s.board[1]);
    let next = apply_lambda(&s, lambda, arg, &cfg()).expect("apply");
    assert_eq!(next.returned, vec![lambda]);
    assert_eq!(show(&next, 0), "(y) => (5 - y)");
    assert_eq!(kind(&next.nodes, lambda), Kind::Value);
}

#[test]
fn test_apply_lambda_rejects_circular_call() {
    let s = board(vec![Tree::array(vec![add_one()])]);
    let array = s.board[0];
    let lambda = s.get(array).child(Slot::Index(0)).expect("item");
    let err = game_error(apply_lambda(&s, lambda, array, &cfg()).unwrap_err());
    assert_eq!(err, GameError::CircularCall { id: array });
}

#[test]
fn test_apply_lambda_to_itself() {
    let s = board(vec![add_one()]);
    let lambda = s.board[0];
    let err = game_error(apply_lambda(&s, lambda, lambda, &cfg()).unwrap_err());
    assert_eq!(err, GameError::CircularCall { id: lambda });
}

#[test]
fn test_apply_lambda_refuses_goal_argument() {
    let s = GameState::start(Level {
        board: vec![add_one()],
        goal: vec![Tree::number(4)],
        ..Level::default()
    });
    let (lambda, goal) = (s.board[0], s.goal[0]);
    let err = game_error(apply_lambda(&s, lambda, goal, &cfg()).unwrap_err());
    assert!(matches!(err, GameError::InvalidAction { id, .. } if id == goal));
    assert_eq!(s.goal.len(), 1);
    assert!(!s.is_pending_removal(goal));
}

#[test]
fn test_apply_lambda_takes_toolbox_argument() {
    let s = GameState::start(Level {
        board: vec![add_one(), add_one()],
        toolbox: vec![Tree::number(4).unlimited(), Tree::number(7)],
        ..Level::default()
    });
    let (first, second) = (s.board[0], s.board[1]);
    let (unlimited, single) = (s.toolbox[0], s.toolbox[1]);

    let next = apply_lambda(&s, first, unlimited, &cfg()).expect("apply");
    assert_eq!(next.toolbox.len(), 2);
    assert_eq!(next.toolbox[0], unlimited);
    assert!(next.get(unlimited).parent.is_none());
    assert!(!next.is_pending_removal(unlimited));
    assert_eq!(show(&next, 0), "(4 + 1)");

    let next = apply_lambda(&next, second, single, &cfg()).expect("apply");
    assert_eq!(next.toolbox.len(), 1);
    assert_eq!(next.toolbox[0], unlimited);
    assert_eq!(show(&next, 1), "(7 + 1)");
}

#[test]
fn test_too_many_arguments() {
    let call = Tree::apply(add_one(), vec![Tree::number(1), Tree::number(2)]);
    let s = board(vec![call]);
    let root = s.board[0];
    let lambda = s.get(root).child(Slot::Callee).expect("callee");
    let err = game_error(step(&s, root, &cfg()).unwrap_err());
    assert_eq!(err, GameError::AlreadyFullyBound { id: lambda });
}

#[test]
fn test_arguments_flow_into_a_returned_lambda() {
    let sub = Tree::binop(Tree::lambda_var("x"), OpName::Sub, Tree::lambda_var("y"));
    let curried = Tree::lambda(&["x"], Tree::lambda(&["y"], sub));
    let s = board(vec![Tree::apply(curried, vec![Tree::number(10), Tree::number(3)])]);
    let root = s.board[0];
    let next = step(&s, root, &cfg()).expect("step");
    assert_eq!(show(&next, 0), "(10 - 3)");
}

#[test]
fn test_lambda_parameter_shadows_let() {
    let call = Tree::apply(Tree::lambda(&["x"], Tree::identifier("x")), vec![Tree::number(2)]);
    let s = board(vec![Tree::let_in("x", Tree::number(1), call)]);
    assert_eq!(show(&run(s.clone()), 0), "2");

    let root = s.board[0];
    let next = eval(&s, root, NodeType::Let, &cfg()).expect("eval");
    assert_eq!(show(&next, 0), "(x) => x(2)");
    assert_eq!(show(&run(next), 0), "2");
}

#[test]
fn test_apply_expression_with_several_arguments() {
    let sub = Tree::binop(Tree::lambda_var("x"), OpName::Sub, Tree::lambda_var("y"));
    let call = Tree::apply(Tree::lambda(&["x", "y"], sub), vec![Tree::number(9), Tree::number(4)]);
    let s = board(vec![call]);
    let root = s.board[0];
    let next = step(&s, root, &cfg()).expect("step");
    assert_eq!(show(&next, 0), "(9 - 4)");
    assert_eq!(show(&run(next), 0), "5");
}

#[test]
fn test_identifier_argument_is_looked_up_first() {
    let level = Level {
        board: vec![add_one(), Tree::identifier("n")],
        globals: vec![("n".into(), Tree::number(10))],
        ..Level::default()
    };
    let s = GameState::start(level);
    let (lambda, arg) = (s.board[0], s.board[1]);
    let next = apply_lambda(&s, lambda, arg, &cfg()).expect("apply");
    assert_eq!(show(&next, 0), "(10 + 1)");
}

#[test]
fn test_member_length() {
    let arr = Tree::array(vec![Tree::number(1), Tree::number(2), Tree::number(3)]);
    let s = board(vec![Tree::member(arr, "length")]);
    assert_eq!(show(&run(s), 0), "3");
}

#[test]
fn test_member_with_arguments_becomes_bound_builtin() {
    let arr = Tree::array(vec![Tree::number(4), Tree::number(5)]);
    let s = board(vec![Tree::member(arr, "get")]);
    let root = s.board[0];
    let next = step(&s, root, &cfg()).expect("step");
    let bound = next.board[0];
    assert!(matches!(
        next.get(bound).term,
        Term::Builtin { name: BuiltinName::Get, receiver: Some(_) }
    ));
    assert_eq!(kind(&next.nodes, bound), Kind::Value);
}

#[test]
fn test_member_unknown_method() {
    let s = board(vec![Tree::member(Tree::array(vec![]), "frobnicate")]);
    let root = s.board[0];
    let err = game_error(step(&s, root, &cfg()).unwrap_err());
    assert!(matches!(err, GameError::UnknownName { id, .. } if id == root));
}

#[test]
fn test_returned_ids_are_fresh() {
    let s = board(vec![Tree::binop(Tree::number(1), OpName::Add, Tree::number(2))]);
    let root = s.board[0];
    let next = step(&s, root, &cfg()).expect("step");
    let out: NodeId = next.returned[0];
    assert!(!s.nodes.contains(out));
    assert!(next.added.contains_key(&out));
}
