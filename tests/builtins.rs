use reduct::engine::unparse;
use reduct::error::BuiltInFault;
use reduct::{
    kind, reduce, Action, BuiltinName, GameError, GameState, Kind, Level, NodeId, NodeType, OpName,
    ReduceError, Slot, Term, Tree,
};

fn start(board: Vec<Tree>, globals: Vec<(&str, Tree)>) -> GameState {
    GameState::start(Level {
        board,
        globals: globals.into_iter().map(|(n, t)| (n.to_string(), t)).collect(),
        ..Level::default()
    })
}

fn call(name: BuiltinName, args: Vec<Tree>) -> Tree {
    Tree::apply(Tree::builtin(name), args)
}

fn nums(ns: &[i64]) -> Tree {
    Tree::array(ns.iter().map(|n| Tree::number(*n)).collect())
}

/// Step the first board node until it is no longer an expression.
fn settle(mut state: GameState) -> Result<GameState, ReduceError> {
    for _ in 0..64 {
        let id = state.board[0];
        if kind(&state.nodes, id) != Kind::Expression {
            return Ok(state);
        }
        state = reduce(&state, &Action::Step { id })?;
    }
    panic!("did not settle");
}

fn first(state: &GameState) -> String {
    unparse(&state.nodes, state.board[0])
}

fn fault(err: ReduceError) -> (NodeId, BuiltInFault) {
    match err {
        ReduceError::Game(GameError::BuiltInError { id, fault }) => (id, fault),
        other => panic!("expected a built-in fault, got {other:?}"),
    }
}

#[test]
fn test_length_of_array_and_string() {
    let s = settle(start(vec![call(BuiltinName::Length, vec![nums(&[4, 5, 6])])], vec![])).unwrap();
    assert_eq!(first(&s), "3");

    let s = settle(start(vec![call(BuiltinName::Length, vec![Tree::string("héllo")])], vec![])).unwrap();
    assert_eq!(first(&s), "5");
}

#[test]
fn test_length_rejects_numbers() {
    let s = start(vec![call(BuiltinName::Length, vec![Tree::number(4)])], vec![]);
    let err = settle(s).unwrap_err();
    assert!(matches!(
        err,
        ReduceError::Game(GameError::WrongType { actual: NodeType::Number, .. })
    ));
}

#[test]
fn test_get() {
    let s = settle(start(vec![call(BuiltinName::Get, vec![nums(&[10, 20, 30]), Tree::number(1)])], vec![]))
        .unwrap();
    assert_eq!(first(&s), "20");
}

#[test]
fn test_get_out_of_bounds() {
    let s = start(vec![call(BuiltinName::Get, vec![nums(&[10, 20, 30]), Tree::number(5)])], vec![]);
    let root = s.board[0];
    let (id, f) = fault(settle(s).unwrap_err());
    assert_eq!(id, root);
    assert_eq!(f, BuiltInFault::IndexOutOfBounds { index: 5, length: 3 });

    let s = start(vec![call(BuiltinName::Get, vec![nums(&[10]), Tree::number(-1)])], vec![]);
    let (_, f) = fault(settle(s).unwrap_err());
    assert_eq!(f, BuiltInFault::IndexOutOfBounds { index: -1, length: 1 });
}

#[test]
fn test_with_copies() {
    let call = call(BuiltinName::With, vec![nums(&[1, 2, 3]), Tree::number(0), Tree::number(9)]);
    let s = settle(start(vec![call], vec![])).unwrap();
    assert_eq!(first(&s), "[9, 2, 3]");
}

#[test]
fn test_slice() {
    let s = settle(start(
        vec![call(BuiltinName::Slice, vec![nums(&[1, 2, 3, 4]), Tree::number(1), Tree::number(3)])],
        vec![],
    ))
    .unwrap();
    assert_eq!(first(&s), "[2, 3]");

    let s = settle(start(
        vec![call(BuiltinName::Slice, vec![nums(&[1, 2, 3, 4]), Tree::number(2), Tree::number(1)])],
        vec![],
    ))
    .unwrap();
    assert_eq!(first(&s), "[]");
}

#[test]
fn test_slice_bounds() {
    let s = start(
        vec![call(BuiltinName::Slice, vec![nums(&[1, 2]), Tree::number(2), Tree::number(2)])],
        vec![],
    );
    let (_, f) = fault(settle(s).unwrap_err());
    assert_eq!(f, BuiltInFault::StartOutOfBounds { start: 2, length: 2 });

    let s = start(
        vec![call(BuiltinName::Slice, vec![nums(&[1, 2]), Tree::number(0), Tree::number(3)])],
        vec![],
    );
    let (_, f) = fault(settle(s).unwrap_err());
    assert_eq!(f, BuiltInFault::EndOutOfBounds { end: 3, length: 2 });
}

#[test]
fn test_concat() {
    let s = settle(start(vec![call(BuiltinName::Concat, vec![nums(&[1]), nums(&[2, 3])])], vec![])).unwrap();
    assert_eq!(first(&s), "[1, 2, 3]");
}

#[test]
fn test_concat_through_member() {
    let method = Tree::member(nums(&[1, 2]), "concat");
    let s = settle(start(vec![Tree::apply(method, vec![nums(&[3])])], vec![])).unwrap();
    assert_eq!(first(&s), "[1, 2, 3]");
}

#[test]
fn test_map_builds_unevaluated_calls() {
    let inc = Tree::lambda(&["x"], Tree::binop(Tree::lambda_var("x"), OpName::Add, Tree::number(1)));
    let s = start(vec![call(BuiltinName::Map, vec![nums(&[1, 2]), inc])], vec![]);
    let root = s.board[0];
    let s = reduce(&s, &Action::Step { id: root }).unwrap();
    assert_eq!(first(&s), "[(x) => (x + 1)(1), (x) => (x + 1)(2)]");
    assert_eq!(kind(&s.nodes, s.board[0]), Kind::Expression);

    let s = settle(s).unwrap();
    assert_eq!(first(&s), "[2, 3]");
}

#[test]
fn test_set_mutates_the_referenced_array() {
    let set = call(
        BuiltinName::Set,
        vec![Tree::identifier("xs"), Tree::number(0), Tree::number(9)],
    );
    let s = settle(start(vec![set], vec![("xs", nums(&[1, 2, 3]))])).unwrap();
    assert_eq!(first(&s), "&[9, 2, 3]");

    let define = s.globals["xs"];
    let array = s.get(define).child(Slot::Body).unwrap();
    assert_eq!(unparse(&s.nodes, array), "[9, 2, 3]");
    assert_eq!(s.get(s.board[0]).term, Term::Reference(array));
}

#[test]
fn test_set_after_concat_leaves_inputs_alone() {
    let joined = call(BuiltinName::Concat, vec![Tree::identifier("a"), Tree::identifier("b")]);
    let set = call(BuiltinName::Set, vec![Tree::identifier("c"), Tree::number(0), Tree::number(9)]);
    let s = start(
        vec![Tree::let_in("c", joined, set)],
        vec![("a", nums(&[1, 2])), ("b", nums(&[3]))],
    );
    let s = settle(s).unwrap();
    assert_eq!(first(&s), "&[9, 2, 3]");
    for (name, expected) in [("a", "[1, 2]"), ("b", "[3]")] {
        let array = s.get(s.globals[name]).child(Slot::Body).unwrap();
        assert_eq!(unparse(&s.nodes, array), expected);
    }
}

#[test]
fn test_set_needs_a_reference() {
    let set = call(BuiltinName::Set, vec![nums(&[1]), Tree::number(0), Tree::number(9)]);
    let err = settle(start(vec![set], vec![])).unwrap_err();
    assert!(matches!(
        err,
        ReduceError::Game(GameError::WrongType { actual: NodeType::Array, .. })
    ));
}

#[test]
fn test_wrong_argument_count() {
    let s = start(vec![call(BuiltinName::Length, vec![nums(&[1]), nums(&[2])])], vec![]);
    let root = s.board[0];
    let err = settle(s).unwrap_err();
    assert_eq!(
        err,
        ReduceError::Game(GameError::WrongBuiltInParamsCount {
            id: root,
            name: BuiltinName::Length,
            expected: 1,
            actual: 2,
        })
    );
}

#[test]
fn test_failed_builtin_leaves_state_alone() {
    let s = start(vec![call(BuiltinName::Get, vec![nums(&[1]), Tree::number(3)])], vec![]);
    let before = s.clone();
    let root = s.board[0];
    assert!(reduce(&s, &Action::Step { id: root }).is_err());
    assert_eq!(s, before);
}
