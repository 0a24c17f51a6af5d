use reduct::engine::unparse;
use reduct::{victory, Action, EngineConfig, Level, OpName, ReduceError, Tree, UndoManager};
use std::process::ExitCode;

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_target(false).try_init();
}

/// Level used when no file is given: `((x) => x + 1)(2)` against a goal of 3.
fn demo_level() -> Level {
    let inc = Tree::lambda(&["x"], Tree::binop(Tree::lambda_var("x"), OpName::Add, Tree::number(1)));
    Level {
        goal: vec![Tree::number(3)],
        board: vec![Tree::apply(inc, vec![Tree::number(2)])],
        ..Level::default()
    }
}

fn load_level(path: &str) -> Result<Level, String> {
    let text = std::fs::read_to_string(path).map_err(|e| format!("{path}: {e}"))?;
    serde_json::from_str(&text).map_err(|e| format!("{path}: {e}"))
}

/// Run every board expression to completion, printing each one. A rejected
/// step is reported and cleared; anything else stops the run.
fn run_board(manager: &mut UndoManager) -> Result<(), ReduceError> {
    let roots: Vec<_> = manager.state().board.iter().copied().collect();
    for id in roots {
        if !manager.state().board.contains(&id) {
            continue;
        }
        println!("> {}", unparse(&manager.state().nodes, id));
        let steps = manager.run_to_completion(id)?;
        println!("  ({steps} steps)");
        if let Some(err) = manager.error() {
            println!("  stuck: {err}");
            manager.dispatch(Action::ClearError)?;
        }
        manager.dispatch(Action::Cleanup { id: None })?;
    }
    Ok(())
}

fn main() -> ExitCode {
    init_tracing();

    let level = match std::env::args().nth(1) {
        Some(path) => match load_level(&path) {
            Ok(level) => level,
            Err(e) => {
                eprintln!("Error: {e}");
                return ExitCode::FAILURE;
            }
        },
        None => demo_level(),
    };

    let mut manager: UndoManager = UndoManager::new(EngineConfig::default());
    if let Err(e) = manager.dispatch(Action::StartLevel { level }) {
        eprintln!("Error: {e}");
        return ExitCode::FAILURE;
    }

    if let Err(e) = run_board(&mut manager) {
        eprintln!("Error: {e}");
        return ExitCode::FAILURE;
    }

    let state = manager.state();
    for id in state.board.iter() {
        println!("= {}", unparse(&state.nodes, *id));
    }
    if victory::check(state) {
        println!("Goal reached.");
        ExitCode::SUCCESS
    } else {
        println!("Goal not reached.");
        ExitCode::from(2)
    }
}
