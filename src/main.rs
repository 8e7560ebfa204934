use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use mathe_stylistin::config::Config;
use mathe_stylistin::logging;
use mathe_stylistin::navigation::{HistoryNavigator, Navigator, PracticeMode, PracticeRoute};
use mathe_stylistin::session::{
    AdvanceTicket, DojoSession, MathTaskSession, PracticeSession, SubmitOutcome,
};
use mathe_stylistin::storage::models::AppliedStyling;
use mathe_stylistin::storage::{MemoryStore, ProgressStore, Storage};
use mathe_stylistin::AppState;

const DEFAULT_LOCATION: &str = "/math?topic=mixed";

type CliResult<T> = Result<T, Box<dyn Error>>;
type InputLines = Lines<BufReader<Stdin>>;

#[tokio::main]
async fn main() -> CliResult<()> {
    let _ = dotenvy::dotenv();
    let config = Config::from_env();
    let _log_guard = logging::init_tracing(&config.log_level);

    let store: Arc<dyn ProgressStore> = match Storage::open(&config.db_path) {
        Ok(storage) => {
            tracing::info!(path = %config.db_path.display(), "progress database opened");
            Arc::new(storage)
        }
        Err(err) => {
            tracing::warn!(error = %err, "progress database unavailable, nothing will be saved");
            Arc::new(MemoryStore::new())
        }
    };

    let app = Arc::new(AppState::new(store, config.reward_policy()));
    app.bootstrap()?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = args.first().map(String::as_str).unwrap_or(DEFAULT_LOCATION);

    match command {
        "reset" => {
            app.reset_all_data()?;
            println!("Alle Daten wurden zurückgesetzt.");
        }
        "export" => println!("{}", app.export_json()?),
        "styling" => print_catalog(&app),
        "apply" => {
            let item_id = args.get(1).ok_or("usage: apply <item-id>")?;
            let state = app.apply_styling(AppliedStyling::new(item_id.as_str()))?;
            println!("{}", serde_json::to_string_pretty(&state)?);
        }
        "clear" => {
            app.clear_character()?;
            println!("Alle Stylings entfernt.");
        }
        location => run_practice(Arc::clone(&app), location, config.advance_delay).await?,
    }

    Ok(())
}

fn print_catalog(app: &AppState) {
    let summary = app.unlock_summary();
    println!("Freigeschaltet: {}/{}", summary.unlocked, summary.total);
    for item in app.styling_items() {
        let marker = if item.is_unlocked { " " } else { "🔒" };
        println!("{marker} {:<22} {} {}", item.id, item.asset_reference, item.name);
    }
}

fn open_session(
    app: Arc<AppState>,
    location: &str,
) -> CliResult<Option<Box<dyn PracticeSession>>> {
    let route = PracticeRoute::parse(location);
    let mode = PracticeMode::from_location(location);

    let session: Box<dyn PracticeSession> = match (mode, &route) {
        (_, PracticeRoute::Unknown(_) | PracticeRoute::Missing) => return Ok(None),
        (PracticeMode::MathTask, PracticeRoute::Topic(selection)) => {
            Box::new(MathTaskSession::new(app, *selection)?)
        }
        // subtopics only exist in the dojo
        (PracticeMode::Dojo, _) | (PracticeMode::MathTask, PracticeRoute::Subtopic(_)) => {
            match DojoSession::from_route(&route) {
                Some(session) => Box::new(session),
                None => return Ok(None),
            }
        }
    };
    tracing::info!(?mode, title = %session.title(), "practice started");
    Ok(Some(session))
}

async fn run_practice(app: Arc<AppState>, location: &str, delay: Duration) -> CliResult<()> {
    let mut navigator = HistoryNavigator::new(location);

    let Some(mut session) = open_session(app, location)? else {
        println!("{}", PracticeRoute::parse(location).display_name());
        navigator.leave_practice();
        return Ok(());
    };

    println!("== {} ==", session.title());
    println!("Befehle: skip, next, stats, q");
    print_problem(session.as_ref());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };
        let input = line.trim();

        match input {
            "" => continue,
            "q" | "quit" | "exit" => break,
            "skip" => {
                session.skip()?;
                print_problem(session.as_ref());
                continue;
            }
            "next" => {
                session.next_problem()?;
                print_problem(session.as_ref());
                continue;
            }
            "stats" => {
                print_scoreboard(session.as_ref());
                continue;
            }
            _ => {}
        }

        match submit_input(session.as_mut(), input)? {
            SubmitOutcome::Ignored => {}
            SubmitOutcome::Incorrect { .. } => println!("Leider falsch. Versuch es nochmal!"),
            SubmitOutcome::Correct {
                ticket,
                streak,
                unlocked,
            } => {
                println!("Richtig! Serie: {streak}");
                if let Some(item) = unlocked {
                    println!("Neu freigeschaltet: {} {}", item.asset_reference, item.name);
                }
                if !wait_for_advance(session.as_mut(), &mut lines, ticket, delay).await? {
                    break;
                }
                print_problem(session.as_ref());
            }
        }
    }

    navigator.leave_practice();
    tracing::debug!(location = navigator.location(), "left practice");
    Ok(())
}

/// Numbers pick an option on multiple-choice problems, everything else is
/// submitted as typed.
fn submit_input(session: &mut dyn PracticeSession, input: &str) -> CliResult<SubmitOutcome> {
    let option_count = session
        .current_problem()
        .options
        .as_ref()
        .map(Vec::len)
        .unwrap_or(0);

    match input.parse::<usize>() {
        Ok(choice) if (1..=option_count).contains(&choice) => {
            Ok(session.submit_option(choice - 1)?)
        }
        _ => Ok(session.submit(input)?),
    }
}

/// Shows the correct feedback for `delay`, then advances. `skip` or `next`
/// during the wait supersede the timer. Returns false when the user quits.
async fn wait_for_advance(
    session: &mut dyn PracticeSession,
    lines: &mut InputLines,
    ticket: AdvanceTicket,
    delay: Duration,
) -> CliResult<bool> {
    let deadline = tokio::time::Instant::now() + delay;

    loop {
        tokio::select! {
            _ = tokio::time::sleep_until(deadline) => {
                session.advance(ticket)?;
                return Ok(true);
            }
            line = lines.next_line() => {
                let Some(line) = line? else { return Ok(false) };
                match line.trim() {
                    "q" | "quit" | "exit" => return Ok(false),
                    "skip" => {
                        session.skip()?;
                        return Ok(true);
                    }
                    "next" => {
                        session.next_problem()?;
                        return Ok(true);
                    }
                    other => {
                        // still showing feedback, so this is ignored
                        session.submit(other)?;
                    }
                }
            }
        }
    }
}

fn print_problem(session: &dyn PracticeSession) {
    let problem = session.current_problem();
    println!();
    println!("[Stufe {}] {}", problem.difficulty, problem.question);
    if let Some(options) = &problem.options {
        for (index, option) in options.iter().enumerate() {
            println!("  {}) {}", index + 1, option);
        }
    }
}

fn print_scoreboard(session: &dyn PracticeSession) {
    let board = session.scoreboard();
    print!(
        "Serie: {} | Gelöst: {} | Stufe: {}",
        board.streak, board.solved, board.difficulty
    );
    if let (Some(progress), Some(threshold)) =
        (board.progress_to_next_unlock, board.unlock_threshold)
    {
        print!(" | Nächste Belohnung: {progress}/{threshold}");
    }
    println!();
}
