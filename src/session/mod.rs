//! Session controllers.
//!
//! Both controllers run the same per-problem state machine:
//!
//! ```text
//! AwaitingAnswer -> Checking -> FeedbackCorrect   -> (advance) -> AwaitingAnswer
//!                            -> FeedbackIncorrect -> (submit again)
//! ```
//!
//! `MathTaskSession` writes every answer through `AppState`; `DojoSession`
//! keeps its counters in memory and has no way to reach the app state.

pub mod dojo;
pub mod math_task;

pub use dojo::DojoSession;
pub use math_task::MathTaskSession;

use crate::error::AppResult;
use crate::practice::problem::MathProblem;
use crate::storage::models::StylingItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    AwaitingAnswer,
    Checking,
    FeedbackCorrect,
    FeedbackIncorrect,
}

/// Handed out on a correct answer. Only the ticket of the current problem
/// advances; anything older is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdvanceTicket {
    generation: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Submit arrived while checking or while showing correct feedback.
    Ignored,
    Correct {
        ticket: AdvanceTicket,
        streak: u32,
        unlocked: Option<StylingItem>,
    },
    Incorrect {
        streak: u32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scoreboard {
    pub streak: u32,
    pub solved: u32,
    pub difficulty: u8,
    /// `None` in modes that never unlock anything.
    pub progress_to_next_unlock: Option<u32>,
    pub unlock_threshold: Option<u32>,
}

/// Current problem, phase and ticket generation. Shared by both controllers.
#[derive(Debug, Clone)]
pub(crate) struct ProblemLoop {
    problem: MathProblem,
    phase: SessionPhase,
    generation: u64,
}

impl ProblemLoop {
    pub(crate) fn new(problem: MathProblem) -> Self {
        Self {
            problem,
            phase: SessionPhase::AwaitingAnswer,
            generation: 0,
        }
    }

    pub(crate) fn problem(&self) -> &MathProblem {
        &self.problem
    }

    pub(crate) fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Moves to `Checking`. Returns false when the submit must be ignored.
    pub(crate) fn begin_check(&mut self) -> bool {
        match self.phase {
            SessionPhase::AwaitingAnswer | SessionPhase::FeedbackIncorrect => {
                self.phase = SessionPhase::Checking;
                true
            }
            SessionPhase::Checking | SessionPhase::FeedbackCorrect => false,
        }
    }

    pub(crate) fn finish_correct(&mut self) -> AdvanceTicket {
        self.phase = SessionPhase::FeedbackCorrect;
        AdvanceTicket {
            generation: self.generation,
        }
    }

    pub(crate) fn finish_incorrect(&mut self) {
        self.phase = SessionPhase::FeedbackIncorrect;
    }

    /// Back to `AwaitingAnswer` after a failed check, same problem.
    pub(crate) fn abort_check(&mut self) {
        self.phase = SessionPhase::AwaitingAnswer;
    }

    pub(crate) fn is_current(&self, ticket: AdvanceTicket) -> bool {
        self.phase == SessionPhase::FeedbackCorrect && ticket.generation == self.generation
    }

    /// Installs a new problem and invalidates every outstanding ticket.
    pub(crate) fn replace_problem(&mut self, problem: MathProblem) {
        self.generation += 1;
        self.problem = problem;
        self.phase = SessionPhase::AwaitingAnswer;
    }
}

/// What the front-end drives. Implemented by both controllers.
pub trait PracticeSession {
    fn title(&self) -> String;

    fn current_problem(&self) -> &MathProblem;

    fn phase(&self) -> SessionPhase;

    fn submit(&mut self, answer: &str) -> AppResult<SubmitOutcome>;

    /// Submits the option at `index` of a multiple-choice problem. An index
    /// outside the options is ignored.
    fn submit_option(&mut self, index: usize) -> AppResult<SubmitOutcome> {
        let answer = match self.current_problem().option(index) {
            Some(option) => option.to_string(),
            None => return Ok(SubmitOutcome::Ignored),
        };
        self.submit(&answer)
    }

    /// Moves to the next problem if `ticket` is still current.
    fn advance(&mut self, ticket: AdvanceTicket) -> AppResult<bool>;

    /// Resets the streak and moves to a fresh problem.
    fn skip(&mut self) -> AppResult<()>;

    /// Moves to a fresh problem without touching the streak.
    fn next_problem(&mut self) -> AppResult<()>;

    fn scoreboard(&self) -> Scoreboard;
}
