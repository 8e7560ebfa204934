use std::sync::Arc;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::app::{AppState, ProgressPatch};
use crate::error::{AppError, AppResult};
use crate::practice::generator::{check_answer, ProblemGenerator};
use crate::practice::problem::MathProblem;
use crate::practice::topic::TopicSelection;
use crate::session::{
    AdvanceTicket, PracticeSession, ProblemLoop, Scoreboard, SessionPhase, SubmitOutcome,
};
use crate::storage::models::UserProgress;

/// Persisted practice. Every answer is written through [`AppState`] and
/// correct streaks unlock styling items.
pub struct MathTaskSession<R = StdRng> {
    app: Arc<AppState>,
    selection: TopicSelection,
    generator: ProblemGenerator,
    rng: R,
    state: ProblemLoop,
    /// Streak before an unlock check that failed to persist.
    pending_unlock: Option<u32>,
}

impl MathTaskSession<StdRng> {
    pub fn new(app: Arc<AppState>, selection: TopicSelection) -> AppResult<Self> {
        Self::with_rng(app, selection, StdRng::from_entropy())
    }
}

impl<R: Rng> MathTaskSession<R> {
    pub fn with_rng(app: Arc<AppState>, selection: TopicSelection, mut rng: R) -> AppResult<Self> {
        if !app.load_state().is_ready() {
            return Err(AppError::NotReady);
        }
        let generator = ProblemGenerator::new(app.difficulty_policy());
        let problem = make_problem(&app, &generator, selection, &mut rng);

        Ok(Self {
            app,
            selection,
            generator,
            rng,
            state: ProblemLoop::new(problem),
            pending_unlock: None,
        })
    }

    pub fn selection(&self) -> TopicSelection {
        self.selection
    }

    fn fresh_problem(&mut self) -> MathProblem {
        make_problem(&self.app, &self.generator, self.selection, &mut self.rng)
    }

    /// Records the answer in a single progress write. After that write the
    /// problem counts as solved whatever happens next: a failed unlock check
    /// is retried on the next correct answer instead of re-arming the problem.
    fn on_correct(&mut self) -> AppResult<SubmitOutcome> {
        let topic = self.state.problem().topic;
        let policy = self.app.difficulty_policy();
        let now = Utc::now();

        let mut previous_streak = 0;
        let progress = self.app.modify_user_progress(|progress| {
            previous_streak = progress.correct_answers_streak;
            progress.correct_answers_streak = progress.correct_answers_streak.saturating_add(1);
            progress.total_correct_answers = progress.total_correct_answers.saturating_add(1);
            progress.last_session_date = Some(now);
            let next = policy.adjust(progress.difficulty_for(topic), true);
            progress.set_difficulty(topic, next);
        })?;
        let ticket = self.state.finish_correct();
        let streak = progress.correct_answers_streak;

        let from = match self.pending_unlock.take() {
            Some(pending) => pending.min(previous_streak),
            None => previous_streak,
        };
        let unlocked = match self.app.check_and_unlock_between(from, streak) {
            Ok(unlocked) => unlocked,
            Err(e) => {
                tracing::warn!(error = %e, streak, "unlock check failed, will retry");
                self.pending_unlock = Some(from);
                None
            }
        };

        tracing::info!(topic = %topic, streak, "correct answer");

        Ok(SubmitOutcome::Correct {
            ticket,
            streak,
            unlocked,
        })
    }

    fn on_incorrect(&mut self) -> AppResult<SubmitOutcome> {
        let topic = self.state.problem().topic;
        let policy = self.app.difficulty_policy();
        let now = Utc::now();

        let progress = self.app.modify_user_progress(|progress| {
            progress.correct_answers_streak = 0;
            progress.total_incorrect_answers = progress.total_incorrect_answers.saturating_add(1);
            progress.last_session_date = Some(now);
            let next = policy.adjust(progress.difficulty_for(topic), false);
            progress.set_difficulty(topic, next);
        })?;
        self.state.finish_incorrect();

        tracing::info!(topic = %topic, "incorrect answer");

        Ok(SubmitOutcome::Incorrect {
            streak: progress.correct_answers_streak,
        })
    }
}

fn make_problem<R: Rng + ?Sized>(
    app: &AppState,
    generator: &ProblemGenerator,
    selection: TopicSelection,
    rng: &mut R,
) -> MathProblem {
    let topic = selection.resolve(rng);
    generator.generate_problem(rng, topic, app.difficulty_for_topic(topic))
}

impl<R: Rng> PracticeSession for MathTaskSession<R> {
    fn title(&self) -> String {
        self.selection.display_name().to_string()
    }

    fn current_problem(&self) -> &MathProblem {
        self.state.problem()
    }

    fn phase(&self) -> SessionPhase {
        self.state.phase()
    }

    fn submit(&mut self, answer: &str) -> AppResult<SubmitOutcome> {
        if !self.state.begin_check() {
            tracing::debug!("submit ignored while busy");
            return Ok(SubmitOutcome::Ignored);
        }

        let result = if check_answer(self.state.problem(), answer) {
            self.on_correct()
        } else {
            self.on_incorrect()
        };

        // only a failed progress write leaves the check open
        if result.is_err() && self.state.phase() == SessionPhase::Checking {
            self.state.abort_check();
        }
        result
    }

    fn advance(&mut self, ticket: AdvanceTicket) -> AppResult<bool> {
        if !self.state.is_current(ticket) {
            return Ok(false);
        }
        let problem = self.fresh_problem();
        self.state.replace_problem(problem);
        Ok(true)
    }

    fn skip(&mut self) -> AppResult<()> {
        self.app.update_user_progress(ProgressPatch::new().streak(0))?;
        tracing::debug!("problem skipped, streak reset");
        let problem = self.fresh_problem();
        self.state.replace_problem(problem);
        Ok(())
    }

    fn next_problem(&mut self) -> AppResult<()> {
        let problem = self.fresh_problem();
        self.state.replace_problem(problem);
        Ok(())
    }

    fn scoreboard(&self) -> Scoreboard {
        let progress = self
            .app
            .user_progress()
            .unwrap_or_else(UserProgress::initial);
        let rewards = self.app.reward_policy();
        Scoreboard {
            streak: progress.correct_answers_streak,
            solved: progress.total_correct_answers,
            difficulty: self.state.problem().difficulty,
            progress_to_next_unlock: Some(
                rewards.progress_to_next_unlock(progress.correct_answers_streak),
            ),
            unlock_threshold: Some(rewards.unlock_threshold()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::practice::rewards::RewardPolicy;
    use crate::practice::topic::Topic;
    use crate::storage::Storage;

    fn create_app() -> Arc<AppState> {
        let storage = Storage::in_memory().expect("Failed to create in-memory storage");
        let app = Arc::new(AppState::new(Arc::new(storage), RewardPolicy::default()));
        app.bootstrap().expect("Failed to bootstrap");
        app
    }

    fn session(app: &Arc<AppState>, topic: Topic) -> MathTaskSession<StdRng> {
        MathTaskSession::with_rng(
            Arc::clone(app),
            TopicSelection::Concrete(topic),
            StdRng::seed_from_u64(3),
        )
        .expect("Failed to start session")
    }

    fn answer_correctly<R: Rng>(session: &mut MathTaskSession<R>) -> SubmitOutcome {
        let answer = session.current_problem().correct_answer.to_string();
        session.submit(&answer).expect("Failed to submit")
    }

    #[test]
    fn test_requires_bootstrapped_app() {
        let storage = Storage::in_memory().unwrap();
        let app = Arc::new(AppState::new(Arc::new(storage), RewardPolicy::default()));
        assert!(matches!(
            MathTaskSession::new(app, TopicSelection::Mixed),
            Err(AppError::NotReady)
        ));
    }

    #[test]
    fn test_correct_answer_persists_progress() {
        let app = create_app();
        let mut session = session(&app, Topic::Addition);

        let outcome = answer_correctly(&mut session);
        assert!(matches!(outcome, SubmitOutcome::Correct { streak: 1, unlocked: None, .. }));
        assert_eq!(session.phase(), SessionPhase::FeedbackCorrect);

        let progress = app.user_progress().unwrap();
        assert_eq!(progress.correct_answers_streak, 1);
        assert_eq!(progress.total_correct_answers, 1);
        assert_eq!(progress.difficulty_for(Topic::Addition), 2);
        assert!(progress.last_session_date.is_some());
    }

    #[test]
    fn test_submit_ignored_during_feedback() {
        let app = create_app();
        let mut session = session(&app, Topic::Addition);
        answer_correctly(&mut session);

        let again = session.submit("whatever").unwrap();
        assert_eq!(again, SubmitOutcome::Ignored);
        assert_eq!(app.user_progress().unwrap().total_correct_answers, 1);
    }

    #[test]
    fn test_incorrect_answer_resets_streak() {
        let app = create_app();
        app.set_difficulty_for_topic(Topic::Subtraction, 3).unwrap();
        let mut session = session(&app, Topic::Subtraction);
        answer_correctly(&mut session);
        let SubmitOutcome::Correct { ticket, .. } = answer_correctly_after_advance(&mut session)
        else {
            panic!("expected correct outcome");
        };
        assert!(session.advance(ticket).unwrap());

        let outcome = session.submit("not a number").unwrap();
        assert_eq!(outcome, SubmitOutcome::Incorrect { streak: 0 });
        assert_eq!(session.phase(), SessionPhase::FeedbackIncorrect);

        let progress = app.user_progress().unwrap();
        assert_eq!(progress.correct_answers_streak, 0);
        assert_eq!(progress.total_incorrect_answers, 1);
        assert_eq!(progress.total_correct_answers, 2);
        assert_eq!(progress.difficulty_for(Topic::Subtraction), 4);

        // retry on the same problem is allowed
        assert!(matches!(answer_correctly(&mut session), SubmitOutcome::Correct { .. }));
    }

    fn answer_correctly_after_advance<R: Rng>(session: &mut MathTaskSession<R>) -> SubmitOutcome {
        session.next_problem().unwrap();
        answer_correctly(session)
    }

    #[test]
    fn test_fifth_correct_answer_unlocks() {
        let app = create_app();
        let mut session = session(&app, Topic::Multiplication);
        let locked_before = app.styling_items().iter().filter(|i| !i.is_unlocked).count();

        let mut unlocked = None;
        for _ in 0..5 {
            match answer_correctly(&mut session) {
                SubmitOutcome::Correct { ticket, unlocked: item, .. } => {
                    unlocked = item.or(unlocked);
                    assert!(session.advance(ticket).unwrap());
                }
                other => panic!("unexpected outcome {other:?}"),
            }
        }

        let item = unlocked.expect("fifth answer unlocks an item");
        assert_eq!(item.id, "color-purple");
        let locked_after = app.styling_items().iter().filter(|i| !i.is_unlocked).count();
        assert_eq!(locked_before - locked_after, 1);
        assert_eq!(session.scoreboard().progress_to_next_unlock, Some(0));
    }

    #[test]
    fn test_skip_resets_streak_and_supersedes_ticket() {
        let app = create_app();
        let mut session = session(&app, Topic::Division);
        let SubmitOutcome::Correct { ticket, .. } = answer_correctly(&mut session) else {
            panic!("expected correct outcome");
        };

        session.skip().unwrap();
        assert_eq!(app.user_progress().unwrap().correct_answers_streak, 0);
        assert_eq!(session.phase(), SessionPhase::AwaitingAnswer);
        assert!(!session.advance(ticket).unwrap());
    }

    #[test]
    fn test_next_problem_keeps_streak() {
        let app = create_app();
        let mut session = session(&app, Topic::Sizes);
        let SubmitOutcome::Correct { ticket, .. } = answer_correctly(&mut session) else {
            panic!("expected correct outcome");
        };
        let old_id = session.current_problem().id.clone();

        session.next_problem().unwrap();
        assert_ne!(session.current_problem().id, old_id);
        assert!(!session.advance(ticket).unwrap());
        assert_eq!(app.user_progress().unwrap().correct_answers_streak, 1);
    }

    #[test]
    fn test_submit_option() {
        let app = create_app();
        let mut session = session(&app, Topic::Geometry);
        // geometry at difficulty 1 is always shape recognition
        let index = session
            .current_problem()
            .options
            .as_ref()
            .and_then(|options| {
                let expected = &session.current_problem().correct_answer;
                options.iter().position(|o| o == expected)
            })
            .expect("multiple choice options");

        assert_eq!(session.submit_option(99).unwrap(), SubmitOutcome::Ignored);
        assert!(matches!(session.submit_option(index).unwrap(), SubmitOutcome::Correct { .. }));
    }
}
