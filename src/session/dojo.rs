use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::AppResult;
use crate::navigation::PracticeRoute;
use crate::practice::difficulty::{DifficultyPolicy, MIN_DIFFICULTY};
use crate::practice::generator::{check_answer, GenerationConstraints, ProblemGenerator};
use crate::practice::problem::MathProblem;
use crate::practice::subtopics::DojoSubtopic;
use crate::practice::topic::TopicSelection;
use crate::session::{
    AdvanceTicket, PracticeSession, ProblemLoop, Scoreboard, SessionPhase, SubmitOutcome,
};

#[derive(Debug, Clone, Copy)]
enum DojoFocus {
    Topic(TopicSelection),
    Subtopic(&'static DojoSubtopic),
}

/// Free practice. Streak, solved count and difficulty live only in this
/// value; nothing is persisted and nothing unlocks.
pub struct DojoSession<R = StdRng> {
    focus: DojoFocus,
    policy: DifficultyPolicy,
    generator: ProblemGenerator,
    difficulty: u8,
    streak: u32,
    solved: u32,
    rng: R,
    state: ProblemLoop,
}

impl DojoSession<StdRng> {
    pub fn for_topic(selection: TopicSelection) -> Self {
        Self::with_rng(DojoFocus::Topic(selection), StdRng::from_entropy())
    }

    pub fn for_subtopic(subtopic: &'static DojoSubtopic) -> Self {
        Self::with_rng(DojoFocus::Subtopic(subtopic), StdRng::from_entropy())
    }

    /// `None` for routes that do not name a topic or subtopic.
    pub fn from_route(route: &PracticeRoute) -> Option<Self> {
        match route {
            PracticeRoute::Topic(selection) => Some(Self::for_topic(*selection)),
            PracticeRoute::Subtopic(subtopic) => Some(Self::for_subtopic(subtopic)),
            PracticeRoute::Unknown(_) | PracticeRoute::Missing => None,
        }
    }
}

impl<R: Rng> DojoSession<R> {
    pub fn topic_with_rng(selection: TopicSelection, rng: R) -> Self {
        Self::with_rng(DojoFocus::Topic(selection), rng)
    }

    pub fn subtopic_with_rng(subtopic: &'static DojoSubtopic, rng: R) -> Self {
        Self::with_rng(DojoFocus::Subtopic(subtopic), rng)
    }

    fn with_rng(focus: DojoFocus, mut rng: R) -> Self {
        let (policy, difficulty) = match focus {
            DojoFocus::Topic(_) => (DifficultyPolicy::default(), MIN_DIFFICULTY),
            DojoFocus::Subtopic(subtopic) => (
                DifficultyPolicy::default()
                    .within(subtopic.difficulty_min, subtopic.difficulty_max),
                subtopic.starting_difficulty(),
            ),
        };
        let generator = ProblemGenerator::default();
        let problem = make_problem(&generator, focus, difficulty, &mut rng);

        Self {
            focus,
            policy,
            generator,
            difficulty,
            streak: 0,
            solved: 0,
            rng,
            state: ProblemLoop::new(problem),
        }
    }

    pub fn subtopic(&self) -> Option<&'static DojoSubtopic> {
        match self.focus {
            DojoFocus::Subtopic(subtopic) => Some(subtopic),
            DojoFocus::Topic(_) => None,
        }
    }

    pub fn difficulty(&self) -> u8 {
        self.difficulty
    }

    fn fresh_problem(&mut self) -> MathProblem {
        make_problem(&self.generator, self.focus, self.difficulty, &mut self.rng)
    }
}

fn make_problem<R: Rng + ?Sized>(
    generator: &ProblemGenerator,
    focus: DojoFocus,
    difficulty: u8,
    rng: &mut R,
) -> MathProblem {
    match focus {
        DojoFocus::Topic(selection) => {
            let topic = selection.resolve(rng);
            let constraints = GenerationConstraints::NONE;
            generator.generate_with_constraints(rng, topic, difficulty, &constraints)
        }
        DojoFocus::Subtopic(subtopic) => generator.generate_with_constraints(
            rng,
            subtopic.topic,
            difficulty,
            &subtopic.constraints,
        ),
    }
}

impl<R: Rng> PracticeSession for DojoSession<R> {
    fn title(&self) -> String {
        match self.focus {
            DojoFocus::Topic(selection) => format!("Dojo: {}", selection.display_name()),
            DojoFocus::Subtopic(subtopic) => {
                format!("Dojo: {}: {}", subtopic.topic.display_name(), subtopic.name)
            }
        }
    }

    fn current_problem(&self) -> &MathProblem {
        self.state.problem()
    }

    fn phase(&self) -> SessionPhase {
        self.state.phase()
    }

    fn submit(&mut self, answer: &str) -> AppResult<SubmitOutcome> {
        if !self.state.begin_check() {
            return Ok(SubmitOutcome::Ignored);
        }

        let correct = check_answer(self.state.problem(), answer);
        self.difficulty = self.policy.adjust(self.difficulty, correct);

        if correct {
            self.streak = self.streak.saturating_add(1);
            self.solved = self.solved.saturating_add(1);
            Ok(SubmitOutcome::Correct {
                ticket: self.state.finish_correct(),
                streak: self.streak,
                unlocked: None,
            })
        } else {
            self.streak = 0;
            self.state.finish_incorrect();
            Ok(SubmitOutcome::Incorrect { streak: 0 })
        }
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
        self.streak = 0;
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
        Scoreboard {
            streak: self.streak,
            solved: self.solved,
            difficulty: self.difficulty,
            progress_to_next_unlock: None,
            unlock_threshold: None,
        }
    }
}
