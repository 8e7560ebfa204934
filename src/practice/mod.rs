//! Practice core: pure functions and policies with no persistence.
//!
//! # Components
//! - `topic.rs`: the six concrete topics and the `mixed` selector
//! - `problem.rs`: `MathProblem` and `Answer`
//! - `generator.rs`: problem generation and answer checking
//! - `difficulty.rs`: bounded difficulty step function
//! - `rewards.rs`: streak-based unlock policy
//! - `subtopics.rs`: dojo subtopic catalog

pub mod difficulty;
pub mod generator;
pub mod problem;
pub mod rewards;
pub mod subtopics;
pub mod topic;

pub use difficulty::{adjust_difficulty, DifficultyPolicy, MAX_DIFFICULTY, MIN_DIFFICULTY};
pub use generator::{
    check_answer, FocusArea, GenerationConstraints, MeasurementType, ProblemGenerator,
};
pub use problem::{Answer, MathProblem, ProblemKind};
pub use rewards::{RewardPolicy, DEFAULT_UNLOCK_THRESHOLD};
pub use subtopics::{
    subtopic_by_id, subtopics_by_topic, topics_with_subtopics, DojoSubtopic, DOJO_SUBTOPICS,
};
pub use topic::{resolve_random_topic, Topic, TopicSelection, ALL_TOPICS};
