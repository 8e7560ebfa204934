use rand::Rng;
use serde::{Deserialize, Serialize};

/// A concrete math topic. `mixed` is not a topic, see [`TopicSelection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
    Addition,
    Subtraction,
    Multiplication,
    Division,
    Geometry,
    Sizes,
}

pub const ALL_TOPICS: [Topic; 6] = [
    Topic::Addition,
    Topic::Subtraction,
    Topic::Multiplication,
    Topic::Division,
    Topic::Geometry,
    Topic::Sizes,
];

impl Topic {
    pub const fn as_str(self) -> &'static str {
        match self {
            Topic::Addition => "addition",
            Topic::Subtraction => "subtraction",
            Topic::Multiplication => "multiplication",
            Topic::Division => "division",
            Topic::Geometry => "geometry",
            Topic::Sizes => "sizes",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "addition" => Some(Topic::Addition),
            "subtraction" => Some(Topic::Subtraction),
            "multiplication" => Some(Topic::Multiplication),
            "division" => Some(Topic::Division),
            "geometry" => Some(Topic::Geometry),
            "sizes" => Some(Topic::Sizes),
            _ => None,
        }
    }

    pub const fn display_name(self) -> &'static str {
        match self {
            Topic::Addition => "Addition",
            Topic::Subtraction => "Subtraktion",
            Topic::Multiplication => "Multiplikation",
            Topic::Division => "Division",
            Topic::Geometry => "Geometrie",
            Topic::Sizes => "Größen",
        }
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the user picked on the topic screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicSelection {
    Concrete(Topic),
    Mixed,
}

impl TopicSelection {
    pub fn parse(s: &str) -> Option<Self> {
        if s.trim().eq_ignore_ascii_case("mixed") {
            return Some(TopicSelection::Mixed);
        }
        Topic::parse(s).map(TopicSelection::Concrete)
    }

    /// Resolves to the topic the next problem is generated for. `Mixed` draws
    /// a fresh topic on every call.
    pub fn resolve<R: Rng + ?Sized>(self, rng: &mut R) -> Topic {
        match self {
            TopicSelection::Concrete(topic) => topic,
            TopicSelection::Mixed => resolve_random_topic(rng),
        }
    }

    pub const fn display_name(self) -> &'static str {
        match self {
            TopicSelection::Concrete(topic) => topic.display_name(),
            TopicSelection::Mixed => "Gemischt",
        }
    }
}

impl From<Topic> for TopicSelection {
    fn from(topic: Topic) -> Self {
        TopicSelection::Concrete(topic)
    }
}

/// Uniform choice over the six concrete topics.
pub fn resolve_random_topic<R: Rng + ?Sized>(rng: &mut R) -> Topic {
    ALL_TOPICS[rng.gen_range(0..ALL_TOPICS.len())]
}
