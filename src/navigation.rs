//! Location parsing for the practice screens.
//!
//! Only two query parameters matter: `topic` and `subtopic`. Anything that
//! does not resolve becomes an explicit `Unknown` route instead of an error.

use crate::practice::subtopics::{subtopic_by_id, DojoSubtopic};
use crate::practice::topic::TopicSelection;

pub const HOME: &str = "/";
pub const DOJO_HOME: &str = "/dojo";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PracticeMode {
    MathTask,
    Dojo,
}

impl PracticeMode {
    pub fn from_location(location: &str) -> Self {
        let path = location.split(['?', '#']).next().unwrap_or_default();
        if path == DOJO_HOME || path.starts_with("/dojo/") {
            PracticeMode::Dojo
        } else {
            PracticeMode::MathTask
        }
    }

    /// Where leaving the practice screen goes.
    pub fn exit_location(self) -> &'static str {
        match self {
            PracticeMode::MathTask => HOME,
            PracticeMode::Dojo => DOJO_HOME,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PracticeRoute {
    Topic(TopicSelection),
    Subtopic(&'static DojoSubtopic),
    Unknown(String),
    Missing,
}

impl PracticeRoute {
    /// `subtopic` wins over `topic` when both are present.
    pub fn parse(location: &str) -> Self {
        if let Some(id) = query_param(location, "subtopic") {
            return match subtopic_by_id(&id) {
                Some(subtopic) => PracticeRoute::Subtopic(subtopic),
                None => PracticeRoute::Unknown(id),
            };
        }

        match query_param(location, "topic") {
            Some(raw) => match TopicSelection::parse(&raw) {
                Some(selection) => PracticeRoute::Topic(selection),
                None => PracticeRoute::Unknown(raw),
            },
            None => PracticeRoute::Missing,
        }
    }

    pub fn display_name(&self) -> String {
        match self {
            PracticeRoute::Topic(selection) => selection.display_name().to_string(),
            PracticeRoute::Subtopic(subtopic) => {
                format!("{}: {}", subtopic.topic.display_name(), subtopic.name)
            }
            PracticeRoute::Unknown(_) | PracticeRoute::Missing => "Unbekanntes Thema".to_string(),
        }
    }
}

/// First value of `key` in the query string, percent-decoded. Empty values
/// count as absent.
pub fn query_param(location: &str, key: &str) -> Option<String> {
    let (_, rest) = location.split_once('?')?;
    let query = rest.split('#').next().unwrap_or_default();

    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| pair.split_once('=').unwrap_or((pair, "")))
        .find(|(k, _)| decode(k) == key)
        .map(|(_, v)| decode(v))
        .filter(|v| !v.trim().is_empty())
}

fn decode(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|decoded| decoded.into_owned())
        .unwrap_or(spaced)
}

/// The host's location plus a setter.
pub trait Navigator {
    fn location(&self) -> &str;
    fn navigate(&mut self, location: &str);

    fn leave_practice(&mut self) {
        let target = PracticeMode::from_location(self.location()).exit_location();
        self.navigate(target);
    }
}

/// In-process navigator that keeps a history stack.
#[derive(Debug, Clone)]
pub struct HistoryNavigator {
    history: Vec<String>,
}

impl HistoryNavigator {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            history: vec![location.into()],
        }
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }
}

impl Navigator for HistoryNavigator {
    fn location(&self) -> &str {
        self.history.last().map(String::as_str).unwrap_or(HOME)
    }

    fn navigate(&mut self, location: &str) {
        self.history.push(location.to_string());
    }
}
