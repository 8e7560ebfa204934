//! Dojo subtopic catalog. Each entry narrows a topic to a difficulty range
//! and a set of generation constraints.

use serde::Serialize;

use crate::practice::generator::{FocusArea, GenerationConstraints, MeasurementType};
use crate::practice::topic::Topic;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DojoSubtopic {
    pub id: &'static str,
    pub topic: Topic,
    pub name: &'static str,
    pub description: &'static str,
    pub difficulty_min: u8,
    pub difficulty_max: u8,
    pub constraints: GenerationConstraints,
}

impl DojoSubtopic {
    /// Starting difficulty for a fresh dojo run.
    pub fn starting_difficulty(&self) -> u8 {
        self.difficulty_min
    }
}

const NONE: GenerationConstraints = GenerationConstraints::NONE;

pub static DOJO_SUBTOPICS: [DojoSubtopic; 17] = [
    // ========== Addition ==========
    DojoSubtopic {
        id: "addition_up_to_100",
        topic: Topic::Addition,
        name: "Bis 100",
        description: "Addition mit Zahlen bis 100",
        difficulty_min: 1,
        difficulty_max: 3,
        constraints: GenerationConstraints { max_number: Some(100), ..NONE },
    },
    DojoSubtopic {
        id: "addition_up_to_1000",
        topic: Topic::Addition,
        name: "Bis 1000",
        description: "Addition mit Zahlen bis 1000",
        difficulty_min: 4,
        difficulty_max: 7,
        constraints: GenerationConstraints { max_number: Some(1000), ..NONE },
    },
    DojoSubtopic {
        id: "addition_with_carry",
        topic: Topic::Addition,
        name: "Mit Übertrag",
        description: "Addition mit Zehnerübertrag",
        difficulty_min: 3,
        difficulty_max: 8,
        constraints: GenerationConstraints { require_carry: true, ..NONE },
    },
    // ========== Subtraction ==========
    DojoSubtopic {
        id: "subtraction_up_to_100",
        topic: Topic::Subtraction,
        name: "Bis 100",
        description: "Subtraktion mit Zahlen bis 100",
        difficulty_min: 1,
        difficulty_max: 3,
        constraints: GenerationConstraints { max_number: Some(100), ..NONE },
    },
    DojoSubtopic {
        id: "subtraction_up_to_1000",
        topic: Topic::Subtraction,
        name: "Bis 1000",
        description: "Subtraktion mit Zahlen bis 1000",
        difficulty_min: 4,
        difficulty_max: 7,
        constraints: GenerationConstraints { max_number: Some(1000), ..NONE },
    },
    DojoSubtopic {
        id: "subtraction_with_borrow",
        topic: Topic::Subtraction,
        name: "Mit Übertrag",
        description: "Subtraktion mit Zehnerübertrag",
        difficulty_min: 3,
        difficulty_max: 8,
        constraints: GenerationConstraints { require_borrow: true, ..NONE },
    },
    // ========== Multiplication ==========
    DojoSubtopic {
        id: "multiplication_times_1_5",
        topic: Topic::Multiplication,
        name: "Einmaleins 1-5",
        description: "1×1 bis 5×10",
        difficulty_min: 1,
        difficulty_max: 5,
        constraints: GenerationConstraints { max_multiplier: Some(5), ..NONE },
    },
    DojoSubtopic {
        id: "multiplication_times_6_10",
        topic: Topic::Multiplication,
        name: "Einmaleins 6-10",
        description: "6×1 bis 10×10",
        difficulty_min: 4,
        difficulty_max: 8,
        constraints: GenerationConstraints {
            min_multiplier: Some(6),
            max_multiplier: Some(10),
            ..NONE
        },
    },
    DojoSubtopic {
        id: "multiplication_mixed",
        topic: Topic::Multiplication,
        name: "Gemischte Aufgaben",
        description: "Alle Einmaleins-Reihen gemischt",
        difficulty_min: 1,
        difficulty_max: 10,
        constraints: GenerationConstraints { max_multiplier: Some(10), ..NONE },
    },
    // ========== Division ==========
    DojoSubtopic {
        id: "division_by_2_5",
        topic: Topic::Division,
        name: "Geteilt durch 2-5",
        description: "Division durch 2, 3, 4, 5",
        difficulty_min: 1,
        difficulty_max: 5,
        constraints: GenerationConstraints { max_divisor: Some(5), ..NONE },
    },
    DojoSubtopic {
        id: "division_by_6_10",
        topic: Topic::Division,
        name: "Geteilt durch 6-10",
        description: "Division durch 6, 7, 8, 9, 10",
        difficulty_min: 4,
        difficulty_max: 8,
        constraints: GenerationConstraints {
            min_divisor: Some(6),
            max_divisor: Some(10),
            ..NONE
        },
    },
    DojoSubtopic {
        id: "division_with_remainder",
        topic: Topic::Division,
        name: "Mit Rest",
        description: "Division mit Rest",
        difficulty_min: 3,
        difficulty_max: 10,
        constraints: GenerationConstraints { allow_remainder: true, ..NONE },
    },
    // ========== Geometry ==========
    DojoSubtopic {
        id: "geometry_shape_recognition",
        topic: Topic::Geometry,
        name: "Formen erkennen",
        description: "Geometrische Formen erkennen und benennen",
        difficulty_min: 1,
        difficulty_max: 5,
        constraints: GenerationConstraints {
            focus_area: Some(FocusArea::ShapeRecognition),
            ..NONE
        },
    },
    DojoSubtopic {
        id: "geometry_vertices_edges",
        topic: Topic::Geometry,
        name: "Ecken und Kanten zählen",
        description: "Anzahl der Ecken und Kanten bestimmen",
        difficulty_min: 3,
        difficulty_max: 8,
        constraints: GenerationConstraints {
            focus_area: Some(FocusArea::VerticesEdges),
            ..NONE
        },
    },
    // ========== Sizes ==========
    DojoSubtopic {
        id: "sizes_length",
        topic: Topic::Sizes,
        name: "Längen (cm, m)",
        description: "Längen messen und umrechnen",
        difficulty_min: 1,
        difficulty_max: 6,
        constraints: GenerationConstraints {
            measurement_type: Some(MeasurementType::Length),
            ..NONE
        },
    },
    DojoSubtopic {
        id: "sizes_weight",
        topic: Topic::Sizes,
        name: "Gewichte (g, kg)",
        description: "Gewichte messen und umrechnen",
        difficulty_min: 2,
        difficulty_max: 7,
        constraints: GenerationConstraints {
            measurement_type: Some(MeasurementType::Weight),
            ..NONE
        },
    },
    DojoSubtopic {
        id: "sizes_time",
        topic: Topic::Sizes,
        name: "Zeit (min, h)",
        description: "Zeit ablesen und umrechnen",
        difficulty_min: 2,
        difficulty_max: 8,
        constraints: GenerationConstraints {
            measurement_type: Some(MeasurementType::Time),
            ..NONE
        },
    },
];

pub fn subtopic_by_id(id: &str) -> Option<&'static DojoSubtopic> {
    DOJO_SUBTOPICS.iter().find(|subtopic| subtopic.id == id)
}

pub fn subtopics_by_topic(topic: Topic) -> Vec<&'static DojoSubtopic> {
    DOJO_SUBTOPICS
        .iter()
        .filter(|subtopic| subtopic.topic == topic)
        .collect()
}

/// Topics that have at least one subtopic, in catalog order.
pub fn topics_with_subtopics() -> Vec<Topic> {
    let mut topics = Vec::new();
    for subtopic in DOJO_SUBTOPICS.iter() {
        if !topics.contains(&subtopic.topic) {
            topics.push(subtopic.topic);
        }
    }
    topics
}
