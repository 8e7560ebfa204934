//! Problem generation and answer checking.
//!
//! Operand ranges grow monotonically with difficulty. Values are random,
//! structure is not: the same topic, difficulty and constraints always yield
//! the same kind of problem.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::practice::difficulty::DifficultyPolicy;
use crate::practice::problem::{Answer, MathProblem, ProblemKind};
use crate::practice::topic::Topic;

/// Upper bound for the sum / minuend per difficulty level.
const SUM_LIMITS: [i64; 10] = [10, 20, 50, 100, 200, 500, 1000, 2000, 5000, 10000];
/// Upper bound for factors / divisors per difficulty level.
const FACTOR_LIMITS: [i64; 10] = [3, 4, 5, 6, 7, 8, 9, 10, 12, 15];
/// Second factor / quotient range when a multiplier or divisor row is fixed.
const TIMES_TABLE_MAX: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FocusArea {
    ShapeRecognition,
    VerticesEdges,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MeasurementType {
    Length,
    Weight,
    Time,
}

/// Topic-specific narrowing used by dojo subtopics. Fields that do not apply
/// to a topic are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConstraints {
    pub max_number: Option<u32>,
    pub require_carry: bool,
    pub require_borrow: bool,
    pub min_multiplier: Option<u32>,
    pub max_multiplier: Option<u32>,
    pub min_divisor: Option<u32>,
    pub max_divisor: Option<u32>,
    pub allow_remainder: bool,
    pub focus_area: Option<FocusArea>,
    pub measurement_type: Option<MeasurementType>,
}

impl GenerationConstraints {
    pub const NONE: Self = Self {
        max_number: None,
        require_carry: false,
        require_borrow: false,
        min_multiplier: None,
        max_multiplier: None,
        min_divisor: None,
        max_divisor: None,
        allow_remainder: false,
        focus_area: None,
        measurement_type: None,
    };
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ProblemGenerator {
    policy: DifficultyPolicy,
}

impl ProblemGenerator {
    pub fn new(policy: DifficultyPolicy) -> Self {
        Self { policy }
    }

    pub fn generate_problem<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        topic: Topic,
        difficulty: u8,
    ) -> MathProblem {
        self.generate_with_constraints(rng, topic, difficulty, &GenerationConstraints::NONE)
    }

    pub fn generate_with_constraints<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        topic: Topic,
        difficulty: u8,
        constraints: &GenerationConstraints,
    ) -> MathProblem {
        let difficulty = self.policy.clamp(difficulty);
        let level = level_index(difficulty);

        match topic {
            Topic::Addition => addition(rng, difficulty, level, constraints),
            Topic::Subtraction => subtraction(rng, difficulty, level, constraints),
            Topic::Multiplication => multiplication(rng, difficulty, level, constraints),
            Topic::Division => division(rng, difficulty, level, constraints),
            Topic::Geometry => geometry(rng, difficulty, constraints),
            Topic::Sizes => sizes(rng, difficulty, constraints),
        }
    }
}

/// Maps any difficulty onto an index into the per-level tables.
fn level_index(difficulty: u8) -> usize {
    (difficulty.clamp(1, 10) - 1) as usize
}

fn bounded(limit: i64, max_number: Option<u32>) -> i64 {
    match max_number {
        Some(max) => limit.min(i64::from(max)),
        None => limit,
    }
}

// ========== Arithmetic ==========

fn addition<R: Rng + ?Sized>(
    rng: &mut R,
    difficulty: u8,
    level: usize,
    constraints: &GenerationConstraints,
) -> MathProblem {
    let bound = bounded(SUM_LIMITS[level], constraints.max_number);

    let (a, b) = if constraints.require_carry && bound >= 10 {
        pick_sum_with_carry(rng, bound)
    } else {
        pick_sum(rng, bound)
    };

    MathProblem::new(
        Topic::Addition,
        difficulty,
        ProblemKind::Calculation,
        format!("{a} + {b} = ?"),
        a + b,
    )
}

/// Two operands whose sum stays within `bound`.
fn pick_sum<R: Rng + ?Sized>(rng: &mut R, bound: i64) -> (i64, i64) {
    if bound < 2 {
        let a = rng.gen_range(0..=bound.max(0));
        let b = rng.gen_range(0..=(bound.max(0) - a));
        return (a, b);
    }
    let a = rng.gen_range(1..bound);
    let b = rng.gen_range(1..=(bound - a));
    (a, b)
}

/// Operands whose ones digits add up to ten or more. Requires `bound >= 10`.
fn pick_sum_with_carry<R: Rng + ?Sized>(rng: &mut R, bound: i64) -> (i64, i64) {
    let mut a_ones = rng.gen_range(1..=9);
    let mut b_ones = rng.gen_range((10 - a_ones)..=9);
    if a_ones + b_ones > bound {
        a_ones = 1;
        b_ones = 9;
    }

    let tens_budget = (bound - a_ones - b_ones) / 10;
    let tens = rng.gen_range(0..=tens_budget);
    let a_tens = rng.gen_range(0..=tens);
    let b_tens = tens - a_tens;

    (a_tens * 10 + a_ones, b_tens * 10 + b_ones)
}

fn subtraction<R: Rng + ?Sized>(
    rng: &mut R,
    difficulty: u8,
    level: usize,
    constraints: &GenerationConstraints,
) -> MathProblem {
    let bound = bounded(SUM_LIMITS[level], constraints.max_number).max(0);

    let (a, b) = if constraints.require_borrow && bound >= 10 {
        pick_difference_with_borrow(rng, bound)
    } else {
        pick_difference(rng, bound)
    };

    MathProblem::new(
        Topic::Subtraction,
        difficulty,
        ProblemKind::Calculation,
        format!("{a} - {b} = ?"),
        a - b,
    )
}

/// Minuend within `bound`, subtrahend never larger than the minuend.
fn pick_difference<R: Rng + ?Sized>(rng: &mut R, bound: i64) -> (i64, i64) {
    if bound < 1 {
        return (0, 0);
    }
    let a = rng.gen_range(1..=bound);
    let b = rng.gen_range(1..=a);
    (a, b)
}

/// Minuend ones digit smaller than the subtrahend ones digit. Requires `bound >= 10`.
fn pick_difference_with_borrow<R: Rng + ?Sized>(rng: &mut R, bound: i64) -> (i64, i64) {
    let b_ones = rng.gen_range(1..=9);
    let a_ones = rng.gen_range(0..b_ones).min(bound - 10);

    let max_a_tens = (bound - a_ones) / 10;
    let a_tens = rng.gen_range(1..=max_a_tens);
    let b_tens = rng.gen_range(0..a_tens);

    (a_tens * 10 + a_ones, b_tens * 10 + b_ones)
}

fn multiplication<R: Rng + ?Sized>(
    rng: &mut R,
    difficulty: u8,
    level: usize,
    constraints: &GenerationConstraints,
) -> MathProblem {
    let limit = FACTOR_LIMITS[level];
    let row_fixed = constraints.min_multiplier.is_some() || constraints.max_multiplier.is_some();

    let (a, b) = if row_fixed {
        let lo = constraints.min_multiplier.map(i64::from).unwrap_or(1).max(1);
        let hi = constraints.max_multiplier.map(i64::from).unwrap_or(limit).max(lo);
        (rng.gen_range(lo..=hi), rng.gen_range(1..=TIMES_TABLE_MAX))
    } else {
        (rng.gen_range(1..=limit), rng.gen_range(1..=limit))
    };

    MathProblem::new(
        Topic::Multiplication,
        difficulty,
        ProblemKind::Calculation,
        format!("{a} × {b} = ?"),
        a * b,
    )
}

fn division<R: Rng + ?Sized>(
    rng: &mut R,
    difficulty: u8,
    level: usize,
    constraints: &GenerationConstraints,
) -> MathProblem {
    let limit = FACTOR_LIMITS[level];
    let row_fixed = constraints.min_divisor.is_some() || constraints.max_divisor.is_some();

    let (divisor, quotient) = if row_fixed {
        let lo = constraints.min_divisor.map(i64::from).unwrap_or(2).max(1);
        let hi = constraints.max_divisor.map(i64::from).unwrap_or(limit).max(lo);
        (rng.gen_range(lo..=hi), rng.gen_range(1..=TIMES_TABLE_MAX))
    } else {
        (rng.gen_range(2..=limit.max(2)), rng.gen_range(1..=limit))
    };

    if constraints.allow_remainder && divisor > 1 {
        let remainder = rng.gen_range(1..divisor);
        let dividend = divisor * quotient + remainder;
        return MathProblem::new(
            Topic::Division,
            difficulty,
            ProblemKind::TextProblem,
            format!("{dividend} : {divisor} = ? (mit Rest, z.B. \"3 R 1\")"),
            Answer::Text(format!("{quotient} R {remainder}")),
        );
    }

    let dividend = divisor * quotient;
    MathProblem::new(
        Topic::Division,
        difficulty,
        ProblemKind::Calculation,
        format!("{dividend} : {divisor} = ?"),
        quotient,
    )
}

// ========== Geometry ==========

/// Plane shapes with a unique vertex count each, so recognition is unambiguous.
const POLYGONS: [(&str, i64); 6] = [
    ("Kreis", 0),
    ("Dreieck", 3),
    ("Viereck", 4),
    ("Fünfeck", 5),
    ("Sechseck", 6),
    ("Achteck", 8),
];

/// (name with article, vertices, edges)
const SOLIDS: [(&str, i64, i64); 4] = [
    ("ein Würfel", 8, 12),
    ("ein Quader", 8, 12),
    ("eine Pyramide", 5, 8),
    ("ein Dreiecksprisma", 6, 9),
];

fn geometry<R: Rng + ?Sized>(
    rng: &mut R,
    difficulty: u8,
    constraints: &GenerationConstraints,
) -> MathProblem {
    let focus = constraints.focus_area.unwrap_or_else(|| {
        if difficulty <= 3 || rng.gen_bool(0.5) {
            FocusArea::ShapeRecognition
        } else {
            FocusArea::VerticesEdges
        }
    });

    match focus {
        FocusArea::ShapeRecognition => shape_recognition(rng, difficulty),
        FocusArea::VerticesEdges => vertices_edges(rng, difficulty),
    }
}

fn shape_recognition<R: Rng + ?Sized>(rng: &mut R, difficulty: u8) -> MathProblem {
    let pool_size = match difficulty {
        0..=2 => 4,
        3..=5 => 5,
        _ => POLYGONS.len(),
    };
    let option_count = if difficulty <= 2 { 3 } else { 4 };
    let pool = &POLYGONS[..pool_size];

    let (name, vertices) = pool[rng.gen_range(0..pool.len())];

    let mut distractors: Vec<&str> = pool
        .iter()
        .map(|(n, _)| *n)
        .filter(|n| *n != name)
        .collect();
    distractors.shuffle(rng);

    let mut options: Vec<Answer> = distractors
        .into_iter()
        .take(option_count - 1)
        .map(Answer::from)
        .collect();
    options.push(Answer::from(name));
    options.shuffle(rng);

    let question = if vertices == 0 {
        "Welche Form hat keine Ecken?".to_string()
    } else {
        format!("Welche Form hat {vertices} Ecken?")
    };

    MathProblem::new(
        Topic::Geometry,
        difficulty,
        ProblemKind::MultipleChoice,
        question,
        Answer::from(name),
    )
    .with_options(options)
}

fn vertices_edges<R: Rng + ?Sized>(rng: &mut R, difficulty: u8) -> MathProblem {
    let ask_vertices = rng.gen_bool(0.5);

    let (question, answer) = if difficulty <= 4 {
        // Kreis has neither corners nor sides worth counting
        let (name, count) = POLYGONS[rng.gen_range(1..POLYGONS.len())];
        if ask_vertices {
            (format!("Wie viele Ecken hat ein {name}?"), count)
        } else {
            (format!("Wie viele Seiten hat ein {name}?"), count)
        }
    } else {
        let (name, vertices, edges) = SOLIDS[rng.gen_range(0..SOLIDS.len())];
        if ask_vertices {
            (format!("Wie viele Ecken hat {name}?"), vertices)
        } else {
            (format!("Wie viele Kanten hat {name}?"), edges)
        }
    };

    MathProblem::new(
        Topic::Geometry,
        difficulty,
        ProblemKind::Calculation,
        question,
        answer,
    )
}

// ========== Sizes ==========

struct Conversion {
    big: &'static str,
    small: &'static str,
    factor: i64,
}

const LENGTH: [Conversion; 3] = [
    Conversion { big: "m", small: "cm", factor: 100 },
    Conversion { big: "cm", small: "mm", factor: 10 },
    Conversion { big: "km", small: "m", factor: 1000 },
];

const WEIGHT: [Conversion; 2] = [
    Conversion { big: "kg", small: "g", factor: 1000 },
    Conversion { big: "t", small: "kg", factor: 1000 },
];

const TIME: [Conversion; 2] = [
    Conversion { big: "h", small: "min", factor: 60 },
    Conversion { big: "min", small: "s", factor: 60 },
];

fn sizes<R: Rng + ?Sized>(
    rng: &mut R,
    difficulty: u8,
    constraints: &GenerationConstraints,
) -> MathProblem {
    let measurement = constraints.measurement_type.unwrap_or_else(|| {
        if difficulty < 2 {
            MeasurementType::Length
        } else {
            [MeasurementType::Length, MeasurementType::Weight, MeasurementType::Time]
                [rng.gen_range(0..3)]
        }
    });

    let table: &[Conversion] = match measurement {
        MeasurementType::Length => &LENGTH,
        MeasurementType::Weight => &WEIGHT,
        MeasurementType::Time => &TIME,
    };
    let available = if difficulty <= 3 { 1 } else { table.len() };
    let conversion = &table[rng.gen_range(0..available)];

    let n = rng.gen_range(1..=i64::from(difficulty) + 1);

    // 0: big -> small, 1: small -> big, 2: compound -> small
    let mode = match difficulty {
        0..=4 => 0,
        5..=7 => rng.gen_range(0..=1),
        _ => rng.gen_range(0..=2),
    };

    let (question, answer) = match mode {
        0 => (
            format!("{n} {} = ? {}", conversion.big, conversion.small),
            n * conversion.factor,
        ),
        1 => (
            format!("{} {} = ? {}", n * conversion.factor, conversion.small, conversion.big),
            n,
        ),
        _ => {
            let rest = rng.gen_range(1..conversion.factor);
            (
                format!(
                    "{n} {} {rest} {} = ? {}",
                    conversion.big, conversion.small, conversion.small
                ),
                n * conversion.factor + rest,
            )
        }
    };

    MathProblem::new(
        Topic::Sizes,
        difficulty,
        ProblemKind::TextProblem,
        question,
        answer,
    )
}

// ========== Answer checking ==========

/// Compares a submitted answer with the expected one. Numeric answers accept
/// any integral representation (`"7"`, `" 7 "`, `"7.0"`, `"7,0"`); text answers
/// compare case- and whitespace-insensitively. Malformed input is `false`.
pub fn check_answer(problem: &MathProblem, submitted: &str) -> bool {
    match &problem.correct_answer {
        Answer::Number(expected) => parse_number(submitted) == Some(*expected),
        Answer::Text(expected) => {
            let submitted = normalize_text(submitted);
            !submitted.is_empty() && submitted == normalize_text(expected)
        }
    }
}

fn parse_number(raw: &str) -> Option<i64> {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return None;
    }
    if let Ok(value) = compact.parse::<i64>() {
        return Some(value);
    }

    let value = compact.replace(',', ".").parse::<f64>().ok()?;
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 9.0e15 {
        Some(value as i64)
    } else {
        None
    }
}

fn normalize_text(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}
