use std::collections::BTreeMap;

use serde_json::Value;
use thiserror::Error;

use crate::models::{RawRecord, StudentMetrics};

/// A key counts as grade-bearing when its lowercase form contains one of
/// these substrings. Rule table, not scattered string checks.
const GRADE_KEYWORDS: [&str; 6] = ["math", "english", "science", "history", "grade", "score"];

/// Alias tables for the fixed metric columns, checked in order; first
/// exact match wins. `Attendence` is a misspelling seen in real rosters.
const ATTENDANCE_ALIASES: [&str; 3] = ["Attendence", "Attendance", "attendance"];
const STUDY_HOURS_ALIASES: [&str; 3] = ["Study_Hours", "study_hours", "StudyHours"];
const FINAL_GRADE_ALIASES: [&str; 2] = ["Final_Grade", "final_grade"];

#[derive(Debug, Error)]
pub enum InvalidInputError {
    #[error("raw record contains no fields")]
    EmptyRecord,
}

/// Aggregates a raw roster row into the canonical metric set plus the
/// verbatim grades map (kept for display and audit).
///
/// Malformed or missing values never fail; they degrade to 0 so one dirty
/// row cannot abort a batch. The only error is a completely empty mapping.
pub fn normalize(
    raw: &RawRecord,
) -> Result<(StudentMetrics, BTreeMap<String, Value>), InvalidInputError> {
    if raw.is_empty() {
        return Err(InvalidInputError::EmptyRecord);
    }

    let mut grades: BTreeMap<String, Value> = BTreeMap::new();
    for (key, value) in raw {
        let lower = key.to_lowercase();
        if GRADE_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
            grades.insert(key.clone(), value.clone());
        }
    }

    let attendance = lookup_metric(raw, &ATTENDANCE_ALIASES).clamp(0.0, 100.0);
    let study_hours = lookup_metric(raw, &STUDY_HOURS_ALIASES).max(0.0);
    let final_grade = lookup_metric(raw, &FINAL_GRADE_ALIASES).clamp(0.0, 100.0);

    let metrics = StudentMetrics {
        overall_performance: overall_performance(&grades, final_grade),
        attendance,
        study_hours,
    };

    Ok((metrics, grades))
}

/// Mean over all grade entries when any exist (non-numeric entries count as
/// 0 in the sum but still count in the denominator), else the final-grade
/// fallback.
pub fn overall_performance(grades: &BTreeMap<String, Value>, final_grade: f64) -> f64 {
    if grades.is_empty() {
        return final_grade;
    }
    let sum: f64 = grades.values().map(|v| numeric(v).unwrap_or(0.0)).sum();
    sum / grades.len() as f64
}

/// The resolved final-grade fallback, persisted so a stored student can be
/// re-classified without the original row.
pub fn final_grade(raw: &RawRecord) -> f64 {
    lookup_metric(raw, &FINAL_GRADE_ALIASES).clamp(0.0, 100.0)
}

fn lookup_metric(raw: &RawRecord, aliases: &[&str]) -> f64 {
    aliases
        .iter()
        .find_map(|alias| raw.get(*alias))
        .and_then(numeric)
        .unwrap_or(0.0)
}

/// Lenient coercion: numbers pass through, numeric-looking strings parse,
/// everything else is not a number.
fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}
