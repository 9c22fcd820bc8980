use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// One student's row as it arrives from a roster upload: arbitrary column
/// names mapped to whatever primitive the cell held.
pub type RawRecord = BTreeMap<String, Value>;

/// Canonical metric set the classifier depends on.
#[derive(Debug, Clone, PartialEq)]
pub struct StudentMetrics {
    pub overall_performance: f64,
    pub attendance: f64,
    pub study_hours: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }

    pub fn parse(value: &str) -> Option<RiskLevel> {
        match value {
            "low" => Some(RiskLevel::Low),
            "medium" => Some(RiskLevel::Medium),
            "high" => Some(RiskLevel::High),
            _ => None,
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Categorized feedback lists. Always present, possibly empty, replaced
/// wholesale on every recompute.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insights {
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub recommendations: Vec<String>,
}

/// The classifier's output for one metrics snapshot. A decision has no
/// identity of its own; it overwrites the prior decision on the student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskDecision {
    pub overall_performance: f64,
    pub risk_level: RiskLevel,
    pub at_risk: bool,
    pub insights: Insights,
}

/// A persisted student with the latest decision attached.
#[derive(Debug, Clone)]
pub struct StudentRow {
    pub id: Uuid,
    pub student_id: String,
    pub name: String,
    pub email: Option<String>,
    pub grades: BTreeMap<String, Value>,
    pub attendance: f64,
    pub study_hours: f64,
    pub final_grade: f64,
    pub overall_performance: f64,
    pub risk_level: RiskLevel,
    pub at_risk: bool,
    pub insights: Insights,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    RiskAlert,
    ProgressReport,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::RiskAlert => "risk_alert",
            AlertKind::ProgressReport => "progress_report",
        }
    }
}
