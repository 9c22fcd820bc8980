use std::fmt::Write;

use chrono::Utc;

use crate::models::{RiskLevel, StudentRow};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PerformanceDistribution {
    pub excellent: usize,
    pub good: usize,
    pub average: usize,
    pub poor: usize,
}

#[derive(Debug, Clone)]
pub struct DashboardStats {
    pub total_students: usize,
    pub at_risk_students: usize,
    pub high_risk_students: usize,
    pub medium_risk_students: usize,
    pub at_risk_percentage: f64,
    pub distribution: PerformanceDistribution,
}

pub fn dashboard_stats(students: &[StudentRow]) -> DashboardStats {
    let total = students.len();
    let at_risk = students.iter().filter(|s| s.at_risk).count();
    let high = students
        .iter()
        .filter(|s| s.risk_level == RiskLevel::High)
        .count();
    let medium = students
        .iter()
        .filter(|s| s.risk_level == RiskLevel::Medium)
        .count();

    let mut distribution = PerformanceDistribution::default();
    for student in students {
        let p = student.overall_performance;
        if p >= 90.0 {
            distribution.excellent += 1;
        } else if p >= 80.0 {
            distribution.good += 1;
        } else if p >= 70.0 {
            distribution.average += 1;
        } else {
            distribution.poor += 1;
        }
    }

    DashboardStats {
        total_students: total,
        at_risk_students: at_risk,
        high_risk_students: high,
        medium_risk_students: medium,
        at_risk_percentage: if total == 0 {
            0.0
        } else {
            at_risk as f64 / total as f64 * 100.0
        },
        distribution,
    }
}

/// Reporting-only composite blending the three metrics (0.7 performance,
/// 0.2 attendance, 0.1 study hours on a 0-100 scale). Never feeds the risk
/// classification.
pub fn composite_performance(performance: f64, attendance: f64, study_hours: f64) -> f64 {
    let blended = 0.7 * performance + 0.2 * attendance + 0.1 * study_hours * 10.0;
    blended.clamp(0.0, 100.0)
}

pub fn build_report(students: &[StudentRow]) -> String {
    let stats = dashboard_stats(students);
    let mut output = String::new();

    let _ = writeln!(output, "# Roster Risk Report");
    let _ = writeln!(
        output,
        "Generated {} for {} students",
        Utc::now().date_naive(),
        stats.total_students
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Risk Mix");

    if students.is_empty() {
        let _ = writeln!(output, "No students stored yet.");
    } else {
        let _ = writeln!(
            output,
            "- At risk: {} of {} ({:.1}%)",
            stats.at_risk_students, stats.total_students, stats.at_risk_percentage
        );
        let _ = writeln!(output, "- High risk: {}", stats.high_risk_students);
        let _ = writeln!(output, "- Medium risk: {}", stats.medium_risk_students);
        let _ = writeln!(
            output,
            "- Low risk: {}",
            stats.total_students - stats.at_risk_students
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Performance Distribution");

    if students.is_empty() {
        let _ = writeln!(output, "No performance data recorded.");
    } else {
        let _ = writeln!(output, "- Excellent (>= 90): {}", stats.distribution.excellent);
        let _ = writeln!(output, "- Good (80-89): {}", stats.distribution.good);
        let _ = writeln!(output, "- Average (70-79): {}", stats.distribution.average);
        let _ = writeln!(output, "- Poor (< 70): {}", stats.distribution.poor);
    }

    let mut ranked: Vec<&StudentRow> = students.iter().filter(|s| s.at_risk).collect();
    ranked.sort_by(|a, b| {
        rank(a.risk_level).cmp(&rank(b.risk_level)).then(
            a.overall_performance
                .partial_cmp(&b.overall_performance)
                .unwrap_or(std::cmp::Ordering::Equal),
        )
    });

    let _ = writeln!(output);
    let _ = writeln!(output, "## Highest Risk Students");

    if ranked.is_empty() {
        let _ = writeln!(output, "No students at risk.");
    } else {
        for student in ranked.iter().take(10) {
            let _ = writeln!(
                output,
                "- {} ({}) {} risk, performance {:.1}%, composite {:.1}",
                student.name,
                student.student_id,
                student.risk_level,
                student.overall_performance,
                composite_performance(
                    student.overall_performance,
                    student.attendance,
                    student.study_hours
                )
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Insight Digest");

    if ranked.is_empty() {
        let _ = writeln!(output, "Nothing to flag for this roster.");
    } else {
        for student in ranked.iter().take(5) {
            let _ = writeln!(output, "### {}", student.name);
            for weakness in &student.insights.weaknesses {
                let _ = writeln!(output, "- Concern: {weakness}");
            }
            for rec in &student.insights.recommendations {
                let _ = writeln!(output, "- Action: {rec}");
            }
        }
    }

    output
}

fn rank(level: RiskLevel) -> u8 {
    match level {
        RiskLevel::High => 0,
        RiskLevel::Medium => 1,
        RiskLevel::Low => 2,
    }
}
