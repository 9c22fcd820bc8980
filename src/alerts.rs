use std::fmt::Write;

use chrono::Duration;
use sqlx::PgPool;

use crate::db;
use crate::models::{AlertKind, StudentRow};

/// Repeat risk alerts to the same student inside this window are skipped.
/// The dedup policy lives here, not in the scoring core.
pub const DEDUP_WINDOW_HOURS: i64 = 24;

/// Shown when a student at risk has no rule-generated recommendations.
const FALLBACK_RECOMMENDATIONS: [&str; 3] = [
    "Schedule a meeting with your academic advisor",
    "Consider joining study groups",
    "Improve class attendance",
];

#[derive(Debug)]
pub struct DispatchOutcome {
    pub student_id: String,
    pub student_name: String,
    pub sent: bool,
    pub note: &'static str,
    pub body: Option<String>,
}

/// Plain-text risk alert composed from the stored decision. Transport is a
/// collaborator's concern; the body is the deliverable.
pub fn risk_alert_body(student: &StudentRow, advisor_email: Option<&str>) -> String {
    let mut body = String::new();

    let _ = writeln!(body, "Academic Risk Alert - {}", student.name);
    let _ = writeln!(body, "Student ID: {}", student.student_id);
    if let Some(advisor) = advisor_email {
        let _ = writeln!(body, "Advisor copy: {advisor}");
    }
    let _ = writeln!(body);
    let _ = writeln!(body, "Current status:");
    let _ = writeln!(body, "- Risk level: {}", student.risk_level.as_str().to_uppercase());
    let _ = writeln!(
        body,
        "- Overall performance: {:.1}%",
        student.overall_performance
    );
    let _ = writeln!(body, "- Attendance: {:.1}%", student.attendance);
    let _ = writeln!(body, "- Study hours: {:.1} hours/week", student.study_hours);

    if !student.insights.weaknesses.is_empty() {
        let _ = writeln!(body);
        let _ = writeln!(body, "Areas of concern:");
        for weakness in &student.insights.weaknesses {
            let _ = writeln!(body, "- {weakness}");
        }
    }

    let _ = writeln!(body);
    let _ = writeln!(body, "Recommended actions:");
    if student.insights.recommendations.is_empty() {
        for fallback in FALLBACK_RECOMMENDATIONS {
            let _ = writeln!(body, "- {fallback}");
        }
    } else {
        for rec in &student.insights.recommendations {
            let _ = writeln!(body, "- {rec}");
        }
    }

    body
}

pub fn progress_report_body(student: &StudentRow) -> String {
    let mut body = String::new();

    let _ = writeln!(body, "Progress Report - {}", student.name);
    let _ = writeln!(body);
    let _ = writeln!(
        body,
        "Overall performance: {:.1}%",
        student.overall_performance
    );
    let _ = writeln!(body, "Risk level: {}", student.risk_level.as_str().to_uppercase());
    let _ = writeln!(body, "Attendance: {:.1}%", student.attendance);
    let _ = writeln!(body, "Study hours/week: {:.1}", student.study_hours);

    if !student.insights.strengths.is_empty() {
        let _ = writeln!(body);
        let _ = writeln!(body, "Strengths:");
        for strength in &student.insights.strengths {
            let _ = writeln!(body, "- {strength}");
        }
    }

    if !student.insights.recommendations.is_empty() {
        let _ = writeln!(body);
        let _ = writeln!(body, "Recommendations for improvement:");
        for rec in &student.insights.recommendations {
            let _ = writeln!(body, "- {rec}");
        }
    }

    body
}

/// Composes and records one risk alert per at-risk student, skipping anyone
/// already alerted inside the dedup window.
pub async fn dispatch_risk_alerts(
    pool: &PgPool,
    advisor_email: Option<&str>,
) -> anyhow::Result<Vec<DispatchOutcome>> {
    let students = db::fetch_at_risk(pool).await?;
    let window = Duration::hours(DEDUP_WINDOW_HOURS);
    let mut outcomes = Vec::new();

    for student in &students {
        let already_sent =
            db::recent_alert_exists(pool, student.id, AlertKind::RiskAlert, window).await?;

        if already_sent {
            outcomes.push(DispatchOutcome {
                student_id: student.student_id.clone(),
                student_name: student.name.clone(),
                sent: false,
                note: "alert already sent within 24 hours",
                body: None,
            });
            continue;
        }

        let body = risk_alert_body(student, advisor_email);
        db::record_alert(pool, student.id, AlertKind::RiskAlert).await?;
        outcomes.push(DispatchOutcome {
            student_id: student.student_id.clone(),
            student_name: student.name.clone(),
            sent: true,
            note: "alert recorded",
            body: Some(body),
        });
    }

    Ok(outcomes)
}

/// Progress reports go to every stored student; no dedup window applies.
pub async fn dispatch_progress_reports(pool: &PgPool) -> anyhow::Result<Vec<DispatchOutcome>> {
    let students = db::fetch_students(pool).await?;
    let mut outcomes = Vec::new();

    for student in &students {
        let body = progress_report_body(student);
        db::record_alert(pool, student.id, AlertKind::ProgressReport).await?;
        outcomes.push(DispatchOutcome {
            student_id: student.student_id.clone(),
            student_name: student.name.clone(),
            sent: true,
            note: "report recorded",
            body: Some(body),
        });
    }

    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Insights, RiskLevel, StudentRow};
    use chrono::Utc;
    use uuid::Uuid;

    fn sample_student(insights: Insights) -> StudentRow {
        StudentRow {
            id: Uuid::new_v4(),
            student_id: "GS-1003".to_string(),
            name: "Kiara Patel".to_string(),
            email: None,
            grades: Default::default(),
            attendance: 62.0,
            study_hours: 1.5,
            final_grade: 0.0,
            overall_performance: 37.5,
            risk_level: RiskLevel::High,
            at_risk: true,
            insights,
            last_updated: Utc::now(),
        }
    }

    #[test]
    fn alert_body_lists_weaknesses_and_recommendations() {
        let student = sample_student(Insights {
            strengths: vec![],
            weaknesses: vec!["Low academic performance".to_string()],
            recommendations: vec![
                "Join study groups or seek mentoring for weak subjects".to_string(),
            ],
        });
        let body = risk_alert_body(&student, Some("advisor@school.edu"));
        assert!(body.contains("Risk level: HIGH"));
        assert!(body.contains("Overall performance: 37.5%"));
        assert!(body.contains("- Low academic performance"));
        assert!(body.contains("- Join study groups or seek mentoring for weak subjects"));
        assert!(body.contains("Advisor copy: advisor@school.edu"));
    }

    #[test]
    fn alert_body_falls_back_when_no_recommendations_fired() {
        let student = sample_student(Insights::default());
        let body = risk_alert_body(&student, None);
        assert!(body.contains("Schedule a meeting with your academic advisor"));
        assert!(!body.contains("Areas of concern"));
    }

    #[test]
    fn progress_report_skips_empty_sections() {
        let student = sample_student(Insights {
            strengths: vec!["Strong study discipline".to_string()],
            weaknesses: vec![],
            recommendations: vec![],
        });
        let body = progress_report_body(&student);
        assert!(body.contains("Strengths:"));
        assert!(!body.contains("Recommendations for improvement"));
    }
}
