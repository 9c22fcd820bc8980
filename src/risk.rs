use crate::models::{Insights, RiskDecision, RiskLevel, StudentMetrics};

/// Additive rubric over the canonical metrics. Performance carries the most
/// weight, attendance and study hours are supportive factors.
pub fn risk_score(performance: f64, attendance: f64, study_hours: f64) -> u32 {
    let mut score = 0;

    if performance < 40.0 {
        score += 45;
    } else if performance < 60.0 {
        score += 30;
    } else if performance < 75.0 {
        score += 15;
    }

    if attendance < 70.0 {
        score += 25;
    } else if attendance < 85.0 {
        score += 10;
    } else if attendance > 95.0 && performance < 50.0 {
        // High attendance but low marks: effort without results still
        // signals risk.
        score += 10;
    }

    if study_hours < 2.0 {
        score += 25;
    } else if study_hours < 4.0 {
        score += 15;
    } else if study_hours < 6.0 {
        score += 5;
    }

    score
}

pub fn risk_level(score: u32) -> RiskLevel {
    if score >= 60 {
        RiskLevel::High
    } else if score >= 30 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// Threshold rules evaluated independently, in fixed order. Lists are never
/// deduplicated or capped.
pub fn generate_insights(performance: f64, attendance: f64, study_hours: f64) -> Insights {
    let mut insights = Insights::default();

    if performance >= 85.0 {
        insights
            .strengths
            .push("Excellent academic performance".to_string());
    }
    if attendance >= 95.0 {
        insights
            .strengths
            .push("Exceptional attendance consistency".to_string());
    }
    if study_hours >= 6.0 {
        insights.strengths.push("Strong study discipline".to_string());
    }

    if performance < 60.0 {
        insights
            .weaknesses
            .push("Low academic performance".to_string());
    }
    if attendance < 80.0 {
        insights.weaknesses.push("Inconsistent attendance".to_string());
    }
    if study_hours < 4.0 {
        insights
            .weaknesses
            .push("Needs to dedicate more study time".to_string());
    }

    if performance < 75.0 {
        insights
            .recommendations
            .push("Join study groups or seek mentoring for weak subjects".to_string());
    }
    if attendance < 85.0 {
        insights
            .recommendations
            .push("Maintain regular attendance to keep learning continuity".to_string());
    }
    if study_hours < 5.0 {
        insights
            .recommendations
            .push("Follow a daily study routine for at least 2 more hours".to_string());
    }

    insights
}

/// Derives a fresh decision from one metrics snapshot. Pure: identical
/// input always yields an identical decision.
pub fn classify(metrics: &StudentMetrics) -> RiskDecision {
    let performance = metrics.overall_performance.clamp(0.0, 100.0);
    let score = risk_score(performance, metrics.attendance, metrics.study_hours);
    let level = risk_level(score);

    RiskDecision {
        overall_performance: performance,
        risk_level: level,
        at_risk: level != RiskLevel::Low,
        insights: generate_insights(performance, metrics.attendance, metrics.study_hours),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(performance: f64, attendance: f64, study_hours: f64) -> StudentMetrics {
        StudentMetrics {
            overall_performance: performance,
            attendance,
            study_hours,
        }
    }

    #[test]
    fn worst_case_metrics_score_high() {
        let score = risk_score(35.0, 60.0, 1.0);
        assert_eq!(score, 95);
        assert_eq!(risk_level(score), RiskLevel::High);
    }

    #[test]
    fn strong_metrics_score_low() {
        let decision = classify(&metrics(82.0, 90.0, 5.0));
        // 82 clears every performance bucket; attendance 90 sits in the
        // no-penalty range; 5 study hours adds 5.
        assert_eq!(decision.overall_performance, 82.0);
        assert_eq!(decision.risk_level, RiskLevel::Low);
        assert!(!decision.at_risk);
    }

    #[test]
    fn attendance_anomaly_bonus_needs_low_performance() {
        assert_eq!(risk_score(45.0, 98.0, 6.0), 30 + 10);
        assert_eq!(risk_score(55.0, 98.0, 6.0), 30);
    }

    #[test]
    fn tier_boundaries() {
        assert_eq!(risk_level(60), RiskLevel::High);
        assert_eq!(risk_level(59), RiskLevel::Medium);
        assert_eq!(risk_level(30), RiskLevel::Medium);
        assert_eq!(risk_level(29), RiskLevel::Low);
    }

    #[test]
    fn at_risk_tracks_level() {
        for (p, a, h) in [
            (35.0, 60.0, 1.0),
            (50.0, 75.0, 3.0),
            (90.0, 92.0, 6.0),
            (0.0, 0.0, 0.0),
            (100.0, 100.0, 10.0),
        ] {
            let decision = classify(&metrics(p, a, h));
            assert_eq!(decision.at_risk, decision.risk_level != RiskLevel::Low);
        }
    }

    #[test]
    fn lowering_a_metric_never_lowers_the_score() {
        let base = (70.0, 88.0, 5.0);
        let baseline = risk_score(base.0, base.1, base.2);
        for step in 1..=14 {
            let delta = step as f64 * 5.0;
            assert!(risk_score(base.0 - delta, base.1, base.2) >= baseline);
            assert!(risk_score(base.0, base.1 - delta, base.2) >= baseline);
            assert!(risk_score(base.0, base.1, (base.2 - delta).max(0.0)) >= baseline);
        }
    }

    #[test]
    fn classify_is_idempotent() {
        let m = metrics(50.0, 90.0, 3.0);
        assert_eq!(classify(&m), classify(&m));
    }

    #[test]
    fn out_of_range_performance_clamps_in_the_decision() {
        let decision = classify(&metrics(130.0, 90.0, 6.0));
        assert_eq!(decision.overall_performance, 100.0);
        assert_eq!(decision.risk_level, RiskLevel::Low);
    }

    #[test]
    fn insight_lists_match_threshold_rules() {
        let insights = generate_insights(50.0, 90.0, 3.0);
        assert!(insights.strengths.is_empty());
        assert_eq!(
            insights.weaknesses,
            vec![
                "Low academic performance".to_string(),
                "Needs to dedicate more study time".to_string(),
            ]
        );
        assert_eq!(
            insights.recommendations,
            vec![
                "Join study groups or seek mentoring for weak subjects".to_string(),
                "Follow a daily study routine for at least 2 more hours".to_string(),
            ]
        );
    }

    #[test]
    fn top_student_collects_only_strengths() {
        let insights = generate_insights(92.0, 97.0, 7.0);
        assert_eq!(insights.strengths.len(), 3);
        assert!(insights.weaknesses.is_empty());
        assert!(insights.recommendations.is_empty());
    }
}
