use std::collections::BTreeMap;

use chrono::{Duration, Utc};
use serde_json::{json, Value};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::{AlertKind, Insights, RiskDecision, RiskLevel, StudentMetrics, StudentRow};
use crate::normalize;
use crate::risk;

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Upserts one student together with the decision freshly computed for this
/// snapshot. The decision columns are always overwritten wholesale.
pub async fn upsert_student(
    pool: &PgPool,
    student_id: &str,
    name: &str,
    email: Option<&str>,
    metrics: &StudentMetrics,
    final_grade: f64,
    grades: &BTreeMap<String, Value>,
    decision: &RiskDecision,
) -> anyhow::Result<Uuid> {
    let grades_json = Value::Object(grades.clone().into_iter().collect());
    let insights_json = serde_json::to_value(&decision.insights)?;

    let row = sqlx::query(
        r#"
        INSERT INTO roster_risk.students
        (id, student_id, name, email, grades, attendance, study_hours, final_grade,
         overall_performance, risk_level, at_risk, insights, last_updated)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, now())
        ON CONFLICT (student_id) DO UPDATE
        SET name = EXCLUDED.name,
            email = EXCLUDED.email,
            grades = EXCLUDED.grades,
            attendance = EXCLUDED.attendance,
            study_hours = EXCLUDED.study_hours,
            final_grade = EXCLUDED.final_grade,
            overall_performance = EXCLUDED.overall_performance,
            risk_level = EXCLUDED.risk_level,
            at_risk = EXCLUDED.at_risk,
            insights = EXCLUDED.insights,
            last_updated = now()
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(student_id)
    .bind(name)
    .bind(email)
    .bind(&grades_json)
    .bind(metrics.attendance)
    .bind(metrics.study_hours)
    .bind(final_grade)
    .bind(decision.overall_performance)
    .bind(decision.risk_level.as_str())
    .bind(decision.at_risk)
    .bind(&insights_json)
    .fetch_one(pool)
    .await?;

    Ok(row.try_get("id")?)
}

/// Replaces the decision attached to a stored student.
pub async fn store_decision(
    pool: &PgPool,
    id: Uuid,
    decision: &RiskDecision,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        UPDATE roster_risk.students
        SET overall_performance = $2,
            risk_level = $3,
            at_risk = $4,
            insights = $5,
            last_updated = now()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(decision.overall_performance)
    .bind(decision.risk_level.as_str())
    .bind(decision.at_risk)
    .bind(serde_json::to_value(&decision.insights)?)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn fetch_students(pool: &PgPool) -> anyhow::Result<Vec<StudentRow>> {
    let rows = sqlx::query(
        "SELECT * FROM roster_risk.students ORDER BY student_id",
    )
    .fetch_all(pool)
    .await?;

    rows.iter().map(student_from_row).collect()
}

/// At-risk students, highest tier first, weakest performance first within a
/// tier.
pub async fn fetch_at_risk(pool: &PgPool) -> anyhow::Result<Vec<StudentRow>> {
    let rows = sqlx::query(
        r#"
        SELECT * FROM roster_risk.students
        WHERE at_risk
        ORDER BY CASE risk_level
                     WHEN 'high' THEN 0
                     WHEN 'medium' THEN 1
                     ELSE 2
                 END,
                 overall_performance ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.iter().map(student_from_row).collect()
}

pub async fn recent_alert_exists(
    pool: &PgPool,
    student_pk: Uuid,
    kind: AlertKind,
    window: Duration,
) -> anyhow::Result<bool> {
    let cutoff = Utc::now() - window;
    let row = sqlx::query(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM roster_risk.alerts
            WHERE student_pk = $1 AND alert_type = $2 AND sent_at >= $3
        ) AS present
        "#,
    )
    .bind(student_pk)
    .bind(kind.as_str())
    .bind(cutoff)
    .fetch_one(pool)
    .await?;

    Ok(row.try_get("present")?)
}

pub async fn record_alert(pool: &PgPool, student_pk: Uuid, kind: AlertKind) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO roster_risk.alerts (id, student_pk, alert_type, sent_at)
        VALUES ($1, $2, $3, now())
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(student_pk)
    .bind(kind.as_str())
    .execute(pool)
    .await?;

    Ok(())
}

/// Loads a realistic sample roster through the same normalize/classify path
/// the importer uses.
pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let roster = vec![
        (
            "GS-1001",
            "Avery Lee",
            Some("avery.lee@groupscholar.com"),
            json!({
                "Math": 88, "English": 91, "Science": 84,
                "Attendance": 96, "Study_Hours": 7
            }),
        ),
        (
            "GS-1002",
            "Jules Moreno",
            Some("jules.moreno@groupscholar.com"),
            json!({
                "Math": 52, "English": 61, "History": 48,
                "Attendance": 73, "Study_Hours": 3
            }),
        ),
        (
            "GS-1003",
            "Kiara Patel",
            None,
            json!({
                "Math": 34, "English": 41,
                "Attendence": 62, "Study_Hours": 1.5
            }),
        ),
    ];

    for (student_id, name, email, fields) in roster {
        let raw = match fields {
            Value::Object(map) => map.into_iter().collect(),
            _ => continue,
        };
        let (metrics, grades) = normalize::normalize(&raw)?;
        let final_grade = normalize::final_grade(&raw);
        let decision = risk::classify(&metrics);
        upsert_student(
            pool,
            student_id,
            name,
            email,
            &metrics,
            final_grade,
            &grades,
            &decision,
        )
        .await?;
    }

    Ok(())
}

fn student_from_row(row: &PgRow) -> anyhow::Result<StudentRow> {
    let grades = match row.try_get::<Value, _>("grades")? {
        Value::Object(map) => map.into_iter().collect(),
        _ => BTreeMap::new(),
    };
    let insights: Insights =
        serde_json::from_value(row.try_get::<Value, _>("insights")?).unwrap_or_default();
    let level_text: String = row.try_get("risk_level")?;
    // A level outside the enum would desync at_risk from risk_level; better
    // to fail the read than hand out an inconsistent row.
    let risk_level = RiskLevel::parse(&level_text)
        .ok_or_else(|| anyhow::anyhow!("unrecognized risk level {level_text:?}"))?;

    Ok(StudentRow {
        id: row.try_get("id")?,
        student_id: row.try_get("student_id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        grades,
        attendance: row.try_get("attendance")?,
        study_hours: row.try_get("study_hours")?,
        final_grade: row.try_get("final_grade")?,
        overall_performance: row.try_get("overall_performance")?,
        risk_level,
        at_risk: row.try_get("at_risk")?,
        insights,
        last_updated: row.try_get("last_updated")?,
    })
}
