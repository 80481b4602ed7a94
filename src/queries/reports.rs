use crate::error::{AppError, AppResult};
use crate::models::reports::{Report, ReportStatus};
use anyhow::anyhow;
use chrono::Utc;
use sqlx::SqliteConnection;

pub async fn insert_report(
    conn: &mut SqliteConnection,
    reporter_id: i64,
    reported_user_id: i64,
    reason: &str,
) -> AppResult<Report> {
    sqlx::query_as::<_, Report>(
        r#"
        INSERT INTO reports (reporter_id, reported_user_id, reason, timestamp, status)
        VALUES (?1, ?2, ?3, ?4, ?5)
        RETURNING *
        "#,
    )
    .bind(reporter_id)
    .bind(reported_user_id)
    .bind(reason)
    .bind(Utc::now())
    .bind(ReportStatus::Pending)
    .fetch_one(conn)
    .await
    .map_err(|e| AppError::database(e, "Failed to create report"))
}

pub async fn get_report_by_id(conn: &mut SqliteConnection, report_id: i64) -> AppResult<Report> {
    sqlx::query_as::<_, Report>("SELECT * FROM reports WHERE id = ?1")
        .bind(report_id)
        .fetch_optional(conn)
        .await
        .map_err(|e| AppError::database(e, "Database error fetching report"))?
        .ok_or_else(|| AppError::NotFound(anyhow!("Report {} not found", report_id)))
}

/// Conditional on the status read by the caller, so two admins racing on
/// the same report cannot move it backwards.
pub async fn update_report_status(
    conn: &mut SqliteConnection,
    report_id: i64,
    from: ReportStatus,
    to: ReportStatus,
) -> AppResult<bool> {
    let result = sqlx::query("UPDATE reports SET status = ?1 WHERE id = ?2 AND status = ?3")
        .bind(to)
        .bind(report_id)
        .bind(from)
        .execute(conn)
        .await
        .map_err(|e| AppError::database(e, "Failed to update report"))?;

    Ok(result.rows_affected() == 1)
}

pub async fn list_reports(conn: &mut SqliteConnection) -> AppResult<Vec<Report>> {
    sqlx::query_as::<_, Report>("SELECT * FROM reports ORDER BY timestamp DESC, id DESC")
        .fetch_all(conn)
        .await
        .map_err(|e| AppError::database(e, "Database error listing reports"))
}

pub async fn count_pending_reports(conn: &mut SqliteConnection) -> AppResult<i64> {
    sqlx::query_scalar("SELECT COUNT(*) FROM reports WHERE status = ?1")
        .bind(ReportStatus::Pending)
        .fetch_one(conn)
        .await
        .map_err(|e| AppError::database(e, "Database error counting reports"))
}
