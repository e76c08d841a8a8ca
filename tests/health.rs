//! Health and Schema Tests
//!
//! Covers the health endpoint and the embedded migrations.

mod common;

use axum::http::StatusCode;
use common::app;

#[tokio::test]
async fn health_ok() {
    let app = app().await;

    let resp = app.get("/health", None).await;

    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["status"], "ok");
}

#[tokio::test]
async fn health_degraded_when_database_unreachable() {
    let app = app().await;
    let broken = app.with_closed_database().await;

    let resp = broken.get("/health", None).await;

    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["status"], "degraded");
}

#[tokio::test]
async fn migrations_are_recorded_and_rerun_safely() {
    let app = app().await;

    // Setup already applied them; a second start must be a no-op.
    app.state.db.run_migrations().await.unwrap();

    let applied: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM _sqlx_migrations WHERE version = 1 AND success",
    )
    .fetch_one(app.pool())
    .await
    .unwrap();
    assert_eq!(applied, 1);
}
