//! Slate Server — HTTP API for triggering and inspecting SIS syncs.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use slate_core::db::repository::{StatsRepository, SyncRunRepository};
use slate_core::db::sqlite::SqliteRepository;
use slate_core::models::sync::EntityKind;
use slate_core::sync::SyncOrchestrator;
use slate_core::SlateError;

/// Shared application state for all API routes.
pub struct AppState {
    pub repo: Arc<SqliteRepository>,
    pub orchestrator: SyncOrchestrator<SqliteRepository>,
}

/// Build the API router with all routes.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/sync", get(sync_status).post(sync_trigger))
        .route("/sync/:entity", post(sync_entity))
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

#[derive(Deserialize)]
struct SyncRequest {
    #[serde(rename = "type")]
    sync_type: String,
}

async fn sync_trigger(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SyncRequest>,
) -> impl IntoResponse {
    if request.sync_type == "full" {
        return run_full(&state).await;
    }
    match EntityKind::parse(&request.sync_type) {
        Some(kind) => run_entity(&state, kind).await,
        None => unknown_entity(&request.sync_type),
    }
}

async fn sync_entity(
    State(state): State<Arc<AppState>>,
    Path(entity): Path<String>,
) -> impl IntoResponse {
    if entity == "full" {
        return run_full(&state).await;
    }
    match EntityKind::parse(&entity) {
        Some(kind) => run_entity(&state, kind).await,
        None => unknown_entity(&entity),
    }
}

async fn sync_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let latest = match state.repo.latest_run().await {
        Ok(run) => run,
        Err(e) => return error_response(&e),
    };
    let counts = match state.repo.entity_counts().await {
        Ok(counts) => counts,
        Err(e) => return error_response(&e),
    };
    let runs = match state.repo.list_runs(20).await {
        Ok(runs) => runs,
        Err(e) => return error_response(&e),
    };
    (
        StatusCode::OK,
        Json(json!({
            "latestRun": latest,
            "counts": counts,
            "runs": runs,
        })),
    )
}

async fn run_full(state: &AppState) -> (StatusCode, Json<serde_json::Value>) {
    let started = Instant::now();
    match state.orchestrator.sync_all().await {
        Ok(run) => success_response(&run, started),
        Err(e) => error_response(&e),
    }
}

async fn run_entity(state: &AppState, kind: EntityKind) -> (StatusCode, Json<serde_json::Value>) {
    let started = Instant::now();
    match state.orchestrator.sync_entity(kind).await {
        Ok(run) => success_response(&run, started),
        Err(e) => error_response(&e),
    }
}

fn success_response(
    run: &slate_core::models::sync::SyncRun,
    started: Instant,
) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "runId": run.id,
            "count": run.record_count,
            "skipped": run.skipped_count,
            "durationMs": started.elapsed().as_millis() as u64,
        })),
    )
}

fn unknown_entity(entity: &str) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": format!("unknown entity type: {entity}") })),
    )
}

fn error_response(e: &SlateError) -> (StatusCode, Json<serde_json::Value>) {
    warn!(error = %e, "Sync API request failed");
    let status = match e {
        SlateError::Sync(msg) if msg.contains("already running") => StatusCode::CONFLICT,
        SlateError::Config(_) => StatusCode::UNPROCESSABLE_ENTITY,
        SlateError::UpstreamAuth(_) | SlateError::UpstreamHttp { .. } | SlateError::Http(_) => {
            StatusCode::BAD_GATEWAY
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({ "error": e.to_string() })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use chrono::Utc;
    use tower::ServiceExt;

    use slate_core::db::DatabasePool;
    use slate_core::error::Result;
    use slate_core::models::attendance::{AttendanceCode, UnresolvedAttendance};
    use slate_core::models::contact::{
        EmailAddress, Person, PhoneNumber, UnresolvedPersonEmail, UnresolvedPersonPhone,
        UnresolvedStudentContact,
    };
    use slate_core::models::course::{Course, UnresolvedSection};
    use slate_core::models::grade::UnresolvedGrade;
    use slate_core::models::school::School;
    use slate_core::models::staff::Teacher;
    use slate_core::models::standard::Standard;
    use slate_core::models::student::Student;
    use slate_core::models::term::Term;
    use slate_core::sis::SisSource;

    /// Serves one school and nothing else.
    struct StubSource;

    #[async_trait]
    impl SisSource for StubSource {
        async fn fetch_schools(&self) -> Result<Vec<School>> {
            Ok(vec![School {
                id: 0,
                ps_id: 100,
                ps_dcid: None,
                name: "Springfield Elementary".into(),
                school_number: None,
                city: None,
                state: None,
                synced_at: Utc::now(),
            }])
        }
        async fn fetch_terms(&self) -> Result<Vec<Term>> {
            Ok(Vec::new())
        }
        async fn fetch_teachers(&self) -> Result<Vec<Teacher>> {
            Ok(Vec::new())
        }
        async fn fetch_students(&self) -> Result<Vec<Student>> {
            Ok(Vec::new())
        }
        async fn fetch_courses(&self) -> Result<Vec<Course>> {
            Ok(Vec::new())
        }
        async fn fetch_sections(&self) -> Result<Vec<UnresolvedSection>> {
            Ok(Vec::new())
        }
        async fn fetch_standards(&self) -> Result<Vec<Standard>> {
            Ok(Vec::new())
        }
        async fn fetch_attendance_codes(&self) -> Result<Vec<AttendanceCode>> {
            Ok(Vec::new())
        }
        async fn fetch_grades(&self) -> Result<Vec<UnresolvedGrade>> {
            Ok(Vec::new())
        }
        async fn fetch_attendance(&self) -> Result<Vec<UnresolvedAttendance>> {
            Ok(Vec::new())
        }
        async fn fetch_persons(&self) -> Result<Vec<Person>> {
            Ok(Vec::new())
        }
        async fn fetch_email_addresses(&self) -> Result<Vec<EmailAddress>> {
            Ok(Vec::new())
        }
        async fn fetch_phone_numbers(&self) -> Result<Vec<PhoneNumber>> {
            Ok(Vec::new())
        }
        async fn fetch_person_email_associations(&self) -> Result<Vec<UnresolvedPersonEmail>> {
            Ok(Vec::new())
        }
        async fn fetch_person_phone_associations(&self) -> Result<Vec<UnresolvedPersonPhone>> {
            Ok(Vec::new())
        }
        async fn fetch_student_contact_associations(
            &self,
        ) -> Result<Vec<UnresolvedStudentContact>> {
            Ok(Vec::new())
        }
    }

    async fn test_state() -> Arc<AppState> {
        let DatabasePool::Sqlite(pool) = DatabasePool::new_sqlite_memory().await.unwrap();
        let repo = Arc::new(SqliteRepository::new(pool));
        let orchestrator = SyncOrchestrator::new(repo.clone(), Arc::new(StubSource));
        Arc::new(AppState { repo, orchestrator })
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_endpoint() {
        let app = router(test_state().await);
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn entity_sync_via_path() {
        let app = router(test_state().await);
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/sync/school")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["count"], 1);
        assert_eq!(body["skipped"], 0);
    }

    #[tokio::test]
    async fn unknown_entity_is_rejected() {
        let app = router(test_state().await);
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/sync/librarians")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert!(body["error"].as_str().unwrap().contains("librarians"));
    }

    #[tokio::test]
    async fn full_sync_via_body() {
        let app = router(test_state().await);
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/sync")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"type":"full"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["count"], 1);
    }

    #[tokio::test]
    async fn status_reports_latest_run_and_counts() {
        let state = test_state().await;
        let app = router(state.clone());

        // Complete one full sync first.
        app.clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/sync")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"type":"full"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        let response = app
            .oneshot(Request::builder().uri("/sync").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["latestRun"]["status"], "completed");
        assert_eq!(body["counts"]["schools"], 1);
        assert_eq!(body["runs"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn concurrent_sync_returns_conflict() {
        let state = test_state().await;
        // Simulate an in-flight run holding the claim.
        let blocker = state.repo.create_run("full").await.unwrap();
        assert!(state.repo.try_claim_run(blocker.id).await.unwrap());

        let app = router(state);
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/sync/school")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
