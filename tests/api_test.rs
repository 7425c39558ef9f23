use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode, header};
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use sqlx::sqlite::SqlitePoolOptions;
use tower::util::ServiceExt;

use classtrack::api::router;
use classtrack::auth::JwtKeys;
use classtrack::services::RandomCodeGenerator;
use classtrack::state::AppState;

const BOUNDARY: &str = "test-boundary-7349";

async fn app() -> Router {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create test db");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    router(AppState {
        db: pool,
        codes: Arc::new(RandomCodeGenerator),
        jwt: JwtKeys::from_secret(b"integration-test-secret"),
    })
}

async fn body_json(response: Response<Body>) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body is json")
}

async fn post_json(app: &Router, path: &str, token: Option<&str>, body: Value) -> Response<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    app.clone()
        .oneshot(builder.body(Body::from(body.to_string())).expect("request"))
        .await
        .expect("response")
}

async fn get(app: &Router, path: &str, token: &str) -> Response<Body> {
    app.clone()
        .oneshot(
            Request::builder()
                .uri(path)
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response")
}

async fn delete(app: &Router, path: &str, token: &str) -> Response<Body> {
    app.clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(path)
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response")
}

async fn register(app: &Router, email: &str, role: &str) -> String {
    let response = post_json(
        app,
        "/api/auth/register",
        None,
        json!({
            "email": email,
            "full_name": format!("User {email}"),
            "password": "correct horse battery",
            "role": role,
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await["token"]
        .as_str()
        .expect("token")
        .to_string()
}

fn multipart_submit_body(classroom_id: &str, absence_date: &str, reason: &str) -> String {
    format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"classroom_id\"\r\n\r\n{classroom_id}\r\n\
         --{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"absence_date\"\r\n\r\n{absence_date}\r\n\
         --{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"reason\"\r\n\r\n{reason}\r\n\
         --{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"evidence\"; filename=\"note.pdf\"\r\n\
         Content-Type: application/pdf\r\n\r\n%PDF-1.4 fake\r\n\
         --{BOUNDARY}--\r\n"
    )
}

async fn submit_request(app: &Router, token: &str, classroom_id: &str, date: &str) -> Response<Body> {
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/leave-request/submit")
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={BOUNDARY}"),
                )
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::from(multipart_submit_body(classroom_id, date, "Sick")))
                .expect("request"),
        )
        .await
        .expect("response")
}

#[tokio::test]
async fn health_is_ok() {
    let app = app().await;
    let response = app
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn unauthenticated_requests_are_rejected() {
    let app = app().await;
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/classroom/my-teaching")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn students_cannot_create_classrooms() {
    let app = app().await;
    let student = register(&app, "s@example.com", "STUDENT").await;

    let response = post_json(
        &app,
        "/api/classroom/create",
        Some(&student),
        json!({"id": "CS101", "name": "Intro"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn partial_date_filter_is_a_bad_request() {
    let app = app().await;
    let student = register(&app, "s@example.com", "STUDENT").await;

    let response = get(
        &app,
        "/api/leave-request/my-requests?start_date=2026-01-01",
        &student,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn full_leave_request_lifecycle() {
    let app = app().await;
    let instructor = register(&app, "teacher@example.com", "INSTRUCTOR").await;
    let student = register(&app, "student@example.com", "STUDENT").await;

    // Instructor creates CS101 and receives a join code.
    let response = post_json(
        &app,
        "/api/classroom/create",
        Some(&instructor),
        json!({"id": "CS101", "name": "Intro to CS", "description": "first steps"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let classroom = body_json(response).await;
    let join_code = classroom["join_code"].as_str().expect("join code");
    assert_eq!(join_code.len(), 8);

    // Student joins with the lowercased code.
    let response = post_json(
        &app,
        "/api/classroom/join",
        Some(&student),
        json!({"join_code": join_code.to_lowercase()}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    // Student submits a request for tomorrow, with evidence attached.
    let tomorrow = (Utc::now().date_naive() + Duration::days(1)).to_string();
    let response = submit_request(&app, &student, "CS101", &tomorrow).await;
    assert_eq!(response.status(), StatusCode::OK);
    let request = body_json(response).await;
    assert_eq!(request["status"], "PENDING");
    assert_eq!(request["evidence_filename"], "note.pdf");
    let request_id = request["id"].as_str().expect("request id").to_string();

    // The instructor sees it pending.
    let response = get(&app, "/api/leave-request/CS101/pending", &instructor).await;
    assert_eq!(response.status(), StatusCode::OK);
    let pending = body_json(response).await;
    assert_eq!(pending.as_array().expect("array").len(), 1);

    // Denying without a reason is a validation failure.
    let response = post_json(
        &app,
        &format!("/api/leave-request/{request_id}/deny"),
        Some(&instructor),
        json!({"denial_reason": ""}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Denying with a reason lands in REJECTED.
    let response = post_json(
        &app,
        &format!("/api/leave-request/{request_id}/deny"),
        Some(&instructor),
        json!({"denial_reason": "Not valid"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let denied = body_json(response).await;
    assert_eq!(denied["status"], "REJECTED");
    assert_eq!(denied["denial_reason"], "Not valid");

    // The processed request can no longer be withdrawn.
    let response = delete(&app, &format!("/api/leave-request/{request_id}"), &student).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // And the rejected request still pins the enrollment.
    let response = post_json(
        &app,
        "/api/classroom/CS101/leave",
        Some(&student),
        json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // Evidence downloads with the stored content type.
    let response = get(
        &app,
        &format!("/api/leave-request/evidence/{request_id}"),
        &student,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok()),
        Some("application/pdf")
    );

    // The attendance report lists the student with one rejected request.
    let today = Utc::now().date_naive().to_string();
    let next_week = (Utc::now().date_naive() + Duration::days(7)).to_string();
    let response = get(
        &app,
        &format!("/api/report/CS101/attendance-report?from={today}&to={next_week}"),
        &instructor,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let csv_bytes = response.into_body().collect().await.expect("body").to_bytes();
    let csv = String::from_utf8(csv_bytes.to_vec()).expect("utf8 csv");
    assert!(csv.starts_with("Student Email,Full Name,Total Requests,Approved,Rejected,Pending"));
    assert!(csv.contains("student@example.com"));
    assert!(csv.contains(",1,0,1,0"));
}

#[tokio::test]
async fn classroom_with_history_cannot_be_deleted() {
    let app = app().await;
    let instructor = register(&app, "teacher@example.com", "INSTRUCTOR").await;
    let student = register(&app, "student@example.com", "STUDENT").await;

    let response = post_json(
        &app,
        "/api/classroom/create",
        Some(&instructor),
        json!({"id": "CS101", "name": "Intro"}),
    )
    .await;
    let classroom = body_json(response).await;
    let join_code = classroom["join_code"].as_str().expect("join code").to_string();

    let response = post_json(
        &app,
        "/api/classroom/join",
        Some(&student),
        json!({"join_code": join_code}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    // Enrolled student blocks deletion.
    let response = delete(&app, "/api/classroom/CS101", &instructor).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // After the student leaves (no requests yet), deletion goes through.
    let response = post_json(&app, "/api/classroom/CS101/leave", Some(&student), json!({})).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let response = delete(&app, "/api/classroom/CS101", &instructor).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}
