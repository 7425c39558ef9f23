use axum::Json;
use axum::extract::{Multipart, Path, Query};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::{patch, post};
use axum::{Router, extract::State, http::StatusCode, routing::get};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::auth::{AuthService, CurrentUser, require_instructor, require_student};
use crate::error::AppError;
use crate::evidence::EvidencePayload;
use crate::models::*;
use crate::services::{ClassroomService, EnrollmentService, LeaveRequestService, ReportService};
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/classroom/create", post(create_classroom))
        .route("/api/classroom/my-teaching", get(my_teaching))
        .route("/api/classroom/my-enrolled", get(my_enrolled))
        .route("/api/classroom/join", post(join_classroom))
        .route(
            "/api/classroom/{id}",
            patch(update_classroom).delete(delete_classroom),
        )
        .route("/api/classroom/{id}/students", get(students_in_class))
        .route("/api/classroom/{id}/leave", post(leave_classroom))
        .route("/api/leave-request/submit", post(submit_leave_request))
        .route("/api/leave-request/my-requests", get(my_requests))
        .route("/api/leave-request/instructor/all", get(all_for_instructor))
        .route(
            "/api/leave-request/instructor/{id}",
            get(request_detail_for_instructor),
        )
        .route("/api/leave-request/evidence/{id}", get(view_evidence))
        .route(
            "/api/leave-request/{id}",
            get(request_detail).delete(delete_leave_request),
        )
        .route("/api/leave-request/{id}/pending", get(pending_for_class))
        .route("/api/leave-request/{id}/all", get(all_for_class))
        .route("/api/leave-request/{id}/approve", post(approve_request))
        .route("/api/leave-request/{id}/deny", post(deny_request))
        .route("/api/report/{id}/attendance-report", get(attendance_report))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    sqlx::query("select 1").execute(&state.db).await?;
    Ok(StatusCode::OK)
}

// ---- auth ----

async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let service = AuthService::new(state.db.clone(), state.jwt.clone());
    let response = service
        .register(req.email, req.full_name, req.password, req.role)
        .await?;
    Ok(Json(response))
}

async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let service = AuthService::new(state.db.clone(), state.jwt.clone());
    let response = service.login(&req.email, &req.password).await?;
    Ok(Json(response))
}

// ---- classrooms ----

async fn create_classroom(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<CreateClassRequest>,
) -> Result<Json<Classroom>, AppError> {
    require_instructor(&user)?;
    let service = ClassroomService::new(state.db.clone(), state.codes.clone());
    let classroom = service.create(&user, req.id, req.name, req.description).await?;
    Ok(Json(classroom))
}

async fn update_classroom(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<UpdateClassRequest>,
) -> Result<Json<Classroom>, AppError> {
    require_instructor(&user)?;
    let service = ClassroomService::new(state.db.clone(), state.codes.clone());
    let classroom = service.update(&user, &id, req.name, req.description).await?;
    Ok(Json(classroom))
}

async fn delete_classroom(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    require_instructor(&user)?;
    let service = ClassroomService::new(state.db.clone(), state.codes.clone());
    service.delete(&user, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn my_teaching(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<Classroom>>, AppError> {
    require_instructor(&user)?;
    let service = ClassroomService::new(state.db.clone(), state.codes.clone());
    Ok(Json(service.my_teaching(&user).await?))
}

async fn students_in_class(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Vec<RosterEntry>>, AppError> {
    require_instructor(&user)?;
    let service = EnrollmentService::new(state.db.clone());
    Ok(Json(service.students_in_class(&user, &id).await?))
}

async fn join_classroom(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<JoinRequest>,
) -> Result<Json<Enrollment>, AppError> {
    require_student(&user)?;
    let service = EnrollmentService::new(state.db.clone());
    Ok(Json(service.join_by_code(&user, &req.join_code).await?))
}

async fn leave_classroom(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    require_student(&user)?;
    let service = EnrollmentService::new(state.db.clone());
    service.leave(&user, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn my_enrolled(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<Classroom>>, AppError> {
    require_student(&user)?;
    let service = EnrollmentService::new(state.db.clone());
    Ok(Json(service.my_enrolled(&user).await?))
}

// ---- leave requests ----

async fn submit_leave_request(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    mut multipart: Multipart,
) -> Result<Json<LeaveRequest>, AppError> {
    require_student(&user)?;

    let mut classroom_id = None;
    let mut absence_date = None;
    let mut reason = None;
    let mut evidence = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("invalid multipart body: {e}")))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("classroom_id") => classroom_id = Some(read_text_field(field).await?),
            Some("absence_date") => absence_date = Some(read_text_field(field).await?),
            Some("reason") => reason = Some(read_text_field(field).await?),
            Some("evidence") => {
                let filename = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("invalid evidence upload: {e}")))?;
                // An empty file part means "no evidence attached".
                if let Some(filename) = filename {
                    if !bytes.is_empty() {
                        evidence =
                            Some(EvidencePayload::new(bytes.to_vec(), filename, content_type)?);
                    }
                }
            }
            _ => {}
        }
    }

    let classroom_id = classroom_id
        .ok_or_else(|| AppError::Validation("classroom_id is required".to_string()))?;
    let absence_date = absence_date
        .ok_or_else(|| AppError::Validation("absence_date is required".to_string()))?;
    let reason = reason.ok_or_else(|| AppError::Validation("reason is required".to_string()))?;
    let absence_date = parse_date(&absence_date)?;

    let service = LeaveRequestService::new(state.db.clone());
    let request = service
        .submit(&user, &classroom_id, absence_date, reason, evidence)
        .await?;
    Ok(Json(request))
}

async fn delete_leave_request(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    require_student(&user)?;
    let service = LeaveRequestService::new(state.db.clone());
    service.delete(&user, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn request_detail(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<LeaveRequest>, AppError> {
    require_student(&user)?;
    let service = LeaveRequestService::new(state.db.clone());
    Ok(Json(service.get_for_student(&user, &id).await?))
}

async fn request_detail_for_instructor(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<LeaveRequest>, AppError> {
    require_instructor(&user)?;
    let service = LeaveRequestService::new(state.db.clone());
    Ok(Json(service.get_for_instructor(&user, &id).await?))
}

async fn my_requests(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(params): Query<DateFilterParams>,
) -> Result<Json<Vec<LeaveRequest>>, AppError> {
    require_student(&user)?;
    let range = params.into_range()?;
    let service = LeaveRequestService::new(state.db.clone());
    Ok(Json(service.my_requests(&user, range).await?))
}

async fn pending_for_class(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    Query(params): Query<DateFilterParams>,
) -> Result<Json<Vec<LeaveRequest>>, AppError> {
    require_instructor(&user)?;
    let range = params.into_range()?;
    let service = LeaveRequestService::new(state.db.clone());
    Ok(Json(service.pending_for_class(&user, &id, range).await?))
}

async fn all_for_class(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Vec<LeaveRequest>>, AppError> {
    require_instructor(&user)?;
    let service = LeaveRequestService::new(state.db.clone());
    Ok(Json(service.all_for_class(&user, &id).await?))
}

async fn all_for_instructor(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<LeaveRequest>>, AppError> {
    require_instructor(&user)?;
    let service = LeaveRequestService::new(state.db.clone());
    Ok(Json(service.all_for_instructor(&user).await?))
}

async fn approve_request(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<LeaveRequest>, AppError> {
    require_instructor(&user)?;
    let service = LeaveRequestService::new(state.db.clone());
    Ok(Json(service.approve(&user, &id).await?))
}

async fn deny_request(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<DenyRequest>,
) -> Result<Json<LeaveRequest>, AppError> {
    require_instructor(&user)?;
    let service = LeaveRequestService::new(state.db.clone());
    Ok(Json(service.deny(&user, &id, req.denial_reason).await?))
}

async fn view_evidence(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let service = LeaveRequestService::new(state.db.clone());
    let request = match user.role {
        Role::Student => service.get_for_student(&user, &id).await?,
        Role::Instructor => service.get_for_instructor(&user, &id).await?,
    };

    let bytes = request.evidence.ok_or(AppError::NotFound("evidence"))?;
    let content_type = request
        .evidence_content_type
        .unwrap_or_else(|| "application/octet-stream".to_string());
    let filename = request
        .evidence_filename
        .unwrap_or_else(|| "evidence".to_string());

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (
                header::CONTENT_DISPOSITION,
                format!("inline; filename=\"{filename}\""),
            ),
        ],
        bytes,
    )
        .into_response())
}

// ---- reports ----

#[derive(Deserialize)]
struct ReportParams {
    from: String,
    to: String,
}

async fn attendance_report(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    Query(params): Query<ReportParams>,
) -> Result<Response, AppError> {
    require_instructor(&user)?;
    let range = DateRange {
        start: parse_date(&params.from)?,
        end: parse_date(&params.to)?,
    };

    let service = ReportService::new(state.db.clone());
    let rows = service.attendance(&user, &id, range).await?;

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record([
            "Student Email",
            "Full Name",
            "Total Requests",
            "Approved",
            "Rejected",
            "Pending",
        ])
        .map_err(|e| AppError::Internal(format!("csv write failed: {e}")))?;
    for row in &rows {
        writer
            .write_record([
                row.email.as_str(),
                row.full_name.as_str(),
                &row.total.to_string(),
                &row.approved.to_string(),
                &row.rejected.to_string(),
                &row.pending.to_string(),
            ])
            .map_err(|e| AppError::Internal(format!("csv write failed: {e}")))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::Internal(format!("csv flush failed: {e}")))?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=UTF-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=attendance_report_{id}.csv"),
            ),
        ],
        bytes,
    )
        .into_response())
}

// ---- helpers ----

#[derive(Deserialize)]
struct DateFilterParams {
    start_date: Option<String>,
    end_date: Option<String>,
}

impl DateFilterParams {
    /// Both bounds or neither; a lone bound is a caller mistake rather than
    /// a half-open range.
    fn into_range(self) -> Result<Option<DateRange>, AppError> {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => Ok(Some(DateRange {
                start: parse_date(&start)?,
                end: parse_date(&end)?,
            })),
            (None, None) => Ok(None),
            _ => Err(AppError::Validation(
                "date filter requires both start_date and end_date".to_string(),
            )),
        }
    }
}

fn parse_date(value: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("invalid date: {value}, expected YYYY-MM-DD")))
}

async fn read_text_field(field: axum::extract::multipart::Field<'_>) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|e| AppError::Validation(format!("invalid multipart field: {e}")))
}
