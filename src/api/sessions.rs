use actix_web::{HttpResponse, web};
use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;
use utoipa::ToSchema;

use crate::{
    api::{classes::EndMeetingRequest, created, message, ok},
    auth::auth::AuthUser,
    error::AppError,
    model::{
        availability::hhmm,
        custom_session::{self, CustomSession, SessionStatus},
        owner::Owner,
    },
    service::{self, meetings},
    state::AppState,
    store::{Filter, Record},
    utils::patch::{merge_patch, validate_patch},
};

const SORT: &[&str] = &["date", "startTime"];

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateSession {
    #[schema(example = 7)]
    pub user: u64,
    #[schema(example = "Back care one-to-one")]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[schema(example = "2025-04-20", value_type = String, format = "date")]
    pub date: NaiveDate,
    #[serde(deserialize_with = "hhmm::deserialize")]
    #[schema(example = "17:00", value_type = String)]
    pub start_time: NaiveTime,
    #[serde(deserialize_with = "hhmm::deserialize")]
    #[schema(example = "18:00", value_type = String)]
    pub end_time: NaiveTime,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApproveSession {
    #[schema(example = 3)]
    pub teacher_id: Option<u64>,
    pub meeting_number: Option<String>,
}

fn session_not_found() -> AppError {
    AppError::not_found("Session not found")
}

async fn load(state: &AppState, id: u64) -> Result<Record<CustomSession>, AppError> {
    state.sessions.get(id).await?.ok_or_else(session_not_found)
}

fn format_time(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

/// Request a one-to-one session
#[utoipa::path(
    post,
    path = "/api/v1/sessions",
    request_body = CreateSession,
    responses(
        (status = 201, description = "Session requested, pending approval", body = Object),
        (status = 400, description = "Start time not before end time"),
        (status = 404, description = "User not found")
    ),
    tag = "Sessions",
    security(("bearer_auth" = []))
)]
pub async fn create_session(
    auth: AuthUser,
    state: web::Data<AppState>,
    payload: web::Json<CreateSession>,
) -> Result<HttpResponse, AppError> {
    let req = payload.into_inner();
    auth.require_self(Owner::user(req.user))?;

    if req.title.trim().is_empty() {
        return Err(AppError::validation("Title is required"));
    }
    if req.start_time >= req.end_time {
        return Err(AppError::validation("Start time must be before end time"));
    }
    if state.users.get(req.user).await?.is_none() {
        return Err(AppError::not_found("User not found"));
    }

    let now = service::local_now();
    let record = state
        .sessions
        .insert(CustomSession {
            user: req.user,
            teacher: None,
            title: req.title.trim().to_string(),
            description: req.description,
            date: req.date,
            start_time: format_time(req.start_time),
            end_time: format_time(req.end_time),
            status: SessionStatus::Pending,
            meeting_number: String::new(),
            created_at: now,
            updated_at: now,
        })
        .await?;

    info!(session_id = record.id, user_id = req.user, "Session requested");
    Ok(created(record))
}

/// List all sessions
#[utoipa::path(
    get,
    path = "/api/v1/sessions",
    responses((status = 200, description = "All sessions", body = Object)),
    tag = "Sessions",
    security(("bearer_auth" = []))
)]
pub async fn list_sessions(
    auth: AuthUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    auth.require_staff()?;
    Ok(ok(state.sessions.find_sorted(&Filter::new(), SORT).await?))
}

/// Get a session
#[utoipa::path(
    get,
    path = "/api/v1/sessions/{id}",
    params(("id" = u64, Path, description = "Session id")),
    responses(
        (status = 200, description = "The session", body = Object),
        (status = 404, description = "Session not found")
    ),
    tag = "Sessions",
    security(("bearer_auth" = []))
)]
pub async fn get_session(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    let session = load(&state, path.into_inner()).await?;
    auth.require_self_or_staff(Owner::user(session.doc.user))?;
    Ok(ok(session))
}

/// Update a session
#[utoipa::path(
    patch,
    path = "/api/v1/sessions/{id}",
    params(("id" = u64, Path, description = "Session id")),
    request_body(content = Object, example = json!({"description": "Lower back focus"})),
    responses(
        (status = 200, description = "Updated session", body = Object),
        (status = 400, description = "Empty payload or protected field"),
        (status = 404, description = "Session not found")
    ),
    tag = "Sessions",
    security(("bearer_auth" = []))
)]
pub async fn update_session(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
    payload: web::Json<Value>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let owner = load(&state, id).await?.doc.user;
    auth.require_self_or_staff(Owner::user(owner))?;

    let fields = validate_patch(payload.into_inner(), custom_session::PROTECTED_FIELDS)?;
    let now = service::local_now();

    let (record, ()) = state
        .sessions
        .update_with(id, |doc| {
            *doc = merge_patch(doc, &fields)?;
            doc.updated_at = now;
            Ok::<_, AppError>(())
        })
        .await?
        .ok_or_else(session_not_found)?;

    info!(session_id = id, "Session updated");
    Ok(ok(record))
}

/// Delete a session
#[utoipa::path(
    delete,
    path = "/api/v1/sessions/{id}",
    params(("id" = u64, Path, description = "Session id")),
    responses(
        (status = 200, description = "Session deleted", body = crate::api::MessageResponse),
        (status = 404, description = "Session not found")
    ),
    tag = "Sessions",
    security(("bearer_auth" = []))
)]
pub async fn delete_session(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let owner = load(&state, id).await?.doc.user;
    auth.require_self_or_staff(Owner::user(owner))?;

    state.sessions.delete(id).await?;
    info!(session_id = id, "Session deleted");
    Ok(message("Session deleted successfully"))
}

/// Approve a session
///
/// Optionally assigns the teacher and the meeting number in the same step.
#[utoipa::path(
    put,
    path = "/api/v1/sessions/{id}/approve",
    params(("id" = u64, Path, description = "Session id")),
    request_body = ApproveSession,
    responses(
        (status = 200, description = "Approved session", body = Object),
        (status = 404, description = "Session or teacher not found")
    ),
    tag = "Sessions",
    security(("bearer_auth" = []))
)]
pub async fn approve_session(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
    payload: Option<web::Json<ApproveSession>>,
) -> Result<HttpResponse, AppError> {
    auth.require_staff()?;
    let id = path.into_inner();
    let ApproveSession {
        teacher_id,
        meeting_number,
    } = payload.map(|p| p.into_inner()).unwrap_or_default();

    if let Some(teacher_id) = teacher_id {
        if state.teachers.get(teacher_id).await?.is_none() {
            return Err(AppError::not_found("Teacher not found"));
        }
    }
    let now = service::local_now();

    let (record, ()) = state
        .sessions
        .update_with(id, |doc| {
            doc.status = SessionStatus::Approved;
            if teacher_id.is_some() {
                doc.teacher = teacher_id;
            }
            if let Some(number) = &meeting_number {
                doc.meeting_number = number.clone();
            }
            doc.updated_at = now;
            Ok::<_, AppError>(())
        })
        .await?
        .ok_or_else(session_not_found)?;

    info!(session_id = id, teacher_id = ?record.doc.teacher, "Session approved");
    Ok(ok(record))
}

/// Sessions requested by a user
#[utoipa::path(
    get,
    path = "/api/v1/sessions/user/{userId}",
    params(("userId" = u64, Path, description = "User id")),
    responses((status = 200, description = "The user's sessions", body = Object)),
    tag = "Sessions",
    security(("bearer_auth" = []))
)]
pub async fn user_sessions(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    let user_id = path.into_inner();
    auth.require_self_or_staff(Owner::user(user_id))?;

    let filter = Filter::new().eq("user", user_id);
    Ok(ok(state.sessions.find_sorted(&filter, SORT).await?))
}

/// A user's sessions from today on
#[utoipa::path(
    get,
    path = "/api/v1/sessions/user/{userId}/upcoming",
    params(("userId" = u64, Path, description = "User id")),
    responses((status = 200, description = "Upcoming sessions", body = Object)),
    tag = "Sessions",
    security(("bearer_auth" = []))
)]
pub async fn user_upcoming_sessions(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    let user_id = path.into_inner();
    auth.require_self_or_staff(Owner::user(user_id))?;

    let filter = Filter::new()
        .eq("user", user_id)
        .gte("date", service::local_now().date().to_string());
    Ok(ok(state.sessions.find_sorted(&filter, SORT).await?))
}

/// One session of a user
#[utoipa::path(
    get,
    path = "/api/v1/sessions/user/{userId}/{sessionId}",
    params(
        ("userId" = u64, Path, description = "User id"),
        ("sessionId" = u64, Path, description = "Session id")
    ),
    responses(
        (status = 200, description = "The session", body = Object),
        (status = 404, description = "No such session for this user")
    ),
    tag = "Sessions",
    security(("bearer_auth" = []))
)]
pub async fn user_session_detail(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<(u64, u64)>,
) -> Result<HttpResponse, AppError> {
    let (user_id, session_id) = path.into_inner();
    auth.require_self_or_staff(Owner::user(user_id))?;

    let session = load(&state, session_id).await?;
    if session.doc.user != user_id {
        return Err(session_not_found());
    }
    Ok(ok(session))
}

/// Sessions assigned to a teacher
#[utoipa::path(
    get,
    path = "/api/v1/sessions/teacher/{teacherId}",
    params(("teacherId" = u64, Path, description = "Teacher id")),
    responses((status = 200, description = "The teacher's sessions", body = Object)),
    tag = "Sessions",
    security(("bearer_auth" = []))
)]
pub async fn teacher_sessions(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    let teacher_id = path.into_inner();
    auth.require_self_or_staff(Owner::teacher(teacher_id))?;

    let filter = Filter::new().eq("teacher", teacher_id);
    Ok(ok(state.sessions.find_sorted(&filter, SORT).await?))
}

/// End the live meeting of a session
///
/// Marks the session completed.
#[utoipa::path(
    post,
    path = "/api/v1/sessions/{id}/end-meeting",
    params(("id" = u64, Path, description = "Session id")),
    request_body = EndMeetingRequest,
    responses(
        (status = 200, description = "Meeting ended", body = crate::api::MessageResponse),
        (status = 404, description = "Session not found")
    ),
    tag = "Sessions",
    security(("bearer_auth" = []))
)]
pub async fn end_meeting(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
    payload: Option<web::Json<EndMeetingRequest>>,
) -> Result<HttpResponse, AppError> {
    auth.require_staff()?;
    let external = payload.and_then(|p| p.into_inner().external());

    meetings::end_meeting(
        &state.sessions,
        state.meetings.as_ref(),
        path.into_inner(),
        external,
    )
    .await?;
    Ok(message("Meeting ended"))
}
