use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info, warn};
use utoipa::ToSchema;

use crate::{
    api::{created, message, ok},
    auth::auth::AuthUser,
    error::AppError,
    model::{
        mood::Mood,
        owner::{Owner, OwnerKind},
        user::{self, ClassFeedback, User},
    },
    service::{self, attendance, contacts, stats},
    state::AppState,
    store::{Filter, Record},
    utils::{
        contact_index::ContactField,
        patch::{
            decode_document, hash_password_field, merge_patch, new_document,
            normalize_contact_fields, validate_patch,
        },
    },
};

const DEFAULT_MOOD: &str = "Happy";

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClassRef {
    #[schema(example = 12)]
    pub class_id: u64,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationTokenRequest {
    pub notification_token: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AchievementRequest {
    #[schema(example = "First 10 classes")]
    pub achievement: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentRequest {
    pub assessment_id: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentFormRequest {
    pub class_id: u64,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub form_data: Value,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct StatsQuery {
    /// Look-back window in days, 7 when omitted.
    pub days: Option<u32>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JoinResponse {
    #[schema(value_type = String, format = "date-time")]
    pub joined_at: chrono::NaiveDateTime,
    pub already_joined: bool,
}

impl From<attendance::JoinOutcome> for JoinResponse {
    fn from(outcome: attendance::JoinOutcome) -> Self {
        JoinResponse {
            joined_at: outcome.joined_at(),
            already_joined: matches!(outcome, attendance::JoinOutcome::AlreadyJoined(_)),
        }
    }
}

pub(crate) fn view(record: &Record<User>) -> Value {
    record.to_json_without(user::HIDDEN_FIELDS)
}

fn user_not_found() -> AppError {
    AppError::not_found("User not found")
}

async fn load(state: &AppState, id: u64) -> Result<Record<User>, AppError> {
    state.users.get(id).await?.ok_or_else(user_not_found)
}

async fn remember_contacts(state: &AppState, doc: &User) {
    if let Some(mobile) = &doc.mobile {
        state
            .contacts
            .remember(ContactField::Mobile, mobile, OwnerKind::User)
            .await;
    }
    if let Some(email) = &doc.email {
        state
            .contacts
            .remember(ContactField::Email, email, OwnerKind::User)
            .await;
    }
}

/// Re-indexes contacts the user no longer holds; a teacher sharing one keeps it.
async fn release_contacts(state: &AppState, doc: &User) -> Result<(), AppError> {
    if let Some(mobile) = &doc.mobile {
        contacts::release(state, ContactField::Mobile, mobile).await?;
    }
    if let Some(email) = &doc.email {
        contacts::release(state, ContactField::Email, email).await?;
    }
    Ok(())
}

/// Rejects a mobile or e-mail already used by another user.
async fn ensure_unique(
    state: &AppState,
    mobile: Option<&str>,
    email: Option<&str>,
    except: Option<u64>,
) -> Result<(), AppError> {
    for (field, value) in [(ContactField::Mobile, mobile), (ContactField::Email, email)] {
        let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
            continue;
        };
        if !contacts::user_has(state, field, value).await? {
            continue;
        }
        let holder = state.users.find_one(&contacts::by_field(field, value)).await?;
        if holder.is_some_and(|h| Some(h.id) != except) {
            return Err(AppError::conflict(format!("A user with this {field} already exists")));
        }
    }
    Ok(())
}

/// Register a user
#[utoipa::path(
    post,
    path = "/auth/signup",
    request_body(content = Object, example = json!({
        "name": "Mira",
        "companyId": "ACME",
        "email": "mira@example.com",
        "mobile": "9876543210",
        "password": "s3cret"
    })),
    responses(
        (status = 201, description = "User created", body = Object),
        (status = 400, description = "Invalid payload"),
        (status = 409, description = "Mobile or e-mail already registered")
    ),
    tag = "Users"
)]
pub async fn create_user(
    state: web::Data<AppState>,
    payload: web::Json<Value>,
) -> Result<HttpResponse, AppError> {
    let now = service::local_now();
    let mut fields = new_document(payload.into_inner(), user::PROTECTED_FIELDS, now)?;
    hash_password_field(&mut fields)?;
    normalize_contact_fields(&mut fields);
    let doc: User = decode_document(fields)?;

    ensure_unique(&state, doc.mobile.as_deref(), doc.email.as_deref(), None).await?;

    let record = state.users.insert(doc).await?;
    remember_contacts(&state, &record.doc).await;

    state
        .moods
        .insert(Mood {
            user_id: record.id,
            mood: DEFAULT_MOOD.to_string(),
            note: String::new(),
            created_at: now,
        })
        .await?;

    info!(user_id = record.id, "User created");
    Ok(created(view(&record)))
}

/// List users
#[utoipa::path(
    get,
    path = "/api/v1/users",
    responses(
        (status = 200, description = "All users", body = Object),
        (status = 403, description = "Admin/Teacher only")
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
pub async fn list_users(
    auth: AuthUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    auth.require_staff()?;
    let users: Vec<Value> = state.users.all().await?.iter().map(view).collect();
    debug!(count = users.len(), "Listed users");
    Ok(ok(users))
}

/// Get a user
#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    params(("id" = u64, Path, description = "User id")),
    responses(
        (status = 200, description = "The user", body = Object),
        (status = 404, description = "User not found")
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
pub async fn get_user(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    auth.require_self_or_staff(Owner::user(id))?;
    let record = load(&state, id).await?;
    Ok(ok(view(&record)))
}

/// Find a user by mobile number
#[utoipa::path(
    get,
    path = "/api/v1/users/find/{mobile}",
    params(("mobile" = String, Path, description = "Mobile number")),
    responses(
        (status = 200, description = "The user", body = Object),
        (status = 404, description = "User not found")
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
pub async fn find_by_mobile(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    auth.require_staff()?;
    let mobile = path.into_inner();
    let record = state
        .users
        .find_one(&Filter::new().eq("mobile", mobile.trim()))
        .await?
        .ok_or_else(user_not_found)?;
    Ok(ok(view(&record)))
}

/// Update a user
#[utoipa::path(
    patch,
    path = "/api/v1/users/{id}",
    params(("id" = u64, Path, description = "User id")),
    request_body(content = Object, example = json!({"city": "Pune", "weight": "62"})),
    responses(
        (status = 200, description = "Updated user", body = Object),
        (status = 400, description = "Empty payload or protected field"),
        (status = 404, description = "User not found")
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
pub async fn update_user(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
    payload: web::Json<Value>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    auth.require_self(Owner::user(id))?;

    let mut fields = validate_patch(payload.into_inner(), user::PROTECTED_FIELDS)?;
    hash_password_field(&mut fields)?;
    normalize_contact_fields(&mut fields);
    let mobile = fields.get("mobile").and_then(Value::as_str);
    let email = fields.get("email").and_then(Value::as_str);
    ensure_unique(&state, mobile, email, Some(id)).await?;

    let now = service::local_now();
    let before = load(&state, id).await?;
    let (record, ()) = state
        .users
        .update_with(id, |doc| {
            *doc = merge_patch(doc, &fields)?;
            doc.updated_at = now;
            Ok::<_, AppError>(())
        })
        .await?
        .ok_or_else(user_not_found)?;

    release_contacts(&state, &before.doc).await?;
    remember_contacts(&state, &record.doc).await;

    info!(user_id = id, fields = fields.len(), "User updated");
    Ok(ok(view(&record)))
}

/// Delete a user
///
/// Also removes the user's moods, custom sessions and trackers, and their
/// event registrations.
#[utoipa::path(
    delete,
    path = "/api/v1/users/{id}",
    params(("id" = u64, Path, description = "User id")),
    responses(
        (status = 200, description = "User deleted", body = crate::api::MessageResponse),
        (status = 404, description = "User not found")
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
pub async fn delete_user(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    auth.require_self(Owner::user(id))?;

    let record = state.users.delete(id).await?.ok_or_else(user_not_found)?;
    release_contacts(&state, &record.doc).await?;

    let moods = state.moods.delete_many(&Filter::new().eq("userId", id)).await?;
    let sessions = state.sessions.delete_many(&Filter::new().eq("user", id)).await?;
    let trackers = state
        .trackers
        .delete_many(&Filter::new().eq("owner.kind", "user").eq("owner.id", id))
        .await?;

    let registered = state.events.find(&Filter::new().contains("students", id)).await?;
    for event in &registered {
        let result = state
            .events
            .update_with(event.id, |doc| {
                doc.students.retain(|s| *s != id);
                Ok::<_, AppError>(())
            })
            .await;
        if let Err(e) = result {
            warn!(event_id = event.id, user_id = id, error = %e, "Failed to drop event registration");
        }
    }

    info!(
        user_id = id,
        moods,
        sessions,
        trackers,
        events = registered.len(),
        "User deleted"
    );
    Ok(message("User deleted successfully"))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct MobileRequest {
    #[schema(example = "9876543210")]
    pub mobile: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct EmailRequest {
    #[schema(example = "mira@example.com")]
    pub email: String,
}

/// Check whether a mobile number is registered to a user
#[utoipa::path(
    post,
    path = "/auth/check-mobile",
    request_body = MobileRequest,
    responses((status = 200, description = "`exists` flag", body = Object, example = json!({
        "status": "success", "data": {"exists": true}
    }))),
    tag = "Users"
)]
pub async fn check_mobile(
    state: web::Data<AppState>,
    payload: web::Json<MobileRequest>,
) -> Result<HttpResponse, AppError> {
    let exists = contacts::user_has(&state, ContactField::Mobile, &payload.mobile).await?;
    Ok(ok(json!({ "exists": exists })))
}

/// Check whether an e-mail address is registered to a user
#[utoipa::path(
    post,
    path = "/auth/check-email",
    request_body = EmailRequest,
    responses((status = 200, description = "`exists` flag", body = Object)),
    tag = "Users"
)]
pub async fn check_email(
    state: web::Data<AppState>,
    payload: web::Json<EmailRequest>,
) -> Result<HttpResponse, AppError> {
    let exists = contacts::user_has(&state, ContactField::Email, &payload.email).await?;
    Ok(ok(json!({ "exists": exists })))
}

/// Save the device's push notification token
#[utoipa::path(
    post,
    path = "/api/v1/users/{id}/update-token",
    params(("id" = u64, Path, description = "User id")),
    request_body = NotificationTokenRequest,
    responses(
        (status = 200, description = "Token saved", body = crate::api::MessageResponse),
        (status = 404, description = "User not found")
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
pub async fn update_notification_token(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
    payload: web::Json<NotificationTokenRequest>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    auth.require_self(Owner::user(id))?;
    let token = payload.into_inner().notification_token;
    let now = service::local_now();

    state
        .users
        .update_with(id, |doc| {
            doc.notification_token = token.clone();
            doc.updated_at = now;
            Ok::<_, AppError>(())
        })
        .await?
        .ok_or_else(user_not_found)?;

    Ok(message("Notification token updated"))
}

/// Add an achievement
#[utoipa::path(
    put,
    path = "/api/v1/users/{id}/add-achievement",
    params(("id" = u64, Path, description = "User id")),
    request_body = AchievementRequest,
    responses(
        (status = 200, description = "Updated user", body = Object),
        (status = 404, description = "User not found")
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
pub async fn add_achievement(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
    payload: web::Json<AchievementRequest>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    auth.require_self_or_staff(Owner::user(id))?;
    let achievement = payload.into_inner().achievement;
    if achievement.trim().is_empty() {
        return Err(AppError::validation("Achievement is required"));
    }
    let now = service::local_now();

    let (record, ()) = state
        .users
        .update_with(id, |doc| {
            doc.achievements.push(achievement.clone());
            doc.updated_at = now;
            Ok::<_, AppError>(())
        })
        .await?
        .ok_or_else(user_not_found)?;

    Ok(ok(view(&record)))
}

/// Add an assessment reference
#[utoipa::path(
    put,
    path = "/api/v1/users/{id}/add-assessment",
    params(("id" = u64, Path, description = "User id")),
    request_body = AssessmentRequest,
    responses(
        (status = 200, description = "Updated user", body = Object),
        (status = 404, description = "User not found")
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
pub async fn add_assessment(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
    payload: web::Json<AssessmentRequest>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    auth.require_self_or_staff(Owner::user(id))?;
    let assessment = payload.into_inner().assessment_id;
    let now = service::local_now();

    let (record, ()) = state
        .users
        .update_with(id, |doc| {
            if !doc.assessments.contains(&assessment) {
                doc.assessments.push(assessment.clone());
            }
            doc.updated_at = now;
            Ok::<_, AppError>(())
        })
        .await?
        .ok_or_else(user_not_found)?;

    Ok(ok(view(&record)))
}

/// Submit the assessment form for a class
///
/// A second submission for the same class replaces the first.
#[utoipa::path(
    post,
    path = "/api/v1/users/{id}/submit-assessment-form",
    params(("id" = u64, Path, description = "User id")),
    request_body = AssessmentFormRequest,
    responses(
        (status = 200, description = "Feedback stored", body = Object),
        (status = 404, description = "User or class not found")
    ),
    tag = "Users",
    security(("bearer_auth" = []))
)]
pub async fn submit_assessment_form(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
    payload: web::Json<AssessmentFormRequest>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    auth.require_self(Owner::user(id))?;
    let AssessmentFormRequest { class_id, form_data } = payload.into_inner();

    if state.classes.get(class_id).await?.is_none() {
        return Err(AppError::not_found("Class not found"));
    }
    let now = service::local_now();

    let (record, ()) = state
        .users
        .update_with(id, |doc| {
            doc.class_feedback.retain(|f| f.class_id != class_id);
            doc.class_feedback.push(ClassFeedback {
                class_id,
                form_data: form_data.clone(),
            });
            doc.updated_at = now;
            Ok::<_, AppError>(())
        })
        .await?
        .ok_or_else(user_not_found)?;

    info!(user_id = id, class_id, "Assessment form submitted");
    Ok(ok(json!({ "classFeedback": record.doc.class_feedback })))
}

/// Join a class
///
/// Joining twice keeps the first join time.
#[utoipa::path(
    post,
    path = "/api/v1/users/{id}/join",
    params(("id" = u64, Path, description = "User id")),
    request_body = ClassRef,
    responses(
        (status = 200, description = "Join time", body = JoinResponse),
        (status = 404, description = "User or class not found")
    ),
    tag = "Attendance",
    security(("bearer_auth" = []))
)]
pub async fn join_class(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
    payload: web::Json<ClassRef>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    auth.require_self(Owner::user(id))?;

    let outcome = attendance::join_class(
        &state.users,
        &state.classes,
        id,
        payload.class_id,
        service::local_now(),
    )
    .await?;
    Ok(ok(JoinResponse::from(outcome)))
}

/// Leave a class
#[utoipa::path(
    post,
    path = "/api/v1/users/{id}/leave",
    params(("id" = u64, Path, description = "User id")),
    request_body = ClassRef,
    responses(
        (status = 200, description = "Completed attendance record", body = crate::model::attendance::AttendanceRecord),
        (status = 404, description = "User not found or class never joined")
    ),
    tag = "Attendance",
    security(("bearer_auth" = []))
)]
pub async fn leave_class(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
    payload: web::Json<ClassRef>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    auth.require_self(Owner::user(id))?;

    let record =
        attendance::leave_class(&state.users, id, payload.class_id, service::local_now()).await?;
    Ok(ok(record))
}

/// Attendance totals over the last `days` days
#[utoipa::path(
    get,
    path = "/api/v1/users/{id}/stats",
    params(
        ("id" = u64, Path, description = "User id"),
        ("days" = Option<u32>, Query, description = "Window in days, default 7")
    ),
    responses(
        (status = 200, description = "Totals", body = stats::UserStats),
        (status = 404, description = "User not found")
    ),
    tag = "Attendance",
    security(("bearer_auth" = []))
)]
pub async fn user_stats(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
    query: web::Query<StatsQuery>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    auth.require_self_or_staff(Owner::user(id))?;
    let record = load(&state, id).await?;

    let days = query.days.unwrap_or(7);
    Ok(ok(stats::user_stats(
        &record.doc.attendance,
        days,
        service::local_now(),
    )))
}

/// Attendance per day over the trailing week
#[utoipa::path(
    get,
    path = "/api/v1/users/{id}/weekly-stats",
    params(("id" = u64, Path, description = "User id")),
    responses(
        (status = 200, description = "Seven buckets, oldest first", body = [stats::DayStats]),
        (status = 404, description = "User not found")
    ),
    tag = "Attendance",
    security(("bearer_auth" = []))
)]
pub async fn weekly_stats(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    auth.require_self_or_staff(Owner::user(id))?;
    let record = load(&state, id).await?;

    Ok(ok(stats::weekly_stats(
        &record.doc.attendance,
        service::local_now(),
        state.weekly_empty_day_default,
    )))
}
