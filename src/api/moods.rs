use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::{IntoParams, ToSchema};

use crate::{
    api::{created, message, ok},
    auth::auth::AuthUser,
    error::AppError,
    model::{mood::Mood, owner::Owner},
    service,
    state::AppState,
    store::{Filter, Record},
};

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddMood {
    #[schema(example = 7)]
    pub user_id: u64,
    #[schema(example = "Calm")]
    pub mood: String,
    #[serde(default)]
    pub note: String,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(rename_all = "camelCase")]
pub struct MoodHistoryQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct MoodHistory {
    pub total: usize,
    #[schema(value_type = Vec<Object>)]
    pub moods: Vec<Record<Mood>>,
}

/// Record a mood
#[utoipa::path(
    post,
    path = "/api/v1/moods",
    request_body = AddMood,
    responses(
        (status = 201, description = "Mood recorded", body = Mood),
        (status = 400, description = "Empty mood"),
        (status = 404, description = "User not found")
    ),
    tag = "Moods",
    security(("bearer_auth" = []))
)]
pub async fn add_mood(
    auth: AuthUser,
    state: web::Data<AppState>,
    payload: web::Json<AddMood>,
) -> Result<HttpResponse, AppError> {
    let AddMood {
        user_id,
        mood,
        note,
    } = payload.into_inner();
    auth.require_self(Owner::user(user_id))?;

    let mood = mood.trim().to_string();
    if mood.is_empty() {
        return Err(AppError::validation("Mood is required"));
    }
    if state.users.get(user_id).await?.is_none() {
        return Err(AppError::not_found("User not found"));
    }

    let record = state
        .moods
        .insert(Mood {
            user_id,
            mood,
            note,
            created_at: service::local_now(),
        })
        .await?;

    info!(mood_id = record.id, user_id, "Mood recorded");
    Ok(created(record))
}

/// Mood history, newest first
///
/// `startDate` and `endDate` are optional whole days, both inclusive.
#[utoipa::path(
    get,
    path = "/api/v1/moods/{userId}/history",
    params(("userId" = u64, Path, description = "User id"), MoodHistoryQuery),
    responses(
        (status = 200, description = "Moods and their count", body = MoodHistory),
        (status = 400, description = "Malformed date")
    ),
    tag = "Moods",
    security(("bearer_auth" = []))
)]
pub async fn mood_history(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
    query: web::Query<MoodHistoryQuery>,
) -> Result<HttpResponse, AppError> {
    let user_id = path.into_inner();
    auth.require_self_or_staff(Owner::user(user_id))?;

    let start = match query.start_date.as_deref() {
        Some(raw) => Some(service::parse_day(Some(raw), "Start date")?),
        None => None,
    };
    let end = match query.end_date.as_deref() {
        Some(raw) => Some(service::parse_day(Some(raw), "End date")?),
        None => None,
    };

    let mut moods = state
        .moods
        .find_sorted(&Filter::new().eq("userId", user_id), &["createdAt"])
        .await?;
    moods.retain(|m| {
        let day = m.doc.created_at.date();
        start.is_none_or(|s| day >= s) && end.is_none_or(|e| day <= e)
    });
    moods.reverse();

    Ok(ok(MoodHistory {
        total: moods.len(),
        moods,
    }))
}

/// The most recent mood
#[utoipa::path(
    get,
    path = "/api/v1/moods/{userId}/latest",
    params(("userId" = u64, Path, description = "User id")),
    responses(
        (status = 200, description = "Latest mood", body = Mood),
        (status = 404, description = "No mood recorded")
    ),
    tag = "Moods",
    security(("bearer_auth" = []))
)]
pub async fn latest_mood(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    let user_id = path.into_inner();
    auth.require_self_or_staff(Owner::user(user_id))?;

    let latest = state
        .moods
        .find_sorted(&Filter::new().eq("userId", user_id), &["createdAt"])
        .await?
        .pop()
        .ok_or_else(|| AppError::not_found("No mood found for this user"))?;
    Ok(ok(latest))
}

/// Delete a mood
#[utoipa::path(
    delete,
    path = "/api/v1/moods/{moodId}",
    params(("moodId" = u64, Path, description = "Mood id")),
    responses(
        (status = 200, description = "Mood deleted", body = crate::api::MessageResponse),
        (status = 404, description = "Mood not found")
    ),
    tag = "Moods",
    security(("bearer_auth" = []))
)]
pub async fn delete_mood(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let mood = state
        .moods
        .get(id)
        .await?
        .ok_or_else(|| AppError::not_found("Mood not found"))?;
    auth.require_self(Owner::user(mood.doc.user_id))?;

    state.moods.delete(id).await?;
    info!(mood_id = id, "Mood deleted");
    Ok(message("Mood deleted successfully"))
}
