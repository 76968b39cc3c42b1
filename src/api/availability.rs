use actix_web::{HttpResponse, web};
use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::{
    api::{created, ok},
    auth::auth::AuthUser,
    error::AppError,
    model::{
        availability::{AvailabilitySlot, SlotStatus, hhmm},
        owner::Owner,
    },
    service::{self, availability},
    state::AppState,
};

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateSlot {
    #[schema(example = 3)]
    pub teacher_id: u64,
    #[serde(default)]
    #[schema(example = "morning")]
    pub session: String,
    #[schema(example = "2025-04-20", value_type = String, format = "date")]
    pub date: NaiveDate,
    #[serde(deserialize_with = "hhmm::deserialize")]
    #[schema(example = "08:00", value_type = String)]
    pub start_time: NaiveTime,
    #[serde(deserialize_with = "hhmm::deserialize")]
    #[schema(example = "09:00", value_type = String)]
    pub end_time: NaiveTime,
    #[serde(default)]
    #[schema(example = "custom-session")]
    pub availability_for: String,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSlot {
    pub session: Option<String>,
    #[schema(value_type = Option<String>, format = "date")]
    pub date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "hhmm::option::deserialize")]
    #[schema(value_type = Option<String>, example = "10:00")]
    pub start_time: Option<NaiveTime>,
    #[serde(default, deserialize_with = "hhmm::option::deserialize")]
    #[schema(value_type = Option<String>, example = "11:00")]
    pub end_time: Option<NaiveTime>,
    pub availability_for: Option<String>,
    pub status: Option<SlotStatus>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct TeacherSlotsQuery {
    /// Only slots on this day (`YYYY-MM-DD`).
    pub date: Option<String>,
    pub status: Option<SlotStatus>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(rename_all = "camelCase")]
pub struct AvailableSlotsQuery {
    pub availability_for: Option<String>,
}

fn slot_not_found() -> AppError {
    AppError::not_found("Availability not found")
}

/// Only the owning teacher (or an admin) may change a slot.
async fn authorize_owner(state: &AppState, auth: &AuthUser, id: u64) -> Result<(), AppError> {
    let slot = state.availability.get(id).await?.ok_or_else(slot_not_found)?;
    auth.require_self(Owner::teacher(slot.doc.teacher_id))
}

/// Offer a time slot
#[utoipa::path(
    post,
    path = "/api/v1/availability",
    request_body = CreateSlot,
    responses(
        (status = 201, description = "Slot created", body = AvailabilitySlot),
        (status = 400, description = "Start time not before end time"),
        (status = 404, description = "Teacher not found"),
        (status = 409, description = "Time slot overlaps with existing availability")
    ),
    tag = "Availability",
    security(("bearer_auth" = []))
)]
pub async fn create_availability(
    auth: AuthUser,
    state: web::Data<AppState>,
    payload: web::Json<CreateSlot>,
) -> Result<HttpResponse, AppError> {
    let input = payload.into_inner();
    auth.require_self(Owner::teacher(input.teacher_id))?;

    let record = availability::create(
        &state.availability,
        &state.teachers,
        availability::NewSlot {
            teacher_id: input.teacher_id,
            session: input.session,
            date: input.date,
            start_time: input.start_time,
            end_time: input.end_time,
            availability_for: input.availability_for,
        },
        service::local_now(),
    )
    .await?;
    Ok(created(record))
}

/// Change a slot
#[utoipa::path(
    patch,
    path = "/api/v1/availability/{id}",
    params(("id" = u64, Path, description = "Slot id")),
    request_body = UpdateSlot,
    responses(
        (status = 200, description = "Updated slot", body = AvailabilitySlot),
        (status = 404, description = "Availability not found"),
        (status = 409, description = "Time slot overlaps with existing availability")
    ),
    tag = "Availability",
    security(("bearer_auth" = []))
)]
pub async fn update_availability(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
    payload: web::Json<UpdateSlot>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    authorize_owner(&state, &auth, id).await?;

    let changes = payload.into_inner();
    let record = availability::update(
        &state.availability,
        id,
        availability::SlotChanges {
            session: changes.session,
            date: changes.date,
            start_time: changes.start_time,
            end_time: changes.end_time,
            availability_for: changes.availability_for,
            status: changes.status,
        },
        service::local_now(),
    )
    .await?;
    Ok(ok(record))
}

/// Withdraw a slot
#[utoipa::path(
    delete,
    path = "/api/v1/availability/{id}",
    params(("id" = u64, Path, description = "Slot id")),
    responses(
        (status = 200, description = "Deactivated slot", body = AvailabilitySlot),
        (status = 404, description = "Availability not found")
    ),
    tag = "Availability",
    security(("bearer_auth" = []))
)]
pub async fn delete_availability(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    authorize_owner(&state, &auth, id).await?;

    let record = availability::delete(&state.availability, id, service::local_now()).await?;
    Ok(ok(record))
}

/// A teacher's active slots
#[utoipa::path(
    get,
    path = "/api/v1/availability/teacher/{teacherId}",
    params(("teacherId" = u64, Path, description = "Teacher id"), TeacherSlotsQuery),
    responses((status = 200, description = "Slots by date and start time", body = [AvailabilitySlot])),
    tag = "Availability",
    security(("bearer_auth" = []))
)]
pub async fn list_teacher_availability(
    state: web::Data<AppState>,
    path: web::Path<u64>,
    query: web::Query<TeacherSlotsQuery>,
) -> Result<HttpResponse, AppError> {
    let TeacherSlotsQuery { date, status } = query.into_inner();
    let date = match date {
        Some(raw) => Some(service::parse_day(Some(&raw), "date")?),
        None => None,
    };

    let slots =
        availability::list_for_teacher(&state.availability, path.into_inner(), date, status)
            .await?;
    Ok(ok(slots))
}

/// Bookable slots of a teacher on one day
#[utoipa::path(
    get,
    path = "/api/v1/availability/available-slots/{teacherId}/{date}",
    params(
        ("teacherId" = u64, Path, description = "Teacher id"),
        ("date" = String, Path, description = "Day, `YYYY-MM-DD`"),
        AvailableSlotsQuery
    ),
    responses(
        (status = 200, description = "Available slots, earliest first", body = [AvailabilitySlot]),
        (status = 400, description = "Malformed date")
    ),
    tag = "Availability",
    security(("bearer_auth" = []))
)]
pub async fn available_slots(
    state: web::Data<AppState>,
    path: web::Path<(u64, String)>,
    query: web::Query<AvailableSlotsQuery>,
) -> Result<HttpResponse, AppError> {
    let (teacher_id, raw_date) = path.into_inner();
    let date = service::parse_day(Some(&raw_date), "date")?;

    let slots = availability::available_slots(
        &state.availability,
        teacher_id,
        date,
        query.availability_for.as_deref(),
    )
    .await?;
    Ok(ok(slots))
}
