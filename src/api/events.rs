use actix_web::{HttpResponse, web};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;
use utoipa::ToSchema;

use crate::{
    api::{classes::EndMeetingRequest, created, message, ok},
    auth::auth::AuthUser,
    error::AppError,
    model::{
        event::{self, Event},
        owner::Owner,
    },
    service::{self, meetings},
    state::AppState,
    store::{Filter, Record},
    utils::patch::{merge_patch, validate_patch},
};

const SORT: &[&str] = &["startDate"];

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[schema(example = 7)]
    pub user_id: u64,
}

fn event_not_found() -> AppError {
    AppError::not_found("Event not found")
}

async fn load(state: &AppState, id: u64) -> Result<Record<Event>, AppError> {
    state.events.get(id).await?.ok_or_else(event_not_found)
}

fn upcoming() -> Filter {
    Filter::new().gte("startDate", service::local_now().date().to_string())
}

/// Create an event
#[utoipa::path(
    post,
    path = "/api/v1/events",
    request_body = Event,
    responses(
        (status = 201, description = "Event created", body = Event),
        (status = 403, description = "Admin/Teacher only")
    ),
    tag = "Events",
    security(("bearer_auth" = []))
)]
pub async fn create_event(
    auth: AuthUser,
    state: web::Data<AppState>,
    payload: web::Json<Event>,
) -> Result<HttpResponse, AppError> {
    auth.require_staff()?;
    let mut doc = payload.into_inner();
    doc.students.clear();

    let record = state.events.insert(doc).await?;
    info!(event_id = record.id, "Event created");
    Ok(created(record))
}

/// List events
#[utoipa::path(
    get,
    path = "/api/v1/events",
    responses((status = 200, description = "All events by start date", body = [Event])),
    tag = "Events",
    security(("bearer_auth" = []))
)]
pub async fn list_events(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    Ok(ok(state.events.find_sorted(&Filter::new(), SORT).await?))
}

/// Events starting today or later
#[utoipa::path(
    get,
    path = "/api/v1/events/upcoming",
    responses((status = 200, description = "Upcoming events", body = [Event])),
    tag = "Events",
    security(("bearer_auth" = []))
)]
pub async fn upcoming_events(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    Ok(ok(state.events.find_sorted(&upcoming(), SORT).await?))
}

/// Get an event
#[utoipa::path(
    get,
    path = "/api/v1/events/{id}",
    params(("id" = u64, Path, description = "Event id")),
    responses(
        (status = 200, description = "The event", body = Event),
        (status = 404, description = "Event not found")
    ),
    tag = "Events",
    security(("bearer_auth" = []))
)]
pub async fn get_event(
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    Ok(ok(load(&state, path.into_inner()).await?))
}

/// Update an event
#[utoipa::path(
    patch,
    path = "/api/v1/events/{id}",
    params(("id" = u64, Path, description = "Event id")),
    request_body(content = Object, example = json!({"location": "Online"})),
    responses(
        (status = 200, description = "Updated event", body = Event),
        (status = 400, description = "Empty payload or protected field"),
        (status = 404, description = "Event not found")
    ),
    tag = "Events",
    security(("bearer_auth" = []))
)]
pub async fn update_event(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
    payload: web::Json<Value>,
) -> Result<HttpResponse, AppError> {
    auth.require_staff()?;
    let id = path.into_inner();
    let fields = validate_patch(payload.into_inner(), event::PROTECTED_FIELDS)?;

    let (record, ()) = state
        .events
        .update_with(id, |doc| {
            *doc = merge_patch(doc, &fields)?;
            Ok::<_, AppError>(())
        })
        .await?
        .ok_or_else(event_not_found)?;

    info!(event_id = id, "Event updated");
    Ok(ok(record))
}

/// Delete an event
#[utoipa::path(
    delete,
    path = "/api/v1/events/{id}",
    params(("id" = u64, Path, description = "Event id")),
    responses(
        (status = 200, description = "Event deleted", body = crate::api::MessageResponse),
        (status = 404, description = "Event not found")
    ),
    tag = "Events",
    security(("bearer_auth" = []))
)]
pub async fn delete_event(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    auth.require_staff()?;
    let id = path.into_inner();
    state.events.delete(id).await?.ok_or_else(event_not_found)?;
    info!(event_id = id, "Event deleted");
    Ok(message("Event deleted successfully"))
}

/// End the live meeting of an event
#[utoipa::path(
    post,
    path = "/api/v1/events/{id}/end-meeting",
    params(("id" = u64, Path, description = "Event id")),
    request_body = EndMeetingRequest,
    responses(
        (status = 200, description = "Meeting ended", body = crate::api::MessageResponse),
        (status = 404, description = "Event not found")
    ),
    tag = "Events",
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
        &state.events,
        state.meetings.as_ref(),
        path.into_inner(),
        external,
    )
    .await?;
    Ok(message("Meeting ended"))
}

/// Register a user for an event
#[utoipa::path(
    post,
    path = "/api/v1/events/{id}/register",
    params(("id" = u64, Path, description = "Event id")),
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Event with the user registered", body = Event),
        (status = 404, description = "Event or user not found"),
        (status = 409, description = "User already registered")
    ),
    tag = "Events",
    security(("bearer_auth" = []))
)]
pub async fn register_user(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
    payload: web::Json<RegisterRequest>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let user_id = payload.user_id;
    auth.require_self_or_staff(Owner::user(user_id))?;

    if state.users.get(user_id).await?.is_none() {
        return Err(AppError::not_found("User not found"));
    }

    let (record, ()) = state
        .events
        .update_with(id, |doc| {
            if doc.students.contains(&user_id) {
                return Err(AppError::conflict("User already registered"));
            }
            doc.students.push(user_id);
            Ok::<_, AppError>(())
        })
        .await?
        .ok_or_else(event_not_found)?;

    info!(event_id = id, user_id, "User registered for event");
    Ok(ok(record))
}

/// Registered students of an event
///
/// Only id, name and e-mail of each student are returned.
#[utoipa::path(
    get,
    path = "/api/v1/events/{id}/students",
    params(("id" = u64, Path, description = "Event id")),
    responses(
        (status = 200, description = "Registered students", body = Object, example = json!({
            "status": "success",
            "data": [{"id": 7, "name": "Mira", "email": "mira@example.com"}]
        })),
        (status = 404, description = "Event not found")
    ),
    tag = "Events",
    security(("bearer_auth" = []))
)]
pub async fn event_students(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    auth.require_staff()?;
    let event = load(&state, path.into_inner()).await?;

    let mut students = Vec::with_capacity(event.doc.students.len());
    for user_id in &event.doc.students {
        if let Some(user) = state.users.get(*user_id).await? {
            students.push(json!({
                "id": user.id,
                "name": user.doc.name,
                "email": user.doc.email,
            }));
        }
    }
    Ok(ok(students))
}

/// Events a user is registered for
#[utoipa::path(
    get,
    path = "/api/v1/events/user/{userId}",
    params(("userId" = u64, Path, description = "User id")),
    responses((status = 200, description = "Registered events", body = [Event])),
    tag = "Events",
    security(("bearer_auth" = []))
)]
pub async fn user_events(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    let user_id = path.into_inner();
    auth.require_self_or_staff(Owner::user(user_id))?;

    let filter = Filter::new().contains("students", user_id);
    Ok(ok(state.events.find_sorted(&filter, SORT).await?))
}

/// Upcoming events a user is registered for
#[utoipa::path(
    get,
    path = "/api/v1/events/user/{userId}/upcoming",
    params(("userId" = u64, Path, description = "User id")),
    responses((status = 200, description = "Registered events from today on", body = [Event])),
    tag = "Events",
    security(("bearer_auth" = []))
)]
pub async fn user_upcoming_events(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    let user_id = path.into_inner();
    auth.require_self_or_staff(Owner::user(user_id))?;

    let filter = upcoming().contains("students", user_id);
    Ok(ok(state.events.find_sorted(&filter, SORT).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::role::Role;
    use crate::test_support::{bearer, post_json, request, seed_user, test_state};
    use actix_web::http::{Method, StatusCode};
    use actix_web::test;

    async fn seed_event(state: &AppState, start_date: &str) -> u64 {
        let event: Event = serde_json::from_value(json!({
            "title": "Yoga Day",
            "startDate": start_date,
            "meetingNumber": "999",
            "status": true,
        }))
        .unwrap();
        state.events.insert(event).await.unwrap().id
    }

    #[actix_web::test]
    async fn register_once_then_conflict() {
        let state = test_state();
        let app = crate::test_app!(state);
        let event_id = seed_event(&state, "2999-06-21").await;
        let user = seed_user(&state, "3000000001").await;

        let register = || {
            post_json(&format!("/api/v1/events/{event_id}/register"), json!({"userId": user}))
                .insert_header(bearer(user, Role::User))
                .to_request()
        };
        assert_eq!(test::call_service(&app, register()).await.status(), StatusCode::OK);
        assert_eq!(test::call_service(&app, register()).await.status(), StatusCode::CONFLICT);

        let req = request(Method::GET, &format!("/api/v1/events/{event_id}/students"))
            .insert_header(bearer(1, Role::Admin))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(
            body["data"],
            json!([{"id": user, "name": "Test User", "email": "3000000001@example.com"}])
        );

        let req = request(Method::GET, &format!("/api/v1/events/user/{user}/upcoming"))
            .insert_header(bearer(user, Role::User))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn upcoming_and_end_meeting() {
        let state = test_state();
        let app = crate::test_app!(state);
        seed_event(&state, "2001-06-21").await;
        let future = seed_event(&state, "2999-06-21").await;

        let req = request(Method::GET, "/api/v1/events/upcoming")
            .insert_header(bearer(9, Role::User))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
        assert_eq!(body["data"][0]["id"], future);

        let req = request(Method::POST, &format!("/api/v1/events/{future}/end-meeting"))
            .insert_header(bearer(1, Role::Admin))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
        let stored = state.events.get(future).await.unwrap().unwrap();
        assert!(stored.doc.meeting_number.is_empty());

        let req = request(Method::POST, "/api/v1/events/4242/end-meeting")
            .insert_header(bearer(1, Role::Admin))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn only_staff_create_and_students_are_ignored() {
        let state = test_state();
        let app = crate::test_app!(state);
        let body = json!({"title": "Retreat", "startDate": "2999-01-01", "students": [5, 6]});

        let req = post_json("/api/v1/events", body.clone())
            .insert_header(bearer(5, Role::User))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

        let req = post_json("/api/v1/events", body)
            .insert_header(bearer(2, Role::Teacher))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["data"]["students"], json!([]));
    }
}
