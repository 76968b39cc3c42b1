//! One set of handlers for every tracker scope. The scope's
//! [`TrackerRoute`] (registered as app data) says whose tracker and which
//! metric a request is about.

use actix_web::{HttpResponse, web};
use serde::Deserialize;
use serde_json::json;
use utoipa::{IntoParams, ToSchema};

use crate::{
    api::{created, ok},
    auth::auth::AuthUser,
    error::AppError,
    model::{
        owner::{Owner, OwnerKind},
        tracker::Metric,
    },
    service::{self, tracker},
    state::AppState,
};

/// Binds a URL scope to an owner kind and metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackerRoute {
    pub kind: OwnerKind,
    pub metric: Metric,
}

impl TrackerRoute {
    pub const USER_STEPS: TrackerRoute = TrackerRoute {
        kind: OwnerKind::User,
        metric: Metric::Steps,
    };
    pub const USER_WATER: TrackerRoute = TrackerRoute {
        kind: OwnerKind::User,
        metric: Metric::Water,
    };
    pub const TEACHER_WATER: TrackerRoute = TrackerRoute {
        kind: OwnerKind::Teacher,
        metric: Metric::Water,
    };

    fn owner(self, id: u64) -> Owner {
        Owner {
            kind: self.kind,
            id,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InitializeTracker {
    /// Also accepted as `userId` or `teacherId`.
    #[serde(alias = "userId", alias = "teacherId")]
    #[schema(example = 7)]
    pub owner_id: u64,
    #[schema(example = 2000.0)]
    pub daily_goal: Option<f64>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGoal {
    #[schema(example = 8000.0)]
    pub daily_goal: f64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RecordEntry {
    /// Steps or millilitres; also accepted as `steps` or `amount`.
    #[serde(alias = "steps", alias = "amount")]
    #[schema(example = 500.0)]
    pub value: f64,
    #[serde(default)]
    pub distance: f64,
    #[serde(default)]
    pub calories: f64,
    #[serde(default)]
    pub note: String,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct HistoryQuery {
    /// Day to report, `YYYY-MM-DD`.
    pub date: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(rename_all = "camelCase")]
pub struct RangeQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

async fn ensure_owner_exists(state: &AppState, owner: Owner) -> Result<(), AppError> {
    let exists = match owner.kind {
        OwnerKind::User => state.users.get(owner.id).await?.is_some(),
        OwnerKind::Teacher => state.teachers.get(owner.id).await?.is_some(),
    };
    if exists {
        Ok(())
    } else {
        Err(AppError::not_found(format!("{} not found", owner.kind.title())))
    }
}

/// Start tracking
#[utoipa::path(
    post,
    path = "/api/v1/{tracker}/initialize",
    params(("tracker" = String, Path, description = "`step-tracker`, `water-intake` or `teacher-water-intake`")),
    request_body = InitializeTracker,
    responses(
        (status = 201, description = "Tracker created", body = crate::model::tracker::Tracker),
        (status = 400, description = "Non-positive goal"),
        (status = 404, description = "Owner not found"),
        (status = 409, description = "Already initialized")
    ),
    tag = "Trackers",
    security(("bearer_auth" = []))
)]
pub async fn initialize(
    auth: AuthUser,
    route: web::Data<TrackerRoute>,
    state: web::Data<AppState>,
    payload: web::Json<InitializeTracker>,
) -> Result<HttpResponse, AppError> {
    let owner = route.owner(payload.owner_id);
    auth.require_self(owner)?;
    ensure_owner_exists(&state, owner).await?;

    let record = tracker::initialize(
        &state.trackers,
        owner,
        route.metric,
        payload.daily_goal,
        service::local_now(),
    )
    .await?;
    Ok(created(record))
}

/// Change the daily goal
#[utoipa::path(
    patch,
    path = "/api/v1/{tracker}/{ownerId}/goal",
    params(
        ("tracker" = String, Path, description = "Tracker scope"),
        ("ownerId" = u64, Path, description = "User or teacher id")
    ),
    request_body = UpdateGoal,
    responses(
        (status = 200, description = "Updated tracker", body = crate::model::tracker::Tracker),
        (status = 400, description = "Non-positive goal"),
        (status = 404, description = "Tracker not initialized")
    ),
    tag = "Trackers",
    security(("bearer_auth" = []))
)]
pub async fn update_goal(
    auth: AuthUser,
    route: web::Data<TrackerRoute>,
    state: web::Data<AppState>,
    path: web::Path<u64>,
    payload: web::Json<UpdateGoal>,
) -> Result<HttpResponse, AppError> {
    let owner = route.owner(path.into_inner());
    auth.require_self(owner)?;

    let record = tracker::update_daily_goal(
        &state.trackers,
        owner,
        route.metric,
        payload.daily_goal,
        service::local_now(),
    )
    .await?;
    Ok(ok(record))
}

/// Record steps or water intake
#[utoipa::path(
    post,
    path = "/api/v1/{tracker}/{ownerId}/entries",
    params(
        ("tracker" = String, Path, description = "Tracker scope"),
        ("ownerId" = u64, Path, description = "User or teacher id")
    ),
    request_body = RecordEntry,
    responses(
        (status = 201, description = "Entry and today's summary", body = Object, example = json!({
            "status": "success",
            "data": {
                "entry": {"value": 600.0, "distance": 0.0, "calories": 0.0, "note": "", "timestamp": "2025-04-20T14:02:11"},
                "dailySummary": {"date": "2025-04-20", "total": 2100.0, "totalDistance": 0.0, "totalCalories": 0.0, "goalAchieved": true}
            }
        })),
        (status = 400, description = "Non-positive value"),
        (status = 404, description = "Tracker not initialized")
    ),
    tag = "Trackers",
    security(("bearer_auth" = []))
)]
pub async fn record_entry(
    auth: AuthUser,
    route: web::Data<TrackerRoute>,
    state: web::Data<AppState>,
    path: web::Path<u64>,
    payload: web::Json<RecordEntry>,
) -> Result<HttpResponse, AppError> {
    let owner = route.owner(path.into_inner());
    auth.require_self(owner)?;

    let RecordEntry {
        value,
        distance,
        calories,
        note,
    } = payload.into_inner();
    let (record, summary) = tracker::record_entry(
        &state.trackers,
        owner,
        route.metric,
        tracker::NewEntry {
            value,
            distance,
            calories,
            note,
        },
        service::local_now(),
    )
    .await?;

    Ok(created(json!({
        "entry": record.doc.entries.last(),
        "dailySummary": summary,
    })))
}

/// Today's total
#[utoipa::path(
    get,
    path = "/api/v1/{tracker}/{ownerId}/today",
    params(
        ("tracker" = String, Path, description = "Tracker scope"),
        ("ownerId" = u64, Path, description = "User or teacher id")
    ),
    responses(
        (status = 200, description = "Today's summary, zero when nothing was recorded", body = crate::model::tracker::DailySummary),
        (status = 404, description = "Tracker not initialized")
    ),
    tag = "Trackers",
    security(("bearer_auth" = []))
)]
pub async fn today(
    auth: AuthUser,
    route: web::Data<TrackerRoute>,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    let owner = route.owner(path.into_inner());
    auth.require_self_or_staff(owner)?;

    let record = tracker::find(&state.trackers, owner, route.metric).await?;
    Ok(ok(tracker::today_summary(&record.doc, service::local_now())))
}

/// Entries and total of one day
#[utoipa::path(
    get,
    path = "/api/v1/{tracker}/{ownerId}/history",
    params(
        ("tracker" = String, Path, description = "Tracker scope"),
        ("ownerId" = u64, Path, description = "User or teacher id"),
        HistoryQuery
    ),
    responses(
        (status = 200, description = "The day's entries and summary", body = tracker::DateHistory),
        (status = 400, description = "Missing or malformed date"),
        (status = 404, description = "Tracker not initialized")
    ),
    tag = "Trackers",
    security(("bearer_auth" = []))
)]
pub async fn history(
    auth: AuthUser,
    route: web::Data<TrackerRoute>,
    state: web::Data<AppState>,
    path: web::Path<u64>,
    query: web::Query<HistoryQuery>,
) -> Result<HttpResponse, AppError> {
    let owner = route.owner(path.into_inner());
    auth.require_self_or_staff(owner)?;
    let date = service::parse_day(query.date.as_deref(), "Date")?;

    let record = tracker::find(&state.trackers, owner, route.metric).await?;
    Ok(ok(tracker::date_history(&record.doc, date)))
}

/// Entries and totals over a range of days
#[utoipa::path(
    get,
    path = "/api/v1/{tracker}/{ownerId}/range",
    params(
        ("tracker" = String, Path, description = "Tracker scope"),
        ("ownerId" = u64, Path, description = "User or teacher id"),
        RangeQuery
    ),
    responses(
        (status = 200, description = "Entries and summaries, both ends inclusive", body = tracker::RangeHistory),
        (status = 400, description = "Missing or malformed startDate/endDate"),
        (status = 404, description = "Tracker not initialized")
    ),
    tag = "Trackers",
    security(("bearer_auth" = []))
)]
pub async fn range(
    auth: AuthUser,
    route: web::Data<TrackerRoute>,
    state: web::Data<AppState>,
    path: web::Path<u64>,
    query: web::Query<RangeQuery>,
) -> Result<HttpResponse, AppError> {
    let owner = route.owner(path.into_inner());
    auth.require_self_or_staff(owner)?;
    let start = service::parse_day(query.start_date.as_deref(), "Start date")?;
    let end = service::parse_day(query.end_date.as_deref(), "End date")?;

    let record = tracker::find(&state.trackers, owner, route.metric).await?;
    Ok(ok(tracker::date_range_history(&record.doc, start, end)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::role::Role;
    use crate::test_support::{bearer, post_json, request, seed_teacher, seed_user, test_state};
    use actix_web::http::{Method, StatusCode};
    use actix_web::test;
    use serde_json::Value;

    #[actix_web::test]
    async fn water_goal_reached_after_two_entries() {
        let state = test_state();
        let app = crate::test_app!(state);
        let id = seed_user(&state, "8000000001").await;

        let req = post_json("/api/v1/water-intake/initialize", json!({"userId": id, "dailyGoal": 2000}))
            .insert_header(bearer(id, Role::User))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

        for amount in [1500, 600] {
            let req = post_json(&format!("/api/v1/water-intake/{id}/intake"), json!({"amount": amount}))
                .insert_header(bearer(id, Role::User))
                .to_request();
            assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);
        }

        let req = request(Method::GET, &format!("/api/v1/water-intake/{id}/today"))
            .insert_header(bearer(id, Role::User))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["total"], 2100.0);
        assert_eq!(body["data"]["goalAchieved"], true);

        let today = service::local_now().date().to_string();
        let req = request(
            Method::GET,
            &format!("/api/v1/water-intake/{id}/history?date={today}"),
        )
        .insert_header(bearer(id, Role::User))
        .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["entries"].as_array().unwrap().len(), 2);
    }

    #[actix_web::test]
    async fn metrics_are_tracked_separately() {
        let state = test_state();
        let app = crate::test_app!(state);
        let id = seed_user(&state, "8000000002").await;

        let req = post_json("/api/v1/step-tracker/initialize", json!({"userId": id}))
            .insert_header(bearer(id, Role::User))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["dailyGoal"], 10000.0);

        let req = request(Method::GET, &format!("/api/v1/water-intake/{id}/today"))
            .insert_header(bearer(id, Role::User))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Water intake tracking not found for this user");

        let req = post_json("/api/v1/step-tracker/initialize", json!({"userId": id}))
            .insert_header(bearer(id, Role::User))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);
    }

    #[actix_web::test]
    async fn non_positive_entry_and_missing_date_are_rejected() {
        let state = test_state();
        let app = crate::test_app!(state);
        let id = seed_user(&state, "8000000003").await;

        let req = post_json("/api/v1/step-tracker/initialize", json!({"userId": id}))
            .insert_header(bearer(id, Role::User))
            .to_request();
        test::call_service(&app, req).await;

        let req = post_json(&format!("/api/v1/step-tracker/{id}/steps"), json!({"steps": 0}))
            .insert_header(bearer(id, Role::User))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let req = request(Method::GET, &format!("/api/v1/step-tracker/{id}/range?startDate=2025-04-01"))
            .insert_header(bearer(id, Role::User))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "End date is required");
    }

    #[actix_web::test]
    async fn teacher_water_requires_existing_teacher() {
        let state = test_state();
        let app = crate::test_app!(state);
        let id = seed_teacher(&state, "8000000004").await;

        let req = post_json("/api/v1/teacher-water-intake/initialize", json!({"teacherId": id + 50}))
            .insert_header(bearer(1, Role::Admin))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

        let req = post_json("/api/v1/teacher-water-intake/initialize", json!({"teacherId": id}))
            .insert_header(bearer(id, Role::Teacher))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

        let tracker = state.trackers.all().await.unwrap();
        assert_eq!(tracker[0].doc.owner, Owner::teacher(id));
    }
}
