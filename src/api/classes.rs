use actix_web::{HttpResponse, web};
use chrono::{Days, NaiveDate};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info};
use utoipa::ToSchema;

use crate::{
    api::{created, message, ok},
    auth::auth::AuthUser,
    error::AppError,
    model::{
        class::{self, YogaClass},
        owner::Owner,
    },
    service::{
        self,
        meetings::{self, ExternalMeeting},
    },
    state::AppState,
    store::{Filter, Record},
    utils::patch::{merge_patch, validate_patch},
};

const SORT: &[&str] = &["schedule", "startTime"];

/// Optional credentials for removing the meeting at the provider too.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EndMeetingRequest {
    pub token: Option<String>,
    #[schema(example = "85746065432")]
    pub meeting_id: Option<String>,
}

impl EndMeetingRequest {
    pub fn external(self) -> Option<ExternalMeeting> {
        match (self.token, self.meeting_id) {
            (Some(token), Some(meeting_id)) if !meeting_id.is_empty() => {
                Some(ExternalMeeting { token, meeting_id })
            }
            _ => None,
        }
    }
}

/// A catalogue class, scheduled `days_ahead` days from the day it is seeded.
struct CatalogueClass {
    title: &'static str,
    description: &'static str,
    start_time: &'static str,
    end_time: &'static str,
    days_ahead: u64,
    how_it_will_help: &'static str,
    how_it_will_not_help: &'static str,
    who_its_for: &'static str,
    who_its_not_for: &'static str,
}

const CATALOGUE: &[CatalogueClass] = &[
    CatalogueClass {
        title: "Core Strength Yoga",
        description: "A session designed to build core stability and strength through controlled movements and mindful engagement. It includes deep abdominal work and balancing postures.",
        start_time: "07:30",
        end_time: "08:45",
        days_ahead: 1,
        how_it_will_help: "Enhances core strength, improves posture, and reduces back pain. Helps in developing better body control and stability.",
        how_it_will_not_help: "Not focused on full-body muscle building or high-intensity weight training. It may not provide rapid weight loss results.",
        who_its_for: "Perfect for those wanting to improve core strength and stability. Ideal for individuals with weak abdominal muscles or lower back issues.",
        who_its_not_for: "Not suitable for those looking for a relaxing or meditative yoga session. May not be the best fit for those with severe spinal injuries.",
    },
    CatalogueClass {
        title: "Evening Unwind Yoga",
        description: "A gentle evening session focused on releasing tension and calming the nervous system. It incorporates slow stretches and deep relaxation techniques.",
        start_time: "18:30",
        end_time: "19:45",
        days_ahead: 2,
        how_it_will_help: "Helps in unwinding after a long day, improves sleep quality, and promotes relaxation. Reduces stress and soothes the nervous system.",
        how_it_will_not_help: "Not meant for building strength or increasing endurance. It does not offer high-intensity movements or dynamic sequences.",
        who_its_for: "Great for individuals who want to relax and destress in the evening. Ideal for those struggling with sleep issues or anxiety.",
        who_its_not_for: "Not for people looking for a high-energy workout or cardio session. May not be suitable for those wanting fast-paced yoga flows.",
    },
    CatalogueClass {
        title: "Detox & Cleanse Yoga",
        description: "A revitalizing practice focusing on detoxifying the body through deep twists, breathwork, and fluid movements. Helps in boosting digestion and energy levels.",
        start_time: "07:00",
        end_time: "08:15",
        days_ahead: 3,
        how_it_will_help: "Aids digestion, improves circulation, and supports the body's natural detoxification process. Enhances overall vitality and well-being.",
        how_it_will_not_help: "Not a substitute for medical detox programs or dietary changes. It won't provide extreme weight loss in a short time.",
        who_its_for: "Perfect for those wanting to improve digestion and feel rejuvenated. Great for individuals looking to reset their body and mind.",
        who_its_not_for: "Not ideal for those looking for an intense strength-building workout. May not be suitable for people with severe digestive disorders.",
    },
    CatalogueClass {
        title: "Balance & Stability Yoga",
        description: "A practice focusing on improving balance, coordination, and stability through controlled poses. Strengthens key muscle groups while enhancing body awareness.",
        start_time: "08:00",
        end_time: "09:20",
        days_ahead: 4,
        how_it_will_help: "Develops balance, strengthens core muscles, and enhances coordination. Helps in preventing falls and injuries by improving body control.",
        how_it_will_not_help: "Not designed for intense muscle building or weight training. It does not provide a high-calorie burn workout.",
        who_its_for: "Great for those looking to improve balance and prevent injuries. Ideal for athletes and individuals working on body coordination.",
        who_its_not_for: "Not for those seeking a relaxing or meditative session. May not be suitable for individuals with severe balance disorders.",
    },
    CatalogueClass {
        title: "Heart-Opening Yoga Flow",
        description: "A gentle yet energizing practice designed to open the chest and shoulders. It includes backbends and stretches that release emotional tension and enhance posture.",
        start_time: "07:15",
        end_time: "08:30",
        days_ahead: 5,
        how_it_will_help: "Improves spinal flexibility, enhances posture, and releases stored tension. Supports emotional well-being and boosts confidence.",
        how_it_will_not_help: "Not a high-intensity strength or endurance workout. It may not help in immediate weight loss or muscle building.",
        who_its_for: "Ideal for those who want to improve posture and reduce stiffness. Great for individuals looking to open up emotionally and physically.",
        who_its_not_for: "Not suitable for those with severe back injuries or limited spinal flexibility. May not be ideal for those wanting fast movements.",
    },
    CatalogueClass {
        title: "Yoga for Stress & Anxiety",
        description: "A slow-paced session designed to calm the mind and body through deep breathing and grounding poses. Helps in reducing stress and promoting emotional balance.",
        start_time: "18:00",
        end_time: "19:30",
        days_ahead: 6,
        how_it_will_help: "Relieves stress, reduces anxiety, and promotes relaxation. Helps in cultivating mindfulness and emotional resilience.",
        how_it_will_not_help: "Not a replacement for professional therapy or medical treatments. It does not provide a cardiovascular workout or intense calorie burn.",
        who_its_for: "Great for anyone dealing with stress, anxiety, or emotional imbalance. Suitable for those seeking relaxation and mindfulness.",
        who_its_not_for: "Not for those looking for an intense workout or fast-paced session. May not be ideal for people who prefer high-energy yoga.",
    },
    CatalogueClass {
        title: "Sun Salutation Flow",
        description: "A dynamic session focusing on repeated sun salutations to build heat and flexibility. It includes seamless transitions to energize and strengthen the body.",
        start_time: "07:00",
        end_time: "08:15",
        days_ahead: 7,
        how_it_will_help: "Improves endurance, builds strength, and enhances flexibility. Boosts circulation and helps in kickstarting the metabolism.",
        how_it_will_not_help: "Not a slow, restorative practice for deep relaxation. It may not be suitable for individuals with limited mobility or injuries.",
        who_its_for: "Perfect for those looking to boost energy and flexibility. Great for individuals who enjoy dynamic and flowing movements.",
        who_its_not_for: "Not ideal for people looking for stillness or deep relaxation. May not suit beginners unfamiliar with sun salutations.",
    },
    CatalogueClass {
        title: "Yin Yoga for Deep Stretching",
        description: "A slow and meditative session focusing on deep holds and passive stretching. It targets connective tissues, promoting flexibility and relaxation.",
        start_time: "19:00",
        end_time: "20:15",
        days_ahead: 8,
        how_it_will_help: "Enhances deep tissue flexibility, reduces tension, and improves circulation. Helps in relaxation and emotional grounding.",
        how_it_will_not_help: "Not focused on strength building or fast movements. It may not provide a cardio workout or quick fitness gains.",
        who_its_for: "Best for individuals looking for deep relaxation and flexibility. Ideal for those needing a slow, meditative practice.",
        who_its_not_for: "Not suitable for those seeking a fast-paced or intense workout. May not be ideal for those with limited patience for long holds.",
    },
];

impl CatalogueClass {
    fn schedule_from(&self, today: NaiveDate) -> YogaClass {
        YogaClass {
            title: self.title.to_string(),
            description: self.description.to_string(),
            start_time: self.start_time.to_string(),
            end_time: self.end_time.to_string(),
            schedule: today + Days::new(self.days_ahead),
            how_it_will_help: self.how_it_will_help.to_string(),
            how_it_will_not_help: self.how_it_will_not_help.to_string(),
            who_its_for: self.who_its_for.to_string(),
            who_its_not_for: self.who_its_not_for.to_string(),
            level: "Intermediate".to_string(),
            teacher: None,
            students: Vec::new(),
            meeting_number: String::new(),
            status: false,
        }
    }
}

fn class_not_found() -> AppError {
    AppError::not_found("Class not found")
}

async fn load(state: &AppState, id: u64) -> Result<Record<YogaClass>, AppError> {
    state.classes.get(id).await?.ok_or_else(class_not_found)
}

async fn ensure_teacher(state: &AppState, teacher_id: u64) -> Result<(), AppError> {
    match state.teachers.get(teacher_id).await? {
        Some(_) => Ok(()),
        None => Err(AppError::not_found("Teacher not found")),
    }
}

fn today() -> String {
    service::local_now().date().to_string()
}

/// Create a class
#[utoipa::path(
    post,
    path = "/api/v1/classes",
    request_body = YogaClass,
    responses(
        (status = 201, description = "Class created", body = YogaClass),
        (status = 403, description = "Admin/Teacher only"),
        (status = 404, description = "Teacher not found")
    ),
    tag = "Classes",
    security(("bearer_auth" = []))
)]
pub async fn create_class(
    auth: AuthUser,
    state: web::Data<AppState>,
    payload: web::Json<YogaClass>,
) -> Result<HttpResponse, AppError> {
    auth.require_staff()?;
    let mut doc = payload.into_inner();
    doc.students.clear();
    if let Some(teacher_id) = doc.teacher {
        ensure_teacher(&state, teacher_id).await?;
    }

    let record = state.classes.insert(doc).await?;
    info!(class_id = record.id, "Class created");
    Ok(created(record))
}

/// Seed the predefined class catalogue
///
/// Catalogue classes are scheduled over the coming days. Titles that
/// already exist are skipped.
#[utoipa::path(
    post,
    path = "/api/v1/classes/predefined",
    responses(
        (status = 201, description = "Classes added", body = [YogaClass]),
        (status = 403, description = "Admin/Teacher only")
    ),
    tag = "Classes",
    security(("bearer_auth" = []))
)]
pub async fn add_predefined_classes(
    auth: AuthUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    auth.require_staff()?;
    let today = service::local_now().date();

    let mut inserted = Vec::new();
    for entry in CATALOGUE {
        let exists = state
            .classes
            .find_one(&Filter::new().eq("title", entry.title))
            .await?
            .is_some();
        if exists {
            debug!(title = entry.title, "Catalogue class already present");
            continue;
        }
        inserted.push(state.classes.insert(entry.schedule_from(today)).await?);
    }

    info!(count = inserted.len(), "Predefined classes added");
    Ok(created(inserted))
}

/// List classes
#[utoipa::path(
    get,
    path = "/api/v1/classes",
    responses((status = 200, description = "All classes by date", body = [YogaClass])),
    tag = "Classes",
    security(("bearer_auth" = []))
)]
pub async fn list_classes(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let classes = state.classes.find_sorted(&Filter::new(), SORT).await?;
    Ok(ok(classes))
}

/// Classes scheduled today or later
#[utoipa::path(
    get,
    path = "/api/v1/classes/upcoming",
    responses((status = 200, description = "Upcoming classes by date", body = [YogaClass])),
    tag = "Classes",
    security(("bearer_auth" = []))
)]
pub async fn upcoming_classes(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let filter = Filter::new().gte("schedule", today());
    let classes = state.classes.find_sorted(&filter, SORT).await?;
    Ok(ok(classes))
}

/// Get a class
#[utoipa::path(
    get,
    path = "/api/v1/classes/{id}",
    params(("id" = u64, Path, description = "Class id")),
    responses(
        (status = 200, description = "The class", body = YogaClass),
        (status = 404, description = "Class not found")
    ),
    tag = "Classes",
    security(("bearer_auth" = []))
)]
pub async fn get_class(
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    let record = load(&state, path.into_inner()).await?;
    Ok(ok(record))
}

/// Update a class
#[utoipa::path(
    patch,
    path = "/api/v1/classes/{id}",
    params(("id" = u64, Path, description = "Class id")),
    request_body(content = Object, example = json!({"startTime": "08:00", "level": "Beginner"})),
    responses(
        (status = 200, description = "Updated class", body = YogaClass),
        (status = 400, description = "Empty payload or protected field"),
        (status = 404, description = "Class not found")
    ),
    tag = "Classes",
    security(("bearer_auth" = []))
)]
pub async fn update_class(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
    payload: web::Json<Value>,
) -> Result<HttpResponse, AppError> {
    auth.require_staff()?;
    let id = path.into_inner();
    let fields = validate_patch(payload.into_inner(), class::PROTECTED_FIELDS)?;

    let (record, ()) = state
        .classes
        .update_with(id, |doc| {
            *doc = merge_patch(doc, &fields)?;
            Ok::<_, AppError>(())
        })
        .await?
        .ok_or_else(class_not_found)?;

    info!(class_id = id, "Class updated");
    Ok(ok(record))
}

/// Delete a class
#[utoipa::path(
    delete,
    path = "/api/v1/classes/{id}",
    params(("id" = u64, Path, description = "Class id")),
    responses(
        (status = 200, description = "Class deleted", body = crate::api::MessageResponse),
        (status = 404, description = "Class not found")
    ),
    tag = "Classes",
    security(("bearer_auth" = []))
)]
pub async fn delete_class(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    auth.require_staff()?;
    let id = path.into_inner();
    state.classes.delete(id).await?.ok_or_else(class_not_found)?;
    info!(class_id = id, "Class deleted");
    Ok(message("Class deleted successfully"))
}

/// Classes taught by a teacher
#[utoipa::path(
    get,
    path = "/api/v1/classes/teacher/{teacherId}",
    params(("teacherId" = u64, Path, description = "Teacher id")),
    responses((status = 200, description = "The teacher's classes", body = [YogaClass])),
    tag = "Classes",
    security(("bearer_auth" = []))
)]
pub async fn classes_by_teacher(
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    let filter = Filter::new().eq("teacher", path.into_inner());
    let classes = state.classes.find_sorted(&filter, SORT).await?;
    Ok(ok(classes))
}

/// Classes a student is enrolled in
#[utoipa::path(
    get,
    path = "/api/v1/classes/student/{studentId}",
    params(("studentId" = u64, Path, description = "User id")),
    responses((status = 200, description = "Enrolled classes", body = [YogaClass])),
    tag = "Classes",
    security(("bearer_auth" = []))
)]
pub async fn student_classes(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    let student_id = path.into_inner();
    auth.require_self_or_staff(Owner::user(student_id))?;

    let filter = Filter::new().contains("students", student_id);
    let classes = state.classes.find_sorted(&filter, SORT).await?;
    Ok(ok(classes))
}

/// Upcoming classes a student is enrolled in
#[utoipa::path(
    get,
    path = "/api/v1/classes/student/{studentId}/upcoming",
    params(("studentId" = u64, Path, description = "User id")),
    responses((status = 200, description = "Enrolled classes from today on", body = [YogaClass])),
    tag = "Classes",
    security(("bearer_auth" = []))
)]
pub async fn student_upcoming_classes(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    let student_id = path.into_inner();
    auth.require_self_or_staff(Owner::user(student_id))?;

    let filter = Filter::new()
        .contains("students", student_id)
        .gte("schedule", today());
    let classes = state.classes.find_sorted(&filter, SORT).await?;
    Ok(ok(classes))
}

/// Enroll a student
#[utoipa::path(
    post,
    path = "/api/v1/classes/{id}/students/{studentId}",
    params(
        ("id" = u64, Path, description = "Class id"),
        ("studentId" = u64, Path, description = "User id")
    ),
    responses(
        (status = 200, description = "Class with the student enrolled", body = YogaClass),
        (status = 404, description = "Class or user not found"),
        (status = 409, description = "Student already enrolled")
    ),
    tag = "Classes",
    security(("bearer_auth" = []))
)]
pub async fn enroll_student(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<(u64, u64)>,
) -> Result<HttpResponse, AppError> {
    let (id, student_id) = path.into_inner();
    auth.require_self_or_staff(Owner::user(student_id))?;

    if state.users.get(student_id).await?.is_none() {
        return Err(AppError::not_found("User not found"));
    }

    let (record, ()) = state
        .classes
        .update_with(id, |doc| {
            if doc.students.contains(&student_id) {
                return Err(AppError::conflict("Student already enrolled"));
            }
            doc.students.push(student_id);
            Ok::<_, AppError>(())
        })
        .await?
        .ok_or_else(class_not_found)?;

    info!(class_id = id, student_id, "Student enrolled");
    Ok(ok(record))
}

/// Remove a student
#[utoipa::path(
    delete,
    path = "/api/v1/classes/{id}/students/{studentId}",
    params(
        ("id" = u64, Path, description = "Class id"),
        ("studentId" = u64, Path, description = "User id")
    ),
    responses(
        (status = 200, description = "Class without the student", body = YogaClass),
        (status = 404, description = "Class not found")
    ),
    tag = "Classes",
    security(("bearer_auth" = []))
)]
pub async fn remove_student(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<(u64, u64)>,
) -> Result<HttpResponse, AppError> {
    let (id, student_id) = path.into_inner();
    auth.require_self_or_staff(Owner::user(student_id))?;

    let (record, ()) = state
        .classes
        .update_with(id, |doc| {
            doc.students.retain(|s| *s != student_id);
            Ok::<_, AppError>(())
        })
        .await?
        .ok_or_else(class_not_found)?;

    info!(class_id = id, student_id, "Student removed");
    Ok(ok(record))
}

/// Is a student enrolled?
#[utoipa::path(
    get,
    path = "/api/v1/classes/{id}/students/{studentId}",
    params(
        ("id" = u64, Path, description = "Class id"),
        ("studentId" = u64, Path, description = "User id")
    ),
    responses(
        (status = 200, description = "`enrolled` flag", body = Object, example = json!({
            "status": "success", "data": {"enrolled": true}
        })),
        (status = 404, description = "Class not found")
    ),
    tag = "Classes",
    security(("bearer_auth" = []))
)]
pub async fn is_enrolled(
    state: web::Data<AppState>,
    path: web::Path<(u64, u64)>,
) -> Result<HttpResponse, AppError> {
    let (id, student_id) = path.into_inner();
    let record = load(&state, id).await?;
    Ok(ok(json!({ "enrolled": record.doc.students.contains(&student_id) })))
}

/// Assign the teacher of a class
#[utoipa::path(
    put,
    path = "/api/v1/classes/{id}/teacher/{teacherId}",
    params(
        ("id" = u64, Path, description = "Class id"),
        ("teacherId" = u64, Path, description = "Teacher id")
    ),
    responses(
        (status = 200, description = "Updated class", body = YogaClass),
        (status = 404, description = "Class or teacher not found")
    ),
    tag = "Classes",
    security(("bearer_auth" = []))
)]
pub async fn assign_teacher(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<(u64, u64)>,
) -> Result<HttpResponse, AppError> {
    auth.require_staff()?;
    let (id, teacher_id) = path.into_inner();
    ensure_teacher(&state, teacher_id).await?;

    let (record, ()) = state
        .classes
        .update_with(id, |doc| {
            doc.teacher = Some(teacher_id);
            Ok::<_, AppError>(())
        })
        .await?
        .ok_or_else(class_not_found)?;

    info!(class_id = id, teacher_id, "Teacher assigned");
    Ok(ok(record))
}

/// End the live meeting of a class
#[utoipa::path(
    post,
    path = "/api/v1/classes/{id}/end-meeting",
    params(("id" = u64, Path, description = "Class id")),
    request_body = EndMeetingRequest,
    responses(
        (status = 200, description = "Meeting ended", body = crate::api::MessageResponse),
        (status = 404, description = "Class not found")
    ),
    tag = "Classes",
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
        &state.classes,
        state.meetings.as_ref(),
        path.into_inner(),
        external,
    )
    .await?;
    Ok(message("Meeting ended"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::role::Role;
    use crate::service::meetings::tests::FakeMeetings;
    use crate::test_support::{
        bearer, post_json, request, seed_class, seed_user, test_state, test_state_with,
    };
    use actix_web::http::{Method, StatusCode};
    use actix_web::test;
    use std::sync::Arc;

    #[actix_web::test]
    async fn upcoming_excludes_past_classes() {
        let state = test_state();
        let app = crate::test_app!(state);
        seed_class(&state, "2001-01-01").await;
        let future = seed_class(&state, "2999-01-01").await;

        let req = request(Method::GET, "/api/v1/classes/upcoming")
            .insert_header(bearer(1, Role::User))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let ids: Vec<_> = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["id"].as_u64().unwrap())
            .collect();
        assert_eq!(ids, vec![future]);
    }

    #[actix_web::test]
    async fn enrolling_twice_conflicts() {
        let state = test_state();
        let app = crate::test_app!(state);
        let class_id = seed_class(&state, "2999-01-01").await;
        let user = seed_user(&state, "4000000001").await;

        let enroll = || {
            request(Method::POST, &format!("/api/v1/classes/{class_id}/students/{user}"))
                .insert_header(bearer(user, Role::User))
                .to_request()
        };
        assert_eq!(test::call_service(&app, enroll()).await.status(), StatusCode::OK);
        assert_eq!(test::call_service(&app, enroll()).await.status(), StatusCode::CONFLICT);

        let req = request(Method::GET, &format!("/api/v1/classes/{class_id}/students/{user}"))
            .insert_header(bearer(user, Role::User))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["enrolled"], true);

        let req = request(Method::GET, &format!("/api/v1/classes/student/{user}/upcoming"))
            .insert_header(bearer(user, Role::User))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn end_meeting_clears_state_and_calls_provider() {
        let meetings = Arc::new(FakeMeetings::default());
        let state = test_state_with(meetings.clone());
        let app = crate::test_app!(state);
        let class_id = seed_class(&state, "2999-01-01").await;

        let req = post_json(
            &format!("/api/v1/classes/{class_id}/end-meeting"),
            json!({"token": "zoom-token", "meetingId": "123456"}),
        )
        .insert_header(bearer(1, Role::Teacher))
        .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let stored = state.classes.get(class_id).await.unwrap().unwrap();
        assert!(stored.doc.meeting_number.is_empty());
        assert!(!stored.doc.status);
        assert_eq!(
            *meetings.calls.lock().unwrap(),
            vec![("zoom-token".to_string(), "123456".to_string())]
        );
    }

    #[actix_web::test]
    async fn predefined_catalogue_is_seeded_once() {
        let state = test_state();
        let app = crate::test_app!(state);

        let seed = || {
            request(Method::POST, "/api/v1/classes/predefined")
                .insert_header(bearer(1, Role::Admin))
                .to_request()
        };
        let body: Value = test::call_and_read_body_json(&app, seed()).await;
        assert_eq!(body["data"].as_array().unwrap().len(), CATALOGUE.len());

        let body: Value = test::call_and_read_body_json(&app, seed()).await;
        assert!(body["data"].as_array().unwrap().is_empty());
    }

    #[actix_web::test]
    async fn students_cannot_create_classes() {
        let state = test_state();
        let app = crate::test_app!(state);
        let req = post_json(
            "/api/v1/classes",
            json!({"title": "x", "startTime": "07:00", "endTime": "08:00", "schedule": "2999-01-01"}),
        )
        .insert_header(bearer(3, Role::User))
        .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);
    }
}
