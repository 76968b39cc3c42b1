use actix_web::{HttpResponse, web};
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::{
    api::{
        created, message, ok,
        users::{ClassRef, JoinResponse, MobileRequest},
    },
    auth::auth::AuthUser,
    error::AppError,
    model::{
        owner::{Owner, OwnerKind},
        teacher::{self, Teacher},
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

fn view(record: &Record<Teacher>) -> Value {
    record.to_json_without(teacher::HIDDEN_FIELDS)
}

fn teacher_not_found() -> AppError {
    AppError::not_found("Teacher not found")
}

async fn load(state: &AppState, id: u64) -> Result<Record<Teacher>, AppError> {
    state.teachers.get(id).await?.ok_or_else(teacher_not_found)
}

/// Re-indexes contacts after a teacher write; values another account still
/// holds stay taken.
async fn sync_contacts(
    state: &AppState,
    before: Option<&Teacher>,
    after: Option<&Teacher>,
) -> Result<(), AppError> {
    if let Some(old) = before {
        for (field, value) in [
            (ContactField::Mobile, &old.mobile),
            (ContactField::Email, &old.email),
        ] {
            if let Some(value) = value {
                contacts::release(state, field, value).await?;
            }
        }
    }
    if let Some(new) = after {
        for (field, value) in [
            (ContactField::Mobile, &new.mobile),
            (ContactField::Email, &new.email),
        ] {
            if let Some(value) = value {
                state.contacts.remember(field, value, OwnerKind::Teacher).await;
            }
        }
    }
    Ok(())
}

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
        let holder = state.teachers.find_one(&contacts::by_field(field, value)).await?;
        if holder.is_some_and(|h| Some(h.id) != except) {
            return Err(AppError::conflict(format!("A teacher with this {field} already exists")));
        }
    }
    Ok(())
}

/// Create a teacher
#[utoipa::path(
    post,
    path = "/api/v1/teachers",
    request_body(content = Object, example = json!({
        "name": "Anika",
        "email": "anika@example.com",
        "mobile": "9123456780",
        "password": "s3cret",
        "experience": "8 years"
    })),
    responses(
        (status = 201, description = "Teacher created", body = Object),
        (status = 403, description = "Admin only"),
        (status = 409, description = "Mobile or e-mail already registered")
    ),
    tag = "Teachers",
    security(("bearer_auth" = []))
)]
pub async fn create_teacher(
    auth: AuthUser,
    state: web::Data<AppState>,
    payload: web::Json<Value>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;

    let now = service::local_now();
    let mut fields = new_document(payload.into_inner(), teacher::PROTECTED_FIELDS, now)?;
    hash_password_field(&mut fields)?;
    normalize_contact_fields(&mut fields);
    let doc: Teacher = decode_document(fields)?;
    ensure_unique(&state, doc.mobile.as_deref(), doc.email.as_deref(), None).await?;

    let record = state.teachers.insert(doc).await?;
    sync_contacts(&state, None, Some(&record.doc)).await?;

    info!(teacher_id = record.id, "Teacher created");
    Ok(created(view(&record)))
}

/// List teachers
#[utoipa::path(
    get,
    path = "/api/v1/teachers",
    responses((status = 200, description = "All teachers", body = Object)),
    tag = "Teachers",
    security(("bearer_auth" = []))
)]
pub async fn list_teachers(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let teachers: Vec<Value> = state.teachers.all().await?.iter().map(view).collect();
    debug!(count = teachers.len(), "Listed teachers");
    Ok(ok(teachers))
}

/// Get a teacher
#[utoipa::path(
    get,
    path = "/api/v1/teachers/{id}",
    params(("id" = u64, Path, description = "Teacher id")),
    responses(
        (status = 200, description = "The teacher", body = Object),
        (status = 404, description = "Teacher not found")
    ),
    tag = "Teachers",
    security(("bearer_auth" = []))
)]
pub async fn get_teacher(
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    let record = load(&state, path.into_inner()).await?;
    Ok(ok(view(&record)))
}

/// Update a teacher
#[utoipa::path(
    patch,
    path = "/api/v1/teachers/{id}",
    params(("id" = u64, Path, description = "Teacher id")),
    request_body(content = Object, example = json!({"experience": "9 years"})),
    responses(
        (status = 200, description = "Updated teacher", body = Object),
        (status = 400, description = "Empty payload or protected field"),
        (status = 404, description = "Teacher not found")
    ),
    tag = "Teachers",
    security(("bearer_auth" = []))
)]
pub async fn update_teacher(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
    payload: web::Json<Value>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    auth.require_self(Owner::teacher(id))?;

    let mut fields = validate_patch(payload.into_inner(), teacher::PROTECTED_FIELDS)?;
    hash_password_field(&mut fields)?;
    normalize_contact_fields(&mut fields);
    let mobile = fields.get("mobile").and_then(Value::as_str);
    let email = fields.get("email").and_then(Value::as_str);
    ensure_unique(&state, mobile, email, Some(id)).await?;

    let now = service::local_now();
    let before = load(&state, id).await?;
    let (record, ()) = state
        .teachers
        .update_with(id, |doc| {
            *doc = merge_patch(doc, &fields)?;
            doc.updated_at = now;
            Ok::<_, AppError>(())
        })
        .await?
        .ok_or_else(teacher_not_found)?;

    sync_contacts(&state, Some(&before.doc), Some(&record.doc)).await?;
    info!(teacher_id = id, "Teacher updated");
    Ok(ok(view(&record)))
}

/// Delete a teacher
///
/// Also removes the teacher's trackers and deactivates their availability.
#[utoipa::path(
    delete,
    path = "/api/v1/teachers/{id}",
    params(("id" = u64, Path, description = "Teacher id")),
    responses(
        (status = 200, description = "Teacher deleted", body = crate::api::MessageResponse),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Teacher not found")
    ),
    tag = "Teachers",
    security(("bearer_auth" = []))
)]
pub async fn delete_teacher(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    let id = path.into_inner();

    let record = state.teachers.delete(id).await?.ok_or_else(teacher_not_found)?;
    sync_contacts(&state, Some(&record.doc), None).await?;

    let trackers = state
        .trackers
        .delete_many(&Filter::new().eq("owner.kind", "teacher").eq("owner.id", id))
        .await?;
    let slots = service::availability::deactivate_for_teacher(
        &state.availability,
        id,
        service::local_now(),
    )
    .await?;

    info!(teacher_id = id, trackers, slots, "Teacher deleted");
    Ok(message("Teacher deleted successfully"))
}

/// Check whether a mobile number belongs to a teacher
#[utoipa::path(
    post,
    path = "/api/v1/teachers/check-mobile",
    request_body = MobileRequest,
    responses((status = 200, description = "`exists` flag", body = Object)),
    tag = "Teachers",
    security(("bearer_auth" = []))
)]
pub async fn check_mobile(
    state: web::Data<AppState>,
    payload: web::Json<MobileRequest>,
) -> Result<HttpResponse, AppError> {
    let owner = contacts::owner_of(&state, ContactField::Mobile, &payload.mobile).await?;
    let exists = match owner {
        Some(OwnerKind::Teacher) => true,
        // A user holding the number shadows a teacher with the same one.
        Some(OwnerKind::User) => state
            .teachers
            .find_one(&contacts::by_field(ContactField::Mobile, &payload.mobile))
            .await?
            .is_some(),
        None => false,
    };
    Ok(ok(json!({ "exists": exists })))
}

/// Join a class as a teacher
#[utoipa::path(
    post,
    path = "/api/v1/teachers/{id}/join",
    params(("id" = u64, Path, description = "Teacher id")),
    request_body = ClassRef,
    responses(
        (status = 200, description = "Join time", body = JoinResponse),
        (status = 404, description = "Teacher or class not found")
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
    auth.require_self(Owner::teacher(id))?;

    let outcome = attendance::join_class(
        &state.teachers,
        &state.classes,
        id,
        payload.class_id,
        service::local_now(),
    )
    .await?;
    Ok(ok(JoinResponse::from(outcome)))
}

/// Leave a class as a teacher
#[utoipa::path(
    post,
    path = "/api/v1/teachers/{id}/leave",
    params(("id" = u64, Path, description = "Teacher id")),
    request_body = ClassRef,
    responses(
        (status = 200, description = "Completed attendance record", body = crate::model::attendance::AttendanceRecord),
        (status = 404, description = "Teacher not found or class never joined")
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
    auth.require_self(Owner::teacher(id))?;

    let record =
        attendance::leave_class(&state.teachers, id, payload.class_id, service::local_now())
            .await?;
    Ok(ok(record))
}

/// Teaching time per day over the trailing week
#[utoipa::path(
    get,
    path = "/api/v1/teachers/{id}/weekly-stats",
    params(("id" = u64, Path, description = "Teacher id")),
    responses(
        (status = 200, description = "Seven buckets, oldest first", body = [stats::DayStats]),
        (status = 404, description = "Teacher not found")
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
    auth.require_self(Owner::teacher(id))?;
    let record = load(&state, id).await?;

    Ok(ok(stats::weekly_stats(
        &record.doc.attendance,
        service::local_now(),
        state.weekly_empty_day_default,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::role::Role;
    use crate::test_support::{
        bearer, post_json, request, seed_class, seed_teacher, seed_user, test_state,
    };
    use actix_web::http::{Method, StatusCode};
    use actix_web::test;

    #[actix_web::test]
    async fn only_admin_creates_teachers() {
        let state = test_state();
        let app = crate::test_app!(state);
        let payload = json!({"name": "Anika", "mobile": "9123456780", "password": "pw"});

        let req = post_json("/api/v1/teachers", payload.clone())
            .insert_header(bearer(5, Role::Teacher))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

        let req = post_json("/api/v1/teachers", payload.clone())
            .insert_header(bearer(1, Role::Admin))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        assert!(body["data"].get("password").is_none());

        let req = post_json("/api/v1/teachers", payload)
            .insert_header(bearer(1, Role::Admin))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);
    }

    #[actix_web::test]
    async fn check_mobile_finds_teacher() {
        let state = test_state();
        let app = crate::test_app!(state);
        seed_teacher(&state, "9000000001").await;

        let req = post_json("/api/v1/teachers/check-mobile", json!({"mobile": "9000000001"}))
            .insert_header(bearer(1, Role::Admin))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["exists"], true);
    }

    #[actix_web::test]
    async fn teacher_joins_and_leaves_class() {
        let state = test_state();
        let app = crate::test_app!(state);
        let id = seed_teacher(&state, "9000000002").await;
        let class_id = seed_class(&state, "2030-01-01").await;

        let req = request(Method::POST, &format!("/api/v1/teachers/{id}/join"))
            .insert_header(bearer(id, Role::Teacher))
            .set_json(json!({"classId": class_id}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["alreadyJoined"], false);

        let req = request(Method::POST, &format!("/api/v1/teachers/{id}/leave"))
            .insert_header(bearer(id, Role::Teacher))
            .set_json(json!({"classId": class_id}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let stored = state.teachers.get(id).await.unwrap().unwrap();
        assert!(stored.doc.attendance[0].left_at.is_some());
    }

    #[actix_web::test]
    async fn delete_deactivates_availability() {
        let state = test_state();
        let app = crate::test_app!(state);
        let id = seed_teacher(&state, "9000000003").await;

        let req = post_json(
            "/api/v1/availability",
            json!({
                "teacherId": id,
                "session": "Morning",
                "date": "2030-01-01",
                "startTime": "08:00",
                "endTime": "09:00",
                "availabilityFor": "custom-session"
            }),
        )
        .insert_header(bearer(id, Role::Teacher))
        .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

        let req = request(Method::DELETE, &format!("/api/v1/teachers/{id}"))
            .insert_header(bearer(1, Role::Admin))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let slots = state.availability.all().await.unwrap();
        assert_eq!(slots.len(), 1);
        assert!(!slots[0].doc.is_active);
    }

    #[actix_web::test]
    async fn shared_number_stays_taken_after_user_is_deleted() {
        let state = test_state();
        let app = crate::test_app!(state);
        let user_id = seed_user(&state, "5000000009").await;
        seed_teacher(&state, "5000000009").await;

        let check_both = || {
            post_json("/auth/check-mobile-both", json!({"mobile": "5000000009"})).to_request()
        };
        let body: Value = test::call_and_read_body_json(&app, check_both()).await;
        assert_eq!(body["data"]["type"], "user");

        let req = request(Method::DELETE, &format!("/api/v1/users/{user_id}"))
            .insert_header(bearer(user_id, Role::User))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let body: Value = test::call_and_read_body_json(&app, check_both()).await;
        assert_eq!(body["data"]["exists"], true);
        assert_eq!(body["data"]["type"], "teacher");

        let req = post_json("/api/v1/teachers/check-mobile", json!({"mobile": "5000000009"}))
            .insert_header(bearer(1, Role::Admin))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["exists"], true);
    }
}
