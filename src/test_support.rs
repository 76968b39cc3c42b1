//! Fixtures shared by the handler tests.

use std::net::SocketAddr;
use std::sync::Arc;

use actix_web::http::Method;
use actix_web::http::header::AUTHORIZATION;
use actix_web::test::TestRequest;
use chrono::NaiveDate;
use serde_json::Value;

use crate::auth::jwt::generate_access_token;
use crate::auth::password::hash_password;
use crate::config::Config;
use crate::model::class::YogaClass;
use crate::model::owner::OwnerKind;
use crate::model::role::Role;
use crate::model::teacher::Teacher;
use crate::model::user::User;
use crate::service::{self, meetings::tests::FakeMeetings};
use crate::state::AppState;
use crate::store::MemoryStore;
use crate::utils::contact_index::ContactField;

pub const TEST_PASSWORD: &str = "s3cret";

/// Builds the full route table over `state`, as `main` does.
#[macro_export]
macro_rules! test_app {
    ($state:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::new($state.clone()))
                .app_data(actix_web::web::Data::new($crate::config::Config::for_tests()))
                .configure(|cfg| {
                    $crate::routes::configure(cfg, $crate::config::Config::for_tests())
                }),
        )
        .await
    };
}

pub fn test_state() -> AppState {
    test_state_with(Arc::new(FakeMeetings::default()))
}

pub fn test_state_with(meetings: Arc<FakeMeetings>) -> AppState {
    AppState::new(Arc::new(MemoryStore::new()), meetings, &Config::for_tests())
}

pub fn bearer(id: u64, role: Role) -> (actix_web::http::header::HeaderName, String) {
    let config = Config::for_tests();
    let token = generate_access_token(id, role, &config.jwt_secret, config.access_token_ttl)
        .unwrap();
    (AUTHORIZATION, format!("Bearer {token}"))
}

/// A request with a peer address; the rate limiter keys on it.
pub fn request(method: Method, uri: &str) -> TestRequest {
    let peer: SocketAddr = "127.0.0.1:40000".parse().unwrap();
    TestRequest::default()
        .method(method)
        .uri(uri)
        .peer_addr(peer)
}

pub fn post_json(uri: &str, body: Value) -> TestRequest {
    request(Method::POST, uri).set_json(body)
}

pub async fn seed_user(state: &AppState, mobile: &str) -> u64 {
    let now = service::local_now();
    let user: User = serde_json::from_value(serde_json::json!({
        "name": "Test User",
        "companyId": "ACME",
        "mobile": mobile,
        "email": format!("{mobile}@example.com"),
        "password": hash_password(TEST_PASSWORD).unwrap(),
        "createdAt": now,
        "updatedAt": now,
    }))
    .unwrap();
    let id = state.users.insert(user).await.unwrap().id;
    remember(state, mobile, OwnerKind::User).await;
    id
}

pub async fn seed_teacher(state: &AppState, mobile: &str) -> u64 {
    let now = service::local_now();
    let teacher = Teacher {
        name: "Test Teacher".into(),
        email: Some(format!("{mobile}@yoga.example.com")),
        mobile: Some(mobile.to_string()),
        password: hash_password(TEST_PASSWORD).unwrap(),
        gender: None,
        description: None,
        experience: None,
        qualification: vec![],
        additional_courses: vec![],
        attendance: vec![],
        status: true,
        created_at: now,
        updated_at: now,
    };
    let id = state.teachers.insert(teacher).await.unwrap().id;
    remember(state, mobile, OwnerKind::Teacher).await;
    id
}

/// Seeded profiles bypass the handlers, so index their mobile here.
async fn remember(state: &AppState, mobile: &str, kind: OwnerKind) {
    state
        .contacts
        .remember(ContactField::Mobile, mobile, kind)
        .await;
}

/// A class on `schedule` (`YYYY-MM-DD`).
pub async fn seed_class(state: &AppState, schedule: &str) -> u64 {
    let class = YogaClass {
        title: "Morning Flow".into(),
        description: String::new(),
        start_time: "07:00".into(),
        end_time: "08:00".into(),
        schedule: NaiveDate::parse_from_str(schedule, "%Y-%m-%d").unwrap(),
        how_it_will_help: String::new(),
        how_it_will_not_help: String::new(),
        who_its_for: String::new(),
        who_its_not_for: String::new(),
        level: "Beginner".into(),
        teacher: None,
        students: vec![],
        meeting_number: "123456".into(),
        status: true,
    };
    state.classes.insert(class).await.unwrap().id
}
