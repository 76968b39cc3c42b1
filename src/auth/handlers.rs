use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument};
use utoipa::ToSchema;

use crate::{
    auth::{jwt::generate_access_token, password::verify_password},
    config::Config,
    error::AppError,
    model::{role::Role, teacher, user},
    service::contacts,
    state::AppState,
    store::Filter,
    utils::contact_index::ContactField,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "mira@example.com")]
    pub email: Option<String>,
    #[schema(example = "9876543210")]
    pub mobile: Option<String>,
    #[schema(example = "s3cret")]
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    #[schema(example = "success")]
    pub status: &'static str,
    pub token: String,
    /// The profile, without its password hash.
    #[schema(value_type = Object)]
    pub data: Value,
}

impl LoginRequest {
    /// `email` wins when both are given.
    fn identity(&self) -> Result<Filter, AppError> {
        let pick = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        if self.password.is_empty() {
            return Err(AppError::validation("Password is required"));
        }
        match (pick(&self.email), pick(&self.mobile)) {
            (Some(email), _) => Ok(contacts::by_field(ContactField::Email, &email)),
            (None, Some(mobile)) => Ok(contacts::by_field(ContactField::Mobile, &mobile)),
            (None, None) => Err(AppError::validation("Email or mobile is required")),
        }
    }
}

fn invalid_credentials() -> AppError {
    AppError::unauthorized("Incorrect credentials")
}

/// Login a user
#[utoipa::path(
    post,
    path = "/auth/user/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Access token and profile", body = LoginResponse),
        (status = 400, description = "Missing e-mail/mobile or password"),
        (status = 401, description = "Incorrect credentials")
    ),
    tag = "Auth"
)]
#[instrument(name = "user_login", skip(state, config, payload))]
pub async fn user_login(
    state: web::Data<AppState>,
    config: web::Data<Config>,
    payload: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    info!("Login request received");
    let filter = payload.identity()?;

    debug!("Fetching user");
    let Some(record) = state.users.find_one(&filter).await? else {
        info!("Invalid credentials: user not found");
        return Err(invalid_credentials());
    };

    if !verify_password(&payload.password, &record.doc.password) {
        info!(user_id = record.id, "Invalid credentials: password mismatch");
        return Err(invalid_credentials());
    }

    let role = record.doc.role.parse().unwrap_or(Role::User);
    let token = generate_access_token(record.id, role, &config.jwt_secret, config.access_token_ttl)?;

    info!(user_id = record.id, %role, "Login successful");
    Ok(HttpResponse::Ok().json(LoginResponse {
        status: "success",
        token,
        data: record.to_json_without(user::HIDDEN_FIELDS),
    }))
}

/// Login a teacher
#[utoipa::path(
    post,
    path = "/auth/teacher/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Access token and profile", body = LoginResponse),
        (status = 400, description = "Missing e-mail/mobile or password"),
        (status = 401, description = "Incorrect credentials")
    ),
    tag = "Auth"
)]
#[instrument(name = "teacher_login", skip(state, config, payload))]
pub async fn teacher_login(
    state: web::Data<AppState>,
    config: web::Data<Config>,
    payload: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    info!("Login request received");
    let filter = payload.identity()?;

    let Some(record) = state.teachers.find_one(&filter).await? else {
        info!("Invalid credentials: teacher not found");
        return Err(invalid_credentials());
    };

    if !verify_password(&payload.password, &record.doc.password) {
        info!(teacher_id = record.id, "Invalid credentials: password mismatch");
        return Err(invalid_credentials());
    }

    let token = generate_access_token(
        record.id,
        Role::Teacher,
        &config.jwt_secret,
        config.access_token_ttl,
    )?;

    info!(teacher_id = record.id, "Login successful");
    Ok(HttpResponse::Ok().json(LoginResponse {
        status: "success",
        token,
        data: record.to_json_without(teacher::HIDDEN_FIELDS),
    }))
}
