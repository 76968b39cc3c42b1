use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, ResponseError,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    web::Data,
};
use tracing::debug;

use crate::auth::auth::authenticate;
use crate::config::Config;
use crate::error::AppError;

/// Rejects requests without a valid bearer token and stores the caller as
/// an [`AuthUser`](crate::auth::auth::AuthUser) request extension.
pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let config = req
        .app_data::<Data<Config>>()
        .ok_or_else(|| AppError::Unexpected("App config missing".into()))?;

    match authenticate(req.headers(), config) {
        Ok(user) => {
            debug!(user_id = user.id, role = %user.role, "Authenticated request");
            req.extensions_mut().insert(user);
            next.call(req).await
        }
        Err(e) => {
            let resp = e.error_response();
            Ok(req.into_response(resp))
        }
    }
}
