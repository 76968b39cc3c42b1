use actix_web::{HttpResponse, web};
use serde_json::json;

use crate::{
    api::{ok, users::MobileRequest},
    error::AppError,
    service::contacts,
    state::AppState,
    utils::contact_index::ContactField,
};

/// Check a mobile number across users and teachers
///
/// `type` names the account holding the number; a user wins when both do.
#[utoipa::path(
    post,
    path = "/auth/check-mobile-both",
    request_body = MobileRequest,
    responses((status = 200, description = "Holder of the number", body = Object, example = json!({
        "status": "success", "data": {"exists": true, "type": "teacher"}
    }))),
    tag = "Users"
)]
pub async fn check_mobile_both(
    state: web::Data<AppState>,
    payload: web::Json<MobileRequest>,
) -> Result<HttpResponse, AppError> {
    let mobile = payload.mobile.trim();
    if mobile.is_empty() {
        return Err(AppError::validation("Mobile is required"));
    }

    let owner = contacts::owner_of(&state, ContactField::Mobile, mobile).await?;
    Ok(ok(json!({
        "exists": owner.is_some(),
        "type": owner,
    })))
}
