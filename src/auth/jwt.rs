use jsonwebtoken::{
    DecodingKey, EncodingKey, Header, Validation, decode, encode, get_current_timestamp,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::model::role::Role;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Id of the user or teacher document.
    pub sub: u64,
    pub role: Role,
    pub exp: usize,
    pub jti: String,
}

pub fn generate_access_token(
    subject: u64,
    role: Role,
    secret: &str,
    ttl: usize,
) -> Result<String, AppError> {
    let claims = Claims {
        sub: subject,
        role,
        exp: get_current_timestamp() as usize + ttl,
        jti: Uuid::new_v4().to_string(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Unexpected(format!("token encoding failed: {e}")))
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, String> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| e.to_string())
}
