use actix_web::http::header::{AUTHORIZATION, HeaderMap};
use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, web::Data};
use futures::future::{Ready, ready};

use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::error::AppError;
use crate::model::owner::{Owner, OwnerKind};
use crate::model::role::Role;

/// The caller behind a verified bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub id: u64,
    pub role: Role,
}

/// Reads and verifies `Authorization: Bearer <token>`.
pub fn authenticate(headers: &HeaderMap, config: &Config) -> Result<AuthUser, AppError> {
    let header = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| AppError::unauthorized("Missing Authorization header"))?
        .to_str()
        .map_err(|_| AppError::unauthorized("Invalid Authorization header encoding"))?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::unauthorized("Authorization header must start with Bearer"))?;

    let claims = verify_token(token, &config.jwt_secret)
        .map_err(|_| AppError::unauthorized("Invalid or expired token"))?;

    Ok(AuthUser {
        id: claims.sub,
        role: claims.role,
    })
}

impl FromRequest for AuthUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        if let Some(user) = req.extensions().get::<AuthUser>() {
            return ready(Ok(*user));
        }

        let result = match req.app_data::<Data<Config>>() {
            Some(config) => authenticate(req.headers(), config),
            None => Err(AppError::Unexpected("Config missing".into())),
        };
        ready(result)
    }
}

impl AuthUser {
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(AppError::forbidden("Admin only"))
        }
    }

    pub fn require_staff(&self) -> Result<(), AppError> {
        if self.role.is_staff() {
            Ok(())
        } else {
            Err(AppError::forbidden("Admin/Teacher only"))
        }
    }

    /// The caller is `owner` itself, or an admin.
    pub fn require_self(&self, owner: Owner) -> Result<(), AppError> {
        let is_self = match (self.role, owner.kind) {
            (Role::User, OwnerKind::User) | (Role::Teacher, OwnerKind::Teacher) => {
                self.id == owner.id
            }
            _ => false,
        };

        if is_self || self.role == Role::Admin {
            Ok(())
        } else {
            Err(AppError::forbidden("Not allowed to act for this account"))
        }
    }

    /// Like [`require_self`](Self::require_self), but teachers may also act.
    pub fn require_self_or_staff(&self, owner: Owner) -> Result<(), AppError> {
        if self.role.is_staff() {
            return Ok(());
        }
        self.require_self(owner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn users_act_only_for_themselves() {
        let user = AuthUser {
            id: 7,
            role: Role::User,
        };
        assert!(user.require_self(Owner::user(7)).is_ok());
        assert!(user.require_self(Owner::user(8)).is_err());
        assert!(user.require_self(Owner::teacher(7)).is_err());
        assert!(user.require_staff().is_err());
    }

    #[test]
    fn teachers_are_staff_but_not_admin() {
        let teacher = AuthUser {
            id: 3,
            role: Role::Teacher,
        };
        assert!(teacher.require_staff().is_ok());
        assert!(teacher.require_admin().is_err());
        assert!(teacher.require_self(Owner::teacher(3)).is_ok());
        assert!(teacher.require_self(Owner::user(3)).is_err());
        assert!(teacher.require_self_or_staff(Owner::user(3)).is_ok());
    }

    #[test]
    fn admin_may_act_for_anyone() {
        let admin = AuthUser {
            id: 1,
            role: Role::Admin,
        };
        assert!(admin.require_self(Owner::user(99)).is_ok());
        assert!(admin.require_admin().is_ok());
    }
}
