pub mod jwt;
pub mod middleware;
pub mod policy;

use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpMessage, HttpRequest};
use std::future::{Ready, ready};

use crate::entity::user::UserRole;
use crate::model::global_error::{AppError, ErrorCode};

pub use jwt::JwtUtils;
pub use middleware::AuthMiddleware;
pub use policy::{Action, Decision, Resource, authorize, evaluate};

/// The authenticated caller, placed in request extensions by [`AuthMiddleware`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub id: i32,
    pub role: UserRole,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

impl FromRequest for AuthUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<AuthUser>()
                .copied()
                .ok_or_else(|| AppError::new(ErrorCode::AuthenticationRequired)),
        )
    }
}
