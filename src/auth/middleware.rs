use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    web::Data,
    Error, HttpMessage,
};
use std::future::{Future, Ready, ready};
use std::pin::Pin;

use super::jwt::{JwtUtils, TokenVerifyResult, ACCESS_COOKIE};
use super::AuthUser;
use crate::model::auth::TokenKind;

/// Resolves the caller from a bearer header or the `access` cookie.
///
/// Never rejects a request: a missing, expired or malformed token leaves the request
/// anonymous and handlers that need a caller fail through the `AuthUser` extractor.
pub struct AuthMiddleware;

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService { service }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if let Some(user) = resolve_caller(&req) {
            req.extensions_mut().insert(user);
        }

        let fut = self.service.call(req);
        Box::pin(fut)
    }
}

fn bearer_token(req: &ServiceRequest) -> Option<String> {
    let header = req.headers().get(actix_web::http::header::AUTHORIZATION)?;
    let value = header.to_str().ok()?;
    value
        .strip_prefix("Bearer ")
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

fn resolve_caller(req: &ServiceRequest) -> Option<AuthUser> {
    let token = bearer_token(req).or_else(|| req.cookie(ACCESS_COOKIE).map(|c| c.value().to_string()))?;

    let Some(jwt) = req.app_data::<Data<JwtUtils>>() else {
        tracing::error!("JwtUtils is not registered as app data; treating request as anonymous");
        return None;
    };

    match jwt.verify_token(&token) {
        TokenVerifyResult::Valid(claims) if claims.kind == TokenKind::Access => {
            match claims.sub.parse::<i32>() {
                Ok(id) => Some(AuthUser { id, role: claims.role }),
                Err(_) => {
                    tracing::warn!(sub = %claims.sub, "token subject is not a user id");
                    None
                }
            }
        }
        TokenVerifyResult::Valid(_) => {
            tracing::warn!(path = %req.path(), "refresh token presented as access token");
            None
        }
        TokenVerifyResult::Expired => {
            tracing::info!(path = %req.path(), "expired access token");
            None
        }
        TokenVerifyResult::Invalid => {
            tracing::warn!(path = %req.path(), "invalid access token");
            None
        }
    }
}
