use std::sync::LazyLock;

use actix_web::http::StatusCode;
use actix_web::{get, post, web, HttpRequest, HttpResponse};
use bcrypt::{hash, verify};
use regex::Regex;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set, TransactionTrait};
use sea_query::Condition;

use crate::auth::jwt::{
    build_access_token_cookie, build_logged_in_cookie, build_refresh_token_cookie, removal_cookies, JwtUtils,
    TokenVerifyResult, REFRESH_COOKIE,
};
use crate::auth::AuthUser;
use crate::configuration::{Settings, SuperuserSettings};
use crate::entity::profile::{self, Occupation};
use crate::entity::user::{self, Entity as UserEntity, UserRole};
use crate::model::auth::{LoginRequest, RegisterRequest, TokenKind, UserResponse};
use crate::model::common::envelope;
use crate::model::global_error::{map_unique_violation, AppError, ErrorCode, ValidationFieldError};

pub(crate) static USERNAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.-]{3,30}$").expect("username pattern is valid"));

pub const MIN_PASSWORD_LEN: usize = 8;

/// Creates a user and its profile in one transaction. New profiles start as tenants.
#[tracing::instrument(skip(db, request), fields(username = %request.username))]
pub async fn create_account(
    db: &DatabaseConnection,
    request: &RegisterRequest,
    role: UserRole,
    hash_cost: u32,
) -> Result<user::Model, AppError> {
    validate_register_request(request)?;

    let txn = db.begin().await?;

    let existing_user = UserEntity::find()
        .filter(
            Condition::any()
                .add(user::Column::Username.eq(request.username.trim()))
                .add(user::Column::Email.eq(request.email.trim()))
        )
        .one(&txn)
        .await?;

    if existing_user.is_some() {
        txn.rollback().await.ok();
        return Err(AppError::new(ErrorCode::DuplicateAccount));
    }

    let hashed_password = hash(&request.password, hash_cost)?;

    let new_user = user::ActiveModel {
        username: Set(request.username.trim().to_string()),
        email: Set(request.email.trim().to_string()),
        first_name: Set(request.first_name.trim().to_string()),
        last_name: Set(request.last_name.trim().to_string()),
        password: Set(hashed_password),
        role: Set(role),
        ..Default::default()
    };

    let user = new_user
        .insert(&txn)
        .await
        .map_err(|err| map_unique_violation(err, ErrorCode::DuplicateAccount))?;

    profile::ActiveModel::for_user(user.id, Occupation::Tenant)
        .insert(&txn)
        .await?;

    txn.commit().await?;

    tracing::info!(user_id = user.id, role = role.as_str(), "account created");
    Ok(user)
}

/// Creates the configured superuser unless the username or email is already taken.
/// Returns whether an account was created.
pub async fn bootstrap_superuser(
    db: &DatabaseConnection,
    settings: &SuperuserSettings,
    hash_cost: u32,
) -> Result<bool, AppError> {
    let existing = UserEntity::find()
        .filter(
            Condition::any()
                .add(user::Column::Username.eq(&settings.username))
                .add(user::Column::Email.eq(&settings.email))
        )
        .one(db)
        .await?;

    if existing.is_some() {
        tracing::info!(username = %settings.username, "superuser already present");
        return Ok(false);
    }

    let request = RegisterRequest {
        username: settings.username.clone(),
        email: settings.email.clone(),
        first_name: String::new(),
        last_name: String::new(),
        password: settings.password.clone(),
    };
    create_account(db, &request, UserRole::Superuser, hash_cost).await?;
    Ok(true)
}

pub async fn authenticate(db: &DatabaseConnection, request: &LoginRequest) -> Result<user::Model, AppError> {
    validate_login_request(request)?;

    let user = UserEntity::find()
        .filter(user::Column::Email.eq(request.email.trim()))
        .one(db)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::InvalidEmailPwd))?;

    if !verify(&request.password, &user.password)? {
        tracing::warn!(user_id = user.id, "failed login attempt");
        return Err(AppError::new(ErrorCode::InvalidEmailPwd));
    }

    Ok(user)
}

/// Envelope with the user plus a fresh access/refresh/logged_in cookie set.
fn session_response(
    status: StatusCode,
    user: user::Model,
    jwt: &JwtUtils,
    settings: &Settings,
) -> Result<HttpResponse, AppError> {
    let access_token = jwt.generate_token(user.id, user.role)?;
    let refresh_jwt = jwt.generate_refresh_token(user.id, user.role)?;

    let cookies = [
        build_access_token_cookie(&access_token, &settings.cookie, jwt.access_lifetime()),
        build_refresh_token_cookie(&refresh_jwt, &settings.cookie, jwt.refresh_lifetime()),
        build_logged_in_cookie(&settings.cookie, jwt.refresh_lifetime()),
    ];

    let mut response = envelope(status, "user", &UserResponse::from(user))?;
    for cookie in &cookies {
        response.add_cookie(cookie).map_err(|err| {
            tracing::error!(error = %err, "failed to attach session cookie");
            AppError::new(ErrorCode::InternalError)
        })?;
    }
    Ok(response)
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    summary = "Register an account",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created; session cookies set", body = UserResponse),
        (status = 400, description = "Validation failed or account exists"),
    ),
    tag = "auth",
)]
#[post("/auth/register")]
pub async fn register(
    body: web::Json<RegisterRequest>,
    db: web::Data<DatabaseConnection>,
    jwt: web::Data<JwtUtils>,
    settings: web::Data<Settings>,
) -> Result<HttpResponse, AppError> {
    let user = create_account(&db, &body, UserRole::Member, settings.auth.password_hash_cost).await?;
    session_response(StatusCode::CREATED, user, &jwt, &settings)
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    summary = "Log in with email and password",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session cookies set", body = UserResponse),
        (status = 400, description = "Invalid credentials"),
    ),
    tag = "auth",
)]
#[post("/auth/login")]
pub async fn login(
    body: web::Json<LoginRequest>,
    db: web::Data<DatabaseConnection>,
    jwt: web::Data<JwtUtils>,
    settings: web::Data<Settings>,
) -> Result<HttpResponse, AppError> {
    let user = authenticate(&db, &body).await?;
    session_response(StatusCode::OK, user, &jwt, &settings)
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    summary = "Rotate the session using the refresh cookie",
    responses(
        (status = 200, description = "New session cookies set", body = UserResponse),
        (status = 400, description = "Missing, invalid or non-refresh token"),
    ),
    tag = "auth",
)]
#[post("/auth/refresh")]
pub async fn refresh_token(
    req: HttpRequest,
    db: web::Data<DatabaseConnection>,
    jwt: web::Data<JwtUtils>,
    settings: web::Data<Settings>,
) -> Result<HttpResponse, AppError> {
    let refresh_cookie = req
        .cookie(REFRESH_COOKIE)
        .ok_or_else(|| AppError::new(ErrorCode::InvalidRefreshToken))?;

    let claims = match jwt.verify_token(refresh_cookie.value()) {
        TokenVerifyResult::Valid(claims) => claims,
        TokenVerifyResult::Expired | TokenVerifyResult::Invalid => {
            return Err(AppError::new(ErrorCode::InvalidRefreshToken));
        }
    };

    if claims.kind != TokenKind::Refresh {
        return Err(AppError::new(ErrorCode::NotRefreshToken));
    }

    let user_id = claims
        .sub
        .parse::<i32>()
        .map_err(|_| AppError::new(ErrorCode::InvalidRefreshToken))?;

    let user = UserEntity::find_by_id(user_id)
        .one(db.get_ref())
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::InvalidRefreshToken))?;

    session_response(StatusCode::OK, user, &jwt, &settings)
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    summary = "Clear the session cookies",
    responses((status = 204, description = "Cookies removed")),
    tag = "auth",
)]
#[post("/auth/logout")]
pub async fn logout(settings: web::Data<Settings>) -> Result<HttpResponse, AppError> {
    let mut response = HttpResponse::NoContent().finish();
    for cookie in removal_cookies(&settings.cookie) {
        response.add_cookie(&cookie).map_err(|err| {
            tracing::error!(error = %err, "failed to attach removal cookie");
            AppError::new(ErrorCode::InternalError)
        })?;
    }
    Ok(response)
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    summary = "Current user",
    responses(
        (status = 200, description = "The authenticated user", body = UserResponse),
        (status = 401, description = "Not authenticated"),
    ),
    tag = "auth",
)]
#[get("/auth/me")]
pub async fn get_me(
    db: web::Data<DatabaseConnection>,
    auth_user: AuthUser,
) -> Result<HttpResponse, AppError> {
    let user = UserEntity::find_by_id(auth_user.id)
        .one(db.get_ref())
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::MemberNotFound))?;

    envelope(StatusCode::OK, "user", &UserResponse::from(user))
}

fn validate_login_request(request: &LoginRequest) -> Result<(), AppError> {
    let mut errors = Vec::new();

    if request.email.trim().is_empty() {
        errors.push(ValidationFieldError::new("email", "Email is required."));
    }

    if request.password.is_empty() {
        errors.push(ValidationFieldError::new("password", "Password is required."));
    }

    AppError::check_fields(errors)
}

fn validate_register_request(request: &RegisterRequest) -> Result<(), AppError> {
    let mut errors = Vec::new();

    let username = request.username.trim();
    if username.is_empty() {
        errors.push(ValidationFieldError::new("username", "Username is required."));
    } else if !USERNAME_PATTERN.is_match(username) {
        errors.push(ValidationFieldError::new(
            "username",
            "Username must be 3-30 characters of letters, digits, '.', '_' or '-'.",
        ));
    }

    let email = request.email.trim();
    if email.is_empty() {
        errors.push(ValidationFieldError::new("email", "Email is required."));
    } else if !email.contains('@') {
        errors.push(ValidationFieldError::new("email", "Email is not valid."));
    }

    if request.password.chars().count() < MIN_PASSWORD_LEN {
        errors.push(ValidationFieldError::new(
            "password",
            format!("Password must be at least {MIN_PASSWORD_LEN} characters."),
        ));
    }

    AppError::check_fields(errors)
}
