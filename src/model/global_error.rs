use actix_web::{HttpResponse, ResponseError};
use sea_orm::{DbErr, SqlErr};
use serde::Serialize;
use std::fmt;
use thiserror::Error;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // 400 BAD REQUEST
    ValidationError,
    DuplicateAccount,
    InvalidEmailPwd,
    NotRefreshToken,
    InvalidRefreshToken,
    DuplicateApartment,
    ApartmentAlreadyAssigned,
    ApartmentNotRented,
    UserMustBeTenant,
    TenantAlreadyHoused,
    IssueAlreadyResolved,
    CannotReportSelf,
    InvalidAvatar,

    // 401 UNAUTHORIZED
    AuthenticationRequired,

    // 403 FORBIDDEN
    NotEnoughPermission,
    NotApartmentTenant,

    // 404 NOT FOUND
    MemberNotFound,
    TenantNotFound,
    ApartmentNotFound,
    IssueNotFound,
    ProfileNotFound,

    // 500 SERVER ERRORS
    DatabaseError,
    InternalError,
    TokenGenerationFailed,

    // 503 SERVICE UNAVAILABLE
    AssetStorageUnavailable,
}

impl ErrorCode {
    pub fn message(&self) -> &'static str {
        match self {
            ErrorCode::ValidationError => "Validation failed",
            ErrorCode::DuplicateAccount => "An account with this username or email already exists",
            ErrorCode::InvalidEmailPwd => "Invalid credentials",
            ErrorCode::NotRefreshToken => "The supplied token is not a refresh token",
            ErrorCode::InvalidRefreshToken => "The refresh token is invalid or expired",
            ErrorCode::DuplicateApartment => "An apartment with this unit number already exists",
            ErrorCode::ApartmentAlreadyAssigned => "This apartment already has a tenant",
            ErrorCode::ApartmentNotRented => "This apartment is not currently rented",
            ErrorCode::UserMustBeTenant => "Only users whose occupation is tenant can be assigned an apartment",
            ErrorCode::TenantAlreadyHoused => "This tenant already occupies an apartment",
            ErrorCode::IssueAlreadyResolved => "This issue is resolved and can no longer be changed",
            ErrorCode::CannotReportSelf => "You cannot report yourself",
            ErrorCode::InvalidAvatar => "Avatar must be a non-empty image of at most 2 MiB",

            ErrorCode::AuthenticationRequired => "Authentication credentials were not provided or are invalid",

            ErrorCode::NotEnoughPermission => "You do not have permission to perform this action",
            ErrorCode::NotApartmentTenant => "You can only report issues for the apartment you occupy",

            ErrorCode::MemberNotFound => "User not found",
            ErrorCode::TenantNotFound => "Tenant not found",
            ErrorCode::ApartmentNotFound => "Apartment not found",
            ErrorCode::IssueNotFound => "Issue not found",
            ErrorCode::ProfileNotFound => "Profile not found",

            ErrorCode::DatabaseError => "A database error occurred",
            ErrorCode::InternalError => "An internal server error occurred",
            ErrorCode::TokenGenerationFailed => "Failed to generate a token",

            ErrorCode::AssetStorageUnavailable => "Asset storage is unavailable",
        }
    }

    pub fn status_code(&self) -> actix_web::http::StatusCode {
        use actix_web::http::StatusCode;

        match self {
            ErrorCode::ValidationError |
            ErrorCode::DuplicateAccount |
            ErrorCode::InvalidEmailPwd |
            ErrorCode::NotRefreshToken |
            ErrorCode::InvalidRefreshToken |
            ErrorCode::DuplicateApartment |
            ErrorCode::ApartmentAlreadyAssigned |
            ErrorCode::ApartmentNotRented |
            ErrorCode::UserMustBeTenant |
            ErrorCode::TenantAlreadyHoused |
            ErrorCode::IssueAlreadyResolved |
            ErrorCode::CannotReportSelf |
            ErrorCode::InvalidAvatar => StatusCode::BAD_REQUEST,

            ErrorCode::AuthenticationRequired => StatusCode::UNAUTHORIZED,

            ErrorCode::NotEnoughPermission |
            ErrorCode::NotApartmentTenant => StatusCode::FORBIDDEN,

            ErrorCode::MemberNotFound |
            ErrorCode::TenantNotFound |
            ErrorCode::ApartmentNotFound |
            ErrorCode::IssueNotFound |
            ErrorCode::ProfileNotFound => StatusCode::NOT_FOUND,

            ErrorCode::DatabaseError |
            ErrorCode::InternalError |
            ErrorCode::TokenGenerationFailed => StatusCode::INTERNAL_SERVER_ERROR,

            ErrorCode::AssetStorageUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ValidationFieldError {
    pub field: String,
    pub message: String,
}

impl ValidationFieldError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    ApiError(ErrorCode, Option<String>),

    #[error("validation failed")]
    ValidationError(Vec<ValidationFieldError>),
}

impl AppError {
    pub fn new(code: ErrorCode) -> Self {
        AppError::ApiError(code, None)
    }

    pub fn with_detail(code: ErrorCode, detail: impl Into<String>) -> Self {
        AppError::ApiError(code, Some(detail.into()))
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::ApiError(code, _) => *code,
            AppError::ValidationError(_) => ErrorCode::ValidationError,
        }
    }

    /// Collapses a list of field errors; an empty list is not an error.
    pub fn check_fields(errors: Vec<ValidationFieldError>) -> Result<(), AppError> {
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::ValidationError(errors))
        }
    }
}

impl From<ErrorCode> for AppError {
    fn from(code: ErrorCode) -> Self {
        AppError::new(code)
    }
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        tracing::error!(error = %err, "database error");
        AppError::new(ErrorCode::DatabaseError)
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        tracing::error!(error = %err, "token generation failed");
        AppError::new(ErrorCode::TokenGenerationFailed)
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(err: bcrypt::BcryptError) -> Self {
        tracing::error!(error = %err, "password hashing failed");
        AppError::new(ErrorCode::InternalError)
    }
}

/// Turns a unique-constraint violation into `code`; every other error stays a database error.
pub fn map_unique_violation(err: DbErr, code: ErrorCode) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => AppError::new(code),
        _ => AppError::from(err),
    }
}

#[derive(Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<Vec<ValidationFieldError>>,
}

#[derive(Serialize)]
struct ErrorEnvelope {
    status_code: u16,
    errors: ErrorBody,
}

impl ResponseError for AppError {
    fn status_code(&self) -> actix_web::http::StatusCode {
        self.code().status_code()
    }

    fn error_response(&self) -> HttpResponse {
        let code = self.code();
        let (detail, fields) = match self {
            AppError::ApiError(_, detail) => (detail.clone(), None),
            AppError::ValidationError(fields) => (None, Some(fields.clone())),
        };

        HttpResponse::build(code.status_code()).json(ErrorEnvelope {
            status_code: code.status_code().as_u16(),
            errors: ErrorBody {
                code: format!("{:?}", code),
                message: code.message().to_string(),
                detail,
                fields,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[actix_web::test]
    async fn api_errors_render_the_error_envelope() {
        let err = AppError::with_detail(ErrorCode::ApartmentNotFound, "apartment 7");
        let response = err.error_response();
        assert_eq!(response.status().as_u16(), 404);

        let body = to_bytes(response.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status_code"], 404);
        assert_eq!(json["errors"]["code"], "ApartmentNotFound");
        assert_eq!(json["errors"]["detail"], "apartment 7");
        assert!(json["errors"].get("fields").is_none());
    }

    #[actix_web::test]
    async fn validation_errors_list_their_fields() {
        let err = AppError::ValidationError(vec![ValidationFieldError::new("email", "required")]);
        let response = err.error_response();
        assert_eq!(response.status().as_u16(), 400);

        let body = to_bytes(response.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["errors"]["code"], "ValidationError");
        assert_eq!(json["errors"]["fields"][0]["field"], "email");
    }

    #[test]
    fn state_conflicts_are_bad_requests_and_ownership_is_forbidden() {
        assert_eq!(ErrorCode::ApartmentAlreadyAssigned.status_code().as_u16(), 400);
        assert_eq!(ErrorCode::IssueAlreadyResolved.status_code().as_u16(), 400);
        assert_eq!(ErrorCode::NotApartmentTenant.status_code().as_u16(), 403);
        assert_eq!(ErrorCode::AssetStorageUnavailable.status_code().as_u16(), 503);
    }

    #[test]
    fn empty_field_list_passes_validation() {
        assert!(AppError::check_fields(Vec::new()).is_ok());
        assert_eq!(
            AppError::check_fields(vec![ValidationFieldError::new("title", "required")])
                .unwrap_err()
                .code(),
            ErrorCode::ValidationError
        );
    }
}
