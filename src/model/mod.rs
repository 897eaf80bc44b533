pub mod apartment;
pub mod auth;
pub mod common;
pub mod global_error;
pub mod issue;
pub mod profile;
pub mod report;

pub use auth::{Claims, LoginRequest, RegisterRequest, TokenKind, UserResponse};
pub use global_error::{AppError, ErrorCode};
