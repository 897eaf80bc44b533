use actix_web::HttpResponse;
use actix_web::http::StatusCode;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::model::global_error::{AppError, ErrorCode};

/// Wraps `payload` as `{"status_code": N, "<label>": payload}`.
pub fn envelope<T: Serialize>(
    status: StatusCode,
    label: &str,
    payload: &T,
) -> Result<HttpResponse, AppError> {
    let payload = serde_json::to_value(payload).map_err(|err| {
        tracing::error!(error = %err, label, "failed to serialize response payload");
        AppError::new(ErrorCode::InternalError)
    })?;

    let mut body = serde_json::Map::with_capacity(2);
    body.insert("status_code".to_string(), status.as_u16().into());
    body.insert(label.to_string(), payload);

    Ok(HttpResponse::build(status).json(serde_json::Value::Object(body)))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginationResponse<T> {
    pub content: Vec<T>,
    pub page: u64,
    pub size: u64,
    pub total_elements: u64,
    pub total_pages: u64,
    pub is_first: bool,
    pub is_last: bool,
}

impl<T> PaginationResponse<T> {
    pub fn new(content: Vec<T>, page: u64, size: u64, total_elements: u64) -> Self {
        let total_pages = total_elements.div_ceil(size.max(1));
        let is_first = page == 1;
        let is_last = page >= total_pages;

        Self {
            content,
            page,
            size,
            total_elements,
            total_pages,
            is_first,
            is_last,
        }
    }
}

pub const MAX_PAGE_SIZE: u64 = 100;

#[derive(Debug, Clone, Copy, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    /// 1-based page number
    pub page: Option<u64>,
    pub size: Option<u64>,
}

impl PageQuery {
    pub fn page(&self) -> u64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn size(&self) -> u64 {
        self.size.unwrap_or(10).clamp(1, MAX_PAGE_SIZE)
    }

    /// Zero-based index for sea-orm paginators.
    pub fn page_index(&self) -> u64 {
        self.page() - 1
    }
}
