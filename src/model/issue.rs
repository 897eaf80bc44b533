use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entity::issue::{IssuePriority, IssueStatus};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateIssueRequest {
    pub apartment_id: i32,
    pub title: String,
    pub description: String,
    pub priority: Option<IssuePriority>,
}

/// Absent fields are left untouched.
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateIssueRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<IssueStatus>,
    pub priority: Option<IssuePriority>,
    /// user id of the technician to assign
    pub assigned_to: Option<i32>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct IssueResponse {
    pub id: i32,
    pub apartment_id: i32,
    pub apartment_unit: String,
    pub reported_by: String,
    pub assigned_to: Option<String>,
    pub title: String,
    pub description: String,
    pub status: IssueStatus,
    pub priority: IssuePriority,
    pub resolved_on: Option<NaiveDate>,
    pub resolved_by: Option<String>,
    pub view_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}
