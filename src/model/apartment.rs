use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entity::apartment;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateApartmentRequest {
    pub unit_number: String,
    pub building: String,
    pub floor: i32,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AssignTenantRequest {
    /// user id of the new tenant
    pub tenant: i32,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApartmentResponse {
    pub id: i32,
    pub unit_number: String,
    pub building: String,
    pub floor: i32,
    pub tenant: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<apartment::Model> for ApartmentResponse {
    fn from(model: apartment::Model) -> Self {
        Self {
            id: model.id,
            unit_number: model.unit_number,
            building: model.building,
            floor: model.floor,
            tenant: model.tenant_id,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}
