use chrono::{DateTime, Utc};
use sea_orm::Set;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::base_time::ActiveModelTimeBehavior;

pub const DEFAULT_REPUTATION: i32 = 100;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "profiles")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub user_id: i32,
    pub gender: Gender,
    pub occupation: Occupation,
    pub phone_number: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub bio: Option<String>,
    pub country_of_origin: Option<String>,
    pub city_of_origin: Option<String>,
    pub avatar: Option<String>,
    pub reputation: i32,
    pub report_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum, ToSchema)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    #[sea_orm(string_value = "male")]
    Male,

    #[sea_orm(string_value = "female")]
    Female,

    #[default]
    #[sea_orm(string_value = "other")]
    Other,
}

/// Tenants live in the building; every other occupation is a trade that staff can assign issues to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum, ToSchema)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum Occupation {
    #[sea_orm(string_value = "mason")]
    Mason,

    #[sea_orm(string_value = "carpenter")]
    Carpenter,

    #[sea_orm(string_value = "plumber")]
    Plumber,

    #[sea_orm(string_value = "roofer")]
    Roofer,

    #[sea_orm(string_value = "painter")]
    Painter,

    #[sea_orm(string_value = "electrician")]
    Electrician,

    #[sea_orm(string_value = "hvac")]
    Hvac,

    #[default]
    #[sea_orm(string_value = "tenant")]
    Tenant,
}

impl Occupation {
    pub fn is_tenant(self) -> bool {
        self == Occupation::Tenant
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelTimeBehavior for ActiveModel {
    fn set_created_at(&mut self, dt: DateTime<Utc>) {
        self.created_at = Set(dt);
    }

    fn set_updated_at(&mut self, dt: DateTime<Utc>) {
        self.updated_at = Set(Some(dt));
    }
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C: ConnectionTrait>(self, db: &C, insert: bool) -> Result<Self, DbErr> {
        self.before_save_common(db, insert).await
    }
}

impl ActiveModel {
    pub fn for_user(user_id: i32, occupation: Occupation) -> Self {
        Self {
            user_id: Set(user_id),
            gender: Set(Gender::default()),
            occupation: Set(occupation),
            reputation: Set(DEFAULT_REPUTATION),
            report_count: Set(0),
            ..Default::default()
        }
    }
}
