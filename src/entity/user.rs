use chrono::{DateTime, Utc};
use sea_orm::Set;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::base_time::ActiveModelTimeBehavior;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub username: String,
    #[sea_orm(unique)]
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum, ToSchema)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    #[sea_orm(string_value = "member")]
    Member,

    #[sea_orm(string_value = "staff")]
    Staff,

    #[sea_orm(string_value = "superuser")]
    Superuser,
}

impl UserRole {
    pub fn is_admin(self) -> bool {
        matches!(self, UserRole::Staff | UserRole::Superuser)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            UserRole::Member => "member",
            UserRole::Staff => "staff",
            UserRole::Superuser => "superuser",
        }
    }
}

impl Model {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_one = "super::profile::Entity")]
    Profile,
}

impl Related<super::profile::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Profile.def()
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staff_and_superusers_are_administrators() {
        assert!(!UserRole::Member.is_admin());
        assert!(UserRole::Staff.is_admin());
        assert!(UserRole::Superuser.is_admin());
    }

    #[test]
    fn log_names_match_the_wire_names() {
        for role in [UserRole::Member, UserRole::Staff, UserRole::Superuser] {
            assert_eq!(serde_json::to_value(role).unwrap(), role.as_str());
        }
    }
}
