use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

/// Timestamp stamping shared by every entity's `before_save`.
#[async_trait::async_trait]
pub trait ActiveModelTimeBehavior: Sized + Send {
    fn set_created_at(&mut self, dt: DateTime<Utc>);

    /// Append-only tables keep the default no-op.
    fn set_updated_at(&mut self, _dt: DateTime<Utc>) {}

    async fn before_save_common<C: ConnectionTrait>(mut self, _db: &C, insert: bool) -> Result<Self, DbErr> {
        let now = Utc::now();
        if insert {
            self.set_created_at(now);
        } else {
            self.set_updated_at(now);
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::{ActiveValue, DatabaseConnection};

    use super::*;
    use crate::entity::{apartment, report};

    #[tokio::test]
    async fn insert_stamps_created_at_and_update_stamps_updated_at() {
        let db = DatabaseConnection::Disconnected;

        let inserted = <apartment::ActiveModel as Default>::default()
            .before_save_common(&db, true)
            .await
            .unwrap();
        assert!(matches!(inserted.created_at, ActiveValue::Set(_)));
        assert!(matches!(inserted.updated_at, ActiveValue::NotSet));

        let updated = <apartment::ActiveModel as Default>::default()
            .before_save_common(&db, false)
            .await
            .unwrap();
        assert!(matches!(updated.created_at, ActiveValue::NotSet));
        assert!(matches!(updated.updated_at, ActiveValue::Set(Some(_))));
    }

    #[tokio::test]
    async fn reports_only_carry_a_creation_time() {
        let db = DatabaseConnection::Disconnected;

        let updated = <report::ActiveModel as Default>::default()
            .before_save_common(&db, false)
            .await
            .unwrap();
        assert!(matches!(updated.created_at, ActiveValue::NotSet));
    }
}
