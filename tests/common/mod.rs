#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};
use sea_orm_migration::MigratorTrait;

use rusty_residence::auth::AuthUser;
use rusty_residence::configuration::Settings;
use rusty_residence::entity::profile::{self, Occupation};
use rusty_residence::entity::user::{self, UserRole};
use rusty_residence::entity::apartment;
use rusty_residence::migration::Migrator;
use rusty_residence::model::global_error::{AppError, ErrorCode};
use rusty_residence::notification::{Notification, Notifier};

pub async fn setup_db() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:");
    // one connection so every query sees the same in-memory database
    options.max_connections(1).min_connections(1).sqlx_logging(false);

    let db = Database::connect(options).await.expect("connect to sqlite");
    Migrator::up(&db, None).await.expect("run migrations");
    db
}

pub fn test_settings() -> Settings {
    let values: HashMap<&str, &str> = HashMap::from([
        ("DATABASE_URL", "sqlite::memory:"),
        ("JWT_SECRET", "test-secret"),
        ("PASSWORD_HASH_COST", "4"),
        ("COOKIE_SECURE", "False"),
        ("SITE_NAME", "Test Residence"),
        ("REPORT_WARNING_THRESHOLD", "2"),
    ]);
    Settings::from_lookup(|key| values.get(key).map(|v| v.to_string())).expect("test settings")
}

pub async fn create_user(
    db: &DatabaseConnection,
    username: &str,
    role: UserRole,
    occupation: Occupation,
) -> user::Model {
    let user = user::ActiveModel {
        username: Set(username.to_string()),
        email: Set(format!("{username}@example.com")),
        first_name: Set(username.to_string()),
        last_name: Set("Test".to_string()),
        password: Set("not-a-real-hash".to_string()),
        role: Set(role),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert user");

    profile::ActiveModel::for_user(user.id, occupation)
        .insert(db)
        .await
        .expect("insert profile");

    user
}

pub async fn create_tenant(db: &DatabaseConnection, username: &str) -> user::Model {
    create_user(db, username, UserRole::Member, Occupation::Tenant).await
}

pub async fn create_staff(db: &DatabaseConnection, username: &str) -> user::Model {
    create_user(db, username, UserRole::Staff, Occupation::Tenant).await
}

pub async fn create_apartment(db: &DatabaseConnection, unit_number: &str) -> apartment::Model {
    apartment::ActiveModel {
        unit_number: Set(unit_number.to_string()),
        building: Set("A".to_string()),
        floor: Set(1),
        tenant_id: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert apartment")
}

pub fn actor(user: &user::Model) -> AuthUser {
    AuthUser {
        id: user.id,
        role: user.role,
    }
}

pub fn code_of<T: std::fmt::Debug>(result: Result<T, AppError>) -> ErrorCode {
    result.expect_err("expected an error").code()
}

#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, notification: &Notification) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}
