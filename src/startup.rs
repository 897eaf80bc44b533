use std::sync::Arc;

use actix_web::error::InternalError;
use actix_web::web::{self, Data};
use sea_orm::DatabaseConnection;

use crate::api;
use crate::auth::JwtUtils;
use crate::configuration::Settings;
use crate::model::global_error::{AppError, ValidationFieldError};
use crate::notification::{build_notifier, Notifier};
use crate::storage::{build_storage, AssetStorage, MAX_AVATAR_BYTES};

/// Shared application state. Cloned into every worker by `HttpServer::new`.
#[derive(Clone)]
pub struct AppContext {
    pub db: Data<DatabaseConnection>,
    pub settings: Data<Settings>,
    pub jwt: Data<JwtUtils>,
    pub notifier: Data<dyn Notifier>,
    pub storage: Data<dyn AssetStorage>,
}

impl AppContext {
    pub fn new(
        db: DatabaseConnection,
        settings: Settings,
        notifier: Arc<dyn Notifier>,
        storage: Arc<dyn AssetStorage>,
    ) -> Self {
        Self {
            jwt: Data::new(JwtUtils::new(&settings.auth)),
            db: Data::new(db),
            settings: Data::new(settings),
            notifier: Data::from(notifier),
            storage: Data::from(storage),
        }
    }

    /// Wires the mail and storage adapters described by `settings`.
    pub fn from_settings(db: DatabaseConnection, settings: Settings) -> anyhow::Result<Self> {
        let notifier = build_notifier(&settings.mail)?;
        let storage = build_storage(&settings.storage)?;
        Ok(Self::new(db, settings, notifier, storage))
    }

    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        let json_config = web::JsonConfig::default().error_handler(|err, _req| {
            let detail = err.to_string();
            tracing::debug!(error = %detail, "rejected json body");
            InternalError::from_response(
                err,
                actix_web::ResponseError::error_response(&AppError::ValidationError(vec![
                    ValidationFieldError::new("body", detail),
                ])),
            )
            .into()
        });

        cfg.app_data(self.db.clone())
            .app_data(self.settings.clone())
            .app_data(self.jwt.clone())
            .app_data(self.notifier.clone())
            .app_data(self.storage.clone())
            .app_data(json_config)
            .app_data(web::PayloadConfig::new(MAX_AVATAR_BYTES + 64 * 1024))
            .configure(api::routes);
    }
}
