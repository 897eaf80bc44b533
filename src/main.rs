use std::sync::Arc;
use std::time::Duration;

use actix_cors::Cors;
use actix_web::http::header;
use actix_web::{App, HttpServer};
use dotenv::dotenv;
use sea_orm_migration::MigratorTrait;
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use rusty_residence::api::auth::bootstrap_superuser;
use rusty_residence::configuration::Settings;
use rusty_residence::db::init_db;
use rusty_residence::jobs::{ReportCountSignal, ReputationJob};
use rusty_residence::migration::Migrator;
use rusty_residence::openapi::ApiDoc;
use rusty_residence::startup::AppContext;
use rusty_residence::telemetry::{get_subscriber, init_subscriber};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let subscriber = get_subscriber(
        "rusty_residence".into(),
        "info,sqlx=warn".into(),
        std::io::stdout,
    );
    init_subscriber(subscriber)?;

    info!("starting application");

    let settings = Settings::from_env()?;

    let db = init_db(&settings.database).await?;
    info!("running database migrations");
    Migrator::up(&db, None).await?;
    info!("migrations complete");

    if let Some(superuser) = &settings.superuser {
        if bootstrap_superuser(&db, superuser, settings.auth.password_hash_cost).await? {
            info!(username = %superuser.username, "superuser created");
        }
    }

    let job = Arc::new(ReputationJob::new(db.clone(), Arc::new(ReportCountSignal)));
    job.spawn(Duration::from_secs(settings.jobs.reputation_interval_secs.max(1)));

    let address = (settings.application.host.clone(), settings.application.port);
    let ctx = AppContext::from_settings(db, settings)?;

    info!(host = %address.0, port = address.1, "server listening");
    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allowed_methods(vec!["GET", "POST", "PATCH", "DELETE", "OPTIONS"])
            .allowed_headers(vec![header::CONTENT_TYPE, header::AUTHORIZATION])
            .supports_credentials()
            .max_age(3600);

        let ctx = ctx.clone();
        App::new()
            .wrap(cors)
            .configure(move |cfg| ctx.configure(cfg))
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
            )
    })
    .bind(address)?
    .run()
    .await?;

    Ok(())
}
