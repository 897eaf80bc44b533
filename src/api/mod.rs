pub mod apartment;
pub mod auth;
pub mod content_view;
pub mod health_check;
pub mod issue;
pub mod profile;
pub mod report;

use actix_web::web;

use crate::auth::AuthMiddleware;

/// Mounts every route. Literal issue paths are registered before `/issues/{id}/`.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(health_check::health_check).service(
        web::scope("/api/v1")
            .wrap(AuthMiddleware)
            .service(auth::register)
            .service(auth::login)
            .service(auth::refresh_token)
            .service(auth::logout)
            .service(auth::get_me)
            .service(apartment::create_apartment)
            .service(apartment::my_apartments)
            .service(apartment::available_apartments)
            .service(apartment::assign_apartment)
            .service(apartment::release)
            .service(issue::list_issues)
            .service(issue::create_issue)
            .service(issue::my_issues)
            .service(issue::assigned_issues)
            .service(issue::get_issue)
            .service(issue::patch_issue)
            .service(issue::remove_issue)
            .service(profile::get_profiles)
            .service(profile::get_non_tenant_profiles)
            .service(profile::get_my_profile)
            .service(profile::patch_my_profile)
            .service(profile::patch_avatar)
            .service(report::create_report)
            .service(report::my_reports),
    );
}
