use std::collections::HashMap;

use actix_web::http::StatusCode;
use actix_web::{get, post, web, HttpResponse};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use sea_query::Expr;

use crate::auth::AuthUser;
use crate::configuration::Settings;
use crate::entity::profile::{self, Entity as ProfileEntity};
use crate::entity::report::{self, Entity as ReportEntity};
use crate::entity::user::{self, Entity as UserEntity};
use crate::model::common::envelope;
use crate::model::global_error::{AppError, ErrorCode, ValidationFieldError};
use crate::model::report::{CreateReportRequest, ReportResponse};
use crate::notification::{deliver, Notification, Notifier};

/// Files a report against another user and bumps their report count.
/// The reported user is warned once, when the count reaches `warning_threshold`.
#[tracing::instrument(skip(db, notifier, request), fields(actor = actor.id, reported_user = request.reported_user_id))]
pub async fn file_report(
    db: &DatabaseConnection,
    notifier: &dyn Notifier,
    site_name: &str,
    warning_threshold: i32,
    actor: &AuthUser,
    request: &CreateReportRequest,
) -> Result<ReportResponse, AppError> {
    if request.reported_user_id == actor.id {
        return Err(AppError::new(ErrorCode::CannotReportSelf));
    }
    validate_create_request(request)?;

    let reported_user = UserEntity::find_by_id(request.reported_user_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::MemberNotFound))?;
    let reporter = UserEntity::find_by_id(actor.id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::MemberNotFound))?;

    let txn = db.begin().await?;

    let report = report::ActiveModel {
        title: Set(request.title.trim().to_string()),
        description: Set(request.description.trim().to_string()),
        reported_by: Set(reporter.id),
        reported_user: Set(reported_user.id),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    ProfileEntity::update_many()
        .col_expr(profile::Column::ReportCount, Expr::col(profile::Column::ReportCount).add(1))
        .filter(profile::Column::UserId.eq(reported_user.id))
        .exec(&txn)
        .await?;

    let report_count = ProfileEntity::find()
        .filter(profile::Column::UserId.eq(reported_user.id))
        .one(&txn)
        .await?
        .map(|profile| profile.report_count)
        .unwrap_or(0);

    txn.commit().await?;

    tracing::info!(report_id = report.id, report_count, "user reported");

    if report_count == warning_threshold {
        deliver(notifier, Notification::report_warning(&reported_user, report_count, site_name)).await;
    }

    Ok(ReportResponse {
        id: report.id,
        title: report.title,
        description: report.description,
        reported_by: reporter.username,
        reported_user: reported_user.username,
        created_at: report.created_at,
    })
}

pub async fn list_filed_by(db: &DatabaseConnection, actor: &AuthUser) -> Result<Vec<ReportResponse>, AppError> {
    let reports = ReportEntity::find()
        .filter(report::Column::ReportedBy.eq(actor.id))
        .order_by_desc(report::Column::CreatedAt)
        .order_by_desc(report::Column::Id)
        .all(db)
        .await?;

    let user_ids: Vec<i32> = reports
        .iter()
        .flat_map(|report| [report.reported_by, report.reported_user])
        .collect();
    let usernames: HashMap<i32, String> = UserEntity::find()
        .filter(user::Column::Id.is_in(user_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|user| (user.id, user.username))
        .collect();

    Ok(reports
        .into_iter()
        .map(|report| ReportResponse {
            reported_by: usernames.get(&report.reported_by).cloned().unwrap_or_default(),
            reported_user: usernames.get(&report.reported_user).cloned().unwrap_or_default(),
            id: report.id,
            title: report.title,
            description: report.description,
            created_at: report.created_at,
        })
        .collect())
}

fn validate_create_request(request: &CreateReportRequest) -> Result<(), AppError> {
    let mut errors = Vec::new();

    if request.title.trim().is_empty() {
        errors.push(ValidationFieldError::new("title", "Title is required."));
    }
    if request.description.trim().is_empty() {
        errors.push(ValidationFieldError::new("description", "Description is required."));
    }

    AppError::check_fields(errors)
}

#[utoipa::path(
    post,
    path = "/api/v1/reports/",
    summary = "Report another user",
    request_body = CreateReportRequest,
    responses(
        (status = 201, description = "Report filed", body = ReportResponse),
        (status = 400, description = "Self-report or invalid fields"),
        (status = 404, description = "Reported user not found"),
    ),
    tag = "reports",
)]
#[post("/reports/")]
pub async fn create_report(
    body: web::Json<CreateReportRequest>,
    db: web::Data<DatabaseConnection>,
    notifier: web::Data<dyn Notifier>,
    settings: web::Data<Settings>,
    auth_user: AuthUser,
) -> Result<HttpResponse, AppError> {
    let report = file_report(
        &db,
        notifier.get_ref(),
        &settings.mail.site_name,
        settings.jobs.report_warning_threshold,
        &auth_user,
        &body,
    )
    .await?;
    envelope(StatusCode::CREATED, "report", &report)
}

#[utoipa::path(
    get,
    path = "/api/v1/reports/me/",
    summary = "Reports filed by the caller",
    responses((status = 200, description = "Caller's reports", body = Vec<ReportResponse>)),
    tag = "reports",
)]
#[get("/reports/me/")]
pub async fn my_reports(
    db: web::Data<DatabaseConnection>,
    auth_user: AuthUser,
) -> Result<HttpResponse, AppError> {
    envelope(StatusCode::OK, "reports", &list_filed_by(&db, &auth_user).await?)
}
