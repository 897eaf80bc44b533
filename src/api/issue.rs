use std::collections::{HashMap, HashSet};

use actix_web::http::StatusCode;
use actix_web::{delete, get, patch, post, web, HttpRequest, HttpResponse};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use sea_query::Expr;

use crate::api::apartment::find_apartment;
use crate::api::content_view::{forget_views, record_view, view_counts, viewer_ip, ISSUE_CONTENT_TYPE};
use crate::auth::{authorize, Action, AuthUser, Resource};
use crate::configuration::Settings;
use crate::entity::issue::{self, Entity as IssueEntity, IssueStatus, Transition};
use crate::entity::{apartment, user};
use crate::model::common::{envelope, PageQuery, PaginationResponse};
use crate::model::global_error::{AppError, ErrorCode, ValidationFieldError};
use crate::model::issue::{CreateIssueRequest, IssueResponse, UpdateIssueRequest};
use crate::notification::{deliver, Notification, Notifier};

const MAX_TITLE_LEN: usize = 255;

pub async fn find_issue(db: &DatabaseConnection, issue_id: i32) -> Result<issue::Model, AppError> {
    IssueEntity::find_by_id(issue_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::IssueNotFound))
}

/// Files an issue against the caller's apartment and confirms it to them by mail.
#[tracing::instrument(skip(db, notifier, request), fields(actor = actor.id, apartment_id = request.apartment_id))]
pub async fn report_issue(
    db: &DatabaseConnection,
    notifier: &dyn Notifier,
    site_name: &str,
    actor: &AuthUser,
    request: &CreateIssueRequest,
) -> Result<issue::Model, AppError> {
    validate_text_fields(Some(&request.title), Some(&request.description))?;

    let apartment = find_apartment(db, request.apartment_id).await?;
    authorize(actor, Action::ReportIssue, Resource::Apartment(&apartment))?;

    let issue = issue::ActiveModel {
        apartment_id: Set(apartment.id),
        reported_by: Set(actor.id),
        assigned_to: Set(None),
        title: Set(request.title.trim().to_string()),
        description: Set(request.description.trim().to_string()),
        status: Set(IssueStatus::Reported),
        priority: Set(request.priority.unwrap_or_default()),
        resolved_on: Set(None),
        resolved_by: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await?;

    tracing::info!(issue_id = issue.id, "issue reported");

    if let Some(reporter) = user::Entity::find_by_id(actor.id).one(db).await? {
        deliver(notifier, Notification::issue_reported(&reporter, &issue, site_name)).await;
    }

    Ok(issue)
}

/// Applies a partial update.
///
/// Resolved issues are immutable. Moving into `resolved` stamps `resolved_on` and
/// `resolved_by` in the same conditional write that changes the status, so the stamp
/// happens once no matter how many resolve requests race.
#[tracing::instrument(skip(db, notifier, request), fields(actor = actor.id))]
pub async fn update_issue(
    db: &DatabaseConnection,
    notifier: &dyn Notifier,
    site_name: &str,
    actor: &AuthUser,
    issue_id: i32,
    request: &UpdateIssueRequest,
) -> Result<issue::Model, AppError> {
    let current = find_issue(db, issue_id).await?;
    authorize(actor, Action::UpdateIssue, Resource::Issue(&current))?;

    if current.status.is_terminal() {
        return Err(AppError::new(ErrorCode::IssueAlreadyResolved));
    }

    let transition = match request.status {
        Some(target) => current.status.plan_transition(target)?,
        None => Transition::Unchanged,
    };
    if transition == Transition::Correction {
        authorize(actor, Action::CorrectIssueStatus, Resource::Issue(&current))?;
    }

    if let Some(assignee_id) = request.assigned_to {
        authorize(actor, Action::ReassignIssue, Resource::Issue(&current))?;
        user::Entity::find_by_id(assignee_id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::with_detail(ErrorCode::MemberNotFound, format!("assignee {assignee_id}")))?;
    }

    validate_text_fields(request.title.as_ref(), request.description.as_ref())?;

    let updated = apply_issue_update(db, actor, issue_id, request, transition).await?;

    if transition == Transition::Resolve {
        tracing::info!(issue_id, resolved_by = actor.id, "issue resolved");
        notify_resolution(db, notifier, site_name, &updated, actor).await;
    }

    Ok(updated)
}

/// Writes an already authorized update, guarded by `status <> 'resolved'`.
/// Nothing written because the issue is resolved by now means a concurrent resolve won.
pub async fn apply_issue_update(
    db: &DatabaseConnection,
    actor: &AuthUser,
    issue_id: i32,
    request: &UpdateIssueRequest,
    transition: Transition,
) -> Result<issue::Model, AppError> {
    let mut update = IssueEntity::update_many().col_expr(issue::Column::UpdatedAt, Expr::value(Utc::now()));

    if let Some(title) = &request.title {
        update = update.col_expr(issue::Column::Title, Expr::value(title.trim()));
    }
    if let Some(description) = &request.description {
        update = update.col_expr(issue::Column::Description, Expr::value(description.trim()));
    }
    if let Some(priority) = request.priority {
        update = update.col_expr(issue::Column::Priority, Expr::value(priority));
    }
    if let Some(assignee_id) = request.assigned_to {
        update = update.col_expr(issue::Column::AssignedTo, Expr::value(assignee_id));
    }
    if let (Some(target), false) = (request.status, transition == Transition::Unchanged) {
        update = update.col_expr(issue::Column::Status, Expr::value(target));
    }
    if transition == Transition::Resolve {
        update = update
            .col_expr(issue::Column::ResolvedOn, Expr::value(Utc::now().date_naive()))
            .col_expr(issue::Column::ResolvedBy, Expr::value(actor.id));
    }

    let result = update
        .filter(issue::Column::Id.eq(issue_id))
        .filter(issue::Column::Status.ne(IssueStatus::Resolved))
        .exec(db)
        .await?;

    let updated = find_issue(db, issue_id).await?;
    if result.rows_affected == 0 && updated.status.is_terminal() {
        tracing::warn!(issue_id, "issue was resolved by a concurrent update");
        return Err(AppError::new(ErrorCode::IssueAlreadyResolved));
    }

    Ok(updated)
}

/// The resolution is already committed here, so lookup failures are logged and dropped.
async fn notify_resolution(
    db: &DatabaseConnection,
    notifier: &dyn Notifier,
    site_name: &str,
    issue: &issue::Model,
    resolver: &AuthUser,
) {
    let users = user::Entity::find()
        .filter(user::Column::Id.is_in([issue.reported_by, resolver.id]))
        .all(db)
        .await;
    let users = match users {
        Ok(users) => users,
        Err(err) => {
            tracing::error!(issue_id = issue.id, error = %err, "could not load users for resolution notice");
            return;
        }
    };

    let Some(reporter) = users.iter().find(|user| user.id == issue.reported_by) else {
        return;
    };
    let resolver_name = users
        .iter()
        .find(|user| user.id == resolver.id)
        .map(|user| user.username.as_str())
        .unwrap_or("staff");

    deliver(notifier, Notification::issue_resolved(reporter, issue, resolver_name, site_name)).await;
}

pub async fn delete_issue(db: &DatabaseConnection, actor: &AuthUser, issue_id: i32) -> Result<(), AppError> {
    let issue = find_issue(db, issue_id).await?;
    authorize(actor, Action::DeleteIssue, Resource::Issue(&issue))?;

    let txn = db.begin().await?;
    forget_views(&txn, ISSUE_CONTENT_TYPE, issue_id).await?;
    IssueEntity::delete_by_id(issue_id).exec(&txn).await?;
    txn.commit().await?;

    tracing::info!(issue_id, actor = actor.id, "issue deleted");
    Ok(())
}

/// Reads an issue on behalf of `actor`, counting the view.
pub async fn view_issue(
    db: &DatabaseConnection,
    actor: &AuthUser,
    issue_id: i32,
    viewer_ip: &str,
) -> Result<IssueResponse, AppError> {
    let issue = find_issue(db, issue_id).await?;
    authorize(actor, Action::ViewIssue, Resource::Issue(&issue))?;

    record_view(db, ISSUE_CONTENT_TYPE, issue.id, actor.id, viewer_ip).await?;

    describe_issue(db, issue).await
}

pub async fn list_all_issues(
    db: &DatabaseConnection,
    actor: &AuthUser,
    page: &PageQuery,
) -> Result<PaginationResponse<IssueResponse>, AppError> {
    authorize(actor, Action::ListAllIssues, Resource::Any)?;

    let paginator = IssueEntity::find()
        .order_by_desc(issue::Column::CreatedAt)
        .order_by_desc(issue::Column::Id)
        .paginate(db, page.size());

    let total = paginator.num_items().await?;
    let issues = paginator.fetch_page(page.page_index()).await?;

    Ok(PaginationResponse::new(describe_issues(db, issues).await?, page.page(), page.size(), total))
}

pub async fn list_reported_by(db: &DatabaseConnection, actor: &AuthUser) -> Result<Vec<IssueResponse>, AppError> {
    let issues = IssueEntity::find()
        .filter(issue::Column::ReportedBy.eq(actor.id))
        .order_by_desc(issue::Column::CreatedAt)
        .order_by_desc(issue::Column::Id)
        .all(db)
        .await?;
    Ok(describe_issues(db, issues).await?)
}

pub async fn list_assigned_to(db: &DatabaseConnection, actor: &AuthUser) -> Result<Vec<IssueResponse>, AppError> {
    let issues = IssueEntity::find()
        .filter(issue::Column::AssignedTo.eq(actor.id))
        .order_by_desc(issue::Column::CreatedAt)
        .order_by_desc(issue::Column::Id)
        .all(db)
        .await?;
    Ok(describe_issues(db, issues).await?)
}

pub async fn describe_issue(db: &DatabaseConnection, issue: issue::Model) -> Result<IssueResponse, AppError> {
    describe_issues(db, vec![issue])
        .await?
        .pop()
        .ok_or_else(|| AppError::new(ErrorCode::InternalError))
}

/// Resolves usernames, unit numbers and view counts for a page of issues in three queries.
pub async fn describe_issues(
    db: &DatabaseConnection,
    issues: Vec<issue::Model>,
) -> Result<Vec<IssueResponse>, DbErr> {
    if issues.is_empty() {
        return Ok(Vec::new());
    }

    let user_ids: HashSet<i32> = issues
        .iter()
        .flat_map(|issue| [Some(issue.reported_by), issue.assigned_to, issue.resolved_by])
        .flatten()
        .collect();
    let apartment_ids: HashSet<i32> = issues.iter().map(|issue| issue.apartment_id).collect();
    let issue_ids: Vec<i32> = issues.iter().map(|issue| issue.id).collect();

    let usernames: HashMap<i32, String> = user::Entity::find()
        .filter(user::Column::Id.is_in(user_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|user| (user.id, user.username))
        .collect();

    let units: HashMap<i32, String> = apartment::Entity::find()
        .filter(apartment::Column::Id.is_in(apartment_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|apartment| (apartment.id, apartment.unit_number))
        .collect();

    let views = view_counts(db, ISSUE_CONTENT_TYPE, &issue_ids).await?;

    let name_of = |id: Option<i32>| id.and_then(|id| usernames.get(&id).cloned());

    Ok(issues
        .into_iter()
        .map(|issue| IssueResponse {
            apartment_unit: units.get(&issue.apartment_id).cloned().unwrap_or_default(),
            reported_by: name_of(Some(issue.reported_by)).unwrap_or_default(),
            assigned_to: name_of(issue.assigned_to),
            resolved_by: name_of(issue.resolved_by),
            view_count: views.get(&issue.id).copied().unwrap_or(0),
            id: issue.id,
            apartment_id: issue.apartment_id,
            title: issue.title,
            description: issue.description,
            status: issue.status,
            priority: issue.priority,
            resolved_on: issue.resolved_on,
            created_at: issue.created_at,
            updated_at: issue.updated_at,
        })
        .collect())
}

fn validate_text_fields(title: Option<&String>, description: Option<&String>) -> Result<(), AppError> {
    let mut errors = Vec::new();

    if let Some(title) = title {
        let title = title.trim();
        if title.is_empty() {
            errors.push(ValidationFieldError::new("title", "Title is required."));
        } else if title.chars().count() > MAX_TITLE_LEN {
            errors.push(ValidationFieldError::new(
                "title",
                format!("Title must be at most {MAX_TITLE_LEN} characters."),
            ));
        }
    }

    if let Some(description) = description {
        if description.trim().is_empty() {
            errors.push(ValidationFieldError::new("description", "Description is required."));
        }
    }

    AppError::check_fields(errors)
}

#[utoipa::path(
    get,
    path = "/api/v1/issues/",
    summary = "All issues (staff)",
    params(PageQuery),
    responses(
        (status = 200, description = "Page of issues", body = PaginationResponse<IssueResponse>),
        (status = 403, description = "Staff only"),
    ),
    tag = "issues",
)]
#[get("/issues/")]
pub async fn list_issues(
    query: web::Query<PageQuery>,
    db: web::Data<DatabaseConnection>,
    auth_user: AuthUser,
) -> Result<HttpResponse, AppError> {
    let page = list_all_issues(&db, &auth_user, &query).await?;
    envelope(StatusCode::OK, "issues", &page)
}

#[utoipa::path(
    post,
    path = "/api/v1/issues/",
    summary = "Report an issue in the caller's apartment",
    request_body = CreateIssueRequest,
    responses(
        (status = 201, description = "Issue created", body = IssueResponse),
        (status = 403, description = "Caller is not the apartment's tenant"),
        (status = 404, description = "Apartment not found"),
    ),
    tag = "issues",
)]
#[post("/issues/")]
pub async fn create_issue(
    body: web::Json<CreateIssueRequest>,
    db: web::Data<DatabaseConnection>,
    notifier: web::Data<dyn Notifier>,
    settings: web::Data<Settings>,
    auth_user: AuthUser,
) -> Result<HttpResponse, AppError> {
    let issue = report_issue(&db, notifier.get_ref(), &settings.mail.site_name, &auth_user, &body).await?;
    envelope(StatusCode::CREATED, "issue", &describe_issue(&db, issue).await?)
}

#[utoipa::path(
    get,
    path = "/api/v1/issues/me/",
    summary = "Issues reported by the caller",
    responses((status = 200, description = "Caller's issues", body = Vec<IssueResponse>)),
    tag = "issues",
)]
#[get("/issues/me/")]
pub async fn my_issues(
    db: web::Data<DatabaseConnection>,
    auth_user: AuthUser,
) -> Result<HttpResponse, AppError> {
    envelope(StatusCode::OK, "my_issues", &list_reported_by(&db, &auth_user).await?)
}

#[utoipa::path(
    get,
    path = "/api/v1/issues/assigned/",
    summary = "Issues assigned to the caller",
    responses((status = 200, description = "Assigned issues", body = Vec<IssueResponse>)),
    tag = "issues",
)]
#[get("/issues/assigned/")]
pub async fn assigned_issues(
    db: web::Data<DatabaseConnection>,
    auth_user: AuthUser,
) -> Result<HttpResponse, AppError> {
    envelope(StatusCode::OK, "assigned_issues", &list_assigned_to(&db, &auth_user).await?)
}

#[utoipa::path(
    get,
    path = "/api/v1/issues/{id}/",
    summary = "Issue detail",
    params(("id" = i32, Path, description = "Issue id")),
    responses(
        (status = 200, description = "The issue", body = IssueResponse),
        (status = 403, description = "Not the reporter, assignee or staff"),
        (status = 404, description = "Issue not found"),
    ),
    tag = "issues",
)]
#[get("/issues/{id}/")]
pub async fn get_issue(
    req: HttpRequest,
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
    auth_user: AuthUser,
) -> Result<HttpResponse, AppError> {
    let issue = view_issue(&db, &auth_user, path.into_inner(), &viewer_ip(&req)).await?;
    envelope(StatusCode::OK, "issue", &issue)
}

#[utoipa::path(
    patch,
    path = "/api/v1/issues/{id}/",
    summary = "Update an issue",
    params(("id" = i32, Path, description = "Issue id")),
    request_body = UpdateIssueRequest,
    responses(
        (status = 200, description = "Updated issue", body = IssueResponse),
        (status = 400, description = "Issue already resolved or invalid fields"),
        (status = 403, description = "Not the assignee or staff"),
        (status = 404, description = "Issue or assignee not found"),
    ),
    tag = "issues",
)]
#[patch("/issues/{id}/")]
pub async fn patch_issue(
    path: web::Path<i32>,
    body: web::Json<UpdateIssueRequest>,
    db: web::Data<DatabaseConnection>,
    notifier: web::Data<dyn Notifier>,
    settings: web::Data<Settings>,
    auth_user: AuthUser,
) -> Result<HttpResponse, AppError> {
    let issue = update_issue(
        &db,
        notifier.get_ref(),
        &settings.mail.site_name,
        &auth_user,
        path.into_inner(),
        &body,
    )
    .await?;
    envelope(StatusCode::OK, "issue", &describe_issue(&db, issue).await?)
}

#[utoipa::path(
    delete,
    path = "/api/v1/issues/{id}/delete/",
    summary = "Delete an issue",
    params(("id" = i32, Path, description = "Issue id")),
    responses(
        (status = 204, description = "Issue deleted"),
        (status = 403, description = "Not the reporter or staff"),
        (status = 404, description = "Issue not found"),
    ),
    tag = "issues",
)]
#[delete("/issues/{id}/delete/")]
pub async fn remove_issue(
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
    auth_user: AuthUser,
) -> Result<HttpResponse, AppError> {
    delete_issue(&db, &auth_user, path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::NaiveDate;

    use super::*;
    use crate::entity::issue::IssuePriority;
    use crate::entity::user::UserRole;

    #[derive(Default)]
    struct CountingNotifier(AtomicUsize);

    #[async_trait]
    impl Notifier for CountingNotifier {
        async fn send(&self, _notification: &Notification) -> anyhow::Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn resolved_issue() -> issue::Model {
        issue::Model {
            id: 1,
            apartment_id: 1,
            reported_by: 2,
            assigned_to: Some(3),
            title: "Leaking sink".to_string(),
            description: "Water under the sink".to_string(),
            status: IssueStatus::Resolved,
            priority: IssuePriority::Low,
            resolved_on: NaiveDate::from_ymd_opt(2024, 10, 12),
            resolved_by: Some(3),
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn resolution_notice_lookup_failure_is_not_an_error() {
        let notifier = CountingNotifier::default();
        let resolver = AuthUser {
            id: 3,
            role: UserRole::Member,
        };

        notify_resolution(&DatabaseConnection::Disconnected, &notifier, "Test", &resolved_issue(), &resolver).await;

        assert_eq!(notifier.0.load(Ordering::SeqCst), 0);
    }
}
