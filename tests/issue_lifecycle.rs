mod common;

use chrono::Utc;

use rusty_residence::api::apartment::assign_tenant;
use rusty_residence::api::content_view::{view_counts, ISSUE_CONTENT_TYPE};
use rusty_residence::api::issue::{
    apply_issue_update, delete_issue, find_issue, list_all_issues, list_assigned_to, list_reported_by, report_issue,
    update_issue, view_issue,
};
use rusty_residence::entity::issue::{IssuePriority, IssueStatus, Transition};
use rusty_residence::entity::profile::Occupation;
use rusty_residence::entity::user::{self, UserRole};
use rusty_residence::model::common::PageQuery;
use rusty_residence::model::global_error::ErrorCode;
use rusty_residence::model::issue::{CreateIssueRequest, UpdateIssueRequest};
use sea_orm::DatabaseConnection;

use common::{actor, code_of, create_apartment, create_staff, create_tenant, create_user, setup_db, RecordingNotifier};

const SITE: &str = "Test Residence";

struct World {
    db: DatabaseConnection,
    notifier: RecordingNotifier,
    staff: user::Model,
    tenant: user::Model,
    technician: user::Model,
    stranger: user::Model,
    apartment_id: i32,
}

async fn world() -> World {
    let db = setup_db().await;
    let staff = create_staff(&db, "sam").await;
    let tenant = create_tenant(&db, "alice").await;
    let technician = create_user(&db, "bob", UserRole::Member, Occupation::Plumber).await;
    let stranger = create_tenant(&db, "mallory").await;
    let apartment = create_apartment(&db, "U1").await;
    assign_tenant(&db, &actor(&staff), apartment.id, tenant.id).await.unwrap();

    World {
        db,
        notifier: RecordingNotifier::default(),
        staff,
        tenant,
        technician,
        stranger,
        apartment_id: apartment.id,
    }
}

fn new_issue(apartment_id: i32) -> CreateIssueRequest {
    CreateIssueRequest {
        apartment_id,
        title: "Leaking sink".to_string(),
        description: "Water under the kitchen sink".to_string(),
        priority: Some(IssuePriority::Medium),
    }
}

fn set_status(status: IssueStatus) -> UpdateIssueRequest {
    UpdateIssueRequest {
        status: Some(status),
        ..Default::default()
    }
}

fn assign_to(user_id: i32) -> UpdateIssueRequest {
    UpdateIssueRequest {
        assigned_to: Some(user_id),
        ..Default::default()
    }
}

#[tokio::test]
async fn report_assign_resolve_scenario() {
    let w = world().await;

    let issue = report_issue(&w.db, &w.notifier, SITE, &actor(&w.tenant), &new_issue(w.apartment_id))
        .await
        .unwrap();
    assert_eq!(issue.status, IssueStatus::Reported);
    assert_eq!(issue.reported_by, w.tenant.id);
    assert_eq!(w.notifier.sent().len(), 1);
    assert_eq!(w.notifier.sent()[0].to, w.tenant.email);

    let issue = update_issue(&w.db, &w.notifier, SITE, &actor(&w.staff), issue.id, &assign_to(w.technician.id))
        .await
        .unwrap();
    assert_eq!(issue.assigned_to, Some(w.technician.id));

    let issue = update_issue(
        &w.db,
        &w.notifier,
        SITE,
        &actor(&w.technician),
        issue.id,
        &set_status(IssueStatus::Resolved),
    )
    .await
    .unwrap();
    assert_eq!(issue.status, IssueStatus::Resolved);
    assert_eq!(issue.resolved_on, Some(Utc::now().date_naive()));
    assert_eq!(issue.resolved_by, Some(w.technician.id));

    let sent = w.notifier.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[1].to, w.tenant.email);
    assert!(sent[1].body.contains("bob"));
}

#[tokio::test]
async fn resolved_issues_are_frozen() {
    let w = world().await;
    let issue = report_issue(&w.db, &w.notifier, SITE, &actor(&w.tenant), &new_issue(w.apartment_id))
        .await
        .unwrap();

    let resolved = update_issue(&w.db, &w.notifier, SITE, &actor(&w.staff), issue.id, &set_status(IssueStatus::Resolved))
        .await
        .unwrap();

    assert_eq!(
        code_of(update_issue(&w.db, &w.notifier, SITE, &actor(&w.staff), issue.id, &set_status(IssueStatus::Resolved)).await),
        ErrorCode::IssueAlreadyResolved,
    );

    let rename = UpdateIssueRequest {
        title: Some("Still leaking".to_string()),
        ..Default::default()
    };
    assert_eq!(
        code_of(update_issue(&w.db, &w.notifier, SITE, &actor(&w.staff), issue.id, &rename).await),
        ErrorCode::IssueAlreadyResolved,
    );

    let stored = find_issue(&w.db, issue.id).await.unwrap();
    assert_eq!(stored.resolved_on, resolved.resolved_on);
    assert_eq!(stored.resolved_by, Some(w.staff.id));
    assert_eq!(stored.title, "Leaking sink");
    // one confirmation plus one resolution mail
    assert_eq!(w.notifier.sent().len(), 2);
}

#[tokio::test]
async fn only_the_tenant_reports_for_an_apartment() {
    let w = world().await;

    for outsider in [&w.stranger, &w.staff] {
        assert_eq!(
            code_of(report_issue(&w.db, &w.notifier, SITE, &actor(outsider), &new_issue(w.apartment_id)).await),
            ErrorCode::NotApartmentTenant,
        );
    }
    assert_eq!(
        code_of(report_issue(&w.db, &w.notifier, SITE, &actor(&w.tenant), &new_issue(9_999)).await),
        ErrorCode::ApartmentNotFound,
    );
    assert!(w.notifier.sent().is_empty());
}

#[tokio::test]
async fn status_changes_need_the_assignee_or_staff() {
    let w = world().await;
    let issue = report_issue(&w.db, &w.notifier, SITE, &actor(&w.tenant), &new_issue(w.apartment_id))
        .await
        .unwrap();

    assert_eq!(
        code_of(update_issue(&w.db, &w.notifier, SITE, &actor(&w.tenant), issue.id, &set_status(IssueStatus::InProgress)).await),
        ErrorCode::NotEnoughPermission,
    );

    update_issue(&w.db, &w.notifier, SITE, &actor(&w.staff), issue.id, &assign_to(w.technician.id))
        .await
        .unwrap();
    let in_progress = update_issue(
        &w.db,
        &w.notifier,
        SITE,
        &actor(&w.technician),
        issue.id,
        &set_status(IssueStatus::InProgress),
    )
    .await
    .unwrap();
    assert_eq!(in_progress.status, IssueStatus::InProgress);

    // stepping back is a staff-only correction
    assert_eq!(
        code_of(update_issue(&w.db, &w.notifier, SITE, &actor(&w.technician), issue.id, &set_status(IssueStatus::Reported)).await),
        ErrorCode::NotEnoughPermission,
    );
    let corrected = update_issue(&w.db, &w.notifier, SITE, &actor(&w.staff), issue.id, &set_status(IssueStatus::Reported))
        .await
        .unwrap();
    assert_eq!(corrected.status, IssueStatus::Reported);
    assert_eq!(corrected.resolved_on, None);
}

#[tokio::test]
async fn reassignment_is_staff_only_and_checks_the_assignee() {
    let w = world().await;
    let issue = report_issue(&w.db, &w.notifier, SITE, &actor(&w.tenant), &new_issue(w.apartment_id))
        .await
        .unwrap();
    update_issue(&w.db, &w.notifier, SITE, &actor(&w.staff), issue.id, &assign_to(w.technician.id))
        .await
        .unwrap();

    assert_eq!(
        code_of(update_issue(&w.db, &w.notifier, SITE, &actor(&w.technician), issue.id, &assign_to(w.stranger.id)).await),
        ErrorCode::NotEnoughPermission,
    );
    assert_eq!(
        code_of(update_issue(&w.db, &w.notifier, SITE, &actor(&w.staff), issue.id, &assign_to(9_999)).await),
        ErrorCode::MemberNotFound,
    );
}

#[tokio::test]
async fn detail_is_limited_to_reporter_assignee_and_staff() {
    let w = world().await;
    let issue = report_issue(&w.db, &w.notifier, SITE, &actor(&w.tenant), &new_issue(w.apartment_id))
        .await
        .unwrap();
    update_issue(&w.db, &w.notifier, SITE, &actor(&w.staff), issue.id, &assign_to(w.technician.id))
        .await
        .unwrap();

    for reader in [&w.tenant, &w.technician, &w.staff] {
        let detail = view_issue(&w.db, &actor(reader), issue.id, "10.0.0.1").await.unwrap();
        assert_eq!(detail.apartment_unit, "U1");
        assert_eq!(detail.reported_by, "alice");
        assert_eq!(detail.assigned_to.as_deref(), Some("bob"));
    }

    assert_eq!(
        code_of(view_issue(&w.db, &actor(&w.stranger), issue.id, "10.0.0.1").await),
        ErrorCode::NotEnoughPermission,
    );
    assert_eq!(
        code_of(view_issue(&w.db, &actor(&w.staff), 9_999, "10.0.0.1").await),
        ErrorCode::IssueNotFound,
    );
}

#[tokio::test]
async fn repeat_views_are_deduplicated_per_viewer_and_address() {
    let w = world().await;
    let issue = report_issue(&w.db, &w.notifier, SITE, &actor(&w.tenant), &new_issue(w.apartment_id))
        .await
        .unwrap();

    let first = view_issue(&w.db, &actor(&w.tenant), issue.id, "10.0.0.1").await.unwrap();
    assert_eq!(first.view_count, 1);

    let again = view_issue(&w.db, &actor(&w.tenant), issue.id, "10.0.0.1").await.unwrap();
    assert_eq!(again.view_count, 1);

    let other_address = view_issue(&w.db, &actor(&w.tenant), issue.id, "10.0.0.2").await.unwrap();
    assert_eq!(other_address.view_count, 2);

    let staff_view = view_issue(&w.db, &actor(&w.staff), issue.id, "10.0.0.1").await.unwrap();
    assert_eq!(staff_view.view_count, 3);
}

#[tokio::test]
async fn deletion_is_reporter_or_staff() {
    let w = world().await;
    let issue = report_issue(&w.db, &w.notifier, SITE, &actor(&w.tenant), &new_issue(w.apartment_id))
        .await
        .unwrap();
    update_issue(&w.db, &w.notifier, SITE, &actor(&w.staff), issue.id, &assign_to(w.technician.id))
        .await
        .unwrap();

    assert_eq!(
        code_of(delete_issue(&w.db, &actor(&w.technician), issue.id).await),
        ErrorCode::NotEnoughPermission,
    );

    delete_issue(&w.db, &actor(&w.tenant), issue.id).await.unwrap();
    assert_eq!(code_of(find_issue(&w.db, issue.id).await), ErrorCode::IssueNotFound);
}

#[tokio::test]
async fn listings_follow_the_caller() {
    let w = world().await;
    let issue = report_issue(&w.db, &w.notifier, SITE, &actor(&w.tenant), &new_issue(w.apartment_id))
        .await
        .unwrap();
    update_issue(&w.db, &w.notifier, SITE, &actor(&w.staff), issue.id, &assign_to(w.technician.id))
        .await
        .unwrap();

    let mine = list_reported_by(&w.db, &actor(&w.tenant)).await.unwrap();
    assert_eq!(mine.len(), 1);
    assert!(list_reported_by(&w.db, &actor(&w.technician)).await.unwrap().is_empty());

    let assigned = list_assigned_to(&w.db, &actor(&w.technician)).await.unwrap();
    assert_eq!(assigned.iter().map(|i| i.id).collect::<Vec<_>>(), vec![issue.id]);

    assert_eq!(
        code_of(list_all_issues(&w.db, &actor(&w.tenant), &PageQuery::default()).await),
        ErrorCode::NotEnoughPermission,
    );
    let page = list_all_issues(&w.db, &actor(&w.staff), &PageQuery::default()).await.unwrap();
    assert_eq!(page.total_elements, 1);
    assert_eq!(page.content[0].priority, IssuePriority::Medium);
}

#[tokio::test]
async fn a_second_resolve_that_raced_past_the_checks_is_rejected() {
    let w = world().await;
    let issue = report_issue(&w.db, &w.notifier, SITE, &actor(&w.tenant), &new_issue(w.apartment_id))
        .await
        .unwrap();
    update_issue(&w.db, &w.notifier, SITE, &actor(&w.staff), issue.id, &assign_to(w.technician.id))
        .await
        .unwrap();

    let resolved = update_issue(&w.db, &w.notifier, SITE, &actor(&w.staff), issue.id, &set_status(IssueStatus::Resolved))
        .await
        .unwrap();

    // the technician's request was planned against the unresolved issue
    assert_eq!(
        code_of(
            apply_issue_update(&w.db, &actor(&w.technician), issue.id, &set_status(IssueStatus::Resolved), Transition::Resolve)
                .await
        ),
        ErrorCode::IssueAlreadyResolved,
    );

    let stored = find_issue(&w.db, issue.id).await.unwrap();
    assert_eq!(stored.resolved_by, Some(w.staff.id));
    assert_eq!(stored.resolved_on, resolved.resolved_on);
}

#[tokio::test]
async fn deleting_an_issue_drops_its_views() {
    let w = world().await;
    let issue = report_issue(&w.db, &w.notifier, SITE, &actor(&w.tenant), &new_issue(w.apartment_id))
        .await
        .unwrap();
    view_issue(&w.db, &actor(&w.tenant), issue.id, "10.0.0.1").await.unwrap();
    view_issue(&w.db, &actor(&w.staff), issue.id, "10.0.0.2").await.unwrap();
    assert_eq!(view_counts(&w.db, ISSUE_CONTENT_TYPE, &[issue.id]).await.unwrap()[&issue.id], 2);

    delete_issue(&w.db, &actor(&w.tenant), issue.id).await.unwrap();

    assert_eq!(code_of(find_issue(&w.db, issue.id).await), ErrorCode::IssueNotFound);
    assert!(view_counts(&w.db, ISSUE_CONTENT_TYPE, &[issue.id]).await.unwrap().is_empty());
}
