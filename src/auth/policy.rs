use crate::entity::{apartment, issue};
use crate::model::global_error::{AppError, ErrorCode};

use super::AuthUser;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    CreateApartment,
    AssignApartment,
    ReleaseApartment,
    ReportIssue,
    ListAllIssues,
    ViewIssue,
    UpdateIssue,
    ReassignIssue,
    CorrectIssueStatus,
    DeleteIssue,
}

/// What an action is performed on. Actions checked against the wrong kind of resource are denied.
#[derive(Debug, Clone, Copy)]
pub enum Resource<'a> {
    Any,
    Apartment(&'a apartment::Model),
    Issue(&'a issue::Model),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(ErrorCode),
}

impl Decision {
    fn allow_if(condition: bool) -> Self {
        if condition {
            Decision::Allow
        } else {
            Decision::Deny(ErrorCode::NotEnoughPermission)
        }
    }
}

pub fn evaluate(actor: &AuthUser, action: Action, resource: Resource<'_>) -> Decision {
    let admin = actor.is_admin();

    match (action, resource) {
        (Action::CreateApartment | Action::AssignApartment | Action::ListAllIssues, _) => {
            Decision::allow_if(admin)
        }

        (Action::ReleaseApartment, Resource::Apartment(apartment)) => {
            Decision::allow_if(admin || apartment.tenant_id == Some(actor.id))
        }

        // staff are not exempt: issues come from whoever lives in the unit
        (Action::ReportIssue, Resource::Apartment(apartment)) => {
            if apartment.tenant_id == Some(actor.id) {
                Decision::Allow
            } else {
                Decision::Deny(ErrorCode::NotApartmentTenant)
            }
        }

        (Action::ViewIssue, Resource::Issue(issue)) => Decision::allow_if(
            admin || issue.reported_by == actor.id || issue.assigned_to == Some(actor.id),
        ),

        (Action::UpdateIssue, Resource::Issue(issue)) => {
            Decision::allow_if(admin || issue.assigned_to == Some(actor.id))
        }

        (Action::ReassignIssue | Action::CorrectIssueStatus, Resource::Issue(_)) => {
            Decision::allow_if(admin)
        }

        (Action::DeleteIssue, Resource::Issue(issue)) => {
            Decision::allow_if(admin || issue.reported_by == actor.id)
        }

        _ => Decision::Deny(ErrorCode::NotEnoughPermission),
    }
}

/// [`evaluate`] as a `Result`, logging every denial.
pub fn authorize(actor: &AuthUser, action: Action, resource: Resource<'_>) -> Result<(), AppError> {
    match evaluate(actor, action, resource) {
        Decision::Allow => Ok(()),
        Decision::Deny(code) => {
            tracing::warn!(user_id = actor.id, role = actor.role.as_str(), ?action, "permission denied");
            Err(AppError::new(code))
        }
    }
}
