use utoipa::OpenApi;

use crate::api;
use crate::entity::issue::{IssuePriority, IssueStatus};
use crate::entity::profile::{Gender, Occupation};
use crate::entity::user::UserRole;
use crate::model::apartment::{ApartmentResponse, AssignTenantRequest, CreateApartmentRequest};
use crate::model::auth::{LoginRequest, RegisterRequest, UserResponse};
use crate::model::global_error::ValidationFieldError;
use crate::model::issue::{CreateIssueRequest, IssueResponse, UpdateIssueRequest};
use crate::model::profile::{MyProfileResponse, OwnProfileResponse, ProfileResponse, UpdateProfileRequest};
use crate::model::report::{CreateReportRequest, ReportResponse};

#[derive(OpenApi)]
#[openapi(
    info(title = "Rusty Residence API", description = "Apartments, maintenance issues, profiles and reports"),
    paths(
        api::health_check::health_check,
        api::auth::register,
        api::auth::login,
        api::auth::refresh_token,
        api::auth::logout,
        api::auth::get_me,
        api::apartment::create_apartment,
        api::apartment::my_apartments,
        api::apartment::available_apartments,
        api::apartment::assign_apartment,
        api::apartment::release,
        api::issue::list_issues,
        api::issue::create_issue,
        api::issue::my_issues,
        api::issue::assigned_issues,
        api::issue::get_issue,
        api::issue::patch_issue,
        api::issue::remove_issue,
        api::profile::get_profiles,
        api::profile::get_non_tenant_profiles,
        api::profile::get_my_profile,
        api::profile::patch_my_profile,
        api::profile::patch_avatar,
        api::report::create_report,
        api::report::my_reports,
    ),
    components(schemas(
        RegisterRequest, LoginRequest, UserResponse, UserRole,
        CreateApartmentRequest, AssignTenantRequest, ApartmentResponse,
        CreateIssueRequest, UpdateIssueRequest, IssueResponse, IssueStatus, IssuePriority,
        ProfileResponse, OwnProfileResponse, MyProfileResponse, UpdateProfileRequest, Gender, Occupation,
        CreateReportRequest, ReportResponse, ValidationFieldError,
    )),
    tags(
        (name = "auth", description = "Registration and sessions"),
        (name = "apartments", description = "Apartment registry"),
        (name = "issues", description = "Maintenance issues"),
        (name = "profiles", description = "User profiles"),
        (name = "reports", description = "Reports against users"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_the_versioned_routes() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/v1/apartments/{id}/assign/"));
        assert!(doc.paths.paths.contains_key("/api/v1/issues/{id}/"));
        assert!(doc.paths.paths.contains_key("/health-check"));
    }
}
