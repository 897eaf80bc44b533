use actix_web::http::StatusCode;
use actix_web::{get, patch, post, web, HttpResponse};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};
use sea_query::Expr;

use crate::auth::{authorize, Action, AuthUser, Resource};
use crate::entity::apartment::{self, Entity as ApartmentEntity};
use crate::entity::profile;
use crate::entity::user::Entity as UserEntity;
use crate::model::apartment::{ApartmentResponse, AssignTenantRequest, CreateApartmentRequest};
use crate::model::common::envelope;
use crate::model::global_error::{map_unique_violation, AppError, ErrorCode, ValidationFieldError};

pub async fn find_apartment(db: &DatabaseConnection, apartment_id: i32) -> Result<apartment::Model, AppError> {
    ApartmentEntity::find_by_id(apartment_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::ApartmentNotFound))
}

#[tracing::instrument(skip(db, request), fields(actor = actor.id))]
pub async fn create_apartment_record(
    db: &DatabaseConnection,
    actor: &AuthUser,
    request: &CreateApartmentRequest,
) -> Result<apartment::Model, AppError> {
    authorize(actor, Action::CreateApartment, Resource::Any)?;
    validate_create_request(request)?;

    let unit_number = request.unit_number.trim();
    let duplicate = ApartmentEntity::find()
        .filter(apartment::Column::UnitNumber.eq(unit_number))
        .one(db)
        .await?;
    if duplicate.is_some() {
        return Err(AppError::new(ErrorCode::DuplicateApartment));
    }

    let apartment = apartment::ActiveModel {
        unit_number: Set(unit_number.to_string()),
        building: Set(request.building.trim().to_string()),
        floor: Set(request.floor),
        tenant_id: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(|err| map_unique_violation(err, ErrorCode::DuplicateApartment))?;

    tracing::info!(apartment_id = apartment.id, "apartment created");
    Ok(apartment)
}

/// Gives a vacant apartment to a tenant.
///
/// The write only lands while the apartment is still vacant, so of two concurrent
/// assignments at most one succeeds; the other sees `ApartmentAlreadyAssigned`.
#[tracing::instrument(skip(db), fields(actor = actor.id))]
pub async fn assign_tenant(
    db: &DatabaseConnection,
    actor: &AuthUser,
    apartment_id: i32,
    tenant_id: i32,
) -> Result<apartment::Model, AppError> {
    authorize(actor, Action::AssignApartment, Resource::Any)?;

    let apartment = find_apartment(db, apartment_id).await?;
    if apartment.is_rented() {
        return Err(AppError::new(ErrorCode::ApartmentAlreadyAssigned));
    }

    let (_, tenant_profile) = UserEntity::find_by_id(tenant_id)
        .find_also_related(profile::Entity)
        .one(db)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::TenantNotFound))?;

    match tenant_profile {
        Some(profile) if profile.occupation.is_tenant() => {}
        _ => return Err(AppError::new(ErrorCode::UserMustBeTenant)),
    }

    let housed = ApartmentEntity::find()
        .filter(apartment::Column::TenantId.eq(tenant_id))
        .one(db)
        .await?;
    if housed.is_some() {
        return Err(AppError::new(ErrorCode::TenantAlreadyHoused));
    }

    claim_vacant_apartment(db, apartment_id, tenant_id).await?;

    tracing::info!(apartment_id, tenant_id, "tenant assigned");
    find_apartment(db, apartment_id).await
}

/// `SET tenant_id = ? WHERE id = ? AND tenant_id IS NULL`. No row written means another
/// assignment got there first.
pub async fn claim_vacant_apartment(db: &DatabaseConnection, apartment_id: i32, tenant_id: i32) -> Result<(), AppError> {
    let result = ApartmentEntity::update_many()
        .col_expr(apartment::Column::TenantId, Expr::value(tenant_id))
        .col_expr(apartment::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(apartment::Column::Id.eq(apartment_id))
        .filter(apartment::Column::TenantId.is_null())
        .exec(db)
        .await
        .map_err(|err| map_unique_violation(err, ErrorCode::TenantAlreadyHoused))?;

    if result.rows_affected == 0 {
        tracing::warn!(apartment_id, tenant_id, "apartment was taken by a concurrent assignment");
        return Err(AppError::new(ErrorCode::ApartmentAlreadyAssigned));
    }
    Ok(())
}

#[tracing::instrument(skip(db), fields(actor = actor.id))]
pub async fn release_apartment(
    db: &DatabaseConnection,
    actor: &AuthUser,
    apartment_id: i32,
) -> Result<apartment::Model, AppError> {
    let apartment = find_apartment(db, apartment_id).await?;
    let Some(tenant_id) = apartment.tenant_id else {
        return Err(AppError::new(ErrorCode::ApartmentNotRented));
    };

    authorize(actor, Action::ReleaseApartment, Resource::Apartment(&apartment))?;

    vacate_apartment(db, apartment_id, tenant_id).await?;

    tracing::info!(apartment_id, tenant_id, "apartment released");
    find_apartment(db, apartment_id).await
}

/// Clears the tenant only if it is still `observed_tenant`.
pub async fn vacate_apartment(db: &DatabaseConnection, apartment_id: i32, observed_tenant: i32) -> Result<(), AppError> {
    let result = ApartmentEntity::update_many()
        .col_expr(apartment::Column::TenantId, Expr::value(Option::<i32>::None))
        .col_expr(apartment::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(apartment::Column::Id.eq(apartment_id))
        .filter(apartment::Column::TenantId.eq(observed_tenant))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        tracing::warn!(apartment_id, observed_tenant, "apartment changed hands before release");
        return Err(AppError::new(ErrorCode::ApartmentNotRented));
    }
    Ok(())
}

pub async fn list_available(db: &DatabaseConnection) -> Result<Vec<apartment::Model>, AppError> {
    Ok(ApartmentEntity::find()
        .filter(apartment::Column::TenantId.is_null())
        .order_by_desc(apartment::Column::CreatedAt)
        .order_by_desc(apartment::Column::Id)
        .all(db)
        .await?)
}

pub async fn list_mine(db: &DatabaseConnection, actor: &AuthUser) -> Result<Vec<apartment::Model>, AppError> {
    Ok(ApartmentEntity::find()
        .filter(apartment::Column::TenantId.eq(actor.id))
        .order_by_desc(apartment::Column::CreatedAt)
        .order_by_desc(apartment::Column::Id)
        .all(db)
        .await?)
}

fn validate_create_request(request: &CreateApartmentRequest) -> Result<(), AppError> {
    let mut errors = Vec::new();

    if request.unit_number.trim().is_empty() {
        errors.push(ValidationFieldError::new("unit_number", "Unit number is required."));
    }
    if request.building.trim().is_empty() {
        errors.push(ValidationFieldError::new("building", "Building is required."));
    }
    if request.floor < 0 {
        errors.push(ValidationFieldError::new("floor", "Floor cannot be negative."));
    }

    AppError::check_fields(errors)
}

fn to_responses(apartments: Vec<apartment::Model>) -> Vec<ApartmentResponse> {
    apartments.into_iter().map(ApartmentResponse::from).collect()
}

#[utoipa::path(
    post,
    path = "/api/v1/apartments/add/",
    summary = "Register an apartment",
    request_body = CreateApartmentRequest,
    responses(
        (status = 201, description = "Apartment created", body = ApartmentResponse),
        (status = 400, description = "Invalid or duplicate unit"),
        (status = 403, description = "Staff only"),
    ),
    tag = "apartments",
)]
#[post("/apartments/add/")]
pub async fn create_apartment(
    body: web::Json<CreateApartmentRequest>,
    db: web::Data<DatabaseConnection>,
    auth_user: AuthUser,
) -> Result<HttpResponse, AppError> {
    let apartment = create_apartment_record(&db, &auth_user, &body).await?;
    envelope(StatusCode::CREATED, "apartment", &ApartmentResponse::from(apartment))
}

#[utoipa::path(
    get,
    path = "/api/v1/apartments/me/",
    summary = "Apartments rented by the caller",
    responses((status = 200, description = "Caller's apartments", body = Vec<ApartmentResponse>)),
    tag = "apartments",
)]
#[get("/apartments/me/")]
pub async fn my_apartments(
    db: web::Data<DatabaseConnection>,
    auth_user: AuthUser,
) -> Result<HttpResponse, AppError> {
    let apartments = list_mine(&db, &auth_user).await?;
    envelope(StatusCode::OK, "apartments", &to_responses(apartments))
}

#[utoipa::path(
    get,
    path = "/api/v1/apartments/available/",
    summary = "Vacant apartments",
    responses((status = 200, description = "Apartments without a tenant", body = Vec<ApartmentResponse>)),
    tag = "apartments",
)]
#[get("/apartments/available/")]
pub async fn available_apartments(db: web::Data<DatabaseConnection>) -> Result<HttpResponse, AppError> {
    let apartments = list_available(&db).await?;
    envelope(StatusCode::OK, "apartments", &to_responses(apartments))
}

#[utoipa::path(
    patch,
    path = "/api/v1/apartments/{id}/assign/",
    summary = "Assign a tenant",
    params(("id" = i32, Path, description = "Apartment id")),
    request_body = AssignTenantRequest,
    responses(
        (status = 200, description = "Tenant assigned", body = ApartmentResponse),
        (status = 400, description = "Apartment occupied, user not a tenant or tenant already housed"),
        (status = 403, description = "Staff only"),
        (status = 404, description = "Apartment or tenant not found"),
    ),
    tag = "apartments",
)]
#[patch("/apartments/{id}/assign/")]
pub async fn assign_apartment(
    path: web::Path<i32>,
    body: web::Json<AssignTenantRequest>,
    db: web::Data<DatabaseConnection>,
    auth_user: AuthUser,
) -> Result<HttpResponse, AppError> {
    let apartment = assign_tenant(&db, &auth_user, path.into_inner(), body.tenant).await?;
    envelope(StatusCode::OK, "apartment", &ApartmentResponse::from(apartment))
}

#[utoipa::path(
    patch,
    path = "/api/v1/apartments/{id}/release/",
    summary = "Release an apartment",
    params(("id" = i32, Path, description = "Apartment id")),
    responses(
        (status = 200, description = "Apartment vacant again", body = ApartmentResponse),
        (status = 400, description = "Apartment not rented"),
        (status = 403, description = "Staff or the current tenant only"),
        (status = 404, description = "Apartment not found"),
    ),
    tag = "apartments",
)]
#[patch("/apartments/{id}/release/")]
pub async fn release(
    path: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
    auth_user: AuthUser,
) -> Result<HttpResponse, AppError> {
    let apartment = release_apartment(&db, &auth_user, path.into_inner()).await?;
    envelope(StatusCode::OK, "apartment", &ApartmentResponse::from(apartment))
}
