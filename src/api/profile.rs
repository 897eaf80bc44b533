use std::sync::LazyLock;

use actix_web::http::StatusCode;
use actix_web::http::header::CONTENT_TYPE;
use actix_web::{get, patch, web, HttpRequest, HttpResponse};
use regex::Regex;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};

use crate::api::auth::USERNAME_PATTERN;
use crate::auth::AuthUser;
use crate::entity::apartment;
use crate::entity::profile::{self, Entity as ProfileEntity, Occupation};
use crate::entity::user::{self, Entity as UserEntity};
use crate::model::apartment::ApartmentResponse;
use crate::model::common::{envelope, PageQuery, PaginationResponse};
use crate::model::global_error::{map_unique_violation, AppError, ErrorCode, ValidationFieldError};
use crate::model::profile::{MyProfileResponse, OwnProfileResponse, ProfileResponse, UpdateProfileRequest};
use crate::storage::{avatar_key, AssetStorage, MAX_AVATAR_BYTES};

static PHONE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9 ]{7,20}$").expect("phone pattern is valid"));

const MAX_NAME_LEN: usize = 60;

async fn load_profile(
    db: &DatabaseConnection,
    user_id: i32,
) -> Result<(profile::Model, user::Model), AppError> {
    let (profile, user) = ProfileEntity::find()
        .filter(profile::Column::UserId.eq(user_id))
        .find_also_related(UserEntity)
        .one(db)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::ProfileNotFound))?;

    let user = user.ok_or_else(|| AppError::new(ErrorCode::MemberNotFound))?;
    Ok((profile, user))
}

fn join_profiles(rows: Vec<(profile::Model, Option<user::Model>)>) -> Vec<ProfileResponse> {
    rows.into_iter()
        .filter_map(|(profile, user)| user.map(|user| ProfileResponse::new(&profile, &user)))
        .collect()
}

pub async fn list_profiles(
    db: &DatabaseConnection,
    page: &PageQuery,
) -> Result<PaginationResponse<ProfileResponse>, AppError> {
    let paginator = ProfileEntity::find()
        .find_also_related(UserEntity)
        .order_by_asc(profile::Column::Id)
        .paginate(db, page.size());

    let total = paginator.num_items().await?;
    let rows = paginator.fetch_page(page.page_index()).await?;

    Ok(PaginationResponse::new(join_profiles(rows), page.page(), page.size(), total))
}

/// Everyone whose occupation is a trade, i.e. the people staff can assign issues to.
pub async fn list_technicians(db: &DatabaseConnection) -> Result<Vec<ProfileResponse>, AppError> {
    let rows = ProfileEntity::find()
        .filter(profile::Column::Occupation.ne(Occupation::Tenant))
        .find_also_related(UserEntity)
        .order_by_asc(profile::Column::Id)
        .all(db)
        .await?;

    Ok(join_profiles(rows))
}

pub async fn my_profile(db: &DatabaseConnection, actor: &AuthUser) -> Result<MyProfileResponse, AppError> {
    let (profile, user) = load_profile(db, actor.id).await?;

    let apartment = apartment::Entity::find()
        .filter(apartment::Column::TenantId.eq(actor.id))
        .one(db)
        .await?;

    Ok(MyProfileResponse {
        profile: OwnProfileResponse::new(profile, &user),
        apartment: apartment.map(ApartmentResponse::from),
    })
}

#[tracing::instrument(skip(db, request), fields(actor = actor.id))]
pub async fn update_profile(
    db: &DatabaseConnection,
    actor: &AuthUser,
    request: &UpdateProfileRequest,
) -> Result<OwnProfileResponse, AppError> {
    validate_update_request(request)?;

    let (profile, user) = load_profile(db, actor.id).await?;

    if let Some(username) = request.username.as_deref().map(str::trim) {
        if username != user.username {
            let taken = UserEntity::find()
                .filter(user::Column::Username.eq(username))
                .one(db)
                .await?;
            if taken.is_some() {
                return Err(AppError::with_detail(ErrorCode::DuplicateAccount, "username is taken"));
            }
        }
    }

    let txn = db.begin().await?;

    let mut user_update: user::ActiveModel = user.into();
    if let Some(first_name) = &request.first_name {
        user_update.first_name = Set(first_name.trim().to_string());
    }
    if let Some(last_name) = &request.last_name {
        user_update.last_name = Set(last_name.trim().to_string());
    }
    if let Some(username) = &request.username {
        user_update.username = Set(username.trim().to_string());
    }
    let user = user_update
        .update(&txn)
        .await
        .map_err(|err| map_unique_violation(err, ErrorCode::DuplicateAccount))?;

    let mut profile_update: profile::ActiveModel = profile.into();
    if let Some(gender) = request.gender {
        profile_update.gender = Set(gender);
    }
    if let Some(occupation) = request.occupation {
        profile_update.occupation = Set(occupation);
    }
    if let Some(phone_number) = &request.phone_number {
        profile_update.phone_number = Set(non_blank(phone_number));
    }
    if let Some(bio) = &request.bio {
        profile_update.bio = Set(non_blank(bio));
    }
    if let Some(country) = &request.country_of_origin {
        profile_update.country_of_origin = Set(non_blank(country));
    }
    if let Some(city) = &request.city_of_origin {
        profile_update.city_of_origin = Set(non_blank(city));
    }
    let profile = profile_update.update(&txn).await?;

    txn.commit().await?;

    Ok(OwnProfileResponse::new(profile, &user))
}

/// Validates an uploaded image, pushes it to asset storage and points the profile at it.
#[tracing::instrument(skip(db, storage, bytes), fields(actor = actor.id, size = bytes.len()))]
pub async fn upload_avatar(
    db: &DatabaseConnection,
    storage: &dyn AssetStorage,
    actor: &AuthUser,
    content_type: &str,
    bytes: Vec<u8>,
) -> Result<OwnProfileResponse, AppError> {
    if bytes.is_empty() || bytes.len() > MAX_AVATAR_BYTES || !content_type.starts_with("image/") {
        return Err(AppError::new(ErrorCode::InvalidAvatar));
    }

    let (profile, user) = load_profile(db, actor.id).await?;

    let key = avatar_key(&bytes, content_type);
    let url = storage.put(&key, content_type, bytes).await.map_err(|err| {
        tracing::error!(error = %format!("{err:#}"), key, "avatar upload failed");
        AppError::new(ErrorCode::AssetStorageUnavailable)
    })?;

    let mut profile_update: profile::ActiveModel = profile.into();
    profile_update.avatar = Set(Some(url));
    let profile = profile_update.update(db).await?;

    Ok(OwnProfileResponse::new(profile, &user))
}

fn non_blank(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn validate_update_request(request: &UpdateProfileRequest) -> Result<(), AppError> {
    let mut errors = Vec::new();

    if let Some(username) = &request.username {
        if !USERNAME_PATTERN.is_match(username.trim()) {
            errors.push(ValidationFieldError::new(
                "username",
                "Username must be 3-30 characters of letters, digits, '.', '_' or '-'.",
            ));
        }
    }

    for (field, value) in [("first_name", &request.first_name), ("last_name", &request.last_name)] {
        if let Some(value) = value {
            if value.chars().count() > MAX_NAME_LEN {
                errors.push(ValidationFieldError::new(
                    field,
                    format!("Must be at most {MAX_NAME_LEN} characters."),
                ));
            }
        }
    }

    if let Some(phone_number) = request.phone_number.as_deref().map(str::trim) {
        if !phone_number.is_empty() && !PHONE_PATTERN.is_match(phone_number) {
            errors.push(ValidationFieldError::new("phone_number", "Phone number is not valid."));
        }
    }

    AppError::check_fields(errors)
}

#[utoipa::path(
    get,
    path = "/api/v1/profiles/",
    summary = "All profiles",
    params(PageQuery),
    responses((status = 200, description = "Page of profiles", body = PaginationResponse<ProfileResponse>)),
    tag = "profiles",
)]
#[get("/profiles/")]
pub async fn get_profiles(
    query: web::Query<PageQuery>,
    db: web::Data<DatabaseConnection>,
    _auth_user: AuthUser,
) -> Result<HttpResponse, AppError> {
    envelope(StatusCode::OK, "profiles", &list_profiles(&db, &query).await?)
}

#[utoipa::path(
    get,
    path = "/api/v1/profiles/non-tenant-profiles/",
    summary = "Technician profiles",
    responses((status = 200, description = "Profiles whose occupation is not tenant", body = Vec<ProfileResponse>)),
    tag = "profiles",
)]
#[get("/profiles/non-tenant-profiles/")]
pub async fn get_non_tenant_profiles(
    db: web::Data<DatabaseConnection>,
    _auth_user: AuthUser,
) -> Result<HttpResponse, AppError> {
    envelope(StatusCode::OK, "profiles", &list_technicians(&db).await?)
}

#[utoipa::path(
    get,
    path = "/api/v1/profiles/user/me/",
    summary = "The caller's profile",
    responses((status = 200, description = "Profile with the caller's apartment", body = MyProfileResponse)),
    tag = "profiles",
)]
#[get("/profiles/user/me/")]
pub async fn get_my_profile(
    db: web::Data<DatabaseConnection>,
    auth_user: AuthUser,
) -> Result<HttpResponse, AppError> {
    envelope(StatusCode::OK, "profile", &my_profile(&db, &auth_user).await?)
}

#[utoipa::path(
    patch,
    path = "/api/v1/profiles/user/",
    summary = "Update the caller's profile",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Updated profile", body = OwnProfileResponse),
        (status = 400, description = "Invalid fields or username taken"),
    ),
    tag = "profiles",
)]
#[patch("/profiles/user/")]
pub async fn patch_my_profile(
    body: web::Json<UpdateProfileRequest>,
    db: web::Data<DatabaseConnection>,
    auth_user: AuthUser,
) -> Result<HttpResponse, AppError> {
    envelope(StatusCode::OK, "profile", &update_profile(&db, &auth_user, &body).await?)
}

#[utoipa::path(
    patch,
    path = "/api/v1/profiles/user/avatar/",
    summary = "Upload an avatar",
    request_body(content = Vec<u8>, content_type = "image/*", description = "Raw image bytes, at most 2 MiB"),
    responses(
        (status = 200, description = "Profile with the new avatar URL", body = OwnProfileResponse),
        (status = 400, description = "Empty, oversized or non-image body"),
        (status = 503, description = "Asset storage unavailable"),
    ),
    tag = "profiles",
)]
#[patch("/profiles/user/avatar/")]
pub async fn patch_avatar(
    req: HttpRequest,
    body: web::Bytes,
    db: web::Data<DatabaseConnection>,
    storage: web::Data<dyn AssetStorage>,
    auth_user: AuthUser,
) -> Result<HttpResponse, AppError> {
    let content_type = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let profile = upload_avatar(&db, storage.get_ref(), &auth_user, &content_type, body.to_vec()).await?;
    envelope(StatusCode::OK, "profile", &profile)
}
