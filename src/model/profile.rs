use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entity::profile::{self, Gender, Occupation};
use crate::entity::user;
use crate::model::apartment::ApartmentResponse;

/// What any signed-in user may see about someone else. Contact details stay out.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProfileResponse {
    pub id: i32,
    pub user_id: i32,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub gender: Gender,
    pub occupation: Occupation,
    pub bio: Option<String>,
    pub country_of_origin: Option<String>,
    pub city_of_origin: Option<String>,
    pub avatar: Option<String>,
    pub reputation: i32,
    pub report_count: i32,
}

impl ProfileResponse {
    pub fn new(profile: &profile::Model, user: &user::Model) -> Self {
        Self {
            id: profile.id,
            user_id: user.id,
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            full_name: user.full_name(),
            gender: profile.gender,
            occupation: profile.occupation,
            bio: profile.bio.clone(),
            country_of_origin: profile.country_of_origin.clone(),
            city_of_origin: profile.city_of_origin.clone(),
            avatar: profile.avatar.clone(),
            reputation: profile.reputation,
            report_count: profile.report_count,
        }
    }
}

/// The owner's view of their own profile, including contact details.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OwnProfileResponse {
    #[serde(flatten)]
    pub profile: ProfileResponse,
    pub email: String,
    pub phone_number: Option<String>,
}

impl OwnProfileResponse {
    pub fn new(profile: profile::Model, user: &user::Model) -> Self {
        Self {
            profile: ProfileResponse::new(&profile, user),
            email: user.email.clone(),
            phone_number: profile.phone_number,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MyProfileResponse {
    #[serde(flatten)]
    pub profile: OwnProfileResponse,
    pub apartment: Option<ApartmentResponse>,
}

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub gender: Option<Gender>,
    pub occupation: Option<Occupation>,
    pub phone_number: Option<String>,
    pub bio: Option<String>,
    pub country_of_origin: Option<String>,
    pub city_of_origin: Option<String>,
}
