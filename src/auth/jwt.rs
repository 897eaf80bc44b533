use crate::configuration::{
    AuthSettings, CookieSettings, MAX_ACCESS_TOKEN_LIFETIME_MINUTES, MAX_REFRESH_TOKEN_LIFETIME_DAYS,
};
use crate::entity::user::UserRole;
use crate::model::auth::{Claims, TokenKind};
use actix_web::cookie::Cookie;
use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, errors::Error as JwtError, DecodingKey, EncodingKey, Header, Validation};

pub const ACCESS_COOKIE: &str = "access";
pub const REFRESH_COOKIE: &str = "refresh";
pub const LOGGED_IN_COOKIE: &str = "logged_in";

/// HS256 token codec. Built once from settings and shared through app data.
pub struct JwtUtils {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_lifetime: Duration,
    refresh_lifetime: Duration,
}

#[derive(Debug)]
pub enum TokenVerifyResult {
    Valid(Claims),
    Expired,
    Invalid,
}

impl JwtUtils {
    pub fn new(settings: &AuthSettings) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(settings.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(settings.jwt_secret.as_bytes()),
            access_lifetime: Duration::minutes(
                settings
                    .access_token_lifetime_minutes
                    .clamp(-MAX_ACCESS_TOKEN_LIFETIME_MINUTES, MAX_ACCESS_TOKEN_LIFETIME_MINUTES),
            ),
            refresh_lifetime: Duration::days(
                settings
                    .refresh_token_lifetime_days
                    .clamp(-MAX_REFRESH_TOKEN_LIFETIME_DAYS, MAX_REFRESH_TOKEN_LIFETIME_DAYS),
            ),
        }
    }

    pub fn access_lifetime(&self) -> Duration {
        self.access_lifetime
    }

    pub fn refresh_lifetime(&self) -> Duration {
        self.refresh_lifetime
    }

    pub fn generate_token(&self, user_id: i32, role: UserRole) -> Result<String, JwtError> {
        self.issue(user_id, role, TokenKind::Access, self.access_lifetime)
    }

    pub fn generate_refresh_token(&self, user_id: i32, role: UserRole) -> Result<String, JwtError> {
        self.issue(user_id, role, TokenKind::Refresh, self.refresh_lifetime)
    }

    fn issue(
        &self,
        user_id: i32,
        role: UserRole,
        kind: TokenKind,
        lifetime: Duration,
    ) -> Result<String, JwtError> {
        let now = Utc::now();
        let expires_at = now
            .checked_add_signed(lifetime)
            .ok_or_else(|| JwtError::from(ErrorKind::InvalidToken))?;
        let claims = Claims {
            sub: user_id.to_string(),
            role,
            kind,
            jti: uuid::Uuid::new_v4().simple().to_string(),
            exp: expires_at.timestamp().max(0) as usize,
            iat: now.timestamp() as usize,
        };

        encode(&Header::default(), &claims, &self.encoding_key)
    }

    pub fn verify_token(&self, token: &str) -> TokenVerifyResult {
        let mut validation = Validation::default();
        validation.leeway = 0;

        match decode::<Claims>(token, &self.decoding_key, &validation) {
            Ok(data) => TokenVerifyResult::Valid(data.claims),
            Err(err) => match *err.kind() {
                ErrorKind::ExpiredSignature => TokenVerifyResult::Expired,
                _ => TokenVerifyResult::Invalid,
            },
        }
    }
}

fn build_cookie(
    name: &'static str,
    value: String,
    settings: &CookieSettings,
    http_only: bool,
    max_age: Duration,
) -> Cookie<'static> {
    Cookie::build(name, value)
        .path(settings.path.clone())
        .http_only(http_only)
        .secure(settings.secure)
        .same_site(settings.same_site)
        .max_age(time::Duration::seconds(max_age.num_seconds()))
        .finish()
}

pub fn build_access_token_cookie(token: &str, settings: &CookieSettings, max_age: Duration) -> Cookie<'static> {
    build_cookie(ACCESS_COOKIE, token.to_string(), settings, settings.http_only, max_age)
}

pub fn build_refresh_token_cookie(token: &str, settings: &CookieSettings, max_age: Duration) -> Cookie<'static> {
    build_cookie(REFRESH_COOKIE, token.to_string(), settings, settings.http_only, max_age)
}

/// Readable by scripts so the frontend can tell whether a session exists.
pub fn build_logged_in_cookie(settings: &CookieSettings, max_age: Duration) -> Cookie<'static> {
    build_cookie(LOGGED_IN_COOKIE, "true".to_string(), settings, false, max_age)
}

/// Expired copies of all session cookies, for logout.
pub fn removal_cookies(settings: &CookieSettings) -> Vec<Cookie<'static>> {
    [ACCESS_COOKIE, REFRESH_COOKIE, LOGGED_IN_COOKIE]
        .into_iter()
        .map(|name| {
            let mut cookie = Cookie::build(name, "")
                .path(settings.path.clone())
                .same_site(settings.same_site)
                .secure(settings.secure)
                .finish();
            cookie.make_removal();
            cookie
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::cookie::SameSite;

    fn auth_settings(secret: &str, access_minutes: i64) -> AuthSettings {
        AuthSettings {
            jwt_secret: secret.to_string(),
            access_token_lifetime_minutes: access_minutes,
            refresh_token_lifetime_days: 1,
            password_hash_cost: 4,
        }
    }

    fn cookie_settings() -> CookieSettings {
        CookieSettings {
            path: "/".to_string(),
            same_site: SameSite::Strict,
            http_only: true,
            secure: false,
        }
    }

    #[test]
    fn access_token_round_trips() {
        let jwt = JwtUtils::new(&auth_settings("secret", 30));
        let token = jwt.generate_token(42, UserRole::Staff).unwrap();

        match jwt.verify_token(&token) {
            TokenVerifyResult::Valid(claims) => {
                assert_eq!(claims.sub, "42");
                assert_eq!(claims.role, UserRole::Staff);
                assert_eq!(claims.kind, TokenKind::Access);
            }
            other => panic!("expected a valid token, got {other:?}"),
        }
    }

    #[test]
    fn refresh_tokens_are_marked_as_such() {
        let jwt = JwtUtils::new(&auth_settings("secret", 30));
        let token = jwt.generate_refresh_token(7, UserRole::Member).unwrap();

        match jwt.verify_token(&token) {
            TokenVerifyResult::Valid(claims) => assert_eq!(claims.kind, TokenKind::Refresh),
            other => panic!("expected a valid token, got {other:?}"),
        }
    }

    #[test]
    fn expired_tokens_are_reported_as_expired() {
        let jwt = JwtUtils::new(&auth_settings("secret", -5));
        let token = jwt.generate_token(1, UserRole::Member).unwrap();
        assert!(matches!(jwt.verify_token(&token), TokenVerifyResult::Expired));
    }

    #[test]
    fn oversized_lifetimes_are_capped_instead_of_overflowing() {
        let jwt = JwtUtils::new(&AuthSettings {
            refresh_token_lifetime_days: i64::MAX,
            ..auth_settings("secret", i64::MAX)
        });
        assert_eq!(jwt.access_lifetime(), Duration::minutes(MAX_ACCESS_TOKEN_LIFETIME_MINUTES));
        assert_eq!(jwt.refresh_lifetime(), Duration::days(MAX_REFRESH_TOKEN_LIFETIME_DAYS));

        let token = jwt.generate_refresh_token(1, UserRole::Member).unwrap();
        assert!(matches!(jwt.verify_token(&token), TokenVerifyResult::Valid(_)));
    }

    #[test]
    fn tokens_signed_with_another_secret_are_invalid() {
        let issuer = JwtUtils::new(&auth_settings("one", 30));
        let verifier = JwtUtils::new(&auth_settings("two", 30));
        let token = issuer.generate_token(1, UserRole::Member).unwrap();
        assert!(matches!(verifier.verify_token(&token), TokenVerifyResult::Invalid));
        assert!(matches!(verifier.verify_token("not-a-jwt"), TokenVerifyResult::Invalid));
    }

    #[test]
    fn cookies_follow_settings_and_logged_in_is_script_readable() {
        let settings = cookie_settings();
        let access = build_access_token_cookie("tok", &settings, Duration::minutes(30));
        assert_eq!(access.name(), ACCESS_COOKIE);
        assert_eq!(access.http_only(), Some(true));
        assert_eq!(access.secure(), Some(false));
        assert_eq!(access.same_site(), Some(SameSite::Strict));
        assert_eq!(access.max_age(), Some(time::Duration::minutes(30)));

        let logged_in = build_logged_in_cookie(&settings, Duration::days(1));
        assert_eq!(logged_in.value(), "true");
        assert_eq!(logged_in.http_only(), Some(false));
    }

    #[test]
    fn removal_cookies_cover_every_session_cookie() {
        let cookies = removal_cookies(&cookie_settings());
        let names: Vec<&str> = cookies.iter().map(|c| c.name()).collect();
        assert_eq!(names, vec![ACCESS_COOKIE, REFRESH_COOKIE, LOGGED_IN_COOKIE]);
        assert!(cookies.iter().all(|c| c.max_age() == Some(time::Duration::ZERO)));
    }
}
