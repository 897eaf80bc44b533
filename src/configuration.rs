use std::fmt::Display;
use std::ops::RangeInclusive;
use std::str::FromStr;

use actix_web::cookie::SameSite;
use anyhow::{Context, anyhow};

/// Upper bounds keep token expiry arithmetic inside chrono's range.
pub const MAX_ACCESS_TOKEN_LIFETIME_MINUTES: i64 = 60 * 24 * 366;
pub const MAX_REFRESH_TOKEN_LIFETIME_DAYS: i64 = 3660;

#[derive(Debug, Clone)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub database: DatabaseSettings,
    pub auth: AuthSettings,
    pub cookie: CookieSettings,
    pub mail: MailSettings,
    pub storage: StorageSettings,
    pub jobs: JobSettings,
    pub superuser: Option<SuperuserSettings>,
}

#[derive(Debug, Clone)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub jwt_secret: String,
    pub access_token_lifetime_minutes: i64,
    pub refresh_token_lifetime_days: i64,
    pub password_hash_cost: u32,
}

#[derive(Debug, Clone)]
pub struct CookieSettings {
    pub path: String,
    pub same_site: SameSite,
    pub http_only: bool,
    pub secure: bool,
}

#[derive(Debug, Clone)]
pub struct MailSettings {
    /// HTTP endpoint of the transactional mail API. `None` means notifications are only logged.
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub from_email: String,
    pub site_name: String,
}

#[derive(Debug, Clone)]
pub struct StorageSettings {
    pub base_url: Option<String>,
    pub token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct JobSettings {
    pub reputation_interval_secs: u64,
    pub report_warning_threshold: i32,
}

#[derive(Debug, Clone)]
pub struct SuperuserSettings {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Lookup(lookup);

        let superuser = match (
            env.optional("SUPERUSER_USERNAME"),
            env.optional("SUPERUSER_EMAIL"),
            env.optional("SUPERUSER_PASSWORD"),
        ) {
            (Some(username), Some(email), Some(password)) => Some(SuperuserSettings {
                username,
                email,
                password,
            }),
            (None, None, None) => None,
            _ => {
                return Err(anyhow!(
                    "SUPERUSER_USERNAME, SUPERUSER_EMAIL and SUPERUSER_PASSWORD must be set together"
                ));
            }
        };

        Ok(Self {
            application: ApplicationSettings {
                host: env.optional("APP_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
                port: env.parse_or("APP_PORT", 8080)?,
            },
            database: DatabaseSettings {
                url: env.required("DATABASE_URL")?,
                max_connections: env.parse_or("DATABASE_MAX_CONNECTIONS", 10)?,
            },
            auth: AuthSettings {
                jwt_secret: env.required("JWT_SECRET")?,
                access_token_lifetime_minutes: env.parse_in_range(
                    "ACCESS_TOKEN_LIFETIME_MINUTES",
                    30,
                    1..=MAX_ACCESS_TOKEN_LIFETIME_MINUTES,
                )?,
                refresh_token_lifetime_days: env.parse_in_range(
                    "REFRESH_TOKEN_LIFETIME_DAYS",
                    1,
                    1..=MAX_REFRESH_TOKEN_LIFETIME_DAYS,
                )?,
                password_hash_cost: env.parse_or("PASSWORD_HASH_COST", bcrypt::DEFAULT_COST)?,
            },
            cookie: CookieSettings {
                path: env.optional("COOKIE_PATH").unwrap_or_else(|| "/".to_string()),
                same_site: parse_same_site(env.optional("COOKIE_SAMESITE").as_deref())?,
                http_only: env.flag_or("COOKIE_HTTPONLY", true)?,
                secure: env.flag_or("COOKIE_SECURE", true)?,
            },
            mail: MailSettings {
                api_url: env.optional("MAIL_API_URL"),
                api_key: env.optional("MAIL_API_KEY"),
                from_email: env
                    .optional("DEFAULT_FROM_EMAIL")
                    .unwrap_or_else(|| "noreply@rusty-residence.local".to_string()),
                site_name: env
                    .optional("SITE_NAME")
                    .unwrap_or_else(|| "Rusty Residence".to_string()),
            },
            storage: StorageSettings {
                base_url: env.optional("ASSET_STORAGE_URL"),
                token: env.optional("ASSET_STORAGE_TOKEN"),
            },
            jobs: JobSettings {
                reputation_interval_secs: env.parse_or("REPUTATION_INTERVAL_SECS", 86_400)?,
                report_warning_threshold: env.parse_or("REPORT_WARNING_THRESHOLD", 5)?,
            },
            superuser,
        })
    }
}

struct Lookup<F>(F);

impl<F> Lookup<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|value| !value.trim().is_empty())
    }

    fn required(&self, key: &str) -> anyhow::Result<String> {
        self.optional(key)
            .with_context(|| format!("{key} must be set"))
    }

    fn parse_or<T>(&self, key: &str, default: T) -> anyhow::Result<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.optional(key) {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|err| anyhow!("{key} has an invalid value {raw:?}: {err}")),
            None => Ok(default),
        }
    }

    fn parse_in_range(&self, key: &str, default: i64, range: RangeInclusive<i64>) -> anyhow::Result<i64> {
        let value = self.parse_or(key, default)?;
        if !range.contains(&value) {
            return Err(anyhow!(
                "{key} must be between {} and {}, got {value}",
                range.start(),
                range.end()
            ));
        }
        Ok(value)
    }

    fn flag_or(&self, key: &str, default: bool) -> anyhow::Result<bool> {
        match self.optional(key) {
            Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => Ok(true),
                "false" | "0" | "no" => Ok(false),
                _ => Err(anyhow!("{key} must be a boolean, got {raw:?}")),
            },
            None => Ok(default),
        }
    }
}

fn parse_same_site(raw: Option<&str>) -> anyhow::Result<SameSite> {
    match raw.map(|value| value.trim().to_ascii_lowercase()) {
        None => Ok(SameSite::Lax),
        Some(value) => match value.as_str() {
            "lax" => Ok(SameSite::Lax),
            "strict" => Ok(SameSite::Strict),
            "none" => Ok(SameSite::None),
            other => Err(anyhow!("COOKIE_SAMESITE must be Lax, Strict or None, got {other:?}")),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings_from(pairs: &[(&str, &str)]) -> anyhow::Result<Settings> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_only_required_keys_are_present() {
        let settings = settings_from(&[("DATABASE_URL", "mysql://db"), ("JWT_SECRET", "s3cret")])
            .unwrap();

        assert_eq!(settings.application.port, 8080);
        assert_eq!(settings.auth.access_token_lifetime_minutes, 30);
        assert_eq!(settings.auth.refresh_token_lifetime_days, 1);
        assert_eq!(settings.cookie.path, "/");
        assert_eq!(settings.cookie.same_site, SameSite::Lax);
        assert!(settings.cookie.http_only);
        assert!(settings.cookie.secure);
        assert!(settings.mail.api_url.is_none());
        assert_eq!(settings.jobs.report_warning_threshold, 5);
        assert!(settings.superuser.is_none());
    }

    #[test]
    fn missing_jwt_secret_is_reported_by_name() {
        let err = settings_from(&[("DATABASE_URL", "mysql://db")]).unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"));
    }

    #[test]
    fn cookie_flags_accept_python_style_booleans() {
        let settings = settings_from(&[
            ("DATABASE_URL", "mysql://db"),
            ("JWT_SECRET", "s3cret"),
            ("COOKIE_SECURE", "False"),
            ("COOKIE_SAMESITE", "Strict"),
        ])
        .unwrap();

        assert!(!settings.cookie.secure);
        assert_eq!(settings.cookie.same_site, SameSite::Strict);
    }

    #[test]
    fn partial_superuser_configuration_is_rejected() {
        let err = settings_from(&[
            ("DATABASE_URL", "mysql://db"),
            ("JWT_SECRET", "s3cret"),
            ("SUPERUSER_EMAIL", "root@example.com"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("SUPERUSER_USERNAME"));
    }

    #[test]
    fn token_lifetimes_outside_the_supported_range_are_rejected() {
        let err = settings_from(&[
            ("DATABASE_URL", "mysql://db"),
            ("JWT_SECRET", "s3cret"),
            ("ACCESS_TOKEN_LIFETIME_MINUTES", "9223372036854775807"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("ACCESS_TOKEN_LIFETIME_MINUTES"));

        let err = settings_from(&[
            ("DATABASE_URL", "mysql://db"),
            ("JWT_SECRET", "s3cret"),
            ("REFRESH_TOKEN_LIFETIME_DAYS", "0"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("REFRESH_TOKEN_LIFETIME_DAYS"));

        let settings = settings_from(&[
            ("DATABASE_URL", "mysql://db"),
            ("JWT_SECRET", "s3cret"),
            ("REFRESH_TOKEN_LIFETIME_DAYS", "3660"),
        ])
        .unwrap();
        assert_eq!(settings.auth.refresh_token_lifetime_days, MAX_REFRESH_TOKEN_LIFETIME_DAYS);
    }

    #[test]
    fn unparsable_port_is_an_error() {
        let err = settings_from(&[
            ("DATABASE_URL", "mysql://db"),
            ("JWT_SECRET", "s3cret"),
            ("APP_PORT", "eighty"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("APP_PORT"));
    }
}
