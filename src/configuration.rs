use crate::error::ConfigError;

const MIN_SECRET_LENGTH: usize = 32;

#[derive(serde::Deserialize, Clone, Debug)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub jwt: JwtSettings,
    #[serde(default)]
    pub cookie: CookieSettings,
    /// Seed accounts for the in-memory credential store
    #[serde(default)]
    pub users: Vec<UserSettings>,
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct ApplicationSettings {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
}

impl ApplicationSettings {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// JWT authentication settings
#[derive(serde::Deserialize, Clone, Debug)]
pub struct JwtSettings {
    pub secret: String,
    pub access_token_expiry: i64,   // seconds (e.g., 900 for 15 minutes)
    pub refresh_token_expiry: i64,  // seconds (e.g., 604800 for 7 days)
    pub issuer: String,
    #[serde(default)]
    pub refresh_rotation: RotationPolicy,
}

/// What happens to the refresh token on `/refresh`
#[derive(serde::Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RotationPolicy {
    /// Keep using the refresh token issued at login
    #[default]
    Disabled,
    /// Issue a new refresh token; older ones stay valid until expiry
    Advisory,
    /// Issue a new refresh token and reject any older one as reused
    ReuseDetection,
}

/// Refresh token cookie attributes
#[derive(serde::Deserialize, Clone, Debug)]
pub struct CookieSettings {
    #[serde(default = "default_cookie_name")]
    pub name: String,
    /// e.g. ".example.com" to share the cookie with subdomains
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default = "default_cookie_path")]
    pub path: String,
    #[serde(default = "default_true")]
    pub secure: bool,
    #[serde(default = "default_true")]
    pub http_only: bool,
    #[serde(default)]
    pub same_site: SameSitePolicy,
}

impl Default for CookieSettings {
    fn default() -> Self {
        Self {
            name: default_cookie_name(),
            domain: None,
            path: default_cookie_path(),
            secure: true,
            http_only: true,
            same_site: SameSitePolicy::default(),
        }
    }
}

#[derive(serde::Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SameSitePolicy {
    Strict,
    Lax,
    /// Sent on cross-site requests (requires `secure`)
    #[default]
    None,
}

/// Account entry for the in-memory credential store
#[derive(serde::Deserialize, Clone, Debug)]
pub struct UserSettings {
    pub username: String,
    /// bcrypt hash, never the plaintext password
    pub password_hash: String,
    pub id: u64,
    #[serde(default = "default_role")]
    pub role: String,
}

impl Settings {
    /// Reject settings the service cannot run safely with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt.secret.len() < MIN_SECRET_LENGTH {
            return Err(ConfigError::InvalidValue(format!(
                "jwt.secret must be at least {} bytes",
                MIN_SECRET_LENGTH
            )));
        }
        if self.jwt.access_token_expiry <= 0 {
            return Err(ConfigError::InvalidValue(
                "jwt.access_token_expiry must be positive".to_string(),
            ));
        }
        if self.jwt.refresh_token_expiry <= self.jwt.access_token_expiry {
            return Err(ConfigError::InvalidValue(
                "jwt.refresh_token_expiry must exceed jwt.access_token_expiry".to_string(),
            ));
        }
        if self.jwt.issuer.trim().is_empty() {
            return Err(ConfigError::MissingRequired("jwt.issuer".to_string()));
        }
        if self.cookie.same_site == SameSitePolicy::None && !self.cookie.secure {
            return Err(ConfigError::InvalidValue(
                "cookie.same_site = none requires cookie.secure = true".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_cookie_name() -> String {
    "refreshToken".to_string()
}

fn default_cookie_path() -> String {
    "/".to_string()
}

fn default_role() -> String {
    "user".to_string()
}

fn default_true() -> bool {
    true
}

/// Load `configuration.{yaml,toml,json}` (optional) and `APP__*` environment overrides
pub fn get_configuration() -> Result<Settings, ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("__")
                .separator("__"),
        )
        .build()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    let settings = settings
        .try_deserialize::<Settings>()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;
    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_settings() -> Settings {
        Settings {
            application: ApplicationSettings {
                host: "127.0.0.1".to_string(),
                port: 8000,
            },
            jwt: JwtSettings {
                secret: "test-secret-key-at-least-32-characters-long".to_string(),
                access_token_expiry: 900,
                refresh_token_expiry: 604800,
                issuer: "test".to_string(),
                refresh_rotation: RotationPolicy::ReuseDetection,
            },
            cookie: CookieSettings::default(),
            users: vec![],
        }
    }

    #[test]
    fn test_valid_settings() {
        assert!(test_settings().validate().is_ok());
        assert_eq!(test_settings().application.address(), "127.0.0.1:8000");
    }

    #[test]
    fn test_short_secret_rejected() {
        let mut settings = test_settings();
        settings.jwt.secret = "short".to_string();
        assert!(matches!(settings.validate(), Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn test_refresh_must_outlive_access() {
        let mut settings = test_settings();
        settings.jwt.refresh_token_expiry = 900;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_cross_site_cookie_requires_secure() {
        let mut settings = test_settings();
        settings.cookie.secure = false;
        assert!(settings.validate().is_err());

        settings.cookie.same_site = SameSitePolicy::Lax;
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_cookie_defaults() {
        let cookie = CookieSettings::default();
        assert_eq!(cookie.name, "refreshToken");
        assert_eq!(cookie.path, "/");
        assert!(cookie.secure);
        assert!(cookie.http_only);
        assert_eq!(cookie.same_site, SameSitePolicy::None);
        assert!(cookie.domain.is_none());
    }

    #[test]
    fn test_rotation_policy_deserialization() {
        let policy: RotationPolicy = serde_json::from_str("\"reuse_detection\"").unwrap();
        assert_eq!(policy, RotationPolicy::ReuseDetection);
        let policy: RotationPolicy = serde_json::from_str("\"advisory\"").unwrap();
        assert_eq!(policy, RotationPolicy::Advisory);
    }
}
