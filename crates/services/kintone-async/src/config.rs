use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};

use crate::error::KintoneError;

/// Environment variable holding the kintone base URL
pub const ENV_BASE_URL: &str = "KINTONE_BASE_URL";
/// Environment variable holding an API token
pub const ENV_API_TOKEN: &str = "KINTONE_API_TOKEN";
/// Environment variable holding the login name for password auth
pub const ENV_USERNAME: &str = "KINTONE_USERNAME";
/// Environment variable holding the password for password auth
pub const ENV_PASSWORD: &str = "KINTONE_PASSWORD";

/// Header name for API token authentication
pub const HDR_API_TOKEN: &str = "x-cybozu-api-token";
/// Header name for password authentication
pub const HDR_AUTHORIZATION: &str = "x-cybozu-authorization";

/// Credentials sent with each request
///
/// Debug output redacts secrets via [`SecretString`].
#[derive(Clone, Debug)]
pub enum Auth {
    /// One or more comma-separated app API tokens
    ApiToken(SecretString),
    /// Login name and password, sent base64-encoded
    Password {
        /// Login name
        username: String,
        /// Password
        password: SecretString,
    },
}

/// Configuration for the kintone client
#[derive(Clone, Debug)]
pub struct KintoneConfig {
    base_url: Option<String>,
    auth: Option<Auth>,
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Default for KintoneConfig {
    fn default() -> Self {
        let password_auth = env_var(ENV_USERNAME)
            .zip(env_var(ENV_PASSWORD))
            .map(|(username, password)| Auth::Password {
                username,
                password: SecretString::from(password),
            });
        let auth = password_auth.or_else(|| {
            env_var(ENV_API_TOKEN).map(|token| Auth::ApiToken(SecretString::from(token)))
        });

        Self {
            base_url: env_var(ENV_BASE_URL),
            auth,
        }
    }
}

impl KintoneConfig {
    /// Creates a new configuration from the environment
    ///
    /// Reads:
    /// - `KINTONE_BASE_URL`, e.g. `https://example.cybozu.com`
    /// - `KINTONE_USERNAME` and `KINTONE_PASSWORD` for password auth
    /// - `KINTONE_API_TOKEN` for token auth, used when password auth is not set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the base URL
    #[must_use]
    pub fn with_base_url(mut self, base: impl Into<String>) -> Self {
        self.base_url = Some(base.into());
        self
    }

    /// Authenticates with an API token
    #[must_use]
    pub fn with_api_token(mut self, token: impl Into<String>) -> Self {
        self.auth = Some(Auth::ApiToken(SecretString::from(token.into())));
        self
    }

    /// Authenticates with a login name and password
    #[must_use]
    pub fn with_password_auth(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.auth = Some(Auth::Password {
            username: username.into(),
            password: SecretString::from(password.into()),
        });
        self
    }

    /// Returns the configured base URL
    #[must_use]
    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    /// Returns the configured credentials
    #[must_use]
    pub const fn auth(&self) -> Option<&Auth> {
        self.auth.as_ref()
    }
}

/// Configuration trait for the kintone client
///
/// Implement this trait to provide custom authentication and API configuration.
pub trait Config: Send + Sync {
    /// Returns HTTP headers to include in requests
    ///
    /// # Errors
    ///
    /// Returns an error if header values contain invalid characters.
    fn headers(&self) -> Result<HeaderMap, KintoneError>;

    /// Constructs the full URL for an API path such as `/k/v1/record.json`
    fn url(&self, path: &str) -> String;

    /// Validates that the base URL and credentials are present.
    ///
    /// # Errors
    ///
    /// Returns an error if either is missing.
    fn validate_auth(&self) -> Result<(), KintoneError>;
}

impl Config for KintoneConfig {
    fn headers(&self) -> Result<HeaderMap, KintoneError> {
        let mut h = HeaderMap::new();

        match &self.auth {
            Some(Auth::ApiToken(token)) => {
                let token = token.expose_secret().trim();
                if !token.is_empty() {
                    h.insert(
                        HDR_API_TOKEN,
                        HeaderValue::from_str(token).map_err(|_| {
                            KintoneError::Config("Invalid X-Cybozu-API-Token value".into())
                        })?,
                    );
                }
            }
            Some(Auth::Password { username, password }) => {
                let encoded = STANDARD.encode(format!("{username}:{}", password.expose_secret()));
                let mut value = HeaderValue::from_str(&encoded).map_err(|_| {
                    KintoneError::Config("Invalid X-Cybozu-Authorization value".into())
                })?;
                value.set_sensitive(true);
                h.insert(HDR_AUTHORIZATION, value);
            }
            None => {}
        }

        Ok(h)
    }

    fn url(&self, path: &str) -> String {
        let base = self.base_url.as_deref().unwrap_or_default().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{base}/{path}")
    }

    fn validate_auth(&self) -> Result<(), KintoneError> {
        if self.base_url.as_deref().is_none_or(|b| b.trim().is_empty()) {
            return Err(KintoneError::Config(
                "Missing kintone base URL: set KINTONE_BASE_URL environment variable".into(),
            ));
        }
        match &self.auth {
            Some(Auth::ApiToken(token)) if !token.expose_secret().trim().is_empty() => Ok(()),
            Some(Auth::Password { username, password })
                if !username.trim().is_empty() && !password.expose_secret().is_empty() =>
            {
                Ok(())
            }
            _ => Err(KintoneError::Config(
                "Missing kintone credentials: set KINTONE_API_TOKEN or KINTONE_USERNAME and KINTONE_PASSWORD".into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{EnvGuard, clear_kintone_env};
    use serial_test::serial;

    #[test]
    #[serial(env)]
    fn config_reads_env_vars() {
        let _env = clear_kintone_env();
        let _base = EnvGuard::set(ENV_BASE_URL, "https://example.cybozu.com");
        let _token = EnvGuard::set(ENV_API_TOKEN, "token-123");

        let cfg = KintoneConfig::new();
        assert_eq!(cfg.base_url(), Some("https://example.cybozu.com"));

        let h = cfg.headers().unwrap();
        assert_eq!(h.get(HDR_API_TOKEN).unwrap().to_str().unwrap(), "token-123");
        assert!(cfg.validate_auth().is_ok());
    }

    #[test]
    #[serial(env)]
    fn password_auth_wins_over_token() {
        let _env = clear_kintone_env();
        let _base = EnvGuard::set(ENV_BASE_URL, "https://example.cybozu.com");
        let _token = EnvGuard::set(ENV_API_TOKEN, "token-123");
        let _user = EnvGuard::set(ENV_USERNAME, "alice");
        let _pass = EnvGuard::set(ENV_PASSWORD, "s3cret");

        let cfg = KintoneConfig::new();
        assert!(matches!(cfg.auth(), Some(Auth::Password { .. })));

        let h = cfg.headers().unwrap();
        assert!(h.get(HDR_API_TOKEN).is_none());
        // base64("alice:s3cret")
        assert_eq!(
            h.get(HDR_AUTHORIZATION).unwrap().to_str().unwrap(),
            "YWxpY2U6czNjcmV0"
        );
    }

    #[test]
    #[serial(env)]
    fn username_without_password_falls_back_to_token() {
        let _env = clear_kintone_env();
        let _token = EnvGuard::set(ENV_API_TOKEN, "token-123");
        let _user = EnvGuard::set(ENV_USERNAME, "alice");

        let cfg = KintoneConfig::new();
        assert!(matches!(cfg.auth(), Some(Auth::ApiToken(_))));
    }

    #[test]
    #[serial(env)]
    fn config_trims_and_ignores_blank_env() {
        let _env = clear_kintone_env();
        let _base = EnvGuard::set(ENV_BASE_URL, "  https://example.cybozu.com/ \n");
        let _token = EnvGuard::set(ENV_API_TOKEN, "   ");

        let cfg = KintoneConfig::new();
        assert_eq!(cfg.base_url(), Some("https://example.cybozu.com/"));
        assert!(cfg.auth().is_none());
        assert!(cfg.validate_auth().is_err());
    }

    #[test]
    #[serial(env)]
    fn validate_auth_missing_base_url() {
        let _env = clear_kintone_env();

        let cfg = KintoneConfig::new().with_api_token("token");
        let err = cfg.validate_auth().unwrap_err();
        assert!(err.to_string().contains(ENV_BASE_URL));
    }

    #[test]
    fn url_joins_base_and_path() {
        let cfg = KintoneConfig::new().with_base_url("https://example.cybozu.com/");
        assert_eq!(
            cfg.url("/k/v1/record.json"),
            "https://example.cybozu.com/k/v1/record.json"
        );
        assert_eq!(
            cfg.url("k/guest/3/v1/record.json"),
            "https://example.cybozu.com/k/guest/3/v1/record.json"
        );
    }

    #[test]
    fn builder_methods() {
        let cfg = KintoneConfig::new()
            .with_base_url("https://test.cybozu.com")
            .with_password_auth("bob", "pw");

        assert_eq!(cfg.base_url(), Some("https://test.cybozu.com"));
        assert!(cfg.validate_auth().is_ok());

        let cfg = cfg.with_api_token("tok");
        let h = cfg.headers().unwrap();
        assert_eq!(h.get(HDR_API_TOKEN).unwrap().to_str().unwrap(), "tok");
        assert!(h.get(HDR_AUTHORIZATION).is_none());
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let cfg = KintoneConfig::new()
            .with_password_auth("carol", "super-secret-password")
            .with_base_url("https://example.cybozu.com");
        let debug_str = format!("{cfg:?}");
        assert!(!debug_str.contains("super-secret-password"));
        assert!(debug_str.contains("[REDACTED]"), "got: {debug_str}");

        let cfg = cfg.with_api_token("super-secret-token");
        assert!(!format!("{cfg:?}").contains("super-secret-token"));
    }

    #[test]
    fn validate_auth_rejects_blank_credentials() {
        let base = KintoneConfig::new().with_base_url("https://example.cybozu.com");

        assert!(base.clone().with_api_token("").validate_auth().is_err());
        assert!(base.clone().with_api_token("  \n").validate_auth().is_err());
        assert!(base.clone().with_password_auth(" ", "pw").validate_auth().is_err());
        assert!(base.clone().with_password_auth("dave", "").validate_auth().is_err());
        assert!(base.with_api_token("  valid  ").validate_auth().is_ok());
    }
}
