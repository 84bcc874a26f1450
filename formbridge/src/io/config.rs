//! Application configuration loaded from a TOML file.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use url::Url;

/// Top-level configuration (TOML).
///
/// Every section defaults independently, so a partial file only overrides what
/// it names. Secrets may also be injected by the server from the environment.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub oauth: OAuthConfig,
    pub airtable: AirtableConfig,
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    /// Browser origin allowed by CORS and the redirect target after login.
    pub frontend_url: String,
    /// Mark the session cookie `Secure` (enable behind HTTPS).
    pub secure_cookies: bool,
    /// Include remote API error payloads in HTTP error bodies. Keep off in
    /// production; payloads are always logged.
    pub expose_upstream_errors: bool,
    /// Idle lifetime of a session that has not completed login.
    pub login_ttl_secs: u64,
    /// Lifetime of a logged-in session; matches the access token lifetime.
    pub session_ttl_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 4000,
            frontend_url: "http://localhost:5173".to_string(),
            secure_cookies: false,
            expose_upstream_errors: false,
            login_ttl_secs: 600,
            session_ttl_secs: 3600,
        }
    }
}

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OAuthConfig {
    pub client_id: String,
    /// Confidential clients authenticate the token request with HTTP Basic.
    pub client_secret: Option<String>,
    pub redirect_uri: String,
    /// Space-separated scope list.
    pub scopes: String,
    pub authorize_url: String,
    pub token_url: String,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: None,
            redirect_uri: String::new(),
            scopes: "data.records:read data.records:write schema.bases:read user.email:read"
                .to_string(),
            authorize_url: "https://airtable.com/oauth2/v1/authorize".to_string(),
            token_url: "https://airtable.com/oauth2/v1/token".to_string(),
        }
    }
}

impl fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("client_id", &self.client_id)
            .field(
                "client_secret",
                &self.client_secret.as_ref().map(|_| "<redacted>"),
            )
            .field("redirect_uri", &self.redirect_uri)
            .field("scopes", &self.scopes)
            .field("authorize_url", &self.authorize_url)
            .field("token_url", &self.token_url)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AirtableConfig {
    pub api_base_url: String,
    /// Timeout applied to every outbound request, token exchange included.
    pub request_timeout_secs: u64,
}

impl Default for AirtableConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.airtable.com/v0".to_string(),
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StoreConfig {
    pub data_dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".formbridge/data"),
        }
    }
}

impl AppConfig {
    /// Structural checks that hold for any configuration, defaults included.
    pub fn validate(&self) -> Result<()> {
        if self.airtable.request_timeout_secs == 0 {
            return Err(anyhow!("airtable.request_timeout_secs must be > 0"));
        }
        if self.server.login_ttl_secs == 0 || self.server.session_ttl_secs == 0 {
            return Err(anyhow!(
                "server.login_ttl_secs and server.session_ttl_secs must be > 0"
            ));
        }
        for (field, value) in [
            ("airtable.api_base_url", &self.airtable.api_base_url),
            ("oauth.authorize_url", &self.oauth.authorize_url),
            ("oauth.token_url", &self.oauth.token_url),
            ("server.frontend_url", &self.server.frontend_url),
        ] {
            Url::parse(value).with_context(|| format!("{} is not a valid URL", field))?;
        }
        if self.store.data_dir.as_os_str().is_empty() {
            return Err(anyhow!("store.data_dir must be non-empty"));
        }
        Ok(())
    }

    /// Checks needed before serving OAuth logins.
    pub fn validate_credentials(&self) -> Result<()> {
        if self.oauth.client_id.trim().is_empty() {
            return Err(anyhow!("oauth.client_id must be set"));
        }
        if self.oauth.redirect_uri.trim().is_empty() {
            return Err(anyhow!("oauth.redirect_uri must be set"));
        }
        Url::parse(&self.oauth.redirect_uri).context("oauth.redirect_uri is not a valid URL")?;
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `AppConfig::default()`.
pub fn load_config(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        let cfg = AppConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: AppConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}
