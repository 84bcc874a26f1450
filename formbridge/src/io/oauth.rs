//! OAuth2 authorization-code exchange against the remote provider.
//!
//! The [`TokenExchange`] trait decouples the HTTP callback handler from the
//! real token endpoint. Tests use scripted implementations that return
//! predetermined tokens without network access.

use std::fmt;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::ACCEPT;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use url::Url;

use crate::error::Result;
use crate::io::config::OAuthConfig;
use crate::io::http::{build_client, decode, send_json};

/// Bearer credential. `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

/// Token endpoint response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenSet {
    pub access_token: AccessToken,
    #[serde(default)]
    pub refresh_token: Option<AccessToken>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    /// Access token lifetime in seconds.
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub refresh_expires_in: Option<u64>,
}

/// Abstraction over the provider's authorize and token endpoints.
#[async_trait]
pub trait TokenExchange: Send + Sync {
    /// Where to send the browser to start an authorization.
    fn authorization_url(&self, challenge: &str, state: &str) -> Result<Url>;

    /// Trade an authorization code for tokens. Called once per callback and
    /// never retried.
    async fn exchange_code(&self, code: &str, verifier: &str) -> Result<TokenSet>;
}

/// Airtable's OAuth endpoints over HTTPS.
pub struct AirtableOAuth {
    http: Client,
    config: OAuthConfig,
}

impl AirtableOAuth {
    pub fn new(config: &OAuthConfig, timeout_secs: u64) -> anyhow::Result<Self> {
        Ok(Self {
            http: build_client(timeout_secs)?,
            config: config.clone(),
        })
    }
}

#[async_trait]
impl TokenExchange for AirtableOAuth {
    fn authorization_url(&self, challenge: &str, state: &str) -> Result<Url> {
        let url = Url::parse_with_params(
            &self.config.authorize_url,
            &[
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", self.config.scopes.as_str()),
                ("state", state),
                ("code_challenge", challenge),
                ("code_challenge_method", "S256"),
            ],
        )
        .context("build authorize url")?;
        Ok(url)
    }

    #[instrument(skip_all)]
    async fn exchange_code(&self, code: &str, verifier: &str) -> Result<TokenSet> {
        let form = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("code_verifier", verifier),
            ("client_id", self.config.client_id.as_str()),
        ];
        let mut request = self
            .http
            .post(&self.config.token_url)
            .header(ACCEPT, "application/json")
            .form(&form);
        if let Some(secret) = &self.config.client_secret {
            request = request.basic_auth(&self.config.client_id, Some(secret));
        }

        let payload = send_json("token exchange", request).await?;
        let tokens: TokenSet = decode("token exchange", payload)?;
        info!(
            has_refresh_token = tokens.refresh_token.is_some(),
            expires_in = ?tokens.expires_in,
            "token exchange completed"
        );
        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn config() -> OAuthConfig {
        OAuthConfig {
            client_id: "client-123".to_string(),
            redirect_uri: "http://localhost:4000/api/v1/auth/airtable/callback".to_string(),
            ..OAuthConfig::default()
        }
    }

    #[test]
    fn authorization_url_carries_pkce_parameters() {
        let oauth = AirtableOAuth::new(&config(), 5).expect("client");
        let url = oauth
            .authorization_url("challenge-abc", "state-xyz")
            .expect("url");

        assert_eq!(url.host_str(), Some("airtable.com"));
        assert_eq!(url.path(), "/oauth2/v1/authorize");
        let params: HashMap<String, String> = url.query_pairs().into_owned().collect();
        assert_eq!(params["client_id"], "client-123");
        assert_eq!(
            params["redirect_uri"],
            "http://localhost:4000/api/v1/auth/airtable/callback"
        );
        assert_eq!(params["response_type"], "code");
        assert_eq!(params["state"], "state-xyz");
        assert_eq!(params["code_challenge"], "challenge-abc");
        assert_eq!(params["code_challenge_method"], "S256");
        assert!(params["scope"].contains("data.records:write"));
    }

    #[test]
    fn token_set_parses_and_redacts() {
        let tokens: TokenSet = serde_json::from_value(json!({
            "access_token": "secret-access",
            "refresh_token": "secret-refresh",
            "token_type": "bearer",
            "scope": "data.records:write",
            "expires_in": 3600
        }))
        .expect("parse");
        assert_eq!(tokens.access_token.secret(), "secret-access");
        assert_eq!(tokens.expires_in, Some(3600));

        let rendered = format!("{:?}", tokens);
        assert!(!rendered.contains("secret-access"));
        assert!(!rendered.contains("secret-refresh"));
    }
}
