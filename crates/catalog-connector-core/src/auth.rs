//! Credentials attached to outgoing API requests.
//!
//! A deployment uses one scheme: none, a static API key kept in the host's
//! password slot, or an OAuth2 refresh token (also kept in the password slot)
//! that is traded for short-lived bearer tokens.

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use rand::distributions::Alphanumeric;
use rand::Rng;
use reqwest::Url;
use serde::Deserialize;

use crate::config::{AuthConfig, OAuthConfig};
use crate::error::{ConnectorError, Result};
use crate::host::Host;
use crate::mode::LoginRedirect;
use crate::transport::{ApiRequest, Transport};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Holds at most one access token and hands it out until it expires.
#[derive(Debug, Default)]
pub struct TokenCache {
    slot: Mutex<Option<AccessToken>>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_valid_at(&self, now: DateTime<Utc>) -> Option<AccessToken> {
        let mut slot = self.slot.lock();
        match slot.as_ref() {
            Some(token) if token.is_valid_at(now) => Some(token.clone()),
            Some(_) => {
                *slot = None;
                None
            }
            None => None,
        }
    }

    pub fn store(&self, token: AccessToken) {
        *self.slot.lock() = Some(token);
    }
}

/// Longest access token lifetime honoured from a token response.
pub const MAX_TOKEN_LIFETIME_SECS: u64 = 365 * 24 * 60 * 60;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<u64>,
}

/// Talks to the identity provider's token endpoint.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    config: OAuthConfig,
}

impl OAuthClient {
    pub fn new(config: OAuthConfig) -> Self {
        Self { config }
    }

    pub fn token_endpoint(&self) -> String {
        format!("{}/oauth/token", self.config.auth_url.trim_end_matches('/'))
    }

    /// URL the user is sent to in order to log in.
    pub fn authorization_url(&self, state: &str) -> Result<String> {
        let base = format!("{}/authorize", self.config.auth_url.trim_end_matches('/'));
        let url = Url::parse_with_params(
            &base,
            &[
                ("response_type", "code"),
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("scope", self.config.scope.as_str()),
                ("audience", self.config.audience.as_str()),
                ("state", state),
            ],
        )
        .map_err(|e| ConnectorError::Config(format!("invalid auth_url '{}': {}", base, e)))?;

        Ok(url.to_string())
    }

    /// Trade an authorization code for a refresh token.
    pub async fn exchange_code(&self, transport: &dyn Transport, code: &str) -> Result<String> {
        let request = ApiRequest::post_form(
            self.token_endpoint(),
            &[
                ("grant_type", "authorization_code"),
                ("client_id", self.config.client_id.as_str()),
                ("code", code),
                ("redirect_uri", self.config.redirect_uri.as_str()),
            ],
        );

        let response = self.token_request(transport, request).await?;
        response.refresh_token.ok_or_else(|| {
            ConnectorError::Authentication("token response did not include a refresh token".to_string())
        })
    }

    /// Trade a refresh token for an access token valid from `now`.
    pub async fn refresh(
        &self,
        transport: &dyn Transport,
        refresh_token: &str,
        now: DateTime<Utc>,
    ) -> Result<AccessToken> {
        let request = ApiRequest::post_form(
            self.token_endpoint(),
            &[
                ("grant_type", "refresh_token"),
                ("client_id", self.config.client_id.as_str()),
                ("refresh_token", refresh_token),
            ],
        );

        let response = self.token_request(transport, request).await?;
        let token = response.access_token.ok_or_else(|| {
            ConnectorError::Authentication("token response did not include an access token".to_string())
        })?;

        Ok(AccessToken {
            token,
            expires_at: self.expiry_for(response.expires_in, now)?,
        })
    }

    /// Expiry for a token issued at `now`, moved earlier by the configured
    /// skew. Lifetimes are capped at [`MAX_TOKEN_LIFETIME_SECS`]; a lifetime
    /// no longer than the skew is kept whole.
    fn expiry_for(&self, expires_in: Option<u64>, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
        let lifetime = expires_in
            .unwrap_or(self.config.token_ttl_secs)
            .min(MAX_TOKEN_LIFETIME_SECS);
        let skew = self.config.expiry_skew_secs;
        let lifetime = if lifetime > skew {
            lifetime - skew
        } else {
            tracing::warn!("Access token lifetime of {}s is within the {}s expiry skew", lifetime, skew);
            lifetime
        };

        Duration::try_seconds(i64::try_from(lifetime).unwrap_or(i64::MAX))
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .ok_or_else(|| {
                ConnectorError::Authentication(format!(
                    "access token lifetime of {}s is out of range",
                    lifetime
                ))
            })
    }

    async fn token_request(
        &self,
        transport: &dyn Transport,
        request: ApiRequest,
    ) -> Result<TokenResponse> {
        let response = transport
            .send(request)
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ConnectorError::Authentication(format!("token exchange failed: {}", e)))?;

        response
            .json()
            .map_err(|e| ConnectorError::Authentication(format!("token exchange failed: {}", e)))
    }
}

/// Random value for the `state` parameter of the authorize URL.
pub fn new_state_nonce() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

/// Credentials for one session.
#[derive(Debug)]
pub enum Credentials {
    None,
    ApiKey {
        header: String,
        key: String,
    },
    OAuth {
        client: OAuthClient,
        refresh_token: String,
        tokens: TokenCache,
    },
}

impl Credentials {
    /// Build credentials for `auth` from the host's password slot.
    pub fn from_config(auth: &AuthConfig, password: &str) -> Self {
        match auth {
            AuthConfig::None => Credentials::None,
            AuthConfig::ApiKey { header } => Credentials::ApiKey {
                header: header.clone(),
                key: password.to_string(),
            },
            AuthConfig::Oauth(oauth) => Credentials::OAuth {
                client: OAuthClient::new(oauth.clone()),
                refresh_token: password.to_string(),
                tokens: TokenCache::new(),
            },
        }
    }

    /// Attach whatever header this scheme requires.
    pub async fn authorize(
        &self,
        transport: &dyn Transport,
        request: ApiRequest,
    ) -> Result<ApiRequest> {
        match self {
            Credentials::None => Ok(request),
            Credentials::ApiKey { key, .. } if key.is_empty() => Ok(request),
            Credentials::ApiKey { header, key } => Ok(request.with_header(header.as_str(), key.as_str())),
            Credentials::OAuth {
                client,
                refresh_token,
                tokens,
            } => {
                if refresh_token.is_empty() {
                    return Err(ConnectorError::Authentication("not logged in".to_string()));
                }

                let now = Utc::now();
                let token = match tokens.get_valid_at(now) {
                    Some(token) => token,
                    None => {
                        tracing::debug!("Refreshing access token");
                        let token = client.refresh(transport, refresh_token, now).await?;
                        tokens.store(token.clone());
                        token
                    }
                };

                Ok(request.with_header("Authorization", format!("Bearer {}", token.token)))
            }
        }
    }
}

/// State of the login button and its inline error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginControl {
    pub enabled: bool,
    pub label: String,
    pub error: Option<String>,
}

impl Default for LoginControl {
    fn default() -> Self {
        Self {
            enabled: true,
            label: "Login".to_string(),
            error: None,
        }
    }
}

impl LoginControl {
    pub fn logged_in(&mut self) {
        self.enabled = false;
        self.label = "Logged In".to_string();
        self.error = None;
    }

    pub fn failed(&mut self, message: impl Into<String>) {
        self.enabled = true;
        self.label = "Login".to_string();
        self.error = Some(message.into());
    }
}

/// Finish a login redirect: store the refresh token in the host's password
/// slot on success, or leave the control ready for another attempt.
pub async fn complete_login(
    client: &OAuthClient,
    transport: &dyn Transport,
    host: &dyn Host,
    redirect: LoginRedirect,
    control: &mut LoginControl,
) -> Result<()> {
    let code = match redirect {
        LoginRedirect::Code(code) => code,
        LoginRedirect::Error { error, description } => {
            let message = description.unwrap_or(error);
            tracing::warn!("Identity provider returned an error: {}", message);
            control.failed(message.clone());
            return Err(ConnectorError::Authentication(message));
        }
    };

    match client.exchange_code(transport, &code).await {
        Ok(refresh_token) => {
            host.set_password(refresh_token);
            control.logged_in();
            tracing::info!("Login complete");
            Ok(())
        }
        Err(e) => {
            tracing::warn!("Login failed: {}", e);
            control.failed(e.to_string());
            Err(e)
        }
    }
}
