//! Resolution of bearer tokens into platform users.

use std::{sync::Arc, time::Duration};

use futures::future::BoxFuture;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::error::{UpstreamError, UpstreamResult, ensure_success};

const SERVICE: &str = "identity";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    #[default]
    #[serde(other)]
    User,
}

/// Authenticated account as reported by the identity provider.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub role: UserRole,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// Looks up the user owning a session token.
pub trait IdentityProvider: Send + Sync {
    /// `None` when the token is unknown or expired.
    fn me(&self, token: String) -> BoxFuture<'static, UpstreamResult<Option<User>>>;
}

/// Calls `GET {AUTH_BASE_URL}/auth/me` forwarding the caller's bearer token.
#[derive(Clone)]
pub struct HttpIdentityProvider {
    http: Client,
    base_url: Option<Arc<str>>,
}

impl HttpIdentityProvider {
    pub fn new(base_url: Option<String>) -> UpstreamResult<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|source| UpstreamError::ClientBuilder {
                service: SERVICE,
                source,
            })?;
        Ok(Self {
            http,
            base_url: base_url.map(|url| Arc::from(url.trim_end_matches('/'))),
        })
    }
}

impl IdentityProvider for HttpIdentityProvider {
    fn me(&self, token: String) -> BoxFuture<'static, UpstreamResult<Option<User>>> {
        let provider = self.clone();
        Box::pin(async move {
            let base_url = provider
                .base_url
                .clone()
                .ok_or(UpstreamError::MissingCredentials { service: SERVICE })?;

            let response = provider
                .http
                .get(format!("{base_url}/auth/me"))
                .bearer_auth(token)
                .send()
                .await
                .map_err(|source| UpstreamError::Transport {
                    service: SERVICE,
                    source,
                })?;

            if matches!(
                response.status(),
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND
            ) {
                return Ok(None);
            }

            ensure_success(SERVICE, response)
                .await?
                .json::<User>()
                .await
                .map(Some)
                .map_err(|source| UpstreamError::Decode {
                    service: SERVICE,
                    source,
                })
        })
    }
}
