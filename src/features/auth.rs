use crate::features::error::ApiError;
use crate::AppState;
use anyhow::Context;
use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use http::{header, HeaderMap};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

pub const ACCESS_TOKEN_COOKIE: &str = "sb-access-token";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AdminUser {
    pub id: String,
    pub email: Option<String>,
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("missing access token")]
    MissingToken,

    #[error("{0}")]
    Rejected(String),

    #[error("auth service unavailable: {0}")]
    Unavailable(String),
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Unavailable(msg) => ApiError::Upstream(anyhow::anyhow!(msg)),
            other => ApiError::Unauthorized(other.to_string()),
        }
    }
}

// resolves an access token to the signed-in user, or refuses it
#[async_trait]
pub trait AdminVerifier: Send + Sync {
    async fn verify(&self, access_token: &str) -> Result<AdminUser, AuthError>;
}

pub struct SupabaseAuth {
    client: Client,
    base_url: String,
    key: String,
}

impl SupabaseAuth {
    pub fn new(base_url: &str, key: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build auth HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            key: key.to_string(),
        })
    }
}

#[derive(Deserialize)]
struct AuthErrorBody {
    #[serde(alias = "error_description", alias = "message")]
    msg: Option<String>,
}

#[async_trait]
impl AdminVerifier for SupabaseAuth {
    async fn verify(&self, access_token: &str) -> Result<AdminUser, AuthError> {
        let response = self
            .client
            .get(format!("{}/auth/v1/user", self.base_url))
            .header("apikey", &self.key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AuthError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<AdminUser>()
                .await
                .map_err(|e| AuthError::Unavailable(e.to_string()));
        }

        if status.is_server_error() {
            return Err(AuthError::Unavailable(format!("status {}", status)));
        }

        let reason = response
            .json::<AuthErrorBody>()
            .await
            .ok()
            .and_then(|b| b.msg)
            .unwrap_or_else(|| format!("status {}", status));
        Err(AuthError::Rejected(reason))
    }
}

/// Pulls the session token from the auth cookie, falling back to a bearer header.
pub fn access_token(headers: &HeaderMap) -> Option<String> {
    let from_cookie = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == ACCESS_TOKEN_COOKIE)
        .map(|(_, value)| value.trim().to_string());

    from_cookie
        .or_else(|| {
            headers
                .get(header::AUTHORIZATION)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.strip_prefix("Bearer "))
                .map(|token| token.trim().to_string())
        })
        .filter(|token| !token.is_empty())
}

pub async fn require_admin(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = access_token(req.headers()).ok_or(AuthError::MissingToken)?;

    let user = state.verifier.verify(&token).await.map_err(|e| {
        warn!(error = %e, "admin request refused");
        e
    })?;
    debug!(user = %user.id, email = ?user.email, "admin request accepted");

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}
