//! Thin client for the account endpoints. Credentials are forwarded as-is.

use std::time::Duration;

use engine_logging::{engine_info, engine_warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ApiConfig;
use crate::upload::parse_error_detail;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("network error: {0}")]
    Transport(String),
    #[error("{detail}")]
    Rejected { status: u16, detail: String },
    #[error("unexpected response: {0}")]
    Malformed(String),
    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: i64,
    pub name: String,
    pub email: String,
}

/// Bearer token plus the account it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub token: String,
    pub user: AuthUser,
}

#[derive(Debug, Deserialize)]
struct MessageBody {
    message: String,
}

#[derive(Serialize)]
struct LoginBody<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct SignupBody<'a> {
    name: &'a str,
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct ForgotBody<'a> {
    email: &'a str,
}

#[derive(Serialize)]
struct ResetBody<'a> {
    token: &'a str,
    new_password: &'a str,
}

pub struct AuthClient {
    api: ApiConfig,
    client: reqwest::Client,
}

impl AuthClient {
    pub fn new(api: ApiConfig) -> Result<Self, AuthError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| AuthError::Transport(err.to_string()))?;
        Ok(Self { api, client })
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        engine_info!("Login request for {}", email);
        self.post_json("/auth/login", &LoginBody { email, password })
            .await
    }

    pub async fn signup(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, AuthError> {
        engine_info!("Signup request for {}", email);
        self.post_json(
            "/auth/signup",
            &SignupBody {
                name,
                email,
                password,
            },
        )
        .await
    }

    /// Returns the server's confirmation message.
    pub async fn forgot_password(&self, email: &str) -> Result<String, AuthError> {
        let body: MessageBody = self
            .post_json("/auth/forgot-password", &ForgotBody { email })
            .await?;
        Ok(body.message)
    }

    pub async fn reset_password(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<String, AuthError> {
        let body: MessageBody = self
            .post_json("/auth/reset-password", &ResetBody {
                token,
                new_password,
            })
            .await?;
        Ok(body.message)
    }

    async fn post_json<B, T>(&self, endpoint: &str, body: &B) -> Result<T, AuthError>
    where
        B: Serialize + ?Sized,
        T: for<'de> Deserialize<'de>,
    {
        let url = self
            .api
            .endpoint_url(endpoint, None)
            .map_err(|err| AuthError::InvalidUrl(err.to_string()))?;
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|err| AuthError::Transport(err.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|err| AuthError::Malformed(err.to_string()))?;

        if !status.is_success() {
            let detail = parse_error_detail(&text).unwrap_or_else(|| "Request failed".to_string());
            engine_warn!("{} rejected with {}: {}", endpoint, status, detail);
            return Err(AuthError::Rejected {
                status: status.as_u16(),
                detail,
            });
        }

        serde_json::from_str(&text).map_err(|err| AuthError::Malformed(err.to_string()))
    }
}
