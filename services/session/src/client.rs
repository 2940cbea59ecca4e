//! Typed client for the storefront authentication API

use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::config::ApiConfig;
use crate::error::{SessionError, SessionResult};
use crate::models::{
    AccountActivation, ApiErrorBody, EmailRequest, EmailResetConfirm, LoginCredentials,
    LoginResponse, NewUser, PasswordResetConfirm, RefreshRequest, RefreshedTokens, User,
    VerifyRequest,
};

/// API paths, relative to the configured base URL
pub mod paths {
    pub const VERIFY: &str = "/api/auth/jwt/verify/";
    pub const REFRESH: &str = "/api/auth/jwt/refresh/";
    pub const CREATE: &str = "/api/auth/jwt/create/";
    pub const ME: &str = "/api/auth/users/me/";
    pub const USERS: &str = "/api/auth/users/";
    pub const ACTIVATION: &str = "/api/auth/users/activation/";
    pub const RESET_PASSWORD: &str = "/api/auth/users/reset_password/";
    pub const RESET_PASSWORD_CONFIRM: &str = "/api/auth/users/reset_password_confirm/";
    pub const RESET_EMAIL: &str = "/api/auth/users/reset_email/";
    pub const RESET_EMAIL_CONFIRM: &str = "/api/auth/users/reset_email_confirm/";
}

/// HTTP client for the token, profile and account endpoints
#[derive(Clone)]
pub struct AuthApi {
    http: Client,
    config: ApiConfig,
}

impl AuthApi {
    /// Build a client with the configured timeouts
    pub fn new(config: ApiConfig) -> SessionResult<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(config.connect_timeout())
            .build()?;

        Ok(Self { http, config })
    }

    /// Ask the API whether `token` is still valid
    pub async fn verify(&self, token: &str) -> SessionResult<()> {
        let body: Value = self
            .post_for_body(
                paths::VERIFY,
                &VerifyRequest {
                    token: token.to_string(),
                },
            )
            .await?;

        reject_invalid_token(&body)
    }

    /// Exchange a refresh token for a new access token (and possibly a rotated refresh token)
    pub async fn refresh(&self, refresh: &str) -> SessionResult<RefreshedTokens> {
        let body: Value = self
            .post_for_body(
                paths::REFRESH,
                &RefreshRequest {
                    refresh: refresh.to_string(),
                },
            )
            .await?;

        reject_invalid_token(&body)?;
        Ok(serde_json::from_value(body)?)
    }

    /// Exchange credentials for a token pair
    pub async fn login(&self, credentials: &LoginCredentials) -> SessionResult<LoginResponse> {
        let body: Value = self.post_for_body(paths::CREATE, credentials).await?;
        Ok(serde_json::from_value(body)?)
    }

    /// Fetch the profile of the user `access` belongs to
    pub async fn profile(&self, access: &str) -> SessionResult<User> {
        debug!("GET {}", paths::ME);

        let response = self
            .http
            .get(self.config.endpoint(paths::ME))
            .header(ACCEPT, "application/json")
            .header(AUTHORIZATION, self.authorization(access))
            .send()
            .await?;

        let body: Value = check(response).await?.json().await?;
        Ok(serde_json::from_value(body)?)
    }

    /// Register a new account
    pub async fn create_user(&self, new_user: &NewUser) -> SessionResult<()> {
        self.post(paths::USERS, new_user).await
    }

    /// Activate an account with the uid/token pair from the activation email
    pub async fn activate(&self, activation: &AccountActivation) -> SessionResult<()> {
        self.post(paths::ACTIVATION, activation).await
    }

    /// Trigger a password reset email
    pub async fn reset_password(&self, email: &str) -> SessionResult<()> {
        self.post(
            paths::RESET_PASSWORD,
            &EmailRequest {
                email: email.to_string(),
            },
        )
        .await
    }

    /// Apply a new password using the uid/token pair from the reset email
    pub async fn reset_password_confirm(&self, confirm: &PasswordResetConfirm) -> SessionResult<()> {
        self.post(paths::RESET_PASSWORD_CONFIRM, confirm).await
    }

    /// Trigger an email reset message
    pub async fn reset_email(&self, email: &str) -> SessionResult<()> {
        self.post(
            paths::RESET_EMAIL,
            &EmailRequest {
                email: email.to_string(),
            },
        )
        .await
    }

    /// Apply a new account email using the uid/token pair from the reset message
    pub async fn reset_email_confirm(&self, confirm: &EmailResetConfirm) -> SessionResult<()> {
        self.post(paths::RESET_EMAIL_CONFIRM, confirm).await
    }

    fn authorization(&self, access: &str) -> String {
        format!("{} {}", self.config.auth_header_type, access)
    }

    async fn send<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> SessionResult<Response> {
        debug!("POST {}", path);

        let response = self
            .http
            .post(self.config.endpoint(path))
            .header(ACCEPT, "application/json")
            .json(body)
            .send()
            .await?;

        check(response).await
    }

    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> SessionResult<()> {
        self.send(path, body).await?;
        Ok(())
    }

    async fn post_for_body<B, T>(&self, path: &str, body: &B) -> SessionResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned + Default,
    {
        let response = self.send(path, body).await?;
        let bytes = response.bytes().await?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(T::default());
        }
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Turn a non-success response into an error, classifying invalid-token bodies
async fn check(response: Response) -> SessionResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body: ApiErrorBody = response.json().await.unwrap_or_default();
    debug!(
        "Request rejected with status {}: {}",
        status,
        body.detail.as_deref().unwrap_or("no detail")
    );

    if body.is_token_not_valid() {
        Err(SessionError::InvalidToken)
    } else {
        Err(SessionError::Rejected { status })
    }
}

/// Some deployments answer 2xx with an invalid-token code in the body
fn reject_invalid_token(body: &Value) -> SessionResult<()> {
    let invalid = body
        .get("code")
        .and_then(Value::as_str)
        .is_some_and(|code| code == crate::models::token::TOKEN_NOT_VALID);

    if invalid {
        Err(SessionError::InvalidToken)
    } else {
        Ok(())
    }
}
