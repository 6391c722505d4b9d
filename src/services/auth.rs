use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};

use crate::errors::{CheckoutError, TransportError};
use crate::logging::redact;
use crate::models::user::{LoginCredentials, LoginResponse, UserProfile};
use crate::services::api_client::{ApiClient, ApiResponse};
use crate::services::checkout::TokenProvider;

const LOGIN_PATH: &str = "/api/users/login";
const PROFILE_PATH: &str = "/api/users/profile";
const SESSION_EXPIRED: &str = "Your session has expired";

fn failure_message(response: &ApiResponse) -> String {
    response
        .message()
        .unwrap_or_else(|| format!("request failed with status {}", response.status.as_u16()))
}

/// Signed-in user and bearer token for the merchant backend.
///
/// The token is dropped whenever the backend rejects it.
pub struct AuthSession {
    api: ApiClient,
    token: RwLock<Option<String>>,
    user: RwLock<Option<UserProfile>>,
    last_error: RwLock<Option<String>>,
}

impl AuthSession {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            token: RwLock::new(None),
            user: RwLock::new(None),
            last_error: RwLock::new(None),
        }
    }

    /// Restores a session from a previously stored token
    pub fn with_token(api: ApiClient, token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
            ..Self::new(api)
        }
    }

    pub async fn token(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    pub async fn current_user(&self) -> Option<UserProfile> {
        self.user.read().await.clone()
    }

    pub async fn last_error(&self) -> Option<String> {
        self.last_error.read().await.clone()
    }

    pub async fn is_admin(&self) -> bool {
        self.user
            .read()
            .await
            .as_ref()
            .map_or(false, UserProfile::is_admin)
    }

    #[instrument(skip(self, credentials), fields(email = %credentials.email))]
    pub async fn login(&self, credentials: &LoginCredentials) -> Result<UserProfile, CheckoutError> {
        *self.last_error.write().await = None;

        let response = self
            .api
            .post(LOGIN_PATH, credentials, None, None, &[])
            .await
            .map_err(|err| match err {
                TransportError::Unauthorized(message) => CheckoutError::Auth(
                    message.unwrap_or_else(|| "Invalid email or password".to_string()),
                ),
                other => CheckoutError::from_transport("login", other, CheckoutError::Auth),
            });

        let result = match response {
            Ok(response) if response.is_success() => match response.json::<LoginResponse>() {
                Ok(LoginResponse { user: None, .. }) => Err(CheckoutError::Auth(
                    "server returned no user data".to_string(),
                )),
                Ok(LoginResponse { token: None, .. }) => Err(CheckoutError::Auth(
                    "server returned no session token".to_string(),
                )),
                Ok(LoginResponse {
                    token: Some(token),
                    user: Some(user),
                }) => Ok((token, user)),
                Err(err) => Err(CheckoutError::Auth(format!(
                    "could not read login response: {}",
                    err
                ))),
            },
            Ok(response) => Err(CheckoutError::Auth(failure_message(&response))),
            Err(err) => Err(err),
        };

        match result {
            Ok((token, user)) => {
                info!("User signed in with session token {}", redact(&token));
                *self.token.write().await = Some(token);
                *self.user.write().await = Some(user.clone());
                Ok(user)
            }
            Err(err) => {
                warn!("Login failed: {}", err);
                *self.last_error.write().await = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// Reloads the profile for the stored token. A rejected token is cleared.
    #[instrument(skip(self))]
    pub async fn check_auth(&self) -> Result<Option<UserProfile>, CheckoutError> {
        let Some(token) = self.token().await else {
            return Ok(None);
        };

        let failure = match self.api.get(PROFILE_PATH, Some(&token), None).await {
            Ok(response) if response.is_success() => match response.json::<UserProfile>() {
                Ok(profile) => {
                    *self.user.write().await = Some(profile.clone());
                    return Ok(Some(profile));
                }
                Err(err) => {
                    warn!("Unreadable profile response: {}", err);
                    SESSION_EXPIRED.to_string()
                }
            },
            Ok(response) => response.message().unwrap_or_else(|| SESSION_EXPIRED.to_string()),
            Err(TransportError::Unauthorized(message)) => {
                message.unwrap_or_else(|| SESSION_EXPIRED.to_string())
            }
            Err(TransportError::Request(msg)) => {
                warn!("Profile request failed: {}", msg);
                SESSION_EXPIRED.to_string()
            }
            Err(_) => SESSION_EXPIRED.to_string(),
        };

        warn!("Stored session rejected: {}", failure);
        self.logout().await;
        *self.last_error.write().await = Some(failure.clone());
        Err(CheckoutError::Auth(failure))
    }

    pub async fn logout(&self) {
        *self.token.write().await = None;
        *self.user.write().await = None;
    }
}

#[async_trait]
impl TokenProvider for AuthSession {
    async fn bearer_token(&self) -> Option<String> {
        self.token().await
    }

    async fn invalidate(&self) {
        info!("Clearing rejected session token");
        self.logout().await;
    }
}
