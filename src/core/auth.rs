//! Auth backend client and the current session.
//!
//! The backend answers every auth call with a JSON `message`; a call only
//! succeeds when that message is the exact confirmation string.

use std::sync::{Arc, RwLock};

use reqwest::Client;
use serde_json::{json, Value};

use crate::shared::error::{AppError, AppResult};
use crate::shared::types::UserIdentity;

const LOGIN_OK: &str = "Login successful";
const SIGNUP_OK: &str = "Signup successful";
const GOOGLE_LOGIN_OK: &str = "Google Login successful";
const UNEXPECTED: &str = "An unexpected error occurred. Please try again.";

/// Who is signed in, shared across the app.
#[derive(Clone, Default)]
pub struct Session {
    user: Arc<RwLock<Option<UserIdentity>>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sign_in(&self, user: UserIdentity) {
        tracing::info!(user = %user.email, "[Session] signed in");
        match self.user.write() {
            Ok(mut guard) => *guard = Some(user),
            Err(poisoned) => *poisoned.into_inner() = Some(user),
        }
    }

    pub fn logout(&self) {
        match self.user.write() {
            Ok(mut guard) => *guard = None,
            Err(poisoned) => *poisoned.into_inner() = None,
        }
        tracing::info!("[Session] signed out");
    }

    pub fn current_user(&self) -> Option<UserIdentity> {
        match self.user.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.current_user().is_some()
    }
}

pub struct AuthClient {
    http: Client,
    base_url: String,
}

impl AuthClient {
    pub fn new(base_url: &str) -> AppResult<Self> {
        let http = Client::builder()
            .user_agent("plantcare-client/auth")
            .build()
            .map_err(|e| AppError::Network(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn login(&self, email: &str, password: &str) -> AppResult<UserIdentity> {
        let body = json!({ "email": email, "password": password });
        let (status, reply) = self.post("login", &body).await?;
        check_reply(status, &reply, LOGIN_OK, "message", "Login failed. Please try again.")?;
        Ok(UserIdentity::from_email(email))
    }

    pub async fn signup(&self, email: &str, password: &str) -> AppResult<UserIdentity> {
        let body = json!({ "email": email, "password": password });
        let (status, reply) = self.post("signup", &body).await?;
        check_reply(status, &reply, SIGNUP_OK, "message", "Signup failed. Please try again.")?;
        Ok(UserIdentity::from_email(email))
    }

    /// Exchange a Google ID-token credential for a session.
    pub async fn google_login(&self, credential: &str) -> AppResult<UserIdentity> {
        let body = json!({ "token": credential });
        let (status, reply) = self.post("google-login", &body).await?;
        check_reply(status, &reply, GOOGLE_LOGIN_OK, "error", "Google login failed. Please try again.")?;
        let email = reply
            .get("email")
            .and_then(|v| v.as_str())
            .ok_or_else(|| AppError::Auth(UNEXPECTED.to_string()))?;
        let mut user = UserIdentity::from_email(email);
        user.name = reply.get("name").and_then(|v| v.as_str()).map(str::to_string);
        user.picture = reply.get("picture").and_then(|v| v.as_str()).map(str::to_string);
        Ok(user)
    }

    async fn post(&self, path: &str, body: &Value) -> AppResult<(u16, Value)> {
        let url = format!("{}/{}", self.base_url, path);
        let response = self.http.post(&url).json(body).send().await.map_err(|e| {
            tracing::warn!("[Auth] request to {} failed: {}", url, e);
            AppError::Auth(UNEXPECTED.to_string())
        })?;
        let status = response.status().as_u16();
        let reply = response.json::<Value>().await.unwrap_or(Value::Null);
        Ok((status, reply))
    }
}

/// Map a backend reply to success or a user-facing `AppError::Auth`.
///
/// Error replies carry their message in `error_field`; when that is absent
/// the `fallback` is used.
fn check_reply(status: u16, reply: &Value, expected: &str, error_field: &str, fallback: &str) -> AppResult<()> {
    let success = (200..300).contains(&status);
    if success && reply.get("message").and_then(|v| v.as_str()) == Some(expected) {
        return Ok(());
    }
    if success {
        return Err(AppError::Auth(UNEXPECTED.to_string()));
    }
    let message = reply
        .get(error_field)
        .and_then(|v| v.as_str())
        .filter(|m| !m.is_empty())
        .unwrap_or(fallback);
    Err(AppError::Auth(message.to_string()))
}
