//! Cookie session helpers: signed-in identity, the page to return to after
//! signing in, and one-shot flash messages.

use crate::domain::user::User;
use crate::infrastructure::config::SessionSettings;
use crate::presentation::handlers::{AppError, AppState};
use actix_session::config::CookieContentSecurity;
use actix_session::storage::CookieSessionStore;
use actix_session::{Session, SessionExt, SessionMiddleware};
use actix_web::cookie::{Key, SameSite};
use actix_web::http::Method;
use actix_web::{FromRequest, HttpRequest, dev::Payload, web};
use serde::{Deserialize, Serialize};
use std::future::{Ready, ready};
use std::pin::Pin;
use tracing::{debug, warn};

const USER_ID_KEY: &str = "user_id";
const RETURN_TO_KEY: &str = "return_to";
const FLASH_KEY: &str = "flash";

pub const SIGN_IN_PATH: &str = "/users/sign_in";
pub const SIGN_IN_REQUIRED: &str = "You need to sign in or sign up before continuing.";

/// Builds the cookie session layer. Cookie contents are encrypted with `key`.
pub fn session_middleware(
    settings: &SessionSettings,
    key: Key,
) -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), key)
        .cookie_name(settings.cookie_name.clone())
        .cookie_path("/".to_string())
        .cookie_secure(settings.cookie_secure)
        .cookie_http_only(true)
        .cookie_same_site(SameSite::Lax)
        .cookie_content_security(CookieContentSecurity::Private)
        .build()
}

/// Derives the session key from the configured secret, or generates a
/// throwaway one (sessions then do not survive a restart).
pub fn session_key(settings: &SessionSettings) -> Key {
    match &settings.secret {
        Some(secret) => Key::derive_from(secret),
        None => {
            warn!("SESSION_SECRET not set, using an ephemeral session key");
            Key::generate()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Notice,
    Alert,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}

impl Flash {
    pub fn notice(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Notice,
            message: message.into(),
        }
    }

    pub fn alert(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Alert,
            message: message.into(),
        }
    }
}

/// Wraps the actix session so handlers deal in users and flashes, not keys.
#[derive(Clone)]
pub struct SessionContext(Session);

impl SessionContext {
    pub fn new(session: Session) -> Self {
        Self(session)
    }

    pub fn user_id(&self) -> Result<Option<String>, AppError> {
        self.0
            .get::<String>(USER_ID_KEY)
            .map_err(|e| AppError::Internal(format!("Failed to read session: {}", e)))
    }

    /// Stores the identity under a fresh session id.
    pub fn sign_in(&self, user: &User) -> Result<(), AppError> {
        self.0.renew();
        self.0
            .insert(USER_ID_KEY, &user.id)
            .map_err(|e| AppError::Internal(format!("Failed to persist session: {}", e)))
    }

    pub fn sign_out(&self) {
        self.0.remove(USER_ID_KEY);
        self.0.remove(RETURN_TO_KEY);
        self.0.renew();
    }

    pub fn remember_return_to(&self, path: &str) -> Result<(), AppError> {
        self.0
            .insert(RETURN_TO_KEY, path)
            .map_err(|e| AppError::Internal(format!("Failed to persist session: {}", e)))
    }

    pub fn take_return_to(&self) -> Option<String> {
        self.0.remove_as::<String>(RETURN_TO_KEY).and_then(Result::ok)
    }

    pub fn set_flash(&self, flash: Flash) -> Result<(), AppError> {
        self.0
            .insert(FLASH_KEY, flash)
            .map_err(|e| AppError::Internal(format!("Failed to persist session: {}", e)))
    }

    /// Flashes are shown once.
    pub fn take_flash(&self) -> Option<Flash> {
        self.0.remove_as::<Flash>(FLASH_KEY).and_then(Result::ok)
    }

    /// Resolves the signed-in user. A session pointing at a user that no
    /// longer exists is cleared and treated as signed out.
    pub async fn current_user(&self, state: &AppState) -> Result<Option<User>, AppError> {
        let Some(user_id) = self.user_id()? else {
            return Ok(None);
        };
        match state.auth.find_user(&user_id).await? {
            Some(user) => Ok(Some(user)),
            None => {
                warn!(user_id = %user_id, "Session refers to an unknown user");
                self.sign_out();
                Ok(None)
            }
        }
    }
}

impl FromRequest for SessionContext {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Ok(SessionContext::new(req.get_session())))
    }
}

/// Extractor for handlers that need a signed-in user. Signed-out requests are
/// answered with a redirect to the sign-in page; GET paths are remembered so
/// the user lands back there after signing in.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl FromRequest for CurrentUser {
    type Error = AppError;
    type Future = Pin<Box<dyn std::future::Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let session = SessionContext::new(req.get_session());
        let state = req.app_data::<web::Data<AppState>>().cloned();
        let return_to = (*req.method() == Method::GET).then(|| req.uri().to_string());

        Box::pin(async move {
            let state =
                state.ok_or_else(|| AppError::Internal("Application state missing".to_string()))?;
            if let Some(user) = session.current_user(&state).await? {
                return Ok(CurrentUser(user));
            }

            debug!(return_to = ?return_to, "Sign-in required");
            if let Some(path) = return_to {
                session.remember_return_to(&path)?;
            }
            session.set_flash(Flash::alert(SIGN_IN_REQUIRED))?;
            Err(AppError::SignInRequired)
        })
    }
}

/// Only relative paths are followed after sign-in.
pub fn safe_return_path(path: Option<String>) -> String {
    match path {
        Some(p) if p.starts_with('/') && !p.starts_with("//") => p,
        _ => "/".to_string(),
    }
}
