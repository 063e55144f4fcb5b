//! Authentication strategies.
//!
//! [`Authenticator`] is chosen once from [`AuthSettings`] and installed as a
//! middleware over the file tree. Each variant either lets the request through
//! or produces the complete rejection response itself (challenge, JSON error,
//! or login redirect).

pub mod basic;
pub mod form;
pub mod secret;
pub mod token;

use std::fmt;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{HeaderMap, Uri};
use axum::middleware::Next;
use axum::response::Response;
use axum::Router;
use subtle::ConstantTimeEq;

use crate::config::{AuthMode, AuthSettings};
use crate::error::StartupError;

use self::basic::BasicAuth;
use self::form::FormAuth;
use self::token::TokenAuth;

pub enum Authenticator {
    None,
    Basic(BasicAuth),
    Token(TokenAuth),
    Form(Arc<FormAuth>),
}

/// The secret a strategy was configured with, for the startup banner only.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: Option<String>,
    pub secret: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl Authenticator {
    pub fn from_settings(settings: &AuthSettings) -> Result<Self, StartupError> {
        Ok(match settings.mode {
            AuthMode::None => Authenticator::None,
            AuthMode::Basic => Authenticator::Basic(BasicAuth::new(
                settings.username.clone(),
                settings.password.clone(),
            )),
            AuthMode::Token => Authenticator::Token(TokenAuth::new(settings.token.clone())),
            AuthMode::Form => Authenticator::Form(Arc::new(FormAuth::new(
                settings.username.clone(),
                settings.password.clone(),
            )?)),
        })
    }

    pub fn mode(&self) -> AuthMode {
        match self {
            Authenticator::None => AuthMode::None,
            Authenticator::Basic(_) => AuthMode::Basic,
            Authenticator::Token(_) => AuthMode::Token,
            Authenticator::Form(_) => AuthMode::Form,
        }
    }

    /// Only form authentication serves a login page.
    pub fn login_page_enabled(&self) -> bool {
        matches!(self, Authenticator::Form(_))
    }

    pub fn credentials(&self) -> Option<Credentials> {
        match self {
            Authenticator::None => None,
            Authenticator::Basic(b) => Some(Credentials {
                username: Some(b.username().to_string()),
                secret: b.password().to_string(),
            }),
            Authenticator::Token(t) => Some(Credentials {
                username: None,
                secret: t.token().to_string(),
            }),
            Authenticator::Form(f) => Some(Credentials {
                username: Some(f.username().to_string()),
                secret: f.password().to_string(),
            }),
        }
    }

    /// One-line summary for logs. Contains no secrets.
    pub fn describe(&self) -> String {
        match self {
            Authenticator::None => "no authentication".to_string(),
            Authenticator::Basic(b) => format!("HTTP Basic (user {})", b.username()),
            Authenticator::Token(_) => "token (query parameter or Authorization header)".to_string(),
            Authenticator::Form(f) => format!("form login at {} (user {})", form::LOGIN_PATH, f.username()),
        }
    }

    pub fn authenticate(&self, headers: &HeaderMap, uri: &Uri) -> Result<(), Response> {
        match self {
            Authenticator::None => Ok(()),
            Authenticator::Basic(b) => b.authenticate(headers),
            Authenticator::Token(t) => t.authenticate(headers, uri),
            Authenticator::Form(f) => f.authenticate(headers),
        }
    }

    /// Ungated routes the strategy needs, if any.
    pub fn routes(&self) -> Option<Router> {
        match self {
            Authenticator::Form(f) => Some(form::routes(Arc::clone(f))),
            _ => None,
        }
    }
}

/// Middleware gate for `from_fn_with_state`.
pub async fn require(State(auth): State<Arc<Authenticator>>, request: Request, next: Next) -> Response {
    match auth.authenticate(request.headers(), request.uri()) {
        Ok(()) => next.run(request).await,
        Err(denied) => denied,
    }
}

pub(crate) fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}
