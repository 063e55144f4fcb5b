//! Error types for startup and for the per-request pipeline.
//!
//! Startup errors are fatal and bubble up to `main`. Everything that can go
//! wrong while answering a request is funnelled into [`ServeError`], which is
//! converted into a plain-text HTTP response at the request boundary.

use std::io;
use std::net::SocketAddr;
use std::string::FromUtf8Error;

use axum::{
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{error, info};

/// Fatal errors raised while building or starting the server.
#[derive(Debug, Error)]
pub enum StartupError {
    /// Bad served root, unloadable default theme, or similar.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Every port in the probe range refused to bind.
    #[error("no available port in {min}-{max}")]
    NoAvailablePort { min: u16, max: u16 },

    /// The real bind after port discovery failed.
    #[error("failed to bind {addr}: {source}")]
    Bind { addr: SocketAddr, source: io::Error },

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Outcome of mapping a request path onto the served root.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The path (or its symlink target) escapes the served root.
    #[error("forbidden: {path} ({reason})")]
    Forbidden { path: String, reason: &'static str },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Failures while turning a [`crate::listing::ListingPage`] into a body.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("theme '{theme}' failed to render template '{template}': {source}")]
    Template {
        theme: &'static str,
        template: String,
        #[source]
        source: tera::Error,
    },

    #[error("json listing failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("json listing is not utf-8: {0}")]
    Utf8(#[from] FromUtf8Error),
}

/// Every way a single request can fail once it reaches the file tree.
#[derive(Debug, Error)]
pub enum ServeError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// A directory was requested, it has no `index.html`, and listings are off.
    #[error("directory listing disabled: {0}")]
    ListingDisabled(String),

    #[error("method {0} not allowed")]
    MethodNotAllowed(Method),

    #[error("request exceeded its deadline")]
    Timeout,

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl ServeError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServeError::Resolve(ResolveError::Forbidden { .. }) => StatusCode::FORBIDDEN,
            ServeError::Resolve(ResolveError::NotFound(_)) => StatusCode::NOT_FOUND,
            ServeError::Resolve(ResolveError::Io(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ServeError::ListingDisabled(_) => StatusCode::FORBIDDEN,
            ServeError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            ServeError::Timeout => StatusCode::REQUEST_TIMEOUT,
            ServeError::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServeError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing body. Never includes the underlying error text.
    fn public_message(&self) -> &'static str {
        match self.status_code() {
            StatusCode::FORBIDDEN => "403 Forbidden",
            StatusCode::NOT_FOUND => "404 Not Found",
            StatusCode::METHOD_NOT_ALLOWED => "405 Method Not Allowed",
            StatusCode::REQUEST_TIMEOUT => "408 Request Timeout",
            _ => "500 Internal Server Error",
        }
    }
}

impl IntoResponse for ServeError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "request failed");
        } else {
            info!(status = status.as_u16(), error = %self, "request denied");
        }
        let mut response = (
            status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            self.public_message(),
        )
            .into_response();
        if let ServeError::MethodNotAllowed(_) = self {
            response
                .headers_mut()
                .insert(header::ALLOW, header::HeaderValue::from_static("GET, HEAD"));
        }
        response
    }
}
