//! Model-serving endpoint collaborator
//!
//! The session loop talks to the endpoint through the `ReplyFetcher` trait;
//! the production implementation wraps an OpenAI-style `responses` API as
//! exposed by hosted serving platforms.

mod config;
mod serving;

pub use config::{ServingConfig, TokenSource};
pub use serving::ServingClient;

use crate::reply::RawModelReply;
use crate::session::ConversationTurn;
use async_trait::async_trait;
use thiserror::Error;

/// Capability that turns a conversation into a structured reply.
///
/// `auth_override` carries a caller-forwarded access token, which takes
/// precedence over the configured token source for that one call.
#[async_trait]
pub trait ReplyFetcher: Send + Sync {
    async fn fetch_reply(
        &self,
        turns: &[ConversationTurn],
        auth_override: Option<&str>,
    ) -> Result<RawModelReply, EndpointError>;
}

/// Endpoint error with classification.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct EndpointError {
    pub kind: EndpointErrorKind,
    pub message: String,
}

impl EndpointError {
    pub fn new(kind: EndpointErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(EndpointErrorKind::Auth, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(EndpointErrorKind::Network, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(EndpointErrorKind::Unknown, message)
    }

    /// Classify an HTTP status from the serving endpoint.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let kind = match status {
            401 => EndpointErrorKind::Auth,
            403 => EndpointErrorKind::Permission,
            404 => EndpointErrorKind::NotFound,
            429 => EndpointErrorKind::RateLimit,
            400 => EndpointErrorKind::InvalidRequest,
            500..=599 => EndpointErrorKind::Server,
            _ => EndpointErrorKind::Unknown,
        };
        Self::new(kind, message)
    }

    /// The user-visible diagnostic for this failure, categorized by cause.
    pub fn user_message(&self) -> String {
        match self.kind {
            EndpointErrorKind::Auth => {
                "The request to the model endpoint failed: authentication was rejected. \
                 Check the configured serving token or OAuth credentials."
                    .to_string()
            }
            EndpointErrorKind::Permission => {
                "The request to the model endpoint failed: the credentials do not have \
                 permission to query this endpoint."
                    .to_string()
            }
            EndpointErrorKind::NotFound => {
                "The request to the model endpoint failed: the endpoint was not found. \
                 Check the serving base URL and endpoint name."
                    .to_string()
            }
            EndpointErrorKind::RateLimit
            | EndpointErrorKind::Server
            | EndpointErrorKind::Network
            | EndpointErrorKind::InvalidRequest
            | EndpointErrorKind::Unknown => {
                format!("The request to the model endpoint failed: {}", self.message)
            }
        }
    }
}

/// Failure categories for endpoint calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointErrorKind {
    /// Authentication failed (401) or no credentials configured
    Auth,
    /// Authenticated but not allowed (403)
    Permission,
    /// Endpoint name or URL wrong (404)
    NotFound,
    /// Rate limited (429)
    RateLimit,
    /// Server error (5xx)
    Server,
    /// Network issues, timeouts
    Network,
    /// Bad request (400)
    InvalidRequest,
    /// Unknown error
    Unknown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert_eq!(
            EndpointError::from_status(401, "x").kind,
            EndpointErrorKind::Auth
        );
        assert_eq!(
            EndpointError::from_status(403, "x").kind,
            EndpointErrorKind::Permission
        );
        assert_eq!(
            EndpointError::from_status(404, "x").kind,
            EndpointErrorKind::NotFound
        );
        assert_eq!(
            EndpointError::from_status(429, "x").kind,
            EndpointErrorKind::RateLimit
        );
        assert_eq!(
            EndpointError::from_status(400, "x").kind,
            EndpointErrorKind::InvalidRequest
        );
        assert_eq!(
            EndpointError::from_status(503, "x").kind,
            EndpointErrorKind::Server
        );
        assert_eq!(
            EndpointError::from_status(302, "x").kind,
            EndpointErrorKind::Unknown
        );
    }

    #[test]
    fn test_user_message_categories() {
        assert!(EndpointError::from_status(401, "denied")
            .user_message()
            .contains("authentication"));
        assert!(EndpointError::from_status(403, "denied")
            .user_message()
            .contains("permission"));
        assert!(EndpointError::from_status(404, "missing")
            .user_message()
            .contains("not found"));
        // Generic failures carry the underlying message.
        assert!(EndpointError::network("connection refused")
            .user_message()
            .contains("connection refused"));
    }
}
