//! Chat sessions and the turn loop
//!
//! A session owns an append-only conversation history. Sending a message
//! appends the user turn, forwards the whole history to the injected reply
//! fetcher, formats the flattened reply into render segments, and appends
//! the assistant turn. Clearing a session resets the history wholesale.

use crate::endpoint::ReplyFetcher;
use crate::format::{format_reply, RenderSegment};
use crate::reply::flatten_reply;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Speaker of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One turn of a conversation, in the wire shape the serving endpoint
/// expects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// An in-memory chat session.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub id: String,
    pub turns: Vec<ConversationTurn>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    fn new(id: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            turns: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Result of processing one user turn.
#[derive(Debug)]
pub struct TurnOutput {
    /// Renderable segments of the assistant reply.
    pub segments: Vec<RenderSegment>,
    /// Text recorded as the assistant turn.
    pub assistant_text: String,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(String),
}

/// Owner of all live sessions. The reply fetcher is injected so the session
/// loop stays decoupled from endpoint authentication concerns.
pub struct SessionManager {
    fetcher: Arc<dyn ReplyFetcher>,
    sessions: Mutex<HashMap<String, Session>>,
}

impl SessionManager {
    pub fn new(fetcher: Arc<dyn ReplyFetcher>) -> Self {
        Self {
            fetcher,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn create(&self) -> Session {
        let id = uuid::Uuid::new_v4().to_string();
        let session = Session::new(id.clone());
        self.lock().insert(id, session.clone());
        session
    }

    pub fn get(&self, id: &str) -> Result<Session, SessionError> {
        self.lock()
            .get(id)
            .cloned()
            .ok_or_else(|| SessionError::NotFound(id.to_string()))
    }

    /// All sessions, most recently updated first.
    pub fn list(&self) -> Vec<Session> {
        let mut sessions: Vec<Session> = self.lock().values().cloned().collect();
        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        sessions
    }

    /// Reset a session's history wholesale.
    pub fn clear(&self, id: &str) -> Result<(), SessionError> {
        let mut sessions = self.lock();
        let session = sessions
            .get_mut(id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        session.turns.clear();
        session.updated_at = Utc::now();
        Ok(())
    }

    pub fn remove(&self, id: &str) -> Result<(), SessionError> {
        self.lock()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| SessionError::NotFound(id.to_string()))
    }

    /// Process one user turn: append it, fetch and format the reply, append
    /// the assistant turn.
    ///
    /// Endpoint failures do not fail the turn; they surface as a diagnostic
    /// paragraph recorded in history like any other assistant reply. Only an
    /// unknown session id is an error.
    pub async fn send_message(
        &self,
        id: &str,
        text: &str,
        auth_override: Option<&str>,
    ) -> Result<TurnOutput, SessionError> {
        // Snapshot the history under the lock; the fetch is awaited outside
        // it so other sessions keep moving.
        let turns = {
            let mut sessions = self.lock();
            let session = sessions
                .get_mut(id)
                .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
            session.turns.push(ConversationTurn::user(text));
            session.updated_at = Utc::now();
            session.turns.clone()
        };

        let output = match self.fetcher.fetch_reply(&turns, auth_override).await {
            Ok(reply) => {
                let flattened = flatten_reply(&reply);
                if flattened.is_empty() {
                    tracing::info!(session_id = %id, "Endpoint returned an empty reply");
                }
                TurnOutput {
                    segments: format_reply(&flattened),
                    assistant_text: flattened,
                }
            }
            Err(e) => {
                tracing::warn!(session_id = %id, kind = ?e.kind, error = %e, "Endpoint call failed");
                let diagnostic = e.user_message();
                TurnOutput {
                    segments: vec![RenderSegment::Paragraph {
                        text: diagnostic.clone(),
                    }],
                    assistant_text: diagnostic,
                }
            }
        };

        let mut sessions = self.lock();
        if let Some(session) = sessions.get_mut(id) {
            session
                .turns
                .push(ConversationTurn::assistant(output.assistant_text.clone()));
            session.updated_at = Utc::now();
        }

        Ok(output)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Session>> {
        match self.sessions.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::{EndpointError, EndpointErrorKind};
    use crate::reply::{RawModelReply, ReplyContent, ReplyOutput};
    use async_trait::async_trait;

    struct StubFetcher {
        reply: Result<String, EndpointErrorKind>,
    }

    impl StubFetcher {
        fn text(text: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(text.to_string()),
            })
        }

        fn failing(kind: EndpointErrorKind) -> Arc<Self> {
            Arc::new(Self { reply: Err(kind) })
        }
    }

    #[async_trait]
    impl ReplyFetcher for StubFetcher {
        async fn fetch_reply(
            &self,
            _turns: &[ConversationTurn],
            _auth_override: Option<&str>,
        ) -> Result<RawModelReply, EndpointError> {
            match &self.reply {
                Ok(text) => Ok(RawModelReply {
                    output: vec![ReplyOutput {
                        content: vec![ReplyContent {
                            text: Some(text.clone()),
                        }],
                    }],
                }),
                Err(kind) => Err(EndpointError::new(*kind, "stub failure")),
            }
        }
    }

    #[tokio::test]
    async fn test_send_message_appends_both_turns() {
        let manager = SessionManager::new(StubFetcher::text("Attrition is stable."));
        let session = manager.create();

        let output = manager
            .send_message(&session.id, "How is attrition?", None)
            .await
            .unwrap();

        assert_eq!(output.assistant_text, "Attrition is stable.");
        let session = manager.get(&session.id).unwrap();
        assert_eq!(session.turns.len(), 2);
        assert_eq!(session.turns[0].role, Role::User);
        assert_eq!(session.turns[0].content, "How is attrition?");
        assert_eq!(session.turns[1].role, Role::Assistant);
        assert_eq!(session.turns[1].content, "Attrition is stable.");
    }

    #[tokio::test]
    async fn test_fetch_failure_becomes_diagnostic_paragraph() {
        let manager = SessionManager::new(StubFetcher::failing(EndpointErrorKind::Auth));
        let session = manager.create();

        let output = manager.send_message(&session.id, "hi", None).await.unwrap();

        assert_eq!(output.segments.len(), 1);
        match &output.segments[0] {
            RenderSegment::Paragraph { text } => {
                assert!(text.contains("authentication"), "got: {text}");
            }
            other => panic!("expected paragraph, got {other:?}"),
        }
        // The diagnostic is recorded as the assistant turn.
        let session = manager.get(&session.id).unwrap();
        assert_eq!(session.turns.len(), 2);
        assert_eq!(session.turns[1].content, output.assistant_text);
    }

    #[tokio::test]
    async fn test_clear_resets_history_wholesale() {
        let manager = SessionManager::new(StubFetcher::text("ok then"));
        let session = manager.create();
        manager.send_message(&session.id, "hi", None).await.unwrap();

        manager.clear(&session.id).unwrap();
        let session = manager.get(&session.id).unwrap();
        assert!(session.turns.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_session_is_an_error() {
        let manager = SessionManager::new(StubFetcher::text("x"));
        let err = manager.send_message("nope", "hi", None).await.unwrap_err();
        assert!(matches!(err, SessionError::NotFound(_)));
        assert!(manager.get("nope").is_err());
        assert!(manager.clear("nope").is_err());
        assert!(manager.remove("nope").is_err());
    }

    #[tokio::test]
    async fn test_list_orders_by_recency() {
        let manager = SessionManager::new(StubFetcher::text("reply here"));
        let first = manager.create();
        let second = manager.create();
        manager.send_message(&first.id, "bump", None).await.unwrap();

        let listed = manager.list();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, first.id);
        assert_eq!(listed[1].id, second.id);
    }
}
