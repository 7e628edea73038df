//! API request and response types

use crate::format::{display_cell, RenderSegment};
use crate::session::{ConversationTurn, Session};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Request to send a chat message
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub text: String,
}

/// Response for a chat turn: the formatted reply plus the full history so
/// the client can re-render the whole conversation.
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub segments: Vec<RenderSegment>,
    pub turns: Vec<ConversationTurn>,
}

/// Response with a single session
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session: Session,
}

/// Response with a list of sessions
#[derive(Debug, Serialize)]
pub struct SessionListResponse {
    pub sessions: Vec<SessionSummary>,
}

/// Session listing entry
#[derive(Debug, Serialize)]
pub struct SessionSummary {
    pub id: String,
    pub turn_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Session> for SessionSummary {
    fn from(session: &Session) -> Self {
        Self {
            id: session.id.clone(),
            turn_count: session.turns.len(),
            created_at: session.created_at,
            updated_at: session.updated_at,
        }
    }
}

/// Response for lifecycle actions
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

/// Prepare a segment for the wire: blank and placeholder table cells render
/// as the em-dash fallback glyph.
pub fn present_segment(segment: RenderSegment) -> RenderSegment {
    match segment {
        RenderSegment::Table { header, rows } => RenderSegment::Table {
            header,
            rows: rows
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|cell| display_cell(cell).to_string())
                        .collect()
                })
                .collect(),
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_present_segment_replaces_placeholder_cells() {
        let segment = RenderSegment::Table {
            header: vec!["A".to_string(), "B".to_string()],
            rows: vec![vec!["nan".to_string(), "42".to_string()]],
        };
        match present_segment(segment) {
            RenderSegment::Table { rows, .. } => {
                assert_eq!(rows[0], vec!["\u{2014}", "42"]);
            }
            other => panic!("expected table, got {other:?}"),
        }
    }

    #[test]
    fn test_present_segment_leaves_paragraphs_alone() {
        let segment = RenderSegment::Paragraph {
            text: "nan".to_string(),
        };
        assert_eq!(present_segment(segment.clone()), segment);
    }

    #[test]
    fn test_chat_response_wire_shape() {
        let response = ChatResponse {
            segments: vec![RenderSegment::Paragraph {
                text: "hello".to_string(),
            }],
            turns: vec![ConversationTurn::user("hi")],
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["segments"][0]["type"], "paragraph");
        assert_eq!(json["turns"][0]["role"], "user");
    }
}
