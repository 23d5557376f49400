//! Shared cursor pagination helpers.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct PostCursorPayload {
    published_at: OffsetDateTime,
    id: Uuid,
}

/// Keyset cursor for post listings ordered by publish time, newest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostCursor {
    published_at: OffsetDateTime,
    id: Uuid,
}

impl PostCursor {
    pub fn new(published_at: OffsetDateTime, id: Uuid) -> Self {
        Self { published_at, id }
    }

    pub fn published_at(&self) -> OffsetDateTime {
        self.published_at
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn encode(&self) -> String {
        let payload = PostCursorPayload {
            published_at: self.published_at,
            id: self.id,
        };
        let serialized =
            serde_json::to_vec(&payload).expect("serializing post cursor payload should succeed");
        URL_SAFE_NO_PAD.encode(serialized)
    }

    pub fn decode(cursor: &str) -> Result<Self, PaginationError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(cursor)
            .map_err(|err| PaginationError::InvalidCursor(err.to_string()))?;
        let payload: PostCursorPayload = serde_json::from_slice(&bytes)
            .map_err(|err| PaginationError::InvalidCursor(err.to_string()))?;
        Ok(Self {
            published_at: payload.published_at,
            id: payload.id,
        })
    }
}

/// Cursor-aware pagination request.
#[derive(Debug, Clone, Copy)]
pub struct PageRequest<C> {
    pub limit: u32,
    pub cursor: Option<C>,
}

impl<C> PageRequest<C> {
    pub fn new(limit: u32, cursor: Option<C>) -> Self {
        Self { limit, cursor }
    }
}

/// Cursor-aware page result.
#[derive(Debug, Clone, Serialize)]
pub struct CursorPage<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
}

impl<T> CursorPage<T> {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            next_cursor: None,
        }
    }

    pub fn new(items: Vec<T>, next_cursor: Option<String>) -> Self {
        Self { items, next_cursor }
    }
}

#[derive(Debug, Error)]
pub enum PaginationError {
    #[error("invalid cursor: {0}")]
    InvalidCursor(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_cursor_round_trip() {
        let id = Uuid::new_v4();
        let when = OffsetDateTime::now_utc();
        let cursor = PostCursor::new(when, id);
        let encoded = cursor.encode();
        let decoded = PostCursor::decode(&encoded).expect("decoded cursor");

        assert_eq!(decoded.id(), id);
        assert_eq!(decoded.published_at(), when);
    }

    #[test]
    fn decoding_invalid_cursor_reports_error() {
        let err = PostCursor::decode("not-base64").expect_err("invalid cursor rejected");
        assert!(matches!(err, PaginationError::InvalidCursor(_)));
    }
}
