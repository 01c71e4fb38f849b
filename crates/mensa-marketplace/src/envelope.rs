//! Result envelope shared by both service entry points.
//!
//! Callers never see a raw error: every request resolves to an envelope
//! with a success flag, an optional typed payload, and response metadata.
//! Failure envelopes carry the error text (with its stable code) and the
//! `"error"` sentinel in place of collaborator labels.

use mensa_core::{CoreError, RequestId};
use serde::{Deserialize, Serialize};

use crate::router::ResponseData;

/// Sentinel placed in the collaborator list of failure envelopes.
pub const ERROR_SENTINEL: &str = "error";

/// Metadata attached to every envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseMeta {
    /// Identifier generated for this request.
    pub request_id: RequestId,
    /// Wall-clock processing time in milliseconds.
    pub duration_ms: u64,
    /// Declared collaborator labels, or the error sentinel.
    pub collaborators: Vec<String>,
    /// Whether the result was served from the cache.
    pub cache_hit: bool,
}

/// Structured result of one entry-point invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultEnvelope {
    /// Whether the request completed successfully.
    pub success: bool,
    /// Typed payload on success.
    pub data: Option<ResponseData>,
    /// Error message (with stable code) on failure.
    pub error: Option<String>,
    /// Response metadata, present on both paths.
    pub meta: ResponseMeta,
}

impl ResultEnvelope {
    /// Builds a success envelope.
    pub fn ok(
        data: ResponseData,
        request_id: RequestId,
        duration_ms: u64,
        collaborators: &[&str],
        cache_hit: bool,
    ) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            meta: ResponseMeta {
                request_id,
                duration_ms,
                collaborators: collaborators.iter().map(|c| c.to_string()).collect(),
                cache_hit,
            },
        }
    }

    /// Builds a failure envelope from an error.
    pub fn failure(error: &CoreError, request_id: RequestId, duration_ms: u64) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.to_string()),
            meta: ResponseMeta {
                request_id,
                duration_ms,
                collaborators: vec![ERROR_SENTINEL.to_string()],
                cache_hit: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_envelope_carries_sentinel_and_code() {
        let envelope =
            ResultEnvelope::failure(&CoreError::capacity(100, 100), RequestId::new(), 3);

        assert!(!envelope.success);
        assert!(envelope.data.is_none());
        assert!(envelope.error.as_deref().unwrap().contains("[M1003]"));
        assert_eq!(envelope.meta.collaborators, vec![ERROR_SENTINEL.to_string()]);
        assert!(!envelope.meta.cache_hit);
    }
}
