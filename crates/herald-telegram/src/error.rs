//! Relay error kinds. All of these are contained at the smallest possible
//! scope by the dispatcher; none aborts batch processing.

use crate::field::FieldKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    /// Fetching a binary payload failed; the field kind is skipped, other
    /// kinds still run.
    #[error("resolving {kind} payload failed: {reason}")]
    Resolution {
        kind: FieldKind,
        reason: anyhow::Error,
    },

    /// The Bot API answered without `ok: true`; the raw response body is
    /// kept for diagnostics.
    #[error("telegram {method} rejected the request: {body}")]
    Rejected { method: &'static str, body: String },

    /// The request never produced a response.
    #[error("telegram {method} request failed: {source}")]
    Transport {
        method: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// A fetched media file disappeared or could not be read back for upload.
    #[error("reading media payload for {method} failed: {source}")]
    MediaRead {
        method: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// No field kind produced sendable content; the only event-level error.
    #[error("event {event_id} has no sendable field: {payload}")]
    NoApplicableField { event_id: String, payload: String },
}
