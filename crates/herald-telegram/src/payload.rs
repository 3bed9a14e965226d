//! Per-field payload resolution: absent, text, or staged binary content.

use crate::error::RelayError;
use crate::field::FieldKind;
use crate::media::{MediaFetcher, MediaHandle};
use herald_event::Event;

/// A field's content, ready to send. The tagged split makes temp-file
/// cleanup an explicit branch in the dispatcher rather than a runtime type
/// test.
#[derive(Debug)]
pub enum ResolvedPayload {
    Text(String),
    Media(MediaHandle),
}

/// Resolves one field kind from an event.
///
/// Text yields the raw field value; binary kinds treat the value as a URL
/// and fetch it into a temp handle owned by the caller. Blank or missing
/// values are absent. A failed fetch is fatal for this field only.
pub async fn resolve<F>(
    event: &Event,
    kind: FieldKind,
    fetcher: &F,
) -> Result<Option<ResolvedPayload>, RelayError>
where
    F: MediaFetcher + ?Sized,
{
    let value = match event.field(kind.field_name()) {
        Some(value) => value,
        None => return Ok(None),
    };

    if !kind.is_media() {
        return Ok(Some(ResolvedPayload::Text(value.to_string())));
    }

    let handle = fetcher
        .fetch(value.trim())
        .await
        .map_err(|reason| RelayError::Resolution { kind, reason })?;
    Ok(Some(ResolvedPayload::Media(handle)))
}
