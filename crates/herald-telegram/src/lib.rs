//! Herald Telegram Relay
//!
//! Event-to-message translation for the Telegram Bot API: payload-type
//! dispatch, word-boundary chunking of oversized content, ordered
//! multi-chunk delivery, and per-send failure accounting.

pub mod api;
pub mod chunk;
pub mod dispatch;
pub mod error;
pub mod field;
pub mod media;
pub mod payload;

pub use api::{BotApi, SendOutcome};
pub use chunk::split_chunks;
pub use dispatch::{DispatchReport, Dispatcher, LongMessagePolicy};
pub use error::RelayError;
pub use field::FieldKind;
pub use media::{HttpMediaFetcher, MediaFetcher, MediaHandle};
pub use payload::ResolvedPayload;

/// Telegram's limit for a single text message, in characters.
pub const TEXT_LIMIT: usize = 4096;

/// Telegram's limit for a media caption, in characters.
pub const CAPTION_LIMIT: usize = 200;
