//! Supported payload field kinds and their Bot API method mapping.

use std::fmt;

/// The five content categories an event payload may populate, in the fixed
/// order they are processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Text,
    Photo,
    Audio,
    Document,
    Video,
}

impl FieldKind {
    pub const ALL: [FieldKind; 5] = [
        FieldKind::Text,
        FieldKind::Photo,
        FieldKind::Audio,
        FieldKind::Document,
        FieldKind::Video,
    ];

    /// Payload field name, also the multipart parameter name on upload.
    pub fn field_name(self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Photo => "photo",
            FieldKind::Audio => "audio",
            FieldKind::Document => "document",
            FieldKind::Video => "video",
        }
    }

    /// Bot API method that delivers this kind of content.
    pub fn api_method(self) -> &'static str {
        match self {
            FieldKind::Text => "sendMessage",
            FieldKind::Photo => "sendPhoto",
            FieldKind::Audio => "sendAudio",
            FieldKind::Document => "sendDocument",
            FieldKind::Video => "sendVideo",
        }
    }

    pub fn is_media(self) -> bool {
        self != FieldKind::Text
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}
