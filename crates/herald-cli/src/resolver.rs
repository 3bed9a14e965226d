//! Config-backed value resolution with `{{ field }}` interpolation.
//!
//! The relay core asks for named values per event; this implementation
//! serves them from configuration, substituting event payload fields into
//! `{{ field }}` templates. Interpolation stays on this side of the seam.

use herald_config::TelegramConfig;
use herald_event::{Event, ValueResolver};
use std::collections::HashMap;

pub struct ConfigResolver {
    values: HashMap<String, String>,
}

impl ConfigResolver {
    pub fn from_config(config: &TelegramConfig) -> Self {
        let mut values = HashMap::new();
        values.insert("chat_id".to_string(), config.chat_id.clone());
        if let Some(long_message) = &config.long_message {
            values.insert("long_message".to_string(), long_message.clone());
        }
        Self { values }
    }

    fn interpolate(template: &str, event: &Event) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(open) = rest.find("{{") {
            out.push_str(&rest[..open]);
            let after = &rest[open + 2..];
            match after.find("}}") {
                Some(close) => {
                    let key = after[..close].trim();
                    if let Some(value) = event.field(key) {
                        out.push_str(value);
                    }
                    rest = &after[close + 2..];
                }
                None => {
                    // Unterminated template, keep the text as-is.
                    out.push_str(&rest[open..]);
                    rest = "";
                }
            }
        }
        out.push_str(rest);
        out
    }
}

impl ValueResolver for ConfigResolver {
    fn resolve(&self, event: &Event, key: &str) -> Option<String> {
        self.values
            .get(key)
            .map(|template| Self::interpolate(template, event))
    }
}
