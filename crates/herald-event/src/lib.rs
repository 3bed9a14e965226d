//! Herald Event Model
//!
//! Shared notification event record and per-event value resolution

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

fn generate_event_id() -> String {
    Uuid::new_v4().to_string()
}

/// A notification event as delivered by an upstream source.
///
/// The payload is a flat mapping of named fields to values; the relay only
/// reads it, ownership stays with the producer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    #[serde(default = "generate_event_id")]
    pub id: String,
    #[serde(default)]
    pub payload: Map<String, Value>,
}

impl Event {
    pub fn new(payload: Map<String, Value>) -> Self {
        Self {
            id: generate_event_id(),
            payload,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// String value of a payload field. Missing, non-string, and
    /// blank/whitespace-only values all read as absent.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.payload
            .get(name)
            .and_then(Value::as_str)
            .filter(|value| !value.trim().is_empty())
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parses a newline-delimited JSON event stream. Blank lines are skipped.
    pub fn from_ndjson(input: &str) -> anyhow::Result<Vec<Event>> {
        let mut events = Vec::new();
        for (number, line) in input.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let event = Event::from_json(line)
                .with_context(|| format!("invalid event on line {}", number + 1))?;
            events.push(event);
        }
        Ok(events)
    }
}

/// Per-event lookup of named configuration values.
///
/// Supplied by the surrounding system; implementations may interpolate
/// event fields into configured templates. The relay core only ever calls
/// this, it never interpolates on its own.
pub trait ValueResolver: Send + Sync {
    fn resolve(&self, event: &Event, key: &str) -> Option<String>;
}
