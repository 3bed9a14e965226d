//! Bot API client: one outbound request per logical send, `ok`-envelope
//! interpretation, no retry.

use crate::error::RelayError;
use crate::field::FieldKind;
use crate::media::MediaHandle;
use reqwest::multipart;
use reqwest::{Client, ClientBuilder};
use serde::Deserialize;
use std::time::Duration;

/// Outcome of a single send: the `ok` marker plus the raw response body,
/// kept for diagnostics when the marker is missing or false.
#[derive(Debug, Clone)]
pub struct SendOutcome {
    pub ok: bool,
    pub raw: String,
}

#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    #[serde(default)]
    ok: bool,
}

pub struct BotApi {
    client: Client,
    bot_token: String,
    api_url: String,
}

impl BotApi {
    pub fn new(bot_token: &str) -> Self {
        Self {
            client: Self::build_client(),
            bot_token: bot_token.to_string(),
            api_url: format!("https://api.telegram.org/bot{}", bot_token),
        }
    }

    /// Points the client at a different Bot API host, keeping the
    /// `/bot<token>` path shape. Used by tests and self-hosted API servers.
    pub fn with_api_base(mut self, base: &str) -> Self {
        self.api_url = format!("{}/bot{}", base.trim_end_matches('/'), self.bot_token);
        self
    }

    fn build_client() -> Client {
        ClientBuilder::new()
            .pool_idle_timeout(Duration::from_secs(600))
            .tcp_keepalive(Some(Duration::from_secs(30)))
            .timeout(Duration::from_secs(180))
            .connect_timeout(Duration::from_secs(30))
            .build()
            .expect("failed to build HTTP client")
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{}", self.api_url, method)
    }

    /// Sends one text message.
    pub async fn send_text(&self, chat_id: &str, text: &str) -> Result<SendOutcome, RelayError> {
        let method = FieldKind::Text.api_method();
        let payload = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
        });

        let response = self
            .client
            .post(self.method_url(method))
            .json(&payload)
            .send()
            .await
            .map_err(|source| RelayError::Transport { method, source })?;

        Self::interpret(method, response).await
    }

    /// Uploads one binary payload with an optional caption.
    pub async fn send_media(
        &self,
        kind: FieldKind,
        chat_id: &str,
        media: &MediaHandle,
        caption: Option<&str>,
    ) -> Result<SendOutcome, RelayError> {
        let method = kind.api_method();
        let bytes = tokio::fs::read(media.path())
            .await
            .map_err(|source| RelayError::MediaRead { method, source })?;

        let part = multipart::Part::bytes(bytes).file_name(media.file_name().to_string());
        let mut form = multipart::Form::new()
            .text("chat_id", chat_id.to_string())
            .part(kind.field_name().to_string(), part);
        if let Some(caption) = caption {
            form = form.text("caption", caption.to_string());
        }

        let response = self
            .client
            .post(self.method_url(method))
            .multipart(form)
            .send()
            .await
            .map_err(|source| RelayError::Transport { method, source })?;

        Self::interpret(method, response).await
    }

    /// Credential check: whether the token authenticates against the API.
    pub async fn get_me(&self) -> Result<bool, RelayError> {
        let method = "getMe";
        let response = self
            .client
            .post(self.method_url(method))
            .send()
            .await
            .map_err(|source| RelayError::Transport { method, source })?;

        Ok(Self::interpret(method, response).await?.ok)
    }

    // Anything without a parseable `ok: true` counts as failure, whatever
    // else the body says.
    async fn interpret(
        method: &'static str,
        response: reqwest::Response,
    ) -> Result<SendOutcome, RelayError> {
        let raw = response
            .text()
            .await
            .map_err(|source| RelayError::Transport { method, source })?;
        let ok = serde_json::from_str::<ApiEnvelope>(&raw)
            .map(|envelope| envelope.ok)
            .unwrap_or(false);
        Ok(SendOutcome { ok, raw })
    }
}
