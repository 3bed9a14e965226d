//! Batch dispatcher: resolves each event's fields, applies the long-message
//! policy, and drives ordered sends with per-send failure accounting.

use crate::api::BotApi;
use crate::chunk::split_chunks;
use crate::error::RelayError;
use crate::field::FieldKind;
use crate::media::{MediaFetcher, MediaHandle};
use crate::payload::{self, ResolvedPayload};
use crate::{CAPTION_LIMIT, TEXT_LIMIT};
use herald_event::{Event, ValueResolver};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, warn};

/// Oversized-content handling mode, read through the resolver per event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LongMessagePolicy {
    Split,
    Truncate,
}

impl LongMessagePolicy {
    /// Only the exact value `split` enables segmentation; anything else,
    /// including nothing, truncates.
    pub fn from_value(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("split") => LongMessagePolicy::Split,
            _ => LongMessagePolicy::Truncate,
        }
    }
}

/// Per-event outcome: how many field kinds reached a send attempt, plus the
/// diagnostics collected along the way. Zero attempts is the only
/// event-level failure.
#[derive(Debug)]
pub struct DispatchReport {
    pub event_id: String,
    pub fields_attempted: usize,
    pub errors: Vec<RelayError>,
}

impl DispatchReport {
    pub fn succeeded(&self) -> bool {
        self.fields_attempted > 0
    }
}

pub struct Dispatcher<F> {
    api: BotApi,
    fetcher: F,
    resolver: Arc<dyn ValueResolver>,
}

impl<F: MediaFetcher> Dispatcher<F> {
    pub fn new(api: BotApi, fetcher: F, resolver: Arc<dyn ValueResolver>) -> Self {
        Self {
            api,
            fetcher,
            resolver,
        }
    }

    /// Processes a batch of events strictly in order. Events are independent:
    /// every failure is contained at the smallest scope and reported in that
    /// event's [`DispatchReport`], never aborting the batch.
    pub async fn process(&self, events: &[Event]) -> Vec<DispatchReport> {
        let mut reports = Vec::with_capacity(events.len());
        for event in events {
            reports.push(self.process_event(event).await);
        }
        reports
    }

    async fn process_event(&self, event: &Event) -> DispatchReport {
        let mut report = DispatchReport {
            event_id: event.id.clone(),
            fields_attempted: 0,
            errors: Vec::new(),
        };

        let chat_id = self
            .resolver
            .resolve(event, "chat_id")
            .unwrap_or_default();
        let policy = LongMessagePolicy::from_value(
            self.resolver.resolve(event, "long_message").as_deref(),
        );

        for kind in FieldKind::ALL {
            match payload::resolve(event, kind, &self.fetcher).await {
                Ok(None) => continue,
                Ok(Some(ResolvedPayload::Text(text))) => {
                    self.send_text_field(&chat_id, &text, policy, &mut report)
                        .await;
                    report.fields_attempted += 1;
                }
                Ok(Some(ResolvedPayload::Media(handle))) => {
                    self.send_media_field(event, kind, &chat_id, handle, policy, &mut report)
                        .await;
                    report.fields_attempted += 1;
                }
                Err(err) => {
                    warn!(event = %event.id, "{}", err);
                    report.errors.push(err);
                }
            }
        }

        if report.fields_attempted == 0 {
            let err = RelayError::NoApplicableField {
                event_id: event.id.clone(),
                payload: Value::Object(event.payload.clone()).to_string(),
            };
            error!("{}", err);
            report.errors.push(err);
        }

        report
    }

    async fn send_text_field(
        &self,
        chat_id: &str,
        text: &str,
        policy: LongMessagePolicy,
        report: &mut DispatchReport,
    ) {
        match policy {
            LongMessagePolicy::Split => {
                for chunk in split_chunks(text, TEXT_LIMIT) {
                    self.deliver_text(chat_id, &chunk, report).await;
                }
            }
            LongMessagePolicy::Truncate => {
                let truncated: String = text.chars().take(TEXT_LIMIT).collect();
                self.deliver_text(chat_id, &truncated, report).await;
            }
        }
    }

    /// Sends one upload for the kind. A split caption travels as its first
    /// chunk on the upload and as plain text messages for the rest; the
    /// binary content itself goes out exactly once either way.
    async fn send_media_field(
        &self,
        event: &Event,
        kind: FieldKind,
        chat_id: &str,
        handle: MediaHandle,
        policy: LongMessagePolicy,
        report: &mut DispatchReport,
    ) {
        let caption = event.field("caption").map(|c| c.trim().to_string());

        let (first, rest) = match (caption, policy) {
            (Some(caption), LongMessagePolicy::Split) => {
                let mut chunks = split_chunks(&caption, CAPTION_LIMIT);
                if chunks.is_empty() {
                    (None, Vec::new())
                } else {
                    let first = chunks.remove(0);
                    (Some(first), chunks)
                }
            }
            (Some(caption), LongMessagePolicy::Truncate) => {
                let truncated: String = caption.chars().take(CAPTION_LIMIT).collect();
                (Some(truncated), Vec::new())
            }
            (None, _) => (None, Vec::new()),
        };

        match self
            .api
            .send_media(kind, chat_id, &handle, first.as_deref())
            .await
        {
            Ok(outcome) if outcome.ok => {}
            Ok(outcome) => {
                let err = RelayError::Rejected {
                    method: kind.api_method(),
                    body: outcome.raw,
                };
                warn!(event = %event.id, "{}", err);
                report.errors.push(err);
            }
            Err(err) => {
                warn!(event = %event.id, "{}", err);
                report.errors.push(err);
            }
        }

        // The upload is done, drop the temp file before the caption tail.
        if let Err(err) = handle.release() {
            warn!("failed to remove media temp file: {}", err);
        }

        for chunk in rest {
            self.deliver_text(chat_id, &chunk, report).await;
        }
    }

    async fn deliver_text(&self, chat_id: &str, text: &str, report: &mut DispatchReport) {
        match self.api.send_text(chat_id, text).await {
            Ok(outcome) if outcome.ok => {}
            Ok(outcome) => {
                let err = RelayError::Rejected {
                    method: FieldKind::Text.api_method(),
                    body: outcome.raw,
                };
                warn!("{}", err);
                report.errors.push(err);
            }
            Err(err) => {
                warn!("{}", err);
                report.errors.push(err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use serde_json::json;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use wiremock::{matchers, Mock, MockServer, ResponseTemplate};

    struct TestResolver {
        chat_id: String,
        long_message: Option<String>,
    }

    impl ValueResolver for TestResolver {
        fn resolve(&self, _event: &Event, key: &str) -> Option<String> {
            match key {
                "chat_id" => Some(self.chat_id.clone()),
                "long_message" => self.long_message.clone(),
                _ => None,
            }
        }
    }

    #[derive(Default)]
    struct StubFetcher {
        staged_paths: Mutex<Vec<PathBuf>>,
    }

    #[async_trait]
    impl MediaFetcher for StubFetcher {
        async fn fetch(&self, url: &str) -> anyhow::Result<MediaHandle> {
            let handle = MediaHandle::from_bytes(url, b"stub-bytes")?;
            self.staged_paths
                .lock()
                .expect("lock")
                .push(handle.path().to_path_buf());
            Ok(handle)
        }
    }

    struct FailingFetcher;

    #[async_trait]
    impl MediaFetcher for FailingFetcher {
        async fn fetch(&self, _url: &str) -> anyhow::Result<MediaHandle> {
            Err(anyhow!("connection refused"))
        }
    }

    fn event_with(payload: serde_json::Value) -> Event {
        Event::new(payload.as_object().expect("object").clone())
    }

    fn dispatcher<F: MediaFetcher>(
        server: &MockServer,
        policy: Option<&str>,
        fetcher: F,
    ) -> Dispatcher<F> {
        let api = BotApi::new("123456:TESTTOKEN").with_api_base(&server.uri());
        let resolver = Arc::new(TestResolver {
            chat_id: "42".to_string(),
            long_message: policy.map(str::to_string),
        });
        Dispatcher::new(api, fetcher, resolver)
    }

    async fn mount_ok(server: &MockServer) {
        Mock::given(matchers::method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"{"ok":true,"result":{}}"#),
            )
            .mount(server)
            .await;
    }

    fn text_of(request: &wiremock::Request) -> String {
        let body: Value = serde_json::from_slice(&request.body).expect("json body");
        body["text"].as_str().expect("text param").to_string()
    }

    #[tokio::test]
    async fn event_without_sendable_fields_reports_once_and_sends_nothing() {
        let server = MockServer::start().await;
        mount_ok(&server).await;

        let event = event_with(json!({ "text": "  ", "subject": "ignored" }));
        let reports = dispatcher(&server, Some("split"), StubFetcher::default())
            .process(&[event])
            .await;

        assert_eq!(reports.len(), 1);
        assert!(!reports[0].succeeded());
        assert_eq!(reports[0].errors.len(), 1);
        assert!(matches!(
            reports[0].errors[0],
            RelayError::NoApplicableField { .. }
        ));
        assert!(server.received_requests().await.expect("requests").is_empty());
    }

    #[tokio::test]
    async fn split_policy_sends_ordered_bounded_text_chunks() {
        let server = MockServer::start().await;
        mount_ok(&server).await;

        let text = "lorem ipsum dolor sit amet ".repeat(334); // ~9000 chars
        let event = event_with(json!({ "text": text }));
        let reports = dispatcher(&server, Some("split"), StubFetcher::default())
            .process(&[event])
            .await;

        assert_eq!(reports[0].fields_attempted, 1);
        assert!(reports[0].errors.is_empty());

        let requests = server.received_requests().await.expect("requests");
        assert!(requests.len() >= 3);

        let sent: Vec<String> = requests.iter().map(text_of).collect();
        assert!(sent.iter().all(|t| t.chars().count() <= TEXT_LIMIT));
        let rejoined: Vec<&str> = sent
            .iter()
            .flat_map(|t| t.split_whitespace())
            .collect();
        let original: Vec<&str> = text.split_whitespace().collect();
        assert_eq!(rejoined, original);
    }

    #[tokio::test]
    async fn truncate_policy_sends_exactly_the_first_4096_chars() {
        let server = MockServer::start().await;
        mount_ok(&server).await;

        let text: String = (0..5000)
            .map(|i| char::from_digit((i % 10) as u32, 10).expect("digit"))
            .collect();
        let event = event_with(json!({ "text": text }));
        let reports = dispatcher(&server, None, StubFetcher::default())
            .process(&[event])
            .await;

        assert_eq!(reports[0].fields_attempted, 1);
        let requests = server.received_requests().await.expect("requests");
        assert_eq!(requests.len(), 1);
        let expected: String = text.chars().take(TEXT_LIMIT).collect();
        assert_eq!(text_of(&requests[0]), expected);
    }

    #[tokio::test]
    async fn long_caption_rides_the_upload_then_continues_as_text() {
        let server = MockServer::start().await;
        mount_ok(&server).await;

        let caption = "caption words keep going ".repeat(20); // ~500 chars
        let event = event_with(json!({
            "photo": "https://files.example/cat.jpg",
            "caption": caption,
        }));
        let reports = dispatcher(&server, Some("split"), StubFetcher::default())
            .process(&[event])
            .await;

        assert_eq!(reports[0].fields_attempted, 1);
        assert!(reports[0].errors.is_empty());

        let requests = server.received_requests().await.expect("requests");
        let photo_count = requests
            .iter()
            .filter(|r| r.url.path().ends_with("/sendPhoto"))
            .count();
        assert_eq!(photo_count, 1, "binary content must be sent exactly once");
        assert!(
            requests[0].url.path().ends_with("/sendPhoto"),
            "upload goes first"
        );

        let mut chunks = split_chunks(caption.trim(), CAPTION_LIMIT);
        assert!(chunks.len() >= 2);
        let first = chunks.remove(0);
        assert!(first.chars().count() <= CAPTION_LIMIT);
        let upload_body = String::from_utf8_lossy(&requests[0].body).to_string();
        assert!(upload_body.contains(&first));

        let tail: Vec<String> = requests[1..].iter().map(text_of).collect();
        assert_eq!(tail, chunks);
    }

    #[tokio::test]
    async fn short_caption_produces_no_text_tail() {
        let server = MockServer::start().await;
        mount_ok(&server).await;

        let event = event_with(json!({
            "document": "https://files.example/report.pdf",
            "caption": "quarterly report",
        }));
        dispatcher(&server, Some("split"), StubFetcher::default())
            .process(&[event])
            .await;

        let requests = server.received_requests().await.expect("requests");
        assert_eq!(requests.len(), 1);
        assert!(requests[0].url.path().ends_with("/sendDocument"));
    }

    #[tokio::test]
    async fn rejected_send_is_logged_but_the_field_still_counts() {
        let server = MockServer::start().await;
        let body = r#"{"ok":false,"error_code":403,"description":"Forbidden"}"#;
        Mock::given(matchers::method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let event = event_with(json!({ "text": "hello" }));
        let reports = dispatcher(&server, None, StubFetcher::default())
            .process(&[event])
            .await;

        assert_eq!(reports[0].fields_attempted, 1);
        assert!(reports[0].succeeded());
        assert!(matches!(
            &reports[0].errors[0],
            RelayError::Rejected { body: raw, .. } if raw.contains("Forbidden")
        ));
    }

    #[tokio::test]
    async fn fetch_failure_skips_the_kind_but_not_the_event() {
        let server = MockServer::start().await;
        mount_ok(&server).await;

        let event = event_with(json!({
            "text": "still goes out",
            "photo": "https://files.example/gone.jpg",
        }));
        let reports = dispatcher(&server, None, FailingFetcher)
            .process(&[event])
            .await;

        assert_eq!(reports[0].fields_attempted, 1);
        assert!(matches!(
            reports[0].errors[0],
            RelayError::Resolution {
                kind: FieldKind::Photo,
                ..
            }
        ));

        let requests = server.received_requests().await.expect("requests");
        assert_eq!(requests.len(), 1);
        assert_eq!(text_of(&requests[0]), "still goes out");
    }

    #[tokio::test]
    async fn media_temp_file_is_released_after_the_send() {
        let server = MockServer::start().await;
        mount_ok(&server).await;

        let fetcher = StubFetcher::default();
        let event = event_with(json!({ "video": "https://files.example/clip.mp4" }));

        let api = BotApi::new("123456:TESTTOKEN").with_api_base(&server.uri());
        let resolver = Arc::new(TestResolver {
            chat_id: "42".to_string(),
            long_message: None,
        });
        let dispatcher = Dispatcher::new(api, fetcher, resolver);
        dispatcher.process(&[event]).await;

        let staged = dispatcher.fetcher.staged_paths.lock().expect("lock");
        assert_eq!(staged.len(), 1);
        assert!(!staged[0].exists(), "temp file must be gone after dispatch");
    }

    #[tokio::test]
    async fn events_are_processed_independently_and_in_order() {
        let server = MockServer::start().await;
        mount_ok(&server).await;

        let events = vec![
            event_with(json!({})),
            event_with(json!({ "text": "first" })),
            event_with(json!({ "text": "second" })),
        ];
        let reports = dispatcher(&server, None, StubFetcher::default())
            .process(&events)
            .await;

        assert!(!reports[0].succeeded());
        assert!(reports[1].succeeded() && reports[2].succeeded());

        let requests = server.received_requests().await.expect("requests");
        let sent: Vec<String> = requests.iter().map(text_of).collect();
        assert_eq!(sent, vec!["first".to_string(), "second".to_string()]);
    }

    #[test]
    fn policy_recognizes_only_the_split_value() {
        assert_eq!(
            LongMessagePolicy::from_value(Some("split")),
            LongMessagePolicy::Split
        );
        assert_eq!(
            LongMessagePolicy::from_value(Some(" split ")),
            LongMessagePolicy::Split
        );
        assert_eq!(
            LongMessagePolicy::from_value(Some("truncate")),
            LongMessagePolicy::Truncate
        );
        assert_eq!(
            LongMessagePolicy::from_value(Some("anything")),
            LongMessagePolicy::Truncate
        );
        assert_eq!(
            LongMessagePolicy::from_value(None),
            LongMessagePolicy::Truncate
        );
    }
}
