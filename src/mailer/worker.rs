use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::templates::{self, EmailType};
use super::transport::{MailTransport, OutboundEmail};

/// One change record from the outbox stream. `new_image` carries either a
/// base64-encoded `payload` field or legacy flat fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeRecord {
    #[serde(default)]
    pub event_id: String,
    #[serde(alias = "eventName")]
    pub event_name: String,
    #[serde(default, alias = "newImage")]
    pub new_image: Map<String, Value>,
}

/// Decoded recipient lists plus the template inputs.
#[derive(Debug, Clone, Deserialize)]
struct EmailPayload {
    #[serde(rename = "type")]
    email_type: String,
    #[serde(default, deserialize_with = "de_recipients")]
    to: Vec<String>,
    #[serde(default, deserialize_with = "de_recipients")]
    cc: Vec<String>,
    #[serde(default, deserialize_with = "de_recipients")]
    bcc: Vec<String>,
    #[serde(default, deserialize_with = "de_recipients")]
    reply_to: Vec<String>,
    #[serde(default)]
    data: Value,
}

fn de_recipients<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(normalize_recipients(&value))
}

/// Accepts a comma-separated string, an array of strings, or a single scalar.
fn normalize_recipients(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
        Value::Null => Vec::new(),
        other => vec![other.to_string()],
    }
}

/// Per-record outcome. `processed` is false for skipped (non-insert) records
/// and for failures; failures also carry an error message.
#[derive(Debug, Clone, Serialize)]
pub struct RecordResult {
    pub index: usize,
    pub processed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub received: usize,
    pub processed: usize,
    pub results: Vec<RecordResult>,
}

/// Build a change record carrying a base64 payload, the shape the worker
/// prefers when decoding. Handlers enqueue these.
pub fn change_record(email_type: EmailType, to: &[String], data: Value) -> ChangeRecord {
    let payload = json!({
        "type": email_type.as_str(),
        "to": to,
        "data": data,
    });
    let encoded = base64::engine::general_purpose::STANDARD.encode(payload.to_string());

    let mut new_image = Map::new();
    new_image.insert("payload".to_string(), Value::String(encoded));

    ChangeRecord {
        event_id: uuid::Uuid::new_v4().to_string(),
        event_name: "INSERT".to_string(),
        new_image,
    }
}

fn flat_field(image: &Map<String, Value>, aliases: &[&str]) -> Option<Value> {
    aliases
        .iter()
        .find_map(|key| image.get(*key))
        .filter(|v| !v.is_null())
        .cloned()
}

/// Decode a record's image into a payload. Prefers the base64 `payload`
/// field; falls back to legacy flat fields with their alias lists.
fn decode_payload(image: &Map<String, Value>) -> Result<EmailPayload, String> {
    if let Some(encoded) = image.get("payload").and_then(Value::as_str) {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| format!("invalid base64 payload: {e}"))?;
        return serde_json::from_slice(&bytes).map_err(|e| format!("invalid payload JSON: {e}"));
    }

    let email_type = flat_field(image, &["type", "email_type", "emailType"])
        .and_then(|v| v.as_str().map(String::from))
        .ok_or_else(|| "record has neither payload nor type field".to_string())?;

    let to = flat_field(image, &["to", "recipient", "recipients", "email"])
        .map(|v| normalize_recipients(&v))
        .unwrap_or_default();
    let cc = flat_field(image, &["cc"])
        .map(|v| normalize_recipients(&v))
        .unwrap_or_default();
    let bcc = flat_field(image, &["bcc"])
        .map(|v| normalize_recipients(&v))
        .unwrap_or_default();
    let reply_to = flat_field(image, &["reply_to", "replyTo"])
        .map(|v| normalize_recipients(&v))
        .unwrap_or_default();
    let data = flat_field(image, &["data", "payload_data"]).unwrap_or(Value::Null);

    Ok(EmailPayload {
        email_type,
        to,
        cc,
        bcc,
        reply_to,
        data,
    })
}

async fn process_record(
    record: &ChangeRecord,
    transport: &dyn MailTransport,
) -> Result<(), String> {
    let payload = decode_payload(&record.new_image)?;

    let email_type = EmailType::parse(&payload.email_type)
        .ok_or_else(|| format!("unknown email type: {}", payload.email_type))?;

    if payload.to.is_empty() {
        return Err("no recipients".to_string());
    }

    let rendered = templates::render(email_type, &payload.data);
    let message = OutboundEmail {
        to: payload.to,
        cc: payload.cc,
        bcc: payload.bcc,
        reply_to: payload.reply_to,
        subject: rendered.subject,
        text: rendered.text,
        html: rendered.html,
    };

    let message_id = transport.send(&message).await.map_err(|e| e.to_string())?;
    tracing::info!(
        event_id = %record.event_id,
        message_id = %message_id,
        email_type = email_type.as_str(),
        "email dispatched"
    );
    Ok(())
}

/// Process a batch of change records. Each record succeeds or fails on its
/// own; a failure never aborts the rest of the batch. Non-INSERT records are
/// skipped without error.
pub async fn process_batch(
    records: &[ChangeRecord],
    transport: &dyn MailTransport,
) -> BatchSummary {
    let mut results = Vec::with_capacity(records.len());
    let mut processed = 0;

    for (index, record) in records.iter().enumerate() {
        if record.event_name != "INSERT" {
            results.push(RecordResult {
                index,
                processed: false,
                error: None,
            });
            continue;
        }

        match process_record(record, transport).await {
            Ok(()) => {
                processed += 1;
                results.push(RecordResult {
                    index,
                    processed: true,
                    error: None,
                });
            }
            Err(message) => {
                tracing::warn!(event_id = %record.event_id, error = %message, "email record failed");
                results.push(RecordResult {
                    index,
                    processed: false,
                    error: Some(message),
                });
            }
        }
    }

    BatchSummary {
        received: records.len(),
        processed,
        results,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailer::transport::MailError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records every message; fails sends whose subject contains a marker.
    struct RecordingTransport {
        sent: Mutex<Vec<OutboundEmail>>,
        fail_marker: Option<String>,
    }

    impl RecordingTransport {
        fn new() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail_marker: None,
            }
        }

        fn failing_on(marker: &str) -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail_marker: Some(marker.to_string()),
            }
        }
    }

    #[async_trait]
    impl MailTransport for RecordingTransport {
        async fn send(&self, message: &OutboundEmail) -> Result<String, MailError> {
            if let Some(marker) = &self.fail_marker {
                if message.subject.contains(marker) {
                    return Err(MailError::Rejected("simulated".to_string()));
                }
            }
            self.sent.lock().unwrap().push(message.clone());
            Ok("msg-1".to_string())
        }
    }

    fn flat_record(event_name: &str, image: Value) -> ChangeRecord {
        ChangeRecord {
            event_id: "evt-1".to_string(),
            event_name: event_name.to_string(),
            new_image: image.as_object().cloned().unwrap_or_default(),
        }
    }

    #[tokio::test]
    async fn failure_does_not_abort_batch() {
        let records = vec![
            change_record(
                EmailType::PasswordEmail,
                &["a@example.com".to_string()],
                json!({"user_email": "a@example.com", "password": "p1"}),
            ),
            flat_record("INSERT", json!({"type": "bogus_type", "to": "b@example.com"})),
            change_record(
                EmailType::PasswordEmail,
                &["c@example.com".to_string()],
                json!({"user_email": "c@example.com", "password": "p3"}),
            ),
        ];

        let transport = RecordingTransport::new();
        let summary = process_batch(&records, &transport).await;

        assert_eq!(summary.received, 3);
        assert_eq!(summary.processed, 2);
        assert!(summary.results[0].processed);
        assert!(!summary.results[1].processed);
        assert!(summary.results[1]
            .error
            .as_deref()
            .unwrap()
            .contains("unknown email type"));
        assert!(summary.results[2].processed);
        assert_eq!(transport.sent.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn decodes_base64_payload() {
        let record = change_record(
            EmailType::ForgotPassword,
            &["user@example.com".to_string()],
            json!({"email": "user@example.com", "temp_password": "t0", "user_id": "US12345"}),
        );

        let transport = RecordingTransport::new();
        let summary = process_batch(&[record], &transport).await;

        assert_eq!(summary.processed, 1);
        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent[0].to, vec!["user@example.com"]);
        assert!(sent[0].text.contains("US12345"));
    }

    #[tokio::test]
    async fn decodes_legacy_flat_fields() {
        let record = flat_record(
            "INSERT",
            json!({
                "emailType": "password_email",
                "recipient": "x@example.com, y@example.com",
                "data": {"user_email": "x@example.com", "password": "pw"}
            }),
        );

        let transport = RecordingTransport::new();
        let summary = process_batch(&[record], &transport).await;

        assert_eq!(summary.processed, 1);
        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent[0].to, vec!["x@example.com", "y@example.com"]);
    }

    #[tokio::test]
    async fn skips_non_insert_records() {
        let record = flat_record("MODIFY", json!({"type": "password_email", "to": "a@b.c"}));

        let transport = RecordingTransport::new();
        let summary = process_batch(&[record], &transport).await;

        assert_eq!(summary.processed, 0);
        assert!(!summary.results[0].processed);
        assert!(summary.results[0].error.is_none());
        assert!(transport.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_recipients_is_a_record_error() {
        let record = flat_record("INSERT", json!({"type": "password_email"}));

        let transport = RecordingTransport::new();
        let summary = process_batch(&[record], &transport).await;

        assert_eq!(summary.processed, 0);
        assert_eq!(summary.results[0].error.as_deref(), Some("no recipients"));
    }

    #[tokio::test]
    async fn transport_failure_is_isolated() {
        let records = vec![
            change_record(
                EmailType::MeetingInvite,
                &["a@example.com".to_string()],
                json!({"title": "Doomed"}),
            ),
            change_record(
                EmailType::MeetingInvite,
                &["b@example.com".to_string()],
                json!({"title": "Fine"}),
            ),
        ];

        let transport = RecordingTransport::failing_on("Doomed");
        let summary = process_batch(&records, &transport).await;

        assert_eq!(summary.processed, 1);
        assert!(!summary.results[0].processed);
        assert!(summary.results[0].error.is_some());
        assert!(summary.results[1].processed);
    }
}
