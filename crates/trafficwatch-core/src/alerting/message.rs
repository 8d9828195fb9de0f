//! Alert rendering: subject, HTML body and the raw MIME form

use std::fmt::Write as _;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use lettre::message::header::{ContentTransferEncoding, ContentType};
use lettre::message::Mailbox;
use lettre::{Address, Message};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::{AlertKind, AlertMessage, TimeWindow};

/// Who an alert comes from and goes to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Sender address
    pub sender: String,
    /// Sender display name
    pub sender_name: String,
    /// Recipient address
    pub recipient: String,
}

/// What the alert is about
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertContext {
    /// Zone identifier
    pub zone_tag: String,
    /// Monitored host
    pub target_host: String,
}

impl Identity {
    /// Take the identities from the notification section
    pub fn from_config(config: &Config) -> Self {
        Self {
            sender: config.notification.sender.clone(),
            sender_name: config.notification.sender_name.clone(),
            recipient: config.notification.recipient.clone(),
        }
    }
}

impl AlertContext {
    /// Take zone and host from the metrics section
    pub fn from_config(config: &Config) -> Self {
        Self {
            zone_tag: config.metrics.zone_tag.clone(),
            target_host: config.metrics.target_host.clone(),
        }
    }
}

/// Render the zero-traffic alert for `window`
pub fn no_traffic(
    identity: &Identity,
    context: &AlertContext,
    window: &TimeWindow,
    now: DateTime<Utc>,
) -> AlertMessage {
    let kind = AlertKind::NoTraffic;
    let lookback = format_lookback(window);
    let paragraphs = [
        format!(
            "No traffic has been detected in the last {} for {} (zone {}).",
            escape_html(&lookback),
            escape_html(&context.target_host),
            escape_html(&context.zone_tag),
        ),
        format!(
            "Time Range: {} - {}",
            window.start_iso(),
            window.end_iso()
        ),
        "Please investigate to ensure normal operation.".to_string(),
    ];

    build(identity, context, kind, &paragraphs, now)
}

/// Render the alert sent when traffic could not be checked at all
pub fn monitoring_degraded(
    identity: &Identity,
    context: &AlertContext,
    window: &TimeWindow,
    reason: &str,
    now: DateTime<Utc>,
) -> AlertMessage {
    let kind = AlertKind::MonitoringDegraded;
    let paragraphs = [
        format!(
            "Traffic for {} (zone {}) could not be checked.",
            escape_html(&context.target_host),
            escape_html(&context.zone_tag),
        ),
        format!(
            "Time Range: {} - {}",
            window.start_iso(),
            window.end_iso()
        ),
        format!("Reason: {}", escape_html(reason)),
        "Zero-traffic alerts are not being evaluated until this is resolved.".to_string(),
    ];

    build(identity, context, kind, &paragraphs, now)
}

fn build(
    identity: &Identity,
    context: &AlertContext,
    kind: AlertKind,
    paragraphs: &[String],
    now: DateTime<Utc>,
) -> AlertMessage {
    AlertMessage {
        id: Uuid::new_v4(),
        kind,
        sender: identity.sender.clone(),
        sender_name: identity.sender_name.clone(),
        recipient: identity.recipient.clone(),
        subject: format!("🚨 {} - {}", kind.title(), context.target_host),
        html_body: render_html(kind.title(), paragraphs),
        created_at: now,
    }
}

fn render_html(title: &str, paragraphs: &[String]) -> String {
    let mut html = String::from(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
"#,
    );
    let _ = writeln!(html, "<title>{title}</title>");
    html.push_str(
        r#"<style>
body { font-family: Arial, sans-serif; background-color: #f9f9f9; color: #333; text-align: center; padding: 20px; }
.alert { background-color: #ff4c4c; color: white; padding: 15px; border-radius: 5px; display: inline-block; }
</style>
</head>
<body>
"#,
    );
    let _ = writeln!(html, "<h1 class=\"alert\">🚨 {title} 🚨</h1>");
    for paragraph in paragraphs {
        let _ = writeln!(html, "<p>{paragraph}</p>");
    }
    html.push_str("</body>\n</html>\n");
    html
}

fn format_lookback(window: &TimeWindow) -> String {
    window
        .length()
        .to_std()
        .map(|d| humantime::format_duration(d).to_string())
        .unwrap_or_else(|_| "configured window".to_string())
}

/// Serialize `message` as an RFC 5322 message with a base64 HTML body.
pub fn to_mime(message: &AlertMessage) -> Result<String> {
    let from = mailbox(Some(&message.sender_name), &message.sender)?;
    let to = mailbox(None, &message.recipient)?;
    let message_id = format!("<{}@{}>", message.id, from.email.domain());

    let email = Message::builder()
        .from(from)
        .to(to)
        .subject(message.subject.clone())
        .date(SystemTime::from(message.created_at))
        .message_id(Some(message_id))
        .header(ContentType::TEXT_HTML)
        .header(ContentTransferEncoding::Base64)
        .body(message.html_body.clone())
        .map_err(|e| Error::notification(format!("could not build alert email: {e}")))?;

    String::from_utf8(email.formatted())
        .map_err(|e| Error::notification(format!("alert email is not valid UTF-8: {e}")))
}

fn mailbox(name: Option<&str>, address: &str) -> Result<Mailbox> {
    let email: Address = address
        .parse()
        .map_err(|e| Error::notification(format!("invalid email address {address:?}: {e}")))?;
    // Control characters never reach a header
    let name = name
        .map(|n| n.chars().filter(|c| !c.is_control()).collect::<String>())
        .filter(|n| !n.trim().is_empty());
    Ok(Mailbox::new(name, email))
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{at, context, identity};
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use pretty_assertions::assert_eq;

    fn window() -> TimeWindow {
        TimeWindow::ending_at(at("2024-01-01T00:15:00Z"), std::time::Duration::from_secs(900))
            .unwrap()
    }

    #[test]
    fn no_traffic_alert_content() {
        let message = no_traffic(&identity(), &context(), &window(), at("2024-01-01T00:15:00Z"));

        assert_eq!(message.kind, AlertKind::NoTraffic);
        assert_eq!(message.subject, "🚨 No Traffic Alert - f1.example.com");
        assert_eq!(message.recipient, "oncall@example.com");
        assert!(message
            .html_body
            .contains("Time Range: 2024-01-01T00:00:00.000Z - 2024-01-01T00:15:00.000Z"));
        assert!(message.html_body.contains("in the last 15m for f1.example.com (zone zone-1)"));
        assert!(message.html_body.contains("<title>No Traffic Alert</title>"));
    }

    #[test]
    fn degraded_alert_escapes_reason() {
        let message = monitoring_degraded(
            &identity(),
            &context(),
            &window(),
            "Malformed response: <html>",
            at("2024-01-01T00:15:00Z"),
        );
        assert_eq!(message.subject, "🚨 Traffic Monitoring Degraded - f1.example.com");
        assert!(message.html_body.contains("Reason: Malformed response: &lt;html&gt;"));
    }

    fn split(raw: &str) -> (&str, &str) {
        raw.split_once("\r\n\r\n").unwrap()
    }

    fn decode_body(body: &str) -> String {
        let compact: String = body.split_whitespace().collect();
        String::from_utf8(STANDARD.decode(compact).unwrap()).unwrap()
    }

    #[test]
    fn mime_headers() {
        let message = no_traffic(&identity(), &context(), &window(), at("2024-01-01T00:15:00Z"));
        let raw = to_mime(&message).unwrap();
        let (head, body) = split(&raw);
        let lower = head.to_ascii_lowercase();

        assert!(head.contains("Cloudflare Alert"));
        assert!(head.contains("<admin@example.com>"));
        assert!(head.contains("oncall@example.com"));
        assert!(lower.contains("subject: =?utf-8?b?"));
        assert!(head.contains("Date: Mon, 01 Jan 2024 00:15:00"));
        assert!(head.contains(&format!("<{}@example.com>", message.id)));
        assert!(lower.contains("content-type: text/html; charset=utf-8"));
        assert!(lower.contains("content-transfer-encoding: base64"));
        assert_eq!(decode_body(body), message.html_body);
    }

    #[test]
    fn long_body_lines_are_wrapped() {
        let message = monitoring_degraded(
            &identity(),
            &context(),
            &window(),
            &"<".repeat(512),
            at("2024-01-01T00:15:00Z"),
        );
        let raw = to_mime(&message).unwrap();

        let longest = raw.split("\r\n").map(str::len).max().unwrap_or(0);
        assert!(longest <= 998, "line of {longest} octets");
        assert!(decode_body(split(&raw).1).contains(&"&lt;".repeat(512)));
    }

    #[test]
    fn sender_name_cannot_add_headers() {
        let identity = Identity {
            sender_name: "Ops\r\nBcc: evil@attacker.test".into(),
            ..identity()
        };
        let message = no_traffic(&identity, &context(), &window(), at("2024-01-01T00:15:00Z"));
        let raw = to_mime(&message).unwrap();
        let (head, _) = split(&raw);

        assert!(head
            .lines()
            .all(|line| !line.to_ascii_lowercase().starts_with("bcc:")));
    }

    #[test]
    fn invalid_recipient_is_a_notification_error() {
        let identity = Identity {
            recipient: "oncall at example.com".into(),
            ..identity()
        };
        let message = no_traffic(&identity, &context(), &window(), at("2024-01-01T00:15:00Z"));

        assert!(matches!(to_mime(&message), Err(Error::Notification(_))));
    }
}
