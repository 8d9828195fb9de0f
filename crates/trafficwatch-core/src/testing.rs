//! Fakes and fixtures shared by the unit tests

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::alerting::message::{self, AlertContext, Identity};
use crate::alerting::MessageSender;
use crate::error::{Error, Result};
use crate::metrics::TrafficSource;
use crate::models::{AlertMessage, TimeWindow, TrafficObservation, TrafficQuery};

pub fn at(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .expect("valid RFC 3339 instant")
        .with_timezone(&Utc)
}

pub fn identity() -> Identity {
    Identity {
        sender: "admin@example.com".into(),
        sender_name: "Cloudflare Alert".into(),
        recipient: "oncall@example.com".into(),
    }
}

pub fn context() -> AlertContext {
    AlertContext {
        zone_tag: "zone-1".into(),
        target_host: "f1.example.com".into(),
    }
}

pub fn message() -> AlertMessage {
    let now = at("2024-01-01T00:15:00Z");
    let window = TimeWindow::ending_at(now, std::time::Duration::from_secs(900))
        .expect("valid window");
    message::no_traffic(&identity(), &context(), &window, now)
}

type ErrorFactory = Arc<dyn Fn() -> Error + Send + Sync>;

/// Metrics source returning a fixed count or a fixed error, recording every query
#[derive(Clone)]
pub struct StaticSource {
    result: std::result::Result<u64, ErrorFactory>,
    queries: Arc<Mutex<Vec<TrafficQuery>>>,
}

impl StaticSource {
    pub fn count(count: u64) -> Self {
        Self {
            result: Ok(count),
            queries: Arc::default(),
        }
    }

    pub fn failing(error: impl Fn() -> Error + Send + Sync + 'static) -> Self {
        Self {
            result: Err(Arc::new(error)),
            queries: Arc::default(),
        }
    }

    pub fn queries(&self) -> Vec<TrafficQuery> {
        self.queries.lock().clone()
    }

    pub fn calls(&self) -> usize {
        self.queries.lock().len()
    }
}

#[async_trait]
impl TrafficSource for StaticSource {
    async fn count_requests(&self, query: &TrafficQuery) -> Result<TrafficObservation> {
        self.queries.lock().push(query.clone());
        match &self.result {
            Ok(count) => Ok(TrafficObservation::new(*count)),
            Err(make) => Err(make()),
        }
    }
}

/// Sender that records messages, optionally failing every send
#[derive(Clone, Default)]
pub struct RecordingSender {
    fail: bool,
    sent: Arc<Mutex<Vec<AlertMessage>>>,
    attempts: Arc<AtomicUsize>,
}

impl RecordingSender {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<AlertMessage> {
        self.sent.lock().clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MessageSender for RecordingSender {
    async fn send(&self, message: &AlertMessage) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Error::notification("relay unavailable"));
        }
        self.sent.lock().push(message.clone());
        Ok(())
    }
}

/// Formatted log output captured from the current thread
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    /// Route this thread's events here until the guard drops
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let writer = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
