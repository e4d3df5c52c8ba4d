//! Hand-off of rendered messages to the delivery gateway.
//!
//! The thread identity is reused verbatim as the message id so the gateway
//! can edit a thread in place. The dispatcher keeps a small ledger of what it
//! last sent per thread and channel set: identical content is not re-sent and
//! renders older than the last delivered one are dropped. Entries live as
//! long as the TTL they were delivered with; once it has passed, the thread
//! is posted afresh.

use crate::error::{LifecycleError, Result};
use crate::lifecycle::{Channel, ThreadIdentity};
use crate::message::RenderedMessage;
use crate::types::{LifecycleKind, MessageClass};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, info};

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

// ---------------------------------------------------------------------------
// TtlPolicy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlPolicy {
    pub lifecycle: Duration,
    pub notification: Duration,
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self {
            lifecycle: DAY * 7,
            notification: Duration::from_secs(5 * 60),
        }
    }
}

impl TtlPolicy {
    pub fn ttl_for(&self, class: MessageClass) -> Duration {
        match class {
            MessageClass::Lifecycle => self.lifecycle,
            MessageClass::Notification => self.notification,
        }
    }
}

/// Review threads are one-off notifications; everything else is a
/// long-lived lifecycle thread.
pub fn message_class(kind: LifecycleKind) -> MessageClass {
    match kind {
        LifecycleKind::Review => MessageClass::Notification,
        _ => MessageClass::Lifecycle,
    }
}

// ---------------------------------------------------------------------------
// DeliveryRequest
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    Post,
    Update,
}

impl DeliveryMode {
    pub fn as_str(self) -> &'static str {
        match self {
            DeliveryMode::Post => "post",
            DeliveryMode::Update => "update",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryRequest {
    pub message_id: String,
    pub channels: Vec<Channel>,
    pub message: RenderedMessage,
    pub class: MessageClass,
    pub ttl_ms: u64,
    pub ts: i64,
    pub mode: DeliveryMode,
}

// ---------------------------------------------------------------------------
// Gateways
// ---------------------------------------------------------------------------

/// External delivery gateway. Retries are the gateway's concern.
#[async_trait]
pub trait DeliveryGateway: Send + Sync {
    async fn deliver(&self, request: &DeliveryRequest) -> Result<()>;
}

/// POSTs each request as JSON.
pub struct HttpGateway {
    client: reqwest::Client,
    url: String,
}

impl HttpGateway {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LifecycleError::Delivery(e.to_string()))?;
        Ok(Self { client, url: url.into() })
    }
}

#[async_trait]
impl DeliveryGateway for HttpGateway {
    async fn deliver(&self, request: &DeliveryRequest) -> Result<()> {
        let response = self
            .client
            .post(&self.url)
            .json(request)
            .send()
            .await
            .map_err(|e| LifecycleError::Delivery(format!("{}: {e}", self.url)))?;
        let status = response.status();
        if !status.is_success() {
            return Err(LifecycleError::Delivery(format!("{} returned {status}", self.url)));
        }
        Ok(())
    }
}

/// Logs requests instead of sending them.
pub struct LogGateway;

#[async_trait]
impl DeliveryGateway for LogGateway {
    async fn deliver(&self, request: &DeliveryRequest) -> Result<()> {
        let channels: Vec<&str> = request.channels.iter().map(|c| c.name.as_str()).collect();
        info!(
            thread = %request.message_id,
            channels = ?channels,
            mode = request.mode.as_str(),
            ttl_ms = request.ttl_ms,
            fragments = request.message.fragment_count(),
            "delivery"
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// LifecycleDispatcher
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DispatchOutcome {
    Delivered { mode: DeliveryMode },
    Unchanged,
    Stale,
    NoChannels,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Sent {
    ts: i64,
    fingerprint: String,
    /// Render timestamp after which the delivered message is gone.
    expires_at: i64,
}

type LedgerKey = (ThreadIdentity, Vec<Channel>);

/// Last delivery per thread and channel set. `clock` is the newest render
/// timestamp seen so far and drives expiry.
#[derive(Debug, Default)]
struct Ledger {
    entries: BTreeMap<LedgerKey, Sent>,
    clock: i64,
}

impl Ledger {
    fn advance(&mut self, ts: i64) {
        if ts <= self.clock {
            return;
        }
        self.clock = ts;
        let before = self.entries.len();
        self.entries.retain(|_, sent| sent.expires_at > ts);
        let pruned = before - self.entries.len();
        if pruned > 0 {
            debug!(pruned, "expired ledger entries dropped");
        }
    }

    /// Put `previous` back if the entry still holds the reservation `ours`.
    fn restore(&mut self, key: &LedgerKey, ours: &Sent, previous: Option<Sent>) {
        if self.entries.get(key) != Some(ours) {
            return;
        }
        match previous {
            Some(sent) => self.entries.insert(key.clone(), sent),
            None => self.entries.remove(key),
        };
    }
}

pub struct LifecycleDispatcher {
    gateway: Arc<dyn DeliveryGateway>,
    ttl: TtlPolicy,
    ledger: Mutex<Ledger>,
}

impl LifecycleDispatcher {
    pub fn new(gateway: Arc<dyn DeliveryGateway>, ttl: TtlPolicy) -> Self {
        Self {
            gateway,
            ttl,
            ledger: Mutex::new(Ledger::default()),
        }
    }

    pub async fn dispatch(
        &self,
        thread: &ThreadIdentity,
        kind: LifecycleKind,
        message: &RenderedMessage,
        channels: &[Channel],
        ts: i64,
    ) -> Result<DispatchOutcome> {
        if channels.is_empty() {
            debug!(thread = %thread, "no channels, nothing to dispatch");
            return Ok(DispatchOutcome::NoChannels);
        }

        let mut channels = channels.to_vec();
        channels.sort();
        channels.dedup();
        let fingerprint = fingerprint(message, &channels)?;
        let key = (thread.clone(), channels);
        let class = message_class(kind);
        let ttl_ms = u64::try_from(self.ttl.ttl_for(class).as_millis()).unwrap_or(u64::MAX);
        let reservation = Sent {
            ts,
            fingerprint,
            expires_at: ts.saturating_add(i64::try_from(ttl_ms).unwrap_or(i64::MAX)),
        };

        // The slot is reserved before delivery so a concurrent dispatch of the
        // same thread sees it and does not post a second time.
        let (mode, previous) = {
            let mut ledger = self.ledger.lock().unwrap_or_else(PoisonError::into_inner);
            ledger.advance(ts);
            let mode = match ledger.entries.get(&key) {
                Some(sent) if ts < sent.ts => {
                    debug!(thread = %thread, ts, last = sent.ts, "stale render dropped");
                    return Ok(DispatchOutcome::Stale);
                }
                Some(sent) if sent.fingerprint == reservation.fingerprint => {
                    debug!(thread = %thread, "content unchanged");
                    return Ok(DispatchOutcome::Unchanged);
                }
                Some(_) => DeliveryMode::Update,
                None => DeliveryMode::Post,
            };
            (mode, ledger.entries.insert(key.clone(), reservation.clone()))
        };

        let request = DeliveryRequest {
            message_id: thread.as_str().to_string(),
            channels: key.1.clone(),
            message: message.clone(),
            class,
            ttl_ms,
            ts,
            mode,
        };
        if let Err(e) = self.gateway.deliver(&request).await {
            self.ledger
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .restore(&key, &reservation, previous);
            return Err(e);
        }

        info!(
            thread = %thread,
            channels = request.channels.len(),
            mode = mode.as_str(),
            "dispatched"
        );
        Ok(DispatchOutcome::Delivered { mode })
    }
}

fn fingerprint(message: &RenderedMessage, channels: &[Channel]) -> Result<String> {
    let mut hasher = Sha256::new();
    hasher.update(serde_json::to_vec(message)?);
    for channel in channels {
        hasher.update(channel.team_id.as_bytes());
        hasher.update([0]);
        hasher.update(channel.name.as_bytes());
        hasher.update([0]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Attachment, ChatMessage};

    #[derive(Default)]
    struct Recording {
        requests: Mutex<Vec<DeliveryRequest>>,
    }

    #[async_trait]
    impl DeliveryGateway for Recording {
        async fn deliver(&self, request: &DeliveryRequest) -> Result<()> {
            self.requests.lock().unwrap().push(request.clone());
            Ok(())
        }
    }

    struct Unreachable;

    #[async_trait]
    impl DeliveryGateway for Unreachable {
        async fn deliver(&self, _request: &DeliveryRequest) -> Result<()> {
            Err(LifecycleError::Delivery("connection refused".into()))
        }
    }

    /// Yields once before recording so concurrent dispatches interleave.
    #[derive(Default)]
    struct Slow {
        inner: Recording,
    }

    #[async_trait]
    impl DeliveryGateway for Slow {
        async fn deliver(&self, request: &DeliveryRequest) -> Result<()> {
            tokio::task::yield_now().await;
            self.inner.deliver(request).await
        }
    }

    fn message(text: &str) -> RenderedMessage {
        RenderedMessage::Chat(ChatMessage {
            attachments: vec![Attachment::new("push", text)],
        })
    }

    fn thread() -> ThreadIdentity {
        ThreadIdentity::new("push_lifecycle/acme/widgets/main/abc123")
    }

    fn dev() -> Vec<Channel> {
        vec![Channel::new("dev", "T1")]
    }

    #[tokio::test]
    async fn redelivery_reuses_message_id() {
        let gateway = Arc::new(Recording::default());
        let dispatcher = LifecycleDispatcher::new(gateway.clone(), TtlPolicy::default());

        let first = dispatcher
            .dispatch(&thread(), LifecycleKind::Push, &message("a"), &dev(), 1)
            .await
            .unwrap();
        let again = dispatcher
            .dispatch(&thread(), LifecycleKind::Push, &message("a"), &dev(), 1)
            .await
            .unwrap();
        let changed = dispatcher
            .dispatch(&thread(), LifecycleKind::Push, &message("b"), &dev(), 2)
            .await
            .unwrap();

        assert_eq!(first, DispatchOutcome::Delivered { mode: DeliveryMode::Post });
        assert_eq!(again, DispatchOutcome::Unchanged);
        assert_eq!(changed, DispatchOutcome::Delivered { mode: DeliveryMode::Update });

        let requests = gateway.requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        assert!(requests.iter().all(|r| r.message_id == thread().as_str()));
        assert_eq!(requests[0].ttl_ms, 7 * 24 * 60 * 60 * 1000);
    }

    #[tokio::test]
    async fn older_render_is_stale() {
        let gateway = Arc::new(Recording::default());
        let dispatcher = LifecycleDispatcher::new(gateway.clone(), TtlPolicy::default());
        dispatcher
            .dispatch(&thread(), LifecycleKind::Push, &message("new"), &dev(), 10)
            .await
            .unwrap();
        let outcome = dispatcher
            .dispatch(&thread(), LifecycleKind::Push, &message("old"), &dev(), 5)
            .await
            .unwrap();
        assert_eq!(outcome, DispatchOutcome::Stale);
        assert_eq!(gateway.requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn empty_channels_short_circuit() {
        let gateway = Arc::new(Recording::default());
        let dispatcher = LifecycleDispatcher::new(gateway.clone(), TtlPolicy::default());
        let outcome = dispatcher
            .dispatch(&thread(), LifecycleKind::Push, &message("a"), &[], 1)
            .await
            .unwrap();
        assert_eq!(outcome, DispatchOutcome::NoChannels);
        assert!(gateway.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_delivery_is_not_recorded() {
        let dispatcher = LifecycleDispatcher::new(Arc::new(Unreachable), TtlPolicy::default());
        let err = dispatcher
            .dispatch(&thread(), LifecycleKind::Push, &message("a"), &dev(), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::Delivery(_)));
        assert!(dispatcher.ledger.lock().unwrap().entries.is_empty());
    }

    #[tokio::test]
    async fn review_threads_use_notification_ttl() {
        let gateway = Arc::new(Recording::default());
        let dispatcher = LifecycleDispatcher::new(gateway.clone(), TtlPolicy::default());
        dispatcher
            .dispatch(&thread(), LifecycleKind::Review, &message("a"), &dev(), 1)
            .await
            .unwrap();
        let requests = gateway.requests.lock().unwrap();
        assert_eq!(requests[0].class, MessageClass::Notification);
        assert_eq!(requests[0].ttl_ms, 300_000);
    }

    #[tokio::test]
    async fn channel_order_does_not_matter() {
        let gateway = Arc::new(Recording::default());
        let dispatcher = LifecycleDispatcher::new(gateway.clone(), TtlPolicy::default());
        let a = vec![Channel::new("dev", "T1"), Channel::new("ops", "T1")];
        let b = vec![Channel::new("ops", "T1"), Channel::new("dev", "T1")];
        dispatcher
            .dispatch(&thread(), LifecycleKind::Push, &message("a"), &a, 1)
            .await
            .unwrap();
        let outcome = dispatcher
            .dispatch(&thread(), LifecycleKind::Push, &message("a"), &b, 1)
            .await
            .unwrap();
        assert_eq!(outcome, DispatchOutcome::Unchanged);
    }

    #[tokio::test]
    async fn expired_thread_is_posted_again() {
        let gateway = Arc::new(Recording::default());
        let dispatcher = LifecycleDispatcher::new(gateway.clone(), TtlPolicy::default());
        let review = ThreadIdentity::new("review_lifecycle/acme/widgets/9");
        dispatcher
            .dispatch(&review, LifecycleKind::Review, &message("a"), &dev(), 1_000)
            .await
            .unwrap();
        let within = dispatcher
            .dispatch(&review, LifecycleKind::Review, &message("b"), &dev(), 1_000 + 299_999)
            .await
            .unwrap();
        let after = dispatcher
            .dispatch(&review, LifecycleKind::Review, &message("b"), &dev(), 1_000 + 299_999 + 300_000)
            .await
            .unwrap();
        assert_eq!(within, DispatchOutcome::Delivered { mode: DeliveryMode::Update });
        assert_eq!(after, DispatchOutcome::Delivered { mode: DeliveryMode::Post });
        assert_eq!(gateway.requests.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn expired_entries_are_pruned() {
        let dispatcher = LifecycleDispatcher::new(Arc::new(Recording::default()), TtlPolicy::default());
        for n in 0..100 {
            let review = ThreadIdentity::new(format!("review_lifecycle/acme/widgets/{n}"));
            dispatcher
                .dispatch(&review, LifecycleKind::Review, &message("a"), &dev(), n * 10_000)
                .await
                .unwrap();
        }
        // 5 minute TTL, one thread every 10 seconds.
        let entries = dispatcher.ledger.lock().unwrap().entries.len();
        assert_eq!(entries, 30);

        dispatcher
            .dispatch(&thread(), LifecycleKind::Push, &message("a"), &dev(), 10_000_000)
            .await
            .unwrap();
        assert_eq!(dispatcher.ledger.lock().unwrap().entries.len(), 1);
    }

    #[tokio::test]
    async fn concurrent_dispatch_posts_once() {
        let gateway = Arc::new(Slow::default());
        let dispatcher = LifecycleDispatcher::new(gateway.clone(), TtlPolicy::default());
        let (first, second) = tokio::join!(
            dispatcher.dispatch(&thread(), LifecycleKind::Push, &message("a"), &dev(), 1),
            dispatcher.dispatch(&thread(), LifecycleKind::Push, &message("a"), &dev(), 1),
        );
        let mut outcomes = vec![first.unwrap(), second.unwrap()];
        outcomes.sort_by_key(|o| matches!(o, DispatchOutcome::Unchanged));
        assert_eq!(
            outcomes,
            vec![DispatchOutcome::Delivered { mode: DeliveryMode::Post }, DispatchOutcome::Unchanged]
        );
        assert_eq!(gateway.inner.requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_update_keeps_previous_delivery() {
        let gateway = Arc::new(Recording::default());
        let dispatcher = LifecycleDispatcher::new(gateway.clone(), TtlPolicy::default());
        dispatcher
            .dispatch(&thread(), LifecycleKind::Push, &message("a"), &dev(), 1)
            .await
            .unwrap();

        let failing = LifecycleDispatcher {
            gateway: Arc::new(Unreachable),
            ttl: TtlPolicy::default(),
            ledger: Mutex::new(std::mem::take(&mut *dispatcher.ledger.lock().unwrap())),
        };
        assert!(failing
            .dispatch(&thread(), LifecycleKind::Push, &message("b"), &dev(), 2)
            .await
            .is_err());
        let ledger = failing.ledger.lock().unwrap();
        let sent = ledger.entries.values().next().unwrap();
        assert_eq!(sent.ts, 1);
    }
}
