// src/websocket/change_feed.rs
use std::collections::HashSet;
use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
};

use tokio::{
    sync::broadcast::{self, error::RecvError},
    task::JoinHandle,
};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{error::ChatError, models::message::Message};

/// Which inserted messages a subscriber wants to hear about
#[derive(Debug, Clone, PartialEq)]
pub enum MessageFilter {
    All,
    Business(Uuid),
    Businesses(HashSet<Uuid>),
}

impl MessageFilter {
    pub fn matches(&self, message: &Message) -> bool {
        match self {
            MessageFilter::All => true,
            MessageFilter::Business(id) => message.business_id == *id,
            MessageFilter::Businesses(ids) => ids.contains(&message.business_id),
        }
    }
}

/// Fan-out of `business_messages` insert events to in-process subscribers.
///
/// The store listener (or the in-memory store) publishes every inserted
/// row once; each open subscription sees it at most once.
#[derive(Clone)]
pub struct ChangeFeed {
    channel: broadcast::Sender<Message>,
    open: Arc<AtomicUsize>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (channel, _) = broadcast::channel(capacity);
        Self {
            channel,
            open: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Pushes an insert event, returning how many receivers got it
    pub fn publish(&self, message: Message) -> usize {
        debug!(
            "Publishing message {} for business {}",
            message.id, message.business_id
        );
        // No receivers is not an error, the event is simply dropped
        self.channel.send(message).unwrap_or(0)
    }

    /// Opens a subscription that runs `callback` once per matching insert.
    ///
    /// Must be called from inside a tokio runtime. The subscription lives
    /// as long as the returned guard.
    pub fn subscribe<F>(&self, filter: MessageFilter, callback: F) -> SubscriptionGuard
    where
        F: Fn(Message) + Send + Sync + 'static,
    {
        let mut receiver = self.channel.subscribe();
        let closed = Arc::new(AtomicBool::new(false));
        let task_closed = closed.clone();
        let slot = Slot::acquire(&self.open);

        let task = tokio::spawn(async move {
            loop {
                match next_matching(&mut receiver, &filter).await {
                    Ok(message) => {
                        if task_closed.load(Ordering::Acquire) {
                            break;
                        }
                        callback(message);
                    }
                    Err(e) => {
                        warn!("Realtime subscription stopped: {}", e);
                        break;
                    }
                }
            }
        });

        SubscriptionGuard {
            task,
            closed,
            _slot: slot,
        }
    }

    /// Opens a subscription consumed by polling [`Subscription::recv`]
    pub fn subscribe_channel(&self, filter: MessageFilter) -> Subscription {
        Subscription {
            receiver: self.channel.subscribe(),
            filter,
            _slot: Slot::acquire(&self.open),
        }
    }

    /// Number of subscriptions not yet closed
    pub fn open_subscriptions(&self) -> usize {
        self.open.load(Ordering::Acquire)
    }
}

async fn next_matching(
    receiver: &mut broadcast::Receiver<Message>,
    filter: &MessageFilter,
) -> Result<Message, ChatError> {
    loop {
        match receiver.recv().await {
            Ok(message) if filter.matches(&message) => return Ok(message),
            Ok(_) => continue,
            Err(RecvError::Lagged(skipped)) => {
                // Delivery resumes with the oldest event still buffered
                warn!(
                    "{}",
                    ChatError::Subscription(format!(
                        "subscriber lagged behind, {} events dropped",
                        skipped
                    ))
                );
            }
            Err(RecvError::Closed) => {
                return Err(ChatError::Subscription("change feed closed".to_string()))
            }
        }
    }
}

/// Counts a subscription as open for as long as it is alive
struct Slot(Arc<AtomicUsize>);

impl Slot {
    fn acquire(open: &Arc<AtomicUsize>) -> Self {
        open.fetch_add(1, Ordering::AcqRel);
        Slot(open.clone())
    }
}

impl Drop for Slot {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Handle of a callback subscription; dropping it closes the subscription
pub struct SubscriptionGuard {
    task: JoinHandle<()>,
    closed: Arc<AtomicBool>,
    _slot: Slot,
}

impl SubscriptionGuard {
    pub fn close(self) {}

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.closed.store(true, Ordering::Release);
        self.task.abort();
    }
}

/// Pull-style subscription, closed when dropped
pub struct Subscription {
    receiver: broadcast::Receiver<Message>,
    filter: MessageFilter,
    _slot: Slot,
}

impl Subscription {
    pub async fn recv(&mut self) -> Result<Message, ChatError> {
        next_matching(&mut self.receiver, &self.filter).await
    }
}
