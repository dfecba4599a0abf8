use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use futures::future::try_join_all;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::{
    error::ChatError,
    models::{
        business::Business,
        inbox::{InboxItem, InboxResponse},
        message::{Message, SenderType},
    },
    repositories::BusinessDirectory,
    services::chat_service::MessageClient,
    websocket::change_feed::{ChangeFeed, MessageFilter, SubscriptionGuard},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboxState {
    Idle,
    Loading,
    Ready,
}

/// Builds the inbox row of one business from its newest messages
/// (newest first). A business with no messages has no row.
///
/// Only the given window is inspected, so a business with more unread
/// customer messages than the window reports the window's count.
pub fn summarize(business: &Business, recent: &[Message]) -> Option<InboxItem> {
    let newest = recent.first()?;

    Some(InboxItem {
        business_id: business.id,
        business_name: business.name.clone(),
        city: business.city.clone(),
        last_message: newest.message.clone(),
        last_message_at: newest.created_at,
        unread_count: recent.iter().filter(|m| counts_as_unread(m)).count(),
    })
}

fn counts_as_unread(message: &Message) -> bool {
    message.sender_type == SenderType::Customer && !message.read
}

/// Text of the unread badge on the floating inbox button
pub fn badge_label(total_unread: usize) -> Option<String> {
    match total_unread {
        0 => None,
        1..=9 => Some(total_unread.to_string()),
        _ => Some("9+".to_string()),
    }
}

struct InboxData {
    state: InboxState,
    owned: HashMap<Uuid, Business>,
    items: HashMap<Uuid, InboxItem>,
}

impl InboxData {
    /// Folds one inserted message into the keyed rows
    fn apply(&mut self, message: &Message) -> bool {
        let Some(business) = self.owned.get(&message.business_id) else {
            return false;
        };

        let unread = usize::from(counts_as_unread(message));
        match self.items.get_mut(&message.business_id) {
            Some(item) => {
                if message.created_at >= item.last_message_at {
                    item.last_message = message.message.clone();
                    item.last_message_at = message.created_at;
                }
                item.unread_count += unread;
            }
            None => {
                self.items.insert(
                    message.business_id,
                    InboxItem {
                        business_id: business.id,
                        business_name: business.name.clone(),
                        city: business.city.clone(),
                        last_message: message.message.clone(),
                        last_message_at: message.created_at,
                        unread_count: unread,
                    },
                );
            }
        }
        true
    }
}

/// Conversation summaries for every business the session user owns.
///
/// `refresh` recomputes everything from the store; once `watch` is
/// called, each realtime insert is applied as a single-row delta.
pub struct OwnerInbox {
    client: MessageClient,
    directory: Arc<dyn BusinessDirectory>,
    window: usize,
    data: Arc<Mutex<InboxData>>,
    subscription: Mutex<Option<SubscriptionGuard>>,
}

impl OwnerInbox {
    pub fn new(client: MessageClient, directory: Arc<dyn BusinessDirectory>, window: usize) -> Self {
        Self {
            client,
            directory,
            window,
            data: Arc::new(Mutex::new(InboxData {
                state: InboxState::Idle,
                owned: HashMap::new(),
                items: HashMap::new(),
            })),
            subscription: Mutex::new(None),
        }
    }

    /// Full recompute. On any fetch failure the previous rows are kept.
    pub async fn refresh(&self) -> Result<(), ChatError> {
        let owner_id = self
            .client
            .session()
            .user_id()
            .ok_or(ChatError::Unauthenticated)?;

        let previous = {
            let mut data = self.data.lock().map_err(|_| lock_error())?;
            let previous = data.state;
            data.state = InboxState::Loading;
            previous
        };

        match self.aggregate(owner_id).await {
            Ok((owned, items)) => {
                let mut data = self.data.lock().map_err(|_| lock_error())?;
                info!(
                    "Inbox for owner {}: {} of {} businesses with messages",
                    owner_id,
                    items.len(),
                    owned.len()
                );
                data.owned = owned;
                data.items = items;
                data.state = InboxState::Ready;
                Ok(())
            }
            Err(e) => {
                error!("Error loading inbox for owner {}: {}", owner_id, e);
                if let Ok(mut data) = self.data.lock() {
                    data.state = previous;
                }
                Err(ChatError::Aggregation(e.to_string()))
            }
        }
    }

    async fn aggregate(
        &self,
        owner_id: Uuid,
    ) -> Result<(HashMap<Uuid, Business>, HashMap<Uuid, InboxItem>), ChatError> {
        let businesses = self.directory.businesses_owned_by(owner_id).await?;

        let windows = try_join_all(businesses.iter().map(|business| async move {
            self.client
                .recent(business.id, self.window)
                .await
                .map(|recent| summarize(business, &recent))
        }))
        .await?;

        let items = windows
            .into_iter()
            .flatten()
            .map(|item| (item.business_id, item))
            .collect();
        let owned = businesses.into_iter().map(|b| (b.id, b)).collect();
        Ok((owned, items))
    }

    /// Applies one inserted message; returns whether a row changed
    pub fn apply(&self, message: &Message) -> bool {
        match self.data.lock() {
            Ok(mut data) => data.apply(message),
            Err(_) => false,
        }
    }

    /// Starts applying every realtime insert to the inbox
    pub fn watch(&self, feed: &ChangeFeed) -> Result<(), ChatError> {
        let data = self.data.clone();
        let guard = feed.subscribe(MessageFilter::All, move |message| {
            if let Ok(mut data) = data.lock() {
                if data.apply(&message) {
                    debug!("Inbox updated for business {}", message.business_id);
                }
            }
        });

        *self.subscription.lock().map_err(|_| lock_error())? = Some(guard);
        Ok(())
    }

    pub fn unwatch(&self) {
        if let Ok(mut subscription) = self.subscription.lock() {
            subscription.take();
        }
    }

    /// Zeroes a row's unread count once the owner has read the conversation
    pub fn clear_unread(&self, business_id: Uuid) {
        if let Ok(mut data) = self.data.lock() {
            if let Some(item) = data.items.get_mut(&business_id) {
                item.unread_count = 0;
            }
        }
    }

    pub fn state(&self) -> InboxState {
        self.data
            .lock()
            .map(|data| data.state)
            .unwrap_or(InboxState::Idle)
    }

    /// Rows, most recent conversation first
    pub fn items(&self) -> Vec<InboxItem> {
        let mut items: Vec<InboxItem> = self
            .data
            .lock()
            .map(|data| data.items.values().cloned().collect())
            .unwrap_or_default();
        items.sort_by(|a, b| b.last_message_at.cmp(&a.last_message_at));
        items
    }

    pub fn total_unread(&self) -> usize {
        self.data
            .lock()
            .map(|data| data.items.values().map(|item| item.unread_count).sum())
            .unwrap_or(0)
    }

    pub fn snapshot(&self) -> InboxResponse {
        let total_unread = self.total_unread();
        InboxResponse {
            items: self.items(),
            total_unread,
            badge: badge_label(total_unread),
        }
    }
}

fn lock_error() -> ChatError {
    ChatError::Persistence("Lock error".to_string())
}
