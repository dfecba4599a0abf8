use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

use tracing::{error, info};
use uuid::Uuid;

use crate::{
    error::ChatError,
    models::{
        business::Business,
        message::{Message, SenderType},
    },
    repositories::BusinessDirectory,
    services::chat_service::MessageClient,
    session::Session,
    websocket::change_feed::{ChangeFeed, MessageFilter, SubscriptionGuard},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationState {
    Loading,
    Ready,
    /// Nobody is signed in: no messages, no subscription
    Gated,
}

/// Role of the session user in a business conversation: the owner speaks
/// as the business, everyone else as a customer.
pub async fn resolve_viewer_role(
    directory: &dyn BusinessDirectory,
    session: &Session,
    business_id: Uuid,
) -> Result<(Business, Option<SenderType>), ChatError> {
    let business = directory
        .find_business(business_id)
        .await?
        .ok_or(ChatError::BusinessNotFound(business_id))?;

    let role = session.user_id().map(|user_id| {
        if business.is_owned_by(user_id) {
            SenderType::Business
        } else {
            SenderType::Customer
        }
    });

    Ok((business, role))
}

/// Live chat panel for one business.
///
/// Holds the conversation in memory, appends realtime inserts to its tail
/// and closes its subscription when closed or dropped.
pub struct ConversationView {
    business_id: Uuid,
    business: Option<Business>,
    client: MessageClient,
    viewer_role: Option<SenderType>,
    state: ConversationState,
    messages: Arc<Mutex<Vec<Message>>>,
    sending: AtomicBool,
    subscription: Option<SubscriptionGuard>,
}

impl ConversationView {
    pub async fn open(
        client: MessageClient,
        directory: &dyn BusinessDirectory,
        feed: &ChangeFeed,
        business_id: Uuid,
    ) -> Result<Self, ChatError> {
        let mut view = Self {
            business_id,
            business: None,
            client,
            viewer_role: None,
            state: ConversationState::Loading,
            messages: Arc::new(Mutex::new(Vec::new())),
            sending: AtomicBool::new(false),
            subscription: None,
        };

        if !view.client.session().is_authenticated() {
            view.state = ConversationState::Gated;
            return Ok(view);
        }

        view.load(directory, feed).await?;
        Ok(view)
    }

    async fn load(
        &mut self,
        directory: &dyn BusinessDirectory,
        feed: &ChangeFeed,
    ) -> Result<(), ChatError> {
        let (business, role) =
            resolve_viewer_role(directory, self.client.session(), self.business_id).await?;
        self.business = Some(business);
        self.viewer_role = role;

        let history = self.client.history(self.business_id).await?;
        *self.messages.lock().map_err(|_| lock_error())? = history;
        self.state = ConversationState::Ready;

        let messages = self.messages.clone();
        self.subscription = Some(feed.subscribe(
            MessageFilter::Business(self.business_id),
            move |message| match messages.lock() {
                Ok(mut messages) => messages.push(message),
                Err(_) => error!("Conversation lock poisoned, dropping realtime message"),
            },
        ));

        info!(
            "Conversation for business {} ready as {:?}",
            self.business_id, self.viewer_role
        );
        Ok(())
    }

    pub fn state(&self) -> ConversationState {
        self.state
    }

    pub fn viewer_role(&self) -> Option<SenderType> {
        self.viewer_role
    }

    /// Snapshot of the conversation as currently rendered
    pub fn messages(&self) -> Vec<Message> {
        self.messages
            .lock()
            .map(|messages| messages.clone())
            .unwrap_or_default()
    }

    pub fn is_sending(&self) -> bool {
        self.sending.load(Ordering::Acquire)
    }

    /// Sends as the viewer's role. A second send while one is still pending
    /// is refused; the caller keeps its input on any error.
    pub async fn send(&self, text: &str) -> Result<Message, ChatError> {
        let role = match self.viewer_role {
            Some(role) if self.client.session().is_authenticated() => role,
            _ => return Err(ChatError::Unauthenticated),
        };
        if text.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        if self
            .sending
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(ChatError::SendInFlight);
        }
        let _pending = PendingSend(&self.sending);

        // The stored row comes back through the subscription
        self.client.send(self.business_id, text, role).await
    }

    /// Marks the other party's messages read, remotely and locally
    pub async fn mark_read(&self) -> Result<u64, ChatError> {
        let role = self.viewer_role.ok_or(ChatError::Unauthenticated)?;
        let touched = self.client.mark_read(self.business_id, role).await?;

        let mut messages = self.messages.lock().map_err(|_| lock_error())?;
        for message in messages.iter_mut().filter(|m| m.sender_type != role) {
            message.read = true;
        }
        Ok(touched)
    }

    /// Unread messages written by the other party
    pub fn unread_count(&self) -> usize {
        let Some(role) = self.viewer_role else {
            return 0;
        };
        self.messages
            .lock()
            .map(|messages| {
                messages
                    .iter()
                    .filter(|m| m.sender_type != role && !m.read)
                    .count()
            })
            .unwrap_or(0)
    }

    pub fn is_own(&self, message: &Message) -> bool {
        message.sender_id.is_some() && message.sender_id == self.client.session().user_id()
    }

    /// Name shown above a message bubble
    pub fn sender_label(&self, message: &Message) -> String {
        match (message.sender_type, &self.business) {
            (SenderType::Business, Some(business)) => business.name.clone(),
            (SenderType::Business, None) => "Negocio".to_string(),
            (SenderType::Customer, _) => "Cliente".to_string(),
        }
    }

    pub fn close(self) {}
}

impl Drop for ConversationView {
    fn drop(&mut self) {
        if self.subscription.take().is_some() {
            info!("Closed conversation for business {}", self.business_id);
        }
    }
}

/// Clears the pending-send flag on every exit path
struct PendingSend<'a>(&'a AtomicBool);

impl Drop for PendingSend<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

fn lock_error() -> ChatError {
    ChatError::Persistence("Lock error".to_string())
}
