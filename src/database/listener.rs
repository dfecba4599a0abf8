// listener.rs

use std::sync::Arc;

use futures::{stream, StreamExt};
use tokio::task::JoinHandle;
use tokio_postgres::{AsyncMessage, Client, NoTls};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    database::{init::DbError, migrations::INSERT_CHANNEL},
    error::ChatError,
    repositories::MessageStore,
    websocket::change_feed::ChangeFeed,
};

/// Dedicated connection that LISTENs for insert notifications, loads each
/// notified row from the store and republishes it on the change feed.
/// Dropping it stops the feed.
pub struct StoreListener {
    _client: Client,
    task: JoinHandle<()>,
}

impl StoreListener {
    pub async fn start(
        database_url: &str,
        feed: ChangeFeed,
        store: Arc<dyn MessageStore>,
    ) -> Result<Self, DbError> {
        let (client, mut connection) = tokio_postgres::connect(database_url, NoTls)
            .await
            .map_err(|e| DbError::ListenerError(e.to_string()))?;

        // The connection must be polled for LISTEN itself to complete
        let task = tokio::spawn(async move {
            let mut messages = Box::pin(stream::poll_fn(move |cx| connection.poll_message(cx)));

            while let Some(message) = messages.next().await {
                match message {
                    Ok(AsyncMessage::Notification(notification)) => {
                        if let Err(e) = dispatch(
                            &feed,
                            store.as_ref(),
                            notification.channel(),
                            notification.payload(),
                        )
                        .await
                        {
                            warn!("Discarding insert notification: {}", e);
                        }
                    }
                    Ok(AsyncMessage::Notice(notice)) => {
                        info!("Database notice: {}", notice.message());
                    }
                    Ok(_) => {}
                    Err(e) => {
                        error!("Listener connection error: {}", e);
                        break;
                    }
                }
            }

            // No reconnect: subscribers stay open but receive nothing further
            error!(
                "{}",
                ChatError::Subscription("store listener stopped".to_string())
            );
        });

        client
            .batch_execute(&format!("LISTEN {}", INSERT_CHANNEL))
            .await
            .map_err(|e| DbError::ListenerError(e.to_string()))?;

        info!("Listening for inserts on channel {}", INSERT_CHANNEL);
        Ok(Self {
            _client: client,
            task,
        })
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for StoreListener {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Resolves one notification payload (the inserted row id) and publishes
/// the row. Returns whether anything was published; notifications on other
/// channels are ignored.
pub async fn dispatch(
    feed: &ChangeFeed,
    store: &dyn MessageStore,
    channel: &str,
    payload: &str,
) -> Result<bool, ChatError> {
    if channel != INSERT_CHANNEL {
        return Ok(false);
    }
    let message_id = Uuid::parse_str(payload.trim())
        .map_err(|e| ChatError::Schema(format!("notification payload '{}': {}", payload, e)))?;

    match store.find_message(message_id).await? {
        Some(message) => {
            feed.publish(message);
            Ok(true)
        }
        None => {
            warn!("Notified message {} no longer exists", message_id);
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::message::{NewMessage, SenderType},
        repositories::memory::InMemoryStore,
        websocket::change_feed::MessageFilter,
    };

    async fn stored(store: &InMemoryStore, text: String) -> Uuid {
        store
            .insert_message(NewMessage {
                business_id: Uuid::new_v4(),
                sender_id: Some(Uuid::new_v4()),
                sender_type: SenderType::Business,
                message: text,
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn notified_row_reaches_subscribers() {
        let feed = ChangeFeed::new(8);
        let store = InMemoryStore::new();
        let id = stored(&store, "Hola, en qué ayudo?".to_string()).await;
        let mut subscription = feed.subscribe_channel(MessageFilter::All);

        assert!(dispatch(&feed, &store, INSERT_CHANNEL, &id.to_string())
            .await
            .unwrap());

        let message = subscription.recv().await.unwrap();
        assert_eq!(message.id, id);
        assert_eq!(message.message, "Hola, en qué ayudo?");
    }

    #[tokio::test]
    async fn long_multibyte_message_is_published_whole() {
        let feed = ChangeFeed::new(8);
        let store = InMemoryStore::new();
        let text = "😀".repeat(2000);
        assert!(text.len() > 8000);
        let id = stored(&store, text.clone()).await;
        let mut subscription = feed.subscribe_channel(MessageFilter::All);

        let payload = id.to_string();
        assert!(payload.len() < 8000);
        assert!(dispatch(&feed, &store, INSERT_CHANNEL, &payload).await.unwrap());

        assert_eq!(subscription.recv().await.unwrap().message, text);
    }

    #[tokio::test]
    async fn malformed_payload_is_a_schema_error() {
        let feed = ChangeFeed::new(8);
        let store = InMemoryStore::new();
        let result = dispatch(&feed, &store, INSERT_CHANNEL, r#"{"id": 42}"#).await;
        assert!(matches!(result, Err(ChatError::Schema(_))));
    }

    #[tokio::test]
    async fn unknown_row_is_not_published() {
        let feed = ChangeFeed::new(8);
        let store = InMemoryStore::new();
        let payload = Uuid::new_v4().to_string();
        assert!(!dispatch(&feed, &store, INSERT_CHANNEL, &payload).await.unwrap());
    }

    #[tokio::test]
    async fn other_channels_are_ignored() {
        let feed = ChangeFeed::new(8);
        let store = InMemoryStore::new();
        assert!(!dispatch(&feed, &store, "otro_canal", "no es un id").await.unwrap());
    }
}
