use parking_lot::Mutex;
use parley_types::{Chat, Message, MessageDraft, User};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::registry::{ChatsCallback, Subscription, SubscriptionRegistry};
use crate::seed;
use crate::store::EntityStore;

/// Snapshots computed under the store lock, delivered after it is released
struct Delivery {
    revision: u64,
    snapshots: Vec<(String, Vec<Chat>)>,
}

impl Delivery {
    fn for_users(store: &EntityStore, user_ids: impl IntoIterator<Item = String>) -> Self {
        Self {
            revision: store.revision(),
            snapshots: user_ids
                .into_iter()
                .map(|id| {
                    let chats = store.chats_for(&id);
                    (id, chats)
                })
                .collect(),
        }
    }

    fn for_chat(store: &EntityStore, chat: &Chat) -> Self {
        Self::for_users(store, chat.participants.iter().map(|p| p.id.clone()))
    }
}

/// A registered observer whose first snapshot has not been dispatched yet
struct PendingSubscription {
    subscription: Subscription,
    revision: u64,
    snapshot: Vec<Chat>,
}

struct Inner {
    store: Mutex<EntityStore>,
    registry: Arc<Mutex<SubscriptionRegistry>>,
}

/// Messaging service: owns the entity store and fans out chat snapshots to
/// subscribers after every mutation.
///
/// Cloning is cheap and every clone shares the same state. Separate
/// `ChatService::new()` calls are fully independent.
///
/// Mutations are serialized through a single lock. Subscriber callbacks run
/// synchronously before the mutating call returns, but outside that lock, so a
/// callback may call back into the service.
#[derive(Clone)]
pub struct ChatService {
    inner: Arc<Inner>,
}

impl ChatService {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                store: Mutex::new(EntityStore::new()),
                registry: Arc::new(Mutex::new(SubscriptionRegistry::new())),
            }),
        }
    }

    /// Load the fixed dataset. Only the first call does anything; returns
    /// whether this call seeded.
    pub async fn seed(&self) -> bool {
        let delivery = {
            let mut store = self.inner.store.lock();
            if store.is_seeded() {
                tracing::debug!("Store already contains data, skipping seed");
                return false;
            }
            let users = seed::users();
            let chats = seed::chats(&users);
            tracing::info!(users = users.len(), chats = chats.len(), "Seeding in-memory store");
            store.load(users, chats);
            let ids = store.users().iter().map(|u| u.id.clone()).collect::<Vec<_>>();
            Delivery::for_users(&store, ids)
        };
        self.deliver(delivery);
        true
    }

    pub async fn get_users(&self) -> Vec<User> {
        self.inner.store.lock().users().to_vec()
    }

    pub async fn get_user(&self, user_id: &str) -> Result<User> {
        self.inner
            .store
            .lock()
            .user(user_id)
            .cloned()
            .ok_or_else(|| StoreError::UserNotFound(user_id.to_string()))
    }

    pub async fn get_chat(&self, chat_id: &str) -> Result<Chat> {
        self.inner
            .store
            .lock()
            .chat(chat_id)
            .cloned()
            .ok_or_else(|| StoreError::ChatNotFound(chat_id.to_string()))
    }

    /// Every chat `user_id` participates in (what subscribers receive)
    pub async fn chats_for(&self, user_id: &str) -> Vec<Chat> {
        self.inner.store.lock().chats_for(user_id)
    }

    /// Watch the chat list of `user_id`.
    ///
    /// The callback is invoked once right away with the current snapshot, then
    /// after every change to any chat the user is in. A change that lands while
    /// subscribing supersedes the initial snapshot instead of following it.
    pub fn subscribe<F>(&self, user_id: &str, callback: F) -> Subscription
    where
        F: Fn(Vec<Chat>) + Send + Sync + 'static,
    {
        let pending = self.register(user_id, Arc::new(callback));
        self.deliver_initial(pending)
    }

    /// Add the observer while holding the store lock, so no mutation can fall
    /// between reading the snapshot and registering.
    fn register(&self, user_id: &str, callback: ChatsCallback) -> PendingSubscription {
        let store = self.inner.store.lock();
        let (id, observers) = {
            let mut registry = self.inner.registry.lock();
            // Nothing dispatched yet; the initial snapshot is claimed like any other
            let id = registry.add(user_id, callback, 0);
            (id, registry.observer_count(user_id))
        };
        tracing::debug!(user_id, subscription = id, observers, "Subscribed to chat updates");

        PendingSubscription {
            subscription: Subscription::new(&self.inner.registry, user_id, id),
            revision: store.revision(),
            snapshot: store.chats_for(user_id),
        }
    }

    fn deliver_initial(&self, pending: PendingSubscription) -> Subscription {
        let PendingSubscription {
            subscription,
            revision,
            snapshot,
        } = pending;
        let callback = self
            .inner
            .registry
            .lock()
            .claim_observer(subscription.user_id(), subscription.id(), revision);
        if let Some(callback) = callback {
            callback(snapshot);
        }
        subscription
    }

    /// Push the current snapshot to every observer of `user_id`. No-op when nobody is subscribed.
    pub fn notify(&self, user_id: &str) {
        if !self.inner.registry.lock().has_observers(user_id) {
            return;
        }
        let delivery = {
            let store = self.inner.store.lock();
            Delivery::for_users(&store, [user_id.to_string()])
        };
        self.deliver(delivery);
    }

    /// `notify` every participant of `chat_id`
    pub fn notify_participants(&self, chat_id: &str) {
        let delivery = {
            let store = self.inner.store.lock();
            match store.chat(chat_id) {
                Some(chat) => Delivery::for_chat(&store, chat),
                None => return,
            }
        };
        self.deliver(delivery);
    }

    /// Append a message to `chat_id` and notify both participants.
    ///
    /// The store assigns the message id; the stored message is returned.
    pub async fn send_message(&self, chat_id: &str, draft: MessageDraft) -> Result<Message> {
        let (message, delivery) = {
            let mut store = self.inner.store.lock();
            if store.user(&draft.sender_id).is_none() {
                return Err(StoreError::UserNotFound(draft.sender_id));
            }
            let Some(chat) = store.chat_mut(chat_id) else {
                tracing::warn!(chat_id, "Error sending message: chat not found");
                return Err(StoreError::ChatNotFound(chat_id.to_string()));
            };
            if !chat.has_participant(&draft.sender_id) {
                return Err(StoreError::NotParticipant {
                    chat_id: chat_id.to_string(),
                    user_id: draft.sender_id,
                });
            }

            let message = draft.into_message(format!("msg-{}", Uuid::new_v4().simple()));
            chat.messages.push(message.clone());
            store.bump();

            let chat = store
                .chat(chat_id)
                .ok_or_else(|| StoreError::ChatNotFound(chat_id.to_string()))?;
            (message, Delivery::for_chat(&store, chat))
        };

        tracing::debug!(chat_id, message_id = %message.id, sender_id = %message.sender_id, "Message sent");
        self.deliver(delivery);
        Ok(message)
    }

    /// Mark every message in `chat_id` that `reader_id` did not send as read.
    ///
    /// Returns how many messages flipped. Participants are notified only if
    /// that number is non-zero.
    pub async fn mark_messages_as_read(&self, chat_id: &str, reader_id: &str) -> Result<usize> {
        let (changed, delivery) = {
            let mut store = self.inner.store.lock();
            let chat = store
                .chat_mut(chat_id)
                .ok_or_else(|| StoreError::ChatNotFound(chat_id.to_string()))?;

            let mut changed = 0;
            for message in chat
                .messages
                .iter_mut()
                .filter(|m| !m.is_read && m.sender_id != reader_id)
            {
                message.is_read = true;
                changed += 1;
            }
            if changed == 0 {
                return Ok(0);
            }

            store.bump();
            let chat = store
                .chat(chat_id)
                .ok_or_else(|| StoreError::ChatNotFound(chat_id.to_string()))?;
            (changed, Delivery::for_chat(&store, chat))
        };

        tracing::debug!(chat_id, reader_id, changed, "Messages marked as read");
        self.deliver(delivery);
        Ok(changed)
    }

    /// Add or remove `user_id` from the typing set of `chat_id`.
    ///
    /// Returns whether membership changed; repeats are silent.
    pub async fn update_typing_status(&self, chat_id: &str, user_id: &str, is_typing: bool) -> Result<bool> {
        let delivery = {
            let mut store = self.inner.store.lock();
            let chat = store
                .chat_mut(chat_id)
                .ok_or_else(|| StoreError::ChatNotFound(chat_id.to_string()))?;
            if !chat.has_participant(user_id) {
                return Err(StoreError::NotParticipant {
                    chat_id: chat_id.to_string(),
                    user_id: user_id.to_string(),
                });
            }

            let changed = if is_typing {
                chat.typing.insert(user_id.to_string())
            } else {
                chat.typing.remove(user_id)
            };
            if !changed {
                return Ok(false);
            }

            store.bump();
            let chat = store
                .chat(chat_id)
                .ok_or_else(|| StoreError::ChatNotFound(chat_id.to_string()))?;
            Delivery::for_chat(&store, chat)
        };

        tracing::trace!(chat_id, user_id, is_typing, "Typing status changed");
        self.deliver(delivery);
        Ok(true)
    }

    /// Return the chat between the two users, creating it on first contact.
    pub async fn find_or_create_chat(&self, current_user_id: &str, other_user_id: &str) -> Result<String> {
        let (chat_id, delivery) = {
            let mut store = self.inner.store.lock();
            let current = store
                .user(current_user_id)
                .cloned()
                .ok_or_else(|| StoreError::UserNotFound(current_user_id.to_string()))?;
            let other = store
                .user(other_user_id)
                .cloned()
                .ok_or_else(|| StoreError::UserNotFound(other_user_id.to_string()))?;
            if current.id == other.id {
                return Err(StoreError::InvalidPair(current.id));
            }

            if let Some(existing) = store.find_pair(&current.id, &other.id) {
                return Ok(existing.id.clone());
            }

            let chat = Chat::new(format!("chat-{}", Uuid::new_v4().simple()), current, other);
            let chat_id = chat.id.clone();
            let delivery_ids = chat.participants.iter().map(|p| p.id.clone()).collect::<Vec<_>>();
            store.insert_chat(chat);
            store.bump();
            (chat_id, Delivery::for_users(&store, delivery_ids))
        };

        tracing::info!(chat_id = %chat_id, current_user_id, other_user_id, "Created chat");
        self.deliver(delivery);
        Ok(chat_id)
    }

    fn deliver(&self, delivery: Delivery) {
        for (user_id, chats) in delivery.snapshots {
            let callbacks = self.inner.registry.lock().claim(&user_id, delivery.revision);
            for callback in callbacks {
                callback(chats.clone());
            }
        }
    }
}

impl Default for ChatService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let service = ChatService::new();
        assert!(service.seed().await);
        let users = service.get_users().await;
        let chats = service.chats_for("user-1").await;

        assert!(!service.seed().await);
        assert_eq!(service.get_users().await, users);
        assert_eq!(service.chats_for("user-1").await, chats);
    }

    #[tokio::test]
    async fn test_instances_are_independent() {
        let a = ChatService::new();
        let b = ChatService::new();
        a.seed().await;
        assert!(!a.get_users().await.is_empty());
        assert!(b.get_users().await.is_empty());
    }

    fn recorder() -> (Arc<parking_lot::Mutex<Vec<Vec<Chat>>>>, ChatsCallback) {
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, Arc::new(move |chats| sink.lock().push(chats)))
    }

    fn chat_1_texts(snapshot: &[Chat]) -> Vec<String> {
        snapshot
            .iter()
            .find(|c| c.id == "chat-1")
            .map(|c| c.messages.iter().map(|m| m.text.clone()).collect())
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn test_write_during_subscribe_supersedes_initial_snapshot() {
        let service = ChatService::new();
        service.seed().await;

        let (seen, callback) = recorder();
        let pending = service.register("user-1", callback);

        // Lands after registration but before the initial snapshot goes out
        service
            .send_message("chat-1", MessageDraft::now("user-2", "racing"))
            .await
            .unwrap();
        let _sub = service.deliver_initial(pending);

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert!(chat_1_texts(&seen[0]).contains(&"racing".to_string()));
    }

    #[tokio::test]
    async fn test_initial_snapshot_precedes_later_writes() {
        let service = ChatService::new();
        service.seed().await;

        let (seen, callback) = recorder();
        let pending = service.register("user-1", callback);
        let _sub = service.deliver_initial(pending);
        service
            .send_message("chat-1", MessageDraft::now("user-2", "after"))
            .await
            .unwrap();

        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert!(!chat_1_texts(&seen[0]).contains(&"after".to_string()));
        assert!(chat_1_texts(&seen[1]).contains(&"after".to_string()));
    }

    #[tokio::test]
    async fn test_callback_may_reenter_service() {
        let service = ChatService::new();
        service.seed().await;

        let reentrant = service.clone();
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_cb = Arc::clone(&seen);
        let _sub = service.subscribe("user-2", move |_| {
            // Takes both the store and registry locks
            reentrant.notify_participants("chat-2");
            seen_cb.fetch_add(1, Ordering::SeqCst);
        });

        service
            .send_message("chat-1", MessageDraft::now("user-1", "ping"))
            .await
            .unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }
}
