use parking_lot::Mutex;
use parley_types::Chat;
use std::collections::HashMap;
use std::sync::{Arc, Weak};

/// Receives a user's full chat list every time any of those chats changes
pub type ChatsCallback = Arc<dyn Fn(Vec<Chat>) + Send + Sync>;

struct Observer {
    id: u64,
    callback: ChatsCallback,
    /// Revision of the newest snapshot already dispatched to this observer
    last_revision: u64,
}

/// Callbacks keyed by user id. Any number of observers may watch the same user.
#[derive(Default)]
pub(crate) struct SubscriptionRegistry {
    next_id: u64,
    observers: HashMap<String, Vec<Observer>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer that has already been shown `revision`
    pub fn add(&mut self, user_id: &str, callback: ChatsCallback, revision: u64) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        self.observers
            .entry(user_id.to_string())
            .or_default()
            .push(Observer {
                id,
                callback,
                last_revision: revision,
            });
        id
    }

    pub fn remove(&mut self, user_id: &str, id: u64) -> bool {
        let Some(list) = self.observers.get_mut(user_id) else {
            return false;
        };
        let before = list.len();
        list.retain(|o| o.id != id);
        let removed = list.len() != before;
        if list.is_empty() {
            self.observers.remove(user_id);
        }
        removed
    }

    pub fn has_observers(&self, user_id: &str) -> bool {
        self.observers.contains_key(user_id)
    }

    pub fn observer_count(&self, user_id: &str) -> usize {
        self.observers.get(user_id).map_or(0, Vec::len)
    }

    /// Claim delivery of `revision` for every observer of `user_id` that has
    /// not seen anything newer. Returns the callbacks to invoke.
    pub fn claim(&mut self, user_id: &str, revision: u64) -> Vec<ChatsCallback> {
        let Some(list) = self.observers.get_mut(user_id) else {
            return Vec::new();
        };
        list.iter_mut()
            .filter(|o| o.last_revision <= revision)
            .map(|o| {
                o.last_revision = revision;
                Arc::clone(&o.callback)
            })
            .collect()
    }

    /// `claim` for the single observer `id`
    pub fn claim_observer(&mut self, user_id: &str, id: u64, revision: u64) -> Option<ChatsCallback> {
        let observer = self
            .observers
            .get_mut(user_id)?
            .iter_mut()
            .find(|o| o.id == id && o.last_revision <= revision)?;
        observer.last_revision = revision;
        Some(Arc::clone(&observer.callback))
    }
}

/// Handle returned by `ChatService::subscribe`.
///
/// Dropping it deregisters the callback; keep it alive for as long as updates
/// are wanted.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    registry: Weak<Mutex<SubscriptionRegistry>>,
    user_id: String,
    id: u64,
}

impl Subscription {
    pub(crate) fn new(registry: &Arc<Mutex<SubscriptionRegistry>>, user_id: &str, id: u64) -> Self {
        Self {
            registry: Arc::downgrade(registry),
            user_id: user_id.to_string(),
            id,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    /// Stop receiving updates
    pub fn unsubscribe(self) {
        // Drop does the work
    }

    fn detach(&self) {
        if let Some(registry) = self.registry.upgrade() {
            if registry.lock().remove(&self.user_id, self.id) {
                tracing::debug!(user_id = %self.user_id, subscription = self.id, "Unsubscribed");
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.detach();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("user_id", &self.user_id)
            .field("id", &self.id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> ChatsCallback {
        Arc::new(|_| {})
    }

    #[test]
    fn test_multiple_observers_per_user() {
        let mut registry = SubscriptionRegistry::new();
        registry.add("u1", noop(), 0);
        registry.add("u1", noop(), 0);
        assert_eq!(registry.observer_count("u1"), 2);
        assert_eq!(registry.claim("u1", 1).len(), 2);
    }

    #[test]
    fn test_claim_skips_stale_revisions() {
        let mut registry = SubscriptionRegistry::new();
        registry.add("u1", noop(), 5);
        assert!(registry.claim("u1", 4).is_empty());
        assert_eq!(registry.claim("u1", 5).len(), 1);
        assert_eq!(registry.claim("u1", 7).len(), 1);
        assert!(registry.claim("u1", 6).is_empty());
    }

    #[test]
    fn test_claim_observer_respects_watermark() {
        let mut registry = SubscriptionRegistry::new();
        let first = registry.add("u1", noop(), 0);
        let second = registry.add("u1", noop(), 0);

        assert_eq!(registry.claim("u1", 3).len(), 2);
        assert!(registry.claim_observer("u1", first, 2).is_none());
        assert!(registry.claim_observer("u1", second, 4).is_some());
        // Only `second` moved on
        assert_eq!(registry.claim("u1", 3).len(), 1);
        assert!(registry.claim_observer("u1", 99, 9).is_none());
    }

    #[test]
    fn test_remove_last_observer_drops_key() {
        let mut registry = SubscriptionRegistry::new();
        let id = registry.add("u1", noop(), 0);
        assert!(registry.remove("u1", id));
        assert!(!registry.has_observers("u1"));
        assert!(!registry.remove("u1", id));
    }

    #[test]
    fn test_subscription_drop_deregisters() {
        let registry = Arc::new(Mutex::new(SubscriptionRegistry::new()));
        let id = registry.lock().add("u1", noop(), 0);
        let sub = Subscription::new(&registry, "u1", id);
        assert_eq!(registry.lock().observer_count("u1"), 1);
        sub.unsubscribe();
        assert_eq!(registry.lock().observer_count("u1"), 0);
    }
}
