//! Conversation cache
//!
//! Bounded in-memory view over the conversation store. A fixed-capacity
//! LRU map keeps the hot conversations resident; inserting past capacity
//! evicts the least recently accessed entry. All mutations go through one
//! mutex so the recency order stays well-defined under concurrent access.

use std::num::NonZeroUsize;

use lru::LruCache;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::types::Conversation;

/// Fixed-capacity LRU cache of active conversations.
pub struct ConversationCache {
    inner: Mutex<LruCache<Uuid, Conversation>>,
}

impl ConversationCache {
    /// Create a cache holding at most `capacity` conversations.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Fetch a conversation, renewing its recency on hit.
    pub async fn get(&self, id: Uuid) -> Option<Conversation> {
        self.inner.lock().await.get(&id).cloned()
    }

    /// Insert or refresh a conversation, evicting the least recently used
    /// entry when at capacity.
    pub async fn insert(&self, conversation: Conversation) {
        let mut inner = self.inner.lock().await;
        if let Some((evicted, _)) = inner.push(conversation.id, conversation) {
            tracing::debug!(conversation = %evicted, "evicted conversation from cache");
        }
    }

    /// Remove a conversation outright (deletion purges the cache entry).
    pub async fn remove(&self, id: Uuid) -> bool {
        self.inner.lock().await.pop(&id).is_some()
    }

    /// Whether `id` is cached, without touching recency.
    pub async fn contains(&self, id: Uuid) -> bool {
        self.inner.lock().await.peek(&id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conversation() -> Conversation {
        Conversation::new(None, None)
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let cache = ConversationCache::new(4);
        let conv = conversation();
        cache.insert(conv.clone()).await;
        assert_eq!(cache.get(conv.id).await.unwrap().id, conv.id);
        assert!(cache.get(Uuid::new_v4()).await.is_none());
    }

    #[tokio::test]
    async fn test_capacity_evicts_least_recently_used() {
        let cache = ConversationCache::new(3);
        let convs: Vec<Conversation> = (0..4).map(|_| conversation()).collect();
        for conv in &convs[..3] {
            cache.insert(conv.clone()).await;
        }

        // Fourth insert evicts the oldest entry and only that entry.
        cache.insert(convs[3].clone()).await;
        assert_eq!(cache.len().await, 3);
        assert!(!cache.contains(convs[0].id).await);
        assert!(cache.contains(convs[1].id).await);
        assert!(cache.contains(convs[2].id).await);
        assert!(cache.contains(convs[3].id).await);
    }

    #[tokio::test]
    async fn test_get_renews_recency() {
        let cache = ConversationCache::new(3);
        let convs: Vec<Conversation> = (0..4).map(|_| conversation()).collect();
        for conv in &convs[..3] {
            cache.insert(conv.clone()).await;
        }

        // Touch the oldest entry; the next insert now evicts convs[1].
        cache.get(convs[0].id).await.unwrap();
        cache.insert(convs[3].clone()).await;

        assert!(cache.contains(convs[0].id).await);
        assert!(!cache.contains(convs[1].id).await);
    }

    #[tokio::test]
    async fn test_remove() {
        let cache = ConversationCache::new(2);
        let conv = conversation();
        cache.insert(conv.clone()).await;
        assert!(cache.remove(conv.id).await);
        assert!(!cache.remove(conv.id).await);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_reinsert_updates_in_place() {
        let cache = ConversationCache::new(2);
        let mut conv = conversation();
        cache.insert(conv.clone()).await;
        conv.title = Some("updated".into());
        cache.insert(conv.clone()).await;

        assert_eq!(cache.len().await, 1);
        assert_eq!(
            cache.get(conv.id).await.unwrap().title.as_deref(),
            Some("updated")
        );
    }
}
