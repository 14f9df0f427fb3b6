//! In-process cache
//!
//! Small lookaside keyed by string. Scalar and set operations all go
//! through the same lock so concurrent readers and writers observe a
//! consistent map.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
enum Entry {
    Scalar(String),
    Set(Vec<String>),
}

#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Option<String>;
    async fn set(&self, key: &str, value: String);
    async fn add_to_set(&self, key: &str, value: String);
    async fn contains(&self, key: &str, value: &str) -> bool;
}

/// Map-backed cache; every operation takes the same mutex.
#[derive(Debug, Default)]
pub struct InMemoryCache {
    entries: Mutex<HashMap<String, Entry>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.lock().await;
        match entries.get(key) {
            Some(Entry::Scalar(value)) => Some(value.clone()),
            _ => None,
        }
    }

    async fn set(&self, key: &str, value: String) {
        let mut entries = self.entries.lock().await;
        entries.insert(key.to_string(), Entry::Scalar(value));
    }

    async fn add_to_set(&self, key: &str, value: String) {
        let mut entries = self.entries.lock().await;
        match entries.get_mut(key) {
            Some(Entry::Set(values)) => values.push(value),
            _ => {
                entries.insert(key.to_string(), Entry::Set(vec![value]));
            }
        }
    }

    async fn contains(&self, key: &str, value: &str) -> bool {
        let entries = self.entries.lock().await;
        match entries.get(key) {
            Some(Entry::Set(values)) => values.iter().any(|v| v == value),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_scalar_get_set() {
        let cache = InMemoryCache::new();
        assert_eq!(cache.get("k").await, None);

        cache.set("k", "v1".to_string()).await;
        assert_eq!(cache.get("k").await, Some("v1".to_string()));

        cache.set("k", "v2".to_string()).await;
        assert_eq!(cache.get("k").await, Some("v2".to_string()));
    }

    #[tokio::test]
    async fn test_set_membership() {
        let cache = InMemoryCache::new();
        assert!(!cache.contains("members", "a").await);

        cache.add_to_set("members", "a".to_string()).await;
        cache.add_to_set("members", "b".to_string()).await;

        assert!(cache.contains("members", "a").await);
        assert!(cache.contains("members", "b").await);
        assert!(!cache.contains("members", "c").await);
    }

    #[tokio::test]
    async fn test_scalar_does_not_answer_set_queries() {
        let cache = InMemoryCache::new();
        cache.set("k", "v".to_string()).await;
        assert!(!cache.contains("k", "v").await);
    }

    #[tokio::test]
    async fn test_concurrent_scalar_access() {
        let cache = Arc::new(InMemoryCache::new());

        let mut handles = Vec::new();
        for i in 0..16 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move {
                cache.set(&format!("k{}", i), format!("v{}", i)).await;
                cache.get(&format!("k{}", i)).await
            }));
        }

        for (i, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.await.unwrap(), Some(format!("v{}", i)));
        }
    }
}
