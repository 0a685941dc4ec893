use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::engine::RequestContext;
use crate::errors::Result;
use crate::session::{SessionData, COOKIE_KEY};
use crate::sid::{self, IdGenerator};
use crate::store::SessionStore;

/// Process-lifetime session store.
///
/// Records live until they are destroyed or the store is cleared; expiry is never
/// enforced. Concurrent writers to the same sid follow last-write-wins. Not suitable for
/// production use.
#[derive(Default)]
pub struct MemoryStore {
    /// Session records per sid
    sessions: RwLock<HashMap<String, SessionData>>,
    /// Optional identifier generator overriding the UUID default
    generator: Option<IdGenerator>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_generator(generator: IdGenerator) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            generator: Some(generator),
        }
    }

    /// Removes every record.
    pub async fn clear(&self) {
        self.sessions.write().await.clear();
    }

    /// Snapshot of every record, keyed by sid.
    pub async fn all(&self) -> HashMap<String, SessionData> {
        self.sessions.read().await.clone()
    }

    pub async fn ids(&self) -> Vec<String> {
        self.sessions.read().await.keys().cloned().collect()
    }

    pub async fn length(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn get(&self, sid: &str) -> Result<Option<SessionData>> {
        Ok(self.sessions.read().await.get(sid).cloned())
    }

    async fn set(&self, sid: &str, data: &SessionData) -> Result<()> {
        self.sessions.write().await.insert(sid.to_string(), data.clone());
        Ok(())
    }

    async fn destroy(&self, sid: &str) -> Result<()> {
        self.sessions.write().await.remove(sid);
        Ok(())
    }

    fn supports_touch(&self) -> bool {
        true
    }

    /// Replaces only the stored cookie of an existing record.
    async fn touch(&self, sid: &str, data: &SessionData) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        if let (Some(existing), Some(cookie)) = (sessions.get_mut(sid), data.get(COOKIE_KEY)) {
            existing.insert(COOKIE_KEY.to_string(), cookie.clone());
        }
        Ok(())
    }

    async fn generate(&self, ctx: &RequestContext) -> Result<String> {
        Ok(match &self.generator {
            Some(generator) => generator(ctx),
            None => sid::generate(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    fn record(value: serde_json::Value) -> SessionData {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn miss_is_distinct_from_empty_record() {
        let store = MemoryStore::new();
        assert!(store.get("nope").await.unwrap().is_none());

        store.set("empty", &SessionData::new()).await.unwrap();
        assert_eq!(store.get("empty").await.unwrap(), Some(SessionData::new()));
    }

    #[tokio::test]
    async fn set_replaces_previous_record() {
        let store = MemoryStore::new();
        store.set("a", &record(json!({"count": 1, "name": "x"}))).await.unwrap();
        store.set("a", &record(json!({"count": 2}))).await.unwrap();

        assert_eq!(store.get("a").await.unwrap(), Some(record(json!({"count": 2}))));
        assert_eq!(store.length().await, 1);
    }

    #[tokio::test]
    async fn destroy_is_idempotent() {
        let store = MemoryStore::new();
        store.set("a", &record(json!({"count": 1}))).await.unwrap();

        store.destroy("a").await.unwrap();
        store.destroy("a").await.unwrap();
        store.destroy("never-existed").await.unwrap();

        assert!(store.get("a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn touch_only_updates_cookie_of_existing_records() {
        let store = MemoryStore::new();
        store
            .set("a", &record(json!({"count": 1, "cookie": {"maxAge": 1}})))
            .await
            .unwrap();

        store
            .touch("a", &record(json!({"count": 99, "cookie": {"maxAge": 2}})))
            .await
            .unwrap();
        store.touch("missing", &record(json!({"cookie": {}}))).await.unwrap();

        assert_eq!(
            store.get("a").await.unwrap(),
            Some(record(json!({"count": 1, "cookie": {"maxAge": 2}})))
        );
        assert!(store.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn introspection_and_clear() {
        let store = MemoryStore::new();
        store.set("a", &record(json!({"n": 1}))).await.unwrap();
        store.set("b", &record(json!({"n": 2}))).await.unwrap();

        let mut ids = store.ids().await;
        ids.sort();
        assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(store.all().await["b"], record(json!({"n": 2})));

        store.clear().await;
        assert_eq!(store.length().await, 0);
    }

    #[tokio::test]
    async fn generate_uses_injected_generator() {
        let ctx = RequestContext::default();

        let store = MemoryStore::with_generator(Arc::new(|_: &RequestContext| "fixed".to_string()));
        assert_eq!(store.generate(&ctx).await.unwrap(), "fixed");

        let store = MemoryStore::new();
        let a = store.generate(&ctx).await.unwrap();
        let b = store.generate(&ctx).await.unwrap();
        assert_ne!(a, b);
    }
}
