//! Store test double that records every call.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::engine::RequestContext;
use crate::errors::{Result, SessionError};
use crate::session::SessionData;
use crate::store::{MemoryStore, SessionStore};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Get(String),
    Set(String, SessionData),
    Destroy(String),
    Touch(String),
    Generate,
}

#[derive(Default)]
pub(crate) struct RecordingStore {
    pub inner: MemoryStore,
    calls: Mutex<Vec<Call>>,
    pub fail_get: AtomicBool,
    pub fail_set: AtomicBool,
    pub touch: AtomicBool,
}

impl RecordingStore {
    pub fn new() -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        Self::default()
    }

    pub fn with_touch() -> Self {
        let store = Self::new();
        store.touch.store(true, Ordering::SeqCst);
        store
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn sets(&self) -> Vec<(String, SessionData)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Set(sid, data) => Some((sid, data)),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| pred(c)).count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl SessionStore for RecordingStore {
    async fn get(&self, sid: &str) -> Result<Option<SessionData>> {
        self.record(Call::Get(sid.to_string()));
        if self.fail_get.load(Ordering::SeqCst) {
            return Err(SessionError::store(anyhow::anyhow!("connection refused")));
        }
        self.inner.get(sid).await
    }

    async fn set(&self, sid: &str, data: &SessionData) -> Result<()> {
        self.record(Call::Set(sid.to_string(), data.clone()));
        if self.fail_set.load(Ordering::SeqCst) {
            return Err(SessionError::store(anyhow::anyhow!("disk full")));
        }
        self.inner.set(sid, data).await
    }

    async fn destroy(&self, sid: &str) -> Result<()> {
        self.record(Call::Destroy(sid.to_string()));
        self.inner.destroy(sid).await
    }

    fn supports_touch(&self) -> bool {
        self.touch.load(Ordering::SeqCst)
    }

    async fn touch(&self, sid: &str, data: &SessionData) -> Result<()> {
        self.record(Call::Touch(sid.to_string()));
        self.inner.touch(sid, data).await
    }

    async fn generate(&self, ctx: &RequestContext) -> Result<String> {
        self.record(Call::Generate);
        self.inner.generate(ctx).await
    }
}
