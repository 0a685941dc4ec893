//! Session identifier generation.
use std::sync::Arc;

use uuid::Uuid;

use crate::engine::RequestContext;

/// Injected identifier generator. Receives the request the session is minted for.
pub type IdGenerator = Arc<dyn Fn(&RequestContext) -> String + Send + Sync>;

/// Default identifier: a random (v4) UUID.
pub fn generate() -> String {
    Uuid::new_v4().to_string()
}
