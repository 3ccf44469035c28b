//! Paged access to each resource handler's backfill stream.
//!
//! The first page request for a handler asks it for a stream and keeps the
//! cursor; later requests keep draining the same cursor. Each handler has its
//! own slot lock, so concurrent requests for one handler never lose or repeat
//! items while requests for different handlers proceed independently.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::StreamExt;
use tokio::sync::{Mutex, RwLock};

use crate::handler::{BackfillStream, ResourceHandler};
use crate::remote::ResourceDb;
use crate::resource::Resource;

pub const DEFAULT_PAGE_SIZE: usize = 10;

struct Cursor {
    stream: BackfillStream,
    created: Instant,
}

type Slot = Arc<Mutex<Option<Cursor>>>;

/// Backfill cursors keyed by handler name.
pub struct BackfillCache {
    slots: RwLock<HashMap<String, Slot>>,
    ttl: Option<Duration>,
}

impl BackfillCache {
    /// `ttl = None` keeps a cursor until its stream is exhausted. A zero TTL
    /// is treated the same way.
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            ttl: ttl.filter(|ttl| !ttl.is_zero()),
        }
    }

    async fn slot(&self, name: &str) -> Slot {
        if let Some(slot) = self.slots.read().await.get(name) {
            return Arc::clone(slot);
        }
        let mut slots = self.slots.write().await;
        let slot = slots.entry(name.to_string()).or_default();
        Arc::clone(slot)
    }

    /// Pull up to `page_size` items for `name`.
    ///
    /// Returns `None` when nothing was pulled: the handler does not support
    /// backfill, or its stream is exhausted.
    pub async fn next_page(
        &self,
        name: &str,
        handler: &dyn ResourceHandler,
        db: Arc<dyn ResourceDb>,
        page_size: usize,
    ) -> Option<Vec<Resource>> {
        let slot = self.slot(name).await;
        let mut guard = slot.lock().await;

        if let (Some(ttl), Some(cursor)) = (self.ttl, guard.as_ref()) {
            if cursor.created.elapsed() >= ttl {
                tracing::debug!(handler = %name, "Backfill cursor expired");
                *guard = None;
            }
        }

        if guard.is_none() {
            let Some(stream) = handler.backfill_resources(db).await else {
                tracing::debug!(handler = %name, "Backfill not supported");
                return None;
            };
            tracing::info!(handler = %name, "Backfill cursor created");
            *guard = Some(Cursor {
                stream,
                created: Instant::now(),
            });
        }

        let cursor = guard.as_mut()?;
        let mut page = Vec::new();
        while page.len() < page_size {
            match cursor.stream.next().await {
                Some(resource) => page.push(resource),
                None => break,
            }
        }

        tracing::debug!(handler = %name, items = page.len(), "Backfill page served");
        if page.is_empty() {
            None
        } else {
            Some(page)
        }
    }
}

impl Default for BackfillCache {
    fn default() -> Self {
        Self::new(None)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
