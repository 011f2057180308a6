//! Typed event bus for UI subscribers.
//!
//! Components publish what they loaded or rebuilt; the UI layer subscribes
//! instead of polling. Publishing with no subscribers is not an error.

use crate::types::Heading;
use serde::Serialize;
use tokio::sync::broadcast;

/// Default number of events buffered per subscriber.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Events emitted by the stores and the search index.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BrowserEvent {
    /// A document was fetched from the content source (not a cache hit)
    DocumentLoaded {
        path: String,
        tags: Vec<String>,
        headings: Vec<Heading>,
    },
    /// A search index build finished
    IndexRebuilt { indexed: usize, failed: usize },
    /// A component cache was cleared, wholly (`path: None`) or for one path
    CacheCleared {
        component: &'static str,
        path: Option<String>,
    },
}

#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<BrowserEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BrowserEvent> {
        self.sender.subscribe()
    }

    /// Publish to current subscribers. Returns how many received it.
    pub fn publish(&self, event: BrowserEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
