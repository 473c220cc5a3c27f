//! Properties as held by the publisher, and the task that feeds them from
//! the outbound channel.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use deskstat_core::StatusValue;
use tokio::sync::{RwLock, broadcast, mpsc};

use crate::protocol::{PropertyBatch, PropertyEntry};

/// Notification batches kept for slow subscribers before they lag.
const BATCH_BACKLOG: usize = 64;

/// Property store plus the change broadcast. Cheap to clone; the server and
/// the publisher task share one.
#[derive(Clone)]
pub struct PropertyBus {
    properties: Arc<RwLock<BTreeMap<String, PropertyEntry>>>,
    changes: broadcast::Sender<PropertyBatch>,
}

impl Default for PropertyBus {
    fn default() -> Self {
        Self::new()
    }
}

impl PropertyBus {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(BATCH_BACKLOG);
        Self {
            properties: Arc::new(RwLock::new(BTreeMap::new())),
            changes,
        }
    }

    /// Register the starting value of a tag without notifying anyone.
    pub async fn register(&self, status: &StatusValue) {
        let content = status.content();
        self.properties.write().await.insert(
            status.tag.clone(),
            PropertyEntry {
                label: content.label,
                text: content.text,
                updated_at: Utc::now(),
            },
        );
    }

    pub async fn get(&self, tag: &str) -> Option<PropertyEntry> {
        self.properties.read().await.get(tag).cloned()
    }

    pub async fn list(&self) -> BTreeMap<String, PropertyEntry> {
        self.properties.read().await.clone()
    }

    /// Every property as one batch, for subscribers that fell behind.
    pub async fn snapshot(&self) -> PropertyBatch {
        self.properties
            .read()
            .await
            .iter()
            .map(|(tag, entry)| (tag.clone(), entry.content()))
            .collect()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PropertyBatch> {
        self.changes.subscribe()
    }

    /// Store `values` and notify subscribers with one batch. The store is
    /// updated before the batch goes out, so a read after a notification
    /// never sees older data.
    pub async fn publish(&self, values: Vec<StatusValue>) -> usize {
        let now = Utc::now();
        let mut batch = PropertyBatch::new();
        {
            let mut properties = self.properties.write().await;
            for status in values {
                let content = status.content();
                properties.insert(
                    status.tag.clone(),
                    PropertyEntry {
                        label: content.label.clone(),
                        text: content.text.clone(),
                        updated_at: now,
                    },
                );
                batch.insert(status.tag, content);
            }
        }
        let len = batch.len();
        if len > 0 {
            tracing::debug!(tags = ?batch.keys().collect::<Vec<_>>(), "properties changed");
            // No subscriber is not an error.
            let _ = self.changes.send(batch);
        }
        len
    }
}

/// Move values from the outbound channel onto the bus until the channel is
/// closed. Whatever is queued at once goes out as one batch.
pub async fn drain_outbound(bus: PropertyBus, mut outbound: mpsc::Receiver<StatusValue>) {
    while let Some(first) = outbound.recv().await {
        let mut values = vec![first];
        while let Ok(next) = outbound.try_recv() {
            values.push(next);
        }
        bus.publish(values).await;
    }
    tracing::debug!("outbound channel closed");
}
