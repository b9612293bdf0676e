#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! Event bus used to hand scored drill sessions to whatever stores them.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::{
    fs::OpenOptions,
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    sync::broadcast,
};
use uuid::Uuid;

/// Event emitted by a drill component, encoded as one JSON object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DrillEvent {
    /// Unique identifier (`evt-<uuid>`).
    pub id: String,
    /// Component producing the event.
    pub source: String,
    /// Dotted event type (e.g. `drill.session.scored`).
    pub event_type: String,
    /// RFC3339 timestamp.
    pub timestamp: String,
    /// Arbitrary JSON payload.
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl DrillEvent {
    /// Creates an event stamped with a fresh id and the current time.
    #[must_use]
    pub fn new(
        source: impl Into<String>,
        event_type: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            id: format!("evt-{}", Uuid::new_v4()),
            source: source.into(),
            event_type: event_type.into(),
            timestamp: Utc::now().to_rfc3339(),
            payload,
        }
    }
}

/// Event publisher interface.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publishes an event to the bus.
    async fn publish(&self, event: DrillEvent) -> Result<()>;
}

/// Event subscriber interface.
#[async_trait]
pub trait EventSubscriber: Send + Sync {
    /// Returns a receiver that yields every event published after the call.
    async fn subscribe(&self) -> Result<broadcast::Receiver<DrillEvent>>;
}

/// In-memory broadcast bus that also keeps a bounded backlog.
#[derive(Debug, Clone)]
pub struct MemoryEventBus {
    sender: broadcast::Sender<DrillEvent>,
    capacity: usize,
    backlog: Arc<Mutex<VecDeque<DrillEvent>>>,
}

impl MemoryEventBus {
    /// Creates a new bus retaining at most `capacity` events.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            capacity,
            backlog: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
        }
    }

    /// Snapshot of the retained events, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<DrillEvent> {
        self.backlog.lock().iter().cloned().collect()
    }

    /// Retained events of one type, oldest first.
    #[must_use]
    pub fn events_of_type(&self, event_type: &str) -> Vec<DrillEvent> {
        self.backlog
            .lock()
            .iter()
            .filter(|event| event.event_type == event_type)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl EventPublisher for MemoryEventBus {
    async fn publish(&self, event: DrillEvent) -> Result<()> {
        {
            let mut backlog = self.backlog.lock();
            backlog.push_back(event.clone());
            while backlog.len() > self.capacity {
                backlog.pop_front();
            }
        }
        // no subscribers is not an error
        let _ = self.sender.send(event);
        Ok(())
    }
}

#[async_trait]
impl EventSubscriber for MemoryEventBus {
    async fn subscribe(&self) -> Result<broadcast::Receiver<DrillEvent>> {
        Ok(self.sender.subscribe())
    }
}

/// Append-only JSON-lines journal of events.
#[derive(Debug, Clone)]
pub struct FileEventPublisher {
    path: PathBuf,
}

impl FileEventPublisher {
    /// Creates a publisher that appends to the given path.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self { path })
    }

    /// Journal location.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads every event back, optionally keeping only one event type.
    pub async fn read_all(&self, event_type: Option<&str>) -> Result<Vec<DrillEvent>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let file = tokio::fs::File::open(&self.path)
            .await
            .with_context(|| format!("opening event journal {}", self.path.display()))?;
        let mut lines = BufReader::new(file).lines();
        let mut events = Vec::new();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            let event: DrillEvent = serde_json::from_str(&line)
                .with_context(|| format!("malformed event in {}", self.path.display()))?;
            if event_type.map_or(true, |wanted| event.event_type == wanted) {
                events.push(event);
            }
        }
        Ok(events)
    }
}

#[async_trait]
impl EventPublisher for FileEventPublisher {
    async fn publish(&self, event: DrillEvent) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        let mut data = serde_json::to_vec(&event)?;
        data.push(b'\n');
        file.write_all(&data).await?;
        file.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use tokio::runtime::Runtime;

    fn scored_event(correct: u32) -> DrillEvent {
        DrillEvent::new(
            "comprehension",
            "drill.session.scored",
            serde_json::json!({ "correct": correct, "total": 5 }),
        )
    }

    #[test]
    fn publishes_and_receives() {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let bus = MemoryEventBus::new(16);
            let mut rx = bus.subscribe().await.unwrap();
            bus.publish(scored_event(3)).await.unwrap();
            let event = rx.recv().await.unwrap();
            assert_eq!(event.event_type, "drill.session.scored");
            assert!(event.id.starts_with("evt-"));
        });
    }

    #[test]
    fn backlog_is_bounded() {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let bus = MemoryEventBus::new(2);
            for correct in 0..4 {
                bus.publish(scored_event(correct)).await.unwrap();
            }
            let kept = bus.snapshot();
            assert_eq!(kept.len(), 2);
            assert_eq!(kept[0].payload["correct"], 2);
            assert_eq!(bus.events_of_type("drill.session.scored").len(), 2);
            assert!(bus.events_of_type("other").is_empty());
        });
    }

    #[test]
    fn file_publisher_round_trips_journal() {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let dir = tempdir().unwrap();
            let publisher = FileEventPublisher::new(dir.path().join("events/sessions.jsonl")).unwrap();
            assert!(publisher.read_all(None).await.unwrap().is_empty());
            publisher.publish(scored_event(4)).await.unwrap();
            publisher
                .publish(DrillEvent::new("cli", "drill.other", serde_json::Value::Null))
                .await
                .unwrap();
            let scored = publisher
                .read_all(Some("drill.session.scored"))
                .await
                .unwrap();
            assert_eq!(scored.len(), 1);
            assert_eq!(scored[0].payload["correct"], 4);
            assert_eq!(publisher.read_all(None).await.unwrap().len(), 2);
        });
    }
}
