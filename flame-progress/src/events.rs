//! Progress event stream.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use flame_catalog::ScrollId;
use flame_grading::SubmissionStatus;

/// Something that happened to a learner's progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// A scroll became the active one
    ScrollActivated { scroll_id: ScrollId },
    /// A section was completed
    SectionCompleted {
        scroll_id: ScrollId,
        section_id: String,
        awarded: u64,
    },
    /// A challenge submission is waiting for its grade
    SubmissionCreated {
        submission_id: String,
        scroll_id: ScrollId,
    },
    /// A submission reached a terminal status
    SubmissionResolved {
        submission_id: String,
        scroll_id: ScrollId,
        status: SubmissionStatus,
        awarded: u64,
    },
    /// A scroll was completed
    ScrollCompleted { scroll_id: ScrollId },
    /// Scrolls that were locked became available
    ScrollsUnlocked { scroll_ids: Vec<ScrollId> },
}

impl ProgressEvent {
    /// Scroll the event concerns, if exactly one.
    pub fn scroll_id(&self) -> Option<&str> {
        match self {
            Self::ScrollActivated { scroll_id }
            | Self::SectionCompleted { scroll_id, .. }
            | Self::SubmissionCreated { scroll_id, .. }
            | Self::SubmissionResolved { scroll_id, .. }
            | Self::ScrollCompleted { scroll_id } => Some(scroll_id),
            Self::ScrollsUnlocked { .. } => None,
        }
    }
}

/// Fan-out of progress events to any number of subscribers.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ProgressEvent>,
}

impl EventBus {
    /// Create a bus buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish an event.
    pub fn publish(&self, event: ProgressEvent) {
        // Ignore send errors (no subscribers)
        let _ = self.sender.send(event);
    }

    /// Subscribe as a stream. Lagging subscribers see `Err(Lagged)` items.
    pub fn subscribe(&self) -> BroadcastStream<ProgressEvent> {
        BroadcastStream::new(self.sender.subscribe())
    }

    /// Subscribe as a plain receiver.
    pub fn subscribe_raw(&self) -> broadcast::Receiver<ProgressEvent> {
        self.sender.subscribe()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
