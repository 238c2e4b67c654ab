//! State feeds - bounded snapshot streams for out-of-process observers
//!
//! A feed receives one [`SceneState`] per applied batch. Feeds never apply
//! backpressure to the store: a feed whose queue is full, or whose receiver
//! is gone, is dropped on the next publish.

use tokio::sync::mpsc;

use crate::SceneState;

/// Receiving end of a state feed
pub type StateFeed = mpsc::Receiver<SceneState>;

/// The set of open feeds
#[derive(Debug, Default)]
pub struct FeedSet {
    senders: Vec<mpsc::Sender<SceneState>>,
}

impl FeedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a feed holding at most `capacity` undelivered snapshots
    pub fn open(&mut self, capacity: usize) -> StateFeed {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        self.senders.push(tx);
        rx
    }

    /// Push a snapshot to every feed, dropping lagging or closed ones.
    /// Returns the number of feeds dropped.
    pub fn publish(&mut self, state: &SceneState) -> usize {
        if self.senders.is_empty() {
            return 0;
        }

        let before = self.senders.len();
        self.senders.retain(|tx| match tx.try_send(state.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::debug!(revision = state.revision, "state feed lagging, dropped");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        });
        before - self.senders.len()
    }

    pub fn len(&self) -> usize {
        self.senders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }
}
