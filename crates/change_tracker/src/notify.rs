//! History change notifications.
//!
//! A `tokio::sync::broadcast` channel: every subscriber gets every status,
//! a subscriber that falls behind skips the oldest ones (`RecvError::Lagged`)
//! and never blocks the ledger. Dropping the receiver unsubscribes.

use log::trace;
use serde::Serialize;
use tokio::sync::broadcast;

/// Undo/redo availability after a ledger change.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryStatus {
    pub can_undo: bool,
    pub can_redo: bool,
    /// Number of committed records (cursor + 1).
    pub count: usize,
}

#[derive(Debug)]
pub struct ChangeNotifier {
    sender: broadcast::Sender<HistoryStatus>,
}

impl ChangeNotifier {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<HistoryStatus> {
        self.sender.subscribe()
    }

    /// Publish `status` to every current subscriber.
    pub fn notify(&self, status: HistoryStatus) {
        match self.sender.send(status) {
            Ok(receivers) => trace!("history status {status:?} sent to {receivers} subscribers"),
            Err(_) => trace!("history status {status:?} dropped, no subscribers"),
        }
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
