//! Fan-out of registry change events to subscribers.

use std::sync::mpsc::{self, Receiver, Sender};

use tracing::trace;

use crate::types::event::DownloadEvent;

/// Delivers every event to each live subscriber, in emission order.
///
/// Subscribers whose receiver has been dropped are forgotten on the next send.
#[derive(Default)]
pub struct EventBroadcaster {
    senders: Vec<Sender<DownloadEvent>>,
}

impl EventBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new subscriber. Only events emitted after this call are seen.
    pub fn subscribe(&mut self) -> Receiver<DownloadEvent> {
        let (tx, rx) = mpsc::channel();
        self.senders.push(tx);
        rx
    }

    pub fn broadcast(&mut self, event: DownloadEvent) {
        if self.senders.is_empty() {
            return;
        }
        trace!(?event, "broadcasting download event");
        self.senders.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.senders.len()
    }
}
