//! Broadcast hub backing the event bridge.
//!
//! The hub is the feedback channel closing the conversation loop: module
//! UIs publish completion signals, the engine's listener subscribes, and
//! transcript consumers can tap the same stream. Publishing never blocks;
//! slow subscribers lag and the hub accounts for what they missed.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::stream;
use tokio::sync::broadcast::{self, Receiver, Sender};
use tokio::time::timeout;

use super::event::BridgeEvent;

#[derive(Debug)]
pub struct EventHub {
    sender: Sender<BridgeEvent>,
    dropped_events: AtomicUsize,
    capacity: usize,
}

impl EventHub {
    pub const DEFAULT_CAPACITY: usize = 256;

    #[must_use]
    pub fn new(capacity: usize) -> Arc<Self> {
        let capacity = capacity.max(1);
        let (sender, _) = broadcast::channel(capacity);
        Arc::new(Self {
            sender,
            dropped_events: AtomicUsize::new(0),
            capacity,
        })
    }

    #[must_use]
    pub fn with_default_capacity() -> Arc<Self> {
        Self::new(Self::DEFAULT_CAPACITY)
    }

    /// Publish a signal to all current subscribers.
    ///
    /// Returns the number of subscribers that received it. A bridge with
    /// no listeners is not an error; the signal is simply dropped.
    pub fn publish(&self, event: BridgeEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    pub fn subscribe(self: &Arc<Self>) -> EventStream {
        EventStream {
            receiver: self.sender.subscribe(),
            hub: Arc::clone(self),
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total events missed by lagging subscribers.
    #[must_use]
    pub fn dropped(&self) -> usize {
        self.dropped_events.load(Ordering::Relaxed)
    }
}

/// Subscriber handle over the bridge.
#[derive(Debug)]
pub struct EventStream {
    receiver: Receiver<BridgeEvent>,
    hub: Arc<EventHub>,
}

impl EventStream {
    pub async fn recv(&mut self) -> Result<BridgeEvent, broadcast::error::RecvError> {
        match self.receiver.recv().await {
            Ok(event) => Ok(event),
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                self.hub
                    .dropped_events
                    .fetch_add(missed as usize, Ordering::Relaxed);
                Err(broadcast::error::RecvError::Lagged(missed))
            }
            Err(err) => Err(err),
        }
    }

    pub fn try_recv(&mut self) -> Result<BridgeEvent, broadcast::error::TryRecvError> {
        match self.receiver.try_recv() {
            Ok(event) => Ok(event),
            Err(broadcast::error::TryRecvError::Lagged(missed)) => {
                self.hub
                    .dropped_events
                    .fetch_add(missed as usize, Ordering::Relaxed);
                Err(broadcast::error::TryRecvError::Lagged(missed))
            }
            Err(err) => Err(err),
        }
    }

    #[must_use]
    pub fn into_inner(self) -> Receiver<BridgeEvent> {
        self.receiver
    }

    pub fn into_async_stream(self) -> impl futures_util::stream::Stream<Item = BridgeEvent> {
        stream::unfold(self, |mut stream| async move {
            loop {
                match stream.recv().await {
                    Ok(event) => return Some((event, stream)),
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        })
    }

    /// Receive the next event or give up after `duration`.
    pub async fn next_timeout(&mut self, duration: Duration) -> Option<BridgeEvent> {
        loop {
            match timeout(duration, self.recv()).await {
                Ok(Ok(event)) => return Some(event),
                Ok(Err(broadcast::error::RecvError::Lagged(_))) => continue,
                Ok(Err(broadcast::error::RecvError::Closed)) => return None,
                Err(_) => return None,
            }
        }
    }
}
