//! Sink fan-out for bridge signals.
//!
//! The hub carries the engine's live feedback loop; the bus is the
//! mirroring side: a queue drained into any number of [`EventSink`]s
//! (stdout, memory snapshots, a channel to a dashboard). Call
//! [`EventBus::attach_hub`] to pump everything published on a hub into
//! the queue, so bridge signals reach the sinks without the embedder
//! writing forwarding code.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use super::event::BridgeEvent;
use super::hub::EventHub;
use super::sink::{EventSink, StdOutSink};

pub struct EventBus {
    sinks: Arc<Mutex<Vec<Box<dyn EventSink>>>>,
    tx: flume::Sender<BridgeEvent>,
    rx: flume::Receiver<BridgeEvent>,
    tasks: Mutex<BusTasks>,
}

#[derive(Default)]
struct BusTasks {
    listener: Option<(oneshot::Sender<()>, JoinHandle<()>)>,
    pumps: Vec<JoinHandle<()>>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_sink(StdOutSink::default())
    }
}

impl EventBus {
    /// Create a bus with a single sink.
    pub fn with_sink<T: EventSink + 'static>(sink: T) -> Self {
        Self::with_sinks(vec![Box::new(sink)])
    }

    /// Create a bus with multiple sinks.
    #[must_use]
    pub fn with_sinks(sinks: Vec<Box<dyn EventSink>>) -> Self {
        let (tx, rx) = flume::unbounded();
        Self {
            sinks: Arc::new(Mutex::new(sinks)),
            tx,
            rx,
            tasks: Mutex::new(BusTasks::default()),
        }
    }

    /// Dynamically add a sink (useful for per-call streaming).
    pub fn add_sink<T: EventSink + 'static>(&self, sink: T) {
        self.sinks.lock().push(Box::new(sink));
    }

    /// Sender half of the queue, for producers feeding the bus directly.
    #[must_use]
    pub fn sender(&self) -> flume::Sender<BridgeEvent> {
        self.tx.clone()
    }

    /// Mirror everything published on `hub` into this bus.
    ///
    /// Spawns a pump that subscribes to the hub and re-queues each signal.
    /// Lagged stretches are skipped and logged; the pump ends when the bus
    /// is dropped or [`EventBus::stop_listener`] runs.
    pub fn attach_hub(&self, hub: &Arc<EventHub>) {
        let mut stream = hub.subscribe();
        let tx = self.tx.clone();
        let pump = tokio::spawn(async move {
            loop {
                match stream.recv().await {
                    Ok(event) => {
                        if tx.send(event).is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(missed)) => {
                        tracing::warn!(missed, "bus pump lagged behind the hub");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });
        self.tasks.lock().pumps.push(pump);
    }

    /// Spawn the background task draining the queue into the sinks.
    /// Idempotent: calling it again while the listener runs is a no-op.
    pub fn listen_for_events(&self) {
        let mut tasks = self.tasks.lock();
        if tasks.listener.is_some() {
            return;
        }

        let rx = self.rx.clone();
        let sinks = Arc::clone(&self.sinks);
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    recv = rx.recv_async() => match recv {
                        Ok(event) => {
                            for sink in sinks.lock().iter_mut() {
                                if let Err(e) = sink.handle(&event) {
                                    tracing::warn!("event bus sink error: {e}");
                                }
                            }
                        }
                        Err(e) => {
                            tracing::warn!("event bus receiver error: {e}");
                            break;
                        }
                    }
                }
            }
        });
        tasks.listener = Some((shutdown_tx, handle));
    }

    /// Stop the listener and any hub pumps. Waits for the listener to
    /// finish draining its current event.
    pub async fn stop_listener(&self) {
        let (listener, pumps) = {
            let mut tasks = self.tasks.lock();
            (tasks.listener.take(), std::mem::take(&mut tasks.pumps))
        };
        for pump in pumps {
            pump.abort();
        }
        if let Some((shutdown_tx, handle)) = listener {
            let _ = shutdown_tx.send(());
            let _ = handle.await;
        }
    }
}

impl Drop for EventBus {
    fn drop(&mut self) {
        let mut tasks = self.tasks.lock();
        for pump in tasks.pumps.drain(..) {
            pump.abort();
        }
        if let Some((shutdown_tx, handle)) = tasks.listener.take() {
            let _ = shutdown_tx.send(());
            handle.abort();
        }
    }
}
