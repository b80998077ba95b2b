//! Host event relay
//!
//! Forwards every event published on the host bus into the runtime's
//! dispatcher. One relay exists per runtime lifetime; it is stopped (and
//! its task awaited) before the runtime is closed. Events already queued
//! when the relay is stopped are still delivered.

use crate::ports::host::HostFacade;
use crate::ports::script_runtime::ScriptRuntime;
use luaext_domain::HostEvent;
use std::sync::Arc;
use tokio::sync::broadcast::Receiver;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

pub struct EventRelay {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl EventRelay {
    /// Subscribe to the host bus and start relaying into `runtime`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(host: &dyn HostFacade, runtime: Arc<dyn ScriptRuntime>) -> Self {
        let mut events = host.subscribe_events();
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let task = tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        drain(&mut events, runtime.as_ref()).await;
                        break;
                    }
                    received = events.recv() => match received {
                        Ok(event) => event,
                        Err(RecvError::Lagged(skipped)) => {
                            warn!("Event relay lagged behind; dropped {} events", skipped);
                            continue;
                        }
                        Err(RecvError::Closed) => break,
                    },
                };

                relay(runtime.as_ref(), &event).await;
            }
        });

        Self { cancel, task }
    }

    /// Stop relaying and wait for queued and in-flight dispatches to finish.
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            error!("Event relay task failed: {}", e);
        }
    }
}

async fn relay(runtime: &dyn ScriptRuntime, event: &HostEvent) {
    debug!(event = event.name(), "Relaying host event");
    if let Err(e) = runtime.dispatch_event(event).await {
        error!("Failed to dispatch event {}: {}", event.name(), e);
    }
}

async fn drain(events: &mut Receiver<HostEvent>, runtime: &dyn ScriptRuntime) {
    loop {
        match events.try_recv() {
            Ok(event) => relay(runtime, &event).await,
            Err(TryRecvError::Lagged(skipped)) => {
                warn!("Event relay lagged behind; dropped {} events", skipped);
            }
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeRuntime, MockHost};
    use luaext_domain::{CapabilityFlags, HostEvent};
    use serde_json::json;
    use std::time::Duration;

    #[tokio::test]
    async fn test_relays_events_in_order() {
        let host = MockHost::new();
        let runtime = Arc::new(FakeRuntime::new(CapabilityFlags::none()));
        let relay = EventRelay::start(&host, runtime.clone());

        host.emit(HostEvent::new("chat_changed").with_arg(json!(3)));
        host.emit(HostEvent::new("message_sent"));

        let dispatched =
            tokio::time::timeout(Duration::from_secs(5), runtime.wait_for_dispatches(2))
                .await
                .unwrap();
        assert_eq!(dispatched[0].name(), "chat_changed");
        assert_eq!(dispatched[0].payload(), &[json!(3)]);
        assert_eq!(dispatched[1].name(), "message_sent");

        relay.stop().await;
    }

    #[tokio::test]
    async fn test_stop_delivers_queued_events() {
        let host = MockHost::new();
        let runtime = Arc::new(FakeRuntime::new(CapabilityFlags::none()));
        let relay = EventRelay::start(&host, runtime.clone());

        host.emit(HostEvent::new("first"));
        host.emit(HostEvent::new("second"));
        relay.stop().await;

        let names: Vec<String> = runtime
            .dispatched
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.name().to_string())
            .collect();
        assert_eq!(names, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_stop_unsubscribes() {
        let host = MockHost::new();
        let runtime = Arc::new(FakeRuntime::new(CapabilityFlags::none()));
        let relay = EventRelay::start(&host, runtime.clone());
        assert_eq!(host.subscriber_count(), 1);

        relay.stop().await;

        assert_eq!(host.subscriber_count(), 0);
        host.emit(HostEvent::new("late"));
        tokio::task::yield_now().await;
        assert!(runtime.dispatched.lock().unwrap().is_empty());
    }
}
