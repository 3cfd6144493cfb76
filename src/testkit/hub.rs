//! Mock [`HubConnection`] implementations for testing.
//!
//! - [`ScriptedHub`]: pre-loaded start results and events. Best for
//!   reconnection and retry behaviour.
//! - [`ChannelHub`]: channel-backed hub with an external control handle that
//!   records invocations. Best for subscriber tests that push events on demand.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::domain::DeliveryId;
use crate::error::{Error, Result};
use crate::port::outbound::hub::{
    HubConnection, HubConnector, HubEvent, DELIVERY_STATUS_CHANGED, LOCATION_UPDATED,
};

/// A server invocation of `target` without arguments.
pub fn invocation(target: &str) -> HubEvent {
    HubEvent::Invocation {
        target: target.to_string(),
        arguments: Vec::new(),
    }
}

// ---------------------------------------------------------------------------
// ScriptedHub
// ---------------------------------------------------------------------------

/// A mock hub with scripted start results and a fixed event queue.
///
/// Each `start()` pops the next result (`Ok(())` once exhausted). `next_event()`
/// pops the next event and returns `None` once the queue is empty.
pub struct ScriptedHub {
    start_results: VecDeque<Result<()>>,
    events: VecDeque<HubEvent>,
    start_count: Arc<AtomicU32>,
    stop_count: Arc<AtomicU32>,
}

impl ScriptedHub {
    pub fn new() -> Self {
        Self {
            start_results: VecDeque::new(),
            events: VecDeque::new(),
            start_count: Arc::new(AtomicU32::new(0)),
            stop_count: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn with_start_results(mut self, results: Vec<Result<()>>) -> Self {
        self.start_results = results.into();
        self
    }

    pub fn with_events(mut self, events: Vec<HubEvent>) -> Self {
        self.events = events.into();
        self
    }

    /// Shared counters for asserting start/stop call counts.
    pub fn counts(&self) -> (Arc<AtomicU32>, Arc<AtomicU32>) {
        (self.start_count.clone(), self.stop_count.clone())
    }

    pub fn start_count(&self) -> u32 {
        self.start_count.load(Ordering::SeqCst)
    }
}

impl Default for ScriptedHub {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HubConnection for ScriptedHub {
    async fn start(&mut self) -> Result<()> {
        self.start_count.fetch_add(1, Ordering::SeqCst);
        self.start_results.pop_front().unwrap_or(Ok(()))
    }

    async fn invoke(&mut self, _method: &str, _arguments: Vec<Value>) -> Result<Value> {
        Ok(Value::Null)
    }

    async fn next_event(&mut self) -> Option<HubEvent> {
        self.events.pop_front()
    }

    async fn stop(&mut self) -> Result<()> {
        self.stop_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn endpoint(&self) -> &str {
        "mock://scripted"
    }
}

// ---------------------------------------------------------------------------
// ChannelHub
// ---------------------------------------------------------------------------

/// One recorded client-to-server invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedInvocation {
    pub method: String,
    pub arguments: Vec<Value>,
}

#[derive(Default)]
struct Recorder {
    invocations: Mutex<Vec<RecordedInvocation>>,
    invoke_failures: Mutex<HashMap<String, VecDeque<Error>>>,
    start_failures: Mutex<VecDeque<Error>>,
    start_count: AtomicU32,
    stop_count: AtomicU32,
}

/// A hub fed through a [`ChannelHubHandle`].
///
/// Every hub built by the same connector shares the handle, so a test can
/// keep pushing events across reconnects of the code under test.
pub struct ChannelHub {
    events: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<HubEvent>>>,
    recorder: Arc<Recorder>,
}

/// Test-side control of [`ChannelHub`]s.
#[derive(Clone)]
pub struct ChannelHubHandle {
    events: mpsc::UnboundedSender<HubEvent>,
    recorder: Arc<Recorder>,
}

impl ChannelHub {
    /// A single hub and its handle.
    pub fn new() -> (Self, ChannelHubHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let recorder = Arc::new(Recorder::default());
        let hub = Self {
            events: Arc::new(tokio::sync::Mutex::new(rx)),
            recorder: recorder.clone(),
        };
        (hub, ChannelHubHandle { events: tx, recorder })
    }

    /// A connector producing hubs that share one handle.
    pub fn connector() -> (HubConnector, ChannelHubHandle) {
        let (hub, handle) = Self::new();
        let events = hub.events;
        let recorder = hub.recorder;
        let connector: HubConnector = Arc::new(move || {
            Box::new(ChannelHub {
                events: events.clone(),
                recorder: recorder.clone(),
            }) as Box<dyn HubConnection>
        });
        (connector, handle)
    }
}

#[async_trait]
impl HubConnection for ChannelHub {
    async fn start(&mut self) -> Result<()> {
        self.recorder.start_count.fetch_add(1, Ordering::SeqCst);
        match self.recorder.start_failures.lock().pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn invoke(&mut self, method: &str, arguments: Vec<Value>) -> Result<Value> {
        self.recorder
            .invocations
            .lock()
            .push(RecordedInvocation {
                method: method.to_string(),
                arguments,
            });
        let failure = self
            .recorder
            .invoke_failures
            .lock()
            .get_mut(method)
            .and_then(VecDeque::pop_front);
        match failure {
            Some(err) => Err(err),
            None => Ok(Value::Null),
        }
    }

    async fn next_event(&mut self) -> Option<HubEvent> {
        self.events.lock().await.recv().await
    }

    async fn stop(&mut self) -> Result<()> {
        self.recorder.stop_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn endpoint(&self) -> &str {
        "mock://channel"
    }
}

impl ChannelHubHandle {
    /// Deliver an event to whichever hub is currently reading.
    pub fn push(&self, event: HubEvent) {
        let _ = self.events.send(event);
    }

    /// Push a `LocationUpdated` invocation.
    pub fn push_location(
        &self,
        delivery_id: DeliveryId,
        lat: f64,
        lng: f64,
        timestamp: Option<DateTime<Utc>>,
    ) {
        let mut arguments = vec![json!(delivery_id), json!(lat), json!(lng)];
        if let Some(timestamp) = timestamp {
            arguments.push(json!(timestamp));
        }
        self.push(HubEvent::Invocation {
            target: LOCATION_UPDATED.to_string(),
            arguments,
        });
    }

    /// Push a `DeliveryStatusChanged` invocation.
    pub fn push_status(&self, delivery_id: DeliveryId, status: &str) {
        self.push(HubEvent::Invocation {
            target: DELIVERY_STATUS_CHANGED.to_string(),
            arguments: vec![json!(delivery_id), json!(status), Value::Null],
        });
    }

    pub fn fail_next_start(&self, err: Error) {
        self.recorder.start_failures.lock().push_back(err);
    }

    pub fn fail_next_invoke(&self, method: &str, err: Error) {
        self.recorder
            .invoke_failures
            .lock()
            .entry(method.to_string())
            .or_default()
            .push_back(err);
    }

    pub fn invocations(&self) -> Vec<RecordedInvocation> {
        self.recorder.invocations.lock().clone()
    }

    /// Names of the invoked methods, in order.
    pub fn methods(&self) -> Vec<String> {
        self.invocations().into_iter().map(|call| call.method).collect()
    }

    pub fn start_count(&self) -> u32 {
        self.recorder.start_count.load(Ordering::SeqCst)
    }

    pub fn stop_count(&self) -> u32 {
        self.recorder.stop_count.load(Ordering::SeqCst)
    }
}
