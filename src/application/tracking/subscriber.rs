//! Real-time subscription to one delivery's tracking group.
//!
//! The subscriber owns at most one hub session. The session runs as its own
//! task which holds the connection, so inbound events, reconnect handling and
//! outbound invocations never race over it.

use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Value};
use tokio::sync::{broadcast, mpsc, oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use super::message::{decode, Inbound};
use super::state::{ConnectionStatus, SubscriptionState, TrackingEvent};
use crate::domain::{ArrivalEstimate, Coordinates, DeliveryId, DEFAULT_COURIER_SPEED_KMH};
use crate::error::{Error, Result};
use crate::port::outbound::hub::{
    HubConnection, HubConnector, HubEvent, JOIN_DELIVERY_GROUP, LEAVE_DELIVERY_GROUP,
    UPDATE_LOCATION,
};

const EVENT_CAPACITY: usize = 64;
const COMMAND_CAPACITY: usize = 16;

enum Command {
    Invoke {
        method: &'static str,
        arguments: Vec<Value>,
        reply: oneshot::Sender<Result<Value>>,
    },
    Stop {
        reply: oneshot::Sender<()>,
    },
}

struct Session {
    commands: mpsc::Sender<Command>,
    task: JoinHandle<()>,
}

/// State and event fan-out shared with the session task.
struct Shared {
    state: watch::Sender<SubscriptionState>,
    events: broadcast::Sender<TrackingEvent>,
}

impl Shared {
    fn update(&self, apply: impl FnOnce(&mut SubscriptionState)) {
        self.state.send_modify(apply);
    }

    fn set_status(&self, status: ConnectionStatus) {
        let changed = self.state.send_if_modified(|state| {
            let changed = state.status != status;
            state.status = status;
            changed
        });
        if changed {
            debug!(status = %status, "Tracking status changed");
            let _ = self.events.send(TrackingEvent::Connection { status });
        }
    }

    fn apply(&self, inbound: Inbound) {
        match inbound {
            Inbound::Location {
                delivery_id,
                position,
            } => {
                if self
                    .state
                    .send_if_modified(|state| state.accept_position(position))
                {
                    trace!(delivery_id = %delivery_id, lat = position.lat, lng = position.lng, "Position updated");
                    let _ = self.events.send(TrackingEvent::Location {
                        delivery_id,
                        position,
                    });
                } else {
                    debug!(delivery_id = %delivery_id, "Dropped out-of-order position");
                }
            }
            Inbound::Status(update) => {
                info!(delivery_id = %update.delivery_id, status = %update.status, "Delivery status changed");
                let event = TrackingEvent::Status(update.clone());
                self.update(|state| state.last_status = Some(update));
                let _ = self.events.send(event);
            }
        }
    }
}

/// Holds one logical subscription to a delivery's position and status.
pub struct LocationSubscriber {
    connector: HubConnector,
    shared: Arc<Shared>,
    session: Mutex<Option<Session>>,
}

impl LocationSubscriber {
    pub fn new(connector: HubConnector) -> Self {
        let (state, _) = watch::channel(SubscriptionState::default());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            connector,
            shared: Arc::new(Shared { state, events }),
            session: Mutex::new(None),
        }
    }

    /// Current state snapshot.
    #[must_use]
    pub fn state(&self) -> SubscriptionState {
        self.shared.state.borrow().clone()
    }

    /// Receiver notified on every state change. Drop it to unsubscribe.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<SubscriptionState> {
        self.shared.state.subscribe()
    }

    /// Receiver of position, status and connection events from now on.
    #[must_use]
    pub fn subscribe_events(&self) -> broadcast::Receiver<TrackingEvent> {
        self.shared.events.subscribe()
    }

    /// Arrival estimate from the last known position at the courier speed.
    #[must_use]
    pub fn eta_to(&self, destination: &Coordinates) -> Option<ArrivalEstimate> {
        self.shared
            .state
            .borrow()
            .last_known_position
            .map(|position| position.estimate_arrival(destination, DEFAULT_COURIER_SPEED_KMH))
    }

    /// Connect to the hub and join the group of `delivery_id`.
    ///
    /// Does nothing while a session is active. Failures are recorded in the
    /// state (`error` status and `last_error`) rather than returned.
    pub async fn connect(&self, delivery_id: DeliveryId) {
        let mut session = self.session.lock().await;

        let status = self.shared.state.borrow().status;
        if status.is_active() {
            debug!(status = %status, delivery_id = %delivery_id, "Tracking session already active");
            return;
        }
        if let Some(stale) = session.take() {
            stale.task.abort();
        }

        self.shared.update(|state| {
            if state.current_group != Some(delivery_id) {
                state.last_known_position = None;
                state.last_status = None;
            }
            state.current_group = Some(delivery_id);
            state.last_error = None;
        });
        self.shared.set_status(ConnectionStatus::Connecting);

        let mut connection = (self.connector)();
        info!(endpoint = connection.endpoint(), delivery_id = %delivery_id, "Connecting to tracking hub");

        if let Err(err) = open(&mut connection, delivery_id).await {
            warn!(delivery_id = %delivery_id, error = %err, "Tracking connection failed");
            if let Err(stop_err) = connection.stop().await {
                debug!(error = %stop_err, "Stopping half-open connection failed");
            }
            self.shared
                .update(|state| state.last_error = Some(err.to_string()));
            self.shared.set_status(ConnectionStatus::Error);
            return;
        }

        self.shared.set_status(ConnectionStatus::Connected);
        info!(delivery_id = %delivery_id, "Joined delivery group");

        let (commands, receiver) = mpsc::channel(COMMAND_CAPACITY);
        let task = tokio::spawn(run_session(
            connection,
            delivery_id,
            receiver,
            Arc::clone(&self.shared),
        ));
        *session = Some(Session { commands, task });
    }

    /// Leave the group and close the connection.
    ///
    /// The state ends `disconnected` with no group whatever happens on the way.
    pub async fn disconnect(&self) {
        let mut session = self.session.lock().await;

        if let Some(Session { commands, task }) = session.take() {
            let (reply, done) = oneshot::channel();
            if commands.send(Command::Stop { reply }).await.is_ok() {
                let _ = done.await;
            }
            if let Err(err) = task.await {
                if !err.is_cancelled() {
                    warn!(error = %err, "Tracking session ended abnormally");
                }
            }
        }

        self.shared.update(|state| state.current_group = None);
        self.shared.set_status(ConnectionStatus::Disconnected);
        info!("Tracking disconnected");
    }

    /// Publish the driver's position to the current delivery group.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidCoordinates`] for out-of-range values, checked before
    /// anything is sent; [`Error::NotConnected`] without a connected session;
    /// otherwise whatever the hub answers.
    pub async fn update_location(&self, lat: f64, lng: f64) -> Result<()> {
        let coordinates = Coordinates::try_new(lat, lng)?;

        let (sender, delivery_id) = {
            let session = self.session.lock().await;
            let state = self.shared.state.borrow();
            match (&*session, state.status, state.current_group) {
                (Some(session), ConnectionStatus::Connected, Some(group)) => {
                    (session.commands.clone(), group)
                }
                _ => return Err(Error::NotConnected),
            }
        };

        let (reply, answer) = oneshot::channel();
        sender
            .send(Command::Invoke {
                method: UPDATE_LOCATION,
                arguments: vec![json!(delivery_id), json!(coordinates.lat()), json!(coordinates.lng())],
                reply,
            })
            .await
            .map_err(|_| Error::NotConnected)?;

        answer.await.map_err(|_| Error::NotConnected)??;
        trace!(delivery_id = %delivery_id, lat, lng, "Location published");
        Ok(())
    }
}

impl Drop for LocationSubscriber {
    fn drop(&mut self) {
        if let Some(session) = self.session.get_mut().take() {
            session.task.abort();
        }
    }
}

async fn open(connection: &mut Box<dyn HubConnection>, delivery_id: DeliveryId) -> Result<()> {
    connection.start().await?;
    connection
        .invoke(JOIN_DELIVERY_GROUP, vec![json!(delivery_id)])
        .await?;
    Ok(())
}

async fn run_session(
    mut connection: Box<dyn HubConnection>,
    delivery_id: DeliveryId,
    mut commands: mpsc::Receiver<Command>,
    shared: Arc<Shared>,
) {
    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(Command::Invoke { method, arguments, reply }) => {
                    let result = connection.invoke(method, arguments).await;
                    let _ = reply.send(result);
                }
                Some(Command::Stop { reply }) => {
                    close(&mut connection, delivery_id).await;
                    let _ = reply.send(());
                    return;
                }
                None => {
                    debug!("Subscriber dropped, closing tracking session");
                    close(&mut connection, delivery_id).await;
                    return;
                }
            },
            event = connection.next_event() => match event {
                Some(HubEvent::Invocation { target, arguments }) => {
                    match decode(&target, arguments, Utc::now()) {
                        Ok(Some(inbound)) if inbound.delivery_id() == delivery_id => shared.apply(inbound),
                        Ok(Some(inbound)) => {
                            trace!(method = %target, other = %inbound.delivery_id(), "Ignoring event for another delivery");
                        }
                        Ok(None) => trace!(method = %target, "Ignoring hub invocation"),
                        Err(err) => warn!(method = %target, error = %err, "Dropping malformed hub invocation"),
                    }
                }
                Some(HubEvent::Reconnecting { attempt, reason }) => {
                    warn!(attempt, reason = %reason, "Tracking connection lost, reconnecting");
                    shared.set_status(ConnectionStatus::Reconnecting);
                }
                Some(HubEvent::Reconnected) => {
                    shared.set_status(ConnectionStatus::Connected);
                    match connection.invoke(JOIN_DELIVERY_GROUP, vec![json!(delivery_id)]).await {
                        Ok(_) => info!(delivery_id = %delivery_id, "Rejoined delivery group after reconnect"),
                        Err(err) => {
                            warn!(delivery_id = %delivery_id, error = %err, "Rejoining delivery group failed");
                            shared.update(|state| state.last_error = Some(err.to_string()));
                        }
                    }
                }
                Some(HubEvent::Disconnected { reason }) => {
                    warn!(reason = %reason, "Tracking connection lost");
                    shared.update(|state| state.last_error = Some(reason));
                    shared.set_status(ConnectionStatus::Disconnected);
                    return;
                }
                Some(HubEvent::Closed { reason }) => {
                    info!(reason = ?reason, "Tracking connection closed");
                    if let Some(reason) = reason {
                        shared.update(|state| state.last_error = Some(reason));
                    }
                    shared.set_status(ConnectionStatus::Disconnected);
                    return;
                }
                None => {
                    debug!("Tracking connection ended");
                    shared.set_status(ConnectionStatus::Disconnected);
                    return;
                }
            },
        }
    }
}

/// Best-effort leave, then stop.
async fn close(connection: &mut Box<dyn HubConnection>, delivery_id: DeliveryId) {
    if let Err(err) = connection
        .invoke(LEAVE_DELIVERY_GROUP, vec![json!(delivery_id)])
        .await
    {
        debug!(delivery_id = %delivery_id, error = %err, "Leaving delivery group failed");
    }
    if let Err(err) = connection.stop().await {
        debug!(error = %err, "Stopping tracking connection failed");
    }
}
