//! Location subscriber over a reconnecting hub connection.

mod support;

use std::sync::Arc;
use std::time::Duration;

use trackly::application::tracking::{ConnectionStatus, LocationSubscriber, TrackingEvent};
use trackly::domain::{Coordinates, DeliveryStatus};
use trackly::error::Error;
use trackly::infrastructure::config::ReconnectionConfig;
use trackly::infrastructure::hub::ReconnectingHub;
use trackly::port::outbound::hub::{
    HubConnection, HubConnector, HubEvent, JOIN_DELIVERY_GROUP, LEAVE_DELIVERY_GROUP,
    UPDATE_LOCATION,
};
use trackly::testkit::hub::{ChannelHub, ChannelHubHandle};
use trackly::testkit::{config, domain};

fn reconnecting(reconnection: ReconnectionConfig) -> (HubConnector, ChannelHubHandle) {
    let (inner, handle) = ChannelHub::connector();
    let connector: HubConnector = Arc::new(move || {
        Box::new(ReconnectingHub::new(inner(), reconnection.clone())) as Box<dyn HubConnection>
    });
    (connector, handle)
}

async fn next_connection_status(
    events: &mut tokio::sync::broadcast::Receiver<TrackingEvent>,
) -> ConnectionStatus {
    loop {
        if let TrackingEvent::Connection { status } = events.recv().await.unwrap() {
            return status;
        }
    }
}

#[tokio::test(start_paused = true)]
async fn rejoins_group_after_transport_loss() {
    let (connector, hub) = reconnecting(config::reconnection());
    let subscriber = LocationSubscriber::new(connector);
    let delivery = domain::delivery_id(7);

    subscriber.connect(delivery).await;
    assert_eq!(subscriber.state().status, ConnectionStatus::Connected);
    let mut events = subscriber.subscribe_events();

    hub.push(HubEvent::Disconnected {
        reason: "socket reset".into(),
    });

    assert_eq!(
        next_connection_status(&mut events).await,
        ConnectionStatus::Reconnecting
    );
    assert_eq!(
        next_connection_status(&mut events).await,
        ConnectionStatus::Connected
    );
    support::wait_until(Duration::from_secs(1), || hub.methods().len() == 2).await;

    assert_eq!(hub.methods(), vec![JOIN_DELIVERY_GROUP, JOIN_DELIVERY_GROUP]);
    assert_eq!(hub.start_count(), 2);

    hub.push_location(delivery, 43.6, 3.88, None);
    support::wait_until(Duration::from_secs(1), || {
        subscriber.state().last_known_position.is_some()
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn exhausted_reconnection_ends_disconnected() {
    let (connector, hub) = reconnecting(config::reconnection_limited(2));
    let subscriber = LocationSubscriber::new(connector);
    subscriber.connect(domain::delivery_id(1)).await;
    let mut state = subscriber.watch_state();

    hub.fail_next_start(Error::Connection("refused".into()));
    hub.fail_next_start(Error::Connection("refused".into()));
    hub.push(HubEvent::Disconnected {
        reason: "socket reset".into(),
    });

    state
        .wait_for(|s| s.status == ConnectionStatus::Disconnected)
        .await
        .unwrap();
    let last_error = subscriber.state().last_error.unwrap();
    assert!(last_error.contains("gave up after 2 attempts"), "{last_error}");
    assert_eq!(hub.start_count(), 3);
}

#[tokio::test]
async fn follows_positions_and_status_of_its_delivery_only() {
    let (connector, hub) = ChannelHub::connector();
    let subscriber = LocationSubscriber::new(connector);
    let delivery = domain::delivery_id(2);
    let other = domain::delivery_id(3);

    subscriber.connect(delivery).await;
    let mut events = subscriber.subscribe_events();

    hub.push_location(other, 1.0, 1.0, None);
    hub.push_location(delivery, 43.61, 3.87, Some(domain::instant(10)));
    hub.push_location(delivery, 43.0, 3.0, Some(domain::instant(5)));
    hub.push_status(delivery, "Completed");

    let TrackingEvent::Location { position, .. } = events.recv().await.unwrap() else {
        panic!("expected the delivery's position first");
    };
    assert_eq!(position.lat, 43.61);
    let TrackingEvent::Status(update) = events.recv().await.unwrap() else {
        panic!("expected the status next");
    };
    assert_eq!(update.status, DeliveryStatus::Completed);

    let state = subscriber.state();
    assert_eq!(state.last_known_position.unwrap().updated_at, domain::instant(10));
    assert_eq!(state.last_status.unwrap().status, DeliveryStatus::Completed);

    let destination = Coordinates::try_new(43.62, 3.87).unwrap();
    let eta = subscriber.eta_to(&destination).unwrap();
    assert!(eta.distance_m > 1_000 && eta.distance_m < 1_300);
}

#[tokio::test]
async fn driver_updates_go_to_the_current_group() {
    let (connector, hub) = ChannelHub::connector();
    let subscriber = LocationSubscriber::new(connector);
    let delivery = domain::delivery_id(4);

    assert!(matches!(
        subscriber.update_location(43.6, 3.8).await,
        Err(Error::NotConnected)
    ));

    subscriber.connect(delivery).await;
    subscriber.update_location(43.6, 3.8).await.unwrap();
    assert!(matches!(
        subscriber.update_location(91.0, 0.0).await,
        Err(Error::InvalidCoordinates { .. })
    ));

    subscriber.disconnect().await;

    let calls = hub.invocations();
    let methods: Vec<_> = calls.iter().map(|c| c.method.as_str()).collect();
    assert_eq!(
        methods,
        vec![JOIN_DELIVERY_GROUP, UPDATE_LOCATION, LEAVE_DELIVERY_GROUP]
    );
    assert_eq!(calls[1].arguments[0], serde_json::json!(delivery));
    assert_eq!(calls[1].arguments[1], serde_json::json!(43.6));

    let state = subscriber.state();
    assert_eq!(state.status, ConnectionStatus::Disconnected);
    assert!(state.current_group.is_none());
}
