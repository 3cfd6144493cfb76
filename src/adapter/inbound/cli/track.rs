//! Handler for the `track` command.

use serde_json::json;
use tokio::sync::broadcast::error::RecvError;

use super::command::TrackArgs;
use super::output;
use crate::application::tracking::{ConnectionStatus, LocationSubscriber, TrackingEvent};
use crate::domain::Coordinates;
use crate::error::{Error, Result};
use crate::infrastructure::bootstrap::Trackly;

/// Execute the track command: follow a delivery until Ctrl-C, a terminal
/// status or the end of the connection.
pub async fn execute(trackly: &Trackly, args: &TrackArgs) -> Result<()> {
    let destination = match (args.dest_lat, args.dest_lng) {
        (Some(lat), Some(lng)) => Some(Coordinates::try_new(lat, lng)?),
        _ => None,
    };

    let subscriber = trackly.subscriber();
    let events = subscriber.subscribe_events();
    subscriber.connect(args.delivery_id).await;

    let state = subscriber.state();
    if state.status == ConnectionStatus::Error {
        return Err(Error::Connection(
            state
                .last_error
                .unwrap_or_else(|| "tracking hub unreachable".to_string()),
        ));
    }
    output::success(&format!("Following delivery {}", args.delivery_id));
    if destination.is_none() {
        output::hint("pass --dest-lat and --dest-lng for arrival estimates");
    }

    tokio::select! {
        () = follow(&subscriber, events, destination.as_ref()) => {}
        _ = tokio::signal::ctrl_c() => {
            output::note("interrupted");
        }
    }

    subscriber.disconnect().await;
    Ok(())
}

async fn follow(
    subscriber: &LocationSubscriber,
    mut events: tokio::sync::broadcast::Receiver<TrackingEvent>,
    destination: Option<&Coordinates>,
) {
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                output::warning(&format!("skipped {skipped} events"));
                continue;
            }
            Err(RecvError::Closed) => return,
        };
        if !show(subscriber, &event, destination) {
            return;
        }
    }
}

/// Print `event`; false once there is nothing more to follow.
fn show(
    subscriber: &LocationSubscriber,
    event: &TrackingEvent,
    destination: Option<&Coordinates>,
) -> bool {
    let payload = json!(event);
    match event {
        TrackingEvent::Location { position, .. } => {
            let mut message = format!("{:.5}, {:.5}", position.lat, position.lng);
            if let Some(eta) = destination.and_then(|d| subscriber.eta_to(d)) {
                message.push_str(&format!(
                    "  {} m, ~{} min (arrives {})",
                    eta.distance_m,
                    eta.minutes,
                    eta.arrives_at.format("%H:%M")
                ));
            }
            output::event("location", &clock(position.updated_at), &message, payload);
            true
        }
        TrackingEvent::Status(update) => {
            output::event(
                "status",
                &clock(update.received_at),
                &output::highlight(update.status),
                payload,
            );
            !update.status.is_terminal()
        }
        TrackingEvent::Connection { status } => {
            let now = clock(chrono::Utc::now());
            let label = match status {
                ConnectionStatus::Connected => output::positive(status),
                ConnectionStatus::Error | ConnectionStatus::Disconnected => {
                    output::negative(status)
                }
                _ => status.to_string(),
            };
            output::event("connection", &now, &label, payload);
            match status {
                ConnectionStatus::Error => {
                    if let Some(reason) = subscriber.state().last_error {
                        output::warning(&reason);
                    }
                    false
                }
                ConnectionStatus::Disconnected => false,
                _ => true,
            }
        }
    }
}

fn clock(at: chrono::DateTime<chrono::Utc>) -> String {
    at.format("%H:%M:%S").to_string()
}
