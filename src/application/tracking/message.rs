//! Decoding of server-to-client hub invocations.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::state::DeliveryStatusUpdate;
use crate::domain::{DeliveryId, DeliveryStatus, Position};
use crate::error::{Error, Result};
use crate::port::outbound::hub::{DELIVERY_STATUS_CHANGED, LOCATION_UPDATED, STATUS_UPDATED};

/// A decoded invocation the subscriber cares about.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Inbound {
    Location {
        delivery_id: DeliveryId,
        position: Position,
    },
    Status(DeliveryStatusUpdate),
}

impl Inbound {
    pub(crate) const fn delivery_id(&self) -> DeliveryId {
        match self {
            Self::Location { delivery_id, .. } => *delivery_id,
            Self::Status(update) => update.delivery_id,
        }
    }
}

/// Decode `target(arguments)`; `Ok(None)` for methods the subscriber ignores.
///
/// Trailing optional arguments may be omitted by the server. Positions
/// without a server timestamp are stamped with `received_at`.
pub(crate) fn decode(
    target: &str,
    arguments: Vec<Value>,
    received_at: DateTime<Utc>,
) -> Result<Option<Inbound>> {
    match target {
        LOCATION_UPDATED => {
            let (delivery_id, lat, lng, timestamp): (DeliveryId, f64, f64, Option<DateTime<Utc>>) =
                positional(target, arguments, 4)?;
            Ok(Some(Inbound::Location {
                delivery_id,
                position: Position::new(lat, lng, timestamp.unwrap_or(received_at)),
            }))
        }
        STATUS_UPDATED | DELIVERY_STATUS_CHANGED => {
            let (delivery_id, status, completed_at): (DeliveryId, String, Option<DateTime<Utc>>) =
                positional(target, arguments, 3)?;
            Ok(Some(Inbound::Status(DeliveryStatusUpdate {
                delivery_id,
                status: DeliveryStatus::from_name(&status),
                completed_at,
                received_at,
            })))
        }
        _ => Ok(None),
    }
}

/// Deserialize positional arguments as a tuple of `arity`, padding omitted
/// trailing arguments with `null`.
fn positional<T: DeserializeOwned>(target: &str, mut arguments: Vec<Value>, arity: usize) -> Result<T> {
    if arguments.len() > arity {
        arguments.truncate(arity);
    }
    arguments.resize(arity, Value::Null);
    serde_json::from_value(Value::Array(arguments))
        .map_err(|err| Error::Hub(format!("malformed {target} arguments: {err}")))
}
