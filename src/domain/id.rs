//! Backend identifier types.
//!
//! The backend keys every entity by a GUID. Each identifier is a newtype over
//! [`Uuid`] so a delivery id can never be passed where an order id is expected.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;

macro_rules! guid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Wrap an existing UUID.
            #[must_use]
            pub const fn new(id: Uuid) -> Self {
                Self(id)
            }

            /// Generate a random identifier.
            #[must_use]
            pub fn random() -> Self {
                Self(Uuid::new_v4())
            }

            /// Parse an identifier from its textual form.
            ///
            /// # Errors
            ///
            /// Returns [`Error::InvalidId`] when `value` is not a GUID.
            pub fn parse(value: &str) -> Result<Self, Error> {
                Uuid::parse_str(value.trim())
                    .map(Self)
                    .map_err(|e| Error::InvalidId {
                        value: value.to_string(),
                        reason: e.to_string(),
                    })
            }

            /// Get the underlying UUID.
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            /// Short uppercase reference shown in lists (first 8 hex digits).
            #[must_use]
            pub fn short_ref(&self) -> String {
                self.0.simple().to_string()[..8].to_uppercase()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

guid_id!(
    /// Delivery identifier; also names the hub group `delivery-{id}`.
    DeliveryId
);
guid_id!(
    /// Order identifier.
    OrderId
);
guid_id!(
    /// Driver identifier.
    DriverId
);
guid_id!(
    /// Route (tour) identifier.
    RouteId
);
guid_id!(
    /// Tenant identifier, sent as `X-Tenant-Id` and as the hub `tenantId` query.
    TenantId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_hyphenated_guid() {
        let id = DeliveryId::parse("3f2504e0-4f89-11d3-9a0c-0305e82c3301").unwrap();
        assert_eq!(id.to_string(), "3f2504e0-4f89-11d3-9a0c-0305e82c3301");
    }

    #[test]
    fn parse_rejects_garbage() {
        let err = OrderId::parse("not-a-guid").unwrap_err();
        assert!(matches!(err, Error::InvalidId { .. }));
    }

    #[test]
    fn short_ref_is_first_eight_uppercase() {
        let id = OrderId::parse("3f2504e0-4f89-11d3-9a0c-0305e82c3301").unwrap();
        assert_eq!(id.short_ref(), "3F2504E0");
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = DriverId::parse("3f2504e0-4f89-11d3-9a0c-0305e82c3301").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, r#""3f2504e0-4f89-11d3-9a0c-0305e82c3301""#);
    }
}
