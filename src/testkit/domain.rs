//! Builders for domain values used across tests.
//!
//! Tests focus on assertions rather than construction boilerplate.

use chrono::{DateTime, TimeZone, Utc};

use crate::domain::{
    Delivery, DeliveryId, DeliveryStatus, DriverId, Order, OrderId, OrderStatus, Position,
};

/// A deterministic delivery id: `n` fills the last group.
pub fn delivery_id(n: u32) -> DeliveryId {
    DeliveryId::parse(&format!("00000000-0000-4000-8000-{n:012}")).unwrap_or_else(|_| DeliveryId::random())
}

/// A pending order for `customer` with a fresh id.
pub fn order(customer: &str) -> Order {
    Order {
        id: OrderId::random(),
        customer_name: customer.to_string(),
        address: "1 place de la Comédie, Montpellier".to_string(),
        order_date: None,
        status: OrderStatus::Pending,
        created_at: Some(Utc::now()),
    }
}

/// A delivery in `status` with fresh ids.
pub fn delivery(status: DeliveryStatus) -> Delivery {
    Delivery {
        id: DeliveryId::random(),
        order_id: OrderId::random(),
        driver_id: Some(DriverId::random()),
        status,
        sequence: None,
        created_at: Some(Utc::now()),
        completed_at: None,
    }
}

/// A fixed instant, `secs` seconds after 2026-02-04T10:00:00Z.
pub fn instant(secs: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 2, 4, 10, 0, 0).unwrap() + chrono::Duration::seconds(secs)
}

/// A position in Montpellier recorded at [`instant`]`(secs)`.
pub fn position(secs: i64) -> Position {
    Position::new(43.6108, 3.8767, instant(secs))
}
