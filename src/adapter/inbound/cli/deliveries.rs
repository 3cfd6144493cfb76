//! Handler for the `deliveries` command.

use tabled::Tabled;

use super::command::DeliveriesArgs;
use super::list::{self, date_cell};
use super::output;
use crate::domain::Delivery;
use crate::error::Result;
use crate::infrastructure::bootstrap::Trackly;

#[derive(Tabled)]
struct DeliveryRow {
    #[tabled(rename = "Ref")]
    reference: String,
    #[tabled(rename = "Order")]
    order: String,
    #[tabled(rename = "Driver")]
    driver: String,
    #[tabled(rename = "#")]
    sequence: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Completed")]
    completed: String,
}

impl From<&Delivery> for DeliveryRow {
    fn from(delivery: &Delivery) -> Self {
        Self {
            reference: delivery.id.short_ref(),
            order: delivery.order_id.short_ref(),
            driver: delivery
                .driver_id
                .map_or_else(|| "-".to_string(), |driver| driver.short_ref()),
            sequence: delivery
                .sequence
                .map_or_else(|| "-".to_string(), |n| n.to_string()),
            status: delivery.status.to_string(),
            completed: date_cell(delivery.completed_at),
        }
    }
}

fn render(deliveries: &[Delivery]) {
    if deliveries.is_empty() && !output::is_json() {
        output::note("no deliveries");
        return;
    }
    output::table(
        deliveries.iter().map(DeliveryRow::from).collect(),
        deliveries,
    );
}

/// Execute the deliveries command.
pub async fn execute(trackly: &Trackly, args: &DeliveriesArgs) -> Result<()> {
    list::run(
        &trackly.deliveries,
        args.filters(),
        &args.range,
        trackly.refresh_interval,
        render,
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DeliveryStatus;
    use crate::testkit;

    #[test]
    fn row_marks_missing_values() {
        let mut delivery = testkit::domain::delivery(DeliveryStatus::Pending);
        delivery.driver_id = None;
        delivery.sequence = None;
        let row = DeliveryRow::from(&delivery);
        assert_eq!(row.driver, "-");
        assert_eq!(row.sequence, "-");
        assert_eq!(row.status, "pending");
    }
}
