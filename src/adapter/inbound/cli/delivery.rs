//! Handler for the `delivery` command.

use super::command::DeliveryArgs;
use super::list::date_cell;
use super::output;
use crate::error::Result;
use crate::infrastructure::bootstrap::Trackly;

/// Execute the delivery command.
pub async fn execute(trackly: &Trackly, args: &DeliveryArgs) -> Result<()> {
    let tracking = trackly
        .delivery_service
        .public_tracking(args.delivery_id)
        .await?;

    if output::is_json() {
        output::record("delivery", &tracking);
        return Ok(());
    }

    output::section(&format!("Delivery {}", tracking.delivery_id.short_ref()));
    output::field("Status", output::highlight(tracking.status));
    output::field("Completed", date_cell(tracking.completed_at));
    if let Some(customer) = &tracking.customer_name {
        output::field("Customer", customer);
    }
    if let Some(address) = &tracking.address {
        output::field("Address", address);
    }
    if let Some(driver) = &tracking.driver_name {
        output::field("Driver", driver);
    }
    Ok(())
}
