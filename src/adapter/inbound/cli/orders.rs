//! Handler for the `orders` command.

use tabled::Tabled;

use super::command::OrdersArgs;
use super::list::{self, date_cell};
use super::output;
use crate::domain::Order;
use crate::error::Result;
use crate::infrastructure::bootstrap::Trackly;

#[derive(Tabled)]
struct OrderRow {
    #[tabled(rename = "Ref")]
    reference: String,
    #[tabled(rename = "Customer")]
    customer: String,
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Order date")]
    order_date: String,
    #[tabled(rename = "Status")]
    status: String,
}

impl From<&Order> for OrderRow {
    fn from(order: &Order) -> Self {
        Self {
            reference: order.id.short_ref(),
            customer: order.customer_name.clone(),
            address: order.address.clone(),
            order_date: date_cell(order.order_date),
            status: order.status.to_string(),
        }
    }
}

fn render(orders: &[Order]) {
    if orders.is_empty() && !output::is_json() {
        output::note("no orders");
        return;
    }
    output::table(orders.iter().map(OrderRow::from).collect(), orders);
}

/// Execute the orders command.
pub async fn execute(trackly: &Trackly, args: &OrdersArgs) -> Result<()> {
    list::run(
        &trackly.orders,
        args.filters(),
        &args.range,
        trackly.refresh_interval,
        render,
    )
    .await
}
