//! Command-line interface definitions.
//!
//! Defines the CLI structure for the trackly client using `clap`: list
//! views over the cached stores, a live tracking session and the public
//! tracking lookup.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::domain::{DateFilter, DeliveryId, DriverId, ListFilters, RouteId};

/// Delivery platform client: cached lists and live delivery tracking
#[derive(Parser, Debug)]
#[command(name = "trackly")]
#[command(version)]
pub struct Cli {
    /// Configuration file; defaults apply when it does not exist
    #[arg(short, long, global = true, default_value = "trackly.toml")]
    pub config: PathBuf,

    /// Color output mode [auto, always, never]
    #[arg(
        long,
        global = true,
        default_value = "auto",
        hide_possible_values = true
    )]
    pub color: ColorChoice,

    /// JSON output for scripting
    #[arg(long, global = true)]
    pub json: bool,

    /// Decrease output verbosity
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase output verbosity
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Color output mode for terminal rendering.
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum ColorChoice {
    /// Detect automatically
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List orders
    Orders(OrdersArgs),

    /// List deliveries
    Deliveries(DeliveriesArgs),

    /// Follow a delivery's live position and status until interrupted
    Track(TrackArgs),

    /// Show the public tracking view of a delivery
    Delivery(DeliveryArgs),
}

/// Which date the bounds apply to.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum DateField {
    Created,
    Order,
}

impl From<DateField> for DateFilter {
    fn from(field: DateField) -> Self {
        match field {
            DateField::Created => Self::CreatedAt,
            DateField::Order => Self::OrderDate,
        }
    }
}

/// Date range and refresh options shared by the list commands.
#[derive(Args, Debug, Clone)]
pub struct RangeArgs {
    /// Lower bound (RFC 3339)
    #[arg(long)]
    pub from: Option<DateTime<Utc>>,

    /// Upper bound (RFC 3339)
    #[arg(long)]
    pub to: Option<DateTime<Utc>>,

    /// Date the bounds apply to
    #[arg(long, value_enum)]
    pub date_field: Option<DateField>,

    /// Keep refreshing the list until interrupted
    #[arg(short, long)]
    pub watch: bool,

    /// Refresh period in seconds for --watch (default from config)
    #[arg(long, requires = "watch")]
    pub interval: Option<u64>,
}

impl RangeArgs {
    fn apply(&self, mut filters: ListFilters) -> ListFilters {
        filters.date_from = self.from;
        filters.date_to = self.to;
        filters.date_filter = self.date_field.map(DateFilter::from);
        filters
    }
}

#[derive(Args, Debug, Clone)]
pub struct OrdersArgs {
    /// Match customer name or address
    #[arg(short, long)]
    pub search: Option<String>,

    #[command(flatten)]
    pub range: RangeArgs,
}

impl OrdersArgs {
    #[must_use]
    pub fn filters(&self) -> ListFilters {
        let filters = match &self.search {
            Some(search) => ListFilters::default().with_search(search.clone()),
            None => ListFilters::default(),
        };
        self.range.apply(filters)
    }
}

#[derive(Args, Debug, Clone)]
pub struct DeliveriesArgs {
    /// Only deliveries of this route
    #[arg(long)]
    pub route: Option<RouteId>,

    /// Only deliveries of this driver
    #[arg(long)]
    pub driver: Option<DriverId>,

    #[command(flatten)]
    pub range: RangeArgs,
}

impl DeliveriesArgs {
    #[must_use]
    pub fn filters(&self) -> ListFilters {
        let filters = ListFilters {
            route_id: self.route,
            driver_id: self.driver,
            ..ListFilters::default()
        };
        self.range.apply(filters)
    }
}

#[derive(Args, Debug, Clone)]
pub struct TrackArgs {
    /// Delivery to follow
    pub delivery_id: DeliveryId,

    /// Destination latitude, to print arrival estimates
    #[arg(long, requires = "dest_lng", allow_hyphen_values = true)]
    pub dest_lat: Option<f64>,

    /// Destination longitude, to print arrival estimates
    #[arg(long, requires = "dest_lat", allow_hyphen_values = true)]
    pub dest_lng: Option<f64>,
}

#[derive(Args, Debug, Clone)]
pub struct DeliveryArgs {
    pub delivery_id: DeliveryId,
}
