//! Filters accepted by the list endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{DriverId, RouteId};

/// Which date the `dateFrom`/`dateTo` bounds apply to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DateFilter {
    CreatedAt,
    #[default]
    OrderDate,
}

impl DateFilter {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CreatedAt => "CreatedAt",
            Self::OrderDate => "OrderDate",
        }
    }
}

/// Filter payload for the orders and deliveries lists.
///
/// Also the payload of list cache keys, so every field is optional and absent
/// fields do not take part in the key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_from: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_to: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_filter: Option<DateFilter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_id: Option<RouteId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_id: Option<DriverId>,
}

impl ListFilters {
    /// Filters covering `[from, to]` on the given date.
    #[must_use]
    pub fn between(from: DateTime<Utc>, to: DateTime<Utc>, date_filter: DateFilter) -> Self {
        Self {
            date_from: Some(from),
            date_to: Some(to),
            date_filter: Some(date_filter),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        let search = search.into();
        self.search = (!search.trim().is_empty()).then_some(search);
        self
    }

    /// Query-string pairs in the order the backend documents them.
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(from) = self.date_from {
            pairs.push(("dateFrom", from.to_rfc3339()));
        }
        if let Some(to) = self.date_to {
            pairs.push(("dateTo", to.to_rfc3339()));
        }
        if let Some(filter) = self.date_filter {
            pairs.push(("dateFilter", filter.as_str().to_string()));
        }
        if let Some(search) = &self.search {
            pairs.push(("search", search.clone()));
        }
        if let Some(route) = self.route_id {
            pairs.push(("routeId", route.to_string()));
        }
        if let Some(driver) = self.driver_id {
            pairs.push(("driverId", driver.to_string()));
        }
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn empty_filters_produce_no_query() {
        assert!(ListFilters::default().query_pairs().is_empty());
    }

    #[test]
    fn between_sets_date_bounds() {
        let from = Utc.with_ymd_and_hms(2026, 2, 4, 0, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2026, 2, 4, 23, 59, 59).unwrap();
        let pairs = ListFilters::between(from, to, DateFilter::CreatedAt).query_pairs();
        assert_eq!(pairs[0].0, "dateFrom");
        assert_eq!(pairs[1].0, "dateTo");
        assert_eq!(pairs[2], ("dateFilter", "CreatedAt".to_string()));
    }

    #[test]
    fn blank_search_is_dropped() {
        let filters = ListFilters::default().with_search("   ");
        assert!(filters.search.is_none());
    }

    #[test]
    fn absent_fields_are_not_serialized() {
        let json = serde_json::to_string(&ListFilters::default().with_search("alice")).unwrap();
        assert_eq!(json, r#"{"search":"alice"}"#);
    }
}
