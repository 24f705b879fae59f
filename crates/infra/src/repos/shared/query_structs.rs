use vicinity_domain::{GeoPoint, ID};

/// Filters for the event search operation. All filters are combined with
/// AND, results are ordered by `starts_at` ascending.
#[derive(Debug, Clone)]
pub struct EventSearchQuery {
    pub account_id: ID,
    /// Case insensitive partial match on the event category
    pub category: Option<String>,
    pub near: Option<NearFilter>,
    /// Lower inclusive bound on `starts_at`
    pub from: Option<i64>,
    /// Upper inclusive bound on `starts_at`
    pub to: Option<i64>,
    pub skip: usize,
    pub limit: usize,
}

#[derive(Debug, Clone)]
pub struct NearFilter {
    pub center: GeoPoint,
    pub radius_meters: f64,
}
