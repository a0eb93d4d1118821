//! One parameterized recomputation of every dashboard view.
//!
//! ```text
//!  MobilityDataset ──filter(spec)──────────► regional view ──► trends, bars,
//!        │                                                    pivot, weekday
//!        └────────filter(spec.all_regions)─► national view ──► per-region ──► map join
//!                                                          └─► k-means
//! ```

use std::collections::BTreeMap;

use serde::Serialize;

use crate::data::aggregate::{
    Aggregation, DailyPoint, RegionAggregate, Summary, WeekdayAggregate, WeekdayHourPivot,
    daily_series, region_aggregate, summary, weekday_aggregate, weekday_hour_pivot,
};
use crate::data::cluster::{ClusterAssignment, ClusterSettings, cluster};
use crate::data::filter::{FilterSpec, filter};
use crate::data::model::{Category, MobilityDataset};
use crate::data::outcome::Outcome;
use crate::geo::{RegionJoin, ShapeSet, join_regions};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardQuery {
    pub filter: FilterSpec,
    /// Field for the heatmap, weekday bars and map.
    pub field: Category,
    pub trend_fields: Vec<Category>,
    pub bar_field: Category,
    pub aggregation: Aggregation,
    /// `None` skips clustering entirely.
    pub clustering: Option<ClusterSettings>,
}

impl DashboardQuery {
    pub fn new(filter: FilterSpec) -> Self {
        Self {
            filter,
            field: Category::Residential,
            trend_fields: vec![Category::RetailAndRecreation, Category::GroceryAndPharmacy],
            bar_field: Category::Workplaces,
            aggregation: Aggregation::Mean,
            clustering: None,
        }
    }
}

/// Polygons plus spelling aliases for the map join.
#[derive(Debug, Clone, Copy)]
pub struct MapInput<'a> {
    pub shapes: &'a ShapeSet,
    pub aliases: &'a BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardViews {
    /// Rows matching dates, year and region.
    pub regional_rows: usize,
    /// Rows matching dates and year, every region.
    pub national_rows: usize,
    pub trends: Vec<(Category, Outcome<Vec<DailyPoint>>)>,
    /// Daily series for `bar_field`, tagged with the field it was built from.
    pub bars: (Category, Outcome<Vec<DailyPoint>>),
    pub pivot: Outcome<WeekdayHourPivot>,
    pub weekday: Outcome<WeekdayAggregate>,
    pub summary: Outcome<Summary>,
    pub regions: Outcome<RegionAggregate>,
    /// `None` when no polygons are loaded.
    pub map: Option<Outcome<RegionJoin>>,
    /// `None` when clustering is off.
    pub clusters: Option<Outcome<ClusterAssignment>>,
}

pub fn compute(
    dataset: &MobilityDataset,
    query: &DashboardQuery,
    map: Option<MapInput<'_>>,
) -> DashboardViews {
    let regional = filter(dataset, &query.filter);
    let national = filter(dataset, &query.filter.all_regions());
    let agg = query.aggregation;

    let trends = query
        .trend_fields
        .iter()
        .map(|f| (*f, daily_series(&regional, *f, agg)))
        .collect();

    let regions = region_aggregate(&national, query.field, agg);
    let map = map.map(|input| {
        regions
            .as_ref()
            .and_then(|r| join_regions(r, input.shapes, input.aliases))
    });
    let clusters = query
        .clustering
        .as_ref()
        .map(|settings| cluster(&national, settings));

    let views = DashboardViews {
        regional_rows: regional.len(),
        national_rows: national.len(),
        trends,
        bars: (query.bar_field, daily_series(&regional, query.bar_field, agg)),
        pivot: weekday_hour_pivot(&regional, query.field, agg),
        weekday: weekday_aggregate(&regional, query.field, agg),
        summary: summary(&regional, query.field),
        regions,
        map,
        clusters,
    };

    log::debug!(
        "Recomputed views: {} regional rows, {} national rows",
        views.regional_rows,
        views.national_rows
    );
    views
}
