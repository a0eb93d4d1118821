use std::collections::{BTreeMap, BTreeSet};

use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use super::filter::FilteredView;
use super::model::Category;
use super::outcome::{EmptyReason, Outcome};
use crate::i18n::Language;

/// Monday first, as the heatmap rows and weekday bars are laid out.
pub const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

// ---------------------------------------------------------------------------
// Aggregation function
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    #[default]
    Mean,
    Median,
    Sum,
    Min,
    Max,
    Count,
}

impl Aggregation {
    pub const ALL: [Aggregation; 6] = [
        Aggregation::Mean,
        Aggregation::Median,
        Aggregation::Sum,
        Aggregation::Min,
        Aggregation::Max,
        Aggregation::Count,
    ];

    /// Reduce a group of present values. `None` for an empty group.
    pub fn apply(self, values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }
        let n = values.len() as f64;
        Some(match self {
            Aggregation::Mean => values.iter().sum::<f64>() / n,
            Aggregation::Sum => values.iter().sum(),
            Aggregation::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            Aggregation::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Aggregation::Count => n,
            Aggregation::Median => {
                let mut sorted = values.to_vec();
                sorted.sort_by(f64::total_cmp);
                let mid = sorted.len() / 2;
                if sorted.len() % 2 == 0 {
                    (sorted[mid - 1] + sorted[mid]) / 2.0
                } else {
                    sorted[mid]
                }
            }
        })
    }

    pub fn label(self, lang: Language) -> &'static str {
        match (self, lang) {
            (Aggregation::Mean, Language::En) => "Mean",
            (Aggregation::Mean, Language::Id) => "Rata-rata",
            (Aggregation::Median, _) => "Median",
            (Aggregation::Sum, Language::En) => "Sum",
            (Aggregation::Sum, Language::Id) => "Jumlah",
            (Aggregation::Min, Language::En) => "Minimum",
            (Aggregation::Min, Language::Id) => "Minimum",
            (Aggregation::Max, Language::En) => "Maximum",
            (Aggregation::Max, Language::Id) => "Maksimum",
            (Aggregation::Count, Language::En) => "Count",
            (Aggregation::Count, Language::Id) => "Banyaknya",
        }
    }
}

// ---------------------------------------------------------------------------
// Weekday × hour pivot (heatmap)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekdayHourPivot {
    pub field: Category,
    pub aggregation: Aggregation,
    /// Column keys, ascending.
    pub hours: Vec<u32>,
    /// 7 rows (Monday..Sunday) × `hours.len()` cells.
    pub cells: Vec<Vec<Option<f64>>>,
}

/// Pivot one field by weekday (rows) and hour of day (columns).
///
/// A grid missing any weekday, or with no hour columns, is reported as
/// [`EmptyReason::InsufficientPivot`] instead of being returned half-filled.
pub fn weekday_hour_pivot(
    view: &FilteredView<'_>,
    field: Category,
    aggregation: Aggregation,
) -> Outcome<WeekdayHourPivot> {
    if view.is_empty() {
        return Outcome::Empty(EmptyReason::NoRows);
    }

    let mut groups: BTreeMap<(usize, u32), Vec<f64>> = BTreeMap::new();
    for rec in view.records() {
        if let Some(v) = rec.value(field) {
            let day = rec.weekday().num_days_from_monday() as usize;
            groups.entry((day, rec.hour())).or_default().push(v);
        }
    }

    let weekdays: BTreeSet<usize> = groups.keys().map(|(d, _)| *d).collect();
    let hours: Vec<u32> = groups
        .keys()
        .map(|(_, h)| *h)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    if weekdays.len() < WEEKDAYS.len() || hours.is_empty() {
        return Outcome::Empty(EmptyReason::InsufficientPivot {
            weekdays: weekdays.len(),
            columns: hours.len(),
        });
    }

    let cells = (0..WEEKDAYS.len())
        .map(|day| {
            hours
                .iter()
                .map(|h| {
                    groups
                        .get(&(day, *h))
                        .and_then(|vals| aggregation.apply(vals))
                })
                .collect()
        })
        .collect();

    Outcome::Ready(WeekdayHourPivot {
        field,
        aggregation,
        hours,
        cells,
    })
}

// ---------------------------------------------------------------------------
// Per-weekday aggregate
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekdayAggregate {
    pub field: Category,
    pub aggregation: Aggregation,
    /// Always 7 entries, Monday..Sunday; `None` where no value was present.
    pub buckets: Vec<(Weekday, Option<f64>)>,
}

pub fn weekday_aggregate(
    view: &FilteredView<'_>,
    field: Category,
    aggregation: Aggregation,
) -> Outcome<WeekdayAggregate> {
    if view.is_empty() {
        return Outcome::Empty(EmptyReason::NoRows);
    }

    let mut groups: [Vec<f64>; 7] = Default::default();
    for rec in view.records() {
        if let Some(v) = rec.value(field) {
            groups[rec.weekday().num_days_from_monday() as usize].push(v);
        }
    }

    let buckets = WEEKDAYS
        .iter()
        .zip(groups.iter())
        .map(|(day, vals)| (*day, aggregation.apply(vals)))
        .collect();

    Outcome::Ready(WeekdayAggregate {
        field,
        aggregation,
        buckets,
    })
}

// ---------------------------------------------------------------------------
// Per-region aggregate (choropleth input)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionAggregate {
    pub field: Category,
    pub aggregation: Aggregation,
    /// `sub_region_1` → aggregated value, sorted by region.
    pub values: BTreeMap<String, f64>,
}

pub fn region_aggregate(
    view: &FilteredView<'_>,
    field: Category,
    aggregation: Aggregation,
) -> Outcome<RegionAggregate> {
    if view.is_empty() {
        return Outcome::Empty(EmptyReason::NoRows);
    }

    let mut groups: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for rec in view.records() {
        if let (Some(region), Some(v)) = (rec.region(), rec.value(field)) {
            groups.entry(region).or_default().push(v);
        }
    }

    let values: BTreeMap<String, f64> = groups
        .into_iter()
        .filter_map(|(region, vals)| aggregation.apply(&vals).map(|v| (region.to_string(), v)))
        .collect();

    if values.is_empty() {
        return Outcome::Empty(EmptyReason::NoValues { field });
    }

    Outcome::Ready(RegionAggregate {
        field,
        aggregation,
        values,
    })
}

// ---------------------------------------------------------------------------
// Daily series (trend lines and bars)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DailyPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// One point per calendar date, ascending. Several places on the same day
/// are reduced with `aggregation`.
pub fn daily_series(
    view: &FilteredView<'_>,
    field: Category,
    aggregation: Aggregation,
) -> Outcome<Vec<DailyPoint>> {
    if view.is_empty() {
        return Outcome::Empty(EmptyReason::NoRows);
    }

    let mut groups: BTreeMap<NaiveDate, Vec<f64>> = BTreeMap::new();
    for rec in view.records() {
        if let Some(v) = rec.value(field) {
            groups.entry(rec.date()).or_default().push(v);
        }
    }

    let points: Vec<DailyPoint> = groups
        .into_iter()
        .filter_map(|(date, vals)| aggregation.apply(&vals).map(|value| DailyPoint { date, value }))
        .collect();

    if points.is_empty() {
        return Outcome::Empty(EmptyReason::NoValues { field });
    }
    Outcome::Ready(points)
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Summary {
    pub count: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

pub fn summary(view: &FilteredView<'_>, field: Category) -> Outcome<Summary> {
    if view.is_empty() {
        return Outcome::Empty(EmptyReason::NoRows);
    }
    let values: Vec<f64> = view.records().filter_map(|r| r.value(field)).collect();
    match (
        Aggregation::Mean.apply(&values),
        Aggregation::Min.apply(&values),
        Aggregation::Max.apply(&values),
    ) {
        (Some(mean), Some(min), Some(max)) => Outcome::Ready(Summary {
            count: values.len(),
            mean,
            min,
            max,
        }),
        _ => Outcome::Empty(EmptyReason::NoValues { field }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::filter::FilteredView;
    use crate::data::model::{MobilityDataset, MobilityRecord};
    use chrono::NaiveDateTime;

    fn rec(region: &str, ts: &str, residential: Option<f64>) -> MobilityRecord {
        MobilityRecord {
            country_region_code: Some("ID".into()),
            country_region: Some("Indonesia".into()),
            sub_region_1: Some(region.into()),
            sub_region_2: None,
            iso_3166_2_code: None,
            timestamp: NaiveDateTime::parse_from_str(ts, "%Y-%m-%d %H:%M:%S").unwrap(),
            values: [None, None, None, None, None, residential],
        }
    }

    /// 2021-03-01 is a Monday; two full weeks of daily rows.
    fn fortnight() -> MobilityDataset {
        let records = (0..14)
            .map(|i| {
                let day = 1 + i;
                rec("Jakarta", &format!("2021-03-{day:02} 00:00:00"), Some(i as f64))
            })
            .collect();
        MobilityDataset::from_records(records)
    }

    #[test]
    fn aggregation_functions() {
        let vals = [4.0, 1.0, 3.0, 2.0];
        assert_eq!(Aggregation::Mean.apply(&vals), Some(2.5));
        assert_eq!(Aggregation::Median.apply(&vals), Some(2.5));
        assert_eq!(Aggregation::Median.apply(&[5.0, 1.0, 3.0]), Some(3.0));
        assert_eq!(Aggregation::Sum.apply(&vals), Some(10.0));
        assert_eq!(Aggregation::Min.apply(&vals), Some(1.0));
        assert_eq!(Aggregation::Max.apply(&vals), Some(4.0));
        assert_eq!(Aggregation::Count.apply(&vals), Some(4.0));
        assert_eq!(Aggregation::Mean.apply(&[]), None);
    }

    #[test]
    fn weekday_aggregate_has_seven_ordered_buckets() {
        let ds = fortnight();
        let view = FilteredView::all(&ds);
        let agg = weekday_aggregate(&view, Category::Residential, Aggregation::Mean)
            .ready()
            .unwrap();
        assert_eq!(agg.buckets.len(), 7);
        assert_eq!(agg.buckets[0], (Weekday::Mon, Some(3.5))); // (0 + 7) / 2
        assert_eq!(agg.buckets[6], (Weekday::Sun, Some(9.5))); // (6 + 13) / 2
    }

    #[test]
    fn weekday_aggregate_keeps_seven_buckets_for_sparse_input() {
        let ds = MobilityDataset::from_records(vec![rec("Bali", "2021-03-03 00:00:00", Some(2.0))]);
        let agg = weekday_aggregate(&FilteredView::all(&ds), Category::Residential, Aggregation::Mean)
            .ready()
            .unwrap();
        let days: Vec<Weekday> = agg.buckets.iter().map(|(d, _)| *d).collect();
        assert_eq!(days, WEEKDAYS);
        assert_eq!(agg.buckets[2].1, Some(2.0));
        assert_eq!(agg.buckets.iter().filter(|(_, v)| v.is_none()).count(), 6);
    }

    #[test]
    fn empty_view_signals_no_rows() {
        let ds = fortnight();
        let view = FilteredView {
            dataset: &ds,
            indices: Vec::new(),
        };
        let field = Category::Residential;
        assert_eq!(
            weekday_aggregate(&view, field, Aggregation::Mean).empty_reason(),
            Some(&EmptyReason::NoRows)
        );
        assert!(!weekday_hour_pivot(&view, field, Aggregation::Mean).is_ready());
        assert!(!region_aggregate(&view, field, Aggregation::Mean).is_ready());
        assert!(!daily_series(&view, field, Aggregation::Mean).is_ready());
    }

    #[test]
    fn pivot_of_daily_data_is_a_single_midnight_column() {
        let ds = fortnight();
        let pivot = weekday_hour_pivot(&FilteredView::all(&ds), Category::Residential, Aggregation::Mean)
            .ready()
            .unwrap();
        assert_eq!(pivot.hours, vec![0]);
        assert_eq!(pivot.cells.len(), 7);
        assert_eq!(pivot.cells[1], vec![Some(4.5)]);
    }

    #[test]
    fn pivot_spanning_one_day_is_unavailable() {
        let ds = MobilityDataset::from_records(vec![
            rec("Bali", "2021-03-03 08:00:00", Some(1.0)),
            rec("Bali", "2021-03-03 17:00:00", Some(2.0)),
        ]);
        let out = weekday_hour_pivot(&FilteredView::all(&ds), Category::Residential, Aggregation::Mean);
        assert_eq!(
            out.empty_reason(),
            Some(&EmptyReason::InsufficientPivot { weekdays: 1, columns: 2 })
        );
    }

    #[test]
    fn pivot_without_values_has_zero_columns() {
        let records = (1..=7)
            .map(|d| rec("Bali", &format!("2021-03-{d:02} 00:00:00"), None))
            .collect();
        let ds = MobilityDataset::from_records(records);
        let out = weekday_hour_pivot(&FilteredView::all(&ds), Category::Residential, Aggregation::Mean);
        assert_eq!(
            out.empty_reason(),
            Some(&EmptyReason::InsufficientPivot { weekdays: 0, columns: 0 })
        );
    }

    #[test]
    fn region_aggregate_groups_and_skips_missing() {
        let ds = MobilityDataset::from_records(vec![
            rec("Bali", "2021-03-01 00:00:00", Some(2.0)),
            rec("Bali", "2021-03-02 00:00:00", Some(4.0)),
            rec("Aceh", "2021-03-01 00:00:00", None),
            rec("Papua", "2021-03-01 00:00:00", Some(-1.0)),
        ]);
        let agg = region_aggregate(&FilteredView::all(&ds), Category::Residential, Aggregation::Mean)
            .ready()
            .unwrap();
        assert_eq!(agg.values.len(), 2);
        assert_eq!(agg.values["Bali"], 3.0);
        assert_eq!(agg.values["Papua"], -1.0);
    }

    #[test]
    fn daily_series_reduces_same_day_rows() {
        let ds = MobilityDataset::from_records(vec![
            rec("Bali", "2021-03-02 00:00:00", Some(2.0)),
            rec("Aceh", "2021-03-01 00:00:00", Some(1.0)),
            rec("Papua", "2021-03-02 00:00:00", Some(6.0)),
        ]);
        let series = daily_series(&FilteredView::all(&ds), Category::Residential, Aggregation::Mean)
            .ready()
            .unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].date.to_string(), "2021-03-01");
        assert_eq!(series[1].value, 4.0);
    }

    #[test]
    fn summary_ignores_missing_values() {
        let ds = MobilityDataset::from_records(vec![
            rec("Bali", "2021-03-02 00:00:00", Some(2.0)),
            rec("Bali", "2021-03-03 00:00:00", None),
            rec("Bali", "2021-03-04 00:00:00", Some(-4.0)),
        ]);
        let s = summary(&FilteredView::all(&ds), Category::Residential).ready().unwrap();
        assert_eq!(s.count, 2);
        assert_eq!(s.mean, -1.0);
        assert_eq!(s.min, -4.0);
        assert_eq!(s.max, 2.0);
        assert_eq!(
            summary(&FilteredView::all(&ds), Category::Parks).empty_reason(),
            Some(&EmptyReason::NoValues { field: Category::Parks })
        );
    }
}
