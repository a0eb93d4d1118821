use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use thiserror::Error;

use super::model::{MobilityDataset, MobilityRecord};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("date range start {start} is after end {end}")]
    InvertedRange { start: NaiveDate, end: NaiveDate },
}

// ---------------------------------------------------------------------------
// DateRange – inclusive calendar interval
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, FilterError> {
        if start > end {
            return Err(FilterError::InvertedRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// The whole span of a dataset, `None` when it has no rows.
    pub fn covering(dataset: &MobilityDataset) -> Option<Self> {
        dataset
            .date_bounds
            .map(|(start, end)| Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

// ---------------------------------------------------------------------------
// FilterSpec – everything the user can narrow the table by
// ---------------------------------------------------------------------------

/// Date range plus optional region and year constraints.
///
/// `region: None` keeps every region (the map and clustering views).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterSpec {
    pub range: DateRange,
    pub region: Option<String>,
    pub year: Option<i32>,
}

impl FilterSpec {
    pub fn new(range: DateRange) -> Self {
        Self {
            range,
            region: None,
            year: None,
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    /// Same dates and year, every region.
    pub fn all_regions(&self) -> Self {
        Self {
            region: None,
            ..self.clone()
        }
    }

    pub fn matches(&self, rec: &MobilityRecord) -> bool {
        let date = rec.date();
        if !self.range.contains(date) {
            return false;
        }
        if let Some(year) = self.year {
            if date.year() != year {
                return false;
            }
        }
        match &self.region {
            Some(wanted) => rec.region() == Some(wanted.as_str()),
            None => true,
        }
    }
}

// ---------------------------------------------------------------------------
// FilteredView – borrowed subset of the combined table
// ---------------------------------------------------------------------------

/// Rows of a dataset that passed a [`FilterSpec`], in dataset order.
#[derive(Debug, Clone)]
pub struct FilteredView<'a> {
    pub dataset: &'a MobilityDataset,
    pub indices: Vec<usize>,
}

impl<'a> FilteredView<'a> {
    /// Every row, unfiltered.
    pub fn all(dataset: &'a MobilityDataset) -> Self {
        Self {
            dataset,
            indices: (0..dataset.len()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// `(dataset index, record)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &'a MobilityRecord)> + '_ {
        let dataset = self.dataset;
        self.indices.iter().map(move |&i| (i, &dataset.records[i]))
    }

    pub fn records(&self) -> impl Iterator<Item = &'a MobilityRecord> + '_ {
        self.iter().map(|(_, rec)| rec)
    }
}

/// Return indices of records that pass the filter.
///
/// An unknown region simply matches nothing.
pub fn filtered_indices(dataset: &MobilityDataset, spec: &FilterSpec) -> Vec<usize> {
    dataset
        .records
        .iter()
        .enumerate()
        .filter(|(_, rec)| spec.matches(rec))
        .map(|(i, _)| i)
        .collect()
}

pub fn filter<'a>(dataset: &'a MobilityDataset, spec: &FilterSpec) -> FilteredView<'a> {
    let indices = filtered_indices(dataset, spec);
    if indices.is_empty() {
        log::debug!("Filter {spec:?} matched no rows");
    }
    FilteredView { dataset, indices }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::MobilityRecord;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn dataset() -> MobilityDataset {
        let rows = [
            ("Jakarta", "2020-03-01"),
            ("Bali", "2020-03-02"),
            ("Jakarta", "2020-12-31"),
            ("Jakarta", "2021-01-01"),
            ("Bali", "2021-06-15"),
        ];
        MobilityDataset::from_records(
            rows.iter()
                .map(|(region, d)| MobilityRecord {
                    country_region_code: Some("ID".into()),
                    country_region: Some("Indonesia".into()),
                    sub_region_1: Some(region.to_string()),
                    sub_region_2: None,
                    iso_3166_2_code: None,
                    timestamp: date(d).and_hms_opt(0, 0, 0).unwrap(),
                    values: [Some(1.0); 6],
                })
                .collect(),
        )
    }

    #[test]
    fn inverted_range_is_rejected() {
        let err = DateRange::new(date("2021-01-02"), date("2021-01-01")).unwrap_err();
        assert!(matches!(err, FilterError::InvertedRange { .. }));
        assert!(DateRange::new(date("2021-01-01"), date("2021-01-01")).is_ok());
    }

    #[test]
    fn range_bounds_are_inclusive() {
        let ds = dataset();
        let range = DateRange::new(date("2020-03-01"), date("2020-12-31")).unwrap();
        let view = filter(&ds, &FilterSpec::new(range));
        assert_eq!(view.indices, vec![0, 1, 2]);
        assert!(view.records().all(|r| range.contains(r.date())));
    }

    #[test]
    fn region_and_year_narrow_the_view() {
        let ds = dataset();
        let range = DateRange::covering(&ds).unwrap();
        let spec = FilterSpec::new(range).with_region("Jakarta");
        assert_eq!(filtered_indices(&ds, &spec), vec![0, 2, 3]);
        let spec = spec.with_year(2021);
        assert_eq!(filtered_indices(&ds, &spec), vec![3]);
        assert_eq!(filtered_indices(&ds, &spec.all_regions()), vec![3, 4]);
    }

    #[test]
    fn unknown_region_is_empty_not_an_error() {
        let ds = dataset();
        let spec = FilterSpec::new(DateRange::covering(&ds).unwrap()).with_region("Atlantis");
        assert!(filter(&ds, &spec).is_empty());
    }

    #[test]
    fn shrinking_the_range_never_adds_rows() {
        let ds = dataset();
        let (lo, hi) = ds.date_bounds.unwrap();
        let mut end = hi;
        let mut previous = usize::MAX;
        while end >= lo {
            let count = filter(&ds, &FilterSpec::new(DateRange::new(lo, end).unwrap())).len();
            assert!(count <= previous);
            previous = count;
            end = end.pred_opt().unwrap();
        }
        assert_eq!(previous, 1);
    }
}
