use chrono::NaiveDate;

use mobility_dash::config::DashboardConfig;
use mobility_dash::data::aggregate::Aggregation;
use mobility_dash::data::filter::{DateRange, FilterError, FilterSpec};
use mobility_dash::data::model::{Category, MobilityDataset};
use mobility_dash::geo::ShapeSet;
use mobility_dash::i18n::Language;
use mobility_dash::pipeline::{self, DashboardQuery, DashboardViews, MapInput};

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    pub config: DashboardConfig,

    /// Combined yearly reports (None until loaded).
    pub dataset: Option<MobilityDataset>,

    /// Province outlines for the map view.
    pub shapes: Option<ShapeSet>,

    pub start: NaiveDate,
    pub end: NaiveDate,
    pub region: Option<String>,
    pub year: Option<i32>,
    pub field: Category,
    pub aggregation: Aggregation,
    pub clustering: bool,

    /// Selected UI language; handed to every render call.
    pub language: Language,

    /// Views for the current selection (recomputed on every change).
    pub views: Option<DashboardViews>,

    /// Set while the picked dates do not form a range.
    pub range_error: Option<FilterError>,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    pub fn new(config: DashboardConfig) -> Self {
        let today = chrono::Local::now().date_naive();
        Self {
            language: config.language,
            config,
            dataset: None,
            shapes: None,
            start: today,
            end: today,
            region: None,
            year: None,
            field: Category::Residential,
            aggregation: Aggregation::Mean,
            clustering: false,
            views: None,
            range_error: None,
            status_message: None,
        }
    }

    /// Ingest a newly loaded dataset and reset the selection to its span.
    pub fn set_dataset(&mut self, dataset: MobilityDataset) {
        if let Some((lo, hi)) = dataset.date_bounds {
            self.start = lo;
            self.end = hi;
        }
        // Only observed regions are offered, so keep the old one if present.
        let keep = self
            .region
            .as_ref()
            .is_some_and(|r| dataset.has_region(r));
        if !keep {
            self.region = dataset.regions.iter().next().cloned();
        }
        if self.year.is_some_and(|y| !dataset.years.contains(&y)) {
            self.year = None;
        }
        self.dataset = Some(dataset);
        self.status_message = None;
        self.refresh();
    }

    pub fn set_shapes(&mut self, shapes: ShapeSet) {
        self.shapes = Some(shapes);
        self.refresh();
    }

    fn query(&self) -> Result<DashboardQuery, FilterError> {
        let range = DateRange::new(self.start, self.end)?;
        let mut spec = FilterSpec::new(range);
        spec.region = self.region.clone();
        spec.year = self.year;

        let mut query = DashboardQuery::new(spec);
        query.field = self.field;
        query.aggregation = self.aggregation;
        query.clustering = self.clustering.then(|| self.config.clustering.clone());
        Ok(query)
    }

    /// Recompute every view after a selection change.
    pub fn refresh(&mut self) {
        let Some(dataset) = &self.dataset else {
            self.views = None;
            return;
        };
        let query = match self.query() {
            Ok(query) => query,
            Err(e) => {
                log::warn!("{e}");
                self.views = None;
                self.range_error = Some(e);
                return;
            }
        };
        self.range_error = None;
        let map = self.shapes.as_ref().map(|shapes| MapInput {
            shapes,
            aliases: &self.config.region_aliases,
        });
        self.views = Some(pipeline::compute(dataset, &query, map));
        self.status_message = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mobility_dash::data::loader::read_csv;

    const CSV: &str = "country_region_code,country_region,sub_region_1,date,residential_percent_change_from_baseline
ID,Indonesia,Bali,2021-03-01,4
ID,Indonesia,Bali,2021-03-02,5
";

    fn loaded_state() -> AppState {
        let mut state = AppState::new(DashboardConfig::default());
        state.set_dataset(read_csv(CSV.as_bytes()).unwrap());
        state
    }

    #[test]
    fn loading_selects_full_span_and_first_region() {
        let state = loaded_state();
        assert_eq!(state.start, NaiveDate::from_ymd_opt(2021, 3, 1).unwrap());
        assert_eq!(state.end, NaiveDate::from_ymd_opt(2021, 3, 2).unwrap());
        assert_eq!(state.region.as_deref(), Some("Bali"));
        assert_eq!(state.views.as_ref().map(|v| v.regional_rows), Some(2));
        assert!(state.range_error.is_none());
    }

    #[test]
    fn inverted_dates_are_reported_not_mistaken_for_no_data() {
        let mut state = loaded_state();
        std::mem::swap(&mut state.start, &mut state.end);
        state.refresh();
        assert!(state.dataset.is_some());
        assert!(state.views.is_none());
        assert!(matches!(
            state.range_error,
            Some(FilterError::InvertedRange { .. })
        ));

        state.end = state.start;
        state.refresh();
        assert!(state.range_error.is_none());
        assert!(state.views.is_some());
    }
}
