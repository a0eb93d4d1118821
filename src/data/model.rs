use std::collections::BTreeSet;
use std::fmt;

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};

use crate::i18n::Language;

// ---------------------------------------------------------------------------
// Category – one of the six percent-change columns
// ---------------------------------------------------------------------------

/// The six place categories reported as percent change from baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    RetailAndRecreation,
    GroceryAndPharmacy,
    Parks,
    TransitStations,
    Workplaces,
    Residential,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::RetailAndRecreation,
        Category::GroceryAndPharmacy,
        Category::Parks,
        Category::TransitStations,
        Category::Workplaces,
        Category::Residential,
    ];

    /// Position inside [`MobilityRecord::values`].
    pub fn index(self) -> usize {
        match self {
            Category::RetailAndRecreation => 0,
            Category::GroceryAndPharmacy => 1,
            Category::Parks => 2,
            Category::TransitStations => 3,
            Category::Workplaces => 4,
            Category::Residential => 5,
        }
    }

    /// Column name used by the published CSV files.
    pub fn column(self) -> &'static str {
        match self {
            Category::RetailAndRecreation => "retail_and_recreation_percent_change_from_baseline",
            Category::GroceryAndPharmacy => "grocery_and_pharmacy_percent_change_from_baseline",
            Category::Parks => "parks_percent_change_from_baseline",
            Category::TransitStations => "transit_stations_percent_change_from_baseline",
            Category::Workplaces => "workplaces_percent_change_from_baseline",
            Category::Residential => "residential_percent_change_from_baseline",
        }
    }

    pub fn label(self, lang: Language) -> &'static str {
        match (self, lang) {
            (Category::RetailAndRecreation, Language::En) => "Retail & recreation",
            (Category::RetailAndRecreation, Language::Id) => "Ritel & rekreasi",
            (Category::GroceryAndPharmacy, Language::En) => "Grocery & pharmacy",
            (Category::GroceryAndPharmacy, Language::Id) => "Toko bahan makanan & apotek",
            (Category::Parks, Language::En) => "Parks",
            (Category::Parks, Language::Id) => "Taman",
            (Category::TransitStations, Language::En) => "Transit stations",
            (Category::TransitStations, Language::Id) => "Stasiun transit",
            (Category::Workplaces, Language::En) => "Workplaces",
            (Category::Workplaces, Language::Id) => "Tempat kerja",
            (Category::Residential, Language::En) => "Residential",
            (Category::Residential, Language::Id) => "Permukiman",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

// ---------------------------------------------------------------------------
// MobilityRecord – one row of the combined table
// ---------------------------------------------------------------------------

/// One report row: a place on a given day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MobilityRecord {
    pub country_region_code: Option<String>,
    pub country_region: Option<String>,
    /// Province; the region filter key.
    pub sub_region_1: Option<String>,
    pub sub_region_2: Option<String>,
    pub iso_3166_2_code: Option<String>,
    pub timestamp: NaiveDateTime,
    /// Percent change per [`Category`], indexed by [`Category::index`].
    pub values: [Option<f64>; 6],
}

impl MobilityRecord {
    pub fn value(&self, category: Category) -> Option<f64> {
        self.values[category.index()]
    }

    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }

    pub fn weekday(&self) -> Weekday {
        self.timestamp.weekday()
    }

    pub fn hour(&self) -> u32 {
        self.timestamp.hour()
    }

    pub fn year(&self) -> i32 {
        self.timestamp.year()
    }

    pub fn region(&self) -> Option<&str> {
        self.sub_region_1.as_deref()
    }
}

// ---------------------------------------------------------------------------
// MobilityDataset – the combined, normalized table
// ---------------------------------------------------------------------------

/// All loaded records in source order, plus the indices the UI needs.
#[derive(Debug, Clone, Default)]
pub struct MobilityDataset {
    pub records: Vec<MobilityRecord>,
    /// Sorted distinct non-empty `sub_region_1` values.
    pub regions: BTreeSet<String>,
    /// Sorted distinct calendar years.
    pub years: BTreeSet<i32>,
    /// Earliest and latest date, `None` for an empty dataset.
    pub date_bounds: Option<(NaiveDate, NaiveDate)>,
}

impl MobilityDataset {
    /// Build the indices from the loaded records.
    pub fn from_records(records: Vec<MobilityRecord>) -> Self {
        let mut regions = BTreeSet::new();
        let mut years = BTreeSet::new();
        let mut bounds: Option<(NaiveDate, NaiveDate)> = None;

        for rec in &records {
            if let Some(region) = rec.region() {
                if !region.is_empty() {
                    regions.insert(region.to_string());
                }
            }
            years.insert(rec.year());
            let d = rec.date();
            bounds = Some(match bounds {
                None => (d, d),
                Some((lo, hi)) => (lo.min(d), hi.max(d)),
            });
        }

        MobilityDataset {
            records,
            regions,
            years,
            date_bounds: bounds,
        }
    }

    /// Concatenate per-source tables, keeping source order.
    pub fn concat(parts: impl IntoIterator<Item = MobilityDataset>) -> Self {
        let records = parts.into_iter().flat_map(|p| p.records).collect();
        Self::from_records(records)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_region(&self, region: &str) -> bool {
        self.regions.contains(region)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(region: Option<&str>, date: &str) -> MobilityRecord {
        MobilityRecord {
            country_region_code: Some("ID".into()),
            country_region: Some("Indonesia".into()),
            sub_region_1: region.map(str::to_string),
            sub_region_2: None,
            iso_3166_2_code: None,
            timestamp: NaiveDate::parse_from_str(date, "%Y-%m-%d")
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            values: [None; 6],
        }
    }

    #[test]
    fn indices_skip_country_level_rows() {
        let ds = MobilityDataset::from_records(vec![
            record(None, "2020-02-15"),
            record(Some("Bali"), "2021-03-01"),
            record(Some("Aceh"), "2022-10-15"),
            record(Some(""), "2020-05-01"),
        ]);
        assert_eq!(ds.regions.iter().cloned().collect::<Vec<_>>(), ["Aceh", "Bali"]);
        assert_eq!(ds.years.iter().copied().collect::<Vec<_>>(), [2020, 2021, 2022]);
        let (lo, hi) = ds.date_bounds.unwrap();
        assert_eq!(lo.to_string(), "2020-02-15");
        assert_eq!(hi.to_string(), "2022-10-15");
    }

    #[test]
    fn concat_keeps_source_order() {
        let a = MobilityDataset::from_records(vec![record(Some("B"), "2021-01-01")]);
        let b = MobilityDataset::from_records(vec![record(Some("A"), "2020-01-01")]);
        let ds = MobilityDataset::concat([a, b]);
        assert_eq!(ds.records[0].region(), Some("B"));
        assert_eq!(ds.records[1].region(), Some("A"));
        assert!(ds.has_region("A"));
    }

    #[test]
    fn category_columns_match_index_order() {
        for (i, c) in Category::ALL.iter().enumerate() {
            assert_eq!(c.index(), i);
            assert!(c.column().ends_with("_percent_change_from_baseline"));
        }
    }
}
