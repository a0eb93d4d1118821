//! Static bilingual UI text (English / Bahasa Indonesia).

use std::fmt;

use chrono::Weekday;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Language {
    #[default]
    #[serde(rename = "en")]
    En,
    #[serde(rename = "id")]
    Id,
}

impl Language {
    pub fn code(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Id => "id",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Language::En => Language::Id,
            Language::Id => Language::En,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Every fixed piece of UI text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Text {
    AppTitle,
    File,
    OpenSources,
    OpenRegions,
    Filters,
    DateRange,
    From,
    To,
    Region,
    Year,
    AllYears,
    Field,
    Aggregation,
    Clustering,
    EnableClustering,
    RowsLoaded,
    RowsVisible,
    TrendTitle,
    ChangeOverTime,
    HeatmapTitle,
    WeekdayTitle,
    ClusterTitle,
    MapTitle,
    PercentChange,
    NoData,
    NoDataset,
    InvalidRange,
    Cluster,
    DataSource,
}

impl Text {
    pub fn get(self, lang: Language) -> &'static str {
        use Language::{En, Id};
        match (self, lang) {
            (Text::AppTitle, En) => "Mobility Data Visualization",
            (Text::AppTitle, Id) => "Visualisasi Data Mobilitas",
            (Text::File, En) => "File",
            (Text::File, Id) => "Berkas",
            (Text::OpenSources, En) => "Open reports…",
            (Text::OpenSources, Id) => "Buka laporan…",
            (Text::OpenRegions, En) => "Open region map…",
            (Text::OpenRegions, Id) => "Buka peta wilayah…",
            (Text::Filters, En) => "Filter Data",
            (Text::Filters, Id) => "Filter Data",
            (Text::DateRange, En) => "Date range",
            (Text::DateRange, Id) => "Rentang tanggal",
            (Text::From, En) => "From",
            (Text::From, Id) => "Dari",
            (Text::To, En) => "To",
            (Text::To, Id) => "Sampai",
            (Text::Region, En) => "Region",
            (Text::Region, Id) => "Wilayah",
            (Text::Year, En) => "Year",
            (Text::Year, Id) => "Tahun",
            (Text::AllYears, En) => "All years",
            (Text::AllYears, Id) => "Semua tahun",
            (Text::Field, En) => "Category",
            (Text::Field, Id) => "Kategori",
            (Text::Aggregation, En) => "Aggregation",
            (Text::Aggregation, Id) => "Agregasi",
            (Text::Clustering, En) => "Clustering",
            (Text::Clustering, Id) => "Pengelompokan",
            (Text::EnableClustering, En) => "Group regions (k-means)",
            (Text::EnableClustering, Id) => "Kelompokkan wilayah (k-means)",
            (Text::RowsLoaded, En) => "rows loaded",
            (Text::RowsLoaded, Id) => "baris dimuat",
            (Text::RowsVisible, En) => "visible",
            (Text::RowsVisible, Id) => "ditampilkan",
            (Text::TrendTitle, En) => "Retail & Recreation vs Grocery & Pharmacy Trends",
            (Text::TrendTitle, Id) => "Tren Ritel & Rekreasi vs Bahan Makanan & Apotek",
            (Text::ChangeOverTime, En) => "change over time",
            (Text::ChangeOverTime, Id) => "perubahan dari waktu ke waktu",
            (Text::HeatmapTitle, En) => "Daily Mobility Heatmap",
            (Text::HeatmapTitle, Id) => "Peta Panas Mobilitas Harian",
            (Text::WeekdayTitle, En) => "Average by Day of Week",
            (Text::WeekdayTitle, Id) => "Rata-rata per Hari",
            (Text::ClusterTitle, En) => "Mobility Clusters",
            (Text::ClusterTitle, Id) => "Klaster Mobilitas",
            (Text::MapTitle, En) => "Mobility by Province",
            (Text::MapTitle, Id) => "Mobilitas per Provinsi",
            (Text::PercentChange, En) => "% change",
            (Text::PercentChange, Id) => "% perubahan",
            (Text::NoData, En) => "No data",
            (Text::NoData, Id) => "Tidak ada data",
            (Text::NoDataset, En) => "Open mobility reports to begin (File → Open reports…)",
            (Text::NoDataset, Id) => "Buka laporan mobilitas untuk memulai (Berkas → Buka laporan…)",
            (Text::InvalidRange, En) => "Start date is after end date",
            (Text::InvalidRange, Id) => "Tanggal awal setelah tanggal akhir",
            (Text::Cluster, En) => "Cluster",
            (Text::Cluster, Id) => "Klaster",
            (Text::DataSource, En) => "Data sourced from Google Community Mobility Reports",
            (Text::DataSource, Id) => "Sumber data: Laporan Mobilitas Masyarakat Google",
        }
    }
}

pub fn weekday_name(day: Weekday, lang: Language) -> &'static str {
    match (day, lang) {
        (Weekday::Mon, Language::En) => "Monday",
        (Weekday::Tue, Language::En) => "Tuesday",
        (Weekday::Wed, Language::En) => "Wednesday",
        (Weekday::Thu, Language::En) => "Thursday",
        (Weekday::Fri, Language::En) => "Friday",
        (Weekday::Sat, Language::En) => "Saturday",
        (Weekday::Sun, Language::En) => "Sunday",
        (Weekday::Mon, Language::Id) => "Senin",
        (Weekday::Tue, Language::Id) => "Selasa",
        (Weekday::Wed, Language::Id) => "Rabu",
        (Weekday::Thu, Language::Id) => "Kamis",
        (Weekday::Fri, Language::Id) => "Jumat",
        (Weekday::Sat, Language::Id) => "Sabtu",
        (Weekday::Sun, Language::Id) => "Minggu",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_codes_round_trip_through_serde() {
        let lang: Language = serde_json::from_str("\"id\"").unwrap();
        assert_eq!(lang, Language::Id);
        assert_eq!(serde_json::to_string(&Language::En).unwrap(), "\"en\"");
        assert_eq!(Language::En.toggled(), Language::Id);
    }

    #[test]
    fn text_differs_by_language() {
        assert_ne!(Text::Region.get(Language::En), Text::Region.get(Language::Id));
        assert_eq!(weekday_name(Weekday::Sun, Language::Id), "Minggu");
    }
}
