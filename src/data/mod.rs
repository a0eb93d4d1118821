/// Data layer: core types, loading, filtering and derived views.
///
/// Architecture:
/// ```text
///  2020.csv  2021.csv  2022.csv   (.json / .parquet / http)
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse + concat → MobilityDataset
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  date range, region, year → FilteredView
///   └──────────┘
///        │
///        ├──────────────┐
///        ▼              ▼
///   ┌───────────┐  ┌──────────┐
///   │ aggregate  │  │ cluster   │  → Outcome<...>
///   └───────────┘  └──────────┘
/// ```
pub mod aggregate;
pub mod cluster;
pub mod filter;
pub mod loader;
pub mod model;
pub mod outcome;
