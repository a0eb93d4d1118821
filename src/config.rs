use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::cluster::ClusterSettings;
use crate::data::model::Category;
use crate::i18n::Language;

/// Published yearly reports for Indonesia, in load order.
pub const DEFAULT_SOURCES: [&str; 3] = [
    "https://raw.githubusercontent.com/Ram4UnMi/bisnis_visualisasi_data/main/dataset/2020_ID_Region_Mobility_Report.csv",
    "https://raw.githubusercontent.com/Ram4UnMi/bisnis_visualisasi_data/main/dataset/2021_ID_Region_Mobility_Report.csv",
    "https://raw.githubusercontent.com/Ram4UnMi/bisnis_visualisasi_data/main/dataset/2022_ID_Region_Mobility_Report.csv",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("at least one data source is required")]
    NoSources,
    #[error("cluster count must be at least 1")]
    ZeroClusters,
    #[error("clustering needs 3 to 6 features, got {0}")]
    FeatureCount(usize),
    #[error("clustering feature '{0}' is listed twice")]
    DuplicateFeature(Category),
    #[error("region name property must not be empty")]
    EmptyNameProperty,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Paths or http(s) URLs, concatenated in this order.
    pub sources: Vec<String>,
    /// GeoJSON with one feature per province, for the map view.
    pub regions_geojson: Option<PathBuf>,
    /// Feature property holding the province name.
    pub region_name_property: String,
    /// Data-side name → polygon-side name, for spellings that differ.
    pub region_aliases: BTreeMap<String, String>,
    pub language: Language,
    pub clustering: ClusterSettings,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            sources: DEFAULT_SOURCES.iter().map(|s| s.to_string()).collect(),
            regions_geojson: None,
            region_name_property: "name".to_string(),
            region_aliases: BTreeMap::new(),
            language: Language::En,
            clustering: ClusterSettings::default(),
        }
    }
}

impl DashboardConfig {
    /// Read a JSON config file; missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Self = serde_json::from_str(&text).context("parsing config JSON")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sources.is_empty() {
            return Err(ConfigError::NoSources);
        }
        if self.clustering.k == 0 {
            return Err(ConfigError::ZeroClusters);
        }
        let features = &self.clustering.features;
        if !(3..=6).contains(&features.len()) {
            return Err(ConfigError::FeatureCount(features.len()));
        }
        let mut seen = BTreeSet::new();
        if let Some(dup) = features.iter().find(|f| !seen.insert(**f)) {
            return Err(ConfigError::DuplicateFeature(*dup));
        }
        if self.region_name_property.trim().is_empty() {
            return Err(ConfigError::EmptyNameProperty);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_point_at_three_yearly_reports() {
        let config = DashboardConfig::default();
        assert_eq!(config.sources.len(), 3);
        assert!(config.sources[0].contains("2020_ID_Region_Mobility_Report"));
        assert_eq!(config.clustering.k, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"sources": ["a.csv"], "language": "id",
                 "clustering": {{"features": ["parks", "workplaces", "residential"]}}}}"#
        )
        .unwrap();
        let config = DashboardConfig::load(file.path()).unwrap();
        assert_eq!(config.sources, vec!["a.csv".to_string()]);
        assert_eq!(config.language, Language::Id);
        assert_eq!(config.clustering.k, 3);
        assert_eq!(config.clustering.features[0], Category::Parks);
        assert_eq!(config.region_name_property, "name");
    }

    #[test]
    fn invalid_values_are_rejected() {
        let config = DashboardConfig {
            sources: Vec::new(),
            ..DashboardConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::NoSources));

        let mut config = DashboardConfig::default();
        config.clustering.k = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroClusters));
    }

    #[test]
    fn cluster_features_must_be_three_to_six_distinct() {
        let mut config = DashboardConfig::default();
        config.clustering.features = vec![Category::Parks, Category::Parks];
        assert_eq!(config.validate(), Err(ConfigError::FeatureCount(2)));

        config.clustering.features = vec![Category::Parks, Category::Workplaces, Category::Parks];
        assert_eq!(config.validate(), Err(ConfigError::DuplicateFeature(Category::Parks)));

        config.clustering.features = Vec::new();
        assert_eq!(config.validate(), Err(ConfigError::FeatureCount(0)));

        config.clustering.features = vec![
            Category::RetailAndRecreation,
            Category::TransitStations,
            Category::Workplaces,
        ];
        assert!(config.validate().is_ok());
    }
}
