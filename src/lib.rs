pub mod config;
pub mod data;
pub mod geo;
pub mod i18n;
pub mod pipeline;

pub use data::model::{Category, MobilityDataset, MobilityRecord};
pub use data::outcome::{EmptyReason, Outcome};
