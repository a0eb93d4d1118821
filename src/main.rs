mod app;
mod color;
mod state;
mod ui;

use std::path::PathBuf;

use anyhow::{Context, Result};
use app::MobilityDashApp;
use eframe::egui;

use mobility_dash::config::DashboardConfig;
use mobility_dash::data::loader;
use mobility_dash::geo;
use state::AppState;

fn main() -> Result<()> {
    env_logger::init();

    // Optional JSON config as the only argument.
    let config = match std::env::args_os().nth(1).map(PathBuf::from) {
        Some(path) => DashboardConfig::load(&path)?,
        None => DashboardConfig::default(),
    };
    config.validate()?;

    // Source data is required up front; any failure ends startup.
    let dataset = loader::load_sources(&config.sources).context("loading mobility reports")?;

    let mut state = AppState::new(config);
    if let Some(path) = state.config.regions_geojson.clone() {
        match geo::load_geojson(&path, &state.config.region_name_property) {
            Ok(shapes) => state.shapes = Some(shapes),
            Err(e) => {
                log::error!("Failed to load regions: {e:#}");
                state.status_message = Some(format!("Error: {e:#}"));
            }
        }
    }
    let status = state.status_message.take();
    state.set_dataset(dataset);
    if status.is_some() {
        state.status_message = status;
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 900.0])
            .with_min_inner_size([800.0, 500.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Mobility Dashboard",
        options,
        Box::new(|_cc| Ok(Box::new(MobilityDashApp::new(state)))),
    )
    .map_err(|e| anyhow::anyhow!("running UI: {e}"))
}
