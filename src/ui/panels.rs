use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use egui_extras::DatePickerButton;

use mobility_dash::data::aggregate::Aggregation;
use mobility_dash::data::model::Category;
use mobility_dash::i18n::{Language, Text};

use crate::state::AppState;

// ---------------------------------------------------------------------------
// Left side panel – filter widgets
// ---------------------------------------------------------------------------

/// Render the left filter panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState, lang: Language) {
    ui.heading(Text::Filters.get(lang));
    ui.separator();

    let Some(dataset) = &state.dataset else {
        ui.label(Text::NoDataset.get(lang));
        return;
    };

    // Clone what we need so we can mutate state inside the closures.
    let regions: Vec<String> = dataset.regions.iter().cloned().collect();
    let years: Vec<i32> = dataset.years.iter().copied().collect();
    let mut changed = false;

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            // ---- Date range ----
            ui.strong(Text::DateRange.get(lang));
            egui::Grid::new("date_range").num_columns(2).show(ui, |ui: &mut Ui| {
                ui.label(Text::From.get(lang));
                changed |= ui
                    .add(DatePickerButton::new(&mut state.start).id_salt("start_date"))
                    .changed();
                ui.end_row();
                ui.label(Text::To.get(lang));
                changed |= ui
                    .add(DatePickerButton::new(&mut state.end).id_salt("end_date"))
                    .changed();
                ui.end_row();
            });
            ui.separator();

            // ---- Region (observed values only) ----
            ui.strong(Text::Region.get(lang));
            let current = state.region.clone().unwrap_or_default();
            egui::ComboBox::from_id_salt("region")
                .selected_text(&current)
                .width(ui.available_width())
                .show_ui(ui, |ui: &mut Ui| {
                    for region in &regions {
                        if ui.selectable_label(current == *region, region).clicked() {
                            state.region = Some(region.clone());
                            changed = true;
                        }
                    }
                });
            ui.separator();

            // ---- Year ----
            ui.strong(Text::Year.get(lang));
            let year_text = state
                .year
                .map_or_else(|| Text::AllYears.get(lang).to_string(), |y| y.to_string());
            egui::ComboBox::from_id_salt("year")
                .selected_text(year_text)
                .show_ui(ui, |ui: &mut Ui| {
                    changed |= ui
                        .selectable_value(&mut state.year, None, Text::AllYears.get(lang))
                        .changed();
                    for y in &years {
                        changed |= ui
                            .selectable_value(&mut state.year, Some(*y), y.to_string())
                            .changed();
                    }
                });
            ui.separator();

            // ---- Field + aggregation ----
            ui.strong(Text::Field.get(lang));
            egui::ComboBox::from_id_salt("field")
                .selected_text(state.field.label(lang))
                .show_ui(ui, |ui: &mut Ui| {
                    for c in Category::ALL {
                        changed |= ui.selectable_value(&mut state.field, c, c.label(lang)).changed();
                    }
                });
            ui.strong(Text::Aggregation.get(lang));
            egui::ComboBox::from_id_salt("aggregation")
                .selected_text(state.aggregation.label(lang))
                .show_ui(ui, |ui: &mut Ui| {
                    for a in Aggregation::ALL {
                        changed |= ui
                            .selectable_value(&mut state.aggregation, a, a.label(lang))
                            .changed();
                    }
                });
            ui.separator();

            // ---- Clustering ----
            ui.strong(Text::Clustering.get(lang));
            changed |= ui
                .checkbox(&mut state.clustering, Text::EnableClustering.get(lang))
                .changed();
        });

    if changed {
        state.refresh();
    }
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState, lang: Language) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button(Text::File.get(lang), |ui: &mut Ui| {
            if ui.button(Text::OpenSources.get(lang)).clicked() {
                open_sources_dialog(state);
                ui.close_menu();
            }
            if ui.button(Text::OpenRegions.get(lang)).clicked() {
                open_regions_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(ds) = &state.dataset {
            let visible = state.views.as_ref().map_or(0, |v| v.regional_rows);
            ui.label(format!(
                "{} {}, {visible} {}",
                ds.len(),
                Text::RowsLoaded.get(lang),
                Text::RowsVisible.get(lang)
            ));
        }

        ui.separator();

        let next = lang.toggled();
        if ui
            .button(format!("{} → {}", lang.code().to_uppercase(), next.code().to_uppercase()))
            .clicked()
        {
            state.language = next;
        }

        if let Some(msg) = &state.status_message {
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_sources_dialog(state: &mut AppState) {
    let files = rfd::FileDialog::new()
        .set_title("Open mobility reports")
        .add_filter("Supported files", &["csv", "json", "parquet", "pq"])
        .add_filter("CSV", &["csv"])
        .add_filter("JSON", &["json"])
        .add_filter("Parquet", &["parquet", "pq"])
        .pick_files();

    let Some(mut paths) = files else {
        return;
    };
    // Yearly files sort chronologically by name.
    paths.sort();
    let sources: Vec<String> = paths
        .iter()
        .map(|p| p.to_string_lossy().into_owned())
        .collect();

    match mobility_dash::data::loader::load_sources(&sources) {
        Ok(dataset) => {
            state.config.sources = sources;
            state.set_dataset(dataset);
        }
        Err(e) => {
            log::error!("Failed to load reports: {e:#}");
            state.status_message = Some(format!("Error: {e:#}"));
        }
    }
}

pub fn open_regions_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open region polygons")
        .add_filter("GeoJSON", &["geojson", "json"])
        .pick_file();

    let Some(path) = file else {
        return;
    };
    match mobility_dash::geo::load_geojson(&path, &state.config.region_name_property) {
        Ok(shapes) => {
            state.config.regions_geojson = Some(path);
            state.set_shapes(shapes);
        }
        Err(e) => {
            log::error!("Failed to load regions: {e:#}");
            state.status_message = Some(format!("Error: {e:#}"));
        }
    }
}
