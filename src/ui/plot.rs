use std::ops::RangeInclusive;

use chrono::{Datelike, NaiveDate};
use eframe::egui::{self, Color32, RichText, Stroke, Ui};
use egui_plot::{Bar, BarChart, GridMark, Legend, Line, Plot, PlotPoints, Points, Polygon};

use mobility_dash::data::aggregate::{DailyPoint, WEEKDAYS, WeekdayAggregate, WeekdayHourPivot};
use mobility_dash::data::cluster::ClusterAssignment;
use mobility_dash::data::model::{Category, MobilityDataset};
use mobility_dash::data::outcome::{EmptyReason, Outcome};
use mobility_dash::geo::RegionJoin;
use mobility_dash::i18n::{Language, Text, weekday_name};

use crate::color::{ColorScale, MISSING, generate_palette};
use crate::state::AppState;

const CHART_HEIGHT: f32 = 260.0;

// ---------------------------------------------------------------------------
// Central panel
// ---------------------------------------------------------------------------

/// Render every chart for the current selection.
pub fn dashboard(ui: &mut Ui, state: &AppState, lang: Language) {
    let Some(dataset) = &state.dataset else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading(Text::NoDataset.get(lang));
        });
        return;
    };
    let Some(views) = &state.views else {
        let message = match &state.range_error {
            Some(_) => format!(
                "⚠ {}: {} > {}",
                Text::InvalidRange.get(lang),
                state.start,
                state.end
            ),
            None => Text::NoData.get(lang).to_string(),
        };
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading(message);
        });
        return;
    };

    egui::ScrollArea::vertical().show(ui, |ui: &mut Ui| {
        let region = state.region.as_deref().unwrap_or("-");
        ui.heading(format!("📊 {} – {region}", Text::AppTitle.get(lang)));
        ui.label(format!(
            "{}: {} – {}",
            Text::DateRange.get(lang),
            state.start,
            state.end
        ));
        if let Outcome::Ready(s) = &views.summary {
            ui.label(format!(
                "{}: n={}, μ={:.1}, min={:.1}, max={:.1}",
                state.field.label(lang),
                s.count,
                s.mean,
                s.min,
                s.max
            ));
        }
        ui.separator();

        ui.columns(2, |cols| {
            trend_chart(&mut cols[0], &views.trends, lang);
            bar_chart(&mut cols[1], &views.bars, lang);
        });
        ui.separator();

        ui.columns(2, |cols| {
            heatmap(&mut cols[0], &views.pivot, lang);
            weekday_chart(&mut cols[1], &views.weekday, lang);
        });

        if let Some(clusters) = &views.clusters {
            ui.separator();
            cluster_chart(ui, dataset, clusters, lang);
        }
        if let Some(map) = &views.map {
            ui.separator();
            region_map(ui, map, lang);
        }

        ui.separator();
        ui.small(Text::DataSource.get(lang));
    });
}

/// Explicit empty state in place of a chart.
fn no_data(ui: &mut Ui, reason: &EmptyReason, lang: Language) {
    ui.group(|ui: &mut Ui| {
        ui.set_min_height(CHART_HEIGHT / 2.0);
        ui.vertical_centered(|ui: &mut Ui| {
            ui.label(RichText::new(Text::NoData.get(lang)).strong());
            ui.label(RichText::new(reason.to_string()).weak());
        });
    });
}

fn day_number(date: NaiveDate) -> f64 {
    date.num_days_from_ce() as f64
}

fn date_axis(mark: GridMark, _range: &RangeInclusive<f64>) -> String {
    NaiveDate::from_num_days_from_ce_opt(mark.value.round() as i32)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Trend lines
// ---------------------------------------------------------------------------

fn trend_chart(ui: &mut Ui, trends: &[(Category, Outcome<Vec<DailyPoint>>)], lang: Language) {
    ui.strong(Text::TrendTitle.get(lang));
    if trends.iter().all(|(_, o)| !o.is_ready()) {
        let reason = trends
            .iter()
            .find_map(|(_, o)| o.empty_reason())
            .cloned()
            .unwrap_or(EmptyReason::NoRows);
        return no_data(ui, &reason, lang);
    }

    let palette = generate_palette(trends.len().max(1));
    Plot::new("trend_plot")
        .height(CHART_HEIGHT)
        .legend(Legend::default())
        .x_axis_formatter(date_axis)
        .y_axis_label(Text::PercentChange.get(lang))
        .show(ui, |plot_ui| {
            for ((field, series), color) in trends.iter().zip(palette) {
                let Outcome::Ready(points) = series else {
                    continue;
                };
                let line: PlotPoints = points
                    .iter()
                    .map(|p| [day_number(p.date), p.value])
                    .collect();
                plot_ui.line(Line::new(line).name(field.label(lang)).color(color).width(1.5));
            }
        });
}

// ---------------------------------------------------------------------------
// Daily bars, coloured by value
// ---------------------------------------------------------------------------

fn bar_chart(
    ui: &mut Ui,
    (field, series): &(Category, Outcome<Vec<DailyPoint>>),
    lang: Language,
) {
    let field = *field;
    ui.strong(format!("{} – {}", field.label(lang), Text::ChangeOverTime.get(lang)));
    let points = match series {
        Outcome::Ready(p) => p,
        Outcome::Empty(reason) => return no_data(ui, reason, lang),
    };

    let scale = ColorScale::spanning(points.iter().map(|p| p.value));
    let bars: Vec<Bar> = points
        .iter()
        .map(|p| {
            Bar::new(day_number(p.date), p.value)
                .width(0.9)
                .fill(scale.color_for(p.value))
                .name(p.date.to_string())
        })
        .collect();

    Plot::new("bar_plot")
        .height(CHART_HEIGHT)
        .x_axis_formatter(date_axis)
        .y_axis_label(Text::PercentChange.get(lang))
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars).name(field.label(lang)));
        });
}

// ---------------------------------------------------------------------------
// Weekday × hour heatmap
// ---------------------------------------------------------------------------

fn heatmap(ui: &mut Ui, pivot: &Outcome<WeekdayHourPivot>, lang: Language) {
    ui.strong(Text::HeatmapTitle.get(lang));
    let pivot = match pivot {
        Outcome::Ready(p) => p,
        Outcome::Empty(reason) => return no_data(ui, reason, lang),
    };

    let scale = ColorScale::spanning(pivot.cells.iter().flatten().flatten().copied());
    let hours = pivot.hours.clone();
    let (lo, hi) = scale.bounds();

    Plot::new("heatmap_plot")
        .height(CHART_HEIGHT)
        .show_grid(false)
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .x_axis_formatter(move |mark, _| {
            let col = mark.value.round();
            if (mark.value - col).abs() > 0.01 || col < 0.0 {
                return String::new();
            }
            hours
                .get(col as usize)
                .map(|h| format!("{h:02}:00"))
                .unwrap_or_default()
        })
        .y_axis_formatter(move |mark, _| {
            let row = mark.value.round();
            if (mark.value - row).abs() > 0.01 || !(0.0..7.0).contains(&row) {
                return String::new();
            }
            weekday_name(WEEKDAYS[6 - row as usize], lang).to_string()
        })
        .show(ui, |plot_ui| {
            for (day, row) in pivot.cells.iter().enumerate() {
                // Monday on top.
                let y = (6 - day) as f64;
                for (col, cell) in row.iter().enumerate() {
                    let x = col as f64;
                    let fill = cell.map_or(MISSING, |v| scale.color_for(v));
                    let name = match cell {
                        Some(v) => format!("{}: {v:.1}", weekday_name(WEEKDAYS[day], lang)),
                        None => weekday_name(WEEKDAYS[day], lang).to_string(),
                    };
                    let rect = PlotPoints::new(vec![
                        [x - 0.5, y - 0.5],
                        [x + 0.5, y - 0.5],
                        [x + 0.5, y + 0.5],
                        [x - 0.5, y + 0.5],
                    ]);
                    plot_ui.polygon(
                        Polygon::new(rect)
                            .fill_color(fill)
                            .stroke(Stroke::new(0.5, Color32::BLACK))
                            .name(name),
                    );
                }
            }
        });
    ui.small(format!("{}: {lo:.1} … {hi:.1}", Text::PercentChange.get(lang)));
}

// ---------------------------------------------------------------------------
// Per-weekday bars
// ---------------------------------------------------------------------------

fn weekday_chart(ui: &mut Ui, weekday: &Outcome<WeekdayAggregate>, lang: Language) {
    ui.strong(Text::WeekdayTitle.get(lang));
    let agg = match weekday {
        Outcome::Ready(a) => a,
        Outcome::Empty(reason) => return no_data(ui, reason, lang),
    };

    let bars: Vec<Bar> = agg
        .buckets
        .iter()
        .enumerate()
        .filter_map(|(i, (day, value))| {
            value.map(|v| Bar::new(i as f64, v).width(0.7).name(weekday_name(*day, lang)))
        })
        .collect();

    Plot::new("weekday_plot")
        .height(CHART_HEIGHT)
        .x_axis_formatter(move |mark, _| {
            let i = mark.value.round();
            if (mark.value - i).abs() > 0.01 || !(0.0..7.0).contains(&i) {
                return String::new();
            }
            weekday_name(WEEKDAYS[i as usize], lang).to_string()
        })
        .y_axis_label(Text::PercentChange.get(lang))
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(
                BarChart::new(bars)
                    .name(agg.field.label(lang))
                    .color(Color32::LIGHT_BLUE),
            );
        });
}

// ---------------------------------------------------------------------------
// Cluster scatter (first two features)
// ---------------------------------------------------------------------------

fn cluster_chart(
    ui: &mut Ui,
    dataset: &MobilityDataset,
    clusters: &Outcome<ClusterAssignment>,
    lang: Language,
) {
    ui.strong(Text::ClusterTitle.get(lang));
    let assignment = match clusters {
        Outcome::Ready(a) => a,
        Outcome::Empty(reason) => return no_data(ui, reason, lang),
    };

    let x_field = assignment.features[0];
    let y_field = assignment.features.get(1).copied().unwrap_or(x_field);
    let palette = generate_palette(assignment.k);

    let mut groups: Vec<Vec<[f64; 2]>> = vec![Vec::new(); assignment.k];
    for (&idx, &label) in &assignment.labels {
        let rec = &dataset.records[idx];
        if let (Some(x), Some(y)) = (rec.value(x_field), rec.value(y_field)) {
            groups[label].push([x, y]);
        }
    }

    Plot::new("cluster_plot")
        .height(CHART_HEIGHT * 1.3)
        .legend(Legend::default())
        .x_axis_label(x_field.label(lang))
        .y_axis_label(y_field.label(lang))
        .show(ui, |plot_ui| {
            for (label, (points, color)) in groups.into_iter().zip(palette).enumerate() {
                let name = format!("{} {label}", Text::Cluster.get(lang));
                plot_ui.points(
                    Points::new(PlotPoints::new(points))
                        .radius(2.5)
                        .color(color)
                        .name(name),
                );
            }
        });
    ui.small(
        assignment
            .sizes()
            .iter()
            .enumerate()
            .map(|(c, n)| format!("{} {c}: {n}", Text::Cluster.get(lang)))
            .collect::<Vec<_>>()
            .join(" · "),
    );
}

// ---------------------------------------------------------------------------
// Choropleth
// ---------------------------------------------------------------------------

fn region_map(ui: &mut Ui, map: &Outcome<RegionJoin>, lang: Language) {
    ui.strong(Text::MapTitle.get(lang));
    let join = match map {
        Outcome::Ready(j) => j,
        Outcome::Empty(reason) => return no_data(ui, reason, lang),
    };

    let (lo, hi) = join.value_range();
    let scale = ColorScale::new(lo, hi);

    Plot::new("region_map")
        .height(CHART_HEIGHT * 1.6)
        .data_aspect(1.0)
        .show_axes(false)
        .show_grid(false)
        .show(ui, |plot_ui| {
            for region in &join.matched {
                let fill = scale.color_for(region.value);
                for ring in &region.rings {
                    plot_ui.polygon(
                        Polygon::new(PlotPoints::new(ring.clone()))
                            .fill_color(fill)
                            .stroke(Stroke::new(0.5, Color32::DARK_GRAY))
                            .name(format!("{}: {:.1}", region.region, region.value)),
                    );
                }
            }
        });
    ui.small(format!(
        "{} ({}): {lo:.1} … {hi:.1}",
        join.field.label(lang),
        Text::PercentChange.get(lang)
    ));
    if !join.unmatched_regions.is_empty() {
        ui.small(RichText::new(join.unmatched_regions.join(", ")).weak());
    }
}
