use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde_json::json;

use mobility_dash::data::model::Category;

/// (report name, bounding box lon_min, lat_min, lon_max, lat_max, urban factor)
const PROVINCES: [(&str, [f64; 4], f64); 6] = [
    ("Jakarta", [106.68, -6.37, 106.97, -6.08], 1.0),
    ("Banten", [105.10, -7.02, 106.68, -5.80], 0.7),
    ("West Java", [106.37, -7.82, 108.83, -5.92], 0.6),
    ("Central Java", [108.55, -8.21, 111.69, -6.40], 0.5),
    ("Special Region of Yogyakarta", [110.00, -8.20, 110.84, -7.54], 0.55),
    ("Bali", [114.43, -8.85, 115.71, -8.06], 0.65),
];

const HEADER: [&str; 15] = [
    "country_region_code",
    "country_region",
    "sub_region_1",
    "sub_region_2",
    "metro_area",
    "iso_3166_2_code",
    "census_fips_code",
    "place_id",
    "date",
    "retail_and_recreation_percent_change_from_baseline",
    "grocery_and_pharmacy_percent_change_from_baseline",
    "parks_percent_change_from_baseline",
    "transit_stations_percent_change_from_baseline",
    "workplaces_percent_change_from_baseline",
    "residential_percent_change_from_baseline",
];

/// Restriction strength in [0, 1]: sharp in spring 2020 and mid 2021,
/// easing through 2022.
fn restriction(date: NaiveDate) -> f64 {
    let t = (date - NaiveDate::from_ymd_opt(2020, 2, 15).unwrap_or_default()).num_days() as f64;
    let first_wave = (-(t - 70.0).powi(2) / (2.0 * 60.0f64.powi(2))).exp();
    let delta_wave = (-(t - 520.0).powi(2) / (2.0 * 30.0f64.powi(2))).exp();
    let background = (1.0 - t / 980.0).clamp(0.0, 1.0) * 0.35;
    (first_wave + 0.8 * delta_wave + background).min(1.0)
}

fn day_values(
    date: NaiveDate,
    urban: f64,
    noise: &Normal<f64>,
    rng: &mut StdRng,
) -> [Option<f64>; 6] {
    let r = restriction(date) * urban;
    let weekend = date.weekday().num_days_from_monday() >= 5;
    let base = |category: Category| -> f64 {
        match category {
            Category::RetailAndRecreation => -45.0 * r + if weekend { 4.0 } else { 0.0 },
            Category::GroceryAndPharmacy => -25.0 * r + 3.0,
            Category::Parks => -55.0 * r + if weekend { 10.0 } else { -2.0 },
            Category::TransitStations => -60.0 * r,
            Category::Workplaces => -40.0 * r + if weekend { 8.0 } else { -5.0 },
            Category::Residential => 18.0 * r + if weekend { -2.0 } else { 3.0 },
        }
    };

    let mut values = [None; 6];
    for category in Category::ALL {
        // Sparse provinces publish fewer park readings.
        if category == Category::Parks && rng.gen_bool(0.04) {
            continue;
        }
        let v = base(category) + noise.sample(rng);
        values[category.index()] = Some(v.round());
    }
    values
}

fn fmt_value(v: Option<f64>) -> String {
    v.map(|x| format!("{x}")).unwrap_or_default()
}

fn write_year(
    dir: &Path,
    year: i32,
    noise: &Normal<f64>,
    rng: &mut StdRng,
) -> Result<(PathBuf, usize)> {
    let (first, last) = match year {
        2020 => ((2, 15), (12, 31)),
        2022 => ((1, 1), (10, 15)),
        _ => ((1, 1), (12, 31)),
    };
    let start = NaiveDate::from_ymd_opt(year, first.0, first.1).context("start date")?;
    let end = NaiveDate::from_ymd_opt(year, last.0, last.1).context("end date")?;

    let path = dir.join(format!("{year}_ID_Region_Mobility_Report.csv"));
    let mut writer = csv::Writer::from_path(&path)
        .with_context(|| format!("creating {}", path.display()))?;
    writer.write_record(HEADER)?;

    let mut rows = 0;
    for date in start.iter_days().take_while(|d| *d <= end) {
        // National row first, then provinces, as in the published files.
        let national = day_values(date, 0.6, noise, rng);
        let mut places: Vec<(&str, String, [Option<f64>; 6])> =
            vec![("", String::new(), national)];
        for (i, (name, _, urban)) in PROVINCES.iter().enumerate() {
            places.push((*name, format!("ID-P{i:02}"), day_values(date, *urban, noise, rng)));
        }

        for (name, iso, values) in places {
            let mut record = vec![
                "ID".to_string(),
                "Indonesia".to_string(),
                name.to_string(),
                String::new(),
                String::new(),
                iso,
                String::new(),
                format!("place-{}", if name.is_empty() { "id" } else { name }),
                date.format("%Y-%m-%d").to_string(),
            ];
            record.extend(values.iter().map(|v| fmt_value(*v)));
            writer.write_record(&record)?;
            rows += 1;
        }
    }
    writer.flush()?;
    Ok((path, rows))
}

fn write_regions(dir: &Path) -> Result<PathBuf> {
    let features: Vec<_> = PROVINCES
        .iter()
        .map(|(name, [x0, y0, x1, y1], _)| {
            json!({
                "type": "Feature",
                // Upper-case on purpose: the join is case-insensitive.
                "properties": { "name": name.to_uppercase() },
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[x0, y0], [x1, y0], [x1, y1], [x0, y1], [x0, y0]]]
                }
            })
        })
        .collect();
    let collection = json!({ "type": "FeatureCollection", "features": features });

    let path = dir.join("regions.geojson");
    let text = serde_json::to_string_pretty(&collection)?;
    std::fs::write(&path, text).with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}

fn main() -> Result<()> {
    env_logger::init();

    let dir = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("sample_data"));
    std::fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;

    let mut rng = StdRng::seed_from_u64(42);
    let noise = Normal::new(0.0, 3.0).context("noise distribution")?;
    let mut sources = Vec::new();
    for year in [2020, 2021, 2022] {
        let (path, rows) = write_year(&dir, year, &noise, &mut rng)?;
        log::info!("Wrote {rows} rows to {}", path.display());
        sources.push(path.to_string_lossy().into_owned());
    }
    let regions = write_regions(&dir)?;

    let config = json!({
        "sources": sources,
        "regions_geojson": regions,
        "language": "en"
    });
    let config_path = dir.join("config.json");
    std::fs::write(&config_path, serde_json::to_string_pretty(&config)?)
        .with_context(|| format!("writing {}", config_path.display()))?;

    println!(
        "Wrote sample reports, {} and {} (run: mobility-dash {})",
        regions.display(),
        config_path.display(),
        config_path.display()
    );
    Ok(())
}
