use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use arrow::array::{Array, AsArray, Float64Array, StringArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Float64Type};
use arrow::record_batch::RecordBatch;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde::Deserialize;

use super::model::{Category, MobilityDataset, MobilityRecord};

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// Where one yearly table comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Path(PathBuf),
    Url(String),
}

impl Source {
    /// `http://` and `https://` strings are URLs, anything else is a path.
    pub fn parse(s: &str) -> Self {
        let trimmed = s.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            Source::Url(trimmed.to_string())
        } else {
            Source::Path(PathBuf::from(trimmed))
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Path(p) => write!(f, "{}", p.display()),
            Source::Url(u) => f.write_str(u),
        }
    }
}

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load every source and concatenate them in the given order.
///
/// Any failure (network, I/O, unparseable date) aborts the whole load.
pub fn load_sources<S: AsRef<str>>(sources: &[S]) -> Result<MobilityDataset> {
    let mut parts = Vec::with_capacity(sources.len());
    for raw in sources {
        let source = Source::parse(raw.as_ref());
        let part = load_source(&source).with_context(|| format!("loading {source}"))?;
        log::info!("Loaded {} rows from {source}", part.len());
        parts.push(part);
    }
    let dataset = MobilityDataset::concat(parts);
    log::info!(
        "Combined dataset: {} rows, {} regions, years {:?}",
        dataset.len(),
        dataset.regions.len(),
        dataset.years
    );
    Ok(dataset)
}

pub fn load_source(source: &Source) -> Result<MobilityDataset> {
    match source {
        Source::Path(path) => load_file(path),
        Source::Url(url) => load_url(url),
    }
}

/// Load a mobility table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – the published report layout (one row per place and day)
/// * `.json`    – `[{ "date": "...", "sub_region_1": "...", ... }, ...]`
/// * `.parquet` – same column names; any type Arrow can cast to text/float
pub fn load_file(path: &Path) -> Result<MobilityDataset> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "csv" => {
            let file = std::fs::File::open(path).context("opening CSV")?;
            read_csv(file)
        }
        "json" => {
            let text = std::fs::read_to_string(path).context("reading JSON file")?;
            read_json(&text)
        }
        "parquet" | "pq" => load_parquet(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
}

#[cfg(feature = "remote")]
fn load_url(url: &str) -> Result<MobilityDataset> {
    let response = reqwest::blocking::get(url).with_context(|| format!("GET {url}"))?;
    let response = response
        .error_for_status()
        .with_context(|| format!("GET {url}"))?;
    let body = response.text().context("reading response body")?;

    if url.to_ascii_lowercase().ends_with(".json") {
        read_json(&body)
    } else {
        read_csv(body.as_bytes())
    }
}

#[cfg(not(feature = "remote"))]
fn load_url(url: &str) -> Result<MobilityDataset> {
    bail!("cannot fetch {url}: built without the `remote` feature")
}

// ---------------------------------------------------------------------------
// Row normalization (shared by CSV and JSON)
// ---------------------------------------------------------------------------

/// A row as published. Unknown columns (`place_id`, `metro_area`, ...) are
/// ignored; non-numeric percent cells become missing.
#[derive(Debug, Deserialize)]
struct RawRecord {
    country_region_code: Option<String>,
    country_region: Option<String>,
    sub_region_1: Option<String>,
    sub_region_2: Option<String>,
    iso_3166_2_code: Option<String>,
    date: String,
    #[serde(
        rename = "retail_and_recreation_percent_change_from_baseline",
        default,
        deserialize_with = "csv::invalid_option"
    )]
    retail_and_recreation: Option<f64>,
    #[serde(
        rename = "grocery_and_pharmacy_percent_change_from_baseline",
        default,
        deserialize_with = "csv::invalid_option"
    )]
    grocery_and_pharmacy: Option<f64>,
    #[serde(
        rename = "parks_percent_change_from_baseline",
        default,
        deserialize_with = "csv::invalid_option"
    )]
    parks: Option<f64>,
    #[serde(
        rename = "transit_stations_percent_change_from_baseline",
        default,
        deserialize_with = "csv::invalid_option"
    )]
    transit_stations: Option<f64>,
    #[serde(
        rename = "workplaces_percent_change_from_baseline",
        default,
        deserialize_with = "csv::invalid_option"
    )]
    workplaces: Option<f64>,
    #[serde(
        rename = "residential_percent_change_from_baseline",
        default,
        deserialize_with = "csv::invalid_option"
    )]
    residential: Option<f64>,
}

impl RawRecord {
    fn normalize(self) -> Result<MobilityRecord> {
        Ok(MobilityRecord {
            country_region_code: non_empty(self.country_region_code),
            country_region: non_empty(self.country_region),
            sub_region_1: non_empty(self.sub_region_1),
            sub_region_2: non_empty(self.sub_region_2),
            iso_3166_2_code: non_empty(self.iso_3166_2_code),
            timestamp: parse_timestamp(&self.date)?,
            values: [
                self.retail_and_recreation,
                self.grocery_and_pharmacy,
                self.parks,
                self.transit_stations,
                self.workplaces,
                self.residential,
            ]
            .map(|v| v.filter(|x| x.is_finite())),
        })
    }
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.filter(|v| !v.trim().is_empty())
}

/// Parse the report's date column. Plain dates land on midnight.
pub fn parse_timestamp(s: &str) -> Result<NaiveDateTime> {
    let s = s.trim();
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(d.and_time(NaiveTime::default()));
    }
    for fmt in [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
    ] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(ts);
        }
    }
    bail!("'{s}' is not a valid date")
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: the header row of the published report.
pub fn read_csv<R: Read>(reader: R) -> Result<MobilityDataset> {
    let mut reader = csv::Reader::from_reader(reader);
    let headers = reader.headers().context("reading CSV headers")?.clone();
    if !headers.iter().any(|h| h == "date") {
        bail!("CSV missing 'date' column");
    }

    // Errors name the 1-based file line, header included.
    let mut records = Vec::new();
    for result in reader.records() {
        let row = result.context("reading CSV record")?;
        let line = row.position().map_or(0, |p| p.line());
        let raw: RawRecord = row
            .deserialize(Some(&headers))
            .with_context(|| format!("CSV line {line}"))?;
        let record = raw.normalize().with_context(|| format!("CSV line {line}"))?;
        records.push(record);
    }

    Ok(MobilityDataset::from_records(records))
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Records-oriented JSON (`df.to_json(orient='records')`).
pub fn read_json(text: &str) -> Result<MobilityDataset> {
    let rows: Vec<RawRecord> = serde_json::from_str(text).context("parsing JSON")?;
    let records = rows
        .into_iter()
        .enumerate()
        .map(|(i, raw)| raw.normalize().with_context(|| format!("JSON record {}", i + 1)))
        .collect::<Result<Vec<_>>>()?;
    Ok(MobilityDataset::from_records(records))
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file with the report's column names.
///
/// `date` may be text, Date32/Date64 or a timestamp; region columns anything
/// castable to Utf8; percent columns anything castable to Float64.
fn load_parquet(path: &Path) -> Result<MobilityDataset> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut records = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;

        let dates = text_column(&batch, "date")?.context("Parquet file missing 'date' column")?;
        let code = text_column(&batch, "country_region_code")?;
        let country = text_column(&batch, "country_region")?;
        let sub1 = text_column(&batch, "sub_region_1")?;
        let sub2 = text_column(&batch, "sub_region_2")?;
        let iso = text_column(&batch, "iso_3166_2_code")?;
        let values = Category::ALL
            .iter()
            .map(|c| float_column(&batch, c.column()))
            .collect::<Result<Vec<_>>>()?;

        for row in 0..batch.num_rows() {
            let row_no = records.len() + 1;
            let date = cell_text(Some(&dates), row)
                .with_context(|| format!("Parquet row {row_no}: null 'date'"))?;
            let timestamp =
                parse_timestamp(&date).with_context(|| format!("Parquet row {row_no}"))?;

            let mut cells = [None; 6];
            for (slot, col) in cells.iter_mut().zip(&values) {
                *slot = col
                    .as_ref()
                    .filter(|arr| !arr.is_null(row))
                    .map(|arr| arr.value(row))
                    .filter(|v| !v.is_nan());
            }

            records.push(MobilityRecord {
                country_region_code: cell_text(code.as_ref(), row),
                country_region: cell_text(country.as_ref(), row),
                sub_region_1: cell_text(sub1.as_ref(), row),
                sub_region_2: cell_text(sub2.as_ref(), row),
                iso_3166_2_code: cell_text(iso.as_ref(), row),
                timestamp,
                values: cells,
            });
        }
    }

    Ok(MobilityDataset::from_records(records))
}

// -- Arrow helpers --

fn text_column(batch: &RecordBatch, name: &str) -> Result<Option<StringArray>> {
    let Some(col) = batch.column_by_name(name) else {
        return Ok(None);
    };
    let casted = cast(col, &DataType::Utf8).with_context(|| format!("casting '{name}' to text"))?;
    Ok(Some(casted.as_string::<i32>().clone()))
}

fn float_column(batch: &RecordBatch, name: &str) -> Result<Option<Float64Array>> {
    let Some(col) = batch.column_by_name(name) else {
        return Ok(None);
    };
    let casted =
        cast(col, &DataType::Float64).with_context(|| format!("casting '{name}' to float"))?;
    Ok(Some(casted.as_primitive::<Float64Type>().clone()))
}

fn cell_text(col: Option<&StringArray>, row: usize) -> Option<String> {
    col.filter(|arr| !arr.is_null(row))
        .map(|arr| arr.value(row).trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const HEADER: &str = "country_region_code,country_region,sub_region_1,sub_region_2,metro_area,iso_3166_2_code,census_fips_code,place_id,date,retail_and_recreation_percent_change_from_baseline,grocery_and_pharmacy_percent_change_from_baseline,parks_percent_change_from_baseline,transit_stations_percent_change_from_baseline,workplaces_percent_change_from_baseline,residential_percent_change_from_baseline";

    #[test]
    fn csv_rows_normalize_missing_cells() {
        let text = format!(
            "{HEADER}\n\
             ID,Indonesia,,,,,,ChIJ,2020-02-15,1,2,3,4,5,6\n\
             ID,Indonesia,Bali,,,ID-BA,,ChIJ,2020-02-16,-10.5,,n/a,4,5,6\n"
        );
        let ds = read_csv(text.as_bytes()).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.records[0].sub_region_1, None);
        let bali = &ds.records[1];
        assert_eq!(bali.region(), Some("Bali"));
        assert_eq!(bali.value(Category::RetailAndRecreation), Some(-10.5));
        assert_eq!(bali.value(Category::GroceryAndPharmacy), None);
        assert_eq!(bali.value(Category::Parks), None);
        assert_eq!(bali.value(Category::Residential), Some(6.0));
        assert_eq!(ds.regions.len(), 1);
    }

    #[test]
    fn bad_date_is_fatal_and_names_the_row() {
        let text = format!(
            "{HEADER}\n\
             ID,Indonesia,Bali,,,,,,2020-02-15,1,2,3,4,5,6\n\
             ID,Indonesia,Bali,,,,,,15/02/2020,1,2,3,4,5,6\n"
        );
        let err = read_csv(text.as_bytes()).unwrap_err();
        let msg = format!("{err:#}");
        // Header is line 1, the bad record sits on line 3.
        assert!(msg.contains("CSV line 3"), "{msg}");
        assert!(msg.contains("15/02/2020"), "{msg}");
    }

    #[test]
    fn csv_without_date_column_is_rejected() {
        let err = read_csv("sub_region_1,parks\nBali,3\n".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("date"));
    }

    #[test]
    fn timestamps_accept_date_and_datetime_forms() {
        assert_eq!(parse_timestamp("2021-06-01").unwrap().to_string(), "2021-06-01 00:00:00");
        assert_eq!(
            parse_timestamp(" 2021-06-01T13:30:00 ").unwrap().to_string(),
            "2021-06-01 13:30:00"
        );
        assert!(parse_timestamp("June 1st").is_err());
    }

    #[test]
    fn json_records_load() {
        let text = r#"[
            {"sub_region_1": "Aceh", "date": "2022-01-03",
             "parks_percent_change_from_baseline": 12.0,
             "residential_percent_change_from_baseline": null}
        ]"#;
        let ds = read_json(text).unwrap();
        assert_eq!(ds.records[0].value(Category::Parks), Some(12.0));
        assert_eq!(ds.records[0].value(Category::Residential), None);
        assert_eq!(ds.years.iter().copied().collect::<Vec<_>>(), [2022]);
    }

    #[test]
    fn load_sources_concatenates_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut paths = Vec::new();
        for (year, region) in [(2021, "Bali"), (2020, "Aceh")] {
            let path = dir.path().join(format!("{year}.csv"));
            let mut f = std::fs::File::create(&path).unwrap();
            writeln!(f, "{HEADER}").unwrap();
            writeln!(f, "ID,Indonesia,{region},,,,,,{year}-03-01,1,2,3,4,5,6").unwrap();
            paths.push(path.to_string_lossy().into_owned());
        }
        let ds = load_sources(&paths).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.records[0].region(), Some("Bali"));
        assert_eq!(ds.records[1].region(), Some("Aceh"));
    }

    #[test]
    fn unsupported_extension_fails() {
        let err = load_file(Path::new("report.xlsx")).unwrap_err();
        assert!(err.to_string().contains(".xlsx"));
    }

    #[test]
    fn source_parse_distinguishes_urls() {
        assert_eq!(
            Source::parse("https://example.org/a.csv"),
            Source::Url("https://example.org/a.csv".into())
        );
        assert_eq!(Source::parse("data/a.csv"), Source::Path(PathBuf::from("data/a.csv")));
    }
}
