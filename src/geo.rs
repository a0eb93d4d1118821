//! Region polygons and the join that feeds the choropleth.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::data::aggregate::RegionAggregate;
use crate::data::model::Category;
use crate::data::outcome::{EmptyReason, Outcome};

/// One region outline: exterior rings of each polygon part, `[lon, lat]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionShape {
    pub name: String,
    pub key: String,
    pub rings: Vec<Vec<[f64; 2]>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ShapeSet {
    pub shapes: Vec<RegionShape>,
}

impl ShapeSet {
    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }
}

/// Join key: trimmed, inner whitespace collapsed, case-folded.
pub fn normalize_key(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

// ---------------------------------------------------------------------------
// GeoJSON reader
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct FeatureCollection {
    features: Vec<Feature>,
}

#[derive(Deserialize)]
struct Feature {
    #[serde(default)]
    properties: Option<Map<String, JsonValue>>,
    #[serde(default)]
    geometry: Option<Geometry>,
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum Geometry {
    Polygon { coordinates: Vec<Vec<Vec<f64>>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Vec<f64>>>> },
    #[serde(other)]
    Unsupported,
}

fn ring(positions: &[Vec<f64>]) -> Result<Vec<[f64; 2]>> {
    positions
        .iter()
        .map(|p| match p.as_slice() {
            [x, y, ..] => Ok([*x, *y]),
            _ => bail!("position with fewer than 2 coordinates"),
        })
        .collect()
}

pub fn load_geojson(path: &Path, name_property: &str) -> Result<ShapeSet> {
    let text = std::fs::read_to_string(path).context("reading GeoJSON file")?;
    let shapes = parse_geojson(&text, name_property)?;
    log::info!("Loaded {} region shapes from {}", shapes.len(), path.display());
    Ok(shapes)
}

/// Read a FeatureCollection of Polygon / MultiPolygon features, naming each
/// shape from `name_property`. Holes are dropped; features without a name or
/// with another geometry type are skipped.
pub fn parse_geojson(text: &str, name_property: &str) -> Result<ShapeSet> {
    let collection: FeatureCollection =
        serde_json::from_str(text).context("parsing GeoJSON FeatureCollection")?;

    let mut shapes = Vec::with_capacity(collection.features.len());
    for (i, feature) in collection.features.into_iter().enumerate() {
        let name = feature
            .properties
            .as_ref()
            .and_then(|p| p.get(name_property))
            .and_then(|v| match v {
                JsonValue::String(s) => Some(s.clone()),
                JsonValue::Null => None,
                other => Some(other.to_string()),
            });
        let Some(name) = name else {
            log::warn!("Feature {i} has no '{name_property}' property, skipped");
            continue;
        };

        let rings = match feature.geometry {
            Some(Geometry::Polygon { coordinates }) => coordinates
                .first()
                .map(|exterior| ring(exterior))
                .transpose()
                .with_context(|| format!("feature {i} ({name})"))?
                .into_iter()
                .collect(),
            Some(Geometry::MultiPolygon { coordinates }) => coordinates
                .iter()
                .filter_map(|poly| poly.first())
                .map(|exterior| ring(exterior))
                .collect::<Result<Vec<_>>>()
                .with_context(|| format!("feature {i} ({name})"))?,
            Some(Geometry::Unsupported) | None => {
                log::warn!("Feature {i} ({name}) is not a polygon, skipped");
                continue;
            }
        };

        shapes.push(RegionShape {
            key: normalize_key(&name),
            name,
            rings,
        });
    }

    Ok(ShapeSet { shapes })
}

// ---------------------------------------------------------------------------
// Join
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JoinedRegion {
    /// Name as spelled in the polygon dataset.
    pub shape_name: String,
    /// Name as spelled in the mobility data.
    pub region: String,
    pub value: f64,
    pub rings: Vec<Vec<[f64; 2]>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionJoin {
    pub field: Category,
    pub matched: Vec<JoinedRegion>,
    /// Data regions with no polygon.
    pub unmatched_regions: Vec<String>,
}

impl RegionJoin {
    /// Value range over matched regions, for the colour scale.
    pub fn value_range(&self) -> (f64, f64) {
        self.matched.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), r| {
            (lo.min(r.value), hi.max(r.value))
        })
    }
}

/// Match per-region values to shapes by normalized name.
///
/// `aliases` maps a data-side name to a shape-side name (both normalized
/// before use). Zero matches is reported, never returned as an empty map.
pub fn join_regions(
    aggregate: &RegionAggregate,
    shapes: &ShapeSet,
    aliases: &BTreeMap<String, String>,
) -> Outcome<RegionJoin> {
    if shapes.is_empty() {
        return Outcome::Empty(EmptyReason::NoShapes);
    }

    let aliases: BTreeMap<String, String> = aliases
        .iter()
        .map(|(from, to)| (normalize_key(from), normalize_key(to)))
        .collect();

    // First region (in name order) to claim a key wins; later ones are
    // reported as unmatched.
    let mut by_key: BTreeMap<String, (&String, f64)> = BTreeMap::new();
    let mut collided: Vec<String> = Vec::new();
    for (region, value) in &aggregate.values {
        let key = normalize_key(region);
        let key = aliases.get(&key).cloned().unwrap_or(key);
        match by_key.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert((region, *value));
            }
            Entry::Occupied(slot) => {
                log::warn!(
                    "Regions '{}' and '{region}' both map to '{}'; keeping '{}'",
                    slot.get().0,
                    slot.key(),
                    slot.get().0
                );
                collided.push(region.clone());
            }
        }
    }

    let mut matched = Vec::new();
    let mut used = BTreeSet::new();
    for shape in &shapes.shapes {
        if let Some((region, value)) = by_key.get(&shape.key) {
            used.insert(shape.key.clone());
            matched.push(JoinedRegion {
                shape_name: shape.name.clone(),
                region: (*region).clone(),
                value: *value,
                rings: shape.rings.clone(),
            });
        }
    }

    let mut unmatched_regions: Vec<String> = by_key
        .iter()
        .filter(|(k, _)| !used.contains(*k))
        .map(|(_, (region, _))| (*region).clone())
        .chain(collided)
        .collect();
    unmatched_regions.sort();

    if matched.is_empty() {
        log::warn!(
            "Region join matched nothing ({} data regions, {} shapes)",
            aggregate.values.len(),
            shapes.len()
        );
        return Outcome::Empty(EmptyReason::NoMatchingRegions);
    }
    if !unmatched_regions.is_empty() {
        log::debug!("Regions without a polygon: {unmatched_regions:?}");
    }

    Outcome::Ready(RegionJoin {
        field: aggregate.field,
        matched,
        unmatched_regions,
    })
}
