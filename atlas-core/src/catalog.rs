use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use rand::Rng;

use atlas_types::{Country, CountryId, Ring};

/// The static reference set of countries, loaded once at process start and
/// read-shared for the engine's lifetime.
pub struct CountryCatalog {
    countries: Vec<Country>,
    by_id: HashMap<CountryId, usize>,
}

impl CountryCatalog {
    /// Load the catalog from a GeoJSON FeatureCollection on disk. Features
    /// are expected to carry `WB_A3` and `NAME` properties.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = fs::read_to_string(path.as_ref()).with_context(|| {
            format!("failed to read countries file {}", path.as_ref().display())
        })?;
        Self::from_geojson_str(&raw)
    }

    pub fn from_geojson_str(raw: &str) -> Result<Self> {
        let doc: serde_json::Value =
            serde_json::from_str(raw).context("countries file is not valid JSON")?;
        let features = doc
            .get("features")
            .and_then(|f| f.as_array())
            .ok_or_else(|| anyhow!("countries file is not a GeoJSON FeatureCollection"))?;

        let mut countries = Vec::with_capacity(features.len());
        for feature in features {
            let Some(props) = feature.get("properties") else {
                continue;
            };
            let (Some(id), Some(name)) = (
                props.get("WB_A3").and_then(|v| v.as_str()),
                props.get("NAME").and_then(|v| v.as_str()),
            ) else {
                tracing::warn!("skipping feature without WB_A3/NAME properties");
                continue;
            };
            let shape = parse_shape(feature.get("geometry"));
            if shape.is_empty() {
                tracing::warn!(country = id, "skipping country without usable geometry");
                continue;
            }
            countries.push(Country {
                id: id.to_string(),
                name: name.to_string(),
                shape,
            });
        }

        Self::from_countries(countries)
    }

    pub fn from_countries(countries: Vec<Country>) -> Result<Self> {
        let mut kept: Vec<Country> = Vec::with_capacity(countries.len());
        let mut by_id = HashMap::new();
        for country in countries {
            match by_id.entry(country.id.clone()) {
                Entry::Occupied(_) => {
                    tracing::warn!(country = %country.id, "duplicate country code, keeping the first");
                }
                Entry::Vacant(slot) => {
                    slot.insert(kept.len());
                    kept.push(country);
                }
            }
        }
        if kept.is_empty() {
            bail!("country catalog is empty");
        }
        Ok(Self {
            countries: kept,
            by_id,
        })
    }

    pub fn get(&self, id: &str) -> Option<&Country> {
        self.by_id.get(id).map(|&i| &self.countries[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    /// Uniformly random country, used to pick a room's answer. The catalog
    /// is guaranteed non-empty by construction.
    pub fn random(&self) -> &Country {
        let i = rand::rng().random_range(0..self.countries.len());
        &self.countries[i]
    }

    pub fn len(&self) -> usize {
        self.countries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.countries.is_empty()
    }

    /// Small fixed catalog with simplified shapes for predictable testing.
    pub fn with_test_countries() -> Self {
        let countries = vec![
            test_country("FRA", "France", 2.2, 46.6),
            test_country("DEU", "Germany", 10.4, 51.1),
            test_country("ESP", "Spain", -3.7, 40.2),
            test_country("EGY", "Egypt", 30.0, 26.8),
            test_country("JPN", "Japan", 138.2, 36.2),
            test_country("BRA", "Brazil", -53.1, -10.8),
            test_country("AUS", "Australia", 134.5, -25.7),
            test_country("CAN", "Canada", -106.3, 56.1),
        ];
        Self::from_countries(countries).expect("test catalog is non-empty")
    }
}

fn test_country(id: &str, name: &str, lon: f64, lat: f64) -> Country {
    Country {
        id: id.to_string(),
        name: name.to_string(),
        shape: vec![vec![
            [lon - 1.0, lat - 1.0],
            [lon + 1.0, lat - 1.0],
            [lon + 1.0, lat + 1.0],
            [lon - 1.0, lat + 1.0],
        ]],
    }
}

fn parse_shape(geometry: Option<&serde_json::Value>) -> Vec<Ring> {
    let Some(geometry) = geometry else {
        return Vec::new();
    };
    let kind = geometry
        .get("type")
        .and_then(|t| t.as_str())
        .unwrap_or_default();
    let Some(coords) = geometry.get("coordinates") else {
        return Vec::new();
    };
    match kind {
        "Polygon" => rings_from(coords),
        "MultiPolygon" => coords
            .as_array()
            .map(|polygons| polygons.iter().flat_map(rings_from).collect())
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

fn rings_from(coords: &serde_json::Value) -> Vec<Ring> {
    let Some(rings) = coords.as_array() else {
        return Vec::new();
    };
    rings
        .iter()
        .filter_map(|ring| {
            let points: Ring = ring
                .as_array()?
                .iter()
                .filter_map(|point| {
                    let point = point.as_array()?;
                    Some([point.first()?.as_f64()?, point.get(1)?.as_f64()?])
                })
                .collect();
            (!points.is_empty()).then_some(points)
        })
        .collect()
}
