//! Static GeoJSON datasets.
//!
//! Loading never fails: any missing, unreadable or malformed file degrades to
//! an empty feature collection and a warning in the log.

use anyhow::{Context, Result};
use geojson::{Feature, FeatureCollection, GeoJson};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// The three static inputs shown on the map
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dataset {
    Trees,
    Structures,
    HeatZones,
}

impl Dataset {
    /// File names tried in order; the first one present is used
    pub fn candidates(self) -> &'static [&'static str] {
        match self {
            Dataset::Trees => &["shade_existing.geojson", "trees.geojson"],
            Dataset::Structures => &["shade_structures.geojson", "structures.geojson"],
            Dataset::HeatZones => &["heatzones.geojson"],
        }
    }

    /// Resolve the dataset to a path in `data_dir`.
    /// Falls back to the first candidate so a missing file is reported by name.
    pub fn resolve(self, data_dir: &Path) -> PathBuf {
        let candidates = self.candidates();
        candidates
            .iter()
            .map(|name| data_dir.join(name))
            .find(|path| path.exists())
            .unwrap_or_else(|| data_dir.join(candidates[0]))
    }
}

/// All loaded datasets
#[derive(Clone, Debug)]
pub struct Datasets {
    pub trees: FeatureCollection,
    pub structures: FeatureCollection,
    pub heat_zones: FeatureCollection,
}

impl Default for Datasets {
    fn default() -> Self {
        Self {
            trees: empty_collection(),
            structures: empty_collection(),
            heat_zones: empty_collection(),
        }
    }
}

pub fn empty_collection() -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features: Vec::new(),
        foreign_members: None,
    }
}

/// Load a feature collection; never errors.
pub fn load(path: &Path) -> FeatureCollection {
    match try_load(path) {
        Ok(fc) => {
            debug!(path = %path.display(), features = fc.features.len(), "loaded dataset");
            fc
        }
        Err(e) => {
            warn!(path = %path.display(), error = %format!("{e:#}"), "could not load dataset, using empty collection");
            empty_collection()
        }
    }
}

fn try_load(path: &Path) -> Result<FeatureCollection> {
    let mut bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let geojson: GeoJson = simd_json::serde::from_slice(&mut bytes)
        .with_context(|| format!("parsing {}", path.display()))?;
    Ok(into_collection(geojson))
}

/// Wrap a single feature or bare geometry into a collection
fn into_collection(geojson: GeoJson) -> FeatureCollection {
    match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        GeoJson::Feature(feature) => FeatureCollection {
            bbox: None,
            features: vec![feature],
            foreign_members: None,
        },
        GeoJson::Geometry(geometry) => FeatureCollection {
            bbox: None,
            features: vec![Feature {
                bbox: None,
                geometry: Some(geometry),
                id: None,
                properties: None,
                foreign_members: None,
            }],
            foreign_members: None,
        },
    }
}

/// Load one dataset from the data directory
pub fn load_dataset(data_dir: &Path, dataset: Dataset) -> FeatureCollection {
    load(&dataset.resolve(data_dir))
}

/// Load all three datasets in parallel and wait for every one of them.
pub fn load_all(data_dir: &Path) -> Datasets {
    let (trees, (structures, heat_zones)) = rayon::join(
        || load_dataset(data_dir, Dataset::Trees),
        || {
            rayon::join(
                || load_dataset(data_dir, Dataset::Structures),
                || load_dataset(data_dir, Dataset::HeatZones),
            )
        },
    );

    info!(
        trees = trees.features.len(),
        structures = structures.features.len(),
        heat_zones = heat_zones.features.len(),
        "datasets loaded"
    );

    Datasets {
        trees,
        structures,
        heat_zones,
    }
}
