//! FeatureCollection files as a feature source
//!
//! Used for offline runs and re-loads of previously downloaded layers.

use crate::models::{FeatureCollection, RawFeature};
use crate::sources::{FeatureSource, LayerRef};
use async_trait::async_trait;
use parcel_common::Result;
use std::path::PathBuf;

pub struct GeoJsonFileSource {
    path: PathBuf,
}

impl GeoJsonFileSource {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl FeatureSource for GeoJsonFileSource {
    async fn fetch_layer(&self, layer: &LayerRef) -> Result<Vec<RawFeature>> {
        tracing::debug!(layer = %layer.name, path = %self.path.display(), "Reading features from file");
        let content = tokio::fs::read_to_string(&self.path).await?;
        let collection = FeatureCollection::from_json_str(&content)?;
        Ok(collection.features)
    }
}
