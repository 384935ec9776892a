//! Feature sources
//!
//! A source yields the raw features of one named layer. Sources may fail
//! transiently; [`retry::fetch_with_retry`] bounds the attempts and turns an
//! exhausted fetch into an empty result instead of an error.

pub mod esri;
pub mod geojson_file;
pub mod retry;

pub use esri::EsriFeatureSource;
pub use geojson_file::GeoJsonFileSource;
pub use retry::{fetch_with_retry, FetchReport, RetryPolicy};

use crate::models::RawFeature;
use async_trait::async_trait;
use parcel_common::config::SourceConfig;
use parcel_common::Result;
use std::path::PathBuf;

/// A named layer and where to read it from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerRef {
    pub name: String,
    /// MapServer layer URL or local FeatureCollection path
    pub location: String,
}

impl LayerRef {
    pub fn new(name: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: location.into(),
        }
    }

    pub fn is_remote(&self) -> bool {
        self.location.starts_with("http://") || self.location.starts_with("https://")
    }
}

/// Producer of raw feature records for a layer
#[async_trait]
pub trait FeatureSource: Send + Sync {
    /// Fetch every feature of the layer, in source order
    async fn fetch_layer(&self, layer: &LayerRef) -> Result<Vec<RawFeature>>;
}

/// Pick the source matching a layer's location
pub fn source_for(layer: &LayerRef, config: &SourceConfig, srid: i32) -> Result<Box<dyn FeatureSource>> {
    if layer.is_remote() {
        Ok(Box::new(EsriFeatureSource::new(config, srid)?))
    } else {
        Ok(Box::new(GeoJsonFileSource::new(PathBuf::from(&layer.location))))
    }
}
