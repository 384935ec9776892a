//! ArcGIS MapServer layer client
//!
//! Pages through a layer's `query` endpoint in GeoJSON format. The server
//! caps records per response; paging continues while a page is full or the
//! server reports that its transfer limit was exceeded. Layers that ignore
//! `resultOffset` keep returning the same page; paging stops as soon as a
//! page brings no feature not already seen.

use crate::models::RawFeature;
use crate::sources::{FeatureSource, LayerRef};
use async_trait::async_trait;
use parcel_common::config::SourceConfig;
use parcel_common::{Error, Result};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use tracing::warn;

/// Upper bound on pages fetched for one layer
const MAX_PAGES: usize = 10_000;

const USER_AGENT: &str = concat!("parcel-loader/", env!("CARGO_PKG_VERSION"));

/// One page of a GeoJSON query response
#[derive(Debug, Deserialize)]
struct QueryPage {
    #[serde(default)]
    features: Vec<RawFeature>,

    #[serde(default, rename = "exceededTransferLimit")]
    exceeded_transfer_limit: bool,

    /// GeoJSON responses report the transfer limit here instead
    #[serde(default)]
    properties: Option<Value>,

    #[serde(default)]
    error: Option<QueryError>,
}

#[derive(Debug, Deserialize)]
struct QueryError {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

impl QueryPage {
    fn more_available(&self) -> bool {
        self.exceeded_transfer_limit
            || self
                .properties
                .as_ref()
                .and_then(|p| p.get("exceededTransferLimit"))
                .and_then(Value::as_bool)
                .unwrap_or(false)
    }
}

/// ArcGIS MapServer feature source
pub struct EsriFeatureSource {
    http_client: reqwest::Client,
    page_size: u32,
    out_srid: i32,
}

impl EsriFeatureSource {
    pub fn new(config: &SourceConfig, out_srid: i32) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout())
            .build()
            .map_err(|e| Error::Source(e.to_string()))?;

        Ok(Self {
            http_client,
            page_size: config.page_size,
            out_srid,
        })
    }

    async fn fetch_page(&self, layer: &LayerRef, offset: usize) -> Result<QueryPage> {
        let url = query_url(&layer.location);
        let offset = offset.to_string();
        let page_size = self.page_size.to_string();
        let out_srid = self.out_srid.to_string();

        tracing::debug!(layer = %layer.name, url = %url, offset = %offset, "Querying feature layer");

        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("where", "1=1"),
                ("outFields", "*"),
                ("returnGeometry", "true"),
                ("outSR", out_srid.as_str()),
                ("f", "geojson"),
                ("resultOffset", offset.as_str()),
                ("resultRecordCount", page_size.as_str()),
            ])
            .send()
            .await
            .map_err(|e| Error::Source(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(Error::Source(format!("HTTP {}: {}", status.as_u16(), error_text)));
        }

        let page: QueryPage = response
            .json()
            .await
            .map_err(|e| Error::Source(format!("Parse error: {}", e)))?;

        if let Some(err) = &page.error {
            return Err(Error::Source(format!("Service error {}: {}", err.code, err.message)));
        }

        Ok(page)
    }
}

#[async_trait]
impl FeatureSource for EsriFeatureSource {
    async fn fetch_layer(&self, layer: &LayerRef) -> Result<Vec<RawFeature>> {
        let mut features = Vec::new();
        let mut seen = HashSet::new();

        for page_number in 1..=MAX_PAGES {
            let page = self.fetch_page(layer, features.len()).await?;
            let received = page.features.len();
            let more = page.more_available();

            let fresh = page
                .features
                .iter()
                .filter(|feature| seen.insert(feature_key(feature)))
                .count();
            if received > 0 && fresh == 0 {
                warn!(
                    layer = %layer.name,
                    page = page_number,
                    "Page repeats earlier features; layer does not support paging, stopping"
                );
                break;
            }
            features.extend(page.features);

            tracing::debug!(layer = %layer.name, received, total = features.len(), "Fetched page");

            if received == 0 || (received < self.page_size as usize && !more) {
                return Ok(features);
            }
            if page_number == MAX_PAGES {
                warn!(layer = %layer.name, pages = MAX_PAGES, "Page limit reached, stopping");
            }
        }

        Ok(features)
    }
}

/// Feature id, then OBJECTID, then the whole record
fn feature_key(feature: &RawFeature) -> String {
    feature
        .id
        .as_ref()
        .or_else(|| feature.properties.get("OBJECTID"))
        .map(Value::to_string)
        .unwrap_or_else(|| serde_json::to_string(feature).unwrap_or_default())
}

fn query_url(layer_url: &str) -> String {
    format!("{}/query", layer_url.trim_end_matches('/'))
}
