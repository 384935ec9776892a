//! Bounded retry around a feature source
//!
//! A fixed number of attempts with a fixed delay between them. Exhausting
//! the attempts is logged and reported, never raised: callers must treat an
//! empty feature list as a possible outcome.

use crate::models::RawFeature;
use crate::sources::{FeatureSource, LayerRef};
use parcel_common::config::SourceConfig;
use std::time::Duration;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl From<&SourceConfig> for RetryPolicy {
    fn from(config: &SourceConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            delay: config.retry_delay(),
        }
    }
}

/// Result of fetching one layer
#[derive(Debug, Clone)]
pub struct FetchReport {
    pub layer: String,
    pub features: Vec<RawFeature>,
    pub attempts: u32,
    pub succeeded: bool,
}

/// Fetch a layer, retrying failed attempts up to the policy's bound
pub async fn fetch_with_retry(
    source: &dyn FeatureSource,
    layer: &LayerRef,
    policy: &RetryPolicy,
) -> FetchReport {
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    while attempt < max_attempts {
        attempt += 1;
        match source.fetch_layer(layer).await {
            Ok(features) => {
                info!(
                    layer = %layer.name,
                    attempt,
                    "Downloaded {} features",
                    features.len()
                );
                return FetchReport {
                    layer: layer.name.clone(),
                    features,
                    attempts: attempt,
                    succeeded: true,
                };
            }
            Err(e) => {
                error!(layer = %layer.name, "Attempt {} failed with error: {}", attempt, e);
                if attempt < max_attempts {
                    tokio::time::sleep(policy.delay).await;
                }
            }
        }
    }

    error!(
        layer = %layer.name,
        "Failed to download data after {} attempts",
        max_attempts
    );
    FetchReport {
        layer: layer.name.clone(),
        features: Vec::new(),
        attempts: max_attempts,
        succeeded: false,
    }
}
