//! Venue API client
//!
//! Queries the venue information HTTP API to resolve a venue identifier to
//! enrichment data: the venue's best photo and its top tip.
//!
//! # API Reference
//! - Endpoint: `{base}/venues/{venue_id}`
//! - Authentication: static client credentials as query parameters

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use waymark_common::config::VenueConfig;
use waymark_common::types::LocationInfo;

/// Size token composed between the photo descriptor's prefix and suffix
const PHOTO_SIZE: &str = "500x300";

/// Default timeout for venue API requests
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Venue fetch failure classes
///
/// Cloneable so one failure can be fanned out to every caller converged
/// on the same in-flight load.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum VenueError {
    /// Network communication error
    #[error("Network error: {0}")]
    Network(String),

    /// External API error (non-success status or upstream error payload)
    #[error("API error: {0}")]
    Api(String),

    /// Failed to parse the response payload
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Source of venue enrichment data
#[async_trait]
pub trait VenueApi: Send + Sync {
    /// Fetch the photo/tip pair for one venue identifier
    async fn fetch_venue(&self, venue_id: &str) -> Result<LocationInfo, VenueError>;
}

/// HTTP client for the venue information API
pub struct VenueClient {
    http_client: Client,
    config: VenueConfig,
}

impl VenueClient {
    /// Create a new venue API client
    pub fn new(config: VenueConfig) -> Self {
        Self {
            http_client: Client::builder()
                .timeout(DEFAULT_TIMEOUT)
                .build()
                .expect("Failed to create HTTP client"),
            config,
        }
    }
}

#[async_trait]
impl VenueApi for VenueClient {
    async fn fetch_venue(&self, venue_id: &str) -> Result<LocationInfo, VenueError> {
        debug!(venue_id = %venue_id, "Querying venue API");

        let url = format!(
            "{}/venues/{}?client_id={}&client_secret={}&v={}",
            self.config.api_url,
            venue_id,
            self.config.client_id,
            self.config.client_secret,
            self.config.api_version
        );

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| VenueError::Network(format!("venue API request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(VenueError::Api(format!(
                "venue API returned error {}: {}",
                status, body
            )));
        }

        let payload: VenueResponse = response
            .json()
            .await
            .map_err(|e| VenueError::Parse(format!("failed to parse venue response: {}", e)))?;

        extract_info(payload, venue_id)
    }
}

/// Reduce a venue payload to the cached photo/tip pair
///
/// An upstream error object in the payload fails the fetch even when the
/// HTTP status was a success.
fn extract_info(payload: VenueResponse, venue_id: &str) -> Result<LocationInfo, VenueError> {
    if let Some(error) = payload.error {
        return Err(VenueError::Api(format!(
            "venue API signaled error for {}: {}",
            venue_id, error
        )));
    }

    let venue = payload
        .response
        .and_then(|r| r.venue)
        .ok_or_else(|| VenueError::Parse(format!("venue payload missing venue object for {}", venue_id)))?;

    let photo = match venue.best_photo {
        Some(p) => format!("{}{}{}", p.prefix, PHOTO_SIZE, p.suffix),
        None => String::new(),
    };

    let tip = venue
        .tips
        .filter(|t| t.count > 0)
        .and_then(|t| t.groups.into_iter().next())
        .and_then(|g| g.items.into_iter().next())
        .map(|i| i.text)
        .unwrap_or_default();

    Ok(LocationInfo { photo, tip })
}

// ============================================================================
// Venue API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct VenueResponse {
    error: Option<serde_json::Value>,
    response: Option<VenueBody>,
}

#[derive(Debug, Deserialize)]
struct VenueBody {
    venue: Option<Venue>,
}

#[derive(Debug, Deserialize)]
struct Venue {
    #[serde(rename = "bestPhoto")]
    best_photo: Option<BestPhoto>,
    tips: Option<Tips>,
}

#[derive(Debug, Deserialize)]
struct BestPhoto {
    prefix: String,
    suffix: String,
}

#[derive(Debug, Deserialize)]
struct Tips {
    count: u32,
    #[serde(default)]
    groups: Vec<TipGroup>,
}

#[derive(Debug, Deserialize)]
struct TipGroup {
    #[serde(default)]
    items: Vec<TipItem>,
}

#[derive(Debug, Deserialize)]
struct TipItem {
    text: String,
}

// ============================================================================
// Tests
// ============================================================================
