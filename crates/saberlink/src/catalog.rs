//! Map catalog lookups.
//!
//! When a player picks a level, the HTTP boundary resolves the catalog id
//! to a download URL and a cover URL. [`MapCatalog`] is the seam: the
//! server ships with [`BeatSaverCatalog`] (a BeatSaver-compatible JSON
//! API over `reqwest`), and tests plug in a fixed table.

use std::future::Future;

use reqwest::{Client, StatusCode};
use saberlink_session::ChosenLevel;
use serde::Deserialize;

/// Default public catalog.
pub const DEFAULT_CATALOG_URL: &str = "https://api.beatsaver.com";

/// Errors from a catalog lookup.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// The id is malformed or the catalog has no such map.
    #[error("map {0} not found")]
    NotFound(String),

    /// The map exists but lists no versions to download.
    #[error("map {0} has no versions")]
    NoVersions(String),

    /// Transport failure, unexpected status, or undecodable body.
    #[error("catalog request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Resolves a catalog map id to its primary version's URLs.
pub trait MapCatalog: Send + Sync + 'static {
    /// Looks up `map_id`.
    fn lookup(
        &self,
        map_id: &str,
    ) -> impl Future<Output = Result<ChosenLevel, CatalogError>> + Send;
}

// ---------------------------------------------------------------------------
// BeatSaverCatalog
// ---------------------------------------------------------------------------

/// Client for a BeatSaver-compatible catalog (`GET {base}/maps/id/{id}`).
#[derive(Debug, Clone)]
pub struct BeatSaverCatalog {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct MapDetail {
    #[serde(default)]
    versions: Vec<MapVersion>,
}

#[derive(Debug, Deserialize)]
struct MapVersion {
    #[serde(rename = "downloadURL")]
    download_url: String,
    #[serde(rename = "coverURL")]
    cover_url: String,
}

impl BeatSaverCatalog {
    #[must_use]
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn map_url(&self, map_id: &str) -> String {
        format!("{}/maps/id/{}", self.base_url, map_id)
    }
}

impl MapCatalog for BeatSaverCatalog {
    async fn lookup(&self, map_id: &str) -> Result<ChosenLevel, CatalogError> {
        if !is_valid_map_id(map_id) {
            return Err(CatalogError::NotFound(map_id.to_string()));
        }

        let response = self.client.get(self.map_url(map_id)).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(CatalogError::NotFound(map_id.to_string()));
        }
        let detail: MapDetail = response.error_for_status()?.json().await?;

        primary_version(map_id, detail)
    }
}

/// Catalog ids are short alphanumeric keys; anything else would change
/// the request path.
fn is_valid_map_id(map_id: &str) -> bool {
    !map_id.is_empty() && map_id.chars().all(|c| c.is_ascii_alphanumeric())
}

/// The first listed version is the primary one.
fn primary_version(
    map_id: &str,
    detail: MapDetail,
) -> Result<ChosenLevel, CatalogError> {
    detail
        .versions
        .into_iter()
        .next()
        .map(|v| ChosenLevel {
            url: v.download_url,
            cover_url: v.cover_url,
        })
        .ok_or_else(|| CatalogError::NoVersions(map_id.to_string()))
}
