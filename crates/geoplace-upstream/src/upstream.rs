use async_trait::async_trait;
use geoplace_core::Coordinates;

use crate::error::UpstreamError;
use crate::types::{NearbyQuery, RawPage, TextQuery};

/// The four calls the engine needs from a places service.
///
/// Implementations are shared across concurrent requests, so they must be
/// `Send + Sync` and must not hold per-request state.
#[async_trait]
pub trait PlacesUpstream: Send + Sync {
    /// Fails fast when the upstream cannot be used at all (no credentials,
    /// no endpoint). Called by the engine before any other method.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError::NotConfigured`] when the upstream is unusable.
    fn ensure_configured(&self) -> Result<(), UpstreamError> {
        Ok(())
    }

    async fn search_text(&self, query: &TextQuery) -> Result<RawPage, UpstreamError>;

    async fn search_nearby(&self, query: &NearbyQuery) -> Result<RawPage, UpstreamError>;

    async fn reverse_geocode(&self, position: Coordinates) -> Result<RawPage, UpstreamError>;

    async fn get_place(&self, place_id: &str) -> Result<serde_json::Value, UpstreamError>;
}
