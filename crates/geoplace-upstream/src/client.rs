//! HTTP client for the geo-places v2 REST API.
//!
//! Wraps `reqwest` with API-key handling, status classification and the
//! bounded transport retry. All list endpoints are POST with a JSON body;
//! place detail is a GET on the percent-encoded place id.

use std::time::Duration;

use async_trait::async_trait;
use geoplace_core::{AppConfig, Coordinates};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use reqwest::{Client, Url};
use serde::Serialize;

use crate::error::UpstreamError;
use crate::retry::retry_with_backoff;
use crate::types::{
    page_from_body, GeocodeBody, NearbyQuery, RawPage, ReverseGeocodeBody, SearchNearbyBody,
    SearchTextBody, TextQuery, SEARCH_FEATURES,
};
use crate::upstream::PlacesUpstream;

/// Construction parameters for [`LocationClient`].
#[derive(Clone)]
pub struct ClientSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    pub user_agent: String,
    pub max_retries: u32,
    pub retry_backoff_base_ms: u64,
}

impl ClientSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            base_url: config.base_url(),
            api_key: config.api_key.clone(),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
            user_agent: config.user_agent.clone(),
            max_retries: config.max_retries,
            retry_backoff_base_ms: config.retry_backoff_base_ms,
        }
    }
}

/// Client for the places service.
///
/// Cheap to share: wrap it in an `Arc` once at startup and hand clones of
/// the `Arc` to every request.
pub struct LocationClient {
    client: Client,
    api_key: Option<String>,
    base_url: Url,
    max_retries: u32,
    retry_backoff_base_ms: u64,
}

impl LocationClient {
    /// Creates a client from explicit settings.
    ///
    /// A missing API key is not an error here; calls will fail with
    /// [`UpstreamError::NotConfigured`] instead.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`UpstreamError::NotConfigured`] if
    /// `base_url` is not a valid URL.
    pub fn new(settings: ClientSettings) -> Result<Self, UpstreamError> {
        let client = Client::builder()
            .timeout(settings.request_timeout)
            .connect_timeout(settings.connect_timeout)
            .user_agent(settings.user_agent.as_str())
            .build()?;

        // Exactly one trailing slash so `Url::join` appends instead of
        // replacing the last path segment.
        let normalised = format!("{}/", settings.base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| {
            UpstreamError::NotConfigured(format!("invalid base URL '{}': {e}", settings.base_url))
        })?;

        Ok(Self {
            client,
            api_key: settings.api_key,
            base_url,
            max_retries: settings.max_retries,
            retry_backoff_base_ms: settings.retry_backoff_base_ms,
        })
    }

    /// Shorthand for [`LocationClient::new`] with settings taken from `config`.
    ///
    /// # Errors
    ///
    /// See [`LocationClient::new`].
    pub fn from_app_config(config: &AppConfig) -> Result<Self, UpstreamError> {
        Self::new(ClientSettings::from_app_config(config))
    }

    fn api_key(&self) -> Result<&str, UpstreamError> {
        self.api_key.as_deref().ok_or_else(|| {
            UpstreamError::NotConfigured(
                "places API key is not set; export AWS_LOCATION_API_KEY".to_string(),
            )
        })
    }

    /// Builds `{base}/{path}?key=..&extra..` with percent-encoded values.
    fn build_url(&self, path: &str, extra: &[(&str, &str)]) -> Result<Url, UpstreamError> {
        let key = self.api_key()?;
        let mut url = self.base_url.join(path).map_err(|e| {
            UpstreamError::NotConfigured(format!("cannot build URL for '{path}': {e}"))
        })?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("key", key);
            for (k, v) in extra {
                pairs.append_pair(k, v);
            }
        }
        Ok(url)
    }

    async fn post_json<B: Serialize>(
        &self,
        path: &str,
        body: &B,
        context: &str,
    ) -> Result<serde_json::Value, UpstreamError> {
        let url = self.build_url(path, &[])?;
        let payload = serde_json::to_value(body).map_err(|e| UpstreamError::Deserialize {
            context: format!("request body for {context}"),
            source: e,
        })?;
        let payload = &payload;
        tracing::debug!(path, context, "places upstream POST");

        retry_with_backoff(self.max_retries, self.retry_backoff_base_ms, || {
            let url = url.clone();
            async move {
                let response = self.client.post(url).json(payload).send().await?;
                read_json(response, context).await
            }
        })
        .await
    }

    async fn get_json(
        &self,
        path: &str,
        extra: &[(&str, &str)],
        context: &str,
    ) -> Result<serde_json::Value, UpstreamError> {
        let url = self.build_url(path, extra)?;
        tracing::debug!(path, context, "places upstream GET");

        retry_with_backoff(self.max_retries, self.retry_backoff_base_ms, || {
            let url = url.clone();
            async move {
                let response = self.client.get(url).send().await?;
                read_json(response, context).await
            }
        })
        .await
    }

    fn to_page(body: serde_json::Value, context: &str) -> Result<RawPage, UpstreamError> {
        page_from_body(body).map_err(|e| UpstreamError::Deserialize {
            context: context.to_string(),
            source: e,
        })
    }
}

/// Checks the status and parses the body as JSON.
///
/// Non-2xx responses become [`UpstreamError::Status`] with the service's
/// error code taken from the `x-amzn-ErrorType` header or the body.
async fn read_json(
    response: reqwest::Response,
    context: &str,
) -> Result<serde_json::Value, UpstreamError> {
    let status = response.status();
    if !status.is_success() {
        let header_code = response
            .headers()
            .get("x-amzn-errortype")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(':').next())
            .filter(|v| !v.is_empty())
            .map(str::to_owned);
        let body = response.text().await.unwrap_or_default();
        let (body_code, body_message) = parse_error_body(&body);
        let code = header_code
            .or(body_code)
            .unwrap_or_else(|| format!("HTTP{}", status.as_u16()));
        let message = body_message.unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unexpected status")
                .to_string()
        });
        tracing::debug!(
            status = status.as_u16(),
            code = %code,
            context,
            "places upstream error status"
        );
        return Err(UpstreamError::Status {
            status: status.as_u16(),
            code,
            message,
        });
    }

    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| UpstreamError::Deserialize {
        context: context.to_string(),
        source: e,
    })
}

/// Extracts `(code, message)` from an error body such as
/// `{"__type": "ns#ValidationException", "message": "..."}`.
fn parse_error_body(body: &str) -> (Option<String>, Option<String>) {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return (None, None);
    };
    let code = ["__type", "code", "Code"]
        .iter()
        .find_map(|k| value.get(*k).and_then(serde_json::Value::as_str))
        .and_then(|c| c.rsplit('#').next())
        .map(str::to_owned);
    let message = ["message", "Message"]
        .iter()
        .find_map(|k| value.get(*k).and_then(serde_json::Value::as_str))
        .map(str::to_owned);
    (code, message)
}

#[async_trait]
impl PlacesUpstream for LocationClient {
    fn ensure_configured(&self) -> Result<(), UpstreamError> {
        self.api_key().map(|_| ())
    }

    async fn search_text(&self, query: &TextQuery) -> Result<RawPage, UpstreamError> {
        let body = if query.is_plain_geocode() {
            let body = GeocodeBody {
                query_text: &query.text,
                max_results: query.max_results,
                additional_features: &["TimeZone"],
            };
            self.post_json("v2/geocode", &body, "geocode").await?
        } else {
            let body = SearchTextBody::from_query(query);
            self.post_json("v2/search-text", &body, "search-text")
                .await?
        };
        Self::to_page(body, "search-text results")
    }

    async fn search_nearby(&self, query: &NearbyQuery) -> Result<RawPage, UpstreamError> {
        let body = SearchNearbyBody {
            query_position: query.position.as_pair(),
            query_radius: query.radius,
            max_results: query.max_results,
            additional_features: SEARCH_FEATURES,
        };
        let body = self
            .post_json("v2/search-nearby", &body, "search-nearby")
            .await?;
        Self::to_page(body, "search-nearby results")
    }

    async fn reverse_geocode(&self, position: Coordinates) -> Result<RawPage, UpstreamError> {
        let body = ReverseGeocodeBody {
            query_position: position.as_pair(),
            max_results: 1,
            additional_features: &["TimeZone"],
        };
        let body = self
            .post_json("v2/reverse-geocode", &body, "reverse-geocode")
            .await?;
        Self::to_page(body, "reverse-geocode results")
    }

    async fn get_place(&self, place_id: &str) -> Result<serde_json::Value, UpstreamError> {
        let path = format!(
            "v2/place/{}",
            utf8_percent_encode(place_id, NON_ALPHANUMERIC)
        );
        self.get_json(
            &path,
            &[
                ("additional-features", "Contact"),
                ("additional-features", "TimeZone"),
            ],
            "get-place",
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(base_url: &str, api_key: Option<&str>) -> ClientSettings {
        ClientSettings {
            base_url: base_url.to_string(),
            api_key: api_key.map(str::to_string),
            request_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(5),
            user_agent: "geoplace-test/0.1".to_string(),
            max_retries: 0,
            retry_backoff_base_ms: 0,
        }
    }

    fn test_client(base_url: &str) -> LocationClient {
        LocationClient::new(settings(base_url, Some("test-key")))
            .expect("client construction should not fail")
    }

    #[test]
    fn build_url_appends_key() {
        let client = test_client("https://places.geo.us-east-1.amazonaws.com");
        let url = client.build_url("v2/geocode", &[]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://places.geo.us-east-1.amazonaws.com/v2/geocode?key=test-key"
        );
    }

    #[test]
    fn build_url_keeps_base_path_prefix() {
        let client = test_client("http://localhost:9000/proxy/");
        let url = client
            .build_url("v2/place/abc", &[("additional-features", "Contact")])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:9000/proxy/v2/place/abc?key=test-key&additional-features=Contact"
        );
    }

    #[test]
    fn missing_key_is_not_configured() {
        let client = LocationClient::new(settings("https://example.com", None)).unwrap();
        assert!(matches!(
            client.ensure_configured(),
            Err(UpstreamError::NotConfigured(_))
        ));
        assert!(matches!(
            client.build_url("v2/geocode", &[]),
            Err(UpstreamError::NotConfigured(_))
        ));
    }

    #[test]
    fn invalid_base_url_is_not_configured() {
        let result = LocationClient::new(settings("not a url", Some("k")));
        assert!(matches!(result, Err(UpstreamError::NotConfigured(_))));
    }

    #[test]
    fn error_body_code_strips_namespace() {
        let (code, message) = parse_error_body(
            r#"{"__type":"com.amazonaws.geo#ValidationException","message":"bad radius"}"#,
        );
        assert_eq!(code.as_deref(), Some("ValidationException"));
        assert_eq!(message.as_deref(), Some("bad radius"));
    }

    #[test]
    fn error_body_tolerates_non_json() {
        assert_eq!(parse_error_body("<html>"), (None, None));
    }
}
