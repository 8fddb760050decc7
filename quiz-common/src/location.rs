//! Geolocation enrichment
//!
//! Looks up the visitor's approximate location from an IP geolocation
//! service (ipapi.co response shape). Enrichment is best effort: every
//! failure collapses to [`LocationInfo::unknown`] and is only logged.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Value substituted for any location field that could not be determined
pub const UNKNOWN: &str = "unknown";

/// Default geolocation service
pub const DEFAULT_GEOLOCATION_URL: &str = "https://ipapi.co/json/";

/// Default bound on the lookup
pub const DEFAULT_LOOKUP_TIMEOUT_MS: u64 = 5000;

/// Location fields merged into the submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationInfo {
    pub ip: String,
    pub city: String,
    pub state: String,
    pub country: String,
}

impl LocationInfo {
    /// All four fields set to the sentinel
    pub fn unknown() -> Self {
        Self {
            ip: UNKNOWN.to_string(),
            city: UNKNOWN.to_string(),
            state: UNKNOWN.to_string(),
            country: UNKNOWN.to_string(),
        }
    }

    /// Field name/value pairs in payload order
    pub fn fields(&self) -> [(&'static str, &str); 4] {
        [
            ("ip", self.ip.as_str()),
            ("city", self.city.as_str()),
            ("state", self.state.as_str()),
            ("country", self.country.as_str()),
        ]
    }
}

/// Geolocation lookup failures (never surfaced to the user)
#[derive(Debug, Error)]
pub enum LocationError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Lookup failed with status {0}")]
    Status(u16),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Lookup timed out after {0:?}")]
    Timeout(Duration),
}

/// Capability resolving the current visitor's location
#[async_trait]
pub trait GeoLookup: Send + Sync {
    async fn lookup(&self) -> Result<LocationInfo, LocationError>;
}

/// Raw geolocation response; every field optional
#[derive(Debug, Default, Deserialize)]
pub struct GeoResponse {
    pub ip: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub country_name: Option<String>,
}

impl From<GeoResponse> for LocationInfo {
    fn from(response: GeoResponse) -> Self {
        fn or_unknown(value: Option<String>) -> String {
            value
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| UNKNOWN.to_string())
        }

        Self {
            ip: or_unknown(response.ip),
            city: or_unknown(response.city),
            state: or_unknown(response.region),
            country: or_unknown(response.country_name),
        }
    }
}

/// HTTP geolocation client
pub struct IpApiClient {
    http_client: reqwest::Client,
    url: String,
}

impl IpApiClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, LocationError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LocationError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl GeoLookup for IpApiClient {
    async fn lookup(&self) -> Result<LocationInfo, LocationError> {
        tracing::debug!(url = %self.url, "Querying geolocation service");

        let response = self
            .http_client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| LocationError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LocationError::Status(status.as_u16()));
        }

        let body: GeoResponse = response
            .json()
            .await
            .map_err(|e| LocationError::Parse(e.to_string()))?;

        Ok(body.into())
    }
}

/// Resolve the location with a single bounded attempt
///
/// Never fails: timeouts and lookup errors yield [`LocationInfo::unknown`].
pub async fn resolve_location(lookup: &dyn GeoLookup, timeout: Duration) -> LocationInfo {
    let result = match tokio::time::timeout(timeout, lookup.lookup()).await {
        Ok(result) => result,
        Err(_) => Err(LocationError::Timeout(timeout)),
    };

    match result {
        Ok(location) => {
            tracing::debug!(
                city = %location.city,
                country = %location.country,
                "Resolved location"
            );
            location
        }
        Err(e) => {
            tracing::warn!(error = %e, "Error getting location, using unknown");
            LocationInfo::unknown()
        }
    }
}
