//! Elevation transport.
//!
//! Elevation comes from an ArcGIS `ElevationsSOE` service. One request covers
//! one tile of the elevation pyramid and returns an 81×81 grid sampled at the
//! cell centers of an extent padded by half a cell on every side:
//!
//! ```text
//! GET {url}?Extent={"xmin":..,"ymin":..,"xmax":..,"ymax":..,
//!                   "spatialReference":{"wkid":102100}}
//!          &Rows=81&Columns=81&f=pjson
//!
//! { "data": [ 6561 numbers, north row first ] }
//! ```

use std::sync::Arc;

pub use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};

use super::grid::{FETCH_SAMPLE_COUNT, FETCH_SEGMENT, FETCH_WIDTH};
use super::ElevationError;
use crate::provider::AsyncHttpClient;
use crate::tile::TileAddress;

/// Default elevation service endpoint.
pub const DEFAULT_ELEVATION_URL: &str = "https://sampleserver4.arcgisonline.com/ArcGIS/rest/services/Elevation/ESRI_Elevation_World/MapServer/exts/ElevationsSOE/ElevationLayers/1/GetElevationData";

/// Well-known id of the Web Mercator spatial reference.
const WEB_MERCATOR_WKID: u32 = 102100;

/// Source of raw elevation grids.
///
/// The returned future owns everything it needs so the cache can spawn it.
pub trait ElevationFetcher: Send + Sync {
    /// Fetches the [`FETCH_SAMPLE_COUNT`] samples covering `address`.
    fn fetch(&self, address: TileAddress) -> BoxFuture<'static, Result<Vec<f64>, ElevationError>>;
}

#[derive(Debug, Serialize)]
struct Extent {
    xmin: f64,
    ymin: f64,
    xmax: f64,
    ymax: f64,
    #[serde(rename = "spatialReference")]
    spatial_reference: SpatialReference,
}

#[derive(Debug, Serialize)]
struct SpatialReference {
    wkid: u32,
}

#[derive(Debug, Deserialize)]
struct ElevationResponse {
    data: Vec<f64>,
}

/// Fetches elevation from an ArcGIS `GetElevationData` endpoint.
pub struct ArcGisElevationFetcher<C: AsyncHttpClient> {
    http_client: Arc<C>,
    base_url: reqwest::Url,
}

impl<C: AsyncHttpClient> ArcGisElevationFetcher<C> {
    /// Creates a fetcher against `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`ElevationError::InvalidUrl`] if `base_url` does not parse.
    pub fn new(http_client: C, base_url: &str) -> Result<Self, ElevationError> {
        let base_url = reqwest::Url::parse(base_url)
            .map_err(|e| ElevationError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        Ok(Self {
            http_client: Arc::new(http_client),
            base_url,
        })
    }

    /// Builds the request URL for `address`.
    pub fn build_url(&self, address: TileAddress) -> reqwest::Url {
        let env = address.mercator_envelope();
        let half_x = env.width() / FETCH_SEGMENT as f64 / 2.0;
        let half_y = env.height() / FETCH_SEGMENT as f64 / 2.0;
        let padded = env.padded(half_x, half_y);
        let extent = Extent {
            xmin: padded.min_x,
            ymin: padded.min_y,
            xmax: padded.max_x,
            ymax: padded.max_y,
            spatial_reference: SpatialReference {
                wkid: WEB_MERCATOR_WKID,
            },
        };
        // Serializing plain floats and integers cannot fail.
        let extent = serde_json::to_string(&extent).unwrap_or_default();
        let samples = FETCH_WIDTH.to_string();

        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("Extent", &extent)
            .append_pair("Rows", &samples)
            .append_pair("Columns", &samples)
            .append_pair("f", "pjson");
        url
    }
}

/// Decodes a `GetElevationData` response body.
pub fn parse_elevation_response(body: &[u8]) -> Result<Vec<f64>, ElevationError> {
    let response: ElevationResponse = serde_json::from_slice(body)
        .map_err(|e| ElevationError::MalformedResponse(e.to_string()))?;
    if response.data.len() != FETCH_SAMPLE_COUNT {
        return Err(ElevationError::WrongSampleCount {
            expected: FETCH_SAMPLE_COUNT,
            actual: response.data.len(),
        });
    }
    Ok(response.data)
}

impl<C: AsyncHttpClient> ElevationFetcher for ArcGisElevationFetcher<C> {
    fn fetch(&self, address: TileAddress) -> BoxFuture<'static, Result<Vec<f64>, ElevationError>> {
        let client = Arc::clone(&self.http_client);
        let url = self.build_url(address);
        async move {
            let body = client.get(url.as_str()).await?;
            parse_elevation_response(&body)
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{MockAsyncHttpClient, ProviderError};

    fn body_with(count: usize) -> Vec<u8> {
        let data: Vec<f64> = (0..count).map(|i| i as f64 * 0.5).collect();
        serde_json::to_vec(&serde_json::json!({ "data": data })).unwrap()
    }

    fn query(url: &reqwest::Url, key: &str) -> String {
        url.query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
            .unwrap()
    }

    #[test]
    fn test_url_parameters() {
        let fetcher =
            ArcGisElevationFetcher::new(MockAsyncHttpClient::new(Ok(vec![])), DEFAULT_ELEVATION_URL)
                .unwrap();
        let address = TileAddress::new(7, 0, 1).unwrap();
        let url = fetcher.build_url(address);

        assert!(url.as_str().starts_with(DEFAULT_ELEVATION_URL));
        assert_eq!(query(&url, "Rows"), "81");
        assert_eq!(query(&url, "Columns"), "81");
        assert_eq!(query(&url, "f"), "pjson");

        let extent: serde_json::Value = serde_json::from_str(&query(&url, "Extent")).unwrap();
        let env = address.mercator_envelope();
        let half_cell = env.width() / 160.0;
        assert_eq!(extent["spatialReference"]["wkid"], 102100);
        assert!((extent["xmin"].as_f64().unwrap() - (env.min_x - half_cell)).abs() < 1e-6);
        assert!((extent["ymax"].as_f64().unwrap() - (env.max_y + half_cell)).abs() < 1e-6);
    }

    #[test]
    fn test_invalid_base_url() {
        let result = ArcGisElevationFetcher::new(MockAsyncHttpClient::new(Ok(vec![])), "not a url");
        assert!(matches!(result, Err(ElevationError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_fetch_parses_samples() {
        let client = MockAsyncHttpClient::new(Ok(body_with(FETCH_SAMPLE_COUNT)));
        let fetcher = ArcGisElevationFetcher::new(client.clone(), DEFAULT_ELEVATION_URL).unwrap();

        let values = fetcher.fetch(TileAddress::new(7, 0, 1).unwrap()).await.unwrap();
        assert_eq!(values.len(), FETCH_SAMPLE_COUNT);
        assert_eq!(values[2], 1.0);
        assert_eq!(client.call_count(), 1);
    }

    #[tokio::test]
    async fn test_fetch_rejects_short_grid() {
        let client = MockAsyncHttpClient::new(Ok(body_with(100)));
        let fetcher = ArcGisElevationFetcher::new(client, DEFAULT_ELEVATION_URL).unwrap();

        let err = fetcher.fetch(TileAddress::new(7, 0, 1).unwrap()).await.unwrap_err();
        assert_eq!(
            err,
            ElevationError::WrongSampleCount {
                expected: FETCH_SAMPLE_COUNT,
                actual: 100
            }
        );
    }

    #[tokio::test]
    async fn test_fetch_maps_status_errors() {
        let client = MockAsyncHttpClient::new(Err(ProviderError::Status {
            status: 503,
            url: "http://example.com".to_string(),
        }));
        let fetcher = ArcGisElevationFetcher::new(client, DEFAULT_ELEVATION_URL).unwrap();

        let err = fetcher.fetch(TileAddress::new(7, 0, 1).unwrap()).await.unwrap_err();
        assert_eq!(err, ElevationError::Status(503));
    }

    #[test]
    fn test_parse_malformed_body() {
        assert!(matches!(
            parse_elevation_response(b"<html>oops</html>"),
            Err(ElevationError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_elevation_response(br#"{"rows": 81}"#),
            Err(ElevationError::MalformedResponse(_))
        ));
    }
}
