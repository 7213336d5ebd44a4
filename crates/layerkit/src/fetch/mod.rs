//! Data fetchers: turn a [`Data`](crate::model::Data) source into features.

mod csv;
mod geojson;
mod http;
mod registry;

pub use self::csv::{features_from_csv, CsvFetcher};
pub use geojson::{features_from_geojson, GeoJsonFetcher};
pub use http::{HttpClient, ReqwestClient};
pub use registry::{DataFetcher, FetcherRegistry, FnFetcher};

use crate::error::FetchError;
use crate::model::Data;

/// Raw source document: the inline value, or the body behind the URL.
pub(crate) enum Source {
    Inline(serde_json::Value),
    Body(Vec<u8>),
}

pub(crate) async fn load_source(http: &dyn HttpClient, data: &Data) -> Result<Source, FetchError> {
    if let Some(value) = &data.value {
        return Ok(Source::Inline(value.clone()));
    }
    match &data.url {
        Some(url) => Ok(Source::Body(http.get(url).await?)),
        None => Err(FetchError::MissingSource),
    }
}
