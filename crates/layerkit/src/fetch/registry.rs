use super::{CsvFetcher, GeoJsonFetcher, HttpClient};
use crate::error::FetchError;
use crate::model::{Data, DataType, Feature, Range};
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

/// Produces the features of one data format.
pub trait DataFetcher: Send + Sync {
    fn fetch<'a>(
        &'a self,
        data: &'a Data,
        range: Option<&'a Range>,
    ) -> BoxFuture<'a, Result<Vec<Feature>, FetchError>>;
}

/// Adapts a closure returning a future into a [`DataFetcher`].
pub struct FnFetcher<F> {
    f: F,
}

impl<F, Fut> FnFetcher<F>
where
    F: Fn(Data, Option<Range>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Vec<Feature>, FetchError>> + Send + 'static,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F, Fut> DataFetcher for FnFetcher<F>
where
    F: Fn(Data, Option<Range>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Vec<Feature>, FetchError>> + Send + 'static,
{
    fn fetch<'a>(
        &'a self,
        data: &'a Data,
        range: Option<&'a Range>,
    ) -> BoxFuture<'a, Result<Vec<Feature>, FetchError>> {
        Box::pin((self.f)(data.clone(), range.copied()))
    }
}

/// Fetchers by data type.
#[derive(Default, Clone)]
pub struct FetcherRegistry {
    fetchers: HashMap<DataType, Arc<dyn DataFetcher>>,
}

impl FetcherRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in GeoJSON and CSV fetchers.
    pub fn with_defaults(http: Arc<dyn HttpClient>) -> Self {
        let mut registry = Self::new();
        registry.register(DataType::GeoJson, GeoJsonFetcher::new(Arc::clone(&http)));
        registry.register(DataType::Csv, CsvFetcher::new(http));
        registry
    }

    /// Registers a fetcher, replacing any previous one for the type.
    pub fn register(&mut self, data_type: DataType, fetcher: impl DataFetcher + 'static) {
        self.fetchers.insert(data_type, Arc::new(fetcher));
    }

    /// The concrete type to dispatch on: `auto` is resolved from the URL's
    /// file extension.
    pub fn resolve_type(data: &Data) -> Result<DataType, FetchError> {
        if data.data_type != DataType::Auto {
            return Ok(data.data_type.clone());
        }
        data.url
            .as_deref()
            .and_then(DataType::from_url)
            .ok_or_else(|| FetchError::UnsupportedType(DataType::Auto.to_string()))
    }

    pub async fn fetch(
        &self,
        data: &Data,
        range: Option<&Range>,
    ) -> Result<Vec<Feature>, FetchError> {
        let data_type = Self::resolve_type(data)?;
        let fetcher = self
            .fetchers
            .get(&data_type)
            .ok_or_else(|| FetchError::UnsupportedType(data_type.to_string()))?;
        debug!(data_type = %data_type, url = ?data.url, range = ?range, "dispatching fetch");
        fetcher.fetch(data, range).await
    }
}
