//! layerkit - turns declarative map layers into render-ready values.
//!
//! A [`Layer`](model::Layer) names a data source and describes each
//! appearance category (marker, polygon, ...) with literal values or style
//! expressions. The engine fetches the source through a shared
//! [`FeatureCache`], evaluates the expressions per feature with a
//! [`StyleEvaluator`], merges runtime overrides and publishes a
//! [`ComputedLayer`](model::ComputedLayer) that is replaced whenever its
//! inputs settle.
//!
//! ```no_run
//! use layerkit::pipeline::Command;
//! use layerkit::{Engine, EngineConfig};
//!
//! # async fn run(layer: layerkit::model::Layer) -> Result<(), Box<dyn std::error::Error>> {
//! let engine = Engine::with_default_fetchers(EngineConfig::default())?;
//! let handle = engine.spawn_pipeline();
//! handle.apply(Command::SetLayer(Some(layer))).await?;
//! if let Some(computed) = handle.settled().await? {
//!     println!("{} features", computed.features.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod style;

pub use cache::FeatureCache;
pub use config::EngineConfig;
pub use error::{ConfigError, FetchError, PipelineError};
pub use fetch::FetcherRegistry;
pub use pipeline::{Command, LayerPipeline, PipelineHandle};
pub use style::StyleEvaluator;

use fetch::ReqwestClient;
use layerkit_expression::ExpressionCache;
use std::sync::Arc;

/// Shared state for any number of layer pipelines: one feature cache, one
/// expression compile cache, one configuration.
pub struct Engine {
    config: EngineConfig,
    cache: Arc<FeatureCache>,
    expressions: Arc<ExpressionCache>,
}

impl Engine {
    pub fn new(config: EngineConfig, registry: FetcherRegistry) -> Self {
        Self {
            config,
            cache: Arc::new(FeatureCache::new(Arc::new(registry))),
            expressions: Arc::new(ExpressionCache::new()),
        }
    }

    /// Engine with the built-in fetchers over a `reqwest` HTTP client.
    pub fn with_default_fetchers(config: EngineConfig) -> Result<Self, FetchError> {
        let http = Arc::new(ReqwestClient::new(&config.fetch)?);
        Ok(Self::new(config, FetcherRegistry::with_defaults(http)))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<FeatureCache> {
        &self.cache
    }

    pub fn expressions(&self) -> &Arc<ExpressionCache> {
        &self.expressions
    }

    /// A new unbound pipeline sharing this engine's caches.
    pub fn pipeline(&self) -> LayerPipeline {
        let evaluator = StyleEvaluator::new(
            Arc::clone(&self.expressions),
            self.config.expression.defines.clone(),
        );
        LayerPipeline::new(Arc::clone(&self.cache), evaluator)
            .with_delegated_types(self.config.pipeline.delegated_types.iter().cloned())
    }

    /// Like [`pipeline`](Self::pipeline), running on its own task.
    pub fn spawn_pipeline(&self) -> PipelineHandle {
        PipelineHandle::spawn(self.pipeline())
    }
}
