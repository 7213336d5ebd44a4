use super::Command;
use crate::cache::{source_key, FeatureCache};
use crate::error::PipelineError;
use crate::fetch::FetcherRegistry;
use crate::model::{
    Appearances, ComputedFeature, ComputedLayer, Data, DataType, Feature, Layer, LayerStatus,
    Range,
};
use crate::style::{merge_overrides, StyleEvaluator};
use indexmap::IndexMap;
use layerkit_util::deep_equal_ignoring;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tracing::{debug, warn};

const EVENT_CAPACITY: usize = 64;

pub type ComputedLayerReceiver = watch::Receiver<Option<Arc<ComputedLayer>>>;

/// A change of the bound layer's status. `from` is `None` for the first
/// status after a layer is bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusTransition {
    pub layer_id: String,
    pub from: Option<LayerStatus>,
    pub to: LayerStatus,
}

/// State of one bound layer.
///
/// Commands mutate the state and then call [`recompute`](Self::recompute)
/// or publish directly. Readers only ever see whole [`ComputedLayer`]
/// values through the `watch` channel.
pub struct LayerPipeline {
    cache: Arc<FeatureCache>,
    evaluator: StyleEvaluator,

    layer: Option<Layer>,
    status: Option<LayerStatus>,
    delegated: HashSet<DataType>,
    overrides: Appearances,

    original_features: Vec<Feature>,
    computed_features: Vec<ComputedFeature>,
    layer_appearances: Appearances,
    /// Inline GeoJSON value the cached features were produced from.
    last_inline_value: Option<Value>,

    output: watch::Sender<Option<Arc<ComputedLayer>>>,
    events: broadcast::Sender<StatusTransition>,
}

impl LayerPipeline {
    pub fn new(cache: Arc<FeatureCache>, evaluator: StyleEvaluator) -> Self {
        let (output, _) = watch::channel(None);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            cache,
            evaluator,
            layer: None,
            status: None,
            delegated: HashSet::new(),
            overrides: Appearances::default(),
            original_features: Vec::new(),
            computed_features: Vec::new(),
            layer_appearances: Appearances::default(),
            last_inline_value: None,
            output,
            events,
        }
    }

    pub fn with_delegated_types(mut self, types: impl IntoIterator<Item = DataType>) -> Self {
        self.delegated = types.into_iter().collect();
        self
    }

    pub fn layer(&self) -> Option<&Layer> {
        self.layer.as_ref()
    }

    pub fn status(&self) -> Option<LayerStatus> {
        self.status
    }

    /// The last published value.
    pub fn current(&self) -> Option<Arc<ComputedLayer>> {
        self.output.borrow().clone()
    }

    pub fn subscribe(&self) -> ComputedLayerReceiver {
        self.output.subscribe()
    }

    pub fn events(&self) -> broadcast::Receiver<StatusTransition> {
        self.events.subscribe()
    }

    pub(crate) fn event_sender(&self) -> broadcast::Sender<StatusTransition> {
        self.events.clone()
    }

    pub async fn apply(&mut self, command: Command) -> Result<(), PipelineError> {
        debug!(command = command.name(), "applying command");
        match command {
            Command::SetLayer(layer) => self.set_layer(layer).await,
            Command::RequestFetch(range) => self.request_fetch(range).await,
            Command::WriteFeatures(features) => self.write_features(features).await,
            Command::WriteComputedFeatures { features, computed } => {
                self.write_computed_features(features, computed)
            }
            Command::DeleteFeatures(ids) => self.delete_features(ids).await,
            Command::Override(overrides) => {
                self.set_overrides(overrides);
                Ok(())
            }
            Command::UpdateDelegatedDataTypes(types) => {
                self.update_delegated_data_types(types).await
            }
        }
    }

    pub async fn set_layer(&mut self, layer: Option<Layer>) -> Result<(), PipelineError> {
        let rebound = match (&self.layer, &layer) {
            (Some(prev), Some(next)) => prev.id() != next.id() || prev.data() != next.data(),
            _ => true,
        };
        if rebound {
            self.clear_features();
        }
        if layer.is_none() {
            self.status = None;
        }
        self.layer = layer;
        self.recompute().await
    }

    /// Brings the computed value up to date with the bound layer, fetching
    /// through the cache when the cached features cannot be trusted.
    pub async fn recompute(&mut self) -> Result<(), PipelineError> {
        let Some(layer) = self.layer.clone() else {
            self.clear_features();
            self.output.send_replace(None);
            return Ok(());
        };

        let data = match layer.data() {
            Some(data) if !self.is_delegated(data) => data.clone(),
            _ => {
                self.clear_features();
                self.layer_appearances = self.evaluator.evaluate_layer(&layer, None);
                self.settle(LayerStatus::Ready);
                return Ok(());
            }
        };

        if data.has_source() && self.should_fetch(&data, layer.id()) {
            self.settle(LayerStatus::Fetching);
            if let Err(err) = self.cache.fetch(&data, None, layer.id()).await {
                self.settle(LayerStatus::Error);
                return Err(err.into());
            }
            self.last_inline_value = data.value.clone();
        }

        self.evaluate_from_cache(&layer, &data);
        self.settle(LayerStatus::Ready);
        Ok(())
    }

    pub async fn request_fetch(&mut self, range: Range) -> Result<(), PipelineError> {
        let (layer, data) = self.bound_data()?;
        if self.is_delegated(&data) {
            debug!(layer = %layer.id(), %range, "ignoring fetch request for delegated data");
            return Ok(());
        }
        self.settle(LayerStatus::Fetching);
        if let Err(err) = self.cache.fetch(&data, Some(&range), layer.id()).await {
            self.settle(LayerStatus::Error);
            return Err(err.into());
        }
        self.evaluate_from_cache(&layer, &data);
        self.settle(LayerStatus::Ready);
        Ok(())
    }

    pub async fn write_features(&mut self, features: Vec<Feature>) -> Result<(), PipelineError> {
        let (layer, data) = self.bound_data()?;
        let key = source_key(&data, layer.id());
        for (range_key, features) in group_by_range(features) {
            self.cache.set(&key, &range_key, features);
        }
        self.recompute().await
    }

    /// Appends externally computed features. The raw features replace their
    /// range slots in the cache, as with [`Self::write_features`].
    pub fn write_computed_features(
        &mut self,
        features: Vec<Feature>,
        computed: Vec<ComputedFeature>,
    ) -> Result<(), PipelineError> {
        let (layer, data) = self.bound_data()?;
        if !self.is_delegated(&data) {
            return Err(PipelineError::NotDelegated(data.data_type.to_string()));
        }
        let key = source_key(&data, layer.id());
        for (range_key, features) in group_by_range(features) {
            self.cache.set(&key, &range_key, features);
        }

        self.layer_appearances = self.evaluator.evaluate_layer(&layer, None);
        self.original_features
            .extend(computed.iter().map(|c| c.feature.clone()));
        self.computed_features.extend(computed);
        self.settle(LayerStatus::Ready);
        Ok(())
    }

    pub async fn delete_features(&mut self, ids: Vec<String>) -> Result<(), PipelineError> {
        let (layer, data) = self.bound_data()?;
        let changed = self.cache.delete_all(&source_key(&data, layer.id()), &ids);
        if self.is_delegated(&data) {
            // Delegated features live only in the appended lists.
            let ids: HashSet<&str> = ids.iter().map(String::as_str).collect();
            self.original_features.retain(|f| !ids.contains(f.id.as_str()));
            self.computed_features
                .retain(|f| !ids.contains(f.feature.id.as_str()));
            self.publish();
            return Ok(());
        }
        debug!(layer = %layer.id(), changed, "deleted features");
        self.recompute().await
    }

    pub fn set_overrides(&mut self, overrides: Option<Map<String, Value>>) {
        self.overrides = overrides
            .as_ref()
            .map(Appearances::from_map)
            .unwrap_or_default();
        self.publish();
    }

    pub async fn update_delegated_data_types(
        &mut self,
        types: Vec<DataType>,
    ) -> Result<(), PipelineError> {
        self.delegated = types.into_iter().collect();
        self.recompute().await
    }

    fn bound_data(&self) -> Result<(Layer, Data), PipelineError> {
        let layer = self.layer.clone().ok_or(PipelineError::NoData)?;
        let data = layer.data().cloned().ok_or(PipelineError::NoData)?;
        Ok((layer, data))
    }

    fn is_delegated(&self, data: &Data) -> bool {
        if self.delegated.contains(&data.data_type) {
            return true;
        }
        FetcherRegistry::resolve_type(data).is_ok_and(|t| self.delegated.contains(&t))
    }

    /// Whether the cached features of `data` must be refreshed.
    ///
    /// URL data is trusted once any slot exists. Inline GeoJSON is trusted
    /// while it equals, ignoring `id` keys, the value the slot was fetched
    /// from. Other inline data is always refreshed.
    fn should_fetch(&self, data: &Data, layer_id: &str) -> bool {
        if self.cache.get_all(&source_key(data, layer_id)).is_none() {
            return true;
        }
        if data.is_content_addressed() {
            return false;
        }
        match (&data.data_type, &data.value, &self.last_inline_value) {
            (DataType::GeoJson, Some(value), Some(prev)) => {
                !deep_equal_ignoring(value, prev, &["id"])
            }
            _ => true,
        }
    }

    fn evaluate_from_cache(&mut self, layer: &Layer, data: &Data) {
        let originals: Vec<Feature> = self
            .cache
            .get_all(&source_key(data, layer.id()))
            .unwrap_or_default()
            .iter()
            .flat_map(|slot| slot.iter().cloned())
            .collect();
        self.computed_features = originals
            .iter()
            .map(|feature| ComputedFeature {
                feature: feature.clone(),
                appearances: self.evaluator.evaluate_layer(layer, Some(feature)),
            })
            .collect();
        self.original_features = originals;
        self.layer_appearances = self.evaluator.evaluate_layer(layer, None);
    }

    fn clear_features(&mut self) {
        self.original_features.clear();
        self.computed_features.clear();
        self.layer_appearances = Appearances::default();
    }

    /// Records `status` and publishes. A transition event is sent only when
    /// the status actually changes.
    fn settle(&mut self, status: LayerStatus) {
        if self.status != Some(status) {
            let from = self.status.replace(status);
            let layer_id = self
                .layer
                .as_ref()
                .map(|l| l.id().to_string())
                .unwrap_or_default();
            debug!(layer = %layer_id, ?from, to = ?status, "status transition");
            if status == LayerStatus::Error {
                warn!(layer = %layer_id, "layer entered error status");
            }
            // No receivers is fine.
            let _ = self.events.send(StatusTransition {
                layer_id,
                from,
                to: status,
            });
        }
        self.publish();
    }

    fn publish(&self) {
        let Some(layer) = &self.layer else {
            self.output.send_replace(None);
            return;
        };
        let features = self
            .computed_features
            .iter()
            .map(|f| ComputedFeature {
                feature: f.feature.clone(),
                appearances: merge_overrides(&f.appearances, &self.overrides),
            })
            .collect();
        let computed = ComputedLayer::new(
            layer.clone(),
            self.status.unwrap_or(LayerStatus::Fetching),
            self.original_features.clone(),
            features,
            merge_overrides(&self.layer_appearances, &self.overrides),
        );
        self.output.send_replace(Some(Arc::new(computed)));
    }
}

fn group_by_range(features: Vec<Feature>) -> IndexMap<String, Vec<Feature>> {
    let mut groups: IndexMap<String, Vec<Feature>> = IndexMap::new();
    for feature in features {
        groups
            .entry(Range::key(feature.range.as_ref()))
            .or_default()
            .push(feature);
    }
    groups
}
