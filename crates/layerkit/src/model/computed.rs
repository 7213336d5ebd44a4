use super::{Appearance, AppearanceCategory, Appearances, Feature, Geometry, Layer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// A feature together with its resolved appearance values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputedFeature {
    #[serde(flatten)]
    pub feature: Feature,
    #[serde(flatten)]
    pub appearances: Appearances,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LayerStatus {
    Fetching,
    Ready,
    Error,
}

/// The render-ready value of a bound layer. Replaced, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputedLayer {
    pub id: String,
    pub layer: Layer,
    pub status: LayerStatus,
    pub original_features: Vec<Feature>,
    pub features: Vec<ComputedFeature>,
    /// Layer-level appearances, evaluated without a feature.
    #[serde(flatten)]
    pub appearances: Appearances,
    #[serde(skip)]
    index: HashMap<String, usize>,
    #[serde(skip)]
    original_index: HashMap<String, usize>,
}

impl ComputedLayer {
    pub fn new(
        layer: Layer,
        status: LayerStatus,
        original_features: Vec<Feature>,
        features: Vec<ComputedFeature>,
        appearances: Appearances,
    ) -> Self {
        let index = features
            .iter()
            .enumerate()
            .map(|(i, f)| (f.feature.id.clone(), i))
            .collect();
        let original_index = original_features
            .iter()
            .enumerate()
            .map(|(i, f)| (f.id.clone(), i))
            .collect();
        Self {
            id: layer.id().to_string(),
            layer,
            status,
            original_features,
            features,
            appearances,
            index,
            original_index,
        }
    }

    /// A view of the computed feature with this id.
    pub fn feature(&self, id: &str) -> Option<FeatureView<'_>> {
        self.index.get(id).map(|&index| FeatureView {
            layer: self,
            index,
        })
    }

    pub fn feature_views(&self) -> impl Iterator<Item = FeatureView<'_>> {
        (0..self.features.len()).map(move |index| FeatureView { layer: self, index })
    }
}

/// Borrowed accessor for one feature of a [`ComputedLayer`].
#[derive(Debug, Clone, Copy)]
pub struct FeatureView<'a> {
    layer: &'a ComputedLayer,
    index: usize,
}

impl<'a> FeatureView<'a> {
    fn computed(&self) -> &'a ComputedFeature {
        &self.layer.features[self.index]
    }

    pub fn id(&self) -> &'a str {
        &self.computed().feature.id
    }

    pub fn properties(&self) -> &'a Map<String, Value> {
        &self.computed().feature.properties
    }

    pub fn property(&self, name: &str) -> Option<&'a Value> {
        self.properties().get(name)
    }

    pub fn geometry(&self) -> Option<&'a Geometry> {
        self.computed().feature.geometry.as_ref()
    }

    pub fn appearance(&self, category: AppearanceCategory) -> Option<&'a Appearance> {
        self.computed().appearances.get(category)
    }

    /// The feature as fetched, before styling.
    pub fn original(&self) -> Option<&'a Feature> {
        self.layer
            .original_index
            .get(self.id())
            .map(|&i| &self.layer.original_features[i])
    }

    pub fn computed_feature(&self) -> &'a ComputedFeature {
        self.computed()
    }
}
