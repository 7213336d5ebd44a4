use crate::model::{ComputedFeature, DataType, Feature, Layer, Range};
use serde_json::{Map, Value};

/// The complete write surface of a [`LayerPipeline`](super::LayerPipeline).
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Binds a layer, or unbinds with `None`.
    SetLayer(Option<Layer>),
    /// Fetches one range of the bound layer's data.
    RequestFetch(Range),
    /// Writes features into the cache, grouped by their range.
    WriteFeatures(Vec<Feature>),
    /// Appends features computed by an external producer. Only valid for
    /// delegated data types.
    WriteComputedFeatures {
        features: Vec<Feature>,
        computed: Vec<ComputedFeature>,
    },
    DeleteFeatures(Vec<String>),
    /// Replaces the override map. Keys that are not appearance categories
    /// are dropped.
    Override(Option<Map<String, Value>>),
    UpdateDelegatedDataTypes(Vec<DataType>),
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::SetLayer(_) => "setLayer",
            Command::RequestFetch(_) => "requestFetch",
            Command::WriteFeatures(_) => "writeFeatures",
            Command::WriteComputedFeatures { .. } => "writeComputedFeatures",
            Command::DeleteFeatures(_) => "deleteFeatures",
            Command::Override(_) => "override",
            Command::UpdateDelegatedDataTypes(_) => "updateDelegatedDataTypes",
        }
    }
}
