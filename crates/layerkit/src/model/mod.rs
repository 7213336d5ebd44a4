//! Layer, feature and computed-value types.

mod computed;
mod data;
mod feature;
mod layer;
mod range;

pub use computed::{ComputedFeature, ComputedLayer, FeatureView, LayerStatus};
pub use data::{ColumnRef, CsvOptions, Data, DataType};
pub use feature::{Feature, Geometry};
pub use layer::{Appearance, AppearanceCategory, Appearances, GroupLayer, Layer, SimpleLayer};
pub use range::Range;
