//! The per-layer compute pipeline.
//!
//! [`LayerPipeline`] holds the state of one bound layer and applies
//! [`Command`]s to it. Every mutating command ends by publishing a fresh
//! [`ComputedLayer`](crate::model::ComputedLayer) on a `watch` channel.
//! [`PipelineHandle`] runs a pipeline on its own task and feeds it commands
//! in submission order.

mod command;
mod handle;
mod layer_pipeline;

pub use command::Command;
pub use handle::PipelineHandle;
pub use layer_pipeline::{ComputedLayerReceiver, LayerPipeline, StatusTransition};
