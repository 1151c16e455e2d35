//! Per-level tile layers.
//!
//! A [`SubLayer`] owns the resident tiles of one pyramid level and keeps that
//! set in step with what the camera needs.

mod sublayer;

pub(crate) use sublayer::destroy_layer;
pub use sublayer::{ReconcileStats, SubLayer, TileSources};
