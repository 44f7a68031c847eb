//! HTTP middleware applied to the whole router.

mod metrics;

pub use metrics::metrics_layer;
