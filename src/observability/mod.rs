//! # Observability Infrastructure
//!
//! Lifecycle reporting for the configuration provider: the [`ReloadObserver`]
//! sink, a tracing and metrics backed implementation, and subscriber setup.

pub mod logging;
pub mod metrics;
pub mod observer;

pub use logging::init_logging;
pub use metrics::ProviderMetrics;
pub use observer::{ReloadObserver, SkipReason, TracingObserver};
