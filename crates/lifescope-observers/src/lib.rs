//! # lifescope observers
//!
//! Ready-made [`ScopeObserver`](lifescope_core::ScopeObserver) implementations.
//!
//! - [`TracingObserver`] forwards every hook to `tracing`
//! - [`RecordingObserver`] keeps an in-memory event list, useful in tests
//!
//! ## Example
//!
//! ```
//! use lifescope_core::ScopeConfig;
//! use lifescope_observers::{RecordingObserver, TracingObserver};
//! use std::sync::Arc;
//!
//! let recorder = Arc::new(RecordingObserver::new());
//! let config = ScopeConfig::new()
//!     .with_observer(Arc::new(TracingObserver::new()))
//!     .with_observer(Arc::clone(&recorder));
//!
//! assert_eq!(config.observers().len(), 2);
//! assert!(recorder.is_empty());
//! ```

pub mod recording;
pub mod tracing_observer;

pub use recording::{RecordingObserver, ScopeEvent};
pub use tracing_observer::TracingObserver;
