//! Ready-made lifecycle observers.
//!
//! # Examples
//!
//! ```rust
//! use lifescope::ScopeConfig;
//! use lifescope::observers::TracingObserver;
//! use std::sync::Arc;
//!
//! let config = ScopeConfig::new().with_observer(Arc::new(TracingObserver::new()));
//! assert_eq!(config.observers().len(), 1);
//! ```

#[cfg(feature = "observers")]
pub use lifescope_observers::*;
