//! # lifescope core
//!
//! Shared building blocks for the lifescope runtime.
//!
//! ## Contents
//!
//! - **Identifiers**: [`ScopeId`], [`ScopeInfo`] and [`DepId`] name every scope
//!   instance and every declared dependency
//! - **Errors**: [`ScopeError`] separates caller misuse ([`UsageError`]), runtime
//!   defects ([`InvariantError`]) and failures raised by dependency callbacks
//! - **Observers**: [`ScopeObserver`] hooks and the [`ObserverSet`] that invokes them
//! - **Access strategies**: [`AccessStrategy`] decides whether a dependency value
//!   may be read
//! - **Configuration**: [`ScopeConfig`] plus the process-wide default used by
//!   holders that are built without an explicit config
//!
//! ## Example
//!
//! ```
//! use lifescope_core::{ScopeConfig, LenientAccess, default_config};
//!
//! let config = ScopeConfig::new().with_access(LenientAccess);
//! assert_eq!(config.observers().len(), 0);
//!
//! // Holders created without an explicit config snapshot this one
//! let _defaults = default_config();
//! ```

pub mod access;
pub mod config;
pub mod error;
pub mod id;
pub mod observer;
pub mod state;

pub use access::{Access, AccessStrategy, LenientAccess, StrictAccess};
pub use config::{ScopeConfig, default_config, reset_default_config, set_default_config};
pub use error::{DependencyError, InvariantError, Phase, ScopeError, ScopeResult, UsageError};
pub use id::{DepId, ScopeId, ScopeInfo};
pub use observer::{ObserverSet, ScopeObserver};
pub use state::ScopeState;
