//! Holder configuration and the process-wide default
//!
//! Every holder captures a [`ScopeConfig`] when it is constructed. Holders built
//! without an explicit config snapshot the process-wide default, so changing the
//! default later never affects holders that already exist.

use crate::access::{AccessStrategy, StrictAccess};
use crate::observer::{ObserverSet, ScopeObserver};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

/// Observers and access strategy applied to a holder's instances.
///
/// # Examples
///
/// ```
/// use lifescope_core::{LenientAccess, ScopeConfig};
///
/// let config = ScopeConfig::new().with_access(LenientAccess);
/// assert!(config.observers().is_empty());
/// ```
#[derive(Clone)]
pub struct ScopeConfig {
	observers: ObserverSet,
	access: Arc<dyn AccessStrategy>,
}

impl ScopeConfig {
	/// Creates a config with no observers and [`StrictAccess`].
	pub fn new() -> Self {
		Self {
			observers: ObserverSet::default(),
			access: Arc::new(StrictAccess),
		}
	}

	pub fn with_observer<O: ScopeObserver>(mut self, observer: Arc<O>) -> Self {
		self.observers = self.observers.with(observer);
		self
	}

	pub fn with_observers(mut self, observers: ObserverSet) -> Self {
		self.observers = observers;
		self
	}

	pub fn with_access<A: AccessStrategy>(mut self, access: A) -> Self {
		self.access = Arc::new(access);
		self
	}

	pub fn observers(&self) -> &ObserverSet {
		&self.observers
	}

	pub fn access(&self) -> &Arc<dyn AccessStrategy> {
		&self.access
	}
}

impl Default for ScopeConfig {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Debug for ScopeConfig {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ScopeConfig")
			.field("observers", &self.observers)
			.finish_non_exhaustive()
	}
}

static DEFAULT_CONFIG: Lazy<RwLock<ScopeConfig>> = Lazy::new(|| RwLock::new(ScopeConfig::new()));

/// Returns a snapshot of the process-wide default config.
pub fn default_config() -> ScopeConfig {
	DEFAULT_CONFIG.read().clone()
}

/// Replaces the process-wide default config, returning the previous one.
///
/// Only holders constructed afterwards pick up the new value.
pub fn set_default_config(config: ScopeConfig) -> ScopeConfig {
	std::mem::replace(&mut *DEFAULT_CONFIG.write(), config)
}

/// Restores the process-wide default to [`ScopeConfig::new`].
pub fn reset_default_config() {
	*DEFAULT_CONFIG.write() = ScopeConfig::new();
}
