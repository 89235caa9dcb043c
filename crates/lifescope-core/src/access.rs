//! Access strategies for dependency reads
//!
//! A descriptor consults its scope's [`AccessStrategy`] before handing out a
//! value. The strategy sees the facts of the access and may refuse it; the
//! lazy single-slot cache itself is not customizable.

use crate::error::UsageError;
use crate::id::DepId;

/// Facts about a single dependency read.
#[derive(Debug, Clone, Copy)]
pub struct Access<'a> {
	/// Dependency being read
	pub dependency: &'a DepId,
	/// Whether the owning scope is currently registered
	pub registered: bool,
	/// Whether the dependency has an async lifecycle
	pub requires_init: bool,
	/// Whether the async initialization has completed
	pub initialized: bool,
}

/// Decides whether a dependency read may proceed.
///
/// # Examples
///
/// ```
/// use lifescope_core::{Access, AccessStrategy, UsageError};
///
/// /// Refuses every read of a dependency declared under the `legacy` module.
/// struct NoLegacy;
///
/// impl AccessStrategy for NoLegacy {
///     fn check(&self, access: &Access<'_>) -> Result<(), UsageError> {
///         if !access.registered || access.dependency.module() == Some("legacy") {
///             return Err(UsageError::Unregistered {
///                 dependency: access.dependency.clone(),
///             });
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait AccessStrategy: Send + Sync + 'static {
	fn check(&self, access: &Access<'_>) -> Result<(), UsageError>;
}

/// Default strategy.
///
/// Refuses reads on unregistered scopes and reads of async dependencies
/// whose initialization has not completed.
#[derive(Debug, Clone, Copy, Default)]
pub struct StrictAccess;

impl AccessStrategy for StrictAccess {
	fn check(&self, access: &Access<'_>) -> Result<(), UsageError> {
		if !access.registered {
			return Err(UsageError::Unregistered {
				dependency: access.dependency.clone(),
			});
		}
		if access.requires_init && !access.initialized {
			return Err(UsageError::NotInitialized {
				dependency: access.dependency.clone(),
			});
		}
		Ok(())
	}
}

/// Lets async dependencies be read before their initialization runs.
///
/// The value is still created lazily through its factory. Reads on
/// unregistered scopes are refused exactly as with [`StrictAccess`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LenientAccess;

impl AccessStrategy for LenientAccess {
	fn check(&self, access: &Access<'_>) -> Result<(), UsageError> {
		if !access.registered {
			return Err(UsageError::Unregistered {
				dependency: access.dependency.clone(),
			});
		}
		Ok(())
	}
}
