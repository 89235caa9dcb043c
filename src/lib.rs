//! # lifescope
//!
//! Scope-bounded dependency lifecycles for async Rust.
//!
//! A *scope* is a container of dependencies whose lifetime is tied to a
//! runtime event such as a login session or an open document. A
//! [`ScopeHolder`] creates the scope, runs the async initialization of its
//! dependencies stage by stage, hands out the live instance and later tears
//! it down in reverse order. Child scopes attached to a parent are torn down
//! before the parent's own dependencies.
//!
//! ## Feature Flags
//!
//! - `minimal` - identifiers, errors, observers and configuration plus the
//!   holder runtime (`di`)
//! - `full` (default) - everything in `minimal` plus ready-made observers
//! - `di` - dependency descriptors, scope containers and holders
//! - `observers` - [`TracingObserver`](observers::TracingObserver) and
//!   [`RecordingObserver`](observers::RecordingObserver)
//!
//! ## Quick Example
//!
//! ```rust
//! use lifescope::prelude::*;
//!
//! struct Pool;
//!
//! #[async_trait]
//! impl AsyncLifecycle for Pool {
//!     async fn init(&self) -> Result<(), DependencyError> {
//!         Ok(())
//!     }
//! }
//!
//! struct Session {
//!     user: Dep<String>,
//!     pool: AsyncDep<Pool>,
//! }
//!
//! impl Scope for Session {
//!     type Input = String;
//!
//!     fn build(user: String, scope: &mut ScopeBuilder) -> Self {
//!         Self {
//!             user: scope.dep(move || user.clone()),
//!             pool: scope.async_dep(|| Pool),
//!         }
//!     }
//!
//!     fn stages(&self) -> StagePlan {
//!         stage_plan![[self.pool]]
//!     }
//! }
//!
//! # tokio_test::block_on(async {
//! let holder = ScopeHolder::<Session>::new();
//! let session = holder.create("alice".to_string()).await?;
//! assert_eq!(*session.user.get()?, "alice");
//! assert!(session.pool.is_initialized());
//!
//! holder.drop().await?;
//! assert_eq!(holder.state(), ScopeState::None);
//! # Ok::<(), ScopeError>(())
//! # }).unwrap();
//! ```

pub mod core;
#[cfg(feature = "di")]
pub mod di;
#[cfg(feature = "observers")]
pub mod observers;

pub use lifescope_core::{
	AccessStrategy, DepId, DependencyError, InvariantError, LenientAccess, Phase, ScopeConfig,
	ScopeError, ScopeId, ScopeInfo, ScopeObserver, ScopeResult, ScopeState, StrictAccess,
	UsageError, default_config, reset_default_config, set_default_config,
};

#[cfg(feature = "di")]
pub use lifescope_di::{
	AsyncDep, AsyncLifecycle, Dep, HasInputData, HasParent, ParentLink, Scope, ScopeBuilder,
	ScopeHolder, ScopeModule, Scoped, StageEntry, StagePlan, async_trait, stage_plan,
};

/// Everything needed to declare and drive scopes.
pub mod prelude {
	pub use crate::{
		DependencyError, ScopeConfig, ScopeError, ScopeObserver, ScopeResult, ScopeState,
	};

	#[cfg(feature = "di")]
	pub use crate::{
		AsyncDep, AsyncLifecycle, Dep, HasInputData, HasParent, ParentLink, Scope, ScopeBuilder,
		ScopeHolder, ScopeModule, Scoped, StagePlan, async_trait, stage_plan,
	};
}
