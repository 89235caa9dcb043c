//! # lifescope dependency injection
//!
//! Scope-bounded dependency containers with staged async initialization,
//! rollback on failure and cascading teardown.
//!
//! ## Features
//!
//! - **Lazy**: [`Dep`] values are created on first read, at most once per
//!   container instance
//! - **Staged**: [`AsyncDep`] values are initialized along a [`StagePlan`],
//!   concurrently within a stage and strictly stage after stage
//! - **Unwinding**: a failed creation disposes exactly the dependencies that
//!   finished `init`, in reverse stage order, and leaves the holder at `None`
//! - **Cascading**: holders attached to a parent instance are torn down before
//!   any of the parent's own dependencies
//!
//! ## Example
//!
//! ```
//! use async_trait::async_trait;
//! use lifescope_core::DependencyError;
//! use lifescope_di::{AsyncDep, AsyncLifecycle, Dep, Scope, ScopeBuilder, ScopeHolder, StagePlan, stage_plan};
//!
//! struct Settings {
//!     url: String,
//! }
//!
//! struct Pool {
//!     url: String,
//! }
//!
//! #[async_trait]
//! impl AsyncLifecycle for Pool {
//!     async fn init(&self) -> Result<(), DependencyError> {
//!         // connect here
//!         Ok(())
//!     }
//! }
//!
//! struct AppScope {
//!     settings: Dep<Settings>,
//!     pool: AsyncDep<Pool>,
//! }
//!
//! impl Scope for AppScope {
//!     type Input = String;
//!
//!     fn build(url: String, scope: &mut ScopeBuilder) -> Self {
//!         let settings = scope.dep(move || Settings { url: url.clone() });
//!         let pool = scope.try_async_dep({
//!             let settings = settings.clone();
//!             move || settings.get().map(|s| Pool { url: s.url.clone() })
//!         });
//!         Self { settings, pool }
//!     }
//!
//!     fn stages(&self) -> StagePlan {
//!         stage_plan![[self.pool]]
//!     }
//! }
//!
//! # tokio_test::block_on(async {
//! let holder = ScopeHolder::<AppScope>::new();
//! let app = holder.create("postgres://localhost".into()).await.unwrap();
//! assert_eq!(app.pool.get().unwrap().url, "postgres://localhost");
//! holder.drop().await.unwrap();
//! # });
//! ```

pub mod container;
pub mod dependency;
pub mod holder;
pub mod lifecycle;
pub mod link;
pub mod plan;

mod registration;

pub use container::{HasInputData, HasParent, Scope, ScopeBuilder, ScopeModule, Scoped};
pub use dependency::{AsyncDep, Dep};
pub use holder::ScopeHolder;
pub use lifecycle::AsyncLifecycle;
pub use link::ParentLink;
pub use plan::{StageEntry, StagePlan};

pub use async_trait::async_trait;
