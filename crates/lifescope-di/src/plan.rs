//! Staged initialization plans

use crate::dependency::{ClearableDependency, LifecycleDependency};
use lifescope_core::{DepId, ScopeInfo, UsageError};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// A dependency named in a [`StagePlan`].
///
/// Obtained from [`AsyncDep::stage_entry`](crate::AsyncDep::stage_entry).
#[derive(Clone)]
pub struct StageEntry {
	dependency: Arc<dyn LifecycleDependency>,
}

impl StageEntry {
	pub(crate) fn new(dependency: Arc<dyn LifecycleDependency>) -> Self {
		Self { dependency }
	}

	pub fn id(&self) -> &DepId {
		self.dependency.id()
	}

	pub(crate) fn dependency(&self) -> &dyn LifecycleDependency {
		self.dependency.as_ref()
	}
}

impl fmt::Debug for StageEntry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("StageEntry").field(self.id()).finish()
	}
}

/// Ordered initialization stages of a container.
///
/// Members of one stage initialize concurrently; a stage starts only after
/// every member of the previous stage resolved. Teardown walks the stages in
/// reverse. Every async dependency the container declares must appear in
/// exactly one stage.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use lifescope_di::{AsyncDep, AsyncLifecycle, Scope, ScopeBuilder, StagePlan, stage_plan};
///
/// struct Pool;
/// struct Cache;
/// struct Search;
///
/// #[async_trait]
/// impl AsyncLifecycle for Pool {}
/// #[async_trait]
/// impl AsyncLifecycle for Cache {}
/// #[async_trait]
/// impl AsyncLifecycle for Search {}
///
/// struct AppScope {
///     pool: AsyncDep<Pool>,
///     cache: AsyncDep<Cache>,
///     search: AsyncDep<Search>,
/// }
///
/// impl Scope for AppScope {
///     type Input = ();
///
///     fn build(_input: (), scope: &mut ScopeBuilder) -> Self {
///         Self {
///             pool: scope.async_dep(|| Pool),
///             cache: scope.async_dep(|| Cache),
///             search: scope.async_dep(|| Search),
///         }
///     }
///
///     fn stages(&self) -> StagePlan {
///         // pool and cache start together, search waits for both
///         stage_plan![[self.pool, self.cache], [self.search]]
///     }
/// }
/// ```
#[derive(Clone, Default)]
pub struct StagePlan {
	stages: Vec<Vec<StageEntry>>,
}

impl StagePlan {
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends a stage.
	pub fn stage<I>(mut self, entries: I) -> Self
	where
		I: IntoIterator<Item = StageEntry>,
	{
		self.stages.push(entries.into_iter().collect());
		self
	}

	pub fn len(&self) -> usize {
		self.stages.len()
	}

	pub fn is_empty(&self) -> bool {
		self.stages.is_empty()
	}

	/// Dependency ids per stage, in declaration order.
	pub fn stage_ids(&self) -> Vec<Vec<DepId>> {
		self.stages
			.iter()
			.map(|stage| stage.iter().map(|entry| entry.id().clone()).collect())
			.collect()
	}

	/// Checks the plan against the dependencies declared by `scope`.
	pub(crate) fn validate(
		&self,
		scope: ScopeInfo,
		declared: &[Arc<dyn ClearableDependency>],
	) -> Result<(), UsageError> {
		let mut seen = HashSet::new();
		for entry in self.stages.iter().flatten() {
			if entry.id().scope() != scope.id {
				return Err(UsageError::ForeignDependency {
					dependency: entry.id().clone(),
					scope,
				});
			}
			if !seen.insert(entry.id().clone()) {
				return Err(UsageError::DuplicateStageEntry {
					dependency: entry.id().clone(),
				});
			}
		}

		match declared
			.iter()
			.find(|dep| dep.has_lifecycle() && !seen.contains(dep.id()))
		{
			Some(missing) => Err(UsageError::MissingFromPlan {
				dependency: missing.id().clone(),
			}),
			None => Ok(()),
		}
	}

	pub(crate) fn into_stages(self) -> Vec<Vec<StageEntry>> {
		self.stages
	}
}

impl fmt::Debug for StagePlan {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_list().entries(self.stages.iter()).finish()
	}
}

/// Builds a [`StagePlan`] from bracketed groups of [`AsyncDep`](crate::AsyncDep)s.
///
/// `stage_plan![[a, b], [c]]` is shorthand for
/// `StagePlan::new().stage([a.stage_entry(), b.stage_entry()]).stage([c.stage_entry()])`.
#[macro_export]
macro_rules! stage_plan {
	($([$($dep:expr),* $(,)?]),* $(,)?) => {
		$crate::StagePlan::new()$(.stage([$($dep.stage_entry()),*]))*
	};
}
