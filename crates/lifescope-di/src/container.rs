//! Scope containers, modules and the builder that declares their dependencies

use crate::dependency::{AsyncDep, ClearableDependency, Dep, DepCell, Factory};
use crate::holder::ScopeHolder;
use crate::lifecycle::AsyncLifecycle;
use crate::link::ParentLink;
use crate::plan::{StageEntry, StagePlan};
use crate::registration::ScopeRegistration;
use lifescope_core::{DepId, DependencyError, ScopeId, ScopeInfo};
use std::any::type_name;
use std::convert::Infallible;
use std::fmt;
use std::ops::Deref;
use std::panic::Location;
use std::sync::Arc;

/// A container of dependencies with a shared lifecycle.
///
/// Implementors declare their dependencies in [`build`](Scope::build) and,
/// when they have async dependencies, order them in [`stages`](Scope::stages).
/// A [`ScopeHolder`] drives creation and teardown of container instances.
///
/// The optional construction inputs are expressed through [`Scope::Input`]:
/// `()` for a root container, an `Arc<Scoped<P>>` for a container living under
/// a parent, a data type, or a tuple of both. [`HasParent`] and
/// [`HasInputData`] expose them uniformly.
pub trait Scope: Send + Sync + Sized + 'static {
	type Input: Send + 'static;

	fn build(input: Self::Input, scope: &mut ScopeBuilder) -> Self;

	fn stages(&self) -> StagePlan {
		StagePlan::new()
	}

	/// Name used in logs, errors and observer callbacks.
	fn name() -> &'static str {
		type_name::<Self>()
	}
}

/// A named group of dependencies declared as part of an enclosing container.
///
/// Modules share the container's lifecycle; their dependencies are
/// initialized and torn down exactly as if the container declared them.
/// The module name only namespaces the dependency ids.
pub trait ScopeModule: Sized {
	fn build(scope: &mut ScopeBuilder) -> Self;
}

/// Container that lives under a parent container instance.
pub trait HasParent<P: Scope> {
	fn parent(&self) -> &Arc<Scoped<P>>;
}

/// Container built from caller-provided data.
pub trait HasInputData<D> {
	fn input_data(&self) -> &D;
}

/// Declares dependencies while a container is built.
pub struct ScopeBuilder {
	registration: Arc<ScopeRegistration>,
	module_path: Vec<&'static str>,
	declared: Vec<Arc<dyn ClearableDependency>>,
}

impl ScopeBuilder {
	pub(crate) fn new(registration: Arc<ScopeRegistration>) -> Self {
		Self {
			registration,
			module_path: Vec::new(),
			declared: Vec::new(),
		}
	}

	/// Declares a dependency created by an infallible factory.
	#[track_caller]
	pub fn dep<T, F>(&mut self, factory: F) -> Dep<T>
	where
		T: Send + Sync + 'static,
		F: Fn() -> T + Send + Sync + 'static,
	{
		let location = Location::caller();
		Dep::new(self.declare(
			location,
			false,
			boxed_factory(move || Ok::<T, Infallible>(factory())),
		))
	}

	/// Declares a dependency whose factory may fail.
	///
	/// The error is surfaced unmodified through
	/// [`ScopeError::dependency_source`](lifescope_core::ScopeError::dependency_source).
	#[track_caller]
	pub fn try_dep<T, E, F>(&mut self, factory: F) -> Dep<T>
	where
		T: Send + Sync + 'static,
		E: Into<DependencyError>,
		F: Fn() -> Result<T, E> + Send + Sync + 'static,
	{
		let location = Location::caller();
		Dep::new(self.declare(location, false, boxed_factory(factory)))
	}

	/// Declares a dependency with an async lifecycle.
	#[track_caller]
	pub fn async_dep<T, F>(&mut self, factory: F) -> AsyncDep<T>
	where
		T: AsyncLifecycle,
		F: Fn() -> T + Send + Sync + 'static,
	{
		let location = Location::caller();
		AsyncDep::new(self.declare(
			location,
			true,
			boxed_factory(move || Ok::<T, Infallible>(factory())),
		))
	}

	/// Declares a dependency with an async lifecycle whose factory may fail.
	#[track_caller]
	pub fn try_async_dep<T, E, F>(&mut self, factory: F) -> AsyncDep<T>
	where
		T: AsyncLifecycle,
		E: Into<DependencyError>,
		F: Fn() -> Result<T, E> + Send + Sync + 'static,
	{
		let location = Location::caller();
		AsyncDep::new(self.declare(location, true, boxed_factory(factory)))
	}

	/// Builds a module whose dependencies are namespaced under `name`.
	pub fn module<M: ScopeModule>(&mut self, name: &'static str) -> M {
		self.module_path.push(name);
		let module = M::build(self);
		self.module_path.pop();
		module
	}

	/// Handle child holders use to attach to the container being built.
	pub fn parent_link(&self) -> ParentLink {
		ParentLink::new(&self.registration)
	}

	/// Creates a holder that is torn down before this container's dependencies.
	///
	/// The child inherits the parent's observers and access strategy.
	pub fn child<C: Scope>(&self) -> ScopeHolder<C> {
		ScopeHolder::attached(self.registration.config().clone(), &self.registration)
	}

	/// Container instance being built.
	pub fn scope(&self) -> ScopeInfo {
		self.registration.info()
	}

	fn declare<T: Send + Sync + 'static>(
		&mut self,
		location: &'static Location<'static>,
		lifecycle: bool,
		factory: Factory<T>,
	) -> Arc<DepCell<T>> {
		let module = (!self.module_path.is_empty()).then(|| Arc::<str>::from(self.module_path.join("::")));
		let id = DepId::new(
			type_name::<T>(),
			location,
			module,
			self.registration.info().id,
			self.declared.len(),
		);
		let cell = Arc::new(DepCell::new(
			id,
			factory,
			lifecycle,
			Arc::downgrade(&self.registration),
		));
		self.declared.push(cell.clone());
		cell
	}

	pub(crate) fn finish(self) -> Vec<Arc<dyn ClearableDependency>> {
		self.declared
	}
}

impl fmt::Debug for ScopeBuilder {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ScopeBuilder")
			.field("scope", &self.registration.info())
			.field("module_path", &self.module_path)
			.field("declared", &self.declared.len())
			.finish()
	}
}

fn boxed_factory<T, E, F>(factory: F) -> Factory<T>
where
	E: Into<DependencyError>,
	F: Fn() -> Result<T, E> + Send + Sync + 'static,
{
	Box::new(move || factory().map_err(Into::into))
}

/// A live container instance published by a [`ScopeHolder`].
///
/// Dereferences to the container. Dependency reads fail with
/// [`UsageError::Unregistered`](lifescope_core::UsageError::Unregistered) once
/// the holder released the instance, even if the caller still holds it.
pub struct Scoped<S: Scope> {
	container: S,
	pub(crate) registration: Arc<ScopeRegistration>,
	pub(crate) declared: Vec<Arc<dyn ClearableDependency>>,
	pub(crate) stages: Vec<Vec<StageEntry>>,
}

impl<S: Scope> Scoped<S> {
	pub(crate) fn new(
		container: S,
		registration: Arc<ScopeRegistration>,
		declared: Vec<Arc<dyn ClearableDependency>>,
		stages: Vec<Vec<StageEntry>>,
	) -> Self {
		Self {
			container,
			registration,
			declared,
			stages,
		}
	}

	pub fn id(&self) -> ScopeId {
		self.registration.info().id
	}

	pub fn info(&self) -> ScopeInfo {
		self.registration.info()
	}

	/// Every declared dependency, in declaration order.
	pub fn dependency_ids(&self) -> Vec<DepId> {
		self.declared.iter().map(|dep| dep.id().clone()).collect()
	}

	/// Whether dependency reads are still accepted.
	pub fn is_registered(&self) -> bool {
		self.registration.is_registered()
	}
}

impl<S: Scope> Deref for Scoped<S> {
	type Target = S;

	fn deref(&self) -> &S {
		&self.container
	}
}

impl<S: Scope> fmt::Debug for Scoped<S> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Scoped")
			.field("scope", &self.registration.info())
			.field("registered", &self.registration.is_registered())
			.field("dependencies", &self.declared.len())
			.field("stages", &self.stages.len())
			.finish()
	}
}
