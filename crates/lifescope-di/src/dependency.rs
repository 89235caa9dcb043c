//! Dependency descriptors
//!
//! A descriptor wraps a factory and caches at most one value per container
//! instance. [`Dep`] values are created on first read. [`AsyncDep`] values
//! additionally go through an async [`AsyncLifecycle`] driven by the holder's
//! stage plan, and are readable only after their `init` completed (unless the
//! holder's access strategy says otherwise).

use crate::lifecycle::AsyncLifecycle;
use crate::plan::StageEntry;
use crate::registration::ScopeRegistration;
use async_trait::async_trait;
use lifescope_core::{
	Access, DepId, DependencyError, ObserverSet, Phase, ScopeError, ScopeResult, UsageError,
};
use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, ThreadId};

pub(crate) type Factory<T> = Box<dyn Fn() -> Result<T, DependencyError> + Send + Sync>;

enum Slot<T> {
	Empty,
	/// The factory is running on this thread.
	Building(ThreadId),
	Ready(Arc<T>),
}

impl<T> Slot<T> {
	fn value(&self) -> Option<Arc<T>> {
		match self {
			Slot::Ready(value) => Some(Arc::clone(value)),
			_ => None,
		}
	}
}

/// Publishes the factory outcome and wakes readers blocked on the build,
/// including when the factory unwinds.
struct BuildGuard<'a, T> {
	slot: &'a Mutex<Slot<T>>,
	built: &'a Condvar,
	value: Option<Arc<T>>,
}

impl<T> Drop for BuildGuard<'_, T> {
	fn drop(&mut self) {
		let mut slot = self.slot.lock();
		*slot = match self.value.take() {
			Some(value) => Slot::Ready(value),
			None => Slot::Empty,
		};
		self.built.notify_all();
	}
}

/// Shared state behind a [`Dep`] or [`AsyncDep`] handle.
pub(crate) struct DepCell<T> {
	id: DepId,
	factory: Factory<T>,
	lifecycle: bool,
	slot: Mutex<Slot<T>>,
	built: Condvar,
	initialized: AtomicBool,
	owner: Weak<ScopeRegistration>,
}

impl<T: Send + Sync + 'static> DepCell<T> {
	pub(crate) fn new(
		id: DepId,
		factory: Factory<T>,
		lifecycle: bool,
		owner: Weak<ScopeRegistration>,
	) -> Self {
		Self {
			id,
			factory,
			lifecycle,
			slot: Mutex::new(Slot::Empty),
			built: Condvar::new(),
			initialized: AtomicBool::new(false),
			owner,
		}
	}

	fn owner(&self) -> ScopeResult<Arc<ScopeRegistration>> {
		self.owner.upgrade().ok_or_else(|| {
			UsageError::Unregistered {
				dependency: self.id.clone(),
			}
			.into()
		})
	}

	/// Reads the value through the owner's access strategy.
	fn read(&self, requires_init: bool) -> ScopeResult<Arc<T>> {
		let owner = self.owner()?;
		owner.config().access().check(&Access {
			dependency: &self.id,
			registered: owner.is_registered(),
			requires_init,
			initialized: self.initialized.load(Ordering::Acquire),
		})?;
		self.fill(&owner.observers())
	}

	/// Returns the cached value, running the factory if the slot is empty.
	///
	/// The factory runs at most once at a time; concurrent readers block until
	/// it returns. Hooks run without the slot lock held. Factory failures are
	/// not cached; the next read retries.
	fn fill(&self, observers: &ObserverSet) -> ScopeResult<Arc<T>> {
		let current = thread::current().id();
		{
			let mut slot = self.slot.lock();
			loop {
				let builder = match &*slot {
					Slot::Ready(value) => return Ok(Arc::clone(value)),
					Slot::Building(builder) => *builder,
					Slot::Empty => break,
				};
				if builder == current {
					return Err(UsageError::ReentrantRead {
						dependency: self.id.clone(),
					}
					.into());
				}
				self.built.wait(&mut slot);
			}
			*slot = Slot::Building(current);
		}

		let mut guard = BuildGuard {
			slot: &self.slot,
			built: &self.built,
			value: None,
		};
		observers.notify(|o| o.on_dependency_create_start(&self.id));
		match (self.factory)() {
			Ok(value) => {
				let value = Arc::new(value);
				guard.value = Some(Arc::clone(&value));
				drop(guard);
				observers.notify(|o| o.on_dependency_created(&self.id));
				Ok(value)
			}
			Err(source) => {
				drop(guard);
				let err = ScopeError::dependency(self.id.clone(), Phase::Create, source);
				observers.notify(|o| o.on_dependency_create_failed(&self.id, &err));
				Err(err)
			}
		}
	}

	fn is_created(&self) -> bool {
		matches!(*self.slot.lock(), Slot::Ready(_))
	}

	fn is_initialized(&self) -> bool {
		self.initialized.load(Ordering::Acquire)
	}
}

/// Descriptor operations the holder drives during initialization and teardown.
#[async_trait]
pub(crate) trait LifecycleDependency: Send + Sync + 'static {
	fn id(&self) -> &DepId;

	/// Creates the value if needed and runs its async `init`.
	async fn init(&self) -> ScopeResult<()>;

	/// Runs the async `dispose` if `init` succeeded; failures are reported, not returned.
	async fn dispose(&self);
}

#[async_trait]
impl<T: AsyncLifecycle> LifecycleDependency for DepCell<T> {
	fn id(&self) -> &DepId {
		&self.id
	}

	async fn init(&self) -> ScopeResult<()> {
		let owner = self.owner()?;
		let observers = owner.observers();
		let value = self.fill(&observers)?;

		observers.notify(|o| o.on_dependency_init_start(&self.id));
		match value.init().await {
			Ok(()) => {
				self.initialized.store(true, Ordering::Release);
				observers.notify(|o| o.on_dependency_initialized(&self.id));
				Ok(())
			}
			Err(source) => {
				let err = ScopeError::dependency(self.id.clone(), Phase::Init, source);
				observers.notify(|o| o.on_dependency_init_failed(&self.id, &err));
				Err(err)
			}
		}
	}

	async fn dispose(&self) {
		if !self.initialized.swap(false, Ordering::AcqRel) {
			return;
		}
		let Some(value) = self.slot.lock().value() else {
			return;
		};
		let observers = self
			.owner
			.upgrade()
			.map(|owner| owner.observers())
			.unwrap_or_default();

		observers.notify(|o| o.on_dependency_dispose_start(&self.id));
		match value.dispose().await {
			Ok(()) => observers.notify(|o| o.on_dependency_disposed(&self.id)),
			Err(source) => {
				let err = ScopeError::dependency(self.id.clone(), Phase::Dispose, source);
				tracing::warn!(dependency = %self.id, error = %err, "dependency dispose failed");
				observers.notify(|o| o.on_dependency_dispose_failed(&self.id, &err));
			}
		}
	}
}

/// Type-erased view used to clear every declared descriptor on release.
pub(crate) trait ClearableDependency: Send + Sync + 'static {
	fn id(&self) -> &DepId;

	fn has_lifecycle(&self) -> bool;

	/// Empties the cache and resets the init flag.
	fn clear(&self, observers: &ObserverSet);
}

impl<T: Send + Sync + 'static> ClearableDependency for DepCell<T> {
	fn id(&self) -> &DepId {
		&self.id
	}

	fn has_lifecycle(&self) -> bool {
		self.lifecycle
	}

	fn clear(&self, observers: &ObserverSet) {
		let value = {
			let mut slot = self.slot.lock();
			if matches!(*slot, Slot::Ready(_)) {
				mem::replace(&mut *slot, Slot::Empty).value()
			} else {
				None
			}
		};
		self.initialized.store(false, Ordering::Release);
		if value.is_some() {
			observers.notify(|o| o.on_dependency_cleared(&self.id));
		}
	}
}

/// Lazily created, container-scoped dependency.
///
/// Declared through [`ScopeBuilder::dep`](crate::ScopeBuilder::dep). The factory
/// runs on the first [`get`](Dep::get) after the container is registered and
/// never again for that container instance. Handles are cheap to clone and can
/// be captured by the factories of later declarations.
///
/// # Examples
///
/// ```
/// use lifescope_di::{Dep, Scope, ScopeBuilder, ScopeHolder};
///
/// struct Settings {
///     retries: u32,
/// }
///
/// struct AppScope {
///     settings: Dep<Settings>,
/// }
///
/// impl Scope for AppScope {
///     type Input = ();
///
///     fn build(_input: (), scope: &mut ScopeBuilder) -> Self {
///         Self {
///             settings: scope.dep(|| Settings { retries: 3 }),
///         }
///     }
/// }
///
/// # tokio_test::block_on(async {
/// let holder = ScopeHolder::<AppScope>::new();
/// let app = holder.create(()).await.unwrap();
/// assert_eq!(app.settings.get().unwrap().retries, 3);
/// # });
/// ```
pub struct Dep<T> {
	cell: Arc<DepCell<T>>,
}

impl<T: Send + Sync + 'static> Dep<T> {
	pub(crate) fn new(cell: Arc<DepCell<T>>) -> Self {
		Self { cell }
	}

	/// Returns the value, creating it on first access.
	pub fn get(&self) -> ScopeResult<Arc<T>> {
		self.cell.read(false)
	}

	pub fn id(&self) -> &DepId {
		&self.cell.id
	}

	pub fn is_created(&self) -> bool {
		self.cell.is_created()
	}
}

impl<T> Clone for Dep<T> {
	fn clone(&self) -> Self {
		Self {
			cell: Arc::clone(&self.cell),
		}
	}
}

impl<T> fmt::Debug for Dep<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Dep").field(&self.cell.id).finish()
	}
}

/// Dependency with an async [`AsyncLifecycle`].
///
/// Every `AsyncDep` of a container must appear in exactly one stage of the
/// container's [`StagePlan`](crate::StagePlan).
pub struct AsyncDep<T> {
	cell: Arc<DepCell<T>>,
}

impl<T: AsyncLifecycle> AsyncDep<T> {
	pub(crate) fn new(cell: Arc<DepCell<T>>) -> Self {
		Self { cell }
	}

	/// Returns the value once its `init` completed.
	///
	/// Under the default access strategy a read before `init` fails with
	/// [`UsageError::NotInitialized`].
	pub fn get(&self) -> ScopeResult<Arc<T>> {
		self.cell.read(true)
	}

	pub fn id(&self) -> &DepId {
		&self.cell.id
	}

	pub fn is_created(&self) -> bool {
		self.cell.is_created()
	}

	pub fn is_initialized(&self) -> bool {
		self.cell.is_initialized()
	}

	/// Entry naming this dependency in a stage plan.
	pub fn stage_entry(&self) -> StageEntry {
		StageEntry::new(self.cell.clone())
	}
}

impl<T> Clone for AsyncDep<T> {
	fn clone(&self) -> Self {
		Self {
			cell: Arc::clone(&self.cell),
		}
	}
}

impl<T> fmt::Debug for AsyncDep<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("AsyncDep").field(&self.cell.id).finish()
	}
}
