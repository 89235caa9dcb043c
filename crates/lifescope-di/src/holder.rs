//! Scope holder state machine
//!
//! A [`ScopeHolder`] owns at most one live container instance and moves it
//! through `None → Initializing → Available → Disposing → None`.
//!
//! Conflicting calls are arbitrated strictly:
//!
//! - `create` while initializing or available fails with
//!   [`UsageError::AlreadyCreated`]
//! - `create` while disposing waits for the teardown and then proceeds; only
//!   one such waiter is allowed
//! - `create` on a child holder whose parent instance is being or has been
//!   torn down fails with [`UsageError::ParentReleased`]
//! - `drop` with no instance fails with [`UsageError::NotCreated`], and while
//!   disposing with [`UsageError::AlreadyDisposing`]
//! - `drop` while initializing waits for the creation to settle; only one such
//!   waiter is allowed
//!
//! Waiters are released through explicit handoffs set under the state lock,
//! so the woken call never races another caller for the transition it was
//! promised.

use crate::container::{Scope, ScopeBuilder, Scoped};
use crate::dependency::ClearableDependency;
use crate::link::{DisposeListener, ParentLink, run_dispose_listeners};
use crate::plan::StageEntry;
use crate::registration::{ListenerKey, ScopeRegistration};
use futures::FutureExt;
use futures::StreamExt;
use futures::future::join_all;
use futures::stream::FuturesUnordered;
use lifescope_core::{
	InvariantError, ScopeConfig, ScopeError, ScopeId, ScopeInfo, ScopeResult, ScopeState,
	UsageError, default_config,
};
use parking_lot::Mutex;
use std::fmt;
use std::sync::{Arc, Weak};
use tokio::sync::watch;

enum DropHandoff<S: Scope> {
	/// The awaited create succeeded; the waiter tears the instance down.
	Proceed(Arc<Scoped<S>>),
	/// The awaited create failed and the holder is back at `None`.
	CreateFailed,
}

enum CreateHandoff {
	/// The teardown finished and the holder is `Initializing` on the waiter's behalf.
	Proceed,
	/// The teardown finished but the parent instance no longer accepts children.
	ParentReleased(ScopeInfo),
}

struct Control<S: Scope> {
	state: ScopeState,
	instance: Option<Arc<Scoped<S>>>,
	create_waiter: bool,
	create_handoff: Option<CreateHandoff>,
	drop_waiter: bool,
	drop_handoff: Option<DropHandoff<S>>,
}

impl<S: Scope> Default for Control<S> {
	fn default() -> Self {
		Self {
			state: ScopeState::None,
			instance: None,
			create_waiter: false,
			create_handoff: None,
			drop_waiter: false,
			drop_handoff: None,
		}
	}
}

/// Dispose listener a child holder keeps on its parent instance.
struct ParentAttachment {
	registration: Weak<ScopeRegistration>,
	key: ListenerKey,
	scope: ScopeInfo,
}

struct HolderInner<S: Scope> {
	control: Mutex<Control<S>>,
	state_tx: watch::Sender<ScopeState>,
	instance_tx: watch::Sender<Option<Arc<Scoped<S>>>>,
	config: ScopeConfig,
	parent: Mutex<Option<ParentAttachment>>,
}

impl<S: Scope> HolderInner<S> {
	fn new(config: ScopeConfig) -> Self {
		Self {
			control: Mutex::new(Control::default()),
			state_tx: watch::Sender::new(ScopeState::None),
			instance_tx: watch::Sender::new(None),
			config,
			parent: Mutex::new(None),
		}
	}

	fn set_state(&self, control: &mut Control<S>, state: ScopeState) {
		let previous = control.state;
		control.state = state;
		tracing::debug!(scope = S::name(), from = %previous, to = %state, "scope state changed");
		self.state_tx.send_replace(state);
	}

	fn publish(&self, control: &mut Control<S>, instance: Arc<Scoped<S>>) {
		control.instance = Some(Arc::clone(&instance));
		self.set_state(control, ScopeState::Available);
		self.instance_tx.send_replace(Some(instance));
	}

	/// Returns the holder to `None` and releases whichever waiter is pending.
	fn settle_none(&self, control: &mut Control<S>) {
		control.instance = None;
		self.set_state(control, ScopeState::None);
		self.instance_tx.send_replace(None);

		if control.drop_waiter && control.drop_handoff.is_none() {
			control.drop_handoff = Some(DropHandoff::CreateFailed);
		}
		if control.create_waiter && control.create_handoff.is_none() {
			match self.released_parent() {
				Some(scope) => control.create_handoff = Some(CreateHandoff::ParentReleased(scope)),
				None => {
					control.create_handoff = Some(CreateHandoff::Proceed);
					self.set_state(control, ScopeState::Initializing);
				}
			}
		}
	}

	/// Parent instance this holder is attached to, once it stopped accepting children.
	fn released_parent(&self) -> Option<ScopeInfo> {
		let parent = self.parent.lock();
		let attachment = parent.as_ref()?;
		match attachment.registration.upgrade() {
			Some(registration) if registration.accepts_listeners() => None,
			_ => Some(attachment.scope),
		}
	}

	fn unexpected(&self, found: ScopeState, context: &'static str) -> ScopeError {
		InvariantError::UnexpectedState {
			scope: S::name(),
			found,
			context,
		}
		.into()
	}

	fn closed(&self, context: &'static str) -> ScopeError {
		InvariantError::ChannelClosed {
			scope: S::name(),
			context,
		}
		.into()
	}
}

impl<S: Scope> Drop for HolderInner<S> {
	fn drop(&mut self) {
		if let Some(attachment) = self.parent.get_mut().take() {
			if let Some(registration) = attachment.registration.upgrade() {
				registration.remove_dispose_listener(attachment.key);
			}
		}
	}
}

#[derive(Clone, Copy)]
enum Waiter {
	Create,
	Drop,
}

/// Withdraws a pending waiter if its future is dropped before the handoff is taken.
struct WaiterGuard<'a, S: Scope> {
	inner: &'a HolderInner<S>,
	waiter: Waiter,
	armed: bool,
}

impl<S: Scope> Drop for WaiterGuard<'_, S> {
	fn drop(&mut self) {
		if !self.armed {
			return;
		}
		let mut control = self.inner.control.lock();
		match self.waiter {
			Waiter::Create => {
				control.create_waiter = false;
				if let Some(CreateHandoff::Proceed) = control.create_handoff.take() {
					self.inner.settle_none(&mut control);
				}
			}
			Waiter::Drop => {
				control.drop_waiter = false;
				if let Some(DropHandoff::Proceed(instance)) = control.drop_handoff.take() {
					self.inner.publish(&mut control, instance);
				}
			}
		}
	}
}

/// Returns the holder to `None` if a `create` future is dropped mid-flight.
struct InitGuard<'a, S: Scope> {
	inner: &'a HolderInner<S>,
	armed: bool,
}

impl<S: Scope> Drop for InitGuard<'_, S> {
	fn drop(&mut self) {
		if !self.armed {
			return;
		}
		tracing::warn!(
			scope = S::name(),
			"scope creation was cancelled; dependencies initialized so far are not disposed"
		);
		let mut control = self.inner.control.lock();
		self.inner.settle_none(&mut control);
	}
}

enum DropStart<S: Scope> {
	Teardown(Arc<Scoped<S>>),
	Wait(watch::Receiver<ScopeState>),
}

/// Owns zero or one live instance of a [`Scope`] and drives its lifecycle.
///
/// Cloning a holder yields another handle to the same state machine.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use lifescope_core::{DependencyError, ScopeState};
/// use lifescope_di::{AsyncDep, AsyncLifecycle, Scope, ScopeBuilder, ScopeHolder, StagePlan, stage_plan};
///
/// struct Pool;
///
/// #[async_trait]
/// impl AsyncLifecycle for Pool {
///     async fn init(&self) -> Result<(), DependencyError> {
///         Ok(())
///     }
/// }
///
/// struct AppScope {
///     pool: AsyncDep<Pool>,
/// }
///
/// impl Scope for AppScope {
///     type Input = ();
///
///     fn build(_input: (), scope: &mut ScopeBuilder) -> Self {
///         Self {
///             pool: scope.async_dep(|| Pool),
///         }
///     }
///
///     fn stages(&self) -> StagePlan {
///         stage_plan![[self.pool]]
///     }
/// }
///
/// # tokio_test::block_on(async {
/// let holder = ScopeHolder::<AppScope>::new();
/// let app = holder.create(()).await.unwrap();
/// assert!(app.pool.get().is_ok());
///
/// holder.drop().await.unwrap();
/// assert_eq!(holder.state(), ScopeState::None);
/// assert!(app.pool.get().is_err());
/// # });
/// ```
pub struct ScopeHolder<S: Scope> {
	inner: Arc<HolderInner<S>>,
}

impl<S: Scope> ScopeHolder<S> {
	/// Creates a holder using a snapshot of the process-wide default config.
	pub fn new() -> Self {
		Self::with_config(default_config())
	}

	pub fn with_config(config: ScopeConfig) -> Self {
		Self {
			inner: Arc::new(HolderInner::new(config)),
		}
	}

	/// Creates a holder torn down whenever the linked parent instance is.
	///
	/// The holder inherits the parent's config.
	pub fn child_of(link: &ParentLink) -> ScopeResult<Self> {
		let registration = link.upgrade()?;
		let config = registration.config().clone();
		Self::child_of_registration(config, &registration)
	}

	pub fn child_of_with_config(link: &ParentLink, config: ScopeConfig) -> ScopeResult<Self> {
		let registration = link.upgrade()?;
		Self::child_of_registration(config, &registration)
	}

	fn child_of_registration(
		config: ScopeConfig,
		registration: &Arc<ScopeRegistration>,
	) -> ScopeResult<Self> {
		let holder = Self::with_config(config);
		if holder.attach(registration) {
			Ok(holder)
		} else {
			Err(UsageError::ParentReleased {
				scope: registration.info(),
			}
			.into())
		}
	}

	/// Used by [`ScopeBuilder::child`], whose registration is still open.
	pub(crate) fn attached(config: ScopeConfig, registration: &Arc<ScopeRegistration>) -> Self {
		let holder = Self::with_config(config);
		if !holder.attach(registration) {
			tracing::warn!(
				scope = S::name(),
				parent = %registration.info(),
				"parent no longer accepts children; holder is detached"
			);
		}
		holder
	}

	fn attach(&self, registration: &Arc<ScopeRegistration>) -> bool {
		let weak = Arc::downgrade(&self.inner);
		let listener: DisposeListener = Box::new(move || {
			async move {
				match weak.upgrade() {
					Some(inner) => ScopeHolder { inner }.drop_for_parent().await,
					None => Ok(()),
				}
			}
			.boxed()
		});
		match registration.add_dispose_listener(listener) {
			Some(key) => {
				*self.inner.parent.lock() = Some(ParentAttachment {
					registration: Arc::downgrade(registration),
					key,
					scope: registration.info(),
				});
				true
			}
			None => false,
		}
	}

	pub fn state(&self) -> ScopeState {
		self.inner.control.lock().state
	}

	/// Live instance, if the holder is available.
	pub fn current(&self) -> Option<Arc<Scoped<S>>> {
		self.inner.control.lock().instance.clone()
	}

	pub fn is_available(&self) -> bool {
		self.state() == ScopeState::Available
	}

	/// Receiver updated with the live instance on every transition to
	/// `Available` and with `None` on every transition to `None`.
	pub fn subscribe(&self) -> watch::Receiver<Option<Arc<Scoped<S>>>> {
		self.inner.instance_tx.subscribe()
	}

	/// Receiver updated on every state transition.
	pub fn state_changes(&self) -> watch::Receiver<ScopeState> {
		self.inner.state_tx.subscribe()
	}

	pub fn config(&self) -> &ScopeConfig {
		&self.inner.config
	}

	/// Builds a new container instance and runs its stage plan.
	///
	/// On failure every dependency that finished `init` is disposed in
	/// reverse stage order, the holder returns to `None`, and the first
	/// error raised is returned.
	///
	/// A child holder refuses to create once its parent instance has started
	/// tearing down, including a create queued behind the child's own teardown.
	pub async fn create(&self, input: S::Input) -> ScopeResult<Arc<Scoped<S>>> {
		self.begin_create().await?;
		let mut guard = InitGuard {
			inner: &self.inner,
			armed: true,
		};
		let result = self.initialize(input).await;
		guard.armed = false;
		result
	}

	/// Moves the holder to `Initializing`, waiting out a running teardown.
	async fn begin_create(&self) -> ScopeResult<()> {
		let mut rx = {
			let mut control = self.inner.control.lock();
			match control.state {
				ScopeState::None => {
					if let Some(scope) = self.inner.released_parent() {
						return Err(UsageError::ParentReleased { scope }.into());
					}
					self.inner.set_state(&mut control, ScopeState::Initializing);
					return Ok(());
				}
				state @ (ScopeState::Initializing | ScopeState::Available) => {
					return Err(UsageError::AlreadyCreated {
						scope: S::name(),
						state,
					}
					.into());
				}
				ScopeState::Disposing => {
					if let Some(scope) = self.inner.released_parent() {
						return Err(UsageError::ParentReleased { scope }.into());
					}
					if control.create_waiter {
						return Err(UsageError::WaiterPending {
							scope: S::name(),
							operation: "create",
						}
						.into());
					}
					control.create_waiter = true;
					self.inner.state_tx.subscribe()
				}
			}
		};

		let mut waiter = WaiterGuard {
			inner: &self.inner,
			waiter: Waiter::Create,
			armed: true,
		};
		loop {
			if rx.changed().await.is_err() {
				return Err(self.inner.closed("waiting for a teardown to finish"));
			}
			let mut control = self.inner.control.lock();
			let Some(handoff) = control.create_handoff.take() else {
				continue;
			};
			control.create_waiter = false;
			waiter.armed = false;
			if let CreateHandoff::ParentReleased(scope) = handoff {
				return Err(UsageError::ParentReleased { scope }.into());
			}
			if control.state != ScopeState::Initializing {
				return Err(self
					.inner
					.unexpected(control.state, "resuming a create queued behind a teardown"));
			}
			return Ok(());
		}
	}

	async fn initialize(&self, input: S::Input) -> ScopeResult<Arc<Scoped<S>>> {
		let info = ScopeInfo::new(ScopeId::next(), S::name());
		let observers = self.inner.config.observers().clone();
		observers.notify(|o| o.on_scope_create_start(&info));
		tracing::debug!(scope = %info, "creating scope");

		let registration = Arc::new(ScopeRegistration::new(info, self.inner.config.clone()));
		let mut builder = ScopeBuilder::new(Arc::clone(&registration));
		let container = S::build(input, &mut builder);
		let declared = builder.finish();
		registration.mark_registered();

		let plan = container.stages();
		if let Err(err) = plan.validate(info, &declared) {
			let err = ScopeError::from(err);
			self.rollback(&registration, &declared, &[], &err).await;
			return Err(err);
		}

		let stages = plan.into_stages();
		let mut completed = Vec::with_capacity(stages.len());
		for (index, stage) in stages.iter().enumerate() {
			tracing::debug!(scope = %info, stage = index, members = stage.len(), "running init stage");
			let (done, failure) = run_stage(stage).await;
			completed.push(done);
			if let Some(err) = failure {
				self.rollback(&registration, &declared, &completed, &err).await;
				return Err(err);
			}
		}

		let scoped = Arc::new(Scoped::new(container, registration, declared, stages));
		{
			let mut control = self.inner.control.lock();
			self.inner.publish(&mut control, Arc::clone(&scoped));
			if control.drop_waiter {
				control.instance = None;
				self.inner.set_state(&mut control, ScopeState::Disposing);
				control.drop_handoff = Some(DropHandoff::Proceed(Arc::clone(&scoped)));
			}
		}
		observers.notify(|o| o.on_scope_created(&info));
		tracing::debug!(scope = %info, "scope available");
		Ok(scoped)
	}

	/// Unwinds a failed creation and returns the holder to `None`.
	async fn rollback(
		&self,
		registration: &Arc<ScopeRegistration>,
		declared: &[Arc<dyn ClearableDependency>],
		completed: &[Vec<StageEntry>],
		err: &ScopeError,
	) {
		let info = registration.info();
		tracing::debug!(scope = %info, error = %err, "scope creation failed; rolling back");
		{
			let mut control = self.inner.control.lock();
			self.inner.set_state(&mut control, ScopeState::Disposing);
		}
		run_dispose_listeners(registration).await;
		dispose_stages(completed).await;
		release(registration, declared);
		{
			let mut control = self.inner.control.lock();
			self.inner.settle_none(&mut control);
		}
		self.inner
			.config
			.observers()
			.notify(|o| o.on_scope_create_failed(&info, err));
	}

	/// Tears down the live instance: child holders first, then every
	/// dependency in reverse stage order.
	///
	/// Called while initializing, waits for the creation to settle; if it
	/// failed, returns `Ok(())` without doing anything.
	pub async fn drop(&self) -> ScopeResult<()> {
		let start = {
			let mut control = self.inner.control.lock();
			match control.state {
				ScopeState::None => {
					return Err(UsageError::NotCreated { scope: S::name() }.into());
				}
				ScopeState::Disposing => {
					return Err(UsageError::AlreadyDisposing { scope: S::name() }.into());
				}
				ScopeState::Available => match control.instance.take() {
					Some(instance) => {
						self.inner.set_state(&mut control, ScopeState::Disposing);
						DropStart::Teardown(instance)
					}
					None => {
						return Err(self
							.inner
							.unexpected(ScopeState::Available, "taking the live instance for drop"));
					}
				},
				ScopeState::Initializing => {
					if control.drop_waiter {
						return Err(UsageError::WaiterPending {
							scope: S::name(),
							operation: "drop",
						}
						.into());
					}
					control.drop_waiter = true;
					DropStart::Wait(self.inner.state_tx.subscribe())
				}
			}
		};

		let instance = match start {
			DropStart::Teardown(instance) => instance,
			DropStart::Wait(rx) => match self.await_drop_handoff(rx).await? {
				DropHandoff::Proceed(instance) => instance,
				DropHandoff::CreateFailed => return Ok(()),
			},
		};
		self.teardown(instance).await;
		Ok(())
	}

	async fn await_drop_handoff(
		&self,
		mut rx: watch::Receiver<ScopeState>,
	) -> ScopeResult<DropHandoff<S>> {
		let mut waiter = WaiterGuard {
			inner: &self.inner,
			waiter: Waiter::Drop,
			armed: true,
		};
		loop {
			if rx.changed().await.is_err() {
				return Err(self.inner.closed("waiting for a creation to settle"));
			}
			let mut control = self.inner.control.lock();
			let Some(handoff) = control.drop_handoff.take() else {
				continue;
			};
			control.drop_waiter = false;
			waiter.armed = false;
			if matches!(handoff, DropHandoff::Proceed(_)) && control.state != ScopeState::Disposing {
				return Err(self
					.inner
					.unexpected(control.state, "resuming a drop queued behind a creation"));
			}
			return Ok(handoff);
		}
	}

	async fn teardown(&self, instance: Arc<Scoped<S>>) {
		let info = instance.info();
		let observers = self.inner.config.observers();
		observers.notify(|o| o.on_scope_dispose_start(&info));
		tracing::debug!(scope = %info, "disposing scope");

		run_dispose_listeners(&instance.registration).await;
		dispose_stages(&instance.stages).await;
		release(&instance.registration, &instance.declared);
		{
			let mut control = self.inner.control.lock();
			self.inner.settle_none(&mut control);
		}

		observers.notify(|o| o.on_scope_disposed(&info));
		tracing::debug!(scope = %info, "scope disposed");
	}

	/// Teardown requested by a parent instance being disposed.
	///
	/// Returns once the child is back at `None`. By then the parent no longer
	/// accepts children, so the child cannot leave `None` again.
	async fn drop_for_parent(&self) -> ScopeResult<()> {
		loop {
			// Subscribed before reading the state so no transition is missed.
			let mut rx = self.inner.state_tx.subscribe();
			match self.state() {
				ScopeState::None => return Ok(()),
				ScopeState::Disposing => {}
				ScopeState::Initializing | ScopeState::Available => match self.drop().await {
					Ok(()) | Err(ScopeError::Usage(UsageError::NotCreated { .. })) => continue,
					Err(ScopeError::Usage(
						UsageError::AlreadyDisposing { .. } | UsageError::WaiterPending { .. },
					)) => {}
					Err(err) => return Err(err),
				},
			}
			if rx.changed().await.is_err() {
				return Err(self.inner.closed("waiting for a child teardown"));
			}
		}
	}
}

impl<S: Scope> Clone for ScopeHolder<S> {
	fn clone(&self) -> Self {
		Self {
			inner: Arc::clone(&self.inner),
		}
	}
}

impl<S: Scope> Default for ScopeHolder<S> {
	fn default() -> Self {
		Self::new()
	}
}

impl<S: Scope> fmt::Debug for ScopeHolder<S> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ScopeHolder")
			.field("scope", &S::name())
			.field("state", &self.state())
			.finish()
	}
}

/// Runs every member of a stage concurrently.
///
/// Returns the members whose `init` succeeded and the first error in
/// completion order. Every member runs to completion either way.
async fn run_stage(stage: &[StageEntry]) -> (Vec<StageEntry>, Option<ScopeError>) {
	let mut pending: FuturesUnordered<_> = stage
		.iter()
		.map(|entry| async move { (entry, entry.dependency().init().await) })
		.collect();

	let mut done = Vec::with_capacity(stage.len());
	let mut first_error = None;
	while let Some((entry, outcome)) = pending.next().await {
		match outcome {
			Ok(()) => done.push(entry.clone()),
			Err(err) if first_error.is_none() => first_error = Some(err),
			Err(err) => {
				tracing::debug!(dependency = %entry.id(), error = %err, "additional init failure in stage");
			}
		}
	}
	(done, first_error)
}

/// Disposes stages in reverse order; members of one stage concurrently.
async fn dispose_stages(stages: &[Vec<StageEntry>]) {
	for stage in stages.iter().rev() {
		join_all(stage.iter().map(|entry| entry.dependency().dispose())).await;
	}
}

/// Revokes the registration, clears every cache (last declared first) and
/// detaches the instance from its observers.
fn release(
	registration: &ScopeRegistration,
	declared: &[Arc<dyn ClearableDependency>],
) {
	registration.revoke();
	let observers = registration.observers();
	for dependency in declared.iter().rev() {
		dependency.clear(&observers);
	}
	registration.detach_observers();
}
