//! Cascading teardown from a parent container to its child holders

use crate::registration::ScopeRegistration;
use futures::future::{BoxFuture, join_all};
use lifescope_core::{ScopeInfo, ScopeResult, UsageError};
use std::fmt;
use std::sync::{Arc, Weak};

/// Teardown callback registered by a child holder on its parent container.
pub(crate) type DisposeListener = Box<dyn FnOnce() -> BoxFuture<'static, ScopeResult<()>> + Send>;

/// Weak handle to a container instance that child holders attach to.
///
/// Obtained from [`ScopeBuilder::parent_link`](crate::ScopeBuilder::parent_link)
/// while the parent container is being built. Holders created with
/// [`ScopeHolder::child_of`](crate::ScopeHolder::child_of) are torn down before
/// any of the parent's own dependencies are disposed.
#[derive(Clone)]
pub struct ParentLink {
	registration: Weak<ScopeRegistration>,
	scope: ScopeInfo,
}

impl ParentLink {
	pub(crate) fn new(registration: &Arc<ScopeRegistration>) -> Self {
		Self {
			registration: Arc::downgrade(registration),
			scope: registration.info(),
		}
	}

	/// Parent container instance this link points at.
	pub fn scope(&self) -> ScopeInfo {
		self.scope
	}

	/// Whether the parent still accepts child holders.
	pub fn is_alive(&self) -> bool {
		self.registration
			.upgrade()
			.is_some_and(|registration| registration.accepts_listeners())
	}

	pub(crate) fn upgrade(&self) -> ScopeResult<Arc<ScopeRegistration>> {
		self.registration.upgrade().ok_or_else(|| {
			UsageError::ParentReleased { scope: self.scope }.into()
		})
	}
}

impl fmt::Debug for ParentLink {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ParentLink")
			.field("scope", &self.scope)
			.field("alive", &self.is_alive())
			.finish()
	}
}

/// Fires every child listener of `registration` concurrently and waits for all.
///
/// Failures are logged and reported to observers; they never stop the
/// parent's teardown.
pub(crate) async fn run_dispose_listeners(registration: &ScopeRegistration) {
	let listeners = registration.take_dispose_listeners();
	if listeners.is_empty() {
		return;
	}

	let info = registration.info();
	tracing::debug!(scope = %info, children = listeners.len(), "tearing down child scopes");
	let outcomes = join_all(listeners.into_iter().map(|listener| listener())).await;
	for err in outcomes.into_iter().filter_map(Result::err) {
		tracing::warn!(scope = %info, error = %err, "child scope teardown failed");
		registration
			.observers()
			.notify(|o| o.on_child_dispose_failed(&info, &err));
	}
}
