//! Lifecycle observers
//!
//! Observers receive a callback around every dependency creation,
//! initialization, disposal and every scope transition. They are purely
//! diagnostic: nothing they do changes a lifecycle outcome. A panicking
//! observer is contained and logged, and the remaining observers still run.

use crate::error::ScopeError;
use crate::id::{DepId, ScopeInfo};
use std::any::Any;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

/// Hooks fired around dependency and scope lifecycle events.
///
/// Every hook has an empty default so implementors only override what they
/// need. Per dependency the order is: create-start, created or create-failed,
/// then for async dependencies init-start, initialized or init-failed, then
/// dispose-start, disposed or dispose-failed, and finally cleared.
#[allow(unused_variables)]
pub trait ScopeObserver: Send + Sync + 'static {
	fn on_dependency_create_start(&self, dependency: &DepId) {}
	fn on_dependency_created(&self, dependency: &DepId) {}
	fn on_dependency_create_failed(&self, dependency: &DepId, error: &ScopeError) {}

	fn on_dependency_init_start(&self, dependency: &DepId) {}
	fn on_dependency_initialized(&self, dependency: &DepId) {}
	fn on_dependency_init_failed(&self, dependency: &DepId, error: &ScopeError) {}

	fn on_dependency_dispose_start(&self, dependency: &DepId) {}
	fn on_dependency_disposed(&self, dependency: &DepId) {}
	fn on_dependency_dispose_failed(&self, dependency: &DepId, error: &ScopeError) {}

	fn on_dependency_cleared(&self, dependency: &DepId) {}

	fn on_scope_create_start(&self, scope: &ScopeInfo) {}
	fn on_scope_created(&self, scope: &ScopeInfo) {}
	fn on_scope_create_failed(&self, scope: &ScopeInfo, error: &ScopeError) {}

	fn on_scope_dispose_start(&self, scope: &ScopeInfo) {}
	fn on_scope_disposed(&self, scope: &ScopeInfo) {}

	/// A cascading child teardown failed; the parent's disposal continues.
	fn on_child_dispose_failed(&self, scope: &ScopeInfo, error: &ScopeError) {}
}

/// Ordered, cheaply clonable set of observers.
#[derive(Clone, Default)]
pub struct ObserverSet {
	observers: Arc<Vec<Arc<dyn ScopeObserver>>>,
}

impl ObserverSet {
	pub fn new(observers: Vec<Arc<dyn ScopeObserver>>) -> Self {
		Self {
			observers: Arc::new(observers),
		}
	}

	pub fn len(&self) -> usize {
		self.observers.len()
	}

	pub fn is_empty(&self) -> bool {
		self.observers.is_empty()
	}

	/// Returns a new set with `observer` appended.
	pub fn with(&self, observer: Arc<dyn ScopeObserver>) -> Self {
		let mut observers = self.observers.as_ref().clone();
		observers.push(observer);
		Self::new(observers)
	}

	/// Invokes `hook` on every observer in registration order.
	///
	/// A panic raised by one observer is caught and logged; the remaining
	/// observers are still notified.
	pub fn notify(&self, hook: impl Fn(&dyn ScopeObserver)) {
		for observer in self.observers.iter() {
			let outcome = catch_unwind(AssertUnwindSafe(|| hook(observer.as_ref())));
			if let Err(payload) = outcome {
				tracing::warn!(
					panic = %panic_message(payload.as_ref()),
					"scope observer panicked; lifecycle continues"
				);
			}
		}
	}
}

impl fmt::Debug for ObserverSet {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ObserverSet")
			.field("len", &self.observers.len())
			.finish()
	}
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
	if let Some(message) = payload.downcast_ref::<&'static str>() {
		message
	} else if let Some(message) = payload.downcast_ref::<String>() {
		message.as_str()
	} else {
		"<non-string panic payload>"
	}
}
