//! In-memory observer
//!
//! [`RecordingObserver`] stores every hook invocation as a [`ScopeEvent`] so
//! the sequence can be inspected afterwards. Errors are kept as their
//! rendered message.

use lifescope_core::{DepId, ScopeError, ScopeInfo, ScopeObserver};
use parking_lot::Mutex;

/// One observed lifecycle hook.
#[derive(Debug, Clone, PartialEq)]
pub enum ScopeEvent {
	CreateStart(DepId),
	Created(DepId),
	CreateFailed { dependency: DepId, error: String },
	InitStart(DepId),
	Initialized(DepId),
	InitFailed { dependency: DepId, error: String },
	DisposeStart(DepId),
	Disposed(DepId),
	DisposeFailed { dependency: DepId, error: String },
	Cleared(DepId),
	ScopeCreateStart(ScopeInfo),
	ScopeCreated(ScopeInfo),
	ScopeCreateFailed { scope: ScopeInfo, error: String },
	ScopeDisposeStart(ScopeInfo),
	ScopeDisposed(ScopeInfo),
	ChildDisposeFailed { scope: ScopeInfo, error: String },
}

impl ScopeEvent {
	/// Short name of the hook that produced this event.
	pub fn kind(&self) -> &'static str {
		match self {
			Self::CreateStart(_) => "create_start",
			Self::Created(_) => "created",
			Self::CreateFailed { .. } => "create_failed",
			Self::InitStart(_) => "init_start",
			Self::Initialized(_) => "initialized",
			Self::InitFailed { .. } => "init_failed",
			Self::DisposeStart(_) => "dispose_start",
			Self::Disposed(_) => "disposed",
			Self::DisposeFailed { .. } => "dispose_failed",
			Self::Cleared(_) => "cleared",
			Self::ScopeCreateStart(_) => "scope_create_start",
			Self::ScopeCreated(_) => "scope_created",
			Self::ScopeCreateFailed { .. } => "scope_create_failed",
			Self::ScopeDisposeStart(_) => "scope_dispose_start",
			Self::ScopeDisposed(_) => "scope_disposed",
			Self::ChildDisposeFailed { .. } => "child_dispose_failed",
		}
	}

	/// The dependency this event is about, if any.
	pub fn dependency(&self) -> Option<&DepId> {
		match self {
			Self::CreateStart(id)
			| Self::Created(id)
			| Self::InitStart(id)
			| Self::Initialized(id)
			| Self::DisposeStart(id)
			| Self::Disposed(id)
			| Self::Cleared(id) => Some(id),
			Self::CreateFailed { dependency, .. }
			| Self::InitFailed { dependency, .. }
			| Self::DisposeFailed { dependency, .. } => Some(dependency),
			_ => None,
		}
	}

	/// The rendered error for failure events.
	pub fn error(&self) -> Option<&str> {
		match self {
			Self::CreateFailed { error, .. }
			| Self::InitFailed { error, .. }
			| Self::DisposeFailed { error, .. }
			| Self::ScopeCreateFailed { error, .. }
			| Self::ChildDisposeFailed { error, .. } => Some(error),
			_ => None,
		}
	}
}

/// Observer that appends every hook to an in-memory list.
#[derive(Debug, Default)]
pub struct RecordingObserver {
	events: Mutex<Vec<ScopeEvent>>,
}

impl RecordingObserver {
	pub fn new() -> Self {
		Self::default()
	}

	/// Snapshot of the recorded events in arrival order.
	pub fn events(&self) -> Vec<ScopeEvent> {
		self.events.lock().clone()
	}

	/// Hook names of the recorded events in arrival order.
	pub fn kinds(&self) -> Vec<&'static str> {
		self.events.lock().iter().map(ScopeEvent::kind).collect()
	}

	/// Events concerning a single dependency.
	pub fn events_for(&self, dependency: &DepId) -> Vec<ScopeEvent> {
		self.events
			.lock()
			.iter()
			.filter(|event| event.dependency() == Some(dependency))
			.cloned()
			.collect()
	}

	pub fn len(&self) -> usize {
		self.events.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.events.lock().is_empty()
	}

	pub fn clear(&self) {
		self.events.lock().clear();
	}

	fn record(&self, event: ScopeEvent) {
		self.events.lock().push(event);
	}
}

impl ScopeObserver for RecordingObserver {
	fn on_dependency_create_start(&self, dependency: &DepId) {
		self.record(ScopeEvent::CreateStart(dependency.clone()));
	}

	fn on_dependency_created(&self, dependency: &DepId) {
		self.record(ScopeEvent::Created(dependency.clone()));
	}

	fn on_dependency_create_failed(&self, dependency: &DepId, error: &ScopeError) {
		self.record(ScopeEvent::CreateFailed {
			dependency: dependency.clone(),
			error: error.to_string(),
		});
	}

	fn on_dependency_init_start(&self, dependency: &DepId) {
		self.record(ScopeEvent::InitStart(dependency.clone()));
	}

	fn on_dependency_initialized(&self, dependency: &DepId) {
		self.record(ScopeEvent::Initialized(dependency.clone()));
	}

	fn on_dependency_init_failed(&self, dependency: &DepId, error: &ScopeError) {
		self.record(ScopeEvent::InitFailed {
			dependency: dependency.clone(),
			error: error.to_string(),
		});
	}

	fn on_dependency_dispose_start(&self, dependency: &DepId) {
		self.record(ScopeEvent::DisposeStart(dependency.clone()));
	}

	fn on_dependency_disposed(&self, dependency: &DepId) {
		self.record(ScopeEvent::Disposed(dependency.clone()));
	}

	fn on_dependency_dispose_failed(&self, dependency: &DepId, error: &ScopeError) {
		self.record(ScopeEvent::DisposeFailed {
			dependency: dependency.clone(),
			error: error.to_string(),
		});
	}

	fn on_dependency_cleared(&self, dependency: &DepId) {
		self.record(ScopeEvent::Cleared(dependency.clone()));
	}

	fn on_scope_create_start(&self, scope: &ScopeInfo) {
		self.record(ScopeEvent::ScopeCreateStart(*scope));
	}

	fn on_scope_created(&self, scope: &ScopeInfo) {
		self.record(ScopeEvent::ScopeCreated(*scope));
	}

	fn on_scope_create_failed(&self, scope: &ScopeInfo, error: &ScopeError) {
		self.record(ScopeEvent::ScopeCreateFailed {
			scope: *scope,
			error: error.to_string(),
		});
	}

	fn on_scope_dispose_start(&self, scope: &ScopeInfo) {
		self.record(ScopeEvent::ScopeDisposeStart(*scope));
	}

	fn on_scope_disposed(&self, scope: &ScopeInfo) {
		self.record(ScopeEvent::ScopeDisposed(*scope));
	}

	fn on_child_dispose_failed(&self, scope: &ScopeInfo, error: &ScopeError) {
		self.record(ScopeEvent::ChildDisposeFailed {
			scope: *scope,
			error: error.to_string(),
		});
	}
}
