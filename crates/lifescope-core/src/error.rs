//! Error taxonomy for scope lifecycles

use crate::id::{DepId, ScopeInfo};
use crate::state::ScopeState;
use std::error::Error as StdError;
use std::fmt;

/// Error type returned by dependency factories and lifecycle callbacks.
pub type DependencyError = Box<dyn StdError + Send + Sync + 'static>;

/// Result alias used throughout lifescope.
pub type ScopeResult<T> = Result<T, ScopeError>;

/// Lifecycle phase in which a dependency callback failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
	/// The factory producing the value
	Create,
	/// The async initialization callback
	Init,
	/// The async teardown callback
	Dispose,
}

impl fmt::Display for Phase {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Phase::Create => write!(f, "create"),
			Phase::Init => write!(f, "init"),
			Phase::Dispose => write!(f, "dispose"),
		}
	}
}

/// Caller misuse of a holder or dependency.
#[derive(Debug, thiserror::Error)]
pub enum UsageError {
	/// `create` was called while an instance is initializing or live
	#[error("scope `{scope}` is already {state}; drop it before creating it again")]
	AlreadyCreated {
		scope: &'static str,
		state: ScopeState,
	},

	/// `drop` was called with no instance to drop
	#[error("scope `{scope}` has no live instance to drop")]
	NotCreated { scope: &'static str },

	/// `drop` was called while a disposal is already running
	#[error("scope `{scope}` is already being disposed")]
	AlreadyDisposing { scope: &'static str },

	/// A second call tried to queue behind an in-flight transition
	#[error("another `{operation}` call is already waiting on scope `{scope}`")]
	WaiterPending {
		scope: &'static str,
		operation: &'static str,
	},

	/// The dependency's scope was never registered or has been disposed
	#[error("dependency `{dependency}` is not registered with a live scope")]
	Unregistered { dependency: DepId },

	/// An async dependency was read before its initialization completed
	#[error("dependency `{dependency}` was accessed before its async initialization completed")]
	NotInitialized { dependency: DepId },

	/// A dependency was read again while its own factory was running
	#[error("dependency `{dependency}` was read while its factory was still running")]
	ReentrantRead { dependency: DepId },

	/// A stage plan named a dependency declared by another scope
	#[error("dependency `{dependency}` does not belong to scope {scope}")]
	ForeignDependency { dependency: DepId, scope: ScopeInfo },

	/// A stage plan named the same dependency twice
	#[error("dependency `{dependency}` appears more than once in the stage plan")]
	DuplicateStageEntry { dependency: DepId },

	/// An async dependency was left out of the stage plan
	#[error("dependency `{dependency}` has an async lifecycle but is missing from the stage plan")]
	MissingFromPlan { dependency: DepId },

	/// A child holder was attached to, or created under, a parent scope that is already gone
	#[error("parent scope {scope} has been released; child scopes cannot outlive it")]
	ParentReleased { scope: ScopeInfo },
}

/// A state the runtime considers unreachable was observed.
///
/// These indicate a defect in lifescope itself rather than caller misuse.
#[derive(Debug, thiserror::Error)]
pub enum InvariantError {
	#[error("scope `{scope}` was in state `{found}` while {context}")]
	UnexpectedState {
		scope: &'static str,
		found: ScopeState,
		context: &'static str,
	},

	#[error("state channel of scope `{scope}` closed while {context}")]
	ChannelClosed {
		scope: &'static str,
		context: &'static str,
	},
}

/// Errors produced by scope holders and dependency descriptors.
#[derive(Debug, thiserror::Error)]
pub enum ScopeError {
	#[error(transparent)]
	Usage(#[from] UsageError),

	#[error(transparent)]
	Invariant(#[from] InvariantError),

	/// A factory or lifecycle callback failed; `source` is the original error
	#[error("dependency `{dependency}` failed during {phase}: {source}")]
	Dependency {
		dependency: DepId,
		phase: Phase,
		#[source]
		source: DependencyError,
	},
}

impl ScopeError {
	pub fn dependency(dependency: DepId, phase: Phase, source: DependencyError) -> Self {
		Self::Dependency {
			dependency,
			phase,
			source,
		}
	}

	pub fn is_usage(&self) -> bool {
		matches!(self, Self::Usage(_))
	}

	pub fn is_invariant(&self) -> bool {
		matches!(self, Self::Invariant(_))
	}

	pub fn is_dependency(&self) -> bool {
		matches!(self, Self::Dependency { .. })
	}

	pub fn as_usage(&self) -> Option<&UsageError> {
		match self {
			Self::Usage(err) => Some(err),
			_ => None,
		}
	}

	/// Phase and dependency of a callback failure.
	pub fn failed_dependency(&self) -> Option<(&DepId, Phase)> {
		match self {
			Self::Dependency {
				dependency, phase, ..
			} => Some((dependency, *phase)),
			_ => None,
		}
	}

	/// Borrows the error raised by the failing callback, unmodified.
	pub fn dependency_source(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
		match self {
			Self::Dependency { source, .. } => Some(source.as_ref()),
			_ => None,
		}
	}

	/// Takes back the error raised by the failing callback.
	pub fn into_dependency_source(self) -> Option<DependencyError> {
		match self {
			Self::Dependency { source, .. } => Some(source),
			_ => None,
		}
	}
}
