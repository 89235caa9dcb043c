//! Scope lifecycle states

use std::fmt;

/// Lifecycle state of a scope holder.
///
/// A holder moves `None → Initializing → Available → Disposing → None`;
/// a failed initialization short-cuts `Initializing → Disposing → None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ScopeState {
	/// No live instance
	#[default]
	None,
	/// Stage plan is running
	Initializing,
	/// Instance is published and readable
	Available,
	/// Children and dependencies are being torn down
	Disposing,
}

impl ScopeState {
	pub fn as_str(&self) -> &'static str {
		match self {
			ScopeState::None => "none",
			ScopeState::Initializing => "initializing",
			ScopeState::Available => "available",
			ScopeState::Disposing => "disposing",
		}
	}
}

impl fmt::Display for ScopeState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}
