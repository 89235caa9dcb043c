//! Observer that forwards lifecycle hooks to `tracing`

use lifescope_core::{DepId, ScopeError, ScopeInfo, ScopeObserver};
use tracing::Level;

macro_rules! emit {
	($level:expr, $($arg:tt)+) => {{
		let level = $level;
		if level == Level::ERROR {
			tracing::error!($($arg)+)
		} else if level == Level::WARN {
			tracing::warn!($($arg)+)
		} else if level == Level::INFO {
			tracing::info!($($arg)+)
		} else if level == Level::DEBUG {
			tracing::debug!($($arg)+)
		} else {
			tracing::trace!($($arg)+)
		}
	}};
}

/// Emits one `tracing` event per hook.
///
/// Successful transitions are logged at the configured level (`DEBUG` by
/// default). Failures are always logged at `WARN` with the error attached.
#[derive(Debug, Clone, Copy)]
pub struct TracingObserver {
	level: Level,
}

impl TracingObserver {
	pub fn new() -> Self {
		Self {
			level: Level::DEBUG,
		}
	}

	/// Sets the level used for hooks that do not report a failure.
	pub fn with_level(mut self, level: Level) -> Self {
		self.level = level;
		self
	}

	pub fn level(&self) -> Level {
		self.level
	}

	fn dependency(&self, dependency: &DepId, message: &'static str) {
		emit!(
			self.level,
			dependency = %dependency,
			scope = %dependency.scope(),
			"{message}"
		);
	}

	fn scope(&self, scope: &ScopeInfo, message: &'static str) {
		emit!(self.level, scope = %scope, "{message}");
	}
}

impl Default for TracingObserver {
	fn default() -> Self {
		Self::new()
	}
}

impl ScopeObserver for TracingObserver {
	fn on_dependency_create_start(&self, dependency: &DepId) {
		self.dependency(dependency, "creating dependency");
	}

	fn on_dependency_created(&self, dependency: &DepId) {
		self.dependency(dependency, "dependency created");
	}

	fn on_dependency_create_failed(&self, dependency: &DepId, error: &ScopeError) {
		tracing::warn!(dependency = %dependency, error = %error, "dependency creation failed");
	}

	fn on_dependency_init_start(&self, dependency: &DepId) {
		self.dependency(dependency, "initializing dependency");
	}

	fn on_dependency_initialized(&self, dependency: &DepId) {
		self.dependency(dependency, "dependency initialized");
	}

	fn on_dependency_init_failed(&self, dependency: &DepId, error: &ScopeError) {
		tracing::warn!(dependency = %dependency, error = %error, "dependency initialization failed");
	}

	fn on_dependency_dispose_start(&self, dependency: &DepId) {
		self.dependency(dependency, "disposing dependency");
	}

	fn on_dependency_disposed(&self, dependency: &DepId) {
		self.dependency(dependency, "dependency disposed");
	}

	fn on_dependency_dispose_failed(&self, dependency: &DepId, error: &ScopeError) {
		tracing::warn!(dependency = %dependency, error = %error, "dependency disposal failed");
	}

	fn on_dependency_cleared(&self, dependency: &DepId) {
		self.dependency(dependency, "dependency cleared");
	}

	fn on_scope_create_start(&self, scope: &ScopeInfo) {
		self.scope(scope, "scope creation started");
	}

	fn on_scope_created(&self, scope: &ScopeInfo) {
		self.scope(scope, "scope created");
	}

	fn on_scope_create_failed(&self, scope: &ScopeInfo, error: &ScopeError) {
		tracing::warn!(scope = %scope, error = %error, "scope creation failed");
	}

	fn on_scope_dispose_start(&self, scope: &ScopeInfo) {
		self.scope(scope, "scope disposal started");
	}

	fn on_scope_disposed(&self, scope: &ScopeInfo) {
		self.scope(scope, "scope disposed");
	}

	fn on_child_dispose_failed(&self, scope: &ScopeInfo, error: &ScopeError) {
		tracing::warn!(scope = %scope, error = %error, "child scope teardown failed");
	}
}
