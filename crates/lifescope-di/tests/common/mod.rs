//! Shared fixtures for lifescope-di integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use lifescope_core::{DepId, DependencyError, ScopeError, ScopeInfo, ScopeObserver};
use lifescope_di::AsyncLifecycle;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::Notify;

/// Ordered record of lifecycle events shared between a test and its scopes.
#[derive(Default)]
pub struct EventLog {
	entries: Mutex<Vec<String>>,
}

impl EventLog {
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	pub fn push(&self, entry: impl Into<String>) {
		self.entries.lock().push(entry.into());
	}

	pub fn entries(&self) -> Vec<String> {
		self.entries.lock().clone()
	}

	pub fn position(&self, entry: &str) -> Option<usize> {
		self.entries.lock().iter().position(|e| e == entry)
	}

	pub fn count(&self, entry: &str) -> usize {
		self.entries.lock().iter().filter(|e| *e == entry).count()
	}

	pub fn contains(&self, entry: &str) -> bool {
		self.position(entry).is_some()
	}
}

#[derive(Debug, thiserror::Error)]
#[error("{0} refused to start")]
pub struct InitRefused(pub &'static str);

#[derive(Debug, thiserror::Error)]
#[error("{0} failed to shut down")]
pub struct DisposeFailed(pub &'static str);

/// Async dependency that records its lifecycle in an [`EventLog`].
///
/// Logs `create:<name>` when built, `init:<name>:start` / `init:<name>:end`
/// around `init`, and `dispose:<name>` when disposed.
pub struct Probe {
	name: &'static str,
	log: Arc<EventLog>,
	fail_init: bool,
	fail_dispose: bool,
	yielding: bool,
	init_gate: Option<Arc<Notify>>,
	dispose_gate: Option<Arc<Notify>>,
}

impl Probe {
	pub fn new(name: &'static str, log: &Arc<EventLog>) -> Self {
		log.push(format!("create:{name}"));
		Self {
			name,
			log: Arc::clone(log),
			fail_init: false,
			fail_dispose: false,
			yielding: false,
			init_gate: None,
			dispose_gate: None,
		}
	}

	pub fn failing_init(mut self) -> Self {
		self.fail_init = true;
		self
	}

	pub fn failing_dispose(mut self) -> Self {
		self.fail_dispose = true;
		self
	}

	/// Yields to the scheduler once inside `init`.
	pub fn yielding(mut self) -> Self {
		self.yielding = true;
		self
	}

	pub fn gated_init(mut self, gate: &Arc<Notify>) -> Self {
		self.init_gate = Some(Arc::clone(gate));
		self
	}

	pub fn gated_dispose(mut self, gate: &Arc<Notify>) -> Self {
		self.dispose_gate = Some(Arc::clone(gate));
		self
	}

	pub fn name(&self) -> &'static str {
		self.name
	}
}

#[async_trait]
impl AsyncLifecycle for Probe {
	async fn init(&self) -> Result<(), DependencyError> {
		self.log.push(format!("init:{}:start", self.name));
		if let Some(gate) = &self.init_gate {
			gate.notified().await;
		}
		if self.yielding {
			tokio::task::yield_now().await;
		}
		self.log.push(format!("init:{}:end", self.name));
		if self.fail_init {
			return Err(Box::new(InitRefused(self.name)));
		}
		Ok(())
	}

	async fn dispose(&self) -> Result<(), DependencyError> {
		if let Some(gate) = &self.dispose_gate {
			gate.notified().await;
		}
		self.log.push(format!("dispose:{}", self.name));
		if self.fail_dispose {
			return Err(Box::new(DisposeFailed(self.name)));
		}
		Ok(())
	}
}

/// Observer writing every hook into an [`EventLog`] as `<hook>:<subject>`.
pub struct LogObserver {
	pub log: Arc<EventLog>,
}

impl LogObserver {
	pub fn new(log: &Arc<EventLog>) -> Arc<Self> {
		Arc::new(Self {
			log: Arc::clone(log),
		})
	}

	fn dep(&self, hook: &str, dependency: &DepId) {
		self.log.push(format!("{hook}:{}", dependency.short_type_name()));
	}

	fn scope(&self, hook: &str, _scope: &ScopeInfo) {
		self.log.push(hook.to_string());
	}
}

impl ScopeObserver for LogObserver {
	fn on_dependency_create_start(&self, dependency: &DepId) {
		self.dep("create_start", dependency);
	}

	fn on_dependency_created(&self, dependency: &DepId) {
		self.dep("created", dependency);
	}

	fn on_dependency_create_failed(&self, dependency: &DepId, _error: &ScopeError) {
		self.dep("create_failed", dependency);
	}

	fn on_dependency_init_start(&self, dependency: &DepId) {
		self.dep("init_start", dependency);
	}

	fn on_dependency_initialized(&self, dependency: &DepId) {
		self.dep("initialized", dependency);
	}

	fn on_dependency_init_failed(&self, dependency: &DepId, _error: &ScopeError) {
		self.dep("init_failed", dependency);
	}

	fn on_dependency_dispose_start(&self, dependency: &DepId) {
		self.dep("dispose_start", dependency);
	}

	fn on_dependency_disposed(&self, dependency: &DepId) {
		self.dep("disposed", dependency);
	}

	fn on_dependency_dispose_failed(&self, dependency: &DepId, _error: &ScopeError) {
		self.dep("dispose_failed", dependency);
	}

	fn on_dependency_cleared(&self, dependency: &DepId) {
		self.dep("cleared", dependency);
	}

	fn on_scope_create_start(&self, scope: &ScopeInfo) {
		self.scope("scope_create_start", scope);
	}

	fn on_scope_created(&self, scope: &ScopeInfo) {
		self.scope("scope_created", scope);
	}

	fn on_scope_create_failed(&self, scope: &ScopeInfo, _error: &ScopeError) {
		self.scope("scope_create_failed", scope);
	}

	fn on_scope_dispose_start(&self, scope: &ScopeInfo) {
		self.scope("scope_dispose_start", scope);
	}

	fn on_scope_disposed(&self, scope: &ScopeInfo) {
		self.scope("scope_disposed", scope);
	}
}
