//! Shared fixtures for lifescope-observers integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use lifescope_core::DependencyError;
use lifescope_di::{AsyncDep, AsyncLifecycle, Dep, Scope, ScopeBuilder, StagePlan, stage_plan};
use std::sync::{Arc, Mutex};

/// A tracing layer that captures events as `[LEVEL] message key=value ...`
pub struct LogCapture {
	pub logs: Arc<Mutex<Vec<String>>>,
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for LogCapture {
	fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
		struct FieldVisitor {
			message: String,
			fields: Vec<String>,
		}

		impl tracing::field::Visit for FieldVisitor {
			fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
				if field.name() == "message" {
					self.message = format!("{:?}", value);
				} else {
					self.fields.push(format!("{}={:?}", field.name(), value));
				}
			}
		}

		let mut visitor = FieldVisitor {
			message: String::new(),
			fields: Vec::new(),
		};
		event.record(&mut visitor);

		let mut logs = self.logs.lock().unwrap();
		let mut line = format!("[{}] {}", event.metadata().level(), visitor.message);
		for field in visitor.fields {
			line.push(' ');
			line.push_str(&field);
		}
		logs.push(line);
	}
}

impl LogCapture {
	pub fn new() -> (Self, Arc<Mutex<Vec<String>>>) {
		let logs = Arc::new(Mutex::new(Vec::new()));
		(Self { logs: logs.clone() }, logs)
	}
}

#[derive(Debug, thiserror::Error)]
#[error("connection refused by {0}")]
pub struct Refused(pub &'static str);

#[derive(Debug, thiserror::Error)]
#[error("connection reset while closing")]
pub struct ResetOnClose;

/// Connection whose lifecycle can be told to fail.
pub struct Connection {
	pub fail_init: bool,
	pub fail_dispose: bool,
}

#[async_trait]
impl AsyncLifecycle for Connection {
	async fn init(&self) -> Result<(), DependencyError> {
		if self.fail_init {
			return Err(Box::new(Refused("db.internal")));
		}
		Ok(())
	}

	async fn dispose(&self) -> Result<(), DependencyError> {
		if self.fail_dispose {
			return Err(Box::new(ResetOnClose));
		}
		Ok(())
	}
}

/// Which lifecycle step of [`Session::connection`] fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct Faults {
	pub init: bool,
	pub dispose: bool,
}

pub struct Session {
	pub user: Dep<String>,
	pub connection: AsyncDep<Connection>,
}

impl Scope for Session {
	type Input = Faults;

	fn build(faults: Faults, scope: &mut ScopeBuilder) -> Self {
		Self {
			user: scope.dep(|| "guest".to_string()),
			connection: scope.async_dep(move || Connection {
				fail_init: faults.init,
				fail_dispose: faults.dispose,
			}),
		}
	}

	fn stages(&self) -> StagePlan {
		stage_plan![[self.connection]]
	}
}
