//! Login sessions living under an application scope

use lifescope::observers::{RecordingObserver, ScopeEvent};
use lifescope::prelude::*;
use lifescope::{ScopeInfo, UsageError};
use lifescope_integration_tests::recorded;
use rstest::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Shared connection pool counting open connections
#[derive(Default)]
struct Pool {
	open: AtomicUsize,
	closed: AtomicUsize,
}

#[async_trait]
impl AsyncLifecycle for Pool {
	async fn init(&self) -> Result<(), DependencyError> {
		self.open.fetch_add(1, Ordering::SeqCst);
		Ok(())
	}

	async fn dispose(&self) -> Result<(), DependencyError> {
		self.closed.fetch_add(1, Ordering::SeqCst);
		Ok(())
	}
}

struct App {
	settings: Dep<Settings>,
	pool: AsyncDep<Pool>,
	sessions: ScopeHolder<Session>,
}

#[derive(Debug, Clone, PartialEq)]
struct Settings {
	greeting: &'static str,
}

impl Scope for App {
	type Input = ();

	fn build(_input: (), scope: &mut ScopeBuilder) -> Self {
		Self {
			settings: scope.dep(|| Settings { greeting: "hello" }),
			pool: scope.async_dep(Pool::default),
			sessions: scope.child(),
		}
	}

	fn stages(&self) -> StagePlan {
		stage_plan![[self.pool]]
	}
}

#[derive(Debug, Clone)]
struct Credentials {
	user: &'static str,
}

/// Per-session audit trail, declared as a module
struct Audit {
	trail: Dep<trail::Trail>,
}

mod trail {
	use std::sync::Mutex;

	#[derive(Default)]
	pub struct Trail {
		entries: Mutex<Vec<String>>,
	}

	impl Trail {
		pub fn record(&self, entry: impl Into<String>) {
			self.entries.lock().unwrap().push(entry.into());
		}

		pub fn entries(&self) -> Vec<String> {
			self.entries.lock().unwrap().clone()
		}
	}
}

impl ScopeModule for Audit {
	fn build(scope: &mut ScopeBuilder) -> Self {
		Self {
			trail: scope.dep(trail::Trail::default),
		}
	}
}

/// Session-bound connection handle
struct Connection {
	user: &'static str,
	pool: Arc<Pool>,
}

#[async_trait]
impl AsyncLifecycle for Connection {
	async fn init(&self) -> Result<(), DependencyError> {
		if self.pool.open.load(Ordering::SeqCst) == 0 {
			return Err("pool is not open".into());
		}
		Ok(())
	}
}

struct Session {
	app: Arc<Scoped<App>>,
	credentials: Credentials,
	greeting: Dep<String>,
	connection: AsyncDep<Connection>,
	audit: Audit,
}

impl HasParent<App> for Session {
	fn parent(&self) -> &Arc<Scoped<App>> {
		&self.app
	}
}

impl HasInputData<Credentials> for Session {
	fn input_data(&self) -> &Credentials {
		&self.credentials
	}
}

impl Scope for Session {
	type Input = (Arc<Scoped<App>>, Credentials);

	fn build((app, credentials): Self::Input, scope: &mut ScopeBuilder) -> Self {
		let user = credentials.user;
		let greeting = scope.try_dep({
			let app = Arc::clone(&app);
			move || {
				app.settings
					.get()
					.map(|settings| format!("{}, {user}", settings.greeting))
			}
		});
		let connection = scope.try_async_dep({
			let app = Arc::clone(&app);
			move || app.pool.get().map(|pool| Connection { user, pool })
		});
		let audit = scope.module::<Audit>("audit");
		Self {
			app,
			credentials,
			greeting,
			connection,
			audit,
		}
	}

	fn stages(&self) -> StagePlan {
		stage_plan![[self.connection]]
	}
}

#[fixture]
fn recorder() -> Arc<RecordingObserver> {
	Arc::new(RecordingObserver::new())
}

fn scope_events(recorder: &RecordingObserver, scope: ScopeInfo) -> Vec<&'static str> {
	recorder
		.events()
		.iter()
		.filter(|event| match event {
			ScopeEvent::ScopeCreateStart(info)
			| ScopeEvent::ScopeCreated(info)
			| ScopeEvent::ScopeDisposeStart(info)
			| ScopeEvent::ScopeDisposed(info) => *info == scope,
			_ => false,
		})
		.map(ScopeEvent::kind)
		.collect()
}

/// Test a login, logout and second login under one running application
#[rstest]
#[tokio::test]
async fn test_login_logout_login(recorder: Arc<RecordingObserver>) {
	// Arrange
	let app_holder = ScopeHolder::<App>::with_config(recorded(&recorder));
	let app = app_holder.create(()).await.unwrap();

	// Act
	let first = app
		.sessions
		.create((Arc::clone(&app), Credentials { user: "alice" }))
		.await
		.unwrap();
	let first_greeting = first.greeting.get().unwrap();
	first.audit.trail.get().unwrap().record("login");
	app.sessions.drop().await.unwrap();
	let second = app
		.sessions
		.create((Arc::clone(&app), Credentials { user: "bob" }))
		.await
		.unwrap();

	// Assert
	assert_eq!(*first_greeting, "hello, alice");
	assert_eq!(*second.greeting.get().unwrap(), "hello, bob");
	assert_eq!(second.input_data().user, "bob");
	assert_eq!(second.connection.get().unwrap().user, "bob");
	assert!(Arc::ptr_eq(second.parent(), &app));
	assert!(first.audit.trail.get().is_err());
	assert!(second.audit.trail.get().unwrap().entries().is_empty());
	assert_eq!(first.audit.trail.id().module(), Some("audit"));
	assert_eq!(
		scope_events(&recorder, first.info()),
		vec!["scope_create_start", "scope_created", "scope_dispose_start", "scope_disposed"]
	);
	assert_eq!(app.pool.get().unwrap().open.load(Ordering::SeqCst), 1);
}

/// Test that shutting the application down logs the live session out first
#[rstest]
#[tokio::test]
async fn test_shutdown_cascades_to_session(recorder: Arc<RecordingObserver>) {
	// Arrange
	let app_holder = ScopeHolder::<App>::with_config(recorded(&recorder));
	let app = app_holder.create(()).await.unwrap();
	let session = app
		.sessions
		.create((Arc::clone(&app), Credentials { user: "carol" }))
		.await
		.unwrap();
	let pool = app.pool.get().unwrap();

	// Act
	app_holder.drop().await.unwrap();

	// Assert
	assert_eq!(app.sessions.state(), ScopeState::None);
	assert_eq!(pool.closed.load(Ordering::SeqCst), 1);
	let events = recorder.events();
	let session_disposed = events
		.iter()
		.position(|event| *event == ScopeEvent::ScopeDisposed(session.info()))
		.unwrap();
	let pool_disposed = events
		.iter()
		.position(|event| *event == ScopeEvent::Disposed(app.pool.id().clone()))
		.unwrap();
	assert!(session_disposed < pool_disposed);
	assert!(matches!(
		session.greeting.get().unwrap_err().as_usage(),
		Some(UsageError::Unregistered { .. })
	));
}

/// Test that logging in twice without logging out is rejected
#[rstest]
#[tokio::test]
async fn test_double_login_rejected() {
	// Arrange
	let app_holder = ScopeHolder::<App>::new();
	let app = app_holder.create(()).await.unwrap();
	app.sessions
		.create((Arc::clone(&app), Credentials { user: "dave" }))
		.await
		.unwrap();

	// Act
	let again = app
		.sessions
		.create((Arc::clone(&app), Credentials { user: "dave" }))
		.await;

	// Assert
	assert!(matches!(
		again.unwrap_err().as_usage(),
		Some(UsageError::AlreadyCreated {
			state: ScopeState::Available,
			..
		})
	));
}
