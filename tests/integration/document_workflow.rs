//! Documents opened against a workspace scope through its parent link

use futures::future::join_all;
use lifescope::observers::RecordingObserver;
use lifescope_integration_tests::recorded;
use lifescope::prelude::*;
use lifescope::{UsageError, default_config, reset_default_config, set_default_config};
use rstest::*;
use serial_test::serial;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Counts open file handles across the whole workspace
#[derive(Default)]
struct Handles {
	open: AtomicUsize,
}

struct Workspace {
	handles: Dep<Handles>,
	link: ParentLink,
}

impl Scope for Workspace {
	type Input = ();

	fn build(_input: (), scope: &mut ScopeBuilder) -> Self {
		Self {
			handles: scope.dep(Handles::default),
			link: scope.parent_link(),
		}
	}
}

struct FileHandle {
	path: &'static str,
	handles: Arc<Handles>,
}

#[async_trait]
impl AsyncLifecycle for FileHandle {
	async fn init(&self) -> Result<(), DependencyError> {
		if self.path.is_empty() {
			return Err("empty path".into());
		}
		self.handles.open.fetch_add(1, Ordering::SeqCst);
		Ok(())
	}

	async fn dispose(&self) -> Result<(), DependencyError> {
		self.handles.open.fetch_sub(1, Ordering::SeqCst);
		Ok(())
	}
}

/// Parsed contents, available once the file handle is open
struct Outline {
	headings: usize,
}

#[async_trait]
impl AsyncLifecycle for Outline {}

struct Document {
	file: AsyncDep<FileHandle>,
	outline: AsyncDep<Outline>,
}

impl Scope for Document {
	type Input = (Arc<Scoped<Workspace>>, &'static str);

	fn build((workspace, path): Self::Input, scope: &mut ScopeBuilder) -> Self {
		let file = scope.try_async_dep(move || {
			workspace
				.handles
				.get()
				.map(|handles| FileHandle { path, handles })
		});
		let outline = scope.try_async_dep({
			let file = file.clone();
			move || {
				file.get().map(|file| Outline {
					headings: file.path.matches('/').count(),
				})
			}
		});
		Self { file, outline }
	}

	fn stages(&self) -> StagePlan {
		stage_plan![[self.file], [self.outline]]
	}
}

async fn open(
	workspace: &Arc<Scoped<Workspace>>,
	path: &'static str,
) -> ScopeResult<ScopeHolder<Document>> {
	let holder = ScopeHolder::child_of(&workspace.link)?;
	holder.create((Arc::clone(workspace), path)).await?;
	Ok(holder)
}

/// Test opening several documents concurrently and closing the workspace
#[rstest]
#[tokio::test]
async fn test_close_workspace_closes_documents() {
	// Arrange
	let workspace_holder = ScopeHolder::<Workspace>::new();
	let workspace = workspace_holder.create(()).await.unwrap();
	let paths = ["notes/a.md", "notes/b/c.md", "readme.md"];

	// Act
	let opened: Vec<ScopeHolder<Document>> = join_all(paths.map(|path| open(&workspace, path)))
		.await
		.into_iter()
		.collect::<ScopeResult<_>>()
		.unwrap();
	let open_while_running = workspace.handles.get().unwrap().open.load(Ordering::SeqCst);
	workspace_holder.drop().await.unwrap();

	// Assert
	assert_eq!(open_while_running, 3);
	assert!(opened.iter().all(|doc| doc.state() == ScopeState::None));
	assert!(!workspace.link.is_alive());
}

/// Test that later stages see the values of earlier stages
#[rstest]
#[tokio::test]
async fn test_outline_reads_file_from_previous_stage() {
	// Arrange
	let workspace_holder = ScopeHolder::<Workspace>::new();
	let workspace = workspace_holder.create(()).await.unwrap();

	// Act
	let document = open(&workspace, "guide/part/one.md").await.unwrap();

	// Assert
	let live = document.current().unwrap();
	assert_eq!(live.outline.get().unwrap().headings, 2);
	assert!(live.file.is_initialized());
	assert_eq!(
		live.stages().stage_ids(),
		vec![vec![live.file.id().clone()], vec![live.outline.id().clone()]]
	);
}

/// Test that a document failing to open leaves no handle behind
#[rstest]
#[tokio::test]
async fn test_failed_open_rolls_back() {
	// Arrange
	let workspace_holder = ScopeHolder::<Workspace>::new();
	let workspace = workspace_holder.create(()).await.unwrap();

	// Act
	let result = open(&workspace, "").await;

	// Assert
	let err = result.unwrap_err();
	assert!(err.is_dependency());
	assert_eq!(err.dependency_source().unwrap().to_string(), "empty path");
	assert_eq!(workspace.handles.get().unwrap().open.load(Ordering::SeqCst), 0);
}

/// Test that a closed workspace refuses new documents
#[rstest]
#[tokio::test]
async fn test_closed_workspace_refuses_documents() {
	// Arrange
	let workspace_holder = ScopeHolder::<Workspace>::new();
	let workspace = workspace_holder.create(()).await.unwrap();
	workspace_holder.drop().await.unwrap();

	// Act
	let result = ScopeHolder::<Document>::child_of(&workspace.link);

	// Assert
	assert!(matches!(
		result.unwrap_err().as_usage(),
		Some(UsageError::ParentReleased { .. })
	));
}

/// Test waiting for a document from another task through the instance channel
#[rstest]
#[tokio::test]
async fn test_wait_for_document_from_another_task() {
	// Arrange
	let workspace_holder = ScopeHolder::<Workspace>::new();
	let workspace = workspace_holder.create(()).await.unwrap();
	let document = ScopeHolder::<Document>::child_of(&workspace.link).unwrap();
	let mut instances = document.subscribe();
	let waiter = tokio::spawn(async move {
		let live = instances.wait_for(|current| current.is_some()).await.unwrap();
		live.as_ref().map(|doc| doc.id())
	});

	// Act
	let created = document.create((Arc::clone(&workspace), "a.md")).await.unwrap();

	// Assert
	assert_eq!(waiter.await.unwrap(), Some(created.id()));
}

/// Test that the process-wide default config reaches child documents
#[rstest]
#[tokio::test]
#[serial(default_config)]
async fn test_default_config_reaches_documents() {
	// Arrange
	let recorder = Arc::new(RecordingObserver::new());
	set_default_config(recorded(&recorder));
	let workspace_holder = ScopeHolder::<Workspace>::new();
	reset_default_config();
	let workspace = workspace_holder.create(()).await.unwrap();

	// Act
	let document = open(&workspace, "a.md").await.unwrap();

	// Assert
	assert!(default_config().observers().is_empty());
	assert_eq!(document.config().observers().len(), 1);
	assert!(recorder.kinds().contains(&"initialized"));
}
