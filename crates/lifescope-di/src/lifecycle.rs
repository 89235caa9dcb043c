//! Async lifecycle of a dependency value

use async_trait::async_trait;
use lifescope_core::DependencyError;

/// Asynchronous setup and teardown of a dependency value.
///
/// Values declared with [`ScopeBuilder::async_dep`](crate::ScopeBuilder::async_dep)
/// implement this trait. `init` runs once per container instance while the
/// holder walks the stage plan; `dispose` runs only if `init` succeeded.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use lifescope_core::DependencyError;
/// use lifescope_di::AsyncLifecycle;
///
/// struct Pool {
///     url: String,
/// }
///
/// #[async_trait]
/// impl AsyncLifecycle for Pool {
///     async fn init(&self) -> Result<(), DependencyError> {
///         if self.url.is_empty() {
///             return Err("missing database url".into());
///         }
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait AsyncLifecycle: Send + Sync + 'static {
	async fn init(&self) -> Result<(), DependencyError> {
		Ok(())
	}

	async fn dispose(&self) -> Result<(), DependencyError> {
		Ok(())
	}
}
