//! Scope and dependency identifiers

use std::fmt;
use std::hash::{Hash, Hasher};
use std::panic::Location;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_SCOPE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of one scope instance.
///
/// Every successful or attempted `create` allocates a fresh id, so two
/// instances produced by the same holder never compare equal.
///
/// # Examples
///
/// ```
/// use lifescope_core::ScopeId;
///
/// let first = ScopeId::next();
/// let second = ScopeId::next();
/// assert_ne!(first, second);
/// assert!(second.as_u64() > first.as_u64());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(u64);

impl ScopeId {
	/// Allocates the next identifier.
	pub fn next() -> Self {
		Self(NEXT_SCOPE_ID.fetch_add(1, Ordering::Relaxed))
	}

	/// Returns the raw numeric value.
	pub fn as_u64(&self) -> u64 {
		self.0
	}
}

impl fmt::Display for ScopeId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "scope#{}", self.0)
	}
}

/// Name and id of a scope instance, handed to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeInfo {
	/// Instance identifier
	pub id: ScopeId,
	/// Container type name
	pub name: &'static str,
}

impl ScopeInfo {
	pub fn new(id: ScopeId, name: &'static str) -> Self {
		Self { id, name }
	}
}

impl fmt::Display for ScopeInfo {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} ({})", short_type_name(self.name), self.id)
	}
}

struct DepIdInner {
	type_name: &'static str,
	location: &'static Location<'static>,
	module: Option<Arc<str>>,
	scope: ScopeId,
	index: usize,
}

/// Identity of a declared dependency.
///
/// A dependency is identified by the scope instance that declared it and its
/// declaration index within that scope. The value type, declaration site and
/// module path are carried along for diagnostics.
#[derive(Clone)]
pub struct DepId {
	inner: Arc<DepIdInner>,
}

impl DepId {
	/// Creates a dependency identity.
	///
	/// `module` is the `::`-joined module path the dependency was declared
	/// under, if any.
	pub fn new(
		type_name: &'static str,
		location: &'static Location<'static>,
		module: Option<Arc<str>>,
		scope: ScopeId,
		index: usize,
	) -> Self {
		Self {
			inner: Arc::new(DepIdInner {
				type_name,
				location,
				module,
				scope,
				index,
			}),
		}
	}

	/// Fully qualified type name of the dependency value.
	pub fn type_name(&self) -> &'static str {
		self.inner.type_name
	}

	/// Type name without its module path, generics kept intact.
	pub fn short_type_name(&self) -> &'static str {
		short_type_name(self.inner.type_name)
	}

	/// Source location of the declaration.
	pub fn location(&self) -> &'static Location<'static> {
		self.inner.location
	}

	/// Module path the dependency was declared under.
	pub fn module(&self) -> Option<&str> {
		self.inner.module.as_deref()
	}

	/// Scope instance that owns the dependency.
	pub fn scope(&self) -> ScopeId {
		self.inner.scope
	}

	/// Declaration index within the owning scope.
	pub fn index(&self) -> usize {
		self.inner.index
	}
}

impl PartialEq for DepId {
	fn eq(&self, other: &Self) -> bool {
		self.inner.scope == other.inner.scope && self.inner.index == other.inner.index
	}
}

impl Eq for DepId {}

impl Hash for DepId {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.inner.scope.hash(state);
		self.inner.index.hash(state);
	}
}

impl fmt::Debug for DepId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("DepId")
			.field("type_name", &self.inner.type_name)
			.field("module", &self.inner.module)
			.field("scope", &self.inner.scope)
			.field("index", &self.inner.index)
			.field("location", &format_args!("{}", self.inner.location))
			.finish()
	}
}

impl fmt::Display for DepId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if let Some(module) = &self.inner.module {
			write!(f, "{}::", module)?;
		}
		write!(
			f,
			"{} @ {}:{}",
			self.short_type_name(),
			self.inner.location.file(),
			self.inner.location.line()
		)
	}
}

/// Strips the module path from a type name, leaving generic arguments untouched.
fn short_type_name(name: &'static str) -> &'static str {
	let head_end = name.find('<').unwrap_or(name.len());
	match name[..head_end].rfind("::") {
		Some(pos) => &name[pos + 2..],
		None => name,
	}
}
