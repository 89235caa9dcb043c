//! Per-instance core shared between a container and its descriptors

use crate::link::DisposeListener;
use lifescope_core::{ObserverSet, ScopeConfig, ScopeInfo};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU8, Ordering};

pub(crate) type ListenerKey = u64;

const PENDING: u8 = 0;
const REGISTERED: u8 = 1;
const REVOKED: u8 = 2;

#[derive(Default)]
struct Listeners {
	closed: bool,
	next_key: ListenerKey,
	entries: Vec<(ListenerKey, DisposeListener)>,
}

/// Registration record of one container instance.
///
/// Descriptors and child links hold it weakly. It moves from pending (while
/// the container is being built) to registered (once the holder accepts the
/// container) to revoked (once the instance is released).
pub(crate) struct ScopeRegistration {
	info: ScopeInfo,
	config: ScopeConfig,
	observers: Mutex<ObserverSet>,
	status: AtomicU8,
	listeners: Mutex<Listeners>,
}

impl ScopeRegistration {
	pub(crate) fn new(info: ScopeInfo, config: ScopeConfig) -> Self {
		Self {
			info,
			observers: Mutex::new(config.observers().clone()),
			config,
			status: AtomicU8::new(PENDING),
			listeners: Mutex::new(Listeners::default()),
		}
	}

	pub(crate) fn info(&self) -> ScopeInfo {
		self.info
	}

	pub(crate) fn config(&self) -> &ScopeConfig {
		&self.config
	}

	/// Observers notified on behalf of this instance.
	///
	/// Empty once the instance has been released.
	pub(crate) fn observers(&self) -> ObserverSet {
		self.observers.lock().clone()
	}

	pub(crate) fn detach_observers(&self) {
		*self.observers.lock() = ObserverSet::default();
	}

	pub(crate) fn mark_registered(&self) {
		let _ = self
			.status
			.compare_exchange(PENDING, REGISTERED, Ordering::AcqRel, Ordering::Acquire);
	}

	pub(crate) fn revoke(&self) {
		self.status.store(REVOKED, Ordering::Release);
	}

	pub(crate) fn is_registered(&self) -> bool {
		self.status.load(Ordering::Acquire) == REGISTERED
	}

	/// Whether dispose listeners are still accepted.
	pub(crate) fn accepts_listeners(&self) -> bool {
		!self.listeners.lock().closed
	}

	/// Registers a listener fired when the instance is torn down.
	///
	/// Returns `None` once teardown has collected the listeners.
	pub(crate) fn add_dispose_listener(&self, listener: DisposeListener) -> Option<ListenerKey> {
		let mut listeners = self.listeners.lock();
		if listeners.closed {
			return None;
		}
		let key = listeners.next_key;
		listeners.next_key += 1;
		listeners.entries.push((key, listener));
		Some(key)
	}

	pub(crate) fn remove_dispose_listener(&self, key: ListenerKey) {
		self.listeners.lock().entries.retain(|(k, _)| *k != key);
	}

	/// Collects every listener and stops accepting new ones.
	pub(crate) fn take_dispose_listeners(&self) -> Vec<DisposeListener> {
		let mut listeners = self.listeners.lock();
		listeners.closed = true;
		listeners.entries.drain(..).map(|(_, listener)| listener).collect()
	}
}
