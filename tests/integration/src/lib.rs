//! Helpers shared by the lifescope integration tests

use lifescope::ScopeConfig;
use lifescope::observers::RecordingObserver;
use std::sync::Arc;

/// Config whose only observer is `recorder`.
pub fn recorded(recorder: &Arc<RecordingObserver>) -> ScopeConfig {
	ScopeConfig::new().with_observer(Arc::clone(recorder))
}
