//! Identifiers, errors, observers and configuration.
//!
//! # Examples
//!
//! ```rust
//! use lifescope::core::id::ScopeId;
//! use lifescope::core::state::ScopeState;
//!
//! assert_ne!(ScopeId::next(), ScopeId::next());
//! assert_eq!(ScopeState::default(), ScopeState::None);
//! ```

pub use lifescope_core::*;
