//! Dependency descriptors, scope containers and holders.

#[cfg(feature = "di")]
pub use lifescope_di::*;
