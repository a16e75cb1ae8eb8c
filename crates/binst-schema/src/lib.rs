//! Shared types for binst.
//!
//! Pure data: digests, platform identifiers and the install spec. No
//! network or filesystem access lives here.

pub mod arch;
pub mod hash;
pub mod types;

// Re-exports
pub use arch::*;
pub use hash::*;
pub use types::*;
