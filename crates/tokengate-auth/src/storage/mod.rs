//! Storage for revocation state.
//!
//! This module defines the [`RevocationStore`] interface and an in-memory
//! implementation. Remote backends plug in by implementing the same trait.

pub mod memory;
pub mod revocation;

pub use memory::InMemoryRevocationStore;
pub use revocation::RevocationStore;
