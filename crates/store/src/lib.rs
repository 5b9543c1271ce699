//! Block tree storage for the meridian node.
//!
//! Provides the [`BlockStore`] contract consumed by the sync and consensus
//! layers, plus an in-memory implementation used in tests and local
//! development.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod memory;
mod store;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use store::{BlockStore, ExtendedBlock};
