//! Tile textures: sources, backends, the LRU cache and background preload
//!
//! # Architecture
//!
//! ## L4 Atomic Layer
//! - `source` - Host capabilities (`TileSource`, `ResourceBackend`) and handles
//! - `entry` - Cache slots that must be released explicitly
//! - `memory` - Headless backend for the CLI and tests
//!
//! ## L3 Molecular Layer
//! - `cache` - Thread-safe LRU cache with deferred release
//! - `loader` - Cancellable preload on the tokio blocking pool

// L4 Atomic Layer
pub mod entry;
pub mod memory;
pub mod source;

// L3 Molecular Layer
pub mod cache;
pub mod loader;

#[cfg(test)]
pub(crate) mod test_support;

pub use cache::{CacheStats, TileCache};
pub use entry::TileEntry;
pub use loader::{cancel_pair, preload, CancelToken, Canceller, PreloadReport, TileLoader};
pub use memory::MemoryBackend;
pub use source::{RawImage, ResourceBackend, ResourceHandle, TileSource};
