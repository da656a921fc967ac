//! Cache slot types with an explicit release contract
//!
//! A `TileEntry` owns a texture handle until the cache takes it back out with
//! `into_handle()` and hands it to the backend. Dropping an entry that still
//! owns its handle is a bug: debug builds assert, release builds log the leak.

use tracing::warn;

use super::source::ResourceHandle;

/// Texture owned by the cache for one tile
#[derive(Debug)]
pub struct TileEntry {
    index: usize,
    handle: Option<ResourceHandle>,
}

impl TileEntry {
    pub(crate) fn new(index: usize, handle: ResourceHandle) -> Self {
        Self {
            index,
            handle: Some(handle),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Borrow the handle for the current frame
    pub fn handle(&self) -> Option<ResourceHandle> {
        self.handle
    }

    /// Give up ownership so the caller can release the texture
    pub(crate) fn into_handle(mut self) -> Option<ResourceHandle> {
        self.handle.take()
    }
}

impl Drop for TileEntry {
    fn drop(&mut self) {
        let Some(handle) = self.handle else {
            return;
        };
        warn!(index = self.index, %handle, "tile texture dropped without release");
        if !std::thread::panicking() {
            debug_assert!(
                false,
                "tile {} dropped while still owning texture {}",
                self.index, handle
            );
        }
    }
}

/// What the cache remembers for an index
#[derive(Debug)]
pub(crate) enum Slot {
    Ready(TileEntry),
    /// Image was unavailable; only stored when negative caching is on
    Missing,
}

impl Slot {
    pub(crate) fn handle(&self) -> Option<ResourceHandle> {
        match self {
            Slot::Ready(entry) => entry.handle(),
            Slot::Missing => None,
        }
    }

    /// Handle to release when this slot leaves the cache
    pub(crate) fn into_handle(self) -> Option<ResourceHandle> {
        match self {
            Slot::Ready(entry) => entry.into_handle(),
            Slot::Missing => None,
        }
    }
}
