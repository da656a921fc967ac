//! Fixed-capacity LRU cache from tile index to texture
//!
//! The table is guarded by one mutex shared by the render context and the
//! background preloader. Image reads and uploads happen outside the lock;
//! the result is re-validated before it is inserted.
//!
//! Handles returned by `get`/`get_or_create` may still be bound by the
//! renderer, so evicting one of those defers its release until the next
//! `begin_frame()`. Anything else leaving the cache, including tiles warmed by
//! the preloader, is released right away. `clear()` releases everything
//! immediately because it runs when the rendering context is being replaced.

use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard, PoisonError};

use lru::LruCache;
use tracing::{debug, info, warn};

use super::entry::{Slot, TileEntry};
use super::source::{ResourceBackend, ResourceHandle, TileSource};
use crate::config::CacheConfig;
use crate::{Error, Result};

/// Counters for cache behaviour since construction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    /// Misses where no image was available or the upload failed
    pub load_failures: u64,
    /// Uploads thrown away because another caller inserted first or the cache was cleared
    pub discarded: u64,
    pub released: u64,
}

struct Table {
    slots: LruCache<usize, Slot>,
    /// Evicted textures waiting for the next frame boundary
    pending: Vec<ResourceHandle>,
    /// Handles given to the renderer since the last frame boundary
    borrowed: HashSet<ResourceHandle>,
    /// Bumped by every clear; uploads started before it are stale
    generation: u64,
    stats: CacheStats,
}

impl Table {
    /// Hand out a handle; it stays valid until the next frame boundary
    fn lend(&mut self, handle: Option<ResourceHandle>) -> Option<ResourceHandle> {
        if let Some(handle) = handle {
            self.borrowed.insert(handle);
        }
        handle
    }

    /// Take a texture that just left the table
    ///
    /// Borrowed handles wait for `begin_frame()`; the rest are returned for
    /// immediate release.
    fn retire(&mut self, handle: ResourceHandle) -> Option<ResourceHandle> {
        if self.borrowed.remove(&handle) {
            self.pending.push(handle);
            None
        } else {
            Some(handle)
        }
    }
}

/// Thread-safe tile texture cache
pub struct TileCache<B: ResourceBackend> {
    backend: B,
    capacity: NonZeroUsize,
    cache_missing: bool,
    table: Mutex<Table>,
}

impl<B: ResourceBackend> TileCache<B> {
    /// Create a cache holding at most `capacity` tiles
    pub fn new(capacity: usize, backend: B) -> Result<Self> {
        let capacity = NonZeroUsize::new(capacity)
            .ok_or_else(|| Error::Config("tile cache capacity must be at least 1".to_string()))?;
        Ok(Self {
            backend,
            capacity,
            cache_missing: false,
            table: Mutex::new(Table {
                slots: LruCache::new(capacity),
                pending: Vec::new(),
                borrowed: HashSet::new(),
                generation: 0,
                stats: CacheStats::default(),
            }),
        })
    }

    pub fn from_config(config: &CacheConfig, backend: B) -> Result<Self> {
        Ok(Self::new(config.capacity, backend)?.with_cache_missing(config.cache_missing))
    }

    /// Remember unavailable tiles instead of retrying them on every miss
    pub fn with_cache_missing(mut self, enabled: bool) -> Self {
        self.cache_missing = enabled;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    pub fn len(&self) -> usize {
        self.lock().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().slots.is_empty()
    }

    /// Whether an index has a slot, without touching recency
    pub fn contains(&self, index: usize) -> bool {
        self.lock().slots.contains(&index)
    }

    /// Cached indices, most recently used first
    pub fn indices(&self) -> Vec<usize> {
        self.lock().slots.iter().map(|(index, _)| *index).collect()
    }

    pub fn stats(&self) -> CacheStats {
        self.lock().stats
    }

    /// Evicted textures not yet released
    pub fn pending_releases(&self) -> usize {
        self.lock().pending.len()
    }

    fn lock(&self) -> MutexGuard<'_, Table> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Look up a tile and mark it recently used; never loads
    pub fn get(&self, index: usize) -> Option<ResourceHandle> {
        let mut table = self.lock();
        let handle = table.slots.get(&index).and_then(Slot::handle);
        table.lend(handle)
    }

    /// Look up a tile, loading and uploading it on a miss
    ///
    /// Returns `None` when the tile has no image or the upload failed. The
    /// handle is only valid until the next `begin_frame()` or `clear()`.
    pub fn get_or_create<S>(&self, index: usize, source: &S) -> Option<ResourceHandle>
    where
        S: TileSource + ?Sized,
    {
        self.load(index, source, true)
    }

    /// Make sure a tile is cached without handing its texture out
    ///
    /// Used by the preloader. Returns whether the tile has a texture.
    pub fn warm<S>(&self, index: usize, source: &S) -> bool
    where
        S: TileSource + ?Sized,
    {
        self.load(index, source, false).is_some()
    }

    fn load<S>(&self, index: usize, source: &S, lend: bool) -> Option<ResourceHandle>
    where
        S: TileSource + ?Sized,
    {
        let generation = {
            let mut table = self.lock();
            if let Some(handle) = table.slots.get(&index).map(Slot::handle) {
                table.stats.hits += 1;
                return if lend { table.lend(handle) } else { handle };
            }
            table.stats.misses += 1;
            table.generation
        };

        // Slow path without the lock: decode + upload
        let uploaded = match source.image_for(index) {
            Some(image) => self.backend.upload(image),
            None => Err(Error::Other("no image".to_string())),
        };

        match uploaded {
            Ok(handle) => self.insert_uploaded(index, handle, generation, lend),
            Err(e) => {
                debug!(index, error = %e, "tile unavailable");
                self.record_failure(index, generation);
                None
            }
        }
    }

    /// Second phase of a miss: insert unless someone else won the race
    fn insert_uploaded(
        &self,
        index: usize,
        handle: ResourceHandle,
        generation: u64,
        lend: bool,
    ) -> Option<ResourceHandle> {
        let mut table = self.lock();

        if table.generation != generation {
            table.stats.discarded += 1;
            drop(table);
            debug!(index, %handle, "cache cleared during upload, discarding texture");
            self.release_all([handle]);
            return None;
        }

        let existing = match table.slots.get(&index) {
            Some(Slot::Ready(entry)) => Some(entry.handle()),
            _ => None,
        };
        if let Some(existing) = existing {
            table.stats.discarded += 1;
            let existing = if lend { table.lend(existing) } else { existing };
            drop(table);
            debug!(index, %handle, "tile inserted concurrently, discarding duplicate");
            self.release_all([handle]);
            return existing;
        }

        let entry = Slot::Ready(TileEntry::new(index, handle));
        let mut retired = None;
        if let Some((evicted, slot)) = table.slots.push(index, entry) {
            if evicted != index {
                table.stats.evictions += 1;
                debug!(evicted, inserted = index, "evicted least recently used tile");
            }
            retired = slot.into_handle().and_then(|old| table.retire(old));
        }
        if lend {
            table.lend(Some(handle));
        }
        drop(table);

        self.release_all(retired);
        Some(handle)
    }

    fn record_failure(&self, index: usize, generation: u64) {
        let mut table = self.lock();
        table.stats.load_failures += 1;
        if !self.cache_missing || table.generation != generation || table.slots.contains(&index) {
            return;
        }
        let Some((evicted, slot)) = table.slots.push(index, Slot::Missing) else {
            return;
        };
        table.stats.evictions += 1;
        debug!(evicted, missing = index, "evicted tile for unavailable marker");
        let retired = slot.into_handle().and_then(|old| table.retire(old));
        drop(table);
        self.release_all(retired);
    }

    /// Drop one tile
    ///
    /// A texture handed to the renderer since the last frame boundary is
    /// released at the next one, any other immediately.
    pub fn evict(&self, index: usize) -> bool {
        let mut table = self.lock();
        let Some(slot) = table.slots.pop(&index) else {
            return false;
        };
        table.stats.evictions += 1;
        let retired = slot.into_handle().and_then(|handle| table.retire(handle));
        drop(table);
        self.release_all(retired);
        true
    }

    /// Start of a render frame: release textures evicted since the last one
    ///
    /// Must be called from the render context. Handles returned before this
    /// call must not be used afterwards. Returns how many were released.
    pub fn begin_frame(&self) -> usize {
        let pending = {
            let mut table = self.lock();
            table.borrowed.clear();
            std::mem::take(&mut table.pending)
        };
        self.release_all(pending)
    }

    /// Empty the cache and release every texture it owns
    ///
    /// Call when the rendering context is lost or recreated. Uploads that are
    /// in flight while this runs are discarded when they complete.
    pub fn clear(&self) -> usize {
        let handles: Vec<ResourceHandle> = {
            let mut table = self.lock();
            table.generation += 1;
            table.borrowed.clear();
            let mut handles = std::mem::take(&mut table.pending);
            while let Some((_, slot)) = table.slots.pop_lru() {
                handles.extend(slot.into_handle());
            }
            handles
        };

        let released = self.release_all(handles);
        if released > 0 {
            info!(released, "tile cache cleared");
        }
        released
    }

    /// Release handles that are already out of the table
    ///
    /// Failures are logged and not retried; the handle is forgotten either way.
    fn release_all(&self, handles: impl IntoIterator<Item = ResourceHandle>) -> usize {
        let mut released = 0;
        for handle in handles {
            match self.backend.release(handle) {
                Ok(()) => released += 1,
                Err(e) => warn!(%handle, error = %e, "failed to release tile texture"),
            }
        }
        if released > 0 {
            self.lock().stats.released += released as u64;
        }
        released
    }
}

impl<B: ResourceBackend> Drop for TileCache<B> {
    fn drop(&mut self) {
        self.clear();
    }
}
