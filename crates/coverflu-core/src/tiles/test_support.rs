//! Sources shared by the tile and view tests

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::source::{RawImage, TileSource};

/// Source with `count` tiles, some of which have no image
pub struct StripSource {
    count: AtomicUsize,
    missing: Mutex<HashSet<usize>>,
    reads: AtomicUsize,
}

impl StripSource {
    pub fn new(count: usize) -> Self {
        Self {
            count: AtomicUsize::new(count),
            missing: Mutex::new(HashSet::new()),
            reads: AtomicUsize::new(0),
        }
    }

    pub fn with_missing(self, indices: &[usize]) -> Self {
        self.missing.lock().unwrap().extend(indices.iter().copied());
        self
    }

    pub fn set_count(&self, count: usize) {
        self.count.store(count, Ordering::SeqCst);
    }

    /// Number of `image_for` calls so far
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl TileSource for StripSource {
    fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    fn image_for(&self, index: usize) -> Option<RawImage> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if index >= self.count() || self.missing.lock().unwrap().contains(&index) {
            return None;
        }
        Some(RawImage::solid(2, 2, [index as u8, 0, 0, 255]))
    }
}
