//! L4 Atomic Layer: Valid offset range and rounding
//!
//! An offset is a continuous position in tile units. Its rounded value names
//! the tile on top.

/// Valid offsets for a strip of `count` tiles: `[0, count - 1]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OffsetRange {
    count: usize,
}

impl OffsetRange {
    pub fn new(count: usize) -> Self {
        Self { count }
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Highest valid tile index, `None` when there are no tiles
    #[inline]
    pub fn max_index(&self) -> Option<usize> {
        self.count.checked_sub(1)
    }

    /// Clamp an offset into the range; an empty range pins it to 0
    #[inline]
    pub fn clamp(&self, offset: f64) -> f64 {
        match self.max_index() {
            None => 0.0,
            // NaN never survives into the scroll state
            Some(_) if offset.is_nan() => 0.0,
            Some(max) => offset.clamp(0.0, max as f64),
        }
    }

    /// Tile index on top for a given offset, `None` when empty
    #[inline]
    pub fn tile_at(&self, offset: f64) -> Option<usize> {
        let max = self.max_index()?;
        let rounded = round_offset(self.clamp(offset));
        Some((rounded.max(0) as usize).min(max))
    }
}

/// Nearest integer with halves rounded up: `floor(x + 0.5)`
#[inline]
pub fn round_offset(offset: f64) -> i64 {
    (offset + 0.5).floor() as i64
}
