//! Capabilities the tile cache consumes from the host

use std::fmt;
use std::num::NonZeroU32;

use crate::Result;

/// Decoded RGBA8 image handed to the rendering backend
#[derive(Clone, PartialEq, Eq)]
pub struct RawImage {
    pub width: u32,
    pub height: u32,
    /// Row-major RGBA8, `width * height * 4` bytes
    pub pixels: Vec<u8>,
}

impl RawImage {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Single-colour image, mostly useful for headless hosts
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let len = width as usize * height as usize;
        let pixels = rgba.iter().copied().cycle().take(len * 4).collect();
        Self::new(width, height, pixels)
    }

    /// Whether the pixel buffer matches the declared dimensions
    pub fn is_well_formed(&self) -> bool {
        self.pixels.len() == self.width as usize * self.height as usize * 4
    }

    pub fn byte_len(&self) -> usize {
        self.pixels.len()
    }
}

impl fmt::Debug for RawImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}

/// Opaque GPU texture name; zero is not a valid handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceHandle(NonZeroU32);

impl ResourceHandle {
    /// Wrap a raw texture name, `None` for the null name
    pub fn new(raw: u32) -> Option<Self> {
        NonZeroU32::new(raw).map(Self)
    }

    #[inline]
    pub fn get(&self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Domain data: how many tiles exist and what each one shows
pub trait TileSource: Send + Sync {
    /// Number of tiles
    fn count(&self) -> usize;

    /// Image for a tile, `None` when the tile has no visual
    fn image_for(&self, index: usize) -> Option<RawImage>;
}

/// GPU capability: turn images into textures and free them again
///
/// The cache releases every handle it received from `upload` exactly once.
pub trait ResourceBackend: Send + Sync {
    fn upload(&self, image: RawImage) -> Result<ResourceHandle>;

    fn release(&self, handle: ResourceHandle) -> Result<()>;
}

impl<T: TileSource + ?Sized> TileSource for std::sync::Arc<T> {
    fn count(&self) -> usize {
        (**self).count()
    }

    fn image_for(&self, index: usize) -> Option<RawImage> {
        (**self).image_for(index)
    }
}

impl<T: ResourceBackend + ?Sized> ResourceBackend for std::sync::Arc<T> {
    fn upload(&self, image: RawImage) -> Result<ResourceHandle> {
        (**self).upload(image)
    }

    fn release(&self, handle: ResourceHandle) -> Result<()> {
        (**self).release(handle)
    }
}
