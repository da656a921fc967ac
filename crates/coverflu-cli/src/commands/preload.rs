use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use image::imageops::FilterType;
use image::GenericImageView;
use tokio::runtime::Handle;
use tracing::{debug, warn};

use coverflu_core::tiles::{MemoryBackend, RawImage, TileSource};
use coverflu_core::{AppConfig, CoverFlowView, NoopObserver};

/// Longest edge a tile texture is scaled down to
const MAX_TILE_EDGE: u32 = 512;

/// One tile per decodable image in a directory, sorted by file name
struct DirectorySource {
    paths: Vec<PathBuf>,
}

impl DirectorySource {
    fn scan(dir: &Path) -> Result<Self> {
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
            .with_context(|| format!("Failed to read directory {}", dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && image::ImageFormat::from_path(path).is_ok())
            .collect();
        paths.sort();
        Ok(Self { paths })
    }
}

impl TileSource for DirectorySource {
    fn count(&self) -> usize {
        self.paths.len()
    }

    fn image_for(&self, index: usize) -> Option<RawImage> {
        let path = self.paths.get(index)?;
        let img = match image::open(path) {
            Ok(img) => img,
            Err(e) => {
                warn!("Failed to decode {}: {}", path.display(), e);
                return None;
            }
        };

        let (width, height) = img.dimensions();
        let img = if width.max(height) > MAX_TILE_EDGE {
            img.resize(MAX_TILE_EDGE, MAX_TILE_EDGE, FilterType::Triangle)
        } else {
            img
        };

        let rgba = img.to_rgba8();
        debug!(index, width = rgba.width(), height = rgba.height(), "decoded tile");
        Some(RawImage::new(rgba.width(), rgba.height(), rgba.into_raw()))
    }
}

pub async fn run(config: &AppConfig, dir: &Path, start: usize, end: Option<usize>) -> Result<()> {
    let source = Arc::new(DirectorySource::scan(dir)?);
    let count = source.count();
    if count == 0 {
        println!("No images found in {}", dir.display());
        return Ok(());
    }

    let backend = Arc::new(MemoryBackend::new());
    let mut view = CoverFlowView::new(
        config,
        source,
        backend.clone(),
        Arc::new(NoopObserver),
        Handle::current(),
    )?;
    view.surface_created();

    let end = end.unwrap_or(count);
    println!("Preloading tiles {}..{} of {} from {}", start, end, count, dir.display());

    let started = Instant::now();
    view.preload(start..end);
    let Some(report) = view.wait_preload().await else {
        anyhow::bail!("Preload did not complete");
    };

    println!("\nPreload complete in {}ms:", started.elapsed().as_millis());
    println!("  range:       {}..{}", report.range.start, report.range.end);
    println!("  loaded:      {}", report.loaded);
    println!("  unavailable: {}", report.unavailable);
    if report.cancelled {
        println!("  (cancelled)");
    }

    let stats = view.cache().stats();
    println!(
        "  cache: {} of {} slots, {} evictions, {} textures live ({} KiB)",
        view.cache().len(),
        view.cache().capacity(),
        stats.evictions,
        backend.live_count(),
        backend.live_bytes() / 1024
    );

    Ok(())
}
