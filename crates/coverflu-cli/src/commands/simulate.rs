use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use tokio::runtime::Handle;
use tokio::sync::mpsc;

use coverflu_core::tiles::{MemoryBackend, RawImage, TileSource};
use coverflu_core::{AppConfig, CoverFlowView, ViewEvent};

const SURFACE_WIDTH: u32 = 800;
const SURFACE_HEIGHT: u32 = 480;
const FRAME: Duration = Duration::from_millis(16);
/// Stop a runaway simulation after this many frames
const MAX_FRAMES: usize = 600;

/// Strip of solid-colour tiles, every seventh one without an image
struct SyntheticSource {
    count: usize,
}

impl TileSource for SyntheticSource {
    fn count(&self) -> usize {
        self.count
    }

    fn image_for(&self, index: usize) -> Option<RawImage> {
        if index >= self.count || index % 7 == 6 {
            return None;
        }
        let shade = (index * 37 % 256) as u8;
        Some(RawImage::solid(64, 64, [shade, 255 - shade, 128, 255]))
    }
}

pub async fn run(
    config: &AppConfig,
    tiles: usize,
    start: usize,
    drag: f32,
    duration_ms: u64,
) -> Result<()> {
    let backend = Arc::new(MemoryBackend::new());
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut view = CoverFlowView::new(
        config,
        Arc::new(SyntheticSource { count: tiles }),
        backend.clone(),
        Arc::new(tx),
        Handle::current(),
    )?;

    view.surface_created();
    view.surface_changed(SURFACE_WIDTH, SURFACE_HEIGHT);
    view.set_selection(start);

    println!(
        "Simulating {} tiles from tile {}, drag {:+.0}px over {}ms\n",
        tiles, start, drag, duration_ms
    );

    // Scripted press, evenly spaced moves, release
    let t0 = Instant::now();
    let (x0, y) = (SURFACE_WIDTH as f32 / 2.0, SURFACE_HEIGHT as f32 / 2.0);
    let steps = (duration_ms / FRAME.as_millis() as u64).max(1);
    view.press_begin(x0, y, t0);
    for step in 1..=steps {
        let at = t0 + Duration::from_millis(duration_ms * step / steps);
        let x = x0 + drag * step as f32 / steps as f32;
        view.press_move(x, y, at);
    }
    let mut now = t0 + Duration::from_millis(duration_ms);
    view.press_end(x0 + drag, y, now);
    print_events(&mut rx, now - t0);

    for _ in 0..MAX_FRAMES {
        let frame = view.frame(now);
        let top = frame
            .top_tile
            .map(|tile| tile.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  t={:>5}ms  offset={:>7.3}  top={:>3}  drawn={}",
            (now - t0).as_millis(),
            frame.offset,
            top,
            frame.tiles.len()
        );
        print_events(&mut rx, now - t0);

        if !frame.animating {
            break;
        }
        now += FRAME;
    }

    let stats = view.cache().stats();
    println!("\nCache:");
    println!(
        "  {} of {} slots used, {} textures live ({} bytes)",
        view.cache().len(),
        view.cache().capacity(),
        backend.live_count(),
        backend.live_bytes()
    );
    println!(
        "  hits={} misses={} evictions={} unavailable={} released={}",
        stats.hits, stats.misses, stats.evictions, stats.load_failures, stats.released
    );

    let released = view.clear_tile_cache();
    println!("  cleared, {} textures released", released);

    Ok(())
}

fn print_events(rx: &mut mpsc::UnboundedReceiver<ViewEvent>, at: Duration) {
    while let Ok(event) = rx.try_recv() {
        match event {
            ViewEvent::TopTileChanged { index } => {
                println!("  t={:>5}ms  -> tile {} on top", at.as_millis(), index)
            }
            ViewEvent::TileTapped { index } => {
                println!("  t={:>5}ms  -> tile {} tapped", at.as_millis(), index)
            }
        }
    }
}
