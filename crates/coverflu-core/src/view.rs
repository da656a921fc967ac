//! Cover-flow view: wires the scroller, cache and loader to one surface
//!
//! The host forwards surface lifecycle and touch events, and calls
//! `frame()` once per rendered frame to get the textures to draw and where.

use std::ops::Range;
use std::sync::Arc;
use std::time::Instant;

use tokio::runtime::Handle;
use tracing::{debug, info};

use crate::config::{AppConfig, ViewConfig};
use crate::observer::ScrollObserver;
use crate::scroll::{round_offset, GestureController, HitRect};
use crate::tiles::{
    PreloadReport, ResourceBackend, ResourceHandle, TileCache, TileLoader, TileSource,
};
use crate::Result;

/// One textured tile to draw this frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileDraw {
    pub index: usize,
    pub handle: ResourceHandle,
    /// Distance from the centre in tile units, negative to the left
    pub position: f64,
}

/// Everything the renderer needs for one frame
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub offset: f64,
    pub top_tile: Option<usize>,
    /// Back to front: left tiles ascending, then right tiles down to the centre
    pub tiles: Vec<TileDraw>,
    /// A fling is still running; schedule another frame
    pub animating: bool,
}

/// Indices to draw around `offset`, back to front
///
/// The centre tile comes last so it ends up on top.
pub fn draw_order(count: usize, offset: f64, visible: usize) -> Vec<usize> {
    if count == 0 {
        return Vec::new();
    }
    let max = count as i64 - 1;
    let mid = round_offset(offset).clamp(0, max);
    let start = (mid - visible as i64).max(0);
    let end = (mid + visible as i64).min(max);

    (start..mid)
        .chain((mid..=end).rev())
        .map(|index| index as usize)
        .collect()
}

/// A horizontal strip of tiles bound to one rendering surface
pub struct CoverFlowView<S, B>
where
    S: TileSource + 'static,
    B: ResourceBackend + 'static,
{
    config: ViewConfig,
    source: Arc<S>,
    cache: Arc<TileCache<B>>,
    controller: GestureController,
    loader: TileLoader<S, B>,
}

impl<S, B> CoverFlowView<S, B>
where
    S: TileSource + 'static,
    B: ResourceBackend + 'static,
{
    /// Build a view whose preloads run on `runtime`
    pub fn new(
        config: &AppConfig,
        source: Arc<S>,
        backend: B,
        observer: Arc<dyn ScrollObserver>,
        runtime: Handle,
    ) -> Result<Self> {
        config.validate()?;
        let cache = Arc::new(TileCache::from_config(&config.cache, backend)?);
        let mut controller = GestureController::new(config.scroll.clone(), observer);
        controller.set_count(source.count());
        let loader = TileLoader::new(runtime, source.clone(), cache.clone());

        Ok(Self {
            config: config.view.clone(),
            source,
            cache,
            controller,
            loader,
        })
    }

    pub fn controller(&self) -> &GestureController {
        &self.controller
    }

    pub fn cache(&self) -> &Arc<TileCache<B>> {
        &self.cache
    }

    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    pub fn offset(&self) -> f64 {
        self.controller.offset()
    }

    /// A new rendering context exists; textures from the old one are gone
    pub fn surface_created(&mut self) -> usize {
        let released = self.cache.clear();
        info!(released, "surface created");
        released
    }

    pub fn surface_changed(&mut self, width: u32, height: u32) {
        let (width, height) = (width as f32, height as f32);
        let hit_rect = HitRect::centered(
            width,
            height,
            self.config.hit_fraction,
            self.config.hit_scale,
        );
        debug!(width, height, ?hit_rect, "surface changed");
        self.controller.set_surface(width, hit_rect);
    }

    pub fn press_begin(&mut self, x: f32, y: f32, at: Instant) {
        self.controller.set_count(self.source.count());
        self.controller.press_begin(x, y, at);
    }

    pub fn press_move(&mut self, x: f32, y: f32, at: Instant) {
        self.controller.press_move(x, y, at);
    }

    pub fn press_end(&mut self, x: f32, y: f32, at: Instant) {
        self.controller.press_end(x, y, at);
    }

    pub fn set_selection(&mut self, index: usize) {
        self.controller.set_count(self.source.count());
        self.controller.set_selection(index);
    }

    /// Whether a frame should be rendered
    pub fn take_redraw_request(&mut self) -> bool {
        self.controller.take_redraw_request() || self.controller.is_animating()
    }

    /// Warm the cache for `range` in the background
    pub fn preload(&mut self, range: Range<usize>) {
        self.loader.start(range);
    }

    /// Warm the visible window plus one window of margin on each side
    pub fn preload_around(&mut self) {
        let count = self.source.count();
        if count == 0 {
            return;
        }
        let margin = self.config.visible_tiles as i64 * 2;
        let mid = round_offset(self.controller.offset()).clamp(0, count as i64 - 1);
        let start = (mid - margin).max(0) as usize;
        let end = ((mid + margin + 1) as usize).min(count);
        self.loader.start(start..end);
    }

    pub fn cancel_preload(&self) {
        self.loader.cancel();
    }

    /// Wait for the background preload, if any
    pub async fn wait_preload(&mut self) -> Option<PreloadReport> {
        self.loader.wait().await
    }

    pub fn clear_tile_cache(&self) -> usize {
        self.cache.clear()
    }

    /// Advance animation, recycle textures and collect this frame's tiles
    ///
    /// Must run on the rendering context. Handles in the returned frame are
    /// valid until the next call.
    pub fn frame(&mut self, now: Instant) -> Frame {
        let count = self.source.count();
        self.controller.set_count(count);
        let animating = self.controller.tick(now);
        self.cache.begin_frame();

        let offset = self.controller.offset();
        let tiles = draw_order(count, offset, self.config.visible_tiles)
            .into_iter()
            .filter_map(|index| {
                let handle = self.cache.get_or_create(index, self.source.as_ref())?;
                Some(TileDraw {
                    index,
                    handle,
                    position: index as f64 - offset,
                })
            })
            .collect();

        Frame {
            offset,
            top_tile: self.controller.top_tile(),
            tiles,
            animating,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::ViewEvent;
    use crate::tiles::test_support::StripSource;
    use crate::tiles::MemoryBackend;
    use std::time::Duration;
    use tokio::sync::mpsc;

    type TestView = CoverFlowView<StripSource, Arc<MemoryBackend>>;

    fn view(
        count: usize,
    ) -> (
        TestView,
        Arc<MemoryBackend>,
        mpsc::UnboundedReceiver<ViewEvent>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let backend = Arc::new(MemoryBackend::new());
        let mut view = CoverFlowView::new(
            &AppConfig::default(),
            Arc::new(StripSource::new(count)),
            backend.clone(),
            Arc::new(tx),
            Handle::current(),
        )
        .unwrap();
        view.surface_created();
        view.surface_changed(800, 480);
        (view, backend, rx)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<ViewEvent>) -> Vec<ViewEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_draw_order_centre_last() {
        assert_eq!(draw_order(10, 5.0, 3), vec![2, 3, 4, 8, 7, 6, 5]);
        assert_eq!(draw_order(10, 0.2, 3), vec![3, 2, 1, 0]);
        assert_eq!(draw_order(10, 9.0, 3), vec![6, 7, 8, 9]);
        assert_eq!(draw_order(10, 4.5, 1), vec![4, 6, 5]);
    }

    #[test]
    fn test_draw_order_without_tiles() {
        assert!(draw_order(0, 0.0, 3).is_empty());
        assert_eq!(draw_order(1, 0.0, 3), vec![0]);
    }

    #[tokio::test]
    async fn test_frame_draws_visible_window() {
        let (mut view, backend, mut rx) = view(10);
        view.set_selection(5);
        assert_eq!(drain(&mut rx), vec![ViewEvent::TopTileChanged { index: 5 }]);

        let frame = view.frame(Instant::now());
        let indices: Vec<usize> = frame.tiles.iter().map(|t| t.index).collect();
        assert_eq!(indices, vec![2, 3, 4, 8, 7, 6, 5]);
        assert_eq!(frame.tiles.last().map(|t| t.position), Some(0.0));
        assert_eq!(frame.top_tile, Some(5));
        assert!(!frame.animating);
        assert_eq!(backend.live_count(), 7);
    }

    #[tokio::test]
    async fn test_count_shrinking_to_zero() {
        let (mut view, _backend, _rx) = view(10);
        view.set_selection(7);
        view.frame(Instant::now());

        view.source().set_count(0);
        let frame = view.frame(Instant::now());
        assert_eq!(frame.offset, 0.0);
        assert_eq!(frame.top_tile, None);
        assert!(frame.tiles.is_empty());
    }

    #[tokio::test]
    async fn test_surface_created_releases_everything() {
        let (mut view, backend, _rx) = view(10);
        view.frame(Instant::now());
        assert!(backend.live_count() > 0);

        view.surface_created();
        assert_eq!(backend.live_count(), 0);
        assert!(view.cache().is_empty());
        assert_eq!(backend.rejected_release_count(), 0);

        // textures are recreated on the next frame
        let frame = view.frame(Instant::now());
        assert_eq!(frame.tiles.len(), 4);
    }

    #[tokio::test]
    async fn test_tap_on_centre_tile() {
        let (mut view, _backend, mut rx) = view(10);
        view.set_selection(2);
        drain(&mut rx);

        let now = Instant::now();
        view.press_begin(400.0, 240.0, now);
        view.press_end(401.0, 241.0, now + Duration::from_millis(80));
        assert_eq!(drain(&mut rx), vec![ViewEvent::TileTapped { index: 2 }]);

        // outside the centre rectangle
        view.press_begin(100.0, 240.0, now);
        view.press_end(100.0, 240.0, now + Duration::from_millis(80));
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_fling_settles_on_whole_tile() {
        let (mut view, _backend, mut rx) = view(20);
        let start = Instant::now();
        view.press_begin(600.0, 240.0, start);
        for step in 1..=5u32 {
            let at = start + Duration::from_millis(16 * step as u64);
            view.press_move(600.0 - 40.0 * step as f32, 240.0, at);
        }
        view.press_end(380.0, 240.0, start + Duration::from_millis(96));
        assert!(view.take_redraw_request());

        let mut now = start + Duration::from_millis(96);
        let mut frame = view.frame(now);
        while frame.animating {
            now += Duration::from_millis(16);
            frame = view.frame(now);
        }

        assert_eq!(frame.offset, frame.offset.round());
        assert!(frame.offset > 0.0);
        let events = drain(&mut rx);
        assert_eq!(
            events.last(),
            Some(&ViewEvent::TopTileChanged {
                index: frame.offset as usize
            })
        );
    }

    #[tokio::test]
    async fn test_preload_around_warms_cache() {
        let (mut view, backend, _rx) = view(30);
        view.set_selection(10);
        view.preload_around();
        let report = view.wait_preload().await.unwrap();

        assert_eq!(report.range, 4..17);
        assert_eq!(report.loaded, 13);
        assert_eq!(backend.live_count(), 13);

        // the visible window is already cached
        let uploads = backend.upload_count();
        view.frame(Instant::now());
        assert_eq!(backend.upload_count(), uploads);
    }
}
