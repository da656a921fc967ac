//! Notifications from the scroller to the host

use tokio::sync::mpsc;
use tracing::warn;

/// Host callbacks fired by the gesture controller
pub trait ScrollObserver: Send + Sync {
    /// A different tile is now on top; fired once per integer crossing
    fn on_top_tile_changed(&self, index: usize);

    /// The centre tile was tapped
    fn on_tile_tapped(&self, index: usize);
}

/// Events emitted to hosts that prefer a channel over callbacks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewEvent {
    /// Tile on top changed after a scroll, fling or selection
    TopTileChanged { index: usize },
    /// Centre tile was tapped
    TileTapped { index: usize },
}

impl ScrollObserver for mpsc::UnboundedSender<ViewEvent> {
    fn on_top_tile_changed(&self, index: usize) {
        if self.send(ViewEvent::TopTileChanged { index }).is_err() {
            warn!("Failed to send view event: receiver dropped");
        }
    }

    fn on_tile_tapped(&self, index: usize) {
        if self.send(ViewEvent::TileTapped { index }).is_err() {
            warn!("Failed to send view event: receiver dropped");
        }
    }
}

/// Observer that ignores every notification
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl ScrollObserver for NoopObserver {
    fn on_top_tile_changed(&self, _index: usize) {}

    fn on_tile_tapped(&self, _index: usize) {}
}
