//! Background cache warm-up
//!
//! `preload` walks an index range and fills the cache, checking a
//! cancellation token between tiles. `TileLoader` runs it on the blocking
//! pool and makes sure at most one preload touches the cache at a time.

use std::ops::Range;
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use super::cache::TileCache;
use super::source::{ResourceBackend, TileSource};

/// Sending half of a cancellation token; dropping it cancels as well
#[derive(Debug)]
pub struct Canceller {
    tx: watch::Sender<bool>,
}

impl Canceller {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

/// Cooperative cancellation flag checked between tiles
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// Cancelled explicitly, or the owning side went away
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow() || self.rx.has_changed().is_err()
    }
}

pub fn cancel_pair() -> (Canceller, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (Canceller { tx }, CancelToken { rx })
}

/// Outcome of one preload run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreloadReport {
    /// Range actually walked after clamping to the tile count
    pub range: Range<usize>,
    /// Tiles that ended up with a texture
    pub loaded: usize,
    /// Tiles without an image or with a failed upload
    pub unavailable: usize,
    pub cancelled: bool,
}

/// Fill the cache for `range`, clamped to `[0, source.count())`
///
/// Stops before the next tile once `cancel` fires; the tile being loaded at
/// that moment is finished first.
pub fn preload<S, B>(
    range: Range<usize>,
    source: &S,
    cache: &TileCache<B>,
    cancel: &CancelToken,
) -> PreloadReport
where
    S: TileSource + ?Sized,
    B: ResourceBackend,
{
    let end = range.end.min(source.count());
    let start = range.start.min(end);
    let mut report = PreloadReport {
        range: start..end,
        loaded: 0,
        unavailable: 0,
        cancelled: false,
    };

    for index in start..end {
        if cancel.is_cancelled() {
            report.cancelled = true;
            break;
        }
        if cache.warm(index, source) {
            report.loaded += 1;
        } else {
            report.unavailable += 1;
        }
    }

    debug!(
        start,
        end,
        loaded = report.loaded,
        unavailable = report.unavailable,
        cancelled = report.cancelled,
        "preload finished"
    );
    report
}

struct PreloadJob {
    canceller: Canceller,
    task: JoinHandle<Option<PreloadReport>>,
}

/// Runs at most one background preload against a shared cache
pub struct TileLoader<S, B>
where
    S: TileSource + 'static,
    B: ResourceBackend + 'static,
{
    runtime: Handle,
    source: Arc<S>,
    cache: Arc<TileCache<B>>,
    current: Option<PreloadJob>,
}

impl<S, B> TileLoader<S, B>
where
    S: TileSource + 'static,
    B: ResourceBackend + 'static,
{
    pub fn new(runtime: Handle, source: Arc<S>, cache: Arc<TileCache<B>>) -> Self {
        Self {
            runtime,
            source,
            cache,
            current: None,
        }
    }

    /// Start warming `range` in the background and return immediately
    ///
    /// A preload that is still running is cancelled, and the new one waits
    /// for it to stop before touching the cache.
    pub fn start(&mut self, range: Range<usize>) {
        let previous = self.current.take().map(|job| {
            job.canceller.cancel();
            job.task
        });

        let (canceller, token) = cancel_pair();
        let source = self.source.clone();
        let cache = self.cache.clone();

        debug!(start = range.start, end = range.end, "preload scheduled");
        let task = self.runtime.spawn(async move {
            if let Some(previous) = previous {
                let _ = previous.await;
            }
            let job = tokio::task::spawn_blocking(move || {
                preload(range, source.as_ref(), cache.as_ref(), &token)
            });
            match job.await {
                Ok(report) => Some(report),
                Err(e) => {
                    error!("Preload task failed: {}", e);
                    None
                }
            }
        });

        self.current = Some(PreloadJob { canceller, task });
    }

    /// Ask the running preload to stop after its current tile
    pub fn cancel(&self) {
        if let Some(job) = &self.current {
            job.canceller.cancel();
        }
    }

    pub fn is_running(&self) -> bool {
        self.current
            .as_ref()
            .is_some_and(|job| !job.task.is_finished())
    }

    /// Wait for the latest preload and return its report
    pub async fn wait(&mut self) -> Option<PreloadReport> {
        let job = self.current.take()?;
        match job.task.await {
            Ok(report) => report,
            Err(e) => {
                error!("Preload task failed: {}", e);
                None
            }
        }
    }
}

impl<S, B> Drop for TileLoader<S, B>
where
    S: TileSource + 'static,
    B: ResourceBackend + 'static,
{
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiles::memory::MemoryBackend;
    use crate::tiles::source::RawImage;
    use crate::tiles::test_support::StripSource;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    fn cache(capacity: usize) -> Arc<TileCache<MemoryBackend>> {
        Arc::new(TileCache::new(capacity, MemoryBackend::new()).unwrap())
    }

    #[test]
    fn test_preload_clamps_to_count() {
        let cache = cache(48);
        let source = StripSource::new(5).with_missing(&[2]);
        let (_canceller, token) = cancel_pair();

        let report = preload(3..50, &source, &cache, &token);
        assert_eq!(report.range, 3..5);
        assert_eq!(report.loaded, 2);
        assert!(!report.cancelled);

        let report = preload(0..3, &source, &cache, &token);
        assert_eq!((report.loaded, report.unavailable), (2, 1));
        assert_eq!(cache.len(), 4);
    }

    #[test]
    fn test_long_preload_stays_within_capacity() {
        let cache = cache(48);
        let source = StripSource::new(500);
        let (_canceller, token) = cancel_pair();

        let report = preload(0..500, &source, &cache, &token);
        assert_eq!(report.loaded, 500);
        assert_eq!(cache.len(), 48);
        assert_eq!(cache.pending_releases(), 0);
        assert!(cache.backend().live_count() <= cache.capacity());
        assert_eq!(cache.backend().release_count(), 452);
    }

    #[test]
    fn test_empty_or_inverted_range_does_nothing() {
        let cache = cache(8);
        let source = StripSource::new(5);
        let (_canceller, token) = cancel_pair();

        let report = preload(9..20, &source, &cache, &token);
        assert_eq!(report.range, 5..5);
        let report = preload(4..2, &source, &cache, &token);
        assert_eq!(report.loaded, 0);
        assert_eq!(source.reads(), 0);
    }

    #[test]
    fn test_cancelled_token_stops_before_first_tile() {
        let cache = cache(8);
        let source = StripSource::new(10);
        let (canceller, token) = cancel_pair();
        canceller.cancel();

        let report = preload(0..10, &source, &cache, &token);
        assert!(report.cancelled);
        assert_eq!(source.reads(), 0);
    }

    #[test]
    fn test_dropping_canceller_cancels() {
        let (canceller, token) = cancel_pair();
        assert!(!token.is_cancelled());
        drop(canceller);
        assert!(token.is_cancelled());
    }

    /// Cancels its own preload while loading `stop_at`
    struct CancellingSource {
        stop_at: usize,
        canceller: Mutex<Option<Canceller>>,
    }

    impl TileSource for CancellingSource {
        fn count(&self) -> usize {
            100
        }

        fn image_for(&self, index: usize) -> Option<RawImage> {
            if index == self.stop_at {
                if let Some(canceller) = self.canceller.lock().unwrap().as_ref() {
                    canceller.cancel();
                }
            }
            Some(RawImage::solid(1, 1, [0; 4]))
        }
    }

    #[test]
    fn test_cancel_mid_range_finishes_current_tile() {
        let cache = cache(48);
        let (canceller, token) = cancel_pair();
        let source = CancellingSource {
            stop_at: 3,
            canceller: Mutex::new(Some(canceller)),
        };

        let report = preload(0..100, &source, &cache, &token);
        assert!(report.cancelled);
        assert_eq!(report.loaded, 4);
        assert!(cache.contains(3));
        assert!(!cache.contains(4));
    }

    #[tokio::test]
    async fn test_background_preload_reports() {
        let cache = cache(48);
        let source = Arc::new(StripSource::new(20));
        let mut loader = TileLoader::new(Handle::current(), source.clone(), cache.clone());

        loader.start(0..10);
        let report = loader.wait().await.unwrap();
        assert_eq!(report.loaded, 10);
        assert_eq!(cache.len(), 10);
        assert!(!loader.is_running());
        assert!(loader.wait().await.is_none());
    }

    /// Tracks how many loads overlap
    struct SlowSource {
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        reads: AtomicUsize,
    }

    impl TileSource for SlowSource {
        fn count(&self) -> usize {
            40
        }

        fn image_for(&self, _index: usize) -> Option<RawImage> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            self.reads.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(1));
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Some(RawImage::solid(1, 1, [0; 4]))
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_restart_never_runs_two_preloads_at_once() {
        let cache = cache(48);
        let source = Arc::new(SlowSource {
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            reads: AtomicUsize::new(0),
        });
        let mut loader = TileLoader::new(Handle::current(), source.clone(), cache.clone());

        loader.start(0..40);
        tokio::time::sleep(Duration::from_millis(5)).await;
        loader.start(0..40);
        let report = loader.wait().await.unwrap();

        assert!(!report.cancelled);
        assert_eq!(report.loaded, 40);
        assert_eq!(source.max_in_flight.load(Ordering::SeqCst), 1);
        // the second run reuses whatever the first managed to load
        assert_eq!(source.reads.load(Ordering::SeqCst), 40);
    }
}
