//! Mock provider for testing.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::RwLock;

use crate::config::ConfigError;
use crate::provider::{
    MatchRequest, Provider, ResolutionError, ScanContext, ScanError, Show, ShowSink,
};

/// Mock implementation of the Provider trait.
///
/// Emits every scripted show, whatever the requests say, so routing in the
/// merge stage gets exercised. Behavior is controllable:
/// - Per-item delays
/// - Failing or hanging after N shows
/// - Ignoring cancellation (to exercise the grace period)
/// - Per-show stream URLs and resolution failures (cancelled contexts fail
///   resolution too)
///
/// # Example
///
/// ```rust,ignore
/// use aspiratv_core::testing::{MockProvider, fixtures};
///
/// let provider = MockProvider::new("x")
///     .with_shows(vec![fixtures::episode("x", "1", "Les Lapins Crétins", 1, 1)]);
/// provider.fail_after(1, ScanError::ApiError("boom".into())).await;
///
/// // ... run a scan ...
/// assert_eq!(provider.scan_count(), 1);
/// assert_eq!(provider.emitted_count(), 1);
/// ```
pub struct MockProvider {
    name: String,
    /// Shows emitted by each scan, in order.
    shows: Arc<RwLock<Vec<Show>>>,
    /// Delay before each show.
    item_delay: Arc<RwLock<Duration>>,
    /// Fail with this error before emitting show N.
    fail_after: Arc<RwLock<Option<(usize, ScanError)>>>,
    /// Block before emitting show N.
    hang_after: Arc<RwLock<Option<usize>>>,
    /// Keep running when the context is cancelled.
    ignore_cancellation: Arc<AtomicBool>,
    /// Requests received by each scan.
    requests: Arc<RwLock<Vec<Vec<MatchRequest>>>>,
    stream_urls: Arc<RwLock<HashMap<String, String>>>,
    unavailable: Arc<RwLock<HashSet<String>>>,
    resolution_errors: Arc<RwLock<HashMap<String, ResolutionError>>>,
    scans: AtomicUsize,
    emitted: AtomicUsize,
    debug: AtomicBool,
    settings: Mutex<HashMap<String, String>>,
}

impl std::fmt::Debug for MockProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockProvider")
            .field("name", &self.name)
            .field("shows", &"<shows>")
            .field("scans", &self.scans.load(Ordering::SeqCst))
            .field("emitted", &self.emitted.load(Ordering::SeqCst))
            .finish()
    }
}

impl MockProvider {
    /// Create a mock provider with no shows.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            shows: Arc::new(RwLock::new(Vec::new())),
            item_delay: Arc::new(RwLock::new(Duration::ZERO)),
            fail_after: Arc::new(RwLock::new(None)),
            hang_after: Arc::new(RwLock::new(None)),
            ignore_cancellation: Arc::new(AtomicBool::new(false)),
            requests: Arc::new(RwLock::new(Vec::new())),
            stream_urls: Arc::new(RwLock::new(HashMap::new())),
            unavailable: Arc::new(RwLock::new(HashSet::new())),
            resolution_errors: Arc::new(RwLock::new(HashMap::new())),
            scans: AtomicUsize::new(0),
            emitted: AtomicUsize::new(0),
            debug: AtomicBool::new(false),
            settings: Mutex::new(HashMap::new()),
        }
    }

    /// Script the shows emitted by each scan.
    pub fn with_shows(mut self, shows: Vec<Show>) -> Self {
        self.shows = Arc::new(RwLock::new(shows));
        self
    }

    /// Resolve the show with this id to `url`.
    pub fn with_stream_url(mut self, id: impl Into<String>, url: impl Into<String>) -> Self {
        let mut urls = HashMap::new();
        urls.insert(id.into(), url.into());
        if let Some(existing) = Arc::get_mut(&mut self.stream_urls) {
            urls.extend(existing.get_mut().drain());
        }
        self.stream_urls = Arc::new(RwLock::new(urls));
        self
    }

    /// Report the show with this id as no longer available.
    pub fn with_unavailable(mut self, id: impl Into<String>) -> Self {
        let mut ids = HashSet::new();
        ids.insert(id.into());
        if let Some(existing) = Arc::get_mut(&mut self.unavailable) {
            ids.extend(existing.get_mut().drain());
        }
        self.unavailable = Arc::new(RwLock::new(ids));
        self
    }

    // =========================================================================
    // Configuration methods
    // =========================================================================

    /// Replace the scripted shows.
    pub async fn set_shows(&self, shows: Vec<Show>) {
        *self.shows.write().await = shows;
    }

    /// Wait this long before each show.
    pub async fn set_item_delay(&self, delay: Duration) {
        *self.item_delay.write().await = delay;
    }

    /// Emit `count` shows, then fail with `error`.
    pub async fn fail_after(&self, count: usize, error: ScanError) {
        *self.fail_after.write().await = Some((count, error));
    }

    /// Emit `count` shows, then block until cancelled (or forever when
    /// cancellation is ignored).
    pub async fn hang_after(&self, count: usize) {
        *self.hang_after.write().await = Some(count);
    }

    /// Keep running after the context is cancelled.
    pub fn ignore_cancellation(&self) {
        self.ignore_cancellation.store(true, Ordering::SeqCst);
    }

    pub async fn set_stream_url(&self, id: impl Into<String>, url: impl Into<String>) {
        self.stream_urls.write().await.insert(id.into(), url.into());
    }

    /// Fail resolution of the show with this id.
    pub async fn fail_resolution(&self, id: impl Into<String>, error: ResolutionError) {
        self.resolution_errors.write().await.insert(id.into(), error);
    }

    // =========================================================================
    // Inspection methods
    // =========================================================================

    /// Number of times `shows` was called.
    pub fn scan_count(&self) -> usize {
        self.scans.load(Ordering::SeqCst)
    }

    /// Shows delivered to a sink across all scans.
    pub fn emitted_count(&self) -> usize {
        self.emitted.load(Ordering::SeqCst)
    }

    /// Requests received, one entry per scan.
    pub async fn recorded_requests(&self) -> Vec<Vec<MatchRequest>> {
        self.requests.read().await.clone()
    }

    pub fn debug_enabled(&self) -> bool {
        self.debug.load(Ordering::SeqCst)
    }

    /// Settings applied by the last `configure` call.
    pub fn settings(&self) -> HashMap<String, String> {
        self.settings.lock().unwrap().clone()
    }

    /// Wait for `duration`, or until cancelled when cancellation is honored.
    async fn pause(&self, ctx: &ScanContext, duration: Duration) -> Result<(), ScanError> {
        if self.ignore_cancellation.load(Ordering::SeqCst) {
            tokio::time::sleep(duration).await;
            return Ok(());
        }
        tokio::select! {
            _ = ctx.cancelled() => Err(ScanError::Cancelled),
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }

    async fn hang(&self, ctx: &ScanContext) -> ScanError {
        if self.ignore_cancellation.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        ctx.cancelled().await;
        ScanError::Cancelled
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn shows(
        &self,
        ctx: &ScanContext,
        requests: &[MatchRequest],
        sink: ShowSink,
    ) -> Result<(), ScanError> {
        self.scans.fetch_add(1, Ordering::SeqCst);
        self.requests.write().await.push(requests.to_vec());

        let shows = self.shows.read().await.clone();
        let delay = *self.item_delay.read().await;
        let fail_after = self.fail_after.read().await.clone();
        let hang_after = *self.hang_after.read().await;
        let honors_cancel = !self.ignore_cancellation.load(Ordering::SeqCst);

        for index in 0..=shows.len() {
            if let Some((count, error)) = &fail_after {
                if *count == index {
                    return Err(error.clone());
                }
            }
            if hang_after == Some(index) {
                return Err(self.hang(ctx).await);
            }
            let Some(show) = shows.get(index) else {
                break;
            };
            if honors_cancel && ctx.is_cancelled() {
                return Err(ScanError::Cancelled);
            }
            if !delay.is_zero() {
                self.pause(ctx, delay).await?;
            }
            sink.send(show.clone()).await?;
            self.emitted.fetch_add(1, Ordering::SeqCst);
        }

        Ok(())
    }

    async fn show_stream_url(
        &self,
        ctx: &ScanContext,
        show: &Show,
    ) -> Result<String, ResolutionError> {
        if ctx.is_cancelled() && !self.ignore_cancellation.load(Ordering::SeqCst) {
            return Err(ResolutionError::Cancelled);
        }
        if self.unavailable.read().await.contains(&show.id) {
            return Err(ResolutionError::Unavailable {
                id: show.id.clone(),
            });
        }
        if let Some(error) = self.resolution_errors.read().await.get(&show.id) {
            return Err(error.clone());
        }
        if let Some(url) = self.stream_urls.read().await.get(&show.id) {
            return Ok(url.clone());
        }
        if let Some(url) = &show.stream_url {
            return Ok(url.clone());
        }
        Ok(format!("https://{}.example.test/{}.m3u8", self.name, show.id))
    }

    fn set_debug(&self, debug: bool) {
        self.debug.store(debug, Ordering::SeqCst);
    }

    fn configure(&self, settings: &HashMap<String, String>) -> Result<(), ConfigError> {
        *self.settings.lock().unwrap() = settings.clone();
        Ok(())
    }
}
