//! Scan orchestrator implementation.
//!
//! - Providers: one worker task each, all scanning concurrently
//! - Merge: a single stage drains the shared queue, routes and deduplicates
//!   (the dedup set is owned by that stage, no locking)

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::validate_watch_list;
use crate::matcher::{requests_for, route, DedupOutcome, Deduplicator, MatchKey};
use crate::metrics;
use crate::provider::{
    Destinations, MatchRequest, Provider, ProviderRegistry, ResolutionError, ScanContext,
    ScanError, ScanEvent, Show, ShowSink,
};

use super::config::ScanConfig;
use super::types::{AcceptedShow, DownloadTarget, OrchestratorError, ScanReport};

/// Runs providers concurrently and merges what they find.
pub struct ScanOrchestrator {
    registry: Arc<ProviderRegistry>,
    watch_list: Vec<MatchRequest>,
    destinations: Destinations,
    config: ScanConfig,
    active: Option<HashSet<String>>,
    seen: Vec<MatchKey>,
    downstream: Option<mpsc::Sender<AcceptedShow>>,
}

impl ScanOrchestrator {
    /// Create a new orchestrator over a validated watch list.
    pub fn new(
        registry: Arc<ProviderRegistry>,
        watch_list: Vec<MatchRequest>,
        destinations: Destinations,
        config: ScanConfig,
    ) -> Self {
        Self {
            registry,
            watch_list,
            destinations,
            config,
            active: None,
            seen: Vec::new(),
            downstream: None,
        }
    }

    /// Restrict the scan to these providers. Without it, every provider the
    /// watch list references is scanned.
    pub fn with_active_providers<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.active = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Episodes handled by earlier runs; they count as duplicates.
    pub fn with_seen(mut self, keys: impl IntoIterator<Item = MatchKey>) -> Self {
        self.seen = keys.into_iter().collect();
        self
    }

    /// Also stream every accepted show to `tx` as soon as it is accepted.
    pub fn with_downstream(mut self, tx: mpsc::Sender<AcceptedShow>) -> Self {
        self.downstream = Some(tx);
        self
    }

    pub fn watch_list(&self) -> &[MatchRequest] {
        &self.watch_list
    }

    /// Check the watch list and pick the providers to scan.
    ///
    /// Fails before any provider is touched when a watch-list entry names an
    /// undefined destination or an unregistered provider.
    pub fn preflight(&self) -> Result<Vec<(String, Arc<dyn Provider>)>, OrchestratorError> {
        validate_watch_list(&self.watch_list, &self.destinations, &self.registry)?;

        let mut selected: Vec<(String, Arc<dyn Provider>)> = Vec::new();
        for request in &self.watch_list {
            let name = &request.provider;
            if selected.iter().any(|(n, _)| n == name) {
                continue;
            }
            if let Some(active) = &self.active {
                if !active.contains(name) {
                    debug!(provider = %name, "Provider not active, skipping");
                    continue;
                }
            }
            if let Some(provider) = self.registry.get(name) {
                selected.push((name.clone(), provider));
            }
        }
        Ok(selected)
    }

    /// Scan every active provider and return what was accepted.
    ///
    /// Provider failures are recorded in the report and never abort the
    /// scan. Cancelling `ctx` stops the scan; the configured timeout only
    /// stops this scan and leaves `ctx` usable for resolution.
    pub async fn run(&self, ctx: &ScanContext) -> Result<ScanReport, OrchestratorError> {
        let providers = self.preflight()?;
        let started = Instant::now();
        let scan_ctx = ctx.child();

        info!(
            providers = providers.len(),
            watch_list = self.watch_list.len(),
            "Starting scan"
        );

        let (tx, mut rx) = mpsc::channel(self.config.queue_capacity.max(1));
        let grace = Duration::from_millis(self.config.grace_period_ms);

        let mut names = Vec::with_capacity(providers.len());
        let mut workers: Vec<JoinHandle<()>> = Vec::with_capacity(providers.len());
        for (name, provider) in providers {
            let requests = requests_for(&self.watch_list, &name);
            let sink = ShowSink::new(name.clone(), tx.clone());
            workers.push(tokio::spawn(run_worker(
                provider,
                scan_ctx.clone(),
                requests,
                sink,
                grace,
            )));
            names.push(name);
        }
        // Only workers hold senders now: the queue closes when they are all done.
        drop(tx);

        let timeout = self.spawn_timeout(&scan_ctx);

        let mut dedup = Deduplicator::with_seen(self.seen.iter().cloned());
        let mut report = ScanReport::default();

        while let Some(event) = rx.recv().await {
            match event {
                ScanEvent::Show(show) => {
                    self.merge_show(&scan_ctx, show, &mut dedup, &mut report).await
                }
                ScanEvent::Finished { provider, result } => match result {
                    Ok(()) => info!(provider = %provider, "Provider scan finished"),
                    Err(e) => {
                        warn!(provider = %provider, "Provider scan failed: {}", e);
                        metrics::SCAN_ERRORS.with_label_values(&[&provider]).inc();
                        report.provider_errors.insert(provider, e.to_string());
                    }
                },
            }
        }

        for (name, joined) in names.into_iter().zip(join_all(workers).await) {
            if let Err(e) = joined {
                error!(provider = %name, "Provider worker panicked: {}", e);
                metrics::SCAN_ERRORS.with_label_values(&[&name]).inc();
                report
                    .provider_errors
                    .insert(name, format!("worker panicked: {}", e));
            }
        }

        if let Some(timeout) = timeout {
            timeout.abort();
        }

        let elapsed = started.elapsed();
        metrics::SCAN_DURATION.observe(elapsed.as_secs_f64());
        report.cancelled = scan_ctx.is_cancelled();
        report.duration_ms = elapsed.as_millis() as u64;

        info!(
            accepted = report.accepted.len(),
            duplicates = report.duplicates,
            unmatched = report.unmatched,
            failed_providers = report.provider_errors.len(),
            duration_ms = report.duration_ms,
            "Scan complete"
        );
        Ok(report)
    }

    /// Resolve an accepted show into a download target.
    pub async fn resolve(
        &self,
        ctx: &ScanContext,
        accepted: &AcceptedShow,
    ) -> Result<DownloadTarget, ResolutionError> {
        let show = &accepted.show;
        let provider = self
            .registry
            .get(&show.provider)
            .ok_or_else(|| ResolutionError::UnknownProvider(show.provider.clone()))?;

        let url = match provider.show_stream_url(ctx, show).await {
            Ok(url) => url,
            Err(e) => {
                warn!(provider = %show.provider, show = %show, "Cannot resolve stream: {}", e);
                metrics::RESOLUTION_FAILURES
                    .with_label_values(&[&show.provider])
                    .inc();
                return Err(e);
            }
        };

        Ok(DownloadTarget {
            url,
            destination_path: accepted.destination_path.clone(),
            file_name: provider.show_file_name(show),
            file_name_matcher: provider.show_file_name_matcher(show),
            provider: show.provider.clone(),
            show_id: show.id.clone(),
        })
    }

    /// Resolve every accepted show of a report. Failures are per item.
    pub async fn resolve_all(
        &self,
        ctx: &ScanContext,
        report: &ScanReport,
    ) -> (Vec<DownloadTarget>, Vec<(AcceptedShow, ResolutionError)>) {
        let mut targets = Vec::new();
        let mut failures = Vec::new();
        for accepted in &report.accepted {
            match self.resolve(ctx, accepted).await {
                Ok(target) => targets.push(target),
                Err(e) => failures.push((accepted.clone(), e)),
            }
        }
        (targets, failures)
    }

    fn spawn_timeout(&self, ctx: &ScanContext) -> Option<JoinHandle<()>> {
        if self.config.timeout_secs == 0 {
            return None;
        }
        let ctx = ctx.clone();
        let timeout = Duration::from_secs(self.config.timeout_secs);
        Some(tokio::spawn(async move {
            tokio::select! {
                _ = ctx.cancelled() => {}
                _ = tokio::time::sleep(timeout) => {
                    warn!(timeout_secs = timeout.as_secs(), "Scan timed out, cancelling providers");
                    ctx.cancel();
                }
            }
        }))
    }

    async fn merge_show(
        &self,
        ctx: &ScanContext,
        show: Show,
        dedup: &mut Deduplicator,
        report: &mut ScanReport,
    ) {
        metrics::SHOWS_DISCOVERED
            .with_label_values(&[&show.provider])
            .inc();
        *report
            .shows_per_provider
            .entry(show.provider.clone())
            .or_default() += 1;

        let Some(request) = route(&self.watch_list, &show) else {
            debug!(provider = %show.provider, show = %show, "Show matches no watch-list entry");
            metrics::UNMATCHED_SHOWS
                .with_label_values(&[&show.provider])
                .inc();
            report.unmatched += 1;
            return;
        };

        let Some(destination_path) = self.destinations.get(&request.destination).cloned() else {
            // Unreachable after preflight, kept as a log rather than a panic.
            error!(destination = %request.destination, "Destination disappeared during scan");
            return;
        };

        match dedup.observe(&show) {
            DedupOutcome::Duplicate(key) => {
                debug!(provider = %show.provider, show = %show, key = %key, "Duplicate episode skipped");
                metrics::DUPLICATES_SKIPPED.inc();
                report.duplicates += 1;
            }
            DedupOutcome::Accepted(match_key) => {
                info!(
                    provider = %show.provider,
                    show = %show,
                    destination = %request.destination,
                    "Show accepted"
                );
                metrics::SHOWS_ACCEPTED
                    .with_label_values(&[&request.destination])
                    .inc();

                let accepted = AcceptedShow {
                    show,
                    destination: request.destination.clone(),
                    destination_path,
                    match_key,
                };
                if let Some(tx) = &self.downstream {
                    // A full downstream queue must not outlive cancellation.
                    tokio::select! {
                        biased;
                        sent = tx.send(accepted.clone()) => {
                            if sent.is_err() {
                                warn!("Downstream receiver closed, keeping show in report only");
                            }
                        }
                        _ = ctx.cancelled() => {
                            warn!(show = %accepted.show, "Scan cancelled with downstream full, keeping show in report only");
                        }
                    }
                }
                report.accepted.push(accepted);
            }
        }
    }
}

/// Drive one provider until it finishes, fails, or ignores cancellation for
/// longer than `grace`.
async fn run_worker(
    provider: Arc<dyn Provider>,
    ctx: ScanContext,
    requests: Vec<MatchRequest>,
    sink: ShowSink,
    grace: Duration,
) {
    let name = sink.provider().to_string();
    let started = Instant::now();
    debug!(provider = %name, requests = requests.len(), "Provider scan started");

    let result = tokio::select! {
        result = provider.shows(&ctx, &requests, sink.clone()) => result,
        _ = abandon_after(&ctx, grace) => {
            warn!(provider = %name, "Provider ignored cancellation, abandoning it");
            Err(ScanError::Cancelled)
        }
    };

    let outcome = if result.is_ok() { "success" } else { "error" };
    metrics::PROVIDER_SCAN_DURATION
        .with_label_values(&[&name, outcome])
        .observe(started.elapsed().as_secs_f64());

    sink.finish(result).await;
}

async fn abandon_after(ctx: &ScanContext, grace: Duration) {
    ctx.cancelled().await;
    tokio::time::sleep(grace).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixtures, MockProvider};
    use std::path::PathBuf;

    fn orchestrator(providers: Vec<Arc<MockProvider>>, watch_list: Vec<MatchRequest>) -> ScanOrchestrator {
        let mut registry = ProviderRegistry::new();
        for provider in providers {
            registry.register(provider);
        }
        ScanOrchestrator::new(
            Arc::new(registry),
            watch_list,
            fixtures::destinations(),
            ScanConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_unknown_destination_fails_before_any_scan() {
        let x = Arc::new(MockProvider::new("x"));
        let orch = orchestrator(
            vec![x.clone()],
            vec![MatchRequest::new("x", "Unknown")],
        );

        let result = orch.run(&ScanContext::new()).await;
        assert!(matches!(
            result,
            Err(OrchestratorError::Config(crate::config::ConfigError::UnknownDestination { .. }))
        ));
        assert_eq!(x.scan_count(), 0);
    }

    #[tokio::test]
    async fn test_inactive_providers_are_not_scanned() {
        let x = Arc::new(MockProvider::new("x").with_shows(vec![fixtures::episode("x", "1", "Show", 1, 1)]));
        let y = Arc::new(MockProvider::new("y").with_shows(vec![fixtures::episode("y", "2", "Other", 1, 1)]));
        let orch = orchestrator(
            vec![x.clone(), y.clone()],
            vec![
                MatchRequest::new("x", "Jeunesse"),
                MatchRequest::new("y", "Docs"),
            ],
        )
        .with_active_providers(["y"]);

        let report = orch.run(&ScanContext::new()).await.unwrap();
        assert_eq!(x.scan_count(), 0);
        assert_eq!(y.scan_count(), 1);
        assert_eq!(report.accepted.len(), 1);
        assert_eq!(report.accepted[0].destination, "Docs");
    }

    #[tokio::test]
    async fn test_provider_receives_only_its_requests() {
        let x = Arc::new(MockProvider::new("x"));
        let orch = orchestrator(
            vec![x.clone(), Arc::new(MockProvider::new("y"))],
            vec![
                MatchRequest::new("x", "Jeunesse").with_show("a"),
                MatchRequest::new("y", "Docs"),
                MatchRequest::new("x", "Docs").with_show("b"),
            ],
        );

        orch.run(&ScanContext::new()).await.unwrap();
        let recorded = x.recorded_requests().await;
        assert_eq!(recorded.len(), 1);
        let shows: Vec<&str> = recorded[0].iter().map(|r| r.show.as_str()).collect();
        assert_eq!(shows, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_unmatched_shows_are_counted_not_accepted() {
        let x = Arc::new(MockProvider::new("x").with_shows(vec![
            fixtures::episode("x", "1", "Les Lapins Crétins", 1, 1),
            fixtures::episode("x", "2", "Le Journal", 1, 1),
        ]));
        let orch = orchestrator(
            vec![x],
            vec![MatchRequest::new("x", "Jeunesse").with_show("lapins")],
        );

        let report = orch.run(&ScanContext::new()).await.unwrap();
        assert_eq!(report.accepted.len(), 1);
        assert_eq!(report.unmatched, 1);
        assert_eq!(report.shows_per_provider["x"], 2);
    }

    #[tokio::test]
    async fn test_seen_keys_from_previous_run_are_duplicates() {
        let show = fixtures::episode("x", "1", "Show", 1, 1);
        let x = Arc::new(MockProvider::new("x").with_shows(vec![show.clone()]));
        let orch = orchestrator(vec![x], vec![MatchRequest::new("x", "Jeunesse")])
            .with_seen([show.match_key()]);

        let report = orch.run(&ScanContext::new()).await.unwrap();
        assert!(report.accepted.is_empty());
        assert_eq!(report.duplicates, 1);
    }

    #[tokio::test]
    async fn test_downstream_receives_accepted_shows() {
        let x = Arc::new(MockProvider::new("x").with_shows(vec![
            fixtures::episode("x", "1", "Show", 1, 1),
            fixtures::episode("x", "2", "Show", 1, 2),
        ]));
        let (tx, mut rx) = mpsc::channel(8);
        let orch = orchestrator(vec![x], vec![MatchRequest::new("x", "Jeunesse")])
            .with_downstream(tx);

        let report = orch.run(&ScanContext::new()).await.unwrap();
        drop(orch);

        let mut streamed = Vec::new();
        while let Some(accepted) = rx.recv().await {
            streamed.push(accepted.show.id);
        }
        assert_eq!(streamed, vec!["1".to_string(), "2".to_string()]);
        assert_eq!(report.accepted.len(), 2);
    }

    #[tokio::test]
    async fn test_full_downstream_does_not_block_cancelled_scan() {
        let x = Arc::new(MockProvider::new("x").with_shows(vec![
            fixtures::episode("x", "1", "Show", 1, 1),
            fixtures::episode("x", "2", "Show", 1, 2),
            fixtures::episode("x", "3", "Show", 1, 3),
        ]));
        let (tx, _rx) = mpsc::channel(1);
        let orch = orchestrator(vec![x], vec![MatchRequest::new("x", "Jeunesse")])
            .with_downstream(tx);
        let ctx = ScanContext::new();
        {
            let ctx = ctx.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(100)).await;
                ctx.cancel();
            });
        }

        let report = tokio::time::timeout(Duration::from_secs(5), orch.run(&ctx))
            .await
            .expect("scan should end once cancelled")
            .unwrap();

        assert!(report.cancelled);
        assert_eq!(report.accepted.len(), 3);
    }

    #[tokio::test]
    async fn test_resolve_builds_download_target() {
        let show = fixtures::episode("x", "1", "Les Lapins Crétins", 1, 2);
        let x = Arc::new(
            MockProvider::new("x")
                .with_shows(vec![show])
                .with_stream_url("1", "https://cdn.example.test/1.m3u8"),
        );
        let orch = orchestrator(vec![x], vec![MatchRequest::new("x", "Jeunesse")]);
        let ctx = ScanContext::new();

        let report = orch.run(&ctx).await.unwrap();
        let target = orch.resolve(&ctx, &report.accepted[0]).await.unwrap();

        assert_eq!(target.url, "https://cdn.example.test/1.m3u8");
        assert_eq!(target.destination_path, PathBuf::from("/videos/kids"));
        assert_eq!(target.file_name, "Les Lapins Crétins - s01e02.mp4");
        assert_eq!(target.file_name_matcher, "Les Lapins Crétins - *.mp4");
    }

    #[tokio::test]
    async fn test_resolution_failures_are_per_item() {
        let x = Arc::new(
            MockProvider::new("x")
                .with_shows(vec![
                    fixtures::episode("x", "1", "Show", 1, 1),
                    fixtures::episode("x", "2", "Show", 1, 2),
                ])
                .with_unavailable("1"),
        );
        let orch = orchestrator(vec![x], vec![MatchRequest::new("x", "Jeunesse")]);
        let ctx = ScanContext::new();

        let report = orch.run(&ctx).await.unwrap();
        let (targets, failures) = orch.resolve_all(&ctx, &report).await;

        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].show_id, "2");
        assert_eq!(failures.len(), 1);
        assert!(matches!(failures[0].1, ResolutionError::Unavailable { .. }));
    }
}
