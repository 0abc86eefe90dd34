//! Scan pipeline integration tests.
//!
//! These tests drive complete scans through the orchestrator with scripted
//! providers: provider workers -> merge queue -> routing -> deduplication ->
//! resolution.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tempfile::TempDir;

use aspiratv_core::{
    testing::{fixtures, MockProvider},
    ConfigError, MatchRequest, OrchestratorError, ProviderRegistry, ScanConfig, ScanContext,
    ScanError, ScanOrchestrator, SeenStore, Show, SqliteSeenStore,
};

/// Test helper holding the providers of one scenario.
struct TestHarness {
    providers: Vec<Arc<MockProvider>>,
    config: ScanConfig,
}

impl TestHarness {
    fn new(providers: Vec<Arc<MockProvider>>) -> Self {
        Self {
            providers,
            config: ScanConfig {
                timeout_secs: 0,
                queue_capacity: 16,
                grace_period_ms: 100,
            },
        }
    }

    fn orchestrator(&self, watch_list: Vec<MatchRequest>) -> ScanOrchestrator {
        let mut registry = ProviderRegistry::new();
        for provider in &self.providers {
            registry.register(provider.clone());
        }
        ScanOrchestrator::new(
            Arc::new(registry),
            watch_list,
            fixtures::destinations(),
            self.config.clone(),
        )
    }
}

fn accepted_ids(report: &aspiratv_core::ScanReport) -> Vec<(String, String)> {
    report
        .accepted
        .iter()
        .map(|a| (a.show.provider.clone(), a.show.id.clone()))
        .collect()
}

#[tokio::test]
async fn test_wildcard_request_accepts_every_show_of_its_provider() {
    let x = Arc::new(MockProvider::new("x").with_shows(vec![
        fixtures::episode("x", "1", "Les Lapins Crétins", 1, 1),
        fixtures::titled("x", "2", "Le Journal", "Édition du soir"),
        fixtures::daily("x", "3", "Météo", 2024, 3, 2),
    ]));
    let harness = TestHarness::new(vec![x]);
    let orch = harness.orchestrator(vec![MatchRequest::new("x", "Jeunesse")]);

    let report = orch.run(&ScanContext::new()).await.unwrap();

    assert_eq!(report.accepted.len(), 3);
    assert_eq!(report.unmatched, 0);
    assert!(report
        .accepted
        .iter()
        .all(|a| a.destination_path == PathBuf::from("/videos/kids")));
}

#[tokio::test]
async fn test_lapins_cretins_scenario() {
    let x = Arc::new(MockProvider::new("x").with_shows(vec![
        fixtures::episode("x", "101", "Les Lapins Crétins", 1, 1),
        fixtures::episode("x", "102", "Les Lapins Cretins", 1, 1),
    ]));
    let harness = TestHarness::new(vec![x.clone()]);
    let orch = harness.orchestrator(vec![fixtures::request("x", "lapins crétins", "Jeunesse")]);

    let report = orch.run(&ScanContext::new()).await.unwrap();

    assert_eq!(report.accepted.len(), 1);
    let accepted = &report.accepted[0];
    assert_eq!(accepted.show.id, "101");
    assert_eq!(accepted.destination, "Jeunesse");
    assert_eq!(accepted.destination_path, PathBuf::from("/videos/kids"));
    assert_eq!(report.duplicates, 1);
    assert_eq!(x.emitted_count(), 2);
}

#[tokio::test]
async fn test_first_matching_request_wins() {
    let x = Arc::new(MockProvider::new("x").with_shows(vec![fixtures::episode(
        "x",
        "1",
        "Les Lapins Crétins",
        1,
        1,
    )]));
    let harness = TestHarness::new(vec![x]);
    let orch = harness.orchestrator(vec![
        fixtures::request("x", "lapins", "Docs"),
        fixtures::request("x", "crétins", "Jeunesse"),
    ]);

    let report = orch.run(&ScanContext::new()).await.unwrap();

    assert_eq!(report.accepted.len(), 1);
    assert_eq!(report.accepted[0].destination, "Docs");
}

#[tokio::test]
async fn test_dedup_is_order_independent_across_providers() {
    for (slow, fast) in [("x", "z"), ("z", "x")] {
        let x = Arc::new(MockProvider::new("x").with_shows(vec![fixtures::episode(
            "x",
            "a",
            "Les Lapins Crétins",
            2,
            7,
        )]));
        let z = Arc::new(MockProvider::new("z").with_shows(vec![fixtures::episode(
            "z",
            "b",
            "LES LAPINS CRETINS",
            2,
            7,
        )]));
        let by_name = |name: &str| if name == "x" { x.clone() } else { z.clone() };
        by_name(slow)
            .set_item_delay(Duration::from_millis(80))
            .await;

        let harness = TestHarness::new(vec![x.clone(), z.clone()]);
        let orch = harness.orchestrator(vec![
            MatchRequest::new("x", "Jeunesse"),
            MatchRequest::new("z", "Jeunesse"),
        ]);

        let report = orch.run(&ScanContext::new()).await.unwrap();

        assert_eq!(report.accepted.len(), 1, "slow={}", slow);
        assert_eq!(report.duplicates, 1, "slow={}", slow);
        assert_eq!(report.accepted[0].show.provider, fast);
    }
}

#[tokio::test]
async fn test_unknown_destination_fails_before_providers_run() {
    let x = Arc::new(MockProvider::new("x").with_shows(vec![fixtures::episode(
        "x", "1", "Show", 1, 1,
    )]));
    let harness = TestHarness::new(vec![x.clone()]);
    let orch = harness.orchestrator(vec![
        MatchRequest::new("x", "Jeunesse"),
        MatchRequest::new("x", "Unknown").with_show("show"),
    ]);

    let err = orch.run(&ScanContext::new()).await.unwrap_err();

    match err {
        OrchestratorError::Config(ConfigError::UnknownDestination { destination, show }) => {
            assert_eq!(destination, "Unknown");
            assert_eq!(show, "show");
        }
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(x.scan_count(), 0);
}

#[tokio::test]
async fn test_failing_provider_keeps_partial_results() {
    let y = Arc::new(MockProvider::new("y").with_shows(vec![
        fixtures::episode("y", "1", "Série Y", 1, 1),
        fixtures::episode("y", "2", "Série Y", 1, 2),
        fixtures::episode("y", "3", "Série Y", 1, 3),
    ]));
    y.fail_after(2, ScanError::ConnectionFailed("connection reset".to_string()))
        .await;
    let z = Arc::new(MockProvider::new("z").with_shows(vec![
        fixtures::episode("z", "1", "Série Z", 1, 1),
        fixtures::episode("z", "2", "Série Z", 1, 2),
        fixtures::episode("z", "3", "Série Z", 1, 3),
    ]));
    z.set_item_delay(Duration::from_millis(10)).await;

    let harness = TestHarness::new(vec![y, z]);
    let orch = harness.orchestrator(vec![
        MatchRequest::new("y", "Jeunesse"),
        MatchRequest::new("z", "Docs"),
    ]);

    let report = orch.run(&ScanContext::new()).await.unwrap();

    assert_eq!(report.accepted_from("y").count(), 2);
    assert_eq!(report.accepted_from("z").count(), 3);
    assert_eq!(report.provider_errors.len(), 1);
    assert!(report.provider_errors["y"].contains("connection reset"));
    assert!(!report.cancelled);
}

#[tokio::test]
async fn test_arrival_order_preserved_within_provider() {
    let shows: Vec<Show> = (1..=20)
        .map(|n| fixtures::episode("x", &n.to_string(), "Show", 1, n))
        .collect();
    let x = Arc::new(MockProvider::new("x").with_shows(shows));
    let mut harness = TestHarness::new(vec![x]);
    harness.config.queue_capacity = 1;
    let orch = harness.orchestrator(vec![MatchRequest::new("x", "Jeunesse")]);

    let report = orch.run(&ScanContext::new()).await.unwrap();

    let ids: Vec<String> = accepted_ids(&report).into_iter().map(|(_, id)| id).collect();
    let expected: Vec<String> = (1..=20).map(|n| n.to_string()).collect();
    assert_eq!(ids, expected);
}

#[tokio::test]
async fn test_cancellation_stops_cooperative_providers() {
    let x = Arc::new(MockProvider::new("x").with_shows(vec![fixtures::episode(
        "x", "1", "Show", 1, 1,
    )]));
    x.hang_after(1).await;
    let z = Arc::new(MockProvider::new("z"));
    z.hang_after(0).await;

    let harness = TestHarness::new(vec![x, z]);
    let orch = harness.orchestrator(vec![
        MatchRequest::new("x", "Jeunesse"),
        MatchRequest::new("z", "Docs"),
    ]);

    let ctx = ScanContext::new();
    let canceller = {
        let ctx = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            ctx.cancel();
        })
    };

    let started = Instant::now();
    let report = tokio::time::timeout(Duration::from_secs(2), orch.run(&ctx))
        .await
        .expect("scan should stop after cancellation")
        .unwrap();
    canceller.await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(1));
    assert!(report.cancelled);
    assert_eq!(report.accepted.len(), 1);
    assert_eq!(report.provider_errors["x"], "Scan cancelled");
    assert_eq!(report.provider_errors["z"], "Scan cancelled");
}

#[tokio::test]
async fn test_provider_ignoring_cancellation_is_abandoned_after_grace() {
    let stuck = Arc::new(MockProvider::new("x"));
    stuck.hang_after(0).await;
    stuck.ignore_cancellation();

    let harness = TestHarness::new(vec![stuck]);
    let orch = harness.orchestrator(vec![MatchRequest::new("x", "Jeunesse")]);

    let ctx = ScanContext::new();
    ctx.cancel();

    let started = Instant::now();
    let report = tokio::time::timeout(Duration::from_secs(2), orch.run(&ctx))
        .await
        .expect("stuck provider should be abandoned")
        .unwrap();

    // grace_period_ms = 100
    assert!(started.elapsed() >= Duration::from_millis(100));
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(report.provider_errors["x"], "Scan cancelled");
}

#[tokio::test]
async fn test_scan_timeout_cancels_providers_not_caller() {
    let x = Arc::new(
        MockProvider::new("x")
            .with_shows(vec![fixtures::episode("x", "1", "Show", 1, 1)])
            .with_stream_url("1", "https://cdn.example.test/1.m3u8"),
    );
    x.hang_after(1).await;

    let mut harness = TestHarness::new(vec![x]);
    harness.config.timeout_secs = 1;
    let orch = harness.orchestrator(vec![MatchRequest::new("x", "Jeunesse")]);

    let ctx = ScanContext::new();
    let report = tokio::time::timeout(Duration::from_secs(3), orch.run(&ctx))
        .await
        .expect("timeout should end the scan")
        .unwrap();

    assert!(report.cancelled);
    assert_eq!(report.accepted.len(), 1);
    assert_eq!(report.provider_errors["x"], "Scan cancelled");

    // The timeout only ends the scan; accepted shows still resolve.
    assert!(!ctx.is_cancelled());
    let (targets, failures) = orch.resolve_all(&ctx, &report).await;
    assert!(failures.is_empty());
    assert_eq!(targets[0].url, "https://cdn.example.test/1.m3u8");
}

#[tokio::test]
async fn test_decoded_show_resolves_to_same_target() {
    let show = fixtures::episode("x", "42", "Les Lapins Crétins", 3, 12)
        .with_pitch("Les lapins envahissent le monde")
        .with_stream_url("https://cdn.example.test/42.m3u8");

    let decoded = Show::from_bytes(&show.to_bytes().unwrap()).unwrap();
    assert_eq!(decoded.match_key(), show.match_key());

    let x = Arc::new(MockProvider::new("x"));
    let harness = TestHarness::new(vec![x]);
    let orch = harness.orchestrator(vec![MatchRequest::new("x", "Jeunesse")]);
    let ctx = ScanContext::new();

    let accepted = aspiratv_core::AcceptedShow {
        match_key: decoded.match_key(),
        show: decoded,
        destination: "Jeunesse".to_string(),
        destination_path: PathBuf::from("/videos/kids"),
    };
    let target = orch.resolve(&ctx, &accepted).await.unwrap();
    assert_eq!(target.url, "https://cdn.example.test/42.m3u8");
    assert_eq!(target.file_name, "Les Lapins Crétins - s03e12.mp4");
}

#[tokio::test]
async fn test_seen_store_carries_duplicates_across_runs() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("seen.db");
    let store = SqliteSeenStore::new(&db_path).expect("Failed to create seen store");

    let x = Arc::new(MockProvider::new("x").with_shows(vec![
        fixtures::episode("x", "1", "Show", 1, 1),
        fixtures::episode("x", "2", "Show", 1, 2),
    ]));
    let harness = TestHarness::new(vec![x.clone()]);
    let watch_list = vec![MatchRequest::new("x", "Jeunesse")];

    // First run: everything is new
    let first = harness
        .orchestrator(watch_list.clone())
        .run(&ScanContext::new())
        .await
        .unwrap();
    assert_eq!(first.accepted.len(), 2);
    for accepted in &first.accepted {
        store.insert(&accepted.show, &accepted.destination).unwrap();
    }

    // Second run: a third episode appears, the first two are already seen
    x.set_shows(vec![
        fixtures::episode("x", "1", "Show", 1, 1),
        fixtures::episode("x", "2", "Show", 1, 2),
        fixtures::episode("x", "3", "Show", 1, 3),
    ])
    .await;
    let second = harness
        .orchestrator(watch_list)
        .with_seen(store.keys().unwrap())
        .run(&ScanContext::new())
        .await
        .unwrap();

    assert_eq!(accepted_ids(&second), vec![("x".to_string(), "3".to_string())]);
    assert_eq!(second.duplicates, 2);
}
