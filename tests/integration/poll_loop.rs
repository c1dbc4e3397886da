//! End-to-end loop behavior against scripted fetchers.

use std::time::Duration;

use slack_history_harvester::checkpoint::{CheckpointState, CheckpointStore};
use slack_history_harvester::harvester::{Harvester, HarvestOutcome, RunMode};

use crate::support::{page, ScriptedFetcher};

fn store_in(dir: &tempfile::TempDir) -> CheckpointStore {
    CheckpointStore::new(dir.path().join("cursor.state.json"))
}

fn fast(fetcher: ScriptedFetcher, store: CheckpointStore) -> Harvester<ScriptedFetcher> {
    Harvester::new(fetcher, store)
        .with_request_interval(Duration::from_millis(1))
        .with_retry_policy(3, Duration::from_millis(1))
}

/// The worked example: two batches, the second crossing the lower bound.
#[tokio::test]
async fn worked_example_advances_then_finishes_at_lower_bound() {
    let dir = tempfile::TempDir::new().unwrap();
    let store = store_in(&dir);
    let fetcher = ScriptedFetcher::new(vec![
        Ok(page("2025-09-24 02:54:14", Some("C1"))),
        Ok(page("2023-12-31 23:59:59", Some("C2"))),
    ]);

    let outcome = fast(fetcher, store.clone())
        .with_lower_bound(Some("2024-01-01".to_string()))
        .run()
        .await
        .unwrap();

    assert_eq!(outcome, HarvestOutcome::Finished);
    let state = store.load();
    assert_eq!(state.cursor.as_deref(), Some("C2"));
    assert_eq!(state.batch_no, 2);
    assert!(state.finished);
}

/// Each fetch is issued with the cursor saved by the previous batch.
#[tokio::test]
async fn cursor_chains_across_batches() {
    let dir = tempfile::TempDir::new().unwrap();
    let store = store_in(&dir);
    let fetcher = std::sync::Arc::new(ScriptedFetcher::new(vec![
        Ok(page("2025-09-24 02:54:14", Some("C1"))),
        Ok(page("2025-09-23 02:54:14", Some("C2"))),
        Ok(page("2025-09-22 02:54:14", None)),
    ]));

    let harvester = Harvester::new(fetcher.clone(), store.clone())
        .with_request_interval(Duration::from_millis(1))
        .with_retry_policy(3, Duration::from_millis(1));
    let outcome = harvester.run().await.unwrap();
    assert_eq!(outcome, HarvestOutcome::Finished);

    assert_eq!(
        fetcher.cursors_seen(),
        vec![None, Some("C1".to_string()), Some("C2".to_string())]
    );
    let state = store.load();
    assert_eq!(state.batch_no, 3);
    assert!(state.finished);
}

/// A finished checkpoint makes later runs exit without fetching.
#[tokio::test]
async fn finished_state_prevents_further_fetches() {
    let dir = tempfile::TempDir::new().unwrap();
    let store = store_in(&dir);

    let fetcher = ScriptedFetcher::new(vec![Ok(page("2025-09-24 02:54:14", None))]);
    let outcome = fast(fetcher, store.clone()).run().await.unwrap();
    assert_eq!(outcome, HarvestOutcome::Finished);

    // Second run: the script is empty, so any fetch would error the run.
    let fetcher = ScriptedFetcher::new(vec![]);
    let outcome = tokio::time::timeout(Duration::from_secs(5), fast(fetcher, store.clone()).run())
        .await
        .expect("already-finished run should return immediately")
        .unwrap();
    assert_eq!(outcome, HarvestOutcome::AlreadyFinished);
}

/// Resume picks up from the persisted cursor, not from the beginning.
#[tokio::test]
async fn resume_starts_from_saved_cursor() {
    let dir = tempfile::TempDir::new().unwrap();
    let store = store_in(&dir);
    let mut prior = CheckpointState::default();
    prior.advance(Some("C7".to_string()));
    store.save(&prior).unwrap();

    let fetcher = ScriptedFetcher::new(vec![Ok(page("2025-09-20 00:00:00", None))]);
    let harvester = fast(fetcher, store.clone());
    harvester.run().await.unwrap();

    let state = store.load();
    assert_eq!(state.batch_no, 2);
    assert!(state.finished);
}

/// Single-batch mode stops after one batch even with history remaining.
#[tokio::test]
async fn once_mode_runs_exactly_one_batch() {
    let dir = tempfile::TempDir::new().unwrap();
    let store = store_in(&dir);
    let fetcher = ScriptedFetcher::new(vec![
        Ok(page("2025-09-24 02:54:14", Some("C1"))),
        Ok(page("2025-09-23 02:54:14", Some("C2"))),
    ]);

    let outcome = fast(fetcher, store.clone())
        .with_mode(RunMode::Once)
        .run()
        .await
        .unwrap();

    assert_eq!(outcome, HarvestOutcome::BatchComplete);
    let state = store.load();
    assert_eq!(state.batch_no, 1);
    assert_eq!(state.cursor.as_deref(), Some("C1"));
    assert!(!state.finished);
}
