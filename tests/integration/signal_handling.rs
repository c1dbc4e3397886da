//! Interrupt handling: cancellable waits and the final checkpoint save.

use std::sync::Arc;
use std::time::Duration;

use slack_history_harvester::checkpoint::{CheckpointState, CheckpointStore};
use slack_history_harvester::harvester::{Harvester, HarvestOutcome};
use slack_history_harvester::shutdown::ShutdownCoordinator;

use crate::support::{page, HangingFetcher, ScriptedFetcher};

#[tokio::test]
async fn shutdown_notifies_waiters() {
    let shutdown = ShutdownCoordinator::shared();
    let waiter = {
        let handle = shutdown.clone();
        tokio::spawn(async move {
            handle.wait_for_shutdown().await;
            true
        })
    };

    // Give the task time to start waiting
    tokio::time::sleep(Duration::from_millis(50)).await;
    shutdown.request_shutdown();

    let result = tokio::time::timeout(Duration::from_secs(1), waiter).await;
    assert!(result.is_ok());
}

/// Requesting shutdown before waiting must not deadlock.
#[tokio::test]
async fn shutdown_race_condition_no_deadlock() {
    let shutdown = ShutdownCoordinator::shared();
    shutdown.request_shutdown();

    let handle = shutdown.clone();
    let waiter = tokio::spawn(async move {
        handle.wait_for_shutdown().await;
        true
    });

    let result = tokio::time::timeout(Duration::from_secs(1), waiter).await;
    assert!(
        result.is_ok(),
        "wait_for_shutdown() deadlocked despite shutdown already requested"
    );
}

#[tokio::test]
async fn shutdown_concurrent_waiters_all_notified() {
    let shutdown = ShutdownCoordinator::shared();

    let mut waiters = Vec::new();
    for _ in 0..10 {
        let handle = shutdown.clone();
        waiters.push(tokio::spawn(async move {
            handle.wait_for_shutdown().await;
        }));
    }

    tokio::time::sleep(Duration::from_millis(10)).await;
    shutdown.request_shutdown();

    for waiter in waiters {
        let result = tokio::time::timeout(Duration::from_secs(1), waiter).await;
        assert!(result.is_ok(), "A waiter was not notified of shutdown");
    }
}

/// An interrupt during the interval wait saves the advanced state and exits
/// with the Paused outcome, leaving the file resumable.
#[tokio::test]
async fn interrupt_during_interval_wait_saves_resumable_state() {
    let dir = tempfile::TempDir::new().unwrap();
    let store = CheckpointStore::new(dir.path().join("cursor.state.json"));
    let shutdown = ShutdownCoordinator::shared();

    let fetcher = ScriptedFetcher::new(vec![Ok(page("2025-09-24 02:54:14", Some("C1")))]);
    let harvester = Harvester::new(fetcher, store.clone())
        .with_request_interval(Duration::from_secs(300))
        .with_retry_policy(3, Duration::from_millis(1))
        .with_shutdown(shutdown.clone());

    let trigger = {
        let handle = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            handle.request_shutdown();
        })
    };

    let outcome = tokio::time::timeout(Duration::from_secs(5), harvester.run())
        .await
        .expect("interval wait was not interruptible")
        .unwrap();
    trigger.await.unwrap();

    assert_eq!(outcome, HarvestOutcome::Paused);
    let state = store.load();
    assert_eq!(state.cursor.as_deref(), Some("C1"));
    assert_eq!(state.batch_no, 1);
    assert!(!state.finished);
}

/// An interrupt during the retry wait pauses without advancing anything.
#[tokio::test]
async fn interrupt_during_retry_wait_does_not_advance() {
    let dir = tempfile::TempDir::new().unwrap();
    let store = CheckpointStore::new(dir.path().join("cursor.state.json"));
    let mut prior = CheckpointState::default();
    prior.advance(Some("C2".to_string()));
    store.save(&prior).unwrap();

    let shutdown = ShutdownCoordinator::shared();
    let fetcher = ScriptedFetcher::new(vec![Ok(crate::support::sentinel())]);
    let harvester = Harvester::new(fetcher, store.clone())
        .with_retry_policy(3, Duration::from_secs(300))
        .with_shutdown(shutdown.clone());

    let trigger = {
        let handle = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            handle.request_shutdown();
        })
    };

    let outcome = tokio::time::timeout(Duration::from_secs(5), harvester.run())
        .await
        .expect("retry wait was not interruptible")
        .unwrap();
    trigger.await.unwrap();

    assert_eq!(outcome, HarvestOutcome::Paused);
    assert_eq!(store.load(), prior);
}

/// An interrupt while a fetch is in flight abandons the attempt and leaves
/// the last known-good checkpoint intact.
#[tokio::test]
async fn interrupt_mid_fetch_abandons_attempt_and_saves() {
    let dir = tempfile::TempDir::new().unwrap();
    let store = CheckpointStore::new(dir.path().join("cursor.state.json"));
    let mut prior = CheckpointState::default();
    prior.advance(Some("C5".to_string()));
    store.save(&prior).unwrap();

    let shutdown = ShutdownCoordinator::shared();
    let fetcher = Arc::new(HangingFetcher::new());
    let harvester = Harvester::new(fetcher.clone(), store.clone())
        .with_retry_policy(3, Duration::from_millis(1))
        .with_shutdown(shutdown.clone());

    let trigger = {
        let handle = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            handle.request_shutdown();
        })
    };

    let outcome = tokio::time::timeout(Duration::from_secs(5), harvester.run())
        .await
        .expect("in-flight fetch was not abandoned")
        .unwrap();
    trigger.await.unwrap();

    assert_eq!(outcome, HarvestOutcome::Paused);
    assert_eq!(fetcher.calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    assert_eq!(store.load(), prior);
}
