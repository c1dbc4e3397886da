//! Classification and termination checked through the public API.

use slack_history_harvester::fetcher::BatchResult;
use slack_history_harvester::harvester::policy::{classify, evaluate};
use slack_history_harvester::harvester::{FetchClass, Termination};

/// The sentinel is recognized regardless of JSON field ordering or the
/// presence of unrelated keys.
#[test]
fn sentinel_detection_is_field_order_independent() {
    let bodies = [
        r#"{}"#,
        r#"{"next_cursor": null, "oldest_dt": null, "message_size": null}"#,
        r#"{"message_size": null, "next_cursor": null, "oldest_dt": null}"#,
        r#"{"unrelated": "field"}"#,
    ];
    for body in bodies {
        let batch: BatchResult = serde_json::from_str(body).unwrap();
        assert!(
            matches!(classify(Ok(batch)), FetchClass::RemoteInternalError),
            "body {body} should classify as remote internal error"
        );
    }
}

#[test]
fn single_present_field_defeats_the_sentinel() {
    let batch: BatchResult = serde_json::from_str(r#"{"next_cursor": "C1"}"#).unwrap();
    assert!(matches!(classify(Ok(batch)), FetchClass::Success(_)));
}

#[test]
fn termination_requires_either_bound_or_exhausted_cursor() {
    let batch: BatchResult = serde_json::from_str(
        r#"{"message_size": 5, "oldest_dt": "2025-09-24 02:54:14", "next_cursor": "C1"}"#,
    )
    .unwrap();
    assert_eq!(evaluate(&batch, None), Termination::Continue);
    assert_eq!(evaluate(&batch, Some("2024-01-01")), Termination::Continue);

    let last_page: BatchResult =
        serde_json::from_str(r#"{"message_size": 3, "oldest_dt": "2025-09-24 02:54:14"}"#).unwrap();
    assert_eq!(evaluate(&last_page, None), Termination::CursorExhausted);

    let old_page: BatchResult = serde_json::from_str(
        r#"{"message_size": 3, "oldest_dt": "2023-12-31 10:00:00", "next_cursor": "C2"}"#,
    )
    .unwrap();
    assert_eq!(
        evaluate(&old_page, Some("2024-01-01")),
        Termination::LowerBoundReached
    );
}
