//! End-to-end behaviour of a mounted target controller
//!
//! Unexpected outcomes fail through `panic!()`, which is fine in test code.

#![allow(clippy::panic)]

mod common;

use common::{Harness, TIMEOUT, d};
use itde::{
    ControllerPhase, InlineBlob, ItdeConfig, ItdeError, ItdeItem, ResolvedItdeData, StorageError,
};
use itde_testing::RecordingProcessor;
use serde_json::json;
use std::error::Error;
use std::time::Duration;

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn json_diff_output_reaches_whitespace_remover() -> TestResult {
    let h = Harness::new();
    h.states.set_state("/tool/json-diff", json!({ "diff": "{}" }));

    let controller = h.mount("text-whitespace-remover");
    controller.mark_tool_state_loaded().await?;

    let signal = h.notify("json-diff", "text-whitespace-remover");
    controller.wait_until(|s| s.pending.len() == 1, TIMEOUT).await?;
    assert!(controller.is_modal_open().await);

    controller.accept_signal(d("json-diff")).await?;

    assert!(controller.pending_signals().await.is_empty());
    assert_eq!(h.channel.pending_count(&d("text-whitespace-remover")), 0);
    assert!(!controller.is_modal_open().await);
    assert_eq!(controller.phase().await, ControllerPhase::Idle);

    let deliveries = h.processor.deliveries();
    assert_eq!(deliveries.len(), 1);
    assert_eq!(deliveries[0].signal, signal);
    assert_eq!(
        deliveries[0].data,
        ResolvedItdeData::ItemList(vec![ItdeItem::Inline(InlineBlob {
            mime_type: "application/json".to_string(),
            bytes: b"{}".to_vec(),
        })])
    );
    assert_eq!(controller.last_delivery().await.map(|d| d.item_count), Some(1));
    assert_eq!(controller.last_error().await, None);
    Ok(())
}

#[tokio::test]
async fn repeat_notification_collapses() -> TestResult {
    let h = Harness::new();
    let controller = h.mount("diff-checker");

    h.notify("base64-encode-decode", "diff-checker");
    let second = h.notify("base64-encode-decode", "diff-checker");

    controller
        .wait_until(
            |s| {
                s.pending.get(&d("base64-encode-decode")).map(|p| p.sequence)
                    == Some(second.sequence)
            },
            TIMEOUT,
        )
        .await?;
    assert_eq!(controller.pending_signals().await.len(), 1);
    assert_eq!(h.channel.pending_count(&d("diff-checker")), 1);
    Ok(())
}

#[tokio::test]
async fn signals_sent_before_mount_are_hydrated() -> TestResult {
    let h = Harness::new();
    h.notify("json-diff", "diff-checker");
    h.notify("base64-encode-decode", "diff-checker");

    let controller = h.mount("diff-checker");
    let sources: Vec<String> = controller
        .pending_signals()
        .await
        .into_iter()
        .map(|s| s.source_directive.into_inner())
        .collect();
    assert_eq!(sources, vec!["json-diff", "base64-encode-decode"]);

    assert_eq!(controller.phase().await, ControllerPhase::PendingUnreviewed);
    controller.mark_tool_state_loaded().await?;
    assert_eq!(controller.phase().await, ControllerPhase::ModalOpen);
    Ok(())
}

#[tokio::test]
async fn disabled_auto_popup_leaves_modal_closed() -> TestResult {
    let config = ItdeConfig {
        auto_popup: false,
        ..ItdeConfig::default()
    };
    let h = Harness::with(RecordingProcessor::new(), config);
    let controller = h.mount("diff-checker");
    controller.mark_tool_state_loaded().await?;

    h.notify("json-diff", "diff-checker");
    controller.wait_until(|s| !s.pending.is_empty(), TIMEOUT).await?;
    assert_eq!(controller.phase().await, ControllerPhase::PendingUnreviewed);
    Ok(())
}

#[tokio::test]
async fn defer_then_new_arrival_stays_passive() -> TestResult {
    let h = Harness::new();
    let controller = h.mount("diff-checker");
    controller.mark_tool_state_loaded().await?;

    h.notify("json-diff", "diff-checker");
    controller.wait_until(|s| s.modal_open, TIMEOUT).await?;
    controller.close_modal().await?;

    h.notify("base64-encode-decode", "diff-checker");
    controller.wait_until(|s| s.pending.len() == 2, TIMEOUT).await?;

    assert_eq!(controller.phase().await, ControllerPhase::DeferredPassive);
    assert!(!controller.is_modal_open().await);

    controller.open_modal_if_signals_exist().await?;
    assert_eq!(controller.phase().await, ControllerPhase::ModalOpen);
    Ok(())
}

#[tokio::test]
async fn open_with_nothing_pending_is_noop() -> TestResult {
    let h = Harness::new();
    let controller = h.mount("diff-checker");

    controller.open_modal_if_signals_exist().await?;
    assert!(!controller.is_modal_open().await);
    assert_eq!(controller.phase().await, ControllerPhase::Idle);
    Ok(())
}

#[tokio::test]
async fn ignore_all_empties_list_and_closes_modal() -> TestResult {
    let h = Harness::new();
    let controller = h.mount("diff-checker");
    controller.mark_tool_state_loaded().await?;

    h.notify("json-diff", "diff-checker");
    h.notify("base64-encode-decode", "diff-checker");
    controller
        .wait_until(|s| s.pending.len() == 2 && s.modal_open, TIMEOUT)
        .await?;

    controller.ignore_all_signals().await?;

    assert!(controller.pending_signals().await.is_empty());
    assert!(!controller.is_modal_open().await);
    assert_eq!(h.channel.pending_count(&d("diff-checker")), 0);
    assert_eq!(h.processor.call_count(), 0);
    Ok(())
}

#[tokio::test]
async fn ignoring_twice_is_harmless() -> TestResult {
    let h = Harness::new();
    let controller = h.mount("diff-checker");

    h.notify("json-diff", "diff-checker");
    h.notify("base64-encode-decode", "diff-checker");
    controller.wait_until(|s| s.pending.len() == 2, TIMEOUT).await?;

    controller.ignore_signal(d("json-diff")).await?;
    controller.ignore_signal(d("json-diff")).await?;

    let remaining = controller.pending_signals().await;
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].source_directive, d("base64-encode-decode"));
    assert_eq!(h.channel.pending_count(&d("diff-checker")), 1);
    Ok(())
}

#[tokio::test]
async fn accept_from_unknown_source_is_lookup_miss() -> TestResult {
    let h = Harness::new();
    let controller = h.mount("diff-checker");

    h.notify("ghost-tool", "diff-checker");
    controller.wait_until(|s| !s.pending.is_empty(), TIMEOUT).await?;
    controller.accept_signal(d("ghost-tool")).await?;

    assert!(controller.pending_signals().await.is_empty());
    assert_eq!(h.processor.call_count(), 0);
    assert_eq!(
        controller.last_error().await,
        Some(ItdeError::LookupMiss {
            directive: d("ghost-tool"),
        })
    );
    Ok(())
}

#[tokio::test]
async fn accept_with_nothing_to_give_is_empty_payload() -> TestResult {
    let h = Harness::new();
    h.states.set_state("/tool/base64-encode-decode", json!({ "output": "" }));
    let controller = h.mount("diff-checker");

    h.notify("base64-encode-decode", "diff-checker");
    controller.wait_until(|s| !s.pending.is_empty(), TIMEOUT).await?;
    controller.accept_signal(d("base64-encode-decode")).await?;

    assert!(controller.pending_signals().await.is_empty());
    assert_eq!(h.processor.call_count(), 1);
    assert_eq!(h.processor.deliveries()[0].data, ResolvedItdeData::Empty);
    assert!(matches!(
        controller.last_error().await,
        Some(ItdeError::EmptyPayload { .. })
    ));
    Ok(())
}

#[tokio::test]
async fn accept_with_unreadable_state_is_resolution_failure() -> TestResult {
    let h = Harness::new();
    h.states.fail_with(StorageError::Unavailable("disk full".to_string()));
    let controller = h.mount("text-whitespace-remover");

    h.notify("json-diff", "text-whitespace-remover");
    controller.wait_until(|s| !s.pending.is_empty(), TIMEOUT).await?;
    controller.accept_signal(d("json-diff")).await?;

    assert!(controller.pending_signals().await.is_empty());
    assert_eq!(h.processor.call_count(), 1);
    assert!(h.processor.deliveries()[0].data.error_message().is_some());
    match controller.last_error().await {
        Some(ItdeError::ResolutionFailure { message, .. }) => {
            assert!(message.contains("disk full"));
        },
        other => panic!("expected resolution failure, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn accept_with_missing_library_file_is_resolution_failure() -> TestResult {
    let h = Harness::new();
    h.states.set_state("/tool/image-resizer", json!({ "processedFileIds": ["lost"] }));
    let controller = h.mount("diff-checker");

    h.notify("image-resizer", "diff-checker");
    controller.wait_until(|s| !s.pending.is_empty(), TIMEOUT).await?;
    controller.accept_signal(d("image-resizer")).await?;

    assert!(controller.pending_signals().await.is_empty());
    assert_eq!(h.files.lookups(), vec!["lost"]);
    assert!(matches!(
        controller.last_error().await,
        Some(ItdeError::ResolutionFailure { .. })
    ));
    Ok(())
}

#[tokio::test]
async fn failing_processor_is_callback_failure() -> TestResult {
    let h = Harness::with_processor(RecordingProcessor::failing("not valid JSON"));
    h.states.set_state("/tool/json-diff", json!({ "diff": "{}" }));
    let controller = h.mount("text-whitespace-remover");

    h.notify("json-diff", "text-whitespace-remover");
    controller.wait_until(|s| !s.pending.is_empty(), TIMEOUT).await?;
    controller.accept_signal(d("json-diff")).await?;

    assert!(controller.pending_signals().await.is_empty());
    assert_eq!(
        controller.last_error().await,
        Some(ItdeError::CallbackFailure {
            directive: d("json-diff"),
            message: "not valid JSON".to_string(),
        })
    );

    controller.dismiss_error().await?;
    assert_eq!(controller.last_error().await, None);
    Ok(())
}

#[tokio::test]
async fn panicking_processor_is_contained() -> TestResult {
    let h = Harness::with_processor(RecordingProcessor::panicking("processor blew up"));
    h.states.set_state("/tool/json-diff", json!({ "diff": "{}" }));
    let controller = h.mount("text-whitespace-remover");

    h.notify("json-diff", "text-whitespace-remover");
    controller.wait_until(|s| !s.pending.is_empty(), TIMEOUT).await?;
    controller.accept_signal(d("json-diff")).await?;

    assert!(controller.pending_signals().await.is_empty());
    assert!(controller.in_flight().await.is_empty());
    match controller.last_error().await {
        Some(ItdeError::CallbackFailure { message, .. }) => {
            assert_eq!(message, "processor blew up");
        },
        other => panic!("expected callback failure, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn newer_notification_during_accept_survives() -> TestResult {
    let h = Harness::new();
    h.processor.delay_processing(Duration::from_millis(100));
    h.states.set_state("/tool/json-diff", json!({ "diff": "{}" }));
    let controller = h.mount("text-whitespace-remover");

    let first = h.notify("json-diff", "text-whitespace-remover");
    controller.wait_until(|s| !s.pending.is_empty(), TIMEOUT).await?;

    let (accepted, newer) = tokio::join!(controller.accept_signal(d("json-diff")), async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        h.notify("json-diff", "text-whitespace-remover")
    });
    accepted?;

    controller
        .wait_until(
            |s| s.pending.get(&d("json-diff")).map(|p| p.sequence) == Some(newer.sequence),
            TIMEOUT,
        )
        .await?;
    assert_eq!(h.processor.deliveries()[0].signal.sequence, first.sequence);
    assert_eq!(h.channel.pending(&d("text-whitespace-remover")), vec![newer]);
    Ok(())
}

#[tokio::test]
async fn ignore_during_accept_does_not_resurrect() -> TestResult {
    let h = Harness::new();
    h.processor.delay_processing(Duration::from_millis(100));
    h.states.set_state("/tool/json-diff", json!({ "diff": "{}" }));
    let controller = h.mount("text-whitespace-remover");

    h.notify("json-diff", "text-whitespace-remover");
    controller.wait_until(|s| !s.pending.is_empty(), TIMEOUT).await?;

    let (accepted, ignored) = tokio::join!(controller.accept_signal(d("json-diff")), async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        controller.ignore_signal(d("json-diff")).await
    });
    accepted?;
    ignored?;

    assert!(controller.pending_signals().await.is_empty());
    assert!(controller.in_flight().await.is_empty());
    assert_eq!(h.processor.call_count(), 1);
    assert_eq!(h.channel.pending_count(&d("text-whitespace-remover")), 0);
    Ok(())
}

#[tokio::test]
async fn unmount_keeps_signals_for_next_mount() -> TestResult {
    let h = Harness::new();
    let controller = h.mount("diff-checker");

    h.notify("json-diff", "diff-checker");
    controller.wait_until(|s| !s.pending.is_empty(), TIMEOUT).await?;
    controller.unmount().await?;

    assert_eq!(h.channel.pending_count(&d("diff-checker")), 1);

    let remounted = h.mount("diff-checker");
    assert_eq!(remounted.pending_signals().await.len(), 1);
    Ok(())
}

#[tokio::test]
async fn lagging_listener_resynchronises() -> TestResult {
    let config = ItdeConfig {
        broadcast_capacity: 1,
        ..ItdeConfig::default()
    };
    let h = Harness::with(RecordingProcessor::new(), config);
    let controller = h.mount("diff-checker");

    for i in 0..20 {
        h.notify(&format!("source-{i}"), "diff-checker");
    }

    controller.wait_until(|s| s.pending.len() == 20, TIMEOUT).await?;
    assert_eq!(
        controller.pending_signals().await,
        h.channel.pending(&d("diff-checker"))
    );
    Ok(())
}

#[tokio::test]
async fn clear_missed_during_lag_does_not_drop_later_signals() -> TestResult {
    let config = ItdeConfig {
        broadcast_capacity: 2,
        ..ItdeConfig::default()
    };
    let h = Harness::with(RecordingProcessor::new(), config);
    let controller = h.mount("diff-checker");

    for i in 0..5 {
        h.notify(&format!("old-{i}"), "diff-checker");
    }
    h.channel.clear(&d("diff-checker"));
    let survivor = h.notify("json-diff", "diff-checker");

    controller
        .wait_until(|s| s.pending.list() == std::slice::from_ref(&survivor), TIMEOUT)
        .await?;
    assert_eq!(h.channel.pending(&d("diff-checker")), vec![survivor]);
    Ok(())
}

#[tokio::test]
async fn channel_clear_empties_mounted_controller() -> TestResult {
    let h = Harness::new();
    let controller = h.mount("diff-checker");
    controller.mark_tool_state_loaded().await?;

    h.notify("json-diff", "diff-checker");
    h.notify("base64-encode-decode", "diff-checker");
    controller
        .wait_until(|s| s.pending.len() == 2 && s.modal_open, TIMEOUT)
        .await?;

    assert_eq!(h.channel.clear(&d("diff-checker")), 2);

    controller.wait_until(|s| s.pending.is_empty(), TIMEOUT).await?;
    assert_eq!(controller.phase().await, ControllerPhase::Idle);

    let later = h.notify("json-diff", "diff-checker");
    controller
        .wait_until(
            |s| s.pending.get(&d("json-diff")).map(|p| p.sequence) == Some(later.sequence),
            TIMEOUT,
        )
        .await?;
    assert!(controller.is_modal_open().await);
    Ok(())
}

#[tokio::test]
async fn newer_generation_accepted_during_running_accept_is_delivered() -> TestResult {
    let h = Harness::new();
    h.processor.delay_processing(Duration::from_millis(150));
    h.states.set_state("/tool/json-diff", json!({ "diff": "{}" }));
    let controller = h.mount("text-whitespace-remover");

    h.notify("json-diff", "text-whitespace-remover");
    controller.wait_until(|s| !s.pending.is_empty(), TIMEOUT).await?;

    let (first, second) = tokio::join!(controller.accept_signal(d("json-diff")), async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        let newer = h.notify("json-diff", "text-whitespace-remover");
        controller
            .wait_until(
                |s| s.pending.get(&d("json-diff")).map(|p| p.sequence) == Some(newer.sequence),
                TIMEOUT,
            )
            .await?;
        controller.accept_signal(d("json-diff")).await
    });
    first?;
    second?;

    assert_eq!(h.processor.call_count(), 2);
    assert!(controller.pending_signals().await.is_empty());
    assert!(controller.in_flight().await.is_empty());
    assert_eq!(h.channel.pending_count(&d("text-whitespace-remover")), 0);
    Ok(())
}
