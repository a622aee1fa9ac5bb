// Coordinator behavior tests: ordering, replay, fan-out, teardown, and the
// stale-event tolerance rules.

use callscribe::{AppendError, CallRegistry, ConnectionHandle, ConnectionId, ServerEvent};
use tokio::sync::mpsc;

fn connection() -> (ConnectionHandle, mpsc::Receiver<ServerEvent>) {
    let (tx, rx) = mpsc::channel(64);
    (
        ConnectionHandle {
            id: ConnectionId::new(),
            tx,
        },
        rx,
    )
}

/// Drain every queued broadcast entry id from a connection's receiver.
fn drain_broadcast_ids(rx: &mut mpsc::Receiver<ServerEvent>) -> Vec<u64> {
    let mut ids = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let ServerEvent::TranscriptBroadcast { entry } = event {
            ids.push(entry.entry_id);
        }
    }
    ids
}

#[tokio::test]
async fn append_preserves_order_with_increasing_entry_ids() {
    let registry = CallRegistry::new();
    let (conn, _rx) = connection();
    registry.join("call-1", "p1", "Alice", conn).await;

    for i in 0..5 {
        registry
            .append("call-1", "p1", format!("fragment {}", i), i == 4)
            .await
            .unwrap();
    }

    let snapshot = registry.status("call-1").await.transcripts;
    assert_eq!(snapshot.len(), 5);
    for (i, entry) in snapshot.iter().enumerate() {
        assert_eq!(entry.text, format!("fragment {}", i));
        assert_eq!(entry.participant_name, "Alice");
    }
    for pair in snapshot.windows(2) {
        assert!(pair[0].entry_id < pair[1].entry_id, "entry ids must increase");
    }
}

#[tokio::test]
async fn join_replays_existing_history_exactly_once() {
    let registry = CallRegistry::new();
    let (conn1, _rx1) = connection();
    registry.join("call-1", "p1", "Alice", conn1).await;

    registry
        .append("call-1", "p1", "hello".to_string(), false)
        .await
        .unwrap();
    registry
        .append("call-1", "p1", "hello world".to_string(), true)
        .await
        .unwrap();

    let (conn2, mut rx2) = connection();
    let snapshot = registry.join("call-1", "p2", "Bob", conn2).await;

    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot[0].text, "hello");
    assert_eq!(snapshot[1].text, "hello world");
    assert!(snapshot[1].is_final);

    // Nothing accepted before the join is broadcast to the joiner.
    assert!(drain_broadcast_ids(&mut rx2).is_empty());
}

#[tokio::test]
async fn broadcast_reaches_every_participant_including_sender() {
    let registry = CallRegistry::new();
    let (conn1, mut rx1) = connection();
    let (conn2, mut rx2) = connection();
    let (conn3, mut rx3) = connection();
    registry.join("call-1", "p1", "Alice", conn1).await;
    registry.join("call-1", "p2", "Bob", conn2).await;
    registry.join("call-1", "p3", "Carol", conn3).await;

    let entry = registry
        .append("call-1", "p1", "hello everyone".to_string(), true)
        .await
        .unwrap();

    for rx in [&mut rx1, &mut rx2, &mut rx3] {
        let ids = drain_broadcast_ids(rx);
        assert_eq!(ids, vec![entry.entry_id]);
    }
}

#[tokio::test]
async fn delivery_failure_does_not_affect_other_recipients() {
    let registry = CallRegistry::new();
    let (conn1, mut rx1) = connection();
    let (conn2, rx2) = connection();
    registry.join("call-1", "p1", "Alice", conn1).await;
    registry.join("call-1", "p2", "Bob", conn2).await;

    // p2's connection is gone; delivery to it fails silently.
    drop(rx2);

    let entry = registry
        .append("call-1", "p1", "still here".to_string(), true)
        .await
        .expect("append must not fail on a delivery failure");

    assert_eq!(drain_broadcast_ids(&mut rx1), vec![entry.entry_id]);
}

#[tokio::test]
async fn fragment_for_unknown_call_is_rejected() {
    let registry = CallRegistry::new();
    let err = registry
        .append("nope", "p1", "hello".to_string(), false)
        .await
        .unwrap_err();
    assert_eq!(err, AppendError::UnknownCall);
}

#[tokio::test]
async fn fragment_from_departed_participant_is_rejected() {
    let registry = CallRegistry::new();
    let (conn1, _rx1) = connection();
    let (conn2, _rx2) = connection();
    registry.join("call-1", "p1", "Alice", conn1).await;
    registry.join("call-1", "p2", "Bob", conn2).await;

    registry.leave("call-1", "p2").await;

    let err = registry
        .append("call-1", "p2", "late fragment".to_string(), true)
        .await
        .unwrap_err();
    assert_eq!(err, AppendError::UnknownParticipant);

    // p1 is unaffected.
    registry
        .append("call-1", "p1", "fine".to_string(), true)
        .await
        .unwrap();
}

#[tokio::test]
async fn last_leave_destroys_call_and_history() {
    let registry = CallRegistry::new();
    let (conn, _rx) = connection();
    registry.join("call-1", "p1", "Alice", conn).await;
    registry
        .append("call-1", "p1", "ephemeral".to_string(), true)
        .await
        .unwrap();

    registry.leave("call-1", "p1").await;

    assert!(registry.get("call-1").await.is_none());
    assert_eq!(registry.active_calls().await, 0);

    let status = registry.status("call-1").await;
    assert_eq!(status.participant_count, 0);
    assert!(status.transcripts.is_empty());

    // A rejoin recreates a fresh call with an empty log.
    let (conn, _rx) = connection();
    let snapshot = registry.join("call-1", "p1", "Alice", conn).await;
    assert!(snapshot.is_empty());
    assert_eq!(registry.active_calls().await, 1);
}

#[tokio::test]
async fn leave_is_idempotent() {
    let registry = CallRegistry::new();
    let (conn1, _rx1) = connection();
    let (conn2, _rx2) = connection();
    registry.join("call-1", "p1", "Alice", conn1).await;
    registry.join("call-1", "p2", "Bob", conn2).await;

    registry.leave("call-1", "p1").await;
    registry.leave("call-1", "p1").await;
    registry.leave("call-1", "never-joined").await;
    registry.leave("no-such-call", "p1").await;

    let status = registry.status("call-1").await;
    assert_eq!(status.participant_count, 1);
}

#[tokio::test]
async fn rejoin_overwrites_registration_but_keeps_history() {
    let registry = CallRegistry::new();
    let (conn1, _rx1) = connection();
    registry.join("call-1", "p1", "Alice", conn1).await;
    registry
        .append("call-1", "p1", "before reconnect".to_string(), true)
        .await
        .unwrap();

    // Same participant id, new connection.
    let (conn2, mut rx2) = connection();
    let snapshot = registry.join("call-1", "p1", "Alice", conn2).await;

    assert_eq!(snapshot.len(), 1);
    assert_eq!(registry.status("call-1").await.participant_count, 1);

    // Broadcasts now reach the new connection.
    let entry = registry
        .append("call-1", "p1", "after reconnect".to_string(), true)
        .await
        .unwrap();
    assert_eq!(drain_broadcast_ids(&mut rx2), vec![entry.entry_id]);
}

#[tokio::test]
async fn connection_drop_releases_registrations_across_calls() {
    let registry = CallRegistry::new();
    let (conn1, _rx1) = connection();
    let (conn2, _rx2) = connection();
    registry.join("call-1", "p1", "Alice", conn1.clone()).await;
    registry.join("call-2", "p2", "Bob", conn2).await;

    registry.leave_by_connection(conn1.id).await;

    // p1's call emptied and was destroyed; the unrelated call is untouched.
    assert!(registry.get("call-1").await.is_none());
    assert_eq!(registry.status("call-2").await.participant_count, 1);
}

#[tokio::test]
async fn concurrent_joins_observe_one_call() {
    let registry = std::sync::Arc::new(CallRegistry::new());

    let mut handles = Vec::new();
    for i in 0..16 {
        let registry = std::sync::Arc::clone(&registry);
        handles.push(tokio::spawn(async move {
            let (conn, _rx) = connection();
            registry
                .join("call-1", &format!("p{}", i), "Someone", conn)
                .await;
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(registry.active_calls().await, 1);
    assert_eq!(registry.status("call-1").await.participant_count, 16);
}

#[tokio::test]
async fn concurrent_appends_never_skip_or_duplicate_entry_ids() {
    let registry = std::sync::Arc::new(CallRegistry::new());
    let (conn, _rx) = connection();
    registry.join("call-1", "p1", "Alice", conn).await;

    let mut handles = Vec::new();
    for i in 0..32 {
        let registry = std::sync::Arc::clone(&registry);
        handles.push(tokio::spawn(async move {
            registry
                .append("call-1", "p1", format!("fragment {}", i), false)
                .await
                .unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let mut ids: Vec<u64> = registry
        .status("call-1")
        .await
        .transcripts
        .iter()
        .map(|e| e.entry_id)
        .collect();
    assert_eq!(ids.len(), 32);
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 32, "entry ids must be unique");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn replay_snapshot_precedes_any_broadcast_for_joiner() {
    for _ in 0..100 {
        let registry = std::sync::Arc::new(CallRegistry::new());
        let (conn1, _rx1) = connection();
        registry.join("call-1", "p1", "Alice", conn1).await;
        registry
            .append("call-1", "p1", "before join".to_string(), true)
            .await
            .unwrap();

        // Keep appending while the second participant joins.
        let writer = {
            let registry = std::sync::Arc::clone(&registry);
            tokio::spawn(async move {
                for i in 0..8 {
                    let _ = registry
                        .append("call-1", "p1", format!("during join {}", i), false)
                        .await;
                }
            })
        };

        let (conn2, mut rx2) = connection();
        registry.join("call-1", "p2", "Bob", conn2).await;
        writer.await.unwrap();

        // The first event on the joiner's stream is always the snapshot.
        let replayed: std::collections::HashSet<u64> = match rx2.try_recv().unwrap() {
            ServerEvent::ReplaySnapshot { entries } => {
                entries.iter().map(|e| e.entry_id).collect()
            }
            other => panic!("expected replay snapshot first, got {:?}", other),
        };
        assert!(replayed.contains(&0), "snapshot must hold the pre-join entry");

        // Every broadcast that follows is for an entry the snapshot did not
        // already replay.
        while let Ok(event) = rx2.try_recv() {
            if let ServerEvent::TranscriptBroadcast { entry } = event {
                assert!(
                    !replayed.contains(&entry.entry_id),
                    "entry {} delivered twice",
                    entry.entry_id
                );
            }
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn join_racing_teardown_is_never_lost() {
    for _ in 0..500 {
        let registry = std::sync::Arc::new(CallRegistry::new());
        // An empty call exists transiently between creation and first join.
        registry.ensure_call("call-1").await;

        let joiner = {
            let registry = std::sync::Arc::clone(&registry);
            tokio::spawn(async move {
                let (conn, rx) = connection();
                registry.join("call-1", "p1", "Alice", conn).await;
                rx
            })
        };
        let reaper = {
            let registry = std::sync::Arc::clone(&registry);
            tokio::spawn(async move {
                registry.remove_if_empty("call-1").await;
            })
        };

        let _rx = joiner.await.unwrap();
        reaper.await.unwrap();

        assert_eq!(
            registry.status("call-1").await.participant_count,
            1,
            "a join racing teardown must never be lost"
        );
    }
}

// The end-to-end walkthrough: two participants sharing one call from first
// join to teardown.
#[tokio::test]
async fn two_participant_call_lifecycle() {
    let registry = CallRegistry::new();

    // P1 joins and gets an empty replay.
    let (conn1, mut rx1) = connection();
    let snapshot = registry.join("call-1", "p1", "Alice", conn1).await;
    assert!(snapshot.is_empty());

    // P1 submits an interim fragment; only P1 is there to receive it.
    let first = registry
        .append("call-1", "p1", "hello".to_string(), false)
        .await
        .unwrap();
    assert_eq!(drain_broadcast_ids(&mut rx1), vec![first.entry_id]);

    // P2 joins and is replayed the interim fragment.
    let (conn2, mut rx2) = connection();
    let snapshot = registry.join("call-1", "p2", "Bob", conn2).await;
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].text, "hello");
    assert!(!snapshot[0].is_final);

    // P1 finalizes; both participants receive the broadcast.
    let second = registry
        .append("call-1", "p1", "hello world".to_string(), true)
        .await
        .unwrap();
    assert_eq!(drain_broadcast_ids(&mut rx1), vec![second.entry_id]);
    assert_eq!(drain_broadcast_ids(&mut rx2), vec![second.entry_id]);

    // Everyone leaves; the call and its history are gone.
    registry.leave("call-1", "p1").await;
    registry.leave("call-1", "p2").await;

    let status = registry.status("call-1").await;
    assert_eq!(status.participant_count, 0);
    assert!(status.transcripts.is_empty());

    // A fresh join starts a new, empty log.
    let (conn3, _rx3) = connection();
    let snapshot = registry.join("call-1", "p3", "Carol", conn3).await;
    assert!(snapshot.is_empty());
}
