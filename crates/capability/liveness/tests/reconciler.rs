mod common;

use common::{CountingNotifier, CountingStore, PROJECT, TENANT, record};
use domain::{ConnectionStatus, StatusReport};
use ems_liveness::{PushOutcome, Reconciler, WriteBack};
use std::sync::Arc;
use std::time::Duration;

const T: i64 = 1_700_000_000_000;
const TIMEOUT: Duration = Duration::from_secs(60);

async fn loaded(
    store: &Arc<CountingStore>,
    notifier: &Arc<CountingNotifier>,
) -> Reconciler {
    let mut reconciler = Reconciler::new(
        store.clone(),
        notifier.clone(),
        TENANT,
        PROJECT,
        TIMEOUT,
    );
    reconciler.reload().await.expect("reload");
    reconciler
}

#[tokio::test]
async fn pull_detects_offline_once_and_stays_quiet_after() {
    let store = CountingStore::with_devices(vec![record("device-d", T, ConnectionStatus::Online)]);
    let notifier = Arc::new(CountingNotifier::default());
    let mut reconciler = loaded(&store, &notifier).await;

    let summary = reconciler.apply_pull(T + 61_000).await;
    assert_eq!(summary.went_offline, 1);
    assert_eq!(summary.written, 1);
    assert_eq!(store.writes(), 1);
    assert_eq!(notifier.count(), 1);
    assert_eq!(store.status_of("device-d"), Some(ConnectionStatus::Offline));
    let stored = store.inner.get("device-d").expect("record");
    assert_eq!(stored.last_access_ms, T);

    let summary = reconciler.apply_pull(T + 81_000).await;
    assert_eq!(summary.went_offline, 0);
    assert_eq!(summary.written, 0);
    assert_eq!(store.writes(), 1);
    assert_eq!(notifier.count(), 1);
}

#[tokio::test]
async fn pull_keeps_device_online_within_timeout() {
    let store = CountingStore::with_devices(vec![record("device-d", T, ConnectionStatus::Online)]);
    let notifier = Arc::new(CountingNotifier::default());
    let mut reconciler = loaded(&store, &notifier).await;

    let summary = reconciler.apply_pull(T + 59_999).await;
    assert_eq!(summary.evaluated, 1);
    assert_eq!(summary.went_offline, 0);
    assert_eq!(store.writes(), 0);
    assert_eq!(
        reconciler.snapshots().get("device-d").expect("snapshot").connection_status,
        ConnectionStatus::Online
    );
}

#[tokio::test]
async fn push_brings_offline_device_online() {
    let now = T + 600_000;
    let store = CountingStore::with_devices(vec![record("device-e", T, ConnectionStatus::Offline)]);
    let notifier = Arc::new(CountingNotifier::default());
    let mut reconciler = loaded(&store, &notifier).await;

    let outcome = reconciler
        .apply_push(&StatusReport::new("device-e", now - 5_000), now)
        .await;

    assert_eq!(outcome, PushOutcome::BecameOnline(WriteBack::Committed));
    assert_eq!(store.writes(), 1);
    assert_eq!(notifier.count(), 1);
    let stored = store.inner.get("device-e").expect("record");
    assert_eq!(stored.connection_status, ConnectionStatus::Online);
    assert_eq!(stored.last_access_ms, now - 5_000);
    let snapshot = reconciler.snapshots().get("device-e").expect("snapshot");
    assert_eq!(snapshot.last_access_ms, now - 5_000);
    assert!(!snapshot.pending_sync);
}

#[tokio::test]
async fn push_refreshes_online_device_in_memory_only() {
    let store = CountingStore::with_devices(vec![record("device-1", T, ConnectionStatus::Online)]);
    let notifier = Arc::new(CountingNotifier::default());
    let mut reconciler = loaded(&store, &notifier).await;

    let outcome = reconciler
        .apply_push(&StatusReport::new("device-1", T + 10_000), T + 11_000)
        .await;

    assert_eq!(outcome, PushOutcome::Refreshed);
    assert_eq!(store.writes(), 0);
    assert_eq!(notifier.count(), 0);
    assert_eq!(
        reconciler.snapshots().get("device-1").expect("snapshot").last_access_ms,
        T + 10_000
    );
    assert_eq!(store.inner.get("device-1").expect("record").last_access_ms, T);
}

#[tokio::test]
async fn push_ignores_report_outside_window() {
    let now = T + 600_000;
    let store = CountingStore::with_devices(vec![record("device-e", T, ConnectionStatus::Offline)]);
    let notifier = Arc::new(CountingNotifier::default());
    let mut reconciler = loaded(&store, &notifier).await;

    let outcome = reconciler
        .apply_push(&StatusReport::new("device-e", now - 60_000), now)
        .await;

    assert_eq!(outcome, PushOutcome::Ignored);
    assert_eq!(store.writes(), 0);
    assert_eq!(notifier.count(), 0);
}

#[tokio::test]
async fn push_prefers_report_with_smaller_age() {
    let store = CountingStore::with_devices(vec![record("device-1", T, ConnectionStatus::Online)]);
    let notifier = Arc::new(CountingNotifier::default());
    let mut reconciler = loaded(&store, &notifier).await;

    // t2 先到达并被采用，随后到达的 t1 年龄更大，被忽略
    let t1 = T + 5_000;
    let t2 = T + 8_000;
    let now = T + 9_000;
    let first = reconciler
        .apply_push(&StatusReport::new("device-1", t2), now)
        .await;
    let second = reconciler
        .apply_push(&StatusReport::new("device-1", t1), now + 100)
        .await;

    assert_eq!(first, PushOutcome::Refreshed);
    assert_eq!(second, PushOutcome::Ignored);
    assert_eq!(
        reconciler.snapshots().get("device-1").expect("snapshot").last_access_ms,
        t2
    );
}

#[tokio::test]
async fn push_for_unknown_device_reloads_without_deciding() {
    let store = CountingStore::with_devices(vec![record("device-1", T, ConnectionStatus::Online)]);
    let notifier = Arc::new(CountingNotifier::default());
    let mut reconciler = loaded(&store, &notifier).await;
    store
        .inner
        .insert_device(record("device-2", T, ConnectionStatus::Offline))
        .expect("insert");

    let outcome = reconciler
        .apply_push(&StatusReport::new("device-2", T + 1_000), T + 1_000)
        .await;

    assert_eq!(outcome, PushOutcome::Reloaded { devices: 2 });
    assert!(reconciler.snapshots().contains("device-2"));
    assert_eq!(store.writes(), 0);
    assert_eq!(notifier.count(), 0);
    assert_eq!(
        reconciler.snapshots().get("device-2").expect("snapshot").connection_status,
        ConnectionStatus::Offline
    );
}

#[tokio::test]
async fn push_on_empty_set_reloads() {
    let store = CountingStore::with_devices(vec![record("device-1", T, ConnectionStatus::Offline)]);
    let notifier = Arc::new(CountingNotifier::default());
    let mut reconciler = Reconciler::new(
        store.clone(),
        notifier.clone(),
        TENANT,
        PROJECT,
        TIMEOUT,
    );
    assert!(reconciler.snapshots().is_empty());

    let outcome = reconciler
        .apply_push(&StatusReport::new("device-1", T), T)
        .await;

    assert_eq!(outcome, PushOutcome::Reloaded { devices: 1 });
    assert_eq!(store.lists(), 1);
    assert_eq!(reconciler.snapshots().len(), 1);
}

#[tokio::test]
async fn push_reload_failure_keeps_set() {
    let store = CountingStore::with_devices(vec![record("device-1", T, ConnectionStatus::Online)]);
    let notifier = Arc::new(CountingNotifier::default());
    let mut reconciler = loaded(&store, &notifier).await;
    store.fail_lists(true);

    let outcome = reconciler
        .apply_push(&StatusReport::new("device-9", T), T)
        .await;

    assert_eq!(outcome, PushOutcome::ReloadFailed);
    assert_eq!(reconciler.snapshots().len(), 1);
}

#[tokio::test]
async fn push_drops_snapshot_deleted_upstream() {
    let now = T + 600_000;
    let store = CountingStore::with_devices(vec![record("device-e", T, ConnectionStatus::Offline)]);
    let notifier = Arc::new(CountingNotifier::default());
    let mut reconciler = loaded(&store, &notifier).await;
    store.inner.remove_device("device-e").expect("remove");

    let outcome = reconciler
        .apply_push(&StatusReport::new("device-e", now - 1_000), now)
        .await;

    assert_eq!(outcome, PushOutcome::Dropped);
    assert!(!reconciler.snapshots().contains("device-e"));
    assert_eq!(store.writes(), 0);
    assert_eq!(notifier.count(), 0);
}

#[tokio::test]
async fn invalidated_record_skips_write_then_retries_on_pull() {
    let now = T + 600_000;
    let store = CountingStore::with_devices(vec![record("device-e", T, ConnectionStatus::Offline)]);
    let notifier = Arc::new(CountingNotifier::default());
    let mut reconciler = loaded(&store, &notifier).await;
    store.inner.invalidate_device("device-e", true).expect("invalidate");

    let outcome = reconciler
        .apply_push(&StatusReport::new("device-e", now - 1_000), now)
        .await;

    assert_eq!(outcome, PushOutcome::BecameOnline(WriteBack::Skipped));
    assert_eq!(store.writes(), 0);
    assert_eq!(notifier.count(), 0);
    let snapshot = reconciler.snapshots().get("device-e").expect("snapshot");
    assert_eq!(snapshot.connection_status, ConnectionStatus::Online);
    assert!(snapshot.pending_sync);

    store.inner.invalidate_device("device-e", false).expect("restore");
    let summary = reconciler.apply_pull(now + 1_000).await;

    assert_eq!(summary.retried, 1);
    assert_eq!(summary.written, 1);
    assert_eq!(store.writes(), 1);
    assert_eq!(notifier.count(), 1);
    assert_eq!(store.status_of("device-e"), Some(ConnectionStatus::Online));
    assert!(!reconciler.snapshots().get("device-e").expect("snapshot").pending_sync);
}

#[tokio::test]
async fn pull_skips_write_when_already_offline_in_store() {
    let store = CountingStore::with_devices(vec![record("device-d", T, ConnectionStatus::Online)]);
    let notifier = Arc::new(CountingNotifier::default());
    let mut reconciler = loaded(&store, &notifier).await;
    // 另一个检测方已经写过离线
    store
        .inner
        .insert_device(record("device-d", T, ConnectionStatus::Offline))
        .expect("insert");

    let summary = reconciler.apply_pull(T + 61_000).await;

    assert_eq!(summary.went_offline, 1);
    assert_eq!(summary.already_recorded, 1);
    assert_eq!(store.writes(), 0);
    assert_eq!(notifier.count(), 0);
    assert_eq!(
        reconciler.snapshots().get("device-d").expect("snapshot").connection_status,
        ConnectionStatus::Offline
    );
}

#[tokio::test]
async fn pull_drops_stale_entry_and_continues_batch() {
    let store = CountingStore::with_devices(vec![
        record("device-a", T, ConnectionStatus::Online),
        record("device-b", T, ConnectionStatus::Online),
    ]);
    let notifier = Arc::new(CountingNotifier::default());
    let mut reconciler = loaded(&store, &notifier).await;
    store.inner.remove_device("device-a").expect("remove");

    let summary = reconciler.apply_pull(T + 61_000).await;

    assert_eq!(summary.dropped, 1);
    assert_eq!(summary.written, 1);
    assert!(!reconciler.snapshots().contains("device-a"));
    assert_eq!(store.status_of("device-b"), Some(ConnectionStatus::Offline));
    assert_eq!(notifier.count(), 1);
}

#[tokio::test]
async fn pull_merges_new_devices_without_removing() {
    let store = CountingStore::with_devices(vec![record("device-a", T, ConnectionStatus::Online)]);
    let notifier = Arc::new(CountingNotifier::default());
    let mut reconciler = loaded(&store, &notifier).await;
    store
        .inner
        .insert_device(record("device-n", T + 1_000, ConnectionStatus::Online))
        .expect("insert");

    let summary = reconciler.apply_pull(T + 2_000).await;

    assert_eq!(summary.merged, 1);
    let merged = reconciler.snapshots().get("device-n").expect("merged");
    assert_eq!(merged.last_access_ms, T + 1_000);
    assert_eq!(merged.connection_status, ConnectionStatus::Online);
    assert_eq!(reconciler.snapshots().len(), 2);
    assert_eq!(store.writes(), 0);
}

#[tokio::test]
async fn write_failure_keeps_memory_state_and_retries_once() {
    let store = CountingStore::with_devices(vec![record("device-d", T, ConnectionStatus::Online)]);
    let notifier = Arc::new(CountingNotifier::default());
    let mut reconciler = loaded(&store, &notifier).await;
    store.fail_writes(true);

    let summary = reconciler.apply_pull(T + 61_000).await;
    assert_eq!(summary.deferred, 1);
    assert_eq!(notifier.count(), 0);
    let snapshot = reconciler.snapshots().get("device-d").expect("snapshot");
    assert_eq!(snapshot.connection_status, ConnectionStatus::Offline);
    assert!(snapshot.pending_sync);

    store.fail_writes(false);
    let summary = reconciler.apply_pull(T + 81_000).await;
    assert_eq!(summary.retried, 1);
    assert_eq!(summary.written, 1);
    assert_eq!(store.writes(), 1);
    assert_eq!(notifier.count(), 1);
    assert_eq!(store.status_of("device-d"), Some(ConnectionStatus::Offline));

    let summary = reconciler.apply_pull(T + 101_000).await;
    assert_eq!(summary.retried, 0);
    assert_eq!(store.writes(), 1);
    assert_eq!(notifier.count(), 1);
}

#[tokio::test]
async fn reload_for_unknown_device_keeps_refreshed_access_time() {
    let store = CountingStore::with_devices(vec![record("device-1", T, ConnectionStatus::Online)]);
    let notifier = Arc::new(CountingNotifier::default());
    let mut reconciler = loaded(&store, &notifier).await;
    for step in 1..=7 {
        let observed = T + step * 10_000;
        let outcome = reconciler
            .apply_push(&StatusReport::new("device-1", observed), observed + 200)
            .await;
        assert_eq!(outcome, PushOutcome::Refreshed);
    }

    let outcome = reconciler
        .apply_push(&StatusReport::new("unknown", T + 70_500), T + 70_500)
        .await;
    assert_eq!(outcome, PushOutcome::Reloaded { devices: 1 });
    assert_eq!(
        reconciler.snapshots().get("device-1").expect("snapshot").last_access_ms,
        T + 70_000
    );

    let summary = reconciler.apply_pull(T + 75_000).await;
    assert_eq!(summary.went_offline, 0);
    assert_eq!(store.writes(), 0);
    assert_eq!(notifier.count(), 0);
    assert_eq!(store.status_of("device-1"), Some(ConnectionStatus::Online));
}

#[tokio::test]
async fn reload_keeps_pending_snapshot_and_drops_removed_devices() {
    let store = CountingStore::with_devices(vec![
        record("device-d", T, ConnectionStatus::Online),
        record("device-x", T, ConnectionStatus::Online),
    ]);
    let notifier = Arc::new(CountingNotifier::default());
    let mut reconciler = loaded(&store, &notifier).await;
    store.fail_writes(true);
    reconciler.apply_pull(T + 61_000).await;
    store.inner.remove_device("device-x").expect("remove");

    let outcome = reconciler
        .apply_push(&StatusReport::new("unknown", T + 62_000), T + 62_000)
        .await;

    assert_eq!(outcome, PushOutcome::Reloaded { devices: 1 });
    assert!(!reconciler.snapshots().contains("device-x"));
    let snapshot = reconciler.snapshots().get("device-d").expect("snapshot");
    assert_eq!(snapshot.connection_status, ConnectionStatus::Offline);
    assert!(snapshot.pending_sync);
}

#[tokio::test]
async fn pending_retry_yields_to_newer_durable_record() {
    let store = CountingStore::with_devices(vec![record("device-d", T, ConnectionStatus::Online)]);
    let notifier = Arc::new(CountingNotifier::default());
    let mut reconciler = loaded(&store, &notifier).await;
    store.fail_writes(true);
    let summary = reconciler.apply_pull(T + 61_000).await;
    assert_eq!(summary.deferred, 1);

    store.fail_writes(false);
    // 另一个写入方记录了更新的访问
    store
        .inner
        .insert_device(record("device-d", T + 75_000, ConnectionStatus::Online))
        .expect("insert");
    let summary = reconciler.apply_pull(T + 81_000).await;

    assert_eq!(summary.retried, 1);
    assert_eq!(summary.superseded, 1);
    assert_eq!(summary.written, 0);
    assert_eq!(store.writes(), 0);
    assert_eq!(notifier.count(), 0);
    let stored = store.inner.get("device-d").expect("record");
    assert_eq!(stored.connection_status, ConnectionStatus::Online);
    assert_eq!(stored.last_access_ms, T + 75_000);
    let snapshot = reconciler.snapshots().get("device-d").expect("snapshot");
    assert_eq!(snapshot.connection_status, ConnectionStatus::Online);
    assert_eq!(snapshot.last_access_ms, T + 75_000);
    assert!(!snapshot.pending_sync);
}

#[tokio::test]
async fn offline_transition_yields_to_newer_durable_record() {
    let store = CountingStore::with_devices(vec![record("device-d", T, ConnectionStatus::Online)]);
    let notifier = Arc::new(CountingNotifier::default());
    let mut reconciler = loaded(&store, &notifier).await;
    store
        .inner
        .insert_device(record("device-d", T + 50_000, ConnectionStatus::Online))
        .expect("insert");

    let summary = reconciler.apply_pull(T + 61_000).await;

    assert_eq!(summary.went_offline, 1);
    assert_eq!(summary.superseded, 1);
    assert_eq!(store.writes(), 0);
    assert_eq!(notifier.count(), 0);
    assert_eq!(store.status_of("device-d"), Some(ConnectionStatus::Online));
    assert_eq!(
        reconciler.snapshots().get("device-d").expect("snapshot").last_access_ms,
        T + 50_000
    );
}

#[tokio::test]
async fn push_write_failure_is_committed_once_by_next_pull() {
    let now = T + 600_000;
    let store = CountingStore::with_devices(vec![record("device-e", T, ConnectionStatus::Offline)]);
    let notifier = Arc::new(CountingNotifier::default());
    let mut reconciler = loaded(&store, &notifier).await;
    store.fail_writes(true);

    let outcome = reconciler
        .apply_push(&StatusReport::new("device-e", now - 5_000), now)
        .await;

    assert_eq!(outcome, PushOutcome::BecameOnline(WriteBack::Failed));
    assert_eq!(notifier.count(), 0);
    assert_eq!(store.status_of("device-e"), Some(ConnectionStatus::Offline));
    let snapshot = reconciler.snapshots().get("device-e").expect("snapshot");
    assert_eq!(snapshot.connection_status, ConnectionStatus::Online);
    assert_eq!(snapshot.last_access_ms, now - 5_000);
    assert!(snapshot.pending_sync);

    store.fail_writes(false);
    let summary = reconciler.apply_pull(now + 1_000).await;
    assert_eq!(summary.retried, 1);
    assert_eq!(summary.written, 1);
    assert_eq!(store.writes(), 1);
    assert_eq!(notifier.count(), 1);
    let stored = store.inner.get("device-e").expect("record");
    assert_eq!(stored.connection_status, ConnectionStatus::Online);
    assert_eq!(stored.last_access_ms, now - 5_000);

    let summary = reconciler.apply_pull(now + 21_000).await;
    assert_eq!(summary.retried, 0);
    assert_eq!(store.writes(), 1);
    assert_eq!(notifier.count(), 1);
}

#[tokio::test]
async fn push_read_failure_is_committed_once_by_next_pull() {
    let now = T + 600_000;
    let store = CountingStore::with_devices(vec![record("device-e", T, ConnectionStatus::Offline)]);
    let notifier = Arc::new(CountingNotifier::default());
    let mut reconciler = loaded(&store, &notifier).await;
    store.fail_reads(true);

    let outcome = reconciler
        .apply_push(&StatusReport::new("device-e", now - 5_000), now)
        .await;

    assert_eq!(outcome, PushOutcome::BecameOnline(WriteBack::Failed));
    assert_eq!(notifier.count(), 0);
    let snapshot = reconciler.snapshots().get("device-e").expect("snapshot");
    assert_eq!(snapshot.connection_status, ConnectionStatus::Online);
    assert!(snapshot.pending_sync);

    store.fail_reads(false);
    let summary = reconciler.apply_pull(now + 1_000).await;
    assert_eq!(summary.written, 1);
    assert_eq!(store.writes(), 1);
    assert_eq!(notifier.count(), 1);
    assert_eq!(store.status_of("device-e"), Some(ConnectionStatus::Online));

    reconciler.apply_pull(now + 21_000).await;
    assert_eq!(store.writes(), 1);
    assert_eq!(notifier.count(), 1);
}
