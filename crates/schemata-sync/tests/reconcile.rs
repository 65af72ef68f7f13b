//! Index reconciliation tests
//!
//! Exercises one table at a time against the in-memory store:
//! - No-op and legacy cleanup
//! - Drift detection (drop + recreate)
//! - Idempotence and convergence
//! - Not-found forgiveness and hard failures

use std::sync::Arc;

use schemata_core::{IndexDescriptor, ManagedPrefixes, StoreError};
use schemata_logging::CorrelationContext;
use schemata_storage::{FaultOp, InMemoryDocumentStore, StoreOperation};
use schemata_sync::{IndexReconciler, Operation, ReconcileError, ReconcileMode, Severity};

const TABLE: &str = "cc_ObjectBase_switch";

// ============================================================================
// Helpers
// ============================================================================

fn setup() -> (Arc<InMemoryDocumentStore>, IndexReconciler) {
    let store = Arc::new(InMemoryDocumentStore::new());
    store.seed_table(TABLE);
    let reconciler = IndexReconciler::new(store.clone(), ManagedPrefixes::default());
    (store, reconciler)
}

fn index_ops(store: &InMemoryDocumentStore) -> Vec<StoreOperation> {
    store
        .journal()
        .into_iter()
        .filter(StoreOperation::is_index_mutation)
        .collect()
}

fn create_op(name: &str) -> StoreOperation {
    StoreOperation::CreateIndex {
        table: TABLE.to_string(),
        name: name.to_string(),
    }
}

fn drop_op(name: &str) -> StoreOperation {
    StoreOperation::DropIndex {
        table: TABLE.to_string(),
        name: name.to_string(),
    }
}

fn names(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn test_equivalent_index_kept_and_legacy_dropped() {
    let (store, reconciler) = setup();
    store.seed_index(TABLE, IndexDescriptor::new("bkcc_idx_a").asc("f1"));
    store.seed_index(TABLE, IndexDescriptor::new("bkcc_idx_legacy").asc("f9"));

    let desired = vec![IndexDescriptor::new("bkcc_idx_a").asc("f1")];
    let report = reconciler
        .reconcile(&CorrelationContext::new_root(), TABLE, &desired, &[], ReconcileMode::Plain)
        .await
        .unwrap();

    assert_eq!(report.unchanged, names(&["bkcc_idx_a"]));
    assert_eq!(report.dropped, names(&["bkcc_idx_legacy"]));
    assert_eq!(index_ops(&store), vec![drop_op("bkcc_idx_legacy")]);
    assert_eq!(store.index_names(TABLE), names(&["_id_", "bkcc_idx_a"]));
}

#[tokio::test]
async fn test_drifted_index_is_dropped_then_recreated() {
    let (store, reconciler) = setup();
    store.seed_index(TABLE, IndexDescriptor::new("bkcc_idx_b").asc("f1"));

    let desired = vec![IndexDescriptor::new("bkcc_idx_b").asc("f1").desc("f2").unique()];
    let report = reconciler
        .reconcile(&CorrelationContext::new_root(), TABLE, &desired, &[], ReconcileMode::Plain)
        .await
        .unwrap();

    assert_eq!(report.recreated, names(&["bkcc_idx_b"]));
    assert_eq!(index_ops(&store), vec![drop_op("bkcc_idx_b"), create_op("bkcc_idx_b")]);

    let live = store.indexes_of(TABLE).unwrap();
    let b = live.iter().find(|i| i.name == "bkcc_idx_b").unwrap();
    assert!(b.is_equivalent(&desired[0]));
}

#[tokio::test]
async fn test_unmanaged_indexes_are_never_touched() {
    let (store, reconciler) = setup();
    store.seed_index(TABLE, IndexDescriptor::new("custom_report_idx").asc("f3"));
    store.seed_index(TABLE, IndexDescriptor::new("bkcc_idx_old").asc("f4"));

    let report = reconciler
        .reconcile(
            &CorrelationContext::new_root(),
            TABLE,
            &[],
            &[],
            ReconcileMode::Object { unique_aware: true },
        )
        .await
        .unwrap();

    assert_eq!(report.dropped, names(&["bkcc_idx_old"]));
    assert_eq!(store.index_names(TABLE), names(&["_id_", "custom_report_idx"]));
}

#[tokio::test]
async fn test_plain_mode_does_not_create_missing() {
    let (store, reconciler) = setup();

    let desired = vec![IndexDescriptor::new("bkcc_idx_new").asc("f1")];
    let report = reconciler
        .reconcile(&CorrelationContext::new_root(), TABLE, &desired, &[], ReconcileMode::Plain)
        .await
        .unwrap();

    assert_eq!(report.not_created, names(&["bkcc_idx_new"]));
    assert!(index_ops(&store).is_empty());
}

#[tokio::test]
async fn test_object_mode_creates_missing() {
    let (store, reconciler) = setup();

    let desired = vec![
        IndexDescriptor::new("bkcc_idx_InstId").asc("bk_inst_id").unique(),
        IndexDescriptor::new("bkcc_unique_7").asc("bk_sn").unique(),
    ];
    let report = reconciler
        .reconcile(
            &CorrelationContext::new_root(),
            TABLE,
            &desired,
            &[],
            ReconcileMode::Object { unique_aware: true },
        )
        .await
        .unwrap();

    assert_eq!(report.created, names(&["bkcc_idx_InstId", "bkcc_unique_7"]));
    assert_eq!(
        index_ops(&store),
        vec![create_op("bkcc_idx_InstId"), create_op("bkcc_unique_7")]
    );
}

#[tokio::test]
async fn test_unique_prefix_only_owned_when_unique_aware() {
    let (store, reconciler) = setup();
    store.seed_index(TABLE, IndexDescriptor::new("bkcc_unique_3").asc("bk_sn").unique());
    let ctx = CorrelationContext::new_root();

    let report = reconciler
        .reconcile(&ctx, TABLE, &[], &[], ReconcileMode::Object { unique_aware: false })
        .await
        .unwrap();
    assert!(report.dropped.is_empty());
    assert!(store.index_names(TABLE).contains(&"bkcc_unique_3".to_string()));

    let report = reconciler
        .reconcile(&ctx, TABLE, &[], &[], ReconcileMode::Object { unique_aware: true })
        .await
        .unwrap();
    assert_eq!(report.dropped, names(&["bkcc_unique_3"]));
}

#[tokio::test]
async fn test_deprecated_names_dropped_only_when_live() {
    let (store, reconciler) = setup();
    store.seed_index(TABLE, IndexDescriptor::new("idx_taskID").asc("task_id"));

    let deprecated = names(&["idx_taskID", "idx_status"]);
    let report = reconciler
        .reconcile(&CorrelationContext::new_root(), TABLE, &[], &deprecated, ReconcileMode::Plain)
        .await
        .unwrap();

    assert_eq!(report.dropped, names(&["idx_taskID"]));
    assert!(report.failures.is_empty());
    assert_eq!(index_ops(&store), vec![drop_op("idx_taskID")]);
}

#[tokio::test]
async fn test_desired_name_wins_over_deprecated() {
    let (store, reconciler) = setup();
    store.seed_index(TABLE, IndexDescriptor::new("bkcc_idx_a").asc("f1"));

    let desired = vec![IndexDescriptor::new("bkcc_idx_a").asc("f1")];
    let report = reconciler
        .reconcile(
            &CorrelationContext::new_root(),
            TABLE,
            &desired,
            &names(&["bkcc_idx_a"]),
            ReconcileMode::Plain,
        )
        .await
        .unwrap();

    assert!(report.is_noop());
    assert!(index_ops(&store).is_empty());
}

#[tokio::test]
async fn test_rename_creates_before_dropping_old_name() {
    let (store, reconciler) = setup();
    store.seed_index(TABLE, IndexDescriptor::new("bk_inst_id_1").asc("bk_inst_id"));

    let desired = vec![IndexDescriptor::new("bkcc_idx_InstId").asc("bk_inst_id")];
    reconciler
        .reconcile(
            &CorrelationContext::new_root(),
            TABLE,
            &desired,
            &names(&["bk_inst_id_1"]),
            ReconcileMode::Object { unique_aware: true },
        )
        .await
        .unwrap();

    assert_eq!(
        index_ops(&store),
        vec![create_op("bkcc_idx_InstId"), drop_op("bk_inst_id_1")]
    );
}

// ============================================================================
// Properties
// ============================================================================

#[tokio::test]
async fn test_second_pass_is_a_noop() {
    let (store, reconciler) = setup();
    store.seed_index(TABLE, IndexDescriptor::new("bkcc_idx_legacy").asc("f9"));
    store.seed_index(TABLE, IndexDescriptor::new("bkcc_idx_b").asc("f1"));
    store.seed_index(TABLE, IndexDescriptor::new("idx_old").asc("f2"));
    store.seed_index(TABLE, IndexDescriptor::new("bkcc_unique_1").asc("f5").unique());

    let desired = vec![
        IndexDescriptor::new("bkcc_idx_b").asc("f1").desc("f2"),
        IndexDescriptor::new("bkcc_idx_c").asc("f3"),
        IndexDescriptor::new("bkcc_unique_2").asc("f4").unique(),
    ];
    let deprecated = names(&["idx_old"]);
    let mode = ReconcileMode::Object { unique_aware: true };
    let ctx = CorrelationContext::new_root();

    let first = reconciler
        .reconcile(&ctx, TABLE, &desired, &deprecated, mode)
        .await
        .unwrap();
    assert!(!first.is_noop());

    store.clear_journal();
    let second = reconciler
        .reconcile(&ctx, TABLE, &desired, &deprecated, mode)
        .await
        .unwrap();

    assert!(second.is_noop());
    assert_eq!(second.unchanged.len(), desired.len());
    assert!(index_ops(&store).is_empty());
}

#[tokio::test]
async fn test_single_pass_converges_to_desired() {
    let (store, reconciler) = setup();
    store.seed_index(TABLE, IndexDescriptor::new("bkcc_idx_x").asc("x"));
    store.seed_index(TABLE, IndexDescriptor::new("bkcc_idx_y").desc("y"));
    store.seed_index(TABLE, IndexDescriptor::new("bkcc_unique_9").asc("z").unique());
    store.seed_index(TABLE, IndexDescriptor::new("manual").asc("m"));

    let desired = vec![
        IndexDescriptor::new("bkcc_idx_y").asc("y"),
        IndexDescriptor::new("bkcc_unique_4").asc("u").unique(),
    ];
    reconciler
        .reconcile(
            &CorrelationContext::new_root(),
            TABLE,
            &desired,
            &[],
            ReconcileMode::Object { unique_aware: true },
        )
        .await
        .unwrap();

    let prefixes = ManagedPrefixes::default();
    let live = store.indexes_of(TABLE).unwrap();
    let managed: Vec<&IndexDescriptor> =
        live.iter().filter(|i| prefixes.is_managed(&i.name)).collect();
    assert_eq!(managed.len(), desired.len());
    for want in &desired {
        assert!(managed.iter().any(|i| i.name == want.name && i.is_equivalent(want)));
    }
    assert!(live.iter().any(|i| i.name == "manual"));
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test]
async fn test_index_not_found_on_drop_is_benign() {
    let (store, reconciler) = setup();
    store.seed_index(TABLE, IndexDescriptor::new("bkcc_idx_legacy").asc("f9"));
    store.inject_fault(
        FaultOp::DropIndex,
        format!("{TABLE}/bkcc_idx_legacy"),
        StoreError::index_not_found(TABLE, "bkcc_idx_legacy"),
    );

    let report = reconciler
        .reconcile(&CorrelationContext::new_root(), TABLE, &[], &[], ReconcileMode::Plain)
        .await
        .unwrap();

    assert!(report.dropped.is_empty());
    assert_eq!(report.failures.count(Severity::Benign), 1);
    assert!(!report.failures.has_problems());
}

#[tokio::test]
async fn test_forgiven_drop_during_recreate() {
    let (store, reconciler) = setup();
    store.seed_index(TABLE, IndexDescriptor::new("bkcc_idx_b").asc("f1"));
    store.inject_fault(
        FaultOp::DropIndex,
        format!("{TABLE}/bkcc_idx_b"),
        StoreError::index_not_found(TABLE, "bkcc_idx_b"),
    );

    let desired = vec![IndexDescriptor::new("bkcc_idx_b").asc("f2")];
    let report = reconciler
        .reconcile(&CorrelationContext::new_root(), TABLE, &desired, &[], ReconcileMode::Plain)
        .await
        .unwrap();

    // The old definition is still live, so the create conflicts and is recorded
    assert!(report.recreated.is_empty());
    assert_eq!(report.failures.count(Severity::Benign), 1);
    assert_eq!(report.failures.count(Severity::Degraded), 1);
    let failure = report
        .failures
        .iter()
        .find(|f| f.severity == Severity::Degraded)
        .unwrap();
    assert_eq!(failure.operation, Operation::RecreateIndex);
}

#[tokio::test]
async fn test_other_drop_error_aborts_table() {
    let (store, reconciler) = setup();
    store.seed_index(TABLE, IndexDescriptor::new("bkcc_idx_a").asc("a"));
    store.seed_index(TABLE, IndexDescriptor::new("bkcc_idx_b").asc("b"));
    store.inject_fault(
        FaultOp::DropIndex,
        format!("{TABLE}/bkcc_idx_a"),
        StoreError::backend("not primary"),
    );

    let err = reconciler
        .reconcile(&CorrelationContext::new_root(), TABLE, &[], &[], ReconcileMode::Plain)
        .await
        .unwrap_err();

    assert!(matches!(err, ReconcileError::DropIndex { ref name, .. } if name == "bkcc_idx_a"));
    assert_eq!(err.severity(), Severity::Degraded);
    // Deletions run in name order, so bkcc_idx_b was never attempted
    assert_eq!(index_ops(&store), vec![drop_op("bkcc_idx_a")]);
}

#[tokio::test]
async fn test_list_failure_aborts_before_any_change() {
    let (store, reconciler) = setup();
    store.seed_index(TABLE, IndexDescriptor::new("bkcc_idx_legacy").asc("f9"));
    store.inject_fault(FaultOp::ListIndexes, TABLE, StoreError::Timeout("list".to_string()));

    let err = reconciler
        .reconcile(
            &CorrelationContext::new_root(),
            TABLE,
            &[IndexDescriptor::new("bkcc_idx_a").asc("a")],
            &[],
            ReconcileMode::Object { unique_aware: true },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ReconcileError::ListIndexes { .. }));
    assert_eq!(err.severity(), Severity::Hard);
    assert!(store.journal().is_empty());
}

#[tokio::test]
async fn test_failed_create_does_not_stop_table() {
    let (store, reconciler) = setup();
    store.seed_index(TABLE, IndexDescriptor::new("bkcc_idx_legacy").asc("f9"));
    store.inject_fault(
        FaultOp::CreateIndex,
        format!("{TABLE}/bkcc_unique_7"),
        StoreError::backend("duplicate key"),
    );

    let desired = vec![
        IndexDescriptor::new("bkcc_unique_7").asc("bk_sn").unique(),
        IndexDescriptor::new("bkcc_idx_ObjId").asc("bk_obj_id"),
    ];
    let report = reconciler
        .reconcile(
            &CorrelationContext::new_root(),
            TABLE,
            &desired,
            &[],
            ReconcileMode::Object { unique_aware: true },
        )
        .await
        .unwrap();

    assert_eq!(report.created, names(&["bkcc_idx_ObjId"]));
    assert_eq!(report.dropped, names(&["bkcc_idx_legacy"]));
    assert_eq!(report.failures.count(Severity::Degraded), 1);
}

#[tokio::test]
async fn test_create_indexes_is_best_effort() {
    let (store, reconciler) = setup();
    store.inject_fault(
        FaultOp::CreateIndex,
        format!("{TABLE}/bkcc_idx_b"),
        StoreError::backend("disk full"),
    );

    let indexes = vec![
        IndexDescriptor::new("bkcc_idx_a").asc("a"),
        IndexDescriptor::new("bkcc_idx_b").asc("b"),
        IndexDescriptor::new("bkcc_idx_c").asc("c"),
    ];
    let report = reconciler
        .create_indexes(&CorrelationContext::new_root(), TABLE, &indexes)
        .await;

    assert_eq!(report.created, names(&["bkcc_idx_a", "bkcc_idx_c"]));
    assert_eq!(report.failures.len(), 1);
    assert!(index_ops(&store).iter().all(|op| matches!(op, StoreOperation::CreateIndex { .. })));
}
