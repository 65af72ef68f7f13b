//! Table sharding: one instance table and one association table per object
//!
//! Each object `X` owns `cc_ObjectBase_X` and `cc_InstAsst_X`. A sync pass
//! creates the tables of new objects, reconciles the indexes of existing
//! ones, and retires sharded tables whose object is gone, but only once they
//! hold no rows.

use std::collections::BTreeSet;
use std::sync::Arc;

use schemata_core::{
    DocumentStore, IndexDescriptor, ModelStore, ObjectFilter, ObjectRecord, StoreError,
    association_table_name, instance_table_name, is_sharding_table,
};
use schemata_logging::{CorrelationContext, CorrelationExt, spans};
use tracing::field::Empty;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::catalog::IndexCatalog;
use crate::config::UniqueFailurePolicy;
use crate::error::SyncError;
use crate::reconciler::{IndexReconciler, ReconcileMode};
use crate::report::{Operation, RetirementReport, Severity, ShardingReport};
use crate::unique::UniqueTranslator;

/// Keeps per-object tables and their indexes in line with the model
#[derive(Clone)]
pub struct ShardingManager {
    store: Arc<dyn DocumentStore>,
    models: Arc<dyn ModelStore>,
    catalog: Arc<IndexCatalog>,
    reconciler: IndexReconciler,
    translator: UniqueTranslator,
    policy: UniqueFailurePolicy,
}

/// Desired state of one sharded table
struct TablePlan<'a> {
    table: String,
    desired: Vec<IndexDescriptor>,
    deprecated: &'a [String],
    mode: ReconcileMode,
}

impl ShardingManager {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        models: Arc<dyn ModelStore>,
        catalog: Arc<IndexCatalog>,
        policy: UniqueFailurePolicy,
    ) -> Self {
        let prefixes = catalog.prefixes().clone();
        Self {
            reconciler: IndexReconciler::new(Arc::clone(&store), prefixes.clone()),
            translator: UniqueTranslator::new(Arc::clone(&models), prefixes),
            store,
            models,
            catalog,
            policy,
        }
    }

    /// Run one sharding pass over every object, then retire orphans
    ///
    /// Fails only if the table or object listing fails. Everything below
    /// that is recorded in the report and the pass moves on.
    pub async fn sync_sharding_tables(
        &self,
        ctx: &CorrelationContext,
    ) -> Result<ShardingReport, SyncError> {
        let span = info_span!(spans::SHARDING_SYNC, rid = %ctx.rid());
        self.sync_inner(ctx).instrument(span).await
    }

    async fn sync_inner(&self, ctx: &CorrelationContext) -> Result<ShardingReport, SyncError> {
        let mut existing: BTreeSet<String> = self
            .store
            .list_tables()
            .await
            .map_err(SyncError::ListTables)?
            .into_iter()
            .filter(|table| is_sharding_table(table))
            .collect();

        let objects = self
            .models
            .list_objects(ObjectFilter::all())
            .await
            .map_err(SyncError::ListObjects)?;

        info!(
            rid = %ctx.rid(),
            objects = objects.len(),
            sharding_tables = existing.len(),
            "start sync sharding tables"
        );

        let mut report = ShardingReport::default();
        for object in &objects {
            let object_ctx = ctx.child(object.object_id.as_str());
            let span = info_span!(
                spans::SHARDING_OBJECT,
                object_id = %object.object_id,
                rid = Empty,
                span_id = Empty,
                scope = Empty
            );
            span.record_correlation(&object_ctx);
            self.sync_object(&object_ctx, object, &existing, &mut report)
                .instrument(span)
                .await;

            existing.remove(&instance_table_name(&object.object_id));
            existing.remove(&association_table_name(&object.object_id));
            report.objects += 1;
        }

        if !existing.is_empty() {
            let retirement = self.retire_orphan_tables(ctx, existing).await;
            report.retired_tables = retirement.dropped;
            report.retained_tables = retirement.retained;
            report.failures.absorb(retirement.failures);
        }

        Ok(report)
    }

    async fn sync_object(
        &self,
        ctx: &CorrelationContext,
        object: &ObjectRecord,
        existing: &BTreeSet<String>,
        report: &mut ShardingReport,
    ) {
        let object_id = object.object_id.as_str();
        debug!(rid = %ctx.rid(), object_id, builtin = object.is_builtin, "sync object tables");

        let (uniques, unique_aware) = match self.translator.translate(object_id).await {
            Ok(uniques) => (uniques, true),
            Err(e) => {
                report.failures.record(
                    ctx,
                    Severity::Degraded,
                    Operation::ResolveUniques,
                    object_id,
                    &e,
                );
                (Vec::new(), false)
            }
        };

        let instance = self.catalog.instance_family();
        let instance_table = instance_table_name(object_id);
        if unique_aware || self.policy == UniqueFailurePolicy::Degrade {
            let mut desired = instance.current().to_vec();
            desired.extend(uniques);
            let plan = TablePlan {
                table: instance_table,
                desired,
                deprecated: instance.deprecated(),
                mode: ReconcileMode::Object { unique_aware },
            };
            self.sync_table(ctx, object, existing, plan, report).await;
        } else {
            warn!(
                rid = %ctx.rid(),
                object_id,
                table = %instance_table,
                "unique constraints unresolved, leaving instance table for the next cycle"
            );
            report.skipped_tables.push(instance_table);
        }

        let association = self.catalog.association_family();
        let plan = TablePlan {
            table: association_table_name(object_id),
            desired: association.current().to_vec(),
            deprecated: association.deprecated(),
            mode: ReconcileMode::Plain,
        };
        self.sync_table(ctx, object, existing, plan, report).await;
    }

    async fn sync_table(
        &self,
        ctx: &CorrelationContext,
        object: &ObjectRecord,
        existing: &BTreeSet<String>,
        plan: TablePlan<'_>,
        report: &mut ShardingReport,
    ) {
        let table = plan.table.as_str();
        let table_ctx = ctx.child(table);

        if existing.contains(table) {
            match self
                .reconciler
                .reconcile(&table_ctx, table, &plan.desired, plan.deprecated, plan.mode)
                .await
            {
                Ok(table_report) => report.tables.push(table_report),
                Err(e) => report.failures.record(
                    &table_ctx,
                    e.severity(),
                    Operation::ReconcileTable,
                    table,
                    &e,
                ),
            }
            return;
        }

        if object.is_builtin {
            debug!(rid = %ctx.rid(), table, "built-in object table missing, not creating");
            return;
        }

        match self.store.create_table(table).await {
            Ok(()) => {
                info!(rid = %ctx.rid(), table, "created sharding table");
                report.created_tables.push(plan.table.clone());
            }
            // Created concurrently since the listing; its indexes still apply
            Err(e @ StoreError::TableExists(_)) => report.failures.record(
                &table_ctx,
                Severity::Benign,
                Operation::CreateTable,
                table,
                &e,
            ),
            Err(e) => report.failures.record(
                &table_ctx,
                Severity::Degraded,
                Operation::CreateTable,
                table,
                &e,
            ),
        }

        let table_report = self
            .reconciler
            .create_indexes(&table_ctx, table, &plan.desired)
            .await;
        report.tables.push(table_report);
    }

    /// Drop sharded tables whose object no longer exists
    ///
    /// `candidates` are sharded tables no object claimed during this pass.
    /// Live user-defined objects are looked up again, so a table whose
    /// object was created in the meantime is kept. A candidate is dropped
    /// only when a probe confirms it holds no rows.
    pub async fn retire_orphan_tables(
        &self,
        ctx: &CorrelationContext,
        candidates: BTreeSet<String>,
    ) -> RetirementReport {
        let span = info_span!(spans::RETIRE_TABLES, rid = %ctx.rid());
        self.retire_inner(ctx, candidates).instrument(span).await
    }

    async fn retire_inner(
        &self,
        ctx: &CorrelationContext,
        mut candidates: BTreeSet<String>,
    ) -> RetirementReport {
        let mut report = RetirementReport::default();

        match self.models.list_objects(ObjectFilter::user_defined()).await {
            Ok(objects) => {
                for object in &objects {
                    candidates.remove(&instance_table_name(&object.object_id));
                    candidates.remove(&association_table_name(&object.object_id));
                }
            }
            Err(e) => {
                report.failures.record(
                    ctx,
                    Severity::Hard,
                    Operation::ListObjects,
                    "orphan tables",
                    &e,
                );
                report.retained.extend(candidates);
                return report;
            }
        }

        for table in candidates {
            match self.store.find_one(&table).await {
                Ok(_) => {
                    warn!(
                        rid = %ctx.rid(),
                        table = %table,
                        "orphan sharding table still has rows, not dropping it"
                    );
                    report.retained.push(table);
                }
                Err(e) if e.is_not_found() => match self.store.drop_table(&table).await {
                    Ok(()) => {
                        info!(rid = %ctx.rid(), table = %table, "dropped orphan sharding table");
                        report.dropped.push(table);
                    }
                    Err(e) if e.is_table_not_found() => {
                        report
                            .failures
                            .record(ctx, Severity::Benign, Operation::DropTable, table, &e);
                    }
                    Err(e) => {
                        report.failures.record(
                            ctx,
                            Severity::Degraded,
                            Operation::DropTable,
                            table.as_str(),
                            &e,
                        );
                        report.retained.push(table);
                    }
                },
                Err(e) if e.is_table_not_found() => {
                    report
                        .failures
                        .record(ctx, Severity::Benign, Operation::ProbeRows, table, &e);
                }
                Err(e) => {
                    report.failures.record(
                        ctx,
                        Severity::Degraded,
                        Operation::ProbeRows,
                        table.as_str(),
                        &e,
                    );
                    report.retained.push(table);
                }
            }
        }

        report
    }
}
