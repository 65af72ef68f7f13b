//! Catalog index sync: system tables against their declared indexes

use std::collections::BTreeSet;
use std::sync::Arc;

use schemata_core::{DocumentStore, StoreError};
use schemata_logging::{CorrelationContext, spans};
use tracing::{Instrument, info, info_span, warn};

use crate::catalog::{IndexCatalog, TableIndexes};
use crate::error::SyncError;
use crate::reconciler::{IndexReconciler, ReconcileMode};
use crate::report::{IndexSyncReport, Operation, Severity};

/// Reconciles every system table registered in the catalog
#[derive(Clone)]
pub struct IndexSync {
    store: Arc<dyn DocumentStore>,
    catalog: Arc<IndexCatalog>,
    reconciler: IndexReconciler,
    create_missing_tables: bool,
}

impl IndexSync {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        catalog: Arc<IndexCatalog>,
        create_missing_tables: bool,
    ) -> Self {
        Self {
            reconciler: IndexReconciler::new(Arc::clone(&store), catalog.prefixes().clone()),
            store,
            catalog,
            create_missing_tables,
        }
    }

    /// Run one pass over the catalog's system tables, in name order
    ///
    /// Fails only if the table listing fails. A table that cannot be
    /// reconciled is recorded and the next one is processed.
    pub async fn sync_catalog_tables(
        &self,
        ctx: &CorrelationContext,
    ) -> Result<IndexSyncReport, SyncError> {
        let span = info_span!(spans::INDEX_SYNC, rid = %ctx.rid());
        self.sync_inner(ctx).instrument(span).await
    }

    async fn sync_inner(&self, ctx: &CorrelationContext) -> Result<IndexSyncReport, SyncError> {
        let live: BTreeSet<String> = self
            .store
            .list_tables()
            .await
            .map_err(SyncError::ListTables)?
            .into_iter()
            .collect();

        let mut report = IndexSyncReport::default();
        for (table, indexes) in self.catalog.tables() {
            let table_ctx = ctx.child(table);
            if live.contains(table) {
                match self
                    .reconciler
                    .reconcile(
                        &table_ctx,
                        table,
                        indexes.current(),
                        indexes.deprecated(),
                        ReconcileMode::Plain,
                    )
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
            } else if self.create_missing_tables {
                self.bootstrap(&table_ctx, table, indexes, &mut report).await;
            } else {
                warn!(rid = %ctx.rid(), table, "catalog table missing, skipping");
                report.skipped_tables.push(table.to_string());
            }
        }

        Ok(report)
    }

    /// Create a missing system table and apply its current indexes
    async fn bootstrap(
        &self,
        ctx: &CorrelationContext,
        table: &str,
        indexes: &TableIndexes,
        report: &mut IndexSyncReport,
    ) {
        match self.store.create_table(table).await {
            Ok(()) => {
                info!(rid = %ctx.rid(), table, "created missing catalog table");
                report.created_tables.push(table.to_string());
            }
            Err(e @ StoreError::TableExists(_)) => {
                report
                    .failures
                    .record(ctx, Severity::Benign, Operation::CreateTable, table, &e);
            }
            Err(e) => {
                report
                    .failures
                    .record(ctx, Severity::Degraded, Operation::CreateTable, table, &e);
            }
        }

        let table_report = self
            .reconciler
            .create_indexes(ctx, table, indexes.current())
            .await;
        report.tables.push(table_report);
    }
}
