//! Index reconciliation of a single table
//!
//! Brings the live indexes of one table in line with a desired set:
//!
//! 1. List live indexes. Failure here is the only way to abort before any
//!    change is made.
//! 2. Seed the pending-deletion set with every live index the reconciler
//!    owns, plus deprecated names that are still live.
//! 3. Walk the desired set. Each desired name leaves the pending set. A live
//!    index with that name and an equivalent definition is left alone; a
//!    drifted one is dropped and recreated; a missing one is created by the
//!    object variant only.
//! 4. Drop everything still pending, in name order.
//!
//! Indexes that belong to nobody (no managed prefix, not deprecated) are
//! never touched.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use schemata_core::{DocumentStore, IndexDescriptor, ManagedPrefixes, StoreError};
use schemata_logging::{CorrelationContext, CorrelationExt, spans};
use tracing::field::Empty;
use tracing::{Instrument, debug, info, info_span};

use crate::error::ReconcileError;
use crate::report::{Operation, Severity, TableReport};

/// Which reconciliation rules apply to a table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileMode {
    /// System tables: desired indexes missing from the table are not created
    Plain,
    /// Sharded object tables: missing indexes are created, and unique-prefixed
    /// indexes are deletion candidates when `unique_aware` is set
    Object { unique_aware: bool },
}

impl ReconcileMode {
    fn unique_aware(self) -> bool {
        matches!(self, Self::Object { unique_aware: true })
    }

    fn creates_missing(self) -> bool {
        matches!(self, Self::Object { .. })
    }
}

/// Reconciles live indexes against declared ones through a [`DocumentStore`]
#[derive(Clone)]
pub struct IndexReconciler {
    store: Arc<dyn DocumentStore>,
    prefixes: ManagedPrefixes,
}

impl IndexReconciler {
    pub fn new(store: Arc<dyn DocumentStore>, prefixes: ManagedPrefixes) -> Self {
        Self { store, prefixes }
    }

    pub fn prefixes(&self) -> &ManagedPrefixes {
        &self.prefixes
    }

    /// Reconcile `table` against `desired`, removing live `deprecated` names
    ///
    /// Per-index failures are recorded in the report. Only a failure to list
    /// the live indexes, or a drop failure other than not-found in the final
    /// deletion pass, aborts the table.
    pub async fn reconcile(
        &self,
        ctx: &CorrelationContext,
        table: &str,
        desired: &[IndexDescriptor],
        deprecated: &[String],
        mode: ReconcileMode,
    ) -> Result<TableReport, ReconcileError> {
        let span = info_span!(
            spans::RECONCILE_TABLE,
            table,
            rid = Empty,
            span_id = Empty,
            scope = Empty
        );
        span.record_correlation(ctx);
        self.reconcile_inner(ctx, table, desired, deprecated, mode)
            .instrument(span)
            .await
    }

    async fn reconcile_inner(
        &self,
        ctx: &CorrelationContext,
        table: &str,
        desired: &[IndexDescriptor],
        deprecated: &[String],
        mode: ReconcileMode,
    ) -> Result<TableReport, ReconcileError> {
        let live: BTreeMap<String, IndexDescriptor> = self
            .store
            .list_indexes(table)
            .await
            .map_err(|source| ReconcileError::ListIndexes {
                table: table.to_string(),
                source,
            })?
            .into_iter()
            .map(|index| (index.name.clone(), index))
            .collect();

        let mut pending: BTreeSet<String> = live
            .keys()
            .filter(|name| self.prefixes.owns(name, mode.unique_aware()))
            .cloned()
            .collect();
        pending.extend(
            deprecated
                .iter()
                .filter(|name| live.contains_key(name.as_str()))
                .cloned(),
        );

        let mut report = TableReport::new(table);

        for index in desired {
            pending.remove(&index.name);

            match live.get(&index.name) {
                Some(existing) if existing.is_equivalent(index) => {
                    report.unchanged.push(index.name.clone());
                }
                Some(existing) => {
                    info!(
                        rid = %ctx.rid(),
                        table,
                        live = %existing,
                        desired = %index,
                        "index definition drifted, recreating"
                    );
                    match self.recreate(ctx, table, index, &mut report).await {
                        Ok(()) => report.recreated.push(index.name.clone()),
                        Err(e) => report.failures.record(
                            ctx,
                            Severity::Degraded,
                            Operation::RecreateIndex,
                            index_target(table, &index.name),
                            &e,
                        ),
                    }
                }
                None if mode.creates_missing() => {
                    match self.store.create_index(table, index).await {
                        Ok(()) => {
                            info!(rid = %ctx.rid(), table, index = %index, "created index");
                            report.created.push(index.name.clone());
                        }
                        Err(e) => report.failures.record(
                            ctx,
                            Severity::Degraded,
                            Operation::CreateIndex,
                            index_target(table, &index.name),
                            &e,
                        ),
                    }
                }
                None => {
                    debug!(
                        rid = %ctx.rid(),
                        table,
                        index = %index.name,
                        "desired index not live, leaving it"
                    );
                    report.not_created.push(index.name.clone());
                }
            }
        }

        for name in pending {
            match self.store.drop_index(table, &name).await {
                Ok(()) => {
                    info!(rid = %ctx.rid(), table, index = %name, "dropped index");
                    report.dropped.push(name);
                }
                Err(e) if e.is_index_not_found() => report.failures.record(
                    ctx,
                    Severity::Benign,
                    Operation::DropIndex,
                    index_target(table, &name),
                    &e,
                ),
                Err(source) => {
                    return Err(ReconcileError::DropIndex {
                        table: table.to_string(),
                        name,
                        source,
                    });
                }
            }
        }

        Ok(report)
    }

    /// Create each index on a table that has no prior state
    ///
    /// No diff is computed; every failure is recorded and the rest continue.
    pub async fn create_indexes(
        &self,
        ctx: &CorrelationContext,
        table: &str,
        indexes: &[IndexDescriptor],
    ) -> TableReport {
        let mut report = TableReport::new(table);
        for index in indexes {
            match self.store.create_index(table, index).await {
                Ok(()) => report.created.push(index.name.clone()),
                Err(e) => report.failures.record(
                    ctx,
                    Severity::Degraded,
                    Operation::CreateIndex,
                    index_target(table, &index.name),
                    &e,
                ),
            }
        }
        debug!(
            rid = %ctx.rid(),
            table,
            created = report.created.len(),
            "applied indexes to new table"
        );
        report
    }

    /// Drop `index.name` and create `index` in its place
    async fn recreate(
        &self,
        ctx: &CorrelationContext,
        table: &str,
        index: &IndexDescriptor,
        report: &mut TableReport,
    ) -> Result<(), StoreError> {
        if let Err(e) = self.store.drop_index(table, &index.name).await {
            if !e.is_index_not_found() {
                return Err(e);
            }
            report.failures.record(
                ctx,
                Severity::Benign,
                Operation::DropIndex,
                index_target(table, &index.name),
                &e,
            );
        }
        self.store.create_index(table, index).await
    }
}

fn index_target(table: &str, index: &str) -> String {
    format!("{table}/{index}")
}
