//! Outcomes of reconciliation scopes
//!
//! Every scope (table, object, sync step, cycle) collects the failures it
//! swallowed into a [`FailureLog`] and hands it up in its report. A failure
//! is logged exactly once, when it is recorded, at the severity of its tier:
//!
//! | Tier       | Examples                                        | Level   |
//! |------------|-------------------------------------------------|---------|
//! | `Benign`   | index already gone on drop, table already gone  | `debug` |
//! | `Degraded` | uniques unresolved, one table or index failed   | `warn`  |
//! | `Hard`     | listing tables, objects or indexes failed       | `error` |

use std::fmt;

use chrono::{DateTime, Utc};
use schemata_logging::CorrelationContext;
use tracing::{debug, error, warn};

/// Severity tier of a swallowed failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Benign,
    Degraded,
    Hard,
}

/// The store call or step that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ListTables,
    ListObjects,
    ResolveUniques,
    CreateTable,
    DropTable,
    ProbeRows,
    ReconcileTable,
    ListIndexes,
    CreateIndex,
    DropIndex,
    RecreateIndex,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ListTables => "list_tables",
            Self::ListObjects => "list_objects",
            Self::ResolveUniques => "resolve_uniques",
            Self::CreateTable => "create_table",
            Self::DropTable => "drop_table",
            Self::ProbeRows => "probe_rows",
            Self::ReconcileTable => "reconcile_table",
            Self::ListIndexes => "list_indexes",
            Self::CreateIndex => "create_index",
            Self::DropIndex => "drop_index",
            Self::RecreateIndex => "recreate_index",
        };
        f.write_str(name)
    }
}

/// One recorded failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub severity: Severity,
    pub operation: Operation,
    /// Table, `table/index` or object id the operation targeted
    pub target: String,
    pub error: String,
}

/// Failures swallowed by a scope
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FailureLog {
    entries: Vec<Failure>,
}

impl FailureLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure and log it at its tier's level
    pub fn record(
        &mut self,
        ctx: &CorrelationContext,
        severity: Severity,
        operation: Operation,
        target: impl Into<String>,
        error: &dyn fmt::Display,
    ) {
        let failure = Failure {
            severity,
            operation,
            target: target.into(),
            error: error.to_string(),
        };

        let rid = ctx.rid();
        match severity {
            Severity::Benign => debug!(
                rid = %rid,
                operation = %failure.operation,
                target = %failure.target,
                error = %failure.error,
                "ignoring benign store error"
            ),
            Severity::Degraded => warn!(
                rid = %rid,
                operation = %failure.operation,
                target = %failure.target,
                error = %failure.error,
                "store operation failed, continuing"
            ),
            Severity::Hard => error!(
                rid = %rid,
                operation = %failure.operation,
                target = %failure.target,
                error = %failure.error,
                "store operation failed, aborting scope"
            ),
        }

        self.entries.push(failure);
    }

    /// Take over the entries of a nested scope without logging them again
    pub fn absorb(&mut self, other: FailureLog) {
        self.entries.extend(other.entries);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Failure> {
        self.entries.iter()
    }

    /// Number of entries of one tier
    pub fn count(&self, severity: Severity) -> usize {
        self.entries.iter().filter(|f| f.severity == severity).count()
    }

    /// Number of entries worse than benign
    pub fn problems(&self) -> usize {
        self.entries.iter().filter(|f| f.severity > Severity::Benign).count()
    }

    pub fn has_problems(&self) -> bool {
        self.problems() > 0
    }
}

/// Outcome of reconciling (or bootstrapping) one table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableReport {
    pub table: String,
    /// Indexes created because no live index had their name
    pub created: Vec<String>,
    /// Indexes dropped and recreated because their definition drifted
    pub recreated: Vec<String>,
    /// Managed or deprecated indexes removed
    pub dropped: Vec<String>,
    /// Desired indexes already live with an equivalent definition
    pub unchanged: Vec<String>,
    /// Desired indexes left missing because the variant does not create them
    pub not_created: Vec<String>,
    pub failures: FailureLog,
}

impl TableReport {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Self::default()
        }
    }

    /// Number of create and drop calls that took effect
    pub fn changes(&self) -> usize {
        self.created.len() + self.recreated.len() + self.dropped.len()
    }

    /// True if the pass changed nothing and hit no failure
    pub fn is_noop(&self) -> bool {
        self.changes() == 0 && self.failures.is_empty()
    }
}

/// Outcome of one table-sharding sync
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShardingReport {
    /// Objects visited
    pub objects: usize,
    /// Sharded tables created for objects that lacked them
    pub created_tables: Vec<String>,
    /// Orphan tables dropped
    pub retired_tables: Vec<String>,
    /// Orphan tables kept because they hold rows or could not be probed
    pub retained_tables: Vec<String>,
    /// Instance tables left alone because their uniques were unresolved
    pub skipped_tables: Vec<String>,
    pub tables: Vec<TableReport>,
    /// Failures of the sharding step itself (table reports carry their own)
    pub failures: FailureLog,
}

impl ShardingReport {
    pub fn table(&self, name: &str) -> Option<&TableReport> {
        self.tables.iter().find(|report| report.table == name)
    }

    /// Index create and drop calls across all tables
    pub fn index_changes(&self) -> usize {
        self.tables.iter().map(TableReport::changes).sum()
    }

    /// Failures of the step and of every table, worse than benign
    pub fn problem_count(&self) -> usize {
        self.failures.problems() + self.tables.iter().map(|t| t.failures.problems()).sum::<usize>()
    }
}

/// Outcome of orphan-table retirement
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetirementReport {
    pub dropped: Vec<String>,
    pub retained: Vec<String>,
    pub failures: FailureLog,
}

/// Outcome of one catalog index sync
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexSyncReport {
    /// Catalog tables created because they were missing
    pub created_tables: Vec<String>,
    /// Catalog tables missing from the store and left missing
    pub skipped_tables: Vec<String>,
    pub tables: Vec<TableReport>,
    pub failures: FailureLog,
}

impl IndexSyncReport {
    pub fn table(&self, name: &str) -> Option<&TableReport> {
        self.tables.iter().find(|report| report.table == name)
    }

    pub fn index_changes(&self) -> usize {
        self.tables.iter().map(TableReport::changes).sum()
    }

    pub fn problem_count(&self) -> usize {
        self.failures.problems() + self.tables.iter().map(|t| t.failures.problems()).sum::<usize>()
    }
}

/// Outcome of one full cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// Correlation id of the cycle
    pub rid: String,
    /// Sequence number of the cycle within this scheduler
    pub cycle: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// `None` when the sharding step aborted
    pub sharding: Option<ShardingReport>,
    /// `None` when the catalog index sync aborted
    pub index_sync: Option<IndexSyncReport>,
    /// Hard failures that aborted a step
    pub failures: FailureLog,
}

impl CycleReport {
    /// True if both steps ran to completion without any non-benign failure
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
            && self.sharding.as_ref().is_some_and(|r| r.problem_count() == 0)
            && self.index_sync.as_ref().is_some_and(|r| r.problem_count() == 0)
    }

    pub fn index_changes(&self) -> usize {
        self.sharding.as_ref().map_or(0, ShardingReport::index_changes)
            + self.index_sync.as_ref().map_or(0, IndexSyncReport::index_changes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_log_counts_by_tier() {
        let ctx = CorrelationContext::new_root();
        let mut log = FailureLog::new();
        log.record(&ctx, Severity::Benign, Operation::DropIndex, "t/i", &"gone");
        assert!(!log.has_problems());

        log.record(&ctx, Severity::Degraded, Operation::CreateIndex, "t/j", &"dup key");
        assert_eq!(log.len(), 2);
        assert_eq!(log.count(Severity::Degraded), 1);
        assert!(log.has_problems());

        let entry = log.iter().last().unwrap();
        assert_eq!(entry.target, "t/j");
        assert_eq!(entry.error, "dup key");
    }

    #[test]
    fn test_absorb_moves_entries() {
        let ctx = CorrelationContext::new_root();
        let mut inner = FailureLog::new();
        inner.record(&ctx, Severity::Hard, Operation::ListIndexes, "t", &"down");

        let mut outer = FailureLog::new();
        outer.absorb(inner);
        assert_eq!(outer.count(Severity::Hard), 1);
    }

    #[test]
    fn test_table_report_noop() {
        let mut report = TableReport::new("cc_HostBase");
        report.unchanged.push("bkcc_idx_HostID".to_string());
        assert!(report.is_noop());

        report.dropped.push("bkcc_idx_old".to_string());
        assert!(!report.is_noop());
        assert_eq!(report.changes(), 1);
    }

    #[test]
    fn test_operation_display() {
        assert_eq!(Operation::RecreateIndex.to_string(), "recreate_index");
        assert_eq!(Operation::ProbeRows.to_string(), "probe_rows");
    }
}
