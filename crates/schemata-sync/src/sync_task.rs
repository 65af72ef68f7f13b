//! Background sync task for periodic table and index reconciliation
//!
//! Handles:
//! - Leadership gating: only the leader replica reconciles
//! - Table sharding sync, then catalog index sync, once per cycle
//! - Scheduling: the long interval after a cycle, the short one after a
//!   skipped tick
//!
//! Every failure below the cycle is logged and swallowed; the loop itself
//! never exits. Dropping or aborting the returned `JoinHandle` is the only
//! way to stop it.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use schemata_core::{DocumentStore, LeadershipOracle, ModelStore};
use schemata_logging::{CorrelationContext, spans};
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info, info_span};

use crate::catalog::IndexCatalog;
use crate::config::{ConfigError, SyncConfig};
use crate::error::SyncError;
use crate::index_sync::IndexSync;
use crate::report::{CycleReport, FailureLog, Operation, Severity};
use crate::sharding::ShardingManager;

/// What one tick of the scheduler did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// This replica is not the leader; nothing was done
    Standby { rid: String },
    /// A full cycle ran
    Completed(CycleReport),
}

impl TickOutcome {
    /// How long to sleep before the next tick
    pub fn next_delay(&self, config: &SyncConfig) -> Duration {
        match self {
            Self::Standby { .. } => config.standby_interval(),
            Self::Completed(_) => config.sync_interval(),
        }
    }
}

/// Background sync task
pub struct SyncTask {
    config: SyncConfig,
    leadership: Arc<dyn LeadershipOracle>,
    sharding: ShardingManager,
    index_sync: IndexSync,
    /// Cycles run so far
    cycle_count: u64,
}

impl SyncTask {
    /// Create a sync task over a caller-built catalog
    ///
    /// The config is validated here, so a task never runs with a zero
    /// interval. The catalog must have been built with `config.prefixes`;
    /// anything else would leave two disagreeing sets of managed prefixes.
    pub fn new(
        config: SyncConfig,
        store: Arc<dyn DocumentStore>,
        models: Arc<dyn ModelStore>,
        leadership: Arc<dyn LeadershipOracle>,
        catalog: Arc<IndexCatalog>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        if catalog.prefixes() != &config.prefixes {
            return Err(ConfigError::Invalid(format!(
                "catalog prefixes '{}'/'{}' differ from configured '{}'/'{}'",
                catalog.prefixes().logic,
                catalog.prefixes().unique,
                config.prefixes.logic,
                config.prefixes.unique
            )));
        }

        let sharding = ShardingManager::new(
            Arc::clone(&store),
            models,
            Arc::clone(&catalog),
            config.unique_failure_policy,
        );
        let index_sync = IndexSync::new(store, catalog, config.create_missing_system_tables);

        Ok(Self {
            config,
            leadership,
            sharding,
            index_sync,
            cycle_count: 0,
        })
    }

    /// Create a sync task over the shipped catalog, named with `config.prefixes`
    pub fn standard(
        config: SyncConfig,
        store: Arc<dyn DocumentStore>,
        models: Arc<dyn ModelStore>,
        leadership: Arc<dyn LeadershipOracle>,
    ) -> Result<Self, ConfigError> {
        let catalog = Arc::new(IndexCatalog::standard(config.prefixes.clone())?);
        Self::new(config, store, models, leadership, catalog)
    }

    /// Spawn the sync task as a background task
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    /// Run the sync task loop
    async fn run(mut self) {
        info!(
            replica = %self.config.replica_id,
            interval_secs = self.config.sync_interval_secs,
            standby_secs = self.config.standby_interval_secs,
            "Sync task started"
        );

        loop {
            let outcome = self.tick().await;
            tokio::time::sleep(outcome.next_delay(&self.config)).await;
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Number of cycles this task has run
    pub fn cycle_count(&self) -> u64 {
        self.cycle_count
    }

    /// One scheduler tick: check leadership, then run a cycle if leader
    pub async fn tick(&mut self) -> TickOutcome {
        let ctx = CorrelationContext::new_root();

        if !self.leadership.is_leader().await {
            debug!(
                rid = %ctx.rid(),
                replica = %self.config.replica_id,
                "not the leader, skipping sync"
            );
            return TickOutcome::Standby { rid: ctx.rid() };
        }

        self.cycle_count += 1;
        let span = info_span!(
            spans::SYNC_CYCLE,
            rid = %ctx.rid(),
            replica = %self.config.replica_id,
            cycle = self.cycle_count
        );
        let report = self.run_cycle(&ctx).instrument(span).await;
        TickOutcome::Completed(report)
    }

    /// Run both sync steps unconditionally
    ///
    /// A step that fails outright is recorded and the next one still runs.
    pub async fn run_cycle(&self, ctx: &CorrelationContext) -> CycleReport {
        let started_at = Utc::now();
        info!(rid = %ctx.rid(), "start sync table and index");

        let mut failures = FailureLog::new();

        let sharding = match self.sharding.sync_sharding_tables(ctx).await {
            Ok(report) => Some(report),
            Err(e) => {
                failures.record(ctx, Severity::Hard, sync_operation(&e), "sharding tables", &e);
                None
            }
        };

        let index_sync = match self.index_sync.sync_catalog_tables(ctx).await {
            Ok(report) => Some(report),
            Err(e) => {
                failures.record(ctx, Severity::Hard, sync_operation(&e), "catalog tables", &e);
                None
            }
        };

        let report = CycleReport {
            rid: ctx.rid(),
            cycle: self.cycle_count,
            started_at,
            finished_at: Utc::now(),
            sharding,
            index_sync,
            failures,
        };

        info!(
            rid = %report.rid,
            cycle = report.cycle,
            objects = report.sharding.as_ref().map_or(0, |r| r.objects),
            tables_created = report.sharding.as_ref().map_or(0, |r| r.created_tables.len())
                + report.index_sync.as_ref().map_or(0, |r| r.created_tables.len()),
            tables_retired = report.sharding.as_ref().map_or(0, |r| r.retired_tables.len()),
            tables_retained = report.sharding.as_ref().map_or(0, |r| r.retained_tables.len()),
            index_changes = report.index_changes(),
            clean = report.is_clean(),
            elapsed_ms = (report.finished_at - report.started_at).num_milliseconds(),
            "end sync table and index"
        );

        report
    }
}

fn sync_operation(error: &SyncError) -> Operation {
    match error {
        SyncError::ListTables(_) => Operation::ListTables,
        SyncError::ListObjects(_) => Operation::ListObjects,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_delay() {
        let config = SyncConfig::default()
            .with_sync_interval(Duration::from_secs(600))
            .with_standby_interval(Duration::from_secs(7));

        let standby = TickOutcome::Standby { rid: "r".to_string() };
        assert_eq!(standby.next_delay(&config), Duration::from_secs(7));

        let now = Utc::now();
        let completed = TickOutcome::Completed(CycleReport {
            rid: "r".to_string(),
            cycle: 1,
            started_at: now,
            finished_at: now,
            sharding: None,
            index_sync: None,
            failures: FailureLog::new(),
        });
        assert_eq!(completed.next_delay(&config), Duration::from_secs(600));
    }
}
