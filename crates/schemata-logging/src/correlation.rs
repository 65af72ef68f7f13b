//! Correlation ids for reconciliation cycles
//!
//! Every scheduler tick creates a root [`CorrelationContext`]. Its `rid` is
//! attached to every log line of the tick, so all work done by one cycle can
//! be pulled out of the aggregated logs of every replica. Nested scopes
//! (one object, one table) get child contexts that keep the same `rid`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Correlation context of one reconciliation cycle or a scope inside it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrelationContext {
    /// Request id shared by the whole cycle
    pub trace_id: Uuid,

    /// Id of this particular scope
    pub span_id: Uuid,

    /// Scope this one was derived from
    pub parent_span_id: Option<Uuid>,

    /// What this scope covers, e.g. a table or object id
    pub scope: Option<String>,

    /// Nesting depth below the cycle root
    pub depth: u32,
}

impl CorrelationContext {
    /// Create a new root context (one per cycle)
    pub fn new_root() -> Self {
        Self {
            trace_id: Uuid::new_v4(),
            span_id: Uuid::new_v4(),
            parent_span_id: None,
            scope: None,
            depth: 0,
        }
    }

    /// Create a child context for a nested scope
    pub fn child(&self, scope: impl Into<String>) -> Self {
        Self {
            trace_id: self.trace_id,
            span_id: Uuid::new_v4(),
            parent_span_id: Some(self.span_id),
            scope: Some(scope.into()),
            depth: self.depth + 1,
        }
    }

    /// Request id as logged in the `rid` field
    pub fn rid(&self) -> String {
        self.trace_id.as_simple().to_string()
    }

    pub fn span_id_str(&self) -> String {
        self.span_id.as_simple().to_string()
    }

    pub fn is_root(&self) -> bool {
        self.parent_span_id.is_none()
    }
}

impl Default for CorrelationContext {
    fn default() -> Self {
        Self::new_root()
    }
}

/// Attach a correlation context to an existing span
pub trait CorrelationExt {
    /// Fill the `rid`, `span_id` and `scope` fields
    ///
    /// Undeclared fields are silently ignored by `tracing`, so the span has
    /// to declare all three as `tracing::field::Empty`.
    fn record_correlation(&self, ctx: &CorrelationContext);
}

impl CorrelationExt for tracing::Span {
    fn record_correlation(&self, ctx: &CorrelationContext) {
        self.record(fields::RID, ctx.rid());
        self.record(fields::SPAN_ID, ctx.span_id_str());
        if let Some(ref scope) = ctx.scope {
            self.record(fields::SCOPE, scope.as_str());
        }
    }
}

/// Span fields filled in by [`CorrelationExt::record_correlation`]
pub mod fields {
    pub const RID: &str = "rid";
    pub const SPAN_ID: &str = "span_id";
    pub const SCOPE: &str = "scope";
}

/// Standard span names
pub mod spans {
    pub const SYNC_CYCLE: &str = "sync_cycle";
    pub const SHARDING_SYNC: &str = "sharding_sync";
    pub const SHARDING_OBJECT: &str = "sharding_object";
    pub const RETIRE_TABLES: &str = "retire_tables";
    pub const INDEX_SYNC: &str = "index_sync";
    pub const RECONCILE_TABLE: &str = "reconcile_table";
}
