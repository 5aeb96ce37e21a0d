//! Execution plan facade.
//!
//! Bundles an operator tree with the resolved result policy and drives
//! it: header, pull-until-full-or-exhausted, close, stats footer.

use std::time::Instant;

use crate::GraphContext;
use crate::error::Result;
use crate::executor::Operator;
use crate::executor::reply::ReplySink;
use crate::executor::resultset::{QueryStats, ResultSet};

/// Result policy resolved by the query front end.
#[derive(Debug, Clone)]
pub struct PlanConfig {
    /// Deduplicate visible rows
    pub distinct: bool,
    /// Rows to drop after dedup
    pub skip: usize,
    /// Rows to emit after skipping (`None` = unlimited)
    pub limit: Option<usize>,
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            distinct: false,
            skip: 0,
            limit: None,
        }
    }
}

impl PlanConfig {
    /// Retention bound for a sort under this policy: limit + skip.
    ///
    /// An unlimited plan has no bound and sorts its whole input.
    pub fn sort_bound(&self) -> Option<usize> {
        self.limit.map(|limit| limit + self.skip)
    }
}

/// A runnable query plan: operator tree, column header, result policy.
#[derive(Debug)]
pub struct ExecutionPlan {
    root: Operator,
    columns: Vec<String>,
    config: PlanConfig,
}

impl ExecutionPlan {
    /// Assemble a plan. `columns` names the visible slots, in slot order.
    pub fn new(root: Operator, columns: Vec<String>, config: PlanConfig) -> Self {
        Self {
            root,
            columns,
            config,
        }
    }

    /// Run the plan to completion, streaming the reply into `sink`.
    ///
    /// Stops pulling as soon as the result set is full, then closes the
    /// operator tree. Zero-input plans still produce the header and the
    /// stats footer.
    pub fn run(&mut self, ctx: &GraphContext, sink: &mut dyn ReplySink) -> Result<QueryStats> {
        let started = Instant::now();
        sink.header(&self.columns);
        let mut results = ResultSet::new(
            self.columns.len(),
            self.config.distinct,
            self.config.skip,
            self.config.limit,
        );
        while !results.is_full() {
            match self.root.next(ctx)? {
                Some(record) => results.add_record(record, ctx, sink)?,
                None => break,
            }
        }
        self.root.close();
        let mut stats = results.into_stats();
        stats.execution_time_ms = started.elapsed().as_secs_f64() * 1000.0;
        tracing::debug!(
            emitted = stats.records_emitted,
            skipped = stats.records_skipped,
            distinct_dropped = stats.distinct_dropped,
            "query plan drained"
        );
        sink.stats(&stats);
        Ok(stats)
    }
}
