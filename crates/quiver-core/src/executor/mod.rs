//! Executor module - pull-based operator runtime
//!
//! Query plans are trees of operators pulled from the top: each call to
//! [`Operator::next`] asks an operator for its next record, which it
//! builds by pulling its own child. The operator set is closed, so the
//! tree is a sum type dispatched by `match`:
//! - `Values` - replayable in-memory record source
//! - `Scan` - node scan (all nodes or one label), seeds entity slots
//! - `Filter` - predicate over records
//! - `Project` - expression evaluation into fresh records
//! - `Sort` - blocking sort, unbounded or top-K bounded
//! - `Aggregate` - grouped accumulation
//!
//! Operators move Created → Open → Exhausted; `reset` rewinds a tree to
//! Created for another run, `close` releases buffered state and is
//! terminal. Both recurse into children, and both are idempotent.

pub mod expr;
pub mod plan;
pub mod record;
pub mod reply;
pub mod resultset;
mod sort;

mod aggregate;

pub use aggregate::{AccumulatorKind, AggregateExpr, AggregateOp, GroupColumn};
pub use expr::{CmpOp, Expression};
pub use plan::{ExecutionPlan, PlanConfig};
pub use record::{Entry, Record};
pub use reply::{JsonCollector, PropertyReply, ReplyCell, ReplySink};
pub use resultset::{QueryStats, ResultSet};
pub use sort::{SortDirection, SortOp};

use crate::GraphContext;
use crate::catalog::LabelId;
use crate::error::Result;
use crate::value::Value;

/// Operator lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpState {
    /// Built (or reset), nothing pulled yet
    Created,
    /// At least one record pulled
    Open,
    /// Own output exhausted; further pulls return `None`
    Exhausted,
    /// Released; buffered state dropped, further pulls return `None`
    Closed,
}

/// A plan operator. The set is closed; dispatch is by `match`.
#[derive(Debug)]
pub enum Operator {
    /// In-memory record source
    Values(ValuesOp),
    /// Node scan
    Scan(ScanOp),
    /// Predicate filter
    Filter(FilterOp),
    /// Projection
    Project(ProjectOp),
    /// Blocking sort
    Sort(SortOp),
    /// Grouped aggregation
    Aggregate(AggregateOp),
}

impl Operator {
    /// Pull the next record, or `None` once exhausted.
    ///
    /// Pulling an exhausted or closed operator keeps returning `None`.
    pub fn next(&mut self, ctx: &GraphContext) -> Result<Option<Record>> {
        match self {
            Operator::Values(op) => op.next(),
            Operator::Scan(op) => op.next(ctx),
            Operator::Filter(op) => op.next(ctx),
            Operator::Project(op) => op.next(ctx),
            Operator::Sort(op) => op.next(ctx),
            Operator::Aggregate(op) => op.next(ctx),
        }
    }

    /// Rewind this subtree to its just-created state, dropping buffers.
    pub fn reset(&mut self) {
        match self {
            Operator::Values(op) => op.reset(),
            Operator::Scan(op) => op.reset(),
            Operator::Filter(op) => op.reset(),
            Operator::Project(op) => op.reset(),
            Operator::Sort(op) => op.reset(),
            Operator::Aggregate(op) => op.reset(),
        }
    }

    /// Release buffered state in this subtree. Idempotent and terminal.
    pub fn close(&mut self) {
        match self {
            Operator::Values(op) => op.close(),
            Operator::Scan(op) => op.close(),
            Operator::Filter(op) => op.close(),
            Operator::Project(op) => op.close(),
            Operator::Sort(op) => op.close(),
            Operator::Aggregate(op) => op.close(),
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> OpState {
        match self {
            Operator::Values(op) => op.state,
            Operator::Scan(op) => op.state,
            Operator::Filter(op) => op.state,
            Operator::Project(op) => op.state,
            Operator::Sort(op) => op.state(),
            Operator::Aggregate(op) => op.state(),
        }
    }
}

/// Replayable source of pre-built records.
///
/// Emits clones so `reset` can replay the same rows; `close` drops them.
#[derive(Debug)]
pub struct ValuesOp {
    rows: Vec<Record>,
    cursor: usize,
    state: OpState,
}

impl ValuesOp {
    /// Create a source over fixed rows
    pub fn new(rows: Vec<Record>) -> Self {
        Self {
            rows,
            cursor: 0,
            state: OpState::Created,
        }
    }

    fn next(&mut self) -> Result<Option<Record>> {
        if matches!(self.state, OpState::Exhausted | OpState::Closed) {
            return Ok(None);
        }
        self.state = OpState::Open;
        match self.rows.get(self.cursor) {
            Some(row) => {
                self.cursor += 1;
                Ok(Some(row.clone()))
            }
            None => {
                self.state = OpState::Exhausted;
                Ok(None)
            }
        }
    }

    fn reset(&mut self) {
        self.cursor = 0;
        self.state = OpState::Created;
    }

    fn close(&mut self) {
        self.rows.clear();
        self.cursor = 0;
        self.state = OpState::Closed;
    }
}

/// Node scan over the whole graph or one label.
///
/// Emits plan-width records with the scanned node seeded into one slot
/// and everything else unset; the projection above fills the rest.
#[derive(Debug)]
pub struct ScanOp {
    width: usize,
    seed_slot: usize,
    label: Option<LabelId>,
    cursor: u64,
    state: OpState,
}

impl ScanOp {
    /// Scan every node
    pub fn all_nodes(width: usize, seed_slot: usize) -> Self {
        Self {
            width,
            seed_slot,
            label: None,
            cursor: 0,
            state: OpState::Created,
        }
    }

    /// Scan nodes carrying one label
    pub fn by_label(width: usize, seed_slot: usize, label: LabelId) -> Self {
        Self {
            width,
            seed_slot,
            label: Some(label),
            cursor: 0,
            state: OpState::Created,
        }
    }

    fn next(&mut self, ctx: &GraphContext) -> Result<Option<Record>> {
        if matches!(self.state, OpState::Exhausted | OpState::Closed) {
            return Ok(None);
        }
        self.state = OpState::Open;
        while self.cursor < ctx.graph.node_count() {
            let id = self.cursor;
            self.cursor += 1;
            if let Some(node) = ctx.graph.node(id) {
                if self.label.is_none_or(|label| node.label_id == label) {
                    let mut record = Record::new(self.width);
                    record.set(self.seed_slot, Entry::Node(id));
                    return Ok(Some(record));
                }
            }
        }
        self.state = OpState::Exhausted;
        Ok(None)
    }

    fn reset(&mut self) {
        self.cursor = 0;
        self.state = OpState::Created;
    }

    fn close(&mut self) {
        self.state = OpState::Closed;
    }
}

/// Predicate filter.
///
/// Passes records whose predicate evaluates to `true`; `false` and null
/// both drop the record.
#[derive(Debug)]
pub struct FilterOp {
    child: Box<Operator>,
    predicate: Expression,
    state: OpState,
}

impl FilterOp {
    /// Filter a child with a predicate expression
    pub fn new(child: Operator, predicate: Expression) -> Self {
        Self {
            child: Box::new(child),
            predicate,
            state: OpState::Created,
        }
    }

    fn next(&mut self, ctx: &GraphContext) -> Result<Option<Record>> {
        if matches!(self.state, OpState::Exhausted | OpState::Closed) {
            return Ok(None);
        }
        self.state = OpState::Open;
        while let Some(record) = self.child.next(ctx)? {
            if self.predicate.evaluate(&record, ctx)? == Value::Bool(true) {
                return Ok(Some(record));
            }
        }
        self.state = OpState::Exhausted;
        Ok(None)
    }

    fn reset(&mut self) {
        self.child.reset();
        self.state = OpState::Created;
    }

    fn close(&mut self) {
        self.child.close();
        self.state = OpState::Closed;
    }
}

/// Projection: evaluates one expression per output slot into a fresh
/// record, then discards the input record.
#[derive(Debug)]
pub struct ProjectOp {
    child: Box<Operator>,
    exprs: Vec<Expression>,
    state: OpState,
}

impl ProjectOp {
    /// Project a child through one expression per output slot
    pub fn new(child: Operator, exprs: Vec<Expression>) -> Self {
        Self {
            child: Box::new(child),
            exprs,
            state: OpState::Created,
        }
    }

    fn next(&mut self, ctx: &GraphContext) -> Result<Option<Record>> {
        if matches!(self.state, OpState::Exhausted | OpState::Closed) {
            return Ok(None);
        }
        self.state = OpState::Open;
        match self.child.next(ctx)? {
            Some(input) => {
                let mut out = Record::new(self.exprs.len());
                for (slot, expr) in self.exprs.iter().enumerate() {
                    out.set(slot, expr.evaluate_entry(&input, ctx)?);
                }
                Ok(Some(out))
            }
            None => {
                self.state = OpState::Exhausted;
                Ok(None)
            }
        }
    }

    fn reset(&mut self) {
        self.child.reset();
        self.state = OpState::Created;
    }

    fn close(&mut self) {
        self.child.close();
        self.state = OpState::Closed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scalar_row(values: &[i64]) -> Record {
        let mut r = Record::new(values.len());
        for (i, v) in values.iter().enumerate() {
            r.set(i, Entry::Scalar(Value::Int(*v)));
        }
        r
    }

    #[test]
    fn test_values_replay_after_reset() -> Result<()> {
        let ctx = GraphContext::new();
        let mut op = Operator::Values(ValuesOp::new(vec![scalar_row(&[1]), scalar_row(&[2])]));
        assert_eq!(op.state(), OpState::Created);

        let mut first_run = Vec::new();
        while let Some(r) = op.next(&ctx)? {
            first_run.push(r);
        }
        assert_eq!(first_run.len(), 2);
        assert_eq!(op.state(), OpState::Exhausted);
        assert!(op.next(&ctx)?.is_none(), "exhaustion must be idempotent");

        op.reset();
        assert_eq!(op.state(), OpState::Created);
        let mut second_run = Vec::new();
        while let Some(r) = op.next(&ctx)? {
            second_run.push(r);
        }
        assert_eq!(first_run, second_run);
        Ok(())
    }

    #[test]
    fn test_close_is_idempotent_and_terminal() -> Result<()> {
        let ctx = GraphContext::new();
        let mut op = Operator::Values(ValuesOp::new(vec![scalar_row(&[1])]));
        op.close();
        op.close();
        assert_eq!(op.state(), OpState::Closed);
        assert!(op.next(&ctx)?.is_none());
        Ok(())
    }

    #[test]
    fn test_scan_by_label() -> Result<()> {
        let mut ctx = GraphContext::new();
        ctx.add_node("Person", &[])?;
        ctx.add_node("City", &[])?;
        ctx.add_node("Person", &[])?;
        let person = ctx.catalog.get_label_id("Person").unwrap();

        let mut op = Operator::Scan(ScanOp::by_label(1, 0, person));
        let mut seen = Vec::new();
        while let Some(r) = op.next(&ctx)? {
            match r.get(0) {
                Entry::Node(id) => seen.push(*id),
                other => panic!("scan seeded {other:?}"),
            }
        }
        assert_eq!(seen, vec![0, 2], "label scan yields ids in id order");
        Ok(())
    }

    #[test]
    fn test_filter_drops_false_and_null() -> Result<()> {
        let ctx = GraphContext::new();
        let rows = vec![scalar_row(&[1]), scalar_row(&[5]), scalar_row(&[3])];
        let predicate = Expression::compare(
            Expression::Slot(0),
            CmpOp::Gt,
            Expression::Constant(Value::Int(2)),
        );
        let mut op = Operator::Filter(FilterOp::new(
            Operator::Values(ValuesOp::new(rows)),
            predicate,
        ));
        let mut kept = Vec::new();
        while let Some(r) = op.next(&ctx)? {
            kept.push(r.scalar(0).cloned().unwrap());
        }
        assert_eq!(kept, vec![Value::Int(5), Value::Int(3)]);

        // Null predicate results drop the record rather than passing it.
        let rows = vec![scalar_row(&[1])];
        let null_pred = Expression::compare(
            Expression::Constant(Value::Null),
            CmpOp::Eq,
            Expression::Slot(0),
        );
        let mut op = Operator::Filter(FilterOp::new(
            Operator::Values(ValuesOp::new(rows)),
            null_pred,
        ));
        assert!(op.next(&ctx)?.is_none());
        Ok(())
    }

    #[test]
    fn test_project_builds_fresh_width() -> Result<()> {
        let mut ctx = GraphContext::new();
        let id = ctx.add_node("Person", &[("age", Value::Int(41))])?;
        let mut seeded = Record::new(2);
        seeded.set(0, Entry::Node(id));

        let mut op = Operator::Project(ProjectOp::new(
            Operator::Values(ValuesOp::new(vec![seeded])),
            vec![Expression::property(0, "age"), Expression::Slot(0)],
        ));
        let out = op.next(&ctx)?.unwrap();
        assert_eq!(out.width(), 2);
        assert_eq!(out.scalar(0), Some(&Value::Int(41)));
        assert_eq!(out.get(1), &Entry::Node(id));
        Ok(())
    }

    #[test]
    fn test_reset_recurses_through_filter() -> Result<()> {
        let ctx = GraphContext::new();
        let rows = vec![scalar_row(&[4]), scalar_row(&[9])];
        let predicate = Expression::compare(
            Expression::Slot(0),
            CmpOp::Gt,
            Expression::Constant(Value::Int(0)),
        );
        let mut op = Operator::Filter(FilterOp::new(
            Operator::Values(ValuesOp::new(rows)),
            predicate,
        ));
        let mut count = 0;
        while op.next(&ctx)?.is_some() {
            count += 1;
        }
        op.reset();
        while op.next(&ctx)?.is_some() {
            count += 1;
        }
        assert_eq!(count, 4, "reset must rewind the whole subtree");
        Ok(())
    }
}
