//! Grouped aggregation operator and its accumulators.
//!
//! Groups are keyed by the byte image of their evaluated key entries, so
//! two records land in the same bucket iff every key entry matches
//! exactly. Key entries are owned by the group (deep copies of scalars,
//! stable handles for entities); accumulators keep their own running
//! state and finalize without mutating it, so finalizing twice yields
//! the same value.

use std::collections::HashMap;

use crate::GraphContext;
use crate::error::Result;
use crate::executor::expr::Expression;
use crate::executor::record::{Entry, Record};
use crate::executor::{OpState, Operator};
use crate::value::Value;

/// Aggregation function selector
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AccumulatorKind {
    /// Count of non-null arguments
    Count,
    /// Numeric sum (0.0 over empty input)
    Sum,
    /// Numeric mean (null over empty input)
    Avg,
    /// Smallest argument under the value order
    Min,
    /// Largest argument under the value order
    Max,
    /// Discrete percentile of the numeric arguments
    PercentileDisc(f64),
    /// Continuous (interpolated) percentile of the numeric arguments
    PercentileCont(f64),
    /// Sample standard deviation (n-1 denominator)
    StDev,
}

impl AccumulatorKind {
    fn accumulator(&self) -> Accumulator {
        match self {
            AccumulatorKind::Count => Accumulator::Count { count: 0 },
            AccumulatorKind::Sum => Accumulator::Sum { sum: 0.0 },
            AccumulatorKind::Avg => Accumulator::Avg { sum: 0.0, count: 0 },
            AccumulatorKind::Min => Accumulator::Min { best: None },
            AccumulatorKind::Max => Accumulator::Max { best: None },
            AccumulatorKind::PercentileDisc(f) => Accumulator::Percentile {
                values: Vec::new(),
                fraction: *f,
                continuous: false,
            },
            AccumulatorKind::PercentileCont(f) => Accumulator::Percentile {
                values: Vec::new(),
                fraction: *f,
                continuous: true,
            },
            AccumulatorKind::StDev => Accumulator::StDev {
                count: 0,
                mean: 0.0,
                m2: 0.0,
            },
        }
    }
}

/// Running state of one aggregation inside one group.
///
/// Null arguments are skipped everywhere; `Count` counts the non-null
/// ones. Numeric accumulators also skip non-numeric arguments.
#[derive(Debug, Clone)]
enum Accumulator {
    Count { count: i64 },
    Sum { sum: f64 },
    Avg { sum: f64, count: u64 },
    Min { best: Option<Value> },
    Max { best: Option<Value> },
    Percentile { values: Vec<f64>, fraction: f64, continuous: bool },
    StDev { count: u64, mean: f64, m2: f64 },
}

impl Accumulator {
    fn step(&mut self, value: Value) {
        if value.is_null() {
            return;
        }
        match self {
            Accumulator::Count { count } => *count += 1,
            Accumulator::Sum { sum } => {
                if let Some(n) = value.as_numeric() {
                    *sum += n;
                }
            }
            Accumulator::Avg { sum, count } => {
                if let Some(n) = value.as_numeric() {
                    *sum += n;
                    *count += 1;
                }
            }
            Accumulator::Min { best } => {
                let replace = match best {
                    Some(current) => value.order(current).is_lt(),
                    None => true,
                };
                if replace {
                    *best = Some(value);
                }
            }
            Accumulator::Max { best } => {
                let replace = match best {
                    Some(current) => value.order(current).is_gt(),
                    None => true,
                };
                if replace {
                    *best = Some(value);
                }
            }
            Accumulator::Percentile { values, .. } => {
                if let Some(n) = value.as_numeric() {
                    values.push(n);
                }
            }
            Accumulator::StDev { count, mean, m2 } => {
                if let Some(n) = value.as_numeric() {
                    // Welford's online update.
                    *count += 1;
                    let delta = n - *mean;
                    *mean += delta / *count as f64;
                    *m2 += delta * (n - *mean);
                }
            }
        }
    }

    fn finalize(&self) -> Value {
        match self {
            Accumulator::Count { count } => Value::Int(*count),
            Accumulator::Sum { sum } => Value::Float(*sum),
            Accumulator::Avg { sum, count } => {
                if *count == 0 {
                    Value::Null
                } else {
                    Value::Float(sum / *count as f64)
                }
            }
            Accumulator::Min { best } | Accumulator::Max { best } => {
                best.clone().unwrap_or(Value::Null)
            }
            Accumulator::Percentile {
                values,
                fraction,
                continuous,
            } => percentile(values, *fraction, *continuous),
            Accumulator::StDev { count, m2, .. } => match count {
                0 => Value::Null,
                1 => Value::Float(0.0),
                n => Value::Float((m2 / (*n - 1) as f64).sqrt()),
            },
        }
    }
}

fn percentile(values: &[f64], fraction: f64, continuous: bool) -> Value {
    if values.is_empty() {
        return Value::Null;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    if continuous {
        let pos = fraction.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
        let lo = pos.floor() as usize;
        let hi = pos.ceil() as usize;
        if lo == hi {
            Value::Float(sorted[lo])
        } else {
            let weight = pos - lo as f64;
            Value::Float(sorted[lo] * (1.0 - weight) + sorted[hi] * weight)
        }
    } else {
        let rank = (fraction.clamp(0.0, 1.0) * sorted.len() as f64).ceil() as usize;
        Value::Float(sorted[rank.saturating_sub(1).min(sorted.len() - 1)])
    }
}

/// One aggregation: the function plus its argument expression.
#[derive(Debug, Clone)]
pub struct AggregateExpr {
    /// Function to apply
    pub kind: AccumulatorKind,
    /// Argument evaluated once per input record
    pub arg: Expression,
}

impl AggregateExpr {
    /// Pair a function with its argument expression
    pub fn new(kind: AccumulatorKind, arg: Expression) -> Self {
        Self { kind, arg }
    }
}

/// Source of one output slot of the aggregation.
#[derive(Debug, Clone, Copy)]
pub enum GroupColumn {
    /// The i-th group key entry
    Key(usize),
    /// The j-th aggregate's finalized value
    Aggregate(usize),
}

/// One bucket: owned key entries plus accumulator states.
#[derive(Debug)]
struct Group {
    keys: Vec<Entry>,
    accumulators: Vec<Accumulator>,
}

impl Group {
    fn new(keys: Vec<Entry>, aggregates: &[AggregateExpr]) -> Self {
        Self {
            keys,
            accumulators: aggregates.iter().map(|a| a.kind.accumulator()).collect(),
        }
    }
}

/// Grouped aggregation operator.
///
/// Blocking: the first pull drains the child into buckets, then groups
/// drain one per pull in unspecified order (a sort above provides order
/// when the plan needs one). Every output slot is filled from the group,
/// per the configured projection.
#[derive(Debug)]
pub struct AggregateOp {
    child: Box<Operator>,
    key_exprs: Vec<Expression>,
    aggregates: Vec<AggregateExpr>,
    projection: Vec<GroupColumn>,
    groups: HashMap<Vec<u8>, Group>,
    ready: Vec<Group>,
    state: OpState,
}

impl AggregateOp {
    /// Create an aggregation.
    ///
    /// `projection` maps every output slot (visible and order-by alike)
    /// to a key index or an aggregate index.
    pub fn new(
        child: Operator,
        key_exprs: Vec<Expression>,
        aggregates: Vec<AggregateExpr>,
        projection: Vec<GroupColumn>,
    ) -> Self {
        Self {
            child: Box::new(child),
            key_exprs,
            aggregates,
            projection,
            groups: HashMap::new(),
            ready: Vec::new(),
            state: OpState::Created,
        }
    }

    pub(crate) fn state(&self) -> OpState {
        self.state
    }

    fn build(&mut self, ctx: &GraphContext) -> Result<()> {
        while let Some(record) = self.child.next(ctx)? {
            let mut keys = Vec::with_capacity(self.key_exprs.len());
            for expr in &self.key_exprs {
                keys.push(expr.evaluate_entry(&record, ctx)?);
            }
            let mut key_image = Vec::new();
            for key in &keys {
                key.write_key_bytes(&mut key_image);
            }
            let group = self
                .groups
                .entry(key_image)
                .or_insert_with(|| Group::new(keys, &self.aggregates));
            for (i, aggregate) in self.aggregates.iter().enumerate() {
                let value = aggregate.arg.evaluate(&record, ctx)?;
                group.accumulators[i].step(value);
            }
        }
        self.ready = self.groups.drain().map(|(_, group)| group).collect();
        // With no keys there is always exactly one group, even over
        // empty input: count() = 0 and friends.
        if self.ready.is_empty() && self.key_exprs.is_empty() {
            self.ready.push(Group::new(Vec::new(), &self.aggregates));
        }
        Ok(())
    }

    fn emit(&self, group: &Group) -> Record {
        let mut out = Record::new(self.projection.len());
        for (slot, column) in self.projection.iter().enumerate() {
            match column {
                GroupColumn::Key(i) => out.set(slot, group.keys[*i].clone()),
                GroupColumn::Aggregate(j) => {
                    out.set(slot, Entry::Scalar(group.accumulators[*j].finalize()));
                }
            }
        }
        out
    }

    pub(crate) fn next(&mut self, ctx: &GraphContext) -> Result<Option<Record>> {
        match self.state {
            OpState::Exhausted | OpState::Closed => return Ok(None),
            OpState::Created => {
                self.state = OpState::Open;
                self.build(ctx)?;
            }
            OpState::Open => {}
        }
        match self.ready.pop() {
            Some(group) => Ok(Some(self.emit(&group))),
            None => {
                self.state = OpState::Exhausted;
                Ok(None)
            }
        }
    }

    pub(crate) fn reset(&mut self) {
        self.child.reset();
        self.groups.clear();
        self.ready.clear();
        self.state = OpState::Created;
    }

    pub(crate) fn close(&mut self) {
        self.child.close();
        self.groups.clear();
        self.ready.clear();
        self.state = OpState::Closed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::ValuesOp;

    fn step_all(kind: AccumulatorKind, values: &[Value]) -> Accumulator {
        let mut acc = kind.accumulator();
        for v in values {
            acc.step(v.clone());
        }
        acc
    }

    #[test]
    fn test_count_skips_nulls() {
        let acc = step_all(
            AccumulatorKind::Count,
            &[Value::Int(1), Value::Null, Value::from("x")],
        );
        assert_eq!(acc.finalize(), Value::Int(2));
    }

    #[test]
    fn test_sum_avg_over_mixed_numerics() {
        let values = [Value::Int(2), Value::Float(4.0), Value::Null];
        assert_eq!(
            step_all(AccumulatorKind::Sum, &values).finalize(),
            Value::Float(6.0)
        );
        assert_eq!(
            step_all(AccumulatorKind::Avg, &values).finalize(),
            Value::Float(3.0)
        );
    }

    #[test]
    fn test_empty_input_finalizes() {
        assert_eq!(step_all(AccumulatorKind::Count, &[]).finalize(), Value::Int(0));
        assert_eq!(
            step_all(AccumulatorKind::Sum, &[]).finalize(),
            Value::Float(0.0)
        );
        assert_eq!(step_all(AccumulatorKind::Avg, &[]).finalize(), Value::Null);
        assert_eq!(step_all(AccumulatorKind::Min, &[]).finalize(), Value::Null);
        assert_eq!(step_all(AccumulatorKind::StDev, &[]).finalize(), Value::Null);
    }

    #[test]
    fn test_min_max_use_value_order() {
        let values = [Value::Int(3), Value::Float(2.5), Value::Int(9)];
        assert_eq!(
            step_all(AccumulatorKind::Min, &values).finalize(),
            Value::Float(2.5)
        );
        assert_eq!(
            step_all(AccumulatorKind::Max, &values).finalize(),
            Value::Int(9)
        );
    }

    #[test]
    fn test_stdev_sample() {
        let values: Vec<Value> = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]
            .iter()
            .map(|f| Value::Float(*f))
            .collect();
        let result = step_all(AccumulatorKind::StDev, &values).finalize();
        match result {
            // Sample stdev of this classic set is sqrt(32/7).
            Value::Float(s) => assert!((s - (32.0f64 / 7.0).sqrt()).abs() < 1e-12),
            other => panic!("stdev produced {other:?}"),
        }
        assert_eq!(
            step_all(AccumulatorKind::StDev, &[Value::Int(5)]).finalize(),
            Value::Float(0.0)
        );
    }

    #[test]
    fn test_percentiles() {
        let values: Vec<Value> = (1..=4).map(Value::Int).collect();
        assert_eq!(
            step_all(AccumulatorKind::PercentileDisc(0.5), &values).finalize(),
            Value::Float(2.0)
        );
        assert_eq!(
            step_all(AccumulatorKind::PercentileCont(0.5), &values).finalize(),
            Value::Float(2.5)
        );
        assert_eq!(
            step_all(AccumulatorKind::PercentileDisc(1.0), &values).finalize(),
            Value::Float(4.0)
        );
        assert_eq!(
            step_all(AccumulatorKind::PercentileCont(0.0), &values).finalize(),
            Value::Float(1.0)
        );
    }

    #[test]
    fn test_finalize_is_idempotent() {
        let acc = step_all(AccumulatorKind::Avg, &[Value::Int(1), Value::Int(2)]);
        let first = acc.finalize();
        let second = acc.finalize();
        assert_eq!(first, second);
        assert_eq!(first, Value::Float(1.5));
    }

    fn keyed_row(key: &str, n: i64) -> Record {
        let mut r = Record::new(2);
        r.set(0, Entry::Scalar(Value::from(key)));
        r.set(1, Entry::Scalar(Value::Int(n)));
        r
    }

    #[test]
    fn test_grouping_by_key() -> Result<()> {
        let ctx = GraphContext::new();
        let rows = vec![keyed_row("a", 1), keyed_row("b", 10), keyed_row("a", 3)];
        let mut op = AggregateOp::new(
            Operator::Values(ValuesOp::new(rows)),
            vec![Expression::Slot(0)],
            vec![
                AggregateExpr::new(AccumulatorKind::Count, Expression::Slot(1)),
                AggregateExpr::new(AccumulatorKind::Sum, Expression::Slot(1)),
            ],
            vec![
                GroupColumn::Key(0),
                GroupColumn::Aggregate(0),
                GroupColumn::Aggregate(1),
            ],
        );

        let mut by_key = HashMap::new();
        while let Some(r) = op.next(&ctx)? {
            let key = match r.scalar(0) {
                Some(Value::String(s)) => s.clone(),
                other => panic!("group key {other:?}"),
            };
            by_key.insert(key, (r.scalar(1).cloned(), r.scalar(2).cloned()));
        }
        assert_eq!(by_key.len(), 2);
        assert_eq!(
            by_key["a"],
            (Some(Value::Int(2)), Some(Value::Float(4.0)))
        );
        assert_eq!(
            by_key["b"],
            (Some(Value::Int(1)), Some(Value::Float(10.0)))
        );
        Ok(())
    }

    #[test]
    fn test_keyless_aggregation_over_empty_input() -> Result<()> {
        let ctx = GraphContext::new();
        let mut op = AggregateOp::new(
            Operator::Values(ValuesOp::new(Vec::new())),
            Vec::new(),
            vec![AggregateExpr::new(AccumulatorKind::Count, Expression::Slot(0))],
            vec![GroupColumn::Aggregate(0)],
        );
        let row = op.next(&ctx)?.expect("keyless aggregate emits one group");
        assert_eq!(row.scalar(0), Some(&Value::Int(0)));
        assert!(op.next(&ctx)?.is_none());
        Ok(())
    }

    #[test]
    fn test_keyed_aggregation_over_empty_input_is_empty() -> Result<()> {
        let ctx = GraphContext::new();
        let mut op = AggregateOp::new(
            Operator::Values(ValuesOp::new(Vec::new())),
            vec![Expression::Slot(0)],
            vec![AggregateExpr::new(AccumulatorKind::Count, Expression::Slot(0))],
            vec![GroupColumn::Key(0), GroupColumn::Aggregate(0)],
        );
        assert!(op.next(&ctx)?.is_none());
        Ok(())
    }
}
