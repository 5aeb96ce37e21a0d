//! Expression evaluation against records.
//!
//! A deliberately small language: constants, slot references, property
//! access off entity slots and three-way comparisons. It is what scans,
//! filters, projections and aggregate arguments evaluate; parsing a query
//! into these trees happens upstream of this crate.

use std::cmp::Ordering;

use crate::GraphContext;
use crate::error::{Error, Result};
use crate::executor::record::{Entry, Record};
use crate::value::Value;

/// Comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    /// Equal
    Eq,
    /// Not equal
    Ne,
    /// Less than
    Lt,
    /// Less than or equal
    Le,
    /// Greater than
    Gt,
    /// Greater than or equal
    Ge,
}

/// Expression tree evaluated against a record and the graph context.
#[derive(Debug, Clone)]
pub enum Expression {
    /// Literal value
    Constant(Value),
    /// Pass a slot's entry through (entity or scalar)
    Slot(usize),
    /// Property of the entity held in a slot, by key name
    Property {
        /// Slot holding the entity
        slot: usize,
        /// Property key name, resolved through the catalog
        key: String,
    },
    /// Three-way comparison evaluating to a boolean (or null)
    Comparison {
        /// Left operand
        lhs: Box<Expression>,
        /// Operator
        op: CmpOp,
        /// Right operand
        rhs: Box<Expression>,
    },
}

impl Expression {
    /// Property-access constructor
    pub fn property(slot: usize, key: impl Into<String>) -> Self {
        Expression::Property {
            slot,
            key: key.into(),
        }
    }

    /// Comparison constructor
    pub fn compare(lhs: Expression, op: CmpOp, rhs: Expression) -> Self {
        Expression::Comparison {
            lhs: Box::new(lhs),
            op,
            rhs: Box::new(rhs),
        }
    }

    /// Evaluate to a scalar value.
    ///
    /// A slot reference that lands on an entity entry is an executor error
    /// here; use [`Expression::evaluate_entry`] where entities may flow
    /// (projection of a returned alias, group keys).
    pub fn evaluate(&self, record: &Record, ctx: &GraphContext) -> Result<Value> {
        match self.evaluate_entry(record, ctx)? {
            Entry::Scalar(v) => Ok(v),
            Entry::Unset => Ok(Value::Null),
            Entry::Node(id) => Err(Error::executor(format!(
                "expected a scalar, found node {id}"
            ))),
            Entry::Relationship(id) => Err(Error::executor(format!(
                "expected a scalar, found relationship {id}"
            ))),
        }
    }

    /// Evaluate to a record entry, letting entity references pass through.
    pub fn evaluate_entry(&self, record: &Record, ctx: &GraphContext) -> Result<Entry> {
        match self {
            Expression::Constant(v) => Ok(Entry::Scalar(v.clone())),
            Expression::Slot(slot) => Ok(record.get(*slot).clone()),
            Expression::Property { slot, key } => {
                Ok(Entry::Scalar(resolve_property(record, *slot, key, ctx)))
            }
            Expression::Comparison { lhs, op, rhs } => {
                let left = lhs.evaluate(record, ctx)?;
                let right = rhs.evaluate(record, ctx)?;
                Ok(Entry::Scalar(compare_values(&left, *op, &right)))
            }
        }
    }
}

/// Property lookup off whatever entity a slot holds.
///
/// Missing key, unknown key name and non-entity slots all resolve to null
/// rather than erroring; filters treat null as a non-match.
fn resolve_property(record: &Record, slot: usize, key: &str, ctx: &GraphContext) -> Value {
    let Some(key_id) = ctx.catalog.get_key_id(key) else {
        return Value::Null;
    };
    match record.get(slot) {
        Entry::Node(id) => ctx
            .graph
            .node(*id)
            .and_then(|n| n.property(key_id))
            .cloned()
            .unwrap_or(Value::Null),
        Entry::Relationship(id) => ctx
            .graph
            .relationship(*id)
            .and_then(|r| r.property(key_id))
            .cloned()
            .unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

/// Comparison semantics: null operands propagate null; values from
/// different domains are never ordered (equality is false, inequality
/// true, range comparisons false); same-domain values use the total
/// order, so `Int(3)` equals `Float(3.0)`.
fn compare_values(left: &Value, op: CmpOp, right: &Value) -> Value {
    if left.is_null() || right.is_null() {
        return Value::Null;
    }
    if !left.same_domain(right) {
        return Value::Bool(matches!(op, CmpOp::Ne));
    }
    let ord = left.order(right);
    let outcome = match op {
        CmpOp::Eq => ord == Ordering::Equal,
        CmpOp::Ne => ord != Ordering::Equal,
        CmpOp::Lt => ord == Ordering::Less,
        CmpOp::Le => ord != Ordering::Greater,
        CmpOp::Gt => ord == Ordering::Greater,
        CmpOp::Ge => ord != Ordering::Less,
    };
    Value::Bool(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context_with_node() -> (GraphContext, Record) {
        let mut ctx = GraphContext::new();
        let id = ctx
            .add_node("Person", &[("name", Value::from("Ada")), ("age", Value::Int(36))])
            .unwrap();
        let mut record = Record::new(2);
        record.set(0, Entry::Node(id));
        (ctx, record)
    }

    #[test]
    fn test_property_resolution() {
        let (ctx, record) = context_with_node();
        let name = Expression::property(0, "name").evaluate(&record, &ctx).unwrap();
        assert_eq!(name, Value::String("Ada".into()));

        let missing = Expression::property(0, "height").evaluate(&record, &ctx).unwrap();
        assert_eq!(missing, Value::Null);

        // Property off a non-entity slot is null, not an error.
        let off_unset = Expression::property(1, "name").evaluate(&record, &ctx).unwrap();
        assert_eq!(off_unset, Value::Null);
    }

    #[test]
    fn test_slot_passthrough_keeps_entities() {
        let (ctx, record) = context_with_node();
        let entry = Expression::Slot(0).evaluate_entry(&record, &ctx).unwrap();
        assert!(matches!(entry, Entry::Node(_)));
        assert!(Expression::Slot(0).evaluate(&record, &ctx).is_err());
    }

    #[test]
    fn test_comparison_null_propagation() {
        let (ctx, record) = context_with_node();
        let cmp = Expression::compare(
            Expression::Constant(Value::Null),
            CmpOp::Eq,
            Expression::Constant(Value::Int(1)),
        );
        assert_eq!(cmp.evaluate(&record, &ctx).unwrap(), Value::Null);
    }

    #[test]
    fn test_comparison_cross_domain() {
        let (ctx, record) = context_with_node();
        let eq = Expression::compare(
            Expression::Constant(Value::Int(1)),
            CmpOp::Eq,
            Expression::Constant(Value::from("1")),
        );
        assert_eq!(eq.evaluate(&record, &ctx).unwrap(), Value::Bool(false));
        let ne = Expression::compare(
            Expression::Constant(Value::Int(1)),
            CmpOp::Ne,
            Expression::Constant(Value::from("1")),
        );
        assert_eq!(ne.evaluate(&record, &ctx).unwrap(), Value::Bool(true));
        let lt = Expression::compare(
            Expression::Constant(Value::Int(1)),
            CmpOp::Lt,
            Expression::Constant(Value::from("1")),
        );
        assert_eq!(lt.evaluate(&record, &ctx).unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_comparison_numeric_promotion() {
        let (ctx, record) = context_with_node();
        let eq = Expression::compare(
            Expression::property(0, "age"),
            CmpOp::Eq,
            Expression::Constant(Value::Float(36.0)),
        );
        assert_eq!(eq.evaluate(&record, &ctx).unwrap(), Value::Bool(true));
        let ge = Expression::compare(
            Expression::property(0, "age"),
            CmpOp::Ge,
            Expression::Constant(Value::Int(40)),
        );
        assert_eq!(ge.evaluate(&record, &ctx).unwrap(), Value::Bool(false));
    }
}
