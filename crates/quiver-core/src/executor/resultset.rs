//! Result assembly: dedup, pagination, emission and statistics.
//!
//! Policy order per record is fixed: DISTINCT first (duplicates never
//! consume skip or limit budget), then SKIP, then LIMIT. The driver
//! checks [`ResultSet::is_full`] before every pull so a limited query
//! never pulls more than it needs from the plan.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::GraphContext;
use crate::catalog::KeyId;
use crate::error::{Error, Result};
use crate::executor::record::{Entry, Record};
use crate::executor::reply::{PropertyReply, ReplyCell, ReplySink};
use crate::value::Value;

/// Counters reported in every reply footer.
///
/// The mutation counters stay at zero for read plans; the bulk loader
/// and future write operators fill them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryStats {
    /// Rows emitted to the sink
    pub records_emitted: u64,
    /// Rows dropped by SKIP
    pub records_skipped: u64,
    /// Rows dropped by DISTINCT
    pub distinct_dropped: u64,
    /// Nodes created
    pub nodes_created: u64,
    /// Relationships created
    pub relationships_created: u64,
    /// Properties set
    pub properties_set: u64,
    /// Labels added
    pub labels_added: u64,
    /// Wall-clock execution time in milliseconds
    pub execution_time_ms: f64,
}

/// Applies the result policy chain and emits accepted rows to a sink.
#[derive(Debug)]
pub struct ResultSet {
    /// Number of visible slots (R); trailing order-by slots are not emitted
    visible: usize,
    distinct: bool,
    seen: HashSet<Vec<u8>>,
    skip: usize,
    limit: Option<usize>,
    accepted: u64,
    skipped: u64,
    distinct_dropped: u64,
}

impl ResultSet {
    /// Create a result set over `visible` projection slots
    pub fn new(visible: usize, distinct: bool, skip: usize, limit: Option<usize>) -> Self {
        Self {
            visible,
            distinct,
            seen: HashSet::new(),
            skip,
            limit,
            accepted: 0,
            skipped: 0,
            distinct_dropped: 0,
        }
    }

    /// True once LIMIT accepted records have been emitted.
    ///
    /// The driver must check this before pulling the plan again.
    pub fn is_full(&self) -> bool {
        self.limit.is_some_and(|limit| self.accepted >= limit as u64)
    }

    /// Run one record through distinct / skip / limit, emitting it to the
    /// sink if it survives. The record is consumed either way.
    pub fn add_record(
        &mut self,
        record: Record,
        ctx: &GraphContext,
        sink: &mut dyn ReplySink,
    ) -> Result<()> {
        if self.distinct {
            let mut image = Vec::new();
            for slot in 0..self.visible {
                record.get(slot).write_key_bytes(&mut image);
            }
            if !self.seen.insert(image) {
                self.distinct_dropped += 1;
                return Ok(());
            }
        }
        if self.skipped < self.skip as u64 {
            self.skipped += 1;
            return Ok(());
        }
        if self.is_full() {
            return Ok(());
        }
        let cells = self.resolve_row(&record, ctx)?;
        sink.row(cells);
        self.accepted += 1;
        Ok(())
    }

    fn resolve_row(&self, record: &Record, ctx: &GraphContext) -> Result<Vec<ReplyCell>> {
        (0..self.visible)
            .map(|slot| resolve_cell(record, slot, ctx))
            .collect()
    }

    /// Fold the counters into a stats footer
    pub fn into_stats(self) -> QueryStats {
        QueryStats {
            records_emitted: self.accepted,
            records_skipped: self.skipped,
            distinct_dropped: self.distinct_dropped,
            ..QueryStats::default()
        }
    }
}

fn resolve_properties(
    properties: &[(KeyId, Value)],
    ctx: &GraphContext,
) -> Result<Vec<PropertyReply>> {
    properties
        .iter()
        .map(|(key, value)| {
            let name = ctx
                .catalog
                .get_key_name(*key)
                .ok_or_else(|| Error::internal(format!("unknown property key id {key}")))?;
            Ok(PropertyReply {
                name: name.to_string(),
                value: value.clone(),
                type_tag: value.type_name(),
            })
        })
        .collect()
}

fn resolve_cell(record: &Record, slot: usize, ctx: &GraphContext) -> Result<ReplyCell> {
    match record.get(slot) {
        Entry::Scalar(value) => Ok(ReplyCell::Scalar {
            value: value.clone(),
            type_tag: value.type_name(),
        }),
        Entry::Node(id) => {
            let node = ctx
                .graph
                .node(*id)
                .ok_or_else(|| Error::internal(format!("record references unknown node {id}")))?;
            let label = ctx
                .catalog
                .get_label_name(node.label_id)
                .ok_or_else(|| Error::internal(format!("unknown label id {}", node.label_id)))?;
            Ok(ReplyCell::Node {
                id: *id,
                labels: vec![label.to_string()],
                properties: resolve_properties(node.properties(), ctx)?,
            })
        }
        Entry::Relationship(id) => {
            let rel = ctx.graph.relationship(*id).ok_or_else(|| {
                Error::internal(format!("record references unknown relationship {id}"))
            })?;
            let relation_type = ctx
                .catalog
                .get_type_name(rel.type_id)
                .ok_or_else(|| Error::internal(format!("unknown type id {}", rel.type_id)))?;
            Ok(ReplyCell::Relation {
                id: *id,
                relation_type: relation_type.to_string(),
                src_node: rel.src_id,
                dest_node: rel.dst_id,
                properties: resolve_properties(rel.properties(), ctx)?,
            })
        }
        // The projection always writes visible slots; an unset one is a
        // planner bug, not input data.
        Entry::Unset => panic!("visible slot {slot} is unset"),
    }
}
