//! Reply shapes handed to the embedding layer.
//!
//! The result assembler resolves each visible record slot into a
//! [`ReplyCell`] and streams rows into a [`ReplySink`]; what bytes those
//! become on a wire is the embedder's business. [`JsonCollector`] is the
//! built-in sink, rendering rows as JSON values.

use serde_json::json;

use crate::executor::resultset::QueryStats;
use crate::storage::{NodeId, RelId};
use crate::value::Value;

/// One emitted property: name, value and the value's type tag.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyReply {
    /// Property key name
    pub name: String,
    /// Property value
    pub value: Value,
    /// Type tag of the value (`"string"`, `"integer"`, ...)
    pub type_tag: &'static str,
}

/// One emitted cell of a result row.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyCell {
    /// Scalar projection
    Scalar {
        /// The value
        value: Value,
        /// Type tag of the value
        type_tag: &'static str,
    },
    /// Node projection
    Node {
        /// Node id
        id: NodeId,
        /// Labels on the node (single-label engine: one entry)
        labels: Vec<String>,
        /// Properties in storage order
        properties: Vec<PropertyReply>,
    },
    /// Relationship projection
    Relation {
        /// Relationship id
        id: RelId,
        /// Relationship type name
        relation_type: String,
        /// Source node id
        src_node: NodeId,
        /// Destination node id
        dest_node: NodeId,
        /// Properties in storage order
        properties: Vec<PropertyReply>,
    },
}

/// Receiver for a query's reply stream: one header, then rows, then the
/// statistics footer. Implementations decide the encoding.
pub trait ReplySink {
    /// Column names, sent once before any row (also for empty results)
    fn header(&mut self, columns: &[String]);
    /// One accepted result row
    fn row(&mut self, cells: Vec<ReplyCell>);
    /// Statistics footer, sent once after the last row
    fn stats(&mut self, stats: &QueryStats);
}

/// Sink collecting the reply as JSON values, one per row.
#[derive(Debug, Default)]
pub struct JsonCollector {
    /// Header column names
    pub columns: Vec<String>,
    /// Rendered rows
    pub rows: Vec<serde_json::Value>,
    /// Statistics footer, present after a completed run
    pub stats: Option<QueryStats>,
}

impl JsonCollector {
    /// Create an empty collector
    pub fn new() -> Self {
        Self::default()
    }
}

fn render_properties(properties: &[PropertyReply]) -> serde_json::Value {
    serde_json::Value::Array(
        properties
            .iter()
            .map(|p| {
                json!({
                    "name": p.name,
                    "value": p.value.to_json(),
                    "type": p.type_tag,
                })
            })
            .collect(),
    )
}

fn render_cell(cell: &ReplyCell) -> serde_json::Value {
    match cell {
        ReplyCell::Scalar { value, type_tag } => json!({
            "value": value.to_json(),
            "type": type_tag,
        }),
        ReplyCell::Node {
            id,
            labels,
            properties,
        } => json!({
            "type": "node",
            "id": id,
            "labels": labels,
            "properties": render_properties(properties),
        }),
        ReplyCell::Relation {
            id,
            relation_type,
            src_node,
            dest_node,
            properties,
        } => json!({
            "type": "relation",
            "id": id,
            "relation_type": relation_type,
            "src_node": src_node,
            "dest_node": dest_node,
            "properties": render_properties(properties),
        }),
    }
}

impl ReplySink for JsonCollector {
    fn header(&mut self, columns: &[String]) {
        self.columns = columns.to_vec();
    }

    fn row(&mut self, cells: Vec<ReplyCell>) {
        self.rows
            .push(serde_json::Value::Array(cells.iter().map(render_cell).collect()));
    }

    fn stats(&mut self, stats: &QueryStats) {
        self.stats = Some(stats.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_cell_shape() {
        let mut sink = JsonCollector::new();
        sink.header(&["n.age".to_string()]);
        sink.row(vec![ReplyCell::Scalar {
            value: Value::Int(30),
            type_tag: "integer",
        }]);
        assert_eq!(sink.columns, vec!["n.age"]);
        assert_eq!(sink.rows[0], json!([{ "value": 30, "type": "integer" }]));
    }

    #[test]
    fn test_node_cell_shape() {
        let mut sink = JsonCollector::new();
        sink.row(vec![ReplyCell::Node {
            id: 0,
            labels: vec!["Person".to_string()],
            properties: vec![PropertyReply {
                name: "name".to_string(),
                value: Value::from("Alice"),
                type_tag: "string",
            }],
        }]);
        assert_eq!(
            sink.rows[0],
            json!([{
                "type": "node",
                "id": 0,
                "labels": ["Person"],
                "properties": [{ "name": "name", "value": "Alice", "type": "string" }],
            }])
        );
    }

    #[test]
    fn test_relation_cell_shape() {
        let mut sink = JsonCollector::new();
        sink.row(vec![ReplyCell::Relation {
            id: 3,
            relation_type: "KNOWS".to_string(),
            src_node: 1,
            dest_node: 2,
            properties: Vec::new(),
        }]);
        assert_eq!(
            sink.rows[0],
            json!([{
                "type": "relation",
                "id": 3,
                "relation_type": "KNOWS",
                "src_node": 1,
                "dest_node": 2,
                "properties": [],
            }])
        );
    }
}
