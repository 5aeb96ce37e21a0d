//! Quiver Core - Embedded Property-Graph Query Execution
//!
//! This crate provides the execution core of the Quiver graph engine,
//! implementing:
//! - Typed scalar values with one total order across domains
//! - Fixed-width records flowing through a pull-based operator tree
//! - Blocking sort with a bounded top-k path for LIMIT queries
//! - Grouped and ungrouped aggregation (count, sum, avg, min, max,
//!   percentiles, standard deviation)
//! - Result assembly with DISTINCT, SKIP and LIMIT policies plus run stats
//! - One-shot binary bulk loading that builds property schemas as it goes
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │            Execution Plan                    │
//! │   (drives the root, assembles the reply)    │
//! └──────────────┬──────────────────────────────┘
//!                │ pulls records
//! ┌──────────────┴──────────────────────────────┐
//! │            Operator Tree                     │
//! │  (Scan, Filter, Project, Sort, Aggregate)   │
//! └──────────────┬──────────────────────────────┘
//!                │ resolves handles
//! ┌──────────────┴──────────────────────────────┐
//! │            Graph Context                     │
//! │     (storage arenas + name catalog)         │
//! └──────────────┬──────────────────────────────┘
//!                │ populated by
//! ┌──────────────┴──────────────────────────────┐
//! │            Bulk Loader                       │
//! │  (section-framed binary payload decoding)   │
//! └─────────────────────────────────────────────┘
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod catalog;
pub mod error;
pub mod executor;
pub mod loader;
pub mod storage;
pub mod value;

pub use error::{Error, Result};
pub use value::Value;

use catalog::{Catalog, KeyId};
use storage::{Graph, NodeId, RelId};

/// Shared query state: the entity storage plus the catalog naming its parts.
///
/// The bulk loader populates a context before any querying happens; scan
/// operators and the result assembler resolve entity handles against it
/// while a plan runs. A context is exclusively owned by one in-progress
/// command at a time.
#[derive(Debug, Default)]
pub struct GraphContext {
    /// Node and relationship arenas
    pub graph: Graph,
    /// Label, relation-type, and property-key mappings
    pub catalog: Catalog,
}

impl GraphContext {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a labeled node with the given properties.
    ///
    /// Label and key names are interned on first use and folded into the
    /// label's schema.
    pub fn add_node(&mut self, label: &str, props: &[(&str, Value)]) -> Result<NodeId> {
        let label_id = self.catalog.get_or_create_label(label);
        let key_ids: Vec<KeyId> = props
            .iter()
            .map(|(key, _)| self.catalog.get_or_create_key(key))
            .collect();
        self.catalog.update_node_schema(label_id, &key_ids);

        let node_id = self.graph.create_node(label_id);
        for (&key_id, (_, value)) in key_ids.iter().zip(props) {
            self.graph.set_node_property(node_id, key_id, value.clone())?;
        }
        Ok(node_id)
    }

    /// Connect two existing nodes with a typed relationship.
    pub fn add_relationship(
        &mut self,
        src_id: NodeId,
        dst_id: NodeId,
        type_name: &str,
        props: &[(&str, Value)],
    ) -> Result<RelId> {
        let type_id = self.catalog.get_or_create_type(type_name);
        let key_ids: Vec<KeyId> = props
            .iter()
            .map(|(key, _)| self.catalog.get_or_create_key(key))
            .collect();
        self.catalog.update_relation_schema(type_id, &key_ids);

        let rel_id = self.graph.connect_nodes(src_id, dst_id, type_id)?;
        for (&key_id, (_, value)) in key_ids.iter().zip(props) {
            self.graph
                .set_relationship_property(rel_id, key_id, value.clone())?;
        }
        Ok(rel_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_node_interns_and_stores() -> Result<()> {
        let mut ctx = GraphContext::new();
        let ada = ctx.add_node(
            "Person",
            &[("name", Value::from("Ada")), ("age", Value::Int(36))],
        )?;

        let label = ctx.catalog.get_label_id("Person").unwrap();
        let node = ctx.graph.node(ada).unwrap();
        assert_eq!(node.label_id, label);

        let age = ctx.catalog.get_key_id("age").unwrap();
        assert_eq!(node.property(age), Some(&Value::Int(36)));
        assert!(ctx.catalog.node_schema(label).unwrap().contains(age));
        Ok(())
    }

    #[test]
    fn test_add_relationship_connects_existing_nodes() -> Result<()> {
        let mut ctx = GraphContext::new();
        let ada = ctx.add_node("Person", &[("name", Value::from("Ada"))])?;
        let ford = ctx.add_node("Person", &[("name", Value::from("Ford"))])?;

        let rel = ctx.add_relationship(ada, ford, "KNOWS", &[("since", Value::Int(2019))])?;
        let stored = ctx.graph.relationship(rel).unwrap();
        assert_eq!((stored.src_id, stored.dst_id), (ada, ford));
        assert_eq!(
            ctx.catalog.get_type_name(stored.type_id),
            Some("KNOWS")
        );

        let since = ctx.catalog.get_key_id("since").unwrap();
        assert!(ctx.catalog.relation_schema(stored.type_id).unwrap().contains(since));
        Ok(())
    }

    #[test]
    fn test_add_relationship_rejects_dangling_source() {
        let mut ctx = GraphContext::new();
        let err = ctx.add_relationship(5, 6, "KNOWS", &[]).unwrap_err();
        assert!(matches!(err, Error::Storage(_)), "{err}");
    }
}
