//! Storage module - memory-resident property graph
//!
//! Nodes and relationships live in append-only arenas indexed by their
//! stable ids, which makes handle resolution an array index. Each node
//! carries exactly one label; properties are kept per entity in first-set
//! order, which is also the order emission enumerates them in.

use crate::catalog::{KeyId, LabelId, TypeId};
use crate::error::{Error, Result};
use crate::value::Value;

/// Node ID type
pub type NodeId = u64;

/// Relationship ID type
pub type RelId = u64;

/// A node: one label plus an ordered property list.
#[derive(Debug, Clone)]
pub struct Node {
    /// Stable node id (arena index)
    pub id: NodeId,
    /// Label this node was created under
    pub label_id: LabelId,
    properties: Vec<(KeyId, Value)>,
}

/// A relationship connecting two nodes.
#[derive(Debug, Clone)]
pub struct Relationship {
    /// Stable relationship id (arena index)
    pub id: RelId,
    /// Source node ID
    pub src_id: NodeId,
    /// Destination node ID
    pub dst_id: NodeId,
    /// Relationship type ID
    pub type_id: TypeId,
    properties: Vec<(KeyId, Value)>,
}

fn set_property(properties: &mut Vec<(KeyId, Value)>, key: KeyId, value: Value) {
    match properties.iter_mut().find(|(k, _)| *k == key) {
        // Overwrite in place so enumeration order stays first-set order.
        Some(slot) => slot.1 = value,
        None => properties.push((key, value)),
    }
}

impl Node {
    /// Property value for a key, if set
    pub fn property(&self, key: KeyId) -> Option<&Value> {
        self.properties.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    /// All properties in first-set order
    pub fn properties(&self) -> &[(KeyId, Value)] {
        &self.properties
    }
}

impl Relationship {
    /// Property value for a key, if set
    pub fn property(&self, key: KeyId) -> Option<&Value> {
        self.properties.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    /// All properties in first-set order
    pub fn properties(&self) -> &[(KeyId, Value)] {
        &self.properties
    }
}

/// Memory-resident property graph with stable, dense entity ids.
#[derive(Debug, Default)]
pub struct Graph {
    nodes: Vec<Node>,
    relationships: Vec<Relationship>,
}

impl Graph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a node under a label, returning its id
    pub fn create_node(&mut self, label_id: LabelId) -> NodeId {
        let id = self.nodes.len() as NodeId;
        self.nodes.push(Node {
            id,
            label_id,
            properties: Vec::new(),
        });
        id
    }

    /// Connect two existing nodes with a typed relationship.
    ///
    /// Both endpoints must exist; a dangling endpoint is a storage error
    /// naming the offending id.
    pub fn connect_nodes(&mut self, src_id: NodeId, dst_id: NodeId, type_id: TypeId) -> Result<RelId> {
        if self.node(src_id).is_none() {
            return Err(Error::storage(format!("unknown source node id {src_id}")));
        }
        if self.node(dst_id).is_none() {
            return Err(Error::storage(format!(
                "unknown destination node id {dst_id}"
            )));
        }
        let id = self.relationships.len() as RelId;
        self.relationships.push(Relationship {
            id,
            src_id,
            dst_id,
            type_id,
            properties: Vec::new(),
        });
        Ok(id)
    }

    /// Set (or overwrite) a property on a node
    pub fn set_node_property(&mut self, id: NodeId, key: KeyId, value: Value) -> Result<()> {
        let node = self
            .nodes
            .get_mut(id as usize)
            .ok_or_else(|| Error::NotFound(format!("node {id}")))?;
        set_property(&mut node.properties, key, value);
        Ok(())
    }

    /// Set (or overwrite) a property on a relationship
    pub fn set_relationship_property(&mut self, id: RelId, key: KeyId, value: Value) -> Result<()> {
        let rel = self
            .relationships
            .get_mut(id as usize)
            .ok_or_else(|| Error::NotFound(format!("relationship {id}")))?;
        set_property(&mut rel.properties, key, value);
        Ok(())
    }

    /// Node by id
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id as usize)
    }

    /// Relationship by id
    pub fn relationship(&self, id: RelId) -> Option<&Relationship> {
        self.relationships.get(id as usize)
    }

    /// Number of nodes
    pub fn node_count(&self) -> u64 {
        self.nodes.len() as u64
    }

    /// Number of relationships
    pub fn relationship_count(&self) -> u64 {
        self.relationships.len() as u64
    }
}
