//! Bulk data loading module for fast initial graph population
//!
//! Decodes the section-framed binary payload produced by external import
//! tooling and applies it to a [`GraphContext`] in one pass, building the
//! property schemas as a side effect.
//!
//! Payload framing: an argument list of binary blobs opened by a literal
//! `NODES` marker, one blob per label, until a blob that is exactly the
//! literal `RELATIONS`, after which each blob describes one relation type.
//! Either section may be omitted, but `NODES` must come first. Each file
//! blob carries a NUL-terminated name, a native-endian `u32` property-key
//! count, the NUL-terminated keys, and then back-to-back entity rows with
//! one-byte type tags per value. Relation rows are prefixed by 8-byte
//! source and destination node ids.
//!
//! Every file is decoded and validated in full before any graph mutation,
//! so a malformed blob rejects without partial writes from that blob.

use serde::{Deserialize, Serialize};

use crate::catalog::KeyId;
use crate::error::{Error, Result};
use crate::storage::NodeId;
use crate::value::Value;
use crate::GraphContext;

mod cursor;

use cursor::Cursor;

/// Section marker opening the label files.
const NODES_MARKER: &[u8] = b"NODES";
/// Section marker separating label files from relation-type files.
const RELATIONS_MARKER: &[u8] = b"RELATIONS";

/// Property type tag: null, no payload.
const TAG_NULL: u8 = 0;
/// Property type tag: boolean, one payload byte.
const TAG_BOOL: u8 = 1;
/// Property type tag: numeric, 8-byte native-endian double.
const TAG_NUMERIC: u8 = 2;
/// Property type tag: string, NUL-terminated UTF-8 bytes.
const TAG_STRING: u8 = 3;

/// Counters reported after a bulk load completes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BulkStats {
    /// Nodes created across all label files
    pub nodes_created: u64,
    /// Relationships created across all relation-type files
    pub relationships_created: u64,
    /// Labels that did not exist before this load
    pub labels_added: u64,
    /// Relation types that did not exist before this load
    pub relation_types_added: u64,
    /// Properties written to created entities (null values are skipped)
    pub properties_set: u64,
    /// Label and relation-type file blobs decoded
    pub files_decoded: u64,
}

/// One fully decoded label file, held before application.
#[derive(Debug)]
struct DecodedNodes {
    label: String,
    keys: Vec<String>,
    rows: Vec<Vec<Value>>,
}

/// One fully decoded relation-type file.
#[derive(Debug)]
struct DecodedRelations {
    type_name: String,
    keys: Vec<String>,
    rows: Vec<DecodedRelationRow>,
}

#[derive(Debug)]
struct DecodedRelationRow {
    src_id: NodeId,
    dst_id: NodeId,
    properties: Vec<Value>,
}

/// Read a file header: NUL-terminated name, key count, key strings.
fn decode_header(cursor: &mut Cursor<'_>) -> Result<(String, Vec<String>)> {
    let name = cursor.read_cstr()?.to_string();
    let key_count = cursor.read_u32()? as usize;
    let mut keys = Vec::with_capacity(key_count);
    for _ in 0..key_count {
        keys.push(cursor.read_cstr()?.to_string());
    }
    Ok((name, keys))
}

/// Read one tagged property value.
fn decode_value(cursor: &mut Cursor<'_>) -> Result<Value> {
    let tag = cursor.read_u8()?;
    match tag {
        TAG_NULL => Ok(Value::Null),
        TAG_BOOL => Ok(Value::Bool(cursor.read_u8()? != 0)),
        TAG_NUMERIC => Ok(Value::Float(cursor.read_f64()?)),
        TAG_STRING => Ok(Value::String(cursor.read_cstr()?.to_string())),
        other => Err(Error::decode(format!(
            "unknown property type tag {other} at offset {}",
            cursor.offset() - 1
        ))),
    }
}

/// Decode an entire label file into an owned batch.
fn decode_node_file(data: &[u8]) -> Result<DecodedNodes> {
    let mut cursor = Cursor::new(data);
    let (label, keys) = decode_header(&mut cursor)?;

    // Rows carry no id prefix, so a key-less file cannot advance the
    // cursor; any bytes after its header are unreadable.
    if keys.is_empty() && !cursor.is_empty() {
        return Err(Error::decode(format!(
            "label file \"{label}\" declares no property keys but carries {} trailing bytes",
            data.len() - cursor.offset()
        )));
    }

    let mut rows = Vec::new();
    while !cursor.is_empty() {
        let mut row = Vec::with_capacity(keys.len());
        for _ in 0..keys.len() {
            row.push(decode_value(&mut cursor)?);
        }
        rows.push(row);
    }
    Ok(DecodedNodes { label, keys, rows })
}

/// Decode an entire relation-type file into an owned batch.
fn decode_relation_file(data: &[u8]) -> Result<DecodedRelations> {
    let mut cursor = Cursor::new(data);
    let (type_name, keys) = decode_header(&mut cursor)?;

    let mut rows = Vec::new();
    while !cursor.is_empty() {
        let src_id = cursor.read_u64()?;
        let dst_id = cursor.read_u64()?;
        let mut properties = Vec::with_capacity(keys.len());
        for _ in 0..keys.len() {
            properties.push(decode_value(&mut cursor)?);
        }
        rows.push(DecodedRelationRow {
            src_id,
            dst_id,
            properties,
        });
    }
    Ok(DecodedRelations {
        type_name,
        keys,
        rows,
    })
}

/// One-shot binary loader over a mutable graph context.
///
/// Decode errors surface as [`Error::Decode`] naming the offending token,
/// tag, or offset; relation rows referencing nonexistent endpoints surface
/// as [`Error::Storage`]. Files already applied before the failing one
/// remain applied.
pub struct BulkLoader<'a> {
    /// Context receiving the decoded entities
    ctx: &'a mut GraphContext,
    /// Counters accumulated across all files in the payload
    stats: BulkStats,
}

impl<'a> BulkLoader<'a> {
    /// Create a loader over the context that will receive the data.
    pub fn new(ctx: &'a mut GraphContext) -> Self {
        Self {
            ctx,
            stats: BulkStats::default(),
        }
    }

    /// Decode and apply a section-framed payload, returning load counters.
    pub fn load(mut self, payload: &[&[u8]]) -> Result<BulkStats> {
        if payload.is_empty() {
            return Err(Error::decode("failed to parse bulk insert sections"));
        }

        let mut idx = 0;
        let mut section_found = false;

        if payload[idx] == NODES_MARKER {
            section_found = true;
            idx += 1;
            while idx < payload.len() && payload[idx] != RELATIONS_MARKER {
                let batch = decode_node_file(payload[idx])?;
                self.apply_nodes(batch)?;
                idx += 1;
            }
        }

        if idx < payload.len() && payload[idx] == RELATIONS_MARKER {
            section_found = true;
            idx += 1;
            while idx < payload.len() {
                let batch = decode_relation_file(payload[idx])?;
                self.apply_relations(batch)?;
                idx += 1;
            }
        }

        if !section_found {
            let token = String::from_utf8_lossy(payload[0]);
            return Err(Error::decode(format!(
                "unexpected token {token}, expected NODES or RELATIONS"
            )));
        }
        if idx < payload.len() {
            return Err(Error::decode("extra arguments after RELATIONS section"));
        }

        tracing::info!(
            nodes = self.stats.nodes_created,
            relationships = self.stats.relationships_created,
            properties = self.stats.properties_set,
            files = self.stats.files_decoded,
            "bulk load complete"
        );
        Ok(self.stats)
    }

    fn intern_keys(&mut self, keys: &[String]) -> Vec<KeyId> {
        keys.iter()
            .map(|key| self.ctx.catalog.get_or_create_key(key))
            .collect()
    }

    fn apply_nodes(&mut self, batch: DecodedNodes) -> Result<()> {
        let known_labels = self.ctx.catalog.label_count();
        let label_id = self.ctx.catalog.get_or_create_label(&batch.label);
        if self.ctx.catalog.label_count() > known_labels {
            self.stats.labels_added += 1;
        }

        let key_ids = self.intern_keys(&batch.keys);
        self.ctx.catalog.update_node_schema(label_id, &key_ids);

        for row in batch.rows {
            let node_id = self.ctx.graph.create_node(label_id);
            self.stats.nodes_created += 1;
            for (&key_id, value) in key_ids.iter().zip(row) {
                // Null tags decode but are never stored.
                if value.is_null() {
                    continue;
                }
                self.ctx.graph.set_node_property(node_id, key_id, value)?;
                self.stats.properties_set += 1;
            }
        }

        self.stats.files_decoded += 1;
        tracing::debug!(label = %batch.label, "label file applied");
        Ok(())
    }

    fn apply_relations(&mut self, batch: DecodedRelations) -> Result<()> {
        let known_types = self.ctx.catalog.type_count();
        let type_id = self.ctx.catalog.get_or_create_type(&batch.type_name);
        if self.ctx.catalog.type_count() > known_types {
            self.stats.relation_types_added += 1;
        }

        let key_ids = self.intern_keys(&batch.keys);
        self.ctx.catalog.update_relation_schema(type_id, &key_ids);

        for row in batch.rows {
            let rel_id = self.ctx.graph.connect_nodes(row.src_id, row.dst_id, type_id)?;
            self.stats.relationships_created += 1;
            for (&key_id, value) in key_ids.iter().zip(row.properties) {
                if value.is_null() {
                    continue;
                }
                self.ctx
                    .graph
                    .set_relationship_property(rel_id, key_id, value)?;
                self.stats.properties_set += 1;
            }
        }

        self.stats.files_decoded += 1;
        tracing::debug!(relation_type = %batch.type_name, "relation-type file applied");
        Ok(())
    }
}
