//! Fixed-width record tuples flowing between operators.

use crate::storage::{NodeId, RelId};
use crate::value::Value;

/// One record slot.
///
/// Entity variants carry the stable id only; labels, endpoints and
/// properties are resolved against the graph context when an entry is
/// evaluated or emitted.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    /// Slot not yet written by any operator
    Unset,
    /// Scalar value
    Scalar(Value),
    /// Node reference
    Node(NodeId),
    /// Relationship reference
    Relationship(RelId),
}

impl Entry {
    /// Append an injective byte image of this entry.
    ///
    /// Extends the scalar image with entity tags so a node, a relationship
    /// and an integer with the same bit pattern stay distinct. Used for
    /// DISTINCT dedup keys and group composite keys.
    pub(crate) fn write_key_bytes(&self, out: &mut Vec<u8>) {
        match self {
            Entry::Unset => out.push(0xf0),
            Entry::Scalar(v) => {
                out.push(0xf1);
                v.write_key_bytes(out);
            }
            Entry::Node(id) => {
                out.push(0xf2);
                out.extend_from_slice(&id.to_ne_bytes());
            }
            Entry::Relationship(id) => {
                out.push(0xf3);
                out.extend_from_slice(&id.to_ne_bytes());
            }
        }
    }
}

/// Fixed-width tuple of typed slots.
///
/// Width is decided at plan-compile time: the visible projection slots
/// first, then the order-by slots. Every record produced by one plan has
/// the same width. Slot access is positional; an out-of-bounds slot is a
/// programming error and panics.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    entries: Vec<Entry>,
}

impl Record {
    /// Create a record with every slot unset
    pub fn new(width: usize) -> Self {
        Self {
            entries: vec![Entry::Unset; width],
        }
    }

    /// Number of slots
    pub fn width(&self) -> usize {
        self.entries.len()
    }

    /// Write a slot
    pub fn set(&mut self, slot: usize, entry: Entry) {
        self.entries[slot] = entry;
    }

    /// Read a slot
    pub fn get(&self, slot: usize) -> &Entry {
        &self.entries[slot]
    }

    /// Move an entry out of a slot, leaving it unset
    pub fn take(&mut self, slot: usize) -> Entry {
        std::mem::replace(&mut self.entries[slot], Entry::Unset)
    }

    /// Scalar in a slot, if that is what it holds
    pub fn scalar(&self, slot: usize) -> Option<&Value> {
        match self.get(slot) {
            Entry::Scalar(v) => Some(v),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_is_unset() {
        let r = Record::new(3);
        assert_eq!(r.width(), 3);
        for slot in 0..3 {
            assert_eq!(r.get(slot), &Entry::Unset);
        }
    }

    #[test]
    fn test_set_get_take() {
        let mut r = Record::new(2);
        r.set(0, Entry::Scalar(Value::Int(7)));
        r.set(1, Entry::Node(42));
        assert_eq!(r.scalar(0), Some(&Value::Int(7)));
        assert_eq!(r.scalar(1), None);
        assert_eq!(r.take(1), Entry::Node(42));
        assert_eq!(r.get(1), &Entry::Unset);
    }

    #[test]
    fn test_clone_is_deep() {
        let mut r = Record::new(1);
        r.set(0, Entry::Scalar(Value::String("alpha".into())));
        let mut copy = r.clone();
        copy.set(0, Entry::Scalar(Value::String("beta".into())));
        assert_eq!(r.scalar(0), Some(&Value::String("alpha".into())));
    }

    #[test]
    #[should_panic]
    fn test_out_of_bounds_slot_panics() {
        let r = Record::new(2);
        let _ = r.get(2);
    }

    #[test]
    fn test_entry_key_bytes_distinguish_kinds() {
        let mut node = Vec::new();
        Entry::Node(1).write_key_bytes(&mut node);
        let mut rel = Vec::new();
        Entry::Relationship(1).write_key_bytes(&mut rel);
        let mut int = Vec::new();
        Entry::Scalar(Value::Int(1)).write_key_bytes(&mut int);
        assert_ne!(node, rel);
        assert_ne!(node, int);
        assert_ne!(rel, int);
    }
}
