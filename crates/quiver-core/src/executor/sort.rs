//! Blocking sort operator with unbounded and top-K strategies.
//!
//! The comparator walks the trailing order-by slots of each record; the
//! sort direction is applied once to the comparator result, never per
//! key. When the plan carries a limit, the operator keeps at most
//! limit + skip records in a bounded heap instead of buffering the whole
//! child output, and both strategies emit identical prefixes.

use std::cmp::Ordering;

use crate::GraphContext;
use crate::error::Result;
use crate::executor::record::{Entry, Record};
use crate::executor::{OpState, Operator};

/// Sort direction, applied uniformly across every order-by key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    /// Smallest first
    Ascending,
    /// Largest first
    Descending,
}

/// Compare two records over their order-by slots.
///
/// Order-by slots are filled by the projection and are always scalars;
/// anything else in one is a planner bug, not input data.
fn compare_slots(a: &Record, b: &Record, offset: usize, count: usize) -> Ordering {
    for slot in offset..offset + count {
        let (Entry::Scalar(av), Entry::Scalar(bv)) = (a.get(slot), b.get(slot)) else {
            panic!("order-by slot {slot} holds a non-scalar entry");
        };
        match av.order(bv) {
            Ordering::Equal => continue,
            decided => return decided,
        }
    }
    Ordering::Equal
}

fn directed(ord: Ordering, direction: SortDirection) -> Ordering {
    match direction {
        SortDirection::Ascending => ord,
        SortDirection::Descending => ord.reverse(),
    }
}

/// Binary max-heap under a caller-supplied comparator.
///
/// `std::collections::BinaryHeap` orders through `Ord`, which cannot carry
/// the plan's key offset and direction, so the sift lives here. The root
/// is the greatest element under the comparator; the sort keeps the heap
/// ordered so the root is the record to evict first.
#[derive(Debug, Default)]
struct RecordHeap {
    items: Vec<Record>,
}

impl RecordHeap {
    fn len(&self) -> usize {
        self.items.len()
    }

    fn peek(&self) -> Option<&Record> {
        self.items.first()
    }

    fn clear(&mut self) {
        self.items.clear();
    }

    fn offer<C>(&mut self, record: Record, cmp: &C)
    where
        C: Fn(&Record, &Record) -> Ordering,
    {
        self.items.push(record);
        self.sift_up(self.items.len() - 1, cmp);
    }

    fn replace_top<C>(&mut self, record: Record, cmp: &C)
    where
        C: Fn(&Record, &Record) -> Ordering,
    {
        if self.items.is_empty() {
            self.items.push(record);
            return;
        }
        self.items[0] = record;
        self.sift_down(0, cmp);
    }

    fn poll<C>(&mut self, cmp: &C) -> Option<Record>
    where
        C: Fn(&Record, &Record) -> Ordering,
    {
        if self.items.is_empty() {
            return None;
        }
        let last = self.items.len() - 1;
        self.items.swap(0, last);
        let top = self.items.pop();
        if !self.items.is_empty() {
            self.sift_down(0, cmp);
        }
        top
    }

    fn sift_up<C>(&mut self, mut idx: usize, cmp: &C)
    where
        C: Fn(&Record, &Record) -> Ordering,
    {
        while idx > 0 {
            let parent = (idx - 1) / 2;
            if cmp(&self.items[idx], &self.items[parent]) == Ordering::Greater {
                self.items.swap(idx, parent);
                idx = parent;
            } else {
                break;
            }
        }
    }

    fn sift_down<C>(&mut self, mut idx: usize, cmp: &C)
    where
        C: Fn(&Record, &Record) -> Ordering,
    {
        loop {
            let left = 2 * idx + 1;
            let right = left + 1;
            let mut largest = idx;
            if left < self.items.len()
                && cmp(&self.items[left], &self.items[largest]) == Ordering::Greater
            {
                largest = left;
            }
            if right < self.items.len()
                && cmp(&self.items[right], &self.items[largest]) == Ordering::Greater
            {
                largest = right;
            }
            if largest == idx {
                break;
            }
            self.items.swap(idx, largest);
            idx = largest;
        }
    }
}

/// Blocking sort operator.
#[derive(Debug)]
pub struct SortOp {
    child: Box<Operator>,
    key_offset: usize,
    key_count: usize,
    direction: SortDirection,
    /// `Some(limit + skip)` when the plan is limited, `None` for a full sort
    bound: Option<usize>,
    /// Emission stage, kept worst-first so `pop` hands out the best record
    buffer: Vec<Record>,
    heap: RecordHeap,
    state: OpState,
}

impl SortOp {
    /// Create a sort over `key_count` order-by slots starting at
    /// `key_offset`. `bound` caps retained records at limit + skip.
    pub fn new(
        child: Operator,
        key_offset: usize,
        key_count: usize,
        direction: SortDirection,
        bound: Option<usize>,
    ) -> Self {
        Self {
            child: Box::new(child),
            key_offset,
            key_count,
            direction,
            bound,
            buffer: Vec::new(),
            heap: RecordHeap::default(),
            state: OpState::Created,
        }
    }

    pub(crate) fn state(&self) -> OpState {
        self.state
    }

    fn comparator(&self) -> impl Fn(&Record, &Record) -> Ordering + use<> {
        let offset = self.key_offset;
        let count = self.key_count;
        let direction = self.direction;
        move |a: &Record, b: &Record| directed(compare_slots(a, b, offset, count), direction)
    }

    fn accumulate(&mut self, record: Record) {
        let cmp = self.comparator();
        match self.bound {
            None => self.buffer.push(record),
            Some(0) => {}
            Some(bound) => {
                if self.heap.len() < bound {
                    self.heap.offer(record, &cmp);
                } else if let Some(worst) = self.heap.peek() {
                    // Root is the worst retained record; replace it only
                    // when the candidate beats it.
                    if cmp(worst, &record) == Ordering::Greater {
                        self.heap.replace_top(record, &cmp);
                    }
                }
            }
        }
    }

    /// Drain the child completely, then stage the emission order:
    /// the buffer ends worst-first and `next` pops from the back.
    fn drain_child(&mut self, ctx: &GraphContext) -> Result<()> {
        while let Some(record) = self.child.next(ctx)? {
            self.accumulate(record);
        }
        let cmp = self.comparator();
        if self.bound.is_some() {
            while let Some(record) = self.heap.poll(&cmp) {
                self.buffer.push(record);
            }
        } else {
            self.buffer.sort_by(|a, b| cmp(b, a));
        }
        Ok(())
    }

    pub(crate) fn next(&mut self, ctx: &GraphContext) -> Result<Option<Record>> {
        match self.state {
            OpState::Exhausted | OpState::Closed => return Ok(None),
            OpState::Created => {
                self.state = OpState::Open;
                self.drain_child(ctx)?;
            }
            OpState::Open => {}
        }
        match self.buffer.pop() {
            Some(record) => Ok(Some(record)),
            None => {
                self.state = OpState::Exhausted;
                Ok(None)
            }
        }
    }

    pub(crate) fn reset(&mut self) {
        self.child.reset();
        self.buffer.clear();
        self.heap.clear();
        self.state = OpState::Created;
    }

    pub(crate) fn close(&mut self) {
        self.child.close();
        self.buffer.clear();
        self.heap.clear();
        self.state = OpState::Closed;
    }
}
