//! The bounded-fan-in k-way merge, including the streak optimization.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use graphos_common::utils::error::Result;

use crate::execution::{Comparator, Processor, RunCursor};

/// Wraps a cursor so a [`BinaryHeap`] can order it by its current top under
/// the caller's comparator, inverted so the heap's max becomes the smallest
/// user-ordered element.
struct HeapEntry<'a, T> {
    cursor: Box<dyn RunCursor<T> + Send>,
    cmp: &'a Comparator<T>,
}

impl<T> HeapEntry<'_, T> {
    fn top(&self) -> &T {
        self.cursor
            .peek()
            .expect("heap entries are only constructed from non-empty cursors")
    }
}

impl<T> PartialEq for HeapEntry<'_, T> {
    fn eq(&self, other: &Self) -> bool {
        (self.cmp)(self.top(), other.top()) == Ordering::Equal
    }
}

impl<T> Eq for HeapEntry<'_, T> {}

impl<T> PartialOrd for HeapEntry<'_, T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for HeapEntry<'_, T> {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; invert so the smallest user-ordered top
        // is the one popped first.
        (self.cmp)(other.top(), self.top())
    }
}

/// Streams every input cursor into `sink` in non-decreasing order.
///
/// Uses a min-heap of cursors keyed by their current top. After popping the
/// minimum cursor `C`, the new heap top `N` (if any) is peeked without being
/// removed; `C` keeps emitting and advancing on its own, without reentering
/// the heap, for as long as it remains `<= N` (the streak optimization).
/// When only one cursor remains the heap stays empty throughout and the
/// cursor is drained directly.
///
/// # Errors
///
/// Returns an error if advancing a cursor or writing to `sink` fails.
pub fn k_way_merge<T>(
    cmp: &Comparator<T>,
    cursors: Vec<Box<dyn RunCursor<T> + Send>>,
    sink: &mut dyn Processor<T>,
) -> Result<()> {
    let mut heap: BinaryHeap<HeapEntry<'_, T>> = BinaryHeap::with_capacity(cursors.len());
    for cursor in cursors {
        if cursor.peek().is_some() {
            heap.push(HeapEntry { cursor, cmp });
        }
    }

    while let Some(HeapEntry { mut cursor, cmp }) = heap.pop() {
        loop {
            let item = cursor
                .pop()?
                .expect("cursor selected from the heap must be non-empty");
            sink.process(item)?;

            let Some(top) = cursor.peek() else { break };
            if let Some(next) = heap.peek() {
                if cmp(top, next.top()) == Ordering::Greater {
                    break;
                }
            }
        }
        if cursor.peek().is_some() {
            heap.push(HeapEntry { cursor, cmp });
        }
    }

    Ok(())
}
