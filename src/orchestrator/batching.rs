//! Batch chunking.
//!
//! Batches are derived once at run start by splitting the input list, in
//! order, into slices of at most the configured maximum (the remote system
//! rejects larger submissions). A batch's identity is its number plus its
//! member items.

use crate::workflow::WorkItem;

/// One ordered, size-bounded slice of the input list.
#[derive(Clone, Copy, Debug)]
pub struct Batch<'a> {
    /// 1-based batch number.
    pub number: usize,
    /// 0-based offset of the first item in the full input list.
    pub start: usize,
    pub items: &'a [WorkItem],
}

/// Split `items` into ordered batches of at most `max_batch_size`.
pub fn chunk_batches(items: &[WorkItem], max_batch_size: usize) -> Vec<Batch<'_>> {
    items
        .chunks(max_batch_size)
        .enumerate()
        .map(|(index, chunk)| Batch {
            number: index + 1,
            start: index * max_batch_size,
            items: chunk,
        })
        .collect()
}
