use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// One-shot task run against a context `C` once construction time reaches its instant.
pub type Task<C> = Box<dyn FnOnce(&mut C)>;

struct Entry<C> {
    at: f64,
    seq: u64,
    task: Task<C>,
}

impl<C> PartialEq for Entry<C> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<C> Eq for Entry<C> {}

impl<C> PartialOrd for Entry<C> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<C> Ord for Entry<C> {
    // Reversed: the heap pops the earliest `(at, seq)` first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .at
            .total_cmp(&self.at)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Logical scheduler of one-shot tasks keyed by global time.
///
/// Tasks with the same instant run in registration order.
pub struct Schedule<C> {
    heap: BinaryHeap<Entry<C>>,
    next_seq: u64,
}

impl<C> Default for Schedule<C> {
    fn default() -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_seq: 0,
        }
    }
}

impl<C> std::fmt::Debug for Schedule<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Schedule")
            .field("pending", &self.heap.len())
            .finish()
    }
}

impl<C> Schedule<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `task` to run once time reaches `at`.
    pub fn schedule(&mut self, at: f64, task: Task<C>) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Entry { at, seq, task });
    }

    /// Pop the earliest task due at or before `now`.
    pub fn pop_due(&mut self, now: f64) -> Option<(f64, Task<C>)> {
        if self.heap.peek()?.at > now {
            return None;
        }
        self.heap.pop().map(|e| (e.at, e.task))
    }

    /// Instant of the earliest pending task.
    pub fn next_at(&self) -> Option<f64> {
        self.heap.peek().map(|e| e.at)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Return `true` when nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Drop every pending task.
    pub fn clear(&mut self) {
        self.heap.clear();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/time/schedule.rs"]
mod tests;
