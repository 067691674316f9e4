use std::rc::Rc;

use crate::animation::anim::AnimId;
use crate::animation::appearance::Appearances;
use crate::animation::lifecycle::Lifecycle;
use crate::foundation::core::ObjectId;
use crate::foundation::error::{KinemaError, KinemaResult};
use crate::item::data::ItemData;
use crate::time::range::TimeRange;
use crate::time::rate::RateFunc;

/// Everything a stack entry sees when it is applied at one time sample.
pub struct ApplyParams<'a> {
    /// Item whose stack is being evaluated.
    pub item: ObjectId,
    /// Registration sequence number of the entry being applied.
    pub seq: u64,
    /// Queried global time.
    pub global_t: f64,
    /// Rate-shaped progress of the entry's range at `global_t`.
    pub alpha: f64,
    /// The entry's range.
    pub range: TimeRange,
    /// Whether the sample feeds a renderer.
    pub for_rendering: bool,
    /// Which side of a boundary instant is requested.
    pub get_at_left: bool,
    /// All stacks, for entries that need the state of other items.
    pub appearances: &'a Appearances,
}

/// The mutation an animation contributes to one item's stack.
///
/// `apply` must be a pure function of `data` and `params`: it is called at arbitrary times in
/// arbitrary order.
pub trait StackApplier {
    /// Transform the state produced by the earlier entries.
    fn apply(&self, data: &mut ItemData, params: &ApplyParams<'_>) -> KinemaResult<()>;
}

pub(crate) enum EntryBody {
    Baseline(ItemData),
    Apply {
        anim: AnimId,
        rate: RateFunc,
        lifecycle: Rc<Lifecycle>,
        applier: Rc<dyn StackApplier>,
    },
}

pub(crate) struct StackEntry {
    pub(crate) seq: u64,
    pub(crate) range: TimeRange,
    pub(crate) body: EntryBody,
}

/// Per-item registration log of baselines and animation entries.
///
/// A baseline covers every entry registered before it: evaluation starts from the most recent
/// baseline in effect and applies only the animation entries registered after it.
#[derive(Default)]
pub struct AnimStack {
    entries: Vec<StackEntry>,
}

impl std::fmt::Debug for AnimStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnimStack")
            .field("entries", &self.entries.len())
            .field("baselines", &self.baseline_count())
            .finish()
    }
}

impl AnimStack {
    pub(crate) fn push(&mut self, entry: StackEntry) {
        debug_assert!(self.entries.last().is_none_or(|e| e.seq < entry.seq));
        self.entries.push(entry);
    }

    /// Number of entries, baselines included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Return `true` for a stack with no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn baseline_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e.body, EntryBody::Baseline(_)))
            .count()
    }

    /// Whether an entry with sequence number `seq` is registered here.
    pub fn contains_seq(&self, seq: u64) -> bool {
        self.entries.binary_search_by_key(&seq, |e| e.seq).is_ok()
    }

    /// Sequence numbers of the entries registered by `anim`.
    pub fn seqs_of(&self, anim: AnimId) -> Vec<u64> {
        self.entries
            .iter()
            .filter(|e| matches!(e.body, EntryBody::Apply { anim: a, .. } if a == anim))
            .map(|e| e.seq)
            .collect()
    }

    /// Resting state at `t`: the most recent baseline starting at or before `t`, ignoring every
    /// animation entry.
    pub fn static_state(&self, t: f64) -> Option<&ItemData> {
        self.entries.iter().rev().find_map(|e| match &e.body {
            EntryBody::Baseline(data) if e.range.at <= t => Some(data),
            _ => None,
        })
    }

    /// Most recently committed baseline, whatever its start time.
    pub fn latest_baseline(&self) -> Option<&ItemData> {
        self.entries.iter().rev().find_map(|e| match &e.body {
            EntryBody::Baseline(data) => Some(data),
            EntryBody::Apply { .. } => None,
        })
    }

    pub(crate) fn remove_anim(&mut self, anim: AnimId) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|e| !matches!(e.body, EntryBody::Apply { anim: a, .. } if a == anim));
        before - self.entries.len()
    }

    /// Starting baseline and the entries to apply on top of it, in registration order.
    ///
    /// Only entries with `seq < stop` take part when `stop` is given.
    pub(crate) fn select(
        &self,
        t: f64,
        get_at_left: bool,
        stop: Option<u64>,
    ) -> KinemaResult<(&StackEntry, Vec<&StackEntry>)> {
        let visible = || {
            self.entries
                .iter()
                .filter(move |e| stop.is_none_or(|s| e.seq < s))
        };
        let is_baseline = |e: &&StackEntry| matches!(e.body, EntryBody::Baseline(_));

        let base = visible()
            .filter(is_baseline)
            .filter(|e| e.range.contains(t, get_at_left))
            .last()
            .or_else(|| visible().filter(is_baseline).filter(|e| e.range.at <= t).last())
            .or_else(|| visible().find(is_baseline))
            .ok_or_else(|| {
                KinemaError::stack_consistency("stack has no baseline before the requested entry")
            })?;

        let applies = visible()
            .filter(|e| e.seq > base.seq)
            .filter(|e| matches!(e.body, EntryBody::Apply { .. }))
            .filter(|e| e.range.contains(t, get_at_left))
            .collect();
        Ok((base, applies))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/stack.rs"]
mod tests;
