use std::rc::Rc;

use slotmap::SecondaryMap;

use crate::animation::anim::AnimId;
use crate::animation::lifecycle::Lifecycle;
use crate::animation::stack::{AnimStack, ApplyParams, EntryBody, StackApplier, StackEntry};
use crate::foundation::core::ObjectId;
use crate::foundation::error::{KinemaError, KinemaResult};
use crate::item::data::ItemData;
use crate::time::range::{TimeRange, alpha_at};
use crate::time::rate::RateFunc;

/// Time-indexed appearance of every tracked item: its anim stack and its visibility toggles.
///
/// Sequence numbers are global across stacks, so "registered before" has the same meaning for
/// every item.
#[derive(Debug, Default)]
pub struct Appearances {
    stacks: SecondaryMap<ObjectId, AnimStack>,
    visibility: SecondaryMap<ObjectId, Vec<(f64, bool)>>,
    next_seq: u64,
    generation: u64,
}

impl Appearances {
    /// Create an empty set of appearances.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking `item` with `data` as its resting state from `t` on.
    ///
    /// Returns `false` if the item was already tracked (nothing changes then).
    pub fn track(&mut self, item: ObjectId, data: &ItemData, t: f64) -> bool {
        if self.stacks.contains_key(item) {
            return false;
        }
        self.stacks.insert(item, AnimStack::default());
        self.push_baseline_unchecked(item, t, data.clone());
        true
    }

    pub fn is_tracked(&self, item: ObjectId) -> bool {
        self.stacks.contains_key(item)
    }

    pub fn stack(&self, item: ObjectId) -> KinemaResult<&AnimStack> {
        self.stacks
            .get(item)
            .ok_or(KinemaError::UnknownObject(item))
    }

    pub fn items(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.stacks.keys()
    }

    /// Counter bumped on every structural change of any stack.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Register an animation entry on `item`'s stack. Returns its sequence number.
    pub fn push_apply(
        &mut self,
        item: ObjectId,
        anim: AnimId,
        range: TimeRange,
        rate: RateFunc,
        lifecycle: Rc<Lifecycle>,
        applier: Rc<dyn StackApplier>,
    ) -> KinemaResult<u64> {
        let seq = self.next_seq;
        let stack = self
            .stacks
            .get_mut(item)
            .ok_or(KinemaError::UnknownObject(item))?;
        stack.push(StackEntry {
            seq,
            range,
            body: EntryBody::Apply {
                anim,
                rate,
                lifecycle,
                applier,
            },
        });
        self.next_seq += 1;
        self.generation += 1;
        Ok(seq)
    }

    /// Commit `data` as `item`'s resting state from `t` on, covering earlier entries.
    pub fn push_baseline(&mut self, item: ObjectId, t: f64, data: ItemData) -> KinemaResult<u64> {
        if !self.stacks.contains_key(item) {
            return Err(KinemaError::UnknownObject(item));
        }
        Ok(self.push_baseline_unchecked(item, t, data))
    }

    fn push_baseline_unchecked(&mut self, item: ObjectId, t: f64, data: ItemData) -> u64 {
        let seq = self.next_seq;
        if let Some(stack) = self.stacks.get_mut(item) {
            stack.push(StackEntry {
                seq,
                range: TimeRange::unbounded(t),
                body: EntryBody::Baseline(data),
            });
        }
        self.next_seq += 1;
        self.generation += 1;
        seq
    }

    /// Compare `live` with the most recently committed baseline and commit it as a new
    /// baseline at `t` when it differs (bit for bit) or when `force` is set. Returns whether a
    /// baseline was committed.
    ///
    /// Animations commit their final state ahead of the cursor, so the live state is compared
    /// with the latest commit rather than with the state in effect at `t`.
    pub fn detect_change(
        &mut self,
        item: ObjectId,
        live: &ItemData,
        t: f64,
        force: bool,
    ) -> KinemaResult<bool> {
        let unchanged = self
            .stack(item)?
            .latest_baseline()
            .is_some_and(|s| s.fingerprint() == live.fingerprint());
        if unchanged && !force {
            return Ok(false);
        }
        self.push_baseline(item, t, live.clone())?;
        tracing::debug!(?item, t, force, "baseline committed");
        Ok(true)
    }

    /// Remove every entry `anim` registered. Returns how many entries went away.
    pub fn cancel(&mut self, anim: AnimId) -> usize {
        let removed: usize = self
            .stacks
            .values_mut()
            .map(|s| s.remove_anim(anim))
            .sum();
        if removed > 0 {
            self.generation += 1;
        }
        removed
    }

    /// Stop tracking `item`.
    pub fn forget(&mut self, item: ObjectId) {
        self.stacks.remove(item);
        self.visibility.remove(item);
        self.generation += 1;
    }

    /// State of `item` at global time `t`.
    ///
    /// Starts from the baseline in effect and applies, in registration order, every later entry
    /// whose range contains `t` (`(at, end]` when `get_at_left`, `[at, end)` otherwise). An entry
    /// that fails is moved to the error-terminal state and skipped; the rest still apply.
    pub fn compute(
        &self,
        item: ObjectId,
        t: f64,
        for_rendering: bool,
        get_at_left: bool,
    ) -> KinemaResult<ItemData> {
        self.compute_inner(item, t, for_rendering, get_at_left, None, false)
    }

    /// Like [`Appearances::compute`], but an entry failing during this computation is an error
    /// instead of being skipped. The failing animation still moves to the error-terminal state.
    pub fn compute_strict(
        &self,
        item: ObjectId,
        t: f64,
        for_rendering: bool,
        get_at_left: bool,
    ) -> KinemaResult<ItemData> {
        self.compute_inner(item, t, for_rendering, get_at_left, None, true)
    }

    /// Like [`Appearances::compute`], considering only entries registered before `stop_seq`.
    ///
    /// Fails with [`KinemaError::StackConsistency`] when `stop_seq` is not an entry of `item`'s
    /// stack (it was cancelled or belongs to another item).
    pub fn compute_until(
        &self,
        item: ObjectId,
        t: f64,
        for_rendering: bool,
        get_at_left: bool,
        stop_seq: u64,
    ) -> KinemaResult<ItemData> {
        if !self.stack(item)?.contains_seq(stop_seq) {
            return Err(KinemaError::stack_consistency(format!(
                "entry {stop_seq} is not registered on {item:?}"
            )));
        }
        self.compute_inner(item, t, for_rendering, get_at_left, Some(stop_seq), false)
    }

    fn compute_inner(
        &self,
        item: ObjectId,
        t: f64,
        for_rendering: bool,
        get_at_left: bool,
        stop: Option<u64>,
        strict: bool,
    ) -> KinemaResult<ItemData> {
        let (base, applies) = self.stack(item)?.select(t, get_at_left, stop)?;
        let EntryBody::Baseline(base) = &base.body else {
            return Err(KinemaError::stack_consistency("selected base is not a baseline"));
        };
        let mut data = base.clone();

        for entry in applies {
            let EntryBody::Apply {
                rate,
                lifecycle,
                applier,
                ..
            } = &entry.body
            else {
                continue;
            };
            if !lifecycle.note_interpolate() {
                continue;
            }
            let params = ApplyParams {
                item,
                seq: entry.seq,
                global_t: t,
                alpha: alpha_at(entry.range, t, rate),
                range: entry.range,
                for_rendering,
                get_at_left,
                appearances: self,
            };
            let mut scratch = data.clone();
            match applier.apply(&mut scratch, &params) {
                Ok(()) => data = scratch,
                Err(err) => {
                    lifecycle.fail(err);
                    if strict {
                        return Err(KinemaError::lifecycle(format!(
                            "`{}` failed while computing {item:?} at {t}: {}",
                            lifecycle.label(),
                            lifecycle.error_message().unwrap_or_default()
                        )));
                    }
                }
            }
        }
        Ok(data)
    }

    /// Resting state of `item` at `t`, ignoring running animations.
    pub fn static_state(&self, item: ObjectId, t: f64) -> KinemaResult<&ItemData> {
        self.stack(item)?.static_state(t).ok_or_else(|| {
            KinemaError::stack_consistency(format!("{item:?} has no baseline at or before {t}"))
        })
    }

    /// Show or hide `item` from `t` on, until the next recorded change. A change already
    /// recorded at exactly `t` is replaced.
    pub fn set_visible(&mut self, item: ObjectId, t: f64, visible: bool) {
        if !self.visibility.contains_key(item) {
            self.visibility.insert(item, Vec::new());
        }
        let Some(records) = self.visibility.get_mut(item) else {
            return;
        };
        let idx = records.partition_point(|(at, _)| *at < t);
        match records.get_mut(idx) {
            Some(rec) if rec.0 == t => rec.1 = visible,
            _ => records.insert(idx, (t, visible)),
        }
    }

    /// Whether `item` is shown at `t`: the last change at or before `t` wins. Items start
    /// hidden.
    pub fn is_visible(&self, item: ObjectId, t: f64) -> bool {
        let Some(records) = self.visibility.get(item) else {
            return false;
        };
        let idx = records.partition_point(|(at, _)| *at <= t);
        idx > 0 && records[idx - 1].1
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/appearance.rs"]
mod tests;
