use std::any::Any;
use std::rc::Rc;

use crate::item::data::ItemData;
use crate::time::range::TimeRange;

/// Per-target payload producer, run once per target item when an updater begins.
pub type ExtraFn = Rc<dyn Fn(&ItemData) -> Rc<dyn Any>>;

/// What a user update function receives on every sample.
#[derive(Clone, Copy)]
pub struct UpdaterParams<'a> {
    /// Queried global time.
    pub global_t: f64,
    /// Progress for this target, after rate shaping and lag-ratio staggering.
    pub alpha: f64,
    /// The updater's range.
    pub range: TimeRange,
    /// Payload produced for this target at construction, if any.
    pub extra: Option<&'a dyn Any>,
}

impl<'a> UpdaterParams<'a> {
    /// Payload downcast to `T`.
    pub fn extra_as<T: 'static>(&self) -> Option<&'a T> {
        self.extra?.downcast_ref::<T>()
    }
}

impl std::fmt::Debug for UpdaterParams<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdaterParams")
            .field("global_t", &self.global_t)
            .field("alpha", &self.alpha)
            .field("range", &self.range)
            .field("extra", &self.extra.is_some())
            .finish()
    }
}

/// Staggered progress of target `index` out of `count`.
///
/// With `full = (count - 1) * lag_ratio + 1`, returns `clamp(alpha * full - index * lag_ratio)`:
/// later targets start later, and every target reaches 1 when `alpha` does.
pub fn lag_alpha(alpha: f64, index: usize, count: usize, lag_ratio: f64) -> f64 {
    if count <= 1 || lag_ratio == 0.0 {
        return alpha.clamp(0.0, 1.0);
    }
    let full = (count - 1) as f64 * lag_ratio + 1.0;
    (alpha * full - index as f64 * lag_ratio).clamp(0.0, 1.0)
}

#[cfg(test)]
#[path = "../../tests/unit/updater/params.rs"]
mod tests;
