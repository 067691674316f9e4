use std::rc::Rc;

use crate::animation::lifecycle::Lifecycle;
use crate::animation::stack::{ApplyParams, StackApplier};
use crate::foundation::core::{ObjectId, Point, Rgba8Premul, Vec2};
use crate::foundation::error::{KinemaError, KinemaResult};
use crate::item::data::ItemData;
use crate::session::config::TimelineConfig;
use crate::session::timeline::Timeline;
use crate::time::range::TimeRange;
use crate::time::rate::RateFunc;

/// Linear interpolation between two values of the same type.
pub trait Lerp: Sized {
    /// Value at `t` between `a` (`t = 0`) and `b` (`t = 1`).
    fn lerp(a: &Self, b: &Self, t: f64) -> Self;
}

impl Lerp for f64 {
    fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        a + (b - a) * t
    }
}

impl Lerp for Vec2 {
    fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        Vec2::new(a.x + (b.x - a.x) * t, a.y + (b.y - a.y) * t)
    }
}

impl Lerp for Point {
    fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        a.lerp(*b, t)
    }
}

impl Lerp for Rgba8Premul {
    fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        fn lerp_u8(a: u8, b: u8, t: f64) -> u8 {
            let a = f64::from(a);
            let b = f64::from(b);
            (a + (b - a) * t).round().clamp(0.0, 255.0) as u8
        }

        Self {
            r: lerp_u8(a.r, b.r, t),
            g: lerp_u8(a.g, b.g, t),
            b: lerp_u8(a.b, b.b, t),
            a: lerp_u8(a.a, b.a, t),
        }
    }
}

/// Identifier of an animation registered on a [`Timeline`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AnimId(pub(crate) u32);

/// State shared by every animation: timing, rate and lifecycle.
#[derive(Debug)]
pub struct AnimBase {
    pub(crate) run_time: Option<f64>,
    pub(crate) rate: Option<RateFunc>,
    pub(crate) range: Option<TimeRange>,
    pub(crate) lifecycle: Rc<Lifecycle>,
}

impl AnimBase {
    /// Fresh base labelled `label` (shown in diagnostics and logs).
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            run_time: None,
            rate: None,
            range: None,
            lifecycle: Rc::new(Lifecycle::new(label)),
        }
    }

    /// Global range, available once the animation was prepared on a timeline.
    pub fn range(&self) -> KinemaResult<TimeRange> {
        self.range.ok_or_else(|| {
            KinemaError::lifecycle(format!(
                "`{}` has no time range before it is prepared",
                self.lifecycle.label()
            ))
        })
    }

    /// Rate function, defaulting to linear when none was chosen.
    pub fn rate(&self) -> RateFunc {
        self.rate.clone().unwrap_or_default()
    }

    /// Shared lifecycle handle.
    pub fn lifecycle(&self) -> &Rc<Lifecycle> {
        &self.lifecycle
    }
}

/// A unit of change over a time range.
///
/// [`Timeline::prepare`] assigns the range, moves the lifecycle to `Began` and calls
/// [`Animation::begin`], which registers stack entries and commits end-of-range baselines.
/// [`Animation::finish`] runs once the construction cursor reaches the end of the range.
pub trait Animation {
    fn base(&self) -> &AnimBase;

    fn base_mut(&mut self) -> &mut AnimBase;

    /// Run time in seconds when laid out without an explicit range.
    fn duration(&self, config: &TimelineConfig) -> f64 {
        self.base().run_time.unwrap_or(config.default_run_time)
    }

    /// Register this animation's effect. The range is already assigned.
    fn begin(&mut self, id: AnimId, tl: &mut Timeline) -> KinemaResult<()>;

    /// Hook run when the cursor reaches the end of the range.
    fn finish(&mut self, _tl: &mut Timeline) -> KinemaResult<()> {
        Ok(())
    }

    /// Release per-animation resources.
    fn cleanup(&mut self) {}

    /// Animations this one registered on its own behalf (group members).
    fn sub_anims(&self) -> &[AnimId] {
        &[]
    }

    /// Set the run time in seconds.
    fn run_time(mut self, secs: f64) -> Self
    where
        Self: Sized,
    {
        self.base_mut().run_time = Some(secs);
        self
    }

    /// Set the rate function.
    fn rate(mut self, rate: impl Into<RateFunc>) -> Self
    where
        Self: Sized,
    {
        self.base_mut().rate = Some(rate.into());
        self
    }
}

struct SnapshotLerp {
    before: ItemData,
    after: ItemData,
}

impl StackApplier for SnapshotLerp {
    fn apply(&self, data: &mut ItemData, params: &ApplyParams<'_>) -> KinemaResult<()> {
        *data = ItemData::lerp(&self.before, &self.after, params.alpha);
        Ok(())
    }
}

/// Interpolates an item from its state at the start of the range to an edited copy of it.
///
/// Both snapshots are captured when the animation begins. Unless [`Interpolate::become_at_end`]
/// is turned off, the edited state is committed right away as the item's resting state from
/// the end of the range on.
pub struct Interpolate {
    base: AnimBase,
    item: ObjectId,
    edit: Option<Box<dyn FnOnce(&mut ItemData)>>,
    become_at_end: bool,
}

impl Interpolate {
    /// Animate `item` towards the result of `edit` applied to its current state.
    pub fn new(item: ObjectId, edit: impl FnOnce(&mut ItemData) + 'static) -> Self {
        Self {
            base: AnimBase::new("Interpolate"),
            item,
            edit: Some(Box::new(edit)),
            become_at_end: true,
        }
    }

    /// Whether the final state replaces the item's resting state.
    pub fn become_at_end(mut self, yes: bool) -> Self {
        self.become_at_end = yes;
        self
    }
}

impl Animation for Interpolate {
    fn base(&self) -> &AnimBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut AnimBase {
        &mut self.base
    }

    fn begin(&mut self, id: AnimId, tl: &mut Timeline) -> KinemaResult<()> {
        let range = self.base.range()?;
        let before = tl.compute(self.item, range.at, false, false)?;
        let mut after = before.clone();
        if let Some(edit) = self.edit.take() {
            edit(&mut after);
        }
        tl.appearances_mut().push_apply(
            self.item,
            id,
            range,
            self.base.rate(),
            Rc::clone(&self.base.lifecycle),
            Rc::new(SnapshotLerp { before, after }),
        )?;
        if self.become_at_end {
            tl.become_computed(&[self.item], range.end)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/anim.rs"]
mod tests;
