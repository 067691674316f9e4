use crate::animation::anim::{AnimBase, AnimId, Animation};
use crate::foundation::error::{KinemaError, KinemaResult};
use crate::session::config::TimelineConfig;
use crate::session::timeline::Timeline;
use crate::time::range::TimeRange;

/// Plays several animations as one, each starting `lag_ratio` of the previous one's duration
/// after it.
///
/// With an explicit run time the natural layout is rescaled to fit it. Members keep their own
/// rate functions.
pub struct AnimGroup {
    base: AnimBase,
    children: Vec<Box<dyn Animation>>,
    lag_ratio: Option<f64>,
    child_ids: Vec<AnimId>,
}

impl AnimGroup {
    /// Group `children`, played together unless a lag ratio is set.
    pub fn new(children: Vec<Box<dyn Animation>>) -> Self {
        Self {
            base: AnimBase::new("AnimGroup"),
            children,
            lag_ratio: None,
            child_ids: Vec::new(),
        }
    }

    /// Play `children` one after the other.
    pub fn succession(children: Vec<Box<dyn Animation>>) -> Self {
        Self::new(children).lag_ratio(1.0)
    }

    /// Delay between member starts, as a fraction of the previous member's duration.
    pub fn lag_ratio(mut self, ratio: f64) -> Self {
        self.lag_ratio = Some(ratio);
        self
    }

    /// Offsets `(start, duration)` of every member relative to the group start, and the total.
    fn layout(&self, config: &TimelineConfig) -> (Vec<(f64, f64)>, f64) {
        let lag = self.lag_ratio.unwrap_or(config.default_lag_ratio);
        let mut at = 0.0;
        let mut total: f64 = 0.0;
        let mut slots = Vec::with_capacity(self.children.len());
        for child in &self.children {
            let d = child.duration(config);
            slots.push((at, d));
            total = total.max(at + d);
            at += d * lag;
        }
        (slots, total)
    }
}

impl Animation for AnimGroup {
    fn base(&self) -> &AnimBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut AnimBase {
        &mut self.base
    }

    fn duration(&self, config: &TimelineConfig) -> f64 {
        self.base
            .run_time
            .unwrap_or_else(|| self.layout(config).1)
    }

    fn begin(&mut self, _id: AnimId, tl: &mut Timeline) -> KinemaResult<()> {
        let range = self.base.range()?;
        if self.lag_ratio.is_some_and(|l| !(l.is_finite() && l >= 0.0)) {
            return Err(KinemaError::validation("lag ratio must be finite and >= 0"));
        }
        let (slots, total) = self.layout(tl.config());
        let scale = if total > 0.0 {
            range.duration() / total
        } else {
            0.0
        };

        for (child, (at, d)) in std::mem::take(&mut self.children).into_iter().zip(slots) {
            let child_range = TimeRange::new(range.at + at * scale, range.at + (at + d) * scale)?;
            match tl.prepare_with_range(child, child_range) {
                Ok(id) => self.child_ids.push(id),
                Err(err) => {
                    for &id in &self.child_ids {
                        tl.cancel(id)?;
                    }
                    return Err(err);
                }
            }
        }
        Ok(())
    }

    fn sub_anims(&self) -> &[AnimId] {
        &self.child_ids
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/group.rs"]
mod tests;
