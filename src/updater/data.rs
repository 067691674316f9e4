use std::any::Any;
use std::panic::Location;
use std::rc::Rc;

use crate::animation::anim::{AnimBase, AnimId, Animation};
use crate::animation::stack::{ApplyParams, StackApplier};
use crate::foundation::core::ObjectId;
use crate::foundation::error::{KinemaError, KinemaResult};
use crate::item::data::ItemData;
use crate::session::timeline::Timeline;
use crate::updater::params::{ExtraFn, UpdaterParams, lag_alpha};

/// User function run on one item's state at every sample.
pub type DataUpdateFn = Rc<dyn Fn(&mut ItemData, &UpdaterParams<'_>) -> anyhow::Result<()>>;

struct DataApplier {
    funcs: Rc<[DataUpdateFn]>,
    extra: Option<Rc<dyn Any>>,
    index: usize,
    count: usize,
    lag_ratio: f64,
    location: &'static Location<'static>,
}

impl StackApplier for DataApplier {
    fn apply(&self, data: &mut ItemData, p: &ApplyParams<'_>) -> KinemaResult<()> {
        let params = UpdaterParams {
            global_t: p.global_t,
            alpha: lag_alpha(p.alpha, self.index, self.count, self.lag_ratio),
            range: p.range,
            extra: self.extra.as_deref(),
        };
        for f in self.funcs.iter() {
            f(data, &params).map_err(|e| KinemaError::updater(self.location, &e))?;
        }
        Ok(())
    }
}

/// Runs a function on the data of an item (and, with `root_only(false)`, each descendant)
/// over a time range.
///
/// Each target gets its own stack entry with a lag-ratio staggered alpha. The function sees
/// the state produced by earlier entries, so successive updaters compose.
pub struct DataUpdater {
    base: AnimBase,
    item: ObjectId,
    funcs: Vec<DataUpdateFn>,
    extra: Option<ExtraFn>,
    lag_ratio: f64,
    show_at_begin: bool,
    hide_at_end: bool,
    become_at_end: bool,
    skip_null_items: bool,
    root_only: bool,
    location: &'static Location<'static>,
}

impl DataUpdater {
    /// Update `item` with `f`. Errors returned by `f` are reported with the caller's location.
    #[track_caller]
    pub fn new(
        item: ObjectId,
        f: impl Fn(&mut ItemData, &UpdaterParams<'_>) -> anyhow::Result<()> + 'static,
    ) -> Self {
        Self {
            base: AnimBase::new("DataUpdater"),
            item,
            funcs: vec![Rc::new(f) as DataUpdateFn],
            extra: None,
            lag_ratio: 0.0,
            show_at_begin: true,
            hide_at_end: false,
            become_at_end: true,
            skip_null_items: true,
            root_only: true,
            location: Location::caller(),
        }
    }

    /// Run `f` after the main function (and earlier post updaters) on every sample.
    pub fn add_post_updater(
        mut self,
        f: impl Fn(&mut ItemData, &UpdaterParams<'_>) -> anyhow::Result<()> + 'static,
    ) -> Self {
        self.funcs.push(Rc::new(f));
        self
    }

    /// Produce a per-target payload from each target's state at the start of the range.
    pub fn extra(mut self, f: impl Fn(&ItemData) -> Rc<dyn Any> + 'static) -> Self {
        self.extra = Some(Rc::new(f));
        self
    }

    /// Stagger factor between consecutive targets.
    pub fn lag_ratio(mut self, ratio: f64) -> Self {
        self.lag_ratio = ratio;
        self
    }

    /// Show the targets when the range starts (default `true`).
    pub fn show_at_begin(mut self, yes: bool) -> Self {
        self.show_at_begin = yes;
        self
    }

    /// Hide the targets when the range ends (default `false`).
    pub fn hide_at_end(mut self, yes: bool) -> Self {
        self.hide_at_end = yes;
        self
    }

    /// Commit the final state as the targets' resting state (default `true`).
    pub fn become_at_end(mut self, yes: bool) -> Self {
        self.become_at_end = yes;
        self
    }

    /// Leave out targets without points (default `true`).
    pub fn skip_null_items(mut self, yes: bool) -> Self {
        self.skip_null_items = yes;
        self
    }

    /// Only update `item` itself, not its descendants (default `true`).
    pub fn root_only(mut self, yes: bool) -> Self {
        self.root_only = yes;
        self
    }
}

impl Animation for DataUpdater {
    fn base(&self) -> &AnimBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut AnimBase {
        &mut self.base
    }

    fn begin(&mut self, id: AnimId, tl: &mut Timeline) -> KinemaResult<()> {
        let range = self.base.range()?;
        if !tl.scene().contains(self.item) {
            return Err(KinemaError::validation(format!(
                "no item to update under {:?}",
                self.item
            )));
        }
        let mut targets = if self.root_only {
            vec![self.item]
        } else {
            tl.scene().descendants(self.item, true)
        };
        if self.skip_null_items {
            targets.retain(|t| tl.scene().item(*t).is_ok_and(|d| !d.is_null()));
        }

        let funcs: Rc<[DataUpdateFn]> = self.funcs.clone().into();
        let count = targets.len();
        for (index, &target) in targets.iter().enumerate() {
            let extra = match &self.extra {
                Some(f) => Some(f(&tl.compute(target, range.at, false, false)?)),
                None => None,
            };
            let applier = DataApplier {
                funcs: Rc::clone(&funcs),
                extra,
                index,
                count,
                lag_ratio: self.lag_ratio,
                location: self.location,
            };
            tl.appearances_mut().push_apply(
                target,
                id,
                range,
                self.base.rate(),
                Rc::clone(&self.base.lifecycle),
                Rc::new(applier),
            )?;
        }

        if self.show_at_begin {
            tl.set_visible(&targets, range.at, true);
        }
        if self.become_at_end {
            tl.become_computed(&targets, range.end)?;
        }
        if self.hide_at_end {
            tl.set_visible(&targets, range.end, false);
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/updater/data.rs"]
mod tests;
