use std::panic::Location;
use std::rc::Rc;

use crate::animation::anim::{AnimBase, AnimId, Animation};
use crate::animation::lifecycle::Lifecycle;
use crate::foundation::core::ObjectId;
use crate::foundation::error::{KinemaError, KinemaResult};
use crate::item::tree::ItemTree;
use crate::render::registry::{RenderCall, RenderCtx, RenderSource};
use crate::session::timeline::Timeline;
use crate::time::range::{TimeRange, alpha_at};
use crate::time::rate::RateFunc;
use crate::updater::params::UpdaterParams;

/// User function producing a whole item tree per sample. `Ok(None)` means it produced nothing,
/// which is reported as a return-type error.
pub type ItemUpdateFn = Rc<dyn Fn(&UpdaterParams<'_>) -> anyhow::Result<Option<ItemTree>>>;

struct Producer {
    func: ItemUpdateFn,
    range: TimeRange,
    rate: RateFunc,
    lifecycle: Rc<Lifecycle>,
    location: &'static Location<'static>,
}

impl Producer {
    fn produce(&self, t: f64) -> KinemaResult<ItemTree> {
        let params = UpdaterParams {
            global_t: t,
            alpha: alpha_at(self.range, t, &self.rate),
            range: self.range,
            extra: None,
        };
        (self.func)(&params)
            .map_err(|e| KinemaError::updater(self.location, &e))?
            .ok_or_else(|| {
                KinemaError::updater_return_type(self.location, "updater produced no item")
            })
    }
}

impl RenderSource for Producer {
    fn render_calls(&self, t: f64, ctx: RenderCtx<'_>, out: &mut Vec<RenderCall>) {
        if !self.range.contains(t, false) || !self.lifecycle.note_interpolate() {
            return;
        }
        let calls = self.produce(t).and_then(|tree| {
            tree.nodes()
                .iter()
                .filter(|n| !n.data.is_null())
                .map(|n| ctx.renderers.call_for(ctx.kinds, None, n.data.clone()))
                .collect::<KinemaResult<Vec<_>>>()
        });
        match calls {
            Ok(calls) => out.extend(calls),
            Err(err) => self.lifecycle.fail(err),
        }
    }
}

/// Renders the output of a function of time in place of an item.
///
/// While the range runs, the original item (if any) is hidden and the function's tree is
/// rendered directly. At the end the item can take over the final tree.
pub struct ItemUpdater {
    base: AnimBase,
    item: Option<ObjectId>,
    func: ItemUpdateFn,
    hide_on_begin: bool,
    show_at_end: bool,
    become_at_end: bool,
    location: &'static Location<'static>,
    producer: Option<Rc<Producer>>,
}

impl ItemUpdater {
    /// Render `f`'s output, standing in for `item` when given.
    #[track_caller]
    pub fn new(
        item: Option<ObjectId>,
        f: impl Fn(&UpdaterParams<'_>) -> anyhow::Result<Option<ItemTree>> + 'static,
    ) -> Self {
        Self {
            base: AnimBase::new("ItemUpdater"),
            item,
            func: Rc::new(f),
            hide_on_begin: true,
            show_at_end: true,
            become_at_end: true,
            location: Location::caller(),
            producer: None,
        }
    }

    /// Hide the original item while the range runs (default `true`).
    pub fn hide_on_begin(mut self, yes: bool) -> Self {
        self.hide_on_begin = yes;
        self
    }

    /// Show the original item again at the end (default `true`).
    pub fn show_at_end(mut self, yes: bool) -> Self {
        self.show_at_end = yes;
        self
    }

    /// Replace the original item with the final tree (default `true`).
    pub fn become_at_end(mut self, yes: bool) -> Self {
        self.become_at_end = yes;
        self
    }
}

impl Animation for ItemUpdater {
    fn base(&self) -> &AnimBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut AnimBase {
        &mut self.base
    }

    fn begin(&mut self, _id: AnimId, tl: &mut Timeline) -> KinemaResult<()> {
        let range = self.base.range()?;
        let producer = Rc::new(Producer {
            func: Rc::clone(&self.func),
            range,
            rate: self.base.rate(),
            lifecycle: Rc::clone(&self.base.lifecycle),
            location: self.location,
        });
        // Surface a wrong output right away instead of at the first rendered frame.
        producer.produce(range.at)?;

        if let (Some(item), true) = (self.item, self.hide_on_begin) {
            let family = tl.scene().descendants(item, true);
            tl.set_visible(&family, range.at, false);
        }
        tl.add_render_source(Rc::clone(&producer) as Rc<dyn RenderSource>);

        if let Some(item) = self.item {
            if self.become_at_end {
                let tree = producer.produce(range.end)?;
                tl.become_tree_at(item, &tree, range.end)?;
            }
            if self.show_at_end {
                let family = tl.scene().descendants(item, true);
                tl.set_visible(&family, range.end, true);
            }
        }
        self.producer = Some(producer);
        Ok(())
    }

    fn cleanup(&mut self) {
        self.producer = None;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/updater/item.rs"]
mod tests;
