use std::rc::Rc;

use crate::animation::anim::{AnimId, Animation};
use crate::animation::appearance::Appearances;
use crate::animation::lifecycle::{Lifecycle, LifecycleState};
use crate::foundation::core::{FrameIndex, FrameRange, ObjectId};
use crate::foundation::error::{KinemaError, KinemaResult};
use crate::item::data::ItemData;
use crate::item::scene::Scene;
use crate::item::tree::ItemTree;
use crate::render::registry::{RenderCall, RenderCtx, RenderSource, RendererRegistry};
use crate::session::config::TimelineConfig;
use crate::time::range::TimeRange;
use crate::time::schedule::Schedule;

/// Render calls of one time sample.
#[derive(Debug, Default)]
pub struct FrameCalls {
    /// Sampled global time.
    pub t: f64,
    /// Calls in scene order, generated output last.
    pub calls: Vec<RenderCall>,
    /// Failures met while sampling. Unrelated items are still rendered.
    pub errors: Vec<String>,
}

/// An animation that ended in the error-terminal state.
#[derive(Clone, Debug, PartialEq)]
pub struct Diagnostic {
    /// Failed animation.
    pub anim: AnimId,
    pub label: String,
    /// Rendered error.
    pub message: String,
}

/// Construction-and-query session: a scene, the anim stacks of its items and a construction
/// cursor.
///
/// Construction moves the cursor forward (`play`, `forward`), registering animations and
/// running scheduled tasks in time order. Queries (`state_at`, `render_calls_at`) are pure
/// reads of the stacks at any time, in any order. Do not mix the two for one item: stacks
/// must not change while a query for it is running.
pub struct Timeline {
    config: TimelineConfig,
    scene: Scene,
    appearances: Appearances,
    renderers: RendererRegistry,
    schedule: Schedule<Timeline>,
    current_time: f64,
    end_time: f64,
    anims: Vec<Option<Box<dyn Animation>>>,
    lifecycles: Vec<Rc<Lifecycle>>,
    sources: Vec<Rc<dyn RenderSource>>,
}

impl std::fmt::Debug for Timeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Timeline")
            .field("current_time", &self.current_time)
            .field("end_time", &self.end_time)
            .field("anims", &self.anims.len())
            .field("pending", &self.schedule.len())
            .field("sources", &self.sources.len())
            .finish()
    }
}

impl Timeline {
    /// Create a session with an empty scene.
    pub fn new(config: TimelineConfig) -> KinemaResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            scene: Scene::new()?,
            appearances: Appearances::new(),
            renderers: RendererRegistry::new(),
            schedule: Schedule::new(),
            current_time: 0.0,
            end_time: 0.0,
            anims: Vec::new(),
            lifecycles: Vec::new(),
            sources: Vec::new(),
        })
    }

    pub fn config(&self) -> &TimelineConfig {
        &self.config
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Live scene, mutably. Edits are committed as baselines at the next construction step.
    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    /// Anim stacks and visibility of every tracked item.
    pub fn appearances(&self) -> &Appearances {
        &self.appearances
    }

    /// Anim stacks, mutably (for custom animations).
    pub fn appearances_mut(&mut self) -> &mut Appearances {
        &mut self.appearances
    }

    pub fn renderers(&self) -> &RendererRegistry {
        &self.renderers
    }

    pub fn renderers_mut(&mut self) -> &mut RendererRegistry {
        &mut self.renderers
    }

    /// Construction cursor.
    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    /// Latest instant anything happens at: the cursor or the end of the last finite range.
    pub fn duration(&self) -> f64 {
        self.current_time.max(self.end_time)
    }

    /// Spawn an item and start tracking it at the cursor. It stays hidden until shown.
    pub fn spawn(&mut self, data: ItemData) -> KinemaResult<ObjectId> {
        let id = self.scene.spawn(data)?;
        self.track(id)?;
        Ok(id)
    }

    /// Remove an item from the scene and drop its stack.
    pub fn despawn(&mut self, id: ObjectId) -> KinemaResult<()> {
        self.scene.despawn(id)?;
        self.appearances.forget(id);
        Ok(())
    }

    fn track(&mut self, id: ObjectId) -> KinemaResult<bool> {
        let data = self.scene.item(id)?;
        Ok(self.appearances.track(id, data, self.current_time))
    }

    /// Show `id` and its descendants from the cursor on.
    pub fn show(&mut self, id: ObjectId) -> KinemaResult<()> {
        self.set_family_visible(id, true)
    }

    /// Hide `id` and its descendants from the cursor on.
    pub fn hide(&mut self, id: ObjectId) -> KinemaResult<()> {
        self.set_family_visible(id, false)
    }

    fn set_family_visible(&mut self, id: ObjectId, visible: bool) -> KinemaResult<()> {
        self.detect_changes_of_all()?;
        let family = self.scene.descendants(id, true);
        if family.is_empty() {
            return Err(KinemaError::UnknownObject(id));
        }
        self.set_visible(&family, self.current_time, visible);
        Ok(())
    }

    /// Show or hide exactly `items` from `t` on.
    pub fn set_visible(&mut self, items: &[ObjectId], t: f64, visible: bool) {
        for &id in items {
            self.appearances.set_visible(id, t, visible);
        }
    }

    /// Run `task` once the cursor reaches `at`. Same-instant tasks run in registration order.
    pub fn schedule(&mut self, at: f64, task: impl FnOnce(&mut Timeline) + 'static) {
        self.schedule.schedule(at, Box::new(task));
    }

    /// Move the cursor by `dt` seconds.
    pub fn forward(&mut self, dt: f64) -> KinemaResult<()> {
        self.forward_to(self.current_time + dt)
    }

    /// Move the cursor to `t`, committing live edits first and running every task due on the
    /// way with the cursor set to the task's instant.
    pub fn forward_to(&mut self, t: f64) -> KinemaResult<()> {
        if t.is_nan() || t < self.current_time {
            return Err(KinemaError::validation(format!(
                "cannot move the cursor back from {} to {t}",
                self.current_time
            )));
        }
        self.detect_changes_of_all()?;
        while let Some((at, task)) = self.schedule.pop_due(t) {
            self.current_time = self.current_time.max(at);
            task(self);
        }
        self.current_time = t;
        Ok(())
    }

    /// Register `anim` starting at the cursor, without moving the cursor.
    pub fn prepare(&mut self, anim: impl Animation + 'static) -> KinemaResult<AnimId> {
        self.prepare_boxed(Box::new(anim))
    }

    /// [`Timeline::prepare`] for an already boxed animation.
    pub fn prepare_boxed(&mut self, anim: Box<dyn Animation>) -> KinemaResult<AnimId> {
        self.prepare_boxed_at(anim, self.current_time)
    }

    /// Register `anim` starting at `at`, which may lie ahead of the cursor.
    pub fn prepare_at(&mut self, anim: impl Animation + 'static, at: f64) -> KinemaResult<AnimId> {
        self.prepare_boxed_at(Box::new(anim), at)
    }

    fn prepare_boxed_at(&mut self, anim: Box<dyn Animation>, at: f64) -> KinemaResult<AnimId> {
        self.detect_changes_of_all()?;
        let range = TimeRange::with_duration(at, anim.duration(&self.config))?;
        self.prepare_with_range(anim, range)
    }

    /// Register `anim` over an explicit global `range`.
    pub fn prepare_with_range(
        &mut self,
        mut anim: Box<dyn Animation>,
        range: TimeRange,
    ) -> KinemaResult<AnimId> {
        let id = AnimId(
            u32::try_from(self.anims.len())
                .map_err(|_| KinemaError::validation("too many animations"))?,
        );
        let base = anim.base_mut();
        base.range = Some(range);
        if base.rate.is_none() {
            base.rate = Some(self.config.default_rate.into());
        }
        let lifecycle = Rc::clone(anim.base().lifecycle());
        lifecycle.begin()?;
        self.lifecycles.push(Rc::clone(&lifecycle));
        self.anims.push(None);

        let begun = anim.begin(id, self);
        if begun.is_err() || lifecycle.is_errored() {
            self.appearances.cancel(id);
            if let Err(err) = begun {
                lifecycle.fail(err);
            }
            self.anims[id.0 as usize] = Some(anim);
            return Err(lifecycle.take_error().unwrap_or_else(|| {
                KinemaError::lifecycle(format!("`{}` failed to begin", lifecycle.label()))
            }));
        }
        tracing::debug!(anim = lifecycle.label(), at = range.at, end = range.end, "prepared");

        self.anims[id.0 as usize] = Some(anim);
        if range.end.is_finite() {
            self.end_time = self.end_time.max(range.end);
            self.schedule(range.end, move |tl| tl.finish_anim(id));
        }
        Ok(id)
    }

    fn finish_anim(&mut self, id: AnimId) {
        let Some(mut anim) = self.anims.get_mut(id.0 as usize).and_then(Option::take) else {
            return;
        };
        let lifecycle = Rc::clone(anim.base().lifecycle());
        if matches!(
            lifecycle.state(),
            LifecycleState::Began | LifecycleState::Interpolating
        ) {
            if let Err(err) = anim.finish(self) {
                lifecycle.fail(err);
            }
        }
        if let Err(err) = lifecycle.finish() {
            tracing::warn!(anim = lifecycle.label(), error = %err, "finish out of order");
        }
        self.anims[id.0 as usize] = Some(anim);
    }

    /// Register `anim` at the cursor and move the cursor to its end.
    #[tracing::instrument(skip(self, anim))]
    pub fn play(&mut self, anim: impl Animation + 'static) -> KinemaResult<AnimId> {
        let id = self.prepare(anim)?;
        let end = self.range_of(id)?.end;
        if end.is_finite() {
            self.forward_to(end)?;
        }
        Ok(id)
    }

    /// Register every animation at the cursor and move the cursor to the latest end.
    #[tracing::instrument(skip(self, anims), fields(count = anims.len()))]
    pub fn play_all(&mut self, anims: Vec<Box<dyn Animation>>) -> KinemaResult<Vec<AnimId>> {
        let mut ids = Vec::with_capacity(anims.len());
        let mut end = self.current_time;
        for anim in anims {
            let id = self.prepare_boxed(anim)?;
            let r = self.range_of(id)?;
            if r.end.is_finite() {
                end = end.max(r.end);
            }
            ids.push(id);
        }
        self.forward_to(end)?;
        Ok(ids)
    }

    /// Global range assigned to `id`.
    pub fn range_of(&self, id: AnimId) -> KinemaResult<TimeRange> {
        self.anims
            .get(id.0 as usize)
            .and_then(Option::as_ref)
            .ok_or_else(|| KinemaError::validation(format!("unknown animation {id:?}")))?
            .base()
            .range()
    }

    pub fn anim_state(&self, id: AnimId) -> Option<LifecycleState> {
        self.lifecycles.get(id.0 as usize).map(|l| l.state())
    }

    /// Commit every item's live state at the cursor where it differs from its resting state.
    /// Untracked items start being tracked. Returns the number of baselines committed.
    pub fn detect_changes_of_all(&mut self) -> KinemaResult<usize> {
        let mut committed = 0;
        for id in self.scene.item_ids().to_vec() {
            if self.track(id)? {
                continue;
            }
            if self.detect_change(id, false)? {
                committed += 1;
            }
        }
        Ok(committed)
    }

    /// Commit `id`'s live state at the cursor if it changed, or unconditionally with `force`.
    pub fn detect_change(&mut self, id: ObjectId, force: bool) -> KinemaResult<bool> {
        let live = self.scene.item(id)?;
        self.appearances
            .detect_change(id, live, self.current_time, force)
    }

    /// Make the stack-computed left-limit state at `t` the live and resting state of `items`.
    ///
    /// Nothing is committed if any entry fails while computing those states.
    pub fn become_computed(&mut self, items: &[ObjectId], t: f64) -> KinemaResult<()> {
        let states = items
            .iter()
            .map(|&id| self.appearances.compute_strict(id, t, false, true))
            .collect::<KinemaResult<Vec<_>>>()?;
        for (&id, data) in items.iter().zip(states) {
            self.scene.set_item(id, data.clone())?;
            self.appearances.detect_change(id, &data, t, true)?;
        }
        Ok(())
    }

    /// Replace `root`'s subtree with `tree` and commit the result as resting state at `t`.
    pub fn become_tree_at(&mut self, root: ObjectId, tree: &ItemTree, t: f64) -> KinemaResult<()> {
        self.scene.become_tree(root, tree)?;
        for id in self.scene.descendants(root, true) {
            let live = self.scene.item(id)?;
            if !self.appearances.track(id, live, t) {
                self.appearances.detect_change(id, live, t, true)?;
            }
        }
        Ok(())
    }

    /// Add a producer of render calls that bypasses the stacks.
    pub fn add_render_source(&mut self, source: Rc<dyn RenderSource>) {
        self.sources.push(source);
    }

    /// State of `item` at `t`; see [`Appearances::compute`].
    pub fn compute(
        &self,
        item: ObjectId,
        t: f64,
        for_rendering: bool,
        get_at_left: bool,
    ) -> KinemaResult<ItemData> {
        self.appearances.compute(item, t, for_rendering, get_at_left)
    }

    /// Authoritative state of `item` at `t`, from the requested side of a boundary.
    #[tracing::instrument(skip(self))]
    pub fn state_at(&self, item: ObjectId, t: f64, get_at_left: bool) -> KinemaResult<ItemData> {
        self.compute(item, t, false, get_at_left)
    }

    /// Render calls of every item visible at `t`, then of the extra sources.
    ///
    /// A failing item or animation is reported in [`FrameCalls::errors`] and skipped.
    #[tracing::instrument(skip(self))]
    pub fn render_calls_at(&self, t: f64) -> FrameCalls {
        let errored_before: Vec<bool> = self.lifecycles.iter().map(|l| l.is_errored()).collect();
        let kinds = self.scene.kinds();
        let mut frame = FrameCalls {
            t,
            ..FrameCalls::default()
        };

        for &id in self.scene.item_ids() {
            if !self.appearances.is_visible(id, t) {
                continue;
            }
            let data = match self.compute(id, t, true, false) {
                Ok(d) if d.is_null() => continue,
                Ok(d) => d,
                Err(err) => {
                    frame.errors.push(err.to_string());
                    continue;
                }
            };
            match self.renderers.call_for(kinds, Some(id), data) {
                Ok(call) => frame.calls.push(call),
                Err(err) => frame.errors.push(err.to_string()),
            }
        }

        let ctx = RenderCtx {
            renderers: &self.renderers,
            kinds,
        };
        for source in &self.sources {
            source.render_calls(t, ctx, &mut frame.calls);
        }

        for (lifecycle, was) in self.lifecycles.iter().zip(errored_before) {
            if lifecycle.is_errored() && !was {
                frame
                    .errors
                    .extend(lifecycle.error_message());
            }
        }
        frame
    }

    /// [`Timeline::render_calls_at`] for the first instant of `frame`.
    pub fn render_calls_at_frame(&self, frame: FrameIndex) -> FrameCalls {
        self.render_calls_at(self.config.fps.frame_to_secs(frame))
    }

    /// Frames covering [`Timeline::duration`].
    pub fn frames(&self) -> FrameRange {
        let end = self.config.fps.secs_to_frames_floor(self.duration());
        FrameRange {
            start: FrameIndex(0),
            end: FrameIndex(end),
        }
    }

    /// Remove `id` from every stack and stop it for good. Returns the number of stack entries
    /// removed.
    pub fn cancel(&mut self, id: AnimId) -> KinemaResult<usize> {
        let lifecycle = self
            .lifecycles
            .get(id.0 as usize)
            .ok_or_else(|| KinemaError::validation(format!("unknown animation {id:?}")))?;
        lifecycle.cancel();
        let mut removed = self.appearances.cancel(id);
        if let Some(mut anim) = self.anims.get_mut(id.0 as usize).and_then(Option::take) {
            anim.cleanup();
            for &sub in anim.sub_anims() {
                removed += self.cancel(sub)?;
            }
        }
        Ok(removed)
    }

    /// Release per-animation resources and session caches. Stacks stay queryable.
    pub fn cleanup(&mut self) {
        for anim in self.anims.iter_mut().flatten() {
            anim.cleanup();
            let lifecycle = anim.base().lifecycle();
            if let Err(err) = lifecycle.cleanup() {
                tracing::debug!(anim = lifecycle.label(), error = %err, "cleanup skipped");
            }
        }
        self.scene.clear_cache();
        self.renderers.clear_cache();
    }

    /// Every animation that failed, in registration order.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.lifecycles
            .iter()
            .enumerate()
            .filter_map(|(i, l)| {
                Some(Diagnostic {
                    anim: AnimId(i as u32),
                    label: l.label().to_owned(),
                    message: l.error_message()?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/timeline.rs"]
mod tests;
