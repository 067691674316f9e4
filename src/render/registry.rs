use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::foundation::core::{KindId, ObjectId};
use crate::foundation::error::{KinemaError, KinemaResult};
use crate::item::data::ItemData;
use crate::signal::kinds::KindRegistry;

/// Draws item states. Backends downcast `sink` to whatever they render into.
pub trait Renderer {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Draw `data` into `sink`.
    fn render(&self, data: &ItemData, sink: &mut dyn Any) -> KinemaResult<()>;
}

/// One `(state, renderer)` pair of a frame.
#[derive(Clone)]
pub struct RenderCall {
    /// Scene item the state belongs to; `None` for generated output.
    pub item: Option<ObjectId>,
    /// State to draw.
    pub data: ItemData,
    /// Renderer resolved for `data.kind`.
    pub renderer: Rc<dyn Renderer>,
}

impl RenderCall {
    pub fn execute(&self, sink: &mut dyn Any) -> KinemaResult<()> {
        self.renderer.render(&self.data, sink)
    }
}

impl std::fmt::Debug for RenderCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderCall")
            .field("item", &self.item)
            .field("kind", &self.data.kind)
            .field("renderer", &self.renderer.name())
            .finish()
    }
}

/// Renderers attached to kinds, looked up through the kind resolution order.
///
/// Resolutions are memoized per kind until the next registration or [`RendererRegistry::clear_cache`].
#[derive(Default)]
pub struct RendererRegistry {
    by_kind: HashMap<KindId, Rc<dyn Renderer>>,
    resolved: RefCell<HashMap<KindId, Option<Rc<dyn Renderer>>>>,
}

impl std::fmt::Debug for RendererRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RendererRegistry")
            .field("kinds", &self.by_kind.len())
            .field("resolved", &self.resolved.borrow().len())
            .finish()
    }
}

impl RendererRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `renderer` for `kind` and every sub-kind without a closer renderer.
    pub fn register(&mut self, kind: KindId, renderer: Rc<dyn Renderer>) {
        self.by_kind.insert(kind, renderer);
        self.resolved.get_mut().clear();
    }

    /// Renderer for `kind`: the one registered on the most specific kind in its resolution order.
    pub fn lookup(&self, kinds: &KindRegistry, kind: KindId) -> Option<Rc<dyn Renderer>> {
        if let Some(hit) = self.resolved.borrow().get(&kind) {
            return hit.clone();
        }
        let found = kinds
            .mro(kind)
            .ok()?
            .iter()
            .find_map(|k| self.by_kind.get(k).cloned());
        self.resolved.borrow_mut().insert(kind, found.clone());
        found
    }

    /// Build the render call for `data`, failing when no renderer matches its kind.
    pub fn call_for(
        &self,
        kinds: &KindRegistry,
        item: Option<ObjectId>,
        data: ItemData,
    ) -> KinemaResult<RenderCall> {
        let renderer = self.lookup(kinds, data.kind).ok_or_else(|| {
            KinemaError::validation(format!(
                "no renderer for kind `{}`",
                kinds.name(data.kind).unwrap_or("?")
            ))
        })?;
        Ok(RenderCall {
            item,
            data,
            renderer,
        })
    }

    /// Forget memoized lookups. Called at session teardown.
    pub fn clear_cache(&self) {
        self.resolved.borrow_mut().clear();
    }
}

/// Context handed to [`RenderSource`]s.
#[derive(Clone, Copy)]
pub struct RenderCtx<'a> {
    /// Registered renderers.
    pub renderers: &'a RendererRegistry,
    /// Kinds, for renderer lookup.
    pub kinds: &'a KindRegistry,
}

/// Extra producer of render calls that bypasses the anim stacks.
pub trait RenderSource {
    /// Append the calls for global time `t`.
    fn render_calls(&self, t: f64, ctx: RenderCtx<'_>, out: &mut Vec<RenderCall>);
}

#[cfg(test)]
#[path = "../../tests/unit/render/registry.rs"]
mod tests;
