use std::any::Any;

use slotmap::{SecondaryMap, SlotMap};

use crate::foundation::core::{KindId, ObjectId, Point, Rect, Vec2};
use crate::foundation::error::{KinemaError, KinemaResult};
use crate::item::data::ItemData;
use crate::refresh::cache::{
    Computation, ComputationId, ComputationRegistry, Recurse, RefreshCache,
};
use crate::relation::graph::{Direction, RelationGraph};
use crate::signal::bus::{Signal, SignalBus, SignalHost};
use crate::signal::kinds::KindRegistry;

/// Kinds, signals and computations every scene declares.
#[derive(Clone, Copy, Debug)]
pub struct Builtins {
    /// Root kind of every relation node.
    pub relation: KindId,
    /// Root kind of every item.
    pub item: KindId,
    /// Emitted on an item whose data was replaced or edited.
    pub points_changed: Signal,
    /// Emitted on a node whose child list changed. Args: the affected child.
    pub children_changed: Signal,
    /// Emitted on a node whose parent list changed. Args: the affected parent.
    pub parents_changed: Signal,
    /// Bounding box of an item and all of its descendants.
    pub bounding_box: Computation<Option<Rect>>,
}

/// Everything signal slots may touch: the host side of the scene's [`SignalBus`].
#[derive(Debug)]
pub struct SceneState {
    kinds: KindRegistry,
    objects: SlotMap<ObjectId, KindId>,
    graph: RelationGraph,
    items: SecondaryMap<ObjectId, ItemData>,
    order: Vec<ObjectId>,
    cache: RefreshCache,
    computations: ComputationRegistry,
    builtins: Builtins,
}

impl SignalHost for SceneState {
    fn kind_of(&self, obj: ObjectId) -> Option<KindId> {
        self.objects.get(obj).copied()
    }

    fn kinds(&self) -> &KindRegistry {
        &self.kinds
    }

    fn is_relation_node(&self, obj: ObjectId) -> bool {
        self.graph.contains(obj)
    }

    fn mark_refresh(
        &mut self,
        obj: ObjectId,
        comp: ComputationId,
        recurse: Recurse,
    ) -> KinemaResult<()> {
        self.cache
            .mark_dirty_recursive(&self.graph, obj, comp, recurse)
            .map(|_| ())
    }

    fn resolve_computation(&self, obj: ObjectId, name: &str) -> Option<ComputationId> {
        let kind = self.kind_of(obj)?;
        self.computations.resolve(&self.kinds, kind, name)
    }
}

impl SceneState {
    /// Relation graph of the scene's items.
    pub fn graph(&self) -> &RelationGraph {
        &self.graph
    }

    /// Per-object computation cache.
    pub fn cache(&self) -> &RefreshCache {
        &self.cache
    }

    /// Per-object computation cache, mutably (for slots that invalidate by hand).
    pub fn cache_mut(&mut self) -> &mut RefreshCache {
        &mut self.cache
    }

    pub fn item(&self, id: ObjectId) -> KinemaResult<&ItemData> {
        self.items.get(id).ok_or(KinemaError::UnknownObject(id))
    }

    fn bounding_box(&mut self, id: ObjectId) -> KinemaResult<Option<Rect>> {
        let comp = self.builtins.bounding_box;
        if let Some(v) = self.cache.peek(id, comp) {
            return Ok(v);
        }
        let mut bbox = self.item(id)?.bounding_box();
        let children = self.graph.children(id).to_vec();
        for child in children {
            if let Some(cb) = self.bounding_box(child)? {
                bbox = Some(bbox.map_or(cb, |b| b.union(cb)));
            }
        }
        self.cache.store(id, comp, bbox);
        Ok(bbox)
    }
}

/// Owner of every item: kinds, relation graph, item data, refresh cache and signal bus.
///
/// The bus lives beside the state it dispatches into, so slots receive `&mut SceneState` while
/// the bus itself stays borrowed immutably.
#[derive(Debug)]
pub struct Scene {
    bus: SignalBus<SceneState>,
    state: SceneState,
}

impl Scene {
    /// Create a scene with the built-in kinds, signals and the `bounding_box` computation.
    pub fn new() -> KinemaResult<Self> {
        let mut kinds = KindRegistry::new();
        let relation = kinds.register("Relation", &[])?;
        let item = kinds.register("Item", &[relation])?;

        let mut bus = SignalBus::new();
        let points_changed = bus.declare(item, "points_changed");
        let children_changed = bus.declare(relation, "children_changed");
        let parents_changed = bus.declare(relation, "parents_changed");

        let mut computations = ComputationRegistry::new();
        let bounding_box = computations.declare::<Option<Rect>>(item, "bounding_box")?;

        bus.self_refresh_with_recurse(
            points_changed,
            item,
            &kinds,
            "",
            bounding_box.id(),
            Recurse::UP,
        )?;
        bus.self_refresh_with_recurse(
            children_changed,
            item,
            &kinds,
            "",
            bounding_box.id(),
            Recurse::UP,
        )?;

        Ok(Self {
            bus,
            state: SceneState {
                kinds,
                objects: SlotMap::with_key(),
                graph: RelationGraph::new(),
                items: SecondaryMap::new(),
                order: Vec::new(),
                cache: RefreshCache::new(),
                computations,
                builtins: Builtins {
                    relation,
                    item,
                    points_changed,
                    children_changed,
                    parents_changed,
                    bounding_box,
                },
            },
        })
    }

    /// Built-in kinds, signals and computations.
    pub fn builtins(&self) -> Builtins {
        self.state.builtins
    }

    /// Register a kind deriving from `bases`.
    pub fn register_kind(&mut self, name: &str, bases: &[KindId]) -> KinemaResult<KindId> {
        self.state.kinds.register(name, bases)
    }

    pub fn kinds(&self) -> &KindRegistry {
        &self.state.kinds
    }

    /// Signal bus, for registering slots.
    pub fn bus_mut(&mut self) -> &mut SignalBus<SceneState> {
        &mut self.bus
    }

    /// Signal bus together with the kind registry self-scoped slots are validated against.
    pub fn bus_and_kinds(&mut self) -> (&mut SignalBus<SceneState>, &KindRegistry) {
        (&mut self.bus, &self.state.kinds)
    }

    pub fn state(&self) -> &SceneState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut SceneState {
        &mut self.state
    }

    /// Declare computation `name` on `owner`.
    pub fn declare_computation<T>(
        &mut self,
        owner: KindId,
        name: &str,
    ) -> KinemaResult<Computation<T>> {
        self.state.computations.declare(owner, name)
    }

    /// Read `comp` on `id`, computing it from the item's data when missing or dirty.
    pub fn cached<T, F>(&mut self, id: ObjectId, comp: Computation<T>, compute: F) -> KinemaResult<T>
    where
        T: Clone + 'static,
        F: FnOnce(&ItemData) -> T,
    {
        if let Some(v) = self.state.cache.peek(id, comp) {
            return Ok(v);
        }
        let value = compute(self.state.item(id)?);
        self.state.cache.store(id, comp, value.clone());
        Ok(value)
    }

    /// Emit `signal` from `sender` under `key`.
    pub fn emit(
        &mut self,
        signal: Signal,
        sender: ObjectId,
        args: &dyn Any,
        key: &str,
    ) -> KinemaResult<()> {
        self.bus.emit(&mut self.state, signal, sender, args, key)
    }

    /// Create a plain object of `kind` that can send signals but is not a graph node or item.
    pub fn spawn_object(&mut self, kind: KindId) -> KinemaResult<ObjectId> {
        self.state.kinds.mro(kind)?;
        Ok(self.state.objects.insert(kind))
    }

    /// Create an item. `data.kind` must derive from the built-in item kind.
    pub fn spawn(&mut self, data: ItemData) -> KinemaResult<ObjectId> {
        if !self.state.kinds.is_subkind(data.kind, self.state.builtins.item) {
            return Err(KinemaError::validation(format!(
                "kind {:?} is not an item kind",
                data.kind
            )));
        }
        let id = self.state.objects.insert(data.kind);
        self.state.graph.insert(id);
        self.state.items.insert(id, data);
        self.state.order.push(id);
        Ok(id)
    }

    /// Remove an object, unlinking it from its neighbours and dropping its bindings and cache.
    ///
    /// Children are not removed; they just lose this parent.
    pub fn despawn(&mut self, id: ObjectId) -> KinemaResult<()> {
        if !self.state.objects.contains_key(id) {
            return Err(KinemaError::UnknownObject(id));
        }
        if self.state.graph.contains(id) {
            let parents = self.state.graph.parents(id).to_vec();
            let children = self.state.graph.children(id).to_vec();
            self.state.graph.remove(id)?;
            let b = self.state.builtins;
            for p in parents {
                self.emit(b.children_changed, p, &id, "")?;
            }
            for c in children {
                self.emit(b.parents_changed, c, &id, "")?;
            }
        }
        self.bus.disconnect_all(id);
        self.state.cache.forget(id);
        self.state.items.remove(id);
        self.state.order.retain(|o| *o != id);
        self.state.objects.remove(id);
        Ok(())
    }

    /// Whether `id` is a live object.
    pub fn contains(&self, id: ObjectId) -> bool {
        self.state.objects.contains_key(id)
    }

    pub fn item(&self, id: ObjectId) -> KinemaResult<&ItemData> {
        self.state.item(id)
    }

    /// Item ids in spawn order.
    pub fn item_ids(&self) -> &[ObjectId] {
        &self.state.order
    }

    /// Replace the data of `id` and emit `points_changed`.
    pub fn set_item(&mut self, id: ObjectId, data: ItemData) -> KinemaResult<()> {
        let slot = self
            .state
            .items
            .get_mut(id)
            .ok_or(KinemaError::UnknownObject(id))?;
        *slot = data;
        self.emit(self.state.builtins.points_changed, id, &(), "")
    }

    /// Edit the data of `id` in place and emit `points_changed`.
    pub fn update_item(&mut self, id: ObjectId, f: impl FnOnce(&mut ItemData)) -> KinemaResult<()> {
        let slot = self
            .state
            .items
            .get_mut(id)
            .ok_or(KinemaError::UnknownObject(id))?;
        f(slot);
        self.emit(self.state.builtins.points_changed, id, &(), "")
    }

    /// Link `child` under `parent`; see [`RelationGraph::add_child`].
    ///
    /// Emits `children_changed` on the parent and `parents_changed` on the child when a link
    /// was actually added.
    pub fn add_child(&mut self, parent: ObjectId, child: ObjectId) -> KinemaResult<bool> {
        if !self.state.graph.add_child(parent, child)? {
            return Ok(false);
        }
        let b = self.state.builtins;
        self.emit(b.children_changed, parent, &child, "")?;
        self.emit(b.parents_changed, child, &parent, "")?;
        Ok(true)
    }

    /// Unlink `child` from `parent`, emitting the structural signals when a link went away.
    pub fn remove_child(&mut self, parent: ObjectId, child: ObjectId) -> KinemaResult<bool> {
        if !self.state.graph.remove_child(parent, child)? {
            return Ok(false);
        }
        let b = self.state.builtins;
        self.emit(b.children_changed, parent, &child, "")?;
        self.emit(b.parents_changed, child, &parent, "")?;
        Ok(true)
    }

    /// Direct parents of `id`.
    pub fn parents(&self, id: ObjectId) -> &[ObjectId] {
        self.state.graph.parents(id)
    }

    /// Direct children of `id`, in order.
    pub fn children(&self, id: ObjectId) -> &[ObjectId] {
        self.state.graph.children(id)
    }

    /// `id` (optionally) and all of its descendants, pre-order.
    pub fn descendants(&self, id: ObjectId, include_self: bool) -> Vec<ObjectId> {
        self.state
            .graph
            .walk(id, include_self, Direction::Descendants)
            .collect()
    }

    /// `id` (optionally) and all of its ancestors, pre-order.
    pub fn ancestors(&self, id: ObjectId, include_self: bool) -> Vec<ObjectId> {
        self.state
            .graph
            .walk(id, include_self, Direction::Ancestors)
            .collect()
    }

    /// Cached bounding box of `id` and its descendants.
    pub fn bounding_box(&mut self, id: ObjectId) -> KinemaResult<Option<Rect>> {
        self.state.bounding_box(id)
    }

    /// Translate `id` and its descendants.
    pub fn shift(&mut self, id: ObjectId, by: Vec2) -> KinemaResult<()> {
        for node in self.descendants(id, true) {
            self.update_item(node, |d| d.shift(by))?;
        }
        Ok(())
    }

    /// Rotate `id` and its descendants by `angle` radians around `about`.
    pub fn rotate(&mut self, id: ObjectId, angle: f64, about: Point) -> KinemaResult<()> {
        for node in self.descendants(id, true) {
            self.update_item(node, |d| d.rotate_about(angle, about))?;
        }
        Ok(())
    }

    /// Total number of cached values computed so far.
    pub fn cache_executions(&self) -> u64 {
        self.state.cache.executions()
    }

    /// Drop every cached value. Called at session teardown.
    pub fn clear_cache(&mut self) {
        self.state.cache.clear();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/item/scene.rs"]
mod tests;
