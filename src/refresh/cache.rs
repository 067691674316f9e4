use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::marker::PhantomData;

use crate::foundation::core::{KindId, ObjectId};
use crate::foundation::error::{KinemaError, KinemaResult};
use crate::relation::graph::{Direction, RelationGraph};
use crate::signal::kinds::KindRegistry;

/// Untyped identifier of a declared computation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComputationId(pub(crate) u32);

/// Typed handle of a declared computation producing `T`.
pub struct Computation<T> {
    id: ComputationId,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Computation<T> {
    /// Untyped id, as used by refresh slots.
    pub fn id(self) -> ComputationId {
        self.id
    }
}

impl<T> Clone for Computation<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Computation<T> {}

impl<T> std::fmt::Debug for Computation<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Computation").field(&self.id.0).finish()
    }
}

/// Propagation of a refresh mark along the relation graph.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Recurse {
    /// Also mark every ancestor.
    pub up: bool,
    /// Also mark every descendant.
    pub down: bool,
}

impl Recurse {
    /// Only the object itself.
    pub const NONE: Self = Self {
        up: false,
        down: false,
    };
    /// The object and its ancestors.
    pub const UP: Self = Self {
        up: true,
        down: false,
    };
    /// The object and its descendants.
    pub const DOWN: Self = Self {
        up: false,
        down: true,
    };

    /// Whether any propagation is requested.
    pub fn any(self) -> bool {
        self.up || self.down
    }
}

#[derive(Clone, Debug)]
struct Declaration {
    owner: KindId,
    name: String,
}

/// Computations declared per owning kind.
#[derive(Clone, Debug, Default)]
pub struct ComputationRegistry {
    decls: Vec<Declaration>,
    by_owner: HashMap<(KindId, String), ComputationId>,
}

impl ComputationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare computation `name` on `owner`. Each `(owner, name)` pair is declared once.
    pub fn declare<T>(&mut self, owner: KindId, name: &str) -> KinemaResult<Computation<T>> {
        let key = (owner, name.to_owned());
        if self.by_owner.contains_key(&key) {
            return Err(KinemaError::validation(format!(
                "computation `{name}` is already declared on {owner:?}"
            )));
        }
        let idx = u32::try_from(self.decls.len())
            .map_err(|_| KinemaError::validation("too many computations declared"))?;
        let id = ComputationId(idx);
        self.decls.push(Declaration {
            owner,
            name: name.to_owned(),
        });
        self.by_owner.insert(key, id);
        Ok(Computation {
            id,
            _marker: PhantomData,
        })
    }

    /// Find computation `name` visible from `kind`, walking its resolution order.
    pub fn resolve(&self, kinds: &KindRegistry, kind: KindId, name: &str) -> Option<ComputationId> {
        let mro = kinds.mro(kind).ok()?;
        mro.iter()
            .find_map(|k| self.by_owner.get(&(*k, name.to_owned())).copied())
    }

    /// Declared name of `id`.
    pub fn name(&self, id: ComputationId) -> Option<&str> {
        self.decls.get(id.0 as usize).map(|d| d.name.as_str())
    }

    /// Kind that declared `id`.
    pub fn owner(&self, id: ComputationId) -> Option<KindId> {
        self.decls.get(id.0 as usize).map(|d| d.owner)
    }
}

struct Slot {
    value: Option<Box<dyn Any>>,
    dirty: bool,
}

/// Per-object memoization of declared computations.
///
/// Values are filled lazily on read and stay valid until marked dirty. Marking never recomputes.
/// A computation must not mark its own slot dirty while it is being computed; nothing guards
/// against the resulting recompute loop.
#[derive(Default)]
pub struct RefreshCache {
    slots: HashMap<(ObjectId, ComputationId), Slot>,
    executions: u64,
}

impl std::fmt::Debug for RefreshCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshCache")
            .field("slots", &self.slots.len())
            .field("executions", &self.executions)
            .finish()
    }
}

impl RefreshCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached value, running `compute` first when the slot is missing or dirty.
    pub fn read<T, F>(&mut self, obj: ObjectId, comp: Computation<T>, compute: F) -> T
    where
        T: Clone + 'static,
        F: FnOnce() -> T,
    {
        if let Some(v) = self.peek(obj, comp) {
            return v;
        }
        let value = compute();
        self.store(obj, comp, value.clone());
        value
    }

    /// Cached value when valid, without computing anything.
    pub fn peek<T: Clone + 'static>(&self, obj: ObjectId, comp: Computation<T>) -> Option<T> {
        let slot = self.slots.get(&(obj, comp.id))?;
        if slot.dirty {
            return None;
        }
        slot.value.as_ref()?.downcast_ref::<T>().cloned()
    }

    /// Store a freshly computed value and mark the slot valid.
    ///
    /// Used by computations that read other cached values while computing (e.g. bounding boxes
    /// that union their children).
    pub fn store<T: 'static>(&mut self, obj: ObjectId, comp: Computation<T>, value: T) {
        self.executions += 1;
        self.slots.insert(
            (obj, comp.id),
            Slot {
                value: Some(Box::new(value)),
                dirty: false,
            },
        );
    }

    /// Mark one slot dirty. Idempotent.
    pub fn mark_dirty(&mut self, obj: ObjectId, comp: ComputationId) {
        if let Some(slot) = self.slots.get_mut(&(obj, comp)) {
            slot.dirty = true;
        }
    }

    /// Mark `comp` dirty on `obj` and, depending on `recurse`, on its ancestors and/or
    /// descendants.
    ///
    /// Every node is marked at most once per call, even when reachable through several paths.
    /// Fails with [`KinemaError::Scope`] before marking anything when propagation is requested
    /// on an object that is not a graph node. Returns the number of distinct objects visited.
    pub fn mark_dirty_recursive(
        &mut self,
        graph: &RelationGraph,
        obj: ObjectId,
        comp: ComputationId,
        recurse: Recurse,
    ) -> KinemaResult<usize> {
        if !recurse.any() {
            self.mark_dirty(obj, comp);
            return Ok(1);
        }
        if !graph.contains(obj) {
            return Err(KinemaError::scope(format!(
                "recursive refresh requested on {obj:?}, which is not a relation node"
            )));
        }

        let mut visited = HashSet::new();
        visited.insert(obj);
        if recurse.up {
            visited.extend(graph.walk(obj, false, Direction::Ancestors));
        }
        if recurse.down {
            visited.extend(graph.walk(obj, false, Direction::Descendants));
        }
        for &id in &visited {
            self.mark_dirty(id, comp);
        }
        Ok(visited.len())
    }

    /// Whether reading `comp` on `obj` would run the computation.
    pub fn is_dirty(&self, obj: ObjectId, comp: ComputationId) -> bool {
        self.slots.get(&(obj, comp)).is_none_or(|s| s.dirty)
    }

    /// Mark every slot of `obj` dirty.
    pub fn invalidate_object(&mut self, obj: ObjectId) {
        for ((o, _), slot) in self.slots.iter_mut() {
            if *o == obj {
                slot.dirty = true;
            }
        }
    }

    /// Drop every slot of `obj` (the object went away).
    pub fn forget(&mut self, obj: ObjectId) {
        self.slots.retain(|(o, _), _| *o != obj);
    }

    /// Drop everything. Called at session teardown.
    pub fn clear(&mut self) {
        self.slots.clear();
    }

    /// Number of times a value was (re)computed and stored.
    pub fn executions(&self) -> u64 {
        self.executions
    }
}

#[cfg(test)]
#[path = "../../tests/unit/refresh/cache.rs"]
mod tests;
