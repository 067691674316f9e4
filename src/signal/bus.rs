use std::any::Any;
use std::collections::HashMap;

use smallvec::SmallVec;

use crate::foundation::core::{KindId, ObjectId};
use crate::foundation::error::{KinemaError, KinemaResult};
use crate::refresh::cache::{Computation, ComputationId, Recurse};
use crate::signal::kinds::KindRegistry;

/// Identifier of a declared signal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SignalId(u32);

/// A declared event point. Obtained from [`SignalBus::declare`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Signal {
    id: SignalId,
    declaring: KindId,
}

impl Signal {
    /// Kind that declared the signal.
    pub fn declaring_kind(self) -> KindId {
        self.declaring
    }
}

/// What the bus needs from the world it dispatches into.
pub trait SignalHost {
    /// Kind of `obj`, if it is known.
    fn kind_of(&self, obj: ObjectId) -> Option<KindId>;

    /// Kind registry used for resolution-order walks.
    fn kinds(&self) -> &KindRegistry;

    /// Whether `obj` takes part in the relation graph (required for recursive refresh).
    fn is_relation_node(&self, obj: ObjectId) -> bool;

    /// Mark `comp` dirty on `obj`, propagating along the relation graph per `recurse`.
    fn mark_refresh(
        &mut self,
        obj: ObjectId,
        comp: ComputationId,
        recurse: Recurse,
    ) -> KinemaResult<()>;

    /// Resolve a computation name as seen from `obj`'s kind.
    fn resolve_computation(&self, obj: ObjectId, name: &str) -> Option<ComputationId>;
}

/// Slot invoked with the emitting object.
pub type SelfSlotFn<H> = Box<dyn Fn(&SignalBus<H>, &mut H, ObjectId, &dyn Any) -> KinemaResult<()>>;

/// Callback bound to one sender instance.
pub type CallbackFn<H> = Box<dyn Fn(&SignalBus<H>, &mut H, &dyn Any) -> KinemaResult<()>>;

/// Computation addressed by an instance-scoped refresh slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ComputationRef {
    Id(ComputationId),
    /// Name resolved against the target's kind at emission time.
    Name(String),
}

impl From<ComputationId> for ComputationRef {
    fn from(id: ComputationId) -> Self {
        Self::Id(id)
    }
}

impl<T> From<Computation<T>> for ComputationRef {
    fn from(c: Computation<T>) -> Self {
        Self::Id(c.id())
    }
}

impl From<&str> for ComputationRef {
    fn from(name: &str) -> Self {
        Self::Name(name.to_owned())
    }
}

struct RecurseSlot {
    comp: ComputationId,
    recurse: Recurse,
}

struct RefreshTarget {
    target: ObjectId,
    comp: ComputationRef,
}

struct SelfSlots<H> {
    normal: Vec<SelfSlotFn<H>>,
    refresh: Vec<ComputationId>,
    refresh_with_recurse: Vec<RecurseSlot>,
}

impl<H> Default for SelfSlots<H> {
    fn default() -> Self {
        Self {
            normal: Vec::new(),
            refresh: Vec::new(),
            refresh_with_recurse: Vec::new(),
        }
    }
}

struct InstanceSlots<H> {
    normal: Vec<CallbackFn<H>>,
    refresh: Vec<RefreshTarget>,
}

impl<H> Default for InstanceSlots<H> {
    fn default() -> Self {
        Self {
            normal: Vec::new(),
            refresh: Vec::new(),
        }
    }
}

struct AllSlots<H> {
    by_kind: HashMap<KindId, SelfSlots<H>>,
    by_sender: HashMap<ObjectId, InstanceSlots<H>>,
}

impl<H> Default for AllSlots<H> {
    fn default() -> Self {
        Self {
            by_kind: HashMap::new(),
            by_sender: HashMap::new(),
        }
    }
}

/// Dispatch table for every declared signal, keyed by `(signal, key)`.
///
/// Registrations are never removed automatically; instance bindings live until
/// [`SignalBus::disconnect_all`] is called for their sender.
pub struct SignalBus<H> {
    names: Vec<String>,
    tables: HashMap<(SignalId, String), AllSlots<H>>,
}

impl<H> Default for SignalBus<H> {
    fn default() -> Self {
        Self {
            names: Vec::new(),
            tables: HashMap::new(),
        }
    }
}

impl<H> std::fmt::Debug for SignalBus<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalBus")
            .field("signals", &self.names)
            .field("tables", &self.tables.len())
            .finish()
    }
}

impl<H: SignalHost> SignalBus<H> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare signal `name` on kind `declaring`.
    pub fn declare(&mut self, declaring: KindId, name: impl Into<String>) -> Signal {
        let id = SignalId(self.names.len() as u32);
        self.names.push(name.into());
        Signal { id, declaring }
    }

    /// Declared name of `signal`.
    pub fn name(&self, signal: Signal) -> &str {
        self.names
            .get(signal.id.0 as usize)
            .map_or("<unknown>", String::as_str)
    }

    /// Call `slot` with the sender whenever `signal` is emitted on an object of kind `on` (or
    /// a sub-kind).
    pub fn self_slot(
        &mut self,
        signal: Signal,
        on: KindId,
        kinds: &KindRegistry,
        key: &str,
        slot: SelfSlotFn<H>,
    ) -> KinemaResult<()> {
        self.self_slots(signal, on, kinds, key)?.normal.push(slot);
        Ok(())
    }

    /// Mark `comp` dirty on the sender whenever `signal` is emitted on an object of kind `on`.
    pub fn self_refresh(
        &mut self,
        signal: Signal,
        on: KindId,
        kinds: &KindRegistry,
        key: &str,
        comp: ComputationId,
    ) -> KinemaResult<()> {
        self.self_slots(signal, on, kinds, key)?.refresh.push(comp);
        Ok(())
    }

    /// Like [`SignalBus::self_refresh`], additionally marking ancestors and/or descendants.
    ///
    /// Emission fails with [`KinemaError::Scope`] if the sender is not a relation node.
    pub fn self_refresh_with_recurse(
        &mut self,
        signal: Signal,
        on: KindId,
        kinds: &KindRegistry,
        key: &str,
        comp: ComputationId,
        recurse: Recurse,
    ) -> KinemaResult<()> {
        self.self_slots(signal, on, kinds, key)?
            .refresh_with_recurse
            .push(RecurseSlot { comp, recurse });
        Ok(())
    }

    /// Call `callback` whenever `signal` is emitted by `sender` specifically.
    pub fn connect(&mut self, signal: Signal, sender: ObjectId, key: &str, callback: CallbackFn<H>) {
        self.instance_slots(signal, sender, key).normal.push(callback);
    }

    /// Mark `comp` dirty on `target` whenever `signal` is emitted by `sender`.
    pub fn connect_refresh(
        &mut self,
        signal: Signal,
        sender: ObjectId,
        target: ObjectId,
        comp: impl Into<ComputationRef>,
        key: &str,
    ) {
        self.instance_slots(signal, sender, key)
            .refresh
            .push(RefreshTarget {
                target,
                comp: comp.into(),
            });
    }

    /// Drop every instance-scoped binding of `sender`, under all keys.
    pub fn disconnect_all(&mut self, sender: ObjectId) {
        for all in self.tables.values_mut() {
            all.by_sender.remove(&sender);
        }
    }

    /// Emit `signal` from `sender` under `key`.
    ///
    /// Order: self-scoped slots of every matching level of the sender's kind order, then
    /// self-scoped refresh marks, then instance callbacks, then instance refresh marks. Nothing
    /// is recomputed here. A recursive refresh on a sender that is not a relation node fails
    /// before any slot runs.
    pub fn emit(
        &self,
        host: &mut H,
        signal: Signal,
        sender: ObjectId,
        args: &dyn Any,
        key: &str,
    ) -> KinemaResult<()> {
        let Some(all) = self.tables.get(&(signal.id, key.to_owned())) else {
            return Ok(());
        };
        tracing::trace!(signal = self.name(signal), ?sender, key, "emit");

        let mro: SmallVec<[KindId; 4]> = match host.kind_of(sender) {
            Some(kind) => host.kinds().mro(kind)?.iter().copied().collect(),
            None => SmallVec::new(),
        };
        let levels: SmallVec<[&SelfSlots<H>; 4]> =
            mro.iter().filter_map(|k| all.by_kind.get(k)).collect();

        let needs_relation = levels.iter().any(|l| !l.refresh_with_recurse.is_empty());
        if needs_relation && !host.is_relation_node(sender) {
            return Err(KinemaError::scope(format!(
                "signal `{}` refreshes with recursion, but {sender:?} is not a relation node",
                self.name(signal)
            )));
        }

        for level in &levels {
            for slot in &level.normal {
                slot(self, host, sender, args)?;
            }
        }
        for level in &levels {
            for &comp in &level.refresh {
                host.mark_refresh(sender, comp, Recurse::NONE)?;
            }
            for slot in &level.refresh_with_recurse {
                host.mark_refresh(sender, slot.comp, slot.recurse)?;
            }
        }

        let Some(inst) = all.by_sender.get(&sender) else {
            return Ok(());
        };
        for callback in &inst.normal {
            callback(self, host, args)?;
        }
        for r in &inst.refresh {
            let comp = match &r.comp {
                ComputationRef::Id(id) => *id,
                ComputationRef::Name(name) => {
                    host.resolve_computation(r.target, name).ok_or_else(|| {
                        KinemaError::validation(format!(
                            "no computation named `{name}` on {:?}",
                            r.target
                        ))
                    })?
                }
            };
            host.mark_refresh(r.target, comp, Recurse::NONE)?;
        }
        Ok(())
    }

    fn self_slots(
        &mut self,
        signal: Signal,
        on: KindId,
        kinds: &KindRegistry,
        key: &str,
    ) -> KinemaResult<&mut SelfSlots<H>> {
        if !kinds.is_subkind(on, signal.declaring) {
            return Err(KinemaError::validation(format!(
                "self slots of `{}` must live on {:?} or a sub-kind, got {on:?}",
                self.name(signal),
                signal.declaring
            )));
        }
        Ok(self
            .tables
            .entry((signal.id, key.to_owned()))
            .or_default()
            .by_kind
            .entry(on)
            .or_default())
    }

    fn instance_slots(&mut self, signal: Signal, sender: ObjectId, key: &str) -> &mut InstanceSlots<H> {
        self.tables
            .entry((signal.id, key.to_owned()))
            .or_default()
            .by_sender
            .entry(sender)
            .or_default()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/signal/bus.rs"]
mod tests;
