use super::*;
use crate::refresh::cache::{ComputationRegistry, RefreshCache};
use crate::relation::graph::RelationGraph;
use slotmap::SlotMap;

#[derive(Default)]
struct Host {
    kinds: KindRegistry,
    objects: SlotMap<ObjectId, KindId>,
    graph: RelationGraph,
    comps: ComputationRegistry,
    cache: RefreshCache,
    log: Vec<String>,
}

impl SignalHost for Host {
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
        self.log.push(format!("refresh {}", self.comps.name(comp).unwrap_or("?")));
        self.cache
            .mark_dirty_recursive(&self.graph, obj, comp, recurse)
            .map(|_| ())
    }

    fn resolve_computation(&self, obj: ObjectId, name: &str) -> Option<ComputationId> {
        let kind = self.kind_of(obj)?;
        self.comps.resolve(&self.kinds, kind, name)
    }
}

struct Fixture {
    host: Host,
    bus: SignalBus<Host>,
    base: KindId,
    derived: KindId,
    changed: Signal,
}

fn fixture() -> Fixture {
    let mut host = Host::default();
    let base = host.kinds.register("Base", &[]).unwrap();
    let derived = host.kinds.register("Derived", &[base]).unwrap();
    let mut bus = SignalBus::new();
    let changed = bus.declare(base, "changed");
    Fixture {
        host,
        bus,
        base,
        derived,
        changed,
    }
}

fn logger(tag: &'static str) -> SelfSlotFn<Host> {
    Box::new(move |_bus: &SignalBus<Host>, host: &mut Host, _sender: ObjectId, _args: &dyn Any| {
        host.log.push(tag.to_owned());
        Ok(())
    })
}

#[test]
fn every_matching_kind_level_fires_once() {
    let mut f = fixture();
    f.bus
        .self_slot(f.changed, f.base, &f.host.kinds, "", logger("base"))
        .unwrap();
    f.bus
        .self_slot(f.changed, f.derived, &f.host.kinds, "", logger("derived"))
        .unwrap();

    let d = f.host.objects.insert(f.derived);
    f.bus.emit(&mut f.host, f.changed, d, &(), "").unwrap();
    let mut log = f.host.log.clone();
    log.sort();
    assert_eq!(log, vec!["base", "derived"]);

    f.host.log.clear();
    let b = f.host.objects.insert(f.base);
    f.bus.emit(&mut f.host, f.changed, b, &(), "").unwrap();
    assert_eq!(f.host.log, vec!["base"]);
}

#[test]
fn keys_are_isolated() {
    let mut f = fixture();
    f.bus
        .self_slot(f.changed, f.base, &f.host.kinds, "color", logger("color"))
        .unwrap();
    let b = f.host.objects.insert(f.base);

    f.bus.emit(&mut f.host, f.changed, b, &(), "").unwrap();
    assert!(f.host.log.is_empty());
    f.bus.emit(&mut f.host, f.changed, b, &(), "color").unwrap();
    assert_eq!(f.host.log, vec!["color"]);
}

#[test]
fn order_is_slots_then_refresh_then_instance() {
    let mut f = fixture();
    let comp = f.host.comps.declare::<u32>(f.base, "text").unwrap();
    let sender = f.host.objects.insert(f.base);
    let target = f.host.objects.insert(f.derived);

    f.bus
        .self_refresh(f.changed, f.base, &f.host.kinds, "", comp.id())
        .unwrap();
    f.bus
        .self_slot(f.changed, f.base, &f.host.kinds, "", logger("self"))
        .unwrap();
    f.bus.connect(
        f.changed,
        sender,
        "",
        Box::new(|_bus: &SignalBus<Host>, host: &mut Host, args: &dyn Any| {
            let n = args.downcast_ref::<i32>().copied().unwrap_or_default();
            host.log.push(format!("callback {n}"));
            Ok(())
        }),
    );
    f.bus.connect_refresh(f.changed, sender, target, "text", "");

    f.host.cache.read(target, comp, || 1);
    f.bus.emit(&mut f.host, f.changed, sender, &7_i32, "").unwrap();
    assert_eq!(
        f.host.log,
        vec!["self", "refresh text", "callback 7", "refresh text"]
    );
    assert!(f.host.cache.is_dirty(target, comp.id()));
}

#[test]
fn instance_slots_are_bound_to_the_sender() {
    let mut f = fixture();
    let a = f.host.objects.insert(f.base);
    let b = f.host.objects.insert(f.base);
    f.bus.connect(
        f.changed,
        a,
        "",
        Box::new(|_bus: &SignalBus<Host>, host: &mut Host, _args: &dyn Any| {
            host.log.push("a".to_owned());
            Ok(())
        }),
    );
    f.bus.emit(&mut f.host, f.changed, b, &(), "").unwrap();
    assert!(f.host.log.is_empty());
    f.bus.emit(&mut f.host, f.changed, a, &(), "").unwrap();
    assert_eq!(f.host.log, vec!["a"]);

    f.bus.disconnect_all(a);
    f.bus.emit(&mut f.host, f.changed, a, &(), "").unwrap();
    assert_eq!(f.host.log.len(), 1);
}

#[test]
fn recursive_refresh_on_non_node_fails_before_any_slot() {
    let mut f = fixture();
    let comp = f.host.comps.declare::<u32>(f.base, "bbox").unwrap();
    f.bus
        .self_slot(f.changed, f.base, &f.host.kinds, "", logger("self"))
        .unwrap();
    f.bus
        .self_refresh_with_recurse(
            f.changed,
            f.base,
            &f.host.kinds,
            "",
            comp.id(),
            Recurse::UP,
        )
        .unwrap();

    let loose = f.host.objects.insert(f.base);
    let err = f.bus.emit(&mut f.host, f.changed, loose, &(), "").unwrap_err();
    assert!(matches!(err, KinemaError::Scope(_)));
    assert!(f.host.log.is_empty());

    let node = f.host.objects.insert(f.base);
    f.host.graph.insert(node);
    f.bus.emit(&mut f.host, f.changed, node, &(), "").unwrap();
    assert_eq!(f.host.log, vec!["self", "refresh bbox"]);
}

#[test]
fn self_slots_must_target_declaring_kind_or_subkind() {
    let mut f = fixture();
    let other = f.host.kinds.register("Other", &[]).unwrap();
    assert!(
        f.bus
            .self_slot(f.changed, other, &f.host.kinds, "", logger("x"))
            .is_err()
    );
}

#[test]
fn slots_can_emit_nested_signals() {
    let mut f = fixture();
    let inner = f.bus.declare(f.base, "inner");
    f.bus
        .self_slot(f.changed, f.base, &f.host.kinds, "", {
            Box::new(move |bus: &SignalBus<Host>, host: &mut Host, sender: ObjectId, _args: &dyn Any| {
                host.log.push("outer".to_owned());
                bus.emit(host, inner, sender, &(), "")
            })
        })
        .unwrap();
    f.bus
        .self_slot(inner, f.base, &f.host.kinds, "", logger("inner"))
        .unwrap();

    let b = f.host.objects.insert(f.base);
    f.bus.emit(&mut f.host, f.changed, b, &(), "").unwrap();
    assert_eq!(f.host.log, vec!["outer", "inner"]);
}
