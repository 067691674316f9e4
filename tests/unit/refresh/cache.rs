use super::*;
use slotmap::SlotMap;
use std::cell::Cell;

struct Fixture {
    graph: RelationGraph,
    nodes: Vec<ObjectId>,
    comps: ComputationRegistry,
    kinds: KindRegistry,
    item: KindId,
}

fn fixture(n: usize) -> Fixture {
    let mut ids: SlotMap<ObjectId, ()> = SlotMap::with_key();
    let mut graph = RelationGraph::new();
    let nodes: Vec<_> = (0..n).map(|_| ids.insert(())).collect();
    for &id in &nodes {
        graph.insert(id);
    }
    let mut kinds = KindRegistry::new();
    let item = kinds.register("Item", &[]).unwrap();
    Fixture {
        graph,
        nodes,
        comps: ComputationRegistry::new(),
        kinds,
        item,
    }
}

#[test]
fn read_without_mark_never_recomputes() {
    let mut f = fixture(1);
    let comp = f.comps.declare::<u32>(f.item, "answer").unwrap();
    let mut cache = RefreshCache::new();
    let runs = Cell::new(0);

    for _ in 0..3 {
        let v = cache.read(f.nodes[0], comp, || {
            runs.set(runs.get() + 1);
            42
        });
        assert_eq!(v, 42);
    }
    assert_eq!(runs.get(), 1);
}

#[test]
fn mark_then_read_recomputes_exactly_once() {
    let mut f = fixture(1);
    let comp = f.comps.declare::<u32>(f.item, "answer").unwrap();
    let mut cache = RefreshCache::new();
    let runs = Cell::new(0);
    let read = |cache: &mut RefreshCache| {
        cache.read(f.nodes[0], comp, || {
            runs.set(runs.get() + 1);
            runs.get()
        })
    };

    assert_eq!(read(&mut cache), 1);
    cache.mark_dirty(f.nodes[0], comp.id());
    cache.mark_dirty(f.nodes[0], comp.id());
    assert!(cache.is_dirty(f.nodes[0], comp.id()));
    assert_eq!(read(&mut cache), 2);
    assert_eq!(read(&mut cache), 2);
    assert_eq!(read(&mut cache), 2);
    assert!(!cache.is_dirty(f.nodes[0], comp.id()));
}

#[test]
fn instances_have_independent_slots() {
    let mut f = fixture(2);
    let comp = f.comps.declare::<u32>(f.item, "answer").unwrap();
    let mut cache = RefreshCache::new();
    cache.read(f.nodes[0], comp, || 1);
    cache.read(f.nodes[1], comp, || 2);
    cache.mark_dirty(f.nodes[0], comp.id());
    assert!(cache.is_dirty(f.nodes[0], comp.id()));
    assert_eq!(cache.peek(f.nodes[1], comp), Some(2));
}

#[test]
fn recurse_down_reaches_descendants_once_and_spares_others() {
    //        0
    //      /   \
    //     1     2      4 (sibling root)
    //      \   /
    //        3
    let mut f = fixture(5);
    let n = f.nodes.clone();
    f.graph.add_child(n[0], n[1]).unwrap();
    f.graph.add_child(n[0], n[2]).unwrap();
    f.graph.add_child(n[1], n[3]).unwrap();
    f.graph.add_child(n[2], n[3]).unwrap();

    let comp = f.comps.declare::<u32>(f.item, "depth").unwrap();
    let mut cache = RefreshCache::new();
    for &id in &n {
        cache.read(id, comp, || 0);
    }

    let visited = cache
        .mark_dirty_recursive(&f.graph, n[1], comp.id(), Recurse::DOWN)
        .unwrap();
    assert_eq!(visited, 2);
    assert!(cache.is_dirty(n[1], comp.id()));
    assert!(cache.is_dirty(n[3], comp.id()));
    assert!(!cache.is_dirty(n[0], comp.id()));
    assert!(!cache.is_dirty(n[2], comp.id()));
    assert!(!cache.is_dirty(n[4], comp.id()));

    let visited = cache
        .mark_dirty_recursive(&f.graph, n[0], comp.id(), Recurse::DOWN)
        .unwrap();
    assert_eq!(visited, 4);
}

#[test]
fn recurse_up_marks_ancestors() {
    let mut f = fixture(3);
    let n = f.nodes.clone();
    f.graph.add_child(n[0], n[1]).unwrap();
    f.graph.add_child(n[1], n[2]).unwrap();
    let comp = f.comps.declare::<u32>(f.item, "bbox").unwrap();
    let mut cache = RefreshCache::new();
    for &id in &n {
        cache.read(id, comp, || 0);
    }
    cache
        .mark_dirty_recursive(&f.graph, n[2], comp.id(), Recurse::UP)
        .unwrap();
    assert!(n.iter().all(|&id| cache.is_dirty(id, comp.id())));
}

#[test]
fn recursion_on_non_node_is_a_scope_error() {
    let mut f = fixture(1);
    let mut ids: SlotMap<ObjectId, ()> = SlotMap::with_key();
    let _ = ids.insert(());
    let _ = ids.insert(());
    let loose = ids.insert(());
    let comp = f.comps.declare::<u32>(f.item, "bbox").unwrap();
    let mut cache = RefreshCache::new();
    cache.read(loose, comp, || 7);

    let err = cache
        .mark_dirty_recursive(&f.graph, loose, comp.id(), Recurse::UP)
        .unwrap_err();
    assert!(matches!(err, KinemaError::Scope(_)));
    assert!(!cache.is_dirty(loose, comp.id()));
}

#[test]
fn computations_resolve_through_kind_order() {
    let mut f = fixture(0);
    let vitem = f.kinds.register("VItem", &[f.item]).unwrap();
    let comp = f.comps.declare::<f64>(f.item, "width").unwrap();
    assert_eq!(f.comps.resolve(&f.kinds, vitem, "width"), Some(comp.id()));
    assert_eq!(f.comps.resolve(&f.kinds, vitem, "height"), None);
    assert!(f.comps.declare::<f64>(f.item, "width").is_err());
    assert_eq!(f.comps.name(comp.id()), Some("width"));
}
