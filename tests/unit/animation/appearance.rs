use super::*;
use crate::foundation::core::{KindId, Point, Vec2};
use anyhow::anyhow;
use slotmap::SlotMap;

struct Shift(f64);

impl StackApplier for Shift {
    fn apply(&self, data: &mut ItemData, params: &ApplyParams<'_>) -> KinemaResult<()> {
        data.shift(Vec2::new(self.0 * params.alpha, 0.0));
        Ok(())
    }
}

struct Broken;

impl StackApplier for Broken {
    fn apply(&self, data: &mut ItemData, _params: &ApplyParams<'_>) -> KinemaResult<()> {
        data.shift(Vec2::new(1000.0, 0.0));
        Err(anyhow!("boom").into())
    }
}

fn x(data: &ItemData) -> f64 {
    data.points[0].x
}

fn setup() -> (Appearances, ObjectId) {
    let mut ids: SlotMap<ObjectId, ()> = SlotMap::with_key();
    let item = ids.insert(());
    let mut app = Appearances::new();
    let data = ItemData::with_points(KindId(0), vec![Point::new(0.0, 0.0)]);
    assert!(app.track(item, &data, 0.0));
    assert!(!app.track(item, &data, 0.0));
    (app, item)
}

fn push(app: &mut Appearances, item: ObjectId, anim: u32, range: TimeRange, by: f64) -> u64 {
    app.push_apply(
        item,
        AnimId(anim),
        range,
        RateFunc::default(),
        Rc::new(Lifecycle::new("shift")),
        Rc::new(Shift(by)),
    )
    .unwrap()
}

fn began(label: &str) -> Rc<Lifecycle> {
    let lc = Rc::new(Lifecycle::new(label));
    lc.begin().unwrap();
    lc
}

#[test]
fn entries_compose_in_registration_order() {
    let (mut app, item) = setup();
    let r = TimeRange::new(0.0, 2.0).unwrap();
    for (anim, by) in [(1, 2.0), (2, 4.0)] {
        app.push_apply(
            item,
            AnimId(anim),
            r,
            RateFunc::default(),
            began("shift"),
            Rc::new(Shift(by)),
        )
        .unwrap();
    }
    assert_eq!(x(&app.compute(item, 1.0, false, false).unwrap()), 3.0);
    assert_eq!(x(&app.compute(item, 2.0, false, true).unwrap()), 6.0);
    assert_eq!(x(&app.compute(item, 2.0, false, false).unwrap()), 0.0);
}

#[test]
fn unbegun_entries_do_not_apply() {
    let (mut app, item) = setup();
    push(&mut app, item, 1, TimeRange::new(0.0, 1.0).unwrap(), 10.0);
    assert_eq!(x(&app.compute(item, 0.5, false, false).unwrap()), 0.0);
}

#[test]
fn compute_is_repeatable() {
    let (mut app, item) = setup();
    app.push_apply(
        item,
        AnimId(1),
        TimeRange::new(0.0, 1.0).unwrap(),
        RateFunc::default(),
        began("shift"),
        Rc::new(Shift(1.0)),
    )
    .unwrap();
    for t in [0.0, 0.25, 1.0] {
        for left in [false, true] {
            let a = app.compute(item, t, false, left).unwrap();
            let b = app.compute(item, t, false, left).unwrap();
            assert_eq!(a.fingerprint(), b.fingerprint());
        }
    }
}

#[test]
fn failing_entry_is_skipped_and_errored() {
    let (mut app, item) = setup();
    let broken = began("broken");
    let r = TimeRange::new(0.0, 1.0).unwrap();
    app.push_apply(
        item,
        AnimId(1),
        r,
        RateFunc::default(),
        Rc::clone(&broken),
        Rc::new(Broken),
    )
    .unwrap();
    app.push_apply(item, AnimId(2), r, RateFunc::default(), began("ok"), Rc::new(Shift(2.0)))
        .unwrap();

    let out = app.compute(item, 0.5, false, false).unwrap();
    assert_eq!(x(&out), 1.0);
    assert!(broken.is_errored());
    assert!(broken.error_message().unwrap().contains("boom"));
}

#[test]
fn detect_change_commits_only_real_changes() {
    let (mut app, item) = setup();
    let same = app.static_state(item, 0.0).unwrap().clone();
    assert!(!app.detect_change(item, &same, 1.0, false).unwrap());
    assert!(app.detect_change(item, &same, 1.0, true).unwrap());

    let mut moved = same.clone();
    moved.shift(Vec2::new(5.0, 0.0));
    let generation = app.generation();
    assert!(app.detect_change(item, &moved, 2.0, false).unwrap());
    assert!(app.generation() > generation);
    assert_eq!(x(&app.compute(item, 1.5, false, false).unwrap()), 0.0);
    assert_eq!(x(&app.compute(item, 2.0, false, false).unwrap()), 5.0);
    assert_eq!(x(&app.compute(item, 2.0, false, true).unwrap()), 0.0);
    assert_eq!(app.stack(item).unwrap().baseline_count(), 3);
}

#[test]
fn compute_until_rejects_foreign_entries() {
    let (mut app, item) = setup();
    let seq = push(&mut app, item, 1, TimeRange::new(0.0, 1.0).unwrap(), 1.0);
    assert!(app.compute_until(item, 0.5, false, false, seq).is_ok());
    assert!(matches!(
        app.compute_until(item, 0.5, false, false, seq + 10),
        Err(KinemaError::StackConsistency(_))
    ));
    assert_eq!(app.cancel(AnimId(1)), 1);
    assert!(app.compute_until(item, 0.5, false, false, seq).is_err());
}

#[test]
fn visibility_toggles() {
    let (mut app, item) = setup();
    assert!(!app.is_visible(item, 0.0));
    app.set_visible(item, 1.0, true);
    app.set_visible(item, 1.5, true);
    app.set_visible(item, 3.0, false);
    assert!(!app.is_visible(item, 0.5));
    assert!(app.is_visible(item, 1.0));
    assert!(app.is_visible(item, 2.9));
    assert!(!app.is_visible(item, 3.0));
}

#[test]
fn visibility_changes_inserted_out_of_order_keep_their_meaning() {
    let (mut app, item) = setup();
    app.set_visible(item, 0.0, true);
    app.set_visible(item, 2.0, false);
    app.set_visible(item, 1.0, false);
    assert!(app.is_visible(item, 0.5));
    assert!(!app.is_visible(item, 1.5));
    assert!(!app.is_visible(item, 3.0));

    // Same instant: the later call wins.
    app.set_visible(item, 1.0, true);
    assert!(app.is_visible(item, 1.5));
    assert!(!app.is_visible(item, 2.0));
}
