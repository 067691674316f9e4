use super::*;
use crate::foundation::core::{Point, Vec2};
use crate::session::config::TimelineConfig;
use crate::time::rate::Ease;

fn timeline() -> Timeline {
    Timeline::new(TimelineConfig {
        default_rate: Ease::Linear,
        ..TimelineConfig::default()
    })
    .unwrap()
}

/// Parent at x = 0 with two children at x = 10 and x = 20.
fn family(tl: &mut Timeline) -> (ObjectId, ObjectId, ObjectId) {
    let kind = tl.scene().builtins().item;
    let dot = |x: f64| ItemData::with_points(kind, vec![Point::new(x, 0.0)]);
    let root = tl.spawn(dot(0.0)).unwrap();
    let a = tl.spawn(dot(10.0)).unwrap();
    let b = tl.spawn(dot(20.0)).unwrap();
    tl.scene_mut().add_child(root, a).unwrap();
    tl.scene_mut().add_child(root, b).unwrap();
    (root, a, b)
}

fn y(tl: &Timeline, id: ObjectId, t: f64) -> f64 {
    tl.state_at(id, t, false).unwrap().points[0].y
}

fn raise(d: &mut ItemData, p: &UpdaterParams<'_>) -> anyhow::Result<()> {
    d.shift(Vec2::new(0.0, p.alpha));
    Ok(())
}

#[test]
fn every_descendant_gets_its_own_entry() {
    let mut tl = timeline();
    let (root, a, b) = family(&mut tl);
    tl.play(DataUpdater::new(root, raise).root_only(false)).unwrap();
    for id in [root, a, b] {
        assert_eq!(y(&tl, id, 0.5), 0.5);
        assert_eq!(y(&tl, id, 1.0), 1.0);
    }
}

#[test]
fn only_the_root_is_updated_by_default() {
    let mut tl = timeline();
    let (root, a, _) = family(&mut tl);
    tl.play(DataUpdater::new(root, raise)).unwrap();
    assert_eq!(y(&tl, root, 0.5), 0.5);
    assert_eq!(y(&tl, a, 0.5), 0.0);
}

#[test]
fn lag_ratio_staggers_targets() {
    let mut tl = timeline();
    let (root, a, b) = family(&mut tl);
    // full = 2 * 0.5 + 1 = 2
    tl.play(
        DataUpdater::new(root, raise)
            .root_only(false)
            .lag_ratio(0.5)
            .run_time(2.0),
    )
    .unwrap();
    assert_eq!(y(&tl, root, 0.5), 0.5);
    assert_eq!(y(&tl, a, 0.5), 0.0);
    assert_eq!(y(&tl, a, 1.0), 0.5);
    assert_eq!(y(&tl, b, 1.0), 0.0);
    assert_eq!(y(&tl, b, 1.5), 0.5);
    for id in [root, a, b] {
        assert_eq!(tl.state_at(id, 2.0, true).unwrap().points[0].y, 1.0);
    }
}

#[test]
fn empty_targets_are_skipped_by_default() {
    let mut tl = timeline();
    let kind = tl.scene().builtins().item;
    let (root, a, b) = family(&mut tl);
    let empty = tl.spawn(ItemData::new(kind)).unwrap();
    tl.scene_mut().add_child(root, empty).unwrap();

    // Three non-null targets out of four: index 2 of 3 starts at alpha 0.5.
    tl.play(
        DataUpdater::new(root, raise)
            .root_only(false)
            .lag_ratio(0.5)
            .run_time(2.0),
    )
    .unwrap();
    assert_eq!(y(&tl, b, 1.0), 0.0);
    assert_eq!(y(&tl, a, 1.0), 0.5);
    assert!(tl.state_at(empty, 1.0, false).unwrap().is_null());
}

#[test]
fn extra_payload_is_taken_per_target_at_the_start() {
    let mut tl = timeline();
    let (root, a, b) = family(&mut tl);
    tl.play(
        DataUpdater::new(root, |d, p| {
            let start = p.extra_as::<f64>().copied().unwrap_or_default();
            d.points[0].y = start * p.alpha;
            Ok(())
        })
        .root_only(false)
        .extra(|d| Rc::new(d.points[0].x) as Rc<dyn Any>),
    )
    .unwrap();
    assert_eq!(y(&tl, root, 0.5), 0.0);
    assert_eq!(y(&tl, a, 0.5), 5.0);
    assert_eq!(y(&tl, b, 0.5), 10.0);
}

#[test]
fn post_updaters_run_after_the_main_function() {
    let mut tl = timeline();
    let (root, _, _) = family(&mut tl);
    tl.play(
        DataUpdater::new(root, raise)
            .root_only(true)
            .add_post_updater(|d, _| {
                d.points[0].y *= 10.0;
                Ok(())
            }),
    )
    .unwrap();
    assert_eq!(y(&tl, root, 0.5), 5.0);
}

#[test]
fn visibility_follows_the_flags() {
    let mut tl = timeline();
    let (root, a, _) = family(&mut tl);
    tl.forward(1.0).unwrap();
    tl.play(DataUpdater::new(root, raise).root_only(false).hide_at_end(true))
        .unwrap();
    assert!(!tl.appearances().is_visible(a, 0.5));
    assert!(tl.appearances().is_visible(a, 1.0));
    assert!(tl.appearances().is_visible(a, 1.9));
    assert!(!tl.appearances().is_visible(a, 2.0));
}

#[test]
fn errors_carry_the_construction_site() {
    let mut tl = timeline();
    let (root, _, _) = family(&mut tl);
    let id = tl
        .prepare(
            DataUpdater::new(root, |_, _| Err(anyhow::anyhow!("bad data"))).become_at_end(false),
        )
        .unwrap();
    tl.state_at(root, 0.5, false).unwrap();
    let diags = tl.diagnostics();
    assert_eq!(diags[0].anim, id);
    assert!(diags[0].message.contains("bad data"));
    assert!(diags[0].message.contains("data.rs"));
}

#[test]
fn null_items_can_still_be_targeted() {
    let mut tl = timeline();
    let kind = tl.scene().builtins().item;
    let (root, a, _) = family(&mut tl);
    let empty = tl.spawn(ItemData::new(kind)).unwrap();
    tl.scene_mut().add_child(root, empty).unwrap();
    tl.play(
        DataUpdater::new(root, |d, p| {
            d.points.push(Point::new(p.alpha, 0.0));
            Ok(())
        })
        .root_only(false)
        .skip_null_items(false),
    )
    .unwrap();
    assert_eq!(tl.state_at(empty, 0.5, false).unwrap().points.len(), 1);
    assert_eq!(tl.state_at(a, 0.5, false).unwrap().points.len(), 2);
}

#[test]
fn a_null_root_is_left_alone() {
    let mut tl = timeline();
    let kind = tl.scene().builtins().item;
    let root = tl.spawn(ItemData::new(kind)).unwrap();
    tl.play(DataUpdater::new(root, raise)).unwrap();
    assert!(tl.state_at(root, 0.5, false).unwrap().is_null());
    assert_eq!(tl.appearances().stack(root).unwrap().len(), 1);
}
