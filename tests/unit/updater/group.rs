use super::*;
use crate::animation::lifecycle::LifecycleState;
use crate::foundation::core::{Point, Vec2};
use crate::session::config::TimelineConfig;
use crate::time::rate::Ease;
use crate::updater::data::DataUpdater;
use std::cell::Cell;

fn timeline() -> Timeline {
    Timeline::new(TimelineConfig {
        default_rate: Ease::Linear,
        ..TimelineConfig::default()
    })
    .unwrap()
}

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

fn x(tl: &Timeline, id: ObjectId, t: f64) -> f64 {
    tl.state_at(id, t, false).unwrap().points[0].x
}

/// Pulls every child towards the root's current position.
fn gather(tree: &mut ItemTree, p: &UpdaterParams<'_>) -> anyhow::Result<()> {
    let anchor = tree.root().data.points[0].x;
    for idx in 1..tree.len() {
        if let Some(d) = tree.data_mut(idx) {
            let from = d.points[0].x;
            d.points[0].x = from + (anchor - from) * p.alpha;
        }
    }
    Ok(())
}

#[test]
fn members_are_aligned_with_the_group_result() {
    let mut tl = timeline();
    let (root, a, b) = family(&mut tl);
    tl.play(GroupUpdater::new(root, gather)).unwrap();
    assert_eq!(x(&tl, root, 0.5), 0.0);
    assert_eq!(x(&tl, a, 0.5), 5.0);
    assert_eq!(x(&tl, b, 0.5), 10.0);
    assert_eq!(x(&tl, b, 1.0), 0.0);
    assert_eq!(tl.scene().item(b).unwrap().points[0].x, 0.0);
}

#[test]
fn the_group_sees_earlier_entries_of_every_member() {
    let mut tl = timeline();
    let (root, a, _) = family(&mut tl);
    tl.play_all(vec![
        Box::new(
            DataUpdater::new(root, |d, p| {
                d.shift(Vec2::new(4.0 * p.alpha, 0.0));
                Ok(())
            })
            .root_only(true),
        ),
        Box::new(GroupUpdater::new(root, gather)),
    ])
    .unwrap();
    // root is at 2 at t = 0.5; a moves halfway from 10 towards it.
    assert_eq!(x(&tl, root, 0.5), 2.0);
    assert_eq!(x(&tl, a, 0.5), 6.0);
    assert_eq!(tl.state_at(a, 1.0, true).unwrap().points[0].x, 4.0);
}

#[test]
fn the_function_runs_once_per_sample() {
    let mut tl = timeline();
    let (root, a, b) = family(&mut tl);
    let calls = Rc::new(Cell::new(0));
    let seen = Rc::clone(&calls);
    tl.prepare(
        GroupUpdater::new(root, move |tree, p| {
            seen.set(seen.get() + 1);
            gather(tree, p)
        })
        .become_at_end(false),
    )
    .unwrap();

    for id in [root, a, b] {
        tl.state_at(id, 0.25, false).unwrap();
    }
    assert_eq!(calls.get(), 1);
    tl.state_at(a, 0.75, false).unwrap();
    assert_eq!(calls.get(), 2);
}

#[test]
fn post_updaters_see_the_result_of_earlier_functions() {
    let mut tl = timeline();
    let (root, a, b) = family(&mut tl);
    tl.play(
        GroupUpdater::new(root, gather).add_post_updater(|tree, _| {
            // Mirror every member around the root.
            let anchor = tree.root().data.points[0].x;
            for idx in 1..tree.len() {
                if let Some(d) = tree.data_mut(idx) {
                    d.points[0].x = 2.0 * anchor - d.points[0].x;
                }
            }
            Ok(())
        }),
    )
    .unwrap();
    assert_eq!(x(&tl, a, 0.5), -5.0);
    assert_eq!(x(&tl, b, 0.5), -10.0);
    assert_eq!(x(&tl, root, 0.5), 0.0);
}

#[test]
fn changing_the_node_count_is_a_return_type_error() {
    let mut tl = timeline();
    let (root, a, _) = family(&mut tl);
    let kind = tl.scene().builtins().item;
    let err = tl
        .play(GroupUpdater::new(root, move |tree, _| {
            tree.push_child(0, ItemData::new(kind))?;
            Ok(())
        }))
        .unwrap_err();
    assert!(matches!(err, KinemaError::UpdaterReturnType { .. }));
    assert!(err.to_string().contains("node count"));
    assert_eq!(tl.anim_state(AnimId(0)), Some(LifecycleState::Errored));
    assert_eq!(x(&tl, a, 0.5), 10.0);
    assert_eq!(tl.scene().item(a).unwrap().points[0].x, 10.0);
    assert_eq!(tl.diagnostics().len(), 1);
}
