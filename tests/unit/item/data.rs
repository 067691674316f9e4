use super::*;
use std::f64::consts::PI;

fn square() -> ItemData {
    ItemData::with_points(
        KindId(0),
        vec![
            Point::new(0.0, 0.0),
            Point::new(2.0, 0.0),
            Point::new(2.0, 2.0),
            Point::new(0.0, 2.0),
        ],
    )
}

fn close(a: Point, b: Point) -> bool {
    (a - b).hypot() < 1e-9
}

#[test]
fn bounding_box_and_center() {
    let sq = square();
    assert_eq!(sq.bounding_box(), Some(Rect::new(0.0, 0.0, 2.0, 2.0)));
    assert_eq!(sq.center(), Some(Point::new(1.0, 1.0)));
    assert!(ItemData::new(KindId(0)).bounding_box().is_none());
    assert!(ItemData::new(KindId(0)).is_null());
}

#[test]
fn half_turn_about_center_swaps_corners() {
    let mut sq = square();
    sq.rotate_about(PI, Point::new(1.0, 1.0));
    assert!(close(sq.points[0], Point::new(2.0, 2.0)));
    assert!(close(sq.points[2], Point::new(0.0, 0.0)));

    sq.shift(Vec2::new(3.0, 0.0));
    assert!(close(sq.points[2], Point::new(3.0, 0.0)));
}

#[test]
fn fingerprint_tracks_every_field() {
    let a = square();
    let mut b = square();
    assert_eq!(a.fingerprint(), b.fingerprint());
    b.stroke_width = 2.0;
    assert_ne!(a.fingerprint(), b.fingerprint());
    let mut c = square();
    c.fill = Rgba8Premul::transparent();
    assert_ne!(a.fingerprint(), c.fingerprint());
}

#[test]
fn lerp_is_pairwise_with_matching_counts() {
    let a = square();
    let mut b = square();
    b.shift(Vec2::new(4.0, 0.0));
    b.stroke_width = 3.0;
    let mid = ItemData::lerp(&a, &b, 0.5);
    assert!(close(mid.points[0], Point::new(2.0, 0.0)));
    assert_eq!(mid.stroke_width, 2.0);

    let empty = ItemData::new(KindId(0));
    assert_eq!(ItemData::lerp(&empty, &b, 0.5).points.len(), 0);
    assert_eq!(ItemData::lerp(&empty, &b, 1.0).points, b.points);
}
