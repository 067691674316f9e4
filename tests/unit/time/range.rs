use super::*;
use crate::time::rate::Ease;

#[test]
fn boundaries_split_by_side() {
    let r = TimeRange::new(1.0, 2.0).unwrap();
    assert!(r.contains(1.0, false));
    assert!(!r.contains(2.0, false));
    assert!(!r.contains(1.0, true));
    assert!(r.contains(2.0, true));
    assert!(r.contains(1.5, true) && r.contains(1.5, false));
}

#[test]
fn alpha_clamps_outside_the_range() {
    let r = TimeRange::new(1.0, 3.0).unwrap();
    let lin = RateFunc::default();
    assert_eq!(alpha_at(r, 0.0, &lin), 0.0);
    assert_eq!(alpha_at(r, 1.0, &lin), 0.0);
    assert_eq!(alpha_at(r, 2.0, &lin), 0.5);
    assert_eq!(alpha_at(r, 3.0, &lin), 1.0);
    assert_eq!(alpha_at(r, 9.0, &lin), 1.0);

    let quad = RateFunc::from(Ease::InQuad);
    assert_eq!(alpha_at(r, 2.0, &quad), 0.25);
}

#[test]
fn unbounded_ranges_never_progress() {
    let r = TimeRange::unbounded(0.0);
    assert!(r.is_unbounded());
    assert!(r.contains(1e9, false));
    assert_eq!(alpha_at(r, 100.0, &RateFunc::default()), 0.0);
}

#[test]
fn invalid_ranges_are_rejected() {
    assert!(TimeRange::new(2.0, 1.0).is_err());
    assert!(TimeRange::new(f64::NAN, 1.0).is_err());
    assert!(TimeRange::new(0.0, f64::NAN).is_err());
    assert!(TimeRange::with_duration(1.0, 0.5).is_ok());
    assert_eq!(TimeRange::new(1.0, 2.0).unwrap().shifted(1.0).end, 3.0);
}
