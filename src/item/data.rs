use crate::animation::anim::Lerp;
use crate::foundation::core::{Affine, KindId, Point, Rect, Rgba8Premul, Vec2};
use crate::foundation::fingerprint::{StableHasher, StateFingerprint};

/// Geometric and visual state of one item.
///
/// Point geometry itself is opaque to the engine: shapes are plain point lists, and the
/// renderer registered for `kind` decides what they mean.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ItemData {
    /// Kind used for renderer lookup and kind-scoped slots.
    pub kind: KindId,
    /// Control points in scene coordinates.
    pub points: Vec<Point>,
    /// Fill colour.
    pub fill: Rgba8Premul,
    /// Outline width in scene units.
    pub stroke_width: f64,
}

impl ItemData {
    /// Empty item of `kind`.
    pub fn new(kind: KindId) -> Self {
        Self::with_points(kind, Vec::new())
    }

    /// Item of `kind` with the given points.
    pub fn with_points(kind: KindId, points: Vec<Point>) -> Self {
        Self {
            kind,
            points,
            fill: Rgba8Premul::white(),
            stroke_width: 1.0,
        }
    }

    /// Return `true` for items with no geometry (skipped by `skip_null_items`).
    pub fn is_null(&self) -> bool {
        self.points.is_empty()
    }

    /// Tight box around the points, `None` when there are none.
    pub fn bounding_box(&self) -> Option<Rect> {
        let (first, rest) = self.points.split_first()?;
        Some(
            rest.iter()
                .fold(Rect::from_points(*first, *first), |r, p| r.union_pt(*p)),
        )
    }

    /// Center of [`ItemData::bounding_box`].
    pub fn center(&self) -> Option<Point> {
        self.bounding_box().map(|r| r.center())
    }

    /// Translate every point by `by`.
    pub fn shift(&mut self, by: Vec2) {
        for p in &mut self.points {
            *p += by;
        }
    }

    /// Rotate every point by `angle` radians around `about`.
    pub fn rotate_about(&mut self, angle: f64, about: Point) {
        self.apply_affine(Affine::rotate_about(angle, about));
    }

    /// Apply `affine` to every point.
    pub fn apply_affine(&mut self, affine: Affine) {
        for p in &mut self.points {
            *p = affine * *p;
        }
    }

    /// Stable digest of every field, used for bit-identity checks.
    pub fn fingerprint(&self) -> StateFingerprint {
        let mut h = StableHasher::new();
        self.hash_into(&mut h);
        h.finish()
    }

    pub(crate) fn hash_into(&self, h: &mut StableHasher) {
        h.write_u16(self.kind.0);
        h.write_u32(self.points.len() as u32);
        for p in &self.points {
            h.write_f64(p.x);
            h.write_f64(p.y);
        }
        h.write_u8(self.fill.r);
        h.write_u8(self.fill.g);
        h.write_u8(self.fill.b);
        h.write_u8(self.fill.a);
        h.write_f64(self.stroke_width);
    }
}

impl Lerp for ItemData {
    /// Points are interpolated pairwise when both sides have the same count; otherwise the
    /// geometry snaps to `b` once `t` reaches 1.
    fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        let points = if a.points.len() == b.points.len() {
            a.points
                .iter()
                .zip(&b.points)
                .map(|(p, q)| p.lerp(*q, t))
                .collect()
        } else if t >= 1.0 {
            b.points.clone()
        } else {
            a.points.clone()
        };
        Self {
            kind: if t >= 1.0 { b.kind } else { a.kind },
            points,
            fill: Lerp::lerp(&a.fill, &b.fill, t),
            stroke_width: Lerp::lerp(&a.stroke_width, &b.stroke_width, t),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/item/data.rs"]
mod tests;
