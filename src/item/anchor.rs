use crate::foundation::core::{ObjectId, Point, Vec2};
use crate::foundation::error::{KinemaError, KinemaResult};
use crate::item::scene::Scene;

/// Box direction pointing at the center.
pub const ORIGIN: Vec2 = Vec2::new(0.0, 0.0);
/// Box direction towards larger `y`.
pub const UP: Vec2 = Vec2::new(0.0, 1.0);
/// Box direction towards smaller `y`.
pub const DOWN: Vec2 = Vec2::new(0.0, -1.0);
/// Box direction towards smaller `x`.
pub const LEFT: Vec2 = Vec2::new(-1.0, 0.0);
/// Box direction towards larger `x`.
pub const RIGHT: Vec2 = Vec2::new(1.0, 0.0);

/// A position given either directly or relative to an item's bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Anchor {
    /// Absolute scene coordinates.
    Point(Point),
    /// Point of the item's box: center plus `direction` times the half extents, so `(1, 1)`
    /// is the corner with the largest coordinates.
    Item(ObjectId, Vec2),
}

impl From<Point> for Anchor {
    fn from(p: Point) -> Self {
        Self::Point(p)
    }
}

impl Scene {
    /// Resolve `anchor` to scene coordinates.
    pub fn resolve_anchor(&mut self, anchor: Anchor) -> KinemaResult<Point> {
        match anchor {
            Anchor::Point(p) => Ok(p),
            Anchor::Item(id, direction) => {
                let rect = self.bounding_box(id)?.ok_or_else(|| {
                    KinemaError::validation(format!("{id:?} has no points to anchor to"))
                })?;
                let half = Vec2::new(rect.width() / 2.0, rect.height() / 2.0);
                let c = rect.center();
                Ok(Point::new(
                    c.x + direction.x * half.x,
                    c.y + direction.y * half.y,
                ))
            }
        }
    }

    /// Shift `id` and its descendants so that the `aligned_edge` point of its box lands on
    /// `target`.
    pub fn move_to(
        &mut self,
        id: ObjectId,
        target: impl Into<Anchor>,
        aligned_edge: Vec2,
    ) -> KinemaResult<()> {
        let to = self.resolve_anchor(target.into())?;
        let from = self.resolve_anchor(Anchor::Item(id, aligned_edge))?;
        self.shift(id, to - from)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/item/anchor.rs"]
mod tests;
