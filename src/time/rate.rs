use std::rc::Rc;

/// Built-in easing curves. Every curve maps `0 -> 0` and `1 -> 1` except
/// [`Ease::ThereAndBack`], which returns to `0`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Ease {
    /// Identity.
    #[default]
    Linear,
    /// Quadratic ease-in.
    InQuad,
    /// Quadratic ease-out.
    OutQuad,
    /// Quadratic ease-in-out.
    InOutQuad,
    /// Cubic ease-in.
    InCubic,
    /// Cubic ease-out.
    OutCubic,
    /// Cubic ease-in-out.
    InOutCubic,
    /// Normalized logistic curve.
    Smooth,
    /// First half of [`Ease::Smooth`], stretched to the full range.
    RushInto,
    /// Second half of [`Ease::Smooth`], stretched to the full range.
    RushFrom,
    /// [`Ease::Smooth`] up to the midpoint and back down.
    ThereAndBack,
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn smooth(t: f64) -> f64 {
    const INFLECTION: f64 = 10.0;
    let error = sigmoid(-INFLECTION / 2.0);
    ((sigmoid(INFLECTION * (t - 0.5)) - error) / (1.0 - 2.0 * error)).clamp(0.0, 1.0)
}

impl Ease {
    /// Apply the curve to `t`, clamped to `[0, 1]` first.
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::InQuad => t * t,
            Self::OutQuad => 1.0 - (1.0 - t) * (1.0 - t),
            Self::InOutQuad => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - ((-2.0 * t + 2.0).powi(2) / 2.0)
                }
            }
            Self::InCubic => t * t * t,
            Self::OutCubic => 1.0 - (1.0 - t).powi(3),
            Self::InOutCubic => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - ((-2.0 * t + 2.0).powi(3) / 2.0)
                }
            }
            Self::Smooth => smooth(t),
            Self::RushInto => 2.0 * smooth(t / 2.0),
            Self::RushFrom => 2.0 * smooth(t / 2.0 + 0.5) - 1.0,
            Self::ThereAndBack => {
                let folded = if t < 0.5 { 2.0 * t } else { 2.0 * (1.0 - t) };
                smooth(folded)
            }
        }
    }
}

/// Rate function mapping linear progress to alpha.
///
/// Custom functions should satisfy `f(0) = 0` and `f(1) = 1`; this is not checked.
#[derive(Clone)]
pub enum RateFunc {
    /// One of the built-in curves.
    Ease(Ease),
    /// Arbitrary user curve.
    Custom(Rc<dyn Fn(f64) -> f64>),
}

impl RateFunc {
    pub fn custom(f: impl Fn(f64) -> f64 + 'static) -> Self {
        Self::Custom(Rc::new(f))
    }

    /// Shape linear progress `t`.
    pub fn apply(&self, t: f64) -> f64 {
        match self {
            Self::Ease(e) => e.apply(t),
            Self::Custom(f) => f(t),
        }
    }
}

impl Default for RateFunc {
    fn default() -> Self {
        Self::Ease(Ease::Linear)
    }
}

impl From<Ease> for RateFunc {
    fn from(e: Ease) -> Self {
        Self::Ease(e)
    }
}

impl std::fmt::Debug for RateFunc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ease(e) => f.debug_tuple("Ease").field(e).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/time/rate.rs"]
mod tests;
