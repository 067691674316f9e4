use crate::foundation::error::{KinemaError, KinemaResult};
use crate::time::rate::RateFunc;

/// Global-clock extent `[at, end)` of an animation, in seconds.
///
/// `end` may be `f64::INFINITY` for animations whose extent is decided by context (baselines,
/// long-running updaters).
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TimeRange {
    /// Start instant.
    pub at: f64,
    /// End instant, `>= at`.
    pub end: f64,
}

impl TimeRange {
    /// Create a validated range. `at` must be finite; `end` must not precede it.
    pub fn new(at: f64, end: f64) -> KinemaResult<Self> {
        if !at.is_finite() {
            return Err(KinemaError::validation("TimeRange start must be finite"));
        }
        if end.is_nan() || end < at {
            return Err(KinemaError::validation(format!(
                "TimeRange end ({end}) must be >= start ({at})"
            )));
        }
        Ok(Self { at, end })
    }

    /// Range starting at `at` with a run time of `duration` seconds.
    pub fn with_duration(at: f64, duration: f64) -> KinemaResult<Self> {
        Self::new(at, at + duration)
    }

    /// Range starting at `at` that never ends.
    pub fn unbounded(at: f64) -> Self {
        Self {
            at,
            end: f64::INFINITY,
        }
    }

    /// `end - at`, infinite for unbounded ranges.
    pub fn duration(self) -> f64 {
        self.end - self.at
    }

    /// Return `true` when the range has no finite end.
    pub fn is_unbounded(self) -> bool {
        self.end.is_infinite()
    }

    /// Same range moved by `dt` seconds.
    pub fn shifted(self, dt: f64) -> Self {
        Self {
            at: self.at + dt,
            end: self.end + dt,
        }
    }

    /// Whether `t` falls inside the range.
    ///
    /// With `get_at_left` the range is treated as `(at, end]` (the left limit at a boundary
    /// sees the animation that just ended), otherwise as `[at, end)`.
    pub fn contains(self, t: f64, get_at_left: bool) -> bool {
        if get_at_left {
            self.at < t && t <= self.end
        } else {
            self.at <= t && t < self.end
        }
    }

    /// Normalized progress at `t` before rate shaping, clamped to `[0, 1]`.
    ///
    /// Unbounded ranges never progress and always report `0`.
    pub fn progress_at(self, t: f64) -> f64 {
        if t <= self.at || self.is_unbounded() {
            return 0.0;
        }
        if t >= self.end {
            return 1.0;
        }
        (t - self.at) / self.duration()
    }
}

/// Rate-shaped progress of `range` at global time `t`.
///
/// `0` at or before the start, `1` at or after a finite end, `rate(progress)` in between.
pub fn alpha_at(range: TimeRange, t: f64, rate: &RateFunc) -> f64 {
    if t <= range.at || range.is_unbounded() {
        return 0.0;
    }
    if t >= range.end {
        return 1.0;
    }
    rate.apply(range.progress_at(t))
}

#[cfg(test)]
#[path = "../../tests/unit/time/range.rs"]
mod tests;
