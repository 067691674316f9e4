use std::cell::{Cell, RefCell};

use crate::foundation::error::{KinemaError, KinemaResult};

/// Where an animation is in its life.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleState {
    /// Built but not registered on a timeline.
    Constructed,
    /// Registered; its stack entries exist.
    Began,
    /// Sampled at least once.
    Interpolating,
    /// End of range reached and final state applied.
    Finished,
    /// Resources released.
    CleanedUp,
    /// A user function failed; the animation no longer contributes to any stack.
    Errored,
    /// Removed from the timeline before or while running.
    Cancelled,
}

/// Shared state machine of one animation.
///
/// Stack entries hold an `Rc<Lifecycle>` so that a failure observed while sampling one item
/// silences the animation on every item it targets.
#[derive(Debug)]
pub struct Lifecycle {
    label: String,
    state: Cell<LifecycleState>,
    error: RefCell<Option<KinemaError>>,
    message: RefCell<Option<String>>,
}

impl Lifecycle {
    /// Create a lifecycle in [`LifecycleState::Constructed`].
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            state: Cell::new(LifecycleState::Constructed),
            error: RefCell::new(None),
            message: RefCell::new(None),
        }
    }

    /// Human-readable label used in diagnostics.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn state(&self) -> LifecycleState {
        self.state.get()
    }

    /// Return `true` once the animation failed.
    pub fn is_errored(&self) -> bool {
        self.state.get() == LifecycleState::Errored
    }

    /// `Constructed -> Began`.
    pub fn begin(&self) -> KinemaResult<()> {
        self.transition(&[LifecycleState::Constructed], LifecycleState::Began)
    }

    /// Record a sample. Returns `false` when the animation must be skipped.
    ///
    /// Sampling is allowed in any order and at any alpha once begun, including after the
    /// animation finished or was cleaned up (scrubbing backwards).
    pub fn note_interpolate(&self) -> bool {
        match self.state.get() {
            LifecycleState::Began => {
                self.state.set(LifecycleState::Interpolating);
                true
            }
            LifecycleState::Interpolating
            | LifecycleState::Finished
            | LifecycleState::CleanedUp => true,
            LifecycleState::Constructed | LifecycleState::Errored | LifecycleState::Cancelled => {
                false
            }
        }
    }

    /// `Began | Interpolating -> Finished`. A no-op on an errored or cancelled animation.
    pub fn finish(&self) -> KinemaResult<()> {
        if self.is_terminal() {
            return Ok(());
        }
        self.transition(
            &[LifecycleState::Began, LifecycleState::Interpolating],
            LifecycleState::Finished,
        )
    }

    /// `Finished -> CleanedUp`. Errored and cancelled animations keep their state.
    pub fn cleanup(&self) -> KinemaResult<()> {
        if self.is_terminal() {
            return Ok(());
        }
        self.transition(&[LifecycleState::Finished], LifecycleState::CleanedUp)
    }

    /// Stop contributing for good, without recording an error.
    pub fn cancel(&self) {
        if !self.is_terminal() {
            self.state.set(LifecycleState::Cancelled);
        }
    }

    /// Move to the error-terminal state, keeping the first error.
    pub fn fail(&self, err: KinemaError) {
        if self.is_terminal() {
            return;
        }
        tracing::error!(animation = %self.label, error = %err, "animation failed");
        self.state.set(LifecycleState::Errored);
        *self.message.borrow_mut() = Some(err.to_string());
        *self.error.borrow_mut() = Some(err);
    }

    /// Rendered error, if the animation failed.
    pub fn error_message(&self) -> Option<String> {
        self.message.borrow().clone()
    }

    /// Take the stored error out. The state and [`Lifecycle::error_message`] are kept.
    pub fn take_error(&self) -> Option<KinemaError> {
        self.error.borrow_mut().take()
    }

    fn is_terminal(&self) -> bool {
        matches!(
            self.state.get(),
            LifecycleState::Errored | LifecycleState::Cancelled
        )
    }

    fn transition(&self, from: &[LifecycleState], to: LifecycleState) -> KinemaResult<()> {
        let cur = self.state.get();
        if !from.contains(&cur) {
            return Err(KinemaError::lifecycle(format!(
                "`{}` cannot go from {cur:?} to {to:?}",
                self.label
            )));
        }
        self.state.set(to);
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/lifecycle.rs"]
mod tests;
