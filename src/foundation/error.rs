use crate::foundation::core::ObjectId;

/// Convenience result type used across Kinema.
pub type KinemaResult<T> = Result<T, KinemaError>;

/// Top-level error taxonomy used by engine APIs.
#[derive(thiserror::Error, Debug)]
pub enum KinemaError {
    /// Invalid user-provided data (ranges, config values, lookups by name).
    #[error("validation error: {0}")]
    Validation(String),

    /// A relation-graph mutation would have introduced a cycle.
    #[error("cycle error: {child:?} is an ancestor of {parent:?}")]
    Cycle {
        /// Node that was asked to receive the child.
        parent: ObjectId,
        /// Node that would have become its own ancestor.
        child: ObjectId,
    },

    /// Recursive refresh marking was requested on an object that is not a graph node.
    #[error("scope error: {0}")]
    Scope(String),

    /// An item-producing updater function did not produce an item.
    #[error("updater return type error: {detail}, defined in {location}")]
    UpdaterReturnType {
        /// Source location of the offending updater construction.
        location: String,
        /// What was produced instead.
        detail: String,
    },

    /// A user update function reported an error.
    #[error("updater error: {message}, defined in {location}")]
    Updater {
        /// Source location of the offending updater construction.
        location: String,
        /// Rendered error chain of the user error.
        message: String,
    },

    /// An anim stack was queried in a way that does not match its structure.
    #[error("stack consistency error: {0}")]
    StackConsistency(String),

    /// An animation lifecycle transition happened out of order.
    #[error("lifecycle error: {0}")]
    Lifecycle(String),

    /// The object id is not (or no longer) known to the scene.
    #[error("unknown object: {0:?}")]
    UnknownObject(ObjectId),

    /// Errors when serializing or deserializing configuration.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl KinemaError {
    /// Build a [`KinemaError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`KinemaError::Scope`] value.
    pub fn scope(msg: impl Into<String>) -> Self {
        Self::Scope(msg.into())
    }

    /// Build a [`KinemaError::StackConsistency`] value.
    pub fn stack_consistency(msg: impl Into<String>) -> Self {
        Self::StackConsistency(msg.into())
    }

    /// Build a [`KinemaError::Lifecycle`] value.
    pub fn lifecycle(msg: impl Into<String>) -> Self {
        Self::Lifecycle(msg.into())
    }

    /// Build a [`KinemaError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Wrap a user update-function error together with where the updater was defined.
    pub fn updater(location: &std::panic::Location<'static>, err: &anyhow::Error) -> Self {
        Self::Updater {
            location: location.to_string(),
            message: format!("{err:#}"),
        }
    }

    /// Build a [`KinemaError::UpdaterReturnType`] value.
    pub fn updater_return_type(
        location: &std::panic::Location<'static>,
        detail: impl Into<String>,
    ) -> Self {
        Self::UpdaterReturnType {
            location: location.to_string(),
            detail: detail.into(),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
