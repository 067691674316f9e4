//! Kinema is the reactive core of a programmatic animation engine.
//!
//! It has two halves:
//!
//! - A reactive cache: objects live in a [`RelationGraph`], announce changes through a
//!   [`SignalBus`], and memoize derived values in a [`RefreshCache`] that signals mark dirty,
//!   optionally along the graph.
//! - Time-indexed anim stacks: every item of a [`Scene`] has an [`AnimStack`] of committed
//!   baselines and time-ranged animation entries, so its exact state can be computed at any
//!   global time, from either side of a boundary instant.
//!
//! The public API is session-oriented: create a [`Timeline`], spawn items, [`Timeline::play`]
//! animations such as [`DataUpdater`], [`GroupUpdater`], [`ItemUpdater`] or [`AnimGroup`],
//! then query [`Timeline::state_at`] or [`Timeline::render_calls_at`] in any order.
#![forbid(unsafe_code)]

mod foundation;

pub(crate) mod animation;
pub(crate) mod item;
pub(crate) mod refresh;
pub(crate) mod relation;
pub(crate) mod render;
pub(crate) mod session;
pub(crate) mod signal;
pub(crate) mod time;
pub(crate) mod updater;

pub use crate::foundation::core::{
    Affine, Fps, FrameIndex, FrameRange, KindId, ObjectId, Point, Rect, Rgba8Premul, Vec2,
};
pub use crate::foundation::error::{KinemaError, KinemaResult};
pub use crate::foundation::fingerprint::StateFingerprint;

pub use crate::relation::graph::{Direction, NodeLinks, RelationGraph, Walk};
pub use crate::refresh::cache::{
    Computation, ComputationId, ComputationRegistry, Recurse, RefreshCache,
};
pub use crate::signal::bus::{
    CallbackFn, ComputationRef, SelfSlotFn, Signal, SignalBus, SignalHost, SignalId,
};
pub use crate::signal::kinds::KindRegistry;

pub use crate::time::range::{TimeRange, alpha_at};
pub use crate::time::rate::{Ease, RateFunc};
pub use crate::time::schedule::{Schedule, Task};

pub use crate::animation::anim::{AnimBase, AnimId, Animation, Interpolate, Lerp};
pub use crate::animation::appearance::Appearances;
pub use crate::animation::group::AnimGroup;
pub use crate::animation::lifecycle::{Lifecycle, LifecycleState};
pub use crate::animation::stack::{AnimStack, ApplyParams, StackApplier};

pub use crate::item::anchor::{Anchor, DOWN, LEFT, ORIGIN, RIGHT, UP};
pub use crate::item::data::ItemData;
pub use crate::item::scene::{Builtins, Scene, SceneState};
pub use crate::item::tree::{ItemTree, TreeNode};

pub use crate::updater::data::{DataUpdateFn, DataUpdater};
pub use crate::updater::group::{GroupUpdateFn, GroupUpdater};
pub use crate::updater::item::{ItemUpdateFn, ItemUpdater};
pub use crate::updater::params::{ExtraFn, UpdaterParams, lag_alpha};

pub use crate::render::registry::{RenderCall, RenderCtx, RenderSource, Renderer, RendererRegistry};
pub use crate::session::config::TimelineConfig;
pub use crate::session::timeline::{Diagnostic, FrameCalls, Timeline};
