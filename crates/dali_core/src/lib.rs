//! # DALi Core
//!
//! A retained-mode scene graph with a double-buffered update/render pipeline.
//!
//! ## Features
//!
//! - **Three Sides**: the event side sends messages, the update side owns the
//!   scene graph, the render side only reads prepared instructions
//! - **Double Buffering**: every animatable value keeps one copy per buffer
//!   index so update and render never touch the same slot
//! - **Animations and Constraints**: type-erased property access by
//!   `(owner, index)` with bake, set and relative writes
//! - **Render Instructions**: layers sorted into opaque, transparent, overlay
//!   and stencil lists, with frustum culling and depth sorting
//! - **Deferred Destruction**: released objects outlive the frame the render
//!   side may still be drawing
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dali_core::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut core = Core::new(&CoreConfig::default(), RecordingContext::new())?;
//!     let stage = core.scene().install_default_stage(480.0, 800.0)?;
//!
//!     let actor = core.scene().create_node();
//!     core.scene().add(stage.root, actor);
//!
//!     let id = core.scene().ids().animation();
//!     let mut animation = Animation::new(id, 1.0);
//!     animation.add_animator(Animator::new(
//!         actor,
//!         NodeProperty::Position.index(),
//!         AnimatorFunction::AnimateTo(PropertyValue::Vector3(Vec3::new(100.0, 0.0, 0.0))),
//!         1.0,
//!     ));
//!     core.scene().add_animation(animation);
//!     core.scene().play(id);
//!
//!     for _ in 0..60 {
//!         core.frame(1.0 / 60.0);
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

// Shared building blocks
pub mod common;
pub mod config;
pub mod core;
pub mod foundation;

// Update-side scene model
pub mod animation;
pub mod nodes;
pub mod property;

// The three sides
pub mod event;
pub mod render;
pub mod update;

mod pipeline;

pub use pipeline::{Core, FrameGate, PipelineError, PipelineReport, ThreadedPipeline};

/// Common imports for users of the core
pub mod prelude {
    pub use crate::{
        Core, PipelineError, PipelineReport, ThreadedPipeline,
        animation::{AlphaFunction, Animation, Animator, AnimatorFunction, Constraint, ConstraintSource, EndAction},
        common::{NodeId, ObjectId, PropertyOwnerId},
        core::{Config, CoreConfig, RenderConfig, UpdateConfig},
        event::{SceneController, Stage},
        foundation::math::{Mat4, Quat, Vec2, Vec3, Vec4},
        nodes::{CameraAttachment, DrawMode, NodeAttachment, NodeProperty, RenderableAttachment},
        property::{PropertyError, PropertyValue, WriteMode},
        render::{Context, RecordingContext},
        update::{AnimationCommand, LayerOption, NodeOption, Notification, RenderableOption},
    };
}
