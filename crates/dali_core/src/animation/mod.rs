//! # Animation and Constraints
//!
//! Animations own animators, each driving one property of one owner by
//! `(owner, index)`. Constraints recompute one property from others every
//! frame. Neither keeps a reference to its targets: lookups go through
//! [`PropertyOwnerLookup`](crate::property::PropertyOwnerLookup) each frame
//! and lifecycle changes arrive through the observer registry.

pub mod alpha;
#[allow(clippy::module_inception)]
pub mod animation;
pub mod animator;
pub mod constraint;
pub mod key_frames;

pub use alpha::AlphaFunction;
pub use animation::{Animation, AnimationState, PlayDirection};
pub use animator::{Animator, AnimatorFunction, EndAction};
pub use constraint::{
    default_interpolator, ApplyResult, Constraint, ConstraintFunction, ConstraintSource, Interpolator, RemoveAction,
    FINAL_WEIGHT,
};
pub use key_frames::{Interpolation, KeyFrames};
