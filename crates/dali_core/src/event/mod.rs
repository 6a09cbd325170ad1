//! # Event Side
//!
//! The application-facing half of the pipeline. Calls made here never touch
//! scene-graph state directly; they become [`UpdateMessage`](crate::update::UpdateMessage)s
//! that the update thread applies at the start of its next frame.

pub mod controller;

pub use controller::{SceneController, Stage};
