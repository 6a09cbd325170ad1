//! # Update Side
//!
//! Everything the update thread runs once per frame: message processing,
//! animation and constraint application, world transform propagation and
//! render instruction preparation, plus deferred destruction of objects
//! the render thread may still read.

pub mod discard_queue;
pub mod message;
pub mod notification;
pub mod prepare;
pub mod render_objects;
pub mod render_task;
pub mod transform;
pub mod update_manager;

pub use discard_queue::{DiscardQueue, Discardable};
pub use message::{AnimationCommand, LayerOption, NodeOption, RenderableOption, UpdateMessage};
pub use notification::{notification_channel, Notification, NotificationQueue, NOTIFICATION_CAPACITY};
pub use prepare::{process_render_tasks, PrepareOptions, PrepareStats};
pub use render_objects::RenderObjects;
pub use render_task::{RenderTask, RenderTaskList};
pub use transform::{update_node_transforms, TransformStats};
pub use update_manager::{FrameStats, OwnerStore, UpdateManager, UpdateStatus};
