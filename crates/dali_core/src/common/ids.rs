//! Stable identifiers for scene-graph objects.
//!
//! Ids are allocated on the event thread before the creation message is
//! sent, so the event side can address an object the update thread has not
//! seen yet. Every kind of object draws from one counter; an id is never
//! reused.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u64);

        impl $name {
            /// Wrap a raw id
            pub const fn from_raw(raw: u64) -> Self {
                Self(raw)
            }

            /// The raw id
            pub const fn raw(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }
    };
}

define_id!(
    /// Scene-graph node (layers and cameras included)
    NodeId, "node"
);
define_id!(
    /// Stand-alone property owner that is not part of the tree
    ObjectId, "object"
);
define_id!(
    /// Animation
    AnimationId, "animation"
);
define_id!(
    /// Constraint
    ConstraintId, "constraint"
);
define_id!(
    /// Render-side renderer
    RendererId, "renderer"
);
define_id!(
    /// Render-side geometry
    GeometryId, "geometry"
);
define_id!(
    /// Shader program
    ShaderId, "shader"
);
define_id!(
    /// Render task
    RenderTaskId, "task"
);
define_id!(
    /// Externally loaded resource (image, font atlas)
    ResourceId, "resource"
);

/// Any object that owns properties
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyOwnerId {
    /// A node in the tree
    Node(NodeId),
    /// A stand-alone object
    Object(ObjectId),
}

impl From<NodeId> for PropertyOwnerId {
    fn from(id: NodeId) -> Self {
        Self::Node(id)
    }
}

impl From<ObjectId> for PropertyOwnerId {
    fn from(id: ObjectId) -> Self {
        Self::Object(id)
    }
}

impl fmt::Display for PropertyOwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Node(id) => id.fmt(f),
            Self::Object(id) => id.fmt(f),
        }
    }
}

/// Thread-safe id source
#[derive(Debug)]
pub struct IdAllocator {
    next: AtomicU64,
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdAllocator {
    /// Ids start at 1
    pub const fn new() -> Self {
        Self { next: AtomicU64::new(1) }
    }

    fn next_raw(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }

    /// New node id
    pub fn node(&self) -> NodeId {
        NodeId(self.next_raw())
    }

    /// New object id
    pub fn object(&self) -> ObjectId {
        ObjectId(self.next_raw())
    }

    /// New animation id
    pub fn animation(&self) -> AnimationId {
        AnimationId(self.next_raw())
    }

    /// New constraint id
    pub fn constraint(&self) -> ConstraintId {
        ConstraintId(self.next_raw())
    }

    /// New renderer id
    pub fn renderer(&self) -> RendererId {
        RendererId(self.next_raw())
    }

    /// New geometry id
    pub fn geometry(&self) -> GeometryId {
        GeometryId(self.next_raw())
    }

    /// New shader id
    pub fn shader(&self) -> ShaderId {
        ShaderId(self.next_raw())
    }

    /// New render task id
    pub fn render_task(&self) -> RenderTaskId {
        RenderTaskId(self.next_raw())
    }

    /// New resource id
    pub fn resource(&self) -> ResourceId {
        ResourceId(self.next_raw())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_ids_unique_across_threads() {
        let ids = Arc::new(IdAllocator::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let ids = Arc::clone(&ids);
                std::thread::spawn(move || (0..100).map(|_| ids.node().raw()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for raw in handle.join().unwrap() {
                assert!(seen.insert(raw));
            }
        }
        assert_eq!(seen.len(), 400);
    }

    #[test]
    fn test_display() {
        assert_eq!(NodeId::from_raw(3).to_string(), "node#3");
        assert_eq!(PropertyOwnerId::from(ObjectId::from_raw(9)).to_string(), "object#9");
    }
}
