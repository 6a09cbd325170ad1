//! Per-node dirty flags.

use bitflags::bitflags;

bitflags! {
    /// Which categories of node state changed this frame
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct NodeFlags: u32 {
        /// Size, position, orientation, scale, parent origin or anchor point
        const TRANSFORM     = 0x001;
        /// Visible property
        const VISIBLE       = 0x002;
        /// Colour property
        const COLOR         = 0x004;
        /// Size property
        const SIZE          = 0x008;
        /// Overlay draw mode changed
        const OVERLAY       = 0x010;
        /// Sort modifier of the attachment changed
        const SORT_MODIFIER = 0x020;
        /// A child was disconnected
        const CHILD_DELETED = 0x040;

        /// Flags a child inherits from its parent
        const INHERITED = Self::TRANSFORM.bits() | Self::VISIBLE.bits() | Self::COLOR.bits() | Self::OVERLAY.bits();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inherited_subset() {
        let parent = NodeFlags::SIZE | NodeFlags::COLOR | NodeFlags::CHILD_DELETED;
        assert_eq!(parent & NodeFlags::INHERITED, NodeFlags::COLOR);
        assert!(NodeFlags::all().contains(NodeFlags::INHERITED));
    }
}
