//! Double-buffer slot selection.

/// Selects one of the two double-buffered slots
///
/// A bare `usize` is never used to address a buffered value; every accessor
/// takes a `BufferIndex`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BufferIndex(u8);

impl BufferIndex {
    /// Slot 0
    pub const ZERO: Self = Self(0);
    /// Slot 1
    pub const ONE: Self = Self(1);

    /// Buffer index used by frame number `frame`
    pub const fn for_frame(frame: u64) -> Self {
        Self((frame % 2) as u8)
    }

    /// The opposite slot
    #[must_use]
    pub const fn other(self) -> Self {
        Self(1 - self.0)
    }

    /// Slot as an array index
    pub const fn get(self) -> usize {
        self.0 as usize
    }
}

/// Tracks which slot the update side writes and which one the render side reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneGraphBuffers {
    update: BufferIndex,
}

impl Default for SceneGraphBuffers {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneGraphBuffers {
    /// Update writes slot 0 first
    pub const fn new() -> Self {
        Self { update: BufferIndex::ZERO }
    }

    /// Slot written by the current update pass
    pub const fn update_buffer_index(&self) -> BufferIndex {
        self.update
    }

    /// Slot read by the render pass
    pub const fn render_buffer_index(&self) -> BufferIndex {
        self.update.other()
    }

    /// Flip the slots once all writes for a frame are complete
    pub fn swap(&mut self) {
        self.update = self.update.other();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_swap_alternates() {
        let mut buffers = SceneGraphBuffers::new();
        assert_eq!(buffers.update_buffer_index(), BufferIndex::ZERO);
        assert_eq!(buffers.render_buffer_index(), BufferIndex::ONE);
        buffers.swap();
        assert_eq!(buffers.update_buffer_index(), BufferIndex::ONE);
        assert_eq!(buffers.render_buffer_index(), BufferIndex::ZERO);
    }

    #[test]
    fn test_for_frame() {
        assert_eq!(BufferIndex::for_frame(4), BufferIndex::ZERO);
        assert_eq!(BufferIndex::for_frame(7).get(), 1);
        assert_eq!(BufferIndex::ZERO.other().other(), BufferIndex::ZERO);
    }
}
