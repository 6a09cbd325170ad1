//! Render instructions: the update side's per-frame output for the render
//! thread.
//!
//! One instruction per render task per frame. The container for each
//! buffer index is written by the update thread and read by the render
//! thread one frame later; the mutex per slot only ever sees contention
//! when the frame gate is misused.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::render_list::RenderList;
use crate::common::{BufferIndex, RenderTaskId};
use crate::foundation::math::{Mat4, Vec4, Viewport};

/// Everything needed to draw one render task
#[derive(Debug, Clone)]
pub struct RenderInstruction {
    task: Option<RenderTaskId>,
    render_lists: Vec<RenderList>,
    next_free_render_list: usize,
    view_matrix: Mat4,
    projection_matrix: Mat4,
    viewport: Option<Viewport>,
    clear_color: Option<Vec4>,
}

impl Default for RenderInstruction {
    fn default() -> Self {
        Self {
            task: None,
            render_lists: Vec::with_capacity(6),
            next_free_render_list: 0,
            view_matrix: Mat4::identity(),
            projection_matrix: Mat4::identity(),
            viewport: None,
            clear_color: None,
        }
    }
}

impl RenderInstruction {
    /// Prepare for a new frame of `task`, rewinding every render list
    pub fn reset(
        &mut self,
        task: RenderTaskId,
        view_matrix: Mat4,
        projection_matrix: Mat4,
        viewport: Option<Viewport>,
        clear_color: Option<Vec4>,
    ) {
        self.task = Some(task);
        self.view_matrix = view_matrix;
        self.projection_matrix = projection_matrix;
        self.viewport = viewport;
        self.clear_color = clear_color;
        self.next_free_render_list = 0;
        for list in &mut self.render_lists {
            list.reset();
        }
    }

    /// Next render list, with room for `capacity` items
    pub fn next_free_render_list(&mut self, capacity: usize) -> &mut RenderList {
        if self.render_lists.len() <= self.next_free_render_list {
            self.render_lists.push(RenderList::new());
        }
        let list = &mut self.render_lists[self.next_free_render_list];
        if list.capacity() < capacity {
            list.reserve(capacity);
        }
        self.next_free_render_list += 1;
        list
    }

    /// Render lists in draw order
    pub fn render_lists(&self) -> &[RenderList] {
        &self.render_lists[..self.next_free_render_list]
    }

    /// Number of render lists in use
    pub const fn render_list_count(&self) -> usize {
        self.next_free_render_list
    }

    /// Render task this instruction draws
    pub const fn task(&self) -> Option<RenderTaskId> {
        self.task
    }

    /// Camera view matrix
    pub const fn view_matrix(&self) -> &Mat4 {
        &self.view_matrix
    }

    /// Camera projection matrix
    pub const fn projection_matrix(&self) -> &Mat4 {
        &self.projection_matrix
    }

    /// Viewport, if the task sets one
    pub const fn viewport(&self) -> Option<Viewport> {
        self.viewport
    }

    /// Clear colour, if the task clears
    pub const fn clear_color(&self) -> Option<Vec4> {
        self.clear_color
    }

    /// Trim unused render lists and cached items
    pub fn release_unused_items(&mut self) {
        for list in &mut self.render_lists {
            list.release_unused_items();
        }
        self.render_lists.truncate(self.next_free_render_list);
    }
}

/// The instructions of one frame, reused across frames
#[derive(Debug, Clone, Default)]
pub struct RenderInstructionContainer {
    instructions: Vec<RenderInstruction>,
    count: usize,
    frame: u64,
}

impl RenderInstructionContainer {
    /// Empty container
    pub fn new() -> Self {
        Self::default()
    }

    /// Rewind for `frame`, reserving room for `capacity` instructions
    pub fn reset_and_reserve(&mut self, frame: u64, capacity: usize) {
        self.count = 0;
        self.frame = frame;
        self.instructions.reserve(capacity.saturating_sub(self.instructions.len()));
    }

    /// Next instruction to fill
    pub fn next_instruction(&mut self) -> &mut RenderInstruction {
        if self.instructions.len() <= self.count {
            self.instructions.push(RenderInstruction::default());
        }
        let instruction = &mut self.instructions[self.count];
        self.count += 1;
        instruction
    }

    /// Instructions in use
    pub fn instructions(&self) -> &[RenderInstruction] {
        &self.instructions[..self.count]
    }

    /// Number of instructions in use
    pub const fn count(&self) -> usize {
        self.count
    }

    /// Frame the instructions were prepared for
    pub const fn frame(&self) -> u64 {
        self.frame
    }

    /// Trim unused instructions, lists and items
    pub fn release_unused_items(&mut self) {
        self.instructions.truncate(self.count);
        for instruction in &mut self.instructions {
            instruction.release_unused_items();
        }
    }
}

/// Two instruction containers, one per buffer index
#[derive(Debug, Default)]
pub struct RenderInstructionBuffers {
    slots: [Mutex<RenderInstructionContainer>; 2],
    published: AtomicU64,
}

impl RenderInstructionBuffers {
    /// Empty buffers; nothing published
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the container for `buffer`
    pub fn lock(&self, buffer: BufferIndex) -> MutexGuard<'_, RenderInstructionContainer> {
        self.slots[buffer.get()].lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mark `frame` as fully written; frames are numbered from 1
    pub fn publish(&self, frame: u64) {
        self.published.store(frame, Ordering::Release);
    }

    /// Latest fully written frame, 0 if none
    pub fn published_frame(&self) -> u64 {
        self.published.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instruction_reuses_lists() {
        let mut instruction = RenderInstruction::default();
        let task = RenderTaskId::from_raw(1);
        instruction.reset(task, Mat4::identity(), Mat4::identity(), None, None);
        instruction.next_free_render_list(4).next_free_item();
        instruction.next_free_render_list(0);
        assert_eq!(instruction.render_list_count(), 2);

        instruction.reset(task, Mat4::identity(), Mat4::identity(), None, None);
        assert_eq!(instruction.render_list_count(), 0);
        let list = instruction.next_free_render_list(1);
        assert!(list.is_empty());
        assert_eq!(list.cached_item_count(), 1);

        instruction.release_unused_items();
        assert_eq!(instruction.render_lists().len(), 1);
        assert_eq!(instruction.render_lists()[0].cached_item_count(), 0);
    }

    #[test]
    fn test_buffers_publish() {
        let buffers = RenderInstructionBuffers::new();
        assert_eq!(buffers.published_frame(), 0);
        {
            let mut container = buffers.lock(BufferIndex::ONE);
            container.reset_and_reserve(1, 1);
            container.next_instruction();
        }
        buffers.publish(1);
        assert_eq!(buffers.published_frame(), 1);
        assert_eq!(buffers.lock(BufferIndex::ONE).count(), 1);
        assert_eq!(buffers.lock(BufferIndex::ONE).frame(), 1);
        assert_eq!(buffers.lock(BufferIndex::ZERO).count(), 0);
    }
}
