//! Vertex and index data on the render side.
//!
//! The update side builds a [`PropertyBufferData`] from typed vertices and
//! sends it through the render queue for the frame it belongs to, so the
//! render thread only ever sees complete data sets. The render-side
//! [`RenderPropertyBuffer`] uploads a new data set the first time it is
//! drawn after a change.

use bytemuck::{Pod, Zeroable};

use super::context::{BufferHandle, BufferTarget, Context};

/// Type of one vertex attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeType {
    /// One float
    Float,
    /// Two floats
    Vector2,
    /// Three floats
    Vector3,
    /// Four floats
    Vector4,
}

impl AttributeType {
    /// Floats per vertex
    pub const fn components(self) -> u32 {
        match self {
            Self::Float => 1,
            Self::Vector2 => 2,
            Self::Vector3 => 3,
            Self::Vector4 => 4,
        }
    }

    /// Bytes per vertex
    pub const fn size(self) -> u32 {
        self.components() * 4
    }
}

/// A named attribute within a vertex
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexAttribute {
    /// Attribute name in the shader
    pub name: String,
    /// Attribute type
    pub kind: AttributeType,
}

/// Layout of the vertices in a buffer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyBufferFormat {
    attributes: Vec<VertexAttribute>,
}

impl PropertyBufferFormat {
    /// Format without attributes
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: append an attribute
    #[must_use]
    pub fn with(mut self, name: &str, kind: AttributeType) -> Self {
        self.attributes.push(VertexAttribute { name: name.to_string(), kind });
        self
    }

    /// Attributes in vertex order
    pub fn attributes(&self) -> &[VertexAttribute] {
        &self.attributes
    }

    /// Bytes per vertex
    pub fn stride(&self) -> u32 {
        self.attributes.iter().map(|a| a.kind.size()).sum()
    }
}

/// Vertex with a 2D position and texture coordinates, the layout of the
/// default quad
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct TexturedVertex {
    /// Position in the unit square centred on the origin
    pub position: [f32; 2],
    /// Texture coordinates
    pub texture: [f32; 2],
}

impl TexturedVertex {
    /// Format matching this vertex
    pub fn format() -> PropertyBufferFormat {
        PropertyBufferFormat::new()
            .with("aPosition", AttributeType::Vector2)
            .with("aTexCoord", AttributeType::Vector2)
    }
}

/// One complete data set for a buffer
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyBufferData {
    format: PropertyBufferFormat,
    bytes: Vec<u8>,
    element_size: u32,
    element_count: u32,
}

impl PropertyBufferData {
    /// Vertex data from typed elements laid out as `format`
    pub fn from_vertices<T: Pod>(format: PropertyBufferFormat, vertices: &[T]) -> Self {
        debug_assert_eq!(std::mem::size_of::<T>() as u32, format.stride(), "vertex type does not match its format");
        Self {
            element_size: format.stride(),
            format,
            bytes: bytemuck::cast_slice(vertices).to_vec(),
            element_count: vertices.len() as u32,
        }
    }

    /// 16-bit index data
    pub fn from_indices(indices: &[u16]) -> Self {
        Self {
            format: PropertyBufferFormat::new(),
            bytes: bytemuck::cast_slice(indices).to_vec(),
            element_size: 2,
            element_count: indices.len() as u32,
        }
    }

    /// Vertex layout; empty for index data
    pub const fn format(&self) -> &PropertyBufferFormat {
        &self.format
    }

    /// Raw bytes
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Bytes per element
    pub const fn element_size(&self) -> u32 {
        self.element_size
    }

    /// Number of elements
    pub const fn element_count(&self) -> u32 {
        self.element_count
    }
}

/// Render-side buffer holding the latest data set and its GPU copy
#[derive(Debug)]
pub struct RenderPropertyBuffer {
    target: BufferTarget,
    data: PropertyBufferData,
    gpu_buffer: Option<BufferHandle>,
    data_changed: bool,
}

impl RenderPropertyBuffer {
    /// Buffer for `target` holding `data`, uploaded on first use
    pub fn new(target: BufferTarget, data: PropertyBufferData) -> Self {
        Self { target, data, gpu_buffer: None, data_changed: true }
    }

    /// Replace the data; uploaded on next use
    pub fn set_data(&mut self, data: PropertyBufferData) {
        self.data = data;
        self.data_changed = true;
    }

    /// Current data set
    pub const fn data(&self) -> &PropertyBufferData {
        &self.data
    }

    /// Number of elements in the current data set
    pub const fn element_count(&self) -> u32 {
        self.data.element_count
    }

    /// Upload if the data changed; returns true if anything was uploaded
    pub fn update(&mut self, context: &mut dyn Context) -> bool {
        if !self.data_changed && self.gpu_buffer.is_some() {
            return false;
        }
        let buffer = match self.gpu_buffer {
            Some(buffer) => buffer,
            None => {
                let buffer = context.create_buffer();
                self.gpu_buffer = Some(buffer);
                buffer
            }
        };
        context.buffer_data(self.target, buffer, &self.data.bytes);
        self.data_changed = false;
        true
    }

    /// Force a re-upload, for example after the context was recreated
    pub fn mark_changed(&mut self) {
        self.data_changed = true;
    }

    /// Bind the GPU buffer
    pub fn bind(&self, context: &mut dyn Context) {
        if let Some(buffer) = self.gpu_buffer {
            context.bind_buffer(self.target, buffer);
        }
    }

    /// Point `locations[base..]` at this buffer's attributes; returns how
    /// many attributes were enabled
    pub fn enable_vertex_attributes(&self, context: &mut dyn Context, locations: &[u32], base: usize) -> usize {
        let stride = self.data.format.stride();
        let mut offset = 0;
        let mut enabled = 0;
        for (attribute, location) in self.data.format.attributes().iter().zip(locations.iter().skip(base)) {
            context.vertex_attribute_pointer(*location, attribute.kind.components(), stride, offset);
            offset += attribute.kind.size();
            enabled += 1;
        }
        enabled
    }

    /// Release the GPU buffer; must run on the render thread
    pub fn gl_cleanup(&mut self, context: &mut dyn Context) {
        if let Some(buffer) = self.gpu_buffer.take() {
            context.delete_buffer(buffer);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::context::{GlCall, RecordingContext};

    fn quad() -> PropertyBufferData {
        let vertices = [
            TexturedVertex { position: [-0.5, -0.5], texture: [0.0, 0.0] },
            TexturedVertex { position: [0.5, -0.5], texture: [1.0, 0.0] },
            TexturedVertex { position: [-0.5, 0.5], texture: [0.0, 1.0] },
            TexturedVertex { position: [0.5, 0.5], texture: [1.0, 1.0] },
        ];
        PropertyBufferData::from_vertices(TexturedVertex::format(), &vertices)
    }

    #[test]
    fn test_vertex_layout() {
        let data = quad();
        assert_eq!(data.element_count(), 4);
        assert_eq!(data.element_size(), 16);
        assert_eq!(data.bytes().len(), 64);
    }

    #[test]
    fn test_upload_only_when_changed() {
        let mut context = RecordingContext::new();
        let mut buffer = RenderPropertyBuffer::new(BufferTarget::Array, quad());
        assert!(buffer.update(&mut context));
        assert!(!buffer.update(&mut context));

        buffer.set_data(PropertyBufferData::from_vertices(TexturedVertex::format(), &[TexturedVertex::zeroed()]));
        assert!(buffer.update(&mut context));
        assert_eq!(context.live_buffer_count(), 1);

        buffer.gl_cleanup(&mut context);
        assert_eq!(context.live_buffer_count(), 0);
    }

    #[test]
    fn test_attribute_pointers() {
        let mut context = RecordingContext::new();
        let buffer = RenderPropertyBuffer::new(BufferTarget::Array, quad());
        assert_eq!(buffer.enable_vertex_attributes(&mut context, &[0, 1], 0), 2);
        assert_eq!(
            context.calls()[1],
            GlCall::VertexAttributePointer { location: 1, components: 2, stride: 16, offset: 8 }
        );
    }
}
