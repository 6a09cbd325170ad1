//! Render-side geometry: vertex buffers, an optional index buffer and a
//! primitive type.

use super::context::{BufferTarget, Context, PrimitiveMode};
use super::property_buffer::{PropertyBufferData, RenderPropertyBuffer, TexturedVertex};

/// Primitive type of a geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GeometryType {
    /// Independent triangles
    #[default]
    Triangles,
    /// Independent lines
    Lines,
    /// Points; always drawn without indices
    Points,
    /// Triangle strip
    TriangleStrip,
    /// Triangle fan
    TriangleFan,
    /// Closed line loop
    LineLoop,
    /// Open line strip
    LineStrip,
}

impl GeometryType {
    /// Topology passed to the draw call
    pub const fn primitive(self) -> PrimitiveMode {
        match self {
            Self::Triangles => PrimitiveMode::Triangles,
            Self::Lines => PrimitiveMode::Lines,
            Self::Points => PrimitiveMode::Points,
            Self::TriangleStrip => PrimitiveMode::TriangleStrip,
            Self::TriangleFan => PrimitiveMode::TriangleFan,
            Self::LineLoop => PrimitiveMode::LineLoop,
            Self::LineStrip => PrimitiveMode::LineStrip,
        }
    }
}

/// Geometry as the render thread draws it
#[derive(Debug, Default)]
pub struct RenderGeometry {
    geometry_type: GeometryType,
    vertex_buffers: Vec<RenderPropertyBuffer>,
    index_buffer: Option<RenderPropertyBuffer>,
}

impl RenderGeometry {
    /// Geometry without data
    pub fn new(geometry_type: GeometryType) -> Self {
        Self { geometry_type, ..Self::default() }
    }

    /// Unit quad centred on the origin, drawn as two indexed triangles
    pub fn quad() -> Self {
        let mut geometry = Self::new(GeometryType::Triangles);
        geometry.add_vertex_buffer(quad_vertices());
        geometry.set_indices(PropertyBufferData::from_indices(&[0, 3, 1, 0, 2, 3]));
        geometry
    }

    /// Primitive type
    pub const fn geometry_type(&self) -> GeometryType {
        self.geometry_type
    }

    /// Change the primitive type
    pub fn set_geometry_type(&mut self, geometry_type: GeometryType) {
        self.geometry_type = geometry_type;
    }

    /// Append a vertex buffer
    pub fn add_vertex_buffer(&mut self, data: PropertyBufferData) {
        self.vertex_buffers.push(RenderPropertyBuffer::new(BufferTarget::Array, data));
    }

    /// Replace the data of vertex buffer `index`; returns false if there is
    /// no such buffer
    pub fn set_vertex_data(&mut self, index: usize, data: PropertyBufferData) -> bool {
        match self.vertex_buffers.get_mut(index) {
            Some(buffer) => {
                buffer.set_data(data);
                true
            }
            None => false,
        }
    }

    /// Set or replace the index data
    pub fn set_indices(&mut self, data: PropertyBufferData) {
        match self.index_buffer.as_mut() {
            Some(buffer) => buffer.set_data(data),
            None => self.index_buffer = Some(RenderPropertyBuffer::new(BufferTarget::ElementArray, data)),
        }
    }

    /// Number of vertex buffers
    pub fn vertex_buffer_count(&self) -> usize {
        self.vertex_buffers.len()
    }

    /// The context was recreated: upload everything again on next draw
    pub fn gl_context_created(&mut self) {
        for buffer in &mut self.vertex_buffers {
            buffer.mark_changed();
        }
        if let Some(buffer) = self.index_buffer.as_mut() {
            buffer.mark_changed();
        }
    }

    /// Upload changed data, bind it and draw
    ///
    /// Uses an indexed draw when index data is present, unless the geometry
    /// is points; otherwise draws as many vertices as the first vertex
    /// buffer holds. Returns false if there was nothing to draw.
    pub fn upload_and_draw(&mut self, context: &mut dyn Context, attribute_locations: &[u32]) -> bool {
        let mut base = 0;
        for buffer in &mut self.vertex_buffers {
            buffer.update(context);
            buffer.bind(context);
            base += buffer.enable_vertex_attributes(context, attribute_locations, base);
        }
        if let Some(buffer) = self.index_buffer.as_mut() {
            buffer.update(context);
            buffer.bind(context);
        }

        let mode = self.geometry_type.primitive();
        let index_count = self.index_buffer.as_ref().map_or(0, RenderPropertyBuffer::element_count);
        let drawn = if index_count > 0 && self.geometry_type != GeometryType::Points {
            context.draw_elements(mode, index_count);
            true
        } else {
            match self.vertex_buffers.first().map(RenderPropertyBuffer::element_count) {
                Some(count) if count > 0 => {
                    context.draw_arrays(mode, 0, count);
                    true
                }
                _ => false,
            }
        };

        for location in attribute_locations.iter().take(base) {
            context.disable_vertex_attribute(*location);
        }
        drawn
    }

    /// Release every GPU buffer; must run on the render thread
    pub fn gl_cleanup(&mut self, context: &mut dyn Context) {
        for buffer in &mut self.vertex_buffers {
            buffer.gl_cleanup(context);
        }
        if let Some(buffer) = self.index_buffer.as_mut() {
            buffer.gl_cleanup(context);
        }
    }
}

fn quad_vertices() -> PropertyBufferData {
    let vertices = [
        TexturedVertex { position: [-0.5, -0.5], texture: [0.0, 0.0] },
        TexturedVertex { position: [0.5, -0.5], texture: [1.0, 0.0] },
        TexturedVertex { position: [-0.5, 0.5], texture: [0.0, 1.0] },
        TexturedVertex { position: [0.5, 0.5], texture: [1.0, 1.0] },
    ];
    PropertyBufferData::from_vertices(TexturedVertex::format(), &vertices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::context::{GlCall, RecordingContext};

    fn draws(context: &RecordingContext) -> Vec<GlCall> {
        context
            .calls()
            .iter()
            .filter(|c| matches!(c, GlCall::DrawElements { .. } | GlCall::DrawArrays { .. }))
            .cloned()
            .collect()
    }

    #[test]
    fn test_indexed_quad() {
        let mut context = RecordingContext::new();
        let mut geometry = RenderGeometry::quad();
        assert!(geometry.upload_and_draw(&mut context, &[0, 1]));
        assert_eq!(draws(&context), vec![GlCall::DrawElements { mode: PrimitiveMode::Triangles, count: 6 }]);
        assert_eq!(context.live_buffer_count(), 2);
    }

    #[test]
    fn test_points_ignore_indices() {
        let mut context = RecordingContext::new();
        let mut geometry = RenderGeometry::quad();
        geometry.set_geometry_type(GeometryType::Points);
        geometry.upload_and_draw(&mut context, &[0, 1]);
        assert_eq!(draws(&context), vec![GlCall::DrawArrays { mode: PrimitiveMode::Points, first: 0, count: 4 }]);
    }

    #[test]
    fn test_second_draw_does_not_reupload() {
        let mut context = RecordingContext::new();
        let mut geometry = RenderGeometry::quad();
        geometry.upload_and_draw(&mut context, &[0, 1]);
        context.take_calls();
        geometry.upload_and_draw(&mut context, &[0, 1]);
        assert!(!context.calls().iter().any(|c| matches!(c, GlCall::BufferData { .. })));

        geometry.set_indices(PropertyBufferData::from_indices(&[0, 1, 2]));
        context.take_calls();
        geometry.upload_and_draw(&mut context, &[0, 1]);
        let uploads = context.calls().iter().filter(|c| matches!(c, GlCall::BufferData { .. })).count();
        assert_eq!(uploads, 1);
    }

    #[test]
    fn test_cleanup_releases_buffers() {
        let mut context = RecordingContext::new();
        let mut geometry = RenderGeometry::quad();
        geometry.upload_and_draw(&mut context, &[0, 1]);
        geometry.gl_cleanup(&mut context);
        assert_eq!(context.live_buffer_count(), 0);
    }

    #[test]
    fn test_empty_geometry_draws_nothing() {
        let mut context = RecordingContext::new();
        let mut geometry = RenderGeometry::new(GeometryType::Lines);
        assert!(!geometry.upload_and_draw(&mut context, &[]));
    }
}
