//! Render-side renderer: draws one render item with its geometry and shader.

use std::collections::HashMap;

use log::warn;

use super::context::Context;
use super::geometry::RenderGeometry;
use super::render_list::RenderItem;
use crate::common::{GeometryId, RendererId, ShaderId};
use crate::foundation::math::Mat4;

/// Attribute locations the default shaders bind positions and texture
/// coordinates to
pub const DEFAULT_ATTRIBUTE_LOCATIONS: [u32; 2] = [0, 1];

/// Renderer as the render thread sees it
#[derive(Debug, Clone, PartialEq)]
pub struct Renderer {
    id: RendererId,
    geometry: GeometryId,
    shader: ShaderId,
    blending: bool,
}

impl Renderer {
    /// Renderer drawing `geometry` with `shader`
    pub fn new(id: RendererId, geometry: GeometryId, shader: ShaderId) -> Self {
        Self { id, geometry, shader, blending: false }
    }

    /// Builder: blend when drawing
    #[must_use]
    pub fn with_blending(mut self, blending: bool) -> Self {
        self.blending = blending;
        self
    }

    /// Renderer id
    pub const fn id(&self) -> RendererId {
        self.id
    }

    /// Geometry drawn
    pub const fn geometry(&self) -> GeometryId {
        self.geometry
    }

    /// Shader used
    pub const fn shader(&self) -> ShaderId {
        self.shader
    }

    /// Draw one item; returns false if nothing was drawn
    pub fn render(
        &self,
        context: &mut dyn Context,
        geometries: &mut HashMap<GeometryId, RenderGeometry>,
        item: &RenderItem,
        projection: &Mat4,
    ) -> bool {
        let Some(geometry) = geometries.get_mut(&self.geometry) else {
            warn!("{} draws missing {}", self.id, self.geometry);
            return false;
        };

        let mvp = projection * item.model_view_matrix;
        context.use_program(self.shader);
        context.set_blending(self.blending || item.color.w < 1.0);
        context.set_uniform_matrix("uModelMatrix", &item.model_matrix);
        context.set_uniform_matrix("uModelView", &item.model_view_matrix);
        context.set_uniform_matrix("uMvpMatrix", &mvp);
        context.set_uniform_vec4("uColor", &item.color);

        geometry.upload_and_draw(context, &DEFAULT_ATTRIBUTE_LOCATIONS)
    }
}
