//! Render task processing and render instruction preparation.
//!
//! For every render task the subtree under its source node is walked once
//! to partition visible, ready renderables into the four lists of the layer
//! they belong to. Each layer then produces up to four render lists in
//! draw order: stencil, opaque, transparent, overlay. Items are culled
//! against clip space, transparent items are sorted back to front, and
//! every list gets the depth/stencil flags the render thread draws it with.

use log::{debug, trace};

use crate::common::{BufferIndex, NodeId};
use crate::foundation::math::utils::translation;
use crate::foundation::math::Mat4;
use crate::nodes::{CullingBounds, DrawMode, NodeAttachment, RenderCategory, SceneGraph, SortFunction};
use crate::render::{
    is_2d_box_outside_clip_space, is_3d_box_outside_clip_space, RenderFlags, RenderInstruction,
    RenderInstructionContainer, RenderList,
};

use super::render_task::{RenderTask, RenderTaskList};

/// Switches for instruction preparation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrepareOptions {
    /// Drop items outside clip space
    pub culling: bool,
    /// Master switch for depth testing
    pub depth_test_enabled: bool,
}

impl Default for PrepareOptions {
    fn default() -> Self {
        Self { culling: true, depth_test_enabled: true }
    }
}

/// Counters for one preparation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrepareStats {
    /// Tasks that produced an instruction
    pub tasks: usize,
    /// Render lists filled
    pub render_lists: usize,
    /// Items added to render lists
    pub items: usize,
    /// Items dropped by culling
    pub culled: usize,
}

/// Build one render instruction per ready task into `container`
pub fn process_render_tasks(
    graph: &mut SceneGraph,
    tasks: &RenderTaskList,
    buffer: BufferIndex,
    container: &mut RenderInstructionContainer,
    options: PrepareOptions,
) -> PrepareStats {
    let mut stats = PrepareStats::default();

    for task in tasks.tasks() {
        let Some((view, projection)) = camera_matrices(graph, task, buffer) else {
            debug!("{} skipped: camera {} not ready", task.id(), task.camera());
            continue;
        };
        let Some(layers) = collect_renderables(graph, task, buffer) else {
            debug!("{} skipped: source {} is not on stage or has no layer", task.id(), task.source());
            continue;
        };

        let instruction = container.next_instruction();
        instruction.reset(task.id(), view, projection, task.viewport(), task.clear());
        for layer in layers {
            prepare_layer(graph, buffer, layer, instruction, (&view, &projection), options, &mut stats);
        }
        stats.tasks += 1;
    }

    trace!(
        "prepared {} instructions: {} lists, {} items, {} culled",
        stats.tasks,
        stats.render_lists,
        stats.items,
        stats.culled
    );
    stats
}

fn camera_matrices(graph: &SceneGraph, task: &RenderTask, buffer: BufferIndex) -> Option<(Mat4, Mat4)> {
    let node = graph.node(task.camera()).filter(|n| n.is_connected())?;
    let camera = node.attachment()?.as_camera()?;
    Some((camera.view_matrix(buffer), camera.projection_matrix(buffer)))
}

/// First layer at or above `id`
fn find_layer(graph: &SceneGraph, id: NodeId) -> Option<NodeId> {
    let mut current = Some(id);
    while let Some(node) = current.and_then(|i| graph.node(i)) {
        if node.is_layer() {
            return Some(node.id());
        }
        current = node.parent();
    }
    None
}

/// Fill the renderable lists of every layer the task draws
///
/// Returns the layers in draw order: the source's own layer first, then
/// nested layers in pre-order.
fn collect_renderables(graph: &mut SceneGraph, task: &RenderTask, buffer: BufferIndex) -> Option<Vec<NodeId>> {
    let source = graph.node(task.source()).filter(|n| n.is_connected())?;
    let source_mode = source.draw_mode();
    let start_layer = find_layer(graph, task.source())?;

    let mut layers = vec![start_layer];
    layers.extend(graph.pre_order(task.source()).into_iter().filter(|id| {
        *id != start_layer && graph.node(*id).is_some_and(|n| n.is_layer())
    }));

    let mut additions = Vec::new();
    let mut stack = vec![(task.source(), start_layer, source_mode)];
    while let Some((id, layer, inherited_mode)) = stack.pop() {
        let Some(node) = graph.node(id) else { continue };
        if !node.is_visible(buffer) {
            continue;
        }

        let (layer, mode) = if node.is_layer() {
            (id, node.draw_mode())
        } else if node.draw_mode() != DrawMode::Normal {
            (layer, node.draw_mode())
        } else {
            (layer, inherited_mode)
        };

        if let Some(NodeAttachment::Renderable(renderable)) = node.attachment() {
            if renderable.is_ready() && node.resolve_visibility(buffer) {
                let category = match mode {
                    DrawMode::Stencil => RenderCategory::Stencil,
                    DrawMode::Overlay => RenderCategory::Overlay,
                    DrawMode::Normal if renderable.is_fully_opaque(node.world_color().w) => RenderCategory::Opaque,
                    DrawMode::Normal => RenderCategory::Transparent,
                };
                additions.push((layer, category, id));
            }
        }

        stack.extend(node.children().iter().rev().map(|c| (*c, layer, mode)));
    }

    for id in &layers {
        if let Some(layer) = graph.node_mut(*id).and_then(|n| n.layer_mut()) {
            layer.clear_renderables();
        }
    }
    for (layer, category, node) in additions {
        if let Some(layer) = graph.node_mut(layer).and_then(|n| n.layer_mut()) {
            layer.add_renderable(category, node);
        }
    }

    Some(layers)
}

fn prepare_layer(
    graph: &SceneGraph,
    buffer: BufferIndex,
    layer_id: NodeId,
    instruction: &mut RenderInstruction,
    camera: (&Mat4, &Mat4),
    options: PrepareOptions,
    stats: &mut PrepareStats,
) {
    let Some(layer) = graph.node(layer_id).and_then(|n| n.layer()) else { return };

    let stencil = !layer.renderables(RenderCategory::Stencil).is_empty();
    let opaque = !layer.renderables(RenderCategory::Opaque).is_empty();
    let transparent = !layer.renderables(RenderCategory::Transparent).is_empty();
    let overlay = !layer.renderables(RenderCategory::Overlay).is_empty();
    let depth_test_disabled = layer.is_depth_test_disabled() || !options.depth_test_enabled;

    // stencils only matter if something is tested against them
    let categories = [
        (RenderCategory::Stencil, stencil && (opaque || transparent || overlay)),
        (RenderCategory::Opaque, opaque),
        (RenderCategory::Transparent, transparent),
        (RenderCategory::Overlay, overlay),
    ];

    for (category, wanted) in categories {
        if !wanted {
            continue;
        }
        let renderables = layer.renderables(category);
        let list = instruction.next_free_render_list(renderables.len());
        list.set_clipping(layer.is_clipping(), layer.clipping_box());
        list.set_source_layer(layer_id);
        add_items(graph, buffer, list, renderables, layer.sort_function(), camera, options, stats);

        match category {
            RenderCategory::Stencil => set_stencil_flags(list),
            RenderCategory::Opaque => {
                sort_front_to_back(list);
                let requires_depth_test = list.count() == 1 && first_requires_depth_test(graph, list);
                set_opaque_flags(list, transparent, stencil, depth_test_disabled, requires_depth_test);
            }
            RenderCategory::Transparent => {
                sort_back_to_front(list);
                set_transparent_flags(list, opaque, stencil, depth_test_disabled);
            }
            RenderCategory::Overlay => set_overlay_flags(list, stencil),
        }
        stats.render_lists += 1;
    }
}

fn add_items(
    graph: &SceneGraph,
    buffer: BufferIndex,
    list: &mut RenderList,
    renderables: &[NodeId],
    sort_function: SortFunction,
    (view, projection): (&Mat4, &Mat4),
    options: PrepareOptions,
    stats: &mut PrepareStats,
) {
    for id in renderables {
        let Some(node) = graph.node(*id) else { continue };
        let Some(renderable) = node.attachment().and_then(NodeAttachment::as_renderable) else { continue };

        let size = node.size().get(buffer);
        let model = node.world_matrix() * Mat4::new_nonuniform_scaling(&size);
        let model_view = view * model;

        if options.culling && renderable.is_cull_enabled() {
            let mvp = projection * model_view;
            let outside = match renderable.bounds() {
                CullingBounds::Rect2d(rect) => is_2d_box_outside_clip_space(&mvp, &rect),
                CullingBounds::Box3d(bounds) => is_3d_box_outside_clip_space(&mvp, &bounds),
            };
            if outside {
                stats.culled += 1;
                continue;
            }
        }

        let item = list.next_free_item();
        item.renderer = renderable.renderer();
        item.node = *id;
        item.model_matrix = model;
        item.model_view_matrix = model_view;
        item.color = node.world_color();
        item.sort_value = sort_function(&translation(&model_view), renderable.sort_modifier());
        stats.items += 1;
    }
}

fn first_requires_depth_test(graph: &SceneGraph, list: &RenderList) -> bool {
    list.items()
        .first()
        .and_then(|item| graph.node(item.node))
        .and_then(|node| node.attachment())
        .and_then(NodeAttachment::as_renderable)
        .is_some_and(|r| r.requires_depth_test())
}

/// Lowest sort value first; ties keep tree order
fn sort_back_to_front(list: &mut RenderList) {
    list.items_mut().sort_by(|a, b| a.sort_value.total_cmp(&b.sort_value));
}

/// Highest sort value first, so near items fill the depth buffer early
fn sort_front_to_back(list: &mut RenderList) {
    list.items_mut().sort_by(|a, b| b.sort_value.total_cmp(&a.sort_value));
}

fn set_opaque_flags(
    list: &mut RenderList,
    transparent_exist: bool,
    stencil_exist: bool,
    depth_test_disabled: bool,
    requires_depth_test: bool,
) {
    list.clear_flags();
    let single = list.count() == 1 && !transparent_exist && !requires_depth_test;
    if !single && !depth_test_disabled {
        list.set_flags(RenderFlags::DEPTH_BUFFER_ENABLED | RenderFlags::DEPTH_WRITE | RenderFlags::DEPTH_CLEAR);
    }
    if stencil_exist {
        list.set_flags(RenderFlags::STENCIL_BUFFER_ENABLED);
    }
}

fn set_transparent_flags(list: &mut RenderList, opaque_exist: bool, stencil_exist: bool, depth_test_disabled: bool) {
    list.clear_flags();
    if opaque_exist && !depth_test_disabled {
        list.set_flags(RenderFlags::DEPTH_BUFFER_ENABLED);
    }
    if stencil_exist {
        list.set_flags(RenderFlags::STENCIL_BUFFER_ENABLED);
    }
}

fn set_overlay_flags(list: &mut RenderList, stencil_exist: bool) {
    list.clear_flags();
    if stencil_exist {
        list.set_flags(RenderFlags::STENCIL_BUFFER_ENABLED);
    }
}

fn set_stencil_flags(list: &mut RenderList) {
    list.clear_flags();
    list.set_flags(RenderFlags::STENCIL_CLEAR | RenderFlags::STENCIL_WRITE | RenderFlags::STENCIL_BUFFER_ENABLED);
}
