//! Headless stage demo
//!
//! Builds a small scene on the threaded pipeline: a grid of coloured
//! hexagons, one of them spinning, one fading out, and an overlay bar.
//! Draw calls go to a recording context, so the demo runs without a GPU and
//! reports what it would have drawn.
//!
//! Usage: `stage_demo [config.toml|config.ron] [frames]`

use bytemuck::{Pod, Zeroable};
use dali_core::animation::{AlphaFunction, Animation, Animator, AnimatorFunction, EndAction};
use dali_core::common::{GeometryId, ShaderId};
use dali_core::core::{Config, ConfigError, CoreConfig};
use dali_core::foundation::logging;
use dali_core::foundation::math::{constants, Vec3, Vec4};
use dali_core::nodes::{DrawMode, NodeAttachment, NodeProperty, RenderableAttachment};
use dali_core::property::{PropertyError, PropertyValue};
use dali_core::render::{AttributeType, GeometryType, PropertyBufferData, PropertyBufferFormat, RecordingContext, RenderGeometry};
use dali_core::update::{NodeOption, Notification};
use dali_core::{PipelineError, ThreadedPipeline};
use thiserror::Error;

const STAGE_WIDTH: f32 = 480.0;
const STAGE_HEIGHT: f32 = 800.0;
const GRID: usize = 4;
const DEFAULT_FRAMES: u64 = 120;

#[derive(Error, Debug)]
enum DemoError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("pipeline: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("property: {0}")]
    Property(#[from] PropertyError),

    #[error("invalid frame count '{0}'")]
    Frames(String),
}

/// Vertex of the hexagon fan
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct ColorVertex {
    position: [f32; 2],
    color: [f32; 4],
}

fn hexagon() -> (PropertyBufferData, PropertyBufferData) {
    let format = PropertyBufferFormat::new()
        .with("aPosition", AttributeType::Vector2)
        .with("aColor", AttributeType::Vector4);

    let mut vertices = vec![ColorVertex { position: [0.0, 0.0], color: [1.0; 4] }];
    for i in 0..=6_u8 {
        let angle = f32::from(i) * constants::TAU / 6.0;
        vertices.push(ColorVertex {
            position: [0.5 * angle.cos(), 0.5 * angle.sin()],
            color: [0.8, 0.8, 1.0, 1.0],
        });
    }
    let indices: Vec<u16> = (0..8).collect();
    (PropertyBufferData::from_vertices(format, &vertices), PropertyBufferData::from_indices(&indices))
}

fn add_hexagon_geometry(pipeline: &mut ThreadedPipeline<RecordingContext>) -> GeometryId {
    let scene = pipeline.scene();
    let (vertices, indices) = hexagon();
    let mut geometry = RenderGeometry::new(GeometryType::TriangleFan);
    geometry.add_vertex_buffer(vertices);
    let id = scene.add_geometry(geometry);
    scene.set_index_data(id, indices);
    id
}

fn build_scene(pipeline: &mut ThreadedPipeline<RecordingContext>) -> Result<(), DemoError> {
    let stage = pipeline.scene().install_default_stage(STAGE_WIDTH, STAGE_HEIGHT)?;
    let hexagon = add_hexagon_geometry(pipeline);
    let quad = pipeline.scene().add_geometry(RenderGeometry::quad());
    let shader: ShaderId = pipeline.scene().add_shader();

    let scene = pipeline.scene();
    scene.set_background_color(Vec4::new(0.1, 0.1, 0.15, 1.0));

    let cell = STAGE_WIDTH / GRID as f32;
    let mut tiles = Vec::with_capacity(GRID * GRID);
    for row in 0..GRID {
        for column in 0..GRID {
            let renderer = scene.add_renderer(hexagon, shader, false);
            let tile = scene.create_node();
            let x = (column as f32 + 0.5).mul_add(cell, -STAGE_WIDTH * 0.5);
            let y = (row as f32 + 0.5).mul_add(cell, -STAGE_HEIGHT * 0.25);
            scene.set_property(tile, NodeProperty::Position.index(), PropertyValue::Vector3(Vec3::new(x, y, 0.0)))?;
            scene.set_property(tile, NodeProperty::Size.index(), PropertyValue::Vector3(Vec3::new(cell * 0.9, cell * 0.9, 1.0)))?;
            let shade = (row * GRID + column) as f32 / (GRID * GRID) as f32;
            scene.set_property(tile, NodeProperty::Color.index(), PropertyValue::Vector4(Vec4::new(shade, 0.5, 1.0 - shade, 1.0)))?;
            scene.attach(tile, NodeAttachment::Renderable(RenderableAttachment::new(renderer)));
            scene.add(stage.root, tile);
            tiles.push(tile);
        }
    }

    let bar_renderer = scene.add_renderer(quad, shader, true);
    let bar = scene.create_node();
    scene.set_property(bar, NodeProperty::Size.index(), PropertyValue::Vector3(Vec3::new(STAGE_WIDTH, 60.0, 1.0)))?;
    scene.set_property(
        bar,
        NodeProperty::Position.index(),
        PropertyValue::Vector3(Vec3::new(0.0, STAGE_HEIGHT * 0.5 - 30.0, 0.0)),
    )?;
    scene.attach(bar, NodeAttachment::Renderable(RenderableAttachment::new(bar_renderer)));
    scene.set_node_option(bar, NodeOption::DrawMode(DrawMode::Overlay));
    scene.add(stage.root, bar);

    let id = scene.ids().animation();
    let mut animation = Animation::new(id, 2.0);
    animation.set_looping(true);
    animation.set_end_action(EndAction::BakeFinal);
    animation.add_animator(Animator::new(
        tiles[0],
        NodeProperty::Orientation.index(),
        AnimatorFunction::RotateByAngleAxis { angle: constants::TAU, axis: Vec3::z() },
        2.0,
    ));
    animation.add_animator(
        Animator::new(
            tiles[tiles.len() - 1],
            NodeProperty::Color.index(),
            AnimatorFunction::AnimateBy(PropertyValue::Vector4(Vec4::new(0.0, 0.0, 0.0, -1.0))),
            1.5,
        )
        .with_alpha_function(AlphaFunction::EaseInOut)
        .with_initial_delay(0.5),
    );
    scene.add_animation(animation);
    scene.play(id);

    log::info!("scene built: {} tiles, 1 overlay", tiles.len());
    Ok(())
}

fn run() -> Result<(), DemoError> {
    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => CoreConfig::load_from_file(&path)?,
        None => CoreConfig::default(),
    };
    let frames = match args.next() {
        Some(text) => text.parse::<u64>().map_err(|_| DemoError::Frames(text))?,
        None => DEFAULT_FRAMES,
    };
    config.validate()?;
    logging::init_with_level(&config.logging.level);

    let mut pipeline = ThreadedPipeline::start(&config, RecordingContext::new())?;
    build_scene(&mut pipeline)?;

    let mut finished = 0;
    while let Some(notification) = pipeline.recv_notification() {
        match notification {
            Notification::FrameDone { frame } if frame >= frames => break,
            Notification::FrameDone { frame } if frame % 30 == 0 => {
                let (updated, rendered) = pipeline.progress();
                log::debug!("frame {frame}: {updated} updated, {rendered} rendered");
            }
            Notification::AnimationFinished(id) => {
                finished += 1;
                log::info!("{id} finished");
            }
            Notification::FrameDone { .. } => {}
        }
    }

    let report = pipeline.stop()?;
    log::info!(
        "{} frames updated, {} rendered, {} draw calls ({} recorded GL calls), {finished} animations finished",
        report.frames_updated,
        report.frames_rendered,
        report.draw_calls,
        report.context.calls().len()
    );
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        log::error!("stage demo failed: {e}");
        eprintln!("stage demo failed: {e}");
        std::process::exit(1);
    }
}
