//! # Pipeline
//!
//! Wires the event, update and render sides together.
//!
//! [`Core`] drives both sides from the calling thread, one `update` then one
//! `render` per frame; tests and headless tools use it. [`ThreadedPipeline`]
//! runs the update loop and the render loop on their own threads, kept at
//! most one frame apart by a [`FrameGate`] so the update side never writes
//! the buffer the render side is reading.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{channel, Receiver};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, info};
use thiserror::Error;

use crate::common::BufferIndex;
use crate::core::{ConfigError, CoreConfig};
use crate::event::SceneController;
use crate::foundation::time::FrameClock;
use crate::render::{Context, RenderInstructionBuffers, RenderManager, RenderQueue, RenderStats};
use crate::update::{notification_channel, Notification, UpdateManager, UpdateStatus};

/// Pipeline errors
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The configuration failed validation
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// A worker thread could not be started
    #[error("failed to spawn {name} thread: {source}")]
    Spawn {
        /// Thread name
        name: &'static str,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// A worker thread panicked before it could be joined
    #[error("{0} thread panicked")]
    Join(&'static str),

    /// The update side hung up
    #[error("update thread disconnected")]
    Disconnected,
}

/// Single-threaded pipeline
pub struct Core<C: Context> {
    scene: SceneController,
    update: UpdateManager,
    render: RenderManager<C>,
    notifications: Receiver<Notification>,
}

impl<C: Context> Core<C> {
    /// Build every side of the pipeline around `context`
    pub fn new(config: &CoreConfig, context: C) -> Result<Self, PipelineError> {
        config.validate()?;
        info!("Initializing core...");

        let (message_sender, messages) = channel();
        let (notification_sender, notifications) = notification_channel();
        let queue = Arc::new(RenderQueue::new());
        let instructions = Arc::new(RenderInstructionBuffers::new());

        let update = UpdateManager::new(
            config,
            messages,
            Some(notification_sender),
            Arc::clone(&queue),
            Arc::clone(&instructions),
        );
        let render = RenderManager::new(context, &config.render, queue, instructions);

        Ok(Self { scene: SceneController::new(message_sender), update, render, notifications })
    }

    /// Event-side handle
    pub fn scene(&mut self) -> &mut SceneController {
        &mut self.scene
    }

    /// Update side, for inspection
    pub const fn update_manager(&self) -> &UpdateManager {
        &self.update
    }

    /// Render side, for inspection
    pub const fn render_manager(&self) -> &RenderManager<C> {
        &self.render
    }

    /// Run one update pass
    pub fn update(&mut self, elapsed_seconds: f32) -> UpdateStatus {
        self.update.update(elapsed_seconds)
    }

    /// Draw the most recently updated frame
    pub fn render(&mut self) -> RenderStats {
        let buffer = self.update.buffers().render_buffer_index();
        self.render.render(buffer)
    }

    /// Update then render
    pub fn frame(&mut self, elapsed_seconds: f32) -> (UpdateStatus, RenderStats) {
        let status = self.update(elapsed_seconds);
        let stats = self.render();
        (status, stats)
    }

    /// Notifications received since the last call
    pub fn drain_notifications(&self) -> Vec<Notification> {
        self.notifications.try_iter().collect()
    }

    /// Tear down, handing the context back
    pub fn into_context(self) -> C {
        info!("Core shutdown complete after {} frames", self.update.frame());
        self.render.into_context()
    }
}

#[derive(Debug, Default)]
struct GateState {
    updated: u64,
    rendered: u64,
    stopped: bool,
}

/// Keeps the update thread at most one frame ahead of the render thread
#[derive(Debug, Default)]
pub struct FrameGate {
    state: Mutex<GateState>,
    changed: Condvar,
}

impl FrameGate {
    /// Gate with nothing updated or rendered
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block until frame `next` (counted from 0) may be written
    ///
    /// Frame `next` reuses the buffer of frame `next - 2`, so that frame
    /// must have been rendered. Returns false once the gate is stopped.
    pub fn wait_to_update(&self, next: u64) -> bool {
        let guard = self.lock();
        let guard = self
            .changed
            .wait_while(guard, |s| !s.stopped && s.rendered + 1 < next)
            .unwrap_or_else(PoisonError::into_inner);
        !guard.stopped
    }

    /// Record that `frames` frames have been fully written
    pub fn frame_updated(&self, frames: u64) {
        self.lock().updated = frames;
        self.changed.notify_all();
    }

    /// Block until a written frame is waiting; returns its number, from 0
    ///
    /// After a stop, frames already written are still handed out before
    /// this returns `None`.
    pub fn wait_to_render(&self) -> Option<u64> {
        let guard = self.lock();
        let guard = self
            .changed
            .wait_while(guard, |s| !s.stopped && s.updated <= s.rendered)
            .unwrap_or_else(PoisonError::into_inner);
        (guard.updated > guard.rendered).then_some(guard.rendered)
    }

    /// Record that one more frame has been drawn
    pub fn frame_rendered(&self) {
        self.lock().rendered += 1;
        self.changed.notify_all();
    }

    /// Release both sides
    pub fn stop(&self) {
        self.lock().stopped = true;
        self.changed.notify_all();
    }

    /// Frames written and frames drawn
    pub fn progress(&self) -> (u64, u64) {
        let state = self.lock();
        (state.updated, state.rendered)
    }
}

/// Totals reported when a threaded pipeline shuts down
#[derive(Debug)]
pub struct PipelineReport<C> {
    /// Frames the update thread completed
    pub frames_updated: u64,
    /// Frames the render thread drew
    pub frames_rendered: u64,
    /// Draw calls issued over the whole run
    pub draw_calls: u64,
    /// The context, handed back by the render thread
    pub context: C,
}

/// Update and render loops on their own threads
pub struct ThreadedPipeline<C: Context + 'static> {
    scene: SceneController,
    notifications: Receiver<Notification>,
    gate: Arc<FrameGate>,
    draw_calls: Arc<AtomicU64>,
    update_thread: Option<JoinHandle<u64>>,
    render_thread: Option<JoinHandle<C>>,
}

impl<C: Context + 'static> ThreadedPipeline<C> {
    /// Spawn the update and render threads
    pub fn start(config: &CoreConfig, context: C) -> Result<Self, PipelineError> {
        config.validate()?;
        info!("Starting threaded pipeline...");

        let (message_sender, messages) = channel();
        let (notification_sender, notifications) = notification_channel();
        let queue = Arc::new(RenderQueue::new());
        let instructions = Arc::new(RenderInstructionBuffers::new());
        let gate = Arc::new(FrameGate::new());
        let draw_calls = Arc::new(AtomicU64::new(0));

        let mut update = UpdateManager::new(
            config,
            messages,
            Some(notification_sender),
            Arc::clone(&queue),
            Arc::clone(&instructions),
        );
        let interval = Duration::from_millis(config.update.frame_interval_ms);
        let update_gate = Arc::clone(&gate);
        let update_thread = thread::Builder::new()
            .name("update".into())
            .spawn(move || {
                let mut clock = FrameClock::new();
                while update_gate.wait_to_update(update.frame()) {
                    let status = update.update(clock.tick());
                    update_gate.frame_updated(status.frame);
                    if status.stopped {
                        break;
                    }
                    clock.pace(interval);
                }
                update_gate.stop();
                debug!("update thread finished after {} frames", update.frame());
                update.frame()
            })
            .map_err(|source| PipelineError::Spawn { name: "update", source })?;

        let mut render = RenderManager::new(context, &config.render, queue, instructions);
        let render_gate = Arc::clone(&gate);
        let render_draw_calls = Arc::clone(&draw_calls);
        let render_thread = thread::Builder::new()
            .name("render".into())
            .spawn(move || {
                while let Some(frame) = render_gate.wait_to_render() {
                    let stats = render.render(BufferIndex::for_frame(frame));
                    render_draw_calls.fetch_add(stats.draw_calls as u64, Ordering::Relaxed);
                    render_gate.frame_rendered();
                }
                debug!("render thread finished");
                render.into_context()
            });
        let render_thread = match render_thread {
            Ok(handle) => handle,
            Err(source) => {
                gate.stop();
                let _ = update_thread.join();
                return Err(PipelineError::Spawn { name: "render", source });
            }
        };

        Ok(Self {
            scene: SceneController::new(message_sender),
            notifications,
            gate,
            draw_calls,
            update_thread: Some(update_thread),
            render_thread: Some(render_thread),
        })
    }

    /// Event-side handle
    pub fn scene(&mut self) -> &mut SceneController {
        &mut self.scene
    }

    /// Frames written and frames drawn so far
    pub fn progress(&self) -> (u64, u64) {
        self.gate.progress()
    }

    /// Block until the next notification, or until the update side is gone
    pub fn recv_notification(&self) -> Option<Notification> {
        self.notifications.recv().ok()
    }

    /// Notifications received since the last call
    pub fn drain_notifications(&self) -> Vec<Notification> {
        self.notifications.try_iter().collect()
    }

    /// Block until the update side reports frame `frame` (from 1) done
    ///
    /// Other notifications received meanwhile are dropped.
    pub fn wait_for_frame(&self, frame: u64) -> Result<(), PipelineError> {
        loop {
            match self.notifications.recv() {
                Ok(Notification::FrameDone { frame: done }) if done >= frame => return Ok(()),
                Ok(_) => {}
                Err(_) => return Err(PipelineError::Disconnected),
            }
        }
    }

    /// Stop both loops and wait for them
    pub fn stop(mut self) -> Result<PipelineReport<C>, PipelineError> {
        info!("Pipeline shutdown requested");
        self.scene.request_stop();

        let update = self.update_thread.take().map(JoinHandle::join);
        let render = self.render_thread.take().map(JoinHandle::join);
        let frames_updated = match update {
            Some(Ok(frames)) => frames,
            _ => return Err(PipelineError::Join("update")),
        };
        let context = match render {
            Some(Ok(context)) => context,
            _ => return Err(PipelineError::Join("render")),
        };

        let (_, frames_rendered) = self.gate.progress();
        info!("Pipeline shutdown complete: {frames_updated} frames updated, {frames_rendered} rendered");
        Ok(PipelineReport {
            frames_updated,
            frames_rendered,
            draw_calls: self.draw_calls.load(Ordering::Relaxed),
            context,
        })
    }
}

impl<C: Context + 'static> Drop for ThreadedPipeline<C> {
    fn drop(&mut self) {
        if self.update_thread.is_none() && self.render_thread.is_none() {
            return;
        }
        self.scene.request_stop();
        self.gate.stop();
        if let Some(handle) = self.update_thread.take() {
            let _ = handle.join();
        }
        if let Some(handle) = self.render_thread.take() {
            let _ = handle.join();
        }
    }
}
