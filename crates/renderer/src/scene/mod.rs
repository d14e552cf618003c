//! Scene lifecycle.
//!
//! Every visual effect rides the same state machine:
//!
//! ```text
//!                 first resize/update/render
//!  Uninitialized ─────────────────────────────▶ Initializing ──ok──▶ Ready
//!        ▲                                           │
//!        └──────────────── setup failed ─────────────┘
//!
//!  dispose() from any state ──▶ Disposed (terminal)
//! ```
//!
//! Setup is an async block owned by the scene and polled once per driving
//! call, so a single in-flight setup is shared by every frame that arrives
//! before it finishes. Disposing drops the in-flight future; its result can
//! never reach a disposed scene.

mod gradient;
mod model_scene;
mod sprite;

use std::future::Future;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

pub use gradient::GradientScene;
pub use model_scene::ModelScene;
pub use sprite::{EncodedImage, ImageSource, SpriteScene, SpriteTransform};

use crate::context::RenderContext;
use crate::gl::{ClearMask, Gl};
use crate::LocalBoxFuture;

#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("scene has been disposed")]
    Disposed,
    #[error(transparent)]
    Frame(#[from] anyhow::Error),
}

/// Timing and surface size for one rendered frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInfo {
    /// Host clock in milliseconds.
    pub time_ms: f64,
    pub width: u32,
    pub height: u32,
}

/// The effect-specific half of a scene.
///
/// `setup` runs once per successful initialisation and yields the GPU
/// resources the other hooks operate on; `teardown` gets them back when the
/// scene is disposed.
pub trait SceneLogic<G: Gl> {
    type Resources;

    fn setup(&mut self, ctx: Rc<RenderContext<G>>) -> LocalBoxFuture<'static, anyhow::Result<Self::Resources>>;

    fn update(&mut self, _resources: &mut Self::Resources, _dt_ms: f32) {}

    fn resize(&mut self, _ctx: &RenderContext<G>, _resources: &mut Self::Resources, _width: u32, _height: u32) {}

    fn render(
        &mut self,
        ctx: &RenderContext<G>,
        resources: &mut Self::Resources,
        frame: FrameInfo,
    ) -> anyhow::Result<()>;

    fn teardown(&mut self, ctx: &RenderContext<G>, resources: Self::Resources);
}

/// Externally visible lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneStatus {
    Uninitialized,
    Initializing,
    Ready,
    Disposed,
}

enum SceneState<R> {
    Uninitialized,
    Initializing {
        generation: u64,
        task: LocalBoxFuture<'static, anyhow::Result<R>>,
    },
    Ready(R),
    Disposed,
}

/// Object-safe driving surface used by the frame loop.
pub trait DrivenScene<G: Gl> {
    fn resize(&mut self, ctx: &Rc<RenderContext<G>>, width: u32, height: u32) -> Result<(), SceneError>;
    fn update(&mut self, dt_ms: f32) -> Result<(), SceneError>;
    fn render(&mut self, ctx: &Rc<RenderContext<G>>, frame: FrameInfo) -> Result<(), SceneError>;
    fn dispose(&mut self);
    fn status(&self) -> SceneStatus;
}

pub struct Scene<G: Gl, L: SceneLogic<G>> {
    logic: L,
    ctx: Option<Rc<RenderContext<G>>>,
    state: SceneState<L::Resources>,
    generation: u64,
}

impl<G: Gl, L: SceneLogic<G>> Scene<G, L> {
    pub fn new(logic: L) -> Self {
        Self {
            logic,
            ctx: None,
            state: SceneState::Uninitialized,
            generation: 0,
        }
    }

    pub fn status(&self) -> SceneStatus {
        match self.state {
            SceneState::Uninitialized => SceneStatus::Uninitialized,
            SceneState::Initializing { .. } => SceneStatus::Initializing,
            SceneState::Ready(_) => SceneStatus::Ready,
            SceneState::Disposed => SceneStatus::Disposed,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, SceneState::Ready(_))
    }

    pub fn logic(&self) -> &L {
        &self.logic
    }

    pub fn logic_mut(&mut self) -> &mut L {
        &mut self.logic
    }

    pub fn resources(&self) -> Option<&L::Resources> {
        match &self.state {
            SceneState::Ready(resources) => Some(resources),
            _ => None,
        }
    }

    /// Starts setup against `ctx` if it has not started yet.
    pub fn init(&mut self, ctx: &Rc<RenderContext<G>>) -> Result<(), SceneError> {
        self.ensure_init(ctx).map(|_| ())
    }

    pub fn resize(&mut self, ctx: &Rc<RenderContext<G>>, width: u32, height: u32) -> Result<(), SceneError> {
        if !self.ensure_init(ctx)? {
            return Ok(());
        }
        if let SceneState::Ready(resources) = &mut self.state {
            self.logic.resize(ctx, resources, width, height);
        }
        Ok(())
    }

    /// Advances the scene by `dt_ms`. Before the first context-carrying call
    /// there is nothing to initialise and the call is a no-op.
    pub fn update(&mut self, dt_ms: f32) -> Result<(), SceneError> {
        if let SceneState::Disposed = self.state {
            return Err(SceneError::Disposed);
        }
        let Some(ctx) = self.ctx.clone() else {
            return Ok(());
        };
        if !self.ensure_init(&ctx)? {
            return Ok(());
        }
        if let SceneState::Ready(resources) = &mut self.state {
            self.logic.update(resources, dt_ms);
        }
        Ok(())
    }

    /// Draws a frame, or clears to transparent while the scene is not ready.
    pub fn render(&mut self, ctx: &Rc<RenderContext<G>>, frame: FrameInfo) -> Result<(), SceneError> {
        if !self.ensure_init(ctx)? {
            let gl = ctx.gl();
            gl.clear_color(0.0, 0.0, 0.0, 0.0);
            gl.clear(ClearMask::COLOR_DEPTH);
            return Ok(());
        }
        if let SceneState::Ready(resources) = &mut self.state {
            self.logic.render(ctx, resources, frame)?;
        }
        Ok(())
    }

    /// Invalidates any in-flight setup and releases resources if the scene
    /// reached `Ready`. Later driving calls fail with `SceneError::Disposed`.
    pub fn dispose(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        let previous = std::mem::replace(&mut self.state, SceneState::Disposed);
        let ctx = self.ctx.take();
        match previous {
            SceneState::Ready(resources) => {
                if let Some(ctx) = ctx {
                    self.logic.teardown(&ctx, resources);
                }
                tracing::debug!("scene disposed");
            }
            SceneState::Initializing { .. } => {
                tracing::debug!("scene disposed during setup; pending setup dropped");
            }
            SceneState::Uninitialized | SceneState::Disposed => {}
        }
    }

    /// Returns whether the scene is ready after starting or polling setup.
    fn ensure_init(&mut self, ctx: &Rc<RenderContext<G>>) -> Result<bool, SceneError> {
        match self.state {
            SceneState::Disposed => return Err(SceneError::Disposed),
            SceneState::Ready(_) => return Ok(true),
            SceneState::Uninitialized => {
                self.ctx = Some(Rc::clone(ctx));
                let task = self.logic.setup(Rc::clone(ctx));
                self.state = SceneState::Initializing {
                    generation: self.generation,
                    task,
                };
                tracing::debug!(generation = self.generation, "scene setup started");
            }
            SceneState::Initializing { .. } => {}
        }
        self.poll_setup();
        Ok(self.is_ready())
    }

    fn poll_setup(&mut self) {
        let SceneState::Initializing { generation, task } = &mut self.state else {
            return;
        };
        let mut cx = Context::from_waker(Waker::noop());
        let Poll::Ready(outcome) = task.as_mut().poll(&mut cx) else {
            return;
        };
        if *generation != self.generation {
            tracing::debug!("discarding stale scene setup result");
            self.state = SceneState::Uninitialized;
            return;
        }
        match outcome {
            Ok(resources) => {
                self.state = SceneState::Ready(resources);
                tracing::debug!("scene ready");
            }
            Err(err) => {
                tracing::error!(error = %format!("{err:#}"), "scene setup failed; retrying on next frame");
                self.state = SceneState::Uninitialized;
            }
        }
    }
}

impl<G: Gl, L: SceneLogic<G>> DrivenScene<G> for Scene<G, L> {
    fn resize(&mut self, ctx: &Rc<RenderContext<G>>, width: u32, height: u32) -> Result<(), SceneError> {
        Scene::resize(self, ctx, width, height)
    }

    fn update(&mut self, dt_ms: f32) -> Result<(), SceneError> {
        Scene::update(self, dt_ms)
    }

    fn render(&mut self, ctx: &Rc<RenderContext<G>>, frame: FrameInfo) -> Result<(), SceneError> {
        Scene::render(self, ctx, frame)
    }

    fn dispose(&mut self) {
        Scene::dispose(self)
    }

    fn status(&self) -> SceneStatus {
        Scene::status(self)
    }
}
