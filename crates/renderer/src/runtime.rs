use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

use crate::context::RenderContext;
use crate::gl::Gl;
use crate::scene::{DrivenScene, FrameInfo, SceneError};

/// Snapshot of the host clock for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSample {
    /// Elapsed wall-clock or simulated time in milliseconds.
    pub millis: f64,
    /// Monotonic frame counter for the running session.
    pub frame_index: u64,
}

impl TimeSample {
    pub fn new(millis: f64, frame_index: u64) -> Self {
        Self { millis, frame_index }
    }
}

/// Abstraction over where frame timestamps originate from.
pub trait TimeSource {
    /// Resets the source to its initial state.
    fn reset(&mut self);
    /// Produces a time sample for the next frame.
    fn sample(&mut self) -> TimeSample;
}

/// Time source backed by the system monotonic clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemTimeSource {
    origin: Instant,
    frame: u64,
}

impl SystemTimeSource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for SystemTimeSource {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
            frame: 0,
        }
    }
}

impl TimeSource for SystemTimeSource {
    fn reset(&mut self) {
        self.origin = Instant::now();
        self.frame = 0;
    }

    fn sample(&mut self) -> TimeSample {
        let elapsed = self.origin.elapsed();
        let sample = TimeSample::new(elapsed.as_secs_f64() * 1000.0, self.frame);
        self.frame = self.frame.saturating_add(1);
        sample
    }
}

/// Time source that always reports the same timestamp, for still frames.
#[derive(Debug, Clone, Copy)]
pub struct FixedTimeSource {
    millis: f64,
    frame: u64,
}

impl FixedTimeSource {
    pub fn new(millis: f64) -> Self {
        Self { millis, frame: 0 }
    }

    pub fn millis(&self) -> f64 {
        self.millis
    }
}

impl TimeSource for FixedTimeSource {
    fn reset(&mut self) {
        self.frame = 0;
    }

    fn sample(&mut self) -> TimeSample {
        let sample = TimeSample::new(self.millis, self.frame);
        self.frame = self.frame.saturating_add(1);
        sample
    }
}

/// Time source advanced by hand through a shared [`ManualClock`].
#[derive(Debug, Clone, Default)]
pub struct ManualTimeSource {
    clock: ManualClock,
    frame: u64,
}

/// Handle that moves a [`ManualTimeSource`] forward.
#[derive(Debug, Clone, Default)]
pub struct ManualClock(Rc<Cell<f64>>);

impl ManualClock {
    pub fn advance(&self, millis: f64) {
        self.0.set(self.0.get() + millis);
    }

    pub fn set(&self, millis: f64) {
        self.0.set(millis);
    }

    pub fn now(&self) -> f64 {
        self.0.get()
    }
}

impl ManualTimeSource {
    pub fn paired() -> (Self, ManualClock) {
        let source = Self::default();
        let clock = source.clock.clone();
        (source, clock)
    }
}

impl TimeSource for ManualTimeSource {
    fn reset(&mut self) {
        self.clock.set(0.0);
        self.frame = 0;
    }

    fn sample(&mut self) -> TimeSample {
        let sample = TimeSample::new(self.clock.now(), self.frame);
        self.frame = self.frame.saturating_add(1);
        sample
    }
}

pub type BoxedTimeSource = Box<dyn TimeSource>;

/// Host-loop glue: turns "a frame is due at this surface size" into
/// resize, update and render calls on a scene.
pub struct FrameDriver<G: Gl> {
    ctx: Rc<RenderContext<G>>,
    clock: BoxedTimeSource,
    last_time_ms: Option<f64>,
    last_size: Option<(u32, u32)>,
}

impl<G: Gl> FrameDriver<G> {
    pub fn new(ctx: Rc<RenderContext<G>>) -> Self {
        Self::with_time_source(ctx, Box::new(SystemTimeSource::new()))
    }

    pub fn with_time_source(ctx: Rc<RenderContext<G>>, clock: BoxedTimeSource) -> Self {
        Self {
            ctx,
            clock,
            last_time_ms: None,
            last_size: None,
        }
    }

    pub fn context(&self) -> &Rc<RenderContext<G>> {
        &self.ctx
    }

    /// Forgets the previous frame so the next one starts with a zero delta
    /// and a fresh viewport.
    pub fn reset(&mut self) {
        self.clock.reset();
        self.last_time_ms = None;
        self.last_size = None;
    }

    /// Drives one frame of `scene` on a surface of `width` x `height`
    /// physical pixels. Zero dimensions are clamped to one.
    pub fn frame(&mut self, scene: &mut dyn DrivenScene<G>, width: u32, height: u32) -> Result<FrameInfo, SceneError> {
        let size = (width.max(1), height.max(1));
        let resized = self.last_size != Some(size);
        if resized {
            self.ctx.gl().viewport(0, 0, size.0 as i32, size.1 as i32);
            self.last_size = Some(size);
            tracing::debug!(width = size.0, height = size.1, "surface resized");
        }

        let sample = self.clock.sample();
        let dt_ms = match self.last_time_ms {
            Some(last) => (sample.millis - last).max(0.0),
            None => 0.0,
        };
        self.last_time_ms = Some(sample.millis);

        let frame = FrameInfo {
            time_ms: sample.millis,
            width: size.0,
            height: size.1,
        };
        if resized {
            scene.resize(&self.ctx, size.0, size.1)?;
        }
        scene.update(dt_ms as f32)?;
        scene.render(&self.ctx, frame)?;
        tracing::trace!(frame = sample.frame_index, dt_ms, "frame");
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gl::recording::{GlCall, RecordingGl};
    use crate::scene::SceneStatus;

    #[derive(Debug, Default)]
    struct Script {
        calls: Vec<String>,
    }

    impl DrivenScene<RecordingGl> for Script {
        fn resize(&mut self, _ctx: &Rc<RenderContext<RecordingGl>>, width: u32, height: u32) -> Result<(), SceneError> {
            self.calls.push(format!("resize {width}x{height}"));
            Ok(())
        }

        fn update(&mut self, dt_ms: f32) -> Result<(), SceneError> {
            self.calls.push(format!("update {dt_ms}"));
            Ok(())
        }

        fn render(&mut self, _ctx: &Rc<RenderContext<RecordingGl>>, frame: FrameInfo) -> Result<(), SceneError> {
            self.calls.push(format!("render {}", frame.time_ms));
            Ok(())
        }

        fn dispose(&mut self) {
            self.calls.push("dispose".to_owned());
        }

        fn status(&self) -> SceneStatus {
            SceneStatus::Ready
        }
    }

    fn driver() -> (FrameDriver<RecordingGl>, ManualClock) {
        let ctx = Rc::new(RenderContext::new(RecordingGl::new()));
        let (source, clock) = ManualTimeSource::paired();
        (FrameDriver::with_time_source(ctx, Box::new(source)), clock)
    }

    #[test]
    fn first_frame_has_zero_delta() {
        let (mut driver, clock) = driver();
        let mut scene = Script::default();
        clock.set(1000.0);
        driver.frame(&mut scene, 640, 480).unwrap();
        clock.advance(16.0);
        driver.frame(&mut scene, 640, 480).unwrap();

        assert_eq!(
            scene.calls,
            ["resize 640x480", "update 0", "render 1000", "update 16", "render 1016"]
        );
    }

    #[test]
    fn viewport_follows_size_changes_only() {
        let (mut driver, _clock) = driver();
        let mut scene = Script::default();
        driver.frame(&mut scene, 100, 50).unwrap();
        driver.frame(&mut scene, 100, 50).unwrap();
        driver.frame(&mut scene, 200, 50).unwrap();

        let viewports: Vec<_> = driver
            .context()
            .gl()
            .calls()
            .into_iter()
            .filter(|call| matches!(call, GlCall::Viewport(..)))
            .collect();
        assert_eq!(
            viewports,
            [GlCall::Viewport(0, 0, 100, 50), GlCall::Viewport(0, 0, 200, 50)]
        );
    }

    #[test]
    fn zero_sized_surface_is_clamped() {
        let (mut driver, _clock) = driver();
        let mut scene = Script::default();
        let frame = driver.frame(&mut scene, 0, 0).unwrap();
        assert_eq!((frame.width, frame.height), (1, 1));
        assert_eq!(scene.calls[0], "resize 1x1");
    }

    #[test]
    fn clock_going_backwards_yields_zero_delta() {
        let (mut driver, clock) = driver();
        let mut scene = Script::default();
        clock.set(500.0);
        driver.frame(&mut scene, 8, 8).unwrap();
        clock.set(400.0);
        driver.frame(&mut scene, 8, 8).unwrap();
        assert_eq!(scene.calls.last().map(String::as_str), Some("render 400"));
        assert!(scene.calls.contains(&"update 0".to_owned()));
        assert!(!scene.calls.iter().any(|c| c.starts_with("update -")));
    }

    #[test]
    fn drives_a_real_scene_to_ready() {
        let (mut driver, clock) = driver();
        let mut scene = crate::scene::Scene::new(crate::scene::GradientScene);
        driver.frame(&mut scene, 320, 240).unwrap();
        clock.advance(16.0);
        driver.frame(&mut scene, 320, 240).unwrap();
        assert_eq!(scene.status(), SceneStatus::Ready);
        assert_eq!(driver.context().gl().last_f32("u_time"), Some(vec![16.0]));

        DrivenScene::dispose(&mut scene);
        assert!(matches!(
            driver.frame(&mut scene, 320, 240),
            Err(SceneError::Disposed)
        ));
    }

    #[test]
    fn fixed_source_repeats_its_timestamp() {
        let mut source = FixedTimeSource::new(2500.0);
        assert_eq!(source.sample(), TimeSample::new(2500.0, 0));
        assert_eq!(source.sample(), TimeSample::new(2500.0, 1));
        source.reset();
        assert_eq!(source.sample().frame_index, 0);
    }
}
