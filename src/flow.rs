//! Flow control and the frame loop.
//!
//! A "flow" is a self-contained piece of the application: it sets up meshes,
//! advances its own state every frame and says what to draw. The
//! [`RenderLoop`] drives any number of flows against one [`Context`].
//!
//! # User-facing types
//!
//! - [`GraphicsFlow<S, B>`] is the trait for scenes that update and render
//! - [`SceneFlow`] is a ready-made flow over a [`Scene`] and its animations
//! - [`Out<B>`] lets a hook reconfigure the context or stop the loop
//! - [`FrameScheduler`] abstracts the host's "call me next frame" primitive
//!
//! # Lifecycle
//!
//! The loop is a small state machine: `Idle` until [`RenderLoop::arm`], then
//! `Running`, then `Stopped` after [`RenderLoop::stop`]. While running, every
//! frame does the following:
//! 1. Call `on_update(dt)` on all flows
//! 2. Call `on_tick` on all flows once `tick_duration_millis` has elapsed
//! 3. Collect every flow's `on_render()` draw calls
//! 4. Submit the frame to the backend
//! 5. Ask the scheduler for the next frame
//!
//! Frames that arrive while the loop is not running are ignored.

use instant::{Duration, Instant};

use crate::{
    context::Context,
    data_structures::{animation::Animation, scene_graph::Scene},
    render::{DrawCall, RenderBackend},
};

///
/// Output of the per-frame hooks.
///
/// `Out::Configure` can be used to modify the Context during runtime for instance to change the tick
/// speed or the clear colour.
///
/// `Out::Stop` stops the loop after the current frame; no further frame is requested.
///
/// `Empty` is the default output used when nothing needs to happen.
///
pub enum Out<B: RenderBackend> {
    Configure(Box<dyn FnOnce(&mut Context<B>)>),
    Stop,
    Empty,
}

impl<B: RenderBackend> Default for Out<B> {
    fn default() -> Self {
        Self::Empty
    }
}

/// Trait for implementing a renderable scene.
///
/// # Lifecycle
///
/// 1. `on_init()` is called once when the loop is armed; register meshes and configure the context
/// 2. `on_update()` is called every frame
/// 3. `on_tick()` is called every `tick_duration_millis`
/// 4. `on_render()` is called each frame and lists what to draw
///
pub trait GraphicsFlow<S, B: RenderBackend> {
    /// Initialize the flow and configure the context.
    ///
    /// This is the only hook with direct mutable access to the Context, e.g. for
    /// uploading meshes or moving the camera to its start position.
    fn on_init(&mut self, ctx: &mut Context<B>, state: &mut S) -> anyhow::Result<()>;

    /// Update state every frame.
    ///
    /// Called every frame with the elapsed time `dt`. Use for animations
    /// and other per-frame logic.
    fn on_update(&mut self, ctx: &Context<B>, state: &mut S, dt: Duration) -> Out<B>;

    /// Update state periodically.
    ///
    /// Called every `tick_duration_millis` milliseconds (configurable via context).
    fn on_tick(&mut self, _ctx: &Context<B>, _state: &mut S) -> Out<B> {
        Out::Empty
    }

    /// Return the draw calls for this frame.
    fn on_render(&self) -> Vec<DrawCall>;
}

/// A scene plus the animations that move its nodes.
///
/// Meshes are registered with the context before the scene is built, so the
/// scene's nodes already carry valid mesh ids.
#[derive(Debug, Default)]
pub struct SceneFlow {
    scene: Scene,
    animations: Vec<Animation>,
}

impl SceneFlow {
    pub fn new(scene: Scene, animations: Vec<Animation>) -> Self {
        Self { scene, animations }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn add_animation(&mut self, animation: Animation) {
        self.animations.push(animation);
    }
}

impl<S, B: RenderBackend> GraphicsFlow<S, B> for SceneFlow {
    fn on_init(&mut self, ctx: &mut Context<B>, _state: &mut S) -> anyhow::Result<()> {
        let missing = self
            .scene
            .iter()
            .filter_map(|(_, node)| node.mesh())
            .filter(|mesh| mesh.index() >= ctx.mesh_count())
            .count();
        if missing > 0 {
            log::warn!("{missing} scene nodes reference meshes that are not registered");
        }
        Ok(())
    }

    fn on_update(&mut self, _ctx: &Context<B>, _state: &mut S, dt: Duration) -> Out<B> {
        for animation in self.animations.iter_mut() {
            animation.apply(&mut self.scene, dt);
        }
        Out::Empty
    }

    fn on_render(&self) -> Vec<DrawCall> {
        self.scene.draw_calls()
    }
}

/// The host's frame-callback primitive.
pub trait FrameScheduler {
    /// Arranges for the loop's `frame` to be called once more.
    fn request_frame(&mut self) -> anyhow::Result<()>;

    /// Withdraws any outstanding request.
    fn cancel(&mut self);

    /// Called when a requested frame arrives, before it is processed.
    fn frame_delivered(&mut self) {}
}

/// Scheduler for headless hosts and tests: it only counts requests and the
/// host calls [`RenderLoop::frame`] itself.
#[derive(Debug, Default)]
pub struct ManualScheduler {
    requested: usize,
    pending: bool,
    cancelled: bool,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requested(&self) -> usize {
        self.requested
    }

    /// Whether a frame was requested and not yet delivered or cancelled.
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn was_cancelled(&self) -> bool {
        self.cancelled
    }
}

impl FrameScheduler for ManualScheduler {
    fn request_frame(&mut self) -> anyhow::Result<()> {
        self.requested += 1;
        self.pending = true;
        Ok(())
    }

    fn cancel(&mut self) {
        self.pending = false;
        self.cancelled = true;
    }

    fn frame_delivered(&mut self) {
        self.pending = false;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
    Stopped,
}

pub struct RenderLoop<S, B: RenderBackend, F: FrameScheduler> {
    ctx: Context<B>,
    state: S,
    flows: Vec<Box<dyn GraphicsFlow<S, B>>>,
    scheduler: F,
    loop_state: LoopState,
    flows_initialised: bool,
    last_time: Option<Instant>,
    time_since_tick: Duration,
    frames: u64,
}

impl<S, B: RenderBackend, F: FrameScheduler> RenderLoop<S, B, F> {
    pub fn new(
        ctx: Context<B>,
        state: S,
        flows: Vec<Box<dyn GraphicsFlow<S, B>>>,
        scheduler: F,
    ) -> Self {
        Self {
            ctx,
            state,
            flows,
            scheduler,
            loop_state: LoopState::Idle,
            flows_initialised: false,
            last_time: None,
            time_since_tick: Duration::from_millis(0),
            frames: 0,
        }
    }

    pub fn loop_state(&self) -> LoopState {
        self.loop_state
    }

    pub fn context(&self) -> &Context<B> {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut Context<B> {
        &mut self.ctx
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    pub fn scheduler(&self) -> &F {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut F {
        &mut self.scheduler
    }

    /// Frames rendered so far.
    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    /// Initialises every flow and requests the first frame.
    ///
    /// Only valid from `Idle`. A failing `on_init` or frame request leaves the
    /// loop idle so `arm` can be retried; flows are initialised only once.
    pub fn arm(&mut self) -> anyhow::Result<()> {
        if self.loop_state != LoopState::Idle {
            anyhow::bail!("render loop is already armed (state: {:?})", self.loop_state);
        }
        if !self.flows_initialised {
            for flow in self.flows.iter_mut() {
                flow.on_init(&mut self.ctx, &mut self.state)?;
            }
            self.flows_initialised = true;
        }
        self.scheduler.request_frame()?;
        self.loop_state = LoopState::Running;
        log::info!("render loop running with {} flows", self.flows.len());
        Ok(())
    }

    /// Frame callback taking the host's timestamp. The first frame sees a
    /// zero `dt`.
    pub fn frame(&mut self, now: Instant) -> anyhow::Result<bool> {
        let dt = match self.last_time {
            Some(last) if now > last => now - last,
            Some(_) => Duration::from_millis(0),
            None => Duration::from_millis(0),
        };
        self.last_time = Some(now);
        self.frame_with_dt(dt)
    }

    /// Runs one frame with an explicit elapsed time. Returns `false` without
    /// doing anything when the loop is not running.
    ///
    /// A backend error fails this frame only: the next frame is still
    /// requested. If that request fails the loop stops.
    pub fn frame_with_dt(&mut self, dt: Duration) -> anyhow::Result<bool> {
        if self.loop_state != LoopState::Running {
            log::debug!("ignoring frame while {:?}", self.loop_state);
            return Ok(false);
        }
        self.scheduler.frame_delivered();
        self.time_since_tick += dt;

        let mut outputs = Vec::new();
        for flow in self.flows.iter_mut() {
            outputs.push(flow.on_update(&self.ctx, &mut self.state, dt));
        }
        if self.time_since_tick >= Duration::from_millis(self.ctx.tick_duration_millis) {
            for flow in self.flows.iter_mut() {
                outputs.push(flow.on_tick(&self.ctx, &mut self.state));
            }
            self.time_since_tick = Duration::from_millis(0);
        }
        let mut stop_requested = false;
        for out in outputs {
            match out {
                Out::Configure(f) => f(&mut self.ctx),
                Out::Stop => stop_requested = true,
                Out::Empty => (),
            }
        }

        let draws: Vec<DrawCall> = self.flows.iter().flat_map(|flow| flow.on_render()).collect();
        let submitted = self.ctx.submit(&draws);
        match &submitted {
            Ok(drawn) => {
                self.frames += 1;
                log::trace!("frame {} drew {} of {} calls", self.frames, drawn, draws.len());
            }
            Err(e) => log::warn!("frame failed: {}", e),
        }

        if stop_requested {
            self.stop();
        } else if let Err(e) = self.scheduler.request_frame() {
            self.stop();
            return Err(e);
        }
        submitted.map(|_| true)
    }

    /// Stops requesting frames and cancels the outstanding one. Idempotent.
    pub fn stop(&mut self) {
        if self.loop_state == LoopState::Stopped {
            return;
        }
        self.scheduler.cancel();
        self.loop_state = LoopState::Stopped;
        log::info!("render loop stopped after {} frames", self.frames);
    }

    pub fn into_parts(self) -> (Context<B>, S) {
        (self.ctx, self.state)
    }
}

/// Initialises logging: `env_logger` on native targets, the browser console on wasm.
///
/// Safe to call more than once; later calls only report that a logger exists.
pub fn init_logging() {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            println!("Warning: Could not initialize logger: {}", e);
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        if console_log::init_with_level(log::Level::Info).is_err() {
            log::debug!("console logger already initialised");
        }
    }
}

#[cfg(target_arch = "wasm32")]
pub use web::{AnimationFrameScheduler, run_in_browser};

#[cfg(target_arch = "wasm32")]
mod web {
    use std::{cell::RefCell, rc::Rc};

    use instant::Instant;
    use wasm_bindgen::{JsCast, closure::Closure};

    use super::{FrameScheduler, GraphicsFlow, RenderLoop};
    use crate::{context::Context, render::RenderBackend};

    /// Schedules frames with `requestAnimationFrame`.
    #[derive(Default)]
    pub struct AnimationFrameScheduler {
        callback: Option<Closure<dyn FnMut(f64)>>,
        handle: Option<i32>,
    }

    impl FrameScheduler for AnimationFrameScheduler {
        fn request_frame(&mut self) -> anyhow::Result<()> {
            let window = web_sys::window().ok_or_else(|| anyhow::anyhow!("no browser window"))?;
            let callback = self
                .callback
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("frame callback not installed"))?;
            let handle = window
                .request_animation_frame(callback.as_ref().unchecked_ref())
                .map_err(|e| anyhow::anyhow!("requestAnimationFrame failed: {:?}", e))?;
            self.handle = Some(handle);
            Ok(())
        }

        fn cancel(&mut self) {
            if let (Some(handle), Some(window)) = (self.handle.take(), web_sys::window()) {
                if let Err(e) = window.cancel_animation_frame(handle) {
                    log::warn!("cancelAnimationFrame failed: {:?}", e);
                }
            }
        }

        fn frame_delivered(&mut self) {
            self.handle = None;
        }
    }

    /// Arms a loop driven by the browser's animation frames.
    ///
    /// The returned handle keeps the loop alive; call `stop()` on it to end
    /// the animation.
    pub fn run_in_browser<S: 'static, B: RenderBackend + 'static>(
        ctx: Context<B>,
        state: S,
        flows: Vec<Box<dyn GraphicsFlow<S, B>>>,
    ) -> anyhow::Result<Rc<RefCell<RenderLoop<S, B, AnimationFrameScheduler>>>> {
        super::init_logging();
        let render_loop = Rc::new(RefCell::new(RenderLoop::new(
            ctx,
            state,
            flows,
            AnimationFrameScheduler::default(),
        )));
        let weak = Rc::downgrade(&render_loop);
        let callback = Closure::<dyn FnMut(f64)>::new(move |_timestamp: f64| {
            if let Some(render_loop) = weak.upgrade() {
                if let Err(e) = render_loop.borrow_mut().frame(Instant::now()) {
                    log::error!("Unable to render {}", e);
                }
            }
        });
        render_loop.borrow_mut().scheduler_mut().callback = Some(callback);
        render_loop.borrow_mut().arm()?;
        Ok(render_loop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        data_structures::{mesh::Mesh, scene_graph::SceneNode, shapes, transform::TransformRaw},
        render::{FrameUniforms, Recorder},
    };

    /// Recorder whose first `failures` draws error out.
    struct Flaky {
        inner: Recorder,
        failures: u32,
    }

    impl RenderBackend for Flaky {
        type MeshHandle = usize;

        fn upload_mesh(&mut self, mesh: &Mesh) -> anyhow::Result<usize> {
            self.inner.upload_mesh(mesh)
        }

        fn begin_frame(&mut self, uniforms: &FrameUniforms) -> anyhow::Result<()> {
            self.inner.begin_frame(uniforms)
        }

        fn draw(&mut self, mesh: &usize, model: &TransformRaw) -> anyhow::Result<()> {
            if self.failures > 0 {
                self.failures -= 1;
                anyhow::bail!("context lost");
            }
            self.inner.draw(mesh, model)
        }

        fn end_frame(&mut self) -> anyhow::Result<()> {
            self.inner.end_frame()
        }
    }

    /// Refuses frame requests while `refuse` is set.
    #[derive(Default)]
    struct Refusing {
        refuse: bool,
        inner: ManualScheduler,
    }

    impl FrameScheduler for Refusing {
        fn request_frame(&mut self) -> anyhow::Result<()> {
            if self.refuse {
                anyhow::bail!("no window");
            }
            self.inner.request_frame()
        }

        fn cancel(&mut self) {
            self.inner.cancel();
        }

        fn frame_delivered(&mut self) {
            self.inner.frame_delivered();
        }
    }

    struct InitCounter;

    impl<B: RenderBackend> GraphicsFlow<u32, B> for InitCounter {
        fn on_init(&mut self, _: &mut Context<B>, state: &mut u32) -> anyhow::Result<()> {
            *state += 1;
            Ok(())
        }

        fn on_update(&mut self, _: &Context<B>, _: &mut u32, _: Duration) -> Out<B> {
            Out::Empty
        }

        fn on_render(&self) -> Vec<DrawCall> {
            Vec::new()
        }
    }

    struct Counter {
        ticks: u32,
    }

    impl GraphicsFlow<u32, Recorder> for Counter {
        fn on_init(&mut self, _: &mut Context<Recorder>, state: &mut u32) -> anyhow::Result<()> {
            *state = 0;
            Ok(())
        }

        fn on_update(&mut self, _: &Context<Recorder>, state: &mut u32, _: Duration) -> Out<Recorder> {
            *state += 1;
            Out::Empty
        }

        fn on_tick(&mut self, _: &Context<Recorder>, _: &mut u32) -> Out<Recorder> {
            self.ticks += 1;
            if self.ticks == 2 { Out::Stop } else { Out::Empty }
        }

        fn on_render(&self) -> Vec<DrawCall> {
            Vec::new()
        }
    }

    fn scene_loop() -> RenderLoop<(), Recorder, ManualScheduler> {
        let mut ctx = Context::new(Recorder::new(), 100, 100);
        let cube = ctx.register_mesh(&shapes::cube(1.0).unwrap()).unwrap();
        let mut scene = Scene::new();
        scene.add(SceneNode::new(cube));
        let flows: Vec<Box<dyn GraphicsFlow<(), Recorder>>> =
            vec![Box::new(SceneFlow::new(scene, Vec::new()))];
        RenderLoop::new(ctx, (), flows, ManualScheduler::new())
    }

    #[test]
    fn frames_before_arming_are_ignored() {
        let mut render_loop = scene_loop();
        assert_eq!(render_loop.loop_state(), LoopState::Idle);
        assert!(!render_loop.frame_with_dt(Duration::from_millis(16)).unwrap());
        assert_eq!(render_loop.frame_count(), 0);

        render_loop.arm().unwrap();
        assert_eq!(render_loop.loop_state(), LoopState::Running);
        assert!(render_loop.scheduler().is_pending());
        assert!(render_loop.arm().is_err());
    }

    #[test]
    fn each_frame_draws_and_schedules_the_next() {
        let mut render_loop = scene_loop();
        render_loop.arm().unwrap();
        for _ in 0..3 {
            assert!(render_loop.frame_with_dt(Duration::from_millis(16)).unwrap());
        }
        assert_eq!(render_loop.scheduler().requested(), 4);
        let frames = render_loop.context().backend().frames();
        assert_eq!(frames.len(), 3);
        assert!(frames.iter().all(|f| f.draws.len() == 1));
    }

    #[test]
    fn stop_cancels_and_ignores_late_frames() {
        let mut render_loop = scene_loop();
        render_loop.arm().unwrap();
        render_loop.frame_with_dt(Duration::from_millis(16)).unwrap();
        render_loop.stop();
        assert!(render_loop.scheduler().was_cancelled());
        assert!(!render_loop.scheduler().is_pending());
        assert!(!render_loop.frame_with_dt(Duration::from_millis(16)).unwrap());
        assert_eq!(render_loop.frame_count(), 1);
        render_loop.stop();
        assert_eq!(render_loop.loop_state(), LoopState::Stopped);
    }

    #[test]
    fn ticks_fire_on_interval_and_can_stop_the_loop() {
        let mut ctx = Context::new(Recorder::new(), 100, 100);
        ctx.tick_duration_millis = 100;
        let flows: Vec<Box<dyn GraphicsFlow<u32, Recorder>>> = vec![Box::new(Counter { ticks: 0 })];
        let mut render_loop = RenderLoop::new(ctx, 7, flows, ManualScheduler::new());
        render_loop.arm().unwrap();
        assert_eq!(*render_loop.state(), 0);

        let mut frames = 0;
        while render_loop.frame_with_dt(Duration::from_millis(40)).unwrap() {
            frames += 1;
        }
        // ticks after 120ms and 240ms, the second one stops the loop
        assert_eq!(frames, 6);
        assert_eq!(*render_loop.state(), 6);
        assert_eq!(render_loop.loop_state(), LoopState::Stopped);
    }

    #[test]
    fn failed_draw_closes_the_frame_and_keeps_running() {
        let mut ctx = Context::new(
            Flaky {
                inner: Recorder::new(),
                failures: 1,
            },
            100,
            100,
        );
        let cube = ctx.register_mesh(&shapes::cube(1.0).unwrap()).unwrap();
        let mut scene = Scene::new();
        scene.add(SceneNode::new(cube));
        let flows: Vec<Box<dyn GraphicsFlow<(), Flaky>>> =
            vec![Box::new(SceneFlow::new(scene, Vec::new()))];
        let mut render_loop = RenderLoop::new(ctx, (), flows, ManualScheduler::new());
        render_loop.arm().unwrap();

        let err = render_loop.frame_with_dt(Duration::from_millis(16)).unwrap_err();
        assert_eq!(err.to_string(), "context lost");
        assert_eq!(render_loop.loop_state(), LoopState::Running);
        assert!(render_loop.scheduler().is_pending());
        assert_eq!(render_loop.frame_count(), 0);

        assert!(render_loop.frame_with_dt(Duration::from_millis(16)).unwrap());
        assert_eq!(render_loop.frame_count(), 1);
        let frames = render_loop.context().backend().inner.frames();
        assert_eq!(frames.len(), 2);
        assert!(frames[0].draws.is_empty());
        assert_eq!(frames[1].draws.len(), 1);
    }

    #[test]
    fn refused_frame_request_leaves_the_loop_idle() {
        let ctx = Context::new(Recorder::new(), 100, 100);
        let flows: Vec<Box<dyn GraphicsFlow<u32, Recorder>>> = vec![Box::new(InitCounter)];
        let scheduler = Refusing {
            refuse: true,
            ..Default::default()
        };
        let mut render_loop = RenderLoop::new(ctx, 0, flows, scheduler);

        assert!(render_loop.arm().is_err());
        assert_eq!(render_loop.loop_state(), LoopState::Idle);
        assert!(!render_loop.frame_with_dt(Duration::from_millis(16)).unwrap());

        render_loop.scheduler_mut().refuse = false;
        render_loop.arm().unwrap();
        assert_eq!(render_loop.loop_state(), LoopState::Running);
        assert!(render_loop.scheduler().inner.is_pending());
        assert_eq!(*render_loop.state(), 1);

        render_loop.scheduler_mut().refuse = true;
        assert!(render_loop.frame_with_dt(Duration::from_millis(16)).is_err());
        assert_eq!(render_loop.loop_state(), LoopState::Stopped);
    }
}
