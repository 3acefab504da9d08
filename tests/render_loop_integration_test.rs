use flow_geom::{
    context::Context,
    data_structures::{
        animation::{AnimatedScalar, Animation, Axis, Step},
        scene_graph::{Scene, SceneNode},
        shapes,
    },
    flow::{GraphicsFlow, LoopState, ManualScheduler, Out, RenderLoop, SceneFlow},
    render::{DrawCall, Recorder},
};
use instant::Duration;

use crate::common::test_utils::{State, init_logging, recording_context};

mod common;

struct GraphicsElement;

impl GraphicsFlow<State, Recorder> for GraphicsElement {
    fn on_init(&mut self, ctx: &mut Context<Recorder>, state: &mut State) -> anyhow::Result<()> {
        ctx.clear_colour = [0.0, 0.0, 0.0, 0.0];
        ctx.tick_duration_millis = 50;
        assert_eq!(state.frame_counter(), 0);
        assert_eq!(state.init_invocations(), 0);
        assert_eq!(state.update_invocations(), 0);

        state.init();
        Ok(())
    }

    fn on_update(&mut self, _: &Context<Recorder>, state: &mut State, _: Duration) -> Out<Recorder> {
        assert_eq!(state.frame_counter(), state.update_invocations());
        assert_eq!(state.init_invocations(), 1);
        state.frame();
        state.update();

        match state.frame_counter() {
            2 => Out::Configure(Box::new(|ctx: &mut Context<Recorder>| {
                ctx.clear_colour = [1.0, 1.0, 1.0, 1.0];
            })),
            6 => Out::Stop,
            _ => Out::Empty,
        }
    }

    fn on_tick(&mut self, _: &Context<Recorder>, state: &mut State) -> Out<Recorder> {
        state.tick();
        state.dummy_state.push('t');
        Out::Empty
    }

    fn on_render(&self) -> Vec<DrawCall> {
        Vec::new()
    }
}

#[test]
fn lifecycle_runs_in_order_until_stop() {
    init_logging();
    let flows: Vec<Box<dyn GraphicsFlow<State, Recorder>>> = vec![Box::new(GraphicsElement)];
    let mut render_loop = RenderLoop::new(recording_context(), State::new(), flows, ManualScheduler::new());
    render_loop.arm().unwrap();
    assert!(render_loop.arm().is_err());

    let mut rendered = 0;
    while render_loop.scheduler().is_pending() {
        assert!(render_loop.frame_with_dt(Duration::from_millis(20)).unwrap());
        rendered += 1;
        assert!(rendered <= 6, "loop did not stop");
    }

    assert_eq!(render_loop.loop_state(), LoopState::Stopped);
    assert!(render_loop.scheduler().was_cancelled());
    assert!(!render_loop.frame_with_dt(Duration::from_millis(20)).unwrap());
    assert_eq!(render_loop.frame_count(), 6);

    let frames = render_loop.context().backend().frames();
    assert_eq!(frames[0].uniforms.clear_colour, [0.0, 0.0, 0.0, 0.0]);
    // the configure output of frame 2 applies before frame 2 is issued
    assert_eq!(frames[1].uniforms.clear_colour, [1.0, 1.0, 1.0, 1.0]);

    let (_, state) = render_loop.into_parts();
    assert_eq!(state.update_invocations(), 6);
    // 120ms of frames at a 50ms tick
    assert_eq!(state.tick_invocations(), 2);
    assert_eq!(state.dummy_state, "tt");
}

#[test]
fn scene_flow_draws_animated_nodes_every_frame() {
    init_logging();
    let mut ctx = recording_context();
    let cylinder = ctx.register_mesh(&shapes::cylinder(12, 2.0, 0.5).unwrap()).unwrap();
    let cube = ctx.register_mesh(&shapes::cube(1.0).unwrap()).unwrap();

    let mut scene = Scene::new();
    let base = scene.add(SceneNode::new(cylinder));
    let arm = scene.add_child(base, SceneNode::new(cube)).unwrap();
    scene.node_mut(arm).unwrap().set_position(0.0, 2.0, 0.0);
    let spin = Animation::Spin {
        node: base,
        axis: Axis::Y,
        angle: AnimatedScalar::angle(0.0, Step::PerFrame(0.1)),
    };
    let flow = SceneFlow::new(scene, vec![spin]);

    let flows: Vec<Box<dyn GraphicsFlow<(), Recorder>>> = vec![Box::new(flow)];
    let mut render_loop = RenderLoop::new(ctx, (), flows, ManualScheduler::new());
    render_loop.arm().unwrap();
    for _ in 0..3 {
        render_loop.frame_with_dt(Duration::from_millis(16)).unwrap();
    }
    render_loop.stop();

    let recorder = render_loop.context().backend();
    assert_eq!(recorder.meshes().len(), 2);
    assert_eq!(recorder.frames().len(), 3);
    for frame in recorder.frames() {
        let meshes: Vec<usize> = frame.draws.iter().map(|(mesh, _)| *mesh).collect();
        assert_eq!(meshes, vec![0, 1]);
    }

    // the base turns by 0.1 rad per frame; the child keeps its offset straight up
    let last = recorder.last_frame().unwrap();
    let base_model = last.draws[0].1.model;
    let angle = 0.3f32;
    approx::assert_relative_eq!(base_model[0][0], angle.cos(), epsilon = 1e-5);
    approx::assert_relative_eq!(base_model[2][0], angle.sin(), epsilon = 1e-5);
    let arm_model = last.draws[1].1.model;
    approx::assert_relative_eq!(arm_model[3][1], 2.0, epsilon = 1e-5);
}
