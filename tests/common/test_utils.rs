use flow_geom::{context::Context, render::Recorder};

pub(crate) struct State {
    frame_counter: u32,
    init_invocations: u32,
    update_invocations: u32,
    tick_invocations: u32,
    pub dummy_state: String,
}
impl State {
    pub fn new() -> Self {
        Self {
            frame_counter: 0,
            init_invocations: 0,
            update_invocations: 0,
            tick_invocations: 0,
            dummy_state: String::new(),
        }
    }

    pub fn frame(&mut self) {
        self.frame_counter += 1;
    }

    pub fn init(&mut self) {
        self.init_invocations += 1;
    }

    pub fn update(&mut self) {
        self.update_invocations += 1;
    }

    pub fn tick(&mut self) {
        self.tick_invocations += 1;
    }

    pub fn frame_counter(&self) -> u32 {
        self.frame_counter
    }

    pub fn init_invocations(&self) -> u32 {
        self.init_invocations
    }

    pub fn update_invocations(&self) -> u32 {
        self.update_invocations
    }

    pub fn tick_invocations(&self) -> u32 {
        self.tick_invocations
    }
}

impl Default for State {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub(crate) fn recording_context() -> Context<Recorder> {
    Context::new(Recorder::new(), 800, 600)
}

/// A unit quad split into two objects, with a material library.
pub(crate) const QUAD_OBJ: &str = "\
# two halves of a quad
mtllib quad.mtl
o lower
usemtl red
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vn 0 0 1
f 1//1 2//1 3//1
o upper
usemtl blue
f -4//1 -2//1 -1//1
";

pub(crate) const QUAD_MTL: &str = "\
newmtl red
Kd 1 0 0
Ns 10
newmtl blue
Kd 0 0 1
d 0.5
";
