//! Per-frame animation of scene nodes.
//!
//! - [`AnimatedScalar`] is a value that moves by a fixed step per frame or at
//!   a rate per second, optionally wrapping at a period (e.g. a full turn).
//! - [`Animation`] binds a scalar to a node and writes it into the node's
//!   transform each frame.

use std::f32::consts::TAU;

use cgmath::Vector3;
use instant::Duration;

use crate::data_structures::scene_graph::{NodeId, Scene};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Step {
    /// Added once per frame regardless of frame time.
    PerFrame(f32),
    /// Scaled by the elapsed time.
    PerSecond(f32),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnimatedScalar {
    value: f32,
    step: Step,
    period: Option<f32>,
}

impl AnimatedScalar {
    pub fn new(value: f32, step: Step) -> Self {
        Self {
            value,
            step,
            period: None,
        }
    }

    /// An angle in radians that wraps every full turn.
    pub fn angle(value: f32, step: Step) -> Self {
        Self::new(value, step).wrapping(TAU)
    }

    /// Keeps the value in `[0, period)`.
    pub fn wrapping(mut self, period: f32) -> Self {
        self.period = (period > 0.0).then_some(period);
        self
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn advance(&mut self, dt: Duration) -> f32 {
        self.value += match self.step {
            Step::PerFrame(step) => step,
            Step::PerSecond(rate) => rate * dt.as_secs_f32(),
        };
        if let Some(period) = self.period {
            self.value = self.value.rem_euclid(period);
        }
        self.value
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Animation {
    /// Sets the node's rotation about `axis` to the scalar's value.
    Spin {
        node: NodeId,
        axis: Axis,
        angle: AnimatedScalar,
    },
    /// Moves the node on a horizontal circle around `center`.
    Orbit {
        node: NodeId,
        center: Vector3<f32>,
        radius: f32,
        phase: AnimatedScalar,
    },
}

impl Animation {
    pub fn node(&self) -> NodeId {
        match self {
            Animation::Spin { node, .. } | Animation::Orbit { node, .. } => *node,
        }
    }

    /// Advances the animation and writes the result into the scene.
    pub fn apply(&mut self, scene: &mut Scene, dt: Duration) {
        let id = self.node();
        let Some(node) = scene.node_mut(id) else {
            log::warn!("animation targets node {} which is not in the scene", id.index());
            return;
        };
        match self {
            Animation::Spin { axis, angle, .. } => {
                let value = angle.advance(dt);
                let [x, y, z] = node.rotation();
                match axis {
                    Axis::X => node.set_rotation(value, y, z),
                    Axis::Y => node.set_rotation(x, value, z),
                    Axis::Z => node.set_rotation(x, y, value),
                }
            }
            Animation::Orbit {
                center,
                radius,
                phase,
                ..
            } => {
                let phase = phase.advance(dt);
                node.set_position(
                    center.x + *radius * phase.cos(),
                    center.y,
                    center.z + *radius * phase.sin(),
                );
            }
        }
    }
}
