//! L-system plants.
//!
//! Generation runs in three stages:
//! - [`LSystem`] rewrites the axiom a fixed number of times,
//! - a [`Turtle`] walks the resulting string and emits one [`Segment`] per `F`,
//! - [`PlantGenerator`] turns every segment into a tapered cylinder, merges
//!   them into one [`Mesh`] and stands the result on the ground plane.
//!
//! Recognised symbols are `F` (advance and draw), `+`/`-` (turn about the
//! turtle's local Z axis), `[` (save state) and `]` (restore state). Every
//! other symbol only takes part in rewriting.
//!
//! Segment count grows with both `iterations` and the rule set. Keeping
//! `iterations` small and `length_factor < 1` is up to the caller.

use std::collections::BTreeMap;

use cgmath::{InnerSpace, One, Quaternion, Rad, Rotation3, Vector3};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{
    data_structures::{mesh::Mesh, shapes},
    error::GeometryError,
    math,
};

#[derive(Debug, Clone, PartialEq)]
pub struct LSystem {
    axiom: String,
    rules: BTreeMap<char, String>,
}

impl LSystem {
    pub fn new(axiom: impl Into<String>, rules: BTreeMap<char, String>) -> Self {
        Self {
            axiom: axiom.into(),
            rules,
        }
    }

    pub fn axiom(&self) -> &str {
        &self.axiom
    }

    /// One simultaneous substitution over `input`. Symbols without a rule are
    /// copied unchanged.
    pub fn rewrite(&self, input: &str) -> String {
        let mut output = String::with_capacity(input.len());
        for symbol in input.chars() {
            match self.rules.get(&symbol) {
                Some(replacement) => output.push_str(replacement),
                None => output.push(symbol),
            }
        }
        output
    }

    pub fn expand(&self, iterations: u32) -> String {
        let mut current = self.axiom.clone();
        for iteration in 0..iterations {
            current = self.rewrite(&current);
            log::trace!("l-system iteration {} -> {} symbols", iteration + 1, current.len());
        }
        current
    }
}

/// Position, heading and the size of the next segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TurtleState {
    pub position: Vector3<f32>,
    pub orientation: Quaternion<f32>,
    pub length: f32,
    pub thickness: f32,
}

impl TurtleState {
    pub fn new(length: f32, thickness: f32) -> Self {
        Self {
            position: Vector3::new(0.0, 0.0, 0.0),
            orientation: Quaternion::one(),
            length,
            thickness,
        }
    }
}

/// A drawn branch piece, thick at `start` and tapering towards `end`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub start: Vector3<f32>,
    pub end: Vector3<f32>,
    pub radius_start: f32,
    pub radius_end: f32,
}

#[derive(Debug, Clone)]
pub struct Turtle {
    state: TurtleState,
    stack: Vec<TurtleState>,
    length_factor: f32,
}

impl Turtle {
    pub fn new(state: TurtleState, length_factor: f32) -> Self {
        Self {
            state,
            stack: Vec::new(),
            length_factor,
        }
    }

    pub fn state(&self) -> &TurtleState {
        &self.state
    }

    /// Number of saved states.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Forward direction: the local +Y axis.
    pub fn heading(&self) -> Vector3<f32> {
        self.state.orientation * Vector3::unit_y()
    }

    /// Moves by the current length and shrinks length and thickness.
    pub fn forward(&mut self) -> Segment {
        let start = self.state.position;
        let end = start + self.heading() * self.state.length;
        let segment = Segment {
            start,
            end,
            radius_start: self.state.thickness,
            radius_end: self.state.thickness * self.length_factor,
        };
        self.state.position = end;
        self.state.length *= self.length_factor;
        self.state.thickness *= self.length_factor;
        segment
    }

    /// Rotates about the local Z axis; positive angles turn counter-clockwise.
    pub fn turn(&mut self, radians: f32) {
        let rotation = Quaternion::from_axis_angle(Vector3::unit_z(), Rad(radians));
        self.state.orientation = (self.state.orientation * rotation).normalize();
    }

    pub fn push(&mut self) {
        self.stack.push(self.state);
    }

    /// Restores the most recently saved state. Returns `false`, leaving the
    /// turtle untouched, when nothing was saved.
    pub fn pop(&mut self) -> bool {
        match self.stack.pop() {
            Some(saved) => {
                self.state = saved;
                true
            }
            None => false,
        }
    }
}

/// Generation settings, loadable from a JSON preset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlantParams {
    pub axiom: String,
    pub rules: BTreeMap<char, String>,
    pub iterations: u32,
    /// Turn angle in degrees.
    pub angle: f32,
    pub initial_length: f32,
    /// Applied to length and thickness after every segment.
    pub length_factor: f32,
    pub thickness: f32,
    /// Chance of a leaf on a segment short enough to carry one.
    pub leaf_density: f32,
    /// Segments shorter than `initial_length * leaf_length_threshold` may carry leaves.
    pub leaf_length_threshold: f32,
    pub segment_sides: u32,
    pub min_radius: f32,
    /// Y coordinate of the lowest point of the finished plant.
    pub ground_height: f32,
}

impl Default for PlantParams {
    fn default() -> Self {
        Self {
            axiom: "F".to_string(),
            rules: BTreeMap::from([('F', "F[+F]F[-F]F".to_string())]),
            iterations: 3,
            angle: 25.7,
            initial_length: 1.0,
            length_factor: 0.9,
            thickness: 0.1,
            leaf_density: 0.3,
            leaf_length_threshold: 0.3,
            segment_sides: 8,
            min_radius: 0.01,
            ground_height: 0.0,
        }
    }
}

impl PlantParams {
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn validate(&self) -> Result<(), GeometryError> {
        if self.segment_sides < 3 {
            return Err(GeometryError::invalid(
                "segment_sides",
                format!("segments need at least 3 sides, got {}", self.segment_sides),
            ));
        }
        let non_negative = [
            ("initial_length", self.initial_length),
            ("length_factor", self.length_factor),
            ("thickness", self.thickness),
            ("min_radius", self.min_radius),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(GeometryError::invalid(
                    name,
                    format!("expected a finite, non-negative value, got {value}"),
                ));
            }
        }
        for (name, value) in [("angle", self.angle), ("ground_height", self.ground_height)] {
            if !value.is_finite() {
                return Err(GeometryError::invalid(name, format!("not finite: {value}")));
            }
        }
        if !(0.0..=1.0).contains(&self.leaf_density) {
            return Err(GeometryError::invalid(
                "leaf_density",
                format!("expected a probability in [0, 1], got {}", self.leaf_density),
            ));
        }
        Ok(())
    }
}

/// Where a leaf should be instanced on the finished plant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Leaf {
    pub position: Vector3<f32>,
    pub orientation: Quaternion<f32>,
    /// In `[0.5, 1.0)`.
    pub scale: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Plant {
    pub mesh: Mesh,
    pub leaves: Vec<Leaf>,
    pub segment_count: usize,
}

pub struct PlantGenerator {
    params: PlantParams,
    system: LSystem,
}

impl PlantGenerator {
    pub fn new(params: PlantParams) -> Result<Self, GeometryError> {
        params.validate()?;
        let system = LSystem::new(params.axiom.clone(), params.rules.clone());
        Ok(Self { params, system })
    }

    pub fn params(&self) -> &PlantParams {
        &self.params
    }

    pub fn expand(&self) -> String {
        self.system.expand(self.params.iterations)
    }

    /// Builds the branch mesh and leaf markers. Leaf placement draws from `rng`,
    /// so a seeded generator gives a reproducible plant.
    pub fn generate<R: Rng>(&self, rng: &mut R) -> Result<Plant, GeometryError> {
        let p = &self.params;
        let symbols = self.expand();
        log::debug!(
            "generating plant from {} symbols after {} iterations",
            symbols.len(),
            p.iterations
        );

        let angle = p.angle.to_radians();
        let leaf_limit = p.initial_length * p.leaf_length_threshold;
        let mut turtle = Turtle::new(
            TurtleState::new(p.initial_length, p.thickness),
            p.length_factor,
        );
        let mut segments = Vec::new();
        let mut leaves = Vec::new();

        for symbol in symbols.chars() {
            match symbol {
                'F' => {
                    let segment = turtle.forward();
                    segments.push(self.segment_mesh(&segment)?);

                    let state = turtle.state();
                    if rng.gen_range(0.0f32..1.0) < p.leaf_density && state.length < leaf_limit {
                        leaves.push(Leaf {
                            position: state.position,
                            orientation: state.orientation,
                            scale: rng.gen_range(0.5f32..1.0),
                        });
                    }
                }
                '+' => turtle.turn(angle),
                '-' => turtle.turn(-angle),
                '[' => turtle.push(),
                ']' => {
                    if !turtle.pop() {
                        log::debug!("ignoring `]` without a matching `[`");
                    }
                }
                _ => (),
            }
        }

        let segment_count = segments.len();
        let mesh = Mesh::merge(segments);
        let Some(extents) = mesh.extents() else {
            return Ok(Plant {
                mesh,
                leaves,
                segment_count,
            });
        };
        let offset = Vector3::new(0.0, p.ground_height - extents.min[1], 0.0);
        for leaf in leaves.iter_mut() {
            leaf.position += offset;
        }
        Ok(Plant {
            mesh: mesh.translated(offset),
            leaves,
            segment_count,
        })
    }

    fn segment_mesh(&self, segment: &Segment) -> Result<Mesh, GeometryError> {
        let min_radius = self.params.min_radius;
        let delta = segment.end - segment.start;
        let cylinder = shapes::tapered_cylinder(
            self.params.segment_sides,
            delta.magnitude(),
            segment.radius_end.max(min_radius),
            segment.radius_start.max(min_radius),
        )?;
        let rotation = math::quat_from_unit_vectors(Vector3::unit_y(), math::normalize(delta));
        let midpoint = segment.start + delta * 0.5;
        Ok(cylinder.oriented(rotation, midpoint))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::{SeedableRng, rngs::StdRng};
    use std::f32::consts::FRAC_PI_2;

    fn rules(pairs: &[(char, &str)]) -> BTreeMap<char, String> {
        pairs.iter().map(|(k, v)| (*k, v.to_string())).collect()
    }

    #[test]
    fn rewrite_substitutes_simultaneously() {
        let system = LSystem::new("AB", rules(&[('A', "AB"), ('B', "A")]));
        assert_eq!(system.expand(0), "AB");
        assert_eq!(system.expand(1), "ABA");
        assert_eq!(system.expand(2), "ABAAB");
    }

    #[test]
    fn rewrite_is_idempotent_on_a_fixed_point() {
        let system = LSystem::new("F", rules(&[('F', "F[+F]F")]));
        let fixed = "+-[]X";
        assert_eq!(system.rewrite(fixed), fixed);
        assert_eq!(system.rewrite(&system.rewrite(fixed)), fixed);
    }

    #[test]
    fn turtle_pop_restores_matching_push() {
        let mut turtle = Turtle::new(TurtleState::new(1.0, 0.2), 0.5);
        let initial = *turtle.state();

        turtle.push();
        turtle.forward();
        turtle.turn(0.3);
        let inner = *turtle.state();
        turtle.push();
        turtle.forward();
        turtle.turn(-1.1);

        assert!(turtle.pop());
        assert_eq!(*turtle.state(), inner);
        assert!(turtle.pop());
        assert_eq!(*turtle.state(), initial);
        assert_eq!(turtle.depth(), 0);
    }

    #[test]
    fn turtle_pop_on_empty_stack_is_a_no_op() {
        let mut turtle = Turtle::new(TurtleState::new(1.0, 0.2), 0.5);
        turtle.forward();
        let before = *turtle.state();
        assert!(!turtle.pop());
        assert_eq!(*turtle.state(), before);
    }

    #[test]
    fn turtle_walks_up_and_turns_counter_clockwise() {
        let mut turtle = Turtle::new(TurtleState::new(1.0, 0.2), 0.5);
        let first = turtle.forward();
        assert_eq!(first.end, Vector3::new(0.0, 1.0, 0.0));
        assert_relative_eq!(first.radius_end, 0.1);

        turtle.turn(FRAC_PI_2);
        let second = turtle.forward();
        assert_relative_eq!(second.end.x, -0.5, epsilon = 1e-5);
        assert_relative_eq!(second.end.y, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn generated_plant_stands_on_the_ground() {
        let params = PlantParams {
            ground_height: -2.0,
            ..PlantParams::default()
        };
        let generator = PlantGenerator::new(params).unwrap();
        let plant = generator.generate(&mut StdRng::seed_from_u64(7)).unwrap();

        let expected_segments = generator.expand().matches('F').count();
        assert_eq!(plant.segment_count, expected_segments);
        assert_eq!(plant.mesh.vertex_count(), expected_segments * (2 + 2 * 8));
        assert_eq!(plant.mesh.index_count(), expected_segments * 12 * 8);
        assert!(plant.mesh.is_valid());
        assert_relative_eq!(plant.mesh.extents().unwrap().min[1], -2.0, epsilon = 1e-4);
    }

    #[test]
    fn leaves_follow_density_and_threshold() {
        let bare = PlantParams {
            leaf_density: 0.0,
            ..PlantParams::default()
        };
        let plant = PlantGenerator::new(bare)
            .unwrap()
            .generate(&mut StdRng::seed_from_u64(1))
            .unwrap();
        assert!(plant.leaves.is_empty());

        let lush = PlantParams {
            leaf_density: 1.0,
            leaf_length_threshold: 1.0,
            ..PlantParams::default()
        };
        let plant = PlantGenerator::new(lush)
            .unwrap()
            .generate(&mut StdRng::seed_from_u64(1))
            .unwrap();
        assert_eq!(plant.leaves.len(), plant.segment_count);
        assert!(plant.leaves.iter().all(|l| (0.5..1.0).contains(&l.scale)));
    }

    #[test]
    fn same_seed_gives_same_plant() {
        let generator = PlantGenerator::new(PlantParams::default()).unwrap();
        let a = generator.generate(&mut StdRng::seed_from_u64(42)).unwrap();
        let b = generator.generate(&mut StdRng::seed_from_u64(42)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn empty_expansion_gives_empty_plant() {
        let params = PlantParams {
            axiom: "+[-]".to_string(),
            rules: BTreeMap::new(),
            ..PlantParams::default()
        };
        let plant = PlantGenerator::new(params)
            .unwrap()
            .generate(&mut StdRng::seed_from_u64(0))
            .unwrap();
        assert!(plant.mesh.is_empty());
        assert_eq!(plant.segment_count, 0);
    }

    #[test]
    fn params_load_from_json_and_reject_bad_values() {
        let params = PlantParams::from_json_str(
            r#"{ "axiom": "X", "rules": { "X": "F[+X]F[-X]+X", "F": "FF" }, "iterations": 2 }"#,
        )
        .unwrap();
        assert_eq!(params.rules.get(&'X').map(String::as_str), Some("F[+X]F[-X]+X"));
        assert_eq!(params.segment_sides, 8);
        assert_eq!(params.leaf_length_threshold, 0.3);

        let broken = PlantParams {
            segment_sides: 2,
            ..PlantParams::default()
        };
        assert!(PlantGenerator::new(broken).is_err());
    }
}
