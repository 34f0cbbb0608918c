//! Force-directed graph layout with Barnes–Hut repulsion and annealing.
//!
//! The simulation is single-threaded and cooperative: the owning view calls
//! [`ForceDirectedLayout::step`] once per frame and the layout never loops
//! internally. State is owned by exactly one actor; nothing here is shared.
//! Layout is the one non-deterministic component of the core — initial
//! positions are seeded-random — and its contract is only that it converges.

mod quadtree;

use std::collections::{HashMap, HashSet};

use rand::{Rng, SeedableRng, rngs::SmallRng};
use tracing::debug;

use crate::hypergraph::{HypergraphIndex, NodeId, Role};

use self::quadtree::QuadTree;

/// A 2-D vector in layout space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec2 {
    /// Horizontal component.
    pub x: f32,
    /// Vertical component.
    pub y: f32,
}

impl Vec2 {
    /// The origin.
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    /// Creates a vector from components.
    #[rustfmt::skip]
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self { Self { x, y } }

    /// Component-wise sum.
    #[must_use]
    pub fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y)
    }

    /// Component-wise difference.
    #[must_use]
    pub fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y)
    }

    /// Scalar multiple.
    #[must_use]
    pub fn scale(self, factor: f32) -> Self {
        Self::new(self.x * factor, self.y * factor)
    }

    /// Euclidean length.
    #[must_use]
    pub fn length(self) -> f32 {
        self.x.hypot(self.y)
    }
}

/// Simulation tunables; defaults match the interactive view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutTunables {
    /// Rest length of every spring.
    pub spring_length: f32,
    /// Hooke constant for spring forces.
    pub spring_strength: f32,
    /// Coulomb-style constant for Barnes–Hut repulsion.
    pub repulsion_strength: f32,
    /// Per-step velocity decay.
    pub damping: f32,
    /// Per-step temperature decay.
    pub cooling_factor: f32,
    /// Barnes–Hut opening angle.
    pub barnes_hut_theta: f32,
    /// Speed clamp applied after damping.
    pub max_velocity: f32,
    /// Mean kinetic energy below which the layout can settle.
    pub stability_threshold: f32,
}

impl Default for LayoutTunables {
    fn default() -> Self {
        Self {
            spring_length: 120.0,
            spring_strength: 0.05,
            repulsion_strength: 8000.0,
            damping: 0.85,
            cooling_factor: 0.995,
            barnes_hut_theta: 0.8,
            max_velocity: 50.0,
            stability_threshold: 0.1,
        }
    }
}

/// Quadtree bounding-box padding in layout units.
const BOUNDS_PADDING: f32 = 100.0;

/// Temperature floor restored when a node is unpinned.
const REHEAT_TEMPERATURE: f32 = 0.1;

/// Temperature below which a calm layout is considered settled.
const SETTLED_TEMPERATURE: f32 = 0.01;

/// Mutable layout state for one graph view.
#[derive(Debug, Clone)]
pub struct ForceDirectedLayout {
    tunables: LayoutTunables,
    ids: Vec<NodeId>,
    slot_of: HashMap<NodeId, usize>,
    positions: Vec<Vec2>,
    velocities: Vec<Vec2>,
    pinned: HashSet<NodeId>,
    adjacency: Option<Vec<(usize, usize)>>,
    temperature: f32,
    stable: bool,
}

impl ForceDirectedLayout {
    /// Creates a layout for every node of `index`, placed seeded-randomly
    /// inside a square sized to the node count.
    #[must_use]
    pub fn new(index: &HypergraphIndex, tunables: LayoutTunables, seed: u64) -> Self {
        let mut rng = SmallRng::seed_from_u64(seed);
        let ids: Vec<NodeId> = index.node_ids().collect();
        let extent = ((ids.len().max(1) as f32).sqrt() * tunables.spring_length).max(1.0);
        let positions = ids
            .iter()
            .map(|_| {
                Vec2::new(
                    rng.gen_range(-extent..=extent),
                    rng.gen_range(-extent..=extent),
                )
            })
            .collect();
        let slot_of = ids
            .iter()
            .enumerate()
            .map(|(slot, &id)| (id, slot))
            .collect();
        let velocities = vec![Vec2::ZERO; ids.len()];

        Self {
            tunables,
            ids,
            slot_of,
            positions,
            velocities,
            pinned: HashSet::new(),
            adjacency: None,
            temperature: 1.0,
            stable: false,
        }
    }

    /// Returns the current position of `id`.
    #[must_use]
    pub fn position(&self, id: NodeId) -> Option<Vec2> {
        self.slot_of.get(&id).map(|&slot| self.positions[slot])
    }

    /// Returns the current velocity of `id`.
    #[must_use]
    pub fn velocity(&self, id: NodeId) -> Option<Vec2> {
        self.slot_of.get(&id).map(|&slot| self.velocities[slot])
    }

    /// Returns whether the simulation has settled.
    #[must_use]
    pub fn is_stable(&self) -> bool {
        self.stable
    }

    /// Returns the current annealing temperature.
    #[must_use]
    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    /// Returns the number of laid-out nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns whether the layout holds no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Advances the simulation by one step.
    ///
    /// Returns the mean kinetic energy of the step; a settled layout
    /// early-outs and reports zero.
    pub fn step(&mut self, index: &HypergraphIndex) -> f32 {
        if self.stable || self.ids.is_empty() {
            return 0.0;
        }

        let adjacency = self.adjacency_from(index);
        let tree = QuadTree::build(&self.positions, BOUNDS_PADDING);
        let mut forces = vec![Vec2::ZERO; self.ids.len()];

        for (slot, &id) in self.ids.iter().enumerate() {
            if self.pinned.contains(&id) {
                continue;
            }
            forces[slot] = tree.repulsion(
                slot,
                self.positions[slot],
                self.tunables.barnes_hut_theta,
                self.tunables.repulsion_strength,
            );
        }

        for &(left, right) in &adjacency {
            let delta = self.positions[right].sub(self.positions[left]);
            let distance = delta.length();
            if distance < 1e-6 {
                continue;
            }
            let magnitude =
                self.tunables.spring_strength * (distance - self.tunables.spring_length);
            let pull = delta.scale(magnitude / distance);
            forces[left] = forces[left].add(pull);
            forces[right] = forces[right].sub(pull);
        }
        self.adjacency = Some(adjacency);

        let mut kinetic = 0.0f32;
        for (slot, &id) in self.ids.iter().enumerate() {
            if self.pinned.contains(&id) {
                continue;
            }
            let mut velocity = self.velocities[slot]
                .add(forces[slot].scale(self.temperature))
                .scale(self.tunables.damping);
            let speed = velocity.length();
            if speed > self.tunables.max_velocity {
                velocity = velocity.scale(self.tunables.max_velocity / speed);
            }
            self.velocities[slot] = velocity;
            self.positions[slot] = self.positions[slot].add(velocity);
            kinetic += 0.5 * velocity.length() * velocity.length();
        }

        let mean_kinetic = kinetic / self.ids.len() as f32;
        self.temperature *= self.tunables.cooling_factor;
        if mean_kinetic < self.tunables.stability_threshold
            && self.temperature < SETTLED_TEMPERATURE
        {
            self.stable = true;
            debug!(nodes = self.ids.len(), "layout settled");
        }
        mean_kinetic
    }

    fn adjacency_from(&mut self, index: &HypergraphIndex) -> Vec<(usize, usize)> {
        if let Some(adjacency) = self.adjacency.take() {
            return adjacency;
        }
        let mut seen: HashSet<(usize, usize)> = HashSet::new();
        let mut adjacency = Vec::new();
        for edge in index.edge_ids() {
            let targets = index.nodes_by_role(edge, Role::Target);
            for source in index.nodes_by_role(edge, Role::Source) {
                for &target in &targets {
                    let (Some(&s), Some(&t)) =
                        (self.slot_of.get(&source), self.slot_of.get(&target))
                    else {
                        continue;
                    };
                    if s == t {
                        continue;
                    }
                    let key = (s.min(t), s.max(t));
                    if seen.insert(key) {
                        adjacency.push(key);
                    }
                }
            }
        }
        adjacency
    }

    /// Pins `id` at `position`, zeroing its velocity.
    pub fn pin(&mut self, id: NodeId, position: Vec2) {
        if let Some(&slot) = self.slot_of.get(&id) {
            self.positions[slot] = position;
            self.velocities[slot] = Vec2::ZERO;
            self.pinned.insert(id);
        }
    }

    /// Moves a pinned node; unpinned nodes are left to the simulation.
    pub fn move_pinned(&mut self, id: NodeId, position: Vec2) {
        if !self.pinned.contains(&id) {
            return;
        }
        if let Some(&slot) = self.slot_of.get(&id) {
            self.positions[slot] = position;
        }
    }

    /// Releases a pinned node and re-enables cooling from at least
    /// [`REHEAT_TEMPERATURE`].
    pub fn unpin(&mut self, id: NodeId) {
        if self.pinned.remove(&id) {
            self.temperature = self.temperature.max(REHEAT_TEMPERATURE);
            self.stable = false;
        }
    }

    /// Adds nodes on a circle around `near` and invalidates the adjacency
    /// cache.
    pub fn add_nodes(&mut self, ids: &[NodeId], near: Vec2, radius: f32) {
        let count = ids.len().max(1) as f32;
        for (i, &id) in ids.iter().enumerate() {
            if self.slot_of.contains_key(&id) {
                continue;
            }
            let angle = std::f32::consts::TAU * i as f32 / count;
            let position = near.add(Vec2::new(angle.cos(), angle.sin()).scale(radius));
            let slot = self.ids.len();
            self.ids.push(id);
            self.slot_of.insert(id, slot);
            self.positions.push(position);
            self.velocities.push(Vec2::ZERO);
        }
        self.adjacency = None;
        self.stable = false;
    }

    /// Translates the whole graph so its bounding box centres on a canvas.
    ///
    /// Velocities are untouched.
    pub fn center_graph(&mut self, canvas_width: f32, canvas_height: f32) {
        if self.positions.is_empty() {
            return;
        }
        let mut min = Vec2::new(f32::INFINITY, f32::INFINITY);
        let mut max = Vec2::new(f32::NEG_INFINITY, f32::NEG_INFINITY);
        for position in &self.positions {
            min.x = min.x.min(position.x);
            min.y = min.y.min(position.y);
            max.x = max.x.max(position.x);
            max.y = max.y.max(position.y);
        }
        let bbox_centre = Vec2::new((min.x + max.x) / 2.0, (min.y + max.y) / 2.0);
        let canvas_centre = Vec2::new(canvas_width / 2.0, canvas_height / 2.0);
        let shift = canvas_centre.sub(bbox_centre);
        for position in &mut self.positions {
            *position = position.add(shift);
        }
    }
}
