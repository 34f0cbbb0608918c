//! Barnes–Hut quadtree over node positions.
//!
//! Each leaf holds one occupant; inserting into an occupied leaf subdivides
//! it and re-inserts the occupant into the child quadrant containing its
//! position. Every quad tracks its centre of mass as the running mean of
//! inserted positions and its total mass as the insertion count — masses
//! are node counts, not node weights.

use super::Vec2;

/// Quads smaller than this stop subdividing; coincident points simply
/// accumulate mass.
const MIN_HALF: f32 = 1e-4;

#[derive(Debug, Clone)]
struct Quad {
    centre: Vec2,
    half: f32,
    mass: f32,
    centre_of_mass: Vec2,
    occupant: Option<(usize, Vec2)>,
    children: Option<[usize; 4]>,
}

impl Quad {
    fn new(centre: Vec2, half: f32) -> Self {
        Self {
            centre,
            half,
            mass: 0.0,
            centre_of_mass: Vec2::ZERO,
            occupant: None,
            children: None,
        }
    }

    fn quadrant(&self, position: Vec2) -> usize {
        let east = usize::from(position.x >= self.centre.x);
        let south = usize::from(position.y >= self.centre.y);
        south * 2 + east
    }
}

/// A quadtree rebuilt from scratch for every simulation step.
#[derive(Debug, Clone)]
pub(super) struct QuadTree {
    quads: Vec<Quad>,
}

impl QuadTree {
    /// Builds a tree covering `positions` with the given bounding padding.
    pub(super) fn build(positions: &[Vec2], padding: f32) -> Self {
        let mut min = Vec2::new(f32::INFINITY, f32::INFINITY);
        let mut max = Vec2::new(f32::NEG_INFINITY, f32::NEG_INFINITY);
        for position in positions {
            min.x = min.x.min(position.x);
            min.y = min.y.min(position.y);
            max.x = max.x.max(position.x);
            max.y = max.y.max(position.y);
        }
        if positions.is_empty() {
            min = Vec2::ZERO;
            max = Vec2::ZERO;
        }

        let centre = Vec2::new((min.x + max.x) / 2.0, (min.y + max.y) / 2.0);
        let half = ((max.x - min.x).max(max.y - min.y) / 2.0 + padding).max(padding);
        let mut tree = Self {
            quads: vec![Quad::new(centre, half)],
        };
        for (slot, &position) in positions.iter().enumerate() {
            tree.insert(0, slot, position);
        }
        tree
    }

    fn insert(&mut self, quad: usize, slot: usize, position: Vec2) {
        // Running mean keeps the centre of mass exact without a second pass.
        let mass = self.quads[quad].mass + 1.0;
        let com = self.quads[quad].centre_of_mass;
        self.quads[quad].centre_of_mass = Vec2::new(
            com.x + (position.x - com.x) / mass,
            com.y + (position.y - com.y) / mass,
        );
        self.quads[quad].mass = mass;

        if self.quads[quad].children.is_some() {
            let child = self.child_for(quad, position);
            self.insert(child, slot, position);
            return;
        }

        let occupant = self.quads[quad].occupant;
        match occupant {
            None => {
                self.quads[quad].occupant = Some((slot, position));
            }
            Some((resident_slot, resident_position)) => {
                if self.quads[quad].half <= MIN_HALF {
                    // Coincident points: stop subdividing, keep the first
                    // occupant and let the aggregate mass speak for the rest.
                    return;
                }
                self.subdivide(quad);
                self.quads[quad].occupant = None;
                let resident_child = self.child_for(quad, resident_position);
                self.insert_without_mass(resident_child, resident_slot, resident_position);
                let child = self.child_for(quad, position);
                self.insert(child, slot, position);
            }
        }
    }

    /// Re-inserts a displaced occupant into a child without re-counting its
    /// mass at the parent (it was already counted on first insertion).
    fn insert_without_mass(&mut self, quad: usize, slot: usize, position: Vec2) {
        let mass = self.quads[quad].mass + 1.0;
        let com = self.quads[quad].centre_of_mass;
        self.quads[quad].centre_of_mass = Vec2::new(
            com.x + (position.x - com.x) / mass,
            com.y + (position.y - com.y) / mass,
        );
        self.quads[quad].mass = mass;

        if self.quads[quad].children.is_some() {
            let child = self.child_for(quad, position);
            self.insert_without_mass(child, slot, position);
            return;
        }
        if self.quads[quad].occupant.is_none() {
            self.quads[quad].occupant = Some((slot, position));
        }
    }

    fn subdivide(&mut self, quad: usize) {
        let centre = self.quads[quad].centre;
        let half = self.quads[quad].half / 2.0;
        let mut children = [0usize; 4];
        for (i, child) in children.iter_mut().enumerate() {
            let dx = if i % 2 == 0 { -half } else { half };
            let dy = if i < 2 { -half } else { half };
            *child = self.quads.len();
            self.quads
                .push(Quad::new(Vec2::new(centre.x + dx, centre.y + dy), half));
        }
        self.quads[quad].children = Some(children);
    }

    fn child_for(&self, quad: usize, position: Vec2) -> usize {
        let quadrant = self.quads[quad].quadrant(position);
        self.quads[quad]
            .children
            .expect("child_for is only called on subdivided quads")[quadrant]
    }

    /// Accumulates the Barnes–Hut repulsion force on `slot` at `position`.
    ///
    /// A quad is treated as a point mass when it is a leaf or when
    /// `size / distance < theta`; otherwise its children are visited. The
    /// leaf holding the queried node itself contributes nothing.
    pub(super) fn repulsion(
        &self,
        slot: usize,
        position: Vec2,
        theta: f32,
        strength: f32,
    ) -> Vec2 {
        let mut force = Vec2::ZERO;
        let mut stack = vec![0usize];
        while let Some(quad_index) = stack.pop() {
            let quad = &self.quads[quad_index];
            if quad.mass == 0.0 {
                continue;
            }
            if let Some((occupant, _)) = quad.occupant
                && occupant == slot
                && quad.children.is_none()
                && quad.mass <= 1.0
            {
                continue;
            }

            let delta = position.sub(quad.centre_of_mass);
            let distance = delta.length();
            if distance < 1e-3 {
                // No defined direction; springs will separate coincident nodes.
                continue;
            }
            let size = quad.half * 2.0;
            if quad.children.is_none() || size / distance < theta {
                let magnitude = strength * quad.mass / (distance * distance);
                force = force.add(delta.scale(magnitude / distance));
            } else if let Some(children) = quad.children {
                stack.extend(children);
            }
        }
        force
    }
}
