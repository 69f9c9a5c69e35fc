//! The field engine
//!
//! Owns the free and bound collections and runs the three pipeline stages:
//! attachment resolution, position integration and velocity integration.
//! The field never caps insertion; callers check particle budgets first.

use std::f64::consts::TAU;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::binding::{BindingConfig, Registry};
use super::grid::SiteGrid;
use super::particle::{BoundParticle, FreeParticle};
use crate::config::FieldConfig;
use crate::consts::{CAPTURE_TOLERANCE, DEFAULT_SEED};
use crate::vector::{self, Vector2};

/// Best open port found for a position
#[derive(Debug, Clone, Copy, PartialEq)]
struct Candidate {
    bound: usize,
    port: usize,
    site: Vector2,
    dist_sq: f64,
}

impl Candidate {
    /// Closer wins; exact ties go to the lowest (bound, port) pair
    fn beats(&self, other: &Candidate) -> bool {
        self.dist_sq < other.dist_sq
            || (self.dist_sq == other.dist_sq && (self.bound, self.port) < (other.bound, other.port))
    }
}

/// Outcome of a direct seed placement check
enum Placement {
    /// An open port is in range; snap onto it
    Port(Candidate),
    /// Bound particles are in range but none has an open port there
    SitesBusy,
    /// Nothing bound in range; a free-standing seed is fine
    Clear,
}

/// Aggregation field centred at the origin
#[derive(Debug, Clone)]
pub struct Field {
    free: Vec<FreeParticle>,
    bound: Vec<BoundParticle>,
    half_extent: Vector2,
    config: FieldConfig,
    registry: Registry,
    grid: SiteGrid,
    rng: Pcg32,
}

impl Field {
    /// Field with default tunables, the default registry and `DEFAULT_SEED`
    pub fn new(half_width: f64, half_height: f64) -> Self {
        Self::with_config(
            half_width,
            half_height,
            FieldConfig::default(),
            Registry::default(),
            DEFAULT_SEED,
        )
    }

    pub fn with_config(
        half_width: f64,
        half_height: f64,
        config: FieldConfig,
        registry: Registry,
        seed: u64,
    ) -> Self {
        // A capture can only reach ports whose owner is within capture + reach
        let cell_size = config.capture_radius + registry.max_reach();
        Self {
            free: Vec::new(),
            bound: Vec::new(),
            half_extent: Vector2::new(half_width, half_height),
            config,
            registry,
            grid: SiteGrid::new(cell_size),
            rng: Pcg32::seed_from_u64(seed),
        }
    }

    pub fn half_width(&self) -> f64 {
        self.half_extent.x
    }

    pub fn half_height(&self) -> f64 {
        self.half_extent.y
    }

    pub fn config(&self) -> &FieldConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub(crate) fn rng(&mut self) -> &mut Pcg32 {
        &mut self.rng
    }

    // === Admission primitives ===

    /// Add a free particle at a uniformly random point inside the field ellipse
    pub fn add_particle(&mut self) {
        // sqrt keeps the density uniform over the disc before stretching
        let r = self.rng.random::<f64>().sqrt();
        let theta = self.rng.random_range(0.0..TAU);
        let pos = Vector2::from_angle(theta) * r * self.half_extent;
        let vel = random_heading(&mut self.rng) * self.config.particle_speed;
        self.free.push(FreeParticle::new(pos, vel, 0.0));
    }

    /// Add a free particle on the field boundary, heading toward the centre
    pub fn add_boundary_particle(&mut self, since: f64) {
        let theta = self.rng.random_range(0.0..TAU);
        let pos = Vector2::from_angle(theta) * self.half_extent;
        let inward = vector::normalize(-pos);
        let heading = if inward == Vector2::ZERO {
            random_heading(&mut self.rng)
        } else {
            inward
        };
        self.free.push(FreeParticle::new(
            pos,
            heading * self.config.particle_speed,
            since,
        ));
    }

    /// Add a caller-built free particle as-is (flags included)
    pub fn push_free(&mut self, particle: FreeParticle) {
        self.free.push(particle);
    }

    /// Try to place a bound particle directly (user-drawn seeds)
    ///
    /// If an open port is within capture range the seed snaps onto it. If
    /// bound particles are within capture range but offer no open port the
    /// request is rejected. Otherwise a free-standing seed is created at `pos`.
    pub fn try_add_bound_particle(&mut self, pos: Vector2) -> bool {
        match self.placement(pos) {
            Placement::Port(candidate) => {
                self.bind(candidate, Vector2::ZERO);
                true
            }
            Placement::SitesBusy => {
                log::warn!(
                    "seed at ({:.2}, {:.2}) rejected: nearby binding sites are busy",
                    pos.x,
                    pos.y
                );
                false
            }
            Placement::Clear => {
                self.push_bound(BoundParticle::seed(pos, self.config.default_config_id));
                true
            }
        }
    }

    // === Pipeline stages ===

    /// Bind every free particle that is within capture range of an open port
    ///
    /// Free particles are visited once each, in order. A claim takes effect
    /// immediately, so later particles in the same pass see the updated
    /// masks (and may bind to particles attached earlier in the pass).
    /// Returns the number of attachments.
    pub fn update_attachments(&mut self) -> usize {
        let mut captured: Vec<usize> = Vec::new();
        for index in 0..self.free.len() {
            let particle = self.free[index];
            if let Some(candidate) = self.nearest_open_port(particle.pos) {
                self.bind(candidate, particle.vel);
                captured.push(index);
            }
        }

        if !captured.is_empty() {
            // captured is ascending; retain keeps survivors in order
            let mut index = 0;
            self.free.retain(|_| {
                let keep = captured.binary_search(&index).is_err();
                index += 1;
                keep
            });
            log::trace!("{} particles attached", captured.len());
        }
        captured.len()
    }

    /// Move free particles along their velocities
    ///
    /// `dt` is clamped to the frame cap; `tick` splits long frames into
    /// substeps and resolves attachments between them.
    pub fn update_positions(&mut self, dt: f64) {
        if !dt.is_finite() {
            return;
        }
        let step = self.config.position_factor * dt.clamp(0.0, self.config.max_frame_dt());
        for particle in &mut self.free {
            particle.pos += particle.vel * step;
        }
    }

    /// Perturb free particle headings
    ///
    /// Each particle gets an isotropic random kick combined with a radial
    /// pull toward the origin, steered into its current heading by
    /// `velocity_factor`; speed is then reset to `particle_speed`. Ticks
    /// shorter than `min_velocity_dt` update with probability
    /// `dt / min_velocity_dt` so the walk statistics do not depend on frame rate.
    pub fn update_velocities(&mut self, dt: f64) {
        if !dt.is_finite() || dt <= 0.0 {
            return;
        }
        let min_dt = self.config.min_velocity_dt;
        if dt < min_dt && self.rng.random::<f64>() >= dt / min_dt {
            return;
        }

        let Self {
            free,
            bound,
            half_extent,
            config,
            rng,
            ..
        } = self;
        let extent = half_extent.max(Vector2::splat(f64::EPSILON));
        let fill = bound.len() as f64 / config.pull_saturation.max(1) as f64;

        for particle in free.iter_mut() {
            let kick = random_heading(rng);

            // Pull grows as particles near the centre and as the structure fills
            let attractor = -(particle.pos / extent);
            let force = config.center_pull
                * (0.2 / (0.2 + attractor.length().max(1.0)) + 0.5 * fill.min(1.0));
            let steer = vector::normalize(attractor * force + kick);

            let heading = vector::normalize(particle.vel + steer * config.velocity_factor);
            let heading = if heading == Vector2::ZERO { kick } else { heading };
            particle.vel = heading * config.particle_speed;
        }
    }

    /// Drop free particles older than `max_age` at time `now`
    pub fn remove_expired(&mut self, now: f64, max_age: f64) -> usize {
        let before = self.free.len();
        self.free.retain(|p| p.age(now) <= max_age);
        before - self.free.len()
    }

    // === Read access ===

    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    pub fn bound_count(&self) -> usize {
        self.bound.len()
    }

    pub fn free_particles(&self) -> &[FreeParticle] {
        &self.free
    }

    pub fn bound_particles(&self) -> &[BoundParticle] {
        &self.bound
    }

    /// Free particles as flat f64 records of `FreeParticle::STRIDE`
    /// (`pos.x, pos.y, vel.x, vel.y, since, flags bits`)
    pub fn free_view(&self) -> &[f64] {
        bytemuck::cast_slice(&self.free)
    }

    /// Bound particles as flat f64 records of `BoundParticle::STRIDE`
    /// (`pos.x, pos.y, rot, binding word bits`)
    pub fn bound_view(&self) -> &[f64] {
        bytemuck::cast_slice(&self.bound)
    }

    // === Internals ===

    /// Configuration of a bound particle
    ///
    /// An unknown id means the field produced a particle it cannot describe:
    /// a bug. Debug builds stop here; release builds log it and treat the
    /// particle as having no ports.
    fn binding_of(&self, particle: &BoundParticle) -> Option<&BindingConfig> {
        match self.registry.get(particle.binding.config_id) {
            Ok(config) => Some(config),
            Err(err) => {
                if cfg!(debug_assertions) {
                    panic!("internal inconsistency: {err}");
                }
                log::error!("internal inconsistency: {err}; particle has no ports");
                None
            }
        }
    }

    /// True if some bound particle already sits on (or next to) `site`
    fn site_occupied(&self, site: Vector2) -> bool {
        let r_sq = self.config.exclusion_radius * self.config.exclusion_radius;
        self.grid
            .near(site, self.config.exclusion_radius)
            .any(|i| self.bound[i].pos.distance_squared(site) < r_sq)
    }

    /// Globally closest open port within capture range of `pos`
    fn nearest_open_port(&self, pos: Vector2) -> Option<Candidate> {
        let capture = self.config.capture_radius;
        let capture_sq = capture * capture * (1.0 + CAPTURE_TOLERANCE);
        let search = capture + self.registry.max_reach();

        let mut best: Option<Candidate> = None;
        for bound_index in self.grid.near(pos, search) {
            let owner = &self.bound[bound_index];
            let Some(config) = self.binding_of(owner) else {
                continue;
            };
            if owner.binding.busy_ports() >= config.max_binds() {
                continue;
            }
            for (port, site) in config.world_ports(owner.pos, owner.rot) {
                if !owner.binding.is_port_free(port) {
                    continue;
                }
                let dist_sq = pos.distance_squared(site);
                if dist_sq.is_nan() || dist_sq > capture_sq {
                    continue;
                }
                let candidate = Candidate {
                    bound: bound_index,
                    port,
                    site,
                    dist_sq,
                };
                if best.is_some_and(|b| !candidate.beats(&b)) {
                    continue;
                }
                if !self.site_occupied(site) {
                    best = Some(candidate);
                }
            }
        }
        best
    }

    fn placement(&self, pos: Vector2) -> Placement {
        if let Some(candidate) = self.nearest_open_port(pos) {
            return Placement::Port(candidate);
        }
        let capture_sq = self.config.capture_radius * self.config.capture_radius;
        let crowded = self
            .grid
            .near(pos, self.config.capture_radius)
            .any(|i| self.bound[i].pos.distance_squared(pos) <= capture_sq);
        if crowded {
            Placement::SitesBusy
        } else {
            Placement::Clear
        }
    }

    /// Claim the candidate's port and append the new bound particle on its site
    fn bind(&mut self, candidate: Candidate, heading: Vector2) {
        let parent = self.bound[candidate.bound];
        let rot = match self.registry.get(parent.binding.config_id) {
            Ok(config) => config.child_rotation(candidate.port, parent.rot, heading),
            Err(_) => parent.rot,
        };
        let claimed = self.bound[candidate.bound].binding.claim(candidate.port);
        debug_assert!(claimed, "port {} claimed twice", candidate.port);

        self.push_bound(BoundParticle::new(
            candidate.site,
            rot,
            parent.binding.config_id,
        ));
    }

    fn push_bound(&mut self, particle: BoundParticle) {
        self.grid.insert(self.bound.len(), particle.pos);
        self.bound.push(particle);
    }
}

/// Uniformly random unit vector
fn random_heading(rng: &mut Pcg32) -> Vector2 {
    Vector2::from_angle(rng.random_range(0.0..TAU))
}
