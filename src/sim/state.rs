//! Run state
//!
//! `Simulation` is what a host owns: one field, its admission scheduler,
//! the run configuration and the run phase. Everything is explicit; there
//! is no global instance.

use std::f64::consts::TAU;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::admission::AdmissionScheduler;
use super::binding::Registry;
use super::field::Field;
use crate::config::SimConfig;
use crate::consts::DEFAULT_SEED;
use crate::error::{FieldError, Result};
use crate::vector::Vector2;

/// User seeds must land inside this fraction (squared, normalized) of the field
pub const SEED_SAFE_RADIUS_SQ: f64 = 0.85;

/// Current phase of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RunPhase {
    /// Field created, not started (seeds may be drawn)
    #[default]
    Idle,
    /// Ticks advance the simulation
    Running,
    /// Ticks are no-ops until resumed
    Paused,
}

#[derive(Debug, Clone)]
pub struct Simulation {
    pub(crate) config: SimConfig,
    pub(crate) field: Field,
    pub(crate) scheduler: AdmissionScheduler,
    pub(crate) phase: RunPhase,
    /// Seed the field RNG was built from; `reset` reuses it
    seed: u64,
    /// Ticks that advanced the run
    pub(crate) ticks: u64,
}

impl Simulation {
    /// New idle simulation with the default binding registry
    pub fn new(config: SimConfig) -> Result<Self> {
        Self::with_registry(config, Registry::default())
    }

    pub fn with_registry(config: SimConfig, registry: Registry) -> Result<Self> {
        config.validate()?;
        if !registry.contains(config.field.default_config_id) {
            return Err(FieldError::UnknownConfiguration {
                config_id: config.field.default_config_id,
            });
        }
        let seed = config.seed.unwrap_or(DEFAULT_SEED);
        let field = Field::with_config(
            config.half_width,
            config.half_height,
            config.field.clone(),
            registry,
            seed,
        );
        let scheduler = AdmissionScheduler::new(config.base_spawn_rate, 0);
        Ok(Self {
            config,
            field,
            scheduler,
            phase: RunPhase::Idle,
            seed,
            ticks: 0,
        })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn field(&self) -> &Field {
        &self.field
    }

    /// Direct access to the engine primitives (the host may drive stages itself)
    pub fn field_mut(&mut self) -> &mut Field {
        &mut self.field
    }

    pub fn scheduler(&self) -> &AdmissionScheduler {
        &self.scheduler
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase == RunPhase::Running
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn simulation_time(&self) -> f64 {
        self.scheduler.simulation_time()
    }

    /// Free plus bound particles
    pub fn particle_count(&self) -> usize {
        self.field.free_count() + self.field.bound_count()
    }

    /// Begin a run
    ///
    /// Fills the field with up to `start_particles` free particles, plants a
    /// centre seed if nothing is bound yet, and takes the admission baseline.
    /// Only an idle simulation starts; a paused one must be resumed.
    pub fn start(&mut self) {
        if self.phase != RunPhase::Idle {
            return;
        }
        let room = self.config.max_particles.saturating_sub(self.particle_count());
        let count = self.config.start_particles.min(room);
        for _ in 0..count {
            self.field.add_particle();
        }
        if self.field.bound_count() == 0 && self.ensure_capacity(1).is_ok() {
            self.field.try_add_bound_particle(Vector2::ZERO);
        }
        self.scheduler.reset(self.field.bound_count());
        self.phase = RunPhase::Running;
        log::info!(
            "Run started: {} free, {} bound, seed {:#x}",
            self.field.free_count(),
            self.field.bound_count(),
            self.seed
        );
    }

    pub fn pause(&mut self) {
        if self.phase == RunPhase::Running {
            self.phase = RunPhase::Paused;
            log::info!("Run paused at t={:.2}s", self.simulation_time());
        }
    }

    pub fn resume(&mut self) {
        if self.phase == RunPhase::Paused {
            self.phase = RunPhase::Running;
            log::info!("Run resumed");
        }
    }

    /// Discard the field and return to `Idle` (same seed, same registry)
    pub fn reset(&mut self) {
        self.field = Field::with_config(
            self.config.half_width,
            self.config.half_height,
            self.config.field.clone(),
            self.field.registry().clone(),
            self.seed,
        );
        self.scheduler.reset(0);
        self.phase = RunPhase::Idle;
        self.ticks = 0;
        log::info!("Run reset");
    }

    /// Check that `extra` more particles fit under `max_particles`
    pub fn ensure_capacity(&self, extra: usize) -> Result<()> {
        let requested = self.particle_count() + extra;
        if requested > self.config.max_particles {
            return Err(FieldError::CapacityExceeded {
                requested,
                max: self.config.max_particles,
            });
        }
        Ok(())
    }

    /// Place a user-drawn seed
    ///
    /// Returns `Ok(false)` if the point is too close to the field edge or the
    /// field rejects it; `CapacityExceeded` if the particle budget is spent.
    pub fn add_seed(&mut self, pos: Vector2) -> Result<bool> {
        self.ensure_capacity(1)?;
        let extent = Vector2::new(self.config.half_width, self.config.half_height);
        if (pos / extent).length_squared() >= SEED_SAFE_RADIUS_SQ {
            log::debug!("seed at ({:.2}, {:.2}) too close to the edge", pos.x, pos.y);
            return Ok(false);
        }
        Ok(self.field.try_add_bound_particle(pos))
    }

    /// Scatter a random group of seeds with 3 to 6-fold rotational symmetry
    ///
    /// Returns how many seeds were placed; overlapping ones are dropped by
    /// the field's placement rules.
    pub fn scatter_seeds(&mut self) -> usize {
        let rng = self.field.rng();
        let mirrors: u32 = rng.random_range(3..=6);
        let spread = 6.0 - mirrors as f64 / 2.0;
        let rings = 1 + mirrors / 2 + (rng.random::<f64>() * spread) as u32;
        let scale = self.config.half_width.min(self.config.half_height);

        let mut groups = Vec::with_capacity(rings as usize);
        for i in 0..rings {
            let theta = rng.random_range(0.0..TAU);
            let r = (0.2 + rng.random::<f64>()) * ((i + 1) as f64 * 0.5 / rings as f64) * scale;
            groups.push((theta, r));
        }

        let mut placed = 0;
        'groups: for (theta, r) in groups {
            for m in 0..mirrors {
                let angle = theta + m as f64 * TAU / mirrors as f64;
                let pos = Vector2::new(angle.sin(), angle.cos()) * r;
                match self.add_seed(pos) {
                    Ok(true) => placed += 1,
                    Ok(false) => {}
                    Err(_) => break 'groups,
                }
            }
        }
        log::debug!("Scattered {placed} seeds ({mirrors}-fold, {rings} rings)");
        placed
    }

    /// Unused fraction of the particle budget, in [0, 1]
    pub fn fill_level(&self) -> f64 {
        let max = self.config.max_particles;
        if max == 0 {
            return 0.0;
        }
        (max.saturating_sub(self.particle_count()) as f64 / max as f64).clamp(0.0, 1.0)
    }
}
