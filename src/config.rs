//! Engine and run configuration
//!
//! Passed in by the host as JSON (or built in code from a preset).

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::{FieldError, Result};

/// Run size presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Preset {
    Small,
    #[default]
    Medium,
    Large,
}

impl Preset {
    pub fn as_str(&self) -> &'static str {
        match self {
            Preset::Small => "Small",
            Preset::Medium => "Medium",
            Preset::Large => "Large",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "small" => Some(Preset::Small),
            "medium" | "med" => Some(Preset::Medium),
            "large" => Some(Preset::Large),
            _ => None,
        }
    }

    /// Cap on free + bound particles
    pub fn max_particles(&self) -> usize {
        match self {
            Preset::Small => 1500,
            Preset::Medium => 3000,
            Preset::Large => 6000,
        }
    }

    /// Free particles seeded when a run starts
    pub fn start_particles(&self) -> usize {
        match self {
            Preset::Small => 300,
            Preset::Medium => 600,
            Preset::Large => 1000,
        }
    }

    /// Baseline admissions per second
    pub fn base_spawn_rate(&self) -> f64 {
        match self {
            Preset::Small => 4.0,
            Preset::Medium => 8.0,
            Preset::Large => 12.0,
        }
    }
}

/// Engine tunables (see `crate::consts` for the defaults)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldConfig {
    /// Maximum free-particle to open-port distance for capture
    pub capture_radius: f64,
    /// Port sites closer than this to a bound particle count as occupied
    pub exclusion_radius: f64,
    pub position_factor: f64,
    pub velocity_factor: f64,
    /// Free particle speed (field units per second)
    pub particle_speed: f64,
    /// Radial pull toward the origin (0 disables)
    pub center_pull: f64,
    /// Bound count at which the pull's growth bonus saturates
    pub pull_saturation: usize,
    pub max_substep_dt: f64,
    pub max_substeps: u32,
    pub min_velocity_dt: f64,
    /// Binding configuration given to free-standing seeds
    pub default_config_id: u32,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            capture_radius: CAPTURE_RADIUS,
            exclusion_radius: EXCLUSION_RADIUS,
            position_factor: POSITION_FACTOR,
            velocity_factor: VELOCITY_FACTOR,
            particle_speed: PARTICLE_SPEED,
            center_pull: CENTER_PULL,
            pull_saturation: PULL_SATURATION,
            max_substep_dt: MAX_SUBSTEP_DT,
            max_substeps: MAX_SUBSTEPS,
            min_velocity_dt: MIN_VELOCITY_DT,
            default_config_id: 0,
        }
    }
}

impl FieldConfig {
    /// Longest frame a single tick will integrate
    pub fn max_frame_dt(&self) -> f64 {
        self.max_substep_dt * self.max_substeps as f64
    }

    /// Split a frame into (substep count, substep length)
    ///
    /// Frames longer than `max_frame_dt` are truncated, so a stalled host
    /// never produces a huge jump.
    pub fn substeps(&self, dt: f64) -> (u32, f64) {
        // NaN slips through clamp
        let dt = if dt.is_finite() { dt.clamp(0.0, self.max_frame_dt()) } else { 0.0 };
        let count = ((dt / self.max_substep_dt).ceil() as u32).clamp(1, self.max_substeps.max(1));
        (count, dt / count as f64)
    }

    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("capture_radius", self.capture_radius),
            ("max_substep_dt", self.max_substep_dt),
            ("min_velocity_dt", self.min_velocity_dt),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(FieldError::InvalidConfig(format!(
                    "{name} must be finite and > 0, got {value}"
                )));
            }
        }
        let non_negative = [
            ("exclusion_radius", self.exclusion_radius),
            ("position_factor", self.position_factor),
            ("velocity_factor", self.velocity_factor),
            ("particle_speed", self.particle_speed),
            ("center_pull", self.center_pull),
        ];
        for (name, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(FieldError::InvalidConfig(format!(
                    "{name} must be finite and >= 0, got {value}"
                )));
            }
        }
        if self.exclusion_radius >= self.capture_radius {
            return Err(FieldError::InvalidConfig(
                "exclusion_radius must be smaller than capture_radius".into(),
            ));
        }
        if self.max_substeps == 0 {
            return Err(FieldError::InvalidConfig("max_substeps must be >= 1".into()));
        }
        Ok(())
    }
}

/// Run configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Half extent of the field along x (centered at the origin)
    pub half_width: f64,
    /// Half extent of the field along y
    pub half_height: f64,
    /// Cap on free + bound particles, enforced by the admission step
    pub max_particles: usize,
    pub start_particles: usize,
    /// Admissions per second on top of the measured growth rate
    pub base_spawn_rate: f64,
    /// RNG seed; `None` uses `DEFAULT_SEED` (the wasm host draws one from entropy)
    pub seed: Option<u64>,
    /// Free particles older than this (seconds) are dropped; `None` keeps them forever
    pub max_free_age: Option<f64>,
    pub field: FieldConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self::from_preset(Preset::default())
    }
}

impl SimConfig {
    pub fn from_preset(preset: Preset) -> Self {
        Self {
            half_width: 128.0,
            half_height: 128.0,
            max_particles: preset.max_particles(),
            start_particles: preset.start_particles(),
            base_spawn_rate: preset.base_spawn_rate(),
            seed: None,
            max_free_age: None,
            field: FieldConfig {
                pull_saturation: preset.max_particles(),
                ..FieldConfig::default()
            },
        }
    }

    /// Apply a preset's particle budget, keeping geometry and tunables
    pub fn apply_preset(&mut self, preset: Preset) {
        self.max_particles = preset.max_particles();
        self.start_particles = preset.start_particles();
        self.base_spawn_rate = preset.base_spawn_rate();
        self.field.pull_saturation = preset.max_particles();
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [("half_width", self.half_width), ("half_height", self.half_height)] {
            if !(value.is_finite() && value > 0.0) {
                return Err(FieldError::InvalidConfig(format!(
                    "{name} must be finite and > 0, got {value}"
                )));
            }
        }
        if !(self.base_spawn_rate.is_finite() && self.base_spawn_rate >= 0.0) {
            return Err(FieldError::InvalidConfig(format!(
                "base_spawn_rate must be finite and >= 0, got {}",
                self.base_spawn_rate
            )));
        }
        if self.start_particles > self.max_particles {
            return Err(FieldError::InvalidConfig(format!(
                "start_particles ({}) exceeds max_particles ({})",
                self.start_particles, self.max_particles
            )));
        }
        if let Some(age) = self.max_free_age {
            if !(age.is_finite() && age > 0.0) {
                return Err(FieldError::InvalidConfig(format!(
                    "max_free_age must be finite and > 0, got {age}"
                )));
            }
        }
        self.field.validate()
    }
}
