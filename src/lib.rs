//! DLA Field - diffusion-limited aggregation engine
//!
//! Free particles random-walk through an elliptical field; when one drifts
//! close enough to an open binding port on the growing structure it snaps
//! onto that port and becomes part of the structure for good.
//!
//! Core modules:
//! - `vector`: 2D double-precision vector math
//! - `sim`: Deterministic engine (particles, binding registry, field, admission, tick)
//! - `config`: Serializable engine and run configuration
//! - `error`: Error taxonomy
//! - `wasm`: Bindings for the browser rendering host (wasm32 only)

pub mod config;
pub mod error;
pub mod sim;
pub mod vector;

#[cfg(target_arch = "wasm32")]
pub mod wasm;

pub use config::{FieldConfig, Preset, SimConfig};
pub use error::{FieldError, Result};
pub use sim::{
    AdmissionScheduler, BindingConfig, BoundParticle, Field, FreeParticle, Registry, RunPhase,
    Simulation, TickInput, TickReport, tick,
};
pub use vector::Vector2;

/// Engine tunables and defaults
pub mod consts {
    /// Distance between a bound particle and its ports (field units)
    pub const LATTICE_SPACING: f64 = 5.0;
    /// Maximum distance from a free particle to an open port for capture.
    /// Equal to the lattice spacing: a free particle anywhere inside a bound
    /// particle's port ring always has a port within reach.
    pub const CAPTURE_RADIUS: f64 = LATTICE_SPACING;
    /// Relative slack on the capture test so sites exactly on the radius bind
    pub const CAPTURE_TOLERANCE: f64 = 1e-7;
    /// A port site closer than this to an existing bound particle is occupied
    pub const EXCLUSION_RADIUS: f64 = LATTICE_SPACING * 0.5;

    /// Position damping (fraction of velocity applied per second of dt)
    pub const POSITION_FACTOR: f64 = 0.75;
    /// How strongly each velocity update steers the current heading
    pub const VELOCITY_FACTOR: f64 = 0.8;
    /// Free particle speed (field units per second)
    pub const PARTICLE_SPEED: f64 = 60.0;
    /// Strength of the radial pull toward the field centre
    pub const CENTER_PULL: f64 = 1.0;
    /// Bound count at which the centre pull reaches its full growth bonus
    pub const PULL_SATURATION: usize = 5000;

    /// Largest position sub-step (seconds)
    pub const MAX_SUBSTEP_DT: f64 = 1.0 / 60.0;
    /// Maximum substeps per tick; longer frames are truncated
    pub const MAX_SUBSTEPS: u32 = 4;
    /// Ticks shorter than this update velocities with probability dt / MIN_VELOCITY_DT
    pub const MIN_VELOCITY_DT: f64 = 1.0 / 60.0;

    /// Seed used when the run configuration does not name one
    pub const DEFAULT_SEED: u64 = 0x00D1_A5EE_D000_0001;
    /// Largest binding configuration id the registry accepts
    pub const MAX_CONFIG_ID: u32 = 255;
}

/// Wrap an angle in degrees to [0, 360)
#[inline]
pub fn normalize_degrees(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(360.0);
    // rem_euclid rounds tiny negative inputs up to exactly 360
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

/// Convert polar (r, degrees) to cartesian (x, y)
#[inline]
pub fn polar_to_cartesian(r: f64, degrees: f64) -> Vector2 {
    Vector2::from_angle(degrees.to_radians()) * r
}

/// Heading of a vector in degrees, [0, 360)
#[inline]
pub fn heading_degrees(v: Vector2) -> f64 {
    normalize_degrees(v.y.atan2(v.x).to_degrees())
}
