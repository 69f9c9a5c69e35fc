//! Deterministic simulation module
//!
//! All engine logic lives here. This module must be pure and deterministic:
//! - Seeded RNG only, owned by the field
//! - Stable iteration order (insertion order of both particle collections)
//! - No rendering or platform dependencies

pub mod admission;
pub mod binding;
pub mod field;
pub mod grid;
pub mod particle;
pub mod state;
pub mod tick;

pub use admission::AdmissionScheduler;
pub use binding::{Alignment, BindingConfig, Port, Registry};
pub use field::Field;
pub use particle::{BindingState, BoundParticle, FreeParticle};
pub use state::{RunPhase, SEED_SAFE_RADIUS_SQ, Simulation};
pub use tick::{TickInput, TickReport, tick};
