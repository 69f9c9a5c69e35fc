//! Browser bindings
//!
//! The rendering host owns one `FieldHandle`, calls `tick` once per frame,
//! and reads particle records straight out of wasm memory through the
//! pointer/count/stride accessors.

use wasm_bindgen::prelude::*;

use crate::config::{Preset, SimConfig};
use crate::consts::DEFAULT_SEED;
use crate::error::Result;
use crate::sim::{BoundParticle, FreeParticle, RunPhase, Simulation, TickInput, TickReport, tick};
use crate::vector::Vector2;

#[wasm_bindgen(start)]
pub fn wasm_main() {
    console_error_panic_hook::set_once();
    if console_log::init_with_level(log::Level::Info).is_err() {
        // A logger is already installed
        return;
    }
    log::info!("DLA field ready");
}

/// Seed from the browser's entropy source
fn entropy_seed() -> u64 {
    let mut bytes = [0u8; 8];
    match getrandom::fill(&mut bytes) {
        Ok(()) => u64::from_le_bytes(bytes),
        Err(err) => {
            log::warn!("no entropy available ({err}), using default seed");
            DEFAULT_SEED
        }
    }
}

fn build(mut config: SimConfig) -> Result<Simulation> {
    if config.seed.is_none() {
        config.seed = Some(entropy_seed());
    }
    Simulation::new(config)
}

/// One simulation owned by the host
#[wasm_bindgen]
pub struct FieldHandle {
    sim: Simulation,
    pending: TickInput,
    last: TickReport,
}

impl FieldHandle {
    fn wrap(sim: Simulation) -> Self {
        Self {
            sim,
            pending: TickInput::default(),
            last: TickReport::default(),
        }
    }
}

#[wasm_bindgen]
impl FieldHandle {
    /// Medium preset over a field of the given half extents
    #[wasm_bindgen(constructor)]
    pub fn new(half_width: f64, half_height: f64) -> std::result::Result<FieldHandle, JsError> {
        let config = SimConfig {
            half_width,
            half_height,
            ..SimConfig::default()
        };
        Ok(Self::wrap(build(config)?))
    }

    /// Build from a JSON `SimConfig` (missing keys take defaults)
    pub fn from_config(json: &str) -> std::result::Result<FieldHandle, JsError> {
        Ok(Self::wrap(build(SimConfig::from_json(json)?)?))
    }

    /// Build from a preset name ("small", "medium", "large")
    pub fn from_preset(name: &str) -> std::result::Result<FieldHandle, JsError> {
        let preset = Preset::from_str(name)
            .ok_or_else(|| JsError::new(&format!("unknown preset: {name}")))?;
        Ok(Self::wrap(build(SimConfig::from_preset(preset))?))
    }

    pub fn config_json(&self) -> std::result::Result<String, JsError> {
        Ok(self.sim.config().to_json()?)
    }

    // === Run control ===

    pub fn start(&mut self) {
        self.sim.start();
    }

    pub fn pause(&mut self) {
        self.sim.pause();
    }

    pub fn resume(&mut self) {
        self.sim.resume();
    }

    pub fn reset(&mut self) {
        self.pending = TickInput::default();
        self.last = TickReport::default();
        self.sim.reset();
    }

    pub fn is_paused(&self) -> bool {
        self.sim.phase() == RunPhase::Paused
    }

    pub fn is_running(&self) -> bool {
        self.sim.is_running()
    }

    /// Queue a user-drawn seed for the next tick
    pub fn queue_seed(&mut self, x: f64, y: f64) {
        self.pending.seeds.push(Vector2::new(x, y));
    }

    pub fn scatter_seeds(&mut self) -> usize {
        self.sim.scatter_seeds()
    }

    /// Advance one frame; returns the number of attachments
    pub fn tick(&mut self, dt: f64) -> usize {
        let input = std::mem::take(&mut self.pending);
        self.last = tick(&mut self.sim, &input, dt);
        self.last.attached
    }

    pub fn last_admitted(&self) -> usize {
        self.last.admitted
    }

    pub fn last_expired(&self) -> usize {
        self.last.expired
    }

    pub fn last_substeps(&self) -> u32 {
        self.last.substeps
    }

    // === Engine primitives, for hosts that drive the stages themselves ===

    pub fn add_particle(&mut self) {
        self.sim.field_mut().add_particle();
    }

    pub fn add_boundary_particle(&mut self, since: f64) {
        self.sim.field_mut().add_boundary_particle(since);
    }

    pub fn try_add_bound_particle(&mut self, x: f64, y: f64) -> bool {
        self.sim.field_mut().try_add_bound_particle(Vector2::new(x, y))
    }

    pub fn update_attachments(&mut self) -> usize {
        self.sim.field_mut().update_attachments()
    }

    pub fn update_positions(&mut self, dt: f64) {
        self.sim.field_mut().update_positions(dt);
    }

    pub fn update_velocities(&mut self, dt: f64) {
        self.sim.field_mut().update_velocities(dt);
    }

    // === Render views ===

    pub fn free_count(&self) -> usize {
        self.sim.field().free_count()
    }

    pub fn bound_count(&self) -> usize {
        self.sim.field().bound_count()
    }

    /// f64 slots per free particle record
    pub fn free_stride() -> usize {
        FreeParticle::STRIDE
    }

    /// f64 slots per bound particle record
    pub fn bound_stride() -> usize {
        BoundParticle::STRIDE
    }

    /// Start of the free records; valid until the next mutating call
    pub fn free_ptr(&self) -> *const f64 {
        self.sim.field().free_view().as_ptr()
    }

    /// Start of the bound records; valid until the next mutating call
    pub fn bound_ptr(&self) -> *const f64 {
        self.sim.field().bound_view().as_ptr()
    }

    /// Copy of the free records, for hosts that do not map wasm memory
    pub fn free_records(&self) -> js_sys::Float64Array {
        js_sys::Float64Array::from(self.sim.field().free_view())
    }

    pub fn bound_records(&self) -> js_sys::Float64Array {
        js_sys::Float64Array::from(self.sim.field().bound_view())
    }

    pub fn half_width(&self) -> f64 {
        self.sim.field().half_width()
    }

    pub fn half_height(&self) -> f64 {
        self.sim.field().half_height()
    }

    /// Unused fraction of the particle budget (drives the border fade)
    pub fn fill_level(&self) -> f64 {
        self.sim.fill_level()
    }

    pub fn simulation_time(&self) -> f64 {
        self.sim.simulation_time()
    }
}

/// The module's linear memory, for building typed-array views over the records
#[wasm_bindgen]
pub fn memory() -> JsValue {
    wasm_bindgen::memory()
}
