//! Per-frame simulation tick
//!
//! Runs the engine pipeline once per host frame: attachments and position
//! integration per substep, velocities once, then expiry and admission.

use super::state::{RunPhase, Simulation};
use crate::vector::Vector2;

/// Host input collected since the previous tick
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// User-drawn seed positions (field units)
    pub seeds: Vec<Vector2>,
    /// Pause a running simulation
    pub pause: bool,
    /// Resume a paused simulation
    pub resume: bool,
}

/// What a tick did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Free particles that became bound
    pub attached: usize,
    /// Boundary particles admitted
    pub admitted: usize,
    /// Free particles dropped for age
    pub expired: usize,
    /// Position substeps run (0 when the tick did not advance)
    pub substeps: u32,
}

/// Advance the simulation by one host frame of `dt` seconds
pub fn tick(sim: &mut Simulation, input: &TickInput, dt: f64) -> TickReport {
    let mut report = TickReport::default();

    for &pos in &input.seeds {
        if let Err(err) = sim.add_seed(pos) {
            log::warn!("seed dropped: {err}");
            break;
        }
    }
    if input.pause {
        sim.pause();
    }
    if input.resume {
        sim.resume();
    }

    if sim.phase != RunPhase::Running {
        return report;
    }

    let (substeps, h) = sim.config.field.substeps(dt);
    for _ in 0..substeps {
        report.attached += sim.field.update_attachments();
        sim.field.update_positions(h);
    }
    report.substeps = substeps;

    // Velocities change once per frame however many substeps ran
    let frame_dt = h * substeps as f64;
    sim.field.update_velocities(frame_dt);
    sim.scheduler.advance(frame_dt);

    if let Some(max_age) = sim.config.max_free_age {
        report.expired = sim
            .field
            .remove_expired(sim.scheduler.simulation_time(), max_age);
    }

    if sim.particle_count() < sim.config.max_particles
        && sim.scheduler.try_admit(&mut sim.field, frame_dt)
    {
        report.admitted = 1;
    }

    sim.ticks += 1;
    if report.attached > 0 || report.expired > 0 {
        log::debug!(
            "tick {}: {} attached, {} admitted, {} expired ({} free, {} bound)",
            sim.ticks,
            report.attached,
            report.admitted,
            report.expired,
            sim.field.free_count(),
            sim.field.bound_count()
        );
    }
    report
}
