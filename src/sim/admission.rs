//! Admission scheduler
//!
//! Decides once per tick whether a new free particle enters at the field
//! boundary. Arrivals follow a Poisson process whose rate tracks how fast
//! the structure has been consuming particles, plus a constant baseline.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::field::Field;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdmissionScheduler {
    /// Admissions per second on top of the measured growth rate
    pub base_spawn_rate: f64,
    simulation_time: f64,
    initial_bound_count: usize,
}

impl AdmissionScheduler {
    pub fn new(base_spawn_rate: f64, initial_bound_count: usize) -> Self {
        Self {
            base_spawn_rate,
            simulation_time: 0.0,
            initial_bound_count,
        }
    }

    /// Restart the clock and take a new growth baseline
    pub fn reset(&mut self, bound_count: usize) {
        self.simulation_time = 0.0;
        self.initial_bound_count = bound_count;
    }

    pub fn advance(&mut self, dt: f64) {
        if dt > 0.0 {
            self.simulation_time += dt;
        }
    }

    pub fn simulation_time(&self) -> f64 {
        self.simulation_time
    }

    pub fn initial_bound_count(&self) -> usize {
        self.initial_bound_count
    }

    /// Bound particles gained per second since the baseline
    pub fn growth_rate(&self, bound_count: usize) -> f64 {
        if self.simulation_time <= 0.0 {
            return 0.0;
        }
        bound_count.saturating_sub(self.initial_bound_count) as f64 / self.simulation_time
    }

    pub fn target_rate(&self, bound_count: usize) -> f64 {
        self.growth_rate(bound_count) + self.base_spawn_rate
    }

    /// Probability of at least one arrival within `dt`
    pub fn arrival_probability(&self, bound_count: usize, dt: f64) -> f64 {
        if dt <= 0.0 {
            return 0.0;
        }
        1.0 - (-self.target_rate(bound_count) * dt).exp()
    }

    /// Draw one uniform sample and compare it against the no-arrival probability
    pub fn should_admit<R: Rng + ?Sized>(&self, rng: &mut R, bound_count: usize, dt: f64) -> bool {
        let no_arrival = (-self.target_rate(bound_count) * dt.max(0.0)).exp();
        rng.random::<f64>() > no_arrival
    }

    /// Possibly admit one boundary particle into `field`
    ///
    /// The particle budget is the caller's concern; this never checks it.
    pub fn try_admit(&self, field: &mut Field, dt: f64) -> bool {
        let bound = field.bound_count();
        if !self.should_admit(field.rng(), bound, dt) {
            return false;
        }
        field.add_boundary_particle(self.simulation_time);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn test_growth_rate_zero_before_time_passes() {
        let scheduler = AdmissionScheduler::new(3.0, 1);
        assert_eq!(scheduler.growth_rate(50), 0.0);
        assert_eq!(scheduler.target_rate(50), 3.0);
    }

    #[test]
    fn test_growth_rate_tracks_consumption() {
        let mut scheduler = AdmissionScheduler::new(2.0, 10);
        scheduler.advance(4.0);
        assert_eq!(scheduler.growth_rate(30), 5.0);
        assert_eq!(scheduler.target_rate(30), 7.0);
        // Negative dt never rewinds the clock
        scheduler.advance(-1.0);
        assert_eq!(scheduler.simulation_time(), 4.0);

        scheduler.reset(30);
        assert_eq!(scheduler.simulation_time(), 0.0);
        assert_eq!(scheduler.initial_bound_count(), 30);
        assert_eq!(scheduler.growth_rate(30), 0.0);
    }

    #[test]
    fn test_zero_rate_never_admits() {
        let scheduler = AdmissionScheduler::new(0.0, 0);
        let mut rng = Pcg32::seed_from_u64(1);
        assert!((0..10_000).all(|_| !scheduler.should_admit(&mut rng, 0, 1.0 / 60.0)));
        assert_eq!(scheduler.arrival_probability(0, 1.0), 0.0);
    }

    #[test]
    fn test_arrival_probability() {
        let scheduler = AdmissionScheduler::new(2.0, 0);
        let p = scheduler.arrival_probability(0, 0.5);
        assert!((p - (1.0 - (-1.0f64).exp())).abs() < 1e-12);
        assert_eq!(scheduler.arrival_probability(0, 0.0), 0.0);
    }

    #[test]
    fn test_admission_rate_converges_to_base_rate() {
        let rate = 2.0;
        let dt = 1.0 / 60.0;
        let ticks = 100_000;
        let mut scheduler = AdmissionScheduler::new(rate, 0);
        let mut rng = Pcg32::seed_from_u64(42);
        let mut admitted = 0usize;
        for _ in 0..ticks {
            scheduler.advance(dt);
            if scheduler.should_admit(&mut rng, 0, dt) {
                admitted += 1;
            }
        }
        // Per-tick probability is 1 - exp(-r dt), slightly under r dt
        let expected = ticks as f64 * scheduler.arrival_probability(0, dt);
        let observed = admitted as f64;
        assert!(
            (observed - expected).abs() < expected * 0.1,
            "admitted {admitted}, expected {expected:.0}"
        );
        let empirical_rate = observed / scheduler.simulation_time();
        assert!((empirical_rate - rate).abs() < rate * 0.1, "rate {empirical_rate}");
    }

    #[test]
    fn test_try_admit_places_boundary_particle() {
        let mut field = Field::new(100.0, 50.0);
        let mut scheduler = AdmissionScheduler::new(1e9, 0);
        scheduler.advance(2.5);
        assert!(scheduler.try_admit(&mut field, 1.0 / 60.0));
        assert_eq!(field.free_count(), 1);
        let p = field.free_particles()[0];
        assert_eq!(p.since, 2.5);
        let e = (p.pos.x / 100.0).powi(2) + (p.pos.y / 50.0).powi(2);
        assert!((e - 1.0).abs() < 1e-9);
    }
}
