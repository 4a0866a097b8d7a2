//! Probe/recovery strategies.
//!
//! The supervisor asks a strategy two questions per service per tick:
//! did the heartbeat fail, and did the restart attempt succeed. The
//! default strategy rolls dice; tests swap in [`FixedProbe`] to force a
//! branch of the transition table.

use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use uptime_state::Service;

/// Default chance that a running service misses a heartbeat.
pub const DEFAULT_FAILURE_PROBABILITY: f64 = 0.05;

/// Default chance that a restart attempt brings a service back.
pub const DEFAULT_RECOVERY_PROBABILITY: f64 = 0.7;

/// Pluggable health-check and restart decisions.
pub trait ProbeStrategy: Send + Sync {
    /// Whether the heartbeat for a `Running` service failed this tick.
    fn heartbeat_fails(&self, service: &Service) -> bool;

    /// Whether the restart attempt for a `Restarting` service succeeded.
    fn restart_succeeds(&self, service: &Service) -> bool;
}

/// Fixed-probability simulation of probes and restarts.
#[derive(Debug)]
pub struct SimulatedProbe {
    failure_probability: f64,
    recovery_probability: f64,
    rng: Mutex<StdRng>,
}

impl SimulatedProbe {
    /// Build a simulation with explicit probabilities, clamped to `[0, 1]`.
    pub fn new(failure_probability: f64, recovery_probability: f64) -> Self {
        Self::with_rng(
            failure_probability,
            recovery_probability,
            StdRng::seed_from_u64(rand::random()),
        )
    }

    /// Reproducible simulation for a given seed.
    pub fn seeded(failure_probability: f64, recovery_probability: f64, seed: u64) -> Self {
        Self::with_rng(
            failure_probability,
            recovery_probability,
            StdRng::seed_from_u64(seed),
        )
    }

    fn with_rng(failure_probability: f64, recovery_probability: f64, rng: StdRng) -> Self {
        Self {
            failure_probability: clamp_probability(failure_probability),
            recovery_probability: clamp_probability(recovery_probability),
            rng: Mutex::new(rng),
        }
    }

    pub fn failure_probability(&self) -> f64 {
        self.failure_probability
    }

    pub fn recovery_probability(&self) -> f64 {
        self.recovery_probability
    }

    fn roll(&self, p: f64) -> bool {
        let mut rng = match self.rng.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        rng.random_bool(p)
    }
}

impl Default for SimulatedProbe {
    fn default() -> Self {
        Self::new(DEFAULT_FAILURE_PROBABILITY, DEFAULT_RECOVERY_PROBABILITY)
    }
}

impl ProbeStrategy for SimulatedProbe {
    fn heartbeat_fails(&self, _service: &Service) -> bool {
        self.roll(self.failure_probability)
    }

    fn restart_succeeds(&self, _service: &Service) -> bool {
        self.roll(self.recovery_probability)
    }
}

/// Deterministic strategy returning the same answers every time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedProbe {
    pub heartbeat_fails: bool,
    pub restart_succeeds: bool,
}

impl FixedProbe {
    /// Heartbeats pass and restarts succeed.
    pub fn healthy() -> Self {
        Self {
            heartbeat_fails: false,
            restart_succeeds: true,
        }
    }

    /// Heartbeats fail and restarts fail.
    pub fn broken() -> Self {
        Self {
            heartbeat_fails: true,
            restart_succeeds: false,
        }
    }
}

impl ProbeStrategy for FixedProbe {
    fn heartbeat_fails(&self, _service: &Service) -> bool {
        self.heartbeat_fails
    }

    fn restart_succeeds(&self, _service: &Service) -> bool {
        self.restart_succeeds
    }
}

fn clamp_probability(p: f64) -> f64 {
    if p.is_nan() { 0.0 } else { p.clamp(0.0, 1.0) }
}
