use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::errors::{Error, Result};

const DEFAULT_FAILURE_THRESHOLD: u32 = 5;
const DEFAULT_RECOVERY_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

/// A three-state circuit protecting one endpoint. While closed, connect
/// attempts pass. After `failure_threshold` consecutive failures the
/// circuit opens and attempts short-circuit until `recovery_timeout` has
/// passed, when a single probe is let through (half-open). The probe's
/// outcome either closes or re-opens the circuit.
#[derive(Debug)]
pub struct CircuitBreaker {
    state: BreakerState,
    failure_count: u32,
    failure_threshold: u32,
    recovery_timeout: Duration,
    last_failure: Option<Instant>,
    last_success: Option<Instant>,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        CircuitBreaker::new(DEFAULT_FAILURE_THRESHOLD, DEFAULT_RECOVERY_TIMEOUT)
    }
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, recovery_timeout: Duration) -> Self {
        CircuitBreaker {
            state: BreakerState::Closed,
            failure_count: 0,
            failure_threshold,
            recovery_timeout,
            last_failure: None,
            last_success: None,
        }
    }

    pub fn state(&self) -> BreakerState {
        self.state
    }

    pub fn failure_count(&self) -> u32 {
        self.failure_count
    }

    /// Whether a request may go out right now. Moving from Open to
    /// HalfOpen happens here, when the recovery window has elapsed.
    pub fn allow(&mut self) -> bool {
        match self.state {
            BreakerState::Closed | BreakerState::HalfOpen => true,
            BreakerState::Open => {
                let elapsed = self
                    .last_failure
                    .map(|at| at.elapsed() >= self.recovery_timeout)
                    .unwrap_or(true);
                if elapsed {
                    debug!("recovery timeout elapsed, letting a probe through");
                    self.state = BreakerState::HalfOpen;
                }
                elapsed
            }
        }
    }

    pub fn record_success(&mut self) {
        self.state = BreakerState::Closed;
        self.failure_count = 0;
        self.last_success = Some(Instant::now());
    }

    pub fn record_failure(&mut self) {
        self.failure_count += 1;
        self.last_failure = Some(Instant::now());
        match self.state {
            // a failed probe re-opens immediately
            BreakerState::HalfOpen => self.state = BreakerState::Open,
            BreakerState::Closed if self.failure_count >= self.failure_threshold => {
                warn!(
                    "opening circuit after {} consecutive failures",
                    self.failure_count
                );
                self.state = BreakerState::Open;
            }
            _ => {}
        }
    }
}

/// One circuit per logical endpoint, shared by everything that dials it.
#[derive(Debug, Default)]
pub struct CircuitRegistry {
    circuits: Mutex<HashMap<String, CircuitBreaker>>,
}

impl CircuitRegistry {
    pub fn new() -> Self {
        CircuitRegistry::default()
    }

    /// Gate for an outbound attempt; `CircuitOpen` when blocked.
    pub fn check(&self, endpoint: &str) -> Result<()> {
        let mut circuits = self.circuits.lock().unwrap();
        let circuit = circuits.entry(endpoint.to_owned()).or_default();
        if circuit.allow() {
            Ok(())
        } else {
            Err(Error::CircuitOpen(endpoint.to_owned()))
        }
    }

    pub fn record_success(&self, endpoint: &str) {
        let mut circuits = self.circuits.lock().unwrap();
        circuits.entry(endpoint.to_owned()).or_default().record_success();
    }

    /// Records a failure if the error is one the breaker counts
    /// (transient connection-level trouble, not e.g. bad credentials).
    pub fn record_error(&self, endpoint: &str, error: &Error) {
        if !error.is_transient() {
            return;
        }
        let mut circuits = self.circuits.lock().unwrap();
        circuits.entry(endpoint.to_owned()).or_default().record_failure();
    }

    pub fn state(&self, endpoint: &str) -> Option<BreakerState> {
        let circuits = self.circuits.lock().unwrap();
        circuits.get(endpoint).map(|c| c.state())
    }
}
