//! Circuit breaker around event publication.
//!
//! The guard never lets a publish failure escape as anything but a value the
//! caller logs. While the breaker is open, publishes are rejected without
//! touching the bus.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::ports::PublishError;

pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BreakerConfig {
    /// Fraction of failed calls in the window that opens the circuit.
    pub failure_rate_threshold: f64,
    /// Calls required in the window before the rate is evaluated.
    pub minimum_calls: usize,
    /// Number of most recent outcomes considered.
    pub window_size: usize,
    /// Time spent open before trial calls are let through.
    pub reset_timeout: Duration,
    /// Successful trial calls needed to close again.
    pub half_open_max_calls: u32,
    /// Upper bound on a single guarded call.
    pub call_timeout: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_rate_threshold: 0.5,
            minimum_calls: 5,
            window_size: 20,
            reset_timeout: Duration::from_secs(30),
            half_open_max_calls: 1,
            call_timeout: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

/// Permission for one call, tied to the breaker state it was granted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Permit {
    generation: u64,
}

#[derive(Debug)]
enum Inner {
    Closed { outcomes: VecDeque<bool> },
    Open { opened_at: Instant },
    HalfOpen { in_flight: u32, successes: u32 },
}

pub struct CircuitBreaker {
    config: BreakerConfig,
    clock: Arc<dyn Clock>,
    inner: Mutex<State>,
}

#[derive(Debug)]
struct State {
    inner: Inner,
    generation: u64,
}

impl State {
    fn transition(&mut self, next: Inner) {
        self.inner = next;
        self.generation += 1;
    }
}

impl CircuitBreaker {
    pub fn new(config: BreakerConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            inner: Mutex::new(State {
                inner: Inner::Closed {
                    outcomes: VecDeque::new(),
                },
                generation: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn state(&self) -> CircuitState {
        match &self.lock().inner {
            Inner::Closed { .. } => CircuitState::Closed,
            Inner::Open { .. } => CircuitState::Open,
            Inner::HalfOpen { .. } => CircuitState::HalfOpen,
        }
    }

    /// Asks permission for one call. Every granted permit must be followed by
    /// exactly one `record`.
    pub fn try_acquire(&self) -> Option<Permit> {
        let mut state = self.lock();
        match &mut state.inner {
            Inner::Closed { .. } => {}
            Inner::Open { opened_at } => {
                if self.clock.now().duration_since(*opened_at) < self.config.reset_timeout {
                    return None;
                }
                tracing::info!("Publish circuit half-open, allowing trial call");
                state.transition(Inner::HalfOpen {
                    in_flight: 1,
                    successes: 0,
                });
            }
            Inner::HalfOpen { in_flight, successes } => {
                if *in_flight + *successes >= self.config.half_open_max_calls.max(1) {
                    return None;
                }
                *in_flight += 1;
            }
        }
        Some(Permit {
            generation: state.generation,
        })
    }

    /// Records the outcome of a permitted call. Outcomes of calls permitted
    /// before the last state change are ignored.
    pub fn record(&self, permit: Permit, success: bool) {
        let now = self.clock.now();
        let mut state = self.lock();
        if permit.generation != state.generation {
            return;
        }
        let next = match &mut state.inner {
            Inner::Closed { outcomes } => {
                outcomes.push_back(success);
                while outcomes.len() > self.config.window_size.max(1) {
                    outcomes.pop_front();
                }
                if outcomes.len() >= self.config.minimum_calls.max(1) {
                    let failures = outcomes.iter().filter(|ok| !**ok).count();
                    let rate = failures as f64 / outcomes.len() as f64;
                    if rate >= self.config.failure_rate_threshold {
                        tracing::warn!(
                            failure_rate = rate,
                            calls = outcomes.len(),
                            "Publish circuit opened"
                        );
                        Some(Inner::Open { opened_at: now })
                    } else {
                        None
                    }
                } else {
                    None
                }
            }
            Inner::Open { .. } => None,
            Inner::HalfOpen { in_flight, successes } => {
                *in_flight = in_flight.saturating_sub(1);
                if !success {
                    tracing::warn!("Publish trial call failed, circuit re-opened");
                    Some(Inner::Open { opened_at: now })
                } else {
                    *successes += 1;
                    if *successes >= self.config.half_open_max_calls.max(1) {
                        tracing::info!("Publish circuit closed");
                        Some(Inner::Closed {
                            outcomes: VecDeque::new(),
                        })
                    } else {
                        None
                    }
                }
            }
        };
        if let Some(next) = next {
            state.transition(next);
        }
    }
}

/// Guard applied to every event publication.
#[derive(Clone)]
pub struct PublishGuard {
    breaker: Arc<CircuitBreaker>,
    call_timeout: Duration,
}

impl PublishGuard {
    pub fn new(config: BreakerConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: BreakerConfig, clock: Arc<dyn Clock>) -> Self {
        let call_timeout = config.call_timeout;
        Self {
            breaker: Arc::new(CircuitBreaker::new(config, clock)),
            call_timeout,
        }
    }

    pub fn state(&self) -> CircuitState {
        self.breaker.state()
    }

    /// Runs `operation` under the breaker.
    ///
    /// The operation executes on its own task with its own timeout, so it
    /// completes (and its outcome is recorded) even if the caller is dropped.
    pub async fn guard<F, Fut>(&self, operation: F) -> Result<(), PublishError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), PublishError>> + Send + 'static,
    {
        let Some(permit) = self.breaker.try_acquire() else {
            return Err(PublishError::CircuitOpen);
        };

        let breaker = self.breaker.clone();
        let call_timeout = self.call_timeout;
        let call = operation();
        let handle = tokio::spawn(async move {
            let outcome = match tokio::time::timeout(call_timeout, call).await {
                Ok(outcome) => outcome,
                Err(_) => Err(PublishError::Timeout(call_timeout)),
            };
            breaker.record(permit, outcome.is_ok());
            outcome
        });

        match handle.await {
            Ok(outcome) => outcome,
            Err(join_error) => {
                self.breaker.record(permit, false);
                Err(PublishError::Aborted(join_error.to_string()))
            }
        }
    }
}
