//! Circuit breaker for backend protection.
//!
//! # States
//! - Closed: normal operation, calls pass through and are counted
//! - Open: backend assumed down, calls fail fast with the fallback payload
//! - Half-Open: testing if backend recovered, exactly one probe call allowed
//!
//! # State Transitions
//! ```text
//! Closed → Open: error rate >= threshold over the rolling window (minimum calls met)
//! Open → Half-Open: first call after the reset timeout
//! Half-Open → Closed: probe succeeds (window cleared)
//! Half-Open → Open: probe fails or times out (reset timeout restarts)
//! any → Closed: force_close (window cleared)
//! ```
//!
//! # Design Decisions
//! - Per-backend circuit breaker (not global)
//! - One mutex around "read state → decide → mutate"; the upstream call runs
//!   outside it on a spawned task
//! - Accounting happens in that task, so a caller that goes away never loses
//!   its counter update
//! - Probes carry the generation they were admitted in; a stale probe cannot
//!   close or reopen a later cycle
//! - Events are sent after the mutex is released

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::http::StatusCode;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::time::Instant;

use crate::error::GatewayError;
use crate::resilience::events::{BreakerEvent, EventSender};
use crate::resilience::window::{CallKind, RollingWindow, WindowStats};
use crate::upstream::{ServiceName, UpstreamFailure, UpstreamResponse, UpstreamResult};

/// Represents the state of the circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Breaker tuning, fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakerConfig {
    /// Deadline for a single upstream call.
    pub call_timeout: Duration,
    /// Error rate (failures + timeouts, in percent) that opens the circuit.
    pub error_threshold_percentage: u8,
    /// Length of the rolling statistics window.
    pub rolling_window: Duration,
    /// Number of buckets the window is split into.
    pub rolling_buckets: usize,
    /// How long the circuit stays open before a probe is allowed.
    pub reset_timeout: Duration,
    /// Executed calls required in the window before the error rate is evaluated.
    pub minimum_calls: u64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_millis(3000),
            error_threshold_percentage: 50,
            rolling_window: Duration::from_millis(60_000),
            rolling_buckets: 10,
            reset_timeout: Duration::from_millis(10_000),
            minimum_calls: 10,
        }
    }
}

/// Point-in-time view of a breaker, for status reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BreakerSnapshot {
    pub state: CircuitState,
    pub stats: WindowStats,
}

/// Result of one guarded call.
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome {
    Success(UpstreamResponse),
    Failure(UpstreamResponse),
    Timeout,
    /// Short-circuited; carries the fallback payload.
    Rejected(Value),
}

impl CallOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CallOutcome::Success(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            CallOutcome::Success(_) => "success",
            CallOutcome::Failure(_) => "failure",
            CallOutcome::Timeout => "timeout",
            CallOutcome::Rejected(_) => "rejected",
        }
    }

    /// Split into the success payload or the error the router should surface.
    pub fn into_result(self, service: ServiceName) -> Result<UpstreamResponse, GatewayError> {
        match self {
            CallOutcome::Success(response) => Ok(response),
            CallOutcome::Failure(response) => Err(GatewayError::UpstreamFailure {
                status: response.status,
                body: response.body,
            }),
            CallOutcome::Timeout => Err(GatewayError::UpstreamTimeout(service)),
            CallOutcome::Rejected(fallback) => Err(GatewayError::CircuitOpen { service, fallback }),
        }
    }

    fn kind(&self) -> CallKind {
        match self {
            CallOutcome::Success(_) => CallKind::Success,
            CallOutcome::Failure(_) => CallKind::Failure,
            CallOutcome::Timeout => CallKind::Timeout,
            CallOutcome::Rejected(_) => CallKind::Rejection,
        }
    }
}

type Fallback = Arc<dyn Fn() -> Value + Send + Sync>;

struct Core {
    state: CircuitState,
    /// Last transition into `Open`.
    opened_at: Instant,
    /// Bumped on every transition.
    generation: u64,
    probe_in_flight: bool,
    window: RollingWindow,
}

/// A circuit breaker guarding calls to one backend.
pub struct CircuitBreaker {
    service: ServiceName,
    config: BreakerConfig,
    core: Mutex<Core>,
    fallback: Fallback,
    events: EventSender,
}

impl fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("service", &self.service)
            .field("config", &self.config)
            .field("state", &self.state())
            .finish()
    }
}

impl CircuitBreaker {
    /// Create a closed breaker with empty counters.
    pub fn new(service: ServiceName, config: BreakerConfig, events: EventSender) -> Self {
        let now = Instant::now();
        let window = RollingWindow::new(config.rolling_window, config.rolling_buckets, now);
        Self {
            service,
            config,
            core: Mutex::new(Core {
                state: CircuitState::Closed,
                opened_at: now,
                generation: 0,
                probe_in_flight: false,
                window,
            }),
            fallback: Arc::new(move || default_fallback(service)),
            events,
        }
    }

    /// Replace the fallback supplier. It runs synchronously and must not do I/O.
    pub fn with_fallback<F>(mut self, fallback: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.fallback = Arc::new(fallback);
        self
    }

    pub fn service(&self) -> ServiceName {
        self.service
    }

    pub fn config(&self) -> &BreakerConfig {
        &self.config
    }

    /// Run `operation` through the breaker.
    ///
    /// The operation is only invoked when the breaker admits the call. Its
    /// future runs on a spawned task under the configured call timeout, and
    /// the outcome is recorded there, so dropping the returned future does
    /// not lose the update.
    pub async fn execute<F, Fut>(self: &Arc<Self>, operation: F) -> CallOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = UpstreamResult> + Send + 'static,
    {
        let permit = match self.try_acquire() {
            Some(permit) => permit,
            None => return self.reject(),
        };

        let call = operation();
        let timeout = self.config.call_timeout;
        let task = tokio::spawn(async move {
            let outcome = match tokio::time::timeout(timeout, call).await {
                Ok(Ok(response)) => CallOutcome::Success(response),
                Ok(Err(UpstreamFailure::Status(response))) => CallOutcome::Failure(response),
                Ok(Err(UpstreamFailure::Timeout)) | Err(_) => CallOutcome::Timeout,
            };
            permit.complete(&outcome);
            outcome
        });

        match task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                // The permit recorded a failure when the task unwound.
                tracing::error!(service = %self.service, error = %e, "Upstream call task failed");
                CallOutcome::Failure(UpstreamResponse::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "success": false, "error": "Internal gateway error" }),
                ))
            }
        }
    }

    /// Administrative override: close the circuit and zero the counters.
    pub fn force_close(&self) -> CircuitState {
        let mut events = Vec::new();
        {
            let mut core = self.lock();
            self.transition(&mut core, CircuitState::Closed, Instant::now(), &mut events);
            core.probe_in_flight = false;
            core.window.clear();
        }
        tracing::info!(service = %self.service, "Circuit breaker force-closed");
        self.emit(events);
        CircuitState::Closed
    }

    /// Current state and window totals. Never changes state.
    pub fn snapshot(&self) -> BreakerSnapshot {
        let core = self.lock();
        BreakerSnapshot {
            state: core.state,
            stats: core.window.totals(Instant::now()),
        }
    }

    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    fn lock(&self) -> MutexGuard<'_, Core> {
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Decide whether a call may proceed. Returns `None` when it is rejected.
    fn try_acquire(self: &Arc<Self>) -> Option<CallPermit> {
        let mut events = Vec::new();
        let admitted = {
            let mut core = self.lock();
            let now = Instant::now();
            match core.state {
                CircuitState::Closed => Some(None),
                CircuitState::Open
                    if now.saturating_duration_since(core.opened_at) >= self.config.reset_timeout =>
                {
                    self.transition(&mut core, CircuitState::HalfOpen, now, &mut events);
                    core.probe_in_flight = true;
                    Some(Some(core.generation))
                }
                CircuitState::HalfOpen if !core.probe_in_flight => {
                    core.probe_in_flight = true;
                    Some(Some(core.generation))
                }
                CircuitState::Open | CircuitState::HalfOpen => {
                    core.window.record(now, CallKind::Rejection);
                    None
                }
            }
        };
        self.emit(events);

        admitted.map(|probe| CallPermit {
            breaker: Arc::clone(self),
            probe,
            completed: false,
        })
    }

    fn reject(&self) -> CallOutcome {
        tracing::debug!(service = %self.service, "Call rejected, circuit open");
        self.emit(vec![BreakerEvent::Fallback { service: self.service }]);
        CallOutcome::Rejected((self.fallback)())
    }

    /// Account for a finished call and apply any resulting transition.
    fn on_result(&self, kind: CallKind, probe: Option<u64>) {
        let mut events = Vec::new();
        {
            let mut core = self.lock();
            let now = Instant::now();
            core.window.record(now, kind);

            let current_probe = core.state == CircuitState::HalfOpen && probe == Some(core.generation);
            if current_probe {
                core.probe_in_flight = false;
                if kind == CallKind::Success {
                    self.transition(&mut core, CircuitState::Closed, now, &mut events);
                    core.window.clear();
                } else {
                    self.transition(&mut core, CircuitState::Open, now, &mut events);
                }
            } else if core.state == CircuitState::Closed && kind != CallKind::Success {
                let totals = core.window.totals(now);
                if self.should_trip(&totals) {
                    tracing::debug!(
                        service = %self.service,
                        error_percentage = totals.error_percentage(),
                        executed = totals.executed(),
                        "Error threshold reached"
                    );
                    self.transition(&mut core, CircuitState::Open, now, &mut events);
                }
            }
        }
        self.emit(events);
    }

    fn should_trip(&self, totals: &WindowStats) -> bool {
        let executed = totals.executed();
        executed > 0
            && executed >= self.config.minimum_calls
            && totals.errors() * 100 >= u64::from(self.config.error_threshold_percentage) * executed
    }

    fn transition(
        &self,
        core: &mut Core,
        to: CircuitState,
        now: Instant,
        events: &mut Vec<BreakerEvent>,
    ) {
        if core.state == to {
            return;
        }
        let from = core.state;
        core.state = to;
        core.generation += 1;
        if to == CircuitState::Open {
            core.opened_at = now;
        }
        if to != CircuitState::HalfOpen {
            core.probe_in_flight = false;
        }
        events.push(BreakerEvent::StateChanged {
            service: self.service,
            from,
            to,
        });
    }

    fn emit(&self, events: Vec<BreakerEvent>) {
        for event in events {
            // No subscribers is fine.
            let _ = self.events.send(event);
        }
    }
}

/// Admission ticket for one call. Records a failure if dropped without an
/// outcome, so a probe slot is never leaked.
struct CallPermit {
    breaker: Arc<CircuitBreaker>,
    probe: Option<u64>,
    completed: bool,
}

impl CallPermit {
    fn complete(mut self, outcome: &CallOutcome) {
        self.completed = true;
        self.breaker.on_result(outcome.kind(), self.probe);
    }
}

impl Drop for CallPermit {
    fn drop(&mut self) {
        if !self.completed {
            self.breaker.on_result(CallKind::Failure, self.probe);
        }
    }
}

fn default_fallback(service: ServiceName) -> Value {
    json!({
        "success": false,
        "error": format!("{} temporarily unavailable", service.label()),
        "fallback": true,
    })
}
