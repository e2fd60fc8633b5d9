//! Breaker notifications.
//!
//! Breakers publish on a broadcast channel after releasing their lock.
//! Sending never blocks and is dropped silently when nobody listens.

use tokio::sync::broadcast::{self, error::RecvError};

use crate::observability::metrics;
use crate::resilience::circuit_breaker::CircuitState;
use crate::upstream::ServiceName;

const EVENT_CAPACITY: usize = 256;

/// Something observable happened inside a breaker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BreakerEvent {
    /// The breaker moved between states.
    StateChanged {
        service: ServiceName,
        from: CircuitState,
        to: CircuitState,
    },
    /// A call was short-circuited and answered with the fallback payload.
    Fallback { service: ServiceName },
}

impl BreakerEvent {
    pub fn service(&self) -> ServiceName {
        match self {
            BreakerEvent::StateChanged { service, .. } | BreakerEvent::Fallback { service } => {
                *service
            }
        }
    }
}

pub type EventSender = broadcast::Sender<BreakerEvent>;

/// Create the channel shared by every breaker of a registry.
pub fn channel() -> EventSender {
    let (tx, _) = broadcast::channel(EVENT_CAPACITY);
    tx
}

/// Log and meter breaker events until shutdown.
pub async fn log_events(
    mut events: broadcast::Receiver<BreakerEvent>,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => report(&event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Breaker event consumer lagged");
                }
                Err(RecvError::Closed) => break,
            },
            _ = shutdown.recv() => break,
        }
    }
    tracing::debug!("Breaker event consumer stopped");
}

fn report(event: &BreakerEvent) {
    match event {
        BreakerEvent::StateChanged { service, from, to: CircuitState::Open } => {
            tracing::warn!(service = %service, from = %from, "Circuit opened");
        }
        BreakerEvent::StateChanged { service, from, to: CircuitState::HalfOpen } => {
            tracing::info!(service = %service, from = %from, "Circuit half-open");
        }
        BreakerEvent::StateChanged { service, from, to: CircuitState::Closed } => {
            tracing::info!(service = %service, from = %from, "Circuit closed");
        }
        BreakerEvent::Fallback { service } => {
            tracing::debug!(service = %service, "Serving fallback response");
        }
    }
    metrics::record_breaker_event(event);
}
