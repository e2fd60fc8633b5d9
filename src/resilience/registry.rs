//! Breaker registry: exactly one breaker per backend.
//!
//! # Responsibilities
//! - Build a breaker for every known service at startup
//! - Resolve breakers by service or by administrative name
//! - Aggregate snapshots for status and health reporting
//!
//! # Design Decisions
//! - Services are a closed enum, so the registry is a fixed array indexed by
//!   service; no map, no locking
//! - All breakers share one event channel

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::broadcast;

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::resilience::circuit_breaker::{
    BreakerConfig, BreakerSnapshot, CircuitBreaker, CircuitState,
};
use crate::resilience::events::{self, BreakerEvent, EventSender};
use crate::upstream::ServiceName;

#[derive(Debug)]
pub struct BreakerRegistry {
    breakers: Vec<Arc<CircuitBreaker>>,
    events: EventSender,
}

impl BreakerRegistry {
    /// Build one breaker per service with the config `config_for` returns.
    pub fn new<F>(mut config_for: F) -> Self
    where
        F: FnMut(ServiceName) -> BreakerConfig,
    {
        let events = events::channel();
        let breakers = ServiceName::ALL
            .iter()
            .map(|&service| {
                Arc::new(CircuitBreaker::new(service, config_for(service), events.clone()))
            })
            .collect();
        Self { breakers, events }
    }

    pub fn from_config(config: &GatewayConfig) -> Self {
        Self::new(|service| config.breaker_config(service))
    }

    pub fn get(&self, service: ServiceName) -> &Arc<CircuitBreaker> {
        &self.breakers[service.index()]
    }

    /// Resolve an administrative name like `articleService` or `comment`.
    pub fn lookup(&self, name: &str) -> Result<&Arc<CircuitBreaker>, GatewayError> {
        let service: ServiceName = name.parse()?;
        Ok(self.get(service))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<CircuitBreaker>> {
        self.breakers.iter()
    }

    /// Visit every breaker in service order.
    pub fn for_each<F>(&self, mut visitor: F)
    where
        F: FnMut(&CircuitBreaker),
    {
        for breaker in &self.breakers {
            visitor(breaker.as_ref());
        }
    }

    pub fn force_close(&self, service: ServiceName) -> CircuitState {
        self.get(service).force_close()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BreakerEvent> {
        self.events.subscribe()
    }

    /// Snapshot of every breaker, keyed by service in stable order.
    pub fn snapshot_all(&self) -> BTreeMap<ServiceName, BreakerSnapshot> {
        self.breakers
            .iter()
            .map(|breaker| (breaker.service(), breaker.snapshot()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_one_breaker_per_service() {
        let registry = BreakerRegistry::new(|_| BreakerConfig::default());

        assert_eq!(registry.iter().count(), ServiceName::ALL.len());
        for service in ServiceName::ALL {
            assert_eq!(registry.get(service).service(), service);
        }
    }

    #[test]
    fn test_per_service_config() {
        let registry = BreakerRegistry::new(|service| BreakerConfig {
            call_timeout: match service {
                ServiceName::Article => Duration::from_millis(100),
                ServiceName::Comment => Duration::from_millis(200),
            },
            ..BreakerConfig::default()
        });

        assert_eq!(
            registry.get(ServiceName::Comment).config().call_timeout,
            Duration::from_millis(200)
        );
    }

    #[test]
    fn test_lookup_by_name() {
        let registry = BreakerRegistry::new(|_| BreakerConfig::default());

        assert_eq!(registry.lookup("articleService").unwrap().service(), ServiceName::Article);
        assert_eq!(registry.lookup("comment").unwrap().service(), ServiceName::Comment);
        assert!(matches!(
            registry.lookup("userService"),
            Err(GatewayError::UnknownService(name)) if name == "userService"
        ));
    }

    #[tokio::test]
    async fn test_force_close_through_registry() {
        let registry = BreakerRegistry::new(|_| BreakerConfig {
            minimum_calls: 1,
            ..BreakerConfig::default()
        });
        let breaker = registry.get(ServiceName::Article).clone();
        breaker
            .execute(|| async { Err(crate::upstream::UpstreamFailure::Timeout) })
            .await;
        assert_eq!(breaker.state(), CircuitState::Open);

        assert_eq!(registry.force_close(ServiceName::Article), CircuitState::Closed);

        let mut states = Vec::new();
        registry.for_each(|b| states.push((b.service(), b.state())));
        assert_eq!(
            states,
            vec![
                (ServiceName::Article, CircuitState::Closed),
                (ServiceName::Comment, CircuitState::Closed),
            ]
        );
    }

    #[test]
    fn test_snapshot_all_serializes_by_service_name() {
        let registry = BreakerRegistry::new(|_| BreakerConfig::default());
        let json = serde_json::to_value(registry.snapshot_all()).unwrap();

        assert_eq!(json["articleService"]["state"], "closed");
        assert_eq!(json["commentService"]["stats"]["successful"], 0);
        assert_eq!(json["commentService"]["stats"]["rejected"], 0);
    }
}
