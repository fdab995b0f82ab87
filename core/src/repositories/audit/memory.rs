//! Recording sink that keeps events in memory

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::entities::security_event::{SecurityEvent, SecurityEventKind};
use crate::errors::DomainError;

use super::SecurityEventSink;

/// Keeps every recorded event, mainly for assertions in tests
#[derive(Debug, Clone, Default)]
pub struct InMemorySecurityEventSink {
    events: Arc<RwLock<Vec<SecurityEvent>>>,
}

impl InMemorySecurityEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn events(&self) -> Vec<SecurityEvent> {
        self.events.read().await.clone()
    }

    pub async fn count(&self, kind: SecurityEventKind) -> usize {
        self.events
            .read()
            .await
            .iter()
            .filter(|event| event.kind == kind)
            .count()
    }
}

#[async_trait]
impl SecurityEventSink for InMemorySecurityEventSink {
    async fn record(&self, event: &SecurityEvent) -> Result<(), DomainError> {
        self.events.write().await.push(event.clone());
        Ok(())
    }
}
