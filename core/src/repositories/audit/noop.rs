//! No-op implementation of SecurityEventSink for when events are not needed

use async_trait::async_trait;

use crate::domain::entities::security_event::SecurityEvent;
use crate::errors::DomainError;

use super::SecurityEventSink;

/// Discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpSecurityEventSink;

impl NoOpSecurityEventSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SecurityEventSink for NoOpSecurityEventSink {
    async fn record(&self, _event: &SecurityEvent) -> Result<(), DomainError> {
        Ok(())
    }
}
