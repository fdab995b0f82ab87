//! Sink that writes security events to the tracing pipeline

use async_trait::async_trait;
use tracing::warn;

use crate::domain::entities::security_event::SecurityEvent;
use crate::errors::DomainError;

use super::SecurityEventSink;

/// Emits each event as a structured `warn` record under the `security` target
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSecurityEventSink;

impl TracingSecurityEventSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SecurityEventSink for TracingSecurityEventSink {
    async fn record(&self, event: &SecurityEvent) -> Result<(), DomainError> {
        warn!(
            target: "security",
            kind = event.kind.as_str(),
            user_id = event.user_id,
            client_id = %event.client_id,
            access_token_id = %event.access_token_id,
            refresh_token_id = %event.refresh_token_id,
            occurred_at = %event.occurred_at,
            "security event"
        );
        Ok(())
    }
}
