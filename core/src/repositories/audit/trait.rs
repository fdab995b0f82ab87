//! Security event sink trait for recording refresh token incidents.

use async_trait::async_trait;

use crate::domain::entities::security_event::SecurityEvent;
use crate::errors::DomainError;

/// Destination for security events raised during token handling
///
/// Recording is best effort: callers log a failed write and carry on, so an
/// unavailable sink never changes the outcome of a token request.
#[async_trait]
pub trait SecurityEventSink: Send + Sync {
    /// Record a single event
    ///
    /// # Returns
    /// * `Ok(())` on success
    /// * `Err(DomainError)` if the event could not be stored
    async fn record(&self, event: &SecurityEvent) -> Result<(), DomainError>;
}
