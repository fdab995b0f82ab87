//! Security event recording.

mod r#trait;
pub use r#trait::SecurityEventSink;

mod noop;
pub use noop::NoOpSecurityEventSink;

mod tracing_sink;
pub use tracing_sink::TracingSecurityEventSink;

mod memory;
pub use memory::InMemorySecurityEventSink;
