pub mod audit_buffer;
pub mod dlq;
pub mod internal_writer;
pub mod replay;
pub mod shutdown;

pub use audit_buffer::{AuditBufferConfig, AuditEventBuffer};
pub use dlq::{DlqReplayWorker, DlqReplayer};
pub use internal_writer::InternalAuditWriter;
pub use replay::GatewayDlqReplayer;
pub use shutdown::{InFlightCounter, ReadinessGate, ShutdownConfig, ShutdownCoordinator, ShutdownPhase};
