// Core domain abstractions for the incident remediation data gateway.
//
// Decision: keep storage and transport out of this crate so pure logic
// (validation, retry math, domain types, trait contracts) can be unit
// tested without a database or an HTTP server.

pub mod domain;
pub mod error;
pub mod retry;
pub mod traits;
pub mod validation;

pub use domain::{AuditEvent, DlqEntry, Labels, PlaybookExecutionTrace, RemediationWorkflow, WriteMode, WriteResult};
pub use error::{GatewayError, Result};
pub use retry::RetryPolicy;
pub use traits::{AuditSink, EmbeddingError, EmbeddingProvider, SubmitOutcome, VectorMatch, VectorStore, VectorStoreError};
pub use validation::{FailureKind, ValidationFailure, Validator};
