//! ChangeAudit Classifiers
//!
//! Language-model classification of document changes and the audit pipeline
//! that drives it.
//!
//! - [`backend`]: interchangeable model transports (local endpoint, hosted API)
//! - [`ClassifierAgent`]: prompt, call, parse, and degrade to a sentinel verdict
//! - [`AuditPipeline`]: extract, align, classify, report

pub mod agent;
pub mod backend;
pub mod classifier;
pub mod config;
pub mod pipeline;
pub mod prompt;
pub mod response;

pub use agent::ClassifierAgent;
pub use backend::{
    build_backend, BackendError, GenerationRequest, HostedBackend, LocalBackend, ModelBackend,
};
pub use classifier::ChangeClassifier;
pub use config::{BackendConfig, BackendKind, PipelineConfig, DEFAULT_LOCAL_URL};
pub use pipeline::AuditPipeline;
pub use response::ResponseParser;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::agent::ClassifierAgent;
    pub use crate::backend::{build_backend, ModelBackend};
    pub use crate::classifier::ChangeClassifier;
    pub use crate::config::{BackendConfig, PipelineConfig};
    pub use crate::pipeline::AuditPipeline;
}
