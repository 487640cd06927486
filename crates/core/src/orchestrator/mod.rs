//! Orchestration core: discovery, validation, submission, reconciliation.
//!
//! Each step is a free function over a shared [`CycleContext`]; the
//! [`CycleDriver`] runs them in order once per cycle:
//! - **Discovery**: list the outbox and claim unseen manifests
//! - **Validation + submission**: per manifest, concurrent up to `max_concurrent`
//! - **Reconciliation**: poll in-flight jobs and record terminal statuses
//! - **Relay**: hand completed jobs to the output relay

mod config;
mod context;
mod discovery;
mod driver;
mod reconciler;
mod relay;
mod submission;
mod types;
mod validation;

pub use config::CycleConfig;
pub use context::CycleContext;
pub use discovery::discover;
pub use driver::CycleDriver;
pub use reconciler::{in_flight, reconcile, reconcile_records};
pub use relay::{LoggingRelay, OutputRelay, RelayError};
pub use submission::{build_job_request, submit};
pub use types::{
    CompletedJob, CycleReport, JobHandle, OrchestratorError, SubmissionFailure, ValidationFailure,
};
pub use validation::validate;
