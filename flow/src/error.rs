// flow/src/error.rs
use thiserror::Error;

/// Errors raised by the flow machinery itself, as opposed to step handlers.
///
/// Application error types must implement `From<FlowError>` so that a run can
/// surface these alongside their own failures.
#[derive(Debug, Error)]
pub enum FlowError {
  #[error("Handler missing for non-optional step: {step_name}")]
  HandlerMissing { step_name: String },

  #[error("No flow registered for context type {context_type}")]
  NotRegistered { context_type: String },

  #[error("Context type mismatch in registry dispatch (expected {expected_type})")]
  TypeMismatch { expected_type: String },
}
