// flow/src/lib.rs

//! Step pipelines for the storefront coordinators.
//!
//! A [`Flow`] is an ordered list of named steps. Each step may carry `before`,
//! `on` and `after` handlers that receive a [`Shared`] context. A handler
//! returns [`Control::Continue`] to move on or [`Control::Stop`] to end the
//! run early with [`Outcome::Stopped`]. Flows are registered in a [`Registry`]
//! keyed by their context type, so a caller only needs the context to run one.

pub mod context;
pub mod control;
pub mod error;
pub mod flow;
pub mod registry;
pub mod step;

pub use crate::context::{Handler, Shared};
pub use crate::control::{Control, Outcome};
pub use crate::error::FlowError;
pub use crate::flow::Flow;
pub use crate::registry::Registry;
pub use crate::step::{SkipCondition, StepDef};
