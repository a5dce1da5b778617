// flow/src/step.rs

use crate::context::Shared;
use std::sync::Arc;

/// Predicate evaluated before a step; `true` skips it.
pub type SkipCondition<T> = Arc<dyn Fn(Shared<T>) -> bool + Send + Sync + 'static>;

/// A named step in a flow.
#[derive(Clone)]
pub struct StepDef<T: Send + Sync + 'static> {
  pub name: String,
  /// Optional steps without handlers are skipped instead of failing the run.
  pub optional: bool,
  pub skip_if: Option<SkipCondition<T>>,
}

impl<T: Send + Sync + 'static> std::fmt::Debug for StepDef<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("StepDef")
      .field("name", &self.name)
      .field("optional", &self.optional)
      .field("skip_if_present", &self.skip_if.is_some())
      .finish()
  }
}
