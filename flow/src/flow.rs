// flow/src/flow.rs

//! The `Flow<T, E>` type: step definitions, hook registration and execution.

use crate::context::{Handler, Shared};
use crate::control::{Control, Outcome};
use crate::error::FlowError;
use crate::step::{SkipCondition, StepDef};
use std::collections::HashMap;
use std::future::Future;
use tracing::{event, info_span, Instrument, Level};

/// An ordered list of steps over context `T` whose handlers fail with `E`.
///
/// `E` must absorb [`FlowError`] so that configuration problems found while
/// running (a required step with no handlers) come back through the same
/// channel as handler failures.
pub struct Flow<T, E>
where
  T: Send + Sync + 'static,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  name: String,
  steps: Vec<StepDef<T>>,
  before: HashMap<String, Vec<Handler<T, E>>>,
  on: HashMap<String, Vec<Handler<T, E>>>,
  after: HashMap<String, Vec<Handler<T, E>>>,
}

#[derive(Clone, Copy)]
enum Phase {
  Before,
  On,
  After,
}

impl Phase {
  fn label(self) -> &'static str {
    match self {
      Phase::Before => "before",
      Phase::On => "on",
      Phase::After => "after",
    }
  }
}

impl<T, E> Flow<T, E>
where
  T: Send + Sync + 'static,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Creates a flow from `(name, optional, skip_if)` step tuples.
  pub fn new(name: impl Into<String>, step_defs: &[(&str, bool, Option<SkipCondition<T>>)]) -> Self {
    let steps = step_defs
      .iter()
      .map(|(step, optional, skip_if)| StepDef {
        name: (*step).to_string(),
        optional: *optional,
        skip_if: skip_if.clone(),
      })
      .collect();

    Self {
      name: name.into(),
      steps,
      before: HashMap::new(),
      on: HashMap::new(),
      after: HashMap::new(),
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn step_names(&self) -> Vec<&str> {
    self.steps.iter().map(|s| s.name.as_str()).collect()
  }

  /// Panics when `step_name` was never declared. A typo here is a wiring bug
  /// that should fail at startup, not on the first request.
  fn assert_step(&self, step_name: &str) {
    if !self.steps.iter().any(|s| s.name == step_name) {
      panic!("flow '{}': step '{}' is not declared", self.name, step_name);
    }
  }

  fn wrap<F, UE>(handler_fn: impl Fn(Shared<T>) -> F + Send + Sync + 'static) -> Handler<T, E>
  where
    F: Future<Output = Result<Control, UE>> + Send + 'static,
    UE: Into<E> + Send + Sync + 'static,
  {
    Box::new(move |ctx| {
      let fut = handler_fn(ctx);
      Box::pin(async move { fut.await.map_err(Into::into) })
    })
  }

  pub fn before<F, UE>(&mut self, step_name: &str, handler_fn: impl Fn(Shared<T>) -> F + Send + Sync + 'static)
  where
    F: Future<Output = Result<Control, UE>> + Send + 'static,
    UE: Into<E> + Send + Sync + 'static,
  {
    self.assert_step(step_name);
    self.before.entry(step_name.to_string()).or_default().push(Self::wrap(handler_fn));
  }

  pub fn on<F, UE>(&mut self, step_name: &str, handler_fn: impl Fn(Shared<T>) -> F + Send + Sync + 'static)
  where
    F: Future<Output = Result<Control, UE>> + Send + 'static,
    UE: Into<E> + Send + Sync + 'static,
  {
    self.assert_step(step_name);
    self.on.entry(step_name.to_string()).or_default().push(Self::wrap(handler_fn));
  }

  pub fn after<F, UE>(&mut self, step_name: &str, handler_fn: impl Fn(Shared<T>) -> F + Send + Sync + 'static)
  where
    F: Future<Output = Result<Control, UE>> + Send + 'static,
    UE: Into<E> + Send + Sync + 'static,
  {
    self.assert_step(step_name);
    self.after.entry(step_name.to_string()).or_default().push(Self::wrap(handler_fn));
  }

  fn handlers(&self, phase: Phase, step_name: &str) -> &[Handler<T, E>] {
    let map = match phase {
      Phase::Before => &self.before,
      Phase::On => &self.on,
      Phase::After => &self.after,
    };
    map.get(step_name).map(Vec::as_slice).unwrap_or(&[])
  }

  /// Runs every step in order against `ctx`.
  pub async fn run(&self, ctx: Shared<T>) -> Result<Outcome, E> {
    event!(Level::DEBUG, flow = %self.name, steps = self.steps.len(), "Flow run starting.");

    for (step_index, step) in self.steps.iter().enumerate() {
      if let Some(skip_if) = &step.skip_if {
        if skip_if(ctx.clone()) {
          event!(Level::DEBUG, flow = %self.name, step = %step.name, "Step skipped by condition.");
          continue;
        }
      }

      let phases = [Phase::Before, Phase::On, Phase::After];
      if phases.iter().all(|p| self.handlers(*p, &step.name).is_empty()) {
        if step.optional {
          event!(Level::DEBUG, flow = %self.name, step = %step.name, "Optional step has no handlers.");
          continue;
        }
        event!(Level::ERROR, flow = %self.name, step = %step.name, "Required step has no handlers.");
        return Err(E::from(FlowError::HandlerMissing {
          step_name: step.name.clone(),
        }));
      }

      let span = info_span!("flow_step", flow = %self.name, step = %step.name, step_index);
      for phase in phases {
        let control = self.run_phase(phase, &step.name, &ctx).instrument(span.clone()).await?;
        if control == Control::Stop {
          event!(Level::INFO, flow = %self.name, step = %step.name, phase = phase.label(), "Flow stopped by handler.");
          return Ok(Outcome::Stopped);
        }
      }
    }

    event!(Level::DEBUG, flow = %self.name, "Flow run completed.");
    Ok(Outcome::Completed)
  }

  async fn run_phase(&self, phase: Phase, step_name: &str, ctx: &Shared<T>) -> Result<Control, E> {
    for handler in self.handlers(phase, step_name) {
      match handler(ctx.clone()).await {
        Ok(Control::Continue) => {}
        Ok(Control::Stop) => return Ok(Control::Stop),
        Err(e) => {
          event!(Level::WARN, phase = phase.label(), error = %e, "Step handler failed.");
          return Err(e);
        }
      }
    }
    Ok(Control::Continue)
  }
}
