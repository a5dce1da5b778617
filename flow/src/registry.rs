// flow/src/registry.rs

//! `Registry<E>`: one flow per context type, dispatched by `TypeId`.

use crate::context::Shared;
use crate::control::Outcome;
use crate::error::FlowError;
use crate::flow::Flow;

use async_trait::async_trait;
use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{event, instrument, Level};

#[async_trait]
trait ErasedFlow<E>: Send + Sync
where
  E: std::error::Error + Send + Sync + 'static,
{
  /// `ctx` must hold a `Shared<T>` for the flow's own `T`.
  async fn run_erased(&self, ctx: Box<dyn Any + Send>) -> Result<Outcome, E>;

  fn flow_name(&self) -> &str;
}

#[async_trait]
impl<T, E> ErasedFlow<E> for Flow<T, E>
where
  T: Send + Sync + 'static,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  async fn run_erased(&self, ctx: Box<dyn Any + Send>) -> Result<Outcome, E> {
    let ctx = match ctx.downcast::<Shared<T>>() {
      Ok(boxed) => *boxed,
      Err(_) => {
        let expected_type = std::any::type_name::<Shared<T>>().to_string();
        event!(Level::ERROR, %expected_type, "Registry dispatched the wrong context type.");
        return Err(E::from(FlowError::TypeMismatch { expected_type }));
      }
    };
    self.run(ctx).await
  }

  fn flow_name(&self) -> &str {
    self.name()
  }
}

/// Holds the application's flows. `E` is the error every run returns.
pub struct Registry<E>
where
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  flows: RwLock<HashMap<TypeId, Arc<dyn ErasedFlow<E>>>>,
}

impl<E> Default for Registry<E>
where
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  fn default() -> Self {
    Self::new()
  }
}

impl<E> Registry<E>
where
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub fn new() -> Self {
    Self {
      flows: RwLock::new(HashMap::new()),
    }
  }

  /// Registers `flow` for its context type, replacing any earlier one.
  pub fn register<T>(&self, flow: Flow<T, E>)
  where
    T: Send + Sync + 'static,
  {
    event!(
      Level::DEBUG,
      flow = flow.name(),
      context_type = %std::any::type_name::<T>(),
      "Registering flow."
    );
    self.flows.write().insert(TypeId::of::<T>(), Arc::new(flow));
  }

  pub fn contains<T: Send + Sync + 'static>(&self) -> bool {
    self.flows.read().contains_key(&TypeId::of::<T>())
  }

  /// Runs the flow registered for `T` against `ctx`.
  #[instrument(name = "Registry::run", skip_all, fields(context_type = %std::any::type_name::<T>()))]
  pub async fn run<T>(&self, ctx: Shared<T>) -> Result<Outcome, E>
  where
    T: Send + Sync + 'static,
  {
    let runner = self.flows.read().get(&TypeId::of::<T>()).cloned();
    let runner = runner.ok_or_else(|| {
      let context_type = std::any::type_name::<T>().to_string();
      event!(Level::ERROR, %context_type, "No flow registered.");
      E::from(FlowError::NotRegistered { context_type })
    })?;

    event!(Level::DEBUG, flow = runner.flow_name(), "Dispatching flow.");
    runner.run_erased(Box::new(ctx)).await
  }
}
