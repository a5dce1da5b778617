// tests/common/mod.rs
#![allow(dead_code)]

use once_cell::sync::Lazy;
use storefront_flow::{Control, FlowError, Handler, Shared};
use tracing::Level;

#[derive(Clone, Debug, Default)]
pub struct TestContext {
  pub counter: i32,
  pub trail: Vec<String>,
  pub stop_at: Option<String>,
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TestError {
  #[error("flow error: {0}")]
  Flow(String),

  #[error("handler failed: {0}")]
  Handler(String),
}

impl From<FlowError> for TestError {
  fn from(err: FlowError) -> Self {
    TestError::Flow(format!("{:?}", err))
  }
}

/// Records `label` in the trail and stops if the context asks for it.
pub fn recording_handler(label: &'static str) -> Handler<TestContext, TestError> {
  Box::new(move |ctx: Shared<TestContext>| {
    Box::pin(async move {
      let mut guard = ctx.write();
      guard.counter += 1;
      guard.trail.push(label.to_string());
      if guard.stop_at.as_deref() == Some(label) {
        return Ok(Control::Stop);
      }
      Ok(Control::Continue)
    })
  })
}

pub fn failing_handler(label: &'static str, message: &'static str) -> Handler<TestContext, TestError> {
  Box::new(move |ctx: Shared<TestContext>| {
    Box::pin(async move {
      ctx.write().trail.push(label.to_string());
      Err(TestError::Handler(message.to_string()))
    })
  })
}

static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}
