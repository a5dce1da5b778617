// tests/shared_context_tests.rs
mod common;

use common::*;
use storefront_flow::{Control, Flow, Outcome, Shared};

#[tokio::test]
async fn later_steps_see_earlier_writes() {
  setup_tracing();
  let mut flow = Flow::<TestContext, TestError>::new("handoff", &[("seed", false, None), ("extend", false, None)]);

  flow.on("seed", |ctx: Shared<TestContext>| async move {
    let mut guard = ctx.write();
    guard.counter = 10;
    guard.trail.push("seeded".to_string());
    Ok::<_, TestError>(Control::Continue)
  });
  flow.on("extend", |ctx: Shared<TestContext>| async move {
    let mut guard = ctx.write();
    assert_eq!(guard.counter, 10);
    guard.counter += 5;
    guard.trail.push("extended".to_string());
    Ok::<_, TestError>(Control::Continue)
  });

  let ctx = Shared::new(TestContext::default());
  assert_eq!(flow.run(ctx.clone()).await, Ok(Outcome::Completed));

  let guard = ctx.read();
  assert_eq!(guard.counter, 15);
  assert_eq!(guard.trail, vec!["seeded", "extended"]);
}

#[tokio::test]
async fn clones_point_at_the_same_context() {
  setup_tracing();
  let first = Shared::new(TestContext {
    counter: 1,
    ..Default::default()
  });
  let cloned = first.clone();

  first.write().counter = 5;
  assert_eq!(cloned.read().counter, 5);

  cloned.write().counter = 10;
  assert_eq!(first.with(|c| c.counter), 10);
}

#[tokio::test]
async fn guards_released_before_await_allow_concurrent_handlers() {
  setup_tracing();
  let ctx = Shared::new(TestContext::default());

  let bump = |ctx: Shared<TestContext>| async move {
    let start = ctx.with(|c| c.counter);
    tokio::time::sleep(std::time::Duration::from_millis(1)).await;
    let mut guard = ctx.write();
    guard.counter = guard.counter.max(start) + 1;
  };

  tokio::join!(bump(ctx.clone()), bump(ctx.clone()));
  assert_eq!(ctx.read().counter, 2);
}
