// flow/src/control.rs

/// Signal returned by a step handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
  /// Run the remaining handlers and steps.
  Continue,
  /// Halt the flow. Nothing after this handler runs.
  Stop,
}

/// How a flow run ended when no handler failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
  Completed,
  /// A handler returned [`Control::Stop`].
  Stopped,
}
