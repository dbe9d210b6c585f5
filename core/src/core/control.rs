// src/core/control.rs

/// Signal returned by a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineControl {
  /// Go on with the remaining handlers and steps.
  Continue,
  /// Halt the run; nothing after this handler executes.
  Stop,
}

/// Outcome of a full run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineResult {
  /// Every step ran or was skipped.
  Completed,
  /// A handler returned [`PipelineControl::Stop`].
  Stopped,
}

impl PipelineResult {
  pub fn is_completed(self) -> bool {
    matches!(self, PipelineResult::Completed)
  }
}
