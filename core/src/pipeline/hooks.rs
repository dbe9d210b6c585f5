// src/pipeline/hooks.rs

//! Handler registration for the `before`, `on` and `after` phases of a step.

use crate::core::context_data::ContextData;
use crate::core::control::PipelineControl;
use crate::core::handler::Handler;
use crate::error::{FlowError, FlowResult};
use crate::pipeline::definition::Pipeline;
use std::future::Future;
use tracing::{event, Level};

/// Execution phase of a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
  Before,
  On,
  After,
}

impl Phase {
  pub const ALL: [Phase; 3] = [Phase::Before, Phase::On, Phase::After];

  pub fn as_str(self) -> &'static str {
    match self {
      Phase::Before => "before",
      Phase::On => "on",
      Phase::After => "after",
    }
  }
}

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Attaches an already boxed handler to a phase of an existing step.
  pub fn add_handler(&mut self, phase: Phase, step_name: &str, handler: Handler<TData, Err>) -> FlowResult<()> {
    self.position_of(step_name)?;
    let slot = self.handlers.entry(step_name.to_string()).or_default();
    match phase {
      Phase::Before => slot.before.push(handler),
      Phase::On => slot.on.push(handler),
      Phase::After => slot.after.push(handler),
    }
    event!(Level::DEBUG, %step_name, phase = phase.as_str(), "Handler registered.");
    Ok(())
  }

  fn wrap_handler<F, UserErr>(
    handler_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static,
  ) -> Handler<TData, Err>
  where
    F: Future<Output = Result<PipelineControl, UserErr>> + Send + 'static,
    UserErr: Into<Err> + Send + Sync + 'static,
  {
    Box::new(move |ctx_data| {
      let user_fut = handler_fn(ctx_data);
      Box::pin(async move { user_fut.await.map_err(Into::into) })
    })
  }

  /// Registers a `before` handler. Its error type only needs to convert
  /// into the pipeline's `Err`.
  pub fn before_root<F, UserErr>(
    &mut self,
    step_name: &str,
    handler_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static,
  ) -> FlowResult<()>
  where
    F: Future<Output = Result<PipelineControl, UserErr>> + Send + 'static,
    UserErr: Into<Err> + Send + Sync + 'static,
  {
    self.add_handler(Phase::Before, step_name, Self::wrap_handler(handler_fn))
  }

  pub fn on_root<F, UserErr>(
    &mut self,
    step_name: &str,
    handler_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static,
  ) -> FlowResult<()>
  where
    F: Future<Output = Result<PipelineControl, UserErr>> + Send + 'static,
    UserErr: Into<Err> + Send + Sync + 'static,
  {
    self.add_handler(Phase::On, step_name, Self::wrap_handler(handler_fn))
  }

  pub fn after_root<F, UserErr>(
    &mut self,
    step_name: &str,
    handler_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static,
  ) -> FlowResult<()>
  where
    F: Future<Output = Result<PipelineControl, UserErr>> + Send + 'static,
    UserErr: Into<Err> + Send + Sync + 'static,
  {
    self.add_handler(Phase::After, step_name, Self::wrap_handler(handler_fn))
  }

  /// Number of handlers registered for a phase of a step.
  pub fn handler_count(&self, phase: Phase, step_name: &str) -> usize {
    self.handlers.get(step_name).map_or(0, |slot| match phase {
      Phase::Before => slot.before.len(),
      Phase::On => slot.on.len(),
      Phase::After => slot.after.len(),
    })
  }
}
