// src/pipeline/execution.rs

//! `Pipeline::run()`: executes steps and their handlers in order.

use crate::core::context_data::ContextData;
use crate::core::control::{PipelineControl, PipelineResult};
use crate::error::FlowError;
use crate::pipeline::definition::{Pipeline, StepHandlers};
use crate::pipeline::hooks::Phase;
use tracing::{event, info_span, instrument, Instrument, Level};

/// What a single step resolved to.
enum StepOutcome<Err> {
  Continue,
  Stop,
  Failed(Err),
}

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Executes the pipeline against `ctx_data`.
  ///
  /// A required step with no handlers fails with
  /// [`FlowError::HandlerMissing`]. A failing handler of an optional step is
  /// logged and the run moves on to the next step.
  #[instrument(
    name = "Pipeline::run",
    skip_all,
    fields(
      context_type = %std::any::type_name::<TData>(),
      num_steps = self.steps.len(),
    ),
    err(Display)
  )]
  pub async fn run(&self, ctx_data: ContextData<TData>) -> Result<PipelineResult, Err> {
    event!(Level::DEBUG, "Pipeline execution starting.");

    for (step_idx, step_def) in self.steps.iter().enumerate() {
      let step_name = step_def.name.as_str();

      if step_def.should_skip(&ctx_data) {
        event!(Level::INFO, step_name, "Step skipped by its condition.");
        continue;
      }

      let handlers = match self.handlers.get(step_name).filter(|h| !h.is_empty()) {
        Some(handlers) => handlers,
        None if step_def.optional => {
          event!(Level::DEBUG, step_name, "Optional step has no handlers, skipping.");
          continue;
        }
        None => {
          event!(Level::ERROR, step_name, "Non-optional step has no handlers.");
          return Err(Err::from(FlowError::HandlerMissing {
            step_name: step_def.name.clone(),
          }));
        }
      };

      let span = info_span!("pipeline_step", step_name, step_index = step_idx, optional = step_def.optional);
      match Self::run_step(handlers, &ctx_data).instrument(span).await {
        StepOutcome::Continue => {}
        StepOutcome::Stop => {
          event!(Level::INFO, step_name, "Pipeline stopped by a handler.");
          return Ok(PipelineResult::Stopped);
        }
        StepOutcome::Failed(err) if step_def.optional => {
          event!(Level::WARN, step_name, error = %err, "Optional step failed, continuing.");
        }
        StepOutcome::Failed(err) => return Err(err),
      }
    }

    event!(Level::DEBUG, "Pipeline execution completed.");
    Ok(PipelineResult::Completed)
  }

  async fn run_step(handlers: &StepHandlers<TData, Err>, ctx_data: &ContextData<TData>) -> StepOutcome<Err> {
    for phase in Phase::ALL {
      let phase_handlers = match phase {
        Phase::Before => &handlers.before,
        Phase::On => &handlers.on,
        Phase::After => &handlers.after,
      };
      for (handler_idx, handler_fn) in phase_handlers.iter().enumerate() {
        match handler_fn(ctx_data.clone()).await {
          Ok(PipelineControl::Continue) => {}
          Ok(PipelineControl::Stop) => return StepOutcome::Stop,
          Err(err) => {
            event!(Level::ERROR, phase = phase.as_str(), handler_index = handler_idx, error = %err, "Handler failed.");
            return StepOutcome::Failed(err);
          }
        }
      }
    }
    StepOutcome::Continue
  }
}
