// src/pipeline/definition.rs

//! The `Pipeline<TData, Err>` struct and its structural edits.

use crate::core::handler::Handler;
use crate::core::step::{SkipCondition, StepDef};
use crate::error::{FlowError, FlowResult};
use std::collections::HashMap;

/// Handlers attached to one step, by phase.
pub(crate) struct StepHandlers<TData: 'static + Send + Sync, Err> {
  pub(crate) before: Vec<Handler<TData, Err>>,
  pub(crate) on: Vec<Handler<TData, Err>>,
  pub(crate) after: Vec<Handler<TData, Err>>,
}

impl<TData: 'static + Send + Sync, Err> Default for StepHandlers<TData, Err> {
  fn default() -> Self {
    Self {
      before: Vec::new(),
      on: Vec::new(),
      after: Vec::new(),
    }
  }
}

impl<TData: 'static + Send + Sync, Err> StepHandlers<TData, Err> {
  pub(crate) fn is_empty(&self) -> bool {
    self.before.is_empty() && self.on.is_empty() && self.after.is_empty()
  }
}

/// An ordered list of named steps run against a shared `ContextData<TData>`.
///
/// Handlers return `Result<PipelineControl, Err>`; engine failures such as a
/// required step without handlers are produced as [`FlowError`] and converted
/// into `Err`.
pub struct Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub(crate) steps: Vec<StepDef<TData>>,
  pub(crate) handlers: HashMap<String, StepHandlers<TData, Err>>,
}

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Builds a pipeline from `(name, optional, skip_if)` tuples.
  ///
  /// Repeated names keep the first definition.
  pub fn new(step_defs: &[(&str, bool, Option<SkipCondition<TData>>)]) -> Self {
    let mut steps: Vec<StepDef<TData>> = Vec::with_capacity(step_defs.len());
    for (name, optional, skip_if) in step_defs {
      if steps.iter().any(|s| s.name == *name) {
        tracing::warn!(step_name = %name, "Duplicate step name in pipeline definition ignored.");
        continue;
      }
      steps.push(StepDef::new(*name, *optional, skip_if.clone()));
    }

    Self {
      steps,
      handlers: HashMap::new(),
    }
  }

  pub fn step_names(&self) -> Vec<&str> {
    self.steps.iter().map(|s| s.name.as_str()).collect()
  }

  pub fn step(&self, step_name: &str) -> Option<&StepDef<TData>> {
    self.steps.iter().find(|s| s.name == step_name)
  }

  pub(crate) fn position_of(&self, step_name: &str) -> FlowResult<usize> {
    self
      .steps
      .iter()
      .position(|s| s.name == step_name)
      .ok_or_else(|| FlowError::StepNotFound {
        step_name: step_name.to_string(),
      })
  }

  fn ensure_step_absent(&self, step_name: &str) -> FlowResult<()> {
    if self.steps.iter().any(|s| s.name == step_name) {
      return Err(FlowError::DuplicateStep {
        step_name: step_name.to_string(),
      });
    }
    Ok(())
  }

  fn insert_at<S: Into<String>>(
    &mut self,
    idx: usize,
    new_step_name: S,
    optional: bool,
    skip_if: Option<SkipCondition<TData>>,
  ) -> FlowResult<()> {
    let name: String = new_step_name.into();
    self.ensure_step_absent(&name)?;
    self.steps.insert(idx, StepDef::new(name, optional, skip_if));
    Ok(())
  }

  pub fn insert_before_step<S: Into<String>>(
    &mut self,
    existing_step_name: &str,
    new_step_name: S,
    optional: bool,
    skip_if: Option<SkipCondition<TData>>,
  ) -> FlowResult<()> {
    let idx = self.position_of(existing_step_name)?;
    self.insert_at(idx, new_step_name, optional, skip_if)
  }

  pub fn insert_after_step<S: Into<String>>(
    &mut self,
    existing_step_name: &str,
    new_step_name: S,
    optional: bool,
    skip_if: Option<SkipCondition<TData>>,
  ) -> FlowResult<()> {
    let idx = self.position_of(existing_step_name)?;
    self.insert_at(idx + 1, new_step_name, optional, skip_if)
  }

  /// Removes a step together with its handlers.
  pub fn remove_step(&mut self, step_name: &str) -> FlowResult<()> {
    let idx = self.position_of(step_name)?;
    self.steps.remove(idx);
    self.handlers.remove(step_name);
    Ok(())
  }

  pub fn set_optional(&mut self, step_name: &str, optional: bool) -> FlowResult<()> {
    let idx = self.position_of(step_name)?;
    self.steps[idx].optional = optional;
    Ok(())
  }

  pub fn set_skip_condition(&mut self, step_name: &str, skip_if: Option<SkipCondition<TData>>) -> FlowResult<()> {
    let idx = self.position_of(step_name)?;
    self.steps[idx].skip_if = skip_if;
    Ok(())
  }
}
