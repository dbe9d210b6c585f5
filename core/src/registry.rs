// src/registry.rs

//! `Registry<E>`: pipelines keyed by their context type.

use crate::core::context_data::ContextData;
use crate::core::control::PipelineResult;
use crate::error::FlowError;
use crate::pipeline::definition::Pipeline;

use async_trait::async_trait;
use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{event, instrument, Level};

#[async_trait]
trait ErasedRunner<AppErr>: Send + Sync
where
  AppErr: std::error::Error + Send + Sync + 'static,
{
  /// `ctx_obj` must hold a `ContextData<TData>` of the wrapped pipeline.
  async fn run_erased(&self, ctx_obj: Box<dyn Any + Send>) -> Result<PipelineResult, AppErr>;
}

struct PipelineRunner<TData, HandlerErr>
where
  TData: 'static + Send + Sync,
  HandlerErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pipeline: Arc<Pipeline<TData, HandlerErr>>,
}

#[async_trait]
impl<TData, HandlerErr, AppErr> ErasedRunner<AppErr> for PipelineRunner<TData, HandlerErr>
where
  TData: 'static + Send + Sync,
  HandlerErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
  AppErr: std::error::Error + From<HandlerErr> + From<FlowError> + Send + Sync + 'static,
  Pipeline<TData, HandlerErr>: Send + Sync,
{
  async fn run_erased(&self, ctx_obj: Box<dyn Any + Send>) -> Result<PipelineResult, AppErr> {
    let typed_ctx = match ctx_obj.downcast::<ContextData<TData>>() {
      Ok(boxed) => *boxed,
      Err(_) => {
        let expected_type = std::any::type_name::<ContextData<TData>>();
        event!(Level::ERROR, expected_type, "Context object type mismatch.");
        return Err(AppErr::from(FlowError::TypeMismatch {
          step_name: "registry_dispatch".to_string(),
          expected_type: expected_type.to_string(),
        }));
      }
    };
    self.pipeline.run(typed_ctx).await.map_err(AppErr::from)
  }
}

/// Dispatches a context to the pipeline registered for its type.
///
/// Registering a second pipeline for the same context type replaces the first.
pub struct Registry<AppErr = FlowError>
where
  AppErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  runners: RwLock<HashMap<TypeId, Arc<dyn ErasedRunner<AppErr>>>>,
  _app_err: PhantomData<AppErr>,
}

impl<AppErr> Default for Registry<AppErr>
where
  AppErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  fn default() -> Self {
    Self::new()
  }
}

impl<AppErr> Registry<AppErr>
where
  AppErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub fn new() -> Self {
    Self {
      runners: RwLock::new(HashMap::new()),
      _app_err: PhantomData,
    }
  }

  pub fn register_pipeline<TData, HandlerErr>(&self, pipeline: Pipeline<TData, HandlerErr>)
  where
    TData: 'static + Send + Sync,
    HandlerErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
    AppErr: From<HandlerErr>,
    Pipeline<TData, HandlerErr>: Send + Sync,
  {
    event!(
      Level::DEBUG,
      context_type = %std::any::type_name::<TData>(),
      steps = ?pipeline.step_names(),
      "Registering pipeline."
    );
    let runner: Arc<dyn ErasedRunner<AppErr>> = Arc::new(PipelineRunner {
      pipeline: Arc::new(pipeline),
    });
    self.runners.write().insert(TypeId::of::<TData>(), runner);
  }

  pub fn is_registered<TData: 'static>(&self) -> bool {
    self.runners.read().contains_key(&TypeId::of::<TData>())
  }

  pub fn len(&self) -> usize {
    self.runners.read().len()
  }

  pub fn is_empty(&self) -> bool {
    self.runners.read().is_empty()
  }

  /// Runs the pipeline registered for `TData`.
  #[instrument(name = "Registry::run", skip_all, fields(context_type = %std::any::type_name::<TData>()))]
  pub async fn run<TData>(&self, ctx_data: ContextData<TData>) -> Result<PipelineResult, AppErr>
  where
    TData: 'static + Send + Sync,
  {
    let runner = {
      let runners = self.runners.read();
      runners.get(&TypeId::of::<TData>()).cloned()
    };
    let Some(runner) = runner else {
      let type_name = std::any::type_name::<TData>();
      event!(Level::ERROR, type_name, "No pipeline registered for context type.");
      return Err(AppErr::from(FlowError::NotRegistered {
        type_name: type_name.to_string(),
      }));
    };
    runner.run_erased(Box::new(ctx_data)).await
  }
}
