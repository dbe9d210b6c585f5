// src/core/handler.rs

use crate::core::context_data::ContextData;
use crate::core::control::PipelineControl;
use std::future::Future;
use std::pin::Pin;

/// A boxed asynchronous step handler.
///
/// It receives a clone of the shared context and resolves to the control
/// signal for the run. Lock guards taken on the context must be released
/// before the handler awaits anything.
pub type Handler<TData, Err> = Box<
  dyn Fn(ContextData<TData>) -> Pin<Box<dyn Future<Output = Result<PipelineControl, Err>> + Send>>
    + Send
    + Sync,
>;
