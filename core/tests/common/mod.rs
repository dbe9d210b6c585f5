// tests/common/mod.rs
#![allow(dead_code)]

use once_cell::sync::Lazy;
use std::sync::atomic::{AtomicUsize, Ordering};
use storefront_flow::{ContextData, FlowError, Handler, PipelineControl};
use tracing::Level;

/// Context shaped like a small order flow: each step appends to `trail`.
#[derive(Clone, Debug, Default)]
pub struct OrderFlowCtx {
  pub lines_priced: i32,
  pub total_cents: i64,
  pub trail: Vec<String>,
  pub stop_at: Option<String>,
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TestError {
  #[error("flow error: {0}")]
  Flow(String),

  #[error("step failed: {0}")]
  Step(String),
}

impl From<FlowError> for TestError {
  fn from(err: FlowError) -> Self {
    TestError::Flow(format!("{err:?}"))
  }
}

/// Records the step, adds `cents` to the total, stops if `stop_at` names it.
pub fn pricing_handler(step_name: &'static str, cents: i64) -> Handler<OrderFlowCtx, TestError> {
  Box::new(move |ctx: ContextData<OrderFlowCtx>| {
    Box::pin(async move {
      let mut guard = ctx.write();
      guard.lines_priced += 1;
      guard.total_cents += cents;
      guard.trail.push(step_name.to_string());
      tracing::debug!(target: "flow_tests", step = step_name, total = guard.total_cents, "priced");
      if guard.stop_at.as_deref() == Some(step_name) {
        return Ok(PipelineControl::Stop);
      }
      Ok(PipelineControl::Continue)
    })
  })
}

pub fn failing_handler(step_name: &'static str, message: &'static str) -> Handler<OrderFlowCtx, TestError> {
  Box::new(move |ctx: ContextData<OrderFlowCtx>| {
    Box::pin(async move {
      ctx.write().trail.push(step_name.to_string());
      tracing::warn!(target: "flow_tests", step = step_name, "failing with: '{}'", message);
      Err(TestError::Step(message.to_string()))
    })
  })
}

/// Appends `label` to the trail.
pub fn trail_handler(label: &'static str) -> Handler<OrderFlowCtx, TestError> {
  Box::new(move |ctx: ContextData<OrderFlowCtx>| {
    Box::pin(async move {
      ctx.write().trail.push(label.to_string());
      Ok(PipelineControl::Continue)
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

pub static HANDLER_EXEC_COUNTER: Lazy<AtomicUsize> = Lazy::new(|| AtomicUsize::new(0));

pub fn reset_counters() {
  HANDLER_EXEC_COUNTER.store(0, Ordering::SeqCst);
}
