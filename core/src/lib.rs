// src/lib.rs

//! Storefront flow engine: an async, type-safe, multi-step workflow runner.
//!
//! A flow is a [`Pipeline`] of named steps. Each step may carry `before`,
//! `on` and `after` handlers, be marked optional, or be skipped by a
//! condition evaluated against the shared context. Handlers signal
//! [`PipelineControl::Stop`] to end a run early. Pipelines are registered in
//! a [`Registry`] keyed by their context type and dispatched from there.

pub mod core;
pub mod error;
pub mod pipeline;
pub mod registry;

pub use crate::core::context_data::ContextData;
pub use crate::core::control::{PipelineControl, PipelineResult};
pub use crate::core::handler::Handler;
pub use crate::core::step::{SkipCondition, StepDef};

pub use crate::pipeline::definition::Pipeline;
pub use crate::pipeline::hooks::Phase;

pub use crate::error::{FlowError, FlowResult};

pub use crate::registry::Registry;
