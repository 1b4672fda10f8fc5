//! Agent definitions and single-agent execution.
//!
//! An [`AgentSpec`] is plain data: an instruction template, the model to
//! call, and where its answer goes in session state. [`AgentRunner`] renders
//! the template against the current state, calls the model, and records the
//! result as an event.

mod runner;
mod spec;

pub use runner::{AgentOutput, AgentRunner, PipelineContext};
pub use spec::{AgentSpec, MISSING_INPUT};
