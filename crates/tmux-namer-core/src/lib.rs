//! Name tmux windows after what you've been asking Claude Code.
//!
//! The [`pipeline`] module wires the pieces together; everything it touches
//! from the outside world (the LLM endpoint, tmux, the cost log) is passed
//! in explicitly.

pub mod config;
pub mod cost_log;
pub mod error;
pub mod llm;
pub mod payload;
pub mod pipeline;
pub mod pricing;
pub mod sanitize;
pub mod tmux;

pub use config::NamerConfig;
pub use cost_log::{CostLog, CostRecord};
pub use error::{NamerError, Result};
pub use llm::{LlmService, NameGenerator};
pub use pipeline::{Pipeline, PipelineSettings, RunReport};
pub use tmux::{TmuxRenamer, WindowRenamer};
