//! Pipeline builder and executor.
//!
//! A `Pipeline` is the ordered queue the builder produces from one input
//! line; the executor runs it, wiring stage-to-stage pipes between
//! external commands and dispatching built-ins in process.

mod builder;
mod executor;

pub use builder::build;
pub use executor::execute;

use crate::command::Command;

/// One stage of a pipeline. Stdio wiring is resolved by the executor at
/// run time rather than stored here: whether a stage's stdio is wired to a
/// neighbour or to the session's own socket depends on whether that
/// neighbour is itself external, which only matters once execution starts.
#[derive(Debug, Clone)]
pub struct PipelineStage {
    pub command: Command,
    pub arg_tail: Option<String>,
}
