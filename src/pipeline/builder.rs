//! Pipeline builder.
//!
//! Resolves each tokenised stage against the command registry and
//! produces an ordered queue ready for the executor. Any unknown command
//! aborts the whole line and drops everything already queued — callers
//! get the queue only on full success.

use super::PipelineStage;
use crate::{command::CommandRegistry, error::ChatError, tokenizer};

pub fn build(registry: &CommandRegistry, line: &str) -> Result<Vec<PipelineStage>, ChatError> {
    let mut stages = Vec::new();
    for raw_stage in tokenizer::split_pipeline(line) {
        let (name, arg_tail) = tokenizer::split_stage(&raw_stage);
        let command = registry
            .lookup(&name)
            .ok_or_else(|| ChatError::UnknownCommand(name.clone()))?;
        stages.push(PipelineStage {
            command: command.clone(),
            arg_tail,
        });
    }
    Ok(stages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::HandlerContext;

    fn registry() -> CommandRegistry {
        let mut reg = CommandRegistry::new();
        reg.register_builtin("who", "", HandlerContext::Session);
        reg.register_builtin("yell", "msg", HandlerContext::Session);
        reg
    }

    #[test]
    fn builds_single_stage() {
        let stages = build(&registry(), "who").unwrap();
        assert_eq!(stages.len(), 1);
        assert_eq!(stages[0].command.name(), "who");
        assert!(stages[0].arg_tail.is_none());
    }

    #[test]
    fn builds_multi_stage_with_arg_tails() {
        let stages = build(&registry(), "yell hi there | who").unwrap();
        assert_eq!(stages.len(), 2);
        assert_eq!(stages[0].arg_tail.as_deref(), Some("hi there"));
        assert_eq!(stages[1].command.name(), "who");
    }

    #[test]
    fn unknown_command_aborts_whole_line() {
        let err = build(&registry(), "who | nope | yell hi").unwrap_err();
        match err {
            ChatError::UnknownCommand(name) => assert_eq!(name, "nope"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn empty_line_builds_empty_queue() {
        assert!(build(&registry(), "   ").unwrap().is_empty());
    }

    #[test]
    fn only_pipes_is_an_unknown_command() {
        let err = build(&registry(), "|").unwrap_err();
        assert!(matches!(err, ChatError::UnknownCommand(name) if name.is_empty()));
    }
}
