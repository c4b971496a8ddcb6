//! Error handling helpers and primitives.

use anyhow::Error;
use thiserror::Error as ThisError;

/// Fatal or semantically-distinct failures raised by the core engine.
///
/// Arity/semantic mistakes a user can make from the wire protocol (missing
/// argument, target offline, not a member, ...) are not represented here:
/// handlers report those directly to the caller's socket and return `Ok(())`.
#[derive(ThisError, Debug)]
pub enum ChatError {
    #[error("durable store error: {0}")]
    Store(#[from] anyhow::Error),
    #[error("command not found: {0} doesn't exit")]
    UnknownCommand(String),
    #[error("not a member of {0}")]
    NotGroupMember(String),
    #[error("not the owner of {0}")]
    NotGroupOwner(String),
    #[error("{0} is offline")]
    Offline(String),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Chain creates a string from an error stack.
pub fn chain(res: Error) -> String {
    res.chain()
        .map(|x| x.to_string())
        .collect::<Vec<_>>()
        .join(": ")
}
