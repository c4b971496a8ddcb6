//! Built-in command handlers and their shared context.
//!
//! Every handler takes the same two things: the context it needs to touch
//! shared state (`HandlerCtx`) and the stage's raw argument tail. Each
//! re-tokenises its own tail rather than relying on any upstream splitting,
//! since the argument grammar differs per command (`tell` wants a name then
//! a message, `kickUser` wants a variadic name list, ...).

mod chat;
mod groups;
mod mail;
mod name;

use crate::{context::ServerContext, error::ChatError, session::Session};
use nix::{sys::signal, unistd::Pid};
use std::sync::Arc;

/// Bundles the issuing session with the server-wide state every built-in
/// may need: the roster (for `who`/`tell`/`yell`/`gyell`), the durable
/// store (for everything touching mail, groups or identities), and
/// (indirectly, via the registry) the set of other known commands.
pub struct HandlerCtx {
    pub server: Arc<ServerContext>,
    pub session: Arc<Session>,
}

/// Dispatches one built-in by name. Handlers return `0` on success and `-1`
/// on failure, matching the exit-code convention a forked stage would have
/// used; since built-ins here run in-process there is no child to exit,
/// but callers (the executor, tests) can still treat the return value the
/// same way.
pub async fn dispatch(ctx: &HandlerCtx, name: &str, arg_tail: Option<&str>) -> Result<i32, ChatError> {
    match name {
        "who" => chat::who(ctx, arg_tail).await,
        "tell" => chat::tell(ctx, arg_tail).await,
        "yell" => chat::yell(ctx, arg_tail).await,
        "name" => name::rename(ctx, arg_tail).await,
        "listMail" => mail::list_mail(ctx, arg_tail).await,
        "sentMail" => mail::sent_mail(ctx, arg_tail).await,
        "delMail" => mail::del_mail(ctx, arg_tail).await,
        "Groups" => groups::groups(ctx, arg_tail).await,
        "listGroup" => groups::list_group(ctx, arg_tail).await,
        "createGroup" => groups::create_group(ctx, arg_tail).await,
        "delGroup" => groups::del_group(ctx, arg_tail).await,
        "addGroup" => groups::add_group(ctx, arg_tail).await,
        "leaveGroup" => groups::leave_group(ctx, arg_tail).await,
        "kickUser" => groups::kick_user(ctx, arg_tail).await,
        "gyell" => groups::gyell(ctx, arg_tail).await,
        other => Err(ChatError::UnknownCommand(other.to_string())),
    }
}

/// The one built-in that takes a pid rather than a session: it signals
/// whatever process is named by `target` and reports success. Registered
/// in the command registry for parity with the admin bootstrap's command
/// set, but not part of the live TCP server's dispatch table (the bootstrap
/// console it serves is out of scope here).
pub fn do_quit(target: Pid) -> Result<i32, ChatError> {
    signal::kill(target, signal::Signal::SIGINT).map_err(|e| ChatError::Io(std::io::Error::from(e)))?;
    Ok(-1)
}

/// Splits a handler's argument tail into its first whitespace-separated
/// word and the (verbatim, trimmed) remainder.
pub(crate) fn split_first_word(arg_tail: Option<&str>) -> (Option<&str>, Option<&str>) {
    let tail = match arg_tail.map(str::trim) {
        Some(t) if !t.is_empty() => t,
        _ => return (None, None),
    };
    match tail.split_once(char::is_whitespace) {
        Some((first, rest)) => {
            let rest = rest.trim();
            (Some(first), if rest.is_empty() { None } else { Some(rest) })
        }
        None => (Some(tail), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_first_word_separates_name_and_rest() {
        assert_eq!(split_first_word(Some("dave hi there")), (Some("dave"), Some("hi there")));
        assert_eq!(split_first_word(Some("dave")), (Some("dave"), None));
        assert_eq!(split_first_word(Some("   ")), (None, None));
        assert_eq!(split_first_word(None), (None, None));
    }
}
