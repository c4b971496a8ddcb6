//! Pipeline executor.
//!
//! The original design forks one child per stage, built-ins included, so
//! that every stage gets properly wired stdio. Raw `fork()` is unsound on a
//! multi-threaded async runtime, so this keeps the semantics it actually
//! cares about — external binaries see real, piped stdio; built-ins see a
//! fresh destination for their output; a line starting with `name` bypasses
//! the whole mechanism — while replacing the mechanism itself: external
//! stages become real child processes (`tokio::process::Command`) chained
//! by `tokio::io::copy` tasks, and built-ins dispatch in-process, writing
//! straight to the issuing session's own socket rather than through
//! whatever stdio a neighbouring stage set up.
//!
//! Every inter-stage link is still tracked in the descriptor registry for
//! the duration it's open, and untracked once its copy task drains to EOF,
//! so the "every pipe the executor ever opens is closed before it returns"
//! invariant holds the same way it would for real process pipes.

use super::PipelineStage;
use crate::{
    context::ServerContext,
    descriptor::DescriptorKind,
    error::ChatError,
    handlers::{dispatch, HandlerCtx},
    session::Session,
};
use std::{process::Stdio, sync::Arc};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    process::{Child, Command},
};

/// Whitespace-split, bounded the same way the original `argv` build was
/// (20 slots including the command name).
fn build_argv(arg_tail: Option<&str>) -> Vec<String> {
    arg_tail
        .map(|t| t.split_whitespace().map(str::to_string).take(19).collect())
        .unwrap_or_default()
}

pub async fn execute(
    server: &Arc<ServerContext>,
    session: &Arc<Session>,
    stages: Vec<PipelineStage>,
) -> Result<i32, ChatError> {
    if stages.is_empty() {
        return Ok(0);
    }

    // A line whose first stage is `name` bypasses the pipeline outright;
    // everything after it is dropped along with the rest of the line.
    if stages[0].command.name() == "name" {
        let ctx = HandlerCtx {
            server: Arc::clone(server),
            session: Arc::clone(session),
        };
        return dispatch(&ctx, "name", stages[0].arg_tail.as_deref()).await;
    }

    let n = stages.len();
    let mut results = vec![0i32; n];
    let mut copy_tasks = Vec::new();
    let mut forward_tasks = Vec::new();
    let mut children: Vec<(usize, Child)> = Vec::new();
    let mut pending_stdout: Option<tokio::process::ChildStdout> = None;

    for (i, stage) in stages.iter().enumerate() {
        if !stage.command.is_external() {
            let ctx = HandlerCtx {
                server: Arc::clone(server),
                session: Arc::clone(session),
            };
            results[i] = dispatch(&ctx, stage.command.name(), stage.arg_tail.as_deref()).await?;
            // Built-ins never consume a neighbour's stdout; a pipe arriving
            // here just dead-ends, same as the original "fresh stdout" rule.
            pending_stdout = None;
            continue;
        }

        let has_external_successor = stages.get(i + 1).map_or(false, |s| s.command.is_external());

        let mut cmd = Command::new(stage.command.fullname());
        cmd.args(build_argv(stage.arg_tail.as_deref()));
        cmd.stdout(Stdio::piped());
        cmd.stdin(if pending_stdout.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });

        let mut child = cmd.spawn().map_err(ChatError::Io)?;

        if let Some(mut prev_stdout) = pending_stdout.take() {
            let mut stdin = child.stdin.take().expect("stdin was piped");
            let entry = server.descriptors.track(None, None, DescriptorKind::Pipe);
            let server = Arc::clone(server);
            copy_tasks.push(tokio::spawn(async move {
                let _ = tokio::io::copy(&mut prev_stdout, &mut stdin).await;
                drop(stdin);
                server.descriptors.close_one(entry);
            }));
        }

        let stdout = child.stdout.take().expect("stdout was piped");
        if has_external_successor {
            pending_stdout = Some(stdout);
        } else {
            let session = Arc::clone(session);
            forward_tasks.push(tokio::spawn(async move {
                let mut lines = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    session.send(line);
                }
            }));
        }

        children.push((i, child));
    }

    for task in copy_tasks {
        let _ = task.await;
    }
    for task in forward_tasks {
        let _ = task.await;
    }
    for (i, mut child) in children {
        let status = child.wait().await.map_err(ChatError::Io)?;
        results[i] = if status.success() { 0 } else { -1 };
    }

    Ok(results[n - 1])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        command::{Command as RegCommand, CommandKind, HandlerContext},
        session::OutboxMsg,
        store::MemoryStore,
    };
    use tokio::sync::mpsc;

    fn ctx_session() -> (Arc<Session>, mpsc::UnboundedReceiver<OutboxMsg>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let session = Arc::new(Session::new(
            "127.0.0.1:1".parse().unwrap(),
            "127.0.0.1:2".parse().unwrap(),
            tx,
        ));
        (session, rx)
    }

    async fn recv_line(rx: &mut mpsc::UnboundedReceiver<OutboxMsg>) -> String {
        match rx.recv().await.unwrap() {
            OutboxMsg::Line(s) | OutboxMsg::Raw(s) => s,
        }
    }

    fn stage_for(name: &str, fullname: &str, external: bool, arg_tail: Option<&str>) -> PipelineStage {
        let kind = if external {
            CommandKind::External
        } else {
            CommandKind::Builtin(HandlerContext::Session)
        };
        PipelineStage {
            command: RegCommand::for_test(name, fullname, kind),
            arg_tail: arg_tail.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn single_external_stage_forwards_output_to_session() {
        let server = Arc::new(ServerContext::new(Default::default(), Box::new(MemoryStore::new())));
        let (session, mut rx) = ctx_session();
        session.set_name("alice").await;

        let stages = vec![stage_for("echo", "/bin/echo", true, Some("hello"))];
        let status = execute(&server, &session, stages).await.unwrap();
        assert_eq!(status, 0);
        assert_eq!(recv_line(&mut rx).await, "hello");
    }

    #[tokio::test]
    async fn name_as_first_stage_bypasses_the_rest_of_the_line() {
        let server = Arc::new(ServerContext::new(Default::default(), Box::new(MemoryStore::new())));
        let (session, mut rx) = ctx_session();
        session.set_name("alice").await;

        let stages = vec![
            stage_for("name", "name", false, Some("bob")),
            stage_for("who", "who", false, None),
        ];
        execute(&server, &session, stages).await.unwrap();
        assert_eq!(session.name().await, "bob");
        assert_eq!(recv_line(&mut rx).await, "Welcome bob!");
        assert!(rx.try_recv().is_err());
    }
}
