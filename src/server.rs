//! Server loop.
//!
//! The original design is a single-threaded non-blocking poll over every
//! client socket, built that way so that a single thread could multiplex
//! many slow connections. Tokio's per-task model gets the same fairness
//! (every connection makes progress independently) without hand-rolled
//! `EAGAIN` polling: one task per accepted connection, parked on `read`
//! between commands instead of spinning. The session FSM, prompts, and
//! wire-protocol strings stay the same as the poll-loop design would have
//! produced.

use crate::{
    context::ServerContext,
    descriptor::DescriptorKind,
    error::ChatError,
    pipeline,
    session::{OutboxMsg, Session, SessionState},
    store::Store,
};
use log::{info, trace, warn};
use std::{net::SocketAddr, sync::Arc};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{TcpListener, TcpStream},
    sync::mpsc,
};

pub struct Server {
    context: Arc<ServerContext>,
    listen_addr: SocketAddr,
}

impl Server {
    pub fn new(context: Arc<ServerContext>, listen_addr: SocketAddr) -> Self {
        Self { context, listen_addr }
    }

    pub async fn run(self) -> Result<(), ChatError> {
        let listener = self.bind().await?;
        self.serve(listener).await
    }

    /// Binds the configured listen address and tracks it in the descriptor
    /// registry, without entering the accept loop. Split out from `run` so
    /// tests can bind to an ephemeral port (`:0`) and learn the real address
    /// before connecting clients.
    pub async fn bind(&self) -> Result<TcpListener, ChatError> {
        let listener = TcpListener::bind(self.listen_addr).await.map_err(ChatError::Io)?;
        info!("listening on {}", listener.local_addr().map_err(ChatError::Io)?);
        self.context.descriptors.track(None, None, DescriptorKind::ListenSocket);
        Ok(listener)
    }

    /// Accepts connections from an already-bound listener, one task per
    /// connection, forever.
    pub async fn serve(self, listener: TcpListener) -> Result<(), ChatError> {
        loop {
            let (stream, peer) = listener.accept().await.map_err(ChatError::Io)?;
            let context = Arc::clone(&self.context);
            tokio::spawn(async move {
                if let Err(e) = handle_connection(context, stream, peer).await {
                    warn!("connection {} ended: {}", peer, e);
                }
            });
        }
    }
}

/// Filters to the printable ASCII subset (decimal 32-126), matching the
/// wire protocol's treatment of a name/password line.
fn filter_printable(line: &str) -> String {
    line.trim_end_matches(['\n', '\r'])
        .chars()
        .filter(|c| (*c as u32) >= 32 && (*c as u32) <= 126)
        .collect()
}

async fn run_line(server: &Arc<ServerContext>, session: &Arc<Session>, line: &str) -> Result<i32, ChatError> {
    let stages = pipeline::build(&server.registry, line)?;
    pipeline::execute(server, session, stages).await
}

/// Moves the session to `Ready` then immediately writes the `<name>> `
/// prompt and moves on to `Prompted`: with a blocking per-task read loop
/// there's no observable gap between "ready for input" and "prompt
/// written" the way there was for the original's `EAGAIN`-driven poll.
async fn enter_ready(session: &Arc<Session>) {
    session.set_state(SessionState::Ready).await;
    let name = session.name().await;
    session.prompt(format!("{}> ", name));
    session.set_state(SessionState::Prompted).await;
}

async fn handle_connection(server: Arc<ServerContext>, stream: TcpStream, peer: SocketAddr) -> Result<(), ChatError> {
    let local = stream.local_addr().map_err(ChatError::Io)?;
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    let (tx, mut rx) = mpsc::unbounded_channel::<OutboxMsg>();
    let session = Arc::new(Session::new(peer, local, tx));
    server.roster.add(Arc::clone(&session)).await;
    let client_entry = server.descriptors.track(None, None, DescriptorKind::ClientSocket);

    let writer_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let result = match msg {
                OutboxMsg::Line(s) => {
                    let mut buf = s.into_bytes();
                    buf.push(b'\n');
                    write_half.write_all(&buf).await
                }
                OutboxMsg::Raw(s) => write_half.write_all(s.as_bytes()).await,
            };
            if result.is_err() || write_half.flush().await.is_err() {
                break;
            }
        }
    });

    session.prompt("Who're you: ");
    session.set_state(SessionState::AwaitingName).await;

    let mut line = String::new();
    loop {
        line.clear();
        let n = reader.read_line(&mut line).await.map_err(ChatError::Io)?;
        if n == 0 {
            break;
        }
        let input = filter_printable(&line);
        trace!("{} [{}]: {:?}", peer, session.state().await, input);

        match session.state().await {
            SessionState::AwaitingName => {
                if input.is_empty() {
                    session.prompt("Who're you: ");
                    continue;
                }
                if !server.store.set_is_member("Chatroom", &input)? {
                    server.store.set_add("Chatroom", &input)?;
                }
                session.set_name(&input).await;
                session.prompt("Password: ");
                session.set_state(SessionState::AwaitingPassword).await;
            }
            SessionState::AwaitingPassword => {
                let name = session.name().await;
                let accepted = match server.store.string_get(&name)? {
                    Some(stored) => stored == input,
                    None => {
                        server.store.string_set(&name, &input)?;
                        true
                    }
                };
                if accepted {
                    server.store.set_add("Chatroom.online", &name)?;
                    session.send(format!("Welcome {}!", name));
                    enter_ready(&session).await;
                } else {
                    session.prompt("Password: ");
                }
            }
            SessionState::Ready | SessionState::Prompted => {
                session.set_state(SessionState::Executing).await;
                if let Err(e) = run_line(&server, &session, &input).await {
                    report_local_error(&session, e)?;
                }
                enter_ready(&session).await;
            }
            SessionState::NoName | SessionState::Executing => {}
        }
    }

    let name = session.name().await;
    if !name.is_empty() {
        let _ = server.store.set_remove("Chatroom.online", &name);
    }
    server.roster.close(session.id).await;
    server.descriptors.close_one(client_entry);
    drop(session);
    let _ = writer_task.await;
    Ok(())
}

/// Arity/semantic errors are reported to the caller's own socket and the
/// connection keeps going; anything else (durable store outage, I/O) is
/// fatal to this connection and propagates.
fn report_local_error(session: &Arc<Session>, err: ChatError) -> Result<(), ChatError> {
    match err {
        ChatError::UnknownCommand(name) => {
            session.send(format!("command not found: {} doesn't exit", name));
            Ok(())
        }
        ChatError::NotGroupMember(group) => {
            session.send(format!("not a member of {}", group));
            Ok(())
        }
        ChatError::NotGroupOwner(group) => {
            session.send(format!("not the owner of {}", group));
            Ok(())
        }
        ChatError::Offline(name) => {
            session.send(format!("{} is offline, try again later", name));
            Ok(())
        }
        other => Err(other),
    }
}
