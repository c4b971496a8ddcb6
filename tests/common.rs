//! Shared harness for the end-to-end tests: starts a real `Server` on an
//! ephemeral port against an in-process `MemoryStore` and drives the wire
//! protocol over an actual `TcpStream`, rather than calling handlers
//! directly.

use chatd::{MemoryStore, Server, ServerContext, Store};
use std::{net::SocketAddr, sync::Arc};
use tokio::{
    io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader},
    net::TcpStream,
};

pub type Conn = BufReader<TcpStream>;

/// Starts a server backed by `store` with every built-in registered and no
/// external binaries. Returns the context (for direct store assertions
/// after the wire exchange) and the address to connect to.
pub async fn spawn_with_store(store: impl Store + 'static) -> (Arc<ServerContext>, SocketAddr) {
    spawn(ServerContext::for_tests(Box::new(store))).await
}

/// Same as `spawn_with_store`, but also scans `/bin` for external binaries
/// so a pipeline stage like `| cat` resolves to a real child process.
pub async fn spawn_with_external_bin() -> (Arc<ServerContext>, SocketAddr) {
    let mut context = ServerContext::for_tests(Box::new(MemoryStore::new()));
    context.registry.register_external("/bin");
    spawn(context).await
}

async fn spawn(context: ServerContext) -> (Arc<ServerContext>, SocketAddr) {
    let context = Arc::new(context);
    let server = Server::new(Arc::clone(&context), "127.0.0.1:0".parse().unwrap());
    let listener = server.bind().await.expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local_addr");
    let _handle = tokio::spawn(server.serve(listener));
    (context, addr)
}

pub async fn connect(addr: SocketAddr) -> Conn {
    BufReader::new(TcpStream::connect(addr).await.expect("connect"))
}

pub async fn expect_raw(io: &mut Conn, text: &str) {
    let mut buf = vec![0u8; text.len()];
    io.read_exact(&mut buf).await.expect("read raw prompt");
    assert_eq!(String::from_utf8(buf).unwrap(), text);
}

pub async fn expect_line(io: &mut Conn) -> String {
    let mut line = String::new();
    io.read_line(&mut line).await.expect("read line");
    assert!(line.ends_with('\n'), "expected newline-terminated line, got {:?}", line);
    line.pop();
    line
}

pub async fn send_line(io: &mut Conn, text: &str) {
    io.write_all(format!("{}\n", text).as_bytes()).await.expect("write line");
}

/// Drives the connect -> name -> password -> Welcome -> prompt handshake.
pub async fn auth(io: &mut Conn, name: &str, password: &str) {
    expect_raw(io, "Who're you: ").await;
    send_line(io, name).await;
    expect_raw(io, "Password: ").await;
    send_line(io, password).await;
    assert_eq!(expect_line(io).await, format!("Welcome {}!", name));
    expect_raw(io, &format!("{}> ", name)).await;
}

/// Sends one command that produces no chat output, then consumes the next
/// prompt (issued under `prompt_name`, which differs from the sender only
/// right after a successful rename).
pub async fn run_silent(io: &mut Conn, prompt_name: &str, cmd: &str) {
    send_line(io, cmd).await;
    expect_raw(io, &format!("{}> ", prompt_name)).await;
}

/// Sends a command, collects exactly `n` output lines, then consumes the
/// next prompt.
pub async fn run_collect(io: &mut Conn, prompt_name: &str, cmd: &str, n: usize) -> Vec<String> {
    send_line(io, cmd).await;
    let mut lines = Vec::with_capacity(n);
    for _ in 0..n {
        lines.push(expect_line(io).await);
    }
    expect_raw(io, &format!("{}> ", prompt_name)).await;
    lines
}
