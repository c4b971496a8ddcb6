//! End-to-end protocol tests: each spins up a real `Server` task on an
//! ephemeral port and drives it over an actual `TcpStream`, covering the
//! seed scenarios a faithful re-implementation is expected to satisfy.

mod common;

use chatd::{MemoryStore, Store};
use common::{auth, connect, expect_line, run_collect, run_silent, spawn_with_external_bin, spawn_with_store};

#[tokio::test]
async fn auth_round_trip() {
    let (context, addr) = spawn_with_store(MemoryStore::new()).await;
    let mut alice = connect(addr).await;

    auth(&mut alice, "alice", "pw").await;

    assert!(context.store.set_is_member("Chatroom", "alice").unwrap());
    assert!(context.store.set_is_member("Chatroom.online", "alice").unwrap());
}

#[tokio::test]
async fn rename_preserves_groups() {
    let (context, addr) = spawn_with_store(MemoryStore::new()).await;
    let mut alice = connect(addr).await;
    let mut bob = connect(addr).await;

    auth(&mut alice, "alice", "pw").await;
    auth(&mut bob, "bob", "pw").await;

    run_silent(&mut alice, "alice", "createGroup dev").await;
    run_silent(&mut bob, "bob", "addGroup dev").await;

    // `name` bypasses the rest of the line and prints its own welcome, so
    // the prompt that follows is already under the new identity.
    common::send_line(&mut alice, "name anna").await;
    assert_eq!(expect_line(&mut alice).await, "Welcome anna!");
    common::expect_raw(&mut alice, "anna> ").await;

    assert_eq!(context.store.zset_rank("dev", "anna").unwrap(), Some(0));
    assert_eq!(context.store.zset_rank("dev", "bob").unwrap(), Some(1));
    assert!(context.store.list_range("anna.group", 0, -1).unwrap().contains(&"dev".to_string()));
    assert!(!context.store.set_is_member("Chatroom", "alice").unwrap());
    assert!(context.store.string_get("alice").unwrap().is_none());
}

#[tokio::test]
async fn pipeline_through_external_cat() {
    let (_context, addr) = spawn_with_external_bin().await;
    let mut alice = connect(addr).await;
    auth(&mut alice, "alice", "pw").await;

    let lines = run_collect(&mut alice, "alice", "yell hi | cat", 1).await;
    assert_eq!(lines, vec!["<user:alice      yelled>: hi".to_string()]);
}

#[tokio::test]
async fn owner_succession_on_leave() {
    let (context, addr) = spawn_with_store(MemoryStore::new()).await;
    let mut alice = connect(addr).await;
    let mut bob = connect(addr).await;
    let mut carol = connect(addr).await;

    auth(&mut alice, "alice", "pw").await;
    auth(&mut bob, "bob", "pw").await;
    auth(&mut carol, "carol", "pw").await;

    run_silent(&mut alice, "alice", "createGroup dev").await;
    run_silent(&mut bob, "bob", "addGroup dev").await;
    run_silent(&mut carol, "carol", "addGroup dev").await;

    run_silent(&mut alice, "alice", "leaveGroup dev").await;

    assert_eq!(context.store.zset_rank("dev", "alice").unwrap(), None);
    let successor_is_owner = context.store.zset_rank("dev", "bob").unwrap() == Some(0)
        || context.store.zset_rank("dev", "carol").unwrap() == Some(0);
    assert!(successor_is_owner);
}

#[tokio::test]
async fn tell_offline_user() {
    let (_context, addr) = spawn_with_store(MemoryStore::new()).await;
    let mut alice = connect(addr).await;
    auth(&mut alice, "alice", "pw").await;

    let lines = run_collect(&mut alice, "alice", "tell dave hi", 1).await;
    assert_eq!(lines, vec!["dave is offline, try again later".to_string()]);
}

#[tokio::test]
async fn mail_delete_shifts_remaining_rows() {
    let (_context, addr) = spawn_with_store(MemoryStore::new()).await;

    // bob must be a registered name before alice can mail him.
    let mut bob = connect(addr).await;
    auth(&mut bob, "bob", "pw").await;
    drop(bob);

    let mut alice = connect(addr).await;
    auth(&mut alice, "alice", "pw").await;
    run_silent(&mut alice, "alice", "sentMail bob hello0").await;
    run_silent(&mut alice, "alice", "sentMail bob hello1").await;
    run_silent(&mut alice, "alice", "sentMail bob hello2").await;

    let mut bob = connect(addr).await;
    auth(&mut bob, "bob", "pw").await;
    run_silent(&mut bob, "bob", "delMail 1").await;

    let lines = run_collect(&mut bob, "bob", "listMail", 2).await;
    assert!(lines[0].starts_with("0:"));
    assert!(lines[0].contains("alice"));
    assert!(lines[0].ends_with("hello0"));
    assert!(lines[1].starts_with("1:"));
    assert!(lines[1].ends_with("hello2"));
}
