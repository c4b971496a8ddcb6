//! `Groups`, `listGroup`, `createGroup`, `delGroup`, `addGroup`,
//! `leaveGroup`, `kickUser`, `gyell`.

use super::{split_first_word, HandlerCtx};
use crate::{
    error::ChatError,
    store::{MEMBER_SCORE, OWNER_SCORE, Store},
};

pub async fn groups(ctx: &HandlerCtx, _arg_tail: Option<&str>) -> Result<i32, ChatError> {
    for g in ctx.server.store.set_members("Chatroom.group")? {
        ctx.session.send(g);
    }
    Ok(0)
}

pub async fn list_group(ctx: &HandlerCtx, _arg_tail: Option<&str>) -> Result<i32, ChatError> {
    let key = format!("{}.group", ctx.session.name().await);
    for g in ctx.server.store.list_range(&key, 0, -1)? {
        ctx.session.send(g);
    }
    Ok(0)
}

pub async fn create_group(ctx: &HandlerCtx, arg_tail: Option<&str>) -> Result<i32, ChatError> {
    let g = match arg_tail.map(str::trim).filter(|s| !s.is_empty()) {
        Some(g) => g,
        None => {
            ctx.session.send("name the group");
            return Ok(0);
        }
    };
    if ctx.server.store.set_is_member("Chatroom.group", g)? {
        ctx.session.send(format!("{} already exists", g));
        return Ok(0);
    }
    let caller = ctx.session.name().await;
    ctx.server.store.set_add("Chatroom.group", g)?;
    ctx.server.store.zset_add(g, OWNER_SCORE, &caller)?;
    ctx.server
        .store
        .list_push_right(&format!("{}.group", caller), &[g])?;
    Ok(0)
}

/// Shared by the `delGroup` handler and `leaveGroup`'s delegation when a
/// group shrinks below two members.
fn delete_group(store: &dyn Store, g: &str) -> Result<(), ChatError> {
    let members = store.zset_range(g, 0, -1)?;
    store.set_remove("Chatroom.group", g)?;
    for m in &members {
        store.list_remove(&format!("{}.group", m), 0, g)?;
    }
    store.key_delete(&[g])?;
    Ok(())
}

pub async fn del_group(ctx: &HandlerCtx, arg_tail: Option<&str>) -> Result<i32, ChatError> {
    let g = match arg_tail.map(str::trim).filter(|s| !s.is_empty()) {
        Some(g) => g,
        None => {
            ctx.session.send("name the group");
            return Ok(0);
        }
    };
    let caller = ctx.session.name().await;
    if ctx.server.store.zset_rank(g, &caller)? != Some(0) {
        return Err(ChatError::NotGroupOwner(g.to_string()));
    }
    delete_group(ctx.server.store.as_ref(), g)?;
    Ok(0)
}

pub async fn add_group(ctx: &HandlerCtx, arg_tail: Option<&str>) -> Result<i32, ChatError> {
    let g = match arg_tail.map(str::trim).filter(|s| !s.is_empty()) {
        Some(g) => g,
        None => {
            ctx.session.send("name the group");
            return Ok(0);
        }
    };
    let caller = ctx.session.name().await;
    let inserted = ctx.server.store.zset_add(g, MEMBER_SCORE, &caller)?;
    if inserted {
        ctx.server
            .store
            .list_push_right(&format!("{}.group", caller), &[g])?;
    }
    Ok(0)
}

pub async fn leave_group(ctx: &HandlerCtx, arg_tail: Option<&str>) -> Result<i32, ChatError> {
    let g = match arg_tail.map(str::trim).filter(|s| !s.is_empty()) {
        Some(g) => g,
        None => {
            ctx.session.send("name the group");
            return Ok(0);
        }
    };
    let caller = ctx.session.name().await;
    let store = ctx.server.store.as_ref();
    let caller_rank = store.zset_rank(g, &caller)?;
    if caller_rank.is_none() {
        ctx.session.send(format!("you aren't in {}", g));
        return Ok(0);
    }
    let members = store.zset_range(g, 0, -1)?;
    if members.len() <= 2 {
        delete_group(store, g)?;
        return Ok(0);
    }
    if caller_rank == Some(0) {
        if let Some(successor) = members.iter().find(|m| *m != &caller) {
            store.zset_add(g, OWNER_SCORE, successor)?;
        }
    }
    store.zset_remove(g, &caller)?;
    store.list_remove(&format!("{}.group", caller), 0, g)?;
    Ok(0)
}

pub async fn kick_user(ctx: &HandlerCtx, arg_tail: Option<&str>) -> Result<i32, ChatError> {
    let (group, rest) = split_first_word(arg_tail);
    let g = match group {
        Some(g) => g,
        None => {
            ctx.session.send("name the group");
            return Ok(0);
        }
    };
    let caller = ctx.session.name().await;
    let store = ctx.server.store.as_ref();
    if store.zset_rank(g, &caller)? != Some(0) {
        return Err(ChatError::NotGroupOwner(g.to_string()));
    }
    let targets: Vec<&str> = rest.map(|r| r.split_whitespace().collect()).unwrap_or_default();
    if targets.is_empty() {
        ctx.session.send("kick who?");
        return Ok(0);
    }
    for user in targets {
        store.zset_remove(g, user)?;
        store.list_remove(&format!("{}.group", user), 0, g)?;
    }
    Ok(0)
}

pub async fn gyell(ctx: &HandlerCtx, arg_tail: Option<&str>) -> Result<i32, ChatError> {
    let (group, msg) = split_first_word(arg_tail);
    let g = match group {
        Some(g) => g,
        None => {
            ctx.session.send("yell to which group?");
            return Ok(0);
        }
    };
    let msg = match msg {
        Some(m) => m,
        None => {
            ctx.session.send("what are you yelling?");
            return Ok(0);
        }
    };
    let caller = ctx.session.name().await;
    if ctx.server.store.zset_rank(g, &caller)?.is_none() {
        return Err(ChatError::NotGroupMember(g.to_string()));
    }
    let line = format!("<user:{:<10} yelled>: {}", caller, msg);
    for member in ctx.server.store.zset_range(g, 0, -1)? {
        if let Some(s) = ctx.server.roster.find_by_name(&member).await {
            s.send(line.clone());
        }
    }
    Ok(0)
}
