//! `name` (rename). Run in the caller's own task rather than handed off
//! to a pipeline stage elsewhere, since it mutates roster identity and
//! every durable key other handlers assume stable for the duration of a
//! command.

use super::HandlerCtx;
use crate::{
    error::ChatError,
    store::{Store, MEMBER_SCORE, OWNER_SCORE},
};

pub async fn rename(ctx: &HandlerCtx, arg_tail: Option<&str>) -> Result<i32, ChatError> {
    let new = match arg_tail.map(str::trim).filter(|s| !s.is_empty()) {
        Some(n) => n.to_string(),
        None => {
            ctx.session.send("what do you want to be called?");
            return Ok(0);
        }
    };
    let old = ctx.session.name().await;

    if ctx.server.store.set_is_member("Chatroom", &new)? {
        ctx.session.send("User name exist, Please change");
        return Ok(0);
    }
    ctx.server.store.set_add("Chatroom", &new)?;

    let old_groups_key = format!("{}.group", old);
    let new_groups_key = format!("{}.group", new);
    let groups = ctx.server.store.list_range(&old_groups_key, 0, -1)?;
    for g in &groups {
        let rank = ctx.server.store.zset_rank(g, &old)?;
        let score = if rank == Some(0) { OWNER_SCORE } else { MEMBER_SCORE };
        ctx.server.store.zset_add(g, score, &new)?;
        ctx.server.store.zset_remove(g, &old)?;
    }
    if !groups.is_empty() {
        let refs: Vec<&str> = groups.iter().map(String::as_str).collect();
        ctx.server.store.list_push_right(&new_groups_key, &refs)?;
    }

    ctx.server.store.set_add("Chatroom.online", &new)?;
    ctx.server.store.set_remove("Chatroom.online", &old)?;
    ctx.server.store.set_remove("Chatroom", &old)?;
    ctx.server
        .store
        .key_delete(&[old.as_str(), &old_groups_key, &format!("{}.mail", old)])?;

    ctx.session.set_name(&new).await;
    ctx.session.send(format!("Welcome {}!", new));
    Ok(0)
}
