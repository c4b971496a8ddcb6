//! `who`, `tell`, `yell`.

use super::{split_first_word, HandlerCtx};
use crate::{error::ChatError, store::Store};

pub async fn who(ctx: &HandlerCtx, _arg_tail: Option<&str>) -> Result<i32, ChatError> {
    ctx.session.send(format!(" {:<15}{:<15}", "<name>", "<IP:port>"));
    for s in ctx.server.roster.all().await {
        let marker = if s.id == ctx.session.id { '*' } else { ' ' };
        let name = s.name().await;
        // The original calls getsockname (not getpeername) per session, so
        // every row shows that connection's *local* socket address.
        ctx.session.send(format!("{}{:<15}{}", marker, name, s.local_addr));
    }
    let offline = ctx.server.store.set_diff("Chatroom", "Chatroom.online")?;
    for name in offline {
        ctx.session.send(format!("  {}  offline:-1", name));
    }
    Ok(0)
}

pub async fn tell(ctx: &HandlerCtx, arg_tail: Option<&str>) -> Result<i32, ChatError> {
    let (target, msg) = split_first_word(arg_tail);
    let target = match target {
        Some(t) => t,
        None => {
            ctx.session.send("who are you telling?");
            return Ok(0);
        }
    };
    let msg = match msg {
        Some(m) => m,
        None => {
            ctx.session.send("what are you telling?");
            return Ok(0);
        }
    };
    match ctx.server.roster.find_by_name(target).await {
        Some(recipient) => {
            let from = ctx.session.name().await;
            recipient.send(format!("<user:{:<10} told you>: {}", from, msg));
            Ok(0)
        }
        None => {
            ctx.session.send(format!("{} is offline, try again later", target));
            Ok(0)
        }
    }
}

pub async fn yell(ctx: &HandlerCtx, arg_tail: Option<&str>) -> Result<i32, ChatError> {
    let msg = match arg_tail.map(str::trim).filter(|s| !s.is_empty()) {
        Some(m) => m,
        None => {
            ctx.session.send("what are you yelling?");
            return Ok(0);
        }
    };
    let from = ctx.session.name().await;
    let line = format!("<user:{:<10} yelled>: {}", from, msg);
    for s in ctx.server.roster.all().await {
        s.send(line.clone());
    }
    Ok(0)
}
