//! `listMail`, `sentMail`, `delMail`. Mail is stored as a flat list of
//! 4-tuples `date, time, sender, body` under `<name>.mail`.

use super::{split_first_word, HandlerCtx};
use crate::{error::ChatError, store::Store};
use chrono::Local;

const DELETED_SENTINEL: &str = "\u{0}deleted\u{0}";

pub async fn list_mail(ctx: &HandlerCtx, _arg_tail: Option<&str>) -> Result<i32, ChatError> {
    let key = format!("{}.mail", ctx.session.name().await);
    let raw = ctx.server.store.list_range(&key, 0, -1)?;
    if raw.is_empty() {
        ctx.session.send("no mail");
        return Ok(0);
    }
    for (idx, chunk) in raw.chunks(4).enumerate() {
        if let [date, time, sender, body] = chunk {
            ctx.session.send(format!("{}: {} {} {}: {}", idx, date, time, sender, body));
        }
    }
    Ok(0)
}

pub async fn sent_mail(ctx: &HandlerCtx, arg_tail: Option<&str>) -> Result<i32, ChatError> {
    let (recipient, msg) = split_first_word(arg_tail);
    let recipient = match recipient {
        Some(r) => r,
        None => {
            ctx.session.send("who are you sending mail to?");
            return Ok(0);
        }
    };
    let msg = match msg {
        Some(m) => m,
        None => {
            ctx.session.send("what's the message?");
            return Ok(0);
        }
    };
    if !ctx.server.store.set_is_member("Chatroom", recipient)? {
        ctx.session.send(format!("{} is not a registered user", recipient));
        return Ok(0);
    }
    let sender = ctx.session.name().await;
    let now = Local::now();
    let date = now.format("%Y-%m-%d").to_string();
    let time = now.format("%H:%M:%S").to_string();
    let key = format!("{}.mail", recipient);
    ctx.server
        .store
        .list_push_right(&key, &[&date, &time, &sender, msg])?;
    Ok(0)
}

pub async fn del_mail(ctx: &HandlerCtx, arg_tail: Option<&str>) -> Result<i32, ChatError> {
    let idx: usize = match arg_tail.map(str::trim).and_then(|s| s.parse().ok()) {
        Some(i) => i,
        None => {
            ctx.session.send("which mail?");
            return Ok(0);
        }
    };
    let name = ctx.session.name().await;
    let key = format!("{}.mail", name);
    let len = ctx.server.store.list_range(&key, 0, -1)?.len();
    if idx.saturating_mul(4) + 3 >= len {
        return Ok(0);
    }
    let base = (idx * 4) as i64;
    for offset in 0..4 {
        ctx.server.store.list_set(&key, base + offset, DELETED_SENTINEL)?;
    }
    ctx.server.store.list_remove(&key, 4, DELETED_SENTINEL)?;
    Ok(0)
}
