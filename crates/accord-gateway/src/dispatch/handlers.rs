//! Dispatch handlers
//!
//! Registry-phase handlers: hydrate entities from the payload, write them
//! into the session's guild index and the cache, and report an outcome.
//! Handlers never do I/O and never touch connection state; the internal
//! protocol handlers (chunk accounting, voice joins, bootstrap) live in
//! the session loop.

use accord_cache::{keys, CachePool};
use accord_core::{Channel, Guild, GuildMember, Presence, PrivateChannel, Snowflake, User};
use serde_json::{json, Value};

use super::HandlerOutcome;
use crate::events::names;
use crate::session::{GuildRecord, SessionState};

/// Run the handler for a dispatch event
///
/// Events without entity side effects pass their payload through
/// unchanged so consumers still receive them.
pub fn handle(
    name: &str,
    state: &mut SessionState,
    cache: &dyn CachePool,
    data: &Value,
) -> HandlerOutcome {
    match name {
        names::GUILD_CREATE => guild_create(state, cache, data),
        names::GUILD_UPDATE => guild_update(state, cache, data),
        names::GUILD_DELETE => guild_delete(state, cache, data),
        names::GUILD_MEMBER_ADD => guild_member_add(state, cache, data),
        names::GUILD_MEMBER_UPDATE => guild_member_update(state, cache, data),
        names::GUILD_MEMBER_REMOVE => guild_member_remove(state, cache, data),
        names::PRESENCE_UPDATE => presence_update(state, cache, data),
        names::CHANNEL_CREATE | names::CHANNEL_UPDATE => channel_upsert(state, cache, data),
        names::CHANNEL_DELETE => channel_delete(state, cache, data),
        names::USER_UPDATE => user_update(state, cache, data),
        _ => HandlerOutcome::Success(data.clone()),
    }
}

/// Hydrate a guild, or report it unavailable
///
/// Also used by the READY bootstrap, which replays every guild stub in
/// the payload through this handler.
pub fn guild_create(
    state: &mut SessionState,
    cache: &dyn CachePool,
    data: &Value,
) -> HandlerOutcome {
    let guild: Guild = match serde_json::from_value(data.clone()) {
        Ok(g) => g,
        Err(e) => return HandlerOutcome::Failure(format!("bad GUILD_CREATE payload: {e}")),
    };

    if guild.unavailable {
        return HandlerOutcome::Notify(json!({ "guild_id": guild.id, "unavailable": true }));
    }

    let record = GuildRecord::from_guild(guild);
    let guild_id = record.guild.id;

    // Guilds with truncated member lists queue for chunk backfill unless
    // a request is already in flight
    if (record.guild.large || !record.members_complete()) && !state.large_sent.contains(&guild_id) {
        state.large_guilds.insert(guild_id);
    }

    cache.put(&keys::guild(guild_id), data.clone());
    for member in record.members.values() {
        cache.put(
            &keys::guild_member(guild_id, member.user.id),
            serde_json::to_value(member).unwrap_or_default(),
        );
        cache.put(
            &keys::user(member.user.id),
            serde_json::to_value(&member.user).unwrap_or_default(),
        );
    }

    state.guilds.insert(guild_id, record);
    HandlerOutcome::Success(data.clone())
}

fn guild_update(state: &mut SessionState, cache: &dyn CachePool, data: &Value) -> HandlerOutcome {
    let update: Guild = match serde_json::from_value(data.clone()) {
        Ok(g) => g,
        Err(e) => return HandlerOutcome::Failure(format!("bad GUILD_UPDATE payload: {e}")),
    };

    if let Some(record) = state.guilds.get_mut(&update.id) {
        // Partial update: channels and members are not re-delivered
        record.guild.name = update.name;
        record.guild.icon = update.icon;
        if update.owner_id.is_some() {
            record.guild.owner_id = update.owner_id;
        }
        cache.put(&keys::guild(update.id), data.clone());
    }
    HandlerOutcome::Success(data.clone())
}

fn guild_delete(state: &mut SessionState, cache: &dyn CachePool, data: &Value) -> HandlerOutcome {
    let Some(guild_id) = id_field(data, "id") else {
        return HandlerOutcome::Failure("GUILD_DELETE missing id".to_string());
    };

    state.guilds.remove(&guild_id);
    state.large_guilds.remove(&guild_id);
    state.large_sent.remove(&guild_id);
    cache.remove(&keys::guild(guild_id));
    HandlerOutcome::Success(data.clone())
}

fn guild_member_add(
    state: &mut SessionState,
    cache: &dyn CachePool,
    data: &Value,
) -> HandlerOutcome {
    let member: GuildMember = match serde_json::from_value(data.clone()) {
        Ok(m) => m,
        Err(e) => return HandlerOutcome::Failure(format!("bad GUILD_MEMBER_ADD payload: {e}")),
    };
    let Some(guild_id) = member.guild_id else {
        return HandlerOutcome::Failure("GUILD_MEMBER_ADD missing guild_id".to_string());
    };

    if let Some(record) = state.guilds.get_mut(&guild_id) {
        record.member_count += 1;
        cache.put(
            &keys::guild_member(guild_id, member.user.id),
            serde_json::to_value(&member).unwrap_or_default(),
        );
        cache.put(
            &keys::user(member.user.id),
            serde_json::to_value(&member.user).unwrap_or_default(),
        );
        record.members.insert(member.user.id, member);
    }
    HandlerOutcome::Success(data.clone())
}

fn guild_member_update(
    state: &mut SessionState,
    cache: &dyn CachePool,
    data: &Value,
) -> HandlerOutcome {
    let update: GuildMember = match serde_json::from_value(data.clone()) {
        Ok(m) => m,
        Err(e) => return HandlerOutcome::Failure(format!("bad GUILD_MEMBER_UPDATE payload: {e}")),
    };
    let Some(guild_id) = update.guild_id else {
        return HandlerOutcome::Failure("GUILD_MEMBER_UPDATE missing guild_id".to_string());
    };

    if let Some(record) = state.guilds.get_mut(&guild_id) {
        if let Some(member) = record.members.get_mut(&update.user.id) {
            // Presence is carried by PRESENCE_UPDATE, not here
            member.user = update.user;
            member.nick = update.nick;
            member.roles = update.roles;
            cache.put(
                &keys::guild_member(guild_id, member.user.id),
                serde_json::to_value(&*member).unwrap_or_default(),
            );
        }
    }
    HandlerOutcome::Success(data.clone())
}

fn guild_member_remove(
    state: &mut SessionState,
    cache: &dyn CachePool,
    data: &Value,
) -> HandlerOutcome {
    let Some(guild_id) = id_field(data, "guild_id") else {
        return HandlerOutcome::Failure("GUILD_MEMBER_REMOVE missing guild_id".to_string());
    };
    let Some(user_id) = data
        .get("user")
        .and_then(|u| u.get("id"))
        .and_then(parse_id)
    else {
        return HandlerOutcome::Failure("GUILD_MEMBER_REMOVE missing user".to_string());
    };

    if let Some(record) = state.guilds.get_mut(&guild_id) {
        if record.members.remove(&user_id).is_some() {
            record.member_count = record.member_count.saturating_sub(1);
        }
        cache.remove(&keys::guild_member(guild_id, user_id));
    }
    HandlerOutcome::Success(data.clone())
}

fn presence_update(
    state: &mut SessionState,
    cache: &dyn CachePool,
    data: &Value,
) -> HandlerOutcome {
    let presence: Presence = match serde_json::from_value(data.clone()) {
        Ok(p) => p,
        Err(e) => return HandlerOutcome::Failure(format!("bad PRESENCE_UPDATE payload: {e}")),
    };
    let Some(guild_id) = presence.guild_id else {
        // DM presence carries no guild; nothing to hydrate
        return HandlerOutcome::Success(data.clone());
    };

    if let Some(record) = state.guilds.get_mut(&guild_id) {
        if let Some(member) = record.members.get_mut(&presence.user.id) {
            member.status = presence.status;
            member.game = presence.game;
            cache.put(
                &keys::guild_member(guild_id, presence.user.id),
                serde_json::to_value(&*member).unwrap_or_default(),
            );
        }
    }
    HandlerOutcome::Success(data.clone())
}

fn channel_upsert(state: &mut SessionState, cache: &dyn CachePool, data: &Value) -> HandlerOutcome {
    // DM channels have no guild_id and land in the private index
    if data.get("guild_id").map_or(true, Value::is_null) {
        let private: PrivateChannel = match serde_json::from_value(data.clone()) {
            Ok(c) => c,
            Err(e) => return HandlerOutcome::Failure(format!("bad channel payload: {e}")),
        };
        if let Some(recipient) = private.recipient() {
            cache.put(&keys::private_channel(recipient.id), data.clone());
        }
        state.private_channels.insert(private.id, private);
        return HandlerOutcome::Success(data.clone());
    }

    let channel: Channel = match serde_json::from_value(data.clone()) {
        Ok(c) => c,
        Err(e) => return HandlerOutcome::Failure(format!("bad channel payload: {e}")),
    };
    let Some(guild_id) = channel.guild_id else {
        return HandlerOutcome::Success(data.clone());
    };

    if let Some(record) = state.guilds.get_mut(&guild_id) {
        match record.guild.channels.iter_mut().find(|c| c.id == channel.id) {
            Some(existing) => *existing = channel,
            None => record.guild.channels.push(channel),
        }
    }
    HandlerOutcome::Success(data.clone())
}

fn channel_delete(state: &mut SessionState, cache: &dyn CachePool, data: &Value) -> HandlerOutcome {
    let Some(channel_id) = id_field(data, "id") else {
        return HandlerOutcome::Failure("CHANNEL_DELETE missing id".to_string());
    };

    if let Some(guild_id) = id_field(data, "guild_id") {
        if let Some(record) = state.guilds.get_mut(&guild_id) {
            record.guild.channels.retain(|c| c.id != channel_id);
        }
    } else if let Some(private) = state.private_channels.remove(&channel_id) {
        if let Some(recipient) = private.recipient() {
            cache.remove(&keys::private_channel(recipient.id));
        }
    }
    HandlerOutcome::Success(data.clone())
}

fn user_update(state: &mut SessionState, cache: &dyn CachePool, data: &Value) -> HandlerOutcome {
    let user: User = match serde_json::from_value(data.clone()) {
        Ok(u) => u,
        Err(e) => return HandlerOutcome::Failure(format!("bad USER_UPDATE payload: {e}")),
    };
    cache.put(&keys::user(user.id), data.clone());
    state.me = Some(user);
    HandlerOutcome::Success(data.clone())
}

fn id_field(data: &Value, field: &str) -> Option<Snowflake> {
    data.get(field).and_then(parse_id)
}

fn parse_id(value: &Value) -> Option<Snowflake> {
    serde_json::from_value(value.clone()).ok()
}
