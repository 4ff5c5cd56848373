//! Idempotent provisioning of the punishment role and containment thread.
//!
//! Discord is the source of truth for punishment state.  Every run reconciles against what
//! the platform currently holds, so "already exists" and "already a member" are success
//! conditions rather than errors, and two overlapping runs for the same target converge on
//! the same end state.

use crate::{context::Context, log_event, log_internal, logging::PrintColor};
use anyhow::{anyhow, Result};
use serenity::all::{
    ChannelId, Colour, CreateThread, EditRole, EditThread, GuildId, Mentionable, Message, Role,
    RoleId, User,
};
use serenity::http::HttpError;
use std::collections::HashMap;

const CONTAINMENT_GREETING: &str = "Ur a big fat chud. Get chudzoned.";

enum ProvisionFailure {
    PermissionDenied,
    Transient,
}

/// Apply the punishment role and containment thread to `target`.
///
/// The two steps run independently and their failures are classified, logged, and consumed
/// here: by the time provisioning starts, the verdict has already been delivered, so nothing
/// from this module may propagate into the event loop.
pub async fn punish(ctx: &Context<'_>, msg: &Message, target: &User) {
    if let Err(err) = ensure_role(ctx, msg, target).await {
        report("role", &err);
    }
    if let Err(err) = ensure_thread(ctx, msg, target).await {
        report("thread", &err);
    }
}

fn report(step: &str, err: &anyhow::Error) {
    match classify(err) {
        ProvisionFailure::PermissionDenied => log_internal!(
            "Punishment {} step refused: missing Discord permission ({})",
            step,
            err,
        ),
        ProvisionFailure::Transient => log_internal!("Punishment {} step failed: {}", step, err),
    }
}

fn classify(err: &anyhow::Error) -> ProvisionFailure {
    if let Some(serenity::Error::Http(HttpError::UnsuccessfulRequest(response))) =
        err.downcast_ref::<serenity::Error>()
    {
        if response.status_code == serenity::http::StatusCode::FORBIDDEN {
            return ProvisionFailure::PermissionDenied;
        }
    }
    ProvisionFailure::Transient
}

/// Ensure the punishment role exists and the target holds it.
async fn ensure_role(ctx: &Context<'_>, msg: &Message, target: &User) -> Result<()> {
    let guild_id = msg
        .guild_id
        .ok_or_else(|| anyhow!("punishment requires a guild"))?;
    let role_name = ctx.cfg.read().await.chud.role_name.clone();

    let roles = guild_id.roles(ctx.http).await?;
    let role_id = match roles.values().find(|role| role.name == role_name) {
        Some(role) => role.id,
        None => {
            let role = guild_id
                .create_role(
                    ctx.http,
                    EditRole::new()
                        .name(role_name.as_str())
                        .colour(Colour::DARK_GOLD),
                )
                .await?;
            log_event!("Created role \"{}\"", role_name);

            // Advisory only: reordering needs a role above the one being moved, which the
            // server may not have granted us.
            if let Err(err) = reposition_below_self(ctx, guild_id, &roles, role.id).await {
                log_internal!("Could not reposition role \"{}\": {}", role_name, err);
            }

            role.id
        }
    };

    let member = guild_id.member(ctx.cache_http, target.id).await?;
    if !member.roles.contains(&role_id) {
        member.add_role(ctx.http, role_id).await?;
        log_event!("Granted \"{}\" to {}", role_name, target.color());
    }

    Ok(())
}

/// Move a freshly created role directly below our own highest role.
async fn reposition_below_self(
    ctx: &Context<'_>,
    guild_id: GuildId,
    roles: &HashMap<RoleId, Role>,
    role_id: RoleId,
) -> Result<()> {
    let bot_id = ctx.cache.current_user().id;
    let bot_member = guild_id.member(ctx.cache_http, bot_id).await?;
    let top = bot_member
        .roles
        .iter()
        .filter_map(|id| roles.get(id))
        .map(|role| role.position)
        .max()
        .ok_or_else(|| anyhow!("bot holds no roles"))?;

    guild_id
        .edit_role(
            ctx.http,
            role_id,
            EditRole::new().position(top.saturating_sub(1)),
        )
        .await?;

    Ok(())
}

/// Ensure the containment thread exists, holds the target, and confronts them.
///
/// Resolution order: an active thread with the configured name under the triggering channel,
/// then a bounded scan of recently archived threads (revived rather than duplicated), then a
/// new thread started from the triggering message.
async fn ensure_thread(ctx: &Context<'_>, msg: &Message, target: &User) -> Result<()> {
    let guild_id = msg
        .guild_id
        .ok_or_else(|| anyhow!("punishment requires a guild"))?;
    let (thread_name, scan_limit) = {
        let cfg = ctx.cfg.read().await;
        (
            cfg.chud.thread_name.clone(),
            cfg.chud.archived_thread_scan_limit,
        )
    };

    let thread_id = match find_active_thread(ctx, guild_id, msg.channel_id, &thread_name).await? {
        Some(id) => id,
        None => match revive_archived_thread(ctx, msg.channel_id, &thread_name, scan_limit).await?
        {
            Some(id) => id,
            None => {
                let thread = msg
                    .channel_id
                    .create_thread_from_message(
                        ctx.http,
                        msg.id,
                        CreateThread::new(thread_name.as_str()),
                    )
                    .await?;
                log_event!("Created containment thread \"{}\"", thread_name);
                thread.id
            }
        },
    };

    // Re-adding an existing member is a no-op on Discord's side.
    thread_id.add_thread_member(ctx.http, target.id).await?;
    thread_id
        .say(
            ctx.cache_http,
            format!("{} {}", target.mention(), CONTAINMENT_GREETING),
        )
        .await?;
    log_event!(
        "{} confronted in \"{}\"",
        target.color(),
        thread_name,
    );

    Ok(())
}

async fn find_active_thread(
    ctx: &Context<'_>,
    guild_id: GuildId,
    parent: ChannelId,
    name: &str,
) -> Result<Option<ChannelId>> {
    let active = guild_id.get_active_threads(ctx.http).await?;
    Ok(active
        .threads
        .iter()
        .find(|thread| thread.parent_id == Some(parent) && thread.name == name)
        .map(|thread| thread.id))
}

/// Scan the most recently archived public threads for a name match and unarchive it.
async fn revive_archived_thread(
    ctx: &Context<'_>,
    parent: ChannelId,
    name: &str,
    scan_limit: u64,
) -> Result<Option<ChannelId>> {
    let archived = parent
        .get_archived_public_threads(ctx.http, None, Some(scan_limit))
        .await?;

    let Some(thread) = archived.threads.iter().find(|thread| thread.name == name) else {
        return Ok(None);
    };

    thread
        .id
        .edit_thread(ctx.http, EditThread::new().archived(false))
        .await?;
    log_event!("Revived archived containment thread \"{}\"", name);

    Ok(Some(thread.id))
}
