use crate::{
    event::*, helper::*, llm::JudgementRequest, log_event, logging::PrintColor, plugin::*,
    provision, trigger,
};
use anyhow::Result;
use serenity::all::UserId;

/// The callout protocol: decide, judge, reply, punish.
///
/// Each message runs the sequence independently; the rolling memory is the only state that
/// outlives an event.  A judgement or reply failure aborts the run before any punishment is
/// applied, while punishment failures are consumed inside the provisioner.
pub struct Chud;

#[serenity::async_trait]
impl Plugin for Chud {
    fn name(&self) -> &'static str {
        "chud"
    }

    async fn usage(&self, ctx: &Context<'_>) -> Option<String> {
        let prefix = &ctx.cfg.read().await.general.command_prefix;
        Some(format!(
            "{}{} @user - call out the mentioned user",
            prefix,
            self.name()
        ))
    }

    async fn handle(&self, ctx: &Context<'_>, event: &Event) -> Result<EventHandled> {
        let Event::Message(msg) = event else {
            return Ok(EventHandled::No);
        };

        // Roles and threads only exist in guilds; DMs never trigger the protocol.
        if msg.guild_id.is_none() {
            return Ok(EventHandled::No);
        }

        let (command, threshold) = {
            let cfg = ctx.cfg.read().await;
            (
                format!("{}{}", cfg.general.command_prefix, self.name()),
                cfg.chud.threshold,
            )
        };

        let mentions: Vec<UserId> = msg.mentions.iter().map(|user| user.id).collect();
        let trigger = {
            let mut vstate = ctx.vstate.write().await;
            trigger::decide(
                &msg.content,
                &command,
                &mentions,
                msg.author.id,
                threshold,
                vstate.rng.as_mut(),
            )
        };
        let Some(trigger) = trigger else {
            return Ok(EventHandled::No);
        };

        // The manual target is always among the mentions; the random target is the author.
        let target = msg
            .mentions
            .iter()
            .find(|user| user.id == trigger.target)
            .cloned()
            .unwrap_or_else(|| msg.author.clone());

        log_event!(
            "Callout ({}) targeting {}",
            trigger.kind.reason(),
            target.color(),
        );

        // Snapshot before the slow generation call; messages arriving while we wait must not
        // change the transcript being judged.
        let transcript = ctx.vstate.read().await.memory.snapshot(msg.channel_id);
        let target_name = target.nick_in_guild(ctx, msg.guild_id).await;

        let request = {
            let cfg = ctx.cfg.read().await;
            JudgementRequest::new(
                &cfg.judgement.as_llm_settings(),
                &target_name,
                trigger.kind,
                &transcript,
            )
        };

        let typing = msg.channel_id.start_typing(ctx.http);
        let verdict = request.post(ctx).await;
        typing.stop();

        // A failed judgement aborts the run: no reply, no punishment.
        let verdict = verdict?;

        // A failed reply likewise stops short of punishment.
        msg.channel_id.say(ctx.cache_http, &verdict).await?;

        // The verdict has landed; punishment failures are logged inside and never bubble up.
        provision::punish(ctx, msg, &target).await;

        Ok(EventHandled::Yes)
    }
}
