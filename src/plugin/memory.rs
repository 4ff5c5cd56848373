use crate::{event::*, helper::*, plugin::*};
use anyhow::Result;

/// Records every user message into the rolling channel memory.
///
/// Runs unconditionally for every non-bot message and never consumes the event, so the
/// callout decision further down the pipeline always sees a buffer that already includes
/// the message being decided on.
pub struct Memory;

#[serenity::async_trait]
impl Plugin for Memory {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn usage(&self, _ctx: &Context<'_>) -> Option<String> {
        None
    }

    async fn handle(&self, ctx: &Context<'_>, event: &Event) -> Result<EventHandled> {
        let Event::Message(msg) = event else {
            return Ok(EventHandled::No);
        };

        let author_name = msg.author.nick_in_guild(ctx, msg.guild_id).await;
        let content = msg.human_format_content(ctx).await?;
        let capacity = ctx.cfg.read().await.memory.scope_max_message_count;

        ctx.vstate
            .write()
            .await
            .memory
            .record(msg.channel_id, author_name, content, capacity);

        Ok(EventHandled::No)
    }
}
