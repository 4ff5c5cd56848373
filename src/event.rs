//! The Serenity crate we're using for the Discord API is designed around callbacks to handle
//! events.  However, this does not mesh well with our plugin framework here.  To resolve this,
//! this module translates the callbacks to a distinct Event enum.

use crate::context::Context;
use serenity::all::{Message, Ready};

/// A Discord event
pub enum Event {
    Ready(Ready),
    Message(Message),
}

impl Event {
    // When an event occurs, iterate over all the plugins to see if any can/should handle it.
    //
    // This is also the outermost per-event error boundary: a plugin error is logged and the
    // remaining plugins still run, so no single event can take down the dispatch loop.
    pub async fn handle(self, ctx: Context<'_>) {
        for plugin in crate::plugin::plugins() {
            match plugin.handle(&ctx, &self).await {
                Ok(EventHandled::Yes) => return,
                Ok(EventHandled::No) => continue,
                Err(err) => eprintln!("Error in plugin {}: {}", plugin.name(), err),
            }
        }
    }

    // Check if a message should be interpreted as a special bot command.
    //
    // These are prefixed with the configured command prefix, e.g. `!cmd foo bar baz`.  Returns
    // the message and the argument remainder after the command token.
    pub async fn is_bot_cmd<'e>(
        &'e self,
        ctx: &Context<'_>,
        name: &str,
    ) -> Option<(&'e Message, &'e str)> {
        let Event::Message(msg) = self else {
            return None;
        };

        let cmd = {
            let cfg = ctx.cfg.read().await;
            format!("{}{}", cfg.general.command_prefix, name)
        };

        let content = msg.content.trim_start();
        if content.split_ascii_whitespace().next() != Some(cmd.as_str()) {
            return None;
        }

        Some((msg, content[cmd.len()..].trim_start()))
    }
}

pub enum EventHandled {
    Yes,
    No,
}
