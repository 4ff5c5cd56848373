use crate::event::EventHandled;
use anyhow::Result;

pub use crate::context::Context;

mod chud;
mod debug;
mod gems;
mod help;
mod ignore_bots;
mod memory;
mod ready;

#[serenity::async_trait]
pub trait Plugin: Sync + Send {
    /// Plugin name.  Used for debug and command matching
    fn name(&self) -> &'static str;
    /// Help message line.  None if no help message
    async fn usage(&self, ctx: &Context<'_>) -> Option<String>;
    /// Potentially handle event.  Returns:
    /// - Ok(EventHandled::Yes) if the event has been handled and no other plugin should attempt to
    ///   handle it
    /// - Ok(EventHandled::No) if another plugin should attempt to handle the event
    /// - Err if an error occurred
    async fn handle(&self, ctx: &Context<'_>, event: &crate::event::Event) -> Result<EventHandled>;
}

/// Ordered list of available plugins
pub fn plugins() -> Vec<Box<dyn Plugin>> {
    use crate::plugin::*;

    vec![
        // Core bot operations
        Box::new(debug::Debug),
        Box::new(ready::Ready),
        Box::new(ignore_bots::IgnoreBots),
        // Recording must happen before anything that might act on the message, so a
        // just-posted message is already part of its author's history.
        Box::new(memory::Memory),
        Box::new(help::Help),
        // Side features
        Box::new(gems::Gems),
        // The callout protocol.  Keep last so explicit commands above always win.
        Box::new(chud::Chud),
    ]
}
