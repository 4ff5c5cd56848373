mod config;
mod context;
mod event;
mod handler;
mod helper;
mod llm;
mod logging;
mod memory;
mod plugin;
mod provision;
mod trigger;
mod volatile_state;

use serenity::{all::GatewayIntents, Client};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = crate::config::Config::load().await?;
    let token = cfg.general.discord_token.clone();
    let vstate = crate::volatile_state::VolatileState::new(Box::new(trigger::ThreadRngSource));
    let handler = handler::Handler::new(cfg, vstate);

    // Things we want discord to tell us about.
    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MEMBERS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    Client::builder(&token, intents)
        .event_handler(handler)
        .await?
        .start()
        .await
        .map_err(Into::into)
}
