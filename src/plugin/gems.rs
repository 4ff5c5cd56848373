use crate::{event::*, plugin::*};
use anyhow::{anyhow, Result};
use std::time::Duration;

/// Fetches a random gem (top post of the week) from the configured feed.
pub struct Gems;

const FEED_TIMEOUT: Duration = Duration::from_secs(10);

/// The main frontend sometimes rejects unauthenticated requests that the old one accepts.
const FEED_BASE_URLS: &[&str] = &["https://www.reddit.com", "https://old.reddit.com"];

pub struct Gem {
    pub title: String,
    pub image_url: String,
}

#[derive(serde::Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(serde::Deserialize)]
struct ListingData {
    children: Vec<ListingChild>,
}

#[derive(serde::Deserialize)]
struct ListingChild {
    data: Post,
}

#[derive(serde::Deserialize)]
struct Post {
    #[serde(default)]
    title: String,
    /// Direct media link, when the post's display URL is a crosspost or preview.
    #[serde(default)]
    url_overridden_by_dest: Option<String>,
    #[serde(default)]
    url: String,
}

impl Post {
    fn into_gem(self) -> Gem {
        let image_url = match self.url_overridden_by_dest {
            Some(url) if !url.is_empty() => url,
            _ => self.url,
        };

        Gem {
            title: self.title,
            image_url,
        }
    }
}

#[serenity::async_trait]
impl Plugin for Gems {
    fn name(&self) -> &'static str {
        "gems"
    }

    async fn usage(&self, ctx: &Context<'_>) -> Option<String> {
        let prefix = &ctx.cfg.read().await.general.command_prefix;
        Some(format!(
            "{}{} - fetch a random gem from the feed",
            prefix,
            self.name()
        ))
    }

    async fn handle(&self, ctx: &Context<'_>, event: &Event) -> Result<EventHandled> {
        let Some((msg, _)) = event.is_bot_cmd(ctx, self.name()).await else {
            return Ok(EventHandled::No);
        };

        let (subreddit, user_agent) = {
            let cfg = ctx.cfg.read().await;
            (cfg.gems.subreddit.clone(), cfg.gems.user_agent.clone())
        };

        let gems = fetch_gems(&subreddit, &user_agent).await?;
        if gems.is_empty() {
            msg.reply(ctx.cache_http, "No gems available right now.")
                .await?;
            return Ok(EventHandled::Yes);
        }

        let pick = {
            let mut vstate = ctx.vstate.write().await;
            let sample = vstate.rng.next_uniform();
            ((sample * gems.len() as f64) as usize).min(gems.len() - 1)
        };
        let gem = &gems[pick];

        msg.reply(ctx.cache_http, format!("**{}**\n{}", gem.title, gem.image_url))
            .await?;
        Ok(EventHandled::Yes)
    }
}

async fn fetch_gems(subreddit: &str, user_agent: &str) -> Result<Vec<Gem>> {
    let client = reqwest::Client::builder().timeout(FEED_TIMEOUT).build()?;

    let mut last_status = None;
    for base in FEED_BASE_URLS {
        let url = format!("{}/r/{}/top.json", base, subreddit);
        let response = client
            .get(&url)
            .header(reqwest::header::USER_AGENT, user_agent)
            .header(reqwest::header::ACCEPT, "application/json")
            .query(&[("t", "week"), ("limit", "25")])
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::FORBIDDEN
            || status == reqwest::StatusCode::TOO_MANY_REQUESTS
        {
            last_status = Some(status);
            continue;
        }

        let listing = response.error_for_status()?.json::<Listing>().await?;
        return Ok(parse_gems(listing));
    }

    Err(anyhow!("Feed rejected request: {:?}", last_status))
}

fn parse_gems(listing: Listing) -> Vec<Gem> {
    listing
        .data
        .children
        .into_iter()
        .map(|child| child.data.into_gem())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_parses_and_prefers_destination_url() {
        let raw = r#"{
            "data": {
                "children": [
                    {"data": {"title": "a fine gem", "url_overridden_by_dest": "https://i.example/a.jpg", "url": "https://example/comments/a"}},
                    {"data": {"title": "no override", "url": "https://i.example/b.png"}},
                    {"data": {"title": "empty override", "url_overridden_by_dest": "", "url": "https://i.example/c.gif"}}
                ]
            }
        }"#;

        let gems = parse_gems(serde_json::from_str(raw).unwrap());
        assert_eq!(gems.len(), 3);
        assert_eq!(gems[0].title, "a fine gem");
        assert_eq!(gems[0].image_url, "https://i.example/a.jpg");
        assert_eq!(gems[1].image_url, "https://i.example/b.png");
        assert_eq!(gems[2].image_url, "https://i.example/c.gif");
    }

    #[test]
    fn empty_listing_yields_no_gems() {
        let raw = r#"{"data": {"children": []}}"#;
        let gems = parse_gems(serde_json::from_str(raw).unwrap());
        assert!(gems.is_empty());
    }
}
