use crate::llm::LlmSettings;
use anyhow::{anyhow, Result};
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::io::AsyncReadExt;

const CONFIG_PATH_REL_HOME: &str = ".config/chudbot/config.toml";

/// Default system prompt for the judgement model.
const DEFAULT_JUDGEMENT_SYSTEM: &str = "\
You are the 'Chud-Slayer', an elite judge of online behavior. \
Your task is to identify why a user is acting like a 'chud' based on their chat history. \
When triggered, you must deliver a single, devastatingly sarcastic sentence. \
STRUCTURE: Start with '[Username] is a big fat chud who [specific reason based on history].' \
Be extremely hyperbolic, rude, and specific to the text provided. \
If they are talking about games, roast their gaming. If they are whining about code, roast their skills. \
Keep it to ONE punchy paragraph. \
Intentionally include errors in capitalization, abbreviations such as 'u' / 'ur' instead of 'you' / 'your', \
'stfu' instead of 'shut the fuck up', etc. and omit some punctuation. Never use em dashes.";

/// Bot configuration
///
/// Every field has a default so the config file is optional; the recognized
/// environment variables below override whatever the file provided.
#[derive(Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: General,
    pub memory: Memory,
    pub chud: Chud,
    pub llm_general: LlmGeneral,
    pub judgement: Judgement,
    pub gems: Gems,
}

#[derive(serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct General {
    pub discord_token: String,
    pub command_prefix: String,
}

impl Default for General {
    fn default() -> Self {
        Self {
            discord_token: String::new(),
            command_prefix: "!".to_owned(),
        }
    }
}

#[derive(serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Memory {
    pub scope_max_message_count: usize,
}

impl Default for Memory {
    fn default() -> Self {
        Self {
            scope_max_message_count: 20,
        }
    }
}

#[derive(serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Chud {
    /// Probability in [0, 1) that any given message triggers a callout.
    pub threshold: f64,
    pub role_name: String,
    pub thread_name: String,
    /// How many of the most recently archived threads to scan when looking
    /// for a containment thread to revive.
    pub archived_thread_scan_limit: u64,
}

impl Default for Chud {
    fn default() -> Self {
        Self {
            threshold: 0.05,
            role_name: "Certified Chud".to_owned(),
            thread_name: "chud-containment-zone".to_owned(),
            archived_thread_scan_limit: 25,
        }
    }
}

#[derive(serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct LlmGeneral {
    pub chat_url: String,
    pub request_timeout_seconds: u64,
}

impl Default for LlmGeneral {
    fn default() -> Self {
        Self {
            chat_url: "http://localhost:11434/api/chat".to_owned(),
            request_timeout_seconds: 30,
        }
    }
}

#[derive(Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Judgement {
    pub model_name: String,
    pub system: String,
    pub context_size: usize,
    pub temperature: f32,
}

impl Default for Judgement {
    fn default() -> Self {
        Self {
            model_name: "llama3.1".to_owned(),
            system: DEFAULT_JUDGEMENT_SYSTEM.to_owned(),
            context_size: 4096,
            temperature: 0.8,
        }
    }
}

#[derive(serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Gems {
    pub subreddit: String,
    pub user_agent: String,
}

impl Default for Gems {
    fn default() -> Self {
        Self {
            subreddit: "kitchencels".to_owned(),
            user_agent: "desktop:chudbot:0.1 (unauthenticated)".to_owned(),
        }
    }
}

impl Config {
    fn config_path() -> Result<PathBuf> {
        dirs::home_dir()
            .map(|p| p.join(CONFIG_PATH_REL_HOME))
            .ok_or(anyhow!("Could not find home directory"))
    }

    pub async fn load() -> Result<Self> {
        let path = Self::config_path()?;

        let mut config = match tokio::fs::File::open(&path).await {
            Ok(mut file) => {
                let mut contents = String::new();
                file.read_to_string(&mut contents).await.map_err(|e| {
                    anyhow!(
                        "Could not read configuration at `{}`: {}",
                        path.to_string_lossy(),
                        e
                    )
                })?;

                toml::from_str(&contents).map_err(|e| {
                    anyhow!(
                        "Could not parse configuration at `{}`: {}",
                        path.to_string_lossy(),
                        e
                    )
                })?
            }
            // No file is fine; the environment can supply everything we need.
            Err(e) if e.kind() == ErrorKind::NotFound => Config::default(),
            Err(e) => {
                return Err(anyhow!(
                    "Could not open configuration at `{}`: {}",
                    path.to_string_lossy(),
                    e
                ))
            }
        };

        config.apply_env_overrides()?;

        if config.general.discord_token.is_empty() {
            return Err(anyhow!(
                "No Discord token: set DISCORD_TOKEN or `general.discord_token` in `{}`",
                path.to_string_lossy()
            ));
        }

        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(token) = var("DISCORD_TOKEN") {
            self.general.discord_token = token;
        }
        if let Some(threshold) = var("CHUD_THRESHOLD") {
            self.chud.threshold = threshold
                .parse()
                .map_err(|e| anyhow!("Could not parse CHUD_THRESHOLD `{}`: {}", threshold, e))?;
        }
        if let Some(size) = var("MEMORY_SIZE") {
            self.memory.scope_max_message_count = size
                .parse()
                .map_err(|e| anyhow!("Could not parse MEMORY_SIZE `{}`: {}", size, e))?;
        }
        if let Some(name) = var("CHUD_ROLE_NAME") {
            self.chud.role_name = name;
        }
        if let Some(name) = var("CHUD_THREAD_NAME") {
            self.chud.thread_name = name;
        }
        Ok(())
    }
}

impl<'a> Judgement {
    pub fn as_llm_settings(&'a self) -> LlmSettings<'a> {
        LlmSettings {
            model_name: &self.model_name,
            system: &self.system,
            context_size: self.context_size,
            temperature: self.temperature,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_are_sane() {
        let config = Config::default();
        assert_eq!(config.general.command_prefix, "!");
        assert_eq!(config.memory.scope_max_message_count, 20);
        assert!(config.chud.threshold > 0.0 && config.chud.threshold < 1.0);
        assert_eq!(config.chud.role_name, "Certified Chud");
        assert_eq!(config.chud.thread_name, "chud-containment-zone");
    }

    #[test]
    fn env_overrides_replace_file_values() {
        let mut config = Config::default();
        let env: HashMap<&str, &str> = [
            ("DISCORD_TOKEN", "token-from-env"),
            ("CHUD_THRESHOLD", "0.25"),
            ("MEMORY_SIZE", "5"),
            ("CHUD_ROLE_NAME", "Village Idiot"),
            ("CHUD_THREAD_NAME", "idiot-corner"),
        ]
        .into_iter()
        .collect();

        config
            .apply_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.general.discord_token, "token-from-env");
        assert_eq!(config.chud.threshold, 0.25);
        assert_eq!(config.memory.scope_max_message_count, 5);
        assert_eq!(config.chud.role_name, "Village Idiot");
        assert_eq!(config.chud.thread_name, "idiot-corner");
    }

    #[test]
    fn absent_env_leaves_config_untouched() {
        let mut config = Config::default();
        config.apply_overrides(|_| None).unwrap();
        assert_eq!(config.chud.threshold, Config::default().chud.threshold);
    }

    #[test]
    fn malformed_numeric_override_errors() {
        let mut config = Config::default();
        let result = config.apply_overrides(|key| {
            (key == "CHUD_THRESHOLD").then(|| "not-a-float".to_owned())
        });
        assert!(result.is_err());
    }

    #[test]
    fn empty_config_file_parses_to_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.memory.scope_max_message_count, 20);
        assert_eq!(config.chud.role_name, "Certified Chud");
    }
}
