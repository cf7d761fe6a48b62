//! CLI-specific configuration for the console frontend.
use std::env;

#[derive(Clone, Debug)]
pub struct CliConfig {
    pub prompt: String,
    /// Messages shown by the `status` command.
    pub status_messages: usize,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            prompt: "battles> ".to_string(),
            status_messages: 5,
        }
    }
}

impl CliConfig {
    /// Environment variables:
    /// - `CLI_PROMPT` - Prompt string (default: `battles> `)
    /// - `CLI_STATUS_MESSAGES` - Recent messages in `status` (default: 5)
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(prompt) = env::var("CLI_PROMPT") {
            config.prompt = prompt;
        }
        if let Some(count) = read_env::<usize>("CLI_STATUS_MESSAGES") {
            config.status_messages = count;
        }

        config
    }
}

fn read_env<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    env::var(key).ok()?.parse().ok()
}
