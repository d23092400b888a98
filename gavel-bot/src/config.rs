use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// Seconds between poll cycles.
    #[serde(default = "default_poll_secs")]
    pub poll_secs: u64,
    /// Refresh subreddit/moderator metadata every this many cycles.
    #[serde(default = "default_refresh_cycles")]
    pub refresh_cycles: u32,
    /// Scope the already-acted check to the reporting moderator, not
    /// just the target.
    #[serde(default = "default_dedup")]
    pub dedup_per_moderator: bool,
    #[serde(default = "default_api_url")]
    pub reddit_api_url: String,
    /// Public site URL used in user-facing links.
    #[serde(default = "default_public_url")]
    pub reddit_public_url: String,
    /// OAuth bearer token; acquiring and refreshing it is out of scope.
    #[serde(default)]
    pub reddit_token: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Optional Discord webhook that receives ERROR-level log events.
    #[serde(default)]
    pub discord_webhook: Option<String>,
    #[serde(default = "default_health_port")]
    pub health_port: u16,
}

fn default_poll_secs() -> u64 { 30 }
fn default_refresh_cycles() -> u32 { 20 }
fn default_dedup() -> bool { true }
fn default_api_url() -> String { "https://oauth.reddit.com".into() }
fn default_public_url() -> String { "https://www.reddit.com".into() }
fn default_user_agent() -> String {
    format!("gavel-bot/{} (moderation automation)", env!("CARGO_PKG_VERSION"))
}
fn default_health_port() -> u16 { 3010 }

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("GAVEL").separator("__"))
            .build()?;
        Ok(config.try_deserialize()?)
    }
}
