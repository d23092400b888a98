use std::sync::Arc;

use async_trait::async_trait;
use diesel::sqlite::SqliteConnection;

use gavel_shared::clients::site::{BanRequest, Site};
use gavel_shared::{AppResult, Target};

use super::Action;

/// Platform limit on the ban-reason field.
const MAX_REASON_CHARS: usize = 300;

pub struct Banner {
    message: String,
    reason: String,
    duration: Option<i32>,
    site: Arc<dyn Site>,
    subreddit: String,
}

impl Banner {
    pub fn new(
        message: String,
        reason: String,
        duration: Option<i32>,
        site: Arc<dyn Site>,
        subreddit: String,
    ) -> Self {
        Self {
            message,
            reason,
            duration,
            site,
            subreddit,
        }
    }

    /// Footer identifying the target that led to the ban.
    fn footer(target: &Target) -> String {
        format!(
            "\n\nThis action was taken because of the following {}: {}",
            target.kind().noun(),
            urlencoding::encode(target.permalink())
        )
    }
}

#[async_trait]
impl Action for Banner {
    async fn act(
        &self,
        target: &Target,
        moderator: &str,
        _action_id: i32,
        _conn: &mut SqliteConnection,
    ) -> AppResult<()> {
        let Some(author) = target.author() else {
            tracing::warn!(target = %target.id(), "cannot ban a deleted author");
            return Ok(());
        };

        let ban = BanRequest {
            message: format!("{}{}", self.message, Self::footer(target)),
            reason: truncate_chars(&format!("{} - by {}", self.reason, moderator), MAX_REASON_CHARS)
                .to_string(),
            duration: self.duration,
        };
        if let Err(e) = self.site.ban(&self.subreddit, author, &ban).await {
            tracing::error!(error = %e, author, "failed to ban");
        }
        Ok(())
    }
}

fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((index, _)) => &s[..index],
        None => s,
    }
}
