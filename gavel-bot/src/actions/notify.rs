use std::sync::Arc;

use async_trait::async_trait;
use diesel::sqlite::SqliteConnection;

use gavel_shared::clients::site::Site;
use gavel_shared::{ApiError, AppResult, Target};

use super::Action;
use crate::services::audit;

/// Replies to the target, distinguishes the reply, and stickies it when
/// the target is a top-level post.
pub struct Notifier {
    text: String,
    site: Arc<dyn Site>,
    subreddit: String,
    public_url: String,
}

impl Notifier {
    pub fn new(text: String, site: Arc<dyn Site>, subreddit: String, public_url: String) -> Self {
        Self {
            text,
            site,
            subreddit,
            public_url,
        }
    }

    /// Footer identifying the bot as such.
    fn footer(&self, permalink: &str) -> String {
        let escaped_url = urlencoding::encode(&format!("{}{}", self.public_url, permalink))
            .into_owned();
        let modmail_link = format!(
            "{base_url}/message/compose?to=%2Fr%2F{subreddit}\
             &message=Post%20in%20question:%20{escaped_url}",
            base_url = self.public_url,
            subreddit = self.subreddit,
        );

        format!(
            "\n\n-----\n\nI am a bot. Please do not reply to this message, as \
             it will go unread. Instead, [contact the moderators]({modmail_link}) \
             with questions or comments."
        )
    }
}

#[async_trait]
impl Action for Notifier {
    async fn act(
        &self,
        target: &Target,
        _moderator: &str,
        action_id: i32,
        conn: &mut SqliteConnection,
    ) -> AppResult<()> {
        let text = format!("{}{}", self.text, self.footer(target.permalink()));

        let reply_id = match self.site.reply(&target.id(), &text).await {
            Ok(id) => id,
            Err(ApiError::TooOldToReply) => {
                tracing::info!(target = %target.id(), "too old to reply");
                return Ok(());
            }
            Err(e) => {
                tracing::error!(error = %e, target = %target.id(), "failed to add comment");
                return Ok(());
            }
        };

        if let Err(e) = self.site.distinguish(&reply_id, target.is_post()).await {
            tracing::error!(error = %e, comment = %reply_id, "failed to distinguish reply");
        }

        audit::record_notification(conn, reply_id.id, action_id)?;
        Ok(())
    }
}
