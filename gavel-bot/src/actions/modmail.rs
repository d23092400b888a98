use std::sync::Arc;

use async_trait::async_trait;
use diesel::sqlite::SqliteConnection;

use gavel_shared::clients::site::Site;
use gavel_shared::{AppResult, Target};

use super::Action;

/// Sends modmail to the target's author, with the sender hidden.
pub struct Modmailer {
    subject: String,
    body: String,
    site: Arc<dyn Site>,
    subreddit: String,
}

impl Modmailer {
    pub fn new(subject: String, body: String, site: Arc<dyn Site>, subreddit: String) -> Self {
        Self {
            subject,
            body,
            site,
            subreddit,
        }
    }
}

#[async_trait]
impl Action for Modmailer {
    async fn act(
        &self,
        target: &Target,
        _moderator: &str,
        _action_id: i32,
        _conn: &mut SqliteConnection,
    ) -> AppResult<()> {
        let Some(author) = target.author() else {
            tracing::warn!(target = %target.id(), "cannot modmail a deleted author");
            return Ok(());
        };

        if let Err(e) = self
            .site
            .send_modmail(&self.subreddit, author, &self.subject, &self.body)
            .await
        {
            tracing::error!(error = %e, target = %target.id(), "failed to send modmail");
        }
        Ok(())
    }
}
