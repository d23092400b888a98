use std::sync::Arc;

use async_trait::async_trait;
use diesel::sqlite::SqliteConnection;

use gavel_shared::{AppResult, Target};

use super::Action;
use crate::ledgers::AutomodLedger;

/// Appends the post's domain to an AutoModerator placeholder bucket.
pub struct AutomodDomainWatcher {
    placeholder: String,
    ledger: Arc<AutomodLedger>,
}

impl AutomodDomainWatcher {
    pub fn new(placeholder: String, ledger: Arc<AutomodLedger>) -> Self {
        Self { placeholder, ledger }
    }
}

#[async_trait]
impl Action for AutomodDomainWatcher {
    async fn act(
        &self,
        target: &Target,
        _moderator: &str,
        _action_id: i32,
        _conn: &mut SqliteConnection,
    ) -> AppResult<()> {
        let Target::Post(post) = target else {
            return Ok(());
        };
        self.ledger.add(&self.placeholder, post.domain.clone());
        Ok(())
    }
}

/// Appends the target's author to an AutoModerator placeholder bucket.
pub struct AutomodUserWatcher {
    placeholder: String,
    ledger: Arc<AutomodLedger>,
}

impl AutomodUserWatcher {
    pub fn new(placeholder: String, ledger: Arc<AutomodLedger>) -> Self {
        Self { placeholder, ledger }
    }
}

#[async_trait]
impl Action for AutomodUserWatcher {
    async fn act(
        &self,
        target: &Target,
        _moderator: &str,
        _action_id: i32,
        _conn: &mut SqliteConnection,
    ) -> AppResult<()> {
        let Some(author) = target.author() else {
            tracing::warn!(target = %target.id(), "cannot watch a deleted author");
            return Ok(());
        };
        self.ledger.add(&self.placeholder, author.to_string());
        Ok(())
    }
}
