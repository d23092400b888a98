use std::sync::Arc;

use async_trait::async_trait;
use diesel::sqlite::SqliteConnection;

use gavel_shared::clients::site::Site;
use gavel_shared::{AppResult, Target};

use super::Action;

/// Locks posts without necessarily removing them.
pub struct Locker {
    site: Arc<dyn Site>,
}

impl Locker {
    pub fn new(site: Arc<dyn Site>) -> Self {
        Self { site }
    }
}

#[async_trait]
impl Action for Locker {
    async fn act(
        &self,
        target: &Target,
        _moderator: &str,
        _action_id: i32,
        _conn: &mut SqliteConnection,
    ) -> AppResult<()> {
        if let Err(e) = self.site.lock(&target.id()).await {
            tracing::error!(error = %e, target = %target.id(), "failed to lock");
        }
        Ok(())
    }
}
