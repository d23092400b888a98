use std::sync::Arc;

use async_trait::async_trait;
use diesel::sqlite::SqliteConnection;

use gavel_shared::clients::site::Site;
use gavel_shared::{AppResult, Target};

use super::Action;
use crate::ledgers::NukeLedger;

/// Enqueues every non-distinguished reply under the target for removal.
///
/// The target itself is untouched. Posts are accepted for configuration
/// compatibility but are a no-op. Removals go through the shared
/// [`NukeLedger`] so one cycle cannot fire an unbounded burst of calls.
pub struct Nuker {
    site: Arc<dyn Site>,
    ledger: Arc<NukeLedger>,
}

impl Nuker {
    pub fn new(site: Arc<dyn Site>, ledger: Arc<NukeLedger>) -> Self {
        Self { site, ledger }
    }
}

#[async_trait]
impl Action for Nuker {
    async fn act(
        &self,
        target: &Target,
        _moderator: &str,
        _action_id: i32,
        _conn: &mut SqliteConnection,
    ) -> AppResult<()> {
        let Target::Comment(comment) = target else {
            return Ok(());
        };

        let tree = match self.site.comment_tree(comment).await {
            Ok(tree) => tree,
            Err(e) => {
                tracing::error!(error = %e, target = %comment.id, "failed to retrieve comment tree");
                return Ok(());
            }
        };

        for reply in tree {
            if reply.distinguished.is_none() {
                self.ledger.add(reply.id);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledgers::Ledger;
    use crate::testutil;
    use gavel_shared::clients::site::MockSite;
    use gavel_shared::Comment;

    fn reply(id: &str, distinguished: Option<&str>) -> Comment {
        Comment {
            id: id.parse().unwrap(),
            author: Some("someone".to_string()),
            body: "reply".to_string(),
            permalink: String::new(),
            submission: "t3_5kgajm".parse().unwrap(),
            distinguished: distinguished.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn enqueues_replies_but_spares_moderator_comments() {
        let mut site = MockSite::new();
        site.expect_comment_tree().times(1).returning(|_| {
            Ok(vec![
                reply("t1_child1", None),
                reply("t1_child2", Some("moderator")),
            ])
        });

        let ledger = Arc::new(NukeLedger::new(Arc::new(MockSite::new())));
        let nuker = Nuker::new(Arc::new(site), ledger.clone());

        let mut conn = testutil::conn();
        nuker
            .act(&testutil::sample_comment(), "TGB", 1, &mut conn)
            .await
            .unwrap();

        assert_eq!(ledger.len(), 1);
    }

    #[tokio::test]
    async fn removes_child_on_flush_and_leaves_target_alone() {
        let mut site = MockSite::new();
        site.expect_comment_tree()
            .times(1)
            .returning(|_| Ok(vec![reply("t1_child1", None)]));

        let mut removal_site = MockSite::new();
        removal_site
            .expect_remove()
            .withf(|id| id.fullname() == "t1_child1")
            .times(1)
            .returning(|_| Ok(()));

        let ledger = Arc::new(NukeLedger::new(Arc::new(removal_site)));
        let nuker = Nuker::new(Arc::new(site), ledger.clone());

        let mut conn = testutil::conn();
        nuker
            .act(&testutil::sample_comment(), "TGB", 1, &mut conn)
            .await
            .unwrap();
        ledger.flush().await;

        assert_eq!(ledger.len(), 0);
    }

    #[tokio::test]
    async fn posts_are_a_no_op() {
        // Neither mock gets expectations; any call panics.
        let ledger = Arc::new(NukeLedger::new(Arc::new(MockSite::new())));
        let nuker = Nuker::new(Arc::new(MockSite::new()), ledger.clone());

        let mut conn = testutil::conn();
        nuker
            .act(&testutil::sample_post(), "TGB", 1, &mut conn)
            .await
            .unwrap();
        assert!(ledger.is_empty());
    }
}
