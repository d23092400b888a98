mod trigger;

pub use trigger::Trigger;

use std::sync::Arc;

use diesel::connection::{AnsiTransactionManager, TransactionManager};
use diesel::sqlite::SqliteConnection;

use gavel_shared::clients::site::Site;
use gavel_shared::{AppResult, Target};

use crate::actions::Action;
use crate::browser::SubredditHandle;
use crate::services::audit;

/// One configured rule: trigger, response actions, and disposition.
///
/// `parse` is the whole per-report state machine: match, dedup, audit
/// log, action fan-out, remove/approve, commit. Remote failures inside
/// the pass are logged and swallowed; database failures roll the pass
/// back as one unit.
pub struct Rule {
    pub(crate) trigger: Trigger,
    pub(crate) remove: bool,
    pub(crate) lock: bool,
    pub(crate) actions: Vec<Box<dyn Action>>,
    pub(crate) name: String,
    pub(crate) details: Option<String>,
    pub(crate) site: Arc<dyn Site>,
    pub(crate) subreddit: Arc<SubredditHandle>,
    pub(crate) dedup_per_moderator: bool,
}

impl Rule {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn parse(
        &self,
        report: &str,
        moderator: &str,
        target: &Target,
        conn: &mut SqliteConnection,
    ) -> AppResult<()> {
        if !self.trigger.matches(report, target) {
            return Ok(());
        }

        // Only act once on a given thing.
        if audit::already_acted(conn, &target.id(), moderator, self.dedup_per_moderator)? {
            return Ok(());
        }

        AnsiTransactionManager::begin_transaction(conn)?;
        match self.execute(moderator, target, conn).await {
            Ok(()) => {
                AnsiTransactionManager::commit_transaction(conn)?;
                Ok(())
            }
            Err(e) => {
                if let Err(rollback) = AnsiTransactionManager::rollback_transaction(conn) {
                    tracing::error!(error = %rollback, "rollback failed");
                }
                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        moderator: &str,
        target: &Target,
        conn: &mut SqliteConnection,
    ) -> AppResult<()> {
        let action_id = audit::log_action(
            conn,
            target,
            moderator,
            self.subreddit.id,
            &self.name,
            self.details.as_deref(),
        )?;

        for action in &self.actions {
            if let Err(e) = action.act(target, moderator, action_id, conn).await {
                tracing::error!(
                    error = %e,
                    rule = %self.name,
                    target = %target.id(),
                    "action failed"
                );
            }
        }

        let id = target.id();
        if self.remove {
            match self.site.remove(&id).await {
                Ok(()) => audit::record_removal(conn, action_id)?,
                Err(e) => tracing::error!(error = %e, target = %id, "failed to remove"),
            }
            if self.lock && target.is_post() {
                if let Err(e) = self.site.lock(&id).await {
                    tracing::error!(error = %e, target = %id, "failed to lock");
                }
            }
        } else if let Err(e) = self.site.approve(&id).await {
            tracing::error!(error = %e, target = %id, "failed to approve");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashSet;

    use diesel::prelude::*;

    use gavel_shared::clients::site::MockSite;
    use gavel_shared::ThingKind;

    use crate::actions::Notifier;
    use crate::schema::{actions, notifications, users};
    use crate::testutil;

    fn handle() -> Arc<SubredditHandle> {
        Arc::new(SubredditHandle {
            name: "testsub".to_string(),
            id: 1234,
        })
    }

    fn rule(site: Arc<dyn Site>, actions: Vec<Box<dyn Action>>, remove: bool, lock: bool) -> Rule {
        let kinds: HashSet<ThingKind> = [ThingKind::Post, ThingKind::Comment].into();
        Rule {
            trigger: Trigger::new(&["foo".to_string()], kinds).unwrap(),
            remove,
            lock,
            actions,
            name: "Remove".to_string(),
            details: None,
            site,
            subreddit: handle(),
            dedup_per_moderator: true,
        }
    }

    #[tokio::test]
    async fn non_matching_report_has_no_side_effects() {
        let mut conn = testutil::conn();
        // No expectations: any remote call panics the test.
        let site = Arc::new(MockSite::new());
        let r = rule(site, vec![], true, false);

        r.parse("unrelated report", "TGB", &testutil::sample_post(), &mut conn)
            .await
            .unwrap();

        let rows: i64 = actions::table.count().get_result(&mut conn).unwrap();
        assert_eq!(rows, 0);
    }

    #[tokio::test]
    async fn acting_twice_logs_once() {
        let mut conn = testutil::conn();
        let mut site = MockSite::new();
        site.expect_remove().times(1).returning(|_| Ok(()));
        let r = rule(Arc::new(site), vec![], true, false);

        let post = testutil::sample_post();
        r.parse("foo", "TGB", &post, &mut conn).await.unwrap();
        r.parse("foo", "TGB", &post, &mut conn).await.unwrap();

        let rows: i64 = actions::table.count().get_result(&mut conn).unwrap();
        assert_eq!(rows, 1);
    }

    #[tokio::test]
    async fn remove_lock_notify_scenario() {
        let mut conn = testutil::conn();
        let mut site = MockSite::new();
        site.expect_reply()
            .withf(|parent, text| {
                parent.fullname() == "t3_5kgajm"
                    && text.contains("A notification")
                    && text.contains("I am a bot")
                    && text.contains("contact the moderators")
            })
            .times(1)
            .returning(|_, _| Ok("t1_newreply".parse().unwrap()));
        site.expect_distinguish()
            .withf(|id, sticky| id.fullname() == "t1_newreply" && *sticky)
            .times(1)
            .returning(|_, _| Ok(()));
        site.expect_remove()
            .withf(|id| id.fullname() == "t3_5kgajm")
            .times(1)
            .returning(|_| Ok(()));
        site.expect_lock()
            .withf(|id| id.fullname() == "t3_5kgajm")
            .times(1)
            .returning(|_| Ok(()));

        let site: Arc<dyn Site> = Arc::new(site);
        let notify: Box<dyn Action> = Box::new(Notifier::new(
            "A notification".to_string(),
            site.clone(),
            "testsub".to_string(),
            "https://www.reddit.com".to_string(),
        ));
        let r = rule(site, vec![notify], true, true);

        r.parse("foo", "TGB", &testutil::sample_post(), &mut conn)
            .await
            .unwrap();

        let summaries: Vec<String> = actions::table
            .select(actions::action_summary)
            .load(&mut conn)
            .unwrap();
        assert_eq!(summaries, vec!["Remove".to_string()]);

        let note_count: i64 = notifications::table.count().get_result(&mut conn).unwrap();
        assert_eq!(note_count, 1);
    }

    #[tokio::test]
    async fn comment_is_approved_not_locked() {
        let mut conn = testutil::conn();
        let mut site = MockSite::new();
        site.expect_approve().times(1).returning(|_| Ok(()));
        let r = rule(Arc::new(site), vec![], false, true);

        r.parse("foo", "TGB", &testutil::sample_comment(), &mut conn)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn deleted_author_gets_sentinel_row() {
        let mut conn = testutil::conn();
        let mut site = MockSite::new();
        site.expect_approve().returning(|_| Ok(()));
        let r = rule(Arc::new(site), vec![], false, false);

        let mut target = testutil::sample_post();
        if let Target::Post(ref mut p) = target {
            p.author = None;
        }
        r.parse("foo", "TGB", &target, &mut conn).await.unwrap();

        let names: Vec<String> = users::table.select(users::username).load(&mut conn).unwrap();
        assert!(names.contains(&"[deleted]".to_string()));
    }

    #[tokio::test]
    async fn disposition_failure_keeps_audit_row() {
        let mut conn = testutil::conn();
        let mut site = MockSite::new();
        site.expect_remove().times(1).returning(|_| {
            Err(gavel_shared::ApiError::Rejected {
                endpoint: "/api/remove".into(),
                code: "SERVICE_UNAVAILABLE".into(),
            })
        });
        let r = rule(Arc::new(site), vec![], true, false);

        r.parse("foo", "TGB", &testutil::sample_post(), &mut conn)
            .await
            .unwrap();

        let rows: i64 = actions::table.count().get_result(&mut conn).unwrap();
        assert_eq!(rows, 1);
    }
}
