use std::sync::Arc;

use diesel::sqlite::SqliteConnection;

use gavel_shared::clients::site::Site;

use crate::ledgers::Ledger;
use crate::rules::Rule;

/// A subreddit as the bot knows it: display name plus the numeric id
/// the audit tables key on.
#[derive(Debug, Clone)]
pub struct SubredditHandle {
    pub name: String,
    pub id: i64,
}

/// Fetches one subreddit's reports and dispatches them to its rules.
pub struct Browser {
    pub subreddit: Arc<SubredditHandle>,
    rules: Vec<Rule>,
    ledgers: Vec<Arc<dyn Ledger>>,
    site: Arc<dyn Site>,
}

impl Browser {
    pub fn new(
        subreddit: Arc<SubredditHandle>,
        rules: Vec<Rule>,
        ledgers: Vec<Arc<dyn Ledger>>,
        site: Arc<dyn Site>,
    ) -> Self {
        Self {
            subreddit,
            rules,
            ledgers,
            site,
        }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// One poll cycle: page through the report queue, feed every report
    /// to every rule, then flush each ledger exactly once.
    ///
    /// A transport failure while paging ends the iteration early;
    /// reports already processed keep their effects, and the ledgers
    /// still flush whatever accumulated.
    pub async fn run(&self, conn: &mut SqliteConnection) {
        let mut after: Option<String> = None;
        loop {
            let page = match self
                .site
                .reports_page(&self.subreddit.name, after.as_deref())
                .await
            {
                Ok(page) => page,
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        subreddit = %self.subreddit.name,
                        "error fetching reports"
                    );
                    break;
                }
            };
            if page.items.is_empty() {
                break;
            }

            for reported in &page.items {
                for report in &reported.reports {
                    for rule in &self.rules {
                        if let Err(e) = rule
                            .parse(&report.reason, &report.moderator, &reported.target, conn)
                            .await
                        {
                            tracing::error!(
                                error = %e,
                                rule = rule.name(),
                                target = %reported.target.id(),
                                "rule pass failed"
                            );
                        }
                    }
                }
            }

            match page.after {
                Some(cursor) => after = Some(cursor),
                None => break,
            }
        }

        for ledger in &self.ledgers {
            ledger.flush().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashSet;

    use diesel::prelude::*;

    use gavel_shared::clients::site::MockSite;
    use gavel_shared::{ModReport, ReportPage, Reported, ThingKind};

    use crate::rules::Trigger;
    use crate::schema::actions;
    use crate::testutil;

    fn handle() -> Arc<SubredditHandle> {
        Arc::new(SubredditHandle {
            name: "testsub".to_string(),
            id: 1234,
        })
    }

    fn approve_rule(site: Arc<dyn Site>) -> Rule {
        let kinds: HashSet<ThingKind> = [ThingKind::Post, ThingKind::Comment].into();
        Rule {
            trigger: Trigger::new(&["foo".to_string()], kinds).unwrap(),
            remove: false,
            lock: false,
            actions: vec![],
            name: "Approve".to_string(),
            details: None,
            site,
            subreddit: handle(),
            dedup_per_moderator: true,
        }
    }

    #[tokio::test]
    async fn dispatches_reports_and_flushes_ledgers() {
        let mut conn = testutil::conn();

        let mut site = MockSite::new();
        site.expect_reports_page().times(1).returning(|_, after| {
            assert!(after.is_none());
            Ok(ReportPage {
                items: vec![Reported {
                    target: testutil::sample_post(),
                    reports: vec![ModReport {
                        reason: "foo".to_string(),
                        moderator: "TGB".to_string(),
                    }],
                }],
                after: None,
            })
        });
        site.expect_approve().times(1).returning(|_| Ok(()));

        let site: Arc<dyn Site> = Arc::new(site);
        let browser = Browser::new(handle(), vec![approve_rule(site.clone())], vec![], site);
        browser.run(&mut conn).await;

        let rows: i64 = actions::table.count().get_result(&mut conn).unwrap();
        assert_eq!(rows, 1);
    }

    #[tokio::test]
    async fn transport_failure_stops_the_cycle_quietly() {
        let mut conn = testutil::conn();

        let mut site = MockSite::new();
        site.expect_reports_page().times(1).returning(|_, _| {
            Err(gavel_shared::ApiError::Rejected {
                endpoint: "/about/reports".into(),
                code: "SERVICE_UNAVAILABLE".into(),
            })
        });

        let site: Arc<dyn Site> = Arc::new(site);
        let browser = Browser::new(handle(), vec![approve_rule(site.clone())], vec![], site);
        browser.run(&mut conn).await;

        let rows: i64 = actions::table.count().get_result(&mut conn).unwrap();
        assert_eq!(rows, 0);
    }
}
