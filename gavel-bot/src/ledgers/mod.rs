mod automod;
mod nuke;
mod usernotes;

pub use automod::AutomodLedger;
pub use nuke::NukeLedger;
pub use usernotes::{UserNote, UsernoteLedger};

use std::sync::Arc;

use async_trait::async_trait;

use gavel_shared::clients::site::Site;
use gavel_shared::{AppResult, WikiWriteError};

/// How many conflicting saves of one wiki page to tolerate per flush
/// before giving up and leaving the buffer for the next cycle.
pub const MAX_SAVE_ATTEMPTS: u32 = 5;

/// A buffer of deferred side effects, flushed once per browser cycle.
///
/// Flushing must clear only what was actually applied remotely; on
/// failure the buffered entries stay queued.
#[async_trait]
pub trait Ledger: Send + Sync {
    async fn flush(&self);
}

/// Read-modify-write a wiki page with optimistic-concurrency retry.
///
/// On a conflicting save the server hands back the content and revision
/// that won; the transform is reapplied to that fresh content without
/// another fetch. A transform error (e.g. a schema mismatch) aborts
/// immediately.
pub(crate) async fn update_wiki<F>(
    site: &dyn Site,
    subreddit: &str,
    page: &str,
    transform: F,
) -> AppResult<()>
where
    F: Fn(&str) -> AppResult<String>,
{
    let fetched = site.read_wiki(subreddit, page).await?;
    let mut content = fetched.content;
    let mut revision = fetched.revision;

    for attempt in 1..=MAX_SAVE_ATTEMPTS {
        let updated = transform(&content)?;
        match site.write_wiki(subreddit, page, &updated, Some(&revision)).await {
            Ok(()) => return Ok(()),
            Err(WikiWriteError::Conflict {
                content: fresh,
                revision: new_revision,
            }) => {
                tracing::debug!(page, attempt, "wiki edit conflict; retrying on fresh revision");
                content = fresh;
                revision = new_revision;
            }
            Err(WikiWriteError::Api(e)) => return Err(e.into()),
        }
    }

    Err(anyhow::anyhow!("gave up on {page} after {MAX_SAVE_ATTEMPTS} conflicting saves").into())
}

/// Hands out one shared ledger instance per kind for a subreddit's
/// configuration, so that every rule referencing the same concern
/// converges on a single flush per cycle.
pub struct LedgerSet {
    site: Arc<dyn Site>,
    subreddit: String,
    nuke: Option<Arc<NukeLedger>>,
    usernotes: Option<Arc<UsernoteLedger>>,
    automod: Option<Arc<AutomodLedger>>,
}

impl LedgerSet {
    pub fn new(site: Arc<dyn Site>, subreddit: &str) -> Self {
        Self {
            site,
            subreddit: subreddit.to_string(),
            nuke: None,
            usernotes: None,
            automod: None,
        }
    }

    pub fn nuke(&mut self) -> Arc<NukeLedger> {
        self.nuke
            .get_or_insert_with(|| Arc::new(NukeLedger::new(self.site.clone())))
            .clone()
    }

    pub fn usernotes(&mut self) -> Arc<UsernoteLedger> {
        self.usernotes
            .get_or_insert_with(|| {
                Arc::new(UsernoteLedger::new(self.site.clone(), self.subreddit.clone()))
            })
            .clone()
    }

    pub fn automod(&mut self) -> Arc<AutomodLedger> {
        self.automod
            .get_or_insert_with(|| {
                Arc::new(AutomodLedger::new(self.site.clone(), self.subreddit.clone()))
            })
            .clone()
    }

    pub fn into_ledgers(self) -> Vec<Arc<dyn Ledger>> {
        let mut ledgers: Vec<Arc<dyn Ledger>> = Vec::new();
        if let Some(ledger) = self.nuke {
            ledgers.push(ledger);
        }
        if let Some(ledger) = self.usernotes {
            ledgers.push(ledger);
        }
        if let Some(ledger) = self.automod {
            ledgers.push(ledger);
        }
        ledgers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gavel_shared::clients::site::{MockSite, WikiPage};

    #[tokio::test]
    async fn ledger_set_returns_shared_instances() {
        let mut set = LedgerSet::new(Arc::new(MockSite::new()), "testsub");
        let a = set.nuke();
        let b = set.nuke();
        assert!(Arc::ptr_eq(&a, &b));
        let _ = set.usernotes();
        assert_eq!(set.into_ledgers().len(), 2);
    }

    #[tokio::test]
    async fn conflict_reapplies_transform_to_fresh_content() {
        let mut site = MockSite::new();
        site.expect_read_wiki().times(1).returning(|_, _| {
            Ok(WikiPage {
                content: "one".to_string(),
                revision: "rev1".to_string(),
            })
        });

        let mut seq = mockall::Sequence::new();
        site.expect_write_wiki()
            .withf(|_, _, content, previous| content == "one!" && *previous == Some("rev1"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _, _| {
                Err(WikiWriteError::Conflict {
                    content: "two".to_string(),
                    revision: "rev2".to_string(),
                })
            });
        site.expect_write_wiki()
            .withf(|_, _, content, previous| content == "two!" && *previous == Some("rev2"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _, _| Ok(()));

        update_wiki(&site, "testsub", "usernotes", |content| {
            Ok(format!("{content}!"))
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn sustained_conflict_gives_up_after_the_cap() {
        let mut site = MockSite::new();
        site.expect_read_wiki().times(1).returning(|_, _| {
            Ok(WikiPage {
                content: "one".to_string(),
                revision: "rev1".to_string(),
            })
        });
        site.expect_write_wiki()
            .times(MAX_SAVE_ATTEMPTS as usize)
            .returning(|_, _, _, _| {
                Err(WikiWriteError::Conflict {
                    content: "fresh".to_string(),
                    revision: "next".to_string(),
                })
            });

        let result = update_wiki(&site, "testsub", "usernotes", |c| Ok(c.to_string())).await;
        assert!(result.is_err());
    }
}
