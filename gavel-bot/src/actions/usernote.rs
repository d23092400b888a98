use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use diesel::sqlite::SqliteConnection;

use gavel_shared::{AppResult, Target};

use super::Action;
use crate::ledgers::{UserNote, UsernoteLedger};

/// Records a Moderator Toolbox usernote for the target's author.
///
/// Notes are buffered in the shared [`UsernoteLedger`] and written to
/// the wiki once per cycle.
pub struct ToolboxNoteAdder {
    text: String,
    level: String,
    ledger: Arc<UsernoteLedger>,
}

impl ToolboxNoteAdder {
    pub fn new(text: String, level: String, ledger: Arc<UsernoteLedger>) -> Self {
        Self {
            text,
            level,
            ledger,
        }
    }

    /// The target's URL compressed into Toolbox's link shorthand.
    fn toolbox_link(target: &Target) -> String {
        match target {
            Target::Post(p) => format!("l,{}", p.id.base36()),
            Target::Comment(c) => {
                format!("l,{},{}", c.submission.base36(), c.id.base36())
            }
        }
    }
}

#[async_trait]
impl Action for ToolboxNoteAdder {
    async fn act(
        &self,
        target: &Target,
        moderator: &str,
        _action_id: i32,
        _conn: &mut SqliteConnection,
    ) -> AppResult<()> {
        self.ledger.add(UserNote {
            author: target.author_or_deleted().to_string(),
            level: self.level.clone(),
            link: Self::toolbox_link(target),
            moderator: moderator.to_string(),
            text: self.text.clone(),
            time: Utc::now().timestamp(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledgers::UsernoteLedger;
    use crate::testutil;
    use gavel_shared::clients::site::MockSite;

    #[tokio::test]
    async fn buffers_a_note_with_toolbox_link() {
        let ledger = Arc::new(UsernoteLedger::new(
            Arc::new(MockSite::new()),
            "testsub".to_string(),
        ));
        let adder = ToolboxNoteAdder::new(
            "spam warning".to_string(),
            "ban".to_string(),
            ledger.clone(),
        );

        let mut conn = testutil::conn();
        adder
            .act(&testutil::sample_comment(), "TGB", 1, &mut conn)
            .await
            .unwrap();

        let pending = ledger.pending();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].author, "BJO_test_mod");
        assert_eq!(pending[0].link, "l,5kgajm,dbnq46o");
        assert_eq!(pending[0].moderator, "TGB");
    }

    #[test]
    fn post_links_omit_the_comment_part() {
        assert_eq!(
            ToolboxNoteAdder::toolbox_link(&testutil::sample_post()),
            "l,5kgajm"
        );
    }
}
