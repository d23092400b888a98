use async_trait::async_trait;

use crate::errors::{ApiError, WikiWriteError};
use crate::types::{Comment, ReportPage, ThingId};

#[derive(Debug, Clone, PartialEq)]
pub struct BanRequest {
    pub message: String,
    pub reason: String,
    /// Days; permanent when absent.
    pub duration: Option<i32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WikiPage {
    pub content: String,
    pub revision: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubredditInfo {
    pub id: ThingId,
    pub display_name: String,
    pub subscribers: i64,
}

/// The platform operations the bot orchestrates.
///
/// The production implementation is [`super::reddit::RedditClient`]; the
/// `testing` feature exposes a mockall mock for consumers' tests.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait Site: Send + Sync {
    /// One page of the subreddit's moderator-report queue.
    async fn reports_page<'a>(
        &self,
        subreddit: &str,
        after: Option<&'a str>,
    ) -> Result<ReportPage, ApiError>;

    async fn remove(&self, id: &ThingId) -> Result<(), ApiError>;

    async fn approve(&self, id: &ThingId) -> Result<(), ApiError>;

    async fn lock(&self, id: &ThingId) -> Result<(), ApiError>;

    async fn ban(&self, subreddit: &str, user: &str, ban: &BanRequest)
        -> Result<(), ApiError>;

    /// Reply to a post or comment; returns the new comment's id.
    async fn reply(&self, parent: &ThingId, text: &str) -> Result<ThingId, ApiError>;

    async fn distinguish(&self, id: &ThingId, sticky: bool) -> Result<(), ApiError>;

    async fn send_modmail(
        &self,
        subreddit: &str,
        recipient: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), ApiError>;

    /// The comment's reply tree, refreshed, fully expanded, and flattened.
    /// The comment itself is not included.
    async fn comment_tree(&self, comment: &Comment) -> Result<Vec<Comment>, ApiError>;

    async fn read_wiki(&self, subreddit: &str, page: &str) -> Result<WikiPage, ApiError>;

    /// Save a wiki page conditioned on `previous` being the latest
    /// revision; a lost race surfaces as [`WikiWriteError::Conflict`]
    /// carrying the winning content and revision.
    async fn write_wiki<'a>(
        &self,
        subreddit: &str,
        page: &str,
        content: &str,
        previous: Option<&'a str>,
    ) -> Result<(), WikiWriteError>;

    async fn moderators(&self, subreddit: &str) -> Result<Vec<String>, ApiError>;

    async fn subreddit_info(&self, subreddit: &str) -> Result<SubredditInfo, ApiError>;
}
