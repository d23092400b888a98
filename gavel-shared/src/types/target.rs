use serde::{Deserialize, Serialize};

use super::thing::{ThingId, ThingKind};

/// Author shown when an account no longer exists.
pub const DELETED_USER: &str = "[deleted]";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: ThingId,
    pub author: Option<String>,
    pub title: String,
    pub permalink: String,
    pub domain: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: ThingId,
    pub author: Option<String>,
    pub body: String,
    pub permalink: String,
    /// The post this comment lives under.
    pub submission: ThingId,
    /// Set when the comment was made in an official moderator capacity.
    pub distinguished: Option<String>,
}

/// The post or comment a moderator report applies to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Target {
    Post(Post),
    Comment(Comment),
}

impl Target {
    pub fn id(&self) -> ThingId {
        match self {
            Self::Post(p) => p.id,
            Self::Comment(c) => c.id,
        }
    }

    pub fn kind(&self) -> ThingKind {
        self.id().kind
    }

    pub fn is_post(&self) -> bool {
        matches!(self, Self::Post(_))
    }

    pub fn author(&self) -> Option<&str> {
        match self {
            Self::Post(p) => p.author.as_deref(),
            Self::Comment(c) => c.author.as_deref(),
        }
    }

    /// Author name for the audit trail, with the deleted-account sentinel.
    pub fn author_or_deleted(&self) -> &str {
        self.author().unwrap_or(DELETED_USER)
    }

    pub fn permalink(&self) -> &str {
        match self {
            Self::Post(p) => &p.permalink,
            Self::Comment(c) => &c.permalink,
        }
    }
}
