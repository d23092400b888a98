//! Shared fixtures for unit tests.

use diesel::connection::SimpleConnection;
use diesel::sqlite::SqliteConnection;
use diesel::Connection;

use gavel_shared::{Comment, Post, Target};

const SCHEMA: &str = r#"
CREATE TABLE users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL UNIQUE
);
CREATE TABLE actions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    target_type INTEGER NOT NULL,
    target_id BIGINT NOT NULL,
    action_summary TEXT NOT NULL,
    action_details TEXT,
    author INTEGER NOT NULL REFERENCES users(id),
    moderator INTEGER NOT NULL REFERENCES users(id),
    subreddit BIGINT NOT NULL,
    time TIMESTAMP NOT NULL
);
CREATE TABLE removals (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    action_id INTEGER NOT NULL REFERENCES actions(id)
);
CREATE TABLE notifications (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    comment_id BIGINT NOT NULL,
    action_id INTEGER NOT NULL REFERENCES actions(id)
);
CREATE TABLE subreddits (
    id BIGINT PRIMARY KEY,
    display_name TEXT NOT NULL,
    subscribers BIGINT
);
CREATE TABLE subreddit_moderators (
    subreddit_id BIGINT NOT NULL,
    moderator_id INTEGER NOT NULL,
    PRIMARY KEY (subreddit_id, moderator_id)
);
"#;

/// Fresh in-memory database with the audit schema applied.
pub fn conn() -> SqliteConnection {
    let mut conn = SqliteConnection::establish(":memory:").expect("in-memory sqlite");
    conn.batch_execute(SCHEMA).expect("schema");
    conn
}

pub fn sample_post() -> Target {
    Target::Post(Post {
        id: "t3_5kgajm".parse().unwrap(),
        author: Some("some_user".to_string()),
        title: "A post".to_string(),
        permalink: "/r/testsub/comments/5kgajm/a_post/".to_string(),
        domain: "example.com".to_string(),
    })
}

pub fn sample_comment() -> Target {
    Target::Comment(Comment {
        id: "t1_dbnq46o".parse().unwrap(),
        author: Some("BJO_test_mod".to_string()),
        body: "a comment".to_string(),
        permalink: "/r/testsub/comments/5kgajm/a_post/dbnq46o/".to_string(),
        submission: "t3_5kgajm".parse().unwrap(),
        distinguished: None,
    })
}
