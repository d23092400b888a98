use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::Serialize;

use crate::schema::{actions, notifications, removals, subreddit_moderators, subreddits, users};

// --- User ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = users)]
pub struct User {
    pub id: i32,
    pub username: String,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser<'a> {
    pub username: &'a str,
}

// --- Action (audit row) ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = actions)]
pub struct Action {
    pub id: i32,
    pub target_type: i32,
    pub target_id: i64,
    pub action_summary: String,
    pub action_details: Option<String>,
    pub author: i32,
    pub moderator: i32,
    pub subreddit: i64,
    pub time: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = actions)]
pub struct NewAction<'a> {
    pub target_type: i32,
    pub target_id: i64,
    pub action_summary: &'a str,
    pub action_details: Option<&'a str>,
    pub author: i32,
    pub moderator: i32,
    pub subreddit: i64,
    pub time: NaiveDateTime,
}

// --- Side tables ---

#[derive(Debug, Insertable)]
#[diesel(table_name = removals)]
pub struct NewRemoval {
    pub action_id: i32,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = notifications)]
pub struct NewNotification {
    pub comment_id: i64,
    pub action_id: i32,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = subreddits)]
pub struct NewSubreddit<'a> {
    pub id: i64,
    pub display_name: &'a str,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = subreddit_moderators)]
pub struct NewSubredditModerator {
    pub subreddit_id: i64,
    pub moderator_id: i32,
}
