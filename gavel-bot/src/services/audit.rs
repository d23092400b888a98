use chrono::Utc;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

use gavel_shared::clients::site::SubredditInfo;
use gavel_shared::{AppResult, Target, ThingId};

use crate::models::{NewAction, NewNotification, NewRemoval, NewSubreddit, NewSubredditModerator, NewUser};
use crate::schema::{actions, notifications, removals, subreddit_moderators, subreddits, users};

/// Get-or-create a row in the deduplicated identity cache.
pub fn ensure_user(conn: &mut SqliteConnection, name: &str) -> AppResult<i32> {
    diesel::insert_or_ignore_into(users::table)
        .values(NewUser { username: name })
        .execute(conn)?;

    let id = users::table
        .filter(users::username.eq(name))
        .select(users::id)
        .first(conn)?;
    Ok(id)
}

/// Has this target already been acted on?
///
/// With `per_moderator` the key is (target, acting moderator); without
/// it any prior action on the target counts.
pub fn already_acted(
    conn: &mut SqliteConnection,
    target: &ThingId,
    moderator: &str,
    per_moderator: bool,
) -> AppResult<bool> {
    let acted: bool = if per_moderator {
        diesel::select(diesel::dsl::exists(
            actions::table
                .inner_join(users::table.on(users::id.eq(actions::moderator)))
                .filter(actions::target_type.eq(target.kind.code()))
                .filter(actions::target_id.eq(target.id))
                .filter(users::username.eq(moderator)),
        ))
        .get_result(conn)?
    } else {
        diesel::select(diesel::dsl::exists(
            actions::table
                .filter(actions::target_type.eq(target.kind.code()))
                .filter(actions::target_id.eq(target.id)),
        ))
        .get_result(conn)?
    };

    if acted {
        // Track where we see the same thing reported twice.
        let previous: Vec<String> = actions::table
            .inner_join(users::table.on(users::id.eq(actions::moderator)))
            .filter(actions::target_type.eq(target.kind.code()))
            .filter(actions::target_id.eq(target.id))
            .select(users::username)
            .load(conn)?;
        tracing::info!(target = %target, moderators = ?previous, "saw repeated action");
    }

    Ok(acted)
}

/// Insert the audit row for an action, creating the author and
/// moderator identities as needed. Returns the new row's id.
pub fn log_action(
    conn: &mut SqliteConnection,
    target: &Target,
    moderator: &str,
    subreddit_id: i64,
    summary: &str,
    details: Option<&str>,
) -> AppResult<i32> {
    let author_id = ensure_user(conn, target.author_or_deleted())?;
    let moderator_id = ensure_user(conn, moderator)?;

    let id = target.id();
    let action_id = diesel::insert_into(actions::table)
        .values(NewAction {
            target_type: id.kind.code(),
            target_id: id.id,
            action_summary: summary,
            action_details: details,
            author: author_id,
            moderator: moderator_id,
            subreddit: subreddit_id,
            time: Utc::now().naive_utc(),
        })
        .returning(actions::id)
        .get_result(conn)?;

    tracing::info!(
        moderator,
        summary,
        details,
        target = %id,
        "logged action"
    );
    Ok(action_id)
}

pub fn record_removal(conn: &mut SqliteConnection, action_id: i32) -> AppResult<()> {
    diesel::insert_into(removals::table)
        .values(NewRemoval { action_id })
        .execute(conn)?;
    Ok(())
}

pub fn record_notification(
    conn: &mut SqliteConnection,
    comment_id: i64,
    action_id: i32,
) -> AppResult<()> {
    diesel::insert_into(notifications::table)
        .values(NewNotification { comment_id, action_id })
        .execute(conn)?;
    Ok(())
}

/// Refresh the cached subreddit row and its moderator links.
pub fn refresh_subreddit(
    conn: &mut SqliteConnection,
    info: &SubredditInfo,
    moderators: &[String],
) -> AppResult<()> {
    conn.transaction::<_, gavel_shared::AppError, _>(|conn| {
        diesel::insert_or_ignore_into(subreddits::table)
            .values(NewSubreddit {
                id: info.id.id,
                display_name: &info.display_name,
            })
            .execute(conn)?;
        diesel::update(subreddits::table.find(info.id.id))
            .set(subreddits::subscribers.eq(Some(info.subscribers)))
            .execute(conn)?;

        diesel::delete(
            subreddit_moderators::table
                .filter(subreddit_moderators::subreddit_id.eq(info.id.id)),
        )
        .execute(conn)?;

        for moderator in moderators {
            let moderator_id = ensure_user(conn, moderator)?;
            diesel::insert_or_ignore_into(subreddit_moderators::table)
                .values(NewSubredditModerator {
                    subreddit_id: info.id.id,
                    moderator_id,
                })
                .execute(conn)?;
        }
        Ok(())
    })
}
