diesel::table! {
    users (id) {
        id -> Integer,
        username -> Text,
    }
}

diesel::table! {
    actions (id) {
        id -> Integer,
        target_type -> Integer,
        target_id -> BigInt,
        action_summary -> Text,
        action_details -> Nullable<Text>,
        author -> Integer,
        moderator -> Integer,
        subreddit -> BigInt,
        time -> Timestamp,
    }
}

diesel::table! {
    removals (id) {
        id -> Integer,
        action_id -> Integer,
    }
}

diesel::table! {
    notifications (id) {
        id -> Integer,
        comment_id -> BigInt,
        action_id -> Integer,
    }
}

diesel::table! {
    subreddits (id) {
        id -> BigInt,
        display_name -> Text,
        subscribers -> Nullable<BigInt>,
    }
}

diesel::table! {
    subreddit_moderators (subreddit_id, moderator_id) {
        subreddit_id -> BigInt,
        moderator_id -> Integer,
    }
}

diesel::joinable!(removals -> actions (action_id));
diesel::joinable!(notifications -> actions (action_id));

diesel::allow_tables_to_appear_in_same_query!(
    users,
    actions,
    removals,
    notifications,
    subreddits,
    subreddit_moderators,
);
