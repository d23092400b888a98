//! Turns per-subreddit YAML rule files into [`Browser`]s.
//!
//! Validation is front-loaded: unknown action names, parameters of the
//! wrong type, and actions applied to target kinds they do not support
//! all fail here, before the bot starts polling.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

use gavel_shared::clients::site::Site;
use gavel_shared::{AppError, AppResult, ThingKind};

use crate::actions::{
    Action, AutomodDomainWatcher, AutomodUserWatcher, Banner, Locker, Modmailer, Notifier, Nuker,
    ToolboxNoteAdder,
};
use crate::browser::{Browser, SubredditHandle};
use crate::ledgers::LedgerSet;
use crate::rules::{Rule, Trigger};

const POST_ONLY: &[ThingKind] = &[ThingKind::Post];
const POST_OR_COMMENT: &[ThingKind] = &[ThingKind::Post, ThingKind::Comment];

pub struct LoadContext<'a> {
    pub site: Arc<dyn Site>,
    pub subreddit: Arc<SubredditHandle>,
    pub public_url: &'a str,
    pub dedup_per_moderator: bool,
}

// --- Rule file shape ---

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RuleDoc {
    trigger: TriggerConfig,
    #[serde(default)]
    actions: Vec<ActionEntry>,
    info: InfoConfig,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TriggerConfig {
    commands: Vec<String>,
    types: Vec<TargetTypeName>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum TargetTypeName {
    Post,
    Comment,
}

impl TargetTypeName {
    fn kind(self) -> ThingKind {
        match self {
            Self::Post => ThingKind::Post,
            Self::Comment => ThingKind::Comment,
        }
    }
}

/// An action is either a bare name or a single-key `{name: params}` map.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ActionEntry {
    Name(String),
    Configured(HashMap<String, serde_yaml::Value>),
}

impl ActionEntry {
    fn into_parts(self) -> AppResult<(String, serde_yaml::Value)> {
        match self {
            Self::Name(name) => Ok((name, serde_yaml::Value::Null)),
            Self::Configured(map) => {
                let mut entries = map.into_iter();
                match (entries.next(), entries.next()) {
                    (Some((name, params)), None) => Ok((name, params)),
                    _ => Err(AppError::config(
                        "a configured action must be a single-key map",
                    )),
                }
            }
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct InfoConfig {
    name: String,
    details: Option<String>,
}

// --- Typed action parameters ---

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct BanParams {
    message: String,
    reason: String,
    #[serde(default)]
    duration: Option<i32>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct NotifyParams {
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ModmailParams {
    subject: String,
    body: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct UsernoteParams {
    text: String,
    level: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct WatcherParams {
    placeholder: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RemoveParams {
    #[serde(default = "default_lock")]
    lock: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct NoParams {}

fn default_lock() -> bool {
    true
}

fn parse_params<T: serde::de::DeserializeOwned>(
    action: &str,
    params: serde_yaml::Value,
) -> AppResult<T> {
    let params = match params {
        serde_yaml::Value::Null => serde_yaml::Value::Mapping(Default::default()),
        other => other,
    };
    serde_yaml::from_value(params)
        .map_err(|e| AppError::config(format!("invalid parameters for {action}: {e}")))
}

fn ensure_targets(
    action: &str,
    targets: &HashSet<ThingKind>,
    valid: &[ThingKind],
) -> AppResult<()> {
    if targets.iter().all(|kind| valid.contains(kind)) {
        Ok(())
    } else {
        Err(AppError::config(format!(
            "{action} does not support all of the rule's target types"
        )))
    }
}

/// The enumerated action registry: configuration name to constructor.
fn build_action(
    name: &str,
    params: serde_yaml::Value,
    targets: &HashSet<ThingKind>,
    ledgers: &mut LedgerSet,
    ctx: &LoadContext<'_>,
) -> AppResult<Box<dyn Action>> {
    match name {
        "ban" => {
            ensure_targets(name, targets, POST_OR_COMMENT)?;
            let p: BanParams = parse_params(name, params)?;
            Ok(Box::new(Banner::new(
                p.message,
                p.reason,
                p.duration,
                ctx.site.clone(),
                ctx.subreddit.name.clone(),
            )))
        }
        "lock" => {
            ensure_targets(name, targets, POST_ONLY)?;
            let NoParams {} = parse_params(name, params)?;
            Ok(Box::new(Locker::new(ctx.site.clone())))
        }
        "modmail" => {
            ensure_targets(name, targets, POST_OR_COMMENT)?;
            let p: ModmailParams = parse_params(name, params)?;
            Ok(Box::new(Modmailer::new(
                p.subject,
                p.body,
                ctx.site.clone(),
                ctx.subreddit.name.clone(),
            )))
        }
        "notify" => {
            ensure_targets(name, targets, POST_OR_COMMENT)?;
            let p: NotifyParams = parse_params(name, params)?;
            Ok(Box::new(Notifier::new(
                p.text,
                ctx.site.clone(),
                ctx.subreddit.name.clone(),
                ctx.public_url.to_string(),
            )))
        }
        "nuke" => {
            ensure_targets(name, targets, POST_OR_COMMENT)?;
            let NoParams {} = parse_params(name, params)?;
            Ok(Box::new(Nuker::new(ctx.site.clone(), ledgers.nuke())))
        }
        "usernote" => {
            ensure_targets(name, targets, POST_OR_COMMENT)?;
            let p: UsernoteParams = parse_params(name, params)?;
            Ok(Box::new(ToolboxNoteAdder::new(
                p.text,
                p.level,
                ledgers.usernotes(),
            )))
        }
        "domainwatch" => {
            ensure_targets(name, targets, POST_ONLY)?;
            let p: WatcherParams = parse_params(name, params)?;
            Ok(Box::new(AutomodDomainWatcher::new(
                p.placeholder,
                ledgers.automod(),
            )))
        }
        "userwatch" => {
            ensure_targets(name, targets, POST_OR_COMMENT)?;
            let p: WatcherParams = parse_params(name, params)?;
            Ok(Box::new(AutomodUserWatcher::new(
                p.placeholder,
                ledgers.automod(),
            )))
        }
        other => Err(AppError::config(format!("unknown action {other:?}"))),
    }
}

fn build_rule(doc: RuleDoc, ledgers: &mut LedgerSet, ctx: &LoadContext<'_>) -> AppResult<Rule> {
    let kinds: HashSet<ThingKind> = doc.trigger.types.iter().map(|t| t.kind()).collect();

    // `remove` is folded into the rule's disposition flags rather than
    // becoming an action of its own.
    let mut remove = false;
    let mut lock = false;
    let mut actions: Vec<Box<dyn Action>> = Vec::new();
    for entry in doc.actions {
        let (name, params) = entry.into_parts()?;
        if name == "remove" {
            remove = true;
            let p: RemoveParams = parse_params(&name, params)?;
            lock = p.lock && kinds.contains(&ThingKind::Post);
        } else {
            actions.push(build_action(&name, params, &kinds, ledgers, ctx)?);
        }
    }

    Ok(Rule {
        trigger: Trigger::new(&doc.trigger.commands, kinds)?,
        remove,
        lock,
        actions,
        name: doc.info.name,
        details: doc.info.details,
        site: ctx.site.clone(),
        subreddit: ctx.subreddit.clone(),
        dedup_per_moderator: ctx.dedup_per_moderator,
    })
}

/// Parse one subreddit's multi-document rule file into a [`Browser`].
pub fn load_rules_file(path: &Path, ctx: &LoadContext<'_>) -> AppResult<Browser> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| AppError::config(format!("cannot read {}: {e}", path.display())))?;
    load_rules_str(&text, ctx).map_err(|e| match e {
        AppError::Config(message) => {
            AppError::config(format!("{}: {message}", path.display()))
        }
        other => other,
    })
}

pub fn load_rules_str(text: &str, ctx: &LoadContext<'_>) -> AppResult<Browser> {
    let mut ledgers = LedgerSet::new(ctx.site.clone(), &ctx.subreddit.name);
    let mut rules = Vec::new();
    for document in serde_yaml::Deserializer::from_str(text) {
        let doc = RuleDoc::deserialize(document)
            .map_err(|e| AppError::config(e.to_string()))?;
        rules.push(build_rule(doc, &mut ledgers, ctx)?);
    }

    Ok(Browser::new(
        ctx.subreddit.clone(),
        rules,
        ledgers.into_ledgers(),
        ctx.site.clone(),
    ))
}
