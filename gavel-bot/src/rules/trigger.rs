use std::collections::HashSet;

use regex::{Regex, RegexBuilder};

use gavel_shared::{AppError, AppResult, Target, ThingKind};

/// Decides whether a report string fires a rule.
///
/// The commands compile to one anchored, case-insensitive alternation of
/// escaped literals; the target's kind must also be in the rule's
/// configured set.
#[derive(Debug, Clone)]
pub struct Trigger {
    pattern: Regex,
    kinds: HashSet<ThingKind>,
}

impl Trigger {
    pub fn new(commands: &[String], kinds: HashSet<ThingKind>) -> AppResult<Self> {
        if commands.is_empty() {
            return Err(AppError::config("rule has no trigger commands"));
        }

        let alternation = commands
            .iter()
            .map(|command| regex::escape(command))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = RegexBuilder::new(&format!("^(?:{alternation})$"))
            .case_insensitive(true)
            .build()
            .map_err(|e| AppError::config(format!("bad trigger commands: {e}")))?;

        Ok(Self { pattern, kinds })
    }

    pub fn matches(&self, report: &str, target: &Target) -> bool {
        self.kinds.contains(&target.kind()) && self.pattern.is_match(report)
    }
}
