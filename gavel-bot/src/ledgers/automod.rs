use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use gavel_shared::clients::site::Site;

use super::{update_wiki, Ledger};

const PAGE: &str = "config/automoderator";

/// Buffers values destined for named placeholders in the AutoModerator
/// configuration, applied as one textual substitution per cycle.
pub struct AutomodLedger {
    site: Arc<dyn Site>,
    subreddit: String,
    buckets: Mutex<HashMap<String, Vec<String>>>,
}

impl AutomodLedger {
    pub fn new(site: Arc<dyn Site>, subreddit: String) -> Self {
        Self {
            site,
            subreddit,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    pub fn add(&self, placeholder: &str, value: String) {
        self.buckets
            .lock()
            .unwrap()
            .entry(placeholder.to_string())
            .or_default()
            .push(value);
    }

    pub fn bucket(&self, placeholder: &str) -> Vec<String> {
        self.buckets
            .lock()
            .unwrap()
            .get(placeholder)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl Ledger for AutomodLedger {
    async fn flush(&self) {
        let snapshot: Vec<(String, Vec<String>)> = self
            .buckets
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, values)| !values.is_empty())
            .map(|(placeholder, values)| (placeholder.clone(), values.clone()))
            .collect();
        if snapshot.is_empty() {
            return;
        }

        let result = update_wiki(self.site.as_ref(), &self.subreddit, PAGE, |content| {
            let mut content = unescape_entities(content);
            for (placeholder, values) in &snapshot {
                let replacement = std::iter::once(placeholder.as_str())
                    .chain(values.iter().map(String::as_str))
                    .collect::<Vec<_>>()
                    .join(", ");
                content = content.replace(placeholder.as_str(), &replacement);
            }
            Ok(content)
        })
        .await;

        match result {
            Ok(()) => {
                let mut buckets = self.buckets.lock().unwrap();
                for (placeholder, values) in &snapshot {
                    if let Some(bucket) = buckets.get_mut(placeholder) {
                        bucket.drain(..values.len().min(bucket.len()));
                    }
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to update automod config");
            }
        }
    }
}

/// The wiki API escapes markup entities in fetched content.
fn unescape_entities(content: &str) -> String {
    content
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}
