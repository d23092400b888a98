use std::collections::{BTreeMap, HashMap};
use std::io::{Read, Write};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use gavel_shared::clients::site::Site;
use gavel_shared::{AppError, AppResult};

use super::{update_wiki, Ledger};

const PAGE: &str = "usernotes";
const EXPECTED_VERSION: i64 = 6;

/// A buffered Moderator Toolbox usernote.
#[derive(Debug, Clone, PartialEq)]
pub struct UserNote {
    pub author: String,
    pub level: String,
    pub link: String,
    pub moderator: String,
    pub text: String,
    pub time: i64,
}

/// Buffers usernotes and writes them to the Toolbox wiki page once per
/// cycle, via read-modify-write with conflict retry.
pub struct UsernoteLedger {
    site: Arc<dyn Site>,
    subreddit: String,
    notes: Mutex<Vec<UserNote>>,
}

impl UsernoteLedger {
    pub fn new(site: Arc<dyn Site>, subreddit: String) -> Self {
        Self {
            site,
            subreddit,
            notes: Mutex::new(Vec::new()),
        }
    }

    pub fn add(&self, note: UserNote) {
        self.notes.lock().unwrap().push(note);
    }

    pub fn pending(&self) -> Vec<UserNote> {
        self.notes.lock().unwrap().clone()
    }
}

#[async_trait]
impl Ledger for UsernoteLedger {
    async fn flush(&self) {
        let pending = self.pending();
        if pending.is_empty() {
            return;
        }

        let result = update_wiki(self.site.as_ref(), &self.subreddit, PAGE, |content| {
            transform_page(content, &pending)
        })
        .await;

        match result {
            Ok(()) => {
                self.notes.lock().unwrap().drain(..pending.len());
                tracing::debug!(count = pending.len(), "usernotes flushed");
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to update usernotes; notes kept for next cycle");
            }
        }
    }
}

// --- Page layout ---
//
// Toolbox stores a JSON envelope whose `blob` is the per-author note map,
// serialized, deflated, and base64ed. Moderator and warning names are
// interned into `constants` lists; notes refer to them by index.

#[derive(Debug, Serialize, Deserialize)]
struct UsernotesPage {
    ver: i64,
    constants: Constants,
    blob: String,
    #[serde(flatten)]
    extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Constants {
    users: Vec<String>,
    warnings: Vec<String>,
    #[serde(flatten)]
    extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct AuthorNotes {
    ns: Vec<SerializedNote>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SerializedNote {
    n: String,
    t: i64,
    m: usize,
    l: String,
    w: usize,
}

pub(crate) fn compress_blob<T: Serialize>(value: &T) -> AppResult<String> {
    let json = serde_json::to_vec(value).map_err(anyhow::Error::from)?;
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&json).map_err(anyhow::Error::from)?;
    let compressed = encoder.finish().map_err(anyhow::Error::from)?;
    Ok(BASE64.encode(compressed))
}

pub(crate) fn decompress_blob<T: DeserializeOwned>(blob: &str) -> AppResult<T> {
    let compressed = BASE64.decode(blob.trim()).map_err(anyhow::Error::from)?;
    let mut json = Vec::new();
    ZlibDecoder::new(compressed.as_slice())
        .read_to_end(&mut json)
        .map_err(anyhow::Error::from)?;
    Ok(serde_json::from_slice(&json).map_err(anyhow::Error::from)?)
}

/// Intern `wanted` values into `items`, keeping every previously-known
/// name at its existing index.
fn prepare_indices<'a>(
    items: &mut Vec<String>,
    wanted: impl Iterator<Item = &'a str>,
) -> HashMap<String, usize> {
    let mut indices: HashMap<String, usize> = items
        .iter()
        .enumerate()
        .map(|(index, value)| (value.clone(), index))
        .collect();
    for value in wanted {
        if !indices.contains_key(value) {
            indices.insert(value.to_string(), items.len());
            items.push(value.to_string());
        }
    }
    indices
}

fn transform_page(content: &str, notes: &[UserNote]) -> AppResult<String> {
    let mut page: UsernotesPage = serde_json::from_str(content)
        .map_err(|e| anyhow::anyhow!("unreadable usernotes page: {e}"))?;
    if page.ver != EXPECTED_VERSION {
        return Err(AppError::NoteSchema {
            found: page.ver,
            expected: EXPECTED_VERSION,
        });
    }

    let mod_indices =
        prepare_indices(&mut page.constants.users, notes.iter().map(|n| n.moderator.as_str()));
    let warning_indices =
        prepare_indices(&mut page.constants.warnings, notes.iter().map(|n| n.level.as_str()));

    let mut data: BTreeMap<String, AuthorNotes> = decompress_blob(&page.blob)?;
    for note in notes {
        let author_notes = data.entry(note.author.clone()).or_default();
        // Newest first.
        author_notes.ns.insert(
            0,
            SerializedNote {
                n: note.text.clone(),
                t: note.time,
                m: mod_indices[&note.moderator],
                l: note.link.clone(),
                w: warning_indices[&note.level],
            },
        );
    }

    page.blob = compress_blob(&data)?;
    Ok(serde_json::to_string(&page).map_err(anyhow::Error::from)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gavel_shared::clients::site::{MockSite, WikiPage};
    use gavel_shared::{ApiError, WikiWriteError};

    fn note(author: &str, moderator: &str, level: &str) -> UserNote {
        UserNote {
            author: author.to_string(),
            level: level.to_string(),
            link: "l,5kgajm".to_string(),
            moderator: moderator.to_string(),
            text: "spam".to_string(),
            time: 1_500_000_000,
        }
    }

    fn empty_page() -> String {
        let blob: BTreeMap<String, AuthorNotes> = BTreeMap::new();
        serde_json::to_string(&serde_json::json!({
            "ver": EXPECTED_VERSION,
            "constants": {"users": ["existing_mod"], "warnings": ["spamwarn"]},
            "blob": compress_blob(&blob).unwrap(),
        }))
        .unwrap()
    }

    #[test]
    fn blob_round_trips() {
        let mut data: BTreeMap<String, AuthorNotes> = BTreeMap::new();
        data.insert(
            "some_user".to_string(),
            AuthorNotes {
                ns: vec![SerializedNote {
                    n: "note".to_string(),
                    t: 1,
                    m: 0,
                    l: "l,abc".to_string(),
                    w: 0,
                }],
            },
        );

        let blob = compress_blob(&data).unwrap();
        let restored: BTreeMap<String, AuthorNotes> = decompress_blob(&blob).unwrap();
        assert_eq!(restored.len(), 1);
        assert_eq!(restored["some_user"].ns[0].n, "note");
    }

    #[test]
    fn transform_preserves_known_indices_and_prepends() {
        let notes = vec![
            note("user_a", "existing_mod", "spamwarn"),
            note("user_a", "new_mod", "gooduser"),
        ];
        let transformed = transform_page(&empty_page(), &notes).unwrap();

        let page: UsernotesPage = serde_json::from_str(&transformed).unwrap();
        assert_eq!(page.constants.users, vec!["existing_mod", "new_mod"]);
        assert_eq!(page.constants.warnings, vec!["spamwarn", "gooduser"]);

        let data: BTreeMap<String, AuthorNotes> = decompress_blob(&page.blob).unwrap();
        let ns = &data["user_a"].ns;
        assert_eq!(ns.len(), 2);
        // Later notes end up first.
        assert_eq!(ns[0].m, 1);
        assert_eq!(ns[1].m, 0);
    }

    #[test]
    fn version_mismatch_is_fatal() {
        let page = serde_json::to_string(&serde_json::json!({
            "ver": 5,
            "constants": {"users": [], "warnings": []},
            "blob": "",
        }))
        .unwrap();

        let result = transform_page(&page, &[note("u", "m", "w")]);
        assert!(matches!(
            result,
            Err(AppError::NoteSchema { found: 5, expected: EXPECTED_VERSION })
        ));
    }

    #[tokio::test]
    async fn failed_flush_keeps_notes_buffered() {
        let mut site = MockSite::new();
        site.expect_read_wiki().times(1).returning(|_, _| {
            Err(ApiError::Rejected {
                endpoint: "wiki".into(),
                code: "PAGE_NOT_FOUND".into(),
            })
        });

        let ledger = UsernoteLedger::new(Arc::new(site), "testsub".to_string());
        ledger.add(note("user_a", "mod_a", "spamwarn"));

        ledger.flush().await;
        assert_eq!(ledger.pending().len(), 1);
    }

    #[tokio::test]
    async fn successful_flush_clears_the_buffer() {
        let mut site = MockSite::new();
        let page = empty_page();
        site.expect_read_wiki().times(1).returning(move |_, _| {
            Ok(WikiPage {
                content: page.clone(),
                revision: "rev1".to_string(),
            })
        });
        site.expect_write_wiki()
            .withf(|_, page, content, previous| {
                page == PAGE && *previous == Some("rev1") && content.contains("\"ver\":6")
            })
            .times(1)
            .returning(|_, _, _, _| Ok(()));

        let ledger = UsernoteLedger::new(Arc::new(site), "testsub".to_string());
        ledger.add(note("user_a", "existing_mod", "spamwarn"));

        ledger.flush().await;
        assert!(ledger.pending().is_empty());
    }

    #[tokio::test]
    async fn schema_mismatch_abandons_flush_without_write() {
        let mut site = MockSite::new();
        site.expect_read_wiki().times(1).returning(|_, _| {
            Ok(WikiPage {
                content: r#"{"ver": 4, "constants": {"users": [], "warnings": []}, "blob": ""}"#
                    .to_string(),
                revision: "rev1".to_string(),
            })
        });
        // No write_wiki expectation: a save attempt would panic.

        let ledger = UsernoteLedger::new(Arc::new(site), "testsub".to_string());
        ledger.add(note("user_a", "mod_a", "spamwarn"));

        ledger.flush().await;
        assert_eq!(ledger.pending().len(), 1);
    }

    #[tokio::test]
    async fn wiki_write_error_keeps_notes() {
        let mut site = MockSite::new();
        let page = empty_page();
        site.expect_read_wiki().times(1).returning(move |_, _| {
            Ok(WikiPage {
                content: page.clone(),
                revision: "rev1".to_string(),
            })
        });
        site.expect_write_wiki().times(1).returning(|_, _, _, _| {
            Err(WikiWriteError::Api(ApiError::Rejected {
                endpoint: "wiki".into(),
                code: "RATELIMIT".into(),
            }))
        });

        let ledger = UsernoteLedger::new(Arc::new(site), "testsub".to_string());
        ledger.add(note("user_a", "mod_a", "spamwarn"));

        ledger.flush().await;
        assert_eq!(ledger.pending().len(), 1);
    }
}
