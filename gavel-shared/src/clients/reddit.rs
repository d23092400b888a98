use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::errors::{ApiError, WikiWriteError};
use crate::types::{Comment, ModReport, Post, ReportPage, Reported, Target, ThingId};

use super::site::{BanRequest, Site, SubredditInfo, WikiPage};

const REPORT_PAGE_LIMIT: u32 = 100;
const MORECHILDREN_CHUNK: usize = 100;

/// Thin client for the platform's OAuth API.
///
/// Only the calls the bot orchestrates are covered; retry/backoff and
/// token refresh live outside this crate.
pub struct RedditClient {
    http: Client,
    base_url: String,
}

impl RedditClient {
    pub fn new(base_url: &str, token: &str, user_agent: &str) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| ApiError::Rejected {
                endpoint: "client setup".into(),
                code: "invalid token characters".into(),
            })?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let http = Client::builder()
            .user_agent(user_agent)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let response = self.http.get(self.url(path)).query(query).send().await?;
        check_status(path, &response)?;
        Ok(response.json().await?)
    }

    async fn post_form(
        &self,
        path: &str,
        form: &[(&str, String)],
    ) -> Result<Response, ApiError> {
        let response = self.http.post(self.url(path)).form(form).send().await?;
        check_status(path, &response)?;
        Ok(response)
    }

    async fn morechildren(
        &self,
        link: &ThingId,
        ids: &[String],
    ) -> Result<Vec<RawThing>, ApiError> {
        let endpoint = "/api/morechildren";
        let envelope: ApiJsonEnvelope = self
            .get_json(
                endpoint,
                &[
                    ("api_type", "json".to_string()),
                    ("link_id", link.fullname()),
                    ("children", ids.join(",")),
                ],
            )
            .await?;
        rejection(endpoint, &envelope.json.errors)?;
        Ok(envelope.json.data.map(|d| d.things).unwrap_or_default())
    }
}

#[async_trait]
impl Site for RedditClient {
    async fn reports_page<'a>(
        &self,
        subreddit: &str,
        after: Option<&'a str>,
    ) -> Result<ReportPage, ApiError> {
        let path = format!("/r/{subreddit}/about/reports");
        let mut query = vec![("limit", REPORT_PAGE_LIMIT.to_string())];
        if let Some(cursor) = after {
            query.push(("after", cursor.to_string()));
        }
        let listing: RawListing = self.get_json(&path, &query).await?;

        let mut items = Vec::with_capacity(listing.data.children.len());
        for thing in &listing.data.children {
            let target = target_from_thing(&path, thing)?;
            let reports = thing
                .data
                .mod_reports
                .iter()
                .map(|(reason, moderator)| ModReport {
                    reason: reason.clone(),
                    moderator: moderator.clone(),
                })
                .collect();
            items.push(Reported { target, reports });
        }

        Ok(ReportPage {
            items,
            after: listing.data.after,
        })
    }

    async fn remove(&self, id: &ThingId) -> Result<(), ApiError> {
        self.post_form(
            "/api/remove",
            &[("id", id.fullname()), ("spam", "false".to_string())],
        )
        .await?;
        Ok(())
    }

    async fn approve(&self, id: &ThingId) -> Result<(), ApiError> {
        self.post_form("/api/approve", &[("id", id.fullname())]).await?;
        Ok(())
    }

    async fn lock(&self, id: &ThingId) -> Result<(), ApiError> {
        self.post_form("/api/lock", &[("id", id.fullname())]).await?;
        Ok(())
    }

    async fn ban(
        &self,
        subreddit: &str,
        user: &str,
        ban: &BanRequest,
    ) -> Result<(), ApiError> {
        let path = format!("/r/{subreddit}/api/friend");
        let mut form = vec![
            ("name", user.to_string()),
            ("type", "banned".to_string()),
            ("ban_message", ban.message.clone()),
            ("ban_reason", ban.reason.clone()),
            ("api_type", "json".to_string()),
        ];
        if let Some(days) = ban.duration {
            form.push(("duration", days.to_string()));
        }
        self.post_form(&path, &form).await?;
        Ok(())
    }

    async fn reply(&self, parent: &ThingId, text: &str) -> Result<ThingId, ApiError> {
        let endpoint = "/api/comment";
        let response = self
            .post_form(
                endpoint,
                &[
                    ("api_type", "json".to_string()),
                    ("thing_id", parent.fullname()),
                    ("text", text.to_string()),
                ],
            )
            .await?;
        let envelope: ApiJsonEnvelope = response.json().await?;
        rejection(endpoint, &envelope.json.errors)?;

        let name = envelope
            .json
            .data
            .as_ref()
            .and_then(|d| d.things.first())
            .and_then(|t| t.data.name.as_deref())
            .ok_or_else(|| ApiError::Decode {
                endpoint: endpoint.to_string(),
                message: "no comment in reply response".to_string(),
            })?;
        parse_id(endpoint, name)
    }

    async fn distinguish(&self, id: &ThingId, sticky: bool) -> Result<(), ApiError> {
        self.post_form(
            "/api/distinguish",
            &[
                ("id", id.fullname()),
                ("how", "yes".to_string()),
                ("sticky", sticky.to_string()),
            ],
        )
        .await?;
        Ok(())
    }

    async fn send_modmail(
        &self,
        subreddit: &str,
        recipient: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), ApiError> {
        self.post_form(
            "/api/mod/conversations",
            &[
                ("srName", subreddit.to_string()),
                ("to", recipient.to_string()),
                ("subject", subject.to_string()),
                ("body", body.to_string()),
                ("isAuthorHidden", "true".to_string()),
            ],
        )
        .await?;
        Ok(())
    }

    async fn comment_tree(&self, comment: &Comment) -> Result<Vec<Comment>, ApiError> {
        let path = format!(
            "/comments/{}",
            comment.submission.base36()
        );
        let listings: Vec<RawListing> = self
            .get_json(
                &path,
                &[
                    ("comment", comment.id.base36()),
                    ("limit", "500".to_string()),
                    ("depth", "10".to_string()),
                ],
            )
            .await?;
        let comment_listing = listings.into_iter().nth(1).ok_or_else(|| ApiError::Decode {
            endpoint: path.clone(),
            message: "missing comment listing".to_string(),
        })?;

        let mut out = Vec::new();
        let mut more = Vec::new();
        collect_comments(&path, comment_listing, comment, &mut out, &mut more)?;

        // Expand "more" stubs until the tree is complete.
        while !more.is_empty() {
            let chunk: Vec<String> =
                more.drain(..more.len().min(MORECHILDREN_CHUNK)).collect();
            for thing in self.morechildren(&comment.submission, &chunk).await? {
                match thing.kind.as_str() {
                    "t1" => out.push(comment_from_data(&path, &thing.data, comment)?),
                    "more" => more.extend(thing.data.children.clone().unwrap_or_default()),
                    _ => {}
                }
            }
        }

        // The target itself comes back as the listing root; drop it.
        out.retain(|c| c.id != comment.id);
        Ok(out)
    }

    async fn read_wiki(&self, subreddit: &str, page: &str) -> Result<WikiPage, ApiError> {
        let path = format!("/r/{subreddit}/wiki/{page}");
        let raw: RawWikiEnvelope = self.get_json(&path, &[]).await?;
        Ok(WikiPage {
            content: raw.data.content_md,
            revision: raw.data.revision_id,
        })
    }

    async fn write_wiki<'a>(
        &self,
        subreddit: &str,
        page: &str,
        content: &str,
        previous: Option<&'a str>,
    ) -> Result<(), WikiWriteError> {
        let path = format!("/r/{subreddit}/api/wiki/edit");
        let mut form = vec![
            ("page", page.to_string()),
            ("content", content.to_string()),
        ];
        if let Some(revision) = previous {
            form.push(("previous", revision.to_string()));
        }

        let response = self
            .http
            .post(self.url(&path))
            .form(&form)
            .send()
            .await
            .map_err(ApiError::from)?;

        if response.status() == StatusCode::CONFLICT {
            // The conflict payload carries the revision that won the race.
            let conflict: RawWikiConflict =
                response.json().await.map_err(ApiError::from)?;
            return Err(WikiWriteError::Conflict {
                content: conflict.newcontent,
                revision: conflict.newrevision,
            });
        }
        check_status(&path, &response)?;
        Ok(())
    }

    async fn moderators(&self, subreddit: &str) -> Result<Vec<String>, ApiError> {
        let path = format!("/r/{subreddit}/about/moderators");
        let raw: RawUserListEnvelope = self.get_json(&path, &[]).await?;
        Ok(raw.data.children.into_iter().map(|u| u.name).collect())
    }

    async fn subreddit_info(&self, subreddit: &str) -> Result<SubredditInfo, ApiError> {
        let path = format!("/r/{subreddit}/about");
        let raw: RawSubredditEnvelope = self.get_json(&path, &[]).await?;
        Ok(SubredditInfo {
            id: parse_id(&path, &raw.data.name)?,
            display_name: raw.data.display_name,
            subscribers: raw.data.subscribers,
        })
    }
}

fn check_status(endpoint: &str, response: &Response) -> Result<(), ApiError> {
    if response.status().is_success() {
        Ok(())
    } else {
        Err(ApiError::Status {
            endpoint: endpoint.to_string(),
            status: response.status(),
        })
    }
}

/// Map an `api_type=json` error list to our taxonomy.
fn rejection(endpoint: &str, errors: &[Vec<serde_json::Value>]) -> Result<(), ApiError> {
    let Some(first) = errors.first() else {
        return Ok(());
    };
    let code = first
        .first()
        .and_then(|v| v.as_str())
        .unwrap_or("UNKNOWN_ERROR");
    if code == "TOO_OLD" {
        return Err(ApiError::TooOldToReply);
    }
    Err(ApiError::Rejected {
        endpoint: endpoint.to_string(),
        code: code.to_string(),
    })
}

fn parse_id(endpoint: &str, fullname: &str) -> Result<ThingId, ApiError> {
    fullname.parse().map_err(|_| ApiError::Decode {
        endpoint: endpoint.to_string(),
        message: format!("bad fullname {fullname:?}"),
    })
}

fn normalize_author(author: &Option<String>) -> Option<String> {
    match author.as_deref() {
        None | Some("[deleted]") => None,
        Some(name) => Some(name.to_string()),
    }
}

fn target_from_thing(endpoint: &str, thing: &RawThing) -> Result<Target, ApiError> {
    let data = &thing.data;
    let name = data.name.as_deref().unwrap_or_default();
    let id = parse_id(endpoint, name)?;
    let author = normalize_author(&data.author);
    let permalink = data.permalink.clone().unwrap_or_default();

    match thing.kind.as_str() {
        "t3" => Ok(Target::Post(Post {
            id,
            author,
            title: data.title.clone().unwrap_or_default(),
            permalink,
            domain: data.domain.clone().unwrap_or_default(),
        })),
        "t1" => {
            let link = data.link_id.as_deref().ok_or_else(|| ApiError::Decode {
                endpoint: endpoint.to_string(),
                message: format!("comment {name} has no link_id"),
            })?;
            Ok(Target::Comment(Comment {
                id,
                author,
                body: data.body.clone().unwrap_or_default(),
                permalink,
                submission: parse_id(endpoint, link)?,
                distinguished: data.distinguished.clone(),
            }))
        }
        other => Err(ApiError::Decode {
            endpoint: endpoint.to_string(),
            message: format!("unexpected thing kind {other:?}"),
        }),
    }
}

fn comment_from_data(
    endpoint: &str,
    data: &RawThingData,
    root: &Comment,
) -> Result<Comment, ApiError> {
    let name = data.name.as_deref().unwrap_or_default();
    Ok(Comment {
        id: parse_id(endpoint, name)?,
        author: normalize_author(&data.author),
        body: data.body.clone().unwrap_or_default(),
        permalink: data.permalink.clone().unwrap_or_default(),
        submission: match data.link_id.as_deref() {
            Some(link) => parse_id(endpoint, link)?,
            None => root.submission,
        },
        distinguished: data.distinguished.clone(),
    })
}

fn collect_comments(
    endpoint: &str,
    listing: RawListing,
    root: &Comment,
    out: &mut Vec<Comment>,
    more: &mut Vec<String>,
) -> Result<(), ApiError> {
    for thing in listing.data.children {
        match thing.kind.as_str() {
            "t1" => {
                out.push(comment_from_data(endpoint, &thing.data, root)?);
                if let Some(replies) = thing.data.replies {
                    if replies.is_object() {
                        let nested: RawListing = serde_json::from_value(replies)
                            .map_err(|e| ApiError::Decode {
                                endpoint: endpoint.to_string(),
                                message: e.to_string(),
                            })?;
                        collect_comments(endpoint, nested, root, out, more)?;
                    }
                }
            }
            "more" => more.extend(thing.data.children.unwrap_or_default()),
            _ => {}
        }
    }
    Ok(())
}

// --- Raw wire shapes ---

#[derive(Debug, Deserialize)]
struct RawListing {
    data: RawListingData,
}

#[derive(Debug, Deserialize)]
struct RawListingData {
    #[serde(default)]
    after: Option<String>,
    #[serde(default)]
    children: Vec<RawThing>,
}

#[derive(Debug, Deserialize)]
struct RawThing {
    kind: String,
    data: RawThingData,
}

#[derive(Debug, Default, Deserialize)]
struct RawThingData {
    name: Option<String>,
    author: Option<String>,
    title: Option<String>,
    permalink: Option<String>,
    domain: Option<String>,
    body: Option<String>,
    link_id: Option<String>,
    distinguished: Option<String>,
    #[serde(default)]
    mod_reports: Vec<(String, String)>,
    /// `""` for leaves, a nested listing otherwise.
    #[serde(default)]
    replies: Option<serde_json::Value>,
    /// Only on `more` stubs.
    children: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct ApiJsonEnvelope {
    json: ApiJsonBody,
}

#[derive(Debug, Deserialize)]
struct ApiJsonBody {
    #[serde(default)]
    errors: Vec<Vec<serde_json::Value>>,
    data: Option<ApiJsonData>,
}

#[derive(Debug, Deserialize)]
struct ApiJsonData {
    #[serde(default)]
    things: Vec<RawThing>,
}

#[derive(Debug, Deserialize)]
struct RawWikiEnvelope {
    data: RawWikiData,
}

#[derive(Debug, Deserialize)]
struct RawWikiData {
    content_md: String,
    revision_id: String,
}

#[derive(Debug, Deserialize)]
struct RawWikiConflict {
    newcontent: String,
    newrevision: String,
}

#[derive(Debug, Deserialize)]
struct RawUserListEnvelope {
    data: RawUserList,
}

#[derive(Debug, Deserialize)]
struct RawUserList {
    children: Vec<RawUser>,
}

#[derive(Debug, Deserialize)]
struct RawUser {
    name: String,
}

#[derive(Debug, Deserialize)]
struct RawSubredditEnvelope {
    data: RawSubredditData,
}

#[derive(Debug, Deserialize)]
struct RawSubredditData {
    name: String,
    display_name: String,
    subscribers: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ThingKind;

    #[test]
    fn parses_report_listing_children() {
        let raw = serde_json::json!({
            "kind": "t3",
            "data": {
                "name": "t3_5kgajm",
                "author": "some_user",
                "title": "A post",
                "permalink": "/r/testsub/comments/5kgajm/a_post/",
                "domain": "example.com",
                "mod_reports": [["foo", "TGB"], ["bar", "other_mod"]]
            }
        });
        let thing: RawThing = serde_json::from_value(raw).unwrap();
        let target = target_from_thing("test", &thing).unwrap();
        assert_eq!(target.kind(), ThingKind::Post);
        assert_eq!(target.author(), Some("some_user"));
        assert_eq!(thing.data.mod_reports.len(), 2);
        assert_eq!(thing.data.mod_reports[0].1, "TGB");
    }

    #[test]
    fn deleted_author_becomes_none() {
        let raw = serde_json::json!({
            "kind": "t1",
            "data": {
                "name": "t1_dbnq46o",
                "author": "[deleted]",
                "body": "hello",
                "permalink": "/r/testsub/comments/5kgajm/a_post/dbnq46o/",
                "link_id": "t3_5kgajm"
            }
        });
        let thing: RawThing = serde_json::from_value(raw).unwrap();
        let target = target_from_thing("test", &thing).unwrap();
        assert_eq!(target.author(), None);
        assert_eq!(target.author_or_deleted(), "[deleted]");
    }

    #[test]
    fn rejection_maps_too_old() {
        let errors = vec![vec![
            serde_json::json!("TOO_OLD"),
            serde_json::json!("that's old"),
            serde_json::json!("parent"),
        ]];
        assert!(matches!(
            rejection("/api/comment", &errors),
            Err(ApiError::TooOldToReply)
        ));
        assert!(rejection("/api/comment", &[]).is_ok());
    }
}
