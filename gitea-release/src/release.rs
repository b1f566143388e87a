use crate::context::ReleaseContext;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// A release as returned by the Gitea API. Only the fields this crate cares about are included.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
pub struct Release {
    pub id: i64,
    pub tag_name: String,
    #[serde(default, rename = "target_commitish")]
    pub target: String,
    #[serde(default, rename = "name")]
    pub title: String,
    #[serde(default, rename = "body")]
    pub note: String,
    #[serde(default, rename = "draft")]
    pub is_draft: bool,
    #[serde(default, rename = "prerelease")]
    pub is_prerelease: bool,
    #[serde(default)]
    pub html_url: Option<Url>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub assets: Vec<Attachment>,
}

/// A file attached to a release.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
pub struct Attachment {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub size: i64,
    #[serde(default)]
    pub browser_download_url: Option<Url>,
}

/// The body for both the create and the edit release endpoints. Gitea's edit endpoint treats every
/// field as optional, but we always send all of them, so the release always ends up matching the
/// current context.
#[derive(Debug, PartialEq, Eq, Serialize)]
pub(crate) struct ReleasePayload<'a> {
    pub(crate) tag_name: &'a str,
    pub(crate) target_commitish: &'a str,
    pub(crate) name: &'a str,
    pub(crate) body: &'a str,
    pub(crate) draft: bool,
    pub(crate) prerelease: bool,
}

impl<'a> ReleasePayload<'a> {
    pub(crate) fn new(ctx: &'a ReleaseContext, title: &'a str, description: &'a str) -> Self {
        Self {
            tag_name: &ctx.tag,
            target_commitish: &ctx.commit,
            name: title,
            body: description,
            draft: ctx.draft,
            prerelease: ctx.prerelease,
        }
    }
}
