use crate::error::ReleaseError;
use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeMap;

const DEFAULT_NAME_TEMPLATE: &str = "{{ Tag }}";
const SHORT_COMMIT_LEN: usize = 7;

/// An immutable snapshot of everything needed to create, update, and upload to a release. Use the
/// [`ReleaseContextBuilder`] to make one.
///
/// The serialized form of this struct is what the release name template is rendered against, so
/// its field names are the names available in the template.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReleaseContext {
    pub(crate) project_name: String,
    #[serde(skip)]
    pub(crate) name_template: String,
    pub(crate) owner: String,
    pub(crate) repo: String,
    pub(crate) tag: String,
    pub(crate) commit: String,
    pub(crate) short_commit: String,
    pub(crate) version: String,
    pub(crate) draft: bool,
    pub(crate) prerelease: bool,
    pub(crate) env: BTreeMap<String, String>,
}

impl ReleaseContext {
    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    #[must_use]
    pub fn repo(&self) -> &str {
        &self.repo
    }

    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    #[must_use]
    pub fn commit(&self) -> &str {
        &self.commit
    }

    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    #[must_use]
    pub fn name_template(&self) -> &str {
        &self.name_template
    }
}

/// `ReleaseContextBuilder` is used to create a [`ReleaseContext`].
#[derive(Debug, Default)]
#[allow(clippy::module_name_repetitions)]
pub struct ReleaseContextBuilder {
    project_name: Option<String>,
    name_template: Option<String>,
    owner: Option<String>,
    repo: Option<String>,
    tag: Option<String>,
    commit: Option<String>,
    short_commit: Option<String>,
    version: Option<String>,
    draft: bool,
    prerelease: bool,
    env: BTreeMap<String, String>,
}

impl ReleaseContextBuilder {
    /// Returns a new empty `ReleaseContextBuilder`.
    #[must_use]
    pub fn new() -> Self {
        ReleaseContextBuilder::default()
    }

    /// The project's name, available in the name template as `ProjectName`. Defaults to the repo
    /// name.
    #[must_use]
    pub fn project_name(mut self, project_name: impl Into<String>) -> Self {
        self.project_name = Some(project_name.into());
        self
    }

    /// The template used to render the release's title. Defaults to `{{ Tag }}`. Fields may be
    /// written with or without a leading dot, so `{{ .Version }}` and `{{ Version }}` are the same.
    #[must_use]
    pub fn name_template(mut self, name_template: impl Into<String>) -> Self {
        self.name_template = Some(name_template.into());
        self
    }

    /// The owner (user or organization) of the repo. Required.
    #[must_use]
    pub fn owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    /// The repo name. Required.
    #[must_use]
    pub fn repo(mut self, repo: impl Into<String>) -> Self {
        self.repo = Some(repo.into());
        self
    }

    /// The git tag for the release. Required.
    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// The commit the tag points to. Required.
    #[must_use]
    pub fn commit(mut self, commit: impl Into<String>) -> Self {
        self.commit = Some(commit.into());
        self
    }

    /// The abbreviated commit. Defaults to the first seven characters of the commit.
    #[must_use]
    pub fn short_commit(mut self, short_commit: impl Into<String>) -> Self {
        self.short_commit = Some(short_commit.into());
        self
    }

    /// The version being released. Defaults to the tag with any leading `v` removed.
    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Mark the release as a draft.
    #[must_use]
    pub fn draft(mut self, draft: bool) -> Self {
        self.draft = draft;
        self
    }

    /// Mark the release as a prerelease.
    #[must_use]
    pub fn prerelease(mut self, prerelease: bool) -> Self {
        self.prerelease = prerelease;
        self
    }

    /// Adds an entry that the name template can use as `Env.<KEY>`.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Builds a new [`ReleaseContext`].
    ///
    /// # Errors
    ///
    /// Returns a [`ReleaseError::InvalidContext`] if the owner, repo, tag, or commit are missing or
    /// empty.
    pub fn build(self) -> Result<ReleaseContext> {
        let owner = required("owner", self.owner)?;
        let repo = required("repo", self.repo)?;
        let tag = required("tag", self.tag)?;
        let commit = required("commit", self.commit)?;

        let short_commit = self
            .short_commit
            .unwrap_or_else(|| commit.chars().take(SHORT_COMMIT_LEN).collect());
        let version = self
            .version
            .unwrap_or_else(|| tag.strip_prefix('v').unwrap_or(&tag).to_string());

        Ok(ReleaseContext {
            project_name: self.project_name.unwrap_or_else(|| repo.clone()),
            name_template: self
                .name_template
                .unwrap_or_else(|| DEFAULT_NAME_TEMPLATE.to_string()),
            owner,
            repo,
            tag,
            commit,
            short_commit,
            version,
            draft: self.draft,
            prerelease: self.prerelease,
            env: self.env,
        })
    }
}

fn required(name: &str, value: Option<String>) -> Result<String> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        Some(_) | None => {
            Err(ReleaseError::InvalidContext(format!("the {name} must be set")).into())
        }
    }
}

/// An artifact to upload as a release attachment. The name is what the attachment will be called
/// on the release.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Artifact {
    pub(crate) name: String,
}

impl Artifact {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn builder() -> ReleaseContextBuilder {
        ReleaseContextBuilder::new()
            .owner("owner")
            .repo("repoName")
            .tag("v6.6.6")
            .commit("0123456789abcdef")
    }

    #[test]
    fn build_with_defaults() -> Result<()> {
        let ctx = builder().build()?;
        assert_eq!(ctx.project_name, "repoName");
        assert_eq!(ctx.name_template(), DEFAULT_NAME_TEMPLATE);
        assert_eq!(ctx.short_commit, "0123456");
        assert_eq!(ctx.version, "6.6.6");
        assert!(!ctx.draft);
        assert!(!ctx.prerelease);
        Ok(())
    }

    #[test]
    fn build_with_explicit_values() -> Result<()> {
        let ctx = builder()
            .project_name("project")
            .name_template("{{ .ProjectName }}_{{ .Version }}")
            .short_commit("01")
            .version("6.6.6-rc1")
            .draft(true)
            .prerelease(true)
            .env("FOO", "bar")
            .build()?;
        assert_eq!(ctx.project_name, "project");
        assert_eq!(ctx.short_commit, "01");
        assert_eq!(ctx.version, "6.6.6-rc1");
        assert!(ctx.draft);
        assert!(ctx.prerelease);
        assert_eq!(ctx.env.get("FOO").map(String::as_str), Some("bar"));
        Ok(())
    }

    #[test]
    fn short_commit_from_short_hash() -> Result<()> {
        let ctx = builder().commit("abc").build()?;
        assert_eq!(ctx.short_commit, "abc");
        Ok(())
    }

    #[test]
    fn serializes_with_template_field_names() -> Result<()> {
        let ctx = builder().env("FOO", "bar").build()?;
        let value = serde_json::to_value(&ctx)?;
        assert_eq!(value["ProjectName"], "repoName");
        assert_eq!(value["ShortCommit"], "0123456");
        assert_eq!(value["Env"]["FOO"], "bar");
        assert!(value.get("NameTemplate").is_none());
        Ok(())
    }

    #[rstest]
    #[case::no_owner(ReleaseContextBuilder::new().repo("r").tag("t").commit("c"), "owner")]
    #[case::no_repo(ReleaseContextBuilder::new().owner("o").tag("t").commit("c"), "repo")]
    #[case::no_tag(ReleaseContextBuilder::new().owner("o").repo("r").commit("c"), "tag")]
    #[case::empty_tag(ReleaseContextBuilder::new().owner("o").repo("r").tag("").commit("c"), "tag")]
    #[case::no_commit(ReleaseContextBuilder::new().owner("o").repo("r").tag("t"), "commit")]
    fn build_requires_fields(#[case] builder: ReleaseContextBuilder, #[case] missing: &str) {
        let err = builder.build().unwrap_err();
        match err.downcast_ref::<ReleaseError>() {
            Some(ReleaseError::InvalidContext(msg)) => {
                assert!(msg.contains(missing), "error `{msg}` mentions {missing}");
            }
            other => panic!("expected an invalid context error, got {other:?}"),
        }
    }
}
