use crate::{
    client::ReleaseClient,
    context::{Artifact, ReleaseContext},
    error::ReleaseError,
    instance,
    release::{Release, ReleasePayload},
    template,
};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{
    header::{HeaderValue, ACCEPT, AUTHORIZATION},
    multipart, Client, Method, RequestBuilder, Response,
};
use serde::de::DeserializeOwned;
use std::io::Read;
use url::Url;

/// A client for the release API of a Gitea (or Forgejo) instance. Use the
/// [`GiteaBuilder`](crate::GiteaBuilder) struct to create one.
///
/// The client holds no state beyond its configuration, so it can be shared between tasks, for
/// example to upload several artifacts at once.
#[derive(Debug)]
pub struct Gitea {
    api_base_url: Url,
    pub(crate) token: Option<String>,
    client: Client,
}

impl Gitea {
    pub(crate) fn new(api_base_url: Url, token: Option<String>, client: Client) -> Self {
        Self {
            api_base_url,
            token,
            client,
        }
    }

    /// Returns the root URL of the instance this client talks to, like
    /// `https://gitea.example.com`.
    ///
    /// # Errors
    ///
    /// Returns a [`ReleaseError::ParseError`] if the configured API base URL has no host.
    pub fn instance_url(&self) -> Result<String> {
        instance::instance_url(self.api_base_url.as_str())
    }

    /// Looks for a release with the given tag. This fetches the repo's release list and returns the
    /// first release with a matching tag name. If no release matches this returns `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns a [`ReleaseError::RemoteError`] if the list request fails or the response body cannot
    /// be parsed.
    pub async fn find_release(
        &self,
        owner: &str,
        repo: &str,
        tag: &str,
    ) -> Result<Option<Release>> {
        let url = self.releases_url(owner, repo, &[])?;
        debug!("Listing releases from `{url}`");

        let resp = self.send(self.request(Method::GET, url)).await?;
        let releases = json::<Vec<Release>>(resp).await?;
        debug!("Found {} releases for {owner}/{repo}", releases.len());

        Ok(releases.into_iter().find(|r| r.tag_name == tag))
    }

    /// Creates a new release for the context's tag and commit.
    ///
    /// # Errors
    ///
    /// Returns a [`ReleaseError::RemoteError`] if the instance rejects the request.
    pub async fn create_release(
        &self,
        ctx: &ReleaseContext,
        title: &str,
        description: &str,
    ) -> Result<Release> {
        let url = self.releases_url(&ctx.owner, &ctx.repo, &[])?;
        debug!("Creating release for tag `{}` at `{url}`", ctx.tag);

        let payload = ReleasePayload::new(ctx, title, description);
        let release =
            json::<Release>(self.send(self.request(Method::POST, url).json(&payload)).await?)
                .await?;
        debug!("Created release {} for tag `{}`", release.id, ctx.tag);

        Ok(release)
    }

    /// Updates an existing release so that it matches the context. The draft and prerelease flags
    /// are always taken from the context, replacing whatever the release had before.
    ///
    /// # Errors
    ///
    /// Returns a [`ReleaseError::RemoteError`] if the instance rejects the request.
    pub async fn update_release(
        &self,
        ctx: &ReleaseContext,
        title: &str,
        description: &str,
        id: i64,
    ) -> Result<Release> {
        let url = self.releases_url(&ctx.owner, &ctx.repo, &[&id.to_string()])?;
        debug!("Updating release {id} at `{url}`");

        let payload = ReleasePayload::new(ctx, title, description);
        json::<Release>(self.send(self.request(Method::PATCH, url).json(&payload)).await?).await
    }

    /// Returns the URL from which an uploaded artifact can be downloaded, like
    /// `https://gitea.example.com/owner/repo/releases/download/v1.0.0/project.tar.gz`.
    ///
    /// # Errors
    ///
    /// Returns a [`ReleaseError::ParseError`] if the configured API base URL has no host.
    pub fn download_url(&self, ctx: &ReleaseContext, artifact_name: &str) -> Result<String> {
        let mut url = Url::parse(&self.instance_url()?)?;
        url.path_segments_mut()
            .map_err(|()| anyhow!("the instance URL cannot be a base"))?
            .pop_if_empty()
            .extend([
                ctx.owner.as_str(),
                ctx.repo.as_str(),
                "releases",
                "download",
                ctx.tag.as_str(),
                artifact_name,
            ]);
        Ok(url.to_string())
    }

    fn releases_url(&self, owner: &str, repo: &str, rest: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/api/v1/", self.instance_url()?))?;
        url.path_segments_mut()
            .map_err(|()| anyhow!("the instance URL cannot be a base"))?
            .pop_if_empty()
            .extend(["repos", owner, repo, "releases"])
            .extend(rest);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client
            .request(method, url)
            .header(ACCEPT, HeaderValue::from_static("application/json"))
    }

    async fn send(&self, req_builder: RequestBuilder) -> Result<Response> {
        let req = self
            .maybe_add_token_header(req_builder)?
            .build()
            .map_err(ReleaseError::from)?;
        let resp = self
            .client
            .execute(req)
            .await
            .map_err(ReleaseError::from)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            debug!("Request failed with {status}: {body}");
            return Err(ReleaseError::from_response_parts(status, &body).into());
        }

        Ok(resp)
    }

    fn maybe_add_token_header(&self, mut req_builder: RequestBuilder) -> Result<RequestBuilder> {
        if let Some(token) = self.token.as_deref() {
            debug!("Adding token to Gitea request.");
            let mut auth_val = HeaderValue::from_str(&format!("token {token}"))
                .context("the Gitea token is not a valid header value")?;
            auth_val.set_sensitive(true);
            req_builder = req_builder.header(AUTHORIZATION, auth_val);
        } else {
            debug!("No Gitea token given.");
        }
        Ok(req_builder)
    }
}

async fn json<T: DeserializeOwned>(resp: Response) -> Result<T> {
    resp.json::<T>()
        .await
        .map_err(|e| ReleaseError::from(e).into())
}

fn parse_release_id(release_id: &str) -> Result<i64> {
    release_id.parse::<i64>().map_err(|e| {
        ReleaseError::ParseError(format!(
            "could not parse release id `{release_id}` as an integer: {e}"
        ))
        .into()
    })
}

#[async_trait]
impl ReleaseClient for Gitea {
    async fn ensure_release(&self, ctx: &ReleaseContext, description: &str) -> Result<String> {
        let title = template::render_release_name(ctx)?;

        // If another process creates a release for this tag between the lookup and the create, we
        // will end up with two releases for the same tag. Gitea gives us no way to prevent that.
        let id = match self.find_release(&ctx.owner, &ctx.repo, &ctx.tag).await? {
            Some(existing) => {
                debug!(
                    "Release {} already exists for tag `{}`, updating it",
                    existing.id, ctx.tag
                );
                self.update_release(ctx, &title, description, existing.id)
                    .await?;
                existing.id
            }
            None => {
                debug!("No release exists for tag `{}`, creating one", ctx.tag);
                self.create_release(ctx, &title, description).await?.id
            }
        };

        Ok(id.to_string())
    }

    async fn upload(
        &self,
        ctx: &ReleaseContext,
        release_id: &str,
        artifact: &Artifact,
        content: &mut (dyn Read + Send),
    ) -> Result<()> {
        let id = parse_release_id(release_id)?;

        let mut bytes = Vec::new();
        content
            .read_to_end(&mut bytes)
            .with_context(|| format!("failed to read the contents of `{}`", artifact.name))?;

        let mut url = self.releases_url(&ctx.owner, &ctx.repo, &[&id.to_string(), "assets"])?;
        url.query_pairs_mut().append_pair("name", &artifact.name);
        debug!(
            "Uploading {} bytes for `{}` to `{url}`",
            bytes.len(),
            artifact.name
        );

        let form = multipart::Form::new().part(
            "attachment",
            multipart::Part::bytes(bytes).file_name(artifact.name.clone()),
        );
        self.send(self.request(Method::POST, url).multipart(form))
            .await?;
        debug!("Uploaded `{}` to release {id}", artifact.name);

        Ok(())
    }

    async fn create_file(
        &self,
        ctx: &ReleaseContext,
        path: &str,
        _content: &[u8],
        _message: &str,
    ) -> Result<()> {
        warn!(
            "Creating files is not supported for Gitea, so `{path}` was not committed to {}/{}",
            ctx.owner, ctx.repo,
        );
        Ok(())
    }
}
