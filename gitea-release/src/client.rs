use crate::context::{Artifact, ReleaseContext};
use anyhow::Result;
use async_trait::async_trait;
use std::{fmt::Debug, io::Read};

/// The operations a release-automation tool needs from a forge. Each forge backend implements
/// this. The caller picks the implementation when it starts up.
#[async_trait]
#[allow(clippy::module_name_repetitions)]
pub trait ReleaseClient: Debug + Send + Sync {
    /// Makes sure a release exists for the context's tag, creating it or updating the existing one,
    /// and returns the release's id. The release title is rendered from the context's name
    /// template.
    ///
    /// # Errors
    ///
    /// Returns a [`ReleaseError::TemplateError`](crate::ReleaseError::TemplateError) before making
    /// any request if the name template cannot be rendered, and a
    /// [`ReleaseError::RemoteError`](crate::ReleaseError::RemoteError) if any request fails.
    async fn ensure_release(&self, ctx: &ReleaseContext, description: &str) -> Result<String>;

    /// Uploads the full contents of `content` as an attachment named after the artifact to the
    /// release with the given id. The id is the value returned by `ensure_release`.
    ///
    /// The whole stream is read into memory before the request is sent, so uploading a very large
    /// artifact needs that much memory.
    ///
    /// # Errors
    ///
    /// Returns a [`ReleaseError::ParseError`](crate::ReleaseError::ParseError) before making any
    /// request if the id is not an integer, and a
    /// [`ReleaseError::RemoteError`](crate::ReleaseError::RemoteError) if the upload fails.
    async fn upload(
        &self,
        ctx: &ReleaseContext,
        release_id: &str,
        artifact: &Artifact,
        content: &mut (dyn Read + Send),
    ) -> Result<()>;

    /// Commits a file to the context's repo.
    ///
    /// # Errors
    ///
    /// Returns an error if the commit fails.
    async fn create_file(
        &self,
        ctx: &ReleaseContext,
        path: &str,
        content: &[u8],
        message: &str,
    ) -> Result<()>;
}
