/// The `builder` module contains the `GiteaBuilder` struct which is used to create a `Gitea` client.
use crate::{gitea::Gitea, instance::instance_url};
use anyhow::{anyhow, Result};
use log::debug;
use reqwest::{
    header::{HeaderMap, HeaderValue, USER_AGENT},
    Client,
};
use std::{env, time::Duration};
use url::Url;

const TOKEN_ENV_VAR: &str = "GITEA_TOKEN";

/// `GiteaBuilder` is used to create a [`Gitea`] client.
#[derive(Debug, Default)]
#[allow(clippy::module_name_repetitions)]
pub struct GiteaBuilder<'a> {
    api_base_url: Option<&'a str>,
    token: Option<&'a str>,
    skip_tls_verify: bool,
    timeout: Option<Duration>,
}

impl<'a> GiteaBuilder<'a> {
    /// Returns a new empty `GiteaBuilder`.
    #[must_use]
    pub fn new() -> Self {
        GiteaBuilder::default()
    }

    /// Set the base URL for the instance's API. This should be something like
    /// `https://gitea.example.com/api/v1`. Only the scheme, host, and port are used. Requests always
    /// go to `/api/v1` on that host.
    ///
    /// This is required.
    #[must_use]
    pub fn api_base_url(mut self, api_base_url: &'a str) -> Self {
        self.api_base_url = Some(api_base_url);
        self
    }

    /// Set a token to use for API requests. If this is not set, then the `GITEA_TOKEN` env var is
    /// used, if it is set.
    #[must_use]
    pub fn token(mut self, token: &'a str) -> Self {
        self.token = Some(token);
        self
    }

    /// Accept invalid TLS certificates from the instance. This is only meant for self-hosted
    /// instances using a self-signed certificate.
    #[must_use]
    pub fn skip_tls_verify(mut self, skip: bool) -> Self {
        self.skip_tls_verify = skip;
        self
    }

    /// Set a timeout for each request. By default there is no timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Builds a new [`Gitea`] client and returns it.
    ///
    /// # Errors
    ///
    /// Returns an error if the API base URL was not set or cannot be parsed, or if the HTTP client
    /// cannot be constructed.
    pub fn build(self) -> Result<Gitea> {
        let Some(api_base_url) = self.api_base_url else {
            return Err(anyhow!("You must set an API base URL"));
        };

        // This makes sure that we can derive the instance URL before we ever try to make a request.
        let instance = instance_url(api_base_url)?;
        debug!("Gitea instance is at {instance}");
        let api_base_url = Url::parse(api_base_url)?;

        let token = match self.token {
            Some(t) => Some(t.to_string()),
            None => {
                let t = env::var(TOKEN_ENV_VAR).ok().filter(|t| !t.is_empty());
                if t.is_some() {
                    debug!("Using Gitea token from the {TOKEN_ENV_VAR} environment variable.");
                }
                t
            }
        };

        Ok(Gitea::new(
            api_base_url,
            token,
            reqwest_client(self.skip_tls_verify, self.timeout)?,
        ))
    }
}

fn reqwest_client(skip_tls_verify: bool, timeout: Option<Duration>) -> Result<Client> {
    let mut builder = Client::builder().gzip(true);
    if skip_tls_verify {
        debug!("TLS certificate verification is disabled.");
        builder = builder.danger_accept_invalid_certs(true);
    }
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }

    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(&format!("gitea-release version {}", super::VERSION))?,
    );
    Ok(builder.default_headers(headers).build()?)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::ReleaseError;
    use serial_test::serial;
    use test_log::test;

    #[test]
    fn build_requires_api_base_url() {
        let res = GiteaBuilder::new().token("t").build();
        assert!(res.is_err());
    }

    #[test]
    fn build_rejects_bad_api_base_url() {
        let err = GiteaBuilder::new()
            .api_base_url("gitea.example.com")
            .build()
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ReleaseError>(),
            Some(ReleaseError::ParseError(_))
        ));
    }

    #[test]
    #[serial]
    fn token_from_env() -> Result<()> {
        let orig = env::var(TOKEN_ENV_VAR).ok();
        env::set_var(TOKEN_ENV_VAR, "from-env");

        let gitea = GiteaBuilder::new()
            .api_base_url("https://gitea.example.com/api/v1")
            .build()?;
        assert_eq!(gitea.token.as_deref(), Some("from-env"));

        let gitea = GiteaBuilder::new()
            .api_base_url("https://gitea.example.com/api/v1")
            .token("explicit")
            .build()?;
        assert_eq!(gitea.token.as_deref(), Some("explicit"));

        env::remove_var(TOKEN_ENV_VAR);
        let gitea = GiteaBuilder::new()
            .api_base_url("https://gitea.example.com/api/v1")
            .build()?;
        assert_eq!(gitea.token, None);

        if let Some(orig) = orig {
            env::set_var(TOKEN_ENV_VAR, orig);
        }

        Ok(())
    }

    #[test]
    fn build_with_all_options() -> Result<()> {
        let gitea = GiteaBuilder::new()
            .api_base_url("https://gitea.example.com:8443/api/v1")
            .token("t")
            .skip_tls_verify(true)
            .timeout(Duration::from_secs(30))
            .build()?;
        assert_eq!(gitea.instance_url()?, "https://gitea.example.com:8443");
        Ok(())
    }
}
