use crate::error::ReleaseError;
use anyhow::Result;
use url::Url;

/// Returns the root URL of a Gitea instance given its API base URL, so
/// `https://gitea.example.com/api/v1` becomes `https://gitea.example.com`. A non-default port is
/// kept as part of the host.
///
/// # Errors
///
/// Returns a [`ReleaseError::ParseError`] if the given string is empty, has no scheme, has no host,
/// or is not a valid URL.
pub fn instance_url(api_base_url: &str) -> Result<String> {
    if api_base_url.is_empty() {
        return Err(ReleaseError::ParseError("the API base URL is empty".to_string()).into());
    }

    let url = Url::parse(api_base_url).map_err(|e| {
        ReleaseError::ParseError(format!("could not parse `{api_base_url}` as a URL: {e}"))
    })?;

    let host = match url.host_str() {
        Some(h) if !h.is_empty() => h,
        _ => {
            return Err(ReleaseError::ParseError(format!(
                "the URL `{api_base_url}` does not have a host"
            ))
            .into())
        }
    };

    // `port()` is `None` when the port is the scheme's default.
    Ok(match url.port() {
        Some(port) => format!("{}://{host}:{port}", url.scheme()),
        None => format!("{}://{host}", url.scheme()),
    })
}
