use reqwest::StatusCode;
use thiserror::Error;

/// The kinds of errors this crate returns. Public methods return [`anyhow::Error`], so use
/// `err.downcast_ref::<ReleaseError>()` to find out which kind of failure occurred.
#[derive(Debug, Error)]
#[allow(clippy::module_name_repetitions)]
pub enum ReleaseError {
    /// A URL or a numeric release id could not be parsed. This is always detected before any
    /// request is made.
    #[error("{0}")]
    ParseError(String),

    /// The release name template could not be rendered. This is always detected before any request
    /// is made.
    #[error("could not render release name template `{template}`: {message}")]
    TemplateError { template: String, message: String },

    /// The Gitea instance returned a non-success response, or the request could not be sent at all.
    /// When the instance sent an error message, that message is what this displays.
    #[error("{message}")]
    RemoteError {
        status: Option<StatusCode>,
        message: String,
    },

    /// A [`ReleaseContext`](crate::ReleaseContext) was missing a required field.
    #[error("invalid release context: {0}")]
    InvalidContext(String),
}

#[derive(serde::Deserialize)]
struct ApiErrorBody {
    message: String,
}

impl ReleaseError {
    /// Builds a `RemoteError` from a non-success response. Gitea sends `{"message": "..."}` for most
    /// errors, and that message is used as-is. Otherwise we fall back to the status and the raw
    /// body.
    pub(crate) fn from_response_parts(status: StatusCode, body: &str) -> Self {
        let message = match serde_json::from_str::<ApiErrorBody>(body) {
            Ok(e) if !e.message.is_empty() => e.message,
            Ok(_) | Err(_) => {
                let mut message = format!("Unknown API Error: {}", status.as_u16());
                if !body.is_empty() {
                    message.push('\n');
                    message.push_str(body);
                }
                message
            }
        };

        ReleaseError::RemoteError {
            status: Some(status),
            message,
        }
    }
}

impl From<reqwest::Error> for ReleaseError {
    fn from(e: reqwest::Error) -> Self {
        ReleaseError::RemoteError {
            status: e.status(),
            message: e.to_string(),
        }
    }
}
