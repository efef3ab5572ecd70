use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// The server answered with a non-success status.
    #[error("request to '{url}' failed: {status} '{error}' '{body}'")]
    Http {
        url: String,
        status: u16,
        error: String,
        body: String,
    },
    /// The request never completed (connection, TLS, timeout, ...).
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    /// A response violated a guarantee of the remote protocol.
    #[error("protocol violation: {0}")]
    Protocol(String),
    /// Neither an app bearer token nor a user token has been granted.
    #[error("neither app nor user has been authenticated")]
    Unauthenticated,
    /// The operation requires user-context signing but no user token exists.
    #[error("user token has not been granted")]
    UserTokenRequired,
    /// The callback URL could not be parsed or is missing OAuth parameters.
    #[error("malformed callback: {0}")]
    MalformedCallback(String),
    /// The callback carried a different token than the pending request token.
    #[error("callback oauth_token does not match the request token")]
    TokenMismatch,
    /// The server reported a media processing failure.
    #[error("media processing failed: {code} {name}: {message}")]
    MediaProcessing {
        code: i64,
        name: String,
        message: String,
    },
    /// The opt-in status-check cap was exceeded while media was processing.
    #[error("media still processing after {0} status checks")]
    ProcessingTimedOut(u32),
    /// A response body did not match the expected JSON shape.
    #[error("response decode failed: {0}")]
    Decode(#[from] serde_json::Error),
}
