use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::Response;

use crate::{Error, Result, OAUTH_TOKEN_KEY, OAUTH_TOKEN_SECRET_KEY};

/// A token-issuing response body (form-urlencoded, not JSON).
#[derive(Debug)]
pub struct TokenResponse {
    /// OAuth token.
    pub oauth_token: String,
    /// OAuth token secret.
    pub oauth_token_secret: String,
    /// Remaining fields, e.g. `oauth_callback_confirmed` or `screen_name`.
    pub remain: HashMap<String, String>,
}

/// Adds `read_token_response` to `reqwest::Response`.
// sealed: the token endpoints are the only place this decoding is valid
#[async_trait(?Send)]
pub trait ReadTokenResponse: private::Sealed {
    async fn read_token_response(self) -> Result<TokenResponse>;
}

#[async_trait(?Send)]
impl ReadTokenResponse for Response {
    async fn read_token_response(self) -> Result<TokenResponse> {
        read_token_body(&self.text().await?)
    }
}

pub(crate) fn read_token_body(body: &str) -> Result<TokenResponse> {
    let mut fields: HashMap<String, String> = serde_urlencoded::from_str(body)
        .map_err(|e| Error::Protocol(format!("unparsable token response '{body}': {e}")))?;
    let oauth_token = fields
        .remove(OAUTH_TOKEN_KEY)
        .ok_or_else(|| Error::Protocol(format!("{OAUTH_TOKEN_KEY} not found in '{body}'")))?;
    let oauth_token_secret = fields.remove(OAUTH_TOKEN_SECRET_KEY).ok_or_else(|| {
        Error::Protocol(format!("{OAUTH_TOKEN_SECRET_KEY} not found in '{body}'"))
    })?;
    Ok(TokenResponse {
        oauth_token,
        oauth_token_secret,
        remain: fields,
    })
}

mod private {
    pub trait Sealed {}
    impl Sealed for reqwest::Response {}
}
