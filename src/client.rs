use std::collections::BTreeMap;
use std::sync::Arc;

use http::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::credentials::{AppCredentials, TokenStore};
use crate::escape::form_urlencode;
use crate::signer::{OAuthParameters, Signer};
use crate::{Error, Result};

/// Service endpoints, overridable for proxies and tests.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub api: String,
    pub bearer_token: String,
    pub request_token: String,
    pub authorize: String,
    pub access_token: String,
    pub upload: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Endpoints {
            api: "https://api.twitter.com/1.1".to_owned(),
            bearer_token: "https://api.twitter.com/oauth2/token".to_owned(),
            request_token: "https://api.twitter.com/oauth/request_token".to_owned(),
            authorize: "https://api.twitter.com/oauth/authorize".to_owned(),
            access_token: "https://api.twitter.com/oauth/access_token".to_owned(),
            upload: "https://upload.twitter.com/1.1/media/upload.json".to_owned(),
        }
    }
}

impl Endpoints {
    /// Derive every endpoint from a single base URL.
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Endpoints {
            api: format!("{base}/1.1"),
            bearer_token: format!("{base}/oauth2/token"),
            request_token: format!("{base}/oauth/request_token"),
            authorize: format!("{base}/oauth/authorize"),
            access_token: format!("{base}/oauth/access_token"),
            upload: format!("{base}/1.1/media/upload.json"),
        }
    }
}

/// Core API client.
///
/// Holds the app credentials, the runtime token store and the HTTP transport.
/// End-user operations are built on [`Client::get`] and [`Client::post`];
/// the authorization handshake and the media-upload pipeline live in their
/// own modules.
pub struct Client {
    pub(crate) http: reqwest::Client,
    pub(crate) app: AppCredentials,
    pub(crate) tokens: Arc<dyn TokenStore>,
    pub(crate) endpoints: Endpoints,
}

impl Client {
    pub fn new(app: AppCredentials, tokens: Arc<dyn TokenStore>) -> Self {
        Client::with_endpoints(app, tokens, Endpoints::default())
    }

    pub fn with_endpoints(
        app: AppCredentials,
        tokens: Arc<dyn TokenStore>,
        endpoints: Endpoints,
    ) -> Self {
        Client {
            http: reqwest::Client::new(),
            app,
            tokens,
            endpoints,
        }
    }

    /// Replace the inner `reqwest::Client`.
    pub fn http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// `GET {api}/{path}.json` with the auth-header priority rule: sign with
    /// the user token when one exists, otherwise fall back to the app bearer
    /// token.
    pub async fn get<T>(&self, path: &str, query: &BTreeMap<String, String>) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let endpoint = format!("{}/{}.json", self.endpoints.api, path);
        let auth = self.auth_header(&Method::GET, &endpoint, query)?;
        self.get_json(&endpoint, query, auth).await
    }

    /// `POST {api}/{path}.json`. Posting always requires a user token; an app
    /// bearer token cannot sign write operations.
    pub async fn post<T>(&self, path: &str, form: &BTreeMap<String, String>) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let endpoint = format!("{}/{}.json", self.endpoints.api, path);
        let auth = self.user_auth_header(&Method::POST, &endpoint, form)?;
        self.post_form(&endpoint, form, auth).await
    }

    // ------------------------------------------------------------------
    // Header construction

    pub(crate) fn auth_header(
        &self,
        method: &Method,
        endpoint: &str,
        params: &BTreeMap<String, String>,
    ) -> Result<String> {
        if self.tokens.has_user_token() {
            return self.user_auth_header(method, endpoint, params);
        }
        if let Some(token) = self.tokens.app_token() {
            return Ok(format!("Bearer {token}"));
        }
        Err(Error::Unauthenticated)
    }

    pub(crate) fn user_auth_header(
        &self,
        method: &Method,
        endpoint: &str,
        extra_params: &BTreeMap<String, String>,
    ) -> Result<String> {
        let user = self.tokens.user_token().ok_or(Error::UserTokenRequired)?;
        Ok(self.sign_with(
            (&user.token, &user.secret),
            OAuthParameters::new(),
            method,
            endpoint,
            extra_params,
        ))
    }

    /// Sign with an explicit token pair; the authorization handshake signs
    /// with tokens that never reach the store.
    pub(crate) fn sign_with(
        &self,
        token: (&str, &str),
        parameters: OAuthParameters<'_>,
        method: &Method,
        endpoint: &str,
        extra_params: &BTreeMap<String, String>,
    ) -> String {
        Signer::new(
            (&self.app.consumer_key, &self.app.consumer_secret),
            token,
            parameters,
        )
        .authorization_header(method, endpoint, extra_params)
    }

    // ------------------------------------------------------------------
    // Request execution

    pub(crate) async fn get_json<T>(
        &self,
        endpoint: &str,
        query: &BTreeMap<String, String>,
        auth: String,
    ) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let url = if query.is_empty() {
            endpoint.to_owned()
        } else {
            let encoded = form_urlencode(query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
            format!("{endpoint}?{encoded}")
        };
        debug!(%url, "GET");
        let response = self
            .http
            .get(&url)
            .header(AUTHORIZATION, auth)
            .send()
            .await?;
        let body = ensure_success(response).await?.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    pub(crate) async fn post_form<T>(
        &self,
        endpoint: &str,
        form: &BTreeMap<String, String>,
        auth: String,
    ) -> Result<T>
    where
        T: DeserializeOwned,
    {
        // The body is encoded with the same strict escape that went into the
        // signature base string; the two must agree byte for byte.
        let body = form_urlencode(form.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        debug!(endpoint, "POST");
        let response = self
            .http
            .post(endpoint)
            .header(AUTHORIZATION, auth)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await?;
        let body = ensure_success(response).await?.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

/// Pass a successful response through, surfacing anything else as
/// [`Error::Http`] with the body attached.
pub(crate) async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let url = response.url().to_string();
    let body = response.text().await.unwrap_or_default();
    warn!(%url, status = status.as_u16(), "request failed");
    Err(Error::Http {
        url,
        status: status.as_u16(),
        error: status.canonical_reason().unwrap_or_default().to_owned(),
        body,
    })
}
