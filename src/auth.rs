//! Application and user authorization.
//!
//! App-only authorization exchanges the consumer key pair for a bearer token.
//! User authorization is the three-legged handshake: obtain a request token,
//! send the user to the authorize URL, then exchange the verifier they bring
//! back. The request-token state is an explicit [`RequestTokenSession`] value
//! threaded through the steps, so independent flows never share state.

use std::collections::BTreeMap;

use http::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use tracing::{debug, warn};
use url::Url;

use crate::client::{ensure_success, Client};
use crate::escape::form_urlencode;
use crate::models::BearerToken;
use crate::signer::OAuthParameters;
use crate::token_reader::ReadTokenResponse;
use crate::{
    Error, Result, OAUTH_CALLBACK_CONFIRMED_KEY, OAUTH_TOKEN_KEY, OAUTH_VERIFIER_KEY,
};

/// Request token pair issued by the first step of the handshake.
///
/// Consumed by the verifier exchange; must not outlive one authorization
/// attempt. Distinct sessions may run concurrently.
#[derive(Debug, Clone)]
pub struct RequestTokenSession {
    request_token: String,
    request_token_secret: String,
}

impl RequestTokenSession {
    pub fn request_token(&self) -> &str {
        &self.request_token
    }
}

/// Outcome of a verifier exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifierOutcome {
    /// Access tokens were granted and written to the token store.
    Granted,
    /// The server answered 401. A mistyped PIN lands here; the session stays
    /// valid, retry with a corrected verifier.
    Rejected,
}

impl Client {
    /// Application-only authorization: exchange the consumer key pair for a
    /// bearer token and store it.
    pub async fn authorize_app(&self) -> Result<()> {
        debug!("requesting app bearer token");
        let response = self
            .http
            .post(&self.endpoints.bearer_token)
            .basic_auth(&self.app.consumer_key, Some(&self.app.consumer_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;
        let body = ensure_success(response).await?.text().await?;
        let bearer: BearerToken = serde_json::from_str(&body)?;
        if !bearer.token_type.eq_ignore_ascii_case("bearer") {
            return Err(Error::Protocol(format!(
                "unexpected token_type '{}'",
                bearer.token_type
            )));
        }
        self.tokens.set_app_token(&bearer.access_token);
        Ok(())
    }

    /// Step 1 of the user handshake: obtain a request token.
    ///
    /// Returns the session and the URL to open in a browser. Pass `oob` as
    /// the callback URL for PIN-based authorization.
    ///
    /// The request is signed with the app's own long-lived token pair; the
    /// service expects this instead of an empty token for request-token
    /// issuance.
    pub async fn request_user_authentication(
        &self,
        callback_url: &str,
    ) -> Result<(RequestTokenSession, String)> {
        let endpoint = self.endpoints.request_token.clone();
        let auth = self.sign_with(
            (&self.app.access_token, &self.app.access_token_secret),
            OAuthParameters::new().callback(callback_url),
            &Method::POST,
            &endpoint,
            &BTreeMap::new(),
        );

        debug!(%endpoint, "requesting request token");
        let response = self
            .http
            .post(&endpoint)
            .header(AUTHORIZATION, auth)
            .send()
            .await?;
        let grant = ensure_success(response).await?.read_token_response().await?;

        if grant
            .remain
            .get(OAUTH_CALLBACK_CONFIRMED_KEY)
            .map(String::as_str)
            != Some("true")
        {
            return Err(Error::Protocol(format!(
                "{OAUTH_CALLBACK_CONFIRMED_KEY} was not true"
            )));
        }

        let session = RequestTokenSession {
            request_token: grant.oauth_token,
            request_token_secret: grant.oauth_token_secret,
        };
        let authenticate_url = format!(
            "{}?oauth_token={}",
            self.endpoints.authorize, session.request_token
        );
        Ok((session, authenticate_url))
    }

    /// Step 2, callback variant: complete the handshake from the callback URL
    /// the user was redirected to.
    pub async fn complete_from_callback(
        &self,
        session: &RequestTokenSession,
        callback: &str,
    ) -> Result<VerifierOutcome> {
        let url =
            Url::parse(callback).map_err(|_| Error::MalformedCallback(callback.to_owned()))?;
        if url.query().unwrap_or_default().is_empty() {
            return Err(Error::MalformedCallback(callback.to_owned()));
        }

        let mut token = None;
        let mut verifier = None;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                OAUTH_TOKEN_KEY => token = Some(value.into_owned()),
                OAUTH_VERIFIER_KEY => verifier = Some(value.into_owned()),
                _ => {}
            }
        }
        let (token, verifier) = match (token, verifier) {
            (Some(token), Some(verifier)) => (token, verifier),
            _ => return Err(Error::MalformedCallback(callback.to_owned())),
        };

        // A different token means this callback belongs to another request.
        if token != session.request_token {
            warn!("callback request token mismatch");
            return Err(Error::TokenMismatch);
        }

        self.exchange_verifier(session, &verifier).await
    }

    /// Step 3: exchange the verifier (or PIN) for access tokens.
    ///
    /// A 401 yields [`VerifierOutcome::Rejected`] rather than an error; any
    /// other failure is fatal. On success the tokens are written to the
    /// store and subsequent requests sign with the user context.
    pub async fn exchange_verifier(
        &self,
        session: &RequestTokenSession,
        verifier: &str,
    ) -> Result<VerifierOutcome> {
        let endpoint = self.endpoints.access_token.clone();
        let mut form = BTreeMap::new();
        form.insert(OAUTH_VERIFIER_KEY.to_owned(), verifier.to_owned());

        let auth = self.sign_with(
            (&session.request_token, &session.request_token_secret),
            OAuthParameters::new(),
            &Method::POST,
            &endpoint,
            &form,
        );

        debug!(%endpoint, "exchanging verifier");
        let response = self
            .http
            .post(&endpoint)
            .header(AUTHORIZATION, auth)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(form_urlencode(
                form.iter().map(|(k, v)| (k.as_str(), v.as_str())),
            ))
            .send()
            .await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            debug!("verifier rejected");
            return Ok(VerifierOutcome::Rejected);
        }

        let grant = ensure_success(response).await?.read_token_response().await?;
        self.tokens
            .set_user_token(&grant.oauth_token, &grant.oauth_token_secret);
        Ok(VerifierOutcome::Granted)
    }
}
