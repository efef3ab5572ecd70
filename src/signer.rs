use std::borrow::Cow;
use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use http::Method;
use rand::distributions::Alphanumeric;
use rand::Rng;
use sha1::Sha1;

use crate::escape::escape;
use crate::{
    OAUTH_CALLBACK_KEY, OAUTH_CONSUMER_KEY, OAUTH_KEY_PREFIX, OAUTH_NONCE_KEY,
    OAUTH_SIGNATURE_METHOD_KEY, OAUTH_TIMESTAMP_KEY, OAUTH_TOKEN_KEY, OAUTH_VERIFIER_KEY,
    OAUTH_VERSION_KEY,
};

const SIGNATURE_METHOD: &str = "HMAC-SHA1";
const OAUTH_VERSION: &str = "1.0";

/// Produces OAuth1.0a `Authorization` headers.
///
/// The token pair may be empty strings for the app-only request-token step.
#[derive(Debug, Clone)]
pub struct Signer<'a> {
    consumer_key: &'a str,
    consumer_secret: &'a str,
    token: &'a str,
    token_secret: &'a str,
    parameters: OAuthParameters<'a>,
}

impl<'a> Signer<'a> {
    pub fn new(
        consumer: (&'a str, &'a str),
        token: (&'a str, &'a str),
        parameters: OAuthParameters<'a>,
    ) -> Self {
        Signer {
            consumer_key: consumer.0,
            consumer_secret: consumer.1,
            token: token.0,
            token_secret: token.1,
            parameters,
        }
    }

    /// Build the `OAuth ...` header for a request.
    ///
    /// `extra_params` are the request-specific parameters that travel in the
    /// query string or form body; they participate in the signature but only
    /// `oauth_*` parameters are emitted into the header itself.
    pub fn authorization_header(
        &self,
        method: &Method,
        endpoint: &str,
        extra_params: &BTreeMap<String, String>,
    ) -> String {
        let timestamp = self.parameters.timestamp.unwrap_or_else(unix_timestamp);
        let nonce = match &self.parameters.nonce {
            Some(nonce) => nonce.to_string(),
            None => generate_nonce(),
        };

        let mut params = BTreeMap::new();
        params.insert(OAUTH_CONSUMER_KEY.to_owned(), self.consumer_key.to_owned());
        params.insert(
            OAUTH_SIGNATURE_METHOD_KEY.to_owned(),
            SIGNATURE_METHOD.to_owned(),
        );
        params.insert(OAUTH_TIMESTAMP_KEY.to_owned(), timestamp.to_string());
        params.insert(OAUTH_NONCE_KEY.to_owned(), nonce);
        params.insert(OAUTH_VERSION_KEY.to_owned(), OAUTH_VERSION.to_owned());
        params.insert(OAUTH_TOKEN_KEY.to_owned(), self.token.to_owned());
        if let Some(callback) = &self.parameters.callback {
            params.insert(OAUTH_CALLBACK_KEY.to_owned(), callback.to_string());
        }
        if let Some(verifier) = &self.parameters.verifier {
            params.insert(OAUTH_VERIFIER_KEY.to_owned(), verifier.to_string());
        }
        for (key, value) in extra_params {
            params.insert(key.clone(), value.clone());
        }

        let signature = self.compute_signature(method, endpoint, &params);

        // Only oauth_* parameters belong in the header; the rest travel in
        // the query string or form body.
        params.retain(|key, _| key.starts_with(OAUTH_KEY_PREFIX));

        let mut pairs = params
            .iter()
            .map(|(key, value)| format!("{}=\"{}\"", key, escape(value)))
            .collect::<Vec<_>>();
        pairs.push(format!("oauth_signature=\"{}\"", escape(&signature)));

        format!("OAuth {}", pairs.join(", "))
    }

    fn compute_signature(
        &self,
        method: &Method,
        endpoint: &str,
        params: &BTreeMap<String, String>,
    ) -> String {
        let joined = params
            .iter()
            .map(|(key, value)| format!("{}={}", escape(key), escape(value)))
            .collect::<Vec<_>>()
            .join("&");
        let base = format!(
            "{}&{}&{}",
            method.as_str(),
            escape(endpoint),
            escape(&joined)
        );
        let key = format!(
            "{}&{}",
            escape(self.consumer_secret),
            escape(self.token_secret)
        );

        let mut mac = Hmac::<Sha1>::new_from_slice(key.as_bytes())
            .expect("HMAC-SHA1 accepts keys of any length");
        mac.update(base.as_bytes());
        STANDARD.encode(mac.finalize().into_bytes())
    }
}

/// Optional OAuth parameters for a single signed request.
///
/// `nonce` and `timestamp` default to fresh values per call; pinning them
/// makes the produced header fully deterministic.
#[derive(Debug, Clone, Default)]
pub struct OAuthParameters<'a> {
    callback: Option<Cow<'a, str>>,
    nonce: Option<Cow<'a, str>>,
    timestamp: Option<u64>,
    verifier: Option<Cow<'a, str>>,
}

impl<'a> OAuthParameters<'a> {
    pub fn new() -> Self {
        Default::default()
    }

    /// Set the `oauth_callback` value.
    pub fn callback<T>(self, callback: T) -> Self
    where
        T: Into<Cow<'a, str>>,
    {
        OAuthParameters {
            callback: Some(callback.into()),
            ..self
        }
    }

    /// Set the `oauth_nonce` value.
    pub fn nonce<T>(self, nonce: T) -> Self
    where
        T: Into<Cow<'a, str>>,
    {
        OAuthParameters {
            nonce: Some(nonce.into()),
            ..self
        }
    }

    /// Set the `oauth_timestamp` value.
    pub fn timestamp<T>(self, timestamp: T) -> Self
    where
        T: Into<u64>,
    {
        OAuthParameters {
            timestamp: Some(timestamp.into()),
            ..self
        }
    }

    /// Set the `oauth_verifier` value.
    pub fn verifier<T>(self, verifier: T) -> Self
    where
        T: Into<Cow<'a, str>>,
    {
        OAuthParameters {
            verifier: Some(verifier.into()),
            ..self
        }
    }
}

// Unique per timestamp+token as long as the RNG does not repeat within a
// second, which 32 alphanumeric characters make implausible.
fn generate_nonce() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
