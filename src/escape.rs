//! Strict percent-encoding shared by OAuth signing and wire encoding.
//!
//! Signature base strings and the actual form bodies/query strings must be
//! encoded by the same function, byte for byte, or server-side signature
//! verification fails for text containing `! ' ( ) *` (characters that loose
//! URI encoders leave bare).

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Everything outside RFC 3986 unreserved (`ALPHA / DIGIT / - . _ ~`) is encoded.
const STRICT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Percent-encode `input` with the strict unreserved-only set.
pub(crate) fn escape(input: &str) -> String {
    utf8_percent_encode(input, STRICT).to_string()
}

/// Encode key/value pairs as `k1=v1&k2=v2`, escaping both sides.
///
/// Used for POST bodies and signed query strings so they agree with the
/// signature base string.
pub(crate) fn form_urlencode<'a, I>(pairs: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    pairs
        .into_iter()
        .map(|(key, value)| format!("{}={}", escape(key), escape(value)))
        .collect::<Vec<_>>()
        .join("&")
}
