/*!
tweetkit: a Twitter REST API client for Rust.

# Overview

This library covers the authenticated core of the API surface: OAuth 1.0a
request signing, the three-legged authorization handshake, app-only bearer
authorization, generic signed GET/POST, and the chunked media-upload protocol
(INIT / APPEND / FINALIZE / STATUS) with asynchronous server-side processing.

# How to use

## Basic usecase 1 - posting a status with an image

```no_run
use std::sync::Arc;
use tweetkit::{AppCredentials, Client, MemoryTokenStore, TokenStore};

# async fn run() -> tweetkit::Result<()> {
let app = AppCredentials::new(
    "[CONSUMER_KEY]",
    "[CONSUMER_SECRET]",
    "[APP_ACCESS_TOKEN]",
    "[APP_TOKEN_SECRET]",
);
let store = Arc::new(MemoryTokenStore::new());
store.set_user_token("[USER_TOKEN]", "[USER_TOKEN_SECRET]");
let client = Client::new(app, store);

let jpg = std::fs::read("selfie.jpg").expect("readable file");
let media_id = client.upload_image(jpg).await?;
client.update_status("Hello, Twitter!", &[&media_id]).await?;
# Ok(())
# }
```

## Basic usecase 2 - acquiring user tokens with a PIN

```no_run
use std::io;
use std::sync::Arc;
use tweetkit::{AppCredentials, Client, MemoryTokenStore, VerifierOutcome};

# async fn run() -> tweetkit::Result<()> {
# let app = AppCredentials::new("", "", "", "");
let client = Client::new(app, Arc::new(MemoryTokenStore::new()));

// step 1: acquire a request token; "oob" selects PIN-based authorization
let (session, url) = client.request_user_authentication("oob").await?;
println!("please access: {url}");

// step 2: the user approves access in a browser and reads the PIN
println!("input pin: ");
let mut pin = String::new();
io::stdin().read_line(&mut pin).expect("stdin");

// step 3: exchange the PIN for access tokens
match client.exchange_verifier(&session, pin.trim()).await? {
    VerifierOutcome::Granted => println!("authorized"),
    VerifierOutcome::Rejected => println!("wrong pin, try again"),
}
# Ok(())
# }
```

## Basic usecase 3 - uploading a video with progress

```no_run
use futures::{pin_mut, StreamExt};
use tweetkit::{MediaUpload, UploadEvent};
# use std::sync::Arc;
# async fn run() -> tweetkit::Result<()> {
# let client = tweetkit::Client::new(
#     tweetkit::AppCredentials::new("", "", "", ""),
#     Arc::new(tweetkit::MemoryTokenStore::new()),
# );

let mp4 = std::fs::read("clip.mp4").expect("readable file");
let events = MediaUpload::video(&client, mp4).events();
pin_mut!(events);
while let Some(event) = events.next().await {
    match event? {
        UploadEvent::Progress { upload, processing } => {
            println!("upload {:.0}%, encode {:.0}%", upload * 100.0, processing * 100.0)
        }
        UploadEvent::Completed { media_id } => println!("uploaded as {media_id}"),
    }
}
# Ok(())
# }
```
*/
mod api;
mod auth;
mod client;
mod credentials;
mod error;
mod escape;
mod media;
mod models;
mod signer;
mod token_reader;

// exposed to external program
pub use auth::{RequestTokenSession, VerifierOutcome};
pub use client::{Client, Endpoints};
pub use credentials::{AppCredentials, MemoryTokenStore, TokenStore, UserToken};
pub use error::{Error, Result};
pub use media::{MediaUpload, UploadEvent, IMAGE_CHUNK_BYTES, VIDEO_CHUNK_BYTES};
pub use models::{
    Entities, MediaEntity, MediaFinalizeResponse, MediaImageInfo, MediaInitResponse,
    MediaStatusResponse, ProcessingError, ProcessingInfo, ProcessingState, Status, User,
    VideoInfo, VideoVariant,
};
pub use signer::{OAuthParameters, Signer};
pub use token_reader::{ReadTokenResponse, TokenResponse};

// exposed constant variables
/// Represents `oauth_callback`.
pub const OAUTH_CALLBACK_KEY: &str = "oauth_callback";
/// Represents `oauth_nonce`.
pub const OAUTH_NONCE_KEY: &str = "oauth_nonce";
/// Represents `oauth_timestamp`.
pub const OAUTH_TIMESTAMP_KEY: &str = "oauth_timestamp";
/// Represents `oauth_verifier`.
pub const OAUTH_VERIFIER_KEY: &str = "oauth_verifier";
/// Represents `oauth_version`.
pub const OAUTH_VERSION_KEY: &str = "oauth_version";

// crate-private constant variables
pub(crate) const OAUTH_KEY_PREFIX: &str = "oauth_";
pub(crate) const OAUTH_SIGNATURE_METHOD_KEY: &str = "oauth_signature_method";
pub(crate) const OAUTH_CONSUMER_KEY: &str = "oauth_consumer_key";
pub(crate) const OAUTH_TOKEN_KEY: &str = "oauth_token";
pub(crate) const OAUTH_TOKEN_SECRET_KEY: &str = "oauth_token_secret";
pub(crate) const OAUTH_CALLBACK_CONFIRMED_KEY: &str = "oauth_callback_confirmed";
