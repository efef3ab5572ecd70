//! Chunked media upload.
//!
//! An upload is INIT, strictly sequential APPENDs (the server rejects
//! out-of-order or overlapping segment indices), FINALIZE, and, for media
//! kinds the server processes asynchronously, STATUS polls until a terminal
//! state. [`MediaUpload`] drives the whole pipeline and yields progress as a
//! lazy stream; each event pulled advances the upload by one step.

use std::collections::BTreeMap;

use futures::pin_mut;
use futures::stream::{self, Stream, StreamExt};
use http::header::AUTHORIZATION;
use reqwest::multipart::{Form, Part};
use reqwest::Method;
use tokio::time::{sleep, Duration};
use tracing::debug;

use crate::client::{ensure_success, Client};
use crate::models::{
    MediaFinalizeResponse, MediaInitResponse, MediaStatusResponse, ProcessingInfo, ProcessingState,
};
use crate::{Error, Result};

/// APPEND chunk size for image payloads.
pub const IMAGE_CHUNK_BYTES: usize = 512 * 1000;
/// APPEND chunk size for video payloads.
pub const VIDEO_CHUNK_BYTES: usize = 1000 * 1024 * 3;

impl Client {
    /// `command=INIT`: open an upload session for `total_bytes` of media.
    pub async fn init_media_upload(
        &self,
        total_bytes: u64,
        media_type: &str,
        media_category: &str,
    ) -> Result<MediaInitResponse> {
        let endpoint = self.endpoints.upload.clone();
        let mut form = BTreeMap::new();
        form.insert("command".to_owned(), "INIT".to_owned());
        form.insert("total_bytes".to_owned(), total_bytes.to_string());
        form.insert("media_type".to_owned(), media_type.to_owned());
        form.insert("media_category".to_owned(), media_category.to_owned());
        let auth = self.user_auth_header(&Method::POST, &endpoint, &form)?;
        self.post_form(&endpoint, &form, auth).await
    }

    /// `command=APPEND`: upload one chunk at `segment_index`.
    pub async fn append_media_upload(
        &self,
        media_id: &str,
        segment_index: u64,
        chunk: Vec<u8>,
    ) -> Result<()> {
        let endpoint = self.endpoints.upload.clone();
        // The multipart body does not participate in the signature.
        let auth = self.user_auth_header(&Method::POST, &endpoint, &BTreeMap::new())?;
        let form = Form::new()
            .text("command", "APPEND")
            .text("media_id", media_id.to_owned())
            .text("segment_index", segment_index.to_string())
            .part("media", Part::bytes(chunk));
        debug!(media_id, segment_index, "APPEND");
        let response = self
            .http
            .post(&endpoint)
            .header(AUTHORIZATION, auth)
            .multipart(form)
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }

    /// `command=FINALIZE`: close the upload session.
    ///
    /// `processing_info` is absent for media the server accepts
    /// synchronously; otherwise poll [`Client::media_upload_status`] until
    /// the state is terminal.
    pub async fn finalize_media_upload(&self, media_id: &str) -> Result<MediaFinalizeResponse> {
        let endpoint = self.endpoints.upload.clone();
        let mut form = BTreeMap::new();
        form.insert("command".to_owned(), "FINALIZE".to_owned());
        form.insert("media_id".to_owned(), media_id.to_owned());
        let auth = self.user_auth_header(&Method::POST, &endpoint, &form)?;
        self.post_form(&endpoint, &form, auth).await
    }

    /// `command=STATUS`: query processing progress.
    pub async fn media_upload_status(&self, media_id: &str) -> Result<MediaStatusResponse> {
        let endpoint = self.endpoints.upload.clone();
        let mut query = BTreeMap::new();
        query.insert("command".to_owned(), "STATUS".to_owned());
        query.insert("media_id".to_owned(), media_id.to_owned());
        let auth = self.user_auth_header(&Method::GET, &endpoint, &query)?;
        self.get_json(&endpoint, &query, auth).await
    }

    /// Upload a JPEG, returning the media id to attach to a status post.
    pub async fn upload_image(&self, jpg: Vec<u8>) -> Result<String> {
        MediaUpload::image(self, jpg).upload().await
    }

    /// Upload an MP4, returning the media id to attach to a status post.
    /// Use [`MediaUpload::events`] to observe progress.
    pub async fn upload_video(&self, mp4: Vec<u8>) -> Result<String> {
        MediaUpload::video(self, mp4).upload().await
    }
}

/// Progress of a running upload.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadEvent {
    /// Upload and processing fractions, each within `0.0..=1.0` and
    /// non-decreasing over the life of the stream.
    Progress { upload: f32, processing: f32 },
    /// Terminal event carrying the media id for the finished upload.
    Completed { media_id: String },
}

/// A single media upload pipeline.
pub struct MediaUpload<'a> {
    client: &'a Client,
    data: Vec<u8>,
    media_type: String,
    media_category: String,
    chunk_size: usize,
    max_status_checks: Option<u32>,
}

impl<'a> MediaUpload<'a> {
    pub fn new(
        client: &'a Client,
        data: Vec<u8>,
        media_type: &str,
        media_category: &str,
        chunk_size: usize,
    ) -> Self {
        MediaUpload {
            client,
            data,
            media_type: media_type.to_owned(),
            media_category: media_category.to_owned(),
            chunk_size,
            max_status_checks: None,
        }
    }

    pub fn image(client: &'a Client, jpg: Vec<u8>) -> Self {
        MediaUpload::new(client, jpg, "image/jpeg", "tweet_image", IMAGE_CHUNK_BYTES)
    }

    pub fn video(client: &'a Client, mp4: Vec<u8>) -> Self {
        MediaUpload::new(client, mp4, "video/mp4", "tweet_video", VIDEO_CHUNK_BYTES)
    }

    /// Cap the number of STATUS polls. Polling is unbounded by default; the
    /// wait between polls is always the server-dictated `check_after_secs`.
    pub fn max_status_checks(mut self, checks: u32) -> Self {
        self.max_status_checks = Some(checks);
        self
    }

    /// Run the pipeline as a lazy stream of progress events.
    ///
    /// Each pulled event advances the upload by one step, so a slow consumer
    /// backpressures the upload itself. Dropping the stream abandons the
    /// upload; no abort is sent to the server.
    pub fn events(self) -> impl Stream<Item = Result<UploadEvent>> + 'a {
        let MediaUpload {
            client,
            data,
            media_type,
            media_category,
            chunk_size,
            max_status_checks,
        } = self;
        let drive = Drive {
            client,
            total_chunks: chunk_count(data.len(), chunk_size),
            data,
            media_type,
            media_category,
            chunk_size,
            max_status_checks,
            stage: Stage::Init,
        };

        stream::try_unfold(drive, |mut drive| async move {
            loop {
                match std::mem::replace(&mut drive.stage, Stage::Done) {
                    Stage::Init => {
                        let init = drive
                            .client
                            .init_media_upload(
                                drive.data.len() as u64,
                                &drive.media_type,
                                &drive.media_category,
                            )
                            .await?;
                        debug!(media_id = %init.media_id, total_bytes = drive.data.len(), "INIT");
                        drive.stage = if drive.total_chunks == 0 {
                            Stage::Finalize {
                                media_id: init.media_id,
                            }
                        } else {
                            Stage::Append {
                                media_id: init.media_id,
                                next_index: 0,
                            }
                        };
                    }
                    Stage::Append {
                        media_id,
                        next_index,
                    } => {
                        let (start, end) =
                            chunk_range(next_index, drive.chunk_size, drive.data.len());
                        drive
                            .client
                            .append_media_upload(&media_id, next_index, drive.data[start..end].to_vec())
                            .await?;
                        let sent = next_index + 1;
                        let upload = sent as f32 / drive.total_chunks as f32;
                        drive.stage = if sent == drive.total_chunks {
                            Stage::Finalize { media_id }
                        } else {
                            Stage::Append {
                                media_id,
                                next_index: sent,
                            }
                        };
                        return Ok(Some((
                            UploadEvent::Progress {
                                upload,
                                processing: 0.0,
                            },
                            drive,
                        )));
                    }
                    Stage::Finalize { media_id } => {
                        let finalized = drive.client.finalize_media_upload(&media_id).await?;
                        drive.stage = match finalized.processing_info {
                            Some(info) => processing_stage(media_id, &info, 0)?,
                            None => Stage::Finish { media_id },
                        };
                    }
                    Stage::AwaitProcessing {
                        media_id,
                        wait_secs,
                        checks_done,
                    } => {
                        if let Some(cap) = drive.max_status_checks {
                            if checks_done >= cap {
                                return Err(Error::ProcessingTimedOut(checks_done));
                            }
                        }
                        // The wait is dictated per-response by the server,
                        // not a client-chosen backoff.
                        sleep(Duration::from_secs(wait_secs)).await;
                        let status = drive.client.media_upload_status(&media_id).await?;
                        let info = status.processing_info.ok_or_else(|| {
                            Error::Protocol("processing_info missing from STATUS response".to_owned())
                        })?;
                        let processing = info.progress_percent as f32 / 100.0;
                        drive.stage = processing_stage(media_id, &info, checks_done + 1)?;
                        return Ok(Some((
                            UploadEvent::Progress {
                                upload: 1.0,
                                processing,
                            },
                            drive,
                        )));
                    }
                    Stage::Finish { media_id } => {
                        drive.stage = Stage::Completed { media_id };
                        return Ok(Some((
                            UploadEvent::Progress {
                                upload: 1.0,
                                processing: 1.0,
                            },
                            drive,
                        )));
                    }
                    Stage::Completed { media_id } => {
                        return Ok(Some((UploadEvent::Completed { media_id }, drive)));
                    }
                    Stage::Done => return Ok(None),
                }
            }
        })
    }

    /// Drive the pipeline to completion and return the media id.
    pub async fn upload(self) -> Result<String> {
        let events = self.events();
        pin_mut!(events);
        let mut media_id = None;
        while let Some(event) = events.next().await {
            if let UploadEvent::Completed { media_id: id } = event? {
                media_id = Some(id);
            }
        }
        media_id.ok_or_else(|| Error::Protocol("upload stream ended without completion".to_owned()))
    }
}

struct Drive<'a> {
    client: &'a Client,
    data: Vec<u8>,
    media_type: String,
    media_category: String,
    chunk_size: usize,
    total_chunks: u64,
    max_status_checks: Option<u32>,
    stage: Stage,
}

enum Stage {
    Init,
    Append { media_id: String, next_index: u64 },
    Finalize { media_id: String },
    AwaitProcessing {
        media_id: String,
        wait_secs: u64,
        checks_done: u32,
    },
    Finish { media_id: String },
    Completed { media_id: String },
    Done,
}

/// The error object decides failure; a terminal state without one succeeds.
fn processing_stage(media_id: String, info: &ProcessingInfo, checks_done: u32) -> Result<Stage> {
    if let Some(error) = &info.error {
        return Err(Error::MediaProcessing {
            code: error.code,
            name: error.name.clone(),
            message: error.message.clone(),
        });
    }
    Ok(match info.state {
        ProcessingState::Pending | ProcessingState::InProgress => Stage::AwaitProcessing {
            media_id,
            wait_secs: info.check_after_secs,
            checks_done,
        },
        ProcessingState::Succeeded | ProcessingState::Failed => Stage::Finish { media_id },
    })
}

fn chunk_count(total_bytes: usize, chunk_size: usize) -> u64 {
    let full = total_bytes / chunk_size;
    let remainder = total_bytes % chunk_size;
    (full + usize::from(remainder > 0)) as u64
}

fn chunk_range(index: u64, chunk_size: usize, total_bytes: usize) -> (usize, usize) {
    let start = index as usize * chunk_size;
    (start, (start + chunk_size).min(total_bytes))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::client::Endpoints;
    use crate::credentials::{AppCredentials, MemoryTokenStore, TokenStore};

    #[test]
    fn chunk_count_splits_with_remainder() {
        assert_eq!(chunk_count(1_500_000, 512_000), 3);
        assert_eq!(chunk_count(1_024_000, 512_000), 2);
        assert_eq!(chunk_count(100, 512_000), 1);
        assert_eq!(chunk_count(0, 512_000), 0);
    }

    #[test]
    fn remainder_chunk_follows_the_full_chunks() {
        assert_eq!(chunk_range(0, 512_000, 1_500_000), (0, 512_000));
        assert_eq!(chunk_range(1, 512_000, 1_500_000), (512_000, 1_024_000));
        let (start, end) = chunk_range(2, 512_000, 1_500_000);
        assert_eq!(end - start, 476_000);
        assert_eq!(end, 1_500_000);
    }

    fn upload_client(server: &MockServer) -> Client {
        let store = Arc::new(MemoryTokenStore::new());
        store.set_user_token("user-tok", "user-sec");
        Client::with_endpoints(
            AppCredentials::new("ck", "cs", "at", "ats"),
            store,
            Endpoints::with_base(&server.uri()),
        )
    }

    async fn mount_init(server: &MockServer, media_id: &str) {
        Mock::given(method("POST"))
            .and(path("/1.1/media/upload.json"))
            .and(body_string_contains("command=INIT"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "media_id": 710u64,
                "media_id_string": media_id,
                "expires_after_secs": 86400,
            })))
            .expect(1)
            .mount(server)
            .await;
    }

    async fn mount_append(server: &MockServer, expected: u64) {
        Mock::given(method("POST"))
            .and(path("/1.1/media/upload.json"))
            .and(body_string_contains("APPEND"))
            .respond_with(ResponseTemplate::new(200))
            .expect(expected)
            .mount(server)
            .await;
    }

    async fn mount_finalize(server: &MockServer, body: serde_json::Value) {
        Mock::given(method("POST"))
            .and(path("/1.1/media/upload.json"))
            .and(body_string_contains("command=FINALIZE"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(1)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn full_pipeline_with_async_processing() {
        let server = MockServer::start().await;
        mount_init(&server, "710").await;
        mount_append(&server, 3).await;
        mount_finalize(
            &server,
            json!({
                "media_id_string": "710",
                "processing_info": {"state": "pending", "check_after_secs": 0},
            }),
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/1.1/media/upload.json"))
            .and(query_param("command", "STATUS"))
            .and(query_param("media_id", "710"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "media_id_string": "710",
                "processing_info": {"state": "in_progress", "check_after_secs": 0, "progress_percent": 50},
            })))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/1.1/media/upload.json"))
            .and(query_param("command", "STATUS"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "media_id_string": "710",
                "processing_info": {"state": "succeeded", "progress_percent": 100},
            })))
            .mount(&server)
            .await;

        // two full chunks plus a 500-byte remainder
        let client = upload_client(&server);
        let upload = MediaUpload::new(&client, vec![7u8; 2500], "video/mp4", "tweet_video", 1000);
        let events = upload.events();
        pin_mut!(events);
        let mut collected = Vec::new();
        while let Some(event) = events.next().await {
            collected.push(event.unwrap());
        }

        assert_eq!(
            collected,
            vec![
                UploadEvent::Progress { upload: 1.0 / 3.0, processing: 0.0 },
                UploadEvent::Progress { upload: 2.0 / 3.0, processing: 0.0 },
                UploadEvent::Progress { upload: 1.0, processing: 0.0 },
                UploadEvent::Progress { upload: 1.0, processing: 0.5 },
                UploadEvent::Progress { upload: 1.0, processing: 1.0 },
                UploadEvent::Progress { upload: 1.0, processing: 1.0 },
                UploadEvent::Completed { media_id: "710".to_owned() },
            ]
        );

        // appends went out sequentially with gap-free indices
        let requests = server.received_requests().await.unwrap();
        let appends: Vec<String> = requests
            .iter()
            .map(|r| String::from_utf8_lossy(&r.body).into_owned())
            .filter(|b| b.contains("APPEND"))
            .collect();
        assert_eq!(appends.len(), 3);
        for (index, body) in appends.iter().enumerate() {
            assert!(body.contains(&format!("\r\n\r\n{index}\r\n")));
        }
    }

    #[tokio::test]
    async fn synchronous_finalize_completes_without_polling() {
        let server = MockServer::start().await;
        mount_init(&server, "55").await;
        mount_append(&server, 1).await;
        mount_finalize(
            &server,
            json!({
                "media_id_string": "55",
                "image": {"image_type": "image/jpeg", "w": 10, "h": 10},
            }),
        )
        .await;

        let client = upload_client(&server);
        let media_id = client.upload_image(vec![1u8; 64]).await.unwrap();
        assert_eq!(media_id, "55");
    }

    #[tokio::test]
    async fn processing_error_stops_the_pipeline() {
        let server = MockServer::start().await;
        mount_init(&server, "99").await;
        mount_append(&server, 1).await;
        mount_finalize(
            &server,
            json!({
                "media_id_string": "99",
                "processing_info": {
                    "state": "failed",
                    "error": {"code": 3, "name": "InvalidMedia", "message": "unsupported codec"},
                },
            }),
        )
        .await;

        let client = upload_client(&server);
        let result = MediaUpload::new(&client, vec![0u8; 10], "video/mp4", "tweet_video", 1000)
            .upload()
            .await;
        match result {
            Err(Error::MediaProcessing { code, name, .. }) => {
                assert_eq!(code, 3);
                assert_eq!(name, "InvalidMedia");
            }
            other => panic!("expected MediaProcessing, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn status_check_cap_is_enforced_when_opted_in() {
        let server = MockServer::start().await;
        mount_init(&server, "12").await;
        mount_append(&server, 1).await;
        mount_finalize(
            &server,
            json!({
                "media_id_string": "12",
                "processing_info": {"state": "pending", "check_after_secs": 0},
            }),
        )
        .await;
        Mock::given(method("GET"))
            .and(query_param("command", "STATUS"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "media_id_string": "12",
                "processing_info": {"state": "in_progress", "check_after_secs": 0, "progress_percent": 10},
            })))
            .mount(&server)
            .await;

        let client = upload_client(&server);
        let result = MediaUpload::new(&client, vec![0u8; 10], "video/mp4", "tweet_video", 1000)
            .max_status_checks(2)
            .upload()
            .await;
        assert!(matches!(result, Err(Error::ProcessingTimedOut(2))));
    }

    #[tokio::test]
    async fn append_requires_user_token() {
        let server = MockServer::start().await;
        let store = Arc::new(MemoryTokenStore::new());
        store.set_app_token("bearer-only");
        let client = Client::with_endpoints(
            AppCredentials::new("ck", "cs", "at", "ats"),
            store,
            Endpoints::with_base(&server.uri()),
        );
        let result = client.append_media_upload("1", 0, vec![0u8; 4]).await;
        assert!(matches!(result, Err(Error::UserTokenRequired)));
    }
}
