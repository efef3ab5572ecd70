//! Response data structures.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Deserializer};

/// Status creation times use a fixed non-ISO template in the US locale,
/// e.g. `Wed Aug 27 13:08:45 +0000 2008`.
const CREATED_AT_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

fn created_at<'de, D>(deserializer: D) -> Result<DateTime<FixedOffset>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    DateTime::parse_from_str(&raw, CREATED_AT_FORMAT).map_err(serde::de::Error::custom)
}

#[derive(Deserialize, Debug)]
pub(crate) struct BearerToken {
    pub token_type: String,
    pub access_token: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct MediaInitResponse {
    #[serde(rename = "media_id_string")]
    pub media_id: String,
    #[serde(default)]
    pub expires_after_secs: u64,
}

#[derive(Deserialize, Debug, Clone)]
pub struct MediaFinalizeResponse {
    #[serde(rename = "media_id_string")]
    pub media_id: String,
    #[serde(default)]
    pub expires_after_secs: u64,
    /// Absent for media kinds the server accepts synchronously.
    pub processing_info: Option<ProcessingInfo>,
    pub image: Option<MediaImageInfo>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct MediaStatusResponse {
    #[serde(rename = "media_id_string")]
    pub media_id: String,
    #[serde(default)]
    pub expires_after_secs: u64,
    pub processing_info: Option<ProcessingInfo>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct MediaImageInfo {
    pub image_type: String,
    pub w: u32,
    pub h: u32,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ProcessingInfo {
    pub state: ProcessingState,
    #[serde(default)]
    pub check_after_secs: u64,
    #[serde(default)]
    pub progress_percent: u32,
    pub error: Option<ProcessingError>,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingState {
    Pending,
    InProgress,
    Succeeded,
    Failed,
}

impl ProcessingState {
    /// Whether polling should stop.
    pub fn is_terminal(self) -> bool {
        matches!(self, ProcessingState::Succeeded | ProcessingState::Failed)
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct ProcessingError {
    pub code: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct User {
    pub name: String,
    pub screen_name: String,
    #[serde(rename = "profile_image_url_https")]
    pub profile_image_url: Option<String>,
    pub status: Option<Status>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Status {
    #[serde(rename = "id_str")]
    pub id: String,
    pub text: String,
    #[serde(deserialize_with = "created_at")]
    pub created_at: DateTime<FixedOffset>,
    pub extended_entities: Option<Entities>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Entities {
    #[serde(default)]
    pub media: Vec<MediaEntity>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct MediaEntity {
    #[serde(rename = "display_url")]
    pub url: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub video_info: Option<VideoInfo>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct VideoInfo {
    pub variants: Vec<VideoVariant>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct VideoVariant {
    pub content_type: String,
    pub url: String,
}
