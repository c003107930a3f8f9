use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const IMAGE_EXTS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif"];
const VIDEO_EXTS: &[&str] = &["mp4", "webm", "mov"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Classifies a file by extension; `None` for anything that is neither
    /// a recognized image nor a recognized video.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        if IMAGE_EXTS.contains(&ext.as_str()) {
            Some(MediaKind::Image)
        } else if VIDEO_EXTS.contains(&ext.as_str()) {
            Some(MediaKind::Video)
        } else {
            None
        }
    }
}

/// Flat listing shape returned by `/api/media/list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaItem {
    pub filename: String,
    pub url: String,
    #[serde(rename = "type")]
    pub kind: MediaKind,
}

/// Full entry shape used by the snapshot endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaEntry {
    pub filename: String,
    pub path: String,
    pub url: String,
    #[serde(rename = "type")]
    pub kind: MediaKind,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
    pub extension: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MediaTreeNode {
    Dir {
        name: String,
        children: Vec<MediaTreeNode>,
    },
    File {
        name: String,
        url: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaListResponse {
    pub success: bool,
    pub items: Vec<MediaItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaTreeResponse {
    pub success: bool,
    pub tree: Vec<MediaTreeNode>,
}
