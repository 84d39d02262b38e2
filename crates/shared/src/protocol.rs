use serde::{Deserialize, Serialize};

use crate::domain::{CategoryId, Piece};

/// A normalized piece ready for `create_piece`. Image urls hold inline data
/// URIs produced by staging, or absolute urls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPieceSubmission {
    pub name: String,
    pub description: String,
    pub materials: String,
    pub category_id: CategoryId,
    #[serde(default)]
    pub image_urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeSeverity {
    Info,
    Destructive,
}

/// A user-visible toast-style message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub title: String,
    pub description: String,
    pub severity: NoticeSeverity,
}

impl Notice {
    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            severity: NoticeSeverity::Info,
        }
    }

    pub fn destructive(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            severity: NoticeSeverity::Destructive,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadPieceResponse {
    pub piece: Piece,
    #[serde(default)]
    pub notices: Vec<Notice>,
}
