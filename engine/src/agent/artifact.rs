//! Binary artifact attachment
//!
//! When a capability asks to show a file to the model, the runtime reads it
//! and builds a `user` turn around it. The file extension picks the
//! encoding: images become inline `image_url` data URIs, PDFs become `file`
//! parts carrying a PDF data URI.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use sdk::errors::EngineError;
use std::path::Path;

use crate::llm::{ContentPart, FilePart, ImageUrl, Message};

/// Text sent alongside every attached file
pub const ATTACHMENT_NOTE: &str = "Here is the file.";

/// How a file is attached, chosen by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Image { mime: &'static str },
    Pdf,
}

impl ArtifactKind {
    /// Returns `None` for extensions that cannot be attached
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "png" => Some(Self::Image { mime: "image/png" }),
            "jpg" | "jpeg" => Some(Self::Image { mime: "image/jpeg" }),
            "gif" => Some(Self::Image { mime: "image/gif" }),
            "webp" => Some(Self::Image { mime: "image/webp" }),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }
}

/// Build the attachment turn for `bytes` of a file of the given kind
pub fn attachment_message(kind: ArtifactKind, file_name: &str, bytes: &[u8]) -> Message {
    let encoded = STANDARD.encode(bytes);
    let content = match kind {
        ArtifactKind::Image { mime } => ContentPart::ImageUrl {
            image_url: ImageUrl {
                url: format!("data:{};base64,{}", mime, encoded),
            },
        },
        ArtifactKind::Pdf => ContentPart::File {
            file: FilePart {
                filename: file_name.to_string(),
                file_data: format!("data:application/pdf;base64,{}", encoded),
            },
        },
    };

    Message::user_parts(vec![
        content,
        ContentPart::Text {
            text: ATTACHMENT_NOTE.to_string(),
        },
    ])
}

/// Read `path` and build its attachment turn.
///
/// Returns `Ok(None)` when the extension is not attachable.
///
/// # Errors
/// Returns `EngineError::Artifact` when the file cannot be read.
pub async fn load_attachment(path: &Path) -> Result<Option<Message>, EngineError> {
    let Some(kind) = ArtifactKind::from_path(path) else {
        return Ok(None);
    };

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| EngineError::Artifact(format!("Failed to read {}: {}", path.display(), e)))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    Ok(Some(attachment_message(kind, &file_name, &bytes)))
}
