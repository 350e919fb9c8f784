// ── Attachment encoding ──
//
// The gateway takes media inline as bare base64 (no `data:` prefix) and
// hands QR codes back as PNG data URLs. Both directions live here.

use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use wagate_api::MessageContent;

use crate::error::CoreError;

/// A file read from disk, ready to attach to a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedMedia {
    pub base64: String,
    pub filename: String,
    pub mimetype: String,
}

impl EncodedMedia {
    /// Image message content carrying this file.
    pub fn into_image(self, caption: Option<String>) -> MessageContent {
        MessageContent::Image {
            media_base64: self.base64,
            mimetype: Some(self.mimetype),
            filename: Some(self.filename),
            caption,
        }
    }

    /// Document message content carrying this file.
    pub fn into_document(self, caption: Option<String>) -> MessageContent {
        MessageContent::Document {
            media_base64: self.base64,
            mimetype: Some(self.mimetype),
            filename: Some(self.filename),
            caption,
        }
    }
}

/// Read `path` and base64-encode its contents.
pub async fn encode_file(path: &Path) -> Result<EncodedMedia, CoreError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| CoreError::Media {
        message: format!("{}: {e}", path.display()),
    })?;
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| CoreError::Media {
            message: format!("{}: not a file name", path.display()),
        })?
        .to_owned();

    Ok(EncodedMedia {
        base64: STANDARD.encode(&bytes),
        mimetype: guess_mimetype(&filename),
        filename,
    })
}

/// MIME type from a file extension, `application/octet-stream` if unknown.
pub fn guess_mimetype(filename: &str) -> String {
    mime_guess::from_path(filename)
        .first_or_octet_stream()
        .essence_str()
        .to_owned()
}

/// Decode a `data:<mime>;base64,<body>` URL into its MIME type and bytes.
pub fn decode_data_url(url: &str) -> Result<(String, Vec<u8>), CoreError> {
    let rest = url.strip_prefix("data:").ok_or_else(|| CoreError::Media {
        message: "not a data URL".into(),
    })?;
    let (meta, body) = rest.split_once(',').ok_or_else(|| CoreError::Media {
        message: "data URL has no payload".into(),
    })?;
    let mimetype = meta.strip_suffix(";base64").ok_or_else(|| CoreError::Media {
        message: "data URL is not base64-encoded".into(),
    })?;
    let bytes = STANDARD.decode(body.trim()).map_err(|e| CoreError::Media {
        message: format!("invalid base64 in data URL: {e}"),
    })?;
    Ok((mimetype.to_owned(), bytes))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn mimetype_by_extension() {
        assert_eq!(guess_mimetype("photo.JPG"), "image/jpeg");
        assert_eq!(guess_mimetype("invoice.pdf"), "application/pdf");
        assert_eq!(
            guess_mimetype("report.docx"),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        );
        assert_eq!(guess_mimetype("README"), "application/octet-stream");
        assert_eq!(guess_mimetype("blob.unknownext"), "application/octet-stream");
    }

    #[test]
    fn decodes_png_data_url() {
        let (mime, bytes) = decode_data_url("data:image/png;base64,iVBORw0KGgo=").unwrap();
        assert_eq!(mime, "image/png");
        assert_eq!(&bytes[..4], b"\x89PNG");
    }

    #[test]
    fn rejects_non_base64_data_url() {
        assert!(decode_data_url("data:text/plain,hello").is_err());
        assert!(decode_data_url("https://example.com/qr.png").is_err());
        assert!(decode_data_url("data:image/png;base64").is_err());
    }

    #[tokio::test]
    async fn encodes_file_without_data_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("note.txt");
        std::fs::write(&path, "hi").unwrap();

        let media = encode_file(&path).await.unwrap();
        assert_eq!(media.base64, "aGk=");
        assert_eq!(media.filename, "note.txt");
        assert_eq!(media.mimetype, "text/plain");

        match media.into_document(Some("see attached".into())) {
            MessageContent::Document { caption, filename, .. } => {
                assert_eq!(caption.as_deref(), Some("see attached"));
                assert_eq!(filename.as_deref(), Some("note.txt"));
            }
            other => panic!("expected document, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_file_is_media_error() {
        let err = encode_file(Path::new("/definitely/not/here.png"))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Media { .. }));
    }
}
