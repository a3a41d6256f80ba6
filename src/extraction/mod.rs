use crate::processing::DocumentItem;
use async_trait::async_trait;
use thiserror::Error;

/// Media type for PDF documents.
pub const MIME_PDF: &str = "application/pdf";

/// Errors raised by extraction backends.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The document's media type cannot be handled by this backend.
    #[error("unsupported content: {0}")]
    Unsupported(String),
    /// The PDF parser rejected the document.
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
    /// The backend itself failed (worker crashed, service unreachable, ...).
    #[error("extraction backend failed: {0}")]
    Backend(String),
}

/// Interface implemented by text extraction backends.
///
/// Calls may block or be slow; the orchestrator applies deadlines and never retries.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Produce the plain text contained in `item`'s payload.
    async fn extract(&self, item: &DocumentItem) -> Result<String, ExtractionError>;
}

/// How a payload is going to be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// UTF-8 (or nearly) text.
    Text,
    /// Portable Document Format.
    Pdf,
    /// Raster image that would need OCR.
    Image,
    /// Nothing recognisable.
    Unknown,
}

/// Resolve the media kind from the declared type, then magic bytes, then the file name.
pub fn detect_media_kind(content_type: Option<&str>, filename: &str, payload: &[u8]) -> MediaKind {
    let declared = content_type
        .and_then(|value| value.split(';').next())
        .map(|essence| essence.trim().to_ascii_lowercase());
    if let Some(kind) = declared.as_deref().and_then(classify_mime) {
        return kind;
    }

    if let Some(sniffed) = infer::get(payload) {
        return match classify_mime(sniffed.mime_type()) {
            Some(kind) => kind,
            None if sniffed.matcher_type() == infer::MatcherType::Text => MediaKind::Text,
            // Archives, audio, executables and the like.
            None => MediaKind::Unknown,
        };
    }

    let guessed = mime_guess::from_path(filename)
        .first()
        .and_then(|mime| classify_mime(mime.essence_str()));
    match guessed {
        Some(kind) => kind,
        None if std::str::from_utf8(payload).is_ok() => MediaKind::Text,
        None => MediaKind::Unknown,
    }
}

fn classify_mime(essence: &str) -> Option<MediaKind> {
    if essence == MIME_PDF {
        Some(MediaKind::Pdf)
    } else if essence.starts_with("image/") {
        Some(MediaKind::Image)
    } else if essence.starts_with("text/") {
        Some(MediaKind::Text)
    } else {
        None
    }
}

/// Built-in extractor for text and PDF payloads.
///
/// PDF parsing runs on the blocking pool. Images are reported as unsupported because no OCR
/// engine ships with this build; plug a dedicated [`Extractor`] in front of it to add one.
pub struct ContentExtractor;

impl ContentExtractor {
    /// Construct a new extractor.
    pub const fn new() -> Self {
        Self
    }
}

impl Default for ContentExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Extractor for ContentExtractor {
    async fn extract(&self, item: &DocumentItem) -> Result<String, ExtractionError> {
        let kind = detect_media_kind(item.content_type.as_deref(), &item.filename, &item.payload);
        tracing::debug!(item_id = %item.id, filename = %item.filename, ?kind, "Extracting text");
        match kind {
            MediaKind::Text => Ok(String::from_utf8_lossy(&item.payload).into_owned()),
            MediaKind::Pdf => {
                let bytes = item.payload.clone();
                tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
                    .await
                    .map_err(|err| ExtractionError::Backend(format!("PDF worker failed: {err}")))?
                    .map_err(|err| ExtractionError::Pdf(err.to_string()))
            }
            MediaKind::Image => Err(ExtractionError::Unsupported(
                "image documents require an OCR engine".to_string(),
            )),
            MediaKind::Unknown => Err(ExtractionError::Unsupported(
                "binary content of unknown type".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(filename: &str, content_type: Option<&str>, payload: &[u8]) -> DocumentItem {
        DocumentItem {
            id: "item-1".into(),
            original_index: 0,
            filename: filename.into(),
            content_type: content_type.map(str::to_string),
            content_sha256: String::new(),
            payload: payload.to_vec(),
        }
    }

    #[test]
    fn declared_type_wins_over_sniffing() {
        assert_eq!(
            detect_media_kind(Some("application/pdf"), "notes.txt", b"hello"),
            MediaKind::Pdf
        );
        assert_eq!(
            detect_media_kind(Some("text/plain; charset=utf-8"), "scan.pdf", b"%PDF-1.7"),
            MediaKind::Text
        );
    }

    #[test]
    fn sniffs_magic_bytes_and_extensions() {
        assert_eq!(detect_media_kind(None, "upload", b"%PDF-1.4 ..."), MediaKind::Pdf);
        assert_eq!(
            detect_media_kind(Some("application/octet-stream"), "upload", b"\x89PNG\r\n\x1a\n..."),
            MediaKind::Image
        );
        assert_eq!(detect_media_kind(None, "photo.JPG", b"not really"), MediaKind::Image);
        assert_eq!(detect_media_kind(None, "notes", b"plain words"), MediaKind::Text);
        assert_eq!(detect_media_kind(None, "blob", &[0xC3, 0x28, 0xFF]), MediaKind::Unknown);
    }

    #[test]
    fn recognises_bmp_and_webp_headers_without_hints() {
        let bmp = b"BM6\0\0\0\0\0\0\x006\0\0\0(\0\0\0";
        let webp = b"RIFF\x24\0\0\0WEBPVP8 ";
        assert_eq!(detect_media_kind(None, "upload", bmp), MediaKind::Image);
        assert_eq!(detect_media_kind(None, "upload", webp), MediaKind::Image);
        assert_eq!(
            detect_media_kind(Some("application/octet-stream"), "scan", webp),
            MediaKind::Image
        );
    }

    #[test]
    fn recognised_binary_formats_are_not_text() {
        let zip = b"PK\x03\x04\x14\0\0\0\x08\0";
        assert_eq!(detect_media_kind(None, "bundle", zip), MediaKind::Unknown);
        assert_eq!(
            detect_media_kind(None, "readme.md", b"# Heading"),
            MediaKind::Text
        );
    }

    #[tokio::test]
    async fn extracts_plain_text() {
        let extractor = ContentExtractor::new();
        let text = extractor
            .extract(&item("notes.txt", Some("text/plain"), b"quarterly report"))
            .await
            .expect("text extraction");
        assert_eq!(text, "quarterly report");
    }

    #[tokio::test]
    async fn images_are_unsupported_without_ocr() {
        let extractor = ContentExtractor::new();
        let err = extractor
            .extract(&item("scan.png", Some("image/png"), b"\x89PNG\r\n\x1a\n"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractionError::Unsupported(_)));
    }

    #[tokio::test]
    async fn malformed_pdf_is_a_typed_failure() {
        let extractor = ContentExtractor::new();
        let err = extractor
            .extract(&item("broken.pdf", Some(MIME_PDF), b"%PDF-1.4 garbage"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ExtractionError::Pdf(_) | ExtractionError::Backend(_)
        ));
    }
}
