// Image text extraction stub.
//
// `ocr_search` triggers consult an ImageTextReader; wiring a real OCR
// backend means swapping this implementation at the composition root.

use crate::core::triggers::ImageTextReader;
use async_trait::async_trait;

/// Reader that never extracts anything, so `ocr_search` triggers simply
/// never match on image content.
pub struct NoopImageTextReader;

#[async_trait]
impl ImageTextReader for NoopImageTextReader {
    async fn extract_text(&self, attachment_urls: &[String]) -> Option<String> {
        tracing::debug!(
            attachments = attachment_urls.len(),
            "no OCR backend configured, skipping image text extraction"
        );
        None
    }
}
