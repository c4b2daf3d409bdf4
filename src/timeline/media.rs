use std::time::Duration;

use super::types::Attachment;
use crate::error::{check_status, transport, AppError};

/// Guess an image content type from its URL.
pub fn image_content_type(url: &str) -> &'static str {
    let lower = url.to_ascii_lowercase();
    if lower.contains(".png") {
        "image/png"
    } else if lower.contains(".bmp") {
        "image/bmp"
    } else if lower.contains(".gif") {
        "image/gif"
    } else {
        "image/jpeg"
    }
}

/// Download an image for upload as card media, bounded by `deadline`.
pub async fn fetch_attachment(
    http: &reqwest::Client,
    url: &str,
    deadline: Duration,
) -> Result<Attachment, AppError> {
    let resp = http
        .get(url)
        .timeout(deadline)
        .send()
        .await
        .map_err(transport("image"))?;
    let resp = check_status("image", resp).await?;
    let bytes = resp.bytes().await.map_err(transport("image"))?;

    Ok(Attachment {
        content_type: image_content_type(url).to_string(),
        bytes: bytes.to_vec(),
    })
}
