use crate::errors::AppError;
use base64::{engine::general_purpose::STANDARD, Engine as _};

/// A decoded `data:image/...;base64,` URL.
#[derive(Debug, PartialEq)]
pub struct DataImage {
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl DataImage {
    pub fn extension(&self) -> &str {
        match self.media_type.as_str() {
            "image/jpeg" | "image/jpg" => "jpg",
            "image/png" => "png",
            "image/gif" => "gif",
            "image/webp" => "webp",
            "image/svg+xml" => "svg",
            _ => "bin",
        }
    }
}

pub fn decode_data_url(url: &str) -> Result<DataImage, AppError> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| AppError::bad_request("image must be a data URL"))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| AppError::bad_request("image data URL has no payload"))?;
    let media_type = header
        .strip_suffix(";base64")
        .ok_or_else(|| AppError::bad_request("image data URL must be base64 encoded"))?;
    if !media_type.starts_with("image/") {
        return Err(AppError::bad_request(format!("{media_type} is not an image")));
    }
    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|err| AppError::bad_request(format!("invalid image data: {err}")))?;

    Ok(DataImage {
        media_type: media_type.to_ascii_lowercase(),
        bytes,
    })
}

/// Accepts gallery uploads up to `max_bytes` of decoded image data.
pub fn check_upload(url: &str, max_bytes: usize) -> Result<DataImage, AppError> {
    let image = decode_data_url(url)?;
    if image.bytes.len() > max_bytes {
        return Err(AppError::payload_too_large(format!(
            "image is {} bytes, limit is {max_bytes}",
            image.bytes.len()
        )));
    }
    Ok(image)
}

/// Image fields outside the gallery hold either an inline data URL or a
/// plain web link. Empty means no image.
pub fn check_image_ref(field: &str, value: &str) -> Result<(), AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(());
    }
    let lower = value.to_ascii_lowercase();
    let known_scheme = ["data:image/", "https://", "http://"]
        .iter()
        .any(|scheme| lower.starts_with(scheme));
    let markup = value.contains(['"', '\'', '<', '>', '`']) || value.contains(char::is_whitespace);
    if !known_scheme || markup {
        return Err(AppError::bad_request(format!(
            "{field} must be a data:image URL or an http(s) link"
        )));
    }
    Ok(())
}
