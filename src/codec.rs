use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;
use thiserror::Error;

pub const JPEG_DATA_URL_PREFIX: &str = "data:image/jpeg;base64,";

#[derive(Debug, Error)]
pub enum FrameCodecError {
    #[error("data URL has no ',' separating header and payload")]
    MissingSeparator,
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("Failed to decode frame")]
    Decode(#[source] image::ImageError),
    #[error("Failed to encode processed frame")]
    Encode(#[source] image::ImageError),
}

/// Decode a `data:<mime>;base64,<payload>` string into an RGB frame.
/// The header before the first comma is not inspected.
pub fn decode_data_url(data_url: &str) -> Result<RgbImage, FrameCodecError> {
    let (_header, encoded) = data_url
        .split_once(',')
        .ok_or(FrameCodecError::MissingSeparator)?;
    let bytes = STANDARD.decode(encoded.trim())?;
    let frame = image::load_from_memory(&bytes).map_err(FrameCodecError::Decode)?;
    Ok(frame.to_rgb8())
}

pub fn encode_jpeg(frame: &RgbImage, quality: u8) -> Result<Vec<u8>, FrameCodecError> {
    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, quality)
        .encode_image(frame)
        .map_err(FrameCodecError::Encode)?;
    Ok(buffer)
}

/// JPEG-encode a frame and wrap it as a data URL
pub fn encode_jpeg_data_url(frame: &RgbImage, quality: u8) -> Result<String, FrameCodecError> {
    let jpeg = encode_jpeg(frame, quality)?;
    Ok(format!("{}{}", JPEG_DATA_URL_PREFIX, STANDARD.encode(jpeg)))
}
