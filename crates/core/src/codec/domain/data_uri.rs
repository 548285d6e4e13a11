//! Data-URI envelope handling for frame payloads.
//!
//! Clients send frames either as `"<mime-info>,<base64>"` text, bare base64
//! text, or raw image bytes. Outbound frames always use the JPEG data URI.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD};
use base64::engine::DecodePaddingMode;
use base64::Engine;

use super::frame_codec::CodecError;
use crate::shared::constants::JPEG_DATA_URI_PREFIX;

/// Accepts input with or without trailing `=` padding.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// An inbound frame as delivered by the transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FramePayload {
    /// Base64 text, optionally wrapped in a data-URI envelope.
    Text(String),
    /// Raw encoded image bytes.
    Binary(Vec<u8>),
}

impl FramePayload {
    /// Compressed image bytes with any envelope and text encoding removed.
    pub fn into_image_bytes(self) -> Result<Vec<u8>, CodecError> {
        match self {
            FramePayload::Text(text) => decode_base64(strip_envelope(&text)),
            FramePayload::Binary(bytes) => Ok(bytes),
        }
    }
}

impl From<String> for FramePayload {
    fn from(text: String) -> Self {
        FramePayload::Text(text)
    }
}

impl From<&str> for FramePayload {
    fn from(text: &str) -> Self {
        FramePayload::Text(text.to_string())
    }
}

impl From<Vec<u8>> for FramePayload {
    fn from(bytes: Vec<u8>) -> Self {
        FramePayload::Binary(bytes)
    }
}

/// The encoded part of a payload: the segment after the first comma, or the
/// whole payload when there is no comma.
pub fn strip_envelope(payload: &str) -> &str {
    match payload.split(',').nth(1) {
        Some(encoded) => encoded,
        None => payload,
    }
}

pub fn decode_base64(encoded: &str) -> Result<Vec<u8>, CodecError> {
    Ok(LENIENT.decode(encoded.trim())?)
}

/// Wraps encoded JPEG bytes as `data:image/jpeg;base64,...`.
pub fn wrap_jpeg(bytes: &[u8]) -> String {
    let mut uri = String::with_capacity(JPEG_DATA_URI_PREFIX.len() + bytes.len().div_ceil(3) * 4);
    uri.push_str(JPEG_DATA_URI_PREFIX);
    STANDARD.encode_string(bytes, &mut uri);
    uri
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_envelope_removes_mime_prefix() {
        assert_eq!(strip_envelope("data:image/jpeg;base64,QUJD"), "QUJD");
    }

    #[test]
    fn test_strip_envelope_tolerates_bare_payload() {
        assert_eq!(strip_envelope("QUJD"), "QUJD");
    }

    #[test]
    fn test_strip_envelope_ignores_segments_after_second_comma() {
        assert_eq!(strip_envelope("mime,QUJD,trailing"), "QUJD");
    }

    #[test]
    fn test_text_payload_with_envelope_decodes() {
        let payload = FramePayload::from("data:image/png;base64,QUJD");
        assert_eq!(payload.into_image_bytes().unwrap(), b"ABC");
    }

    #[test]
    fn test_text_payload_without_envelope_decodes() {
        let payload = FramePayload::from("QUJD");
        assert_eq!(payload.into_image_bytes().unwrap(), b"ABC");
    }

    #[test]
    fn test_missing_padding_is_accepted() {
        // "AB" encodes to "QUI=" with padding
        assert_eq!(decode_base64("QUI").unwrap(), b"AB");
        assert_eq!(decode_base64("QUI=").unwrap(), b"AB");
    }

    #[test]
    fn test_surrounding_whitespace_is_ignored() {
        assert_eq!(decode_base64(" QUJD\n").unwrap(), b"ABC");
    }

    #[test]
    fn test_invalid_base64_is_error() {
        let payload = FramePayload::from("data:image/jpeg;base64,!!not base64!!");
        assert!(matches!(
            payload.into_image_bytes(),
            Err(CodecError::Base64(_))
        ));
    }

    #[test]
    fn test_binary_payload_passes_through() {
        let payload = FramePayload::from(vec![1u8, 2, 3]);
        assert_eq!(payload.into_image_bytes().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_wrap_jpeg_uses_data_uri_prefix() {
        let uri = wrap_jpeg(b"ABC");
        assert_eq!(uri, "data:image/jpeg;base64,QUJD");
    }

    #[test]
    fn test_wrapped_output_is_accepted_as_input() {
        let bytes = vec![0xFFu8, 0xD8, 0xFF, 0xE0, 0x00];
        let uri = wrap_jpeg(&bytes);
        assert_eq!(FramePayload::from(uri).into_image_bytes().unwrap(), bytes);
    }
}
