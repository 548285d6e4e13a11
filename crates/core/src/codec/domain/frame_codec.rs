use thiserror::Error;

use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("payload is not a decodable image: {0}")]
    Decode(String),
    #[error("image decoded to an empty buffer")]
    EmptyImage,
    #[error("failed to encode frame: {0}")]
    Encode(String),
}

/// Domain interface for turning compressed image bytes into frames and back.
///
/// Both directions are pure: the same input always yields the same output.
/// Implementations are shared by every connection, hence `&self` + `Sync`.
pub trait FrameCodec: Send + Sync {
    /// Decodes to a 3-channel RGB frame. An image with no pixels is
    /// [`CodecError::EmptyImage`].
    fn decode(&self, bytes: &[u8]) -> Result<Frame, CodecError>;

    fn encode(&self, frame: &Frame) -> Result<Vec<u8>, CodecError>;
}
