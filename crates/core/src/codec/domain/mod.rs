pub mod data_uri;
pub mod frame_codec;
