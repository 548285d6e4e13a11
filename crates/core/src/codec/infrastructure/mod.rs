pub mod jpeg_codec;
