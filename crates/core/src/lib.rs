//! Per-connection face detection over a stream of still frames.
//!
//! Each connection's frames are rate limited, then decoded, contrast
//! enhanced at a fixed resolution, run through a shared face detector,
//! filtered, outlined on the original frame and re-encoded. The transport
//! that carries frames in and results out lives outside this crate behind
//! `session::transport::Transport`.

pub mod annotation;
pub mod codec;
pub mod detection;
pub mod pipeline;
pub mod preprocessing;
pub mod session;
pub mod shared;
