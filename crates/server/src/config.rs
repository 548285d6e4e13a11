use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

use facestream_core::shared::constants::DEFAULT_JPEG_QUALITY;
use facestream_core::shared::model_resolver::ModelSource;

/// Live face detection over WebSocket.
///
/// Clients send camera frames; each admitted frame comes back annotated,
/// followed by the list of detected faces.
#[derive(Parser, Debug, Clone)]
#[command(name = "facestream", version)]
pub struct Config {
    /// IP address to bind.
    #[arg(long, env = "FACESTREAM_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on.
    #[arg(long, env = "FACESTREAM_PORT", default_value_t = 5000)]
    pub port: u16,

    /// Detector model file. Skips cache lookup and download when set.
    #[arg(long, env = "FACESTREAM_MODEL")]
    pub model: Option<PathBuf>,

    /// Where to download the detector model from if no local copy exists.
    #[arg(long, env = "FACESTREAM_MODEL_URL")]
    pub model_url: Option<String>,

    /// Directory of models shipped alongside the binary.
    #[arg(long, env = "FACESTREAM_MODEL_DIR")]
    pub model_dir: Option<PathBuf>,

    /// Detector instances shared by all connections (1 = fully serialized).
    #[arg(long, env = "FACESTREAM_DETECTOR_WORKERS", default_value_t = 1)]
    pub detector_workers: usize,

    /// Frames one connection may have in the pipeline at once. Frames arriving
    /// beyond that are dropped rather than queued.
    #[arg(long, env = "FACESTREAM_MAX_IN_FLIGHT", default_value_t = 1)]
    pub max_in_flight: usize,

    /// JPEG quality of annotated frames (1-100).
    #[arg(long, env = "FACESTREAM_JPEG_QUALITY", default_value_t = DEFAULT_JPEG_QUALITY)]
    pub jpeg_quality: u8,
}

impl Config {
    pub fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        if self.detector_workers == 0 {
            return Err("Detector workers must be at least 1".into());
        }
        if self.max_in_flight == 0 {
            return Err("Max in-flight frames must be at least 1".into());
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(format!(
                "JPEG quality must be between 1 and 100, got {}",
                self.jpeg_quality
            )
            .into());
        }
        if let Some(model) = &self.model {
            if !model.exists() {
                return Err(format!("Model file not found: {}", model.display()).into());
            }
        }
        self.bind_addr()?;
        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, Box<dyn std::error::Error>> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse::<SocketAddr>()
            .map_err(|e| format!("Invalid bind address {addr}: {e}").into())
    }

    pub fn model_source(&self) -> ModelSource {
        ModelSource {
            explicit_path: self.model.clone(),
            bundled_dir: self.model_dir.clone(),
            url: self.model_url.clone(),
        }
    }
}
