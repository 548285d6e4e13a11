mod config;
mod session_driver;
mod transport;

use std::process;
use std::sync::Arc;

use clap::Parser;

use facestream_core::detection::domain::face_detector::FaceDetector;
use facestream_core::detection::infrastructure::detector_pool::DetectorPool;
use facestream_core::detection::infrastructure::onnx_ssd_detector::OnnxSsdDetector;
use facestream_core::pipeline::frame_pipeline::FramePipeline;
use facestream_core::session::session_manager::SessionManager;
use facestream_core::session::transport::ConnectionIdAllocator;
use facestream_core::shared::constants::DETECTOR_MODEL_NAME;
use facestream_core::shared::model_resolver;

use crate::config::Config;
use crate::transport::registry::ConnectionRegistry;
use crate::transport::ws::{router, AppState};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::parse();
    config.validate()?;

    let detector = build_detector_pool(&config)?;
    let pipeline = Arc::new(FramePipeline::standard(detector, config.jpeg_quality));
    let registry = Arc::new(ConnectionRegistry::new());
    let state = AppState {
        sessions: Arc::new(SessionManager::with_monotonic_clock(
            pipeline,
            registry.clone(),
        )),
        registry,
        ids: Arc::new(ConnectionIdAllocator::new()),
        max_in_flight: config.max_in_flight,
    };

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(serve(&config, state))
}

fn build_detector_pool(config: &Config) -> Result<Arc<DetectorPool>, Box<dyn std::error::Error>> {
    log::info!("Resolving model: {DETECTOR_MODEL_NAME}");
    let model_path = model_resolver::resolve(
        DETECTOR_MODEL_NAME,
        &config.model_source(),
        Some(Box::new(download_progress)),
    )?;
    eprintln!();

    let mut detectors: Vec<Box<dyn FaceDetector>> = Vec::with_capacity(config.detector_workers);
    for _ in 0..config.detector_workers {
        detectors.push(Box::new(OnnxSsdDetector::new(&model_path)?));
    }
    log::info!(
        "Loaded {} ({} detector worker(s))",
        model_path.display(),
        detectors.len()
    );
    Ok(Arc::new(DetectorPool::new(detectors)))
}

async fn serve(config: &Config, state: AppState) -> Result<(), Box<dyn std::error::Error>> {
    let listener = tokio::net::TcpListener::bind(config.bind_addr()?).await?;
    log::info!("Listening on ws://{}/ws", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => log::info!("Shutting down"),
        Err(e) => {
            log::error!("Failed to listen for shutdown signal: {e}");
            std::future::pending::<()>().await
        }
    }
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading face detection model... {pct}%");
    } else {
        eprint!("\rDownloading face detection model... {downloaded} bytes");
    }
}
