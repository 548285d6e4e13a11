use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelResolveError {
    #[error("failed to create cache directory: {0}")]
    CacheDir(#[source] std::io::Error),
    #[error("download failed for {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to write model to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("download from {url} was interrupted: {source}")]
    Interrupted {
        url: String,
        #[source]
        source: std::io::Error,
    },
    #[error("could not determine cache directory")]
    NoCacheDir,
    #[error("model {0} not found locally and no download URL configured")]
    NotFound(String),
}

/// Progress callback: `(bytes_downloaded, total_bytes)`.
/// `total_bytes` is 0 if the server didn't provide Content-Length.
pub type ProgressFn = Box<dyn Fn(u64, u64) + Send>;

/// Where to look for a model file, in priority order.
#[derive(Clone, Debug, Default)]
pub struct ModelSource {
    /// Explicit file path; wins over everything else when set.
    pub explicit_path: Option<PathBuf>,
    /// Directory shipped alongside the binary.
    pub bundled_dir: Option<PathBuf>,
    /// Download location used when no local copy exists.
    pub url: Option<String>,
}

/// Resolve a model file by name.
///
/// Resolution order:
/// 1. Explicit path
/// 2. User cache directory (platform-specific)
/// 3. Bundled directory
/// 4. Download from URL into the cache
pub fn resolve(
    name: &str,
    source: &ModelSource,
    progress: Option<ProgressFn>,
) -> Result<PathBuf, ModelResolveError> {
    if let Some(path) = &source.explicit_path {
        return Ok(path.clone());
    }
    resolve_in(&model_cache_dir()?, name, source, progress)
}

fn resolve_in(
    cache_dir: &Path,
    name: &str,
    source: &ModelSource,
    progress: Option<ProgressFn>,
) -> Result<PathBuf, ModelResolveError> {
    let cached_path = cache_dir.join(name);
    if cached_path.exists() {
        return Ok(cached_path);
    }

    if let Some(dir) = &source.bundled_dir {
        let bundled_path = dir.join(name);
        if bundled_path.exists() {
            return Ok(bundled_path);
        }
    }

    let url = source
        .url
        .as_deref()
        .ok_or_else(|| ModelResolveError::NotFound(name.to_string()))?;
    fs::create_dir_all(cache_dir).map_err(ModelResolveError::CacheDir)?;
    download(url, &cached_path, progress)?;
    Ok(cached_path)
}

/// Platform-specific model cache directory.
///
/// - macOS: `~/Library/Application Support/facestream/models/`
/// - Linux: `$XDG_CACHE_HOME/facestream/models/` or `~/.cache/facestream/models/`
/// - Windows: `%LOCALAPPDATA%/facestream/models/`
pub fn model_cache_dir() -> Result<PathBuf, ModelResolveError> {
    #[cfg(target_os = "macos")]
    {
        dirs::data_dir()
            .map(|d| d.join("facestream").join("models"))
            .ok_or(ModelResolveError::NoCacheDir)
    }
    #[cfg(not(target_os = "macos"))]
    {
        dirs::cache_dir()
            .map(|d| d.join("facestream").join("models"))
            .ok_or(ModelResolveError::NoCacheDir)
    }
}

fn download(url: &str, dest: &Path, progress: Option<ProgressFn>) -> Result<(), ModelResolveError> {
    log::info!("Downloading detector model from {url}");
    let mut response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(|source| ModelResolveError::Download {
            url: url.to_string(),
            source,
        })?;
    let total = response.content_length().unwrap_or(0);

    // Stays at `.part` until fully written
    let part = dest.with_extension("part");
    let result = stream_to_file(&mut response, &part, total, progress.as_deref(), url)
        .and_then(|()| {
            fs::rename(&part, dest).map_err(|source| ModelResolveError::Write {
                path: dest.to_path_buf(),
                source,
            })
        });
    if result.is_err() {
        let _ = fs::remove_file(&part);
    }
    result
}

fn stream_to_file(
    body: &mut impl Read,
    path: &Path,
    total: u64,
    progress: Option<&(dyn Fn(u64, u64) + Send)>,
    url: &str,
) -> Result<(), ModelResolveError> {
    let write_err = |source: std::io::Error| ModelResolveError::Write {
        path: path.to_path_buf(),
        source,
    };
    let mut file = fs::File::create(path).map_err(write_err)?;
    let mut buf = vec![0u8; 256 * 1024];
    let mut downloaded = 0u64;
    loop {
        let n = body.read(&mut buf).map_err(|source| ModelResolveError::Interrupted {
            url: url.to_string(),
            source,
        })?;
        if n == 0 {
            break;
        }
        file.write_all(&buf[..n]).map_err(write_err)?;
        downloaded += n as u64;
        if let Some(report) = progress {
            report(downloaded, total);
        }
    }
    file.sync_all().map_err(write_err)
}
