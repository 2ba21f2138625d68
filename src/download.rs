//! Streaming downloads with progress bars and SHA-256 helpers

use crate::error::{Result, RpmGetError};
use crate::http::{Request, Transport};
use crate::output::{self, Severity};
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Outcome of streaming a response into a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Downloaded {
    pub path: PathBuf,
    pub status: u16,
    pub bytes: u64,
}

impl Downloaded {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Hex SHA-256 of a file
pub async fn file_sha256(file_path: &Path) -> Result<String> {
    use sha2::{Digest, Sha256};
    use tokio::io::AsyncReadExt;

    let mut file = fs::File::open(file_path).await?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0; 8192];

    loop {
        let n = file.read(&mut buffer).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// SHA-256 of a file, or `None` when the file does not exist yet.
pub async fn file_sha256_opt(file_path: &Path) -> Result<Option<String>> {
    match fs::metadata(file_path).await {
        Ok(_) => Ok(Some(file_sha256(file_path).await?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn progress_line(label: &str) -> String {
    format!("⬇ {}", label)
}

/// Byte progress bar; hidden when `quiet`. When stdout is not a terminal the
/// bar is replaced by a single `[PROGRESS]` line.
pub fn byte_progress(label: &str, quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    if !std::io::IsTerminal::is_terminal(&std::io::stdout()) {
        output::printc(progress_line(label), Severity::Progress, false);
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(0);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb.set_message(progress_line(label));
    pb
}

/// Stream `request` into `output_path`, rendering a progress bar.
///
/// The file is written whatever the HTTP status is; callers decide what a
/// non-2xx body means (the release fetcher needs rate-limit bodies on disk).
/// If the body stream or a write fails, the partial file is removed.
pub async fn download_to<T: Transport + ?Sized>(
    transport: &T,
    request: Request,
    output_path: &Path,
    label: &str,
    quiet: bool,
) -> Result<Downloaded> {
    let mut response = transport.get(request).await?;

    let pb = byte_progress(label, quiet);
    if let Some(total) = response.content_length {
        pb.set_length(total);
    }

    let mut file = fs::File::create(output_path).await.map_err(|e| {
        RpmGetError::Other(anyhow::anyhow!(
            "Failed to create {}: {}",
            output_path.display(),
            e
        ))
    })?;
    let mut downloaded: u64 = 0;

    let written = async {
        while let Some(chunk) = response.body.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;
            pb.set_position(downloaded);
        }
        file.flush().await?;
        Ok::<(), RpmGetError>(())
    }
    .await;

    if let Err(e) = written {
        pb.abandon_with_message(format!("✗ {}", label));
        drop(file);
        if let Err(rm) = fs::remove_file(output_path).await {
            tracing::warn!("Failed to remove partial {}: {}", output_path.display(), rm);
        }
        return Err(e);
    }

    pb.finish_with_message(format!("✓ {}", label));

    Ok(Downloaded {
        path: output_path.to_path_buf(),
        status: response.status,
        bytes: downloaded,
    })
}

/// Like [`download_to`] but treats non-2xx as an error and removes the
/// partial file.
pub async fn download_file<T: Transport + ?Sized>(
    transport: &T,
    request: Request,
    output_path: &Path,
    label: &str,
    quiet: bool,
) -> Result<Downloaded> {
    let url = request.url.clone();
    let downloaded = download_to(transport, request, output_path, label, quiet).await?;

    if !downloaded.is_success() {
        let _ = fs::remove_file(output_path).await;
        return Err(RpmGetError::HttpStatus {
            url,
            status: downloaded.status,
        });
    }

    Ok(downloaded)
}

/// Last non-empty path segment of a URL, ignoring any query or fragment.
pub fn url_basename(url: &str) -> Option<&str> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit('/').find(|segment| !segment.is_empty())
}
