//! Video asset discovery and loading.

use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

/// One video to assess. The dispatcher only needs `blob` and `filename`;
/// the rest travels through to the reporting sink.
#[derive(Debug, Clone)]
pub struct VideoAsset {
    /// Raw video bytes sent to the annotation service
    pub blob: Vec<u8>,
    /// File name, used to key the per-video annotation directory
    pub filename: String,
    /// Source location, informational only
    pub video_url: String,
    pub id: String,
}

impl VideoAsset {
    /// Load a video file from disk.
    pub async fn from_file(path: &Path) -> Result<Self> {
        let blob = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Ok(Self {
            blob,
            filename: filename.clone(),
            video_url: path.display().to_string(),
            id: filename,
        })
    }
}

/// Discover video files directly under a directory, by extension.
pub fn discover_videos(dir: &Path, extensions: &[String]) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable directory entry: {}", e);
                continue;
            }
        };
        let path = entry.path();
        let matches = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
            .unwrap_or(false);
        if matches {
            paths.push(path.to_path_buf());
        }
    }
    paths.sort();
    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_discover_videos_filters_by_extension() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("a.mp4"), b"x").unwrap();
        std::fs::write(tmp.path().join("b.MOV"), b"x").unwrap();
        std::fs::write(tmp.path().join("notes.txt"), b"x").unwrap();

        let found = discover_videos(tmp.path(), &["mp4".to_string(), "mov".to_string()]);
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn test_asset_from_file() {
        tokio_test::block_on(async {
            let tmp = TempDir::new().unwrap();
            let path = tmp.path().join("demo.mp4");
            std::fs::write(&path, b"video-bytes").unwrap();

            let asset = VideoAsset::from_file(&path).await.unwrap();
            assert_eq!(asset.filename, "demo.mp4");
            assert_eq!(asset.blob, b"video-bytes");
        });
    }
}
