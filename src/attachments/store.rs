//! Disk-backed attachment storage rooted at `UPLOAD_DIR`.
//!
//! Layout: `<root>/<user_id>/<name>` for bound uploads,
//! `<root>/temp/<user_id>/<name>` for temporary ones, and
//! `<root>/.staging/` for in-flight writes that do not have their database
//! row yet. Staging lives under the root so the final rename never crosses
//! a filesystem boundary.

use std::io;
use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use rand::distributions::Alphanumeric;
use rand::Rng;
use regex::Regex;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;
use uuid::Uuid;

lazy_static! {
    static ref UNSAFE_CHARS: Regex = Regex::new(r#"[\\/:*?"<>|]"#).unwrap();
}

const STAGING_DIR: &str = ".staging";
const TEMP_DIR: &str = "temp";
const MAX_STEM_CHARS: usize = 100;

#[derive(Debug, Clone)]
pub struct DiskStore {
    root: PathBuf,
}

impl DiskStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the storage root and its fixed subdirectories.
    pub async fn ensure_layout(&self) -> io::Result<()> {
        fs::create_dir_all(&self.root).await?;
        fs::create_dir_all(self.root.join(TEMP_DIR)).await?;
        fs::create_dir_all(self.root.join(STAGING_DIR)).await?;
        Ok(())
    }

    /// Relative path as stored in the database, always slash-separated.
    pub fn rel_path(&self, user_id: Uuid, is_temp: bool, disk_name: &str) -> String {
        if is_temp {
            format!("{TEMP_DIR}/{user_id}/{disk_name}")
        } else {
            format!("{user_id}/{disk_name}")
        }
    }

    fn abs_path(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    /// Write the payload to a staging file not yet visible under any user
    /// directory.
    pub async fn stage(&self, data: &[u8]) -> io::Result<PathBuf> {
        let staged = self
            .root
            .join(STAGING_DIR)
            .join(format!("{}.part", Uuid::new_v4()));
        if let Some(parent) = staged.parent() {
            fs::create_dir_all(parent).await?;
        }
        let mut file = fs::File::create(&staged).await?;
        file.write_all(data).await?;
        file.sync_all().await?;
        drop(file);
        debug!(staged = %staged.display(), size = data.len(), "staged upload");
        Ok(staged)
    }

    /// Move a staged file to its final location via rename.
    pub async fn commit(&self, staged: &Path, rel: &str) -> io::Result<()> {
        let target = self.abs_path(rel);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::rename(staged, &target).await?;
        debug!(path = %target.display(), "committed upload");
        Ok(())
    }

    /// Drop a staged file. Already gone counts as done.
    pub async fn discard(&self, staged: &Path) -> io::Result<()> {
        match fs::remove_file(staged).await {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }

    /// Open a stored file for a streamed response, returning its size.
    pub async fn open(&self, rel: &str) -> io::Result<(fs::File, u64)> {
        let file = fs::File::open(self.abs_path(rel)).await?;
        let len = file.metadata().await?.len();
        Ok((file, len))
    }

    /// Remove a stored file; absence counts as success.
    pub async fn remove(&self, rel: &str) -> io::Result<()> {
        match fs::remove_file(self.abs_path(rel)).await {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

/// Strip characters that are unsafe in a filename, trim whitespace, cap the
/// length and never return an empty string.
pub fn sanitize_filename(name: &str) -> String {
    let cleaned = UNSAFE_CHARS.replace_all(name, "_");
    let capped: String = cleaned.trim().chars().take(MAX_STEM_CHARS).collect();
    if capped.is_empty() {
        "file".to_string()
    } else {
        capped
    }
}

/// Name a file gets on disk: sanitized stem, upload timestamp, a short
/// random token and the original or inferred extension.
pub fn disk_name(original: &str, content_type: &str, unix_ts: i64, token: &str) -> String {
    let (stem, ext) = match original.rfind('.') {
        Some(idx) if idx > 0 => (&original[..idx], &original[idx..]),
        _ => (original, ""),
    };
    // The extension ends up in a filesystem path, so anything that is not a
    // plain token falls back to the declared content type.
    let ext = if ext.len() > 1 && ext[1..].chars().all(|c| c.is_ascii_alphanumeric()) {
        ext.to_string()
    } else {
        extension_for(content_type).to_string()
    };
    format!("{}_{}_{}{}", sanitize_filename(stem), unix_ts, token, ext)
}

fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "image/jpeg" | "image/jpg" => ".jpg",
        "image/png" => ".png",
        "image/gif" => ".gif",
        "image/webp" => ".webp",
        "application/pdf" => ".pdf",
        "text/plain" => ".txt",
        "text/markdown" => ".md",
        "application/json" => ".json",
        _ => "",
    }
}

pub fn random_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn stage_commit_open_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskStore::new(dir.path());
        store.ensure_layout().await.unwrap();

        let user = Uuid::new_v4();
        let staged = store.stage(b"hello attachment").await.unwrap();
        assert!(staged.exists());

        let rel = store.rel_path(user, false, "notes_1_abc123.txt");
        store.commit(&staged, &rel).await.unwrap();
        assert!(!staged.exists());

        let (mut file, size) = store.open(&rel).await.unwrap();
        assert_eq!(size, b"hello attachment".len() as u64);
        let mut data = Vec::new();
        file.read_to_end(&mut data).await.unwrap();
        assert_eq!(data, b"hello attachment");
    }

    #[tokio::test]
    async fn open_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskStore::new(dir.path());
        store.ensure_layout().await.unwrap();

        let err = store.open("temp/nobody/gone.txt").await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskStore::new(dir.path());
        store.ensure_layout().await.unwrap();

        let user = Uuid::new_v4();
        let staged = store.stage(b"x").await.unwrap();
        let rel = store.rel_path(user, true, "x_1_a.txt");
        store.commit(&staged, &rel).await.unwrap();

        store.remove(&rel).await.unwrap();
        store.remove(&rel).await.unwrap();
    }

    #[tokio::test]
    async fn discard_drops_staged_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskStore::new(dir.path());
        store.ensure_layout().await.unwrap();

        let staged = store.stage(b"orphan").await.unwrap();
        store.discard(&staged).await.unwrap();
        assert!(!staged.exists());
        store.discard(&staged).await.unwrap();
    }

    #[test]
    fn rel_path_partitions_by_user_and_temp_flag() {
        let store = DiskStore::new("/tmp/store");
        let user = Uuid::new_v4();
        assert_eq!(
            store.rel_path(user, false, "a.txt"),
            format!("{user}/a.txt")
        );
        assert_eq!(
            store.rel_path(user, true, "a.txt"),
            format!("temp/{user}/a.txt")
        );
    }

    #[test]
    fn sanitize_replaces_unsafe_characters() {
        assert_eq!(sanitize_filename(r#"a\b/c:d*e?f"g<h>i|j"#), "a_b_c_d_e_f_g_h_i_j");
        assert_eq!(sanitize_filename("  report  "), "report");
        assert_eq!(sanitize_filename(""), "file");
        assert_eq!(sanitize_filename("   "), "file");
    }

    #[test]
    fn sanitize_caps_length() {
        let long = "x".repeat(300);
        assert_eq!(sanitize_filename(&long).chars().count(), 100);
    }

    #[test]
    fn disk_name_keeps_original_extension() {
        let name = disk_name("notes.pdf", "application/pdf", 1700000000, "abc123");
        assert_eq!(name, "notes_1700000000_abc123.pdf");
    }

    #[test]
    fn disk_name_infers_extension_from_content_type() {
        let name = disk_name("snapshot", "image/png", 1700000000, "abc123");
        assert_eq!(name, "snapshot_1700000000_abc123.png");

        let name = disk_name("blob", "application/x-unknown", 1, "t0k3n0");
        assert_eq!(name, "blob_1_t0k3n0");
    }

    #[test]
    fn disk_name_drops_suspicious_extensions() {
        let name = disk_name("x./etc/passwd", "text/plain", 1, "aaaaaa");
        assert_eq!(name, "x_1_aaaaaa.txt");
    }

    #[test]
    fn disk_name_flattens_traversal_attempts() {
        let name = disk_name("../../evil.sh", "", 1, "aaaaaa");
        assert_eq!(name, ".._.._evil_1_aaaaaa.sh");
    }

    #[test]
    fn random_token_is_six_alphanumerics() {
        let token = random_token();
        assert_eq!(token.len(), 6);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
