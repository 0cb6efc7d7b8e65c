use std::path::{Path, PathBuf};

use time::OffsetDateTime;
use tokio::{fs, io::AsyncWriteExt};
use uuid::Uuid;

use crate::{AppError, AppResult};

/// Extensions we accept for uploads, matched case-insensitively.
const ALLOWED_EXT: &[&str] = &["png", "jpg", "jpeg", "gif", "mp3", "mp4"];

/// Stable name of a stored upload, relative to the upload directory.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaRef(pub String);

/// Validates uploads and writes them under one directory, handing back the
/// stored name a message can carry around.
#[derive(Clone)]
pub struct MediaStore {
    dir: PathBuf,
}

impl MediaStore {
    pub fn new(dir: impl AsRef<Path>) -> AppResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Validate and store one upload. The stored name mixes a timestamp and
    /// fresh entropy with the sanitized original, so two uploads of
    /// `cat.jpg` land in two files.
    pub async fn admit(&self, original_name: &str, bytes: &[u8]) -> AppResult<MediaRef> {
        let ext = original_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .ok_or(AppError::InvalidMediaType)?;
        if !ALLOWED_EXT.contains(&ext.as_str()) {
            return Err(AppError::InvalidMediaType);
        }

        let stored = format!(
            "{}_{}_{}",
            OffsetDateTime::now_utc().unix_timestamp(),
            Uuid::now_v7().simple(),
            sanitize_filename(original_name),
        );

        // Write to a temp name first; the final name only ever exists as a
        // complete file. The guard removes the temp file on every early
        // exit, error or cancelled mid-write, until the rename disarms it.
        let partial = self.dir.join(format!("{stored}.part"));
        let mut guard = PartialGuard::new(partial.clone());

        let mut file = fs::File::create(&partial).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);
        fs::rename(&partial, self.dir.join(&stored)).await?;
        guard.disarm();

        Ok(MediaRef(stored))
    }
}

struct PartialGuard {
    path: Option<PathBuf>,
}

impl PartialGuard {
    fn new(path: PathBuf) -> Self {
        Self { path: Some(path) }
    }

    fn disarm(&mut self) {
        self.path = None;
    }
}

impl Drop for PartialGuard {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            let _ = std::fs::remove_file(path);
        }
    }
}

/// Strip path components and anything outside `[A-Za-z0-9._-]` so the stored
/// name can never escape the upload directory.
fn sanitize_filename(name: &str) -> String {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(name);

    let clean: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    clean.trim_matches('.').to_owned()
}
