use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Upload directory with request-scoped file names
///
/// Every stored file is keyed `<uuid>_<sanitized original name>`, so two
/// concurrent uploads with the same name never overwrite each other.
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist `bytes`, creating the directory if needed
    pub async fn save(&self, original_name: &str, bytes: &[u8]) -> std::io::Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let path = self
            .dir
            .join(format!("{}_{}", Uuid::new_v4(), sanitize_filename(original_name)));
        tokio::fs::write(&path, bytes).await?;

        tracing::debug!("Stored upload {} ({} bytes)", path.display(), bytes.len());
        Ok(path)
    }
}

/// Keep only the final path component, restricted to `[A-Za-z0-9._-]`
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let trimmed = cleaned.trim_start_matches('.');
    if trimmed.is_empty() {
        "upload".to_string()
    } else {
        trimmed.to_string()
    }
}
