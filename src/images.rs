//! Cover image storage. Raw upload bytes in, public URL out; files land in
//! a flat directory served statically under `/images`. Replaced or deleted
//! books do not reclaim their old files (callers log the leftover name).

use std::path::{Path, PathBuf};

use chrono::Utc;
use tokio::fs;

use crate::error::AppError;

#[derive(Clone)]
pub struct ImageStore {
    dir: PathBuf,
    public_base: String,
}

impl ImageStore {
    pub fn new(dir: impl Into<PathBuf>, public_base: &str) -> Self {
        Self {
            dir: dir.into(),
            public_base: public_base.trim_end_matches('/').to_string(),
        }
    }

    /// Creates the image directory if missing. Called once at startup.
    pub async fn prepare(&self) -> Result<(), AppError> {
        fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    /// Writes the uploaded bytes to disk and returns the public URL the
    /// file is served under.
    pub async fn save(&self, original_name: &str, bytes: &[u8]) -> Result<String, AppError> {
        let filename = unique_filename(original_name, Utc::now().timestamp_millis());
        fs::write(self.dir.join(&filename), bytes).await?;

        Ok(format!("{}/images/{}", self.public_base, filename))
    }
}

/// Rebuilds an upload's filename so it is portable and collision-resistant:
/// the stem is sanitized, a millisecond timestamp goes between stem and
/// extension.
fn unique_filename(original_name: &str, millis: i64) -> String {
    let name = Path::new(original_name);

    let stem = name
        .file_stem()
        .and_then(|stem| stem.to_str())
        .map(sanitize)
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| "image".to_string());

    let extension: String = name
        .extension()
        .and_then(|extension| extension.to_str())
        .unwrap_or("bin")
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect();

    format!("{stem}_{millis}.{extension}")
}

fn sanitize(input: &str) -> String {
    input
        .trim()
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}
