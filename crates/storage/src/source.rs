//! Dataset source resolution and fetching.
//!
//! A submitted source string is either a direct object URL, an archive
//! URL, or a bare dataset name resolved against the dataset hub. The
//! fetcher side is behind a trait so the mover is testable without a
//! network.

use std::io::Read;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use scoring_core::error::CoreError;

use crate::error::TransferError;

/// How a dataset reaches the mover.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetSource {
    /// A single downloadable object, uploaded as one key.
    DirectUrl(String),
    /// A zip archive whose entries fan out into the bucket.
    Archive(String),
}

impl DatasetSource {
    /// Classify a raw source string.
    ///
    /// URLs ending in `.zip` are archives; other URLs are direct
    /// objects. A bare name resolves to `{hub}/{name}.zip` when a hub
    /// base is configured, and is rejected otherwise.
    pub fn parse(raw: &str, hub_base: Option<&str>) -> Result<Self, CoreError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(CoreError::Validation("dataset source must not be empty".into()));
        }
        if raw.starts_with("http://") || raw.starts_with("https://") {
            if raw.ends_with(".zip") {
                return Ok(DatasetSource::Archive(raw.to_string()));
            }
            return Ok(DatasetSource::DirectUrl(raw.to_string()));
        }
        match hub_base {
            Some(hub) => {
                let hub = hub.trim_end_matches('/');
                Ok(DatasetSource::Archive(format!("{hub}/{raw}.zip")))
            }
            None => Err(CoreError::Validation(format!(
                "dataset source '{raw}' is not a URL and no dataset hub is configured"
            ))),
        }
    }

    pub fn url(&self) -> &str {
        match self {
            DatasetSource::DirectUrl(url) | DatasetSource::Archive(url) => url,
        }
    }
}

/// Retrieves dataset content from its source.
#[async_trait]
pub trait DatasetFetcher: Send + Sync {
    /// Fetch a direct-URL object fully into memory.
    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, TransferError>;

    /// Fetch an archive, unpack it into `staging`, and return the
    /// unpacked file paths.
    async fn fetch_archive(&self, url: &str, staging: &Path)
        -> Result<Vec<PathBuf>, TransferError>;
}

/// HTTP fetcher used in production.
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, TransferError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| TransferError::Fetch(e.to_string()))?
            .error_for_status()
            .map_err(|e| TransferError::Fetch(e.to_string()))?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| TransferError::Fetch(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl DatasetFetcher for HttpFetcher {
    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, TransferError> {
        self.get_bytes(url).await
    }

    async fn fetch_archive(
        &self,
        url: &str,
        staging: &Path,
    ) -> Result<Vec<PathBuf>, TransferError> {
        let bytes = self.get_bytes(url).await?;
        let archive_path = staging.join("archive.zip");
        tokio::fs::write(&archive_path, &bytes).await?;
        debug!(url, bytes = bytes.len(), "downloaded archive");
        let files = unpack_archive(&archive_path, staging).await?;
        tokio::fs::remove_file(&archive_path).await?;
        Ok(files)
    }
}

/// Unpack a zip archive into `dest`, flattening entries to their base
/// names. Returns the extracted paths sorted by file name.
pub async fn unpack_archive(
    archive_path: &Path,
    dest: &Path,
) -> Result<Vec<PathBuf>, TransferError> {
    let archive_path = archive_path.to_path_buf();
    let dest = dest.to_path_buf();
    tokio::task::spawn_blocking(move || unpack_archive_blocking(&archive_path, &dest))
        .await
        .map_err(|e| TransferError::Archive(format!("unpack task panicked: {e}")))?
}

fn unpack_archive_blocking(
    archive_path: &Path,
    dest: &Path,
) -> Result<Vec<PathBuf>, TransferError> {
    let file = std::fs::File::open(archive_path)?;
    let mut archive =
        zip::ZipArchive::new(file).map_err(|e| TransferError::Archive(e.to_string()))?;

    let mut extracted = Vec::new();
    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|e| TransferError::Archive(e.to_string()))?;
        if entry.is_dir() {
            continue;
        }
        // Flatten to the base name: archives may carry a wrapping
        // directory, but bucket keys are `{dataset}/{file}`.
        let name = match Path::new(entry.name()).file_name() {
            Some(name) => name.to_owned(),
            None => continue,
        };
        let out_path = dest.join(&name);
        let mut contents = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut contents)?;
        std::fs::write(&out_path, &contents)?;
        extracted.push(out_path);
    }
    extracted.sort();
    Ok(extracted)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    // -- parse -------------------------------------------------------------

    #[test]
    fn url_ending_in_zip_is_archive() {
        let source = DatasetSource::parse("https://host/data/churn.zip", None).unwrap();
        assert_eq!(
            source,
            DatasetSource::Archive("https://host/data/churn.zip".to_string())
        );
    }

    #[test]
    fn plain_url_is_direct() {
        let source = DatasetSource::parse("https://host/data/churn.csv", None).unwrap();
        assert_eq!(
            source,
            DatasetSource::DirectUrl("https://host/data/churn.csv".to_string())
        );
    }

    #[test]
    fn bare_name_resolves_against_hub() {
        let source = DatasetSource::parse("churn", Some("https://hub.example.com/datasets/"))
            .unwrap();
        assert_eq!(
            source,
            DatasetSource::Archive("https://hub.example.com/datasets/churn.zip".to_string())
        );
    }

    #[test]
    fn bare_name_without_hub_is_rejected() {
        let err = DatasetSource::parse("churn", None).unwrap_err();
        assert_matches!(err, CoreError::Validation(_));
    }

    #[test]
    fn empty_source_is_rejected() {
        let err = DatasetSource::parse("  ", Some("https://hub")).unwrap_err();
        assert_matches!(err, CoreError::Validation(_));
    }

    // -- unpack ------------------------------------------------------------

    fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut cursor = std::io::Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut cursor);
            for (name, body) in entries {
                writer
                    .start_file(*name, SimpleFileOptions::default())
                    .unwrap();
                writer.write_all(body).unwrap();
            }
            writer.finish().unwrap();
        }
        cursor.into_inner()
    }

    #[tokio::test]
    async fn unpack_flattens_nested_entries() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = build_zip(&[
            ("churn/train.csv", b"a,b\n1,2\n"),
            ("churn/test.csv", b"a,b\n3,4\n"),
        ]);
        let archive_path = dir.path().join("data.zip");
        std::fs::write(&archive_path, &bytes).unwrap();

        let files = unpack_archive(&archive_path, dir.path()).await.unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["test.csv", "train.csv"]);
        assert_eq!(
            std::fs::read(dir.path().join("train.csv")).unwrap(),
            b"a,b\n1,2\n"
        );
    }

    #[tokio::test]
    async fn unpack_skips_directory_entries() {
        let dir = tempfile::tempdir().unwrap();
        let mut cursor = std::io::Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut cursor);
            writer
                .add_directory("churn/", SimpleFileOptions::default())
                .unwrap();
            writer
                .start_file("churn/data.csv", SimpleFileOptions::default())
                .unwrap();
            writer.write_all(b"x\n").unwrap();
            writer.finish().unwrap();
        }
        let archive_path = dir.path().join("data.zip");
        std::fs::write(&archive_path, cursor.into_inner()).unwrap();

        let files = unpack_archive(&archive_path, dir.path()).await.unwrap();
        assert_eq!(files.len(), 1);
    }

    #[tokio::test]
    async fn unpack_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let archive_path = dir.path().join("data.zip");
        std::fs::write(&archive_path, b"not a zip").unwrap();

        let err = unpack_archive(&archive_path, dir.path()).await.unwrap_err();
        assert_matches!(err, TransferError::Archive(_));
    }
}
