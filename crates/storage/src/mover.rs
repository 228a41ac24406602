//! Concurrent dataset mover.
//!
//! Moves one dataset from its source into the destination bucket:
//! checks the idempotence guard, streams direct URLs straight through,
//! and for archives stages locally then fans the files out with bounded
//! concurrency. A file that fails to upload stays in staging and is
//! reported per file; sibling uploads are never aborted and nothing is
//! retried.

use std::path::PathBuf;
use std::sync::Arc;

use futures::StreamExt;
use tracing::{info, warn};
use uuid::Uuid;

use scoring_core::error::CoreError;
use scoring_core::transfer::{dataset_prefix, destination_key, direct_key, TransferOutcome};

use crate::client::{BucketClient, ObjectStore};
use crate::descriptor::BucketDescriptor;
use crate::error::TransferError;
use crate::source::{DatasetFetcher, DatasetSource, HttpFetcher};

/// Upper bound on in-flight uploads during archive fan-out.
pub const UPLOAD_CONCURRENCY: usize = 10;

/// Drives whole-dataset transfers into the destination bucket.
pub struct Mover {
    /// `None` when no destination bucket is configured; every transfer
    /// then fails fast with a configuration error.
    store: Option<Arc<dyn ObjectStore>>,
    fetcher: Arc<dyn DatasetFetcher>,
    staging_root: PathBuf,
    hub_base: Option<String>,
}

impl Mover {
    pub fn new(
        store: Option<Arc<dyn ObjectStore>>,
        fetcher: Arc<dyn DatasetFetcher>,
        staging_root: PathBuf,
        hub_base: Option<String>,
    ) -> Self {
        Self {
            store,
            fetcher,
            staging_root,
            hub_base,
        }
    }

    /// Build the production mover from the environment: the `BUCKET_*`
    /// destination, an HTTP fetcher, and `DATASET_HUB_URL` for bare
    /// dataset names.
    pub fn from_env() -> Result<Self, CoreError> {
        let store = BucketDescriptor::from_env()?
            .map(|descriptor| Arc::new(BucketClient::new(descriptor)) as Arc<dyn ObjectStore>);
        Ok(Self {
            store,
            fetcher: Arc::new(HttpFetcher::new()),
            staging_root: std::env::temp_dir(),
            hub_base: std::env::var("DATASET_HUB_URL").ok(),
        })
    }

    /// Move one dataset into the bucket.
    ///
    /// Returns `Ok` with the aggregated outcome whenever the transfer
    /// itself ran, including the all-files-failed case; the caller
    /// decides how to surface `outcome.ok()`. Errors are reserved for
    /// conditions that prevent the transfer from running at all:
    /// missing bucket configuration, an unparseable source, or a
    /// failed archive fetch.
    pub async fn move_dataset(
        &self,
        raw_source: &str,
        dataset_name: &str,
    ) -> Result<TransferOutcome, CoreError> {
        let store = self.store.as_ref().ok_or_else(|| {
            CoreError::Configuration("no destination bucket is configured".into())
        })?;
        let source = DatasetSource::parse(raw_source, self.hub_base.as_deref())?;

        match source {
            DatasetSource::DirectUrl(url) => {
                let key = direct_key(dataset_name);
                if store.exists(&key).await {
                    info!(dataset_name, key, "dataset already present, skipping transfer");
                    return Ok(TransferOutcome::existing());
                }
                self.move_direct(store.as_ref(), &url, &key).await
            }
            DatasetSource::Archive(url) => {
                let prefix = dataset_prefix(dataset_name);
                if store.exists_prefix(&prefix).await {
                    info!(dataset_name, prefix, "dataset already present, skipping transfer");
                    return Ok(TransferOutcome::existing());
                }
                self.move_archive(store, &url, dataset_name).await
            }
        }
    }

    /// Stream a single object straight from source to bucket, no staging.
    async fn move_direct(
        &self,
        store: &dyn ObjectStore,
        url: &str,
        key: &str,
    ) -> Result<TransferOutcome, CoreError> {
        let bytes = self.fetcher.fetch_bytes(url).await.map_err(CoreError::from)?;
        let mut outcome = TransferOutcome::default();
        match store.upload_bytes(bytes, key).await {
            Ok(()) => outcome.record_ok(key),
            Err(e) => {
                warn!(key, error = %e, "direct upload failed");
                outcome.record_err(key, e.to_string());
            }
        }
        Ok(outcome)
    }

    /// Stage an archive locally and fan its files out into the bucket.
    async fn move_archive(
        &self,
        store: &Arc<dyn ObjectStore>,
        url: &str,
        dataset_name: &str,
    ) -> Result<TransferOutcome, CoreError> {
        let staging = self.staging_root.join(format!("dataset-{}", Uuid::new_v4()));
        tokio::fs::create_dir_all(&staging)
            .await
            .map_err(|e| CoreError::Transfer(format!("staging setup failed: {e}")))?;

        let files = match self.fetcher.fetch_archive(url, &staging).await {
            Ok(files) => files,
            Err(e) => {
                // Nothing was uploaded yet; the staging dir holds only
                // partial downloads and can go wholesale.
                let _ = tokio::fs::remove_dir_all(&staging).await;
                return Err(e.into());
            }
        };
        info!(dataset_name, files = files.len(), "staged archive, starting fan-out");

        let uploads = futures::stream::iter(files.into_iter().map(|path| {
            let store = Arc::clone(store);
            let dataset_name = dataset_name.to_string();
            async move {
                let file_name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let key = destination_key(&dataset_name, &file_name);
                let result = store.upload(&path, &key).await;
                if result.is_ok() {
                    // Uploaded files leave staging; failed ones stay
                    // behind for inspection.
                    if let Err(e) = tokio::fs::remove_file(&path).await {
                        warn!(path = %path.display(), error = %e, "could not remove staged file");
                    }
                }
                (file_name, result)
            }
        }))
        .buffer_unordered(UPLOAD_CONCURRENCY)
        .collect::<Vec<(String, Result<(), TransferError>)>>()
        .await;

        let mut outcome = TransferOutcome::default();
        for (file_name, result) in uploads {
            match result {
                Ok(()) => outcome.record_ok(file_name),
                Err(e) => {
                    warn!(file_name, error = %e, "file upload failed");
                    outcome.record_err(file_name, e.to_string());
                }
            }
        }

        // Non-recursive on purpose: succeeds only when every file was
        // uploaded and removed, and quietly fails when failed files remain.
        let _ = tokio::fs::remove_dir(&staging).await;

        info!(
            dataset_name,
            succeeded = outcome.succeeded,
            failed = outcome.failed,
            "fan-out finished"
        );
        Ok(outcome)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use std::collections::{BTreeMap, HashSet};
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    // -- fakes -------------------------------------------------------------

    #[derive(Default)]
    struct MemoryStore {
        objects: Mutex<BTreeMap<String, Vec<u8>>>,
        fail_keys: Mutex<HashSet<String>>,
    }

    impl MemoryStore {
        fn with_object(self, key: &str, bytes: &[u8]) -> Self {
            self.objects
                .lock()
                .unwrap()
                .insert(key.to_string(), bytes.to_vec());
            self
        }

        fn failing_on(self, key: &str) -> Self {
            self.fail_keys.lock().unwrap().insert(key.to_string());
            self
        }

        fn keys(&self) -> Vec<String> {
            self.objects.lock().unwrap().keys().cloned().collect()
        }
    }

    #[async_trait]
    impl ObjectStore for MemoryStore {
        async fn exists(&self, key: &str) -> bool {
            self.objects.lock().unwrap().contains_key(key)
        }

        async fn exists_prefix(&self, prefix: &str) -> bool {
            self.objects
                .lock()
                .unwrap()
                .keys()
                .any(|k| k.starts_with(prefix))
        }

        async fn upload(&self, local_path: &Path, key: &str) -> Result<(), TransferError> {
            if self.fail_keys.lock().unwrap().contains(key) {
                return Err(TransferError::Bucket("injected failure".into()));
            }
            let bytes = std::fs::read(local_path)?;
            self.objects.lock().unwrap().insert(key.to_string(), bytes);
            Ok(())
        }

        async fn upload_bytes(&self, bytes: Vec<u8>, key: &str) -> Result<(), TransferError> {
            if self.fail_keys.lock().unwrap().contains(key) {
                return Err(TransferError::Bucket("injected failure".into()));
            }
            self.objects.lock().unwrap().insert(key.to_string(), bytes);
            Ok(())
        }

        async fn download(&self, key: &str, local_path: &Path) -> Result<(), TransferError> {
            let objects = self.objects.lock().unwrap();
            let bytes = objects
                .get(key)
                .ok_or_else(|| TransferError::Bucket(format!("no such key: {key}")))?;
            std::fs::write(local_path, bytes)?;
            Ok(())
        }
    }

    /// Tracks how many uploads are in flight at once; each upload parks
    /// long enough for the whole fan-out window to fill up.
    #[derive(Default)]
    struct CountingStore {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        completed: AtomicUsize,
    }

    #[async_trait]
    impl ObjectStore for CountingStore {
        async fn exists(&self, _key: &str) -> bool {
            false
        }

        async fn exists_prefix(&self, _prefix: &str) -> bool {
            false
        }

        async fn upload(&self, _local_path: &Path, _key: &str) -> Result<(), TransferError> {
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(current, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.completed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn upload_bytes(&self, _bytes: Vec<u8>, _key: &str) -> Result<(), TransferError> {
            Ok(())
        }

        async fn download(&self, _key: &str, _local_path: &Path) -> Result<(), TransferError> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct StubFetcher {
        bytes: Vec<u8>,
        archive_files: Vec<(String, Vec<u8>)>,
        fail: bool,
        calls: AtomicUsize,
    }

    impl StubFetcher {
        fn with_bytes(bytes: &[u8]) -> Self {
            StubFetcher {
                bytes: bytes.to_vec(),
                ..StubFetcher::default()
            }
        }

        fn with_files(files: &[(&str, &[u8])]) -> Self {
            StubFetcher {
                archive_files: files
                    .iter()
                    .map(|(n, b)| (n.to_string(), b.to_vec()))
                    .collect(),
                ..StubFetcher::default()
            }
        }

        fn failing() -> Self {
            StubFetcher {
                fail: true,
                ..StubFetcher::default()
            }
        }
    }

    #[async_trait]
    impl DatasetFetcher for StubFetcher {
        async fn fetch_bytes(&self, _url: &str) -> Result<Vec<u8>, TransferError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(TransferError::Fetch("injected fetch failure".into()));
            }
            Ok(self.bytes.clone())
        }

        async fn fetch_archive(
            &self,
            _url: &str,
            staging: &Path,
        ) -> Result<Vec<PathBuf>, TransferError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(TransferError::Fetch("injected fetch failure".into()));
            }
            let mut paths = Vec::new();
            for (name, bytes) in &self.archive_files {
                let path = staging.join(name);
                std::fs::write(&path, bytes)?;
                paths.push(path);
            }
            Ok(paths)
        }
    }

    fn mover(
        store: MemoryStore,
        fetcher: StubFetcher,
        staging_root: &Path,
    ) -> (Mover, Arc<MemoryStore>, Arc<StubFetcher>) {
        let store = Arc::new(store);
        let fetcher = Arc::new(fetcher);
        let mover = Mover::new(
            Some(Arc::clone(&store) as Arc<dyn ObjectStore>),
            Arc::clone(&fetcher) as Arc<dyn DatasetFetcher>,
            staging_root.to_path_buf(),
            Some("https://hub.example.com/datasets".to_string()),
        );
        (mover, store, fetcher)
    }

    // -- configuration ------------------------------------------------------

    #[tokio::test]
    async fn missing_bucket_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let mover = Mover::new(
            None,
            Arc::new(StubFetcher::default()),
            dir.path().to_path_buf(),
            None,
        );
        let err = mover
            .move_dataset("https://host/data.zip", "churn")
            .await
            .unwrap_err();
        assert_matches!(err, CoreError::Configuration(_));
    }

    #[tokio::test]
    async fn malformed_source_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::default());
        let mover = Mover::new(
            Some(store as Arc<dyn ObjectStore>),
            Arc::new(StubFetcher::default()),
            dir.path().to_path_buf(),
            None,
        );
        let err = mover.move_dataset("churn", "churn").await.unwrap_err();
        assert_matches!(err, CoreError::Validation(_));
    }

    // -- direct URLs --------------------------------------------------------

    #[tokio::test]
    async fn direct_url_streams_without_staging() {
        let dir = tempfile::tempdir().unwrap();
        let (mover, store, _) = mover(
            MemoryStore::default(),
            StubFetcher::with_bytes(b"a,b\n1,2\n"),
            dir.path(),
        );

        let outcome = mover
            .move_dataset("https://host/churn.csv", "churn.csv")
            .await
            .unwrap();

        assert!(outcome.ok());
        assert_eq!(outcome.succeeded, 1);
        assert_eq!(store.keys(), vec!["churn.csv"]);
        // No staging dir was created for the direct path.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn direct_url_skips_when_key_exists() {
        let dir = tempfile::tempdir().unwrap();
        let (mover, _, fetcher) = mover(
            MemoryStore::default().with_object("churn.csv", b"old"),
            StubFetcher::with_bytes(b"new"),
            dir.path(),
        );

        let outcome = mover
            .move_dataset("https://host/churn.csv", "churn.csv")
            .await
            .unwrap();

        assert!(outcome.already_exists);
        assert_eq!(outcome.total(), 0);
        // The short-circuit happens before any fetch.
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn direct_upload_failure_is_reported_not_raised() {
        let dir = tempfile::tempdir().unwrap();
        let (mover, _, _) = mover(
            MemoryStore::default().failing_on("churn.csv"),
            StubFetcher::with_bytes(b"x"),
            dir.path(),
        );

        let outcome = mover
            .move_dataset("https://host/churn.csv", "churn.csv")
            .await
            .unwrap();

        assert!(!outcome.ok());
        assert_eq!(outcome.failed, 1);
    }

    // -- archives ------------------------------------------------------------

    #[tokio::test]
    async fn archive_fans_out_all_files() {
        let dir = tempfile::tempdir().unwrap();
        let (mover, store, _) = mover(
            MemoryStore::default(),
            StubFetcher::with_files(&[
                ("train.csv", b"1"),
                ("test.csv", b"2"),
                ("meta.json", b"3"),
            ]),
            dir.path(),
        );

        let outcome = mover
            .move_dataset("https://host/churn.zip", "churn")
            .await
            .unwrap();

        assert!(outcome.ok());
        assert_eq!(outcome.succeeded, 3);
        assert_eq!(outcome.failed, 0);
        assert_eq!(
            store.keys(),
            vec!["churn/meta.json", "churn/test.csv", "churn/train.csv"]
        );
        // Staging is fully cleaned up on total success.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn failed_file_stays_staged_and_siblings_continue() {
        let dir = tempfile::tempdir().unwrap();
        let (mover, store, _) = mover(
            MemoryStore::default().failing_on("churn/f2.csv"),
            StubFetcher::with_files(&[
                ("f1.csv", b"1"),
                ("f2.csv", b"2"),
                ("f3.csv", b"3"),
            ]),
            dir.path(),
        );

        let outcome = mover
            .move_dataset("https://host/churn.zip", "churn")
            .await
            .unwrap();

        assert!(outcome.ok());
        assert_eq!(outcome.succeeded, 2);
        assert_eq!(outcome.failed, 1);
        assert_eq!(outcome.total(), 3);
        assert_eq!(store.keys(), vec!["churn/f1.csv", "churn/f3.csv"]);

        // The failed file is still in the (surviving) staging dir.
        let staging: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(staging.len(), 1);
        let staging_dir = staging[0].as_ref().unwrap().path();
        let leftover: Vec<_> = std::fs::read_dir(&staging_dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(leftover, vec!["f2.csv"]);
    }

    #[tokio::test]
    async fn archive_skips_when_prefix_exists() {
        let dir = tempfile::tempdir().unwrap();
        let (mover, _, fetcher) = mover(
            MemoryStore::default().with_object("churn/train.csv", b"old"),
            StubFetcher::with_files(&[("train.csv", b"new")]),
            dir.path(),
        );

        let outcome = mover
            .move_dataset("https://host/churn.zip", "churn")
            .await
            .unwrap();

        assert!(outcome.already_exists);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn fetch_failure_aborts_and_removes_staging() {
        let dir = tempfile::tempdir().unwrap();
        let (mover, store, _) =
            mover(MemoryStore::default(), StubFetcher::failing(), dir.path());

        let err = mover
            .move_dataset("https://host/churn.zip", "churn")
            .await
            .unwrap_err();

        assert_matches!(err, CoreError::Transfer(_));
        assert!(store.keys().is_empty());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn bare_name_resolves_through_hub() {
        let dir = tempfile::tempdir().unwrap();
        let (mover, store, fetcher) = mover(
            MemoryStore::default(),
            StubFetcher::with_files(&[("data.csv", b"1")]),
            dir.path(),
        );

        let outcome = mover.move_dataset("churn", "churn").await.unwrap();

        assert!(outcome.ok());
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.keys(), vec!["churn/data.csv"]);
    }

    #[tokio::test]
    async fn fan_out_never_exceeds_the_upload_concurrency_cap() {
        let dir = tempfile::tempdir().unwrap();
        let files: Vec<(String, Vec<u8>)> = (0..30)
            .map(|i| (format!("part-{i:02}.csv"), vec![b'x']))
            .collect();
        let file_refs: Vec<(&str, &[u8])> = files
            .iter()
            .map(|(n, b)| (n.as_str(), b.as_slice()))
            .collect();

        let store = Arc::new(CountingStore::default());
        let mover = Mover::new(
            Some(Arc::clone(&store) as Arc<dyn ObjectStore>),
            Arc::new(StubFetcher::with_files(&file_refs)),
            dir.path().to_path_buf(),
            None,
        );

        let outcome = mover
            .move_dataset("https://host/churn.zip", "churn")
            .await
            .unwrap();

        assert_eq!(outcome.succeeded, 30);
        assert_eq!(store.completed.load(Ordering::SeqCst), 30);
        // Every upload parks on a sleep, so the window fills completely
        // before any slot frees up, and it never grows past the cap.
        assert_eq!(store.peak.load(Ordering::SeqCst), UPLOAD_CONCURRENCY);
    }

    // -- downloads -----------------------------------------------------------

    #[tokio::test]
    async fn download_round_trips_an_uploaded_object() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStore::default();

        store
            .upload_bytes(b"a,b\n1,2\n".to_vec(), "churn/train.csv")
            .await
            .unwrap();

        let target = dir.path().join("train.csv");
        store.download("churn/train.csv", &target).await.unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"a,b\n1,2\n");

        let err = store
            .download("churn/missing.csv", &dir.path().join("missing.csv"))
            .await
            .unwrap_err();
        assert_matches!(err, TransferError::Bucket(_));
    }
}
