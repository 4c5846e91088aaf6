//! Document upload adapter: turns a chosen file into a hosted URL.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::model::{DocumentType, LocalFile};
use crate::error::UploadError;

/// Callback receiving upload progress as a 0–100 percentage.
pub type ProgressFn = Arc<dyn Fn(u8) + Send + Sync>;

/// Transport that stores a document remotely and returns its URL.
#[async_trait]
pub trait DocumentUploader: Send + Sync {
    async fn upload(
        &self,
        file: &LocalFile,
        document: DocumentType,
        progress: ProgressFn,
    ) -> Result<String, UploadError>;
}

/// Per-document upload status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadStatus {
    pub in_flight: bool,
    pub progress_percent: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// Upload status for every document, one independent entry each.
#[derive(Debug, Clone, Default)]
pub struct UploadTracker {
    inner: Arc<RwLock<HashMap<DocumentType, UploadStatus>>>,
}

impl UploadTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self, document: DocumentType) -> UploadStatus {
        self.read().get(&document).cloned().unwrap_or_default()
    }

    fn begin(&self, document: DocumentType) {
        self.update(document, |s| {
            s.in_flight = true;
            s.progress_percent = 0;
            s.last_error = None;
        });
    }

    fn progress(&self, document: DocumentType, percent: u8) {
        self.update(document, |s| {
            if s.in_flight {
                s.progress_percent = percent.min(100);
            }
        });
    }

    fn finish(&self, document: DocumentType) {
        self.update(document, |s| {
            s.in_flight = false;
            s.progress_percent = 0;
            s.last_error = None;
        });
    }

    fn fail(&self, document: DocumentType, error: &UploadError) {
        let message = error.to_string();
        self.update(document, |s| {
            s.in_flight = false;
            s.progress_percent = 0;
            s.last_error = Some(message);
        });
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<DocumentType, UploadStatus>> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn update(&self, document: DocumentType, f: impl FnOnce(&mut UploadStatus)) {
        let mut map = self.inner.write().unwrap_or_else(|e| e.into_inner());
        f(map.entry(document).or_default());
    }
}

/// Enforces the size limit, drives the uploader and keeps status current.
#[derive(Clone)]
pub struct UploadAdapter {
    uploader: Arc<dyn DocumentUploader>,
    tracker: UploadTracker,
    max_bytes: u64,
}

impl UploadAdapter {
    pub fn new(uploader: Arc<dyn DocumentUploader>, max_bytes: u64) -> Self {
        Self {
            uploader,
            tracker: UploadTracker::new(),
            max_bytes,
        }
    }

    pub fn tracker(&self) -> &UploadTracker {
        &self.tracker
    }

    /// Upload one document. Oversized files fail before any network I/O.
    pub async fn upload(
        &self,
        file: &LocalFile,
        document: DocumentType,
    ) -> Result<String, UploadError> {
        if file.size > self.max_bytes {
            let err = UploadError::TooLarge {
                document,
                size: file.size,
                limit_mb: self.max_bytes / (1024 * 1024),
            };
            warn!(document = %document, size = file.size, "Rejected oversized document");
            self.tracker.fail(document, &err);
            return Err(err);
        }

        self.tracker.begin(document);
        let tracker = self.tracker.clone();
        let progress: ProgressFn = Arc::new(move |pct| tracker.progress(document, pct));

        match self.uploader.upload(file, document, progress).await {
            Ok(url) => {
                info!(document = %document, size = file.size, "Document uploaded");
                self.tracker.finish(document);
                Ok(url)
            }
            Err(e) => {
                warn!(document = %document, error = %e, "Document upload failed");
                self.tracker.fail(document, &e);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::config::DEFAULT_MAX_UPLOAD_BYTES;

    /// Uploader that echoes a URL per document, or fails when told to.
    #[derive(Default)]
    pub(crate) struct StubUploader {
        pub calls: AtomicUsize,
        pub fail_with: Option<UploadError>,
        pub progress_seen: std::sync::Mutex<Vec<u8>>,
    }

    #[async_trait]
    impl DocumentUploader for StubUploader {
        async fn upload(
            &self,
            file: &LocalFile,
            document: DocumentType,
            progress: ProgressFn,
        ) -> Result<String, UploadError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            for pct in [0u8, 50, 100] {
                progress(pct);
                self.progress_seen.lock().unwrap().push(pct);
            }
            match &self.fail_with {
                Some(err) => Err(err.clone()),
                None => Ok(format!("https://cdn.test/{document}/{}", file.file_name)),
            }
        }
    }

    #[tokio::test]
    async fn oversized_file_never_reaches_the_uploader() {
        let uploader = Arc::new(StubUploader::default());
        let adapter = UploadAdapter::new(uploader.clone(), DEFAULT_MAX_UPLOAD_BYTES);
        let big = LocalFile::from_bytes("scan.pdf", vec![0; 5 * 1024 * 1024 + 1]);

        let err = adapter.upload(&big, DocumentType::PanAttachment).await.unwrap_err();
        assert!(matches!(err, UploadError::TooLarge { .. }));
        assert_eq!(uploader.calls.load(Ordering::SeqCst), 0);

        let status = adapter.tracker().status(DocumentType::PanAttachment);
        assert!(!status.in_flight);
        assert_eq!(
            status.last_error.as_deref(),
            Some("File size must be less than 5MB.")
        );
    }

    #[tokio::test]
    async fn exactly_the_limit_is_accepted() {
        let uploader = Arc::new(StubUploader::default());
        let adapter = UploadAdapter::new(uploader.clone(), DEFAULT_MAX_UPLOAD_BYTES);
        let file = LocalFile::from_bytes("scan.pdf", vec![0; 5 * 1024 * 1024]);
        assert!(adapter.upload(&file, DocumentType::AadharFront).await.is_ok());
    }

    #[tokio::test]
    async fn success_clears_progress_and_error() {
        let uploader = Arc::new(StubUploader::default());
        let adapter = UploadAdapter::new(uploader.clone(), DEFAULT_MAX_UPLOAD_BYTES);
        let file = LocalFile::from_bytes("front.png", vec![1; 64]);

        let url = adapter.upload(&file, DocumentType::AadharFront).await.unwrap();
        assert_eq!(url, "https://cdn.test/aadharFront/front.png");
        assert_eq!(*uploader.progress_seen.lock().unwrap(), vec![0, 50, 100]);
        assert_eq!(
            adapter.tracker().status(DocumentType::AadharFront),
            UploadStatus::default()
        );
    }

    #[tokio::test]
    async fn failure_is_recorded_per_document() {
        let uploader = Arc::new(StubUploader {
            fail_with: Some(UploadError::Rejected {
                status: 500,
                body: "boom".into(),
            }),
            ..Default::default()
        });
        let adapter = UploadAdapter::new(uploader, DEFAULT_MAX_UPLOAD_BYTES);
        let file = LocalFile::from_bytes("back.png", vec![1; 64]);

        assert!(adapter.upload(&file, DocumentType::AadharBack).await.is_err());
        let back = adapter.tracker().status(DocumentType::AadharBack);
        assert!(back.last_error.unwrap().contains("boom"));
        // Other documents are unaffected.
        assert_eq!(
            adapter.tracker().status(DocumentType::AadharFront),
            UploadStatus::default()
        );
    }

    #[tokio::test]
    async fn concurrent_uploads_keep_separate_status() {
        let uploader = Arc::new(StubUploader::default());
        let adapter = UploadAdapter::new(uploader.clone(), DEFAULT_MAX_UPLOAD_BYTES);
        let small = LocalFile::from_bytes("a.pdf", vec![0; 16]);
        let big = LocalFile::from_bytes("b.pdf", vec![0; 6 * 1024 * 1024]);

        let (a, b) = tokio::join!(
            adapter.upload(&small, DocumentType::PanAttachment),
            adapter.upload(&big, DocumentType::BankProof),
        );
        assert!(a.is_ok());
        assert!(b.is_err());
        assert!(adapter
            .tracker()
            .status(DocumentType::PanAttachment)
            .last_error
            .is_none());
        assert!(adapter
            .tracker()
            .status(DocumentType::BankProof)
            .last_error
            .is_some());
    }
}
